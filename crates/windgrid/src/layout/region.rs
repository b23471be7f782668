//! Polygon regions used as area and exclusion constraints.
//!
//! A `Region` is the union of any number of polygons (with holes). Point
//! membership is boundary-inclusive, so a point on an edge counts as inside
//! both for area clipping and for exclusion.

use geo::{BooleanOps, Coord, Intersects, MultiPolygon, Polygon};
use nalgebra::Vector2;

#[derive(Clone, Debug, PartialEq)]
pub struct Region {
    shape: MultiPolygon<f64>,
}

impl Region {
    /// Union of all passed polygons / multipolygons.
    pub fn union_of<I, G>(geoms: I) -> Self
    where
        I: IntoIterator<Item = G>,
        G: Into<MultiPolygon<f64>>,
    {
        let mut iter = geoms.into_iter();
        let Some(first) = iter.next() else {
            return Self {
                shape: MultiPolygon::new(Vec::new()),
            };
        };
        let shape = iter.fold(first.into(), |acc: MultiPolygon<f64>, g| {
            let g: MultiPolygon<f64> = g.into();
            acc.union(&g)
        });
        Self { shape }
    }

    /// Union with another region.
    pub fn union(&self, other: &Region) -> Region {
        Region {
            shape: BooleanOps::union(&self.shape, &other.shape),
        }
    }

    /// Boundary-inclusive point membership.
    #[inline]
    pub fn contains(&self, p: Vector2<f64>) -> bool {
        let c = Coord { x: p.x, y: p.y };
        self.shape.0.iter().any(|poly| poly.intersects(&c))
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.shape.0.is_empty()
    }

    pub fn polygons(&self) -> &[Polygon<f64>] {
        &self.shape.0
    }

    pub fn as_multi_polygon(&self) -> &MultiPolygon<f64> {
        &self.shape
    }
}

impl From<Polygon<f64>> for Region {
    fn from(p: Polygon<f64>) -> Self {
        Region::union_of([p])
    }
}

impl From<MultiPolygon<f64>> for Region {
    fn from(mp: MultiPolygon<f64>) -> Self {
        Region::union_of([mp])
    }
}
