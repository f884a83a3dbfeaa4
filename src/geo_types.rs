//! Conversions between [`geo-types`](https://docs.rs/geo-types) geometries and [`Shape`].
//!
//! `geo-types` has no z ordinate: shapes built from it are two-dimensional, and
//! converting back drops any z.
//!
//! ```rust
//! use geo_types::{line_string, Geometry as GeoGeometry};
//! use proj_batch::Shape;
//!
//! let line = line_string![(x: 1.0f32, y: 2.0), (x: 3.0, y: 4.0)];
//! let shape = Shape::from(GeoGeometry::LineString(line.clone()));
//! assert_eq!(shape.num_coords(), 2);
//!
//! let back: GeoGeometry<f32> = shape.to_geo_types();
//! assert_eq!(back, GeoGeometry::LineString(line));
//! ```

use crate::geometry::{Coord, LineString, Polygon, Shape};
use geo_types::CoordFloat;
use num_traits::NumCast;

fn to_f64<T: CoordFloat>(value: T) -> f64 {
    value.to_f64().unwrap_or(f64::NAN)
}

fn from_f64<T: CoordFloat>(value: f64) -> T {
    <T as NumCast>::from(value).unwrap_or_else(T::nan)
}

impl<T: CoordFloat> From<geo_types::Coord<T>> for Coord {
    fn from(c: geo_types::Coord<T>) -> Self {
        Coord::new(to_f64(c.x), to_f64(c.y))
    }
}

impl<T: CoordFloat> From<geo_types::LineString<T>> for LineString {
    fn from(line: geo_types::LineString<T>) -> Self {
        LineString(line.0.into_iter().map(Coord::from).collect())
    }
}

impl<T: CoordFloat> From<geo_types::Polygon<T>> for Polygon {
    fn from(polygon: geo_types::Polygon<T>) -> Self {
        let (exterior, interiors) = polygon.into_inner();
        Polygon::new(
            exterior.into(),
            interiors.into_iter().map(LineString::from).collect(),
        )
    }
}

impl<T: CoordFloat> From<geo_types::Geometry<T>> for Shape {
    fn from(geometry: geo_types::Geometry<T>) -> Self {
        use geo_types::Geometry as G;
        match geometry {
            G::Point(p) => Shape::Point(p.0.into()),
            G::Line(l) => Shape::LineString(LineString(vec![l.start.into(), l.end.into()])),
            G::LineString(ls) => Shape::LineString(ls.into()),
            G::Polygon(p) => Shape::Polygon(p.into()),
            G::MultiPoint(mp) => Shape::MultiPoint(mp.0.into_iter().map(|p| p.0.into()).collect()),
            G::MultiLineString(mls) => {
                Shape::MultiLineString(mls.0.into_iter().map(LineString::from).collect())
            }
            G::MultiPolygon(mp) => Shape::MultiPolygon(mp.0.into_iter().map(Polygon::from).collect()),
            G::GeometryCollection(gc) => {
                Shape::GeometryCollection(gc.0.into_iter().map(Shape::from).collect())
            }
            G::Rect(r) => Shape::Polygon(r.to_polygon().into()),
            G::Triangle(t) => Shape::Polygon(t.to_polygon().into()),
        }
    }
}

impl Coord {
    pub fn to_geo_types<T: CoordFloat>(&self) -> geo_types::Coord<T> {
        geo_types::Coord {
            x: from_f64(self.x),
            y: from_f64(self.y),
        }
    }
}

impl LineString {
    pub fn to_geo_types<T: CoordFloat>(&self) -> geo_types::LineString<T> {
        geo_types::LineString(self.0.iter().map(Coord::to_geo_types).collect())
    }
}

impl Polygon {
    pub fn to_geo_types<T: CoordFloat>(&self) -> geo_types::Polygon<T> {
        geo_types::Polygon::new(
            self.exterior.to_geo_types(),
            self.interiors.iter().map(LineString::to_geo_types).collect(),
        )
    }
}

impl Shape {
    /// Two-dimensional `geo-types` copy of this shape; z ordinates are dropped.
    pub fn to_geo_types<T: CoordFloat>(&self) -> geo_types::Geometry<T> {
        use geo_types::Geometry as G;
        match self {
            Shape::Point(c) => G::Point(geo_types::Point(c.to_geo_types())),
            Shape::LineString(ls) => G::LineString(ls.to_geo_types()),
            Shape::Polygon(p) => G::Polygon(p.to_geo_types()),
            Shape::MultiPoint(points) => G::MultiPoint(geo_types::MultiPoint(
                points
                    .iter()
                    .map(|c| geo_types::Point(c.to_geo_types()))
                    .collect(),
            )),
            Shape::MultiLineString(lines) => G::MultiLineString(geo_types::MultiLineString(
                lines.iter().map(LineString::to_geo_types).collect(),
            )),
            Shape::MultiPolygon(polygons) => G::MultiPolygon(geo_types::MultiPolygon(
                polygons.iter().map(Polygon::to_geo_types).collect(),
            )),
            Shape::GeometryCollection(shapes) => G::GeometryCollection(
                geo_types::GeometryCollection(shapes.iter().map(Shape::to_geo_types).collect()),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{Rect, coord, point, polygon};

    #[test]
    fn test_polygon_from_geo_types() {
        let poly = polygon!(
            exterior: [(x: 0., y: 0.), (x: 4., y: 0.), (x: 4., y: 4.), (x: 0., y: 0.)],
            interiors: [[(x: 1., y: 1.), (x: 2., y: 1.), (x: 1., y: 2.), (x: 1., y: 1.)]],
        );
        let shape = Shape::from(geo_types::Geometry::Polygon(poly.clone()));
        assert_eq!(shape.num_rings(), 2);
        assert_eq!(shape.num_coords(), 8);
        assert_eq!(shape.to_geo_types::<f64>(), geo_types::Geometry::Polygon(poly));
    }

    #[test]
    fn test_rect_becomes_polygon() {
        let rect = Rect::new(coord! { x: 0f64, y: 0. }, coord! { x: 2., y: 1. });
        let shape = Shape::from(geo_types::Geometry::Rect(rect));
        assert!(matches!(shape, Shape::Polygon(_)));
        assert_eq!(shape.num_coords(), 5);
    }

    #[test]
    fn test_z_is_dropped() {
        let shape = Shape::Point(Coord::new_3d(1.5, 2.5, 100.));
        assert_eq!(
            shape.to_geo_types::<f64>(),
            geo_types::Geometry::Point(point!(x: 1.5, y: 2.5))
        );
    }
}
