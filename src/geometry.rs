//! A small recursive geometry model with optional z ordinates.
//!
//! `geo-types` is strictly two-dimensional; reprojection has to carry heights
//! through untouched when an operation only yields two ordinates, so features
//! store their own coordinate sequences. `From` impls convert `geo-types`
//! geometries into [`Shape`], and `to_geo_types` converts back.

use geo_types::{Rect, coord};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coord {
    pub x: f64,
    pub y: f64,
    pub z: Option<f64>,
}

impl Coord {
    pub fn new(x: f64, y: f64) -> Self {
        Coord { x, y, z: None }
    }

    pub fn new_3d(x: f64, y: f64, z: f64) -> Self {
        Coord { x, y, z: Some(z) }
    }
}

impl From<(f64, f64)> for Coord {
    fn from((x, y): (f64, f64)) -> Self {
        Coord::new(x, y)
    }
}

impl From<(f64, f64, f64)> for Coord {
    fn from((x, y, z): (f64, f64, f64)) -> Self {
        Coord::new_3d(x, y, z)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LineString(pub Vec<Coord>);

impl LineString {
    pub fn coords(&self) -> impl Iterator<Item = &Coord> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<C: Into<Coord>> FromIterator<C> for LineString {
    fn from_iter<I: IntoIterator<Item = C>>(iter: I) -> Self {
        LineString(iter.into_iter().map(Into::into).collect())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    pub exterior: LineString,
    pub interiors: Vec<LineString>,
}

impl Polygon {
    pub fn new(exterior: LineString, interiors: Vec<LineString>) -> Self {
        Polygon {
            exterior,
            interiors,
        }
    }

    pub fn rings(&self) -> impl Iterator<Item = &LineString> {
        std::iter::once(&self.exterior).chain(self.interiors.iter())
    }
}

/// Coordinate structure of a geometry.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Point(Coord),
    LineString(LineString),
    Polygon(Polygon),
    MultiPoint(Vec<Coord>),
    MultiLineString(Vec<LineString>),
    MultiPolygon(Vec<Polygon>),
    GeometryCollection(Vec<Shape>),
}

impl Shape {
    /// Visit every vertex in storage order.
    pub fn for_each_coord(&self, f: &mut impl FnMut(&Coord)) {
        match self {
            Shape::Point(c) => f(c),
            Shape::LineString(ls) => ls.0.iter().for_each(f),
            Shape::Polygon(p) => p.rings().flat_map(|r| r.0.iter()).for_each(f),
            Shape::MultiPoint(points) => points.iter().for_each(f),
            Shape::MultiLineString(lines) => lines.iter().flat_map(|l| l.0.iter()).for_each(f),
            Shape::MultiPolygon(polygons) => polygons
                .iter()
                .flat_map(Polygon::rings)
                .flat_map(|r| r.0.iter())
                .for_each(f),
            Shape::GeometryCollection(shapes) => {
                for shape in shapes {
                    shape.for_each_coord(f);
                }
            }
        }
    }

    pub fn num_coords(&self) -> usize {
        let mut n = 0;
        self.for_each_coord(&mut |_| n += 1);
        n
    }

    /// Number of direct sub-geometries; 1 for single geometries.
    pub fn num_geometries(&self) -> usize {
        match self {
            Shape::Point(_) | Shape::LineString(_) | Shape::Polygon(_) => 1,
            Shape::MultiPoint(points) => points.len(),
            Shape::MultiLineString(lines) => lines.len(),
            Shape::MultiPolygon(polygons) => polygons.len(),
            Shape::GeometryCollection(shapes) => shapes.len(),
        }
    }

    /// Total number of polygon rings, exterior and interior, at any depth.
    pub fn num_rings(&self) -> usize {
        match self {
            Shape::Point(_) | Shape::LineString(_) | Shape::MultiPoint(_) | Shape::MultiLineString(_) => 0,
            Shape::Polygon(p) => 1 + p.interiors.len(),
            Shape::MultiPolygon(polygons) => polygons.iter().map(|p| 1 + p.interiors.len()).sum(),
            Shape::GeometryCollection(shapes) => shapes.iter().map(Shape::num_rings).sum(),
        }
    }

    /// Planar bounding rectangle of the x/y ordinates, `None` when empty.
    pub fn bounding_rect(&self) -> Option<Rect<f64>> {
        let mut bounds: Option<(f64, f64, f64, f64)> = None;
        self.for_each_coord(&mut |c| {
            bounds = Some(match bounds {
                None => (c.x, c.y, c.x, c.y),
                Some((min_x, min_y, max_x, max_y)) => {
                    (min_x.min(c.x), min_y.min(c.y), max_x.max(c.x), max_y.max(c.y))
                }
            });
        });
        bounds.map(|(min_x, min_y, max_x, max_y)| {
            Rect::new(coord! { x: min_x, y: min_y }, coord! { x: max_x, y: max_y })
        })
    }
}

/// A shape tagged with the SRID of the CRS its ordinates are expressed in.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    pub shape: Shape,
    /// Advisory only; never consulted by the transform.
    pub srid: Option<u32>,
}

impl Geometry {
    pub fn new(shape: Shape) -> Self {
        Geometry { shape, srid: None }
    }

    pub fn with_srid(mut self, srid: u32) -> Self {
        self.srid = Some(srid);
        self
    }

    pub fn point(x: f64, y: f64) -> Self {
        Geometry::new(Shape::Point(Coord::new(x, y)))
    }

    pub fn num_coords(&self) -> usize {
        self.shape.num_coords()
    }

    pub fn num_geometries(&self) -> usize {
        self.shape.num_geometries()
    }

    pub fn num_rings(&self) -> usize {
        self.shape.num_rings()
    }

    pub fn bounding_rect(&self) -> Option<Rect<f64>> {
        self.shape.bounding_rect()
    }
}

impl From<Shape> for Geometry {
    fn from(shape: Shape) -> Self {
        Geometry::new(shape)
    }
}
