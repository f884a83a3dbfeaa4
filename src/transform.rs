use crate::crs::Crs;
use crate::geometry::{Coord, Geometry, LineString, Polygon, Shape};
use crate::operation::{CoordinateOperation, OperationError};
use thiserror::Error;

/// Per-vertex view of one resolved coordinate operation.
#[derive(Debug, Clone, Copy)]
pub struct VertexTransformer<'a> {
    operation: &'a dyn CoordinateOperation,
}

impl<'a> VertexTransformer<'a> {
    pub fn new(operation: &'a dyn CoordinateOperation) -> Self {
        VertexTransformer { operation }
    }

    pub fn operation(&self) -> &'a dyn CoordinateOperation {
        self.operation
    }

    /// Transform a single vertex.
    ///
    /// When the operation only yields x and y, the input z is carried over.
    pub fn transform(&self, coord: Coord) -> Result<Coord, OperationError> {
        let out = self.operation.transform(coord)?;
        if !out.x.is_finite() || !out.y.is_finite() {
            return Err(OperationError::NonFinite {
                x: coord.x,
                y: coord.y,
            });
        }
        Ok(Coord {
            x: out.x,
            y: out.y,
            z: out.z.or(coord.z),
        })
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("Failed to transform vertex #{vertex}: {source}")]
pub struct TransformError {
    /// Zero-based ordinal of the vertex in storage order.
    pub vertex: usize,
    pub source: OperationError,
}

/// Reproject a geometry vertex by vertex.
pub trait Reproject {
    type Output;

    /// Transform a geometry by mutating it in place.
    ///
    /// On error the geometry may be partially transformed; use
    /// [`Reproject::reprojected`] when the original must survive a failure.
    fn reproject(&mut self, transformer: &VertexTransformer<'_>) -> Result<(), TransformError>;

    /// Immutable flavor of [`Reproject::reproject`], which allocates a new geometry.
    ///
    /// ```rust
    /// use proj_batch::{Coord, FnOperation, LineString, Reproject, VertexTransformer};
    ///
    /// let swap = FnOperation::new("axis swap", None, |c: Coord| Ok(Coord::new(c.y, c.x)));
    /// let line: LineString = [(1.0, 2.0, 50.0), (3.0, 4.0, 60.0)].into_iter().collect();
    ///
    /// let swapped = line.reprojected(&VertexTransformer::new(&swap)).unwrap();
    /// assert_eq!(swapped.0[1], Coord::new_3d(4.0, 3.0, 60.0));
    /// // original `line` is untouched
    /// assert_eq!(line.0[1], Coord::new_3d(3.0, 4.0, 60.0));
    /// ```
    fn reprojected(&self, transformer: &VertexTransformer<'_>) -> Result<Self::Output, TransformError>;
}

/// Walks the vertices of a structure, numbering them for error reports.
struct Walker<'t, 'a> {
    transformer: &'t VertexTransformer<'a>,
    vertex: usize,
}

impl Walker<'_, '_> {
    fn coord(&mut self, coord: &mut Coord) -> Result<(), TransformError> {
        let vertex = self.vertex;
        self.vertex += 1;
        *coord = self
            .transformer
            .transform(*coord)
            .map_err(|source| TransformError { vertex, source })?;
        Ok(())
    }

    fn coords(&mut self, coords: &mut [Coord]) -> Result<(), TransformError> {
        coords.iter_mut().try_for_each(|c| self.coord(c))
    }

    fn polygon(&mut self, polygon: &mut Polygon) -> Result<(), TransformError> {
        self.coords(&mut polygon.exterior.0)?;
        polygon
            .interiors
            .iter_mut()
            .try_for_each(|ring| self.coords(&mut ring.0))
    }

    fn shape(&mut self, shape: &mut Shape) -> Result<(), TransformError> {
        match shape {
            Shape::Point(c) => self.coord(c),
            Shape::LineString(ls) => self.coords(&mut ls.0),
            Shape::Polygon(p) => self.polygon(p),
            Shape::MultiPoint(points) => self.coords(points),
            Shape::MultiLineString(lines) => lines.iter_mut().try_for_each(|l| self.coords(&mut l.0)),
            Shape::MultiPolygon(polygons) => polygons.iter_mut().try_for_each(|p| self.polygon(p)),
            Shape::GeometryCollection(shapes) => shapes.iter_mut().try_for_each(|s| self.shape(s)),
        }
    }
}

macro_rules! impl_reproject {
    ($ty:ty, $walk:ident) => {
        impl Reproject for $ty {
            type Output = $ty;

            fn reproject(&mut self, transformer: &VertexTransformer<'_>) -> Result<(), TransformError> {
                Walker {
                    transformer,
                    vertex: 0,
                }
                .$walk(self)
            }

            fn reprojected(&self, transformer: &VertexTransformer<'_>) -> Result<Self::Output, TransformError> {
                let mut output = self.clone();
                output.reproject(transformer)?;
                Ok(output)
            }
        }
    };
}

impl_reproject!(Coord, coord);
impl_reproject!(Polygon, polygon);
impl_reproject!(Shape, shape);

impl Reproject for LineString {
    type Output = LineString;

    fn reproject(&mut self, transformer: &VertexTransformer<'_>) -> Result<(), TransformError> {
        Walker {
            transformer,
            vertex: 0,
        }
        .coords(&mut self.0)
    }

    fn reprojected(&self, transformer: &VertexTransformer<'_>) -> Result<Self::Output, TransformError> {
        let mut output = self.clone();
        output.reproject(transformer)?;
        Ok(output)
    }
}

/// Reprojecting a [`Geometry`] leaves its SRID tag alone; [`GeometryReprojector`]
/// retags the copies it produces.
impl Reproject for Geometry {
    type Output = Geometry;

    fn reproject(&mut self, transformer: &VertexTransformer<'_>) -> Result<(), TransformError> {
        self.shape.reproject(transformer)
    }

    fn reprojected(&self, transformer: &VertexTransformer<'_>) -> Result<Self::Output, TransformError> {
        Ok(Geometry {
            shape: self.shape.reprojected(transformer)?,
            srid: self.srid,
        })
    }
}

/// Produces reprojected, retagged copies of feature geometries.
#[derive(Debug, Clone, Copy)]
pub struct GeometryReprojector<'a> {
    transformer: VertexTransformer<'a>,
    srid: Option<u32>,
}

impl<'a> GeometryReprojector<'a> {
    pub fn new(operation: &'a dyn CoordinateOperation, target: &Crs) -> Self {
        GeometryReprojector {
            transformer: VertexTransformer::new(operation),
            srid: target.epsg_code(),
        }
    }

    /// The SRID given to every reprojected geometry.
    pub fn target_srid(&self) -> Option<u32> {
        self.srid
    }

    /// A structurally identical copy of `geometry` in the target CRS.
    ///
    /// The input is never modified, so it stays valid as undo state.
    pub fn reproject(&self, geometry: &Geometry) -> Result<Geometry, TransformError> {
        Ok(Geometry {
            shape: geometry.shape.reprojected(&self.transformer)?,
            srid: self.srid,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crs::{CrsId, Datum, Ellipsoid, IGNF};
    use crate::operation::FnOperation;
    use approx::assert_relative_eq;

    fn scale() -> FnOperation<impl Fn(Coord) -> Result<Coord, OperationError>> {
        FnOperation::new("scale", Some(0.0), |c: Coord| {
            Ok(Coord {
                x: c.x * 2.,
                y: c.y * 3.,
                z: c.z.map(|z| z + 1.),
            })
        })
    }

    fn target(id: CrsId) -> Crs {
        Crs::new(id, "target", Datum::new("D", Ellipsoid::grs80()))
    }

    #[test]
    fn test_two_dimensional_operation_keeps_z() {
        let flat = FnOperation::new("flat", None, |c: Coord| Ok(Coord::new(c.x + 1., c.y)));
        let t = VertexTransformer::new(&flat);
        assert_eq!(t.transform(Coord::new_3d(1., 2., 42.)).unwrap(), Coord::new_3d(2., 2., 42.));
        assert_eq!(t.transform(Coord::new(1., 2.)).unwrap(), Coord::new(2., 2.));
    }

    #[test]
    fn test_three_dimensional_operation_updates_z() {
        let op = scale();
        let t = VertexTransformer::new(&op);
        let out = t.transform(Coord::new_3d(1., 1., 10.)).unwrap();
        assert_relative_eq!(out.z.unwrap(), 11.);
    }

    #[test]
    fn test_non_finite_output_is_a_failure() {
        let bad = FnOperation::new("bad", None, |_: Coord| Ok(Coord::new(f64::INFINITY, 0.)));
        let err = VertexTransformer::new(&bad).transform(Coord::new(5., 6.)).unwrap_err();
        assert_eq!(err, OperationError::NonFinite { x: 5., y: 6. });
    }

    #[test]
    fn test_reprojector_preserves_structure_and_tags_srid() {
        let op = scale();
        let reprojector = GeometryReprojector::new(&op, &target(CrsId::epsg(2154)));
        let ring: LineString = [(0., 0.), (1., 0.), (1., 1.), (0., 0.)].into_iter().collect();
        let source = Geometry::new(Shape::MultiPolygon(vec![
            Polygon::new(ring.clone(), vec![ring.clone()]),
            Polygon::new(ring, vec![]),
        ]))
        .with_srid(4326);

        let out = reprojector.reproject(&source).unwrap();
        assert_eq!(out.srid, Some(2154));
        assert_eq!(out.num_coords(), source.num_coords());
        assert_eq!(out.num_rings(), source.num_rings());
        assert_eq!(out.num_geometries(), source.num_geometries());
        assert_eq!(source.srid, Some(4326));
        let Shape::MultiPolygon(polygons) = &out.shape else {
            panic!("shape kind changed");
        };
        assert_eq!(polygons[0].exterior.0[2], Coord::new(2., 3.));
    }

    #[test]
    fn test_non_epsg_target_leaves_srid_unset() {
        let op = scale();
        let reprojector = GeometryReprojector::new(&op, &target(CrsId::new(IGNF, "LAMB93")));
        let out = reprojector.reproject(&Geometry::point(1., 1.).with_srid(4326)).unwrap();
        assert_eq!(out.srid, None);
    }

    #[test]
    fn test_failure_reports_vertex_and_leaves_input_untouched() {
        let picky = FnOperation::new("picky", None, |c: Coord| {
            if c.x > 2. {
                Err(OperationError::OutOfDomain { x: c.x, y: c.y })
            } else {
                Ok(c)
            }
        });
        let line: LineString = [(0., 0.), (1., 1.), (3., 3.)].into_iter().collect();
        let geometry = Geometry::new(Shape::LineString(line.clone()));
        let err = GeometryReprojector::new(&picky, &target(CrsId::epsg(3857)))
            .reproject(&geometry)
            .unwrap_err();
        assert_eq!(err.vertex, 2);
        assert_eq!(geometry.shape, Shape::LineString(line));
    }
}
