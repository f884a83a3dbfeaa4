//! Operations backed by [PROJ](https://proj.org) through the `proj` crate.

use crate::crs::Crs;
use crate::geometry::Coord;
use crate::operation::{CoordinateOperation, OperationError, OperationProvider};
use proj::{Proj, ProjCreateError};
use std::fmt;
use std::sync::Arc;

/// Asks PROJ for a transformation between the two CRS ids.
///
/// PROJ ranks the candidate pipelines itself and hands back the best one, so
/// this provider yields at most one operation. Input and output axis order is
/// normalized to x/easting, y/northing.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProjProvider;

impl OperationProvider for ProjProvider {
    fn find_operations(
        &self,
        source: &Crs,
        target: &Crs,
    ) -> Result<Vec<Arc<dyn CoordinateOperation>>, OperationError> {
        let (from, to) = (source.id().to_string(), target.id().to_string());
        match Proj::new_known_crs(&from, &to, None) {
            Ok(proj) => Ok(vec![Arc::new(ProjOperation {
                name: format!("PROJ {from} -> {to}"),
                proj,
            })]),
            Err(ProjCreateError::ProjError(message)) if !is_installation_failure(&message) => {
                log::debug!("PROJ has no operation from {from} to {to}: {message}");
                Ok(Vec::new())
            }
            Err(e) => Err(OperationError::Provider(e.to_string())),
        }
    }
}

/// PROJ reports a broken setup (no `proj.db`, unusable context) through the
/// same error as an unknown CRS pair; tell them apart by message.
fn is_installation_failure(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    ["proj.db", "database", "context"]
        .iter()
        .any(|needle| message.contains(needle))
}

/// A two-dimensional PROJ transformation; heights pass through unchanged.
pub struct ProjOperation {
    name: String,
    proj: Proj,
}

impl fmt::Debug for ProjOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProjOperation")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl CoordinateOperation for ProjOperation {
    fn name(&self) -> &str {
        &self.name
    }

    fn precision(&self) -> Option<f64> {
        None
    }

    fn transform(&self, coord: Coord) -> Result<Coord, OperationError> {
        let (x, y) = self
            .proj
            .convert((coord.x, coord.y))
            .map_err(|e| OperationError::Provider(e.to_string()))?;
        Ok(Coord::new(x, y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crs::{CrsId, Datum, Ellipsoid};
    use crate::transform::VertexTransformer;
    use approx::assert_relative_eq;

    fn crs(code: u32) -> Crs {
        Crs::new(CrsId::epsg(code), "", Datum::new("", Ellipsoid::wgs84()))
    }

    #[test]
    fn test_installation_failures_are_not_missing_operations() {
        assert!(is_installation_failure("proj_create: Cannot find proj.db"));
        assert!(is_installation_failure("open of /usr/share/proj/proj.db failed"));
        assert!(is_installation_failure("No database context specified"));
        assert!(!is_installation_failure("proj_create: crs not found: EPSG:999999"));
    }

    #[test]
    fn test_unknown_crs_yields_no_operation() {
        let ops = ProjProvider.find_operations(&crs(4326), &crs(999_999)).unwrap();
        assert!(ops.is_empty());
    }

    #[test]
    fn test_web_mercator() {
        let ops = ProjProvider.find_operations(&crs(4326), &crs(3857)).unwrap();
        assert_eq!(ops.len(), 1);
        let out = VertexTransformer::new(ops[0].as_ref())
            .transform(Coord::new_3d(-36.508, -54.2815, 12.))
            .unwrap();
        assert_relative_eq!(out.x, -4064052.0, epsilon = 1.0);
        assert_relative_eq!(out.y, -7223650.5, epsilon = 1.0);
        assert_eq!(out.z, Some(12.));
    }
}
