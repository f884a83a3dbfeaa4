//! Guard against reprojecting layers that do not share a source CRS.
//!
//! A batch applies one source CRS to every selected layer. If the layers are
//! actually expressed in different CRS, the transform still succeeds
//! numerically and silently produces wrong coordinates, so the selection is
//! checked up front.

use crate::crs::{CoordinateSystem, SridStyle};
use crate::layer::FeatureLayer;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mismatch {
    /// One layer has a CRS, the other has none.
    MissingCrs,
    /// One layer is explicitly unspecified, the other has a concrete CRS.
    Unspecified,
    EpsgCode { first: u32, other: u32 },
    Srid { first: u32, other: u32 },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Selected layers have heterogeneous sources: {first} and {other} differ ({mismatch:?})")]
pub struct HeterogeneousSourceError {
    pub first: String,
    pub other: String,
    pub mismatch: Mismatch,
}

/// Check that every layer shares the first layer's source CRS.
///
/// The first incompatible layer ends the check.
pub fn check(layers: &[&FeatureLayer]) -> Result<(), HeterogeneousSourceError> {
    let Some((first, rest)) = layers.split_first() else {
        return Ok(());
    };
    for layer in rest {
        if let Some(mismatch) = compare(first, layer) {
            return Err(HeterogeneousSourceError {
                first: first.name().to_string(),
                other: layer.name().to_string(),
                mismatch,
            });
        }
    }
    Ok(())
}

fn same_crs(a: Option<&CoordinateSystem>, b: Option<&CoordinateSystem>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a.is_same(b),
        _ => false,
    }
}

fn compare(first: &FeatureLayer, other: &FeatureLayer) -> Option<Mismatch> {
    let (cs, csi) = (first.crs.as_ref(), other.crs.as_ref());
    let (srid, sridi): (Option<SridStyle>, Option<SridStyle>) = (first.srid_style, other.srid_style);

    if same_crs(cs, csi) && srid == sridi {
        return None;
    }
    match (cs, csi) {
        (Some(cs), Some(csi)) => {
            if cs.is_unspecified() != csi.is_unspecified() {
                return Some(Mismatch::Unspecified);
            }
            match (cs.epsg_code(), csi.epsg_code()) {
                (Ok(a), Ok(b)) if a != b => return Some(Mismatch::EpsgCode { first: a, other: b }),
                (Err(e), _) | (_, Err(e)) => log::warn!(
                    "Cannot compare source EPSG codes of {} and {}: {e}",
                    first.name(),
                    other.name()
                ),
                _ => {}
            }
        }
        (None, None) => {}
        _ => return Some(Mismatch::MissingCrs),
    }
    match (srid, sridi) {
        (Some(a), Some(b)) if a.srid != b.srid => Some(Mismatch::Srid {
            first: a.srid,
            other: b.srid,
        }),
        _ => None,
    }
}
