use crate::crs::Crs;
use std::fmt;
use std::sync::Arc;

/// Summary of a committed batch, for the host to render.
#[derive(Debug, Clone)]
pub struct ReprojectionReport {
    pub layers: Vec<String>,
    pub source: Arc<Crs>,
    pub target: Arc<Crs>,
    /// Name of the selected coordinate operation.
    pub operation: String,
    /// Number of reprojected features across all layers.
    pub features: usize,
}

fn write_crs(f: &mut fmt::Formatter<'_>, label: &str, crs: &Crs) -> fmt::Result {
    writeln!(f, "{label}: {crs}")?;
    writeln!(f, "  datum: {}", crs.datum())?;
    match crs.datum().to_wgs84 {
        Some(p) => writeln!(
            f,
            "  towgs84: {},{},{},{},{},{},{}",
            p[0], p[1], p[2], p[3], p[4], p[5], p[6]
        )?,
        None => writeln!(f, "  towgs84: none")?,
    }
    writeln!(f, "  ellipsoid: {}", crs.ellipsoid())?;
    match crs.projection() {
        Some(projection) => writeln!(f, "  projection: {}", projection.definition),
        None => writeln!(f, "  projection: none"),
    }
}

impl fmt::Display for ReprojectionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Transformed layers: {}", self.layers.join(", "))?;
        writeln!(f, "Features: {}", self.features)?;
        write_crs(f, "Source CRS", &self.source)?;
        write_crs(f, "Target CRS", &self.target)?;
        write!(f, "Operation: {}", self.operation)
    }
}
