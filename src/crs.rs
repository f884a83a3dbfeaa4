use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Authority name of the EPSG geodetic parameter dataset.
pub const EPSG: &str = "EPSG";
/// Authority name of the IGN France registry.
pub const IGNF: &str = "IGNF";

/// An `AUTHORITY:CODE` pair identifying a CRS in a registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CrsId {
    authority: String,
    code: String,
}

impl CrsId {
    pub fn new(authority: impl Into<String>, code: impl Into<String>) -> Self {
        CrsId {
            authority: authority.into(),
            code: code.into(),
        }
    }

    pub fn epsg(code: u32) -> Self {
        CrsId::new(EPSG, code.to_string())
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    /// Authority names compare case-insensitively, codes exactly.
    pub fn matches(&self, other: &CrsId) -> bool {
        self.authority.eq_ignore_ascii_case(&other.authority) && self.code == other.code
    }

    /// The numeric EPSG code, if this id belongs to the EPSG authority.
    pub fn epsg_code(&self) -> Option<u32> {
        if self.authority.eq_ignore_ascii_case(EPSG) {
            self.code.parse().ok()
        } else {
            None
        }
    }
}

impl fmt::Display for CrsId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.authority, self.code)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ellipsoid {
    pub name: String,
    /// Semi-major axis in metres.
    pub semi_major_axis: f64,
    /// Zero for a sphere.
    pub inverse_flattening: f64,
}

impl Ellipsoid {
    pub fn wgs84() -> Self {
        Ellipsoid {
            name: "WGS 84".to_string(),
            semi_major_axis: 6_378_137.0,
            inverse_flattening: 298.257_223_563,
        }
    }

    pub fn grs80() -> Self {
        Ellipsoid {
            name: "GRS 1980".to_string(),
            semi_major_axis: 6_378_137.0,
            inverse_flattening: 298.257_222_101,
        }
    }
}

impl fmt::Display for Ellipsoid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (a={}, 1/f={})",
            self.name, self.semi_major_axis, self.inverse_flattening
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Datum {
    pub name: String,
    pub ellipsoid: Ellipsoid,
    /// Seven-parameter Helmert shift to WGS 84, if the datum declares one.
    pub to_wgs84: Option<[f64; 7]>,
}

impl Datum {
    pub fn new(name: impl Into<String>, ellipsoid: Ellipsoid) -> Self {
        Datum {
            name: name.into(),
            ellipsoid,
            to_wgs84: None,
        }
    }

    pub fn with_to_wgs84(mut self, params: [f64; 7]) -> Self {
        self.to_wgs84 = Some(params);
        self
    }
}

impl fmt::Display for Datum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    /// Projection method, e.g. `Lambert_Conformal_Conic_2SP`.
    pub method: String,
    /// Full definition as provided by the registry (WKT or a PROJ string).
    pub definition: String,
}

/// A resolved coordinate reference system.
///
/// Immutable once built: hosts share it behind an `Arc`.
#[derive(Debug, Clone, PartialEq)]
pub struct Crs {
    id: CrsId,
    name: String,
    datum: Datum,
    projection: Option<Projection>,
}

impl Crs {
    pub fn new(id: CrsId, name: impl Into<String>, datum: Datum) -> Self {
        Crs {
            id,
            name: name.into(),
            datum,
            projection: None,
        }
    }

    pub fn with_projection(mut self, method: impl Into<String>, definition: impl Into<String>) -> Self {
        self.projection = Some(Projection {
            method: method.into(),
            definition: definition.into(),
        });
        self
    }

    pub fn id(&self) -> &CrsId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn datum(&self) -> &Datum {
        &self.datum
    }

    pub fn ellipsoid(&self) -> &Ellipsoid {
        &self.datum.ellipsoid
    }

    pub fn projection(&self) -> Option<&Projection> {
        self.projection.as_ref()
    }

    pub fn epsg_code(&self) -> Option<u32> {
        self.id.epsg_code()
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.id, self.name)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EpsgLookupError {
    #[error("The unspecified coordinate system has no EPSG code")]
    Unspecified,
    #[error("{0} is not an EPSG coordinate reference system")]
    NotEpsg(CrsId),
}

/// CRS metadata carried by a feature layer.
#[derive(Debug, Clone)]
pub enum CoordinateSystem {
    /// Explicit "no known CRS" sentinel, distinct from a layer with no CRS at all.
    Unspecified,
    Defined(Arc<Crs>),
}

impl CoordinateSystem {
    pub fn defined(crs: Crs) -> Self {
        CoordinateSystem::Defined(Arc::new(crs))
    }

    pub fn is_unspecified(&self) -> bool {
        matches!(self, CoordinateSystem::Unspecified)
    }

    pub fn crs(&self) -> Option<&Arc<Crs>> {
        match self {
            CoordinateSystem::Unspecified => None,
            CoordinateSystem::Defined(crs) => Some(crs),
        }
    }

    /// Reference-or-identity equality: the same shared CRS, or CRS with matching ids.
    pub fn is_same(&self, other: &CoordinateSystem) -> bool {
        match (self, other) {
            (CoordinateSystem::Unspecified, CoordinateSystem::Unspecified) => true,
            (CoordinateSystem::Defined(a), CoordinateSystem::Defined(b)) => {
                Arc::ptr_eq(a, b) || a.id().matches(b.id())
            }
            _ => false,
        }
    }

    pub fn epsg_code(&self) -> Result<u32, EpsgLookupError> {
        match self {
            CoordinateSystem::Unspecified => Err(EpsgLookupError::Unspecified),
            CoordinateSystem::Defined(crs) => crs
                .epsg_code()
                .ok_or_else(|| EpsgLookupError::NotEpsg(crs.id().clone())),
        }
    }
}

impl fmt::Display for CoordinateSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoordinateSystem::Unspecified => f.write_str("Unspecified"),
            CoordinateSystem::Defined(crs) => crs.fmt(f),
        }
    }
}

/// Auxiliary SRID display tag of a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SridStyle {
    pub srid: u32,
}

impl SridStyle {
    pub fn new(srid: u32) -> Self {
        SridStyle { srid }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wgs84() -> Crs {
        Crs::new(
            CrsId::epsg(4326),
            "WGS 84",
            Datum::new("World Geodetic System 1984", Ellipsoid::wgs84()),
        )
    }

    #[test]
    fn test_epsg_code() {
        assert_eq!(CrsId::epsg(2154).epsg_code(), Some(2154));
        assert_eq!(CrsId::new("epsg", "4326").epsg_code(), Some(4326));
        assert_eq!(CrsId::new(IGNF, "LAMB93").epsg_code(), None);
        assert_eq!(CrsId::new(EPSG, "not-a-number").epsg_code(), None);
    }

    #[test]
    fn test_same_coordinate_system() {
        let shared = CoordinateSystem::defined(wgs84());
        let copy = CoordinateSystem::defined(wgs84());
        assert!(shared.is_same(&shared.clone()));
        assert!(shared.is_same(&copy));
        assert!(CoordinateSystem::Unspecified.is_same(&CoordinateSystem::Unspecified));
        assert!(!shared.is_same(&CoordinateSystem::Unspecified));
    }

    #[test]
    fn test_epsg_lookup_failures() {
        assert_eq!(
            CoordinateSystem::Unspecified.epsg_code(),
            Err(EpsgLookupError::Unspecified)
        );
        let ignf = CoordinateSystem::defined(Crs::new(
            CrsId::new(IGNF, "LAMB93"),
            "Lambert 93",
            Datum::new("RGF93", Ellipsoid::grs80()),
        ));
        assert!(matches!(ignf.epsg_code(), Err(EpsgLookupError::NotEpsg(_))));
        assert_eq!(CoordinateSystem::defined(wgs84()).epsg_code(), Ok(4326));
    }
}
