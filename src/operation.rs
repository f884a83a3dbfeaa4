use crate::crs::{Crs, CrsId};
use crate::geometry::Coord;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum OperationError {
    #[error("Coordinate ({x}, {y}) is outside the domain of the operation")]
    OutOfDomain { x: f64, y: f64 },
    #[error("The operation produced a non-finite coordinate from ({x}, {y})")]
    NonFinite { x: f64, y: f64 },
    #[error("The underlying coordinate operation failed: {0}")]
    Provider(String),
}

/// A concrete transform between two specific CRS.
pub trait CoordinateOperation: fmt::Debug {
    /// Human readable description, used in reports.
    fn name(&self) -> &str;

    /// Declared error estimate in metres, lower is better. `None` when unknown.
    fn precision(&self) -> Option<f64>;

    /// Map one coordinate. An output without `z` means the operation is
    /// two-dimensional; callers keep the input height in that case.
    fn transform(&self, coord: Coord) -> Result<Coord, OperationError>;
}

/// Source of candidate operations between two CRS.
pub trait OperationProvider {
    /// All known operations from `source` to `target`, in provider order.
    /// An empty list means no path exists.
    fn find_operations(
        &self,
        source: &Crs,
        target: &Crs,
    ) -> Result<Vec<Arc<dyn CoordinateOperation>>, OperationError>;
}

/// Pick the most precise operation from `source` to `target`.
///
/// Returns `Ok(None)` when the provider knows no path between the two CRS.
pub fn resolve(
    provider: &dyn OperationProvider,
    source: &Crs,
    target: &Crs,
) -> Result<Option<Arc<dyn CoordinateOperation>>, OperationError> {
    let candidates = provider.find_operations(source, target)?;
    log::debug!(
        "{} candidate operation(s) from {} to {}",
        candidates.len(),
        source.id(),
        target.id()
    );
    Ok(most_precise(candidates))
}

/// Lowest declared precision wins; unknown precision ranks last; ties keep the first.
pub fn most_precise(
    candidates: impl IntoIterator<Item = Arc<dyn CoordinateOperation>>,
) -> Option<Arc<dyn CoordinateOperation>> {
    candidates
        .into_iter()
        .min_by(|a, b| compare_precision(a.precision(), b.precision()))
}

fn compare_precision(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// An operation backed by a closure.
///
/// ```rust
/// use proj_batch::{Coord, CoordinateOperation, FnOperation};
///
/// let shift = FnOperation::new("shift", Some(0.0), |c: Coord| {
///     Ok(Coord { x: c.x + 10.0, ..c })
/// });
/// assert_eq!(shift.transform(Coord::new(1.0, 2.0)).unwrap(), Coord::new(11.0, 2.0));
/// ```
pub struct FnOperation<F> {
    name: String,
    precision: Option<f64>,
    f: F,
}

impl<F> FnOperation<F>
where
    F: Fn(Coord) -> Result<Coord, OperationError>,
{
    pub fn new(name: impl Into<String>, precision: Option<f64>, f: F) -> Self {
        FnOperation {
            name: name.into(),
            precision,
            f,
        }
    }
}

impl<F> fmt::Debug for FnOperation<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnOperation")
            .field("name", &self.name)
            .field("precision", &self.precision)
            .finish_non_exhaustive()
    }
}

impl<F> CoordinateOperation for FnOperation<F>
where
    F: Fn(Coord) -> Result<Coord, OperationError>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn precision(&self) -> Option<f64> {
        self.precision
    }

    fn transform(&self, coord: Coord) -> Result<Coord, OperationError> {
        (self.f)(coord)
    }
}

/// An in-memory provider: operations registered per `(source, target)` pair.
#[derive(Debug, Default)]
pub struct OperationTable {
    entries: Vec<(CrsId, CrsId, Arc<dyn CoordinateOperation>)>,
}

impl OperationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, source: CrsId, target: CrsId, operation: impl CoordinateOperation + 'static) {
        self.entries.push((source, target, Arc::new(operation)));
    }

    pub fn with(mut self, source: CrsId, target: CrsId, operation: impl CoordinateOperation + 'static) -> Self {
        self.insert(source, target, operation);
        self
    }
}

impl OperationProvider for OperationTable {
    fn find_operations(
        &self,
        source: &Crs,
        target: &Crs,
    ) -> Result<Vec<Arc<dyn CoordinateOperation>>, OperationError> {
        Ok(self
            .entries
            .iter()
            .filter(|(s, t, _)| s.matches(source.id()) && t.matches(target.id()))
            .map(|(_, _, op)| Arc::clone(op))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crs::{Datum, Ellipsoid};

    fn crs(code: u32) -> Crs {
        Crs::new(CrsId::epsg(code), format!("EPSG {code}"), Datum::new("D", Ellipsoid::wgs84()))
    }

    fn identity(
        name: &'static str,
        precision: Option<f64>,
    ) -> FnOperation<impl Fn(Coord) -> Result<Coord, OperationError>> {
        FnOperation::new(name, precision, |c: Coord| Ok(c))
    }

    #[test]
    fn test_resolve_picks_most_precise() {
        let table = OperationTable::new()
            .with(CrsId::epsg(4326), CrsId::epsg(2154), identity("ballpark", None))
            .with(CrsId::epsg(4326), CrsId::epsg(2154), identity("helmert", Some(1.0)))
            .with(CrsId::epsg(4326), CrsId::epsg(2154), identity("grid", Some(0.05)))
            .with(CrsId::epsg(4326), CrsId::epsg(2154), identity("grid-bis", Some(0.05)));
        let op = resolve(&table, &crs(4326), &crs(2154)).unwrap().unwrap();
        assert_eq!(op.name(), "grid");
    }

    #[test]
    fn test_resolve_unknown_precision_only() {
        let table = OperationTable::new()
            .with(CrsId::epsg(4326), CrsId::epsg(3857), identity("first", None))
            .with(CrsId::epsg(4326), CrsId::epsg(3857), identity("second", None));
        let op = resolve(&table, &crs(4326), &crs(3857)).unwrap().unwrap();
        assert_eq!(op.name(), "first");
    }

    #[test]
    fn test_resolve_no_path() {
        let table = OperationTable::new().with(CrsId::epsg(4326), CrsId::epsg(2154), identity("op", None));
        assert!(resolve(&table, &crs(2154), &crs(4326)).unwrap().is_none());
    }
}
