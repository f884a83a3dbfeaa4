use crate::crs::{CoordinateSystem, SridStyle};
use crate::geometry::Geometry;
use crate::layer::{LayerEvent, LayerId, LayerManager};
use crate::progress::ProgressSink;
use crate::view::Viewport;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    #[error("{0} no longer exists")]
    MissingLayer(LayerId),
    #[error("Layer {name} has {actual} features, the edit captured {expected}")]
    FeatureCountMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },
}

/// What an edit mutates when it runs, and where it reports to.
pub struct EditTarget<'a> {
    pub layers: &'a mut LayerManager,
    pub view: &'a mut dyn Viewport,
    pub progress: &'a mut dyn ProgressSink,
}

/// A two-sided mutation registered with an undo history.
pub trait UndoableEdit: fmt::Debug {
    fn name(&self) -> &str;

    fn execute(&self, target: &mut EditTarget<'_>) -> Result<(), EditError>;

    fn unexecute(&self, target: &mut EditTarget<'_>) -> Result<(), EditError>;
}

/// Host-side undo history.
pub trait UndoManager {
    fn register(&mut self, edit: Box<dyn UndoableEdit>);

    /// Forget every edit, undoable and redoable.
    fn discard_all(&mut self);
}

/// State of one layer captured before a reprojection.
///
/// `original` and `transformed` run parallel to the layer's features.
#[derive(Debug, Clone)]
pub struct LayerSnapshot {
    pub layer: LayerId,
    pub name: String,
    pub original: Vec<Arc<Geometry>>,
    pub transformed: Vec<Arc<Geometry>>,
    pub original_crs: Option<CoordinateSystem>,
    pub original_srid: Option<SridStyle>,
}

impl LayerSnapshot {
    pub fn len(&self) -> usize {
        self.original.len()
    }

    pub fn is_empty(&self) -> bool {
        self.original.is_empty()
    }
}

/// Moves a set of layers to a new CRS, or back.
#[derive(Debug, Clone)]
pub struct ReprojectionEdit {
    name: String,
    snapshots: Vec<LayerSnapshot>,
    target_crs: CoordinateSystem,
    target_srid: SridStyle,
}

#[derive(Clone, Copy)]
enum Direction {
    Forward,
    Backward,
}

impl ReprojectionEdit {
    pub fn new(name: impl Into<String>, snapshots: Vec<LayerSnapshot>, target_crs: CoordinateSystem) -> Self {
        // Layers whose new CRS has no EPSG code get the "unknown" SRID 0.
        let target_srid = SridStyle::new(target_crs.epsg_code().unwrap_or(0));
        ReprojectionEdit {
            name: name.into(),
            snapshots,
            target_crs,
            target_srid,
        }
    }

    pub fn snapshots(&self) -> &[LayerSnapshot] {
        &self.snapshots
    }

    pub fn target_crs(&self) -> &CoordinateSystem {
        &self.target_crs
    }

    pub fn target_srid(&self) -> SridStyle {
        self.target_srid
    }

    /// Every layer must still exist with the feature count seen at capture.
    fn validate(&self, layers: &LayerManager) -> Result<(), EditError> {
        for snapshot in &self.snapshots {
            let layer = layers
                .layer(snapshot.layer)
                .ok_or(EditError::MissingLayer(snapshot.layer))?;
            if layer.len() != snapshot.len() {
                return Err(EditError::FeatureCountMismatch {
                    name: snapshot.name.clone(),
                    expected: snapshot.len(),
                    actual: layer.len(),
                });
            }
        }
        Ok(())
    }

    fn apply(&self, target: &mut EditTarget<'_>, direction: Direction) -> Result<(), EditError> {
        self.validate(target.layers)?;
        {
            let mut layers = target.layers.suspend_events();
            for snapshot in &self.snapshots {
                let layer = layers
                    .layer_mut(snapshot.layer)
                    .ok_or(EditError::MissingLayer(snapshot.layer))?;
                let (geometries, srid, crs) = match direction {
                    Direction::Forward => (
                        &snapshot.transformed,
                        Some(self.target_srid),
                        Some(self.target_crs.clone()),
                    ),
                    Direction::Backward => (
                        &snapshot.original,
                        snapshot.original_srid,
                        snapshot.original_crs.clone(),
                    ),
                };
                target.progress.report(&format!("Replace {}", snapshot.name));
                layer.replace_geometries(geometries)?;
                layer.srid_style = srid;
                layer.crs = crs;
                layer.invalidate_envelope();
                layer.modified = true;
            }
        }
        for snapshot in &self.snapshots {
            target.layers.fire(LayerEvent::Reprojected(snapshot.layer));
        }
        let extent = target.layers.full_extent();
        if let Err(e) = target.view.zoom_to_full_extent(extent) {
            log::warn!("Could not refresh the view after {}: {e}", self.name);
        }
        Ok(())
    }
}

impl UndoableEdit for ReprojectionEdit {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&self, target: &mut EditTarget<'_>) -> Result<(), EditError> {
        self.apply(target, Direction::Forward)
    }

    fn unexecute(&self, target: &mut EditTarget<'_>) -> Result<(), EditError> {
        self.apply(target, Direction::Backward)
    }
}

/// A bounded linear undo/redo history.
///
/// Registering a new edit clears the redo side; the oldest edit is dropped,
/// along with whatever state it captured, once `limit` is exceeded.
#[derive(Debug)]
pub struct UndoHistory {
    undo: VecDeque<Box<dyn UndoableEdit>>,
    redo: Vec<Box<dyn UndoableEdit>>,
    limit: usize,
}

impl Default for UndoHistory {
    fn default() -> Self {
        UndoHistory::new(100)
    }
}

impl UndoHistory {
    pub fn new(limit: usize) -> Self {
        UndoHistory {
            undo: VecDeque::new(),
            redo: Vec::new(),
            limit: limit.max(1),
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    /// Name of the edit the next [`UndoHistory::undo`] would revert.
    pub fn undo_name(&self) -> Option<&str> {
        self.undo.back().map(|edit| edit.name())
    }

    /// Revert the most recent edit. Returns `Ok(false)` when there is nothing to undo.
    ///
    /// A failing edit cannot be trusted on either stack, so the history is discarded.
    pub fn undo(&mut self, target: &mut EditTarget<'_>) -> Result<bool, EditError> {
        let Some(edit) = self.undo.pop_back() else {
            return Ok(false);
        };
        if let Err(e) = edit.unexecute(target) {
            self.discard_all();
            return Err(e);
        }
        log::info!("Undid {}", edit.name());
        self.redo.push(edit);
        Ok(true)
    }

    /// Re-apply the most recently undone edit. Returns `Ok(false)` when there is nothing to redo.
    pub fn redo(&mut self, target: &mut EditTarget<'_>) -> Result<bool, EditError> {
        let Some(edit) = self.redo.pop() else {
            return Ok(false);
        };
        if let Err(e) = edit.execute(target) {
            self.discard_all();
            return Err(e);
        }
        log::info!("Redid {}", edit.name());
        self.undo.push_back(edit);
        Ok(true)
    }
}

impl UndoManager for UndoHistory {
    fn register(&mut self, edit: Box<dyn UndoableEdit>) {
        self.redo.clear();
        self.undo.push_back(edit);
        while self.undo.len() > self.limit {
            if let Some(evicted) = self.undo.pop_front() {
                log::debug!("Evicted {} from undo history", evicted.name());
            }
        }
    }

    fn discard_all(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crs::{Crs, CrsId, Datum, Ellipsoid};
    use crate::progress::NullProgress;
    use crate::view::{NullViewport, ViewError};
    use geo_types::Rect;

    struct FailingViewport {
        calls: usize,
    }

    impl Viewport for FailingViewport {
        fn zoom_to_full_extent(&mut self, _extent: Option<Rect<f64>>) -> Result<(), ViewError> {
            self.calls += 1;
            Err(ViewError::NoninvertibleTransform)
        }
    }

    fn crs(code: u32) -> CoordinateSystem {
        CoordinateSystem::defined(Crs::new(
            CrsId::epsg(code),
            format!("EPSG {code}"),
            Datum::new("D", Ellipsoid::wgs84()),
        ))
    }

    fn fixture() -> (LayerManager, LayerId, ReprojectionEdit) {
        let mut layers = LayerManager::new();
        let id = layers.add_layer("cities");
        let layer = layers.layer_mut(id).unwrap();
        layer.crs = Some(crs(4326));
        layer.add_feature(Geometry::point(2.35, 48.85).with_srid(4326));
        layer.add_feature(Geometry::point(4.83, 45.76).with_srid(4326));
        let original: Vec<_> = layer.geometries().cloned().collect();
        let transformed = original
            .iter()
            .map(|g| {
                let mut moved = g.as_ref().clone();
                moved.srid = Some(3857);
                if let crate::geometry::Shape::Point(c) = &mut moved.shape {
                    c.x *= 1000.;
                }
                Arc::new(moved)
            })
            .collect();
        let snapshot = LayerSnapshot {
            layer: id,
            name: "cities".to_string(),
            original,
            transformed,
            original_crs: Some(crs(4326)),
            original_srid: None,
        };
        (layers, id, ReprojectionEdit::new("reproject", vec![snapshot], crs(3857)))
    }

    #[test]
    fn test_execute_then_unexecute_restores_same_geometries() {
        let (mut layers, id, edit) = fixture();
        let before: Vec<_> = layers.layer(id).unwrap().geometries().cloned().collect();
        let mut view = NullViewport;
        let mut target = EditTarget {
            layers: &mut layers,
            view: &mut view,
            progress: &mut NullProgress,
        };

        edit.execute(&mut target).unwrap();
        let layer = target.layers.layer(id).unwrap();
        assert_eq!(layer.crs.as_ref().unwrap().epsg_code(), Ok(3857));
        assert_eq!(layer.srid_style, Some(SridStyle::new(3857)));
        assert!(layer.modified);
        assert!(Arc::ptr_eq(layer.features()[0].geometry(), &edit.snapshots()[0].transformed[0]));

        edit.unexecute(&mut target).unwrap();
        let layer = target.layers.layer(id).unwrap();
        for (geometry, original) in layer.geometries().zip(&before) {
            assert!(Arc::ptr_eq(geometry, original));
        }
        assert_eq!(layer.crs.as_ref().unwrap().epsg_code(), Ok(4326));
        assert_eq!(layer.srid_style, None);
    }

    #[test]
    fn test_count_mismatch_leaves_layers_untouched() {
        let (mut layers, id, edit) = fixture();
        layers.layer_mut(id).unwrap().add_feature(Geometry::point(0., 0.));
        let mut view = NullViewport;
        let mut target = EditTarget {
            layers: &mut layers,
            view: &mut view,
            progress: &mut NullProgress,
        };
        let err = edit.execute(&mut target).unwrap_err();
        assert_eq!(
            err,
            EditError::FeatureCountMismatch {
                name: "cities".to_string(),
                expected: 2,
                actual: 3
            }
        );
        let layer = layers.layer(id).unwrap();
        assert_eq!(layer.crs.as_ref().unwrap().epsg_code(), Ok(4326));
        assert!(!layer.modified);
        assert!(layers.is_firing_events());
    }

    #[test]
    fn test_view_failure_is_not_escalated() {
        let (mut layers, _, edit) = fixture();
        let mut view = FailingViewport { calls: 0 };
        let mut target = EditTarget {
            layers: &mut layers,
            view: &mut view,
            progress: &mut NullProgress,
        };
        assert!(edit.execute(&mut target).is_ok());
        assert_eq!(view.calls, 1);
    }

    #[test]
    fn test_history_undo_redo_and_eviction() {
        let (mut layers, id, edit) = fixture();
        let mut view = NullViewport;
        let mut history = UndoHistory::new(2);
        let mut target = EditTarget {
            layers: &mut layers,
            view: &mut view,
            progress: &mut NullProgress,
        };
        edit.execute(&mut target).unwrap();
        history.register(Box::new(edit));
        assert_eq!(history.undo_name(), Some("reproject"));

        assert!(history.undo(&mut target).unwrap());
        assert!(!history.undo(&mut target).unwrap());
        assert_eq!(
            target.layers.layer(id).unwrap().crs.as_ref().unwrap().epsg_code(),
            Ok(4326)
        );
        assert!(history.redo(&mut target).unwrap());
        assert_eq!(
            target.layers.layer(id).unwrap().crs.as_ref().unwrap().epsg_code(),
            Ok(3857)
        );

        for _ in 0..3 {
            let (_, _, edit) = fixture();
            history.register(Box::new(edit));
        }
        assert_eq!(history.undo_len(), 2);
        assert!(!history.can_redo());
        history.discard_all();
        assert!(!history.can_undo());
    }
}
