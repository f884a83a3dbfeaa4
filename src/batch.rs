use crate::config::ReprojectionConfig;
use crate::consistency::{self, HeterogeneousSourceError};
use crate::crs::{CoordinateSystem, CrsId};
use crate::edit::{EditError, EditTarget, LayerSnapshot, ReprojectionEdit, UndoManager, UndoableEdit};
use crate::layer::{FeatureId, FeatureLayer, LayerId, LayerManager};
use crate::operation::{self, OperationError, OperationProvider};
use crate::progress::ProgressSink;
use crate::registry::{RegistryError, RegistryManager};
use crate::report::ReprojectionReport;
use crate::transform::{GeometryReprojector, TransformError};
use crate::view::Viewport;
use std::sync::Arc;
use thiserror::Error;

/// Features reprojected between two intra-layer progress reports.
pub const PROGRESS_INTERVAL: usize = 100;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("Invalid source CRS: no code selected")]
    MissingSourceCode,
    #[error("Invalid target CRS: no code selected")]
    MissingTargetCode,
    #[error("At least 1 layer must be selected")]
    NoLayers,
    #[error("{0} is not a known layer")]
    UnknownLayer(LayerId),
    #[error("{0} is selected more than once")]
    DuplicateLayer(LayerId),
    #[error("Layer {0} is not editable")]
    NotEditable(String),
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

#[derive(Error, Debug)]
pub enum ReprojectError {
    #[error(transparent)]
    Selection(#[from] SelectionError),
    #[error("No coordinate operation found from {from} to {to}")]
    OperationNotFound { from: CrsId, to: CrsId },
    #[error(transparent)]
    HeterogeneousSources(#[from] HeterogeneousSourceError),
    #[error("The operation provider failed: {0}")]
    Provider(#[from] OperationError),
    #[error("Cannot reproject feature {feature:?} of layer {layer}: {error}")]
    Transform {
        layer: String,
        feature: FeatureId,
        #[source]
        error: TransformError,
    },
    #[error("Applying the reprojection failed, undo history was discarded: {0}")]
    Apply(#[from] EditError),
    #[error("This batch has already run")]
    AlreadyRun,
}

impl ReprojectError {
    /// Conditions to report to the user, as opposed to defects. None of them
    /// leave any layer modified.
    pub fn is_user_condition(&self) -> bool {
        matches!(
            self,
            ReprojectError::Selection(_)
                | ReprojectError::OperationNotFound { .. }
                | ReprojectError::HeterogeneousSources(_)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Resolving,
    Checking,
    Capturing,
    Applying,
    Committed,
    Failed,
}

#[derive(Debug, Clone)]
pub enum Outcome {
    /// Source and target are the same CRS; nothing was touched.
    NoOp,
    Committed(ReprojectionReport),
}

/// Host collaborators a batch runs against.
pub struct BatchContext<'a> {
    pub layers: &'a mut LayerManager,
    pub undo: &'a mut dyn UndoManager,
    pub view: &'a mut dyn Viewport,
    pub progress: &'a mut dyn ProgressSink,
}

/// One reprojection of a layer selection, from CRS lookup to undo registration.
///
/// ```rust
/// use proj_batch::*;
///
/// let registries = RegistryManager::new().with_registry(
///     StaticRegistry::new(EPSG)
///         .with(Crs::new(CrsId::epsg(4326), "WGS 84", Datum::new("WGS_1984", Ellipsoid::wgs84())))
///         .with(Crs::new(CrsId::epsg(3857), "Pseudo-Mercator", Datum::new("WGS_1984", Ellipsoid::wgs84()))),
/// );
/// let provider = OperationTable::new().with(
///     CrsId::epsg(4326),
///     CrsId::epsg(3857),
///     FnOperation::new("double", Some(1.0), |c: Coord| Ok(Coord { x: c.x * 2.0, y: c.y * 2.0, ..c })),
/// );
///
/// let mut layers = LayerManager::new();
/// let id = layers.add_layer("cities");
/// layers.layer_mut(id).unwrap().add_feature(Geometry::point(1.0, 2.0));
///
/// let config = ReprojectionConfig::builder()
///     .source_code("4326")
///     .target_code("3857")
///     .layer(id)
///     .build();
/// let mut history = UndoHistory::default();
/// let mut batch = ReprojectionBatch::new(&registries, &provider, config);
/// batch
///     .run(BatchContext {
///         layers: &mut layers,
///         undo: &mut history,
///         view: &mut NullViewport,
///         progress: &mut NullProgress,
///     })
///     .unwrap();
///
/// assert_eq!(batch.phase(), Phase::Committed);
/// let geometry = layers.layer(id).unwrap().features()[0].geometry().clone();
/// assert_eq!(*geometry, Geometry::point(2.0, 4.0).with_srid(3857));
/// assert!(history.can_undo());
/// ```
pub struct ReprojectionBatch<'r> {
    registries: &'r RegistryManager,
    provider: &'r dyn OperationProvider,
    config: ReprojectionConfig,
    phase: Phase,
}

fn enter(phase: &mut Phase, next: Phase) {
    log::debug!("{phase:?} -> {next:?}");
    *phase = next;
}

impl<'r> ReprojectionBatch<'r> {
    pub fn new(
        registries: &'r RegistryManager,
        provider: &'r dyn OperationProvider,
        config: ReprojectionConfig,
    ) -> Self {
        ReprojectionBatch {
            registries,
            provider,
            config,
            phase: Phase::Idle,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn config(&self) -> &ReprojectionConfig {
        &self.config
    }

    /// Run the batch. A batch runs at most once.
    ///
    /// Identical source and target codes short-circuit to [`Outcome::NoOp`]
    /// before the layer selection is even looked at.
    ///
    /// On any error before [`Phase::Applying`] no layer has been touched. An
    /// error while applying discards the host undo history before returning.
    pub fn run(&mut self, ctx: BatchContext<'_>) -> Result<Outcome, ReprojectError> {
        if self.phase != Phase::Idle {
            return Err(ReprojectError::AlreadyRun);
        }
        let result = self.run_phases(ctx);
        if let Err(e) = &result {
            if e.is_user_condition() {
                log::warn!("{e}");
            } else {
                log::error!("Reprojection failed during {:?}: {e}", self.phase);
            }
            self.phase = Phase::Failed;
        }
        result
    }

    fn run_phases(&mut self, ctx: BatchContext<'_>) -> Result<Outcome, ReprojectError> {
        let ReprojectionBatch {
            registries,
            provider,
            config,
            phase,
        } = self;
        let BatchContext {
            layers,
            undo,
            view,
            progress,
        } = ctx;

        let source_code = config
            .source_code
            .as_deref()
            .ok_or(SelectionError::MissingSourceCode)?;
        let target_code = config
            .target_code
            .as_deref()
            .ok_or(SelectionError::MissingTargetCode)?;
        if source_code == target_code {
            log::info!("Source and target are both {}:{source_code}, nothing to do", config.authority);
            enter(phase, Phase::Committed);
            return Ok(Outcome::NoOp);
        }
        validate_selection(layers, &config.layers)?;

        enter(phase, Phase::Resolving);
        let source = registries
            .resolve(&config.authority, source_code)
            .map_err(SelectionError::from)?;
        let target = registries
            .resolve(&config.authority, target_code)
            .map_err(SelectionError::from)?;
        let Some(operation) = operation::resolve(*provider, &source, &target)? else {
            return Err(ReprojectError::OperationNotFound {
                from: source.id().clone(),
                to: target.id().clone(),
            });
        };
        log::debug!("Selected operation {}", operation.name());

        let snapshots = {
            enter(phase, Phase::Checking);
            let selected = selected_layers(layers, &config.layers)?;
            consistency::check(&selected)?;

            enter(phase, Phase::Capturing);
            let reprojector = GeometryReprojector::new(operation.as_ref(), &target);
            capture(&selected, &reprojector, progress)?
        };

        enter(phase, Phase::Applying);
        let report = ReprojectionReport {
            layers: snapshots.iter().map(|s| s.name.clone()).collect(),
            source: Arc::clone(&source),
            target: Arc::clone(&target),
            operation: operation.name().to_string(),
            features: snapshots.iter().map(LayerSnapshot::len).sum(),
        };
        let edit = ReprojectionEdit::new(
            config.edit_name.clone(),
            snapshots,
            CoordinateSystem::Defined(Arc::clone(&target)),
        );
        let mut edit_target = EditTarget {
            layers,
            view,
            progress,
        };
        if let Err(e) = edit.execute(&mut edit_target) {
            undo.discard_all();
            return Err(e.into());
        }
        undo.register(Box::new(edit));

        enter(phase, Phase::Committed);
        log::info!(
            "Reprojected {} feature(s) in {} layer(s) from {} to {}",
            report.features,
            report.layers.len(),
            source.id(),
            target.id()
        );
        Ok(Outcome::Committed(report))
    }
}

fn validate_selection(layers: &LayerManager, selection: &[LayerId]) -> Result<(), SelectionError> {
    if selection.is_empty() {
        return Err(SelectionError::NoLayers);
    }
    for (i, id) in selection.iter().enumerate() {
        if selection[..i].contains(id) {
            return Err(SelectionError::DuplicateLayer(*id));
        }
        let layer = layers.layer(*id).ok_or(SelectionError::UnknownLayer(*id))?;
        if !layer.editable {
            return Err(SelectionError::NotEditable(layer.name().to_string()));
        }
    }
    Ok(())
}

fn selected_layers<'l>(
    layers: &'l LayerManager,
    selection: &[LayerId],
) -> Result<Vec<&'l FeatureLayer>, SelectionError> {
    selection
        .iter()
        .map(|id| layers.layer(*id).ok_or(SelectionError::UnknownLayer(*id)))
        .collect()
}

/// Reproject every feature of every selected layer into snapshots, leaving
/// the layers themselves untouched.
fn capture(
    selected: &[&FeatureLayer],
    reprojector: &GeometryReprojector<'_>,
    progress: &mut dyn ProgressSink,
) -> Result<Vec<LayerSnapshot>, ReprojectError> {
    let mut snapshots = Vec::with_capacity(selected.len());
    for layer in selected {
        progress.report(&format!("Transform {}", layer.name()));
        let total = layer.len();
        let mut original = Vec::with_capacity(total);
        let mut transformed = Vec::with_capacity(total);
        for (i, feature) in layer.features().iter().enumerate() {
            let geometry = reprojector
                .reproject(feature.geometry())
                .map_err(|error| ReprojectError::Transform {
                    layer: layer.name().to_string(),
                    feature: feature.id(),
                    error,
                })?;
            original.push(Arc::clone(feature.geometry()));
            transformed.push(Arc::new(geometry));
            let count = i + 1;
            if count % PROGRESS_INTERVAL == 0 {
                progress.report_progress(count, total, "");
            }
        }
        if total % PROGRESS_INTERVAL != 0 {
            progress.report_progress(total, total, "");
        }
        snapshots.push(LayerSnapshot {
            layer: layer.id(),
            name: layer.name().to_string(),
            original,
            transformed,
            original_crs: layer.crs.clone(),
            original_srid: layer.srid_style,
        });
    }
    Ok(snapshots)
}
