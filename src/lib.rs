#![doc(html_logo_url = "https://raw.githubusercontent.com/georust/meta/master/logo/logo.png")]
//! `proj-batch` reprojects every geometry of a selection of vector feature
//! layers from one coordinate reference system (CRS) to another, as a single
//! undoable edit.
//!
//! The per-point math is not done here: it comes from an
//! [`OperationProvider`], typically [PROJ](https://proj.org) (see the `proj`
//! feature). What this crate provides is the transaction around it:
//!
//! 1. the most precise [`CoordinateOperation`] between the two CRS is picked
//!    ([`operation::resolve`]);
//! 2. the selected layers are checked to actually share a source CRS
//!    ([`consistency::check`]), since reprojecting from the wrong CRS does not
//!    fail, it just produces wrong coordinates;
//! 3. every feature geometry is reprojected into a structurally identical copy
//!    ([`GeometryReprojector`]) while the layers stay untouched;
//! 4. the copies are swapped in by a [`ReprojectionEdit`], registered with an
//!    [`UndoManager`] so the whole batch can be undone and redone.
//!
//! Steps 1 to 3 fail without modifying anything. Step 4 checks every layer
//! before swapping any of them.
//!
//! # Usage
//!
//! A host provides its CRS catalog ([`RegistryManager`] of [`CrsRegistry`]),
//! an operation provider, its layers ([`LayerManager`]), an undo history, a
//! [`Viewport`] and a [`ProgressSink`], then runs one [`ReprojectionBatch`]
//! per user request, configured by a [`ReprojectionConfig`].
//!
//! ```
//! use proj_batch::*;
//!
//! let wgs84 = Datum::new("WGS_1984", Ellipsoid::wgs84());
//! let registries = RegistryManager::new().with_registry(
//!     StaticRegistry::new(EPSG)
//!         .with(Crs::new(CrsId::epsg(4326), "WGS 84", wgs84.clone()))
//!         .with(Crs::new(CrsId::epsg(32631), "WGS 84 / UTM zone 31N", wgs84)),
//! );
//! // Stand-in for a real projection.
//! let provider = OperationTable::new().with(
//!     CrsId::epsg(4326),
//!     CrsId::epsg(32631),
//!     FnOperation::new("toy projection", Some(1.0), |c: Coord| {
//!         Ok(Coord::new(c.x * 100_000.0, c.y * 100_000.0))
//!     }),
//! );
//!
//! let mut layers = LayerManager::new();
//! let roads = layers.add_layer("roads");
//! let layer = layers.layer_mut(roads).unwrap();
//! layer.crs = Some(CoordinateSystem::Defined(registries.resolve(EPSG, "4326").unwrap()));
//! layer.add_feature(Geometry::new(Shape::LineString(
//!     [(2.0, 48.0, 35.0), (2.5, 48.5, 40.0)].into_iter().collect(),
//! )));
//!
//! let config = ReprojectionConfig::builder()
//!     .source_code(suggest_source_code(&layers, &[roads]).unwrap())
//!     .target_code("32631")
//!     .layer(roads)
//!     .build();
//! let mut history = UndoHistory::default();
//! let mut view = NullViewport;
//!
//! let outcome = ReprojectionBatch::new(&registries, &provider, config)
//!     .run(BatchContext {
//!         layers: &mut layers,
//!         undo: &mut history,
//!         view: &mut view,
//!         progress: &mut LogProgress::default(),
//!     })
//!     .unwrap();
//! let Outcome::Committed(report) = outcome else { unreachable!() };
//! assert_eq!(report.features, 1);
//!
//! let layer = layers.layer(roads).unwrap();
//! assert_eq!(layer.srid_style, Some(SridStyle::new(32631)));
//! assert_eq!(layer.features()[0].geometry().num_coords(), 2);
//!
//! // One undo step reverts the whole batch.
//! history
//!     .undo(&mut EditTarget {
//!         layers: &mut layers,
//!         view: &mut view,
//!         progress: &mut NullProgress,
//!     })
//!     .unwrap();
//! let layer = layers.layer(roads).unwrap();
//! assert_eq!(layer.crs.as_ref().unwrap().epsg_code(), Ok(4326));
//! assert_eq!(layer.srid_style, None);
//! ```
//!
//! # Features
//!
//! - `proj`: [`ProjProvider`], an operation provider built on the `proj` crate.
//!   Requires `libproj`, or `bundled_proj` to build it from source.
//! - `serde`: `Serialize`/`Deserialize` for [`ReprojectionConfig`], [`CrsId`]
//!   and [`LayerId`].
//!
//! # Logging
//!
//! Diagnostics go through the [`log`](https://docs.rs/log) facade; the host
//! installs the logger.

pub mod batch;
pub mod config;
pub mod consistency;
pub mod crs;
pub mod edit;
mod geo_types;
pub mod geometry;
pub mod layer;
pub mod operation;
pub mod progress;
#[cfg(feature = "proj")]
mod proj_provider;
pub mod registry;
pub mod report;
pub mod transform;
pub mod view;

pub use crate::batch::{
    BatchContext, Outcome, PROGRESS_INTERVAL, Phase, ReprojectError, ReprojectionBatch,
    SelectionError,
};
pub use crate::config::{ReprojectionConfig, ReprojectionConfigBuilder, suggest_source_code};
pub use crate::consistency::{HeterogeneousSourceError, Mismatch};
pub use crate::crs::{
    CoordinateSystem, Crs, CrsId, Datum, EPSG, Ellipsoid, EpsgLookupError, IGNF, Projection,
    SridStyle,
};
pub use crate::edit::{
    EditError, EditTarget, LayerSnapshot, ReprojectionEdit, UndoHistory, UndoManager, UndoableEdit,
};
pub use crate::geometry::{Coord, Geometry, LineString, Polygon, Shape};
pub use crate::layer::{
    Feature, FeatureId, FeatureLayer, LayerEvent, LayerId, LayerManager, SuspendedEvents,
};
pub use crate::operation::{
    CoordinateOperation, FnOperation, OperationError, OperationProvider, OperationTable,
};
pub use crate::progress::{LogProgress, NullProgress, ProgressSink};
#[cfg(feature = "proj")]
pub use crate::proj_provider::{ProjOperation, ProjProvider};
pub use crate::registry::{CrsRegistry, RegistryError, RegistryManager, StaticRegistry};
pub use crate::report::ReprojectionReport;
pub use crate::transform::{GeometryReprojector, Reproject, TransformError, VertexTransformer};
pub use crate::view::{NullViewport, ViewError, Viewport};
