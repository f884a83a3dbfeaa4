use crate::crs::{CoordinateSystem, SridStyle};
use crate::edit::EditError;
use crate::geometry::Geometry;
use geo_types::{Rect, coord};
use indexmap::IndexMap;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LayerId(pub u64);

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "layer#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FeatureId(pub u64);

/// A record owning exactly one geometry.
///
/// Geometries are immutable shared values: replacing one swaps the `Arc`, and
/// anyone still holding the previous value (an undo snapshot) keeps it intact.
#[derive(Debug, Clone)]
pub struct Feature {
    id: FeatureId,
    geometry: Arc<Geometry>,
}

impl Feature {
    pub fn new(id: FeatureId, geometry: impl Into<Arc<Geometry>>) -> Self {
        Feature {
            id,
            geometry: geometry.into(),
        }
    }

    pub fn id(&self) -> FeatureId {
        self.id
    }

    pub fn geometry(&self) -> &Arc<Geometry> {
        &self.geometry
    }

    /// Replace the geometry, returning the retired one.
    pub fn set_geometry(&mut self, geometry: Arc<Geometry>) -> Arc<Geometry> {
        std::mem::replace(&mut self.geometry, geometry)
    }
}

#[derive(Debug, Clone)]
pub struct FeatureLayer {
    id: LayerId,
    name: String,
    features: Vec<Feature>,
    next_feature: u64,
    /// CRS of the feature schema; `None` when the layer carries no CRS at all.
    pub crs: Option<CoordinateSystem>,
    pub srid_style: Option<SridStyle>,
    pub modified: bool,
    pub editable: bool,
    envelope: Option<Option<Rect<f64>>>,
}

impl FeatureLayer {
    fn new(id: LayerId, name: String) -> Self {
        FeatureLayer {
            id,
            name,
            features: Vec::new(),
            next_feature: 0,
            crs: None,
            srid_style: None,
            modified: false,
            editable: true,
            envelope: None,
        }
    }

    pub fn id(&self) -> LayerId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn add_feature(&mut self, geometry: impl Into<Arc<Geometry>>) -> FeatureId {
        let id = FeatureId(self.next_feature);
        self.next_feature += 1;
        self.features.push(Feature::new(id, geometry));
        self.invalidate_envelope();
        id
    }

    pub fn geometries(&self) -> impl Iterator<Item = &Arc<Geometry>> {
        self.features.iter().map(Feature::geometry)
    }

    /// Swap in one geometry per feature, in feature order.
    ///
    /// Fails, leaving the layer untouched, when the count does not match the
    /// number of features.
    pub fn replace_geometries(&mut self, geometries: &[Arc<Geometry>]) -> Result<(), EditError> {
        if geometries.len() != self.features.len() {
            return Err(EditError::FeatureCountMismatch {
                name: self.name.clone(),
                expected: geometries.len(),
                actual: self.features.len(),
            });
        }
        for (feature, geometry) in self.features.iter_mut().zip(geometries) {
            feature.set_geometry(Arc::clone(geometry));
        }
        Ok(())
    }

    pub fn invalidate_envelope(&mut self) {
        self.envelope = None;
    }

    /// Union of the feature bounding rectangles, computed on demand and cached
    /// until the next invalidation.
    pub fn envelope(&mut self) -> Option<Rect<f64>> {
        if let Some(envelope) = self.envelope {
            return envelope;
        }
        let envelope = union_rects(self.geometries().filter_map(|g| g.bounding_rect()));
        self.envelope = Some(envelope);
        envelope
    }
}

pub(crate) fn union_rects(rects: impl IntoIterator<Item = Rect<f64>>) -> Option<Rect<f64>> {
    rects.into_iter().reduce(|a, b| {
        Rect::new(
            coord! { x: a.min().x.min(b.min().x), y: a.min().y.min(b.min().y) },
            coord! { x: a.max().x.max(b.max().x), y: a.max().y.max(b.max().y) },
        )
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerEvent {
    Added(LayerId),
    /// Geometries and CRS metadata of a layer were replaced wholesale.
    Reprojected(LayerId),
}

type Listener = Box<dyn FnMut(&LayerEvent)>;

/// Owns the layers of a session and dispatches change notifications.
pub struct LayerManager {
    layers: IndexMap<LayerId, FeatureLayer>,
    next_layer: u64,
    firing_events: bool,
    listeners: Vec<Listener>,
}

impl Default for LayerManager {
    fn default() -> Self {
        LayerManager {
            layers: IndexMap::new(),
            next_layer: 0,
            firing_events: true,
            listeners: Vec::new(),
        }
    }
}

impl fmt::Debug for LayerManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayerManager")
            .field("layers", &self.layers)
            .field("firing_events", &self.firing_events)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl LayerManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_layer(&mut self, name: impl Into<String>) -> LayerId {
        let id = LayerId(self.next_layer);
        self.next_layer += 1;
        self.layers.insert(id, FeatureLayer::new(id, name.into()));
        self.fire(LayerEvent::Added(id));
        id
    }

    pub fn layer(&self, id: LayerId) -> Option<&FeatureLayer> {
        self.layers.get(&id)
    }

    pub fn layer_mut(&mut self, id: LayerId) -> Option<&mut FeatureLayer> {
        self.layers.get_mut(&id)
    }

    pub fn layers(&self) -> impl Iterator<Item = &FeatureLayer> {
        self.layers.values()
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&LayerEvent) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn is_firing_events(&self) -> bool {
        self.firing_events
    }

    pub fn set_firing_events(&mut self, firing: bool) {
        self.firing_events = firing;
    }

    /// Dispatch `event` to listeners, unless notifications are suspended.
    pub fn fire(&mut self, event: LayerEvent) {
        if !self.firing_events {
            log::trace!("suppressed {event:?}");
            return;
        }
        for listener in &mut self.listeners {
            listener(&event);
        }
    }

    /// Suspend notifications until the returned guard is dropped.
    ///
    /// The previous firing state is restored on drop, including during unwinding.
    pub fn suspend_events(&mut self) -> SuspendedEvents<'_> {
        let previous = self.firing_events;
        self.firing_events = false;
        SuspendedEvents {
            manager: self,
            previous,
        }
    }

    /// Union of the envelopes of every layer.
    pub fn full_extent(&mut self) -> Option<Rect<f64>> {
        union_rects(self.layers.values_mut().filter_map(FeatureLayer::envelope))
    }
}

pub struct SuspendedEvents<'a> {
    manager: &'a mut LayerManager,
    previous: bool,
}

impl Deref for SuspendedEvents<'_> {
    type Target = LayerManager;

    fn deref(&self) -> &LayerManager {
        self.manager
    }
}

impl DerefMut for SuspendedEvents<'_> {
    fn deref_mut(&mut self) -> &mut LayerManager {
        self.manager
    }
}

impl Drop for SuspendedEvents<'_> {
    fn drop(&mut self) {
        self.manager.firing_events = self.previous;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_suspended_events_are_not_dispatched() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut manager = LayerManager::new();
        let sink = Rc::clone(&seen);
        manager.subscribe(move |event| sink.borrow_mut().push(event.clone()));

        let first = manager.add_layer("roads");
        {
            let mut suspended = manager.suspend_events();
            suspended.add_layer("rivers");
            assert!(!suspended.is_firing_events());
        }
        assert!(manager.is_firing_events());
        manager.fire(LayerEvent::Reprojected(first));

        assert_eq!(
            *seen.borrow(),
            vec![LayerEvent::Added(first), LayerEvent::Reprojected(first)]
        );
    }

    #[test]
    fn test_suspension_restores_previous_state() {
        let mut manager = LayerManager::new();
        manager.set_firing_events(false);
        drop(manager.suspend_events());
        assert!(!manager.is_firing_events());
    }

    #[test]
    fn test_replace_geometries_requires_matching_count() {
        let mut manager = LayerManager::new();
        let id = manager.add_layer("points");
        let layer = manager.layer_mut(id).unwrap();
        layer.add_feature(Geometry::point(0., 0.));
        layer.add_feature(Geometry::point(1., 1.));

        assert_eq!(
            layer.replace_geometries(&[Arc::new(Geometry::point(5., 5.))]),
            Err(EditError::FeatureCountMismatch {
                name: "points".to_string(),
                expected: 1,
                actual: 2
            })
        );
        assert_eq!(layer.features()[0].geometry().as_ref(), &Geometry::point(0., 0.));

        let moved = [Arc::new(Geometry::point(5., 5.)), Arc::new(Geometry::point(6., 6.))];
        layer.replace_geometries(&moved).unwrap();
        assert!(Arc::ptr_eq(layer.features()[1].geometry(), &moved[1]));
    }

    #[test]
    fn test_envelope_is_cached_until_invalidated() {
        let mut manager = LayerManager::new();
        let a = manager.add_layer("a");
        let b = manager.add_layer("b");
        manager.layer_mut(a).unwrap().add_feature(Geometry::point(-1., 2.));
        manager.layer_mut(b).unwrap().add_feature(Geometry::point(3., -4.));

        let layer = manager.layer_mut(a).unwrap();
        assert_eq!(layer.envelope().unwrap().min(), coord! { x: -1., y: 2. });
        layer.replace_geometries(&[Arc::new(Geometry::point(9., 9.))]).unwrap();
        assert_eq!(layer.envelope().unwrap().min(), coord! { x: -1., y: 2. });
        layer.invalidate_envelope();
        assert_eq!(layer.envelope().unwrap().min(), coord! { x: 9., y: 9. });

        let extent = manager.full_extent().unwrap();
        assert_eq!(extent.min(), coord! { x: 3., y: -4. });
        assert_eq!(extent.max(), coord! { x: 9., y: 9. });
    }
}
