//! Feature sources and change subscriptions.
//!
//! [`FeatureSource`] is the capability the cluster engine consumes: iterate
//! features in source order, query by bounding box, load for a view, and
//! subscribe to changes. [`VectorSource`] is the in-memory implementation: an
//! insertion-ordered store with an optional loader that fetches features for
//! the extents a view asks for.
//!
//! Change notification is synchronous and single-threaded. Listeners are
//! invoked inside the mutating call; dropping the returned [`Subscription`]
//! unregisters the listener.

#[cfg(test)]
#[path = "source_test.rs"]
mod source_test;

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use rstar::{AABB, RTree, RTreeObject};
use tracing::{debug, warn};

use crate::feature::{Feature, FeatureId};
use crate::geom::Extent;
use crate::view::Projection;

/// A change callback.
pub type Listener = Box<dyn FnMut()>;

#[derive(Default)]
struct ListenerTable {
    next_id: Cell<u64>,
    entries: RefCell<Vec<(u64, Listener)>>,
    /// Ids whose subscription was dropped while `entries` was borrowed.
    pending_removals: RefCell<Vec<u64>>,
}

impl ListenerTable {
    fn remove(&self, id: u64) {
        if let Ok(mut entries) = self.entries.try_borrow_mut() {
            entries.retain(|(entry, _)| *entry != id);
            self.apply_pending_removals(&mut entries);
        } else {
            self.pending_removals.borrow_mut().push(id);
        }
    }

    /// Dropping a removed listener can drop further subscriptions, so drain
    /// until nothing is pending.
    fn apply_pending_removals(&self, entries: &mut Vec<(u64, Listener)>) {
        loop {
            let pending = std::mem::take(&mut *self.pending_removals.borrow_mut());
            if pending.is_empty() {
                break;
            }
            entries.retain(|(id, _)| !pending.contains(id));
        }
    }
}

/// Registry of change listeners owned by a source.
#[derive(Default)]
pub struct Listeners {
    table: Rc<ListenerTable>,
}

impl Listeners {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener`. It stays registered until the returned
    /// [`Subscription`] is dropped or cancelled.
    pub fn subscribe(&self, listener: Listener) -> Subscription {
        let Ok(mut entries) = self.table.entries.try_borrow_mut() else {
            warn!("listener registered during change notification; ignoring");
            return Subscription { table: Weak::new(), id: 0 };
        };
        let id = self.table.next_id.get() + 1;
        self.table.next_id.set(id);
        entries.push((id, listener));
        Subscription { table: Rc::downgrade(&self.table), id }
    }

    /// Invoke every listener in registration order. Subscriptions dropped by
    /// a listener are unregistered once the pass completes.
    pub fn emit(&self) {
        let Ok(mut entries) = self.table.entries.try_borrow_mut() else {
            warn!("re-entrant change notification dropped");
            return;
        };
        for (_, listener) in entries.iter_mut() {
            listener();
        }
        self.table.apply_pending_removals(&mut entries);
    }

    /// Number of live listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.entries.try_borrow().map_or(0, |e| e.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Handle to a registered listener. Dropping it unregisters the listener.
#[must_use = "dropping a Subscription immediately unregisters its listener"]
pub struct Subscription {
    table: Weak<ListenerTable>,
    id: u64,
}

impl Subscription {
    /// Unregister the listener now.
    pub fn cancel(self) {}

    /// Returns `true` while the listener is registered with a live source.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.table.upgrade().is_some_and(|t| {
            let pending = t.pending_removals.try_borrow().is_ok_and(|p| p.contains(&self.id));
            !pending && t.entries.try_borrow().is_ok_and(|e| e.iter().any(|(id, _)| *id == self.id))
        })
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(table) = self.table.upgrade() {
            table.remove(self.id);
        }
    }
}

/// A collection of features the cluster engine can wrap.
pub trait FeatureSource {
    /// All features, in the source's natural order.
    fn features(&self) -> Vec<&Feature>;

    /// Features whose geometry bounding box intersects `extent`, in source order.
    fn features_in_extent(&self, extent: &Extent) -> Vec<&Feature>;

    /// Make sure features for `extent` at `resolution` are available. May add
    /// features (and therefore signal a change).
    fn load_features(&mut self, extent: &Extent, resolution: f64, projection: &Projection);

    /// Register a change listener.
    fn on_change(&self, listener: Listener) -> Subscription;

    /// Counter bumped on every change.
    fn revision(&self) -> u64;
}

/// Callback that fetches features for an extent.
pub type FeatureLoader = Box<dyn FnMut(&Extent, f64, &Projection) -> Vec<Feature>>;

/// Which extents a [`VectorSource`] loader is asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadingStrategy {
    /// Load everything once, on the first request.
    #[default]
    All,
    /// Load each requested extent not already covered by an earlier one.
    Bbox,
}

/// R-tree entry: a feature's bounding box keyed by its id.
#[derive(Debug, Clone, PartialEq)]
struct IndexedFeature {
    id: FeatureId,
    envelope: AABB<[f64; 2]>,
}

impl IndexedFeature {
    fn of(feature: &Feature) -> Option<Self> {
        envelope(&feature.extent()).map(|envelope| Self { id: feature.id, envelope })
    }
}

impl RTreeObject for IndexedFeature {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// `None` for extents nothing can intersect: empty, or with a NaN bound.
fn envelope(extent: &Extent) -> Option<AABB<[f64; 2]>> {
    let bounds = [extent.min_x, extent.min_y, extent.max_x, extent.max_y];
    if extent.is_empty() || bounds.iter().any(|v| v.is_nan()) {
        return None;
    }
    Some(AABB::from_corners([extent.min_x, extent.min_y], [extent.max_x, extent.max_y]))
}

/// In-memory, insertion-ordered feature store.
///
/// Bounding boxes are kept in an R-tree next to the ordered map, so extent
/// queries cost a tree lookup plus a sort of the hits back into source order.
#[derive(Default)]
pub struct VectorSource {
    features: IndexMap<FeatureId, Feature>,
    index: RTree<IndexedFeature>,
    listeners: Listeners,
    revision: u64,
    loader: Option<FeatureLoader>,
    strategy: LoadingStrategy,
    loaded_extents: Vec<Extent>,
}

impl VectorSource {
    /// Create an empty source with no loader.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty source that fetches through `loader`.
    #[must_use]
    pub fn with_loader(loader: FeatureLoader, strategy: LoadingStrategy) -> Self {
        Self { loader: Some(loader), strategy, ..Self::default() }
    }

    /// Create a source pre-populated with `features`, without signalling a change.
    #[must_use]
    pub fn from_features(features: impl IntoIterator<Item = Feature>) -> Self {
        let mut source = Self::new();
        for f in features {
            source.insert(f);
        }
        source
    }

    /// Insert or replace a feature.
    pub fn add_feature(&mut self, feature: Feature) {
        self.insert(feature);
        self.changed();
    }

    /// Insert or replace several features with a single change signal.
    pub fn add_features(&mut self, features: impl IntoIterator<Item = Feature>) {
        let before = self.features.len();
        let mut touched = false;
        for f in features {
            self.insert(f);
            touched = true;
        }
        if touched {
            debug!(added = self.features.len() - before, total = self.features.len(), "features added");
            self.changed();
        }
    }

    /// Remove a feature by id, returning it if it was present. Source order
    /// of the remaining features is preserved.
    pub fn remove_feature(&mut self, id: &FeatureId) -> Option<Feature> {
        let removed = self.features.shift_remove(id);
        if let Some(feature) = &removed {
            self.unindex(feature);
            self.changed();
        }
        removed
    }

    /// Remove every feature and forget which extents were loaded.
    pub fn clear(&mut self) {
        self.features.clear();
        self.index = RTree::new();
        self.loaded_extents.clear();
        self.changed();
    }

    #[must_use]
    pub fn get(&self, id: &FeatureId) -> Option<&Feature> {
        self.features.get(id)
    }

    #[must_use]
    pub fn contains(&self, id: &FeatureId) -> bool {
        self.features.contains_key(id)
    }

    /// Number of features currently in the source.
    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Bump the revision and notify listeners.
    pub fn changed(&mut self) {
        self.revision += 1;
        self.listeners.emit();
    }

    /// Store `feature` and index its bounds, replacing any feature with the
    /// same id in place.
    fn insert(&mut self, feature: Feature) {
        let entry = IndexedFeature::of(&feature);
        if let Some(previous) = self.features.insert(feature.id, feature) {
            self.unindex(&previous);
        }
        if let Some(entry) = entry {
            self.index.insert(entry);
        }
    }

    fn unindex(&mut self, feature: &Feature) {
        if let Some(entry) = IndexedFeature::of(feature) {
            if self.index.remove(&entry).is_none() {
                warn!(id = %feature.id, "feature bounds missing from spatial index");
            }
        }
    }

    fn extent_to_load(&self, extent: &Extent) -> Option<Extent> {
        match self.strategy {
            LoadingStrategy::All => {
                let everything = Extent::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::INFINITY, f64::INFINITY);
                self.loaded_extents.is_empty().then_some(everything)
            }
            LoadingStrategy::Bbox => {
                let covered = self.loaded_extents.iter().any(|loaded| loaded.contains_extent(extent));
                (!covered).then_some(*extent)
            }
        }
    }
}

impl FeatureSource for VectorSource {
    fn features(&self) -> Vec<&Feature> {
        self.features.values().collect()
    }

    fn features_in_extent(&self, extent: &Extent) -> Vec<&Feature> {
        let Some(query) = envelope(extent) else {
            return Vec::new();
        };
        let mut hits: Vec<usize> = self
            .index
            .locate_in_envelope_intersecting(&query)
            .filter_map(|entry| self.features.get_index_of(&entry.id))
            .collect();
        hits.sort_unstable();
        hits.into_iter().filter_map(|i| self.features.get_index(i).map(|(_, f)| f)).collect()
    }

    fn load_features(&mut self, extent: &Extent, resolution: f64, projection: &Projection) {
        if self.loader.is_none() || extent.is_empty() {
            return;
        }
        let Some(request) = self.extent_to_load(extent) else {
            return;
        };
        self.loaded_extents.push(request);
        let loaded = match self.loader.as_mut() {
            Some(loader) => loader(&request, resolution, projection),
            None => Vec::new(),
        };
        debug!(count = loaded.len(), resolution, projection = projection.code(), "loader returned features");
        self.add_features(loaded);
    }

    fn on_change(&self, listener: Listener) -> Subscription {
        self.listeners.subscribe(listener)
    }

    fn revision(&self) -> u64 {
        self.revision
    }
}
