//! Shared test doubles: an in-memory view backend and scroll host.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Barrier};

use parking_lot::Mutex;
use tokio::sync::Semaphore;

use horizon_recycler::{
    Axis, ScrollHost, ShapeId, ShapeRegistry, ViewBackend, ViewGeometry, ViewportState, Visibility,
};

pub const ROW: ShapeId = ShapeId::new("row");
pub const HEADER: ShapeId = ShapeId::new("header");

/// A view handle: an id plus the shape it was instantiated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MockView {
    pub id: u32,
    pub shape: ShapeId,
}

#[derive(Default)]
struct MockState {
    next_id: u32,
    extents: HashMap<ShapeId, f32>,
    /// Per-item live extent, overriding the shape's.
    resized: HashMap<u32, f32>,
    bindings: HashMap<u32, u32>,
    positions: HashMap<u32, f32>,
    visible: HashMap<u32, bool>,
    attached: Vec<u32>,
    destroyed: Vec<u32>,
    measured: u32,
    content_extent: Option<f32>,
    placeholder_extent: Option<f32>,
    placeholder_visible: bool,
    gate: Option<Arc<Semaphore>>,
    bind_gate: Option<(Arc<Barrier>, Arc<Barrier>)>,
}

/// Records every call the engine makes. Items are `u32`; each shape has a
/// fixed main-axis extent.
#[derive(Clone, Default)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    pub fn new(extents: &[(ShapeId, f32)]) -> Self {
        let backend = Self::default();
        backend.state.lock().extents = extents.iter().copied().collect();
        backend
    }

    pub fn with_placeholder(self, extent: f32) -> Self {
        self.state.lock().placeholder_extent = Some(extent);
        self
    }

    /// Templates for every configured shape, allocating ids from this backend.
    pub fn registry(&self) -> ShapeRegistry<MockView> {
        let shapes: Vec<ShapeId> = self.state.lock().extents.keys().copied().collect();
        let mut registry = ShapeRegistry::new();
        for shape in shapes {
            let state = self.state.clone();
            registry.register(shape, move || {
                let mut state = state.lock();
                state.next_id += 1;
                MockView {
                    id: state.next_id,
                    shape,
                }
            });
        }
        registry
    }

    /// Make measurements wait until [`release`](Self::release).
    pub fn hold(&self) {
        self.state.lock().gate = Some(Arc::new(Semaphore::new(0)));
    }

    pub fn release(&self) {
        if let Some(gate) = self.state.lock().gate.take() {
            gate.add_permits(1024);
        }
    }

    /// Park the next `bind` call on this thread. The first barrier is reached
    /// once the call has started; the call returns after the second.
    pub fn block_next_bind(&self) -> (Arc<Barrier>, Arc<Barrier>) {
        let entered = Arc::new(Barrier::new(2));
        let proceed = Arc::new(Barrier::new(2));
        self.state.lock().bind_gate = Some((entered.clone(), proceed.clone()));
        (entered, proceed)
    }

    /// Change the extent every view of `shape` reports.
    pub fn set_extent(&self, shape: ShapeId, extent: f32) {
        self.state.lock().extents.insert(shape, extent);
    }

    /// Change the live extent of whichever view shows `item`.
    pub fn resize_item(&self, item: u32, extent: f32) {
        self.state.lock().resized.insert(item, extent);
    }

    pub fn instantiated(&self) -> u32 {
        self.state.lock().next_id
    }

    pub fn measured(&self) -> u32 {
        self.state.lock().measured
    }

    pub fn attached(&self) -> usize {
        self.state.lock().attached.len()
    }

    pub fn destroyed(&self) -> usize {
        self.state.lock().destroyed.len()
    }

    pub fn content_extent(&self) -> Option<f32> {
        self.state.lock().content_extent
    }

    pub fn placeholder_visible(&self) -> bool {
        self.state.lock().placeholder_visible
    }

    /// Items shown by visible views, sorted.
    pub fn shown_items(&self) -> Vec<u32> {
        let state = self.state.lock();
        let mut items: Vec<u32> = state
            .bindings
            .iter()
            .filter(|(view, _)| state.visible.get(*view).copied().unwrap_or(false))
            .map(|(_, item)| *item)
            .collect();
        items.sort_unstable();
        items
    }

    /// Every item ever bound to a view that is still bound to it.
    pub fn bound_items(&self) -> Vec<u32> {
        let state = self.state.lock();
        let mut items: Vec<u32> = state.bindings.values().copied().collect();
        items.sort_unstable();
        items
    }

    pub fn position_of(&self, item: u32) -> Option<f32> {
        let state = self.state.lock();
        let view = state
            .bindings
            .iter()
            .find(|(view, bound)| **bound == item && state.visible.get(*view).copied().unwrap_or(false))
            .map(|(view, _)| *view)?;
        state.positions.get(&view).copied()
    }

    fn extent_of(state: &MockState, view: &MockView) -> f32 {
        state
            .bindings
            .get(&view.id)
            .and_then(|item| state.resized.get(item))
            .or_else(|| state.extents.get(&view.shape))
            .copied()
            .unwrap_or(0.0)
    }
}

impl ViewBackend<u32> for MockBackend {
    type View = MockView;

    fn attach(&self, view: &MockView) {
        let mut state = self.state.lock();
        state.attached.push(view.id);
        state.visible.insert(view.id, false);
    }

    fn bind(&self, view: &MockView, item: &u32) {
        let gate = self.state.lock().bind_gate.take();
        if let Some((entered, proceed)) = gate {
            entered.wait();
            proceed.wait();
        }
        self.state.lock().bindings.insert(view.id, *item);
    }

    async fn measure_settled(&self, view: &MockView) -> ViewGeometry {
        let gate = self.state.lock().gate.clone();
        if let Some(gate) = gate {
            let _permit = gate.acquire().await.unwrap();
        }
        let mut state = self.state.lock();
        state.measured += 1;
        ViewGeometry::new(320.0, Self::extent_of(&state, view))
    }

    fn geometry(&self, view: &MockView) -> ViewGeometry {
        let state = self.state.lock();
        ViewGeometry::new(320.0, Self::extent_of(&state, view))
    }

    fn position(&self, view: &MockView, _axis: Axis, offset: f32) {
        self.state.lock().positions.insert(view.id, offset);
    }

    fn set_visibility(&self, view: &MockView, visibility: Visibility) {
        self.state
            .lock()
            .visible
            .insert(view.id, visibility == Visibility::Shown);
    }

    fn destroy(&self, view: &MockView) {
        let mut state = self.state.lock();
        state.destroyed.push(view.id);
        state.bindings.remove(&view.id);
        state.visible.remove(&view.id);
    }

    fn set_content_extent(&self, extent: f32) {
        self.state.lock().content_extent = Some(extent);
    }

    fn placeholder_extent(&self) -> Option<f32> {
        self.state.lock().placeholder_extent
    }

    fn set_placeholder_visible(&self, visible: bool) {
        self.state.lock().placeholder_visible = visible;
    }
}

/// A scroll host whose viewport tests move by hand.
#[derive(Debug)]
pub struct MockScrollHost {
    viewport: Mutex<ViewportState>,
    requests: Mutex<Vec<(f32, bool)>>,
}

impl MockScrollHost {
    pub fn new(extent: f32) -> Arc<Self> {
        Arc::new(Self {
            viewport: Mutex::new(ViewportState::new(0.0, extent)),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn with_collection_offset(self: Arc<Self>, offset: f32) -> Arc<Self> {
        self.viewport.lock().collection_offset = offset;
        self
    }

    /// Move the viewport as a user scroll would.
    pub fn scroll(&self, offset: f32) {
        self.viewport.lock().offset = offset;
    }

    pub fn requests(&self) -> Vec<(f32, bool)> {
        self.requests.lock().clone()
    }
}

impl ScrollHost for MockScrollHost {
    fn viewport(&self) -> ViewportState {
        *self.viewport.lock()
    }

    fn scroll_to(&self, offset: f32, animate: bool) {
        self.requests.lock().push((offset, animate));
        self.viewport.lock().offset = offset;
    }
}

/// Installs a test subscriber once; `RUST_LOG` controls verbosity.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
