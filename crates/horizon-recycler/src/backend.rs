//! Collaborator contracts: the rendering backend and the scroll host.
//!
//! The engine never draws anything. It asks a [`ViewBackend`] to attach, bind,
//! position, show and hide view handles, and asks a [`ScrollHost`] where the
//! viewport is. Both are implemented by the embedding UI toolkit.

use std::future::Future;

use crate::geometry::{Axis, ViewGeometry};

/// Whether a view is displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Visibility {
    Shown,
    Hidden,
}

/// Rendering operations on view handles.
///
/// All methods are called on the collection's UI-affinity task. Views are
/// created by the factories in a [`ShapeRegistry`](crate::ShapeRegistry) and
/// are handed to [`attach`](Self::attach) exactly once before any other call.
/// No engine lock is held during a call, so implementations may query the
/// collection.
pub trait ViewBackend<I> {
    /// A cheap handle to a live view.
    type View: Clone;

    /// Insert a freshly created view into the render tree, hidden.
    fn attach(&self, view: &Self::View);

    /// Display `item` in `view`, replacing whatever it showed before.
    fn bind(&self, view: &Self::View, item: &I);

    /// Resolve once the view has completed a layout cycle, with its geometry.
    ///
    /// This is the engine's only suspension point; other triggers may run
    /// while it is pending.
    fn measure_settled(&self, view: &Self::View) -> impl Future<Output = ViewGeometry>;

    /// The view's current on-screen geometry.
    fn geometry(&self, view: &Self::View) -> ViewGeometry;

    /// Move the view to `offset` along `axis`, relative to the collection.
    fn position(&self, view: &Self::View, axis: Axis, offset: f32);

    /// Show or hide the view.
    fn set_visibility(&self, view: &Self::View, visibility: Visibility);

    /// Remove the view from the render tree and release it.
    fn destroy(&self, view: &Self::View);

    /// Resize the collection's container to `extent` along the main axis.
    fn set_content_extent(&self, extent: f32);

    /// Main-axis extent of the empty-state placeholder, if one is configured.
    fn placeholder_extent(&self) -> Option<f32> {
        None
    }

    /// Show or hide the empty-state placeholder.
    fn set_placeholder_visible(&self, _visible: bool) {}
}

/// Viewport state reported by a scroll host.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ViewportState {
    /// Scroll offset of the host along the main axis.
    pub offset: f32,
    /// Visible extent of the host along the main axis.
    pub extent: f32,
    /// Where the collection starts inside the host's scrolled content.
    pub collection_offset: f32,
}

impl ViewportState {
    /// A viewport whose content starts with the collection.
    pub fn new(offset: f32, extent: f32) -> Self {
        Self {
            offset,
            extent,
            collection_offset: 0.0,
        }
    }

    /// Scroll offset relative to the collection's own origin.
    pub fn relative_offset(&self) -> f32 {
        self.offset - self.collection_offset
    }
}

/// The scrollable ancestor that bounds a collection's visible window.
pub trait ScrollHost: Send + Sync {
    /// Current viewport.
    fn viewport(&self) -> ViewportState;

    /// Scroll so that host content offset `offset` is at the viewport start.
    fn scroll_to(&self, offset: f32, animate: bool);
}
