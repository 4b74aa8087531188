//! Commonly used types:
//!
//! ```ignore
//! use horizon_recycler::prelude::*;
//! ```

// ============================================================================
// Collection
// ============================================================================

pub use crate::collection::{LayoutChange, VirtualCollection};
pub use crate::config::CollectionConfig;
pub use crate::coordinator::{LayoutPhase, PassOutcome, Trigger};
pub use crate::error::{RecyclerError, Result};

// ============================================================================
// Host integration
// ============================================================================

pub use crate::backend::{ScrollHost, ViewBackend, ViewportState, Visibility};
pub use crate::geometry::{Axis, Insets, ViewGeometry};
pub use crate::shape::{ShapeId, ShapeRegistry, ShapeResolver, SingleShape};

// ============================================================================
// Signals
// ============================================================================

pub use horizon_recycler_core::{ConnectionGuard, ConnectionId, Signal};
