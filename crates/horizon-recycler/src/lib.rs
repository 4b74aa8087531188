//! Horizon Recycler - virtualization and view recycling for large scrollable
//! collections.
//!
//! A [`VirtualCollection`] keeps only the items intersecting the viewport
//! (plus an overrender buffer) backed by live views, and recycles views that
//! scroll out of range for items that scroll in. Item sizes are measured once
//! per [`ShapeId`] from a hidden specimen view and accumulated into an
//! [`OffsetTable`], which is what lets the collection report a total content
//! extent for millions of items while instantiating a few dozen views.
//!
//! The engine draws nothing itself. The embedding toolkit implements
//! [`ViewBackend`] for its view handles and [`ScrollHost`] for the scrollable
//! ancestor, then forwards source changes, scroll events and resize
//! notifications to the collection.
//!
//! # Layout passes
//!
//! Every trigger stamps a new [`LayoutVersion`]. Measurement is the only
//! suspension point; a pass that resumes after a newer trigger has been
//! stamped stops without touching the committed layout and reports
//! [`PassOutcome::Superseded`]. Scroll-driven passes are throttled to one per
//! frame interval and abandoned if they run past the configured timeout.
//!
//! # Example
//!
//! ```ignore
//! use horizon_recycler::prelude::*;
//!
//! const ROW: ShapeId = ShapeId::new("row");
//!
//! let collection = VirtualCollection::new(
//!     backend,
//!     ShapeRegistry::new().with_template(ROW, make_row),
//!     SingleShape(ROW),
//!     CollectionConfig::default().with_overrender_buffer(300.0),
//! )?
//! .with_scroll_host(scroll_view);
//!
//! collection.set_source(rows).await?;
//! collection.on_scrolled().await?;
//! ```

pub mod backend;
pub mod collection;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod geometry;
pub mod offset_table;
pub mod prelude;
pub mod recycler;
pub mod shape;
pub mod size_oracle;
pub mod slot;
pub mod window;

pub use backend::{ScrollHost, ViewBackend, ViewportState, Visibility};
pub use collection::{LayoutChange, VirtualCollection};
pub use config::{CollectionConfig, DEFAULT_OVERRENDER_BUFFER};
pub use coordinator::{LayoutCoordinator, LayoutPhase, PassOutcome, Trigger};
pub use error::{RecyclerError, Result};
pub use geometry::{Axis, Insets, ItemSize, ViewGeometry};
pub use offset_table::{MeasureItem, OffsetEntry, OffsetTable, OffsetTableBuilder};
pub use recycler::{ArrangeReport, ArrangementPlan, Placement, Recycler, RecyclerStats, plan_window};
pub use shape::{ShapeId, ShapeRegistry, ShapeResolver, SingleShape};
pub use size_oracle::{MeasureEnv, SizeOracle};
pub use slot::{SlotId, SlotSnapshot};
pub use window::VisibleWindow;

pub use horizon_recycler_core::{
    ConnectionGuard, ConnectionId, FrameThrottle, LayoutVersion, Outcome, PerfSpan, Signal,
    ThrottleDecision, VersionClock,
};
