//! Error types for the recycler crate.
//!
//! A superseded layout pass is not an error; see
//! [`Outcome`](horizon_recycler_core::Outcome) and
//! [`PassOutcome`](crate::PassOutcome).

use thiserror::Error;

use crate::shape::ShapeId;

/// Errors that can occur while configuring or driving a virtualized collection.
#[derive(Error, Debug)]
pub enum RecyclerError {
    /// An item resolved to a shape with no registered view template.
    #[error("no view template registered for shape '{shape}'")]
    UnknownShape {
        /// The shape that could not be instantiated.
        shape: ShapeId,
    },

    /// A non-nested collection needs a scrollable ancestor to bound its window.
    #[error("virtualized collection is not inside a scrollable container")]
    MissingScrollHost,

    /// The main axis was changed after the collection was first laid out.
    #[error("axis can only be changed before the first layout pass")]
    AxisLocked,

    /// The collection has been disposed and its views destroyed.
    #[error("collection has been disposed")]
    Disposed,

    /// Configuration values out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration text could not be parsed.
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

/// Result type for recycler operations.
pub type Result<T> = std::result::Result<T, RecyclerError>;
