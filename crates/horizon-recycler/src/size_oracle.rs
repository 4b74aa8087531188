//! Per-shape size measurement.
//!
//! The oracle answers "how long is this item along the main axis":
//!
//! 1. A settled slot already bound to the item reports its current geometry.
//! 2. Otherwise the item's shape is looked up in the cache.
//! 3. Otherwise a specimen view of the shape is instantiated, attached hidden,
//!    and measured once it has settled. The result is cached for the shape.
//!
//! Each shape's cache entry is a [`OnceCell`], which doubles as the
//! "measurement in progress" marker: a second pass asking for the same shape
//! while the specimen is settling awaits the first measurement instead of
//! instantiating another specimen.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::OnceCell;

use horizon_recycler_core::logging::targets;

use crate::backend::ViewBackend;
use crate::error::{RecyclerError, Result};
use crate::geometry::{Axis, ItemSize};
use crate::offset_table::MeasureItem;
use crate::recycler::Recycler;
use crate::shape::{ShapeId, ShapeResolver};

/// Cache of representative sizes, keyed by shape.
///
/// Owned by one collection; share it explicitly through an `Arc` if several
/// collections render the same shapes.
#[derive(Debug, Default)]
pub struct SizeOracle {
    cache: Mutex<HashMap<ShapeId, Arc<OnceCell<ItemSize>>>>,
}

impl SizeOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached size for `shape`, if it has been measured.
    pub fn cached(&self, shape: ShapeId) -> Option<ItemSize> {
        self.cache.lock().get(&shape).and_then(|cell| cell.get().copied())
    }

    /// Forget the measurement for `shape`. Returns `true` if one was cached.
    pub fn invalidate(&self, shape: ShapeId) -> bool {
        self.cache
            .lock()
            .remove(&shape)
            .is_some_and(|cell| cell.initialized())
    }

    /// Forget every measurement.
    pub fn clear(&self) {
        self.cache.lock().clear();
    }

    fn cell(&self, shape: ShapeId) -> Arc<OnceCell<ItemSize>> {
        self.cache.lock().entry(shape).or_default().clone()
    }

    /// Measure `item` along the environment's axis.
    pub async fn measure<I, B>(&self, item: &I, env: &MeasureEnv<'_, I, B>) -> Result<ItemSize>
    where
        I: Clone + Eq + Hash,
        B: ViewBackend<I>,
    {
        if let Some(view) = env.recycler.settled_view_for(item) {
            return Ok(env.backend.geometry(&view).along(env.axis));
        }

        let shape = env.resolver.resolve(item);
        let cell = self.cell(shape);
        let size = cell
            .get_or_try_init(|| async {
                let (slot, view) = env.recycler.create_specimen(shape, item, env.backend)?;
                let geometry = env.backend.measure_settled(&view).await;
                env.recycler.mark_settled(slot);

                let size = geometry.along(env.axis);
                tracing::debug!(
                    target: targets::SIZE_ORACLE,
                    %shape,
                    extent = size.extent,
                    leading_margin = size.leading_margin,
                    "measured shape"
                );
                Ok::<_, RecyclerError>(size)
            })
            .await?;
        Ok(*size)
    }
}

/// Everything a measurement needs, borrowed from the collection.
pub struct MeasureEnv<'a, I, B: ViewBackend<I>> {
    pub oracle: &'a SizeOracle,
    pub backend: &'a B,
    pub resolver: &'a dyn ShapeResolver<I>,
    pub recycler: &'a Recycler<I, B::View>,
    pub axis: Axis,
}

impl<I, B> MeasureItem<I> for MeasureEnv<'_, I, B>
where
    I: Clone + Eq + Hash,
    B: ViewBackend<I>,
{
    async fn measure_item(&self, item: &I) -> Result<ItemSize> {
        tracing::trace!(target: targets::SIZE_ORACLE, "measuring item");
        self.oracle.measure(item, self).await
    }
}
