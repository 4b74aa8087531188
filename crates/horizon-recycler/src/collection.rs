//! The virtualized collection.
//!
//! [`VirtualCollection`] renders a sequence of items through a small pool of
//! recycled views. Hosts drive it with triggers (`set_source`, `on_scrolled`,
//! `on_scroll_ended`, `on_item_resized`, `refresh`) and programmatic scrolls
//! (`scroll_to_item`, `scroll_to_position`). Every trigger is an `async fn`
//! over `&self`; several may be in flight on the UI task at once, and only
//! the most recently stamped one commits.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use horizon_recycler::prelude::*;
//!
//! const ROW: ShapeId = ShapeId::new("row");
//!
//! let templates = ShapeRegistry::new().with_template(ROW, || toolkit.new_row());
//! let collection = VirtualCollection::new(
//!     backend,
//!     templates,
//!     SingleShape(ROW),
//!     CollectionConfig::default(),
//! )?
//! .with_scroll_host(scroll_view.clone());
//!
//! collection.layout_changed().connect(|change| {
//!     println!("{} items laid out, extent {}", change.item_count, change.content_extent);
//! });
//!
//! collection.set_source(contacts).await?;
//! ```

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::Instrument;

use horizon_recycler_core::logging::{span_names, targets};
use horizon_recycler_core::{FrameThrottle, LayoutVersion, Outcome, PerfSpan, Signal, ThrottleDecision};

use crate::backend::{ScrollHost, ViewBackend};
use crate::config::CollectionConfig;
use crate::coordinator::{LayoutCoordinator, LayoutPhase, PassOutcome, Trigger};
use crate::error::{RecyclerError, Result};
use crate::geometry::Axis;
use crate::offset_table::{OffsetEntry, OffsetTable, OffsetTableBuilder};
use crate::recycler::{Recycler, RecyclerStats, plan_window};
use crate::shape::{ShapeId, ShapeRegistry, ShapeResolver};
use crate::size_oracle::{MeasureEnv, SizeOracle};
use crate::slot::SlotSnapshot;
use crate::window::VisibleWindow;

/// Payload of [`VirtualCollection::layout_changed`], emitted once per
/// committed pass.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutChange {
    pub version: LayoutVersion,
    pub trigger: Trigger,
    /// Main-axis extent of the collection's content.
    pub content_extent: f32,
    /// First and last arranged index; `None` when nothing is visible.
    pub visible: Option<(usize, usize)>,
    pub item_count: usize,
}

#[derive(Clone)]
struct CommittedTable {
    table: Arc<OffsetTable>,
    generation: u64,
}

struct CollectionState<I> {
    items: Arc<[I]>,
    /// Bumped on every `set_source`.
    generation: u64,
    table: Option<CommittedTable>,
    /// Set by triggers that change sizes; cleared when a table commits.
    needs_measure: bool,
    /// Bumped whenever cached sizes are dropped, so a table measured across
    /// the drop does not count as fresh.
    measure_epoch: u64,
    rendered: bool,
    placeholder_shown: bool,
    disposed: bool,
}

impl<I> CollectionState<I> {
    /// The committed table, if it still describes the current source.
    fn fresh_table(&self) -> Option<Arc<OffsetTable>> {
        match &self.table {
            Some(committed) if committed.generation == self.generation && !self.needs_measure => {
                Some(committed.table.clone())
            }
            _ => None,
        }
    }
}

/// A virtualized, recycling view over a sequence of items.
pub struct VirtualCollection<I, B: ViewBackend<I>> {
    backend: B,
    resolver: Box<dyn ShapeResolver<I>>,
    scroll_host: Option<Arc<dyn ScrollHost>>,
    config: RwLock<CollectionConfig>,
    coordinator: LayoutCoordinator,
    oracle: Arc<SizeOracle>,
    recycler: Recycler<I, B::View>,
    state: Mutex<CollectionState<I>>,
    layout_changed: Signal<LayoutChange>,
}

impl<I, B> VirtualCollection<I, B>
where
    I: Clone + Eq + Hash,
    B: ViewBackend<I>,
{
    /// Create a collection with no items.
    ///
    /// Fails if `config` does not validate.
    pub fn new<R>(
        backend: B,
        templates: ShapeRegistry<B::View>,
        resolver: R,
        config: CollectionConfig,
    ) -> Result<Self>
    where
        R: ShapeResolver<I> + 'static,
    {
        config.validate()?;
        let throttle = FrameThrottle::new(config.frame_interval(), config.scroll_pass_timeout());
        Ok(Self {
            backend,
            resolver: Box::new(resolver),
            scroll_host: None,
            config: RwLock::new(config),
            coordinator: LayoutCoordinator::new(throttle),
            oracle: Arc::new(SizeOracle::new()),
            recycler: Recycler::new(templates),
            state: Mutex::new(CollectionState {
                items: Arc::from(Vec::new()),
                generation: 0,
                table: None,
                needs_measure: false,
                measure_epoch: 0,
                rendered: false,
                placeholder_shown: false,
                disposed: false,
            }),
            layout_changed: Signal::new(),
        })
    }

    /// Attach the scrollable ancestor that bounds the visible window.
    pub fn with_scroll_host(mut self, host: Arc<dyn ScrollHost>) -> Self {
        self.scroll_host = Some(host);
        self
    }

    /// Use a size cache shared with other collections.
    pub fn with_size_oracle(mut self, oracle: Arc<SizeOracle>) -> Self {
        self.oracle = oracle;
        self
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Raised once per committed layout pass.
    pub fn layout_changed(&self) -> &Signal<LayoutChange> {
        &self.layout_changed
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn config(&self) -> CollectionConfig {
        self.config.read().clone()
    }

    pub fn axis(&self) -> Axis {
        self.config.read().axis
    }

    /// Change the main axis. Only allowed before the first committed pass.
    pub fn set_axis(&self, axis: Axis) -> Result<()> {
        let rendered = self.state.lock().rendered;
        let mut config = self.config.write();
        if config.axis == axis {
            return Ok(());
        }
        if rendered {
            return Err(RecyclerError::AxisLocked);
        }
        config.axis = axis;
        // Cached sizes were projected onto the old axis.
        self.oracle.clear();
        Ok(())
    }

    /// The current item snapshot.
    pub fn items(&self) -> Arc<[I]> {
        self.state.lock().items.clone()
    }

    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().items.is_empty()
    }

    pub fn phase(&self) -> LayoutPhase {
        self.coordinator.phase()
    }

    pub fn current_version(&self) -> LayoutVersion {
        self.coordinator.current_version()
    }

    /// The last committed offset table.
    pub fn offset_table(&self) -> Option<Arc<OffsetTable>> {
        self.state.lock().table.as_ref().map(|committed| committed.table.clone())
    }

    /// Content extent of the last committed table.
    pub fn content_extent(&self) -> Option<f32> {
        self.offset_table().map(|table| table.total_extent())
    }

    pub fn is_placeholder_shown(&self) -> bool {
        self.state.lock().placeholder_shown
    }

    pub fn is_disposed(&self) -> bool {
        self.state.lock().disposed
    }

    pub fn stats(&self) -> RecyclerStats {
        self.recycler.stats()
    }

    /// Slots currently showing an item, ordered by position.
    pub fn live_slots(&self) -> Vec<SlotSnapshot<I>> {
        self.recycler.live_slots()
    }

    /// Every slot, live or idle.
    pub fn slots(&self) -> Vec<SlotSnapshot<I>> {
        self.recycler.slots()
    }

    pub fn size_oracle(&self) -> &Arc<SizeOracle> {
        &self.oracle
    }

    // =========================================================================
    // Triggers
    // =========================================================================

    /// Replace the item sequence and lay it out.
    pub async fn set_source(&self, items: impl Into<Arc<[I]>>) -> Result<PassOutcome> {
        {
            let mut state = self.state.lock();
            if state.disposed {
                return Ok(PassOutcome::Skipped);
            }
            state.items = items.into();
            state.generation += 1;
        }
        self.run_pass(Trigger::SourceChanged).await
    }

    /// Re-measure and re-arrange after `item` changed size.
    pub async fn on_item_resized(&self, item: &I) -> Result<PassOutcome> {
        if !self.state.lock().items.contains(item) {
            return Ok(PassOutcome::Skipped);
        }
        self.run_pass(Trigger::ItemResized).await
    }

    /// Re-arrange under the current offsets without re-measuring.
    pub async fn refresh(&self) -> Result<PassOutcome> {
        self.run_pass(Trigger::Refresh).await
    }

    /// Drop the cached size of `shape`; the next measuring pass re-measures it.
    pub fn invalidate_shape(&self, shape: ShapeId) -> bool {
        let dropped = self.oracle.invalidate(shape);
        if dropped {
            let mut state = self.state.lock();
            state.needs_measure = true;
            state.measure_epoch += 1;
        }
        dropped
    }

    /// The scroll host moved. Throttled to one pass per frame interval.
    pub async fn on_scrolled(&self) -> Result<PassOutcome> {
        if self.is_disposed() {
            return Ok(PassOutcome::Skipped);
        }
        match self.coordinator.throttle_request(now()) {
            ThrottleDecision::RunNow => self.scroll_pass(Trigger::Scrolled).await,
            ThrottleDecision::RunAfter(delay) => {
                tokio::time::sleep(delay).await;
                self.coordinator.throttle_clear_deferred();
                self.scroll_pass(Trigger::Scrolled).await
            }
            ThrottleDecision::Coalesced => Ok(PassOutcome::Throttled),
        }
    }

    /// The scroll host came to rest. Always runs a pass, after any pass
    /// still in flight.
    pub async fn on_scroll_ended(&self) -> Result<PassOutcome> {
        if self.is_disposed() {
            return Ok(PassOutcome::Skipped);
        }
        while let ThrottleDecision::RunAfter(delay) = self.coordinator.throttle_force(now()) {
            tokio::time::sleep(delay).await;
        }
        self.scroll_pass(Trigger::ScrollEnded).await
    }

    /// Scroll so that `item` starts at the top of the viewport.
    ///
    /// Returns `Ok(false)` without touching any view if `item` is not in the
    /// current source.
    pub async fn scroll_to_item(&self, item: &I, animate: bool) -> Result<bool> {
        if self.is_disposed() {
            return Err(RecyclerError::Disposed);
        }
        if !self.state.lock().items.contains(item) {
            return Ok(false);
        }
        let host = self.scroll_host.clone().ok_or(RecyclerError::MissingScrollHost)?;

        let entry = match self.entry_for(item) {
            Some(entry) => entry,
            None => {
                self.run_pass(Trigger::ScrollRequested).await?;
                match self.entry_for(item) {
                    Some(entry) => entry,
                    None => {
                        tracing::debug!(target: targets::COLLECTION, "item left the source before it could be scrolled to");
                        return Ok(false);
                    }
                }
            }
        };

        let viewport = host.viewport();
        host.scroll_to(viewport.collection_offset + entry.start, animate);
        self.run_pass(Trigger::ScrollRequested).await?;
        Ok(true)
    }

    /// Scroll the host so that collection offset `offset` is at the viewport
    /// start, then arrange.
    pub async fn scroll_to_position(&self, offset: f32, animate: bool) -> Result<PassOutcome> {
        if self.is_disposed() {
            return Err(RecyclerError::Disposed);
        }
        let host = self.scroll_host.clone().ok_or(RecyclerError::MissingScrollHost)?;
        let viewport = host.viewport();
        host.scroll_to(viewport.collection_offset + offset.max(0.0), animate);
        self.run_pass(Trigger::ScrollRequested).await
    }

    /// Cancel every pass in flight and destroy every view.
    ///
    /// Later triggers return [`PassOutcome::Skipped`]. Returns the number of
    /// views destroyed.
    pub fn dispose(&self) -> usize {
        {
            let mut state = self.state.lock();
            if state.disposed {
                return 0;
            }
            state.disposed = true;
            state.table = None;
            state.items = Arc::from(Vec::new());
        }
        self.coordinator.invalidate();
        let destroyed = self.recycler.dispose(&self.backend);
        self.layout_changed.disconnect_all();
        tracing::debug!(target: targets::COLLECTION, destroyed, "collection disposed");
        destroyed
    }

    // =========================================================================
    // Passes
    // =========================================================================

    async fn scroll_pass(&self, trigger: Trigger) -> Result<PassOutcome> {
        let timeout = self.config.read().scroll_pass_timeout();
        let ticket = self.coordinator.throttle_begin(now());
        let result = tokio::time::timeout(timeout, self.run_pass(trigger)).await;
        self.coordinator.throttle_finish(ticket);

        match result {
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::debug!(
                    target: targets::COLLECTION,
                    %trigger,
                    timeout_ms = timeout.as_millis() as u64,
                    "scroll pass abandoned after timeout"
                );
                Ok(PassOutcome::TimedOut)
            }
        }
    }

    async fn run_pass(&self, trigger: Trigger) -> Result<PassOutcome> {
        if self.is_disposed() {
            return Ok(PassOutcome::Skipped);
        }
        if trigger.remeasures() {
            self.state.lock().needs_measure = true;
        }
        let version = self.coordinator.begin_pass(trigger);
        let _phase = self.coordinator.pass_guard(version);

        let span = tracing::debug_span!(target: targets::COLLECTION, span_names::LAYOUT_PASS, %version, %trigger);
        let outcome = self.measure_and_arrange(trigger, version).instrument(span).await?;
        if let PassOutcome::Superseded(stale) = outcome {
            tracing::debug!(target: targets::COLLECTION, version = %stale, %trigger, "layout pass superseded");
        }
        Ok(outcome)
    }

    async fn measure_and_arrange(&self, trigger: Trigger, version: LayoutVersion) -> Result<PassOutcome> {
        let (items, generation, epoch, fresh) = {
            let state = self.state.lock();
            (state.items.clone(), state.generation, state.measure_epoch, state.fresh_table())
        };

        if items.is_empty() {
            return Ok(self.show_placeholder(trigger, version, generation, epoch));
        }

        let table = match fresh {
            Some(table) => table,
            None => match self.build_table(&items, version).await? {
                Outcome::Current(table) => {
                    let table = Arc::new(table);
                    if !self.commit_table(table.clone(), generation, epoch, version) {
                        return Ok(PassOutcome::Superseded(version));
                    }
                    table
                }
                Outcome::Superseded(stale) => return Ok(PassOutcome::Superseded(stale)),
            },
        };

        self.arrange(trigger, version, table, items)
    }

    async fn build_table(&self, items: &[I], version: LayoutVersion) -> Result<Outcome<OffsetTable>> {
        let (builder, axis) = {
            let config = self.config.read();
            let builder = OffsetTableBuilder::new(config.leading_padding, config.trailing_padding)
                .with_empty_extent(self.backend.placeholder_extent());
            (builder, config.axis)
        };
        let env = MeasureEnv {
            oracle: &self.oracle,
            backend: &self.backend,
            resolver: &*self.resolver,
            recycler: &self.recycler,
            axis,
        };
        let span = tracing::trace_span!(target: targets::COLLECTION, span_names::MEASURE, items = items.len());
        builder
            .build(items, &env, self.coordinator.clock(), version)
            .instrument(span)
            .await
    }

    /// Store `table` as the source's table if `version` is still current.
    ///
    /// A table measured while cached sizes were being dropped is still used
    /// by this pass but leaves `needs_measure` set, so the next pass rebuilds.
    fn commit_table(&self, table: Arc<OffsetTable>, generation: u64, epoch: u64, version: LayoutVersion) -> bool {
        let mut state = self.state.lock();
        if !self.coordinator.is_current(version) || state.generation != generation {
            return false;
        }
        state.table = Some(CommittedTable { table, generation });
        if state.measure_epoch == epoch {
            state.needs_measure = false;
        } else {
            tracing::debug!(target: targets::COLLECTION, %version, "sizes invalidated during measurement, table kept for this pass only");
        }
        true
    }

    fn arrange(
        &self,
        trigger: Trigger,
        mut version: LayoutVersion,
        mut table: Arc<OffsetTable>,
        mut items: Arc<[I]>,
    ) -> Result<PassOutcome> {
        let Some(guard) = self.coordinator.try_arrange() else {
            return Ok(PassOutcome::Coalesced);
        };

        loop {
            let outcome = self.arrange_once(trigger, version, &table, &items)?;
            if !guard.take_rerun() {
                return Ok(outcome);
            }

            // Repeat for the coalesced request under the authoritative version,
            // provided the committed table still matches the source.
            let state = self.state.lock();
            let Some(fresh) = state.fresh_table() else {
                return Ok(outcome);
            };
            version = self.coordinator.current_version();
            table = fresh;
            items = state.items.clone();
        }
    }

    fn arrange_once(
        &self,
        trigger: Trigger,
        version: LayoutVersion,
        table: &OffsetTable,
        items: &[I],
    ) -> Result<PassOutcome> {
        // A rerun arranges under a version whose own pass already returned,
        // so the phase is released here as well.
        let _phase = self.coordinator.pass_guard(version);
        self.coordinator.enter_arranging(version);
        let _perf = PerfSpan::new(span_names::ARRANGE);

        let axis = self.axis();
        let window = self.visible_window()?;
        let clock = self.coordinator.clock();

        let plan = match plan_window(table, &window, items, &*self.resolver, clock, version) {
            Outcome::Current(plan) => plan,
            Outcome::Superseded(stale) => return Ok(PassOutcome::Superseded(stale)),
        };
        if let Outcome::Superseded(stale) = self.recycler.arrange(&plan, axis, &self.backend, clock, version)? {
            return Ok(PassOutcome::Superseded(stale));
        }

        let content_extent = table.total_extent();
        self.backend.set_content_extent(content_extent);
        let hide_placeholder = {
            let mut state = self.state.lock();
            state.rendered = true;
            std::mem::take(&mut state.placeholder_shown)
        };
        if hide_placeholder {
            self.backend.set_placeholder_visible(false);
        }

        if plan.clamped > 0 {
            tracing::warn!(
                target: targets::COLLECTION,
                clamped = plan.clamped,
                items = items.len(),
                table_len = table.len(),
                "arranged items without offset entries"
            );
        }

        self.layout_changed.emit(LayoutChange {
            version,
            trigger,
            content_extent,
            visible: plan.visible_range(),
            item_count: items.len(),
        });
        Ok(PassOutcome::Committed(version))
    }

    /// Empty source: hide every slot and show the placeholder instead.
    fn show_placeholder(&self, trigger: Trigger, version: LayoutVersion, generation: u64, epoch: u64) -> PassOutcome {
        if let Outcome::Superseded(stale) =
            self.recycler.retire_all(&self.backend, self.coordinator.clock(), version)
        {
            return PassOutcome::Superseded(stale);
        }

        let (leading, trailing) = {
            let config = self.config.read();
            (config.leading_padding, config.trailing_padding)
        };
        let table = OffsetTableBuilder::new(leading, trailing)
            .with_empty_extent(self.backend.placeholder_extent())
            .build_from_sizes(std::iter::empty(), version);
        let content_extent = table.total_extent();
        if !self.commit_table(Arc::new(table), generation, epoch, version) {
            return PassOutcome::Superseded(version);
        }

        let show = {
            let mut state = self.state.lock();
            state.rendered = true;
            !std::mem::replace(&mut state.placeholder_shown, true)
        };
        if show {
            self.backend.set_placeholder_visible(true);
        }
        self.backend.set_content_extent(content_extent);

        self.layout_changed.emit(LayoutChange {
            version,
            trigger,
            content_extent,
            visible: None,
            item_count: 0,
        });
        PassOutcome::Committed(version)
    }

    fn visible_window(&self) -> Result<VisibleWindow> {
        let config = self.config.read();
        if config.nested {
            return Ok(VisibleWindow::unbounded());
        }
        let host = self.scroll_host.as_ref().ok_or(RecyclerError::MissingScrollHost)?;
        let viewport = host.viewport();
        Ok(VisibleWindow::around(
            viewport.relative_offset(),
            viewport.extent,
            config.overrender_buffer,
        ))
    }

    /// The committed entry for `item`, if the table is fresh.
    fn entry_for(&self, item: &I) -> Option<OffsetEntry> {
        let state = self.state.lock();
        let table = state.fresh_table()?;
        let index = state.items.iter().position(|candidate| candidate == item)?;
        table.get(index).copied()
    }
}

impl<I, B: ViewBackend<I>> fmt::Debug for VirtualCollection<I, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("VirtualCollection")
            .field("items", &state.items.len())
            .field("generation", &state.generation)
            .field("rendered", &state.rendered)
            .field("disposed", &state.disposed)
            .field("version", &self.coordinator.current_version())
            .finish_non_exhaustive()
    }
}

/// Throttle clock. Read through tokio so paused-time tests stay deterministic.
fn now() -> std::time::Instant {
    tokio::time::Instant::now().into_std()
}
