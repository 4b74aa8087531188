//! Slot recycling and arrangement.
//!
//! Arrangement makes the set of live slots match the items inside the
//! visible window. It runs in three steps:
//!
//! 1. **Plan**: walk the items in order against the offset table and collect
//!    the visible ones. The walk stops at the first entry past the window.
//! 2. **Assign**: give every visible item a slot. A slot already bound to the
//!    item is kept; otherwise an unneeded slot of the same shape is recycled,
//!    preferring the one positioned closest to the target; otherwise a new
//!    view is created.
//! 3. **Apply**: bind, position and show the assigned slots, then hide every
//!    slot left over. Hidden slots stay in the pool for the next pass.
//!
//! Planning and assignment only read the pool. The layout version is checked
//! before the first mutation, so a superseded pass leaves no trace. Backend
//! calls are issued once the pool lock is released.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use parking_lot::Mutex;

use horizon_recycler_core::logging::targets;
use horizon_recycler_core::{LayoutVersion, Outcome, VersionClock};

use crate::backend::{ViewBackend, Visibility};
use crate::error::Result;
use crate::geometry::Axis;
use crate::offset_table::OffsetTable;
use crate::shape::{ShapeId, ShapeRegistry, ShapeResolver};
use crate::slot::{SlotId, SlotPool, SlotSnapshot};
use crate::window::VisibleWindow;

// ============================================================================
// Planning
// ============================================================================

/// A visible item and where it goes.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement<I> {
    pub index: usize,
    pub item: I,
    pub shape: ShapeId,
    pub start: f32,
}

/// The visible items of one pass, in sequence order.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrangementPlan<I> {
    pub placements: Vec<Placement<I>>,
    /// Indices that had no offset entry and were clamped to the first one.
    pub clamped: usize,
}

impl<I> ArrangementPlan<I> {
    /// First and last visible index.
    pub fn visible_range(&self) -> Option<(usize, usize)> {
        Some((self.placements.first()?.index, self.placements.last()?.index))
    }
}

/// Select the items intersecting `window`.
///
/// Items are paired with table entries by index. An index with no entry falls
/// back to the first entry (logged by the table); an empty table ends the
/// walk. The walk stops at the first entry starting past the window.
pub fn plan_window<I: Clone>(
    table: &OffsetTable,
    window: &VisibleWindow,
    items: &[I],
    resolver: &dyn ShapeResolver<I>,
    clock: &VersionClock,
    version: LayoutVersion,
) -> Outcome<ArrangementPlan<I>> {
    let mut plan = ArrangementPlan {
        placements: Vec::new(),
        clamped: 0,
    };

    for (index, item) in items.iter().enumerate() {
        if clock.checkpoint(version).is_none() {
            return Outcome::Superseded(version);
        }
        let Some((entry, clamped)) = table.entry_or_first(index) else {
            break;
        };
        if clamped {
            plan.clamped += 1;
        }
        if window.is_after(entry.start) {
            break;
        }
        if !window.intersects(entry.start, entry.end) {
            continue;
        }
        plan.placements.push(Placement {
            index,
            item: item.clone(),
            shape: resolver.resolve(item),
            start: entry.start,
        });
    }

    Outcome::Current(plan)
}

// ============================================================================
// Reports and statistics
// ============================================================================

/// What one committed arrangement did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArrangeReport {
    /// Visible items now backed by a live slot.
    pub arranged: usize,
    /// Slots that already showed their item.
    pub kept: usize,
    /// Slots recycled and rebound to a different item.
    pub reused: usize,
    /// Views instantiated because no slot of the shape was free.
    pub created: usize,
    /// Slots hidden because they fell out of the window.
    pub retired: usize,
}

/// Lifetime counters for a recycler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecyclerStats {
    /// Views instantiated, measurement specimens included.
    pub created: u64,
    /// Rebinds of an existing slot to a different item.
    pub reused: u64,
    /// Slots that kept their item across a pass.
    pub kept: u64,
    /// Slots hidden after leaving the window.
    pub retired: u64,
    /// Views destroyed on disposal.
    pub destroyed: u64,
}

impl RecyclerStats {
    fn record(&mut self, report: &ArrangeReport) {
        self.created += report.created as u64;
        self.reused += report.reused as u64;
        self.kept += report.kept as u64;
        self.retired += report.retired as u64;
    }
}

// ============================================================================
// Recycler
// ============================================================================

/// Owns every view slot of one collection.
pub struct Recycler<I, V> {
    templates: ShapeRegistry<V>,
    pool: Mutex<SlotPool<I, V>>,
    stats: Mutex<RecyclerStats>,
}

impl<I, V> Recycler<I, V>
where
    I: Clone + Eq + Hash,
    V: Clone,
{
    pub fn new(templates: ShapeRegistry<V>) -> Self {
        Self {
            templates,
            pool: Mutex::new(SlotPool::default()),
            stats: Mutex::new(RecyclerStats::default()),
        }
    }

    pub fn templates(&self) -> &ShapeRegistry<V> {
        &self.templates
    }

    pub fn stats(&self) -> RecyclerStats {
        *self.stats.lock()
    }

    /// Number of slots, live or idle.
    pub fn slot_count(&self) -> usize {
        self.pool.lock().len()
    }

    /// Every slot.
    pub fn slots(&self) -> Vec<SlotSnapshot<I>> {
        self.pool.lock().snapshot()
    }

    /// Slots in use and shown, ordered by position.
    pub fn live_slots(&self) -> Vec<SlotSnapshot<I>> {
        let mut live: Vec<_> = self
            .pool
            .lock()
            .snapshot()
            .into_iter()
            .filter(|slot| slot.in_use && slot.visible)
            .collect();
        live.sort_by(|a, b| {
            let a = a.position.unwrap_or(f32::INFINITY);
            let b = b.position.unwrap_or(f32::INFINITY);
            a.total_cmp(&b)
        });
        live
    }

    /// The view bound to `item`, if its geometry can be trusted.
    pub(crate) fn settled_view_for(&self, item: &I) -> Option<V> {
        let pool = self.pool.lock();
        let slot = pool.get(pool.bound_to(item)?)?;
        slot.settled.then(|| slot.view.clone())
    }

    /// Instantiate a hidden view of `shape` bound to `item` for measurement.
    ///
    /// The view joins the pool straight away, so it is recycled like any other
    /// slot even if the measurement that created it is abandoned.
    pub(crate) fn create_specimen<B>(&self, shape: ShapeId, item: &I, backend: &B) -> Result<(SlotId, V)>
    where
        B: ViewBackend<I, View = V>,
    {
        let view = self.templates.instantiate(shape)?;
        backend.attach(&view);
        backend.bind(&view, item);

        let mut pool = self.pool.lock();
        let id = pool.insert(view.clone(), shape);
        pool.bind(id, item.clone());
        if let Some(slot) = pool.get_mut(id) {
            slot.settled = false;
        }
        self.stats.lock().created += 1;

        tracing::debug!(target: targets::RECYCLER, %shape, "created measurement specimen");
        Ok((id, view))
    }

    pub(crate) fn mark_settled(&self, id: SlotId) {
        if let Some(slot) = self.pool.lock().get_mut(id) {
            slot.settled = true;
        }
    }

    /// Make the live slots match `plan`.
    ///
    /// The pool is locked only to decide and record what changes; views are
    /// attached, bound, positioned and shown after the lock is released, so
    /// the backend may call back into the recycler.
    #[tracing::instrument(skip_all, target = "horizon_recycler::recycler", level = "trace", fields(visible = plan.placements.len()))]
    pub fn arrange<B>(
        &self,
        plan: &ArrangementPlan<I>,
        axis: Axis,
        backend: &B,
        clock: &VersionClock,
        version: LayoutVersion,
    ) -> Result<Outcome<ArrangeReport>>
    where
        B: ViewBackend<I, View = V>,
    {
        let placements = &plan.placements;
        let assigned = Self::assign(&self.pool.lock(), placements);

        if clock.checkpoint(version).is_none() {
            tracing::trace!(target: targets::RECYCLER, %version, "arrangement superseded before mutation");
            return Ok(Outcome::Superseded(version));
        }

        let mut report = ArrangeReport::default();
        let mut ops = Vec::new();
        let mut created = Vec::new();
        for (placement, existing) in placements.iter().zip(&assigned) {
            if existing.is_none() {
                let view = self.templates.instantiate(placement.shape)?;
                ops.push(ViewOp::Attach(view.clone()));
                created.push(view);
            }
        }

        let mut pool = self.pool.lock();
        let mut created = created.into_iter();
        let mut slots = Vec::with_capacity(placements.len());
        for (placement, existing) in placements.iter().zip(assigned) {
            let slot = match existing {
                Some(id) => (id, false),
                None => match created.next() {
                    Some(view) => {
                        report.created += 1;
                        (pool.insert(view, placement.shape), true)
                    }
                    None => continue,
                },
            };
            slots.push((placement, slot));
        }

        for (_, slot) in pool.iter_mut() {
            slot.in_use = false;
        }

        for (placement, (id, fresh)) in slots {
            let rebind = pool
                .get(id)
                .is_some_and(|slot| slot.item.as_ref() != Some(&placement.item));
            if rebind {
                pool.bind(id, placement.item.clone());
            }
            let Some(slot) = pool.get_mut(id) else {
                continue;
            };

            if rebind {
                ops.push(ViewOp::Bind(slot.view.clone(), placement.item.clone()));
                if !fresh {
                    report.reused += 1;
                }
            } else {
                report.kept += 1;
            }
            if slot.position != Some(placement.start) {
                ops.push(ViewOp::Position(slot.view.clone(), placement.start));
                slot.position = Some(placement.start);
            }
            if !slot.visible {
                ops.push(ViewOp::Show(slot.view.clone()));
                slot.visible = true;
            }
            slot.in_use = true;
            slot.settled = true;
            report.arranged += 1;
        }
        report.retired = Self::hide_unused(&mut pool, &mut ops);
        drop(pool);

        for op in &ops {
            op.apply(backend, axis);
        }

        self.stats.lock().record(&report);
        tracing::debug!(
            target: targets::RECYCLER,
            %version,
            arranged = report.arranged,
            kept = report.kept,
            reused = report.reused,
            created = report.created,
            retired = report.retired,
            "arrangement committed"
        );
        Ok(Outcome::Current(report))
    }

    /// Hide every slot, as for an empty source.
    pub fn retire_all<B>(&self, backend: &B, clock: &VersionClock, version: LayoutVersion) -> Outcome<usize>
    where
        B: ViewBackend<I, View = V>,
    {
        let mut pool = self.pool.lock();
        if clock.checkpoint(version).is_none() {
            return Outcome::Superseded(version);
        }
        for (_, slot) in pool.iter_mut() {
            slot.in_use = false;
        }
        let mut ops = Vec::new();
        let retired = Self::hide_unused(&mut pool, &mut ops);
        drop(pool);

        for op in &ops {
            op.apply(backend, Axis::default());
        }
        self.stats.lock().retired += retired as u64;
        Outcome::Current(retired)
    }

    /// Destroy every view. Returns how many were destroyed.
    pub fn dispose<B>(&self, backend: &B) -> usize
    where
        B: ViewBackend<I, View = V>,
    {
        let views = self.pool.lock().drain();
        for view in &views {
            backend.destroy(view);
        }
        self.stats.lock().destroyed += views.len() as u64;
        views.len()
    }

    /// Pick a slot for every placement without touching the pool.
    ///
    /// Slots already showing a placement's item are reserved first so a
    /// recyclable slot is never taken from an item that is still visible.
    /// Equal items are separate placements: each keeps the slot nearest to
    /// it among those showing that item.
    fn assign(pool: &SlotPool<I, V>, placements: &[Placement<I>]) -> Vec<Option<SlotId>> {
        let mut assigned = vec![None; placements.len()];
        let mut taken = HashSet::new();

        let mut showing: HashMap<&I, Vec<(SlotId, ShapeId, Option<f32>)>> = HashMap::new();
        for (id, slot) in pool.iter() {
            if let Some(item) = &slot.item {
                showing.entry(item).or_default().push((id, slot.shape, slot.position));
            }
        }

        for (placement, choice) in placements.iter().zip(assigned.iter_mut()) {
            let Some(candidates) = showing.get(&placement.item) else {
                continue;
            };
            let closest = candidates
                .iter()
                .filter(|(id, shape, _)| *shape == placement.shape && !taken.contains(id))
                .min_by(|a, b| distance(a.2, placement.start).total_cmp(&distance(b.2, placement.start)))
                .map(|(id, _, _)| *id);
            if let Some(id) = closest {
                taken.insert(id);
                *choice = Some(id);
            }
        }

        let mut free: HashMap<ShapeId, Vec<(SlotId, Option<f32>)>> = HashMap::new();
        for (id, slot) in pool.iter() {
            if !taken.contains(&id) {
                free.entry(slot.shape).or_default().push((id, slot.position));
            }
        }

        for (placement, choice) in placements.iter().zip(assigned.iter_mut()) {
            if choice.is_some() {
                continue;
            }
            let Some(bucket) = free.get_mut(&placement.shape) else {
                continue;
            };
            let closest = bucket
                .iter()
                .enumerate()
                .min_by(|(_, a), (_, b)| distance(a.1, placement.start).total_cmp(&distance(b.1, placement.start)))
                .map(|(at, _)| at);
            if let Some(at) = closest {
                *choice = Some(bucket.swap_remove(at).0);
            }
        }

        assigned
    }

    fn hide_unused(pool: &mut SlotPool<I, V>, ops: &mut Vec<ViewOp<I, V>>) -> usize {
        let mut retired = 0;
        for (_, slot) in pool.iter_mut() {
            if !slot.in_use && slot.visible {
                ops.push(ViewOp::Hide(slot.view.clone()));
                slot.visible = false;
                retired += 1;
            }
        }
        retired
    }
}

fn distance(position: Option<f32>, target: f32) -> f32 {
    position.map_or(f32::INFINITY, |p| (p - target).abs())
}

/// A backend call recorded under the pool lock and issued after it.
enum ViewOp<I, V> {
    Attach(V),
    Bind(V, I),
    Position(V, f32),
    Show(V),
    Hide(V),
}

impl<I, V> ViewOp<I, V> {
    fn apply<B>(&self, backend: &B, axis: Axis)
    where
        B: ViewBackend<I, View = V>,
    {
        match self {
            Self::Attach(view) => backend.attach(view),
            Self::Bind(view, item) => backend.bind(view, item),
            Self::Position(view, offset) => backend.position(view, axis, *offset),
            Self::Show(view) => backend.set_visibility(view, Visibility::Shown),
            Self::Hide(view) => backend.set_visibility(view, Visibility::Hidden),
        }
    }
}

impl<I: Clone + Eq + Hash, V> std::fmt::Debug for Recycler<I, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Recycler")
            .field("templates", &self.templates)
            .field("slots", &self.pool.lock().len())
            .finish()
    }
}
