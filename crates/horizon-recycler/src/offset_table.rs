//! Offset tables: sequence index → main-axis range.
//!
//! A table is rebuilt wholesale on every measuring pass by a single forward
//! accumulation over the item sequence. Entries are contiguous: each one
//! starts where the previous one ended, so `start` is monotonic and the
//! arrangement walk can stop at the first entry past the window.

use std::future::Future;

use horizon_recycler_core::logging::targets;
use horizon_recycler_core::{LayoutVersion, Outcome, VersionClock};

use crate::error::Result;
use crate::geometry::ItemSize;

/// One item's placement along the main axis: `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OffsetEntry {
    pub index: usize,
    pub start: f32,
    pub end: f32,
    pub leading_margin: f32,
}

impl OffsetEntry {
    pub fn extent(&self) -> f32 {
        self.end - self.start
    }
}

/// Source of per-item sizes for the builder.
///
/// Implemented by the collection on top of its size oracle; tests implement
/// it directly.
pub trait MeasureItem<I> {
    /// Measure `item`. May suspend until the backend settles a view.
    fn measure_item(&self, item: &I) -> impl Future<Output = Result<ItemSize>>;
}

/// A complete offset table for one item snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct OffsetTable {
    entries: Vec<OffsetEntry>,
    total_extent: f32,
    version: LayoutVersion,
}

impl OffsetTable {
    /// Number of entries; equals the snapshot length.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&OffsetEntry> {
        self.entries.get(index)
    }

    pub fn first(&self) -> Option<&OffsetEntry> {
        self.entries.first()
    }

    pub fn last(&self) -> Option<&OffsetEntry> {
        self.entries.last()
    }

    pub fn entries(&self) -> &[OffsetEntry] {
        &self.entries
    }

    /// Content extent: the last entry's end plus trailing padding, or the
    /// empty-state extent when there are no entries.
    pub fn total_extent(&self) -> f32 {
        self.total_extent
    }

    /// The layout version this table was built under.
    pub fn version(&self) -> LayoutVersion {
        self.version
    }

    /// The entry for `index`, falling back to the first entry when `index` is
    /// out of range. The flag is `true` when the fallback was used.
    ///
    /// Returns `None` only for an empty table.
    pub fn entry_or_first(&self, index: usize) -> Option<(OffsetEntry, bool)> {
        match self.entries.get(index) {
            Some(entry) => Some((*entry, false)),
            None => {
                let first = self.entries.first()?;
                tracing::warn!(
                    target: targets::OFFSET_TABLE,
                    index,
                    table_len = self.entries.len(),
                    "no offset entry for index, clamping to first entry"
                );
                Some((*first, true))
            }
        }
    }
}

/// Builds [`OffsetTable`]s.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OffsetTableBuilder {
    origin: f32,
    trailing_padding: f32,
    empty_extent: Option<f32>,
}

impl OffsetTableBuilder {
    /// A builder whose first entry starts at `leading_padding`.
    pub fn new(leading_padding: f32, trailing_padding: f32) -> Self {
        Self {
            origin: leading_padding,
            trailing_padding,
            empty_extent: None,
        }
    }

    /// Extent reported for an empty sequence, usually the placeholder's.
    ///
    /// Without it an empty table spans both paddings.
    pub fn with_empty_extent(mut self, extent: Option<f32>) -> Self {
        self.empty_extent = extent;
        self
    }

    /// Measure every item in order and accumulate the table.
    ///
    /// The version is checked after each measurement; once superseded the
    /// partial table is dropped and `Outcome::Superseded` is returned.
    #[tracing::instrument(skip_all, target = "horizon_recycler::offset_table", level = "trace", fields(items = items.len()))]
    pub async fn build<I, M>(
        &self,
        items: &[I],
        measurer: &M,
        clock: &VersionClock,
        version: LayoutVersion,
    ) -> Result<Outcome<OffsetTable>>
    where
        M: MeasureItem<I>,
    {
        if clock.checkpoint(version).is_none() {
            return Ok(Outcome::Superseded(version));
        }

        let mut entries = Vec::with_capacity(items.len());
        let mut running = self.origin;
        for (index, item) in items.iter().enumerate() {
            let size = measurer.measure_item(item).await?;
            if clock.checkpoint(version).is_none() {
                tracing::trace!(
                    target: targets::OFFSET_TABLE,
                    %version,
                    measured = index + 1,
                    "offset table build superseded"
                );
                return Ok(Outcome::Superseded(version));
            }
            entries.push(Self::entry(index, running, size));
            running += size.extent;
        }

        Ok(Outcome::Current(self.finish(entries, version)))
    }

    /// Build from sizes that are already known, without suspending.
    pub fn build_from_sizes<S>(&self, sizes: S, version: LayoutVersion) -> OffsetTable
    where
        S: IntoIterator<Item = ItemSize>,
    {
        let mut running = self.origin;
        let entries = sizes
            .into_iter()
            .enumerate()
            .map(|(index, size)| {
                let entry = Self::entry(index, running, size);
                running += size.extent;
                entry
            })
            .collect();
        self.finish(entries, version)
    }

    fn entry(index: usize, start: f32, size: ItemSize) -> OffsetEntry {
        OffsetEntry {
            index,
            start,
            end: start + size.extent,
            leading_margin: size.leading_margin,
        }
    }

    fn finish(&self, entries: Vec<OffsetEntry>, version: LayoutVersion) -> OffsetTable {
        let total_extent = match entries.last() {
            Some(last) => last.end + self.trailing_padding,
            None => self
                .empty_extent
                .unwrap_or(self.origin + self.trailing_padding),
        };
        tracing::debug!(
            target: targets::OFFSET_TABLE,
            entries = entries.len(),
            total_extent,
            %version,
            "offset table built"
        );
        OffsetTable {
            entries,
            total_extent,
            version,
        }
    }
}
