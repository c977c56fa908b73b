use alloc::vec::Vec;

use crate::key::{KeyMap, MapKey};
use crate::{Axis, Extent};

/// An ordered sequence of slots whose sizes are tracked by a [`SizeEstimator`].
///
/// Ids are the size-record identities; they must follow items across index shifts.
pub trait ItemSequence {
    type Id;

    fn len(&self) -> usize;

    fn id_at(&self, index: usize) -> Option<Self::Id>;

    /// Number of average-sized units an unmeasured slot at `index` stands for.
    fn span_at(&self, _index: usize) -> usize {
        1
    }

    /// Whether the slot at `index` aggregates other slots (a group container). Aggregate sizes
    /// are recorded for offsets but never feed the running average.
    fn is_aggregate(&self, _index: usize) -> bool {
        false
    }

    /// Maps a scroll position, in flattened units, to a local index.
    fn local_position(&self, position: usize) -> usize {
        position.min(self.len())
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<I: Clone> ItemSequence for [I] {
    type Id = I;

    fn len(&self) -> usize {
        <[I]>::len(self)
    }

    fn id_at(&self, index: usize) -> Option<I> {
        self.get(index).cloned()
    }
}

impl<I: Clone> ItemSequence for Vec<I> {
    type Id = I;

    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn id_at(&self, index: usize) -> Option<I> {
        self.get(index).cloned()
    }
}

/// A remembered scan position at the start of slot `index`.
///
/// It splits the start offset into recorded sizes and unmeasured span, so it stays exact when
/// only the average moves. Valid while the estimator revision, axis and sequence length match.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScanSeed {
    index: usize,
    measured: f64,
    unmeasured: usize,
    axis: Axis,
    revision: u64,
    len: usize,
}

impl ScanSeed {
    pub fn index(&self) -> usize {
        self.index
    }
}

enum SlotSize {
    Recorded(f64),
    Estimated(usize),
}

/// A measured size.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SizeRecord {
    pub extent: Extent,
    /// Aggregate records are lookup-only and excluded from the average.
    pub aggregate: bool,
}

/// Last measured sizes for one top-level owning control.
///
/// Nested panels of the same control share one instance, passed down explicitly. Records are
/// cache hints: a stale record is still used until the slot is measured again.
#[derive(Clone, Debug)]
pub struct SizeEstimator<I> {
    records: KeyMap<I, SizeRecord>,
    sum: Extent,
    counted: usize,
    revision: u64,
}

impl<I: MapKey> Default for SizeEstimator<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: MapKey> SizeEstimator<I> {
    pub fn new() -> Self {
        Self {
            records: KeyMap::default(),
            sum: Extent::ZERO,
            counted: 0,
            revision: 0,
        }
    }

    /// Number of records, aggregate ones included.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Bumped by every change to a record.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn size_of(&self, id: &I) -> Option<Extent> {
        self.records.get(id).map(|r| r.extent)
    }

    pub fn record_of(&self, id: &I) -> Option<SizeRecord> {
        self.records.get(id).copied()
    }

    /// Records the measured size of `id` and returns the previous one.
    pub fn add_or_update_size(&mut self, id: I, extent: Extent) -> Option<Extent> {
        self.insert(id, SizeRecord {
            extent,
            aggregate: false,
        })
    }

    /// Records the size of a group container without letting it skew the average.
    pub fn add_or_update_aggregate_size(&mut self, id: I, extent: Extent) -> Option<Extent> {
        self.insert(id, SizeRecord {
            extent,
            aggregate: true,
        })
    }

    /// Drops the record of an item that left the source for good.
    pub fn evict(&mut self, id: &I) -> Option<Extent> {
        let prev = self.records.remove(id)?;
        self.forget(prev);
        self.revision = self.revision.wrapping_add(1);
        Some(prev.extent)
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.sum = Extent::ZERO;
        self.counted = 0;
        self.revision = self.revision.wrapping_add(1);
    }

    /// Mean recorded size along `axis`, or `0.0` when nothing was measured yet.
    pub fn estimated_average(&self, axis: Axis) -> f64 {
        if self.counted == 0 {
            return 0.0;
        }
        self.sum.along(axis) / self.counted as f64
    }

    pub fn estimated_total_extent(&self, axis: Axis, count: usize) -> f64 {
        self.estimated_average(axis) * count as f64
    }

    /// Recorded size of slot `index`, else the average times the slot's span.
    pub fn extent_at<S>(&self, seq: &S, index: usize, axis: Axis) -> f64
    where
        S: ItemSequence<Id = I> + ?Sized,
    {
        match self.slot_size(seq, index, axis) {
            SlotSize::Recorded(size) => size,
            SlotSize::Estimated(span) => self.estimated_average(axis) * span as f64,
        }
    }

    /// Sum of every slot's extent.
    pub fn sequence_extent<S>(&self, seq: &S, axis: Axis) -> f64
    where
        S: ItemSequence<Id = I> + ?Sized,
    {
        self.offset_for_index(seq, axis, seq.len())
    }

    /// Start offset of slot `index` (clamped to the sequence length).
    pub fn offset_for_index<S>(&self, seq: &S, axis: Axis, index: usize) -> f64
    where
        S: ItemSequence<Id = I> + ?Sized,
    {
        self.offset_for_index_from(seq, axis, index, None)
    }

    /// Index of the first slot ending after `offset`, or the sequence length.
    pub fn index_for_offset<S>(&self, seq: &S, axis: Axis, offset: f64) -> usize
    where
        S: ItemSequence<Id = I> + ?Sized,
    {
        self.index_for_offset_from(seq, axis, offset, None).0
    }

    /// Like [`Self::offset_for_index`], scanning from `seed` when it is valid and closer than 0.
    pub fn offset_for_index_from<S>(
        &self,
        seq: &S,
        axis: Axis,
        index: usize,
        seed: Option<ScanSeed>,
    ) -> f64
    where
        S: ItemSequence<Id = I> + ?Sized,
    {
        let cursor = self.seek_index(seq, axis, index, seed);
        self.seed_offset(&cursor)
    }

    /// Like [`Self::index_for_offset`], scanning from `seed` when valid. Also returns the start
    /// offset of the found slot.
    pub fn index_for_offset_from<S>(
        &self,
        seq: &S,
        axis: Axis,
        offset: f64,
        seed: Option<ScanSeed>,
    ) -> (usize, f64)
    where
        S: ItemSequence<Id = I> + ?Sized,
    {
        let cursor = self.seek_offset(seq, axis, offset, seed);
        (cursor.index, self.seed_offset(&cursor))
    }

    /// Start offset of the slot a seed points at, under the current average.
    pub fn seed_offset(&self, seed: &ScanSeed) -> f64 {
        if seed.index == 0 {
            return 0.0;
        }
        seed.measured + seed.unmeasured as f64 * self.estimated_average(seed.axis)
    }

    /// Scan position at the start of slot `index` (clamped to the sequence length).
    pub fn seek_index<S>(
        &self,
        seq: &S,
        axis: Axis,
        index: usize,
        seed: Option<ScanSeed>,
    ) -> ScanSeed
    where
        S: ItemSequence<Id = I> + ?Sized,
    {
        let index = index.min(seq.len());
        let mut cursor = match self.valid_seed(seq, axis, seed) {
            Some(s) if s.index.abs_diff(index) < index => s,
            _ => self.start_cursor(seq, axis),
        };
        while cursor.index < index {
            self.advance(seq, &mut cursor);
        }
        while cursor.index > index {
            self.retreat(seq, &mut cursor);
        }
        cursor
    }

    /// Scan position at the first slot ending after `offset`, or at the sequence end.
    pub fn seek_offset<S>(
        &self,
        seq: &S,
        axis: Axis,
        offset: f64,
        seed: Option<ScanSeed>,
    ) -> ScanSeed
    where
        S: ItemSequence<Id = I> + ?Sized,
    {
        let len = seq.len();
        if len == 0 || offset <= 0.0 {
            return self.start_cursor(seq, axis);
        }
        let mut cursor = self
            .valid_seed(seq, axis, seed)
            .unwrap_or_else(|| self.start_cursor(seq, axis));

        if offset < self.seed_offset(&cursor) {
            while cursor.index > 0 && self.seed_offset(&cursor) > offset {
                self.retreat(seq, &mut cursor);
            }
            return cursor;
        }

        while cursor.index < len {
            let end = self.seed_offset(&cursor) + self.extent_at(seq, cursor.index, axis);
            if end > offset {
                break;
            }
            self.advance(seq, &mut cursor);
        }
        cursor
    }

    /// Re-validates a seed after the caller changed only records at or after its index.
    pub(crate) fn refresh_seed(&self, seed: ScanSeed) -> ScanSeed {
        ScanSeed {
            revision: self.revision,
            ..seed
        }
    }

    /// Snapshot of every record, for restoring sizes in another estimator.
    pub fn export_sizes(&self) -> Vec<(I, SizeRecord)>
    where
        I: Clone,
    {
        self.records.iter().map(|(id, r)| (id.clone(), *r)).collect()
    }

    pub fn import_sizes(&mut self, records: impl IntoIterator<Item = (I, SizeRecord)>) {
        for (id, record) in records {
            self.insert(id, record);
        }
        vdebug!(total = self.records.len(), "SizeEstimator::import_sizes");
    }

    fn valid_seed<S>(&self, seq: &S, axis: Axis, seed: Option<ScanSeed>) -> Option<ScanSeed>
    where
        S: ItemSequence<Id = I> + ?Sized,
    {
        seed.filter(|s| {
            s.revision == self.revision && s.axis == axis && s.len == seq.len() && s.index <= s.len
        })
    }

    fn start_cursor<S>(&self, seq: &S, axis: Axis) -> ScanSeed
    where
        S: ItemSequence<Id = I> + ?Sized,
    {
        ScanSeed {
            index: 0,
            measured: 0.0,
            unmeasured: 0,
            axis,
            revision: self.revision,
            len: seq.len(),
        }
    }

    fn slot_size<S>(&self, seq: &S, index: usize, axis: Axis) -> SlotSize
    where
        S: ItemSequence<Id = I> + ?Sized,
    {
        match seq
            .id_at(index)
            .and_then(|id| self.records.get(&id).map(|r| r.extent.along(axis)))
        {
            Some(size) => SlotSize::Recorded(size),
            None => SlotSize::Estimated(seq.span_at(index)),
        }
    }

    fn advance<S>(&self, seq: &S, cursor: &mut ScanSeed)
    where
        S: ItemSequence<Id = I> + ?Sized,
    {
        match self.slot_size(seq, cursor.index, cursor.axis) {
            SlotSize::Recorded(size) => cursor.measured += size,
            SlotSize::Estimated(span) => cursor.unmeasured += span,
        }
        cursor.index += 1;
    }

    fn retreat<S>(&self, seq: &S, cursor: &mut ScanSeed)
    where
        S: ItemSequence<Id = I> + ?Sized,
    {
        cursor.index -= 1;
        if cursor.index == 0 {
            cursor.measured = 0.0;
            cursor.unmeasured = 0;
            return;
        }
        match self.slot_size(seq, cursor.index, cursor.axis) {
            SlotSize::Recorded(size) => cursor.measured -= size,
            SlotSize::Estimated(span) => cursor.unmeasured = cursor.unmeasured.saturating_sub(span),
        }
    }

    fn insert(&mut self, id: I, record: SizeRecord) -> Option<Extent> {
        let prev = self.records.insert(id, record);
        if let Some(prev) = prev {
            self.forget(prev);
        }
        if !record.aggregate {
            self.sum.width += record.extent.width;
            self.sum.height += record.extent.height;
            self.counted += 1;
        }
        if prev != Some(record) {
            self.revision = self.revision.wrapping_add(1);
        }
        prev.map(|r| r.extent)
    }

    fn forget(&mut self, record: SizeRecord) {
        if record.aggregate {
            return;
        }
        self.counted = self.counted.saturating_sub(1);
        if self.counted == 0 {
            self.sum = Extent::ZERO;
        } else {
            self.sum.width -= record.extent.width;
            self.sum.height -= record.extent.height;
        }
    }
}
