use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use core::mem;

use crate::estimator::{ItemSequence, ScanSeed, SizeEstimator};
use crate::key::MapKey;
use crate::{
    Align, Extent, RealizationWindow, RealizedItem, ScrollUnit, Viewport, VirtualRange,
    WindowOptions,
};

/// A slot handed to a [`ContainerMaterializer`].
#[derive(Debug)]
pub struct Slot<'a, I> {
    pub index: usize,
    pub id: &'a I,
    /// Estimated start offset inside the panel.
    pub offset: f64,
}

impl<I> Clone for Slot<'_, I> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<I> Copy for Slot<'_, I> {}

/// Creates, measures and releases the visual containers of one panel.
///
/// Containers are keyed by slot index. The window manager only asks for containers in index
/// order during a pass and never materializes an index twice without dematerializing it first.
pub trait ContainerMaterializer<I> {
    fn materialize(&mut self, slot: Slot<'_, I>);

    /// Measures the container at `slot`. `scope` is the size table of the owning control, for
    /// containers that lay out a nested panel.
    fn measure(&mut self, slot: Slot<'_, I>, scope: &mut SizeEstimator<I>) -> Extent;

    /// Releases `count` containers starting at `index` and returns how many existed.
    fn dematerialize(&mut self, index: usize, count: usize) -> usize;

    /// Rebinds the container at `old_index` to `new_index` after the source shifted.
    ///
    /// Returning `false` releases the container instead; it is materialized again on demand.
    fn recycle(&mut self, _old_index: usize, _new_index: usize, _id: &I) -> bool {
        false
    }

    /// Reports the visible window of the pass, in panel pixels, once it is resolved and before
    /// any slot inside it is realized. With item-unit scrolling this is the only place the
    /// pixel position of the viewport is known.
    fn begin_window(&mut self, _panel_offset: f64, _panel_end: f64) {}
}

#[derive(Clone, Debug, PartialEq)]
enum PendingOp<I> {
    Recycle {
        old_index: usize,
        new_index: usize,
        id: I,
    },
    Dematerialize {
        index: usize,
        count: usize,
    },
}

/// Keeps a bounded window of realized containers around the viewport of one panel.
///
/// Each [`Self::run_pass`] realizes the slots covering the viewport plus the cache margin,
/// folds their measured sizes into the shared [`SizeEstimator`], then releases every container
/// left outside the window. Source shifts reported between passes are queued and replayed to
/// the materializer at the start of the next pass.
#[derive(Clone, Debug)]
pub struct WindowManager<I> {
    options: WindowOptions,
    realized: BTreeMap<usize, I>,
    placements: Vec<RealizedItem>,
    pending: Vec<PendingOp<I>>,
    seed: Option<ScanSeed>,
    window: RealizationWindow,
    needs_pass: bool,
}

impl<I: MapKey + Clone + PartialEq> WindowManager<I> {
    pub fn new(options: WindowOptions) -> Self {
        vdebug!(
            scroll_unit = ?options.scroll_unit,
            enabled = options.enabled,
            "WindowManager::new"
        );
        Self {
            options,
            realized: BTreeMap::new(),
            placements: Vec::new(),
            pending: Vec::new(),
            seed: None,
            window: RealizationWindow::default(),
            needs_pass: true,
        }
    }

    pub fn options(&self) -> &WindowOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: WindowOptions) {
        if options.axis != self.options.axis {
            self.seed = None;
        }
        self.options = options;
        self.needs_pass = true;
    }

    pub fn enabled(&self) -> bool {
        self.options.enabled
    }

    /// A disabled window manager keeps its realized set and queued shifts but does no work.
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.options.enabled == enabled {
            return;
        }
        vdebug!(enabled, "WindowManager::set_enabled");
        self.options.enabled = enabled;
        self.needs_pass = true;
    }

    /// Whether something changed since the last pass.
    pub fn needs_pass(&self) -> bool {
        self.needs_pass
    }

    /// The window computed by the last pass.
    pub fn window(&self) -> RealizationWindow {
        self.window
    }

    /// Realized items that lie entirely inside the viewport after the last pass.
    pub fn page_size(&self) -> usize {
        self.window.num_in_full_view
    }

    pub fn realized_len(&self) -> usize {
        self.realized.len()
    }

    pub fn is_realized(&self, index: usize) -> bool {
        self.realized.contains_key(&index)
    }

    pub fn realized_id(&self, index: usize) -> Option<&I> {
        self.realized.get(&index)
    }

    pub fn realized_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.realized.keys().copied()
    }

    /// Visits the placement of every container realized by the last pass, in index order.
    pub fn for_each_realized_item(&self, mut f: impl FnMut(RealizedItem)) {
        for item in &self.placements {
            f(*item);
        }
    }

    /// Collects realized placements into `out` (clears `out` first).
    pub fn collect_realized_items(&self, out: &mut Vec<RealizedItem>) {
        out.clear();
        out.extend_from_slice(&self.placements);
    }

    /// Estimated extent of the whole panel.
    pub fn estimated_extent<S>(&self, seq: &S, scope: &SizeEstimator<I>) -> f64
    where
        S: ItemSequence<Id = I> + ?Sized,
    {
        scope.sequence_extent(seq, self.options.axis)
    }

    /// Scroll offset that brings slot `index` into view with the given alignment.
    pub fn scroll_into_view_offset<S>(
        &self,
        seq: &S,
        scope: &SizeEstimator<I>,
        index: usize,
        align: Align,
        viewport: Viewport,
    ) -> f64
    where
        S: ItemSequence<Id = I> + ?Sized,
    {
        let count = seq.len();
        if count == 0 {
            return 0.0;
        }
        let axis = self.options.axis;
        let index = index.min(count - 1);
        let start = scope.offset_for_index_from(seq, axis, index, self.seed);
        let size = scope.extent_at(seq, index, axis);
        let end = start + size;
        let view = viewport.size;

        let target = match align {
            Align::Start => start,
            Align::End => end - view,
            Align::Center => start + size / 2.0 - view / 2.0,
            Align::Auto => {
                if start >= viewport.offset && end <= viewport.end() {
                    viewport.offset
                } else if start < viewport.offset {
                    start
                } else {
                    end - view
                }
            }
        };

        let max = (scope.sequence_extent(seq, axis) - view).max(0.0);
        target.clamp(0.0, max)
    }

    /// Runs one realization pass and returns the resulting window.
    pub fn run_pass<S, M>(
        &mut self,
        viewport: Viewport,
        seq: &S,
        scope: &mut SizeEstimator<I>,
        materializer: &mut M,
    ) -> RealizationWindow
    where
        S: ItemSequence<Id = I> + ?Sized,
        M: ContainerMaterializer<I> + ?Sized,
    {
        if !self.options.enabled {
            self.placements.clear();
            self.window = RealizationWindow::default();
            return self.window;
        }
        self.apply_pending(materializer);
        self.needs_pass = false;

        let axis = self.options.axis;
        let count = seq.len();
        if count == 0 {
            self.dematerialize_outside(VirtualRange::default(), materializer);
            self.seed = None;
            self.placements.clear();
            self.window = RealizationWindow::default();
            return self.window;
        }

        let mut relayout = false;
        if scope.estimated_average(axis) <= 0.0 {
            let probe = self.first_index(viewport, seq, count);
            vdebug!(probe, "WindowManager::run_pass: no average, probing");
            if let Some(id) = seq.id_at(probe) {
                let offset = scope.offset_for_index(seq, axis, probe);
                let (_, changed) = self.realize(
                    Slot {
                        index: probe,
                        id: &id,
                        offset,
                    },
                    seq.is_aggregate(probe),
                    scope,
                    materializer,
                );
                relayout |= changed;
            }
        }

        let (panel_offset, seed) = match self.options.scroll_unit {
            ScrollUnit::Pixel => (viewport.offset, self.seed),
            ScrollUnit::Item => {
                let first = self.first_index(viewport, seq, count);
                let cursor = scope.seek_index(seq, axis, first, self.seed);
                (scope.seed_offset(&cursor), Some(cursor))
            }
        };
        let panel_end = panel_offset + viewport.size;
        materializer.begin_window(panel_offset, panel_end);
        let (before, after) = self
            .options
            .cache
            .resolve(viewport.size, scope.estimated_average(axis));
        let cache_start = panel_offset - before;
        let cache_end = panel_end + after;

        let mut cursor = scope.seek_offset(seq, axis, cache_start, seed);
        if cursor.index() >= count {
            cursor = scope.seek_index(seq, axis, count - 1, Some(cursor));
        }
        let first = cursor.index();
        let mut offset = scope.seed_offset(&cursor);

        self.placements.clear();
        let mut visible: Option<(usize, usize)> = None;
        let mut num_in_view = 0;
        let mut num_in_full_view = 0;
        let mut index = first;
        while index < count
            && offset < cache_end
            && self.placements.len() < self.options.max_realized_per_pass
        {
            let Some(id) = seq.id_at(index) else {
                break;
            };
            let (size, changed) = self.realize(
                Slot {
                    index,
                    id: &id,
                    offset,
                },
                seq.is_aggregate(index),
                scope,
                materializer,
            );
            relayout |= changed;

            let end = offset + size;
            if offset < panel_end && end > panel_offset {
                num_in_view += 1;
                visible = Some((visible.map_or(index, |(start, _)| start), index));
            }
            if offset >= panel_offset && end <= panel_end {
                num_in_full_view += 1;
            }
            self.placements.push(RealizedItem {
                index,
                start: offset,
                size,
            });
            offset = end;
            index += 1;
        }
        if index < count && offset < cache_end {
            vwarn!(
                cap = self.options.max_realized_per_pass,
                "WindowManager::run_pass: per-pass realization cap reached"
            );
        }

        let cached = match self.placements.last() {
            Some(last) => VirtualRange::new(first, last.index + 1),
            None => VirtualRange::default(),
        };
        self.dematerialize_outside(cached, materializer);
        // Only slots at or after `first` were measured since the seek.
        self.seed = Some(scope.refresh_seed(cursor));

        self.window = RealizationWindow {
            cached,
            visible: visible.map_or(VirtualRange::default(), |(start, end)| {
                VirtualRange::new(start, end + 1)
            }),
            num_in_view,
            num_in_full_view,
            panel_offset,
            panel_end,
            cache_start,
            cache_end,
            relayout_requested: relayout,
        };
        vtrace!(
            first = cached.start_index,
            end = cached.end_index,
            num_in_view,
            num_in_full_view,
            relayout,
            "WindowManager::run_pass"
        );

        if relayout {
            if let Some(cb) = &self.options.on_relayout {
                cb();
            }
        }
        self.window
    }

    /// Records that `count` slots were inserted at `index`.
    ///
    /// Realized containers at or after `index` move up; the rebinds are replayed to the
    /// materializer at the start of the next pass.
    pub fn on_items_inserted(&mut self, index: usize, count: usize) {
        if count == 0 {
            return;
        }
        let moved = self.realized.split_off(&index);
        for (old_index, id) in moved.into_iter().rev() {
            let new_index = old_index + count;
            self.pending.push(PendingOp::Recycle {
                old_index,
                new_index,
                id: id.clone(),
            });
            self.realized.insert(new_index, id);
        }
        self.invalidate();
    }

    /// Records that `count` slots were removed at `index`.
    pub fn on_items_removed(&mut self, index: usize, count: usize) {
        if count == 0 {
            return;
        }
        let tail = self.realized.split_off(&index);
        let mut removed = Vec::new();
        let mut recycles = Vec::new();
        for (old_index, id) in tail {
            if old_index < index + count {
                removed.push(old_index);
            } else {
                let new_index = old_index - count;
                recycles.push(PendingOp::Recycle {
                    old_index,
                    new_index,
                    id: id.clone(),
                });
                self.realized.insert(new_index, id);
            }
        }
        for_each_run(&removed, |index, count| {
            self.pending.push(PendingOp::Dematerialize { index, count });
        });
        self.pending.extend(recycles);
        self.invalidate();
    }

    /// Records that the whole source was replaced. Every container is released next pass.
    pub fn on_reset(&mut self) {
        let all: Vec<usize> = self.realized.keys().copied().collect();
        for_each_run(&all, |index, count| {
            self.pending.push(PendingOp::Dematerialize { index, count });
        });
        self.realized.clear();
        self.invalidate();
    }

    /// Releases every container, replaying queued shifts first.
    pub fn release<M>(&mut self, materializer: &mut M)
    where
        M: ContainerMaterializer<I> + ?Sized,
    {
        self.apply_pending(materializer);
        self.dematerialize_outside(VirtualRange::default(), materializer);
        self.placements.clear();
        self.seed = None;
        self.window = RealizationWindow::default();
        self.needs_pass = true;
    }

    fn invalidate(&mut self) {
        self.seed = None;
        self.placements.clear();
        self.needs_pass = true;
    }

    fn first_index<S>(&self, viewport: Viewport, seq: &S, count: usize) -> usize
    where
        S: ItemSequence<Id = I> + ?Sized,
    {
        match self.options.scroll_unit {
            ScrollUnit::Pixel => 0,
            ScrollUnit::Item => seq
                .local_position(viewport.scroll_position)
                .min(count.saturating_sub(1)),
        }
    }

    /// Materializes `slot` unless already realized, measures it and records the size.
    ///
    /// Returns the size along the axis and whether the record changed.
    fn realize<M>(
        &mut self,
        slot: Slot<'_, I>,
        aggregate: bool,
        scope: &mut SizeEstimator<I>,
        materializer: &mut M,
    ) -> (f64, bool)
    where
        M: ContainerMaterializer<I> + ?Sized,
    {
        match self.realized.get(&slot.index).map(|current| current == slot.id) {
            Some(true) => {}
            Some(false) => {
                // The slot now shows a different item.
                materializer.dematerialize(slot.index, 1);
                materializer.materialize(slot);
                self.realized.insert(slot.index, slot.id.clone());
            }
            None => {
                materializer.materialize(slot);
                self.realized.insert(slot.index, slot.id.clone());
            }
        }

        let extent = materializer.measure(slot, scope);
        let prev = if aggregate {
            scope.add_or_update_aggregate_size(slot.id.clone(), extent)
        } else {
            scope.add_or_update_size(slot.id.clone(), extent)
        };
        (extent.along(self.options.axis), prev != Some(extent))
    }

    fn dematerialize_outside<M>(&mut self, keep: VirtualRange, materializer: &mut M)
    where
        M: ContainerMaterializer<I> + ?Sized,
    {
        let stale: Vec<usize> = self
            .realized
            .keys()
            .copied()
            .filter(|i| !keep.contains(*i))
            .collect();
        for_each_run(&stale, |index, count| {
            let removed = materializer.dematerialize(index, count);
            if removed != count {
                vtrace!(index, count, removed, "WindowManager: dematerialize mismatch");
            }
        });
        for index in stale {
            self.realized.remove(&index);
        }
    }

    fn apply_pending<M>(&mut self, materializer: &mut M)
    where
        M: ContainerMaterializer<I> + ?Sized,
    {
        for op in mem::take(&mut self.pending) {
            match op {
                PendingOp::Recycle {
                    old_index,
                    new_index,
                    id,
                } => {
                    if !materializer.recycle(old_index, new_index, &id) {
                        materializer.dematerialize(old_index, 1);
                        if self.realized.get(&new_index) == Some(&id) {
                            self.realized.remove(&new_index);
                        }
                    }
                }
                PendingOp::Dematerialize { index, count } => {
                    materializer.dematerialize(index, count);
                }
            }
        }
    }
}

/// Calls `f(start, len)` for each run of consecutive values in ascending `indices`.
fn for_each_run(indices: &[usize], mut f: impl FnMut(usize, usize)) {
    let mut iter = indices.iter().copied();
    let Some(mut start) = iter.next() else {
        return;
    };
    let mut len = 1;
    for index in iter {
        if index == start + len {
            len += 1;
        } else {
            f(start, len);
            start = index;
            len = 1;
        }
    }
    f(start, len);
}
