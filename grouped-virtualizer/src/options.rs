use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::tree::{GroupChange, GroupingTree};
use crate::{Axis, GroupDescriptor};

/// A callback fired once per structural change, after scroll positions are recomputed.
pub type ChangeCallback<T, K> = Arc<dyn Fn(&GroupingTree<T, K>, &GroupChange<T>) + Send + Sync>;

/// A callback fired once per batch when the root's item or group totals changed.
pub type CountChangedCallback<T, K> = Arc<dyn Fn(&GroupingTree<T, K>) + Send + Sync>;

/// A fire-and-forget request for the host to schedule another layout pass.
pub type RelayoutCallback = Arc<dyn Fn() + Send + Sync>;

/// Configuration for [`crate::GroupingTree`].
pub struct TreeOptions<T, K> {
    /// One descriptor per grouping level, outermost first. Empty means a flat list.
    pub descriptors: Vec<GroupDescriptor<T, K>>,
    pub on_change: Option<ChangeCallback<T, K>>,
    pub on_count_changed: Option<CountChangedCallback<T, K>>,
    /// Keeps delivered changes in a journal drained by `GroupingTree::take_changes`.
    pub record_changes: bool,
}

impl<T, K> TreeOptions<T, K> {
    pub fn new(descriptors: Vec<GroupDescriptor<T, K>>) -> Self {
        Self {
            descriptors,
            on_change: None,
            on_count_changed: None,
            record_changes: false,
        }
    }

    /// Options for an ungrouped tree: the root holds every item.
    pub fn flat() -> Self {
        Self::new(Vec::new())
    }

    pub fn with_descriptor(mut self, descriptor: GroupDescriptor<T, K>) -> Self {
        self.descriptors.push(descriptor);
        self
    }

    pub fn with_on_change(
        mut self,
        on_change: Option<impl Fn(&GroupingTree<T, K>, &GroupChange<T>) + Send + Sync + 'static>,
    ) -> Self {
        self.on_change = on_change.map(|f| Arc::new(f) as _);
        self
    }

    pub fn with_on_count_changed(
        mut self,
        on_count_changed: Option<impl Fn(&GroupingTree<T, K>) + Send + Sync + 'static>,
    ) -> Self {
        self.on_count_changed = on_count_changed.map(|f| Arc::new(f) as _);
        self
    }

    pub fn with_record_changes(mut self, record_changes: bool) -> Self {
        self.record_changes = record_changes;
        self
    }
}

impl<T, K> Default for TreeOptions<T, K> {
    fn default() -> Self {
        Self::flat()
    }
}

impl<T, K> Clone for TreeOptions<T, K> {
    fn clone(&self) -> Self {
        Self {
            descriptors: self.descriptors.clone(),
            on_change: self.on_change.clone(),
            on_count_changed: self.on_count_changed.clone(),
            record_changes: self.record_changes,
        }
    }
}

impl<T, K> core::fmt::Debug for TreeOptions<T, K> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TreeOptions")
            .field("descriptors", &self.descriptors)
            .field("record_changes", &self.record_changes)
            .finish_non_exhaustive()
    }
}

/// How a panel interprets its scroll position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ScrollUnit {
    /// The viewport offset is in pixels and items move smoothly.
    #[default]
    Pixel,
    /// The scroll position counts flattened slots; the first visible slot is always aligned.
    Item,
}

/// Unit of a [`CacheLength`] margin.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CacheUnit {
    Pixel,
    /// Multiples of the viewport size.
    #[default]
    Page,
    /// Multiples of the estimated average item size.
    Item,
}

/// Margin realized around the viewport, before and after it.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CacheLength {
    pub before: f64,
    pub after: f64,
    pub unit: CacheUnit,
}

impl CacheLength {
    pub const NONE: Self = Self {
        before: 0.0,
        after: 0.0,
        unit: CacheUnit::Pixel,
    };

    pub const fn new(before: f64, after: f64, unit: CacheUnit) -> Self {
        Self {
            before,
            after,
            unit,
        }
    }

    pub const fn pixels(before: f64, after: f64) -> Self {
        Self::new(before, after, CacheUnit::Pixel)
    }

    pub const fn pages(before: f64, after: f64) -> Self {
        Self::new(before, after, CacheUnit::Page)
    }

    pub const fn items(before: f64, after: f64) -> Self {
        Self::new(before, after, CacheUnit::Item)
    }

    /// Converts both margins to pixels. Negative margins count as zero.
    pub fn resolve(&self, viewport_size: f64, average_item_size: f64) -> (f64, f64) {
        let scale = match self.unit {
            CacheUnit::Pixel => 1.0,
            CacheUnit::Page => viewport_size,
            CacheUnit::Item => average_item_size,
        };
        (
            (self.before * scale).max(0.0),
            (self.after * scale).max(0.0),
        )
    }
}

impl Default for CacheLength {
    fn default() -> Self {
        Self::pages(1.0, 1.0)
    }
}

/// Configuration for [`crate::WindowManager`].
///
/// Cheap to clone: the relayout callback is shared.
pub struct WindowOptions {
    pub axis: Axis,
    pub scroll_unit: ScrollUnit,
    pub cache: CacheLength,
    /// A disabled window manager performs no work and reports an empty window.
    pub enabled: bool,
    /// Upper bound on containers realized by a single pass.
    pub max_realized_per_pass: usize,
    /// Fired after a pass in which a measurement changed a size record.
    pub on_relayout: Option<RelayoutCallback>,
}

impl WindowOptions {
    pub const DEFAULT_MAX_REALIZED_PER_PASS: usize = 10_000;

    pub fn new() -> Self {
        Self {
            axis: Axis::Vertical,
            scroll_unit: ScrollUnit::Pixel,
            cache: CacheLength::default(),
            enabled: true,
            max_realized_per_pass: Self::DEFAULT_MAX_REALIZED_PER_PASS,
            on_relayout: None,
        }
    }

    pub fn with_axis(mut self, axis: Axis) -> Self {
        self.axis = axis;
        self
    }

    pub fn with_scroll_unit(mut self, scroll_unit: ScrollUnit) -> Self {
        self.scroll_unit = scroll_unit;
        self
    }

    pub fn with_cache(mut self, cache: CacheLength) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_max_realized_per_pass(mut self, max_realized_per_pass: usize) -> Self {
        self.max_realized_per_pass = max_realized_per_pass.max(1);
        self
    }

    pub fn with_on_relayout(
        mut self,
        on_relayout: Option<impl Fn() + Send + Sync + 'static>,
    ) -> Self {
        self.on_relayout = on_relayout.map(|f| Arc::new(f) as _);
        self
    }
}

impl Default for WindowOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for WindowOptions {
    fn clone(&self) -> Self {
        Self {
            axis: self.axis,
            scroll_unit: self.scroll_unit,
            cache: self.cache,
            enabled: self.enabled,
            max_realized_per_pass: self.max_realized_per_pass,
            on_relayout: self.on_relayout.clone(),
        }
    }
}

impl core::fmt::Debug for WindowOptions {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("WindowOptions")
            .field("axis", &self.axis)
            .field("scroll_unit", &self.scroll_unit)
            .field("cache", &self.cache)
            .field("enabled", &self.enabled)
            .field("max_realized_per_pass", &self.max_realized_per_pass)
            .finish_non_exhaustive()
    }
}
