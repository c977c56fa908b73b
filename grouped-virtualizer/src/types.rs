use core::fmt;

/// The scrolling axis of a panel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Axis {
    #[default]
    Vertical,
    Horizontal,
}

/// A measured container size.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Extent {
    pub width: f64,
    pub height: f64,
}

impl Extent {
    pub const ZERO: Self = Self {
        width: 0.0,
        height: 0.0,
    };

    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Builds an extent whose size along `axis` is `main` and whose cross size is `cross`.
    pub fn from_axis(axis: Axis, main: f64, cross: f64) -> Self {
        match axis {
            Axis::Vertical => Self::new(cross, main),
            Axis::Horizontal => Self::new(main, cross),
        }
    }

    /// Size along the scrolling axis.
    pub fn along(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Vertical => self.height,
            Axis::Horizontal => self.width,
        }
    }

    /// Size across the scrolling axis.
    pub fn across(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Vertical => self.width,
            Axis::Horizontal => self.height,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Align {
    Start,
    Center,
    End,
    Auto,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VirtualRange {
    pub start_index: usize,
    pub end_index: usize, // exclusive
}

impl VirtualRange {
    pub fn new(start_index: usize, end_index: usize) -> Self {
        Self {
            start_index,
            end_index,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start_index >= self.end_index
    }

    pub fn len(&self) -> usize {
        self.end_index.saturating_sub(self.start_index)
    }

    pub fn contains(&self, index: usize) -> bool {
        index >= self.start_index && index < self.end_index
    }

    /// Inclusive first index, `None` when empty.
    pub fn first(&self) -> Option<usize> {
        (!self.is_empty()).then_some(self.start_index)
    }

    /// Inclusive last index, `None` when empty.
    pub fn last(&self) -> Option<usize> {
        (!self.is_empty()).then(|| self.end_index - 1)
    }
}

/// A realized container and its estimated placement inside its panel.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RealizedItem {
    pub index: usize,
    /// Start offset along the scroll axis, relative to the panel origin.
    pub start: f64,
    /// Size along the scroll axis.
    pub size: f64,
}

impl RealizedItem {
    pub fn end(&self) -> f64 {
        self.start + self.size
    }
}

/// The result of one window-manager pass, in item-count space.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RealizationWindow {
    /// Indexes holding a realized container after the pass (viewport plus cache margin).
    pub cached: VirtualRange,
    /// Indexes intersecting the viewport (no cache margin).
    pub visible: VirtualRange,
    pub num_in_view: usize,
    /// Realized items that lie entirely inside the viewport. Used as the page size.
    pub num_in_full_view: usize,
    pub panel_offset: f64,
    pub panel_end: f64,
    pub cache_start: f64,
    pub cache_end: f64,
    /// Set when a measurement changed a size record during the pass.
    pub relayout_requested: bool,
}

impl RealizationWindow {
    pub fn is_empty(&self) -> bool {
        self.cached.is_empty()
    }

    pub fn first_cached(&self) -> Option<usize> {
        self.cached.first()
    }

    pub fn last_cached(&self) -> Option<usize> {
        self.cached.last()
    }

    pub fn first_visible(&self) -> Option<usize> {
        self.visible.first()
    }

    pub fn last_visible(&self) -> Option<usize> {
        self.visible.last()
    }

    /// Last index whose container lies entirely inside the viewport.
    pub fn last_in_full_view(&self) -> Option<usize> {
        let first = self.visible.first()?;
        (self.num_in_full_view > 0).then(|| first + self.num_in_full_view - 1)
    }
}

/// A generational handle to a node of a [`crate::GroupingTree`].
///
/// A slot freed and later reused gets a new generation, so a stale `NodeId` never resolves to
/// the fresh node.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeId(u32, u32);

impl NodeId {
    pub(crate) const fn new(slot: u32, generation: u32) -> Self {
        Self(slot, generation)
    }

    pub(crate) fn slot(self) -> usize {
        self.0 as usize
    }

    pub fn generation(self) -> u32 {
        self.1
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({}v{})", self.0, self.1)
    }
}

/// The bucketing value of a group.
///
/// `Missing` stands for items whose key selector produced nothing. It renders with the level's
/// placeholder label but never equals a `Value`, even one that renders the same.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GroupKey<K> {
    Value(K),
    Missing,
}

impl<K> GroupKey<K> {
    pub fn value(&self) -> Option<&K> {
        match self {
            Self::Value(k) => Some(k),
            Self::Missing => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }
}

/// Size-record identity of a slot in a grouped panel.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SlotKey<T> {
    Group(NodeId),
    Item(T),
}

impl<T> SlotKey<T> {
    pub fn as_group(&self) -> Option<NodeId> {
        match self {
            Self::Group(id) => Some(*id),
            Self::Item(_) => None,
        }
    }

    pub fn as_item(&self) -> Option<&T> {
        match self {
            Self::Group(_) => None,
            Self::Item(item) => Some(item),
        }
    }
}
