//! A headless grouping tree and container-window manager for grouped, virtualized lists.
//!
//! For a controller that wires a source collection, the tree and nested panels together, see
//! the `grouped-virtualizer-adapter` crate.
//!
//! The crate has two halves:
//! - [`GroupingTree`] keeps a live multi-level grouping of a flat collection, updated
//!   incrementally on add/remove, with one linear "scroll position" numbering across group
//!   headers and items.
//! - [`WindowManager`] decides, per layout pass, which slots of a panel need a realized
//!   container, using a shared [`SizeEstimator`] to turn pixel offsets into indexes.
//!
//! It is UI-agnostic. A TUI/GUI layer is expected to provide:
//! - viewport geometry (offset and size along the scroll axis)
//! - a [`ContainerMaterializer`] that creates, measures and releases containers
//! - the item collection and its change notifications
#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

extern crate alloc;

#[cfg(test)]
extern crate std;

#[macro_use]
mod macros;

mod descriptor;
mod estimator;
mod key;
mod options;
mod state;
mod tree;
mod types;
mod window;

#[cfg(test)]
mod tests;

pub use descriptor::{GroupDescriptor, KeySelector};
pub use estimator::{ItemSequence, ScanSeed, SizeEstimator, SizeRecord};
pub use options::{
    CacheLength, CacheUnit, ChangeCallback, CountChangedCallback, RelayoutCallback, ScrollUnit,
    TreeOptions, WindowOptions,
};
pub use state::Viewport;
pub use tree::{
    Affected, ChangeKind, FlatEntry, FlatView, GroupChange, GroupingTree, NodeView,
};
pub use types::{
    Align, Axis, Extent, GroupKey, NodeId, RealizationWindow, RealizedItem, SlotKey, VirtualRange,
};
pub use window::{ContainerMaterializer, Slot, WindowManager};

#[doc(hidden)]
pub use key::MapKey;
