//! Adapter utilities for the `grouped-virtualizer` crate.
//!
//! The `grouped-virtualizer` crate is UI-agnostic and provides the grouping tree, the size
//! table and per-panel window managers. This crate wires them into one framework-neutral
//! controller, [`GroupedList`]:
//!
//! - source-collection edits become tree mutations and deferred index shifts
//! - a layout pass walks the root panel and the nested panel of every realized group
//! - panels of groups that scrolled out of the window are released
//!
//! This crate is intentionally framework-agnostic (no ratatui/egui bindings).
#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

extern crate alloc;

#[cfg(test)]
extern crate std;

#[macro_use]
mod macros;

mod key;
mod list;
mod options;
mod panel;


pub use list::{GroupedList, SourceChange};
pub use options::ListOptions;
pub use panel::GroupedMaterializer;
