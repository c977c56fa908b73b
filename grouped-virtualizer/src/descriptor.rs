use alloc::string::{String, ToString};
use alloc::sync::Arc;
use core::fmt;

use crate::GroupKey;

/// Maps an item to its group value at one level. `None` means the item has no key there.
pub type KeySelector<T, K> = Arc<dyn Fn(&T) -> Option<K> + Send + Sync>;

/// One grouping level: how to compute an item's key, and how to label items without one.
///
/// Cheap to clone: the selector is shared.
pub struct GroupDescriptor<T, K> {
    key_selector: KeySelector<T, K>,
    null_key_label: Arc<str>,
}

impl<T, K> GroupDescriptor<T, K> {
    pub fn new(
        key_selector: impl Fn(&T) -> Option<K> + Send + Sync + 'static,
        null_key_label: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            key_selector: Arc::new(key_selector),
            null_key_label: null_key_label.into(),
        }
    }

    /// Returns the item's group key at this level, or [`GroupKey::Missing`] when the selector
    /// yields nothing.
    pub fn key_of(&self, item: &T) -> GroupKey<K> {
        match (self.key_selector)(item) {
            Some(k) => GroupKey::Value(k),
            None => GroupKey::Missing,
        }
    }

    pub fn null_key_label(&self) -> &str {
        &self.null_key_label
    }

    pub fn key_selector(&self) -> &KeySelector<T, K> {
        &self.key_selector
    }

    pub fn with_null_key_label(mut self, null_key_label: impl Into<Arc<str>>) -> Self {
        self.null_key_label = null_key_label.into();
        self
    }

    /// Display label for a group key at this level.
    pub fn label(&self, key: &GroupKey<K>) -> String
    where
        K: fmt::Display,
    {
        match key {
            GroupKey::Value(k) => k.to_string(),
            GroupKey::Missing => String::from(&*self.null_key_label),
        }
    }
}

impl<T, K> Clone for GroupDescriptor<T, K> {
    fn clone(&self) -> Self {
        Self {
            key_selector: Arc::clone(&self.key_selector),
            null_key_label: Arc::clone(&self.null_key_label),
        }
    }
}

impl<T, K> fmt::Debug for GroupDescriptor<T, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupDescriptor")
            .field("null_key_label", &self.null_key_label)
            .finish_non_exhaustive()
    }
}
