use alloc::vec::Vec;

use grouped_virtualizer::{GroupDescriptor, WindowOptions};

/// Configuration for [`crate::GroupedList`].
///
/// `window` is the template every panel's window manager is created from.
pub struct ListOptions<T, K> {
    pub window: WindowOptions,
    pub descriptors: Vec<GroupDescriptor<T, K>>,
}

impl<T, K> ListOptions<T, K> {
    pub fn new(window: WindowOptions) -> Self {
        Self {
            window,
            descriptors: Vec::new(),
        }
    }

    pub fn with_window(mut self, window: WindowOptions) -> Self {
        self.window = window;
        self
    }

    pub fn with_descriptor(mut self, descriptor: GroupDescriptor<T, K>) -> Self {
        self.descriptors.push(descriptor);
        self
    }

    pub fn with_descriptors(mut self, descriptors: Vec<GroupDescriptor<T, K>>) -> Self {
        self.descriptors = descriptors;
        self
    }
}

impl<T, K> Default for ListOptions<T, K> {
    fn default() -> Self {
        Self::new(WindowOptions::default())
    }
}

impl<T, K> Clone for ListOptions<T, K> {
    fn clone(&self) -> Self {
        Self {
            window: self.window.clone(),
            descriptors: self.descriptors.clone(),
        }
    }
}

impl<T, K> core::fmt::Debug for ListOptions<T, K> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ListOptions")
            .field("window", &self.window)
            .field("descriptors", &self.descriptors)
            .finish()
    }
}
