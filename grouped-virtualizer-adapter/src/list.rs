use alloc::collections::BTreeSet;
use alloc::vec::Vec;

use grouped_virtualizer::{
    Affected, ChangeKind, GroupDescriptor, GroupingTree, MapKey, NodeId, RealizationWindow,
    ScrollUnit, SizeEstimator, SlotKey, TreeOptions, Viewport, WindowManager,
};

use crate::key::KeyMap;
use crate::panel::{GroupedMaterializer, Headers, PanelMaterializer, Panels};
use crate::ListOptions;

/// A change to the flat source collection.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SourceChange<T> {
    /// `items` were inserted at `index`.
    Add { index: usize, items: Vec<T> },
    /// `count` items were removed at `index`.
    Remove { index: usize, count: usize },
    /// The items at `index..index + items.len()` were replaced by `items`.
    Replace { index: usize, items: Vec<T> },
    /// The whole collection was replaced.
    Reset(Vec<T>),
}

/// A grouped, virtualized list: the flat source, its grouping tree, the shared size table and
/// one window manager per realized panel.
///
/// The root panel lists the top-level groups (or the items, without descriptors). Every
/// realized group container hosts a nested panel over its own children, laid out while the
/// group slot is measured. Groups keep their place in order of first arrival; new items are
/// appended to their group.
///
/// Adapters drive it by:
/// - reporting source edits through [`Self::apply`] (or the `push`/`extend`/`remove` helpers)
/// - calling [`Self::layout`] whenever [`Self::needs_layout`] or the viewport changed
pub struct GroupedList<T, K> {
    options: ListOptions<T, K>,
    source: Vec<T>,
    tree: GroupingTree<T, K>,
    sizes: SizeEstimator<SlotKey<T>>,
    root: WindowManager<SlotKey<T>>,
    panels: Panels<T>,
    headers: Headers,
    viewport: Viewport,
}

impl<T, K> GroupedList<T, K>
where
    T: MapKey + Clone + PartialEq,
    K: MapKey + Clone,
{
    pub fn new(options: ListOptions<T, K>) -> Self {
        let tree = GroupingTree::new(
            TreeOptions::new(options.descriptors.clone()).with_record_changes(true),
        );
        Self {
            root: WindowManager::new(options.window.clone()),
            options,
            source: Vec::new(),
            tree,
            sizes: SizeEstimator::new(),
            panels: Panels::default(),
            headers: Headers::default(),
            viewport: Viewport::default(),
        }
    }

    pub fn with_items(options: ListOptions<T, K>, items: Vec<T>) -> Self {
        let mut list = Self::new(options);
        list.reset(items);
        list
    }

    pub fn options(&self) -> &ListOptions<T, K> {
        &self.options
    }

    pub fn source(&self) -> &[T] {
        &self.source
    }

    pub fn tree(&self) -> &GroupingTree<T, K> {
        &self.tree
    }

    pub fn sizes(&self) -> &SizeEstimator<SlotKey<T>> {
        &self.sizes
    }

    /// The window manager of the panel hosted by `node`: the root, or a realized group.
    pub fn window_manager(&self, node: NodeId) -> Option<&WindowManager<SlotKey<T>>> {
        if node == self.tree.root() {
            return Some(&self.root);
        }
        self.panels.get(&node)
    }

    /// Groups whose nested panel is currently kept alive.
    pub fn panel_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.panels.keys().copied()
    }

    /// Window of the panel hosted by `node` after the last layout.
    pub fn window_of(&self, node: NodeId) -> Option<RealizationWindow> {
        self.window_manager(node).map(WindowManager::window)
    }

    pub fn needs_layout(&self) -> bool {
        self.root.needs_pass() || self.panels.values().any(WindowManager::needs_pass)
    }

    /// Applies a source edit to the collection and the tree, and queues the resulting shifts on
    /// the affected panels.
    pub fn apply(&mut self, change: SourceChange<T>) {
        match change {
            SourceChange::Add { index, items } => {
                let index = index.min(self.source.len());
                self.source.splice(index..index, items.iter().cloned());
                self.tree.add_range(items);
            }
            SourceChange::Remove { index, count } => {
                let start = index.min(self.source.len());
                let end = index.saturating_add(count).min(self.source.len());
                let removed: Vec<T> = self.source.drain(start..end).collect();
                self.tree.remove_range(&removed);
            }
            SourceChange::Replace { index, items } => {
                let start = index.min(self.source.len());
                let end = index.saturating_add(items.len()).min(self.source.len());
                let old: Vec<T> = self
                    .source
                    .splice(start..end, items.iter().cloned())
                    .collect();
                self.tree.batch(|tree| {
                    tree.remove_range(&old);
                    tree.add_range(items);
                });
            }
            SourceChange::Reset(items) => {
                {
                    let keep: KeyMap<&T, ()> = items.iter().map(|item| (item, ())).collect();
                    for item in &self.source {
                        if !keep.contains_key(item) {
                            self.sizes.evict(&SlotKey::Item(item.clone()));
                        }
                    }
                }
                adebug!(len = items.len(), "GroupedList::reset");
                self.tree.batch(|tree| {
                    tree.clear();
                    tree.add_range(items.iter().cloned());
                });
                self.source = items;
            }
        }
        self.route_changes();
    }

    pub fn push(&mut self, item: T) {
        let index = self.source.len();
        self.apply(SourceChange::Add {
            index,
            items: alloc::vec![item],
        });
    }

    pub fn extend(&mut self, items: impl IntoIterator<Item = T>) {
        let index = self.source.len();
        self.apply(SourceChange::Add {
            index,
            items: items.into_iter().collect(),
        });
    }

    /// Removes the first source item equal to `item`. Returns `false` when it is not present.
    pub fn remove(&mut self, item: &T) -> bool {
        let Some(index) = self.source.iter().position(|x| x == item) else {
            return false;
        };
        self.apply(SourceChange::Remove { index, count: 1 });
        true
    }

    pub fn reset(&mut self, items: Vec<T>) {
        self.apply(SourceChange::Reset(items));
    }

    pub fn set_descriptors(&mut self, descriptors: Vec<GroupDescriptor<T, K>>) {
        self.options.descriptors = descriptors.clone();
        self.tree.set_descriptors(descriptors, &self.source);
        self.route_changes();
    }

    pub fn push_descriptor(&mut self, descriptor: GroupDescriptor<T, K>) {
        let index = self.tree.depth();
        self.insert_descriptor(index, descriptor);
    }

    pub fn insert_descriptor(&mut self, index: usize, descriptor: GroupDescriptor<T, K>) {
        self.tree.insert_descriptor(index, descriptor, &self.source);
        self.sync_descriptors();
    }

    pub fn remove_descriptor(&mut self, index: usize) -> Option<GroupDescriptor<T, K>> {
        let removed = self.tree.remove_descriptor(index, &self.source);
        self.sync_descriptors();
        removed
    }

    pub fn replace_descriptor(
        &mut self,
        index: usize,
        descriptor: GroupDescriptor<T, K>,
    ) -> Option<GroupDescriptor<T, K>> {
        let replaced = self.tree.replace_descriptor(index, descriptor, &self.source);
        self.sync_descriptors();
        replaced
    }

    /// Stops all realization work. Realized containers and queued shifts are kept.
    pub fn detach(&mut self) {
        self.set_enabled(false);
    }

    pub fn attach(&mut self) {
        self.set_enabled(true);
    }

    pub fn is_attached(&self) -> bool {
        self.options.window.enabled
    }

    /// Runs a layout pass over the root panel and every realized group, then drops the panels
    /// of groups that are no longer realized.
    pub fn layout<H>(&mut self, viewport: Viewport, host: &mut H) -> RealizationWindow
    where
        H: GroupedMaterializer<T> + ?Sized,
    {
        self.viewport = viewport;
        let root = self.tree.root();
        let Some(view) = self.tree.view(root) else {
            return RealizationWindow::default();
        };
        let mut materializer = PanelMaterializer {
            tree: &self.tree,
            panels: &mut self.panels,
            headers: &mut self.headers,
            options: &self.options.window,
            host: &mut *host,
            panel: root,
            viewport,
        };
        let window = self
            .root
            .run_pass(viewport, &view, &mut self.sizes, &mut materializer);
        if self.options.window.enabled {
            self.collect_panels(host);
        }
        window
    }

    /// Releases every container of every panel.
    pub fn release<H>(&mut self, host: &mut H)
    where
        H: GroupedMaterializer<T> + ?Sized,
    {
        let ids: Vec<NodeId> = self.panels.keys().copied().collect();
        for id in ids {
            self.release_panel(id, host);
        }
        let root = self.tree.root();
        let mut materializer = PanelMaterializer {
            tree: &self.tree,
            panels: &mut self.panels,
            headers: &mut self.headers,
            options: &self.options.window,
            host,
            panel: root,
            viewport: self.viewport,
        };
        self.root.release(&mut materializer);
    }

    /// Scrollable extent: estimated pixels, or flattened slots with item-unit scrolling.
    pub fn scroll_extent(&self) -> f64 {
        match self.options.window.scroll_unit {
            ScrollUnit::Pixel => match self.tree.view(self.tree.root()) {
                Some(view) => self.root.estimated_extent(&view, &self.sizes),
                None => 0.0,
            },
            ScrollUnit::Item => self.tree.len() as f64,
        }
    }

    /// Visible extent in the same unit as [`Self::scroll_extent`].
    pub fn viewport_extent(&self) -> f64 {
        match self.options.window.scroll_unit {
            ScrollUnit::Pixel => self.viewport.size,
            ScrollUnit::Item => self.page_slots() as f64,
        }
    }

    pub fn page_down(&self, viewport: Viewport) -> Viewport {
        match self.options.window.scroll_unit {
            ScrollUnit::Pixel => {
                let max = (self.scroll_extent() - viewport.size).max(0.0);
                Viewport {
                    offset: (viewport.offset + viewport.size).clamp(0.0, max),
                    ..viewport
                }
            }
            ScrollUnit::Item => Viewport {
                scroll_position: (viewport.scroll_position + self.page_slots())
                    .min(self.tree.len().saturating_sub(1)),
                ..viewport
            },
        }
    }

    pub fn page_up(&self, viewport: Viewport) -> Viewport {
        match self.options.window.scroll_unit {
            ScrollUnit::Pixel => {
                let max = (self.scroll_extent() - viewport.size).max(0.0);
                Viewport {
                    offset: (viewport.offset - viewport.size).clamp(0.0, max),
                    ..viewport
                }
            }
            ScrollUnit::Item => Viewport {
                scroll_position: viewport.scroll_position.saturating_sub(self.page_slots()),
                ..viewport
            },
        }
    }

    /// Flattened slots fully in view. A group slot counts when its header is, whatever part of
    /// its body shows; its children are counted in its own panel.
    fn page_slots(&self) -> usize {
        let panels = core::iter::once(&self.root).chain(self.panels.values());
        let mut slots = 0;
        for wm in panels {
            let window = wm.window();
            wm.for_each_realized_item(|item| {
                let size = wm
                    .realized_id(item.index)
                    .and_then(SlotKey::as_group)
                    .and_then(|group| self.headers.get(&group).copied())
                    .unwrap_or(item.size);
                if item.start >= window.panel_offset && item.start + size <= window.panel_end {
                    slots += 1;
                }
            });
        }
        slots.max(1)
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.options.window.enabled = enabled;
        self.root.set_enabled(enabled);
        for wm in self.panels.values_mut() {
            wm.set_enabled(enabled);
        }
    }

    fn sync_descriptors(&mut self) {
        self.options.descriptors = self.tree.descriptors().to_vec();
        self.route_changes();
    }

    /// Turns the tree journal into deferred shifts on the owning panels.
    fn route_changes(&mut self) {
        let root = self.tree.root();
        for change in self.tree.take_changes() {
            if change.kind == ChangeKind::Remove {
                match &change.affected {
                    Affected::Items(items) => {
                        for item in items {
                            self.sizes.evict(&SlotKey::Item(item.clone()));
                        }
                    }
                    Affected::Groups(groups) => {
                        for group in groups {
                            self.sizes.evict(&SlotKey::Group(*group));
                        }
                    }
                    Affected::None => {}
                }
            }

            let wm = if change.node == root {
                Some(&mut self.root)
            } else {
                self.panels.get_mut(&change.node)
            };
            let Some(wm) = wm else {
                continue;
            };
            match change.kind {
                ChangeKind::Add => wm.on_items_inserted(change.position, change.count()),
                ChangeKind::Remove => wm.on_items_removed(change.position, change.count()),
                ChangeKind::Reset => wm.on_reset(),
            }
        }
    }

    fn collect_panels<H>(&mut self, host: &mut H)
    where
        H: GroupedMaterializer<T> + ?Sized,
    {
        let mut live = BTreeSet::new();
        let mut stack: Vec<NodeId> = realized_groups(&self.root).collect();
        while let Some(id) = stack.pop() {
            if live.insert(id) {
                if let Some(wm) = self.panels.get(&id) {
                    stack.extend(realized_groups(wm));
                }
            }
        }

        let stale: Vec<NodeId> = self
            .panels
            .keys()
            .copied()
            .filter(|id| !live.contains(id))
            .collect();
        for id in stale {
            self.release_panel(id, host);
        }
    }

    fn release_panel<H>(&mut self, id: NodeId, host: &mut H)
    where
        H: GroupedMaterializer<T> + ?Sized,
    {
        let Some(mut wm) = self.panels.remove(&id) else {
            return;
        };
        let mut materializer = PanelMaterializer {
            tree: &self.tree,
            panels: &mut self.panels,
            headers: &mut self.headers,
            options: &self.options.window,
            host,
            panel: id,
            viewport: self.viewport,
        };
        wm.release(&mut materializer);
        self.headers.remove(&id);
        atrace!(?id, "GroupedList: panel dropped");
        if !self.tree.contains(id) {
            self.sizes.evict(&SlotKey::Group(id));
        }
    }
}

impl<T, K> core::fmt::Debug for GroupedList<T, K> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GroupedList")
            .field("len", &self.source.len())
            .field("tree", &self.tree)
            .field("panels", &self.panels.len())
            .finish_non_exhaustive()
    }
}

fn realized_groups<T>(wm: &WindowManager<SlotKey<T>>) -> impl Iterator<Item = NodeId> + '_
where
    T: MapKey + Clone + PartialEq,
{
    wm.realized_indices()
        .filter_map(|index| wm.realized_id(index).and_then(SlotKey::as_group))
}
