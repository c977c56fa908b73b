use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;
use core::fmt;
use core::mem;

use crate::estimator::ItemSequence;
use crate::key::{KeyMap, MapKey};
use crate::{GroupDescriptor, GroupKey, NodeId, SlotKey, TreeOptions};

const ROOT: NodeId = NodeId::new(0, 0);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ChangeKind {
    Add,
    Remove,
    /// The node lost all of its children at once.
    Reset,
}

/// What a [`GroupChange`] touched on its node's channel.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Affected<T> {
    Groups(Vec<NodeId>),
    Items(Vec<T>),
    None,
}

impl<T> Affected<T> {
    pub fn len(&self) -> usize {
        match self {
            Self::Groups(groups) => groups.len(),
            Self::Items(items) => items.len(),
            Self::None => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A structural change on one node.
///
/// `position` is the local child index on `node`: an index into [`GroupingTree::children`] for
/// grouping nodes, into [`GroupingTree::items`] otherwise. Changes are delivered in the order
/// they were applied, so each position is valid against the state left by the previous change.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GroupChange<T> {
    pub node: NodeId,
    pub kind: ChangeKind,
    pub affected: Affected<T>,
    pub position: usize,
}

impl<T> GroupChange<T> {
    pub fn count(&self) -> usize {
        self.affected.len()
    }
}

/// The slot found at a flattened scroll position.
#[derive(Debug, PartialEq)]
pub enum FlatEntry<'a, T> {
    /// A group header.
    Header(NodeId),
    /// A leaf item, `index` being its position inside `node`.
    Item {
        node: NodeId,
        index: usize,
        item: &'a T,
    },
}

impl<T> Clone for FlatEntry<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for FlatEntry<'_, T> {}

#[derive(Clone)]
struct Node<T, K> {
    key: Option<GroupKey<K>>,
    level: usize,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    child_index: KeyMap<GroupKey<K>, NodeId>,
    items: Vec<T>,
    scroll_start: usize,
    scroll_span: usize,
    total_items: usize,
    total_groups: usize,
}

impl<T, K> Node<T, K> {
    fn new(key: Option<GroupKey<K>>, level: usize, parent: Option<NodeId>) -> Self {
        Self {
            key,
            level,
            parent,
            children: Vec::new(),
            child_index: KeyMap::default(),
            items: Vec::new(),
            scroll_start: 0,
            scroll_span: 0,
            total_items: 0,
            total_groups: 0,
        }
    }

    fn header(&self) -> usize {
        usize::from(self.parent.is_some())
    }

    fn scroll_end_exclusive(&self) -> usize {
        self.scroll_start + self.scroll_span
    }
}

/// A live multi-level grouping of a flat item collection.
///
/// Nodes live in an arena and are addressed by generational [`NodeId`]s; the implicit root is
/// always present and has no header. Level `l` nodes (root = 0) hold children keyed by
/// descriptor `l`; nodes at the deepest level hold the items themselves.
///
/// Every mutation runs inside a batch. When the outermost batch completes, scroll positions are
/// recomputed and the queued [`GroupChange`]s are delivered.
#[derive(Clone)]
pub struct GroupingTree<T, K> {
    options: TreeOptions<T, K>,
    nodes: Vec<Option<Node<T, K>>>,
    generations: Vec<u32>,
    free_list: Vec<u32>,

    pending: Vec<GroupChange<T>>,
    journal: Vec<GroupChange<T>>,
    batch_depth: usize,
    batch_totals: (usize, usize),
    scrolling_dirty: bool,
}

impl<T, K> GroupingTree<T, K>
where
    T: MapKey + Clone + PartialEq,
    K: MapKey + Clone,
{
    pub fn new(options: TreeOptions<T, K>) -> Self {
        vdebug!(depth = options.descriptors.len(), "GroupingTree::new");
        let mut tree = Self {
            options,
            nodes: Vec::new(),
            generations: Vec::new(),
            free_list: Vec::new(),
            pending: Vec::new(),
            journal: Vec::new(),
            batch_depth: 0,
            batch_totals: (0, 0),
            scrolling_dirty: false,
        };
        let root = tree.alloc_node(None, 0, None);
        debug_assert_eq!(root, ROOT);
        tree
    }

    pub fn options(&self) -> &TreeOptions<T, K> {
        &self.options
    }

    pub fn set_on_change(
        &mut self,
        on_change: Option<impl Fn(&GroupingTree<T, K>, &GroupChange<T>) + Send + Sync + 'static>,
    ) {
        self.options.on_change = on_change.map(|f| Arc::new(f) as _);
    }

    pub fn set_on_count_changed(
        &mut self,
        on_count_changed: Option<impl Fn(&GroupingTree<T, K>) + Send + Sync + 'static>,
    ) {
        self.options.on_count_changed = on_count_changed.map(|f| Arc::new(f) as _);
    }

    /// Enables or disables the pull journal read by [`Self::take_changes`].
    pub fn set_record_changes(&mut self, record_changes: bool) {
        self.options.record_changes = record_changes;
        if !record_changes {
            self.journal.clear();
        }
    }

    pub fn descriptors(&self) -> &[GroupDescriptor<T, K>] {
        &self.options.descriptors
    }

    /// Number of grouping levels.
    pub fn depth(&self) -> usize {
        self.options.descriptors.len()
    }

    pub fn root(&self) -> NodeId {
        ROOT
    }

    /// Flattened length: every item plus one header per group.
    pub fn len(&self) -> usize {
        self.total_items(ROOT) + self.total_groups(ROOT)
    }

    pub fn is_empty(&self) -> bool {
        self.total_items(ROOT) == 0
    }

    /// Whether `id` still names a live node.
    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    /// Whether `id` holds groups rather than items. `false` for stale ids.
    pub fn is_grouping(&self, id: NodeId) -> bool {
        self.node(id).is_some_and(|n| n.level < self.depth())
    }

    /// Number of direct children (groups or items) of `id`.
    pub fn count(&self, id: NodeId) -> usize {
        match self.node(id) {
            Some(n) if n.level < self.depth() => n.children.len(),
            Some(n) => n.items.len(),
            None => 0,
        }
    }

    pub fn total_items(&self, id: NodeId) -> usize {
        self.node(id).map_or(0, |n| n.total_items)
    }

    /// Number of groups below `id`, not counting `id` itself.
    pub fn total_groups(&self, id: NodeId) -> usize {
        self.node(id).map_or(0, |n| n.total_groups)
    }

    /// Flattened position of the header of `id` (of its first child for the root).
    pub fn scroll_start(&self, id: NodeId) -> Option<usize> {
        self.node(id).map(|n| n.scroll_start)
    }

    /// Last flattened position covered by `id`, `None` when it covers nothing.
    pub fn scroll_end(&self, id: NodeId) -> Option<usize> {
        let n = self.node(id)?;
        n.scroll_end_exclusive().checked_sub(1).filter(|_| n.scroll_span > 0)
    }

    pub fn key(&self, id: NodeId) -> Option<&GroupKey<K>> {
        self.node(id)?.key.as_ref()
    }

    pub fn level(&self, id: NodeId) -> Option<usize> {
        self.node(id).map(|n| n.level)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)?.parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map_or(&[], |n| &n.children)
    }

    pub fn items(&self, id: NodeId) -> &[T] {
        self.node(id).map_or(&[], |n| &n.items)
    }

    pub fn child_by_key(&self, id: NodeId, key: &GroupKey<K>) -> Option<NodeId> {
        self.node(id)?.child_index.get(key).copied()
    }

    /// Display label of a group, using the placeholder of its level for missing keys.
    pub fn label(&self, id: NodeId) -> Option<String>
    where
        K: fmt::Display,
    {
        let node = self.node(id)?;
        let key = node.key.as_ref()?;
        let descriptor = self.options.descriptors.get(node.level.checked_sub(1)?)?;
        Some(descriptor.label(key))
    }

    /// Finds the leaf node holding `item` by computing its key path, and its index there.
    pub fn find(&self, item: &T) -> Option<(NodeId, usize)> {
        let mut id = ROOT;
        for descriptor in &self.options.descriptors {
            id = self.child_by_key(id, &descriptor.key_of(item))?;
        }
        let index = self.node(id)?.items.iter().position(|x| x == item)?;
        Some((id, index))
    }

    /// Flattened position of `item`.
    pub fn position_of(&self, item: &T) -> Option<usize> {
        let (id, index) = self.find(item)?;
        let node = self.node(id)?;
        Some(node.scroll_start + node.header() + index)
    }

    /// Appends `item` under its key path, creating groups as needed.
    ///
    /// Emits exactly one change: the topmost newly created group, or the appended item when
    /// every group on the path already existed.
    pub fn add(&mut self, item: T) {
        self.begin_batch();
        self.add_one(item);
        self.end_batch();
    }

    /// Adds many items with one change per new group and one per existing leaf node that grew.
    pub fn add_range(&mut self, items: impl IntoIterator<Item = T>) {
        let items: Vec<T> = items.into_iter().collect();
        if items.is_empty() {
            return;
        }
        vtrace!(count = items.len(), "GroupingTree::add_range");
        self.begin_batch();
        self.add_bucket(ROOT, items, true);
        self.end_batch();
    }

    /// Removes the first item equal to `item`. Returns `false` when it is not present.
    pub fn remove(&mut self, item: &T) -> bool {
        self.remove_range(core::slice::from_ref(item)) == 1
    }

    /// Removes one occurrence of each given item and returns how many were found.
    ///
    /// Groups left empty are deleted, topmost first. Item removals are reported per contiguous
    /// run, highest position first.
    pub fn remove_range(&mut self, items: &[T]) -> usize {
        if items.is_empty() {
            return 0;
        }
        self.begin_batch();
        let targets: Vec<&T> = items.iter().collect();
        let (removed, _) = self.remove_bucket(ROOT, targets);
        if removed < items.len() {
            vdebug!(
                requested = items.len(),
                removed,
                "GroupingTree::remove_range: items not found"
            );
        }
        self.end_batch();
        removed
    }

    pub fn clear(&mut self) {
        self.clear_from(0);
    }

    /// Drops structural state from grouping level `level` downwards.
    ///
    /// `level` is clamped to `0..=depth`. Nodes above `level` keep their identity, nodes at
    /// `level` stay but lose every child, deeper nodes are freed, and all items are dropped.
    /// Survivors may be left empty; re-add the source and call [`Self::prune_empty`].
    pub fn clear_from(&mut self, level: usize) {
        let level = level.min(self.depth());
        self.begin_batch();
        vdebug!(level, "GroupingTree::clear_from");
        self.clear_level(ROOT, level);
        self.scrolling_dirty = true;
        self.end_batch();
    }

    /// Deletes every empty group and returns how many were freed.
    pub fn prune_empty(&mut self) -> usize {
        self.begin_batch();
        let dropped = self.prune_empty_below(ROOT);
        self.end_batch();
        dropped
    }

    /// Replaces every grouping level and regroups `source`.
    pub fn set_descriptors(&mut self, descriptors: Vec<GroupDescriptor<T, K>>, source: &[T]) {
        self.regroup(0, source, |list| *list = descriptors);
    }

    pub fn push_descriptor(&mut self, descriptor: GroupDescriptor<T, K>, source: &[T]) {
        let index = self.depth();
        self.insert_descriptor(index, descriptor, source);
    }

    /// Inserts a grouping level at `index` (clamped) and regroups `source` below it.
    pub fn insert_descriptor(
        &mut self,
        index: usize,
        descriptor: GroupDescriptor<T, K>,
        source: &[T],
    ) {
        let index = index.min(self.depth());
        self.regroup(index, source, |list| list.insert(index, descriptor));
    }

    pub fn remove_descriptor(
        &mut self,
        index: usize,
        source: &[T],
    ) -> Option<GroupDescriptor<T, K>> {
        if index >= self.depth() {
            return None;
        }
        let mut removed = None;
        self.regroup(index, source, |list| removed = Some(list.remove(index)));
        removed
    }

    pub fn replace_descriptor(
        &mut self,
        index: usize,
        descriptor: GroupDescriptor<T, K>,
        source: &[T],
    ) -> Option<GroupDescriptor<T, K>> {
        if index >= self.depth() {
            return None;
        }
        let mut replaced = None;
        self.regroup(index, source, |list| {
            replaced = Some(mem::replace(&mut list[index], descriptor));
        });
        replaced
    }

    /// Runs several mutations as one batch: scroll positions are recomputed and changes are
    /// delivered once, when `f` returns.
    pub fn batch(&mut self, f: impl FnOnce(&mut Self)) {
        self.begin_batch();
        f(self);
        self.end_batch();
    }

    /// Drains the change journal. Empty unless `record_changes` is enabled.
    pub fn take_changes(&mut self) -> Vec<GroupChange<T>> {
        mem::take(&mut self.journal)
    }

    /// Assigns scroll positions depth-first from the root, starting at `start`.
    ///
    /// Returns the position following the root's range. Runs automatically after each batch.
    pub fn set_item_scrolling(&mut self, start: usize) -> usize {
        self.scrolling_dirty = false;
        self.assign_scrolling(ROOT, start)
    }

    /// Maps a flattened position to a local child index of `id`.
    ///
    /// For grouping nodes this is the first child whose range ends at or after `scroll_pos`;
    /// for leaf nodes, the offset from the first item slot. Positions past the end yield the
    /// child count.
    pub fn get_local_item_position(&self, id: NodeId, scroll_pos: usize) -> usize {
        let Some(node) = self.node(id) else {
            return 0;
        };
        if node.level < self.depth() {
            node.children.partition_point(|&child| {
                self.node(child)
                    .is_none_or(|c| c.scroll_end_exclusive() <= scroll_pos)
            })
        } else {
            let first = node.scroll_start + node.header();
            scroll_pos.saturating_sub(first).min(node.items.len())
        }
    }

    /// The header or item at a flattened position, `None` when out of range.
    pub fn locate(&self, scroll_pos: usize) -> Option<FlatEntry<'_, T>> {
        let root = self.node(ROOT)?;
        if scroll_pos < root.scroll_start || scroll_pos >= root.scroll_end_exclusive() {
            return None;
        }
        let mut id = ROOT;
        loop {
            let node = self.node(id)?;
            if node.parent.is_some() && scroll_pos == node.scroll_start {
                return Some(FlatEntry::Header(id));
            }
            let local = self.get_local_item_position(id, scroll_pos);
            if node.level < self.depth() {
                id = *node.children.get(local)?;
            } else {
                return node.items.get(local).map(|item| FlatEntry::Item {
                    node: id,
                    index: local,
                    item,
                });
            }
        }
    }

    /// The direct children of `id` as an [`ItemSequence`].
    pub fn view(&self, id: NodeId) -> Option<NodeView<'_, T, K>> {
        self.contains(id).then_some(NodeView { tree: self, id })
    }

    /// The whole flattened position space as an [`ItemSequence`].
    pub fn flat(&self) -> FlatView<'_, T, K> {
        FlatView { tree: self }
    }

    fn node(&self, id: NodeId) -> Option<&Node<T, K>> {
        let slot = id.slot();
        if self.generations.get(slot).copied() != Some(id.generation()) {
            return None;
        }
        self.nodes.get(slot)?.as_ref()
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node<T, K>> {
        let slot = id.slot();
        if self.generations.get(slot).copied() != Some(id.generation()) {
            return None;
        }
        self.nodes.get_mut(slot)?.as_mut()
    }

    fn alloc_node(
        &mut self,
        key: Option<GroupKey<K>>,
        level: usize,
        parent: Option<NodeId>,
    ) -> NodeId {
        let node = Node::new(key, level, parent);
        let id = match self.free_list.pop() {
            Some(slot) => {
                let index = slot as usize;
                self.nodes[index] = Some(node);
                NodeId::new(slot, self.generations[index])
            }
            None => {
                let slot = self.nodes.len() as u32;
                self.nodes.push(Some(node));
                self.generations.push(0);
                NodeId::new(slot, 0)
            }
        };
        vtrace!(
            slot = id.slot(),
            generation = id.generation(),
            level,
            "GroupingTree::alloc_node"
        );
        id
    }

    fn free_subtree(&mut self, id: NodeId) {
        debug_assert_ne!(id, ROOT, "the root node is never freed");
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            if id == ROOT || !self.contains(id) {
                continue;
            }
            let slot = id.slot();
            if let Some(node) = self.nodes[slot].take() {
                stack.extend(node.children);
            }
            self.generations[slot] = self.generations[slot].wrapping_add(1);
            self.free_list.push(slot as u32);
            vtrace!(slot, generation = id.generation(), "GroupingTree::free_node");
        }
    }

    fn child_for(&mut self, parent: NodeId, key: GroupKey<K>) -> Option<(NodeId, Option<usize>)> {
        let level = {
            let p = self.node(parent)?;
            if let Some(&child) = p.child_index.get(&key) {
                return Some((child, None));
            }
            p.level + 1
        };
        let child = self.alloc_node(Some(key.clone()), level, Some(parent));
        let p = self.node_mut(parent)?;
        p.children.push(child);
        p.child_index.insert(key, child);
        Some((child, Some(p.children.len() - 1)))
    }

    fn queue(&mut self, node: NodeId, kind: ChangeKind, affected: Affected<T>, position: usize) {
        self.scrolling_dirty = true;
        self.pending.push(GroupChange {
            node,
            kind,
            affected,
            position,
        });
    }

    fn begin_batch(&mut self) {
        if self.batch_depth == 0 {
            self.batch_totals = (self.total_items(ROOT), self.total_groups(ROOT));
        }
        self.batch_depth = self.batch_depth.saturating_add(1);
    }

    fn end_batch(&mut self) {
        debug_assert!(self.batch_depth > 0, "batch_depth underflow");
        self.batch_depth = self.batch_depth.saturating_sub(1);
        if self.batch_depth > 0 {
            return;
        }
        if self.scrolling_dirty {
            self.set_item_scrolling(0);
        }

        let changes = mem::take(&mut self.pending);
        if let Some(cb) = self.options.on_change.clone() {
            for change in &changes {
                cb(self, change);
            }
        }
        if self.options.record_changes {
            self.journal.extend(changes);
        }

        let totals = (self.total_items(ROOT), self.total_groups(ROOT));
        if totals != self.batch_totals {
            vtrace!(
                total_items = totals.0,
                total_groups = totals.1,
                "GroupingTree::count_changed"
            );
            if let Some(cb) = self.options.on_count_changed.clone() {
                cb(self);
            }
        }
    }

    fn add_one(&mut self, item: T) {
        let depth = self.depth();
        let mut path = Vec::with_capacity(depth + 1);
        path.push(ROOT);
        // (path index of the topmost created group, its position in its parent)
        let mut created: Option<(usize, usize)> = None;
        let mut id = ROOT;
        for level in 0..depth {
            let key = self.options.descriptors[level].key_of(&item);
            let Some((child, new_position)) = self.child_for(id, key) else {
                return;
            };
            if let (None, Some(position)) = (created, new_position) {
                created = Some((path.len(), position));
            }
            path.push(child);
            id = child;
        }

        let change = {
            let Some(leaf) = self.node_mut(id) else {
                return;
            };
            let change = match created {
                Some((at, position)) => (
                    path[at - 1],
                    Affected::Groups(vec![path[at]]),
                    position,
                ),
                None => (id, Affected::Items(vec![item.clone()]), leaf.items.len()),
            };
            leaf.items.push(item);
            change
        };

        let len = path.len();
        for (i, &node) in path.iter().enumerate() {
            let new_below = created.map_or(0, |(at, _)| len - at.max(i + 1));
            if let Some(n) = self.node_mut(node) {
                n.total_items += 1;
                n.total_groups += new_below;
            }
        }
        let (node, affected, position) = change;
        self.queue(node, ChangeKind::Add, affected, position);
    }

    /// Returns the number of groups created below `id`.
    fn add_bucket(&mut self, id: NodeId, items: Vec<T>, announce: bool) -> usize {
        let Some(level) = self.level(id) else {
            return 0;
        };
        let count = items.len();
        let mut created = 0;
        if level < self.depth() {
            let descriptor = self.options.descriptors[level].clone();
            for (key, bucket) in partition(items, |item| descriptor.key_of(item)) {
                let Some((child, new_position)) = self.child_for(id, key) else {
                    continue;
                };
                if let Some(position) = new_position {
                    created += 1;
                    if announce {
                        self.queue(id, ChangeKind::Add, Affected::Groups(vec![child]), position);
                    }
                }
                created += self.add_bucket(child, bucket, announce && new_position.is_none());
            }
        } else {
            let Some(node) = self.node_mut(id) else {
                return 0;
            };
            let position = node.items.len();
            let affected = if announce {
                Affected::Items(items.clone())
            } else {
                Affected::None
            };
            node.items.extend(items);
            if announce {
                self.queue(id, ChangeKind::Add, affected, position);
            }
        }
        if let Some(n) = self.node_mut(id) {
            n.total_items += count;
            n.total_groups += created;
        }
        self.scrolling_dirty = true;
        created
    }

    /// Returns `(items removed, groups freed)` below `id`.
    fn remove_bucket(&mut self, id: NodeId, targets: Vec<&T>) -> (usize, usize) {
        let Some(level) = self.level(id) else {
            return (0, 0);
        };
        let mut removed = 0;
        let mut dropped = 0;
        if level < self.depth() {
            let descriptor = self.options.descriptors[level].clone();
            for (key, bucket) in partition(targets, |item| descriptor.key_of(item)) {
                let Some(child) = self.child_by_key(id, &key) else {
                    continue;
                };
                let (r, d) = self.remove_bucket(child, bucket);
                removed += r;
                dropped += d;
            }
            if let Some(n) = self.node_mut(id) {
                n.total_items = n.total_items.saturating_sub(removed);
                n.total_groups = n.total_groups.saturating_sub(dropped);
            }
            // An emptied non-root node is freed whole by its parent.
            if id == ROOT || self.total_items(id) > 0 {
                dropped += self.prune_children(id);
            }
        } else {
            removed = self.remove_leaf_items(id, &targets);
            if let Some(n) = self.node_mut(id) {
                n.total_items = n.total_items.saturating_sub(removed);
            }
        }
        (removed, dropped)
    }

    fn remove_leaf_items(&mut self, id: NodeId, targets: &[&T]) -> usize {
        let runs = {
            let Some(node) = self.node_mut(id) else {
                return 0;
            };
            // Pending removals per item; duplicates take the first matching occurrences.
            let mut pending: KeyMap<&T, usize> = KeyMap::default();
            for target in targets {
                *pending.entry(*target).or_insert(0) += 1;
            }
            let hit: Vec<bool> = node
                .items
                .iter()
                .map(|item| match pending.get_mut(&item) {
                    Some(left) if *left > 0 => {
                        *left -= 1;
                        true
                    }
                    _ => false,
                })
                .collect();

            let mut runs: Vec<(usize, usize)> = Vec::new();
            for (i, _) in hit.iter().enumerate().filter(|(_, h)| **h) {
                match runs.last_mut() {
                    Some((_, end)) if *end == i => *end = i + 1,
                    _ => runs.push((i, i + 1)),
                }
            }

            let mut drained = Vec::with_capacity(runs.len());
            for &(start, end) in runs.iter().rev() {
                drained.push((start, node.items.drain(start..end).collect::<Vec<T>>()));
            }
            drained
        };

        let mut removed = 0;
        for (position, items) in runs {
            removed += items.len();
            self.queue(id, ChangeKind::Remove, Affected::Items(items), position);
        }
        removed
    }

    /// Frees the empty direct children of `id`, highest position first.
    fn prune_children(&mut self, id: NodeId) -> usize {
        let empties: Vec<(usize, NodeId)> = match self.node(id) {
            Some(n) => n
                .children
                .iter()
                .enumerate()
                .filter(|(_, child)| self.total_items(**child) == 0)
                .map(|(i, child)| (i, *child))
                .collect(),
            None => return 0,
        };

        let mut dropped = 0;
        for &(position, child) in empties.iter().rev() {
            let below = self.total_groups(child);
            let key = self.key(child).cloned();
            if let Some(n) = self.node_mut(id) {
                n.children.remove(position);
                if let Some(key) = key {
                    n.child_index.remove(&key);
                }
                n.total_groups = n.total_groups.saturating_sub(below + 1);
            }
            self.free_subtree(child);
            self.queue(id, ChangeKind::Remove, Affected::Groups(vec![child]), position);
            dropped += below + 1;
        }
        dropped
    }

    fn prune_empty_below(&mut self, id: NodeId) -> usize {
        let mut dropped = 0;
        let mut i = 0;
        while let Some(child) = self.children(id).get(i).copied() {
            if self.total_items(child) > 0 {
                dropped += self.prune_empty_below(child);
            }
            i += 1;
        }
        if let Some(n) = self.node_mut(id) {
            n.total_groups = n.total_groups.saturating_sub(dropped);
        }
        dropped + self.prune_children(id)
    }

    /// Returns the number of groups surviving below `id`.
    fn clear_level(&mut self, id: NodeId, level: usize) -> usize {
        let Some(node_level) = self.level(id) else {
            return 0;
        };
        if node_level < level {
            let mut groups = 0;
            let mut i = 0;
            while let Some(child) = self.children(id).get(i).copied() {
                groups += 1 + self.clear_level(child, level);
                i += 1;
            }
            if let Some(n) = self.node_mut(id) {
                n.total_items = 0;
                n.total_groups = groups;
            }
            return groups;
        }

        let (children, had_content) = {
            let Some(n) = self.node_mut(id) else {
                return 0;
            };
            let had_content = !n.children.is_empty() || !n.items.is_empty();
            n.child_index.clear();
            n.items.clear();
            n.total_items = 0;
            n.total_groups = 0;
            (mem::take(&mut n.children), had_content)
        };
        for child in children {
            self.free_subtree(child);
        }
        if had_content {
            self.queue(id, ChangeKind::Reset, Affected::None, 0);
        }
        0
    }

    fn regroup(
        &mut self,
        level: usize,
        source: &[T],
        edit: impl FnOnce(&mut Vec<GroupDescriptor<T, K>>),
    ) {
        self.begin_batch();
        edit(&mut self.options.descriptors);
        vdebug!(
            level,
            depth = self.depth(),
            items = source.len(),
            "GroupingTree::regroup"
        );
        self.clear_from(level);
        self.add_range(source.iter().cloned());
        self.prune_empty();
        self.end_batch();
    }

    fn assign_scrolling(&mut self, id: NodeId, start: usize) -> usize {
        let depth = self.depth();
        let Some(node) = self.node(id) else {
            return start;
        };
        let mut pos = start + node.header();
        if node.level < depth {
            let mut i = 0;
            while let Some(child) = self.children(id).get(i).copied() {
                pos = self.assign_scrolling(child, pos);
                i += 1;
            }
        } else {
            pos += node.items.len();
        }
        if let Some(n) = self.node_mut(id) {
            n.scroll_start = start;
            n.scroll_span = pos - start;
        }
        pos
    }
}

impl<T, K> fmt::Debug for GroupingTree<T, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let root = self.nodes.first().and_then(Option::as_ref);
        f.debug_struct("GroupingTree")
            .field("depth", &self.options.descriptors.len())
            .field("total_items", &root.map_or(0, |n| n.total_items))
            .field("total_groups", &root.map_or(0, |n| n.total_groups))
            .field("slots", &self.nodes.len())
            .field("free", &self.free_list.len())
            .finish_non_exhaustive()
    }
}

/// Splits `items` into per-key buckets, in first-seen key order.
fn partition<I, K: MapKey + Clone>(
    items: impl IntoIterator<Item = I>,
    key_of: impl Fn(&I) -> GroupKey<K>,
) -> Vec<(GroupKey<K>, Vec<I>)> {
    let mut buckets: Vec<(GroupKey<K>, Vec<I>)> = Vec::new();
    let mut slots: KeyMap<GroupKey<K>, usize> = KeyMap::default();
    for item in items {
        let key = key_of(&item);
        match slots.get(&key) {
            Some(&i) => buckets[i].1.push(item),
            None => {
                slots.insert(key.clone(), buckets.len());
                buckets.push((key, vec![item]));
            }
        }
    }
    buckets
}

/// The direct children of one node, sized by their flattened span.
///
/// Group children are aggregate slots: their span covers the header plus everything below.
pub struct NodeView<'a, T, K> {
    tree: &'a GroupingTree<T, K>,
    id: NodeId,
}

impl<T, K> Clone for NodeView<'_, T, K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, K> Copy for NodeView<'_, T, K> {}

impl<T, K> NodeView<'_, T, K> {
    pub fn id(&self) -> NodeId {
        self.id
    }
}

impl<T, K> ItemSequence for NodeView<'_, T, K>
where
    T: MapKey + Clone + PartialEq,
    K: MapKey + Clone,
{
    type Id = SlotKey<T>;

    fn len(&self) -> usize {
        self.tree.count(self.id)
    }

    fn id_at(&self, index: usize) -> Option<SlotKey<T>> {
        if self.tree.is_grouping(self.id) {
            self.tree.children(self.id).get(index).copied().map(SlotKey::Group)
        } else {
            self.tree.items(self.id).get(index).cloned().map(SlotKey::Item)
        }
    }

    fn span_at(&self, index: usize) -> usize {
        match self.tree.children(self.id).get(index) {
            Some(&child) if self.tree.is_grouping(self.id) => {
                1 + self.tree.total_items(child) + self.tree.total_groups(child)
            }
            _ => 1,
        }
    }

    fn is_aggregate(&self, _index: usize) -> bool {
        self.tree.is_grouping(self.id)
    }

    fn local_position(&self, position: usize) -> usize {
        self.tree.get_local_item_position(self.id, position)
    }
}

/// Every header and item in flattened order, one slot each.
pub struct FlatView<'a, T, K> {
    tree: &'a GroupingTree<T, K>,
}

impl<T, K> Clone for FlatView<'_, T, K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, K> Copy for FlatView<'_, T, K> {}

impl<T, K> ItemSequence for FlatView<'_, T, K>
where
    T: MapKey + Clone + PartialEq,
    K: MapKey + Clone,
{
    type Id = SlotKey<T>;

    fn len(&self) -> usize {
        self.tree.len()
    }

    fn id_at(&self, index: usize) -> Option<SlotKey<T>> {
        match self.tree.locate(index)? {
            FlatEntry::Header(id) => Some(SlotKey::Group(id)),
            FlatEntry::Item { item, .. } => Some(SlotKey::Item(item.clone())),
        }
    }
}
