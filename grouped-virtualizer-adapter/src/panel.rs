use grouped_virtualizer::{
    ContainerMaterializer, Extent, GroupingTree, MapKey, NodeId, ScrollUnit, SizeEstimator, Slot,
    SlotKey, Viewport, WindowManager, WindowOptions,
};

use crate::key::KeyMap;

/// Host-side container factory for a grouped list.
///
/// Every call names the panel it belongs to: the tree root for top-level slots, otherwise the
/// group whose body holds the slot. Slot indexes are local to that panel.
pub trait GroupedMaterializer<T> {
    fn materialize(&mut self, panel: NodeId, slot: Slot<'_, SlotKey<T>>);

    /// Measures the container at `slot`. For a group slot this is the size of its header only;
    /// the body is laid out as a nested panel and added by the list.
    fn measure(&mut self, panel: NodeId, slot: Slot<'_, SlotKey<T>>) -> Extent;

    fn dematerialize(&mut self, panel: NodeId, index: usize, count: usize) -> usize;

    fn recycle(
        &mut self,
        _panel: NodeId,
        _old_index: usize,
        _new_index: usize,
        _id: &SlotKey<T>,
    ) -> bool {
        false
    }
}

pub(crate) type Panels<T> = KeyMap<NodeId, WindowManager<SlotKey<T>>>;

/// Header extent along the axis of every group with a live panel.
pub(crate) type Headers = KeyMap<NodeId, f64>;

/// Adapts a [`GroupedMaterializer`] to one panel, recursing into nested panels when a group
/// slot is measured.
///
/// Nested panels always scroll in pixels: their window is the parent's resolved visible window
/// moved into the group body's coordinates, whatever unit the root panel scrolls in.
pub(crate) struct PanelMaterializer<'a, T, K, H: ?Sized> {
    pub(crate) tree: &'a GroupingTree<T, K>,
    pub(crate) panels: &'a mut Panels<T>,
    pub(crate) headers: &'a mut Headers,
    pub(crate) options: &'a WindowOptions,
    pub(crate) host: &'a mut H,
    pub(crate) panel: NodeId,
    /// Visible window of this panel, in its own pixel coordinates.
    pub(crate) viewport: Viewport,
}

impl<T, K, H> ContainerMaterializer<SlotKey<T>> for PanelMaterializer<'_, T, K, H>
where
    T: MapKey + Clone + PartialEq,
    K: MapKey + Clone,
    H: GroupedMaterializer<T> + ?Sized,
{
    fn materialize(&mut self, slot: Slot<'_, SlotKey<T>>) {
        self.host.materialize(self.panel, slot);
    }

    fn measure(&mut self, slot: Slot<'_, SlotKey<T>>, scope: &mut SizeEstimator<SlotKey<T>>) -> Extent {
        let own = self.host.measure(self.panel, slot);
        let Some(group) = slot.id.as_group() else {
            return own;
        };
        let Some(view) = self.tree.view(group) else {
            return own;
        };

        let axis = self.options.axis;
        let header = own.along(axis);
        let viewport = self.viewport.translated(slot.offset + header);
        let mut wm = self.panels.remove(&group).unwrap_or_else(|| {
            WindowManager::new(self.options.clone().with_scroll_unit(ScrollUnit::Pixel))
        });
        let mut nested = PanelMaterializer {
            tree: self.tree,
            panels: &mut *self.panels,
            headers: &mut *self.headers,
            options: self.options,
            host: &mut *self.host,
            panel: group,
            viewport,
        };
        wm.run_pass(viewport, &view, scope, &mut nested);
        self.panels.insert(group, wm);
        self.headers.insert(group, header);

        let body = scope.estimated_total_extent(
            axis,
            self.tree.total_items(group) + self.tree.total_groups(group),
        );
        atrace!(?group, header, body, "PanelMaterializer::measure group");
        Extent::from_axis(axis, header + body, own.across(axis))
    }

    fn dematerialize(&mut self, index: usize, count: usize) -> usize {
        self.host.dematerialize(self.panel, index, count)
    }

    fn recycle(&mut self, old_index: usize, new_index: usize, id: &SlotKey<T>) -> bool {
        self.host.recycle(self.panel, old_index, new_index, id)
    }

    fn begin_window(&mut self, panel_offset: f64, panel_end: f64) {
        self.viewport = Viewport {
            offset: panel_offset,
            size: panel_end - panel_offset,
            ..self.viewport
        };
    }
}
