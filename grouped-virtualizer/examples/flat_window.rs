// Example: realize a window of containers over a flat list and jump to an index.
use std::collections::BTreeMap;

use grouped_virtualizer::{
    Align, ContainerMaterializer, Extent, SizeEstimator, Slot, Viewport, WindowManager,
    WindowOptions,
};

#[derive(Default)]
struct Rows {
    live: BTreeMap<usize, u32>,
    created: usize,
}

impl ContainerMaterializer<u32> for Rows {
    fn materialize(&mut self, slot: Slot<'_, u32>) {
        self.live.insert(slot.index, *slot.id);
        self.created += 1;
    }

    fn measure(&mut self, slot: Slot<'_, u32>, _scope: &mut SizeEstimator<u32>) -> Extent {
        // Every third row wraps onto a second line.
        let lines = if slot.id % 3 == 0 { 2.0 } else { 1.0 };
        Extent::new(320.0, 18.0 * lines)
    }

    fn dematerialize(&mut self, index: usize, count: usize) -> usize {
        (index..index + count)
            .filter(|i| self.live.remove(i).is_some())
            .count()
    }
}

fn main() {
    let ids: Vec<u32> = (0..100_000).collect();
    let mut sizes = SizeEstimator::new();
    let mut wm = WindowManager::new(WindowOptions::new());
    let mut rows = Rows::default();

    let viewport = Viewport::new(0.0, 480.0);
    let w = wm.run_pass(viewport, &ids, &mut sizes, &mut rows);
    println!("cached={:?} visible={:?}", w.cached, w.visible);
    println!("estimated_extent={}", wm.estimated_extent(&ids, &sizes));

    let offset = wm.scroll_into_view_offset(&ids, &sizes, 75_000, Align::Center, viewport);
    let w = wm.run_pass(Viewport::new(offset, 480.0), &ids, &mut sizes, &mut rows);
    println!(
        "after scroll_into_view: offset={offset} visible={:?} live={} created={}",
        w.visible,
        rows.live.len(),
        rows.created
    );
}
