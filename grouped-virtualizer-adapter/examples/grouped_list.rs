// Example: a grouped list driven by source edits and layout passes.
use std::collections::BTreeMap;

use grouped_virtualizer::{
    Extent, GroupDescriptor, NodeId, Slot, SlotKey, Viewport, WindowOptions,
};
use grouped_virtualizer_adapter::{GroupedList, GroupedMaterializer, ListOptions, SourceChange};

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct Mail {
    id: u32,
    folder: &'static str,
}

/// Prints container lifecycle instead of building widgets.
#[derive(Default)]
struct Console {
    live: BTreeMap<(NodeId, usize), SlotKey<Mail>>,
}

impl GroupedMaterializer<Mail> for Console {
    fn materialize(&mut self, panel: NodeId, slot: Slot<'_, SlotKey<Mail>>) {
        self.live.insert((panel, slot.index), slot.id.clone());
    }

    fn measure(&mut self, _panel: NodeId, slot: Slot<'_, SlotKey<Mail>>) -> Extent {
        match slot.id {
            SlotKey::Group(_) => Extent::new(400.0, 28.0),
            SlotKey::Item(_) => Extent::new(400.0, 20.0),
        }
    }

    fn dematerialize(&mut self, panel: NodeId, index: usize, count: usize) -> usize {
        (index..index + count)
            .filter(|i| self.live.remove(&(panel, *i)).is_some())
            .count()
    }
}

fn main() {
    let folders = ["inbox", "archive", "spam"];
    let mails: Vec<Mail> = (0..600)
        .map(|id| Mail {
            id,
            folder: folders[(id % 7 % 3) as usize],
        })
        .collect();

    let options = ListOptions::new(WindowOptions::new())
        .with_descriptor(GroupDescriptor::new(|m: &Mail| Some(m.folder), "(none)"));
    let mut list = GroupedList::with_items(options, mails);
    let mut console = Console::default();

    let mut viewport = Viewport::new(0.0, 360.0);
    for _ in 0..3 {
        let w = list.layout(viewport, &mut console);
        println!(
            "offset={} root={:?} panels={} live={} extent={}",
            viewport.offset,
            w.cached,
            list.panel_ids().count(),
            console.live.len(),
            list.scroll_extent()
        );
        viewport = list.page_down(viewport);
    }

    list.apply(SourceChange::Add {
        index: 0,
        items: vec![Mail {
            id: 1000,
            folder: "drafts",
        }],
    });
    println!("needs_layout={}", list.needs_layout());
    let w = list.layout(viewport, &mut console);
    println!("groups={} root={:?}", list.tree().count(list.tree().root()), w.cached);
}
