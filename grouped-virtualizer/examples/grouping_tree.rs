// Example: group a collection by two keys and follow incremental changes.
use grouped_virtualizer::{FlatEntry, GroupDescriptor, GroupingTree, TreeOptions};

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct Song {
    title: &'static str,
    artist: Option<&'static str>,
    year: u16,
}

fn print_flat(tree: &GroupingTree<Song, String>) {
    for pos in 0..tree.len() {
        match tree.locate(pos) {
            Some(FlatEntry::Header(id)) => {
                let indent = "  ".repeat(tree.level(id).unwrap_or(1) - 1);
                println!("{pos:>3} {indent}[{}]", tree.label(id).unwrap_or_default());
            }
            Some(FlatEntry::Item { item, .. }) => println!("{pos:>3}     {}", item.title),
            None => {}
        }
    }
}

fn main() {
    let opts = TreeOptions::new(vec![
        GroupDescriptor::new(|s: &Song| s.artist.map(String::from), "Unknown artist"),
        GroupDescriptor::new(|s: &Song| Some(format!("{}s", s.year / 10 * 10)), "-"),
    ])
    .with_record_changes(true);
    let mut tree = GroupingTree::new(opts);

    tree.add_range(vec![
        Song {
            title: "Blue",
            artist: Some("Ada"),
            year: 1971,
        },
        Song {
            title: "Tide",
            artist: None,
            year: 1988,
        },
        Song {
            title: "River",
            artist: Some("Ada"),
            year: 1983,
        },
    ]);
    print_flat(&tree);
    println!("changes={}", tree.take_changes().len());

    let tide = Song {
        title: "Tide",
        artist: None,
        year: 1988,
    };
    tree.remove(&tide);
    for change in tree.take_changes() {
        println!(
            "{:?} x{} on {:?} at {}",
            change.kind,
            change.count(),
            change.node,
            change.position
        );
    }
    print_flat(&tree);
}
