use crate::*;

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Clone, Copy, Debug)]
struct Lcg(u64);

impl Lcg {
    fn new(seed: u64) -> Self {
        Self(seed)
    }

    fn next_u64(&mut self) -> u64 {
        // Deterministic, dependency-free PRNG for tests.
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0
    }

    fn gen_range_usize(&mut self, start: usize, end_exclusive: usize) -> usize {
        debug_assert!(start < end_exclusive);
        let span = (end_exclusive - start) as u64;
        start + ((self.next_u64() >> 16) % span) as usize
    }

    fn gen_bool(&mut self) -> bool {
        (self.next_u64() >> 33) & 1 == 1
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct Row {
    id: u32,
    group: Option<&'static str>,
    sub: Option<&'static str>,
}

fn row(id: u32, group: &'static str) -> Row {
    Row {
        id,
        group: Some(group),
        sub: None,
    }
}

fn by_group() -> GroupDescriptor<Row, &'static str> {
    GroupDescriptor::new(|r: &Row| r.group, "(none)")
}

fn by_sub() -> GroupDescriptor<Row, &'static str> {
    GroupDescriptor::new(|r: &Row| r.sub, "(no sub)")
}

fn by_parity() -> GroupDescriptor<Row, &'static str> {
    GroupDescriptor::new(
        |r: &Row| Some(if r.id % 2 == 0 { "even" } else { "odd" }),
        "-",
    )
}

fn tree_with(
    descriptors: Vec<GroupDescriptor<Row, &'static str>>,
) -> GroupingTree<Row, &'static str> {
    GroupingTree::new(TreeOptions::new(descriptors).with_record_changes(true))
}

#[derive(Clone, Debug, PartialEq)]
enum Flat {
    Group(String),
    Item(u32),
}

fn flatten<K: MapKey + Clone + core::fmt::Display>(tree: &GroupingTree<Row, K>) -> Vec<Flat> {
    (0..tree.len())
        .map(|pos| match tree.locate(pos).expect("position in range") {
            FlatEntry::Header(id) => Flat::Group(tree.label(id).expect("group label")),
            FlatEntry::Item { item, .. } => Flat::Item(item.id),
        })
        .collect()
}

fn group(label: &str) -> Flat {
    Flat::Group(label.to_string())
}

/// Walks the tree and checks totals, key index, parent links and scroll contiguity.
fn check_invariants<K: MapKey + Clone>(tree: &GroupingTree<Row, K>) {
    fn walk<K: MapKey + Clone>(tree: &GroupingTree<Row, K>, id: NodeId) -> (usize, usize) {
        if !tree.is_grouping(id) {
            assert_eq!(tree.total_items(id), tree.items(id).len());
            assert_eq!(tree.total_groups(id), 0);
            return (tree.items(id).len(), 0);
        }
        let header = usize::from(id != tree.root());
        let mut next_start = tree.scroll_start(id).expect("live node") + header;
        let mut items = 0;
        let mut groups = 0;
        for &child in tree.children(id) {
            assert_eq!(tree.parent(child), Some(id));
            assert!(tree.total_items(child) > 0, "empty group survived");
            let key = tree.key(child).expect("group key");
            assert_eq!(tree.child_by_key(id, key), Some(child));
            assert_eq!(tree.scroll_start(child), Some(next_start));
            let (i, g) = walk(tree, child);
            items += i;
            groups += g + 1;
            next_start = tree.scroll_end(child).expect("non-empty group") + 1;
        }
        assert_eq!(tree.total_items(id), items);
        assert_eq!(tree.total_groups(id), groups);
        (items, groups)
    }

    let root = tree.root();
    walk(tree, root);
    assert_eq!(tree.scroll_end(root).map_or(0, |end| end + 1), tree.len());
}

fn item_ids<K: MapKey + Clone>(tree: &GroupingTree<Row, K>) -> Vec<u32> {
    let mut ids: Vec<u32> = (0..tree.len())
        .filter_map(|pos| match tree.locate(pos) {
            Some(FlatEntry::Item { item, .. }) => Some(item.id),
            _ => None,
        })
        .collect();
    ids.sort_unstable();
    ids
}

#[test]
fn two_level_grouping_flattens_headers_before_items() {
    let mut tree = tree_with(vec![by_group()]);
    tree.add_range(vec![
        row(1, "A"),
        row(2, "A"),
        row(3, "A"),
        row(4, "B"),
        row(5, "B"),
    ]);

    assert_eq!(
        flatten(&tree),
        vec![
            group("A"),
            Flat::Item(1),
            Flat::Item(2),
            Flat::Item(3),
            group("B"),
            Flat::Item(4),
            Flat::Item(5),
        ]
    );
    let root = tree.root();
    assert_eq!(tree.total_items(root), 5);
    assert_eq!(tree.total_groups(root), 2);
    assert_eq!(tree.count(root), 2);
    assert!(tree.is_grouping(root));
    check_invariants(&tree);
}

#[test]
fn removing_last_item_of_a_group_deletes_it() {
    let mut tree = tree_with(vec![by_group()]);
    tree.add_range(vec![row(1, "A"), row(2, "A"), row(3, "A"), row(4, "B")]);
    let root = tree.root();
    let b = tree.children(root)[1];
    tree.take_changes();

    assert!(tree.remove(&row(4, "B")));
    assert_eq!(tree.total_groups(root), 1);
    assert!(!tree.contains(b));
    assert_eq!(
        flatten(&tree),
        vec![group("A"), Flat::Item(1), Flat::Item(2), Flat::Item(3)]
    );

    let changes = tree.take_changes();
    assert_eq!(changes.len(), 2);
    assert_eq!(changes[0].node, b);
    assert_eq!(changes[0].kind, ChangeKind::Remove);
    assert_eq!(changes[0].affected, Affected::Items(vec![row(4, "B")]));
    assert_eq!(changes[1].node, root);
    assert_eq!(changes[1].kind, ChangeKind::Remove);
    assert_eq!(changes[1].affected, Affected::Groups(vec![b]));
    assert_eq!(changes[1].position, 1);
    check_invariants(&tree);
}

#[test]
fn remove_of_missing_item_is_not_an_error() {
    let mut tree = tree_with(vec![by_group()]);
    tree.add(row(1, "A"));
    tree.take_changes();

    assert!(!tree.remove(&row(9, "A")));
    assert!(!tree.remove(&row(1, "Z")));
    assert_eq!(tree.total_items(tree.root()), 1);
    assert!(tree.take_changes().is_empty());
}

#[test]
fn add_range_emits_one_change_per_new_group() {
    let new_groups = Arc::new(AtomicUsize::new(0));
    let all = Arc::new(AtomicUsize::new(0));
    let opts = TreeOptions::new(vec![GroupDescriptor::new(
        |r: &Row| Some(r.id % 10),
        "-",
    )])
    .with_on_change(Some({
        let new_groups = Arc::clone(&new_groups);
        let all = Arc::clone(&all);
        move |_: &GroupingTree<Row, u32>, change: &GroupChange<Row>| {
            all.fetch_add(1, Ordering::Relaxed);
            if change.kind == ChangeKind::Add && matches!(change.affected, Affected::Groups(_)) {
                new_groups.fetch_add(change.count(), Ordering::Relaxed);
            }
        }
    }));
    let mut tree = GroupingTree::new(opts);

    tree.add_range((0..1000).map(|id| Row {
        id,
        group: None,
        sub: None,
    }));
    assert_eq!(new_groups.load(Ordering::Relaxed), 10);
    assert_eq!(all.load(Ordering::Relaxed), 10);
    assert_eq!(tree.total_items(tree.root()), 1000);

    // Existing groups: one batched append per leaf node.
    all.store(0, Ordering::Relaxed);
    tree.add_range((1000..2000).map(|id| Row {
        id,
        group: None,
        sub: None,
    }));
    assert_eq!(all.load(Ordering::Relaxed), 10);
    assert_eq!(new_groups.load(Ordering::Relaxed), 10);
    check_invariants(&tree);
}

#[test]
fn add_emits_exactly_one_change() {
    let mut tree = tree_with(vec![by_group(), by_sub()]);
    let root = tree.root();

    tree.add(Row {
        id: 1,
        group: Some("A"),
        sub: Some("x"),
    });
    let changes = tree.take_changes();
    assert_eq!(changes.len(), 1);
    let a = tree.children(root)[0];
    assert_eq!(changes[0].node, root);
    assert_eq!(changes[0].affected, Affected::Groups(vec![a]));

    // New second-level group under an existing top-level group.
    tree.add(Row {
        id: 2,
        group: Some("A"),
        sub: Some("y"),
    });
    let changes = tree.take_changes();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].node, a);
    assert_eq!(changes[0].position, 1);

    // Existing path: item appended to the leaf.
    let x = tree.children(a)[0];
    tree.add(Row {
        id: 3,
        group: Some("A"),
        sub: Some("x"),
    });
    let changes = tree.take_changes();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].node, x);
    assert_eq!(changes[0].kind, ChangeKind::Add);
    assert_eq!(changes[0].position, 1);
    assert_eq!(changes[0].count(), 1);

    assert_eq!(tree.total_groups(root), 3);
    assert_eq!(tree.total_groups(a), 2);
    check_invariants(&tree);
}

#[test]
fn missing_key_uses_placeholder_but_stays_distinct() {
    let mut tree: GroupingTree<Row, String> = GroupingTree::new(TreeOptions::new(vec![
        GroupDescriptor::new(|r: &Row| r.group.map(|g| g.to_string()), "(none)"),
    ]));
    tree.add(Row {
        id: 1,
        group: None,
        sub: None,
    });
    tree.add(Row {
        id: 2,
        group: Some("(none)"),
        sub: None,
    });

    let root = tree.root();
    assert_eq!(tree.count(root), 2);
    let missing = tree.children(root)[0];
    let value = tree.children(root)[1];
    assert!(tree.key(missing).is_some_and(GroupKey::is_missing));
    assert_eq!(tree.label(missing), tree.label(value));
    assert_ne!(tree.key(missing), tree.key(value));
}

#[test]
fn re_adding_a_key_creates_a_fresh_node() {
    let mut tree = tree_with(vec![by_group()]);
    tree.add(row(1, "A"));
    let old = tree.children(tree.root())[0];

    assert!(tree.remove(&row(1, "A")));
    assert!(!tree.contains(old));
    tree.add(row(2, "A"));
    let fresh = tree.children(tree.root())[0];

    assert_ne!(old, fresh);
    assert!(tree.contains(fresh));
    assert_eq!(tree.items(old), &[] as &[Row]);
    assert_eq!(tree.total_items(fresh), 1);
    assert_eq!(tree.items(fresh), &[row(2, "A")]);
}

#[test]
fn remove_range_reports_runs_highest_first() {
    let mut tree = tree_with(Vec::new());
    tree.add_range((0..10).map(|id| row(id, "A")));
    tree.take_changes();

    let removed = tree.remove_range(&[row(2, "A"), row(3, "A"), row(7, "A"), row(42, "A")]);
    assert_eq!(removed, 3);

    let changes = tree.take_changes();
    let positions: Vec<(usize, usize)> = changes.iter().map(|c| (c.position, c.count())).collect();
    assert_eq!(positions, vec![(7, 1), (2, 2)]);
    assert!(changes.iter().all(|c| c.kind == ChangeKind::Remove));
    assert_eq!(item_ids(&tree), vec![0, 1, 4, 5, 6, 8, 9]);
}

#[test]
fn remove_range_in_a_large_group_takes_the_first_duplicates() {
    let mut tree = tree_with(vec![by_group()]);
    tree.add_range((0..2000).map(|id| row(id, "A")));
    tree.add_range(vec![row(3, "A"), row(3, "A")]);
    tree.take_changes();

    // Every odd id in reverse order, plus one more copy of 3: three copies exist, two go.
    let mut targets: Vec<Row> = (0..2000)
        .rev()
        .filter(|id| id % 2 == 1)
        .map(|id| row(id, "A"))
        .collect();
    targets.push(row(3, "A"));
    assert_eq!(tree.remove_range(&targets), 1001);

    let a = tree.children(tree.root())[0];
    let left: Vec<u32> = tree.items(a).iter().map(|r| r.id).collect();
    let mut expected: Vec<u32> = (0..2000).filter(|id| id % 2 == 0).collect();
    expected.push(3);
    assert_eq!(left, expected);

    let changes = tree.take_changes();
    assert_eq!(changes.len(), 1000);
    assert_eq!((changes[0].position, changes[0].count()), (1999, 2));
    assert_eq!((changes[999].position, changes[999].count()), (1, 1));
    check_invariants(&tree);
}

#[test]
fn random_add_remove_keeps_totals_and_ranges_consistent() {
    const GROUPS: [&str; 5] = ["a", "b", "c", "d", "e"];
    const SUBS: [&str; 3] = ["x", "y", "z"];

    let mut rng = Lcg::new(0x5eed_0001);
    let mut tree = tree_with(vec![by_group(), by_sub()]);
    let mut model: Vec<Row> = Vec::new();
    let mut next_id = 0u32;

    let mut gen_row = |rng: &mut Lcg| {
        next_id += 1;
        Row {
            id: next_id,
            group: (rng.gen_range_usize(0, 6) != 0).then(|| GROUPS[rng.gen_range_usize(0, 5)]),
            sub: (rng.gen_range_usize(0, 4) != 0).then(|| SUBS[rng.gen_range_usize(0, 3)]),
        }
    };

    for _ in 0..400 {
        match rng.gen_range_usize(0, 4) {
            0 => {
                let r = gen_row(&mut rng);
                tree.add(r.clone());
                model.push(r);
            }
            1 => {
                let n = rng.gen_range_usize(1, 20);
                let batch: Vec<Row> = (0..n).map(|_| gen_row(&mut rng)).collect();
                tree.add_range(batch.clone());
                model.extend(batch);
            }
            2 if !model.is_empty() => {
                let i = rng.gen_range_usize(0, model.len());
                let r = model.swap_remove(i);
                assert!(tree.remove(&r));
            }
            _ if !model.is_empty() => {
                let mut batch = Vec::new();
                for _ in 0..rng.gen_range_usize(1, 8) {
                    if model.is_empty() {
                        break;
                    }
                    let i = rng.gen_range_usize(0, model.len());
                    batch.push(model.swap_remove(i));
                }
                let expected = batch.len();
                batch.push(Row {
                    id: u32::MAX,
                    group: Some("a"),
                    sub: None,
                });
                assert_eq!(tree.remove_range(&batch), expected);
            }
            _ => {}
        }

        assert_eq!(tree.total_items(tree.root()), model.len());
        check_invariants(&tree);
    }

    let mut expected: Vec<u32> = model.iter().map(|r| r.id).collect();
    expected.sort_unstable();
    assert_eq!(item_ids(&tree), expected);
    tree.take_changes();
}

#[test]
fn local_item_position_is_monotonic() {
    let mut rng = Lcg::new(42);
    let mut tree = tree_with(vec![by_group(), by_sub()]);
    let groups = ["a", "b", "c"];
    let subs = ["x", "y"];
    tree.add_range((0..60).map(|id| Row {
        id,
        group: Some(groups[rng.gen_range_usize(0, 3)]),
        sub: rng.gen_bool().then(|| subs[rng.gen_range_usize(0, 2)]),
    }));

    let mut nodes = vec![tree.root()];
    let mut i = 0;
    while i < nodes.len() {
        let id = nodes[i];
        nodes.extend_from_slice(tree.children(id));
        i += 1;
    }

    for id in nodes {
        let mut prev = 0;
        for pos in 0..tree.len() + 3 {
            let local = tree.get_local_item_position(id, pos);
            assert!(local >= prev, "not monotonic at {pos}");
            assert!(local <= tree.count(id));
            prev = local;
        }
        assert_eq!(tree.get_local_item_position(id, tree.len() + 3), tree.count(id));
    }
}

#[test]
fn local_item_position_maps_into_owning_child() {
    let mut tree = tree_with(vec![by_group()]);
    tree.add_range(vec![row(1, "A"), row(2, "A"), row(3, "B"), row(4, "B")]);
    let root = tree.root();
    let a = tree.children(root)[0];
    let b = tree.children(root)[1];

    // [A, 1, 2, B, 3, 4]
    assert_eq!(tree.get_local_item_position(root, 0), 0);
    assert_eq!(tree.get_local_item_position(root, 2), 0);
    assert_eq!(tree.get_local_item_position(root, 3), 1);
    assert_eq!(tree.get_local_item_position(root, 6), 2);
    assert_eq!(tree.get_local_item_position(a, 0), 0);
    assert_eq!(tree.get_local_item_position(a, 2), 1);
    assert_eq!(tree.get_local_item_position(b, 5), 1);
    assert_eq!(tree.get_local_item_position(b, 9), 2);

    assert_eq!(tree.position_of(&row(3, "B")), Some(4));
    assert_eq!(tree.find(&row(4, "B")), Some((b, 1)));
    assert_eq!(tree.locate(3), Some(FlatEntry::Header(b)));
    assert_eq!(tree.locate(6), None);
    assert_eq!(tree.set_item_scrolling(0), 6);
}

#[test]
fn clear_from_keeps_ancestors_and_resets_the_level() {
    let mut tree = tree_with(vec![by_group(), by_sub()]);
    tree.add_range(vec![
        Row {
            id: 1,
            group: Some("A"),
            sub: Some("x"),
        },
        Row {
            id: 2,
            group: Some("A"),
            sub: Some("y"),
        },
        Row {
            id: 3,
            group: Some("B"),
            sub: Some("x"),
        },
    ]);
    let root = tree.root();
    let tops: Vec<NodeId> = tree.children(root).to_vec();
    let subs: Vec<NodeId> = tops.iter().flat_map(|t| tree.children(*t).to_vec()).collect();
    tree.take_changes();

    tree.clear_from(1);
    assert_eq!(tree.children(root), tops.as_slice());
    for &top in &tops {
        assert!(tree.contains(top));
        assert!(tree.children(top).is_empty());
        assert_eq!(tree.total_items(top), 0);
    }
    for &sub in &subs {
        assert!(!tree.contains(sub));
    }
    assert_eq!(tree.total_items(root), 0);
    assert_eq!(tree.total_groups(root), 2);

    let changes = tree.take_changes();
    assert_eq!(changes.len(), 2);
    assert!(changes.iter().all(|c| c.kind == ChangeKind::Reset));

    assert_eq!(tree.prune_empty(), 2);
    assert_eq!(tree.count(root), 0);
    assert_eq!(tree.total_groups(root), 0);

    // Out-of-range levels clamp to the deepest level.
    tree.add(Row {
        id: 4,
        group: Some("C"),
        sub: Some("z"),
    });
    let c = tree.children(root)[0];
    let z = tree.children(c)[0];
    tree.clear_from(99);
    assert!(tree.contains(z));
    assert!(tree.items(z).is_empty());
    assert_eq!(tree.total_groups(root), 2);

    tree.clear();
    assert!(!tree.contains(c));
    assert!(tree.is_empty());
    assert_eq!(tree.len(), 0);
}

#[test]
fn descriptor_edits_match_a_fresh_grouping() {
    let source: Vec<Row> = (0..24)
        .map(|id| Row {
            id,
            group: Some(["A", "B", "C"][id as usize % 3]),
            sub: Some(["x", "y"][id as usize % 4 / 2]),
        })
        .collect();
    let fresh = |descriptors: Vec<GroupDescriptor<Row, &'static str>>| {
        let mut t = tree_with(descriptors);
        t.add_range(source.clone());
        flatten(&t)
    };

    let mut tree = tree_with(vec![by_group()]);
    tree.add_range(source.clone());
    let tops: Vec<NodeId> = tree.children(tree.root()).to_vec();

    tree.push_descriptor(by_sub(), &source);
    assert_eq!(flatten(&tree), fresh(vec![by_group(), by_sub()]));
    // Levels above the edit keep their identity.
    assert_eq!(tree.children(tree.root()), tops.as_slice());
    check_invariants(&tree);

    assert!(tree.replace_descriptor(1, by_parity(), &source).is_some());
    assert_eq!(flatten(&tree), fresh(vec![by_group(), by_parity()]));
    assert_eq!(tree.children(tree.root()), tops.as_slice());
    check_invariants(&tree);

    tree.insert_descriptor(0, by_sub(), &source);
    assert_eq!(flatten(&tree), fresh(vec![by_sub(), by_group(), by_parity()]));
    check_invariants(&tree);

    assert!(tree.remove_descriptor(0, &source).is_some());
    assert!(tree.remove_descriptor(7, &source).is_none());
    assert_eq!(flatten(&tree), fresh(vec![by_group(), by_parity()]));
    check_invariants(&tree);

    tree.set_descriptors(Vec::new(), &source);
    assert_eq!(tree.depth(), 0);
    assert!(!tree.is_grouping(tree.root()));
    assert_eq!(tree.len(), 24);
    check_invariants(&tree);
}

#[test]
fn batch_delivers_changes_and_count_once() {
    let counts = Arc::new(AtomicUsize::new(0));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut tree: GroupingTree<Row, &'static str> = GroupingTree::new(
        TreeOptions::new(vec![by_group()])
            .with_on_count_changed(Some({
                let counts = Arc::clone(&counts);
                move |_: &GroupingTree<Row, &'static str>| {
                    counts.fetch_add(1, Ordering::Relaxed);
                }
            }))
            .with_on_change(Some({
                let seen = Arc::clone(&seen);
                move |tree: &GroupingTree<Row, &'static str>, change: &GroupChange<Row>| {
                    // Scroll positions are already current when changes are delivered.
                    seen.lock().expect("lock").push((change.kind, tree.len()));
                }
            })),
    );

    tree.batch(|t| {
        t.add(row(1, "A"));
        t.add(row(2, "B"));
        t.add(row(3, "A"));
    });
    assert_eq!(counts.load(Ordering::Relaxed), 1);
    let seen = seen.lock().expect("lock").clone();
    assert_eq!(seen.len(), 3);
    assert!(seen.iter().all(|(kind, len)| *kind == ChangeKind::Add && *len == 5));

    // Nothing removed, totals unchanged.
    tree.remove(&row(9, "A"));
    assert_eq!(counts.load(Ordering::Relaxed), 1);
}

#[test]
fn stale_ids_resolve_to_nothing() {
    let mut tree = tree_with(vec![by_group()]);
    tree.add(row(1, "A"));
    let a = tree.children(tree.root())[0];
    tree.clear();
    tree.add(row(2, "B"));
    let b = tree.children(tree.root())[0];

    // The slot was reused under a new generation.
    assert_ne!(a, b);
    assert!(!tree.contains(a));
    assert_eq!(tree.count(a), 0);
    assert_eq!(tree.scroll_start(a), None);
    assert_eq!(tree.key(a), None);
    assert!(tree.view(a).is_none());
    assert_eq!(tree.get_local_item_position(a, 0), 0);
}

#[test]
fn node_view_spans_cover_group_bodies() {
    let mut tree = tree_with(vec![by_group()]);
    tree.add_range(vec![row(1, "A"), row(2, "A"), row(3, "B")]);
    let root = tree.root();
    let view = tree.view(root).expect("root view");

    assert_eq!(ItemSequence::len(&view), 2);
    assert_eq!(view.span_at(0), 3);
    assert_eq!(view.span_at(1), 2);
    assert!(view.is_aggregate(0));
    assert_eq!(view.id_at(1), Some(SlotKey::Group(tree.children(root)[1])));

    let a = tree.children(root)[0];
    let leaf = tree.view(a).expect("leaf view");
    assert!(!leaf.is_aggregate(0));
    assert_eq!(leaf.id_at(1), Some(SlotKey::Item(row(2, "A"))));

    let flat = tree.flat();
    assert_eq!(ItemSequence::len(&flat), 5);
    assert_eq!(flat.id_at(3), Some(SlotKey::Group(tree.children(root)[1])));
    assert_eq!(flat.id_at(5), None);
}

// --- SizeEstimator ---

#[test]
fn estimator_average_ignores_aggregates() {
    let mut est: SizeEstimator<u32> = SizeEstimator::new();
    assert_eq!(est.estimated_average(Axis::Vertical), 0.0);

    assert_eq!(est.add_or_update_size(1, Extent::new(10.0, 20.0)), None);
    assert_eq!(est.add_or_update_size(2, Extent::new(30.0, 40.0)), None);
    assert_eq!(est.estimated_average(Axis::Vertical), 30.0);
    assert_eq!(est.estimated_average(Axis::Horizontal), 20.0);

    assert_eq!(
        est.add_or_update_size(2, Extent::new(30.0, 60.0)),
        Some(Extent::new(30.0, 40.0))
    );
    assert_eq!(est.estimated_average(Axis::Vertical), 40.0);

    est.add_or_update_aggregate_size(3, Extent::new(0.0, 1000.0));
    assert_eq!(est.estimated_average(Axis::Vertical), 40.0);
    assert_eq!(est.len(), 3);
    assert_eq!(est.estimated_total_extent(Axis::Vertical, 5), 200.0);

    assert_eq!(est.evict(&1), Some(Extent::new(10.0, 20.0)));
    assert_eq!(est.estimated_average(Axis::Vertical), 60.0);
    est.clear();
    assert!(est.is_empty());
    assert_eq!(est.estimated_average(Axis::Vertical), 0.0);
}

#[test]
fn estimator_revision_tracks_record_changes() {
    let mut est: SizeEstimator<u32> = SizeEstimator::new();
    let r0 = est.revision();
    est.add_or_update_size(1, Extent::new(0.0, 10.0));
    let r1 = est.revision();
    assert_ne!(r0, r1);
    est.add_or_update_size(1, Extent::new(0.0, 10.0));
    assert_eq!(est.revision(), r1);
    est.add_or_update_size(1, Extent::new(0.0, 11.0));
    assert_ne!(est.revision(), r1);
}

#[test]
fn offsets_use_records_then_average() {
    let ids: Vec<u32> = (0..10).collect();
    let mut est = SizeEstimator::new();
    est.add_or_update_size(0, Extent::new(0.0, 10.0));
    est.add_or_update_size(1, Extent::new(0.0, 30.0));
    // average 20 for everything unmeasured

    assert_eq!(est.offset_for_index(&ids, Axis::Vertical, 0), 0.0);
    assert_eq!(est.offset_for_index(&ids, Axis::Vertical, 2), 40.0);
    assert_eq!(est.offset_for_index(&ids, Axis::Vertical, 5), 100.0);
    assert_eq!(est.offset_for_index(&ids, Axis::Vertical, 99), 200.0);
    assert_eq!(est.sequence_extent(&ids, Axis::Vertical), 200.0);

    assert_eq!(est.index_for_offset(&ids, Axis::Vertical, -5.0), 0);
    assert_eq!(est.index_for_offset(&ids, Axis::Vertical, 9.9), 0);
    assert_eq!(est.index_for_offset(&ids, Axis::Vertical, 10.0), 1);
    assert_eq!(est.index_for_offset(&ids, Axis::Vertical, 39.0), 1);
    assert_eq!(est.index_for_offset(&ids, Axis::Vertical, 40.0), 2);
    assert_eq!(est.index_for_offset(&ids, Axis::Vertical, 200.0), 10);
}

#[test]
fn offset_of_index_for_offset_round_trips_within_one_item() {
    let mut rng = Lcg::new(7);
    let ids: Vec<u32> = (0..500).collect();
    let mut est = SizeEstimator::new();
    for &id in &ids {
        if rng.gen_bool() {
            est.add_or_update_size(id, Extent::new(0.0, rng.gen_range_usize(5, 60) as f64));
        }
    }
    let total = est.sequence_extent(&ids, Axis::Vertical);
    for _ in 0..200 {
        let x = rng.gen_range_usize(0, total as usize) as f64;
        let index = est.index_for_offset(&ids, Axis::Vertical, x);
        let start = est.offset_for_index(&ids, Axis::Vertical, index);
        let extent = est.extent_at(&ids, index, Axis::Vertical);
        assert!(start <= x + 1e-6, "start {start} past {x}");
        assert!(x - start < extent + 1e-6, "{x} not inside item {index}");
    }
}

#[test]
fn seeded_scans_match_unseeded_scans() {
    let mut rng = Lcg::new(99);
    let ids: Vec<u32> = (0..300).collect();
    let mut est = SizeEstimator::new();
    for &id in ids.iter().step_by(3) {
        est.add_or_update_size(id, Extent::new(0.0, rng.gen_range_usize(1, 40) as f64));
    }
    let total = est.sequence_extent(&ids, Axis::Vertical);

    let mut seed = None;
    for _ in 0..200 {
        let x = rng.gen_range_usize(0, total as usize + 10) as f64;
        let expected = est.index_for_offset_from(&ids, Axis::Vertical, x, None);
        let cursor = est.seek_offset(&ids, Axis::Vertical, x, seed);
        assert_eq!(cursor.index(), expected.0);
        assert!((est.seed_offset(&cursor) - expected.1).abs() < 1e-6);

        let index = rng.gen_range_usize(0, 300);
        let a = est.offset_for_index(&ids, Axis::Vertical, index);
        let b = est.offset_for_index_from(&ids, Axis::Vertical, index, Some(cursor));
        assert!((a - b).abs() < 1e-6);
        seed = Some(cursor);
    }

    // A record change invalidates old seeds; results stay exact.
    let stale = seed;
    est.add_or_update_size(1, Extent::new(0.0, 500.0));
    let a = est.offset_for_index(&ids, Axis::Vertical, 200);
    let b = est.offset_for_index_from(&ids, Axis::Vertical, 200, stale);
    assert!((a - b).abs() < 1e-6);
}

#[test]
fn export_and_import_sizes_restores_offsets() {
    let ids: Vec<u32> = (0..20).collect();
    let mut a = SizeEstimator::new();
    a.add_or_update_size(2, Extent::new(0.0, 10.0));
    a.add_or_update_size(5, Extent::new(0.0, 42.0));
    a.add_or_update_aggregate_size(9, Extent::new(0.0, 300.0));

    let snapshot = a.export_sizes();
    assert_eq!(snapshot.len(), 3);

    let mut b = SizeEstimator::new();
    b.import_sizes(snapshot);
    assert_eq!(b.size_of(&5), Some(Extent::new(0.0, 42.0)));
    assert_eq!(b.record_of(&9).map(|r| r.aggregate), Some(true));
    assert_eq!(
        b.estimated_average(Axis::Vertical),
        a.estimated_average(Axis::Vertical)
    );
    assert_eq!(
        b.offset_for_index(&ids, Axis::Vertical, 15),
        a.offset_for_index(&ids, Axis::Vertical, 15)
    );
}

// --- WindowManager ---

#[derive(Clone, Copy, Debug, PartialEq)]
enum Call {
    Materialize(usize),
    Dematerialize(usize, usize),
    Recycle(usize, usize),
}

struct Host {
    size: fn(u32) -> f64,
    recycles: bool,
    live: BTreeMap<usize, u32>,
    calls: Vec<Call>,
    measures: usize,
    window: Option<(f64, f64)>,
}

impl Host {
    fn new(size: fn(u32) -> f64) -> Self {
        Self {
            size,
            recycles: false,
            live: BTreeMap::new(),
            calls: Vec::new(),
            measures: 0,
            window: None,
        }
    }

    fn materialized(&self) -> Vec<usize> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Materialize(i) => Some(*i),
                _ => None,
            })
            .collect()
    }
}

impl ContainerMaterializer<u32> for Host {
    fn materialize(&mut self, slot: Slot<'_, u32>) {
        assert!(
            !self.live.contains_key(&slot.index),
            "index {} realized twice",
            slot.index
        );
        self.live.insert(slot.index, *slot.id);
        self.calls.push(Call::Materialize(slot.index));
    }

    fn measure(&mut self, slot: Slot<'_, u32>, _scope: &mut SizeEstimator<u32>) -> Extent {
        assert_eq!(self.live.get(&slot.index), Some(slot.id));
        self.measures += 1;
        Extent::new(100.0, (self.size)(*slot.id))
    }

    fn dematerialize(&mut self, index: usize, count: usize) -> usize {
        self.calls.push(Call::Dematerialize(index, count));
        (index..index + count)
            .filter(|i| self.live.remove(i).is_some())
            .count()
    }

    fn recycle(&mut self, old_index: usize, new_index: usize, id: &u32) -> bool {
        self.calls.push(Call::Recycle(old_index, new_index));
        if !self.recycles || self.live.get(&old_index) != Some(id) {
            return false;
        }
        self.live.remove(&old_index);
        assert!(!self.live.contains_key(&new_index));
        self.live.insert(new_index, *id);
        true
    }

    fn begin_window(&mut self, panel_offset: f64, panel_end: f64) {
        self.window = Some((panel_offset, panel_end));
    }
}

fn rows_of_20(_: u32) -> f64 {
    20.0
}

fn no_cache() -> WindowOptions {
    WindowOptions::new().with_cache(CacheLength::NONE)
}

fn assert_host_matches(wm: &WindowManager<u32>, host: &Host, ids: &[u32]) {
    let realized: Vec<usize> = wm.realized_indices().collect();
    let live: Vec<usize> = host.live.keys().copied().collect();
    assert_eq!(realized, live);
    for (&index, &id) in &host.live {
        assert_eq!(ids[index], id, "container {index} shows the wrong item");
    }
}

#[test]
fn flat_window_covers_the_viewport() {
    let ids: Vec<u32> = (0..100).collect();
    let mut est = SizeEstimator::new();
    let mut wm = WindowManager::new(no_cache());
    let mut host = Host::new(rows_of_20);

    let w = wm.run_pass(Viewport::new(0.0, 200.0), &ids, &mut est, &mut host);
    assert_eq!(w.cached, VirtualRange::new(0, 10));
    assert_eq!(w.first_cached(), Some(0));
    assert_eq!(w.last_cached(), Some(9));
    assert_eq!(w.visible, VirtualRange::new(0, 10));
    assert_eq!(w.num_in_view, 10);
    assert_eq!(w.num_in_full_view, 10);
    assert_eq!(w.last_in_full_view(), Some(9));
    assert_eq!(wm.page_size(), 10);
    assert_host_matches(&wm, &host, &ids);
}

#[test]
fn empty_estimator_probes_the_first_item() {
    let ids: Vec<u32> = (0..100).collect();
    let mut est = SizeEstimator::new();
    assert_eq!(est.estimated_average(Axis::Vertical), 0.0);
    let mut wm = WindowManager::new(no_cache());
    let mut host = Host::new(rows_of_20);

    wm.run_pass(Viewport::new(0.0, 200.0), &ids, &mut est, &mut host);
    assert_eq!(host.materialized().first(), Some(&0));
    assert_eq!(est.estimated_average(Axis::Vertical), 20.0);
}

#[test]
fn zero_sized_items_stop_at_the_per_pass_cap() {
    let ids: Vec<u32> = (0..1000).collect();
    let mut est = SizeEstimator::new();
    let mut wm = WindowManager::new(no_cache().with_max_realized_per_pass(50));
    let mut host = Host::new(|_| 0.0);

    let w = wm.run_pass(Viewport::new(0.0, 200.0), &ids, &mut est, &mut host);
    assert_eq!(w.cached, VirtualRange::new(0, 50));
    assert_eq!(host.live.len(), 50);
}

#[test]
fn pass_is_idempotent_under_unchanged_geometry() {
    let ids: Vec<u32> = (0..100).collect();
    let mut est = SizeEstimator::new();
    let relayouts = Arc::new(AtomicUsize::new(0));
    let mut wm = WindowManager::new(
        WindowOptions::new()
            .with_cache(CacheLength::pages(0.5, 0.5))
            .with_on_relayout(Some({
                let relayouts = Arc::clone(&relayouts);
                move || {
                    relayouts.fetch_add(1, Ordering::Relaxed);
                }
            })),
    );
    let mut host = Host::new(|id| 10.0 + (id % 7) as f64 * 5.0);

    let viewport = Viewport::new(600.0, 200.0);
    // Early passes learn sizes and may move the window; run until nothing changes.
    let mut passes = 0;
    while wm
        .run_pass(viewport, &ids, &mut est, &mut host)
        .relayout_requested
    {
        passes += 1;
        assert!(passes < 50, "window never settled");
    }
    let settled = relayouts.load(Ordering::Relaxed);
    let calls = host.calls.len();

    let a = wm.run_pass(viewport, &ids, &mut est, &mut host);
    let b = wm.run_pass(viewport, &ids, &mut est, &mut host);
    assert_eq!(a, b);
    assert!(!b.relayout_requested);
    assert_eq!(host.calls.len(), calls, "no container churn");
    assert_eq!(relayouts.load(Ordering::Relaxed), settled);
    assert!(settled >= 1);
    assert_host_matches(&wm, &host, &ids);
}

#[test]
fn scrolling_moves_the_window_and_releases_in_runs() {
    let ids: Vec<u32> = (0..100).collect();
    let mut est = SizeEstimator::new();
    let mut wm = WindowManager::new(no_cache());
    let mut host = Host::new(rows_of_20);

    wm.run_pass(Viewport::new(0.0, 200.0), &ids, &mut est, &mut host);
    host.calls.clear();
    let w = wm.run_pass(Viewport::new(1000.0, 200.0), &ids, &mut est, &mut host);
    assert_eq!(w.cached, VirtualRange::new(50, 60));
    assert_eq!(w.panel_offset, 1000.0);
    assert!(host.calls.contains(&Call::Dematerialize(0, 10)));
    assert_host_matches(&wm, &host, &ids);

    // Scroll back a little: overlap is kept.
    host.calls.clear();
    let w = wm.run_pass(Viewport::new(900.0, 200.0), &ids, &mut est, &mut host);
    assert_eq!(w.cached, VirtualRange::new(45, 55));
    assert_eq!(host.materialized(), vec![45, 46, 47, 48, 49]);
    assert!(host.calls.contains(&Call::Dematerialize(55, 5)));
}

#[test]
fn cache_margin_extends_the_window() {
    let ids: Vec<u32> = (0..100).collect();
    let mut est = SizeEstimator::new();
    let mut wm = WindowManager::new(WindowOptions::new().with_cache(CacheLength::pages(1.0, 1.0)));
    let mut host = Host::new(rows_of_20);

    let w = wm.run_pass(Viewport::new(1000.0, 200.0), &ids, &mut est, &mut host);
    assert_eq!(w.cached, VirtualRange::new(40, 70));
    assert_eq!(w.visible, VirtualRange::new(50, 60));
    assert_eq!(w.num_in_full_view, 10);
    assert_eq!(w.cache_start, 800.0);
    assert_eq!(w.cache_end, 1400.0);

    let mut wm = WindowManager::new(WindowOptions::new().with_cache(CacheLength::items(2.0, 3.0)));
    let mut host = Host::new(rows_of_20);
    let w = wm.run_pass(Viewport::new(1000.0, 200.0), &ids, &mut est, &mut host);
    assert_eq!(w.cached, VirtualRange::new(48, 63));
}

#[test]
fn item_scroll_unit_aligns_the_first_visible_slot() {
    let ids: Vec<u32> = (0..100).collect();
    let mut est = SizeEstimator::new();
    let mut wm = WindowManager::new(no_cache().with_scroll_unit(ScrollUnit::Item));
    let mut host = Host::new(rows_of_20);

    let w = wm.run_pass(Viewport::at_position(37, 200.0), &ids, &mut est, &mut host);
    assert_eq!(w.panel_offset, 740.0);
    assert_eq!(host.window, Some((740.0, 940.0)));
    assert_eq!(w.first_visible(), Some(37));
    assert_eq!(w.num_in_full_view, 10);

    // Past the end clamps to the last slot.
    let w = wm.run_pass(Viewport::at_position(500, 200.0), &ids, &mut est, &mut host);
    assert_eq!(w.first_visible(), Some(99));
}

#[test]
fn inserted_items_recycle_shifted_containers() {
    let mut ids: Vec<u32> = (0..100).collect();
    let mut est = SizeEstimator::new();
    let mut wm = WindowManager::new(no_cache());
    let mut host = Host::new(rows_of_20);
    host.recycles = true;

    wm.run_pass(Viewport::new(0.0, 200.0), &ids, &mut est, &mut host);
    host.calls.clear();

    ids.insert(0, 1000);
    ids.insert(0, 1001);
    wm.on_items_inserted(0, 2);
    assert!(wm.needs_pass());
    assert!(wm.is_realized(11));
    assert!(!wm.is_realized(0));

    wm.run_pass(Viewport::new(0.0, 200.0), &ids, &mut est, &mut host);
    assert_eq!(host.calls[0], Call::Recycle(9, 11));
    assert_eq!(host.calls[9], Call::Recycle(0, 2));
    assert_eq!(host.materialized(), vec![0, 1]);
    assert!(host.calls.contains(&Call::Dematerialize(10, 2)));
    assert_host_matches(&wm, &host, &ids);
}

#[test]
fn removed_items_release_and_shift_down() {
    let mut ids: Vec<u32> = (0..100).collect();
    let mut est = SizeEstimator::new();
    let mut wm = WindowManager::new(no_cache());
    let mut host = Host::new(rows_of_20);
    host.recycles = true;

    wm.run_pass(Viewport::new(0.0, 200.0), &ids, &mut est, &mut host);
    host.calls.clear();

    ids.drain(2..5);
    wm.on_items_removed(2, 3);
    wm.run_pass(Viewport::new(0.0, 200.0), &ids, &mut est, &mut host);
    assert_eq!(host.calls[0], Call::Dematerialize(2, 3));
    assert_eq!(host.calls[1], Call::Recycle(5, 2));
    assert_eq!(host.materialized(), vec![7, 8, 9]);
    assert_host_matches(&wm, &host, &ids);
}

#[test]
fn refused_recycles_are_rematerialized() {
    let mut ids: Vec<u32> = (0..100).collect();
    let mut est = SizeEstimator::new();
    let mut wm = WindowManager::new(no_cache());
    let mut host = Host::new(rows_of_20);

    wm.run_pass(Viewport::new(0.0, 200.0), &ids, &mut est, &mut host);
    ids.insert(3, 500);
    wm.on_items_inserted(3, 1);
    host.calls.clear();

    wm.run_pass(Viewport::new(0.0, 200.0), &ids, &mut est, &mut host);
    assert_eq!(host.materialized(), (3..10).collect::<Vec<_>>());
    assert_host_matches(&wm, &host, &ids);
}

#[test]
fn reset_releases_everything() {
    let mut ids: Vec<u32> = (0..100).collect();
    let mut est = SizeEstimator::new();
    let mut wm = WindowManager::new(no_cache());
    let mut host = Host::new(rows_of_20);

    wm.run_pass(Viewport::new(0.0, 200.0), &ids, &mut est, &mut host);
    ids = (200..210).collect();
    wm.on_reset();
    assert_eq!(wm.realized_len(), 0);
    host.calls.clear();

    wm.run_pass(Viewport::new(0.0, 200.0), &ids, &mut est, &mut host);
    assert_eq!(host.calls[0], Call::Dematerialize(0, 10));
    assert_host_matches(&wm, &host, &ids);

    ids.clear();
    wm.on_reset();
    let w = wm.run_pass(Viewport::new(0.0, 200.0), &ids, &mut est, &mut host);
    assert!(w.is_empty());
    assert!(host.live.is_empty());
}

#[test]
fn disabled_window_manager_does_no_work() {
    let ids: Vec<u32> = (0..100).collect();
    let mut est = SizeEstimator::new();
    let mut wm = WindowManager::new(no_cache().with_enabled(false));
    let mut host = Host::new(rows_of_20);

    let w = wm.run_pass(Viewport::new(0.0, 200.0), &ids, &mut est, &mut host);
    assert!(w.is_empty());
    assert!(host.calls.is_empty());
    assert_eq!(host.measures, 0);

    wm.set_enabled(true);
    let w = wm.run_pass(Viewport::new(0.0, 200.0), &ids, &mut est, &mut host);
    assert_eq!(w.cached, VirtualRange::new(0, 10));

    wm.release(&mut host);
    assert!(host.live.is_empty());
    assert_eq!(wm.realized_len(), 0);
}

#[test]
fn scroll_into_view_offsets() {
    let ids: Vec<u32> = (0..100).collect();
    let mut est = SizeEstimator::new();
    let mut wm = WindowManager::new(no_cache());
    let mut host = Host::new(rows_of_20);
    let viewport = Viewport::new(0.0, 200.0);
    wm.run_pass(viewport, &ids, &mut est, &mut host);

    assert_eq!(wm.scroll_into_view_offset(&ids, &est, 50, Align::Start, viewport), 1000.0);
    assert_eq!(wm.scroll_into_view_offset(&ids, &est, 50, Align::End, viewport), 820.0);
    assert_eq!(wm.scroll_into_view_offset(&ids, &est, 50, Align::Center, viewport), 910.0);
    assert_eq!(wm.scroll_into_view_offset(&ids, &est, 3, Align::Auto, viewport), 0.0);
    assert_eq!(wm.scroll_into_view_offset(&ids, &est, 12, Align::Auto, viewport), 60.0);
    // Clamped to the scrollable range.
    assert_eq!(wm.scroll_into_view_offset(&ids, &est, 99, Align::Start, viewport), 1800.0);
    assert_eq!(wm.estimated_extent(&ids, &est), 2000.0);
}

#[test]
fn realized_placements_follow_measured_sizes() {
    let ids: Vec<u32> = (0..50).collect();
    let mut est = SizeEstimator::new();
    let mut wm = WindowManager::new(no_cache());
    let mut host = Host::new(|id| if id % 2 == 0 { 10.0 } else { 30.0 });

    wm.run_pass(Viewport::new(0.0, 100.0), &ids, &mut est, &mut host);
    let mut placements = Vec::new();
    wm.collect_realized_items(&mut placements);
    let starts: Vec<f64> = placements.iter().map(|p| p.start).collect();
    assert_eq!(starts, vec![0.0, 10.0, 40.0, 50.0, 80.0, 90.0]);
    assert_eq!(placements.last().map(RealizedItem::end), Some(120.0));

    let mut count = 0;
    wm.for_each_realized_item(|_| count += 1);
    assert_eq!(count, 6);
}

#[test]
fn flattened_tree_drives_an_item_unit_window() {
    let mut tree = tree_with(vec![by_group()]);
    tree.add_range((0..40).map(|id| row(id, ["A", "B", "C", "D"][id as usize / 10])));
    assert_eq!(tree.len(), 44);

    let mut est: SizeEstimator<SlotKey<Row>> = SizeEstimator::new();
    let mut wm = WindowManager::new(no_cache().with_scroll_unit(ScrollUnit::Item));
    let mut host = FlatHost::default();

    let flat = tree.flat();
    let w = wm.run_pass(Viewport::at_position(11, 100.0), &flat, &mut est, &mut host);
    // Position 11 is the header of group B.
    assert_eq!(w.first_visible(), Some(11));
    assert_eq!(w.num_in_full_view, 10);
    assert_eq!(
        wm.realized_id(11),
        Some(&SlotKey::Group(tree.children(tree.root())[1]))
    );
}

#[derive(Default)]
struct FlatHost {
    live: BTreeMap<usize, SlotKey<Row>>,
}

impl ContainerMaterializer<SlotKey<Row>> for FlatHost {
    fn materialize(&mut self, slot: Slot<'_, SlotKey<Row>>) {
        self.live.insert(slot.index, slot.id.clone());
    }

    fn measure(
        &mut self,
        _slot: Slot<'_, SlotKey<Row>>,
        _scope: &mut SizeEstimator<SlotKey<Row>>,
    ) -> Extent {
        Extent::new(50.0, 10.0)
    }

    fn dematerialize(&mut self, index: usize, count: usize) -> usize {
        (index..index + count)
            .filter(|i| self.live.remove(i).is_some())
            .count()
    }
}

// --- examples ---

#[test]
fn example_flat_window_smoke() {
    let ids: Vec<u32> = (0..10_000).collect();
    let mut est = SizeEstimator::new();
    let mut wm = WindowManager::new(WindowOptions::new());
    let mut host = Host::new(|id| 16.0 + (id % 3) as f64 * 8.0);

    let viewport = Viewport::new(0.0, 480.0);
    wm.run_pass(viewport, &ids, &mut est, &mut host);
    let target = wm.scroll_into_view_offset(&ids, &est, 5_000, Align::Start, viewport);
    let w = wm.run_pass(Viewport::new(target, 480.0), &ids, &mut est, &mut host);

    assert!(w.visible.contains(5_000));
    assert!(host.live.len() < 200);
    assert_host_matches(&wm, &host, &ids);
}

#[test]
fn example_grouping_tree_smoke() {
    #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
    struct Song {
        title: &'static str,
        artist: Option<&'static str>,
    }

    let mut tree: GroupingTree<Song, &'static str> = GroupingTree::new(
        TreeOptions::new(vec![GroupDescriptor::new(|s: &Song| s.artist, "Unknown artist")])
            .with_record_changes(true),
    );
    tree.add_range(vec![
        Song {
            title: "One",
            artist: Some("Ada"),
        },
        Song {
            title: "Two",
            artist: None,
        },
        Song {
            title: "Three",
            artist: Some("Ada"),
        },
    ]);
    assert_eq!(tree.len(), 5);
    let labels: Vec<String> = tree
        .children(tree.root())
        .iter()
        .filter_map(|g| tree.label(*g))
        .collect();
    assert_eq!(labels, vec!["Ada".to_string(), "Unknown artist".to_string()]);
    assert_eq!(tree.take_changes().len(), 2);
}

#[test]
fn example_measurement_cache_smoke() {
    let ids: Vec<u32> = (0..10).collect();
    let mut a = SizeEstimator::new();
    a.add_or_update_size(2, Extent::new(0.0, 10.0));
    a.add_or_update_size(5, Extent::new(0.0, 42.0));
    let snapshot = a.export_sizes();

    let mut b: SizeEstimator<u32> = SizeEstimator::new();
    assert_eq!(b.size_of(&2), None);
    b.import_sizes(snapshot);
    assert_eq!(b.len(), 2);
    assert_eq!(
        b.offset_for_index(&ids, Axis::Vertical, 10),
        a.offset_for_index(&ids, Axis::Vertical, 10)
    );
}
