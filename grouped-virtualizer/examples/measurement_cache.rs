// Example: export and import measured sizes.
use grouped_virtualizer::{Axis, Extent, SizeEstimator};

fn main() {
    // Persisting sizes across screens lets a fresh list start with better estimates.
    let ids: Vec<u32> = (0..10).collect();
    let mut s1 = SizeEstimator::new();
    s1.add_or_update_size(2, Extent::new(100.0, 10.0));
    s1.add_or_update_size(5, Extent::new(100.0, 42.0));

    let snapshot = s1.export_sizes();
    println!("exported_len={}", snapshot.len());

    let mut s2: SizeEstimator<u32> = SizeEstimator::new();
    println!("before import: size2={:?} size5={:?}", s2.size_of(&2), s2.size_of(&5));

    s2.import_sizes(snapshot);
    println!(
        "after import: len={} size5={:?} extent={}",
        s2.len(),
        s2.size_of(&5),
        s2.sequence_extent(&ids, Axis::Vertical)
    );
}
