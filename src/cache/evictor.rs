//! Eviction policies: decide which resident entries to shed when the
//! resident cap is exceeded.
//!
//! A policy only ever sees committed entries. In-flight keys are not
//! resident and therefore can never be selected.

use crate::Key;

/// Metadata view of a resident entry, as handed to policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryMeta {
    pub key: Key,
    /// Commit order stamp; smaller means older.
    pub insertion_sequence: u64,
    /// Provider-reported payload weight (e.g. detections per frame).
    pub weight: usize,
}

/// Strategy choosing eviction victims.
pub trait EvictionPolicy: Send + Sync + 'static {
    /// Policy name for logs and diagnostics.
    fn name(&self) -> &'static str;

    /// Select up to `count` victims from `entries`, most evictable first.
    fn select_victims(&self, entries: &[EntryMeta], count: usize) -> Vec<Key>;
}

fn take_sorted_by<F>(entries: &[EntryMeta], count: usize, compare: F) -> Vec<Key>
where
    F: FnMut(&EntryMeta, &EntryMeta) -> std::cmp::Ordering,
{
    let mut ordered: Vec<EntryMeta> = entries.to_vec();
    ordered.sort_by(compare);
    ordered.into_iter().take(count).map(|e| e.key).collect()
}

/// Default policy: evict the entry with the smallest insertion sequence.
#[derive(Debug, Default, Clone, Copy)]
pub struct OldestFirst;

impl EvictionPolicy for OldestFirst {
    fn name(&self) -> &'static str {
        "oldest-first"
    }

    fn select_victims(&self, entries: &[EntryMeta], count: usize) -> Vec<Key> {
        take_sorted_by(entries, count, |a, b| {
            a.insertion_sequence.cmp(&b.insertion_sequence)
        })
    }
}

/// Evict the heaviest entries first; frees the most memory per eviction.
#[derive(Debug, Default, Clone, Copy)]
pub struct LargestFirst;

impl EvictionPolicy for LargestFirst {
    fn name(&self) -> &'static str {
        "largest-first"
    }

    fn select_victims(&self, entries: &[EntryMeta], count: usize) -> Vec<Key> {
        take_sorted_by(entries, count, |a, b| {
            b.weight
                .cmp(&a.weight)
                .then_with(|| a.insertion_sequence.cmp(&b.insertion_sequence))
        })
    }
}

/// Evict the lightest entries first; keeps expensive loads resident.
#[derive(Debug, Default, Clone, Copy)]
pub struct SmallestFirst;

impl EvictionPolicy for SmallestFirst {
    fn name(&self) -> &'static str {
        "smallest-first"
    }

    fn select_victims(&self, entries: &[EntryMeta], count: usize) -> Vec<Key> {
        take_sorted_by(entries, count, |a, b| {
            a.weight
                .cmp(&b.weight)
                .then_with(|| a.insertion_sequence.cmp(&b.insertion_sequence))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(key: Key, sequence: u64, weight: usize) -> EntryMeta {
        EntryMeta {
            key,
            insertion_sequence: sequence,
            weight,
        }
    }

    #[test]
    fn test_oldest_first_picks_smallest_sequence() {
        let entries = vec![meta(10, 2, 1), meta(11, 0, 1), meta(12, 1, 1)];
        assert_eq!(OldestFirst.select_victims(&entries, 2), vec![11, 12]);
    }

    #[test]
    fn test_largest_first_prefers_heavy_entries() {
        let entries = vec![meta(1, 0, 4), meta(2, 1, 9), meta(3, 2, 9)];
        // Equal weights fall back to insertion order.
        assert_eq!(LargestFirst.select_victims(&entries, 2), vec![2, 3]);
    }

    #[test]
    fn test_smallest_first_prefers_light_entries() {
        let entries = vec![meta(1, 0, 4), meta(2, 1, 2), meta(3, 2, 9)];
        assert_eq!(SmallestFirst.select_victims(&entries, 1), vec![2]);
    }

    #[test]
    fn test_count_larger_than_population() {
        let entries = vec![meta(1, 0, 1)];
        assert_eq!(OldestFirst.select_victims(&entries, 5), vec![1]);
    }
}
