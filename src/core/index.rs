use super::Interval;
use std::collections::HashMap;

/// Per-chromosome sorted interval lookup.
///
/// Entries are kept sorted by `(start, end)`; ties keep insertion order so
/// lookups report overlaps in the order they were read from disk. The longest
/// entry per chromosome bounds how far left a query has to look.
#[derive(Debug)]
pub struct IntervalIndex<T> {
    buckets: HashMap<String, Bucket<T>>,
    len: usize,
}

#[derive(Debug)]
struct Bucket<T> {
    entries: Vec<(u64, u64, T)>,
    max_len: u64,
}

impl<T> IntervalIndex<T> {
    pub fn new<I>(items: I) -> Self
    where
        I: IntoIterator<Item = (Interval, T)>,
    {
        let mut buckets: HashMap<String, Bucket<T>> = HashMap::new();
        let mut len = 0;
        for (interval, value) in items {
            let bucket = buckets.entry(interval.chrom).or_insert_with(|| Bucket {
                entries: Vec::new(),
                max_len: 0,
            });
            bucket.max_len = bucket.max_len.max(interval.end - interval.start);
            bucket.entries.push((interval.start, interval.end, value));
            len += 1;
        }

        for bucket in buckets.values_mut() {
            bucket.entries.sort_by_key(|(start, end, _)| (*start, *end));
        }

        Self { buckets, len }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Values whose intervals overlap `[start, end)` on `chrom`.
    pub fn overlapping<'a>(
        &'a self,
        chrom: &str,
        start: u64,
        end: u64,
    ) -> impl Iterator<Item = &'a T> + 'a {
        let bucket = self.buckets.get(chrom);
        bucket.into_iter().flat_map(move |bucket| {
            let lower = start.saturating_sub(bucket.max_len);
            let first = bucket.entries.partition_point(|(s, _, _)| *s < lower);
            bucket.entries[first..]
                .iter()
                .take_while(move |(s, _, _)| *s < end)
                .filter(move |(_, e, _)| *e > start)
                .map(|(_, _, value)| value)
        })
    }

    pub fn overlaps_any(&self, chrom: &str, start: u64, end: u64) -> bool {
        self.overlapping(chrom, start, end).next().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iv(chrom: &str, start: u64, end: u64) -> Interval {
        Interval::new(chrom, start, end).unwrap()
    }

    #[test]
    fn finds_overlaps_including_long_entries_to_the_left() {
        let index = IntervalIndex::new(vec![
            (iv("chr1", 0, 1000), "long"),
            (iv("chr1", 500, 510), "short"),
            (iv("chr1", 900, 950), "late"),
            (iv("chr2", 0, 10), "other"),
        ]);

        let hits: Vec<_> = index.overlapping("chr1", 920, 930).copied().collect();
        assert_eq!(hits, vec!["long", "late"]);

        let hits: Vec<_> = index.overlapping("chr1", 510, 520).copied().collect();
        assert_eq!(hits, vec!["long"]);

        assert!(!index.overlaps_any("chr3", 0, 10));
        assert_eq!(index.len(), 4);
    }

    #[test]
    fn ties_keep_insertion_order() {
        let index = IntervalIndex::new(vec![
            (iv("chr1", 10, 20), 2),
            (iv("chr1", 10, 20), 1),
            (iv("chr1", 5, 20), 0),
        ]);
        let hits: Vec<_> = index.overlapping("chr1", 0, 100).copied().collect();
        assert_eq!(hits, vec![0, 2, 1]);
    }

    #[test]
    fn half_open_boundaries() {
        let index = IntervalIndex::new(vec![(iv("chr1", 10, 20), ())]);
        assert!(!index.overlaps_any("chr1", 20, 30));
        assert!(!index.overlaps_any("chr1", 0, 10));
        assert!(index.overlaps_any("chr1", 19, 20));
    }
}
