use super::{ChunkMatches, MatchedLine};

/// Collects per-range results as they arrive and merges them in file order.
///
/// Fragments can be pushed in any order (workers finish whenever they
/// finish); [`Aggregator::finish`] sorts them by range start before
/// concatenating. Within a fragment lines are already in file order.
#[derive(Debug, Default)]
pub struct Aggregator {
    fragments: Vec<ChunkMatches>,
    matches: usize,
}

/// Merged output of a run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Merged {
    pub lines: Vec<MatchedLine>,
    pub lines_scanned: u64,
    pub malformed: u64,
}

impl Aggregator {
    /// Start from the hot region's matches, if there is a hot region.
    pub fn new(hot: Option<ChunkMatches>) -> Self {
        let mut aggregator = Self::default();
        if let Some(hot) = hot {
            aggregator.push(hot);
        }
        aggregator
    }

    pub fn push(&mut self, fragment: ChunkMatches) {
        self.matches += fragment.lines.len();
        self.fragments.push(fragment);
    }

    pub fn match_count(&self) -> usize {
        self.matches
    }

    pub fn fragment_count(&self) -> usize {
        self.fragments.len()
    }

    pub fn finish(mut self) -> Merged {
        self.fragments.sort_by_key(|fragment| fragment.start);

        let mut merged = Merged {
            lines: Vec::with_capacity(self.matches),
            ..Merged::default()
        };
        for fragment in self.fragments {
            merged.lines_scanned += fragment.lines_scanned;
            merged.malformed += fragment.malformed;
            merged.lines.extend(fragment.lines);
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fragment(start: u64, offsets: &[u64]) -> ChunkMatches {
        ChunkMatches {
            start,
            lines: offsets
                .iter()
                .map(|&o| MatchedLine::new(o, format!("line at {}", o).as_bytes()))
                .collect(),
            lines_scanned: offsets.len() as u64 + 1,
            malformed: 1,
        }
    }

    #[test]
    fn test_out_of_order_fragments_are_sorted() {
        let mut agg = Aggregator::default();
        agg.push(fragment(200, &[210, 250]));
        agg.push(fragment(0, &[5]));
        agg.push(fragment(100, &[]));
        agg.push(fragment(50, &[60, 70, 80]));

        assert_eq!(agg.match_count(), 6);
        assert_eq!(agg.fragment_count(), 4);

        let merged = agg.finish();
        let offsets: Vec<u64> = merged.lines.iter().map(|m| m.offset).collect();
        assert_eq!(offsets, vec![5, 60, 70, 80, 210, 250]);
        assert_eq!(merged.malformed, 4);
        assert_eq!(merged.lines_scanned, 10);
    }

    #[test]
    fn test_hot_fragment_merged_with_chunks() {
        let mut agg = Aggregator::new(Some(fragment(100, &[120, 130])));
        agg.push(fragment(300, &[301]));
        agg.push(fragment(0, &[1]));

        let texts: Vec<String> = agg
            .finish()
            .lines
            .iter()
            .map(|m| m.text().into_owned())
            .collect();
        assert_eq!(
            texts,
            vec![
                "line at 1",
                "line at 120",
                "line at 130",
                "line at 301",
            ]
        );
    }

    #[test]
    fn test_empty_aggregator() {
        let merged = Aggregator::default().finish();
        assert_eq!(merged, Merged::default());
    }
}
