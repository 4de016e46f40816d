//! 片段消解
//!
//! 按长度降序、起点升序排序后贪心选取，保证同一段落内的结果两两不重叠。
//! 这是确定性的贪心区间调度，不追求最大覆盖。

use crate::annotation::matching::{CandidateSpan, ResolvedSpan};

/// 选出互不重叠的片段，结果按起点升序排列
pub fn resolve_spans(mut candidates: Vec<CandidateSpan>) -> Vec<ResolvedSpan> {
    candidates.retain(|span| !span.is_empty());
    candidates.sort_by(|a, b| {
        b.len()
            .cmp(&a.len())
            .then(a.start.cmp(&b.start))
            .then_with(|| a.entry.id.cmp(&b.entry.id))
    });

    let mut accepted: Vec<CandidateSpan> = Vec::new();
    for candidate in candidates {
        if accepted.iter().all(|span| !span.overlaps(&candidate)) {
            accepted.push(candidate);
        }
    }

    accepted.sort_by_key(|span| span.start);
    accepted.into_iter().map(ResolvedSpan).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::vocabulary::VocabularyEntry;
    use proptest::prelude::*;

    fn span(start: usize, end: usize, id: &str) -> CandidateSpan {
        CandidateSpan::new(start, end, &VocabularyEntry::new(id, "word", ""), "word")
    }

    #[test]
    fn test_longer_span_wins_overlap() {
        let resolved = resolve_spans(vec![span(2, 4, "short"), span(1, 5, "long")]);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].entry.id, "long");
        assert_eq!(resolved[0].len(), 4);
    }

    #[test]
    fn test_equal_length_prefers_earlier_start() {
        let resolved = resolve_spans(vec![span(3, 6, "later"), span(1, 4, "earlier")]);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].entry.id, "earlier");
    }

    #[test]
    fn test_adjacent_spans_do_not_overlap() {
        let resolved = resolve_spans(vec![span(0, 2, "a"), span(2, 4, "b"), span(4, 5, "c")]);
        assert_eq!(resolved.len(), 3);
        assert_eq!(resolved[0].start, 0);
        assert_eq!(resolved[2].start, 4);
    }

    #[test]
    fn test_discovery_order_does_not_matter() {
        let spans = vec![span(0, 3, "a"), span(2, 5, "b"), span(5, 7, "c"), span(6, 9, "d")];
        let mut reversed = spans.clone();
        reversed.reverse();
        assert_eq!(resolve_spans(spans), resolve_spans(reversed));
    }

    proptest! {
        #[test]
        fn prop_resolved_spans_never_overlap(
            raw in proptest::collection::vec((0usize..200, 1usize..12), 0..40)
        ) {
            let candidates: Vec<CandidateSpan> = raw
                .iter()
                .enumerate()
                .map(|(i, (start, len))| span(*start, start + len, &i.to_string()))
                .collect();
            let resolved = resolve_spans(candidates.clone());

            for (i, a) in resolved.iter().enumerate() {
                for b in resolved.iter().skip(i + 1) {
                    prop_assert!(a.end <= b.start || b.end <= a.start);
                }
            }

            // 每个被丢弃的候选都与某个保留片段重叠
            for candidate in &candidates {
                prop_assert!(resolved.iter().any(|kept| kept.overlaps(candidate)));
            }
        }
    }
}
