//! 相似度兜底匹配
//!
//! 仅在激进模式下、对精确匹配未确认但基本形式出现在译文中的词条逐个调用。
//! 候选来自分词结果的单个词和相邻词拼接（二元组），用于容忍分词边界误差。

use std::collections::HashSet;
use std::sync::OnceLock;

use jieba_rs::Jieba;

use crate::annotation::config::constants;
use crate::annotation::matching::CandidateSpan;
use crate::annotation::text::{is_source_script, normalize, SentencePair};
use crate::annotation::vocabulary::VocabularyEntry;

fn jieba() -> &'static Jieba {
    static JIEBA: OnceLock<Jieba> = OnceLock::new();
    JIEBA.get_or_init(Jieba::new)
}

/// 去掉虚字后的字符序列
fn clean(text: &str) -> Vec<char> {
    text.chars()
        .filter(|c| !c.is_whitespace() && !constants::STOP_CHARS.contains(c))
        .collect()
}

/// 字符集合上的 Dice 系数变体
///
/// 去虚字后任一侧只剩单字时，相同为 1.0，否则为 0。
pub fn similarity_score(a: &str, b: &str) -> f64 {
    let a = clean(a);
    let b = clean(b);
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }
    if a.len() == 1 || b.len() == 1 {
        return 0.0;
    }

    let set_a: HashSet<char> = a.iter().copied().collect();
    let set_b: HashSet<char> = b.iter().copied().collect();
    let shared = set_a.intersection(&set_b).count();
    2.0 * shared as f64 / (a.len() + b.len()) as f64
}

/// 分词候选
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub text: String,
    /// 句内字符偏移
    pub start: usize,
}

impl Candidate {
    fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// 从句子中生成全部汉字候选：单个词与相邻词拼接
pub fn sentence_candidates(sentence: &str) -> Vec<Candidate> {
    let mut words = Vec::new();
    let mut offset = 0;
    for word in jieba().cut(sentence, false) {
        let length = word.chars().count();
        words.push(Candidate {
            text: word.to_string(),
            start: offset,
        });
        offset += length;
    }

    let is_han = |word: &Candidate| !word.text.is_empty() && word.text.chars().all(is_source_script);

    let mut candidates: Vec<Candidate> = words.iter().filter(|w| is_han(w)).cloned().collect();
    for pair in words.windows(2) {
        if is_han(&pair[0]) && is_han(&pair[1]) {
            candidates.push(Candidate {
                text: format!("{}{}", pair[0].text, pair[1].text),
                start: pair[0].start,
            });
        }
    }
    candidates
}

/// 相似度匹配器
#[derive(Debug, Clone, Copy)]
pub struct SimilarityMatcher {
    threshold: f64,
}

impl Default for SimilarityMatcher {
    fn default() -> Self {
        Self::new(constants::SIMILARITY_THRESHOLD)
    }
}

impl SimilarityMatcher {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// 词条是否需要走兜底匹配：基本形式作为子串出现在归一化译文中
    pub fn applies_to(normalized_translation: &str, entry: &VocabularyEntry) -> bool {
        let base = entry.base_form();
        !base.is_empty() && normalized_translation.contains(&normalize(&base))
    }

    /// 在达到阈值的候选中取最高分
    ///
    /// 分数相同时取较长的候选，长度也相同时取靠前的候选。
    /// 分数始终优先于长度，不会为了更长的候选放弃更高的分数。
    pub fn select(&self, candidates: Vec<Candidate>, definitions: &[String]) -> Option<(f64, Candidate)> {
        let mut best: Option<(f64, Candidate)> = None;
        for candidate in candidates {
            let score = definitions
                .iter()
                .map(|definition| similarity_score(&candidate.text, definition))
                .fold(0.0_f64, f64::max);
            if score < self.threshold {
                continue;
            }

            let better = match &best {
                None => true,
                Some((best_score, current)) => {
                    score > *best_score
                        || (score == *best_score
                            && (candidate.char_len() > current.char_len()
                                || (candidate.char_len() == current.char_len()
                                    && candidate.start < current.start)))
                }
            };
            if better {
                best = Some((score, candidate));
            }
        }
        best
    }

    /// 为一个句对和一个词条选出最佳候选
    ///
    /// `definitions` 是词条释义与词典卡片释义的合并结果。
    pub fn best_match(
        &self,
        pair: &SentencePair,
        entry: &VocabularyEntry,
        definitions: &[String],
    ) -> Option<CandidateSpan> {
        let normalized = normalize(&pair.translated);
        if !Self::applies_to(&normalized, entry) || definitions.is_empty() {
            return None;
        }

        let (score, candidate) = self.select(sentence_candidates(&pair.source), definitions)?;
        tracing::trace!(
            "相似度匹配 {} -> {} ({:.2})",
            entry.text,
            candidate.text,
            score
        );

        let form = entry
            .surface_forms()
            .into_iter()
            .find(|form| normalized.contains(form.as_str()))
            .unwrap_or_else(|| entry.base_form());
        let start = pair.offset + candidate.start;
        Some(CandidateSpan::new(start, start + candidate.char_len(), entry, &form))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_strings_score_one() {
        assert_eq!(similarity_score("预订", "预订"), 1.0);
        assert_eq!(similarity_score("哈哈哈", "哈哈哈"), 1.0);
        assert_eq!(similarity_score("的预订", "预订了"), 1.0);
    }

    #[test]
    fn test_disjoint_strings_score_zero() {
        assert_eq!(similarity_score("机票", "阅读"), 0.0);
        assert_eq!(similarity_score("书", "书籍"), 0.0);
        assert_eq!(similarity_score("的", "了"), 0.0);
    }

    #[test]
    fn test_partial_overlap_is_dice() {
        // {预, 订} ∩ {预, 约} = 1，长度和为 4
        assert_eq!(similarity_score("预订", "预约"), 0.5);
        let score = similarity_score("预订机票", "订机票");
        assert!((score - 6.0 / 7.0).abs() < 1e-9);
    }

    #[test]
    fn test_candidates_cover_words_and_bigrams() {
        let candidates = sentence_candidates("我喜欢阅读");
        let texts: Vec<&str> = candidates.iter().map(|c| c.text.as_str()).collect();
        assert!(texts.contains(&"阅读"));
        for candidate in &candidates {
            let chars: Vec<char> = "我喜欢阅读".chars().collect();
            let slice: String = chars[candidate.start..candidate.start + candidate.char_len()]
                .iter()
                .collect();
            assert_eq!(slice, candidate.text);
        }
    }

    fn candidate(text: &str, start: usize) -> Candidate {
        Candidate {
            text: text.to_string(),
            start,
        }
    }

    #[test]
    fn test_select_prefers_longer_candidate_on_equal_score() {
        let matcher = SimilarityMatcher::new(0.65);
        let definitions = vec!["预订".to_string()];

        // “预订了” 去掉虚字后与释义相同，和 “预订” 同为 1.0 分
        let (score, best) = matcher
            .select(
                vec![candidate("我预订", 0), candidate("预订", 1), candidate("预订了", 1)],
                &definitions,
            )
            .unwrap();
        assert_eq!(score, 1.0);
        assert_eq!(best, candidate("预订了", 1));

        // 同分同长取靠前的
        let (_, best) = matcher
            .select(vec![candidate("预订", 6), candidate("预订", 2)], &definitions)
            .unwrap();
        assert_eq!(best.start, 2);
    }

    #[test]
    fn test_select_ranks_score_above_length() {
        let matcher = SimilarityMatcher::new(0.65);
        let definitions = vec!["预订座位".to_string()];

        // “预订座位了” 得分 1.0，“预订” 得分 4/6，“预订机票” 低于阈值
        let (score, best) = matcher
            .select(
                vec![candidate("预订", 3), candidate("预订机票", 3), candidate("预订座位了", 3)],
                &definitions,
            )
            .unwrap();
        assert_eq!(score, 1.0);
        assert_eq!(best.text, "预订座位了");

        let (score, best) = matcher
            .select(vec![candidate("预订机票", 3), candidate("预订", 3)], &definitions)
            .unwrap();
        assert!((score - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(best.text, "预订");

        // 更长的 “预订座位机票” 得 0.8，较短的 “预订座” 得 6/7，取分数高的
        let (_, best) = matcher
            .select(vec![candidate("预订座位机票", 0), candidate("预订座", 0)], &definitions)
            .unwrap();
        assert_eq!(best.text, "预订座");

        assert!(matcher.select(vec![candidate("机票", 0)], &definitions).is_none());
    }

    #[test]
    fn test_best_match_respects_gate_and_threshold() {
        let entry = VocabularyEntry::new("1", "read", "读书");
        let pair = SentencePair {
            source: "我喜欢阅读".to_string(),
            translated: "I like reading".to_string(),
            offset: 4,
        };
        let matcher = SimilarityMatcher::new(0.65);

        // “阅读” 与 “读书” 只共享一个字，得分 0.5
        assert!(matcher.best_match(&pair, &entry, &entry.definitions()).is_none());

        let pooled = vec!["读书".to_string(), "阅读".to_string()];
        let span = matcher.best_match(&pair, &entry, &pooled).unwrap();
        assert_eq!((span.start, span.end), (7, 9));
        assert_eq!(span.matched_surface_form, "read");

        let unrelated = SentencePair {
            translated: "I like music".to_string(),
            ..pair
        };
        assert!(matcher.best_match(&unrelated, &entry, &pooled).is_none());
    }
}
