//! 词形门槛 + 释义精确匹配

use crate::annotation::matching::CandidateSpan;
use crate::annotation::text::{char_offset, contains_token, has_source_script, normalize, SentencePair};
use crate::annotation::vocabulary::VocabularyEntry;

/// 精确匹配器
#[derive(Debug, Default, Clone, Copy)]
pub struct LexicalMatcher;

impl LexicalMatcher {
    pub fn new() -> Self {
        Self
    }

    /// 在一个句对中查找全部词条的候选片段
    pub fn find_candidates(&self, pair: &SentencePair, entries: &[VocabularyEntry]) -> Vec<CandidateSpan> {
        let normalized = normalize(&pair.translated);
        entries
            .iter()
            .flat_map(|entry| self.match_entry(pair, &normalized, entry))
            .collect()
    }

    /// 单个词条：先在译文中找最长的词形，再在原文中找释义的每一次出现
    pub fn match_entry(
        &self,
        pair: &SentencePair,
        normalized_translation: &str,
        entry: &VocabularyEntry,
    ) -> Vec<CandidateSpan> {
        let form = if normalized_translation.is_empty() {
            // 没有译文信号时跳过词形门槛
            entry.base_form()
        } else {
            match Self::gate_form(normalized_translation, entry) {
                Some(form) => form,
                None => return Vec::new(),
            }
        };
        if form.is_empty() {
            return Vec::new();
        }

        let mut spans = Vec::new();
        for definition in entry.definitions() {
            if !has_source_script(&definition) {
                continue;
            }
            let length = definition.chars().count();
            for (byte_index, _) in pair.source.match_indices(definition.as_str()) {
                let start = pair.offset + char_offset(&pair.source, byte_index);
                spans.push(CandidateSpan::new(start, start + length, entry, &form));
            }
        }
        spans
    }

    /// 译文中以词为单位出现的最长词形
    pub fn gate_form(normalized_translation: &str, entry: &VocabularyEntry) -> Option<String> {
        entry
            .surface_forms()
            .into_iter()
            .find(|form| contains_token(normalized_translation, form))
    }
}
