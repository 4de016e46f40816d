//! 匹配模块
//!
//! - **lexical**: 释义精确子串匹配，以译文中出现的词形作为门槛
//! - **similarity**: 激进模式下的字符重叠相似度兜底匹配
//! - **resolver**: 合并两类候选并选出互不重叠的片段

pub mod lexical;
pub mod resolver;
pub mod similarity;

pub use lexical::LexicalMatcher;
pub use resolver::resolve_spans;
pub use similarity::{similarity_score, SimilarityMatcher};

use crate::annotation::vocabulary::VocabularyEntry;

/// 候选片段，偏移为段落内字符偏移，区间左闭右开
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateSpan {
    pub start: usize,
    pub end: usize,
    pub entry: VocabularyEntry,
    /// 命中的词形（小写），必为词条的基本形式或声明的变化形式
    pub matched_surface_form: String,
}

impl CandidateSpan {
    pub fn new(start: usize, end: usize, entry: &VocabularyEntry, form: &str) -> Self {
        debug_assert!(end > start);
        Self {
            start,
            end,
            entry: entry.clone(),
            matched_surface_form: form.to_string(),
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// 左闭右开区间是否重叠
    pub fn overlaps(&self, other: &CandidateSpan) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// 经过消解后保留的片段，同一段落内两两不重叠
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSpan(pub CandidateSpan);

impl std::ops::Deref for ResolvedSpan {
    type Target = CandidateSpan;

    fn deref(&self) -> &CandidateSpan {
        &self.0
    }
}
