//! 句子对齐
//!
//! 把批量请求返回的译文按分隔符拆回句子，与原文句子按位置配对。

use super::segmenter::{segment, Sentence};

/// 原文句子与对齐的译文句子
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentencePair {
    pub source: String,
    pub translated: String,
    /// 原文句子在所属段落中的起始字符偏移
    pub offset: usize,
}

/// 构造批量翻译请求文本：每句内部出现的分隔符先替换为空格
pub fn join_for_request(sentences: &[Sentence], separator: &str) -> String {
    sentences
        .iter()
        .map(|sentence| sentence.text.replace(separator, " ").trim().to_string())
        .collect::<Vec<_>>()
        .join(separator)
}

/// 对齐原文句子与译文
///
/// 拆分后的句数不一致时先对整段译文重新分句；仍不一致则按位置配对，
/// 缺少译文的句子配空串，多出的译文丢弃。
pub fn align_sentences(sources: &[Sentence], translated: &str, separator: &str) -> Vec<SentencePair> {
    let mut parts: Vec<String> = translated
        .split(separator)
        .map(|part| part.trim().to_string())
        .collect();

    if parts.len() != sources.len() {
        let resegmented: Vec<String> = segment(&parts.join(" "))
            .into_iter()
            .map(|s| s.trim().to_string())
            .collect();
        tracing::debug!(
            "译文句数不一致: 原文 {} 句，译文 {} 段，重新分句得到 {} 句",
            sources.len(),
            parts.len(),
            resegmented.len()
        );
        if resegmented.len() == sources.len() {
            parts = resegmented;
        }
    }

    sources
        .iter()
        .enumerate()
        .map(|(index, sentence)| SentencePair {
            source: sentence.text.clone(),
            translated: parts.get(index).cloned().unwrap_or_default(),
            offset: sentence.start,
        })
        .collect()
}
