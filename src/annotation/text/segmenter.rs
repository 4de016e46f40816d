//! 分句器
//!
//! 在全角和半角句末标点处切分，标点留在前一句末尾。纯函数，可以对原文
//! 和译文分别独立调用。

use std::sync::OnceLock;

use regex::Regex;

use super::char_offset;
use crate::annotation::config::constants;

/// 一个句子及其在所属文本中的起始字符偏移
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentence {
    pub text: String,
    pub start: usize,
}

impl Sentence {
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

fn sentence_regex() -> &'static Regex {
    static SENTENCE_REGEX: OnceLock<Regex> = OnceLock::new();
    SENTENCE_REGEX.get_or_init(|| {
        let terminators: String = constants::SENTENCE_TERMINATORS
            .iter()
            .map(|c| regex::escape(&c.to_string()))
            .collect();
        let pattern = format!("[^{t}]*[{t}]+|[^{t}]+$", t = terminators);
        // 模式由常量拼出，编译失败属于编程错误
        Regex::new(&pattern).unwrap_or_else(|e| panic!("分句正则无效: {e}"))
    })
}

/// 分句，去掉空白句
pub fn segment(text: &str) -> Vec<String> {
    segment_with_offsets(text)
        .into_iter()
        .map(|sentence| sentence.text)
        .collect()
}

/// 分句并保留每句的起始字符偏移
pub fn segment_with_offsets(text: &str) -> Vec<Sentence> {
    let mut sentences = Vec::new();
    let mut last_byte = 0;
    let mut last_char = 0;

    for m in sentence_regex().find_iter(text) {
        if m.as_str().trim().is_empty() {
            continue;
        }
        let start = last_char + char_offset(&text[last_byte..], m.start() - last_byte);
        last_byte = m.start();
        last_char = start;
        sentences.push(Sentence {
            text: m.as_str().to_string(),
            start,
        });
    }

    sentences
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_keeps_terminators_attached() {
        assert_eq!(
            segment("我需要预订机票。你呢？好的!"),
            vec!["我需要预订机票。", "你呢？", "好的!"]
        );
    }

    #[test]
    fn test_trailing_text_without_terminator() {
        assert_eq!(segment("第一句。第二句"), vec!["第一句。", "第二句"]);
        assert_eq!(segment("没有标点"), vec!["没有标点"]);
    }

    #[test]
    fn test_drops_whitespace_only_segments() {
        assert!(segment("").is_empty());
        assert!(segment("   ").is_empty());
        assert_eq!(segment("好。  "), vec!["好。"]);
    }

    #[test]
    fn test_repeated_terminators_stay_together() {
        assert_eq!(segment("真的吗？！是的..."), vec!["真的吗？！", "是的..."]);
    }

    #[test]
    fn test_offsets_are_char_based() {
        let sentences = segment_with_offsets("我喜欢阅读。I need to book a flight.");
        assert_eq!(sentences.len(), 2);
        assert_eq!(sentences[0].start, 0);
        assert_eq!(sentences[1].start, 6);
        assert_eq!(sentences[1].text, "I need to book a flight.");
    }

    proptest! {
        #[test]
        fn prop_segments_rejoin_to_input(
            text in proptest::collection::vec(
                prop::sample::select(vec!['你', '好', '书', 'a', 'b', '。', '？', '！', '.', '?', '!']),
                0..60,
            ).prop_map(|chars| chars.into_iter().collect::<String>())
        ) {
            let sentences = segment_with_offsets(&text);
            let rejoined: String = sentences.iter().map(|s| s.text.as_str()).collect();
            prop_assert_eq!(&rejoined, &text);

            let chars: Vec<char> = text.chars().collect();
            for sentence in &sentences {
                let slice: String = chars[sentence.start..sentence.start + sentence.char_len()]
                    .iter()
                    .collect();
                prop_assert_eq!(slice, sentence.text.clone());
            }
        }
    }
}
