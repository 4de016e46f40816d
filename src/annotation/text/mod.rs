//! 文本处理模块 - 分句、归一化与句子对齐

pub mod alignment;
pub mod normalizer;
pub mod segmenter;

pub use alignment::{align_sentences, SentencePair};
pub use normalizer::{contains_token, is_punctuation, normalize};
pub use segmenter::{segment, segment_with_offsets, Sentence};

/// 判断字符是否属于源语言文字（汉字）
pub fn is_source_script(c: char) -> bool {
    matches!(c,
        '\u{4E00}'..='\u{9FFF}'
        | '\u{3400}'..='\u{4DBF}'
        | '\u{F900}'..='\u{FAFF}'
        | '\u{20000}'..='\u{2A6DF}'
    )
}

/// 文本中是否含有源语言文字
pub fn has_source_script(text: &str) -> bool {
    text.chars().any(is_source_script)
}

/// 字节偏移转换为字符偏移
pub(crate) fn char_offset(text: &str, byte_index: usize) -> usize {
    text[..byte_index].chars().count()
}
