//! 译文归一化
//!
//! 只用于子串存在性检查，不用于显示。

/// 额外视为标点的全角及排版符号
const WIDE_PUNCTUATION: &[char] = &[
    '，', '。', '、', '；', '：', '？', '！', '“', '”', '‘', '’', '（', '）', '【', '】', '《',
    '》', '「', '」', '『', '』', '…', '—', '－', '～', '·', '・', '｜', '／', '«', '»', '¡', '¿',
];

/// 判断字符是否属于标点类
pub fn is_punctuation(c: char) -> bool {
    c.is_ascii_punctuation() || WIDE_PUNCTUATION.contains(&c)
}

/// 小写化，标点替换为空格，并压缩连续空白
pub fn normalize(text: &str) -> String {
    let replaced: String = text
        .chars()
        .map(|c| if is_punctuation(c) { ' ' } else { c })
        .collect::<String>()
        .to_lowercase();
    replaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 以词为单位检查 `form` 是否出现在已归一化的文本中（两侧补空格）
pub fn contains_token(normalized: &str, form: &str) -> bool {
    let form = normalize(form);
    if form.is_empty() {
        return false;
    }
    format!(" {} ", normalized).contains(&format!(" {} ", form))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_punctuation_and_case() {
        assert_eq!(normalize("I need to Book a flight."), "i need to book a flight");
        assert_eq!(normalize("“Booked!”  he said，then left"), "booked he said then left");
        assert_eq!(normalize("..."), "");
    }

    #[test]
    fn test_contains_token_respects_word_boundaries() {
        let normalized = normalize("The bookshelf was booked.");
        assert!(contains_token(&normalized, "booked"));
        assert!(!contains_token(&normalized, "book"));
        assert!(contains_token(&normalize("check-in is open"), "check-in"));
        assert!(!contains_token(&normalized, ""));
    }
}
