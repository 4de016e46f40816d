//! 段落过滤器模块
//!
//! 判断元素是否应被扫描、段落文本是否值得标注。

use markup5ever_rcdom::Handle;

use crate::annotation::config::constants;
use crate::annotation::text::has_source_script;
use crate::html::{get_node_attr, get_node_name};

/// 段落被拒绝的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// 少于最小字符数
    TooShort,
    /// 不含源语言文字
    NoSourceScript,
    /// 短且分隔符密集，像导航条
    NavigationStrip,
}

/// 段落文本过滤器
#[derive(Debug, Clone)]
pub struct BlockFilter {
    min_chars: usize,
    nav_max_chars: usize,
    nav_separator_ratio: f32,
}

impl Default for BlockFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockFilter {
    pub fn new() -> Self {
        Self {
            min_chars: constants::MIN_BLOCK_CHARS,
            nav_max_chars: constants::NAV_STRIP_MAX_CHARS,
            nav_separator_ratio: constants::NAV_STRIP_SEPARATOR_RATIO,
        }
    }

    /// 检查段落文本
    pub fn check(&self, text: &str) -> Result<(), Rejection> {
        let trimmed = text.trim();

        if trimmed.chars().count() < self.min_chars {
            return Err(Rejection::TooShort);
        }

        if !has_source_script(trimmed) {
            return Err(Rejection::NoSourceScript);
        }

        if self.is_navigation_strip(trimmed) {
            return Err(Rejection::NavigationStrip);
        }

        Ok(())
    }

    pub fn accepts(&self, text: &str) -> bool {
        self.check(text).is_ok()
    }

    /// 短文本且分隔符占比过高；逗号句号等句读不算分隔符
    fn is_navigation_strip(&self, text: &str) -> bool {
        let visible: Vec<char> = text.chars().filter(|c| !c.is_whitespace()).collect();
        if visible.is_empty() || visible.len() > self.nav_max_chars {
            return false;
        }
        let separators = visible
            .iter()
            .filter(|c| constants::NAV_SEPARATORS.contains(*c))
            .count();
        separators as f32 / visible.len() as f32 >= self.nav_separator_ratio
    }
}

/// 直接拒绝的元素（脚本、样式、媒体、交互控件等）
pub fn is_skipped_element(node: &Handle) -> bool {
    get_node_name(node)
        .map(|name| constants::SKIP_ELEMENTS.contains(&name))
        .unwrap_or(false)
}

/// 管道自己插入的标注单元
pub fn is_annotation_unit(node: &Handle) -> bool {
    get_node_attr(node, constants::UNIT_MARKER_ATTR).is_some()
}

/// 可承载正文的块级元素
pub fn is_block_element(node: &Handle) -> bool {
    get_node_name(node)
        .map(|name| constants::BLOCK_ELEMENTS.contains(&name))
        .unwrap_or(false)
}

/// 正文模式下排除的区域：结构标签或 role/id/class 命中关键词
pub fn is_noise_region(node: &Handle) -> bool {
    if get_node_name(node)
        .map(|name| constants::NOISE_ELEMENTS.contains(&name))
        .unwrap_or(false)
    {
        return true;
    }

    ["role", "id", "class"].iter().any(|attr| {
        get_node_attr(node, attr)
            .map(|value| contains_noise_keyword(&value))
            .unwrap_or(false)
    })
}

/// 按非字母数字切词，任一词以关键词开头即命中（`navbar` 命中，`unavailable` 不命中）
fn contains_noise_keyword(value: &str) -> bool {
    value
        .to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|token| !token.is_empty())
        .any(|token| {
            constants::NOISE_KEYWORDS
                .iter()
                .any(|keyword| token.starts_with(keyword))
        })
}

/// 简单选择器匹配：`tag`、`#id`、`.class`、`[attr=value]`
pub fn matches_selector(node: &Handle, selector: &str) -> bool {
    if let Some(id) = selector.strip_prefix('#') {
        return get_node_attr(node, "id").as_deref() == Some(id);
    }

    if let Some(class) = selector.strip_prefix('.') {
        return get_node_attr(node, "class")
            .map(|value| value.split_whitespace().any(|c| c == class))
            .unwrap_or(false);
    }

    if let Some(inner) = selector.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
        return match inner.split_once('=') {
            Some((attr, value)) => {
                get_node_attr(node, attr).as_deref() == Some(value.trim_matches('"'))
            }
            None => get_node_attr(node, inner).is_some(),
        };
    }

    get_node_name(node) == Some(selector)
}
