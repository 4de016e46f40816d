//! 标注样式配置
//!
//! 样式按学习分类查找，不随词条存储；原文的包裹与排布方式全局共享。

use serde::{Deserialize, Serialize};

use crate::annotation::vocabulary::Category;

/// 单个分类的视觉属性
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct StyleConfig {
    pub color: Option<String>,
    pub background: Option<String>,
    /// `text-decoration` 取值，如 `underline dotted`
    pub decoration: Option<String>,
    pub font_weight: Option<String>,
    pub font_style: Option<String>,
    pub font_size: Option<String>,
    /// 显示浓度，0.0 - 1.0
    pub opacity: Option<f32>,
}

impl StyleConfig {
    /// 生成内联 CSS
    pub fn to_css(&self) -> String {
        let mut rules = Vec::new();
        if let Some(color) = &self.color {
            rules.push(format!("color: {}", color));
        }
        if let Some(background) = &self.background {
            rules.push(format!("background-color: {}", background));
        }
        if let Some(decoration) = &self.decoration {
            rules.push(format!("text-decoration: {}", decoration));
        }
        if let Some(weight) = &self.font_weight {
            rules.push(format!("font-weight: {}", weight));
        }
        if let Some(style) = &self.font_style {
            rules.push(format!("font-style: {}", style));
        }
        if let Some(size) = &self.font_size {
            rules.push(format!("font-size: {}", size));
        }
        if let Some(opacity) = self.opacity {
            rules.push(format!("opacity: {}", opacity.clamp(0.0, 1.0)));
        }
        rules.join("; ")
    }
}

/// 三个学习分类的样式表
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct CategoryStyles {
    pub wanted: StyleConfig,
    pub in_progress: StyleConfig,
    pub known: StyleConfig,
}

impl CategoryStyles {
    pub fn get(&self, category: Category) -> &StyleConfig {
        match category {
            Category::Wanted => &self.wanted,
            Category::InProgress => &self.in_progress,
            Category::Known => &self.known,
        }
    }
}

impl Default for CategoryStyles {
    fn default() -> Self {
        Self {
            wanted: StyleConfig {
                color: Some("#d9480f".to_string()),
                decoration: Some("underline dotted".to_string()),
                font_weight: Some("600".to_string()),
                ..Default::default()
            },
            in_progress: StyleConfig {
                color: Some("#1c7ed6".to_string()),
                ..Default::default()
            },
            known: StyleConfig {
                color: Some("#2b8a3e".to_string()),
                opacity: Some(0.8),
                ..Default::default()
            },
        }
    }
}

/// 排布方式
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LayoutMode {
    /// 替换词与原文并排
    #[default]
    Horizontal,
    /// 上下叠放（ruby）
    Stacked,
}

/// 标注单元中的两个元素
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationPart {
    Replacement,
    Original,
}

/// 前后缀包裹
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct Wrap {
    pub prefix: String,
    pub suffix: String,
}

impl Wrap {
    pub fn new(prefix: &str, suffix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            suffix: suffix.to_string(),
        }
    }

    pub fn apply(&self, text: &str) -> String {
        format!("{}{}{}", self.prefix, text, self.suffix)
    }
}

/// 原文显示配置
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct OriginalTextDisplay {
    pub layout: LayoutMode,
    /// 并排模式下替换词是否在前
    pub replacement_first: bool,
    /// 叠放模式下位于文字基线上的元素
    pub baseline: AnnotationPart,
    /// 叠放模式下视觉上位于上方的元素
    pub top: AnnotationPart,
    pub replacement_wrap: Wrap,
    pub original_wrap: Wrap,
}

impl OriginalTextDisplay {
    /// 叠放模式下注释元素（非基线元素）的位置：`over` 或 `under`
    pub fn ruby_position(&self) -> &'static str {
        if self.top == self.baseline {
            "under"
        } else {
            "over"
        }
    }
}

impl Default for OriginalTextDisplay {
    fn default() -> Self {
        Self {
            layout: LayoutMode::Horizontal,
            replacement_first: true,
            baseline: AnnotationPart::Original,
            top: AnnotationPart::Replacement,
            replacement_wrap: Wrap::default(),
            original_wrap: Wrap::new("(", ")"),
        }
    }
}
