//! # Vocabmark Library
//!
//! 在网页正文中识别个人词库里的生词，并把对应的中文片段就地替换成
//! “目标语言单词 + 原文”的双语标注单元。
//!
//! ## 模块组织
//!
//! - `annotation` - 标注管道（扫描、批量翻译、分句、匹配、渲染、增量更新）
//! - `parsers` - HTML 解析、DOM 操作与序列化
//! - `env` - 类型安全的环境变量

pub mod annotation;
pub mod env;
pub mod parsers;

// Re-export commonly used items for convenience
pub use parsers::*;
