//! # 解析器模块
//!
//! 负责 HTML 文档的解析、遍历辅助与序列化。
//!
//! - `html` - HTML 文档解析、DOM 操作、序列化

pub mod html;

pub use html::{html_to_dom, serialize_document};
