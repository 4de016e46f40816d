//! HTML 解析和处理模块
//!
//! - `dom`: 基础 DOM 操作与就地修改原语
//! - `serializer`: 序列化功能

pub mod dom;
pub mod serializer;

pub use dom::{
    append_child, create_element, create_text_node, find_first, get_child_node_by_name,
    get_node_attr, get_node_name, get_parent_node, html_to_dom, insert_after,
    is_attached, set_text, text_content, text_of,
};
pub use serializer::{serialize_document, serialize_node};
