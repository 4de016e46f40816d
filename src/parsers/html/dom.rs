use std::cell::RefCell;
use std::rc::Rc;

use encoding_rs::Encoding;
use html5ever::interface::{Attribute, QualName};
use html5ever::parse_document;
use html5ever::tendril::{format_tendril, StrTendril, TendrilSink};
use html5ever::{namespace_url, ns, LocalName};
use markup5ever_rcdom::{Handle, Node, NodeData, RcDom};

/// 将 HTML 字节转换为 DOM
pub fn html_to_dom(data: &[u8], document_encoding: &str) -> std::io::Result<RcDom> {
    let s: String = match Encoding::for_label(document_encoding.as_bytes()) {
        Some(encoding) => {
            let (string, _, _) = encoding.decode(data);
            string.to_string()
        }
        None => String::from_utf8_lossy(data).to_string(),
    };

    parse_document(RcDom::default(), Default::default())
        .from_utf8()
        .read_from(&mut s.as_bytes())
}

/// 根据名称获取子节点
pub fn get_child_node_by_name(parent: &Handle, node_name: &str) -> Option<Handle> {
    let children = parent.children.borrow();
    let matching_children = children.iter().find(|child| match child.data {
        NodeData::Element { ref name, .. } => &*name.local == node_name,
        _ => false,
    });
    matching_children.cloned()
}

/// 查找第一个匹配谓词的后代元素（文档顺序）
pub fn find_first<F>(node: &Handle, predicate: &F) -> Option<Handle>
where
    F: Fn(&Handle) -> bool,
{
    for child in node.children.borrow().iter() {
        if matches!(child.data, NodeData::Element { .. }) && predicate(child) {
            return Some(child.clone());
        }
        if let Some(found) = find_first(child, predicate) {
            return Some(found);
        }
    }
    None
}

/// 获取节点属性值
pub fn get_node_attr(node: &Handle, attr_name: &str) -> Option<String> {
    match &node.data {
        NodeData::Element { attrs, .. } => {
            for attr in attrs.borrow().iter() {
                if &*attr.name.local == attr_name {
                    return Some(attr.value.to_string());
                }
            }
            None
        }
        _ => None,
    }
}

/// 获取节点名称
pub fn get_node_name(node: &Handle) -> Option<&'_ str> {
    match &node.data {
        NodeData::Element { name, .. } => Some(name.local.as_ref()),
        _ => None,
    }
}

/// 获取父节点，不会把节点从树上摘下来
pub fn get_parent_node(child: &Handle) -> Option<Handle> {
    let weak = child.parent.take();
    let parent = weak.as_ref().and_then(|node| node.upgrade());
    child.parent.set(weak);
    parent
}

/// 判断节点是否仍挂在 `root` 之下，父节点必须真的持有该子节点
pub fn is_attached(node: &Handle, root: &Handle) -> bool {
    let mut current = node.clone();
    loop {
        if Rc::ptr_eq(&current, root) {
            return true;
        }
        let Some(parent) = get_parent_node(&current) else {
            return false;
        };
        if !parent.children.borrow().iter().any(|c| Rc::ptr_eq(c, &current)) {
            return false;
        }
        current = parent;
    }
}

/// 创建一个游离的元素节点
pub fn create_element(tag: &str, attrs: &[(&str, String)]) -> Handle {
    let attrs = attrs
        .iter()
        .map(|(name, value)| Attribute {
            name: QualName::new(None, ns!(), LocalName::from(*name)),
            value: format_tendril!("{}", value),
        })
        .collect();

    Node::new(NodeData::Element {
        name: QualName::new(None, ns!(html), LocalName::from(tag)),
        attrs: RefCell::new(attrs),
        template_contents: RefCell::new(None),
        mathml_annotation_xml_integration_point: false,
    })
}

/// 创建一个游离的文本节点
pub fn create_text_node(text: &str) -> Handle {
    Node::new(NodeData::Text {
        contents: RefCell::new(StrTendril::from_slice(text)),
    })
}

/// 追加子节点
pub fn append_child(parent: &Handle, child: Handle) {
    child.parent.set(Some(Rc::downgrade(parent)));
    parent.children.borrow_mut().push(child);
}

/// 在 `reference` 之后依次插入 `nodes`，引用节点已脱离文档时返回 false
pub fn insert_after(reference: &Handle, nodes: Vec<Handle>) -> bool {
    let Some(parent) = get_parent_node(reference) else {
        return false;
    };

    let mut children = parent.children.borrow_mut();
    let Some(index) = children.iter().position(|c| Rc::ptr_eq(c, reference)) else {
        return false;
    };

    for (offset, node) in nodes.into_iter().enumerate() {
        node.parent.set(Some(Rc::downgrade(&parent)));
        children.insert(index + 1 + offset, node);
    }
    true
}

/// 读取文本节点内容
pub fn text_of(node: &Handle) -> Option<String> {
    match &node.data {
        NodeData::Text { contents } => Some(contents.borrow().to_string()),
        _ => None,
    }
}

/// 改写文本节点内容
pub fn set_text(node: &Handle, text: &str) -> bool {
    match &node.data {
        NodeData::Text { contents } => {
            let mut contents = contents.borrow_mut();
            contents.clear();
            contents.push_slice(text);
            true
        }
        _ => false,
    }
}

/// 拼接节点下全部文本
pub fn text_content(node: &Handle) -> String {
    let mut out = String::new();
    collect_text(node, &mut out);
    out
}

fn collect_text(node: &Handle, out: &mut String) {
    match &node.data {
        NodeData::Text { contents } => out.push_str(&contents.borrow()),
        _ => {
            for child in node.children.borrow().iter() {
                collect_text(child, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body_of(dom: &RcDom) -> Handle {
        let html = get_child_node_by_name(&dom.document, "html").unwrap();
        get_child_node_by_name(&html, "body").unwrap()
    }

    #[test]
    fn test_get_parent_node_keeps_link() {
        let dom = html_to_dom(b"<p>hello</p>", "utf-8").unwrap();
        let body = body_of(&dom);
        let p = get_child_node_by_name(&body, "p").unwrap();

        assert!(Rc::ptr_eq(&get_parent_node(&p).unwrap(), &body));
        // 再次读取仍然可用
        assert!(get_parent_node(&p).is_some());
        assert!(is_attached(&p, &dom.document));
    }

    #[test]
    fn test_insert_after_and_detached_reference() {
        let dom = html_to_dom(b"<p>one</p>", "utf-8").unwrap();
        let p = get_child_node_by_name(&body_of(&dom), "p").unwrap();
        let text = p.children.borrow()[0].clone();

        let extra = create_element("b", &[("class", "x".to_string())]);
        append_child(&extra, create_text_node("two"));
        assert!(insert_after(&text, vec![extra.clone(), create_text_node("three")]));
        assert_eq!(text_content(&p), "onetwothree");
        assert_eq!(get_node_attr(&extra, "class").as_deref(), Some("x"));

        let orphan = create_text_node("orphan");
        assert!(!insert_after(&orphan, vec![create_text_node("x")]));
    }

    #[test]
    fn test_decode_declared_charset() {
        let (bytes, _, _) = encoding_rs::GBK.encode("<p>中文</p>");
        let dom = html_to_dom(&bytes, "gbk").unwrap();
        assert_eq!(text_content(&body_of(&dom)), "中文");
    }
}
