//! 标注渲染
//!
//! 为一个片段构建双语标注单元（并排或 ruby 叠放），并把宿主文本节点
//! 拆成 “前文 + 标注单元 + 后文”，保证周围文本一字不差。

use std::collections::HashMap;

use markup5ever_rcdom::Handle;

use crate::annotation::config::{constants, AnnotationPart, CategoryStyles, LayoutMode, OriginalTextDisplay};
use crate::annotation::matching::ResolvedSpan;
use crate::annotation::vocabulary::VocabularyEntry;
use crate::html::{
    append_child, create_element, create_text_node, find_first, get_node_attr, get_node_name,
    insert_after, is_attached, set_text, text_of,
};

/// 注入到文档头部的交互样式，分类样式以内联方式写在替换元素上
pub const STYLESHEET: &str = "\
.vm-unit { white-space: nowrap; }
.vm-word { cursor: pointer; border-bottom: 1px solid transparent; }
.vm-word:hover { border-bottom-color: currentColor; }
.vm-original { opacity: 0.75; font-size: 0.9em; }
ruby.vm-unit rt { font-size: 0.6em; }
";

/// 段落中的一个文本节点及其在段落文本中的起始字符偏移
#[derive(Debug, Clone)]
pub struct TextSegment {
    pub node: Handle,
    pub start: usize,
    pub text: String,
}

impl TextSegment {
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    fn contains(&self, start: usize, end: usize) -> bool {
        self.start <= start && end <= self.start + self.char_len()
    }
}

/// 一次渲染的结果统计
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RenderOutcome {
    pub applied: usize,
    pub skipped: usize,
}

/// 标注单元构建器
pub struct AnnotationRenderer<'a> {
    styles: &'a CategoryStyles,
    display: &'a OriginalTextDisplay,
}

impl<'a> AnnotationRenderer<'a> {
    pub fn new(styles: &'a CategoryStyles, display: &'a OriginalTextDisplay) -> Self {
        Self { styles, display }
    }

    /// 构建一个标注单元
    pub fn build_unit(&self, span: &ResolvedSpan, original: &str) -> Handle {
        let replacement = self.replacement_element(span, original);
        let original_node = self.original_element(original);
        let class = format!("{} vm-{}", constants::UNIT_CLASS, span.entry.category.as_str());

        match self.display.layout {
            LayoutMode::Horizontal => {
                let unit = create_element(
                    "span",
                    &[("class", class), (constants::UNIT_MARKER_ATTR, String::new())],
                );
                let (first, second) = if self.display.replacement_first {
                    (replacement, original_node)
                } else {
                    (original_node, replacement)
                };
                append_child(&unit, first);
                append_child(&unit, second);
                unit
            }
            LayoutMode::Stacked => {
                let unit = create_element(
                    "ruby",
                    &[
                        ("class", class),
                        (constants::UNIT_MARKER_ATTR, String::new()),
                        (
                            "style",
                            format!("ruby-position: {}", self.display.ruby_position()),
                        ),
                    ],
                );
                let (base, annotation) = match self.display.baseline {
                    AnnotationPart::Replacement => (replacement, original_node),
                    AnnotationPart::Original => (original_node, replacement),
                };
                let rt = create_element("rt", &[]);
                append_child(&rt, annotation);
                append_child(&unit, base);
                append_child(&unit, rt);
                unit
            }
        }
    }

    fn replacement_element(&self, span: &ResolvedSpan, original: &str) -> Handle {
        let mut attrs = vec![
            ("class", constants::WORD_CLASS.to_string()),
            (constants::ENTRY_ID_ATTR, span.entry.id.clone()),
            (constants::ORIGINAL_TEXT_ATTR, original.to_string()),
            (constants::SURFACE_FORM_ATTR, span.matched_surface_form.clone()),
        ];
        let css = self.styles.get(span.entry.category).to_css();
        if !css.is_empty() {
            attrs.push(("style", css));
        }

        let element = create_element("span", &attrs);
        let word = display_form(&span.entry, &span.matched_surface_form);
        append_child(
            &element,
            create_text_node(&self.display.replacement_wrap.apply(&word)),
        );
        element
    }

    fn original_element(&self, original: &str) -> Handle {
        let element = create_element("span", &[("class", constants::ORIGINAL_CLASS.to_string())]);
        append_child(
            &element,
            create_text_node(&self.display.original_wrap.apply(original)),
        );
        element
    }
}

/// 取词条中声明时的大小写写法
fn display_form(entry: &VocabularyEntry, matched: &str) -> String {
    std::iter::once(&entry.text)
        .chain(entry.inflections.iter())
        .map(|form| form.trim())
        .find(|form| form.to_lowercase() == matched)
        .unwrap_or(matched)
        .to_string()
}

/// 把消解后的片段写回文档
///
/// 从右向左处理，先拆右侧不会影响左侧片段的偏移。跨文本节点的片段、
/// 已脱离 `root` 的节点、内容已被外部改写的节点都直接跳过。
pub fn apply_spans(
    root: &Handle,
    block_text: &str,
    segments: &[TextSegment],
    spans: &[ResolvedSpan],
    renderer: &AnnotationRenderer<'_>,
) -> RenderOutcome {
    let block_chars: Vec<char> = block_text.chars().collect();
    let mut ordered: Vec<&ResolvedSpan> = spans.iter().collect();
    ordered.sort_by(|a, b| b.start.cmp(&a.start));

    let mut outcome = RenderOutcome::default();
    // 已处理过的文本节点的当前内容
    let mut current: HashMap<usize, String> = HashMap::new();

    for span in ordered {
        let Some(index) = segments.iter().position(|s| s.contains(span.start, span.end)) else {
            tracing::trace!("片段 {}..{} 跨越文本节点，跳过", span.start, span.end);
            outcome.skipped += 1;
            continue;
        };
        let segment = &segments[index];

        if !is_attached(&segment.node, root) {
            tracing::debug!("文本节点已脱离文档，跳过片段 {}..{}", span.start, span.end);
            outcome.skipped += 1;
            continue;
        }

        let expected = current
            .get(&index)
            .cloned()
            .unwrap_or_else(|| segment.text.clone());
        if text_of(&segment.node).as_deref() != Some(expected.as_str()) {
            tracing::debug!("文本节点内容已变化，跳过片段 {}..{}", span.start, span.end);
            outcome.skipped += 1;
            continue;
        }

        let chars: Vec<char> = expected.chars().collect();
        let local_start = span.start - segment.start;
        let local_end = span.end - segment.start;
        if local_end > chars.len() || span.end > block_chars.len() {
            outcome.skipped += 1;
            continue;
        }

        let before: String = chars[..local_start].iter().collect();
        let original: String = chars[local_start..local_end].iter().collect();
        let after: String = chars[local_end..].iter().collect();
        let block_slice: String = block_chars[span.start..span.end].iter().collect();
        if original != block_slice {
            outcome.skipped += 1;
            continue;
        }

        let mut inserted = vec![renderer.build_unit(span, &original)];
        if !after.is_empty() {
            inserted.push(create_text_node(&after));
        }
        if !insert_after(&segment.node, inserted) {
            outcome.skipped += 1;
            continue;
        }
        set_text(&segment.node, &before);
        current.insert(index, before);
        outcome.applied += 1;
    }

    outcome
}

/// 向文档头部注入一次交互样式；已存在时不重复注入
pub fn inject_stylesheet(document: &Handle) -> bool {
    let Some(head) = find_first(document, &|node| get_node_name(node) == Some("head")) else {
        return false;
    };

    let exists = find_first(&head, &|node| {
        get_node_name(node) == Some("style")
            && get_node_attr(node, constants::STYLESHEET_ATTR).is_some()
    })
    .is_some();
    if exists {
        return false;
    }

    let style = create_element("style", &[(constants::STYLESHEET_ATTR, String::new())]);
    append_child(&style, create_text_node(STYLESHEET));
    append_child(&head, style);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::config::Wrap;
    use crate::annotation::matching::CandidateSpan;
    use crate::annotation::vocabulary::Category;
    use crate::html::{html_to_dom, serialize_node, text_content};

    fn resolved(start: usize, end: usize, form: &str) -> ResolvedSpan {
        let entry = VocabularyEntry::new("42", "Book", "预订")
            .with_inflections(&["booking"])
            .with_category(Category::InProgress);
        ResolvedSpan(CandidateSpan::new(start, end, &entry, form))
    }

    fn paragraph(html: &str) -> (Handle, Handle) {
        let dom = html_to_dom(html.as_bytes(), "utf-8").unwrap();
        let document = dom.document.clone();
        let p = find_first(&document, &|n| get_node_name(n) == Some("p")).unwrap();
        (document, p)
    }

    #[test]
    fn test_horizontal_unit_markup() {
        let styles = CategoryStyles::default();
        let display = OriginalTextDisplay::default();
        let renderer = AnnotationRenderer::new(&styles, &display);

        let unit = renderer.build_unit(&resolved(0, 2, "booking"), "预订");
        let html = serialize_node(&unit).unwrap();

        assert!(html.starts_with("<span class=\"vm-unit vm-in-progress\" data-vm-unit=\"\">"));
        assert!(html.contains("data-vm-entry-id=\"42\""));
        assert!(html.contains("data-vm-original=\"预订\""));
        assert!(html.contains("data-vm-form=\"booking\""));
        assert!(html.contains("style=\"color: #1c7ed6\""));
        assert!(html.find(">booking<").unwrap() < html.find(">(预订)<").unwrap());
    }

    #[test]
    fn test_original_first_with_custom_wraps() {
        let styles = CategoryStyles::default();
        let display = OriginalTextDisplay {
            replacement_first: false,
            replacement_wrap: Wrap::new("[", "]"),
            original_wrap: Wrap::default(),
            ..Default::default()
        };
        let renderer = AnnotationRenderer::new(&styles, &display);

        let text = text_content(&renderer.build_unit(&resolved(0, 2, "book"), "预订"));
        assert_eq!(text, "预订[Book]");
    }

    #[test]
    fn test_stacked_unit_uses_ruby() {
        let styles = CategoryStyles::default();
        let display = OriginalTextDisplay {
            layout: LayoutMode::Stacked,
            baseline: AnnotationPart::Original,
            top: AnnotationPart::Replacement,
            original_wrap: Wrap::default(),
            ..Default::default()
        };
        let renderer = AnnotationRenderer::new(&styles, &display);

        let html = serialize_node(&renderer.build_unit(&resolved(0, 2, "booking"), "预订")).unwrap();
        assert!(html.starts_with("<ruby class=\"vm-unit vm-in-progress\""));
        assert!(html.contains("ruby-position: over"));
        assert!(html.contains("<span class=\"vm-original\">预订</span><rt><span class=\"vm-word\""));
    }

    #[test]
    fn test_apply_spans_preserves_surrounding_text() {
        let (document, p) = paragraph("<p>我喜欢阅读和预订机票</p>");
        let node = p.children.borrow()[0].clone();
        let segments = vec![TextSegment {
            node,
            start: 0,
            text: "我喜欢阅读和预订机票".to_string(),
        }];
        let styles = CategoryStyles::default();
        let display = OriginalTextDisplay {
            original_wrap: Wrap::default(),
            ..Default::default()
        };
        let renderer = AnnotationRenderer::new(&styles, &display);

        let outcome = apply_spans(
            &document,
            "我喜欢阅读和预订机票",
            &segments,
            &[resolved(3, 5, "book"), resolved(6, 8, "booking")],
            &renderer,
        );
        assert_eq!(outcome, RenderOutcome { applied: 2, skipped: 0 });

        let html = serialize_node(&p).unwrap();
        assert!(html.starts_with("<p>我喜欢<span class=\"vm-unit"));
        assert!(html.ends_with("</span></span>机票</p>"));
        // 去掉替换词后原文一字不差
        let plain = text_content(&p).replace("Book", "").replace("booking", "");
        assert_eq!(plain, "我喜欢阅读和预订机票");
    }

    #[test]
    fn test_apply_spans_skips_stale_and_detached_nodes() {
        let (document, p) = paragraph("<p>我需要预订机票</p>");
        let node = p.children.borrow()[0].clone();
        let segments = vec![TextSegment {
            node: node.clone(),
            start: 0,
            text: "我需要预订机票".to_string(),
        }];
        let styles = CategoryStyles::default();
        let display = OriginalTextDisplay::default();
        let renderer = AnnotationRenderer::new(&styles, &display);
        let spans = [resolved(3, 5, "book")];

        set_text(&node, "内容被改写了");
        let outcome = apply_spans(&document, "我需要预订机票", &segments, &spans, &renderer);
        assert_eq!(outcome.applied, 0);

        set_text(&node, "我需要预订机票");
        p.children.borrow_mut().clear();
        let outcome = apply_spans(&document, "我需要预订机票", &segments, &spans, &renderer);
        assert_eq!(outcome, RenderOutcome { applied: 0, skipped: 1 });
    }

    #[test]
    fn test_stylesheet_injected_once() {
        let dom = html_to_dom(b"<html><head></head><body></body></html>", "utf-8").unwrap();
        assert!(inject_stylesheet(&dom.document));
        assert!(!inject_stylesheet(&dom.document));
    }
}
