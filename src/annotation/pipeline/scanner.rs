//! 文档扫描器模块
//!
//! 从配置的根节点遍历文档，选出可标注的叶子块级元素，抽取其可见文本
//! 并记录每个文本节点在段落文本中的字符偏移。同时含有块级子元素和直接文本的
//! 容器，块与块之间的连续文本各自作为一个段落，以首个节点为标识。
//! 扫描标记保存在显式的 [`ScanSession`] 中，而不是写到节点属性上。

use std::collections::HashMap;
use std::rc::{Rc, Weak};

use markup5ever_rcdom::{Handle, Node, NodeData};

use super::filters::{
    is_annotation_unit, is_block_element, is_noise_region, is_skipped_element, matches_selector,
    BlockFilter,
};
use crate::annotation::config::{constants, ScanRoot};
use crate::annotation::render::TextSegment;
use crate::html::find_first;

/// 段落处理状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum BlockState {
    #[default]
    Unseen,
    /// 已交给调度器，或翻译失败后停留于此
    Pending,
    Done,
}

/// 节点标识：`Rc` 指针地址
pub type NodeKey = usize;

pub fn node_key(node: &Handle) -> NodeKey {
    Rc::as_ptr(node) as usize
}

struct Visit {
    node: Weak<Node>,
    state: BlockState,
}

/// 一次会话内的扫描标记集合
///
/// 以节点地址为键，同时保存弱引用：节点被释放后地址可能被复用，
/// 弱引用失效的记录视为 `Unseen`。
#[derive(Default)]
pub struct ScanSession {
    visits: HashMap<NodeKey, Visit>,
}

impl ScanSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, node: &Handle) -> BlockState {
        match self.visits.get(&node_key(node)) {
            Some(visit) if visit.node.upgrade().is_some_and(|n| Rc::ptr_eq(&n, node)) => visit.state,
            _ => BlockState::Unseen,
        }
    }

    pub fn mark(&mut self, node: &Handle, state: BlockState) {
        self.visits.insert(
            node_key(node),
            Visit {
                node: Rc::downgrade(node),
                state,
            },
        );
    }

    /// 外部清除标记，使节点在下一次扫描时重新成为候选
    pub fn clear(&mut self, node: &Handle) -> bool {
        if self.state(node) == BlockState::Unseen {
            return false;
        }
        self.visits.remove(&node_key(node)).is_some()
    }

    /// 丢弃已被释放节点的记录
    pub fn prune(&mut self) -> usize {
        let before = self.visits.len();
        self.visits.retain(|_, visit| visit.node.strong_count() > 0);
        before - self.visits.len()
    }

    pub fn count(&self, state: BlockState) -> usize {
        self.visits
            .values()
            .filter(|visit| visit.state == state && visit.node.strong_count() > 0)
            .count()
    }

    pub fn len(&self) -> usize {
        self.visits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visits.is_empty()
    }
}

/// 一个可标注段落，只存在于一次扫描过程中
#[derive(Debug, Clone)]
pub struct ContentBlock {
    /// 段落标识：叶子块级元素本身，或混排容器中一段行内内容的首个节点
    pub node: Handle,
    pub text: String,
    pub segments: Vec<TextSegment>,
    pub state: BlockState,
    /// 对齐后的译文，按分隔符拼接
    pub translated: Option<String>,
}

impl ContentBlock {
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// 文档扫描器
#[derive(Debug, Clone)]
pub struct DocumentScanner {
    scan_root: ScanRoot,
    filter: BlockFilter,
}

impl DocumentScanner {
    pub fn new(scan_root: ScanRoot) -> Self {
        Self {
            scan_root,
            filter: BlockFilter::new(),
        }
    }

    /// 正文模式下按优先级选出正文容器，找不到时退回整个文档
    pub fn resolve_root(&self, root: &Handle) -> Handle {
        if self.scan_root == ScanRoot::Document {
            return root.clone();
        }

        for selector in constants::MAIN_CONTENT_SELECTORS {
            if let Some(found) = find_first(root, &|node| matches_selector(node, selector)) {
                tracing::debug!("正文容器: {}", selector);
                return found;
            }
        }
        root.clone()
    }

    /// 扫描并返回新发现的段落，接受的段落立即标记为 `Pending`
    pub fn scan(&self, root: &Handle, session: &mut ScanSession) -> Vec<ContentBlock> {
        let scan_root = self.resolve_root(root);
        let mut blocks = Vec::new();
        self.visit(&scan_root, session, &mut blocks);

        if !blocks.is_empty() {
            tracing::debug!("扫描发现 {} 个新段落", blocks.len());
        }
        blocks
    }

    fn visit(&self, node: &Handle, session: &mut ScanSession, blocks: &mut Vec<ContentBlock>) {
        match node.data {
            NodeData::Document => {}
            NodeData::Element { .. } => {
                if is_skipped_element(node) || is_annotation_unit(node) {
                    return;
                }
                if self.scan_root == ScanRoot::MainContent && is_noise_region(node) {
                    return;
                }
                if !self.has_block_descendant(node) {
                    if is_block_element(node) && session.state(node) == BlockState::Unseen {
                        let (text, segments) = extract_text(node);
                        self.consider(node, text, segments, session, blocks);
                    }
                    return;
                }
                self.visit_mixed(node, session, blocks);
                return;
            }
            _ => return,
        }

        for child in node.children.borrow().iter() {
            self.visit(child, session, blocks);
        }
    }

    /// 块级子元素递归处理，夹在它们之间的行内内容按连续片段收集
    fn visit_mixed(&self, container: &Handle, session: &mut ScanSession, blocks: &mut Vec<ContentBlock>) {
        let mut run: Vec<Handle> = Vec::new();
        for child in container.children.borrow().iter() {
            if self.is_inline_part(child) {
                run.push(child.clone());
                continue;
            }
            self.consider_run(&run, session, blocks);
            run.clear();
            self.visit(child, session, blocks);
        }
        self.consider_run(&run, session, blocks);
    }

    fn consider_run(&self, run: &[Handle], session: &mut ScanSession, blocks: &mut Vec<ContentBlock>) {
        let Some(first) = run.first() else {
            return;
        };
        if session.state(first) != BlockState::Unseen {
            return;
        }
        let (text, segments) = extract_nodes(run);
        self.consider(first, text, segments, session, blocks);
    }

    fn consider(
        &self,
        node: &Handle,
        text: String,
        segments: Vec<TextSegment>,
        session: &mut ScanSession,
        blocks: &mut Vec<ContentBlock>,
    ) {
        if session.state(node) != BlockState::Unseen {
            return;
        }

        if let Err(reason) = self.filter.check(&text) {
            tracing::trace!("跳过段落 ({:?}): {}", reason, text.trim());
            return;
        }

        session.mark(node, BlockState::Pending);
        blocks.push(ContentBlock {
            node: node.clone(),
            text,
            segments,
            state: BlockState::Pending,
            translated: None,
        });
    }

    /// 可并入行内片段的子节点；被拒绝的元素和标注单元也算，抽取文本时再跳过
    fn is_inline_part(&self, node: &Handle) -> bool {
        match node.data {
            NodeData::Text { .. } | NodeData::Comment { .. } => true,
            NodeData::Element { .. } => {
                if is_skipped_element(node) || is_annotation_unit(node) {
                    return true;
                }
                if self.scan_root == ScanRoot::MainContent && is_noise_region(node) {
                    return false;
                }
                !is_block_element(node) && !self.has_block_descendant(node)
            }
            _ => false,
        }
    }

    /// 是否还有可进入的块级后代
    fn has_block_descendant(&self, node: &Handle) -> bool {
        node.children.borrow().iter().any(|child| {
            if !matches!(child.data, NodeData::Element { .. })
                || is_skipped_element(child)
                || is_annotation_unit(child)
            {
                return false;
            }
            if self.scan_root == ScanRoot::MainContent && is_noise_region(child) {
                return false;
            }
            is_block_element(child) || self.has_block_descendant(child)
        })
    }
}

/// 抽取段落可见文本，跳过被拒绝的子树和已插入的标注单元
pub fn extract_text(node: &Handle) -> (String, Vec<TextSegment>) {
    extract_nodes(&node.children.borrow())
}

/// 按顺序抽取一组相邻节点的可见文本
fn extract_nodes(nodes: &[Handle]) -> (String, Vec<TextSegment>) {
    let mut text = String::new();
    let mut segments = Vec::new();
    let mut offset = 0;
    collect_segments(nodes, &mut text, &mut segments, &mut offset);
    (text, segments)
}

fn collect_segments(nodes: &[Handle], text: &mut String, segments: &mut Vec<TextSegment>, offset: &mut usize) {
    for child in nodes {
        match &child.data {
            NodeData::Text { contents } => {
                let content = contents.borrow().to_string();
                if content.is_empty() {
                    continue;
                }
                let length = content.chars().count();
                text.push_str(&content);
                segments.push(TextSegment {
                    node: child.clone(),
                    start: *offset,
                    text: content,
                });
                *offset += length;
            }
            NodeData::Element { .. } => {
                if is_skipped_element(child) || is_annotation_unit(child) {
                    continue;
                }
                collect_segments(&child.children.borrow(), text, segments, offset);
            }
            _ => {}
        }
    }
}
