//! 增量更新控制器
//!
//! 宿主在文档结构变化后通过 [`MutationNotifier`] 发送通知。控制器把同一时刻
//! 排队的通知合并成一个变更批次，只要批次里有子树插入或标记清除，就对整个
//! 监视根重新扫描一遍。已处理段落的标记让重复的全量扫描几乎没有开销。

use markup5ever_rcdom::Handle;
use tokio::sync::mpsc;

use super::service::{AnnotationService, PassReport};
use crate::annotation::pipeline::SchedulerStats;

/// 文档结构变更
#[derive(Debug, Clone)]
pub enum TreeMutation {
    /// 插入了新的子树，参数为插入的根节点
    SubtreeInserted(Handle),
    /// 宿主清除了某个段落的处理标记
    MarkerCleared(Handle),
}

/// 宿主侧的通知发送端，可以克隆；全部丢弃后控制器退出
#[derive(Clone)]
pub struct MutationNotifier {
    sender: mpsc::UnboundedSender<TreeMutation>,
}

impl MutationNotifier {
    /// 发送通知；控制器已退出时返回 false
    pub fn notify(&self, mutation: TreeMutation) -> bool {
        self.sender.send(mutation).is_ok()
    }

    pub fn subtree_inserted(&self, node: &Handle) -> bool {
        self.notify(TreeMutation::SubtreeInserted(node.clone()))
    }

    pub fn marker_cleared(&self, node: &Handle) -> bool {
        self.notify(TreeMutation::MarkerCleared(node.clone()))
    }
}

/// 控制器运行汇总
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WatchReport {
    pub passes: usize,
    pub mutations: usize,
    /// 合并后的变更批次数
    pub change_batches: usize,
    pub blocks_found: usize,
    pub stats: SchedulerStats,
}

impl WatchReport {
    fn record(&mut self, pass: &PassReport) {
        self.passes += 1;
        self.blocks_found += pass.blocks_found;
        let s = &mut self.stats;
        s.batches += pass.stats.batches;
        s.blocks_done += pass.stats.blocks_done;
        s.blocks_failed += pass.stats.blocks_failed;
        s.blocks_idle += pass.stats.blocks_idle;
        s.blocks_stale += pass.stats.blocks_stale;
        s.spans_applied += pass.stats.spans_applied;
        s.spans_skipped += pass.stats.spans_skipped;
        s.dictionary_lookups += pass.stats.dictionary_lookups;
    }
}

/// 增量更新控制器
pub struct LiveUpdateController<'a> {
    service: &'a AnnotationService,
    root: Handle,
    receiver: mpsc::UnboundedReceiver<TreeMutation>,
    report: WatchReport,
}

impl<'a> LiveUpdateController<'a> {
    /// 创建控制器及其通知发送端
    pub fn new(service: &'a AnnotationService, root: &Handle) -> (Self, MutationNotifier) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let controller = Self {
            service,
            root: root.clone(),
            receiver,
            report: WatchReport::default(),
        };
        (controller, MutationNotifier { sender })
    }

    /// 首次全量扫描
    pub async fn start(&mut self) -> PassReport {
        let pass = self.service.run_pass(&self.root).await;
        self.report.record(&pass);
        pass
    }

    /// 处理当前已排队的通知（不等待新通知）；需要时跑一遍扫描
    pub async fn process_pending(&mut self) -> Option<PassReport> {
        let first = self.receiver.try_recv().ok()?;
        self.handle_batch(first).await
    }

    /// 首次扫描后持续处理通知，直到所有发送端被丢弃
    pub async fn run(mut self) -> WatchReport {
        self.start().await;
        while let Some(first) = self.receiver.recv().await {
            self.handle_batch(first).await;
        }
        tracing::debug!(
            "增量更新结束: {} 次扫描，{} 个通知",
            self.report.passes,
            self.report.mutations
        );
        self.report
    }

    pub fn report(&self) -> WatchReport {
        self.report
    }

    /// 合并队列中的通知为一个批次
    async fn handle_batch(&mut self, first: TreeMutation) -> Option<PassReport> {
        let mut batch = vec![first];
        while let Ok(next) = self.receiver.try_recv() {
            batch.push(next);
        }
        self.report.mutations += batch.len();
        self.report.change_batches += 1;

        let mut rescan = false;
        for mutation in &batch {
            match mutation {
                TreeMutation::SubtreeInserted(_) => rescan = true,
                TreeMutation::MarkerCleared(node) => {
                    rescan |= self.service.clear_marker(node);
                }
            }
        }

        if !rescan {
            tracing::trace!("变更批次无需重新扫描: {} 个通知", batch.len());
            return None;
        }

        tracing::debug!("变更批次触发全量扫描: {} 个通知", batch.len());
        let pass = self.service.run_pass(&self.root).await;
        self.report.record(&pass);
        Some(pass)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::config::{AnnotationConfig, ConfigManager, ProviderSettings};
    use crate::annotation::providers::{MemoryProvider, ProviderRegistry};
    use crate::annotation::vocabulary::{VocabularyEntry, VocabularyStore};
    use crate::html::{append_child, create_element, create_text_node, find_first, get_node_name, html_to_dom, text_content};
    use std::rc::Rc;

    fn fixture() -> (AnnotationService, ConfigManager, VocabularyStore) {
        let manager = ConfigManager::with_config(AnnotationConfig {
            providers: vec![ProviderSettings::new("memory")],
            cache_enabled: false,
            ..Default::default()
        })
        .unwrap();
        let store = VocabularyStore::new(vec![VocabularyEntry::new("1", "book", "预订")]);
        let mut registry = ProviderRegistry::new();
        registry.register(Rc::new(
            MemoryProvider::new()
                .with_translation("我需要预订机票", "I need to book a flight")
                .with_translation("他也想预订酒店", "He also wants to book a hotel"),
        ));
        let service = AnnotationService::from_parts(&manager, &store, registry);
        (service, manager, store)
    }

    fn body(dom: &markup5ever_rcdom::RcDom) -> Handle {
        find_first(&dom.document, &|n| get_node_name(n) == Some("body")).unwrap()
    }

    fn paragraph(text: &str) -> Handle {
        let p = create_element("p", &[]);
        append_child(&p, create_text_node(text));
        p
    }

    #[tokio::test]
    async fn test_inserted_subtree_is_annotated_on_next_batch() {
        let (service, _manager, _store) = fixture();
        let dom = html_to_dom("<p>我需要预订机票</p>".as_bytes(), "utf-8").unwrap();
        let (mut controller, notifier) = LiveUpdateController::new(&service, &dom.document);

        assert_eq!(controller.start().await.stats.spans_applied, 1);
        assert!(controller.process_pending().await.is_none());

        let inserted = paragraph("他也想预订酒店");
        append_child(&body(&dom), inserted.clone());
        assert!(notifier.subtree_inserted(&inserted));

        let pass = controller.process_pending().await.unwrap();
        assert_eq!(pass.blocks_found, 1);
        assert_eq!(text_content(&inserted), "他也想book(预订)酒店");
    }

    #[tokio::test]
    async fn test_queued_mutations_coalesce_into_one_pass() {
        let (service, _manager, _store) = fixture();
        let dom = html_to_dom("<p>我需要预订机票</p>".as_bytes(), "utf-8").unwrap();
        let (controller, notifier) = LiveUpdateController::new(&service, &dom.document);

        for _ in 0..3 {
            let inserted = paragraph("他也想预订酒店");
            append_child(&body(&dom), inserted.clone());
            notifier.subtree_inserted(&inserted);
        }
        drop(notifier);

        let report = controller.run().await;
        assert_eq!(report.passes, 2);
        assert_eq!(report.mutations, 3);
        assert_eq!(report.change_batches, 1);
        assert_eq!(report.stats.blocks_done, 4);
    }

    #[tokio::test]
    async fn test_marker_cleared_for_unknown_node_does_not_rescan() {
        let (service, _manager, _store) = fixture();
        let dom = html_to_dom("<p>我需要预订机票</p>".as_bytes(), "utf-8").unwrap();
        let (mut controller, notifier) = LiveUpdateController::new(&service, &dom.document);
        controller.start().await;

        notifier.marker_cleared(&paragraph("没有扫描过的段落"));
        assert!(controller.process_pending().await.is_none());
        assert_eq!(controller.report().change_batches, 1);
        assert_eq!(controller.report().passes, 1);
    }
}
