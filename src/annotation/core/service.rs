//! 标注服务核心实现
//!
//! 把配置快照、词库快照、服务注册表、扫描会话和调度器组合在一起，
//! 对外提供 “扫描一遍并标注” 的单一入口。
//!
//! ## 使用示例
//!
//! ```rust,no_run
//! use vocabmark::annotation::{AnnotationService, ConfigManager, ProviderRegistry, VocabularyStore};
//!
//! # async fn run(dom: markup5ever_rcdom::RcDom) -> vocabmark::annotation::AnnotationResult<()> {
//! let manager = ConfigManager::new()?;
//! let store = VocabularyStore::new(Vec::new());
//! let registry = ProviderRegistry::from_config(&manager.snapshot())?;
//! let service = AnnotationService::from_parts(&manager, &store, registry);
//!
//! let report = service.annotate_document(&dom).await;
//! println!("新段落 {} 个，完成 {} 个", report.blocks_found, report.stats.blocks_done);
//! # Ok(())
//! # }
//! ```

use std::cell::RefCell;
use std::sync::Arc;
use std::time::{Duration, Instant};

use markup5ever_rcdom::{Handle, RcDom};
use tokio::sync::watch;

use crate::annotation::config::{AnnotationConfig, ConfigManager};
use crate::annotation::error::ErrorStats;
use crate::annotation::pipeline::{
    BlockState, DocumentScanner, PassContext, ScanSession, SchedulerStats, TranslationScheduler,
};
use crate::annotation::providers::ProviderRegistry;
use crate::annotation::render::inject_stylesheet;
use crate::annotation::vocabulary::{VocabularySnapshot, VocabularyStore};

/// 单次扫描的结果
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct PassReport {
    /// 管道被配置关闭，本次什么都没做
    pub disabled: bool,
    /// 本次扫描新发现的段落
    pub blocks_found: usize,
    /// 本次调度统计增量
    pub stats: SchedulerStats,
    pub elapsed: Duration,
}

/// 健康状态级别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthLevel {
    Healthy,
    /// 能运行但不会产生标注
    Degraded,
    Unhealthy,
}

/// 服务健康状态
#[derive(Debug, Clone)]
pub struct HealthStatus {
    pub level: HealthLevel,
    pub active_provider: Option<String>,
    pub vocabulary_size: usize,
    pub pending_blocks: usize,
    pub done_blocks: usize,
    /// 调度过程中累计的错误
    pub errors: ErrorStats,
    pub issues: Vec<String>,
}

/// 标注服务
pub struct AnnotationService {
    config: watch::Receiver<Arc<AnnotationConfig>>,
    vocabulary: watch::Receiver<Arc<VocabularySnapshot>>,
    registry: ProviderRegistry,
    session: RefCell<ScanSession>,
    scheduler: TranslationScheduler,
}

impl AnnotationService {
    /// 使用配置和词库的读端创建服务
    pub fn new(
        config: watch::Receiver<Arc<AnnotationConfig>>,
        vocabulary: watch::Receiver<Arc<VocabularySnapshot>>,
        registry: ProviderRegistry,
    ) -> Self {
        Self {
            config,
            vocabulary,
            registry,
            session: RefCell::new(ScanSession::new()),
            scheduler: TranslationScheduler::new(),
        }
    }

    /// 订阅配置管理器和词库存储
    pub fn from_parts(
        config: &ConfigManager,
        vocabulary: &VocabularyStore,
        registry: ProviderRegistry,
    ) -> Self {
        Self::new(config.subscribe(), vocabulary.subscribe(), registry)
    }

    /// 扫描 `root` 下的新段落并排空调度队列
    pub async fn run_pass(&self, root: &Handle) -> PassReport {
        let start = Instant::now();
        let config = self.config.borrow().clone();
        if !config.enabled {
            tracing::debug!("标注已关闭，跳过本次扫描");
            return PassReport {
                disabled: true,
                ..PassReport::default()
            };
        }

        let blocks = {
            let mut session = self.session.borrow_mut();
            session.prune();
            DocumentScanner::new(config.scan_root).scan(root, &mut session)
        };
        let blocks_found = blocks.len();

        let before = self.scheduler.stats();
        self.scheduler.enqueue(blocks);
        let ctx = PassContext {
            root,
            session: &self.session,
            registry: &self.registry,
            config: &self.config,
            vocabulary: &self.vocabulary,
        };
        let stats = self.scheduler.drain(&ctx).await.since(&before);

        let report = PassReport {
            disabled: false,
            blocks_found,
            stats,
            elapsed: start.elapsed(),
        };
        if blocks_found > 0 {
            tracing::info!(
                "扫描完成: 新段落 {}，完成 {}，失败 {}，标注 {} 处，用时 {:?}",
                blocks_found,
                stats.blocks_done,
                stats.blocks_failed,
                stats.spans_applied,
                report.elapsed
            );
        }
        report
    }

    /// 注入交互样式并对整个文档跑一遍
    pub async fn annotate_document(&self, dom: &RcDom) -> PassReport {
        if self.config.borrow().enabled && inject_stylesheet(&dom.document) {
            tracing::debug!("已注入标注样式表");
        }
        self.run_pass(&dom.document).await
    }

    /// 外部清除段落标记，下次扫描时重新处理
    pub fn clear_marker(&self, node: &Handle) -> bool {
        self.session.borrow_mut().clear(node)
    }

    pub fn block_state(&self, node: &Handle) -> BlockState {
        self.session.borrow().state(node)
    }

    pub fn config(&self) -> Arc<AnnotationConfig> {
        self.config.borrow().clone()
    }

    pub fn vocabulary(&self) -> Arc<VocabularySnapshot> {
        self.vocabulary.borrow().clone()
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// 累计调度统计
    pub fn stats(&self) -> SchedulerStats {
        self.scheduler.stats()
    }

    pub fn errors(&self) -> ErrorStats {
        self.scheduler.errors()
    }

    /// 检查服务是否能产生标注
    pub fn health(&self) -> HealthStatus {
        let config = self.config();
        let vocabulary_size = self.vocabulary.borrow().len();
        let active_provider = self.registry.active(&config).map(|p| p.id().to_string());
        let session = self.session.borrow();

        let mut issues = Vec::new();
        if !config.enabled {
            issues.push("标注已在配置中关闭".to_string());
        }
        if active_provider.is_none() {
            issues.push("没有启用且已注册的翻译服务".to_string());
        }
        if vocabulary_size == 0 {
            issues.push("词库为空".to_string());
        }

        let stats = self.scheduler.stats();
        let errors = self.scheduler.errors();
        let operations =
            stats.blocks_done + stats.blocks_failed + stats.blocks_stale + stats.dictionary_lookups;
        let error_rate = errors.error_rate(operations);
        if errors.total_errors > 0 {
            tracing::debug!(
                "累计错误 {} 个，错误率 {:.1}%",
                errors.total_errors,
                error_rate * 100.0
            );
        }

        let level = if active_provider.is_none() && config.enabled {
            HealthLevel::Unhealthy
        } else if !issues.is_empty() || error_rate >= 0.5 {
            HealthLevel::Degraded
        } else {
            HealthLevel::Healthy
        };

        HealthStatus {
            level,
            active_provider,
            vocabulary_size,
            pending_blocks: session.count(BlockState::Pending),
            done_blocks: session.count(BlockState::Done),
            errors,
            issues,
        }
    }
}
