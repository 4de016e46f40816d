//! 生词标注模块
//!
//! 在 HTML 文档中找出可标注的中文段落，批量翻译后把译文与个人词库比对，
//! 将命中的中文片段就地替换为“目标语言单词 + 原文”的标注单元。
//!
//! ## 处理流程
//!
//! ```text
//! DocumentScanner ──> TranslationScheduler ──> segment / align
//!                                                   │
//!          render::apply_spans <── resolve_spans <── LexicalMatcher / SimilarityMatcher
//! ```
//!
//! 整个管道运行在单线程事件循环上：节点是 `Rc` 句柄，翻译服务返回
//! `LocalBoxFuture`，配置与词库通过 `watch` 通道以不可变快照发布。
//!
//! ## 使用示例
//!
//! ```rust,no_run
//! use vocabmark::annotation::{
//!     AnnotationService, ConfigManager, ProviderRegistry, VocabularyStore,
//! };
//! use vocabmark::html::html_to_dom;
//!
//! # async fn run() -> vocabmark::annotation::AnnotationResult<()> {
//! let manager = ConfigManager::new()?;
//! let vocabulary = VocabularyStore::load_json("vocab.json".as_ref())?;
//! let registry = ProviderRegistry::from_config(&manager.snapshot())?;
//! let service = AnnotationService::from_parts(&manager, &vocabulary, registry);
//!
//! let dom = html_to_dom(b"<p>I need to book a flight</p>", "utf-8")?;
//! let report = service.annotate_document(&dom).await;
//! println!("标注了 {} 个片段", report.stats.spans_applied);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod matching;
pub mod pipeline;
pub mod providers;
pub mod render;
pub mod storage;
pub mod text;
pub mod vocabulary;

// 重新导出主要类型
pub use config::{AnnotationConfig, ConfigManager, DomainPolicy, ScanRoot};
pub use self::core::{
    AnnotationService, LiveUpdateController, MutationNotifier, PassReport, TreeMutation,
    WatchReport,
};
pub use error::{AnnotationError, AnnotationResult, ErrorCategory, ErrorSeverity, ErrorStats};
pub use matching::{CandidateSpan, ResolvedSpan};
pub use pipeline::{BlockState, ScanSession, SchedulerStats};
pub use providers::{DictionaryProvider, ProviderRegistry, TranslationProvider};
pub use vocabulary::{Category, MeaningCard, VocabularyEntry, VocabularySnapshot, VocabularyStore};

#[cfg(feature = "deeplx")]
pub use providers::deeplx::DeeplxProvider;
pub use providers::memory::MemoryProvider;
