//! 标注系统核心模块
//!
//! - **服务层** (`service.rs`): 组合扫描、调度与快照，提供单次扫描入口
//! - **增量更新** (`watcher.rs`): 接收文档变更通知并触发重新扫描
//!
//! ```text
//! AnnotationService (service.rs)
//!     ├── DocumentScanner (pipeline/scanner.rs)
//!     ├── TranslationScheduler (pipeline/scheduler.rs)
//!     │       ├── LexicalMatcher / SimilarityMatcher (matching/)
//!     │       └── apply_spans (render.rs)
//!     └── ProviderRegistry (providers/)
//! LiveUpdateController (watcher.rs) ──> AnnotationService::run_pass
//! ```

pub mod service;
pub mod watcher;

/// 标注服务 - 主要的对外接口
pub use service::AnnotationService;

/// 单次扫描结果与健康状态
pub use service::{HealthLevel, HealthStatus, PassReport};

/// 增量更新控制器及其通知类型
pub use watcher::{LiveUpdateController, MutationNotifier, TreeMutation, WatchReport};
