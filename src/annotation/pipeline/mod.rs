//! 标注管道模块 - 扫描、过滤与翻译调度
pub mod filters;
pub mod scanner;
pub mod scheduler;

pub use filters::{BlockFilter, Rejection};
pub use scanner::{extract_text, node_key, BlockState, ContentBlock, DocumentScanner, NodeKey, ScanSession};
pub use scheduler::{PassContext, SchedulerStats, TranslationScheduler};
