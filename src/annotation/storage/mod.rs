//! 存储管理模块
pub mod cache;

pub use cache::{CacheStats, TranslationCache};
