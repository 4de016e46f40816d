//! 翻译缓存模块
//!
//! 进程内 LRU 缓存。键由服务 id、目标语言与原文的 blake3 摘要组成，
//! 避免长段落直接作为键。单线程使用，内部可变性用 `RefCell`。

use std::cell::RefCell;
use std::num::NonZeroUsize;

use lru::LruCache;

use crate::annotation::config::constants;

/// 缓存统计信息
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub total_requests: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub total_entries: usize,
}

impl CacheStats {
    /// 命中率
    pub fn hit_rate(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.cache_hits as f64 / self.total_requests as f64
        }
    }
}

/// 翻译缓存
pub struct TranslationCache {
    entries: RefCell<LruCache<String, String>>,
    stats: RefCell<CacheStats>,
}

impl Default for TranslationCache {
    fn default() -> Self {
        Self::new(constants::DEFAULT_CACHE_SIZE)
    }
}

impl TranslationCache {
    /// 创建指定容量的缓存，容量为 0 时按 1 处理
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: RefCell::new(LruCache::new(capacity)),
            stats: RefCell::new(CacheStats::default()),
        }
    }

    /// 生成缓存键
    pub fn cache_key(provider_id: &str, target_lang: &str, text: &str) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(provider_id.as_bytes());
        hasher.update(&[0]);
        hasher.update(target_lang.as_bytes());
        hasher.update(&[0]);
        hasher.update(text.as_bytes());
        hasher.finalize().to_hex().to_string()
    }

    /// 获取缓存条目
    pub fn get(&self, key: &str) -> Option<String> {
        let value = self.entries.borrow_mut().get(key).cloned();
        let mut stats = self.stats.borrow_mut();
        stats.total_requests += 1;
        if value.is_some() {
            stats.cache_hits += 1;
        } else {
            stats.cache_misses += 1;
        }
        value
    }

    /// 插入缓存条目
    pub fn insert(&self, key: String, translated: String) {
        self.entries.borrow_mut().put(key, translated);
    }

    /// 清空缓存
    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
        tracing::debug!("翻译缓存已清空");
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// 获取统计信息
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            total_entries: self.len(),
            ..*self.stats.borrow()
        }
    }
}
