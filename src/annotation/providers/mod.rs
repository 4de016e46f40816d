//! 翻译与词典服务
//!
//! 管道只依赖两个能力接口：`translate(text, target) -> text` 和
//! `lookup(word) -> [MeaningCard]`。具体服务按 id 注册到 [`ProviderRegistry`]，
//! 当前生效的服务是配置里按偏好顺序第一个启用且已注册的那个。

use std::collections::HashMap;
use std::rc::Rc;

use futures::future::LocalBoxFuture;

use crate::annotation::config::AnnotationConfig;
use crate::annotation::error::AnnotationResult;
use crate::annotation::storage::TranslationCache;
use crate::annotation::vocabulary::MeaningCard;

#[cfg(feature = "deeplx")]
pub mod deeplx;
pub mod memory;

#[cfg(feature = "deeplx")]
pub use deeplx::DeeplxProvider;
pub use memory::MemoryProvider;

/// 机器翻译能力
pub trait TranslationProvider {
    fn id(&self) -> &str;

    fn translate<'a>(
        &'a self,
        text: &'a str,
        target_lang: &'a str,
    ) -> LocalBoxFuture<'a, AnnotationResult<String>>;
}

/// 词典查询能力，返回的卡片在交给匹配器前统一归一化
pub trait DictionaryProvider {
    fn id(&self) -> &str;

    fn lookup<'a>(&'a self, word: &'a str) -> LocalBoxFuture<'a, AnnotationResult<Vec<MeaningCard>>>;
}

/// 带缓存的翻译服务包装
pub struct CachedProvider {
    inner: Rc<dyn TranslationProvider>,
    cache: Rc<TranslationCache>,
}

impl CachedProvider {
    pub fn new(inner: Rc<dyn TranslationProvider>, cache: Rc<TranslationCache>) -> Self {
        Self { inner, cache }
    }
}

impl TranslationProvider for CachedProvider {
    fn id(&self) -> &str {
        self.inner.id()
    }

    fn translate<'a>(
        &'a self,
        text: &'a str,
        target_lang: &'a str,
    ) -> LocalBoxFuture<'a, AnnotationResult<String>> {
        Box::pin(async move {
            let key = TranslationCache::cache_key(self.inner.id(), target_lang, text);
            if let Some(hit) = self.cache.get(&key) {
                tracing::trace!("翻译缓存命中: {}", self.inner.id());
                return Ok(hit);
            }

            let translated = self.inner.translate(text, target_lang).await?;
            self.cache.insert(key, translated.clone());
            Ok(translated)
        })
    }
}

/// 服务注册表
#[derive(Default)]
pub struct ProviderRegistry {
    translators: HashMap<String, Rc<dyn TranslationProvider>>,
    dictionary: Option<Rc<dyn DictionaryProvider>>,
    cache: Option<Rc<TranslationCache>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 按配置创建注册表：启用缓存并注册配置里带地址的网络服务
    pub fn from_config(config: &AnnotationConfig) -> AnnotationResult<Self> {
        let mut registry = Self::new();
        if config.cache_enabled {
            registry.cache = Some(Rc::new(TranslationCache::new(config.cache_size)));
        }

        #[cfg(feature = "deeplx")]
        {
            if let Some(settings) = config.provider("deeplx") {
                if let Some(url) = &settings.api_url {
                    let provider = DeeplxProvider::new(
                        url,
                        settings.api_key.clone(),
                        config.request_timeout(),
                    )?;
                    registry.register(Rc::new(provider));
                }
            }
        }

        Ok(registry)
    }

    /// 注册翻译服务，同 id 的旧服务被替换；启用缓存时自动包装
    pub fn register(&mut self, provider: Rc<dyn TranslationProvider>) {
        let id = provider.id().to_string();
        let provider: Rc<dyn TranslationProvider> = match &self.cache {
            Some(cache) => Rc::new(CachedProvider::new(provider, cache.clone())),
            None => provider,
        };
        tracing::debug!("注册翻译服务: {}", id);
        self.translators.insert(id, provider);
    }

    /// 注册词典服务
    pub fn register_dictionary(&mut self, provider: Rc<dyn DictionaryProvider>) {
        tracing::debug!("注册词典服务: {}", provider.id());
        self.dictionary = Some(provider);
    }

    pub fn get(&self, id: &str) -> Option<Rc<dyn TranslationProvider>> {
        self.translators.get(id).cloned()
    }

    /// 当前生效的翻译服务：配置顺序中第一个启用且已注册的
    pub fn active(&self, config: &AnnotationConfig) -> Option<Rc<dyn TranslationProvider>> {
        config
            .providers
            .iter()
            .filter(|settings| settings.enabled)
            .find_map(|settings| self.get(&settings.id))
    }

    pub fn dictionary(&self) -> Option<Rc<dyn DictionaryProvider>> {
        self.dictionary.clone()
    }

    pub fn cache(&self) -> Option<&TranslationCache> {
        self.cache.as_deref()
    }

    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.translators.keys().cloned().collect();
        ids.sort();
        ids
    }
}
