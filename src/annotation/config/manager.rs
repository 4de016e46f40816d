//! 配置管理器
//!
//! 提供统一的配置接口，支持文件配置、环境变量和默认值。配置以不可变快照的形式
//! 通过单写者通道发布，读者总能拿到最近一次完整提交的配置。

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use super::constants;
use super::policy::DomainPolicy;
use super::style::{CategoryStyles, OriginalTextDisplay};
use crate::annotation::error::{AnnotationError, AnnotationResult};

/// 扫描根节点
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScanRoot {
    /// 整个文档
    #[default]
    Document,
    /// 启发式选出的正文容器
    MainContent,
}

/// 单个翻译服务的设置，列表顺序即用户偏好顺序
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ProviderSettings {
    pub id: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
}

fn default_true() -> bool {
    true
}

impl ProviderSettings {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            enabled: true,
            api_url: None,
            api_key: None,
        }
    }
}

/// 标注管道配置
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct AnnotationConfig {
    // 基础配置
    pub enabled: bool,
    pub target_lang: String,
    pub scan_root: ScanRoot,
    pub aggressive: bool,

    // 调度配置
    pub batch_size: usize,
    pub max_in_flight: usize,
    pub request_timeout_secs: u64,
    pub sentence_separator: String,

    // 匹配配置
    pub similarity_threshold: f64,

    // 服务与显示
    pub providers: Vec<ProviderSettings>,
    pub styles: CategoryStyles,
    pub display: OriginalTextDisplay,

    // 缓存配置
    pub cache_enabled: bool,
    pub cache_size: usize,

    // 站点策略
    pub domains: DomainPolicy,
}

impl Default for AnnotationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            target_lang: constants::DEFAULT_TARGET_LANG.to_string(),
            scan_root: ScanRoot::Document,
            aggressive: false,

            batch_size: constants::DEFAULT_BATCH_SIZE,
            max_in_flight: constants::DEFAULT_MAX_IN_FLIGHT,
            request_timeout_secs: constants::DEFAULT_REQUEST_TIMEOUT.as_secs(),
            sentence_separator: constants::SENTENCE_SEPARATOR.to_string(),

            similarity_threshold: constants::SIMILARITY_THRESHOLD,

            providers: vec![
                ProviderSettings::new("memory"),
                ProviderSettings {
                    api_url: Some(constants::DEFAULT_DEEPLX_URL.to_string()),
                    ..ProviderSettings::new("deeplx")
                },
            ],
            styles: CategoryStyles::default(),
            display: OriginalTextDisplay::default(),

            cache_enabled: true,
            cache_size: constants::DEFAULT_CACHE_SIZE,

            domains: DomainPolicy::default(),
        }
    }
}

impl AnnotationConfig {
    /// 验证配置
    pub fn validate(&self) -> AnnotationResult<()> {
        if self.batch_size == 0 {
            return Err(AnnotationError::ConfigError("批次大小不能为0".to_string()));
        }

        if self.max_in_flight == 0 {
            return Err(AnnotationError::ConfigError("在途请求上限不能为0".to_string()));
        }

        if self.request_timeout_secs == 0 {
            return Err(AnnotationError::ConfigError("请求超时必须大于0秒".to_string()));
        }

        if !(self.similarity_threshold > 0.0 && self.similarity_threshold <= 1.0) {
            return Err(AnnotationError::ConfigError(format!(
                "相似度阈值必须在 (0, 1] 之间: {}",
                self.similarity_threshold
            )));
        }

        if self.sentence_separator.is_empty() {
            return Err(AnnotationError::ConfigError("句子分隔符不能为空".to_string()));
        }

        if self.cache_enabled && self.cache_size == 0 {
            return Err(AnnotationError::ConfigError(
                "启用缓存时缓存大小不能为0".to_string(),
            ));
        }

        if self.providers.iter().any(|p| p.id.trim().is_empty()) {
            return Err(AnnotationError::ConfigError("翻译服务 id 不能为空".to_string()));
        }

        Ok(())
    }

    /// 应用环境变量覆盖，只处理显式设置的变量
    pub fn apply_env_overrides(&mut self) {
        use crate::env::{annotation, cache, EnvVar};

        fn take<T>(name: &str, value: Option<crate::env::EnvResult<T>>) -> Option<T> {
            match value? {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::warn!("忽略无效的环境变量 {}: {}", name, e);
                    None
                }
            }
        }

        if let Some(enabled) = take(annotation::Enabled::NAME, annotation::Enabled::get_explicit())
        {
            self.enabled = enabled;
        }

        if let Some(lang) = take(
            annotation::TargetLang::NAME,
            annotation::TargetLang::get_explicit(),
        ) {
            self.target_lang = lang;
        }

        if let Some(aggressive) = take(
            annotation::Aggressive::NAME,
            annotation::Aggressive::get_explicit(),
        ) {
            self.aggressive = aggressive;
        }

        if let Some(root) = take(annotation::ScanRoot::NAME, annotation::ScanRoot::get_explicit())
        {
            self.scan_root = if root == "main_content" {
                ScanRoot::MainContent
            } else {
                ScanRoot::Document
            };
        }

        if let Some(size) = take(
            annotation::BatchSize::NAME,
            annotation::BatchSize::get_explicit(),
        ) {
            self.batch_size = size;
        }

        if let Some(limit) = take(
            annotation::MaxInFlight::NAME,
            annotation::MaxInFlight::get_explicit(),
        ) {
            self.max_in_flight = limit;
        }

        if let Some(timeout) = take(
            annotation::RequestTimeout::NAME,
            annotation::RequestTimeout::get_explicit(),
        ) {
            self.request_timeout_secs = timeout.as_secs();
        }

        if let Some(url) = take(
            annotation::DeeplxUrl::NAME,
            annotation::DeeplxUrl::get_explicit(),
        ) {
            tracing::info!("环境变量覆盖 DeepLX URL: {}", url);
            match self.providers.iter_mut().find(|p| p.id == "deeplx") {
                Some(provider) => provider.api_url = Some(url),
                None => self.providers.push(ProviderSettings {
                    api_url: Some(url),
                    ..ProviderSettings::new("deeplx")
                }),
            }
        }

        // 缓存相关环境变量
        if let Some(enabled) = take(cache::Enabled::NAME, cache::Enabled::get_explicit()) {
            self.cache_enabled = enabled;
        }

        if let Some(size) = take(cache::Size::NAME, cache::Size::get_explicit()) {
            self.cache_size = size;
        }
    }

    /// 查找服务设置
    pub fn provider(&self, id: &str) -> Option<&ProviderSettings> {
        self.providers.iter().find(|p| p.id == id)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// 从指定文件加载配置（TOML 或 JSON）
    pub fn load_from_file(path: &Path) -> AnnotationResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AnnotationError::ConfigError(format!("读取配置文件失败 {}: {}", path.display(), e))
        })?;

        if path.extension().and_then(|e| e.to_str()) == Some("json") {
            serde_json::from_str(&content)
                .map_err(|e| AnnotationError::ConfigError(format!("解析JSON配置失败: {}", e)))
        } else {
            toml::from_str(&content)
                .map_err(|e| AnnotationError::ConfigError(format!("解析TOML配置失败: {}", e)))
        }
    }
}

/// 配置管理器
///
/// 持有唯一的写端；`subscribe()` 返回的读端总能看到最近一次提交的快照。
pub struct ConfigManager {
    sender: watch::Sender<Arc<AnnotationConfig>>,
    config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// 按搜索路径发现配置文件并创建管理器
    pub fn new() -> AnnotationResult<Self> {
        Self::load_dotenv();

        match Self::discover_config_path() {
            Some(path) => Self::from_path(&path),
            None => {
                tracing::info!("未找到配置文件，使用默认配置");
                let mut config = AnnotationConfig::default();
                config.apply_env_overrides();
                Self::with_config(config)
            }
        }
    }

    /// 从指定文件创建管理器
    pub fn from_path(path: &Path) -> AnnotationResult<Self> {
        tracing::info!("加载配置文件: {}", path.display());
        let mut config = AnnotationConfig::load_from_file(path)?;
        config.apply_env_overrides();
        let mut manager = Self::with_config(config)?;
        manager.config_path = Some(path.to_path_buf());
        Ok(manager)
    }

    /// 使用给定配置创建管理器（不读取文件和环境变量）
    pub fn with_config(config: AnnotationConfig) -> AnnotationResult<Self> {
        config.validate()?;
        let (sender, _) = watch::channel(Arc::new(config));
        Ok(Self {
            sender,
            config_path: None,
        })
    }

    /// 当前快照
    pub fn snapshot(&self) -> Arc<AnnotationConfig> {
        self.sender.borrow().clone()
    }

    /// 订阅配置变更
    pub fn subscribe(&self) -> watch::Receiver<Arc<AnnotationConfig>> {
        self.sender.subscribe()
    }

    /// 发布新配置；验证失败时保留旧快照
    pub fn update(&self, config: AnnotationConfig) -> AnnotationResult<()> {
        config.validate()?;
        self.sender.send_replace(Arc::new(config));
        tracing::debug!("配置快照已更新");
        Ok(())
    }

    /// 重新读取配置文件
    pub fn reload(&self) -> AnnotationResult<()> {
        let Some(path) = &self.config_path else {
            return Err(AnnotationError::ConfigError(
                "没有关联的配置文件，无法重新加载".to_string(),
            ));
        };
        let mut config = AnnotationConfig::load_from_file(path)?;
        config.apply_env_overrides();
        self.update(config)
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    fn discover_config_path() -> Option<PathBuf> {
        constants::CONFIG_PATHS.iter().find_map(|path| {
            let expanded = shellexpand::tilde(path);
            let candidate = PathBuf::from(expanded.as_ref());
            candidate.exists().then_some(candidate)
        })
    }

    /// 加载 .env 文件
    fn load_dotenv() {
        let env_files = [".env.local", ".env"];

        for env_file in &env_files {
            if Path::new(env_file).exists() && dotenv::from_filename(env_file).is_ok() {
                tracing::info!("已加载环境变量文件: {}", env_file);
                break;
            }
        }
    }

    /// 生成示例配置文件
    pub fn generate_example_config(path: &Path) -> AnnotationResult<()> {
        let config = AnnotationConfig::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| AnnotationError::ConfigError(format!("序列化配置失败: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| AnnotationError::ConfigError(format!("写入配置文件失败: {}", e)))?;

        Ok(())
    }
}
