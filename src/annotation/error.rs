//! 标注模块统一错误处理
//!
//! 提供结构化错误类型和错误处理机制。管道内部的失败只会让某个段落或片段
//! 不被标注，不会向宿主页面传播。

use std::fmt;

use thiserror::Error;

/// 标注错误类型
#[derive(Error, Debug, Clone)]
pub enum AnnotationError {
    /// 配置错误
    #[error("配置错误: {0}")]
    ConfigError(String),

    /// 网络错误
    #[error("网络错误: {0}")]
    NetworkError(String),

    /// 翻译或词典服务返回失败
    #[error("服务提供方错误: {0}")]
    ProviderError(String),

    /// 输入验证错误
    #[error("输入无效: {0}")]
    InvalidInput(String),

    /// 目标节点已脱离文档或内容已改变
    #[error("节点已失效: {0}")]
    StaleNode(String),

    /// 超时错误
    #[error("操作超时: {0}")]
    TimeoutError(String),

    /// 解析错误
    #[error("解析错误: {0}")]
    ParseError(String),

    /// 序列化错误
    #[error("序列化错误: {0}")]
    SerializationError(String),

    /// 内部错误
    #[error("内部错误: {0}")]
    InternalError(String),
}

impl AnnotationError {
    /// 检查错误是否可重试
    pub fn is_retryable(&self) -> bool {
        match self {
            AnnotationError::NetworkError(_) => true,
            AnnotationError::TimeoutError(_) => true,
            AnnotationError::ProviderError(_) => true,
            AnnotationError::ConfigError(_) => false,
            AnnotationError::InvalidInput(_) => false,
            AnnotationError::StaleNode(_) => false,
            AnnotationError::ParseError(_) => false,
            AnnotationError::SerializationError(_) => false,
            AnnotationError::InternalError(_) => false,
        }
    }

    /// 获取错误的严重程度
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            AnnotationError::ConfigError(_) => ErrorSeverity::Critical,
            AnnotationError::NetworkError(_) => ErrorSeverity::Warning,
            AnnotationError::ProviderError(_) => ErrorSeverity::Warning,
            AnnotationError::InvalidInput(_) => ErrorSeverity::Info,
            AnnotationError::StaleNode(_) => ErrorSeverity::Info,
            AnnotationError::TimeoutError(_) => ErrorSeverity::Warning,
            AnnotationError::ParseError(_) => ErrorSeverity::Error,
            AnnotationError::SerializationError(_) => ErrorSeverity::Error,
            AnnotationError::InternalError(_) => ErrorSeverity::Critical,
        }
    }

    /// 获取错误类别
    pub fn category(&self) -> ErrorCategory {
        match self {
            AnnotationError::ConfigError(_) => ErrorCategory::Configuration,
            AnnotationError::NetworkError(_) => ErrorCategory::Network,
            AnnotationError::ProviderError(_) => ErrorCategory::Provider,
            AnnotationError::InvalidInput(_) => ErrorCategory::Input,
            AnnotationError::StaleNode(_) => ErrorCategory::Structure,
            AnnotationError::TimeoutError(_) => ErrorCategory::Timeout,
            AnnotationError::ParseError(_) => ErrorCategory::Parsing,
            AnnotationError::SerializationError(_) => ErrorCategory::Serialization,
            AnnotationError::InternalError(_) => ErrorCategory::Internal,
        }
    }

    /// 创建带上下文的错误
    pub fn with_context<T: fmt::Display>(mut self, context: T) -> Self {
        let new_msg = match &self {
            AnnotationError::ConfigError(msg)
            | AnnotationError::NetworkError(msg)
            | AnnotationError::ProviderError(msg)
            | AnnotationError::InvalidInput(msg)
            | AnnotationError::StaleNode(msg)
            | AnnotationError::TimeoutError(msg)
            | AnnotationError::ParseError(msg)
            | AnnotationError::SerializationError(msg)
            | AnnotationError::InternalError(msg) => format!("{} (上下文: {})", msg, context),
        };

        match &mut self {
            AnnotationError::ConfigError(msg)
            | AnnotationError::NetworkError(msg)
            | AnnotationError::ProviderError(msg)
            | AnnotationError::InvalidInput(msg)
            | AnnotationError::StaleNode(msg)
            | AnnotationError::TimeoutError(msg)
            | AnnotationError::ParseError(msg)
            | AnnotationError::SerializationError(msg)
            | AnnotationError::InternalError(msg) => *msg = new_msg,
        }

        self
    }
}

/// 错误严重程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

/// 错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Configuration,
    Network,
    Provider,
    Input,
    Structure,
    Timeout,
    Parsing,
    Serialization,
    Internal,
}

/// 标准错误转换
impl From<std::io::Error> for AnnotationError {
    fn from(error: std::io::Error) -> Self {
        AnnotationError::InternalError(format!("IO错误: {}", error))
    }
}

impl From<serde_json::Error> for AnnotationError {
    fn from(error: serde_json::Error) -> Self {
        AnnotationError::SerializationError(format!("JSON序列化错误: {}", error))
    }
}

impl From<toml::de::Error> for AnnotationError {
    fn from(error: toml::de::Error) -> Self {
        AnnotationError::ParseError(format!("TOML解析错误: {}", error))
    }
}

impl From<tokio::time::error::Elapsed> for AnnotationError {
    fn from(error: tokio::time::error::Elapsed) -> Self {
        AnnotationError::TimeoutError(format!("异步操作超时: {}", error))
    }
}

#[cfg(feature = "deeplx")]
impl From<reqwest::Error> for AnnotationError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            AnnotationError::TimeoutError(format!("请求超时: {}", error))
        } else if error.is_decode() {
            AnnotationError::ProviderError(format!("响应格式错误: {}", error))
        } else {
            AnnotationError::NetworkError(error.to_string())
        }
    }
}

/// 错误结果类型别名
pub type AnnotationResult<T> = Result<T, AnnotationError>;

/// 错误统计信息，由调度器在段落失败、节点失效和词典查询失败时记录
#[derive(Debug, Clone, Default)]
pub struct ErrorStats {
    pub total_errors: usize,
    pub by_category: std::collections::HashMap<ErrorCategory, usize>,
    pub by_severity: std::collections::HashMap<ErrorSeverity, usize>,
    pub retryable_errors: usize,
    pub critical_errors: usize,
}

impl ErrorStats {
    /// 记录错误
    pub fn record_error(&mut self, error: &AnnotationError) {
        self.total_errors += 1;

        let category = error.category();
        *self.by_category.entry(category).or_insert(0) += 1;

        let severity = error.severity();
        *self.by_severity.entry(severity).or_insert(0) += 1;

        if error.is_retryable() {
            self.retryable_errors += 1;
        }

        if severity == ErrorSeverity::Critical {
            self.critical_errors += 1;
        }
    }

    /// 按类别取计数
    pub fn count(&self, category: ErrorCategory) -> usize {
        self.by_category.get(&category).copied().unwrap_or(0)
    }

    /// 获取错误率
    pub fn error_rate(&self, total_operations: usize) -> f64 {
        if total_operations == 0 {
            0.0
        } else {
            self.total_errors as f64 / total_operations as f64
        }
    }
}

/// 错误处理助手函数
pub mod helpers {
    use super::*;

    /// 按严重程度记录错误，不改变控制流
    pub fn log_error(error: &AnnotationError) {
        match error.severity() {
            ErrorSeverity::Info => tracing::debug!("标注信息: {}", error),
            ErrorSeverity::Warning => tracing::warn!("标注警告: {}", error),
            ErrorSeverity::Error => tracing::error!("标注错误: {}", error),
            ErrorSeverity::Critical => tracing::error!("标注严重错误: {}", error),
        }
    }

    /// 创建服务提供方错误
    pub fn provider_error<T: fmt::Display>(msg: T) -> AnnotationError {
        AnnotationError::ProviderError(msg.to_string())
    }

    /// 创建配置错误
    pub fn config_error<T: fmt::Display>(msg: T) -> AnnotationError {
        AnnotationError::ConfigError(msg.to_string())
    }

    /// 创建输入验证错误
    pub fn validation_error<T: fmt::Display>(msg: T) -> AnnotationError {
        AnnotationError::InvalidInput(msg.to_string())
    }

    /// 创建节点失效错误
    pub fn stale_node<T: fmt::Display>(msg: T) -> AnnotationError {
        AnnotationError::StaleNode(msg.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_failure_is_retryable_warning() {
        let error = helpers::provider_error("502");
        assert!(error.is_retryable());
        assert_eq!(error.severity(), ErrorSeverity::Warning);
        assert_eq!(error.category(), ErrorCategory::Provider);
    }

    #[test]
    fn test_with_context_appends() {
        let error = helpers::stale_node("text changed").with_context("block 3");
        assert_eq!(error.to_string(), "节点已失效: text changed (上下文: block 3)");
    }

    #[test]
    fn test_error_stats_record() {
        let mut stats = ErrorStats::default();
        stats.record_error(&helpers::provider_error("a"));
        stats.record_error(&helpers::config_error("b"));
        assert_eq!(stats.total_errors, 2);
        assert_eq!(stats.retryable_errors, 1);
        assert_eq!(stats.critical_errors, 1);
        assert_eq!(stats.count(ErrorCategory::Provider), 1);
        assert_eq!(stats.count(ErrorCategory::Structure), 0);
        assert_eq!(stats.error_rate(4), 0.5);
    }
}
