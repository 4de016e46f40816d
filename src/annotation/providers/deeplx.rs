//! DeepLX 兼容的 HTTP 翻译服务

use std::time::Duration;

use futures::future::LocalBoxFuture;
use serde::{Deserialize, Serialize};

use super::TranslationProvider;
use crate::annotation::error::{helpers, AnnotationError, AnnotationResult};

/// DeepLX 请求体
#[derive(Debug, Serialize)]
pub struct DeepLXRequest<'a> {
    pub text: &'a str,
    pub source_lang: &'a str,
    pub target_lang: String,
}

/// DeepLX 响应体
#[derive(Debug, Deserialize)]
pub struct DeepLXResponse {
    pub code: i32,
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl DeepLXResponse {
    /// 取出译文；非 200 或缺少 data 视为服务失败
    pub fn into_text(self) -> AnnotationResult<String> {
        if self.code != 200 {
            return Err(helpers::provider_error(format!(
                "DeepLX 返回状态码 {}: {}",
                self.code,
                self.message.unwrap_or_default()
            )));
        }
        self.data
            .ok_or_else(|| helpers::provider_error("DeepLX 响应缺少 data 字段"))
    }
}

pub struct DeeplxProvider {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
}

impl DeeplxProvider {
    pub fn new(api_url: &str, api_key: Option<String>, timeout: Duration) -> AnnotationResult<Self> {
        if api_url.trim().is_empty() {
            return Err(AnnotationError::ConfigError("DeepLX 地址不能为空".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AnnotationError::ConfigError(format!("创建HTTP客户端失败: {}", e)))?;

        Ok(Self {
            client,
            api_url: api_url.to_string(),
            api_key,
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }
}

impl TranslationProvider for DeeplxProvider {
    fn id(&self) -> &str {
        "deeplx"
    }

    fn translate<'a>(
        &'a self,
        text: &'a str,
        target_lang: &'a str,
    ) -> LocalBoxFuture<'a, AnnotationResult<String>> {
        Box::pin(async move {
            let body = DeepLXRequest {
                text,
                source_lang: "ZH",
                target_lang: target_lang.to_uppercase(),
            };

            let mut request = self.client.post(&self.api_url).json(&body);
            if let Some(key) = &self.api_key {
                request = request.bearer_auth(key);
            }

            let response = request.send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(helpers::provider_error(format!(
                    "DeepLX HTTP 状态 {}",
                    status
                )));
            }

            let payload: DeepLXResponse = response.json().await?;
            tracing::trace!("DeepLX 翻译完成: {} 字符", text.chars().count());
            payload.into_text()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_parsing() {
        let ok: DeepLXResponse = serde_json::from_str(r#"{"code": 200, "data": "I like reading"}"#).unwrap();
        assert_eq!(ok.into_text().unwrap(), "I like reading");

        let failed: DeepLXResponse =
            serde_json::from_str(r#"{"code": 429, "message": "too many requests"}"#).unwrap();
        let error = failed.into_text().unwrap_err();
        assert!(matches!(error, AnnotationError::ProviderError(_)));
        assert!(error.to_string().contains("429"));
    }

    #[test]
    fn test_request_body_shape() {
        let body = DeepLXRequest {
            text: "我喜欢阅读",
            source_lang: "ZH",
            target_lang: "en".to_uppercase(),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["target_lang"], "EN");
        assert_eq!(json["text"], "我喜欢阅读");
    }

    #[test]
    fn test_empty_url_rejected() {
        assert!(DeeplxProvider::new(" ", None, Duration::from_secs(1)).is_err());
    }
}
