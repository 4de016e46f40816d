//! 离线内存服务
//!
//! 从 JSON 文件读取预先准备好的译文和词典卡片，适合离线处理和测试。
//! 文件格式：
//!
//! ```json
//! {
//!   "translations": { "我喜欢阅读。": "I like reading." },
//!   "cards": { "book": [{ "kind": "dictionary", "headword": "book", "senses": ["书；预订"] }] }
//! }
//! ```

use std::collections::HashMap;
use std::path::Path;

use futures::future::LocalBoxFuture;
use serde::Deserialize;

use super::{DictionaryProvider, TranslationProvider};
use crate::annotation::error::{AnnotationError, AnnotationResult};
use crate::annotation::vocabulary::MeaningCard;

#[derive(Debug, Default, Deserialize)]
struct MemoryFile {
    #[serde(default)]
    translations: HashMap<String, String>,
    #[serde(default)]
    cards: HashMap<String, Vec<MeaningCard>>,
}

/// 内存翻译与词典服务
#[derive(Debug, Default, Clone)]
pub struct MemoryProvider {
    translations: HashMap<String, String>,
    cards: HashMap<String, Vec<MeaningCard>>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从 JSON 文件加载
    pub fn load_json(path: &Path) -> AnnotationResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AnnotationError::InvalidInput(format!("读取离线译文失败 {}: {}", path.display(), e))
        })?;
        let file: MemoryFile = serde_json::from_str(&content)?;
        tracing::info!(
            "已加载离线译文 {} 条，词典卡片 {} 组",
            file.translations.len(),
            file.cards.len()
        );
        Ok(Self {
            translations: file.translations,
            cards: file.cards,
        })
    }

    pub fn with_translation(mut self, source: &str, translated: &str) -> Self {
        self.translations
            .insert(source.trim().to_string(), translated.to_string());
        self
    }

    pub fn with_cards(mut self, word: &str, cards: Vec<MeaningCard>) -> Self {
        self.cards.insert(word.trim().to_lowercase(), cards);
        self
    }

    /// 整段查找不到时按行逐句查找，没有译文的句子译为空串
    fn lookup_translation(&self, text: &str) -> String {
        if let Some(hit) = self.translations.get(text.trim()) {
            return hit.clone();
        }

        text.split('\n')
            .map(|line| {
                self.translations
                    .get(line.trim())
                    .map(String::as_str)
                    .unwrap_or_default()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl TranslationProvider for MemoryProvider {
    fn id(&self) -> &str {
        "memory"
    }

    fn translate<'a>(
        &'a self,
        text: &'a str,
        _target_lang: &'a str,
    ) -> LocalBoxFuture<'a, AnnotationResult<String>> {
        Box::pin(async move { Ok(self.lookup_translation(text)) })
    }
}

impl DictionaryProvider for MemoryProvider {
    fn id(&self) -> &str {
        "memory"
    }

    fn lookup<'a>(&'a self, word: &'a str) -> LocalBoxFuture<'a, AnnotationResult<Vec<MeaningCard>>> {
        Box::pin(async move {
            Ok(self
                .cards
                .get(&word.trim().to_lowercase())
                .cloned()
                .unwrap_or_default())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_whole_text_and_per_line_lookup() {
        let provider = MemoryProvider::new()
            .with_translation("我喜欢阅读。", "I like reading.")
            .with_translation("我需要预订机票。", "I need to book a flight.");

        let whole = TranslationProvider::translate(&provider, "我喜欢阅读。", "en").await.unwrap();
        assert_eq!(whole, "I like reading.");

        let joined = TranslationProvider::translate(&provider, "我喜欢阅读。\n没有译文。\n我需要预订机票。", "en")
            .await
            .unwrap();
        assert_eq!(joined, "I like reading.\n\nI need to book a flight.");

        let unknown = TranslationProvider::translate(&provider, "完全陌生的句子", "en")
            .await
            .unwrap();
        assert_eq!(unknown, "");
        let unknown_lines = TranslationProvider::translate(&provider, "陌生一。\n陌生二。", "en")
            .await
            .unwrap();
        assert_eq!(unknown_lines, "\n");
    }

    #[tokio::test]
    async fn test_cards_lookup_is_case_insensitive() {
        let provider = MemoryProvider::new().with_cards(
            "Book",
            vec![MeaningCard::Translation { text: "预订".to_string() }],
        );
        assert_eq!(provider.lookup("BOOK").await.unwrap().len(), 1);
        assert!(provider.lookup("read").await.unwrap().is_empty());
    }

    #[test]
    fn test_load_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memory.json");
        std::fs::write(
            &path,
            r#"{"translations": {"你好。": "Hello."}, "cards": {"hello": [{"kind": "phrase", "phrase": "hello", "gloss": "你好"}]}}"#,
        )
        .unwrap();

        let provider = MemoryProvider::load_json(&path).unwrap();
        assert_eq!(provider.lookup_translation("你好。"), "Hello.");
        assert_eq!(provider.cards["hello"].len(), 1);
    }
}
