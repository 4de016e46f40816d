//! 个人词库
//!
//! 词条由外部（导入、手动添加、查词）创建和维护，管道只读取快照。
//! 词典服务返回的各种释义卡片在这里统一归一化，匹配器看不到原始载荷。

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::annotation::config::constants;
use crate::annotation::error::{AnnotationError, AnnotationResult};

/// 学习分类
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    #[default]
    Wanted,
    InProgress,
    Known,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Wanted => "wanted",
            Category::InProgress => "in-progress",
            Category::Known => "known",
        }
    }
}

/// 词条
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct VocabularyEntry {
    pub id: String,
    /// 目标语言基本形式
    pub text: String,
    /// 词形变化，大小写不敏感
    #[serde(default)]
    pub inflections: Vec<String>,
    /// 以逗号、分号、斜杠或空白分隔的源语言释义
    #[serde(default)]
    pub translation: String,
    #[serde(default)]
    pub category: Category,
}

impl VocabularyEntry {
    pub fn new(id: &str, text: &str, translation: &str) -> Self {
        Self {
            id: id.to_string(),
            text: text.to_string(),
            inflections: Vec::new(),
            translation: translation.to_string(),
            category: Category::Wanted,
        }
    }

    pub fn with_inflections(mut self, inflections: &[&str]) -> Self {
        self.inflections = inflections.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    /// 基本形式的小写
    pub fn base_form(&self) -> String {
        self.text.trim().to_lowercase()
    }

    /// 全部词形（基本形式 + 变化形式），小写去重，按长度从长到短排列
    pub fn surface_forms(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut forms: Vec<String> = std::iter::once(&self.text)
            .chain(self.inflections.iter())
            .map(|form| form.trim().to_lowercase())
            .filter(|form| !form.is_empty() && seen.insert(form.clone()))
            .collect();
        // 稳定排序，等长时保留声明顺序
        forms.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()));
        forms
    }

    /// 判断某个字符串是否是本词条的词形
    pub fn has_form(&self, form: &str) -> bool {
        let form = form.trim().to_lowercase();
        self.surface_forms().iter().any(|f| *f == form)
    }

    /// 拆分后的释义列表
    pub fn definitions(&self) -> Vec<String> {
        split_definitions(&self.translation)
    }
}

/// 按固定分隔符拆分释义，去掉空项
pub fn split_definitions(text: &str) -> Vec<String> {
    text.split(|c: char| c.is_whitespace() || constants::DEFINITION_DELIMITERS.contains(&c))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// 词典服务返回的释义卡片
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MeaningCard {
    /// 词典条目，可能有多个义项
    Dictionary {
        headword: String,
        #[serde(default)]
        senses: Vec<String>,
    },
    /// 整词机器翻译
    Translation { text: String },
    /// 短语释义
    Phrase {
        phrase: String,
        #[serde(default)]
        gloss: Option<String>,
    },
}

impl MeaningCard {
    /// 卡片中的源语言释义
    pub fn definitions(&self) -> Vec<String> {
        match self {
            MeaningCard::Dictionary { senses, .. } => {
                senses.iter().flat_map(|s| split_definitions(s)).collect()
            }
            MeaningCard::Translation { text } => split_definitions(text),
            MeaningCard::Phrase { gloss, .. } => gloss
                .as_deref()
                .map(split_definitions)
                .unwrap_or_default(),
        }
    }
}

/// 合并词条自带释义与全部卡片释义，保持出现顺序去重
pub fn normalize_cards(entry: &VocabularyEntry, cards: &[MeaningCard]) -> Vec<String> {
    let mut seen = HashSet::new();
    entry
        .definitions()
        .into_iter()
        .chain(cards.iter().flat_map(|card| card.definitions()))
        .filter(|definition| seen.insert(definition.clone()))
        .collect()
}

/// 词库快照
#[derive(Debug, Clone, Default)]
pub struct VocabularySnapshot {
    entries: Vec<VocabularyEntry>,
}

impl VocabularySnapshot {
    pub fn new(entries: Vec<VocabularyEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[VocabularyEntry] {
        &self.entries
    }

    pub fn get(&self, id: &str) -> Option<&VocabularyEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// 词库存储：唯一写者，变更通过 watch 通道推送给读者
pub struct VocabularyStore {
    sender: watch::Sender<Arc<VocabularySnapshot>>,
}

impl VocabularyStore {
    pub fn new(entries: Vec<VocabularyEntry>) -> Self {
        let (sender, _) = watch::channel(Arc::new(VocabularySnapshot::new(entries)));
        Self { sender }
    }

    /// 从 JSON 文件加载 `[VocabularyEntry]`
    pub fn load_json(path: &Path) -> AnnotationResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AnnotationError::InvalidInput(format!("读取词库失败 {}: {}", path.display(), e))
        })?;
        let entries: Vec<VocabularyEntry> = serde_json::from_str(&content)?;
        tracing::info!("已加载 {} 个词条", entries.len());
        Ok(Self::new(entries))
    }

    pub fn snapshot(&self) -> Arc<VocabularySnapshot> {
        self.sender.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<VocabularySnapshot>> {
        self.sender.subscribe()
    }

    /// 整体替换词库并通知读者
    pub fn replace(&self, entries: Vec<VocabularyEntry>) {
        tracing::debug!("词库快照已更新: {} 个词条", entries.len());
        self.sender
            .send_replace(Arc::new(VocabularySnapshot::new(entries)));
    }

    /// 新增或更新单个词条
    pub fn upsert(&self, entry: VocabularyEntry) {
        self.sender.send_modify(|snapshot| {
            let mut entries = snapshot.entries.clone();
            match entries.iter_mut().find(|e| e.id == entry.id) {
                Some(existing) => *existing = entry,
                None => entries.push(entry),
            }
            *snapshot = Arc::new(VocabularySnapshot::new(entries));
        });
    }

    /// 删除词条
    pub fn remove(&self, id: &str) {
        self.sender.send_modify(|snapshot| {
            let entries = snapshot
                .entries
                .iter()
                .filter(|e| e.id != id)
                .cloned()
                .collect();
            *snapshot = Arc::new(VocabularySnapshot::new(entries));
        });
    }
}
