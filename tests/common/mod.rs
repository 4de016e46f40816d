// 集成测试公共模块
//
// 提供文档夹具、词库夹具、可编排的翻译服务和测试环境

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use futures::future::LocalBoxFuture;
use markup5ever_rcdom::{Handle, NodeData, RcDom};

use vocabmark::annotation::config::ProviderSettings;
use vocabmark::annotation::{
    AnnotationConfig, AnnotationError, AnnotationResult, AnnotationService, ConfigManager,
    DictionaryProvider, MeaningCard, ProviderRegistry, TranslationProvider, VocabularyEntry,
    VocabularyStore,
};
use vocabmark::html::{get_node_name, html_to_dom, serialize_node, text_content};

/// 按原文查表的翻译服务，可以指定失败的原文
pub struct ScriptedProvider {
    id: String,
    translations: HashMap<String, String>,
    failures: Vec<String>,
    cards: HashMap<String, Vec<MeaningCard>>,
    pub requests: RefCell<Vec<String>>,
    pub lookups: Cell<usize>,
}

impl ScriptedProvider {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            translations: HashMap::new(),
            failures: Vec::new(),
            cards: HashMap::new(),
            requests: RefCell::new(Vec::new()),
            lookups: Cell::new(0),
        }
    }

    pub fn translate_to(mut self, source: &str, translated: &str) -> Self {
        self.translations
            .insert(source.to_string(), translated.to_string());
        self
    }

    /// 原文包含 `needle` 的请求都失败
    pub fn fail_on(mut self, needle: &str) -> Self {
        self.failures.push(needle.to_string());
        self
    }

    pub fn with_cards(mut self, word: &str, cards: Vec<MeaningCard>) -> Self {
        self.cards.insert(word.to_lowercase(), cards);
        self
    }

    pub fn request_count(&self) -> usize {
        self.requests.borrow().len()
    }
}

impl TranslationProvider for ScriptedProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn translate<'a>(
        &'a self,
        text: &'a str,
        _target_lang: &'a str,
    ) -> LocalBoxFuture<'a, AnnotationResult<String>> {
        Box::pin(async move {
            self.requests.borrow_mut().push(text.to_string());
            if self.failures.iter().any(|needle| text.contains(needle.as_str())) {
                return Err(AnnotationError::ProviderError(format!("拒绝请求: {}", text)));
            }
            // 逐行查表，找不到的行给空串
            let translated = text
                .split('\n')
                .map(|line| self.translations.get(line).cloned().unwrap_or_default())
                .collect::<Vec<_>>()
                .join("\n");
            Ok(translated)
        })
    }
}

impl DictionaryProvider for ScriptedProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn lookup<'a>(&'a self, word: &'a str) -> LocalBoxFuture<'a, AnnotationResult<Vec<MeaningCard>>> {
        Box::pin(async move {
            self.lookups.set(self.lookups.get() + 1);
            Ok(self
                .cards
                .get(&word.to_lowercase())
                .cloned()
                .unwrap_or_default())
        })
    }
}

/// 词库夹具
pub struct VocabularyFixture;

impl VocabularyFixture {
    /// book / booking / booked -> 预订
    pub fn book() -> VocabularyEntry {
        VocabularyEntry::new("book", "book", "预订").with_inflections(&["booking", "booked"])
    }

    pub fn read() -> VocabularyEntry {
        VocabularyEntry::new("read", "read", "阅读 读").with_inflections(&["reading"])
    }

    pub fn flight() -> VocabularyEntry {
        VocabularyEntry::new("flight", "flight", "航班，机票").with_inflections(&["flights"])
    }

    pub fn store(entries: Vec<VocabularyEntry>) -> VocabularyStore {
        VocabularyStore::new(entries)
    }
}

/// HTML 测试辅助
pub struct HtmlTestHelper;

impl HtmlTestHelper {
    pub fn page(body: &str) -> RcDom {
        let html = format!(
            "<!DOCTYPE html><html><head><title>测试页面</title></head><body>{}</body></html>",
            body
        );
        html_to_dom(html.as_bytes(), "utf-8").expect("测试 HTML 应能解析")
    }

    pub fn find_all(node: &Handle, tag: &str) -> Vec<Handle> {
        let mut found = Vec::new();
        Self::collect(node, tag, &mut found);
        found
    }

    fn collect(node: &Handle, tag: &str, found: &mut Vec<Handle>) {
        for child in node.children.borrow().iter() {
            if matches!(child.data, NodeData::Element { .. }) && get_node_name(child) == Some(tag) {
                found.push(child.clone());
            }
            Self::collect(child, tag, found);
        }
    }

    pub fn first(dom: &RcDom, tag: &str) -> Handle {
        Self::find_all(&dom.document, tag)
            .into_iter()
            .next()
            .unwrap_or_else(|| panic!("文档中没有 <{}>", tag))
    }

    pub fn text(node: &Handle) -> String {
        text_content(node)
    }

    pub fn markup(node: &Handle) -> String {
        serialize_node(node).expect("节点应能序列化")
    }
}

/// 测试环境：配置、词库与服务
pub struct TestEnvironment {
    pub manager: ConfigManager,
    pub store: VocabularyStore,
    pub provider: Rc<ScriptedProvider>,
    pub service: AnnotationService,
}

impl TestEnvironment {
    /// 只启用 `scripted` 服务、关闭缓存的配置
    pub fn config() -> AnnotationConfig {
        AnnotationConfig {
            providers: vec![ProviderSettings::new("scripted")],
            cache_enabled: false,
            ..Default::default()
        }
    }

    pub fn new(config: AnnotationConfig, entries: Vec<VocabularyEntry>, provider: ScriptedProvider) -> Self {
        let manager = ConfigManager::with_config(config).expect("测试配置应有效");
        let store = VocabularyFixture::store(entries);
        let provider = Rc::new(provider);

        let mut registry = ProviderRegistry::new();
        registry.register(provider.clone());
        registry.register_dictionary(provider.clone());

        let service = AnnotationService::from_parts(&manager, &store, registry);
        Self {
            manager,
            store,
            provider,
            service,
        }
    }
}
