//! 标注配置管理模块
//!
//! 提供配置常量、可序列化配置结构以及单写者的配置快照发布

pub mod manager;
pub mod policy;
pub mod style;

// 重新导出主要类型
pub use manager::{AnnotationConfig, ConfigManager, ProviderSettings, ScanRoot};
pub use policy::DomainPolicy;
pub use style::{AnnotationPart, CategoryStyles, LayoutMode, OriginalTextDisplay, StyleConfig, Wrap};

/// 配置常量
pub mod constants {
    use std::time::Duration;

    // 调度相关
    pub const DEFAULT_BATCH_SIZE: usize = 10;
    pub const DEFAULT_MAX_IN_FLIGHT: usize = 3;
    pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(20);
    pub const SENTENCE_SEPARATOR: &str = "\n";

    // 扫描相关
    pub const MIN_BLOCK_CHARS: usize = 5;
    pub const NAV_STRIP_MAX_CHARS: usize = 40;
    pub const NAV_STRIP_SEPARATOR_RATIO: f32 = 0.2;

    /// 导航条里常见的分隔符，普通句读不计入
    pub const NAV_SEPARATORS: &[char] = &['|', '｜', '·', '•', '/', '／', '>', '＞', '»', '›'];

    // 匹配相关
    pub const SIMILARITY_THRESHOLD: f64 = 0.65;
    pub const DEFAULT_TARGET_LANG: &str = "en";
    pub const DEFAULT_DEEPLX_URL: &str = "http://localhost:1188/translate";
    pub const DEFAULT_CACHE_SIZE: usize = 1000;

    /// 句末标点（全角与半角）
    pub const SENTENCE_TERMINATORS: &[char] = &['。', '？', '！', '.', '?', '!'];

    /// 释义分隔符，另外所有空白字符也视为分隔符
    pub const DEFINITION_DELIMITERS: &[char] = &[',', '，', ';', '；', '/', '／'];

    /// 相似度计算前剔除的虚字
    pub const STOP_CHARS: &[char] = &[
        '的', '地', '得', '了', '着', '过', '之', '等', '与', '和', '及', '或', '是', '在', '把',
        '被', '将', '对', '们', '个',
    ];

    // 直接拒绝的元素
    pub const SKIP_ELEMENTS: &[&str] = &[
        "script", "style", "noscript", "template", "code", "pre", "textarea", "input", "select",
        "option", "button", "svg", "math", "canvas", "video", "audio", "img", "picture", "iframe",
        "object", "embed", "head", "meta", "link",
    ];

    // 可承载正文的块级元素
    pub const BLOCK_ELEMENTS: &[&str] = &[
        "p", "li", "h1", "h2", "h3", "h4", "h5", "h6", "blockquote", "dd", "dt", "td", "th",
        "caption", "figcaption", "summary", "div", "section", "article", "main", "body",
    ];

    // 正文模式下排除的结构区域
    pub const NOISE_ELEMENTS: &[&str] = &["nav", "header", "footer", "aside"];

    // 正文模式下根据 role/id/class 排除的关键词
    pub const NOISE_KEYWORDS: &[&str] =
        &["nav", "menu", "sidebar", "footer", "toolbar", "breadcrumb"];

    /// 正文根节点候选，按优先级排列：标签名、`#id`、`.class`、`[role=x]`
    pub const MAIN_CONTENT_SELECTORS: &[&str] =
        &["main", "[role=main]", "article", "#content", "#main", ".content"];

    // 渲染输出使用的类名与属性名
    pub const UNIT_CLASS: &str = "vm-unit";
    pub const WORD_CLASS: &str = "vm-word";
    pub const ORIGINAL_CLASS: &str = "vm-original";
    pub const UNIT_MARKER_ATTR: &str = "data-vm-unit";
    pub const ENTRY_ID_ATTR: &str = "data-vm-entry-id";
    pub const ORIGINAL_TEXT_ATTR: &str = "data-vm-original";
    pub const SURFACE_FORM_ATTR: &str = "data-vm-form";
    pub const STYLESHEET_ATTR: &str = "data-vm-stylesheet";

    // 配置文件搜索路径
    pub const CONFIG_PATHS: &[&str] = &[
        "vocabmark.toml",
        ".vocabmark.toml",
        "~/.config/vocabmark/config.toml",
    ];
}
