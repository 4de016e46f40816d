//! 翻译调度器模块
//!
//! 维护无界的待处理队列，每次取固定数量的段落组成批次交给当前生效的翻译服务。
//! 每个段落先分句、用分隔符拼成一个请求，译文再按分隔符拆回句子。
//! 单个段落失败只记录日志，段落保持 `Pending`，批次继续处理。

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use markup5ever_rcdom::Handle;
use tokio::sync::watch;

use super::scanner::{BlockState, ContentBlock, ScanSession};
use crate::annotation::config::AnnotationConfig;
use crate::annotation::error::{helpers, AnnotationError, AnnotationResult, ErrorStats};
use crate::annotation::matching::{resolve_spans, LexicalMatcher, SimilarityMatcher};
use crate::annotation::providers::{ProviderRegistry, TranslationProvider};
use crate::annotation::render::{apply_spans, AnnotationRenderer};
use crate::annotation::text::alignment::join_for_request;
use crate::annotation::text::{align_sentences, normalize, segment_with_offsets, SentencePair};
use crate::annotation::vocabulary::{normalize_cards, VocabularyEntry, VocabularySnapshot};
use crate::html::is_attached;

/// 调度统计
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerStats {
    pub batches: usize,
    pub blocks_done: usize,
    pub blocks_failed: usize,
    /// 没有可用翻译服务而保持 `Pending` 的段落
    pub blocks_idle: usize,
    /// 处理时容器已脱离文档的段落
    pub blocks_stale: usize,
    pub spans_applied: usize,
    pub spans_skipped: usize,
    pub dictionary_lookups: usize,
}

impl SchedulerStats {
    /// 与更早的快照相减，得到这段时间内的增量
    pub fn since(&self, earlier: &SchedulerStats) -> SchedulerStats {
        SchedulerStats {
            batches: self.batches - earlier.batches,
            blocks_done: self.blocks_done - earlier.blocks_done,
            blocks_failed: self.blocks_failed - earlier.blocks_failed,
            blocks_idle: self.blocks_idle - earlier.blocks_idle,
            blocks_stale: self.blocks_stale - earlier.blocks_stale,
            spans_applied: self.spans_applied - earlier.spans_applied,
            spans_skipped: self.spans_skipped - earlier.spans_skipped,
            dictionary_lookups: self.dictionary_lookups - earlier.dictionary_lookups,
        }
    }
}

/// 一次排空所需的上下文
pub struct PassContext<'a> {
    /// 文档根节点，用于判断段落是否仍在文档中
    pub root: &'a Handle,
    pub session: &'a RefCell<ScanSession>,
    pub registry: &'a ProviderRegistry,
    pub config: &'a watch::Receiver<Arc<AnnotationConfig>>,
    pub vocabulary: &'a watch::Receiver<Arc<VocabularySnapshot>>,
}

/// 排空期间置位，结束（包括提前返回）时复位
struct DrainGuard<'a>(&'a Cell<bool>);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// 翻译调度器
#[derive(Default)]
pub struct TranslationScheduler {
    intake: RefCell<VecDeque<ContentBlock>>,
    in_flight: Cell<bool>,
    stats: RefCell<SchedulerStats>,
    errors: RefCell<ErrorStats>,
}

impl TranslationScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// 加入待处理队列
    pub fn enqueue(&self, blocks: Vec<ContentBlock>) {
        if blocks.is_empty() {
            return;
        }
        tracing::debug!("{} 个段落进入待处理队列", blocks.len());
        self.intake.borrow_mut().extend(blocks);
    }

    pub fn queued(&self) -> usize {
        self.intake.borrow().len()
    }

    pub fn is_draining(&self) -> bool {
        self.in_flight.get()
    }

    pub fn stats(&self) -> SchedulerStats {
        *self.stats.borrow()
    }

    /// 累计错误统计
    pub fn errors(&self) -> ErrorStats {
        self.errors.borrow().clone()
    }

    /// 记录并按严重程度输出日志，不改变控制流
    fn record_error(&self, error: AnnotationError) {
        helpers::log_error(&error);
        self.errors.borrow_mut().record_error(&error);
    }

    /// 分批排空队列；已有排空在进行时直接返回，新段落由进行中的排空接手
    pub async fn drain(&self, ctx: &PassContext<'_>) -> SchedulerStats {
        if self.in_flight.replace(true) {
            tracing::debug!("已有批次在处理中，跳过本次排空");
            return self.stats();
        }
        let _guard = DrainGuard(&self.in_flight);

        loop {
            let batch_size = ctx.config.borrow().batch_size.max(1);
            let batch: Vec<ContentBlock> = {
                let mut intake = self.intake.borrow_mut();
                let count = batch_size.min(intake.len());
                intake.drain(..count).collect()
            };
            if batch.is_empty() {
                break;
            }
            self.process_batch(batch, ctx).await;
        }

        self.stats()
    }

    async fn process_batch(&self, batch: Vec<ContentBlock>, ctx: &PassContext<'_>) {
        let config = ctx.config.borrow().clone();

        let Some(provider) = ctx.registry.active(&config) else {
            tracing::debug!("没有启用的翻译服务，{} 个段落保持 pending", batch.len());
            self.stats.borrow_mut().blocks_idle += batch.len();
            return;
        };

        self.stats.borrow_mut().batches += 1;
        tracing::debug!(
            "处理批次: {} 个段落，服务 {}",
            batch.len(),
            provider.id()
        );

        let provider = provider.as_ref();
        let target_lang = config.target_lang.as_str();
        let separator = config.sentence_separator.as_str();
        let timeout = config.request_timeout();

        let results: Vec<(ContentBlock, AnnotationResult<Vec<SentencePair>>)> =
            stream::iter(batch.into_iter().map(|block| async move {
                let result = translate_block(provider, &block, target_lang, separator, timeout).await;
                (block, result)
            }))
            .buffered(config.max_in_flight.max(1))
            .collect()
            .await;

        for (block, result) in results {
            match result {
                Ok(pairs) => self.complete_block(block, pairs, ctx, &config).await,
                Err(error) => {
                    self.record_error(error.with_context("段落保持 pending"));
                    self.stats.borrow_mut().blocks_failed += 1;
                }
            }
        }
    }

    /// 匹配、消解、渲染一个已翻译的段落并标记为 `Done`
    async fn complete_block(
        &self,
        mut block: ContentBlock,
        pairs: Vec<SentencePair>,
        ctx: &PassContext<'_>,
        config: &AnnotationConfig,
    ) {
        if !is_attached(&block.node, ctx.root) {
            self.record_error(helpers::stale_node("段落已脱离文档，放弃渲染"));
            self.stats.borrow_mut().blocks_stale += 1;
            return;
        }

        block.translated = Some(
            pairs
                .iter()
                .map(|pair| pair.translated.as_str())
                .collect::<Vec<_>>()
                .join(&config.sentence_separator),
        );

        let vocabulary = ctx.vocabulary.borrow().clone();
        let lexical = LexicalMatcher::new();
        let similarity = SimilarityMatcher::new(config.similarity_threshold);
        let mut pooled: HashMap<String, Vec<String>> = HashMap::new();
        let mut candidates = Vec::new();

        for pair in &pairs {
            let normalized = normalize(&pair.translated);
            for entry in vocabulary.entries() {
                let confirmed = lexical.match_entry(pair, &normalized, entry);
                if !confirmed.is_empty() {
                    candidates.extend(confirmed);
                    continue;
                }
                if !config.aggressive || !SimilarityMatcher::applies_to(&normalized, entry) {
                    continue;
                }

                if !pooled.contains_key(&entry.id) {
                    let definitions = self.pooled_definitions(entry, ctx).await;
                    pooled.insert(entry.id.clone(), definitions);
                }
                let definitions = pooled.get(&entry.id).map(Vec::as_slice).unwrap_or_default();
                if let Some(span) = similarity.best_match(pair, entry, definitions) {
                    candidates.push(span);
                }
            }
        }

        let resolved = resolve_spans(candidates);
        let renderer = AnnotationRenderer::new(&config.styles, &config.display);
        let outcome = apply_spans(ctx.root, &block.text, &block.segments, &resolved, &renderer);

        block.state = BlockState::Done;
        ctx.session.borrow_mut().mark(&block.node, BlockState::Done);

        let mut stats = self.stats.borrow_mut();
        stats.blocks_done += 1;
        stats.spans_applied += outcome.applied;
        stats.spans_skipped += outcome.skipped;
        tracing::trace!(
            "段落完成: {} 个片段，跳过 {} 个",
            outcome.applied,
            outcome.skipped
        );
    }

    /// 词条自带释义与词典卡片释义的合并；查询失败时只用自带释义
    async fn pooled_definitions(&self, entry: &VocabularyEntry, ctx: &PassContext<'_>) -> Vec<String> {
        let cards = match ctx.registry.dictionary() {
            Some(dictionary) => {
                self.stats.borrow_mut().dictionary_lookups += 1;
                match dictionary.lookup(&entry.text).await {
                    Ok(cards) => cards,
                    Err(error) => {
                        self.record_error(error.with_context(format!("词典查询 {}", entry.text)));
                        Vec::new()
                    }
                }
            }
            None => Vec::new(),
        };
        normalize_cards(entry, &cards)
    }
}

/// 对一个段落分句、拼接、翻译并对齐
async fn translate_block(
    provider: &dyn TranslationProvider,
    block: &ContentBlock,
    target_lang: &str,
    separator: &str,
    timeout: Duration,
) -> AnnotationResult<Vec<SentencePair>> {
    let sentences = segment_with_offsets(&block.text);
    if sentences.is_empty() {
        return Ok(Vec::new());
    }

    let joined = join_for_request(&sentences, separator);
    let translated = tokio::time::timeout(timeout, provider.translate(&joined, target_lang)).await??;
    Ok(align_sentences(&sentences, &translated, separator))
}
