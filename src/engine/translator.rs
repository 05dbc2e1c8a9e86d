//! 翻译器
//! 持有编译后的词典与引擎状态，对外提供启动、处理变更与推进时钟的接口。
//! 所有状态只在调用方的同一条同步调用链上读写，不创建线程也不加锁。

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::listener::{ListenerState, MutationListener};
use super::route::RouteResolver;
use super::scheduler::DeferredTask;
use super::state::{ActiveContent, EngineState};
use super::flags::NodeFlag;
use crate::compiler::{DictionaryStore, RuleCompiler};
use crate::config::GlobalConfig;
use crate::dom::Document;
use crate::error::LocResult;
use crate::rule::DictionaryLoader;

/// 一次 flush 的处理结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// 取出的变更批次数
    pub batches: usize,
    pub substitutions: usize,
    pub cache_writes: usize,
    /// 本次触发的延迟任务数
    pub deferred_fired: usize,
}

impl FlushReport {
    /// 是否没有对文档做任何修改
    pub fn is_noop(&self) -> bool {
        self.substitutions == 0 && self.cache_writes == 0
    }
}

/// 翻译器
pub struct Translator {
    store: Arc<DictionaryStore>,
    config: GlobalConfig,
    state: EngineState,
    listener: ListenerState,
}

impl Translator {
    pub fn new(store: DictionaryStore, config: GlobalConfig) -> Self {
        Self::with_shared_store(Arc::new(store), config)
    }

    /// 多个文档共用同一份词典
    pub fn with_shared_store(store: Arc<DictionaryStore>, config: GlobalConfig) -> Self {
        Self {
            store,
            config,
            state: EngineState::new(),
            listener: ListenerState::Idle,
        }
    }

    /// 按配置加载并编译词典
    pub async fn from_config(config: GlobalConfig) -> LocResult<Self> {
        let dictionary = DictionaryLoader::load(&config).await?;
        let store = RuleCompiler::compile(&dictionary, &config)?;
        Ok(Self::new(store, config))
    }

    /// 开始监听
    ///
    /// 丢弃此前积累的变更记录，解析当前路由并完整翻译一次 body，随后丢弃这次翻译自身产生的记录。
    pub fn start(&mut self, doc: &mut Document) -> FlushReport {
        let before = self.state.stats;
        doc.take_records();

        let route = doc.location().to_string();
        RouteResolver::resolve(&route, &self.store, &mut self.state.active, &mut self.state.cache);
        let body = doc.body();
        MutationListener::translate(doc, &mut self.state, &self.config, &[body]);

        let discarded = doc.take_records();
        self.listener = ListenerState::Observing;
        debug!(
            "翻译器已启动，路由 {:?}，初次翻译丢弃变更记录 {} 条",
            self.state.active.route_key,
            discarded.len()
        );
        self.report_since(before)
    }

    /// 按到达顺序处理所有待处理的变更批次
    ///
    /// 引擎自身的替换会产生新的记录，作为下一批在同一次 flush 中处理，直到达到批次上限。
    pub fn flush(&mut self, doc: &mut Document) -> FlushReport {
        if self.listener == ListenerState::Idle {
            return FlushReport::default();
        }
        let before = self.state.stats;
        self.state.mirrors.prune(doc);

        let mut batches = 0;
        while batches < self.config.max_cascade_batches {
            let records = doc.take_records();
            if records.is_empty() {
                break;
            }
            batches += 1;
            self.state.mirrors.sync_classes(doc, &records);
            MutationListener::on_batch(doc, &mut self.state, &self.store, &self.config, &records);
        }
        if doc.has_pending_records() {
            warn!(
                "连续处理 {} 批变更后仍有记录未处理，剩余记录留待下次 flush",
                self.config.max_cascade_batches
            );
        }

        FlushReport {
            batches,
            ..self.report_since(before)
        }
    }

    /// 推进引擎时钟，触发到期的延迟任务后再处理变更
    pub fn advance(&mut self, doc: &mut Document, elapsed: Duration) -> FlushReport {
        let tasks = self.state.scheduler.advance(elapsed);
        let fired = tasks.len();
        for task in tasks {
            self.fire(doc, task);
        }
        FlushReport {
            deferred_fired: fired,
            ..self.flush(doc)
        }
    }

    fn fire(&mut self, doc: &Document, task: DeferredTask) {
        match task {
            DeferredTask::StopSearch { locator } => match locator.select_first(doc) {
                Some(element) => {
                    self.state.flags.insert(element, NodeFlag::STOP_SEARCH);
                    debug!("延迟任务：元素 {} ({}) 已禁止翻译", element, locator);
                }
                None => debug!("延迟任务：选择器 {} 没有匹配的元素", locator),
            },
        }
    }

    /// 替换词典，下一批变更时会按当前路由重新加载规则
    pub fn replace_store(&mut self, store: DictionaryStore) {
        self.store = Arc::new(store);
        self.state.active = ActiveContent::default();
        self.state.cache.clear();
    }

    fn report_since(&self, before: super::state::PassStats) -> FlushReport {
        FlushReport {
            batches: 0,
            substitutions: self.state.stats.substitutions - before.substitutions,
            cache_writes: self.state.stats.cache_writes - before.cache_writes,
            deferred_fired: 0,
        }
    }

    pub fn store(&self) -> &DictionaryStore {
        &self.store
    }

    pub fn config(&self) -> &GlobalConfig {
        &self.config
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut EngineState {
        &mut self.state
    }

    pub fn is_observing(&self) -> bool {
        self.listener == ListenerState::Observing
    }

    /// 当前生效的路由
    pub fn active_route(&self) -> Option<&str> {
        self.state.active.route_key.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::{Replacement, RuleSet, ScopedRule, UnscopedRule};
    use crate::config::ConfigManager;
    use crate::dom::Selector;

    #[test]
    fn test_flush_before_start_does_nothing() {
        let mut doc = Document::parse_html("<p>Overview</p>");
        let store = DictionaryStore::new(vec![RuleSet::new([""]).with_rule(UnscopedRule::exact("Overview", "总览"))]);
        let mut translator = Translator::new(store, GlobalConfig::default());

        let p = doc.children(doc.body())[0];
        doc.set_inner_html(p, "Overview");
        assert_eq!(translator.flush(&mut doc), FlushReport::default());
        assert!(doc.has_pending_records());
        assert!(!translator.is_observing());
    }

    #[test]
    fn test_start_translates_body_and_discards_records() {
        let mut doc = Document::parse_html("<p>Overview</p>");
        let store = DictionaryStore::new(vec![RuleSet::new([""]).with_rule(UnscopedRule::exact("Overview", "总览"))]);
        let mut translator = Translator::new(store, GlobalConfig::default());

        let report = translator.start(&mut doc);
        assert_eq!(report.substitutions, 1);
        assert!(!doc.has_pending_records());
        assert_eq!(translator.active_route(), Some(""));
        assert_eq!(doc.inner_html(doc.body()), "<p>总览</p>");
    }

    #[test]
    fn test_cascade_is_bounded() {
        let mut doc = Document::parse_html("<span class=\"n\">0</span>");
        let rule = ScopedRule::new(
            Selector::parse("span.n").unwrap(),
            Replacement::element_fn(|ctx| {
                let next = ctx.text_content().parse::<u32>().unwrap_or(0) + 1;
                ctx.set_inner_html(&next.to_string());
            }),
        )
        .reusable()
        .skip_repeat_check();
        let store = DictionaryStore::new(vec![RuleSet::new([""]).with_rule(rule)]);
        let config = ConfigManager::custom().max_cascade_batches(3).build();
        let mut translator = Translator::new(store, config);

        translator.start(&mut doc);
        let span = doc.children(doc.body())[0];
        doc.set_inner_html(span, "10");

        let report = translator.flush(&mut doc);
        assert_eq!(report.batches, 3);
        assert_eq!(report.substitutions, 3);
        assert!(doc.has_pending_records());
        assert_eq!(doc.inner_html(span), "13");
    }

    #[test]
    fn test_replace_store_reloads_rules() {
        let mut doc = Document::parse_html("<p>Overview</p>");
        let mut translator = Translator::new(DictionaryStore::default(), GlobalConfig::default());
        translator.start(&mut doc);
        assert_eq!(doc.inner_html(doc.body()), "<p>Overview</p>");

        translator.replace_store(DictionaryStore::new(vec![
            RuleSet::new([""]).with_rule(UnscopedRule::exact("Overview", "总览")),
        ]));
        assert_eq!(translator.active_route(), None);

        let p = doc.children(doc.body())[0];
        doc.set_inner_html(p, "Overview");
        let report = translator.flush(&mut doc);
        assert_eq!(report.substitutions, 1);
        assert_eq!(doc.inner_html(p), "总览");
    }
}
