//! rslocalizer - 响应式、按路由选择词典的页面文本汉化引擎

// 导出全局错误类型
pub use self::error::{LocalizerError, LocResult};

// 导出配置模块
pub use self::config::{GlobalConfig, ConfigManager, CustomConfigBuilder};

// 导出词典模块核心接口
pub use self::rule::{
    DictionaryFile, RawEntry, RawRuleSet, DictionaryFormat, DictionaryLoader, DictionaryCacheManager
};

// 导出文档树模块核心接口
pub use self::dom::{Document, NodeId, NodeKind, MutationKind, MutationRecord, Selector};

// 导出编译模块核心接口
pub use self::compiler::{
    DictionaryStore, RuleSet, Rule, UnscopedRule, ScopedRule, SourcePattern, Replacement, TextFn, ElementFn,
    RuleCompiler
};

// 导出引擎核心接口
pub use self::engine::{
    Translator,
    FlushReport,
    ElementContext,
    EngineState,
    NodeFlag,
    RouteResolver,
    route_from_url,
};

// 声明所有子模块
pub mod config;
pub mod error;
pub mod rule;
pub mod dom;
pub mod utils;
pub mod compiler;
pub mod engine;
