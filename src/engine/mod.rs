//! 翻译引擎：路由解析、变更监听、文本/选择器规则匹配与替换
pub mod cache;
pub mod context;
pub mod flags;
pub mod listener;
pub mod mirror;
pub mod route;
pub mod scheduler;
pub mod scoped;
pub mod state;
pub mod substitute;
pub mod text_matcher;
pub mod translator;

pub use self::cache::MatchCache;
pub use self::context::ElementContext;
pub use self::flags::{NodeFlag, NodeFlags};
pub use self::listener::{ListenerState, MutationListener};
pub use self::mirror::MirrorTable;
pub use self::route::{pattern_matches, route_from_url, strip_query, RouteResolver};
pub use self::scheduler::{DeferredTask, Scheduler};
pub use self::scoped::ScopedApplier;
pub use self::state::{ActiveContent, EngineState, PassStats};
pub use self::substitute::{Substitution, TextOutcome};
pub use self::text_matcher::TextMatcher;
pub use self::translator::{FlushReport, Translator};
