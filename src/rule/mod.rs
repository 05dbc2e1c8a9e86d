//! 词典模块：负责词典的加载、缓存、数据模型定义
pub mod model;
pub mod cache;
pub mod loader;

// 导出核心接口
pub use self::model::{DictionaryFile, RawEntry, RawRuleSet, SourceValue, TargetAction, TargetValue};
pub use self::loader::{DictionaryFormat, DictionaryLoader};
pub use self::cache::DictionaryCacheManager;
