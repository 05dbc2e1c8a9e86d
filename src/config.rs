//! 全局配置管理,存储所有可配置项

use std::path::PathBuf;

/// 全局配置
#[derive(Debug, Clone)]
pub struct GlobalConfig {
    // 翻译源语种（词典条目中用于匹配的键）
    pub translate_from: String,
    // 翻译目标语种（词典条目中用于替换的键）
    pub translate_to: String,
    // 本地词典文件路径，设置后跳过缓存与远程拉取
    pub dictionary_path: Option<PathBuf>,
    // 词典缓存路径
    pub dictionary_cache_path: PathBuf,
    // 远程词典URL
    pub dictionary_url: Option<String>,
    // GitHub代理URL
    pub gh_proxy_url: String,
    // 超时配置（单位：秒）
    pub http_timeout: u64,
    // 单次 flush 内最多连续处理的变更批次数
    pub max_cascade_batches: usize,
    // 未匹配的文本是否以 warn 级别输出
    pub warn_unmatched: bool,
    // 是否启用详细日志
    pub verbose: bool,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            translate_from: "en-US".to_string(),
            translate_to: "zh-CN".to_string(),
            dictionary_path: None,
            dictionary_cache_path: PathBuf::from("rslocalizer_dict.mp"),
            dictionary_url: None,
            gh_proxy_url: "https://ghfast.top/".to_string(),
            http_timeout: 30,
            max_cascade_batches: 32,
            warn_unmatched: false,
            verbose: false,
        }
    }
}

/// 配置管理器
pub struct ConfigManager;

impl ConfigManager {
    /// 获取默认配置
    pub fn get_default() -> GlobalConfig {
        GlobalConfig::default()
    }

    /// 自定义配置
    pub fn custom() -> CustomConfigBuilder {
        CustomConfigBuilder::new()
    }
}

/// 配置构建器（便于自定义配置）
#[derive(Debug, Clone, Default)]
pub struct CustomConfigBuilder {
    config: GlobalConfig,
}

impl CustomConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: GlobalConfig::default(),
        }
    }

    pub fn translate_from(mut self, lang: impl Into<String>) -> Self {
        self.config.translate_from = lang.into();
        self
    }

    pub fn translate_to(mut self, lang: impl Into<String>) -> Self {
        self.config.translate_to = lang.into();
        self
    }

    pub fn dictionary_path(mut self, path: PathBuf) -> Self {
        self.config.dictionary_path = Some(path);
        self
    }

    pub fn dictionary_cache_path(mut self, path: PathBuf) -> Self {
        self.config.dictionary_cache_path = path;
        self
    }

    pub fn dictionary_url(mut self, url: String) -> Self {
        self.config.dictionary_url = Some(url);
        self
    }

    pub fn gh_proxy_url(mut self, url: String) -> Self {
        self.config.gh_proxy_url = url;
        self
    }

    pub fn http_timeout(mut self, timeout: u64) -> Self {
        self.config.http_timeout = timeout;
        self
    }

    pub fn max_cascade_batches(mut self, max: usize) -> Self {
        // 至少处理一个批次，否则 flush 永远不会消费变更记录
        self.config.max_cascade_batches = max.max(1);
        self
    }

    pub fn warn_unmatched(mut self, warn: bool) -> Self {
        self.config.warn_unmatched = warn;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.config.verbose = verbose;
        self
    }

    pub fn build(self) -> GlobalConfig {
        self.config
    }
}
