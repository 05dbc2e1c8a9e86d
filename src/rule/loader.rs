//! 词典加载管理器
//! 负责从本地文件、本地缓存或远程地址读取词典

use std::path::Path;
use reqwest::Client;
use tracing::{debug, warn};

use super::model::DictionaryFile;
use super::cache::DictionaryCacheManager;
use crate::error::{LocResult, LocalizerError};
use crate::config::GlobalConfig;

/// 词典文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DictionaryFormat {
    /// JSON 数组
    Json,
    /// MessagePack（与本地缓存相同的格式）
    MsgPack,
}

impl DictionaryFormat {
    /// 根据文件扩展名判断格式，无法识别时按 JSON 处理
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("mp") || ext.eq_ignore_ascii_case("msgpack") => Self::MsgPack,
            _ => Self::Json,
        }
    }
}

/// 词典加载管理器
pub struct DictionaryLoader;

impl DictionaryLoader {
    /// 加载词典
    ///
    /// 指定了本地词典文件时直接读取；否则优先本地缓存，缓存失效则拉取远程并回写缓存。
    pub async fn load(config: &GlobalConfig) -> LocResult<DictionaryFile> {
        if let Some(path) = &config.dictionary_path {
            return Self::load_file(path).await;
        }

        // 1. 优先加载本地缓存
        if let Ok(dictionary) = DictionaryCacheManager::load_from_cache(config).await {
            debug!("从本地缓存加载词典成功");
            return Ok(dictionary);
        }
        warn!("本地缓存不存在或损坏，将拉取远程词典");

        // 2. 拉取远程词典
        let dictionary = Self::fetch_remote(config).await?;

        // 3. 缓存到本地
        if let Err(e) = DictionaryCacheManager::save_to_cache(config, &dictionary).await {
            warn!("词典缓存到本地失败：{}", e);
        } else {
            debug!("远程词典已缓存到本地");
        }

        Ok(dictionary)
    }

    /// 读取本地词典文件
    pub async fn load_file(path: &Path) -> LocResult<DictionaryFile> {
        let data = tokio::fs::read(path).await.map_err(|e| {
            LocalizerError::RuleLoadError(format!("读取词典文件 {} 失败：{}", path.display(), e))
        })?;
        let dictionary = Self::from_bytes(&data, DictionaryFormat::from_path(path))?;
        debug!("词典文件 {} 加载成功，路由分组数：{}", path.display(), dictionary.rule_sets.len());
        Ok(dictionary)
    }

    /// 按指定格式解析词典数据
    pub fn from_bytes(data: &[u8], format: DictionaryFormat) -> LocResult<DictionaryFile> {
        match format {
            DictionaryFormat::Json => Ok(serde_json::from_slice(data)?),
            DictionaryFormat::MsgPack => DictionaryCacheManager::decode(data),
        }
    }

    /// 解析 JSON 文本
    pub fn from_json_str(json: &str) -> LocResult<DictionaryFile> {
        Ok(serde_json::from_str(json)?)
    }

    /// 拉取远程词典（原始URL失败时尝试代理URL）
    pub async fn fetch_remote(config: &GlobalConfig) -> LocResult<DictionaryFile> {
        let Some(raw_url) = config.dictionary_url.as_deref() else {
            return Err(LocalizerError::RuleLoadError("未配置远程词典URL，且本地缓存不可用".to_string()));
        };
        // 提前校验URL，避免无效地址进入请求流程
        let parsed = url::Url::parse(raw_url)?;

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.http_timeout))
            .build()?;
        let format = DictionaryFormat::from_path(Path::new(parsed.path()));

        debug!("开始拉取远程词典，URL：{}", raw_url);
        match Self::fetch_dictionary_file(&client, raw_url, format).await {
            Ok(dictionary) => {
                debug!("成功拉取远程词典，路由分组数：{}", dictionary.rule_sets.len());
                Ok(dictionary)
            }
            Err(e) => {
                let proxy_path = raw_url.trim_start_matches("https://");
                let fallback_url = format!("{}{}", config.gh_proxy_url, proxy_path);
                warn!("拉取远程词典失败：{}，尝试代理URL：{}", e, fallback_url);
                Self::fetch_dictionary_file(&client, &fallback_url, format).await.map_err(|proxy_e| {
                    LocalizerError::RuleLoadError(format!("远程词典拉取失败（含代理）：{}", proxy_e))
                })
            }
        }
    }

    async fn fetch_dictionary_file(client: &Client, url: &str, format: DictionaryFormat) -> LocResult<DictionaryFile> {
        let response = client.get(url)
            .header("User-Agent", concat!("rslocalizer/", env!("CARGO_PKG_VERSION")))
            .header("Accept-Encoding", "gzip, deflate")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(LocalizerError::RuleLoadError(format!(
                "URL {} 返回状态码 {}",
                url, response.status()
            )));
        }

        let bytes = response.bytes().await?;
        Self::from_bytes(&bytes, format)
    }
}
