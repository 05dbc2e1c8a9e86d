//! 词典缓存管理
//! 仅处理词典文件的本地序列化（MessagePack）和反序列化

use rmp_serde::{Serializer, from_slice};
use serde::Serialize;
use tracing::debug;

use super::model::DictionaryFile;
use crate::error::{LocResult, LocalizerError};
use crate::config::GlobalConfig;

/// 词典缓存管理器
pub struct DictionaryCacheManager;

impl DictionaryCacheManager {
    /// 从本地缓存加载词典
    pub async fn load_from_cache(config: &GlobalConfig) -> LocResult<DictionaryFile> {
        let cache_path = &config.dictionary_cache_path;
        let cache_data = tokio::fs::read(cache_path).await?;

        let dictionary = Self::decode(&cache_data)?;
        debug!("缓存文件反序列化成功，路由分组数：{}，条目数：{}", dictionary.rule_sets.len(), dictionary.entry_count());

        Ok(dictionary)
    }

    /// 将词典缓存到本地
    pub async fn save_to_cache(config: &GlobalConfig, dictionary: &DictionaryFile) -> LocResult<()> {
        let cache_path = &config.dictionary_cache_path;
        let cache_data = Self::encode(dictionary)?;
        debug!("词典序列化成功，序列化后数据大小：{} 字节", cache_data.len());

        tokio::fs::write(cache_path, cache_data)
            .await
            .map_err(|e| LocalizerError::RuleCacheError(format!("写入 {} 失败：{}", cache_path.display(), e)))?;
        Ok(())
    }

    /// 清除本地缓存
    pub async fn clear_cache(config: &GlobalConfig) -> LocResult<()> {
        let cache_path = &config.dictionary_cache_path;
        if cache_path.exists() {
            tokio::fs::remove_file(cache_path).await?;
        }
        Ok(())
    }

    /// MessagePack 编码（结构体按 map 写出，保证 flatten 字段可以读回）
    pub fn encode(dictionary: &DictionaryFile) -> LocResult<Vec<u8>> {
        let mut data = Vec::new();
        dictionary
            .serialize(&mut Serializer::new(&mut data).with_struct_map())
            .map_err(|e| LocalizerError::MsgPackError(format!("序列化失败：{}", e)))?;
        Ok(data)
    }

    /// MessagePack 解码
    pub fn decode(data: &[u8]) -> LocResult<DictionaryFile> {
        from_slice(data).map_err(|e| LocalizerError::MsgPackError(format!("反序列化失败：{}", e)))
    }
}
