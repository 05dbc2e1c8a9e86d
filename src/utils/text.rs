//! 文本处理工具

/// 文本工具
pub struct TextUtils;

impl TextUtils {
    /// 是否只包含换行、回车和空格
    pub fn is_blank(text: &str) -> bool {
        text.chars().all(|c| matches!(c, '\n' | '\r' | ' '))
    }

    /// 去除两端空白后的文本
    pub fn trim(text: &str) -> &str {
        text.trim()
    }

    /// 只替换第一次出现的片段
    pub fn replace_first(text: &str, from: &str, to: &str) -> String {
        text.replacen(from, to, 1)
    }

    /// 日志输出用的截断文本
    pub fn preview(text: &str, max_chars: usize) -> String {
        let trimmed = text.trim();
        match trimmed.char_indices().nth(max_chars) {
            Some((end, _)) => format!("{}…", &trimmed[..end]),
            None => trimmed.to_string(),
        }
    }
}
