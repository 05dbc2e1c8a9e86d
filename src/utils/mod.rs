//! 工具模块
pub mod text;

pub use self::text::TextUtils;
