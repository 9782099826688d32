//! 通用工具模块
//!
//! 提供对象元数据缓存、收据 ID 生成和日志初始化。

pub mod head_cache;
pub mod id_generator;
pub mod logging;

pub use head_cache::*;
pub use id_generator::*;
pub use logging::*;
