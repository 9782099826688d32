//! 配置管理基础设施层
//!
//! Receipt storage settings are resolved in three layers:
//! - 默认值 (serde defaults)
//! - 可选配置文件 (TOML / JSON)
//! - 环境变量 (`RECEIPTS_*`, plus the JSON tag map in `RECEIPT_S3_TAGS_TO_ADD`)

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use validator::Validate;

/// 环境变量前缀
pub const ENV_PREFIX: &str = "RECEIPTS";

/// Soft-delete tag map, encoded as a JSON object.
pub const SOFT_DELETE_TAGS_ENV: &str = "RECEIPT_S3_TAGS_TO_ADD";

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置验证失败: {0}")]
    Validation(String),

    #[error("配置文件不存在: {0}")]
    FileNotFound(PathBuf),

    #[error("配置文件格式错误: {0}")]
    FormatError(String),

    #[error("配置值无效: {0}")]
    InvalidValue(String),
}

impl From<::config::ConfigError> for ConfigError {
    fn from(err: ::config::ConfigError) -> Self {
        ConfigError::FormatError(err.to_string())
    }
}

/// 收据存储配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ReceiptsConfig {
    /// Bucket holding both staged and permanent receipt objects
    #[serde(default)]
    #[validate(length(min = 1, max = 255, message = "bucket_name must be 1-255 characters"))]
    pub bucket_name: String,

    /// Prefix of staged uploads, including its trailing separator
    #[serde(default = "default_temp_key_prefix")]
    #[validate(length(max = 200))]
    pub temp_key_prefix: String,

    /// Prefix of confirmed receipts, including its trailing separator
    #[serde(default = "default_receipt_key_prefix")]
    #[validate(length(max = 200))]
    pub receipt_key_prefix: String,

    /// Tags applied on removal; a bucket lifecycle rule purges tagged objects
    #[serde(default = "default_soft_delete_tags")]
    pub soft_delete_tags: HashMap<String, String>,

    /// 头信息缓存 TTL（秒）
    #[serde(default = "default_head_cache_ttl_secs")]
    #[validate(range(min = 1, max = 3600, message = "head_cache_ttl_secs must be 1-3600"))]
    pub head_cache_ttl_secs: u64,
}

fn default_temp_key_prefix() -> String {
    "temp/".to_string()
}

fn default_receipt_key_prefix() -> String {
    "receipts/".to_string()
}

fn default_soft_delete_tags() -> HashMap<String, String> {
    HashMap::from([("delete".to_string(), "schedule".to_string())])
}

fn default_head_cache_ttl_secs() -> u64 {
    30
}

impl Default for ReceiptsConfig {
    fn default() -> Self {
        Self {
            bucket_name: String::new(),
            temp_key_prefix: default_temp_key_prefix(),
            receipt_key_prefix: default_receipt_key_prefix(),
            soft_delete_tags: default_soft_delete_tags(),
            head_cache_ttl_secs: default_head_cache_ttl_secs(),
        }
    }
}

impl ReceiptsConfig {
    /// Build a validated config for the given bucket with every other value defaulted.
    pub fn for_bucket(bucket_name: impl Into<String>) -> Self {
        Self {
            bucket_name: bucket_name.into(),
            ..Self::default()
        }
    }

    /// 从配置文件和进程环境变量加载配置
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let tags_json = std::env::var(SOFT_DELETE_TAGS_ENV).ok();
        Self::load_with_env(config_file, None, tags_json.as_deref())
    }

    /// Load from an optional file, an explicit environment map (the process
    /// environment when `None`) and an optional JSON tag map.
    pub fn load_with_env(
        config_file: Option<&Path>,
        env: Option<HashMap<String, String>>,
        soft_delete_tags_json: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let mut builder = ::config::Config::builder();

        if let Some(path) = config_file {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path.to_path_buf()));
            }
            builder = builder.add_source(::config::File::from(path));
        }

        builder = builder.add_source(
            ::config::Environment::with_prefix(ENV_PREFIX)
                .try_parsing(true)
                .source(env),
        );

        let mut loaded: ReceiptsConfig = builder.build()?.try_deserialize()?;

        if let Some(json) = soft_delete_tags_json {
            loaded.soft_delete_tags = parse_tag_map(json)?;
        }

        loaded.validated()
    }

    /// 校验配置并返回自身
    pub fn validated(self) -> Result<Self, ConfigError> {
        self.validate()
            .map_err(|e| ConfigError::Validation(e.to_string()))?;
        Ok(self)
    }

    pub fn head_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.head_cache_ttl_secs)
    }
}

/// Parse a flat string-to-string JSON object.
pub fn parse_tag_map(json: &str) -> Result<HashMap<String, String>, ConfigError> {
    if json.trim().is_empty() {
        return Ok(HashMap::new());
    }
    serde_json::from_str(json)
        .map_err(|e| ConfigError::InvalidValue(format!("{}: {}", SOFT_DELETE_TAGS_ENV, e)))
}
