use miette::Diagnostic;
use thiserror::Error;

use crate::infrastructure::config::ConfigError;

/**
 * 应用错误类型 - 使用 miette 提供诊断信息
 *
 * A rejected reconciliation plan is not an error; it is reported through
 * `PlanOutcome::Rejected` so callers can tell "no changes possible" apart
 * from a failure.
 */
#[derive(Error, Debug, Diagnostic)]
pub enum AppError {
    #[error("Validation error: {0}")]
    #[diagnostic(
        code(receipts::validation_error),
        help("Check that every receipt meets the name, type and size constraints")
    )]
    Validation(String),

    #[error("Invalid argument: {0}")]
    #[diagnostic(code(receipts::invalid_argument))]
    InvalidArgument(String),

    #[error("Missing prerequisite: {0}")]
    #[diagnostic(
        code(receipts::missing_prerequisite),
        help("Receipts can only be added when the expense request is available")
    )]
    MissingPrerequisite(String),

    #[error("Not found: {0}")]
    #[diagnostic(code(receipts::not_found))]
    NotFound(String),

    #[error("Storage error: {message}")]
    #[diagnostic(
        code(receipts::storage_error),
        help("The object store call failed; earlier soft-delete tags are not rolled back")
    )]
    Storage {
        message: String,
        key: Option<String>,
    },

    #[error("Configuration error: {0}")]
    #[diagnostic(code(receipts::config_error))]
    Config(#[from] ConfigError),
}

impl AppError {
    /**
     * 为错误添加上下文信息
     */
    pub fn with_context(self, context: impl Into<String>) -> Self {
        let context = context.into();
        match self {
            AppError::Storage { message, key } => AppError::Storage {
                message: format!("{}: {}", context, message),
                key,
            },
            AppError::Validation(message) => {
                AppError::Validation(format!("{}: {}", context, message))
            }
            other => other,
        }
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        AppError::InvalidArgument(message.into())
    }

    pub fn missing_prerequisite(message: impl Into<String>) -> Self {
        AppError::MissingPrerequisite(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        AppError::NotFound(message.into())
    }

    /**
     * 创建存储错误
     */
    pub fn storage_error(message: impl Into<String>, key: Option<String>) -> Self {
        AppError::Storage {
            message: message.into(),
            key,
        }
    }

    pub fn is_storage(&self) -> bool {
        matches!(self, AppError::Storage { .. })
    }
}

/**
 * 统一结果类型
 */
pub type Result<T> = std::result::Result<T, AppError>;
