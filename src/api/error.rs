// ==========================================
// 培训中心排课系统 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型，转换下层错误为用户可读的错误消息
// 映射: 400 输入错误 / 404 不存在 / 409 时段冲突 / 500 其他
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::generation_config::ConfigError;
use crate::domain::schedule::ScheduleEntry;
use crate::engine::error::GenerationError;
use crate::repository::error::RepositoryError;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 业务规则错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    /// 人工排课时段冲突（带冲突条目）
    #[error("时段冲突: {message}")]
    ScheduleConflict {
        message: String,
        conflicts: Vec<ConflictDetail>,
    },

    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    /// 生成过程中写入失败，已写入的条目保留
    #[error("排课生成失败 (已写入 {written_before_failure} 条): {message}")]
    GenerationFailed {
        message: String,
        written_before_failure: usize,
    },

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    /// HTTP 状态码
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::InvalidInput(_) => 400,
            ApiError::NotFound(_) => 404,
            ApiError::ScheduleConflict { .. } | ApiError::BusinessRuleViolation(_) => 409,
            _ => 500,
        }
    }

    /// 错误代码（返回给前端）
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::InvalidInput(_) => "INVALID_INPUT",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::ScheduleConflict { .. } => "SCHEDULE_CONFLICT",
            ApiError::BusinessRuleViolation(_) => "BUSINESS_RULE_VIOLATION",
            ApiError::GenerationFailed { .. } => "GENERATION_FAILED",
            ApiError::DatabaseError(_) => "DATABASE_ERROR",
            ApiError::DatabaseConnectionError(_) => "DATABASE_CONNECTION_ERROR",
            ApiError::DatabaseTransactionError(_) => "DATABASE_TRANSACTION_ERROR",
            ApiError::InternalError(_) => "INTERNAL_ERROR",
            ApiError::Other(_) => "OTHER_ERROR",
        }
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::DatabaseConnectionError(msg) => ApiError::DatabaseConnectionError(msg),
            RepositoryError::DatabaseTransactionError(msg) => {
                ApiError::DatabaseTransactionError(msg)
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("外键约束违反: {}", msg))
            }
            RepositoryError::CheckConstraintViolation(msg) => {
                ApiError::InvalidInput(format!("检查约束违反: {}", msg))
            }
            RepositoryError::FieldValueError { field, message } => {
                ApiError::InvalidInput(format!("字段{}错误: {}", field, message))
            }
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        ApiError::InvalidInput(err.to_string())
    }
}

impl From<GenerationError> for ApiError {
    fn from(err: GenerationError) -> Self {
        match err {
            GenerationError::InvalidConfig(e) => e.into(),
            GenerationError::DirectoryReadFailed(e) => e.into(),
            GenerationError::ClearFailed(e) => ApiError::DatabaseError(format!("清空课表失败: {}", e)),
            GenerationError::StoreWriteFailed {
                written_before_failure,
                source,
            } => ApiError::GenerationFailed {
                message: source.to_string(),
                written_before_failure,
            },
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

// ==========================================
// 冲突详情
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictDetail {
    pub id: i64,
    pub student_name: String,
    pub machine_name: String,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
}

impl From<&ScheduleEntry> for ConflictDetail {
    fn from(entry: &ScheduleEntry) -> Self {
        Self {
            id: entry.id,
            student_name: entry.subject_name.clone(),
            machine_name: entry.resource_name.clone(),
            start_time: entry.start_time,
            end_time: entry.end_time,
        }
    }
}
