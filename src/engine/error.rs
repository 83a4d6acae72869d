// ==========================================
// 培训中心排课系统 - 引擎层错误类型
// ==========================================
// 说明: 写入失败时已提交的条目保留在库中，
//       错误携带失败前已写入的条目数
// ==========================================

use thiserror::Error;

use crate::config::generation_config::ConfigError;
use crate::repository::error::RepositoryError;

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("生成配置无效: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error("名录读取失败: {0}")]
    DirectoryReadFailed(#[source] RepositoryError),

    #[error("清空课表失败: {0}")]
    ClearFailed(#[source] RepositoryError),

    #[error("课表写入失败 (失败前已写入 {written_before_failure} 条): {source}")]
    StoreWriteFailed {
        written_before_failure: usize,
        #[source]
        source: RepositoryError,
    },
}

impl GenerationError {
    /// 失败前已持久化的条目数
    pub fn written_before_failure(&self) -> usize {
        match self {
            GenerationError::StoreWriteFailed {
                written_before_failure,
                ..
            } => *written_before_failure,
            _ => 0,
        }
    }
}

pub type GenerationResult<T> = Result<T, GenerationError>;
