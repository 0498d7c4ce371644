use sea_orm::DbErr;
use thiserror::Error;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Error, Debug)]
pub enum EngineError {
    /// 配置错误 (空开奖时刻表 / 非法容量 / 号码区间不可达等) - 不可自动重试
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// 批次容量/可用性错误 (FULL / PAUSED / CLOSED) - 调用方换批次或渠道后可恢复
    #[error("Capacity error: {0}")]
    Capacity(String),

    /// 随机取号采样超过上限 - 修正配置后可重试
    #[error("Allocation exhausted: {0}")]
    AllocationExhausted(String),

    /// 结算前置条件不满足 (结果未录入等) - 结算干净中止, 不写任何奖金
    #[error("Settlement precondition failed: {0}")]
    SettlementPrecondition(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error("JSON serialization/deserialization error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// 错误码 (销售端/管理端统一展示用)
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::Configuration(_) => "CONFIGURATION_ERROR",
            EngineError::Capacity(_) => "CAPACITY_ERROR",
            EngineError::AllocationExhausted(_) => "ALLOCATION_EXHAUSTED",
            EngineError::SettlementPrecondition(_) => "SETTLEMENT_PRECONDITION",
            EngineError::Validation(_) => "VALIDATION_ERROR",
            EngineError::NotFound(_) => "NOT_FOUND",
            EngineError::Database(_) => "DATABASE_ERROR",
            EngineError::SerdeJson(_) => "SERDE_JSON_ERROR",
            EngineError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}
