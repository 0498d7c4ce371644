use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};

/// 批次状态机:
/// - active -> full: 占满容量后自动翻转
/// - paused: 仅管理操作设置/解除, 无视容量直接拒售
/// - closed: 终态, 不可逆
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, DeriveActiveEnum, EnumIter)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "series_status")]
#[serde(rename_all = "snake_case")]
pub enum SeriesStatus {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "full")]
    Full,
    #[sea_orm(string_value = "paused")]
    Paused,
    #[sea_orm(string_value = "closed")]
    Closed,
}

impl std::fmt::Display for SeriesStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SeriesStatus::Active => write!(f, "active"),
            SeriesStatus::Full => write!(f, "full"),
            SeriesStatus::Paused => write!(f, "paused"),
            SeriesStatus::Closed => write!(f, "closed"),
        }
    }
}

/// 票据批次实体 - 按 (game_id, channel_id) 滚动编号
/// max_tickets 为开批时玩法配置的快照, 配置更新不影响已开批次
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "series")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub game_id: i64,
    pub channel_id: i64,
    pub series_number: i32,
    pub sold_count: i32,
    pub max_tickets: i32,
    pub status: SeriesStatus,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Model {
    /// 剩余可售位
    pub fn remaining(&self) -> i32 {
        (self.max_tickets - self.sold_count).max(0)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
