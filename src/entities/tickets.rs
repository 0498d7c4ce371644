use super::matches::MatchResult;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, DeriveActiveEnum, EnumIter)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "ticket_status")]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "paid")]
    Paid,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
    #[sea_orm(string_value = "winner")]
    Winner,
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TicketStatus::Pending => write!(f, "pending"),
            TicketStatus::Paid => write!(f, "paid"),
            TicketStatus::Cancelled => write!(f, "cancelled"),
            TicketStatus::Winner => write!(f, "winner"),
        }
    }
}

/// 票据实体 - 创建后不可变; 命中数与奖金在结算后写入且不再变更
/// - numbers: 号码列表 (JSON), sequential 模式为批次内序号, random 模式为投注号码
/// - picks: 竞猜玩法的 14 场赛果预测 (JSON), 数字玩法为 NULL
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "tickets")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub public_id: Uuid,
    pub game_id: i64,
    pub channel_id: i64,
    pub series_id: i64,
    pub series_number: i32,
    pub slot: i32,
    pub ticket_code: String,
    pub numbers: String,
    pub picks: Option<String>,
    pub draw_at: DateTime<Utc>,
    pub amount_cents: i64,
    pub status: TicketStatus,
    pub hit_count: Option<i32>,
    pub prize_cents: Option<i64>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Model {
    pub fn parse_numbers(&self) -> Result<Vec<i64>, serde_json::Error> {
        serde_json::from_str(&self.numbers)
    }

    pub fn parse_picks(&self) -> Result<Option<Vec<MatchResult>>, serde_json::Error> {
        match &self.picks {
            Some(raw) => Ok(Some(serde_json::from_str(raw)?)),
            None => Ok(None),
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
