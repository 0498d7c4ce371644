use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::{MatchResult, TicketStatus, ticket_entity as tickets};
use crate::error::EngineError;

/// 售票请求 (上游销售流程已完成操作员/租户鉴权)
/// - anchor: 调用方指定的主号码 (仅 random 模式), 其余槽位由引擎补齐
/// - picks: 竞猜玩法的整套赛果预测, 数字玩法必须为 None
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SellTicketRequest {
    pub game_id: i64,
    pub channel_id: i64,
    pub amount_cents: i64,
    #[serde(default)]
    pub anchor: Option<i64>,
    #[serde(default)]
    pub picks: Option<Vec<MatchResult>>,
}

/// 票据响应
#[derive(Debug, Clone, Serialize)]
pub struct TicketResponse {
    pub public_id: Uuid,
    pub game_id: i64,
    pub channel_id: i64,
    pub series_number: i32,
    pub slot: i32,
    pub ticket_code: String,
    pub numbers: Vec<i64>,
    pub picks: Option<Vec<MatchResult>>,
    pub draw_at: DateTime<Utc>,
    pub amount_cents: i64,
    pub status: TicketStatus,
    pub hit_count: Option<i32>,
    pub prize_cents: Option<i64>,
}

impl TryFrom<tickets::Model> for TicketResponse {
    type Error = EngineError;

    fn try_from(m: tickets::Model) -> Result<Self, Self::Error> {
        let numbers = m.parse_numbers()?;
        let picks = m.parse_picks()?;
        Ok(TicketResponse {
            public_id: m.public_id,
            game_id: m.game_id,
            channel_id: m.channel_id,
            series_number: m.series_number,
            slot: m.slot,
            ticket_code: m.ticket_code,
            numbers,
            picks,
            draw_at: m.draw_at,
            amount_cents: m.amount_cents,
            status: m.status,
            hit_count: m.hit_count,
            prize_cents: m.prize_cents,
        })
    }
}
