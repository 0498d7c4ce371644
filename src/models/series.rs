use serde::Serialize;

use crate::entities::{SeriesStatus, series_entity as series};

/// 批次状态响应
#[derive(Debug, Clone, Serialize)]
pub struct SeriesResponse {
    pub id: i64,
    pub game_id: i64,
    pub channel_id: i64,
    pub series_number: i32,
    pub sold_count: i32,
    pub max_tickets: i32,
    pub remaining: i32,
    pub status: SeriesStatus,
}

impl From<series::Model> for SeriesResponse {
    fn from(m: series::Model) -> Self {
        let remaining = m.remaining();
        SeriesResponse {
            id: m.id,
            game_id: m.game_id,
            channel_id: m.channel_id,
            series_number: m.series_number,
            sold_count: m.sold_count,
            max_tickets: m.max_tickets,
            remaining,
            status: m.status,
        }
    }
}
