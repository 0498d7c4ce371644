use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 开奖期实体 - (game_id, draw_at) 唯一; 结果录入后不可变
/// - result: 数字玩法官方开奖号码 (数字串); 竞猜玩法结果在 matches 表
/// - settled_at: 结算完成标记, 防止重复结算改写奖金
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "draws")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub game_id: i64,
    pub draw_at: DateTime<Utc>,
    pub result: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub settled_at: Option<DateTime<Utc>>,
    pub total_collected_cents: i64,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Model {
    pub fn is_published(&self) -> bool {
        self.published_at.is_some()
    }

    pub fn is_settled(&self) -> bool {
        self.settled_at.is_some()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
