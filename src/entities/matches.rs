use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};

/// 单场赛果 (1 = 主胜, X = 平, 2 = 客胜)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, DeriveActiveEnum, EnumIter)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "match_result")]
#[serde(rename_all = "snake_case")]
pub enum MatchResult {
    #[sea_orm(string_value = "home")]
    Home,
    #[sea_orm(string_value = "draw")]
    Draw,
    #[sea_orm(string_value = "away")]
    Away,
}

impl std::fmt::Display for MatchResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchResult::Home => write!(f, "home"),
            MatchResult::Draw => write!(f, "draw"),
            MatchResult::Away => write!(f, "away"),
        }
    }
}

/// 竞猜场次实体 - 属于某一开奖期, match_order 1..14, 赛果判定后不可变
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "matches")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub draw_id: i64,
    pub match_order: i32,
    pub home_team: String,
    pub away_team: String,
    pub result: Option<MatchResult>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Model {
    pub fn is_decided(&self) -> bool {
        self.result.is_some()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
