use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};

/// 玩法类型:
/// - digit: 数字尾数玩法 (milhar/centena/dezena 固定赔付)
/// - pool: 足球竞猜玩法 (14 场赛果, 奖池分成)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, DeriveActiveEnum, EnumIter)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "game_kind")]
#[serde(rename_all = "snake_case")]
pub enum GameKind {
    #[sea_orm(string_value = "digit")]
    Digit,
    #[sea_orm(string_value = "pool")]
    Pool,
}

impl std::fmt::Display for GameKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GameKind::Digit => write!(f, "digit"),
            GameKind::Pool => write!(f, "pool"),
        }
    }
}

/// 出票编号模式:
/// - sequential: 批次内自增序号 (渠道票号, 非投注号码)
/// - random: 随机取号, 同票内百位残差 (mod 1000) 互斥
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, DeriveActiveEnum, EnumIter)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "numbering_mode")]
#[serde(rename_all = "snake_case")]
pub enum NumberingMode {
    #[sea_orm(string_value = "sequential")]
    Sequential,
    #[sea_orm(string_value = "random")]
    Random,
}

impl std::fmt::Display for NumberingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NumberingMode::Sequential => write!(f, "sequential"),
            NumberingMode::Random => write!(f, "random"),
        }
    }
}

/// 无人中奖档位资金去向
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, DeriveActiveEnum, EnumIter)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "unclaimed_policy")]
#[serde(rename_all = "snake_case")]
pub enum UnclaimedPolicy {
    #[sea_orm(string_value = "house")]
    House,
    #[sea_orm(string_value = "carry_over")]
    CarryOver,
}

impl std::fmt::Display for UnclaimedPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnclaimedPolicy::House => write!(f, "house"),
            UnclaimedPolicy::CarryOver => write!(f, "carry_over"),
        }
    }
}

/// 玩法配置实体
/// 概念说明:
/// - extraction_times: 每日开奖时刻表, JSON 数组, 如 ["08:00","11:00","16:00"]
/// - cutoff_minutes: 截售提前量 (分钟)
/// - utc_offset_minutes: 运营日历的固定民用时偏移 (无夏令时), 如巴西利亚 -180
/// - number_range: 随机取号区间上界 (开区间)
/// - *_prize_cents: 数字玩法各档位固定奖金 (美分)
/// - *_bp: 奖池分成 (basis points) 1% = 100bp
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "games")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    pub kind: GameKind,
    pub extraction_times: String,
    pub cutoff_minutes: i32,
    pub utc_offset_minutes: i32,
    pub numbering_mode: NumberingMode,
    pub max_tickets_per_series: i32,
    pub numbers_per_ticket: i32,
    pub number_range: i64,
    pub milhar_prize_cents: i64,
    pub centena_prize_cents: i64,
    pub dezena_prize_cents: i64,
    pub pool_bp: i32,
    pub top_bp: i32,
    pub second_bp: i32,
    pub third_bp: i32,
    pub top_hits: i32,
    pub second_hits: i32,
    pub third_hits: i32,
    pub unclaimed_policy: UnclaimedPolicy,
    pub is_active: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
