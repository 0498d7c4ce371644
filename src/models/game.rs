use chrono::{FixedOffset, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::entities::{GameKind, NumberingMode, UnclaimedPolicy, game_entity as games};
use crate::error::EngineError;

/// 数字玩法各尾数档位的固定奖金 (无中奖人数均分)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigitPrizeTable {
    /// 尾 4 位全中 (milhar)
    pub milhar_cents: i64,
    /// 尾 3 位中 (centena)
    pub centena_cents: i64,
    /// 尾 2 位中 (dezena)
    pub dezena_cents: i64,
}

/// 竞猜玩法奖池分成配置 (basis points, 1% = 100bp)
/// pool_bp 是销售额进入奖池的比例, 其余归运营方;
/// top/second/third_bp 是奖池内各档位的比例, 按命中数档位均分给并列中奖者
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolSplitConfig {
    pub pool_bp: i32,
    pub top_bp: i32,
    pub second_bp: i32,
    pub third_bp: i32,
    pub top_hits: u32,
    pub second_hits: u32,
    pub third_hits: u32,
}

/// 校验后的玩法配置 (领域对象), 由 games 实体构建。
/// 所有配置类错误在这里一次性暴露, 引擎内部不再重复校验。
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub id: i64,
    pub name: String,
    pub kind: GameKind,
    pub extraction_times: Vec<NaiveTime>,
    pub cutoff_minutes: i64,
    pub utc_offset: FixedOffset,
    pub numbering_mode: NumberingMode,
    pub max_tickets_per_series: i32,
    pub numbers_per_ticket: u32,
    pub number_range: i64,
    pub digit_prizes: DigitPrizeTable,
    pub pool_split: PoolSplitConfig,
    pub unclaimed_policy: UnclaimedPolicy,
}

/// 玩法配置创建/更新请求 (管理端)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GameUpsertRequest {
    pub name: String,
    pub kind: GameKind,
    /// 每日开奖时刻表, 如 ["08:00","11:00","16:00"]
    pub extraction_times: Vec<String>,
    pub cutoff_minutes: i32,
    pub utc_offset_minutes: i32,
    pub numbering_mode: NumberingMode,
    pub max_tickets_per_series: i32,
    pub numbers_per_ticket: i32,
    pub number_range: i64,
    #[serde(default)]
    pub milhar_prize_cents: i64,
    #[serde(default)]
    pub centena_prize_cents: i64,
    #[serde(default)]
    pub dezena_prize_cents: i64,
    #[serde(default = "default_pool_bp")]
    pub pool_bp: i32,
    #[serde(default = "default_top_bp")]
    pub top_bp: i32,
    #[serde(default = "default_second_bp")]
    pub second_bp: i32,
    #[serde(default = "default_third_bp")]
    pub third_bp: i32,
    #[serde(default = "default_top_hits")]
    pub top_hits: i32,
    #[serde(default = "default_second_hits")]
    pub second_hits: i32,
    #[serde(default = "default_third_hits")]
    pub third_hits: i32,
    pub unclaimed_policy: UnclaimedPolicy,
}

fn default_pool_bp() -> i32 {
    7000
}
fn default_top_bp() -> i32 {
    5000
}
fn default_second_bp() -> i32 {
    1500
}
fn default_third_bp() -> i32 {
    500
}
fn default_top_hits() -> i32 {
    14
}
fn default_second_hits() -> i32 {
    13
}
fn default_third_hits() -> i32 {
    12
}

/// 残差类别数上限: 同票号码按 mod 1000 互斥, 可用类别至多 1000 个
const RESIDUE_CLASSES: i64 = 1000;

fn parse_time(raw: &str) -> Result<NaiveTime, EngineError> {
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .map_err(|_| EngineError::Configuration(format!("invalid extraction time {raw:?}")))
}

impl TryFrom<games::Model> for GameConfig {
    type Error = EngineError;

    fn try_from(m: games::Model) -> Result<Self, Self::Error> {
        let raw_times: Vec<String> = serde_json::from_str(&m.extraction_times).map_err(|e| {
            EngineError::Configuration(format!("extraction_times is not a JSON string array: {e}"))
        })?;
        if raw_times.is_empty() {
            return Err(EngineError::Configuration(
                "extraction_times must not be empty".into(),
            ));
        }
        let extraction_times = raw_times
            .iter()
            .map(|s| parse_time(s))
            .collect::<Result<Vec<_>, _>>()?;

        if m.cutoff_minutes < 1 {
            return Err(EngineError::Configuration(format!(
                "cutoff_minutes must be >= 1, got {}",
                m.cutoff_minutes
            )));
        }
        if m.max_tickets_per_series < 1 {
            return Err(EngineError::Configuration(format!(
                "max_tickets_per_series must be >= 1, got {}",
                m.max_tickets_per_series
            )));
        }
        if m.numbers_per_ticket < 1 {
            return Err(EngineError::Configuration(format!(
                "numbers_per_ticket must be >= 1, got {}",
                m.numbers_per_ticket
            )));
        }
        if m.number_range < 1 {
            return Err(EngineError::Configuration(format!(
                "number_range must be >= 1, got {}",
                m.number_range
            )));
        }
        // random 模式要求每个号码占据独立的 mod-1000 残差类,
        // numbers_per_ticket 超出可用类别数即为不可达配置
        if m.numbering_mode == NumberingMode::Random {
            let limit = m.number_range.min(RESIDUE_CLASSES);
            if i64::from(m.numbers_per_ticket) > limit {
                return Err(EngineError::Configuration(format!(
                    "numbers_per_ticket {} unreachable: number_range {} allows at most {} distinct mod-1000 residues",
                    m.numbers_per_ticket, m.number_range, limit
                )));
            }
        }

        let utc_offset = m
            .utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                EngineError::Configuration(format!(
                    "utc_offset_minutes {} out of range",
                    m.utc_offset_minutes
                ))
            })?;

        for (label, bp) in [
            ("pool_bp", m.pool_bp),
            ("top_bp", m.top_bp),
            ("second_bp", m.second_bp),
            ("third_bp", m.third_bp),
        ] {
            if !(0..=10_000).contains(&bp) {
                return Err(EngineError::Configuration(format!(
                    "{label} must be within 0..=10000, got {bp}"
                )));
            }
        }
        if m.top_bp + m.second_bp + m.third_bp > 10_000 {
            return Err(EngineError::Configuration(
                "tier basis points must not exceed 10000 in total".into(),
            ));
        }
        if m.kind == GameKind::Pool
            && !(m.top_hits > m.second_hits && m.second_hits > m.third_hits && m.third_hits >= 0)
        {
            return Err(EngineError::Configuration(format!(
                "tier hit thresholds must be strictly descending, got {}/{}/{}",
                m.top_hits, m.second_hits, m.third_hits
            )));
        }

        Ok(GameConfig {
            id: m.id,
            name: m.name,
            kind: m.kind,
            extraction_times,
            cutoff_minutes: i64::from(m.cutoff_minutes),
            utc_offset,
            numbering_mode: m.numbering_mode,
            max_tickets_per_series: m.max_tickets_per_series,
            numbers_per_ticket: m.numbers_per_ticket as u32,
            number_range: m.number_range,
            digit_prizes: DigitPrizeTable {
                milhar_cents: m.milhar_prize_cents,
                centena_cents: m.centena_prize_cents,
                dezena_cents: m.dezena_prize_cents,
            },
            pool_split: PoolSplitConfig {
                pool_bp: m.pool_bp,
                top_bp: m.top_bp,
                second_bp: m.second_bp,
                third_bp: m.third_bp,
                top_hits: m.top_hits as u32,
                second_hits: m.second_hits as u32,
                third_hits: m.third_hits as u32,
            },
            unclaimed_policy: m.unclaimed_policy,
        })
    }
}
