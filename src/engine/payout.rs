use crate::entities::MatchResult;
use crate::error::{EngineError, EngineResult};
use crate::models::{DigitPrizeTable, PoolSettlement, PoolSplitConfig, TierPrize};

/// 竞猜玩法单期场次数
pub const POOL_MATCH_COUNT: usize = 14;

/// 数字玩法尾数档位 (4/3/2 位)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigitTier {
    Milhar,
    Centena,
    Dezena,
}

/// 官方开奖号码规整为尾 4 位数字串 (不足左补零)
fn normalize_winning(winning: &str) -> EngineResult<String> {
    let trimmed = winning.trim();
    if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return Err(EngineError::Validation(format!(
            "winning number {winning:?} is not a digit string"
        )));
    }
    let tail = if trimmed.len() > 4 {
        &trimmed[trimmed.len() - 4..]
    } else {
        trimmed
    };
    Ok(format!("{tail:0>4}"))
}

/// 判定某个票面号码命中的最高档位 (取最长后缀, milhar 优先于 centena)
pub fn digit_suffix_tier(winning: &str, ticket_number: i64) -> EngineResult<Option<DigitTier>> {
    if ticket_number < 0 {
        return Err(EngineError::Validation(format!(
            "ticket number {ticket_number} must be non-negative"
        )));
    }
    let w = normalize_winning(winning)?;
    let t = format!("{:04}", ticket_number % 10_000);

    let tier = if w == t {
        Some(DigitTier::Milhar)
    } else if w[1..] == t[1..] {
        Some(DigitTier::Centena)
    } else if w[2..] == t[2..] {
        Some(DigitTier::Dezena)
    } else {
        None
    };
    Ok(tier)
}

/// 单个票面号码的固定奖金 (按命中档位查表, 无中奖人数均分)
pub fn compute_digit_prize(
    table: &DigitPrizeTable,
    winning: &str,
    ticket_number: i64,
) -> EngineResult<i64> {
    let amount = match digit_suffix_tier(winning, ticket_number)? {
        Some(DigitTier::Milhar) => table.milhar_cents,
        Some(DigitTier::Centena) => table.centena_cents,
        Some(DigitTier::Dezena) => table.dezena_cents,
        None => 0,
    };
    Ok(amount)
}

/// 按场次顺序统计预测命中数
pub fn count_hits(picks: &[MatchResult], results: &[MatchResult]) -> u32 {
    picks
        .iter()
        .zip(results.iter())
        .filter(|(p, r)| p == r)
        .count() as u32
}

fn apply_bp(amount_cents: i64, bp: i32) -> i64 {
    amount_cents * i64::from(bp) / 10_000
}

fn tier(hits_required: u32, pool_cents: i64, bp: i32, hit_counts: &[u32]) -> TierPrize {
    let winners = hit_counts.iter().filter(|h| **h == hits_required).count() as u64;
    let tier_total_cents = apply_bp(pool_cents, bp);
    // 无人中奖短路为 0, 禁止除零
    let per_winner_cents = if winners == 0 {
        0
    } else {
        tier_total_cents / winners as i64
    };
    TierPrize {
        hits_required,
        winners,
        tier_total_cents,
        per_winner_cents,
    }
}

/// 奖池结算。
///
/// base = 本期销售额 + 上期结转 (carried_in_cents, 仅 carry_over 策略下非零)。
/// pool = base * pool_bp; 三个档位各取 pool 的 top/second/third_bp,
/// 在恰好命中该档位命中数的票之间均分 (整数美分, 向下取整)。
/// 分配不出去的部分 (无人中奖档位 + 未配置的奖池余量 + 整除余数)
/// 全部记入 unclaimed_cents, 由调用方按 unclaimed_policy 处理。
pub fn compute_pool_settlement(
    split: &PoolSplitConfig,
    total_collected_cents: i64,
    carried_in_cents: i64,
    hit_counts: &[u32],
) -> EngineResult<PoolSettlement> {
    if total_collected_cents < 0 || carried_in_cents < 0 {
        return Err(EngineError::Validation(
            "collected and carried amounts must be non-negative".into(),
        ));
    }

    let base_cents = total_collected_cents + carried_in_cents;
    let pool_cents = apply_bp(base_cents, split.pool_bp);

    let top = tier(split.top_hits, pool_cents, split.top_bp, hit_counts);
    let second = tier(split.second_hits, pool_cents, split.second_bp, hit_counts);
    let third = tier(split.third_hits, pool_cents, split.third_bp, hit_counts);

    let distributed_cents = [&top, &second, &third]
        .iter()
        .map(|t| t.per_winner_cents * t.winners as i64)
        .sum::<i64>();
    let unclaimed_cents = pool_cents - distributed_cents;

    Ok(PoolSettlement {
        base_cents,
        pool_cents,
        top,
        second,
        third,
        distributed_cents,
        unclaimed_cents,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> DigitPrizeTable {
        DigitPrizeTable {
            milhar_cents: 500_000,
            centena_cents: 50_000,
            dezena_cents: 5_000,
        }
    }

    fn split() -> PoolSplitConfig {
        PoolSplitConfig {
            pool_bp: 7000,
            top_bp: 5000,
            second_bp: 1500,
            third_bp: 500,
            top_hits: 14,
            second_hits: 13,
            third_hits: 12,
        }
    }

    #[test]
    fn milhar_requires_all_four_digits() {
        assert_eq!(digit_suffix_tier("4123", 4123).unwrap(), Some(DigitTier::Milhar));
        assert_eq!(compute_digit_prize(&table(), "4123", 4123).unwrap(), 500_000);
    }

    #[test]
    fn three_matching_digits_pay_centena_not_milhar() {
        // 尾三位相同但尾四位不同
        assert_eq!(digit_suffix_tier("4123", 9123).unwrap(), Some(DigitTier::Centena));
        assert_eq!(compute_digit_prize(&table(), "4123", 9123).unwrap(), 50_000);
    }

    #[test]
    fn two_matching_digits_pay_dezena() {
        assert_eq!(digit_suffix_tier("4123", 9923).unwrap(), Some(DigitTier::Dezena));
        assert_eq!(compute_digit_prize(&table(), "4123", 9923).unwrap(), 5_000);
    }

    #[test]
    fn no_suffix_match_pays_nothing() {
        assert_eq!(digit_suffix_tier("4123", 9999).unwrap(), None);
        assert_eq!(compute_digit_prize(&table(), "4123", 9999).unwrap(), 0);
    }

    #[test]
    fn short_winning_string_is_left_padded() {
        // "123" 规整为 "0123"
        assert_eq!(digit_suffix_tier("123", 123).unwrap(), Some(DigitTier::Milhar));
        assert_eq!(digit_suffix_tier("123", 5123).unwrap(), Some(DigitTier::Centena));
    }

    #[test]
    fn winning_string_longer_than_four_uses_its_tail() {
        assert_eq!(digit_suffix_tier("54123", 4123).unwrap(), Some(DigitTier::Milhar));
    }

    #[test]
    fn non_digit_winning_string_is_rejected() {
        assert!(matches!(
            digit_suffix_tier("41a3", 4123).unwrap_err(),
            EngineError::Validation(_)
        ));
        assert!(matches!(
            digit_suffix_tier("", 4123).unwrap_err(),
            EngineError::Validation(_)
        ));
    }

    #[test]
    fn hit_counting_is_positional() {
        use MatchResult::{Away, Draw, Home};
        let picks = vec![Home, Draw, Away, Home];
        let results = vec![Home, Away, Away, Draw];
        assert_eq!(count_hits(&picks, &results), 2);
    }

    #[test]
    fn pool_settlement_matches_worked_example() {
        // 销售额 1000.00: pool=700.00, 二档 (700*0.15)/2 = 52.50, 三档 (700*0.05)/5 = 7.00
        let hit_counts: Vec<u32> = [vec![13u32; 2], vec![12u32; 5], vec![3u32; 10]].concat();
        let s = compute_pool_settlement(&split(), 100_000, 0, &hit_counts).unwrap();
        assert_eq!(s.pool_cents, 70_000);
        assert_eq!(s.top.winners, 0);
        assert_eq!(s.top.per_winner_cents, 0);
        assert_eq!(s.second.winners, 2);
        assert_eq!(s.second.per_winner_cents, 5_250);
        assert_eq!(s.third.winners, 5);
        assert_eq!(s.third.per_winner_cents, 700);
        assert_eq!(s.distributed_cents, 2 * 5_250 + 5 * 700);
        // 未分配: 奖池 - 已分配 (含无人中奖的头档与未配置的 30%)
        assert_eq!(s.unclaimed_cents, 70_000 - 14_000);
    }

    #[test]
    fn zero_winners_everywhere_distributes_nothing() {
        let s = compute_pool_settlement(&split(), 100_000, 0, &[5, 6, 7]).unwrap();
        assert_eq!(s.distributed_cents, 0);
        assert_eq!(s.unclaimed_cents, s.pool_cents);
    }

    #[test]
    fn carried_in_amount_joins_the_base() {
        let s = compute_pool_settlement(&split(), 100_000, 50_000, &[14]).unwrap();
        assert_eq!(s.base_cents, 150_000);
        assert_eq!(s.pool_cents, 105_000);
        assert_eq!(s.top.per_winner_cents, 52_500);
    }

    #[test]
    fn prize_for_hits_maps_tiers() {
        let s = compute_pool_settlement(&split(), 100_000, 0, &[14, 13, 12]).unwrap();
        assert_eq!(s.prize_for_hits(14), s.top.per_winner_cents);
        assert_eq!(s.prize_for_hits(13), s.second.per_winner_cents);
        assert_eq!(s.prize_for_hits(12), s.third.per_winner_cents);
        assert_eq!(s.prize_for_hits(11), 0);
    }

    #[test]
    fn negative_amounts_are_rejected() {
        assert!(matches!(
            compute_pool_settlement(&split(), -1, 0, &[]).unwrap_err(),
            EngineError::Validation(_)
        ));
    }
}
