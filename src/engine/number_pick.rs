use rand::Rng;
use std::collections::HashSet;

use crate::error::{EngineError, EngineResult};
use crate::models::GameConfig;

/// 同票号码互斥的残差模数 (尾三位 "centena" 残差)
pub const RESIDUE_MODULUS: i64 = 1_000;

/// 拒绝采样总次数上限, 超限报配置错误而非死循环
pub const MAX_SAMPLING_ATTEMPTS: u32 = 10_000;

/// random 模式取号。
///
/// 锚号 (anchor) 若存在则作为第一个号码, 其残差先行占位;
/// 其余槽位在 [0, number_range) 均匀采样, 候选值需同时满足:
/// 1. 未被本票选中
/// 2. 未被本批次已售票据占用 (issued, 由外层事务边界保证一致性)
/// 3. mod-1000 残差未被本票占用
///
/// 结果保证 numbers_per_ticket 个号码两两互异且残差类两两互异 (含锚号)。
pub fn pick_unique_numbers<R: Rng>(
    rng: &mut R,
    config: &GameConfig,
    anchor: Option<i64>,
    issued: &HashSet<i64>,
) -> EngineResult<Vec<i64>> {
    let wanted = config.numbers_per_ticket as usize;
    let mut chosen: Vec<i64> = Vec::with_capacity(wanted);
    let mut chosen_set: HashSet<i64> = HashSet::with_capacity(wanted);
    let mut residues: HashSet<i64> = HashSet::with_capacity(wanted);

    if let Some(a) = anchor {
        if a < 0 || a >= config.number_range {
            return Err(EngineError::Validation(format!(
                "anchor {a} outside [0, {})",
                config.number_range
            )));
        }
        if issued.contains(&a) {
            return Err(EngineError::Validation(format!(
                "anchor {a} already issued in this series"
            )));
        }
        chosen.push(a);
        chosen_set.insert(a);
        residues.insert(a % RESIDUE_MODULUS);
    }

    let mut attempts = 0u32;
    while chosen.len() < wanted {
        attempts += 1;
        if attempts > MAX_SAMPLING_ATTEMPTS {
            return Err(EngineError::AllocationExhausted(format!(
                "gave up after {MAX_SAMPLING_ATTEMPTS} samples; \
                 check number_range vs numbers_per_ticket and series saturation"
            )));
        }
        let candidate = rng.gen_range(0..config.number_range);
        if chosen_set.contains(&candidate)
            || issued.contains(&candidate)
            || residues.contains(&(candidate % RESIDUE_MODULUS))
        {
            continue;
        }
        chosen.push(candidate);
        chosen_set.insert(candidate);
        residues.insert(candidate % RESIDUE_MODULUS);
    }

    Ok(chosen)
}

/// sequential 模式的渠道票号: 批次内序号按容量位宽补零
pub fn format_ticket_code(slot: i32, max_tickets: i32) -> String {
    let width = max_tickets.max(1).to_string().len();
    format!("{slot:0width$}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{GameKind, NumberingMode, UnclaimedPolicy};
    use crate::models::{DigitPrizeTable, PoolSplitConfig};
    use chrono::FixedOffset;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn config(numbers_per_ticket: u32, number_range: i64) -> GameConfig {
        GameConfig {
            id: 1,
            name: "Milhar Diária".into(),
            kind: GameKind::Digit,
            extraction_times: vec![],
            cutoff_minutes: 10,
            utc_offset: FixedOffset::west_opt(3 * 3600).unwrap(),
            numbering_mode: NumberingMode::Random,
            max_tickets_per_series: 100,
            numbers_per_ticket,
            number_range,
            digit_prizes: DigitPrizeTable {
                milhar_cents: 0,
                centena_cents: 0,
                dezena_cents: 0,
            },
            pool_split: PoolSplitConfig {
                pool_bp: 7000,
                top_bp: 5000,
                second_bp: 1500,
                third_bp: 500,
                top_hits: 14,
                second_hits: 13,
                third_hits: 12,
            },
            unclaimed_policy: UnclaimedPolicy::House,
        }
    }

    #[test]
    fn numbers_and_residues_are_pairwise_distinct() {
        let cfg = config(5, 10_000);
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..200 {
            let numbers = pick_unique_numbers(&mut rng, &cfg, None, &HashSet::new()).unwrap();
            assert_eq!(numbers.len(), 5);
            let values: HashSet<i64> = numbers.iter().copied().collect();
            assert_eq!(values.len(), 5);
            let residues: HashSet<i64> = numbers.iter().map(|n| n % RESIDUE_MODULUS).collect();
            assert_eq!(residues.len(), 5);
        }
    }

    #[test]
    fn anchor_is_kept_first_and_its_residue_blocked() {
        let cfg = config(4, 10_000);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let numbers = pick_unique_numbers(&mut rng, &cfg, Some(4123), &HashSet::new()).unwrap();
            assert_eq!(numbers[0], 4123);
            // 锚号残差 123 不得再次出现
            assert_eq!(
                numbers
                    .iter()
                    .filter(|n| *n % RESIDUE_MODULUS == 123)
                    .count(),
                1
            );
        }
    }

    #[test]
    fn issued_numbers_are_never_reused() {
        let cfg = config(3, 50);
        let issued: HashSet<i64> = (0..25).collect();
        let mut rng = StdRng::seed_from_u64(9);
        let numbers = pick_unique_numbers(&mut rng, &cfg, None, &issued).unwrap();
        for n in &numbers {
            assert!(!issued.contains(n));
        }
    }

    #[test]
    fn anchor_out_of_range_is_rejected() {
        let cfg = config(3, 10_000);
        let mut rng = StdRng::seed_from_u64(1);
        let err = pick_unique_numbers(&mut rng, &cfg, Some(10_000), &HashSet::new()).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn already_issued_anchor_is_rejected() {
        let cfg = config(3, 10_000);
        let issued: HashSet<i64> = [77].into_iter().collect();
        let mut rng = StdRng::seed_from_u64(1);
        let err = pick_unique_numbers(&mut rng, &cfg, Some(77), &issued).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn saturated_series_exhausts_the_attempt_cap() {
        // 批次内所有号码均已售出, 任何候选都被拒绝
        let cfg = config(2, 20);
        let issued: HashSet<i64> = (0..20).collect();
        let mut rng = StdRng::seed_from_u64(3);
        let err = pick_unique_numbers(&mut rng, &cfg, None, &issued).unwrap_err();
        assert!(matches!(err, EngineError::AllocationExhausted(_)));
    }

    #[test]
    fn ticket_code_width_follows_series_capacity() {
        assert_eq!(format_ticket_code(7, 100), "007");
        assert_eq!(format_ticket_code(7, 25), "07");
        assert_eq!(format_ticket_code(100, 100), "100");
        assert_eq!(format_ticket_code(1, 9), "1");
    }
}
