use chrono::{Duration, NaiveDateTime, NaiveTime};

use crate::error::{EngineError, EngineResult};

/// 计算新售票据挂靠的下一个开奖时刻。
///
/// 输入输出均为运营日历的民用时 (固定偏移, 无夏令时), 由调用方负责与 UTC 互转。
/// 逻辑:
/// 1. 时刻表升序排列
/// 2. 当天逐个时刻计算截售点 cutoff = draw - (cutoff_minutes - 1) 分钟,
///    now 严格早于截售点则挂靠该时刻
/// 3. 当天无可用时刻则无条件挂靠次日最早时刻
///
/// 截售点用 cutoff_minutes - 1 而非 cutoff_minutes, 且边界时刻本身被排除
/// (严格 <)。这是沿用至今的历史行为, 是否改为整分钟窗口待业务方确认,
/// 在确认前不得"修正"。
pub fn resolve_next_draw(
    extraction_times: &[NaiveTime],
    cutoff_minutes: i64,
    now: NaiveDateTime,
) -> EngineResult<NaiveDateTime> {
    if extraction_times.is_empty() {
        return Err(EngineError::Configuration(
            "extraction_times must not be empty".into(),
        ));
    }
    if cutoff_minutes < 1 {
        return Err(EngineError::Configuration(format!(
            "cutoff_minutes must be >= 1, got {cutoff_minutes}"
        )));
    }

    let mut times = extraction_times.to_vec();
    times.sort();

    let today = now.date();
    for t in &times {
        let draw = today.and_time(*t);
        let cutoff = draw - Duration::minutes(cutoff_minutes - 1);
        if now < cutoff {
            return Ok(draw);
        }
    }

    let next_day = today
        .succ_opt()
        .ok_or_else(|| EngineError::Internal("civil calendar overflow".into()))?;
    Ok(next_day.and_time(times[0]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 8, 20)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn schedule() -> Vec<NaiveTime> {
        vec![t(8, 0), t(11, 0), t(16, 0)]
    }

    #[test]
    fn before_cutoff_attaches_to_first_slot() {
        let draw = resolve_next_draw(&schedule(), 10, at(7, 50, 59)).unwrap();
        assert_eq!(draw, at(8, 0, 0));
    }

    #[test]
    fn cutoff_boundary_instant_is_excluded() {
        // 08:00 - 9min = 07:51, 边界时刻本身推到下一时刻
        let draw = resolve_next_draw(&schedule(), 10, at(7, 51, 0)).unwrap();
        assert_eq!(draw, at(11, 0, 0));
    }

    #[test]
    fn after_last_cutoff_rolls_to_next_day() {
        let draw = resolve_next_draw(&schedule(), 10, at(15, 51, 0)).unwrap();
        assert_eq!(
            draw,
            NaiveDate::from_ymd_opt(2026, 8, 21)
                .unwrap()
                .and_hms_opt(8, 0, 0)
                .unwrap()
        );
    }

    #[test]
    fn unsorted_schedule_is_normalized() {
        let times = vec![t(16, 0), t(8, 0), t(11, 0)];
        let draw = resolve_next_draw(&times, 10, at(9, 0, 0)).unwrap();
        assert_eq!(draw, at(11, 0, 0));
    }

    #[test]
    fn result_is_always_in_the_future() {
        let times = schedule();
        for hour in 0..24 {
            for minute in [0, 15, 50, 51, 59] {
                let now = at(hour, minute, 30);
                let draw = resolve_next_draw(&times, 10, now).unwrap();
                assert!(draw > now, "draw {draw} not after now {now}");
            }
        }
    }

    #[test]
    fn single_slot_schedule_rolls_daily() {
        let times = vec![t(12, 0)];
        let draw = resolve_next_draw(&times, 5, at(12, 30, 0)).unwrap();
        assert_eq!(
            draw,
            NaiveDate::from_ymd_opt(2026, 8, 21)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap()
        );
    }

    #[test]
    fn empty_schedule_is_a_configuration_error() {
        let err = resolve_next_draw(&[], 10, at(9, 0, 0)).unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
    }

    #[test]
    fn non_positive_cutoff_is_a_configuration_error() {
        let err = resolve_next_draw(&schedule(), 0, at(9, 0, 0)).unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
    }
}
