use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder, Set,
};
use std::sync::Arc;

use crate::entities::{SeriesStatus, series_entity as series};
use crate::error::{EngineError, EngineResult};
use crate::models::GameConfig;

/// 批次容量跟踪: 持有 (game, channel) 维度的批次计数器与已售数。
/// 占位 (reserve_slot) 是单条原子更新, 两个并发占位绝不会读到同一个
/// 自增前的值; 占位失败绝不静默换批次。
#[derive(Clone)]
pub struct SeriesService {
    pool: Arc<DatabaseConnection>,
}

impl SeriesService {
    pub fn new(pool: Arc<DatabaseConnection>) -> Self {
        Self { pool }
    }

    /// 查找 (game, channel) 的最新批次, 不存在则开第 1 期 (首次销售时惰性创建)
    pub async fn ensure_series<C: ConnectionTrait>(
        &self,
        conn: &C,
        config: &GameConfig,
        channel_id: i64,
    ) -> EngineResult<series::Model> {
        if let Some(m) = series::Entity::find()
            .filter(series::Column::GameId.eq(config.id))
            .filter(series::Column::ChannelId.eq(channel_id))
            .order_by_desc(series::Column::SeriesNumber)
            .one(conn)
            .await?
        {
            return Ok(m);
        }
        log::info!(
            "opening first series for game {} channel {}",
            config.id,
            channel_id
        );
        self.insert_series(conn, config, channel_id, 1).await
    }

    /// 开下一期批次: 期号 +1, 已售清零, 状态 ACTIVE。
    /// 仅允许在最新批次 FULL 或 CLOSED 时执行 (销售流程的满批滚动与
    /// 管理端手工开批共用此入口); ACTIVE/PAUSED 批次未耗尽, 拒绝。
    pub async fn open_next_series<C: ConnectionTrait>(
        &self,
        conn: &C,
        config: &GameConfig,
        channel_id: i64,
    ) -> EngineResult<series::Model> {
        let latest = self.ensure_series(conn, config, channel_id).await?;
        match latest.status {
            SeriesStatus::Full | SeriesStatus::Closed => {}
            _ => {
                return Err(EngineError::Validation(format!(
                    "series {} is still {}, cannot open the next one",
                    latest.series_number, latest.status
                )));
            }
        }
        log::info!(
            "rolling game {} channel {} to series {}",
            config.id,
            channel_id,
            latest.series_number + 1
        );
        self.insert_series(conn, config, channel_id, latest.series_number + 1)
            .await
    }

    /// 原子占位: 仅当批次 ACTIVE 且未满时 sold_count + 1, 返回占得的序号
    /// (1 起始)。更新影响 0 行时按当前状态归类为容量错误, 绝不换批次重试。
    /// 占满后在同一事务内翻转 FULL。
    pub async fn reserve_slot<C: ConnectionTrait>(
        &self,
        conn: &C,
        series_id: i64,
    ) -> EngineResult<(series::Model, i32)> {
        let result = series::Entity::update_many()
            .col_expr(
                series::Column::SoldCount,
                Expr::col(series::Column::SoldCount).add(1),
            )
            .filter(series::Column::Id.eq(series_id))
            .filter(series::Column::Status.eq(SeriesStatus::Active))
            .filter(Expr::col(series::Column::SoldCount).lt(Expr::col(series::Column::MaxTickets)))
            .exec(conn)
            .await?;

        if result.rows_affected == 0 {
            let current = self.require_series(conn, series_id).await?;
            let reason = match current.status {
                SeriesStatus::Paused => format!("series {} is paused", current.series_number),
                SeriesStatus::Closed => format!("series {} is closed", current.series_number),
                _ => format!("series {} is full", current.series_number),
            };
            log::warn!("slot reservation rejected: {reason}");
            return Err(EngineError::Capacity(reason));
        }

        let updated = self.require_series(conn, series_id).await?;
        let slot = updated.sold_count;

        if updated.sold_count >= updated.max_tickets && updated.status == SeriesStatus::Active {
            let mut am = updated.clone().into_active_model();
            am.status = Set(SeriesStatus::Full);
            am.updated_at = Set(Some(Utc::now()));
            let full = am.update(conn).await?;
            log::info!(
                "series {} of game {} is now full ({} tickets)",
                full.series_number,
                full.game_id,
                full.sold_count
            );
            return Ok((full, slot));
        }

        Ok((updated, slot))
    }

    /// 暂停销售 (仅 ACTIVE 批次可暂停)
    pub async fn pause(&self, series_id: i64) -> EngineResult<series::Model> {
        self.transition(series_id, SeriesStatus::Paused, &[SeriesStatus::Active])
            .await
    }

    /// 恢复销售; 若暂停期间已达容量则直接转 FULL
    pub async fn resume(&self, series_id: i64) -> EngineResult<series::Model> {
        let current = self.require_series(self.pool.as_ref(), series_id).await?;
        if current.status != SeriesStatus::Paused {
            return Err(EngineError::Validation(format!(
                "series {} is {}, not paused",
                current.series_number, current.status
            )));
        }
        let next = if current.sold_count >= current.max_tickets {
            SeriesStatus::Full
        } else {
            SeriesStatus::Active
        };
        let mut am = current.into_active_model();
        am.status = Set(next);
        am.updated_at = Set(Some(Utc::now()));
        Ok(am.update(self.pool.as_ref()).await?)
    }

    /// 关闭批次 (终态, 不可逆)
    pub async fn close(&self, series_id: i64) -> EngineResult<series::Model> {
        self.transition(
            series_id,
            SeriesStatus::Closed,
            &[
                SeriesStatus::Active,
                SeriesStatus::Full,
                SeriesStatus::Paused,
            ],
        )
        .await
    }

    pub async fn current_status(&self, series_id: i64) -> EngineResult<SeriesStatus> {
        Ok(self
            .require_series(self.pool.as_ref(), series_id)
            .await?
            .status)
    }

    // -----------------------------
    // 内部辅助方法
    // -----------------------------

    async fn transition(
        &self,
        series_id: i64,
        to: SeriesStatus,
        allowed_from: &[SeriesStatus],
    ) -> EngineResult<series::Model> {
        let current = self.require_series(self.pool.as_ref(), series_id).await?;
        if !allowed_from.contains(&current.status) {
            return Err(EngineError::Validation(format!(
                "series {} cannot go from {} to {}",
                current.series_number, current.status, to
            )));
        }
        log::info!(
            "series {} of game {}: {} -> {}",
            current.series_number,
            current.game_id,
            current.status,
            to
        );
        let mut am = current.into_active_model();
        am.status = Set(to);
        am.updated_at = Set(Some(Utc::now()));
        Ok(am.update(self.pool.as_ref()).await?)
    }

    async fn require_series<C: ConnectionTrait>(
        &self,
        conn: &C,
        series_id: i64,
    ) -> EngineResult<series::Model> {
        series::Entity::find_by_id(series_id)
            .one(conn)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("series {series_id}")))
    }

    async fn insert_series<C: ConnectionTrait>(
        &self,
        conn: &C,
        config: &GameConfig,
        channel_id: i64,
        series_number: i32,
    ) -> EngineResult<series::Model> {
        // max_tickets 取当前配置快照, 开批后配置变更不影响本批
        let model = series::ActiveModel {
            game_id: Set(config.id),
            channel_id: Set(channel_id),
            series_number: Set(series_number),
            sold_count: Set(0),
            max_tickets: Set(config.max_tickets_per_series),
            status: Set(SeriesStatus::Active),
            ..Default::default()
        }
        .insert(conn)
        .await?;
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{GameKind, NumberingMode, UnclaimedPolicy};
    use crate::models::{DigitPrizeTable, PoolSplitConfig};
    use chrono::FixedOffset;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn row(sold_count: i32, status: SeriesStatus) -> series::Model {
        series::Model {
            id: 1,
            game_id: 1,
            channel_id: 7,
            series_number: 3,
            sold_count,
            max_tickets: 25,
            status,
            created_at: None,
            updated_at: None,
        }
    }

    fn config() -> GameConfig {
        GameConfig {
            id: 1,
            name: "Milhar Diária".into(),
            kind: GameKind::Digit,
            extraction_times: vec![],
            cutoff_minutes: 10,
            utc_offset: FixedOffset::west_opt(3 * 3600).unwrap(),
            numbering_mode: NumberingMode::Sequential,
            max_tickets_per_series: 25,
            numbers_per_ticket: 1,
            number_range: 10_000,
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

    #[tokio::test]
    async fn reserve_slot_increments_and_returns_slot() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![row(11, SeriesStatus::Active)]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();

        let svc = SeriesService::new(Arc::new(db));
        let (updated, slot) = svc.reserve_slot(svc.pool.as_ref(), 1).await.unwrap();
        assert_eq!(slot, 11);
        assert_eq!(updated.status, SeriesStatus::Active);
    }

    #[tokio::test]
    async fn reserving_the_last_slot_flips_the_series_to_full() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([
                vec![row(25, SeriesStatus::Active)],
                vec![row(25, SeriesStatus::Full)],
            ])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();

        let svc = SeriesService::new(Arc::new(db));
        let (updated, slot) = svc.reserve_slot(svc.pool.as_ref(), 1).await.unwrap();
        assert_eq!(slot, 25);
        assert_eq!(updated.status, SeriesStatus::Full);
    }

    #[tokio::test]
    async fn losing_the_race_for_the_last_slot_is_a_capacity_error() {
        // 并发对手抢走最后一个位: 条件更新影响 0 行, 重读时批次已 FULL
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![row(25, SeriesStatus::Full)]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .into_connection();

        let svc = SeriesService::new(Arc::new(db));
        let err = svc.reserve_slot(svc.pool.as_ref(), 1).await.unwrap_err();
        assert!(matches!(err, EngineError::Capacity(_)));
    }

    #[tokio::test]
    async fn paused_series_rejects_reservation_regardless_of_capacity() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![row(3, SeriesStatus::Paused)]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .into_connection();

        let svc = SeriesService::new(Arc::new(db));
        let err = svc.reserve_slot(svc.pool.as_ref(), 1).await.unwrap_err();
        match err {
            EngineError::Capacity(msg) => assert!(msg.contains("paused")),
            other => panic!("expected capacity error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn open_next_series_rejects_while_latest_is_active() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![row(3, SeriesStatus::Active)]])
            .into_connection();

        let svc = SeriesService::new(Arc::new(db));
        let err = svc
            .open_next_series(svc.pool.as_ref(), &config(), 7)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[tokio::test]
    async fn full_series_rolls_over_and_seats_slot_one() {
        // 第 26 张票: 最新批次已满, 滚动到第 4 期后占到 1 号位
        let full = row(25, SeriesStatus::Full);
        let fresh = series::Model {
            id: 2,
            series_number: 4,
            sold_count: 0,
            status: SeriesStatus::Active,
            ..full.clone()
        };
        let reserved = series::Model {
            sold_count: 1,
            ..fresh.clone()
        };

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([
                vec![full.clone()],  // 最新批次查询
                vec![full],          // open_next_series 重读最新批次
                vec![fresh],         // 新批次落库
                vec![reserved],      // 占位后重读
            ])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();

        let svc = SeriesService::new(Arc::new(db));
        let conn = svc.pool.as_ref();

        let latest = svc.ensure_series(conn, &config(), 7).await.unwrap();
        assert_eq!(latest.status, SeriesStatus::Full);

        let next = svc.open_next_series(conn, &config(), 7).await.unwrap();
        assert_eq!(next.series_number, 4);
        assert_eq!(next.sold_count, 0);

        let (series, slot) = svc.reserve_slot(conn, next.id).await.unwrap();
        assert_eq!(slot, 1);
        assert_eq!(series.series_number, 4);
        assert_eq!(series.status, SeriesStatus::Active);
    }
}
