use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use std::sync::Arc;

use crate::engine::payout::{
    POOL_MATCH_COUNT, compute_digit_prize, compute_pool_settlement, count_hits,
};
use crate::entities::{
    GameKind, MatchResult, TicketStatus, UnclaimedPolicy, draw_entity as draws,
    game_entity as games, match_entity as matches, ticket_entity as tickets,
};
use crate::error::{EngineError, EngineResult};
use crate::models::{GameConfig, PoolSettlement, SettlementSummary};

/// 结算服务: 结果录入与两种赔付模型。
/// 结算在销售封盘后执行 (票据过截售点后不可能再挂靠本期);
/// 不同开奖期之间无共享可变状态, 可并行结算。
#[derive(Clone)]
pub struct SettlementService {
    pool: Arc<DatabaseConnection>,
}

impl SettlementService {
    pub fn new(pool: Arc<DatabaseConnection>) -> Self {
        Self { pool }
    }

    /// 录入数字玩法官方开奖号码。开奖时刻之前不可录入, 录入后不可变更。
    pub async fn publish_result(
        &self,
        game_id: i64,
        draw_at: DateTime<Utc>,
        result: &str,
    ) -> EngineResult<draws::Model> {
        let game = self.require_game(game_id).await?;
        if game.kind != GameKind::Digit {
            return Err(EngineError::Validation(format!(
                "game {game_id} is not a digit game, results are recorded per match"
            )));
        }
        let draw = self
            .require_draw(self.pool.as_ref(), game_id, draw_at)
            .await?;
        if draw.result.is_some() {
            return Err(EngineError::Validation(format!(
                "draw {} already has a published result",
                draw.id
            )));
        }
        let now = Utc::now();
        if now < draw.draw_at {
            return Err(EngineError::Validation(format!(
                "cannot publish before the draw instant {}",
                draw.draw_at
            )));
        }
        let trimmed = result.trim();
        if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit()) {
            return Err(EngineError::Validation(format!(
                "result {result:?} is not a digit string"
            )));
        }
        let mut am = draw.into_active_model();
        am.result = Set(Some(trimmed.to_string()));
        am.published_at = Set(Some(now));
        am.updated_at = Set(Some(now));
        let updated = am.update(self.pool.as_ref()).await?;
        log::info!("draw {} result published: {}", updated.id, trimmed);
        Ok(updated)
    }

    /// 登记竞猜场次清单 (开售前一次性录入, 赛果留空)。
    /// 场次数必须与票面预测数一致, 否则命中数永远达不到档位阈值。
    pub async fn register_matches(
        &self,
        game_id: i64,
        draw_at: DateTime<Utc>,
        fixtures: &[(String, String)],
    ) -> EngineResult<Vec<matches::Model>> {
        let game = self.require_game(game_id).await?;
        if game.kind != GameKind::Pool {
            return Err(EngineError::Validation(format!(
                "game {game_id} is not a pool game"
            )));
        }
        if fixtures.len() != POOL_MATCH_COUNT {
            return Err(EngineError::Validation(format!(
                "pool draw requires exactly {POOL_MATCH_COUNT} fixtures, got {}",
                fixtures.len()
            )));
        }
        let draw = self
            .require_draw(self.pool.as_ref(), game_id, draw_at)
            .await?;
        let existing = matches::Entity::find()
            .filter(matches::Column::DrawId.eq(draw.id))
            .count(self.pool.as_ref())
            .await?;
        if existing > 0 {
            return Err(EngineError::Validation(format!(
                "draw {} already has fixtures registered",
                draw.id
            )));
        }

        let txn = self.pool.begin().await?;
        let mut created = Vec::with_capacity(fixtures.len());
        for (order, (home, away)) in fixtures.iter().enumerate() {
            let model = matches::ActiveModel {
                draw_id: Set(draw.id),
                match_order: Set(order as i32 + 1),
                home_team: Set(home.clone()),
                away_team: Set(away.clone()),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
            created.push(model);
        }
        txn.commit().await?;
        Ok(created)
    }

    /// 录入整期赛果。必须一次给全, 且每场只判定一次。
    pub async fn publish_match_results(
        &self,
        game_id: i64,
        draw_at: DateTime<Utc>,
        results: &[MatchResult],
    ) -> EngineResult<()> {
        let draw = self
            .require_draw(self.pool.as_ref(), game_id, draw_at)
            .await?;
        let now = Utc::now();
        if now < draw.draw_at {
            return Err(EngineError::Validation(format!(
                "cannot publish before the draw instant {}",
                draw.draw_at
            )));
        }

        let txn = self.pool.begin().await?;
        let rows = matches::Entity::find()
            .filter(matches::Column::DrawId.eq(draw.id))
            .order_by_asc(matches::Column::MatchOrder)
            .all(&txn)
            .await?;
        if rows.is_empty() {
            return Err(EngineError::NotFound(format!(
                "draw {} has no fixtures registered",
                draw.id
            )));
        }
        if rows.len() != results.len() {
            return Err(EngineError::Validation(format!(
                "expected {} results, got {}",
                rows.len(),
                results.len()
            )));
        }
        if rows.iter().any(|m| m.is_decided()) {
            return Err(EngineError::Validation(format!(
                "draw {} already has decided matches",
                draw.id
            )));
        }

        for (row, result) in rows.into_iter().zip(results.iter()) {
            let mut am = row.into_active_model();
            am.result = Set(Some(result.clone()));
            am.updated_at = Set(Some(now));
            am.update(&txn).await?;
        }

        let mut am = draw.into_active_model();
        am.published_at = Set(Some(now));
        am.updated_at = Set(Some(now));
        am.update(&txn).await?;

        txn.commit().await?;
        log::info!("draw results published for game {game_id} at {draw_at}");
        Ok(())
    }

    /// 数字玩法结算: 对本期每张已支付票据, 按尾数档位查表累加奖金。
    /// 结果未录入则中止, 不写任何奖金; 重复结算被拒绝。
    pub async fn settle_digit_draw(
        &self,
        game_id: i64,
        draw_at: DateTime<Utc>,
    ) -> EngineResult<SettlementSummary> {
        let config = self.load_config(game_id).await?;
        if config.kind != GameKind::Digit {
            return Err(EngineError::Validation(format!(
                "game {game_id} is not a digit game"
            )));
        }

        let txn = self.pool.begin().await?;
        let draw = self.require_draw(&txn, game_id, draw_at).await?;
        self.guard_not_settled(&draw)?;
        let winning = draw.result.clone().ok_or_else(|| {
            EngineError::SettlementPrecondition(format!(
                "draw {} has no published result",
                draw.id
            ))
        })?;

        let ticket_rows = self.paid_tickets(&txn, game_id, draw_at).await?;
        let mut summary = SettlementSummary {
            draw_id: draw.id,
            tickets_settled: 0,
            winners: 0,
            total_collected_cents: 0,
            total_prize_cents: 0,
        };

        for ticket in ticket_rows {
            summary.total_collected_cents += ticket.amount_cents;
            let numbers = ticket.parse_numbers()?;
            let mut prize_cents = 0i64;
            let mut hits = 0i32;
            for n in &numbers {
                let amount = compute_digit_prize(&config.digit_prizes, &winning, *n)?;
                if amount > 0 {
                    hits += 1;
                }
                prize_cents += amount;
            }

            let won = prize_cents > 0;
            let mut am = ticket.into_active_model();
            if won {
                am.status = Set(TicketStatus::Winner);
            }
            am.hit_count = Set(Some(hits));
            am.prize_cents = Set(Some(prize_cents));
            am.updated_at = Set(Some(Utc::now()));
            am.update(&txn).await?;

            summary.tickets_settled += 1;
            if won {
                summary.winners += 1;
                summary.total_prize_cents += prize_cents;
            }
        }

        self.seal_draw(&txn, draw, &summary).await?;
        txn.commit().await?;

        log::info!(
            "digit draw {} settled: {} tickets, {} winners, {} cents paid",
            summary.draw_id,
            summary.tickets_settled,
            summary.winners,
            summary.total_prize_cents
        );
        Ok(summary)
    }

    /// 竞猜玩法结算: 奖池按档位分成, 并列均分。
    /// carried_in_cents 为上期未分配结转 (仅 carry_over 策略下由调用方传入)。
    pub async fn settle_pool_draw(
        &self,
        game_id: i64,
        draw_at: DateTime<Utc>,
        carried_in_cents: i64,
    ) -> EngineResult<(PoolSettlement, SettlementSummary)> {
        let config = self.load_config(game_id).await?;
        if config.kind != GameKind::Pool {
            return Err(EngineError::Validation(format!(
                "game {game_id} is not a pool game"
            )));
        }
        if carried_in_cents > 0 && config.unclaimed_policy != UnclaimedPolicy::CarryOver {
            return Err(EngineError::Validation(
                "carried-in funds require the carry_over policy".into(),
            ));
        }

        let txn = self.pool.begin().await?;
        let draw = self.require_draw(&txn, game_id, draw_at).await?;
        self.guard_not_settled(&draw)?;

        let match_rows = matches::Entity::find()
            .filter(matches::Column::DrawId.eq(draw.id))
            .order_by_asc(matches::Column::MatchOrder)
            .all(&txn)
            .await?;
        if match_rows.is_empty() {
            return Err(EngineError::SettlementPrecondition(format!(
                "draw {} has no fixtures registered",
                draw.id
            )));
        }
        let results: Vec<MatchResult> = match_rows
            .iter()
            .map(|m| {
                m.result.clone().ok_or_else(|| {
                    EngineError::SettlementPrecondition(format!(
                        "match {} of draw {} is undecided",
                        m.match_order, draw.id
                    ))
                })
            })
            .collect::<Result<_, _>>()?;

        let ticket_rows = self.paid_tickets(&txn, game_id, draw_at).await?;
        let total_collected_cents: i64 = ticket_rows.iter().map(|t| t.amount_cents).sum();

        let mut hit_counts = Vec::with_capacity(ticket_rows.len());
        for ticket in &ticket_rows {
            let picks = ticket.parse_picks()?.ok_or_else(|| {
                EngineError::Internal(format!("pool ticket {} has no picks", ticket.public_id))
            })?;
            hit_counts.push(count_hits(&picks, &results));
        }

        let settlement = compute_pool_settlement(
            &config.pool_split,
            total_collected_cents,
            carried_in_cents,
            &hit_counts,
        )?;

        let mut summary = SettlementSummary {
            draw_id: draw.id,
            tickets_settled: 0,
            winners: 0,
            total_collected_cents,
            total_prize_cents: 0,
        };

        for (ticket, hits) in ticket_rows.into_iter().zip(hit_counts.iter()) {
            let prize_cents = settlement.prize_for_hits(*hits);
            let won = prize_cents > 0;
            let mut am = ticket.into_active_model();
            if won {
                am.status = Set(TicketStatus::Winner);
            }
            am.hit_count = Set(Some(*hits as i32));
            am.prize_cents = Set(Some(prize_cents));
            am.updated_at = Set(Some(Utc::now()));
            am.update(&txn).await?;

            summary.tickets_settled += 1;
            if won {
                summary.winners += 1;
                summary.total_prize_cents += prize_cents;
            }
        }

        self.seal_draw(&txn, draw, &summary).await?;
        txn.commit().await?;

        match config.unclaimed_policy {
            UnclaimedPolicy::House => log::info!(
                "pool draw {} settled: {} cents retained by the house",
                summary.draw_id,
                settlement.unclaimed_cents
            ),
            UnclaimedPolicy::CarryOver => log::info!(
                "pool draw {} settled: {} cents carried to the next period",
                summary.draw_id,
                settlement.unclaimed_cents
            ),
        }
        Ok((settlement, summary))
    }

    // -----------------------------
    // 内部辅助方法
    // -----------------------------

    async fn require_game(&self, game_id: i64) -> EngineResult<games::Model> {
        games::Entity::find_by_id(game_id)
            .one(self.pool.as_ref())
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("game {game_id}")))
    }

    async fn load_config(&self, game_id: i64) -> EngineResult<GameConfig> {
        GameConfig::try_from(self.require_game(game_id).await?)
    }

    fn guard_not_settled(&self, draw: &draws::Model) -> EngineResult<()> {
        if draw.is_settled() {
            return Err(EngineError::Validation(format!(
                "draw {} is already settled, prizes are immutable",
                draw.id
            )));
        }
        Ok(())
    }

    async fn require_draw<C: ConnectionTrait>(
        &self,
        conn: &C,
        game_id: i64,
        draw_at: DateTime<Utc>,
    ) -> EngineResult<draws::Model> {
        draws::Entity::find()
            .filter(draws::Column::GameId.eq(game_id))
            .filter(draws::Column::DrawAt.eq(draw_at))
            .one(conn)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("draw of game {game_id} at {draw_at}")))
    }

    async fn paid_tickets<C: ConnectionTrait>(
        &self,
        conn: &C,
        game_id: i64,
        draw_at: DateTime<Utc>,
    ) -> EngineResult<Vec<tickets::Model>> {
        Ok(tickets::Entity::find()
            .filter(tickets::Column::GameId.eq(game_id))
            .filter(tickets::Column::DrawAt.eq(draw_at))
            .filter(tickets::Column::Status.eq(TicketStatus::Paid))
            .all(conn)
            .await?)
    }

    async fn seal_draw<C: ConnectionTrait>(
        &self,
        conn: &C,
        draw: draws::Model,
        summary: &SettlementSummary,
    ) -> EngineResult<()> {
        let mut am = draw.into_active_model();
        am.settled_at = Set(Some(Utc::now()));
        am.total_collected_cents = Set(summary.total_collected_cents);
        am.updated_at = Set(Some(Utc::now()));
        am.update(conn).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn game_row(kind: GameKind) -> games::Model {
        games::Model {
            id: 1,
            name: "Loteca".into(),
            kind,
            extraction_times: r#"["12:00"]"#.into(),
            cutoff_minutes: 10,
            utc_offset_minutes: -180,
            numbering_mode: crate::entities::NumberingMode::Sequential,
            max_tickets_per_series: 100,
            numbers_per_ticket: 1,
            number_range: 10_000,
            milhar_prize_cents: 500_000,
            centena_prize_cents: 50_000,
            dezena_prize_cents: 5_000,
            pool_bp: 7000,
            top_bp: 5000,
            second_bp: 1500,
            third_bp: 500,
            top_hits: 14,
            second_hits: 13,
            third_hits: 12,
            unclaimed_policy: UnclaimedPolicy::House,
            is_active: true,
            created_at: None,
            updated_at: None,
        }
    }

    fn draw_row(result: Option<&str>, settled: bool) -> draws::Model {
        let draw_at = Utc.with_ymd_and_hms(2026, 8, 20, 15, 0, 0).unwrap();
        draws::Model {
            id: 9,
            game_id: 1,
            draw_at,
            result: result.map(Into::into),
            published_at: result.map(|_| draw_at),
            settled_at: if settled { Some(draw_at) } else { None },
            total_collected_cents: 0,
            created_at: None,
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn settlement_without_published_result_is_rejected() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![game_row(GameKind::Digit)]])
            .append_query_results([vec![draw_row(None, false)]])
            .into_connection();

        let svc = SettlementService::new(Arc::new(db));
        let err = svc
            .settle_digit_draw(1, Utc.with_ymd_and_hms(2026, 8, 20, 15, 0, 0).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::SettlementPrecondition(_)));
    }

    #[tokio::test]
    async fn settling_a_settled_draw_is_rejected() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![game_row(GameKind::Digit)]])
            .append_query_results([vec![draw_row(Some("4123"), true)]])
            .into_connection();

        let svc = SettlementService::new(Arc::new(db));
        let err = svc
            .settle_digit_draw(1, Utc.with_ymd_and_hms(2026, 8, 20, 15, 0, 0).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[tokio::test]
    async fn truncated_fixture_list_is_rejected() {
        // 场次数少于票面预测数时整期命中数被封顶, 必须在登记时拒绝
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![game_row(GameKind::Pool)]])
            .into_connection();

        let svc = SettlementService::new(Arc::new(db));
        let fixtures: Vec<(String, String)> = (1..=10)
            .map(|i| (format!("home {i}"), format!("away {i}")))
            .collect();
        let err = svc
            .register_matches(
                1,
                Utc.with_ymd_and_hms(2026, 8, 20, 15, 0, 0).unwrap(),
                &fixtures,
            )
            .await
            .unwrap_err();
        match err {
            EngineError::Validation(msg) => assert!(msg.contains("14")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn digit_result_cannot_be_published_on_a_pool_game() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![game_row(GameKind::Pool)]])
            .into_connection();

        let svc = SettlementService::new(Arc::new(db));
        let err = svc
            .publish_result(
                1,
                Utc.with_ymd_and_hms(2026, 8, 20, 15, 0, 0).unwrap(),
                "4123",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[tokio::test]
    async fn pool_settlement_requires_a_pool_game() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![game_row(GameKind::Digit)]])
            .into_connection();

        let svc = SettlementService::new(Arc::new(db));
        let err = svc
            .settle_pool_draw(1, Utc.with_ymd_and_hms(2026, 8, 20, 15, 0, 0).unwrap(), 0)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }
}
