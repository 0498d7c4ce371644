use chrono::{DateTime, Duration, TimeZone, Utc};
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    IntoActiveModel, QueryFilter, Set, TransactionTrait,
};
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

use crate::engine::draw_window::resolve_next_draw;
use crate::engine::number_pick::{format_ticket_code, pick_unique_numbers};
use crate::engine::payout::POOL_MATCH_COUNT;
use crate::entities::{
    GameKind, NumberingMode, SeriesStatus, TicketStatus, draw_entity as draws,
    game_entity as games, ticket_entity as tickets,
};
use crate::error::{EngineError, EngineResult};
use crate::models::{GameConfig, SellTicketRequest, TicketResponse};
use crate::services::SeriesService;

#[derive(Clone)]
pub struct TicketService {
    pool: Arc<DatabaseConnection>,
    series_service: SeriesService,
}

impl TicketService {
    pub fn new(pool: Arc<DatabaseConnection>, series_service: SeriesService) -> Self {
        Self {
            pool,
            series_service,
        }
    }

    /// 售票。
    ///
    /// 流程: Resolver 定期 -> 批次占位 -> 取号 -> 落票, 占位/查重/落票
    /// 在同一事务内完成, 两个并发销售不可能拿到同一个序号或同一个号码。
    /// 事务提交失败时占位一并回滚, 重试不会重复累加已售数。
    ///
    /// 当前批次已满时滚动到下一期再占位 (序号从 1 重新起算);
    /// PAUSED/CLOSED 批次直接拒售, 绝不静默换批次。
    pub async fn sell_ticket(&self, req: &SellTicketRequest) -> EngineResult<TicketResponse> {
        let game = games::Entity::find_by_id(req.game_id)
            .one(self.pool.as_ref())
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("game {}", req.game_id)))?;
        if !game.is_active {
            return Err(EngineError::Validation(format!(
                "game {} is disabled",
                req.game_id
            )));
        }
        let config = GameConfig::try_from(game)?;

        if req.amount_cents <= 0 {
            return Err(EngineError::Validation(format!(
                "amount_cents must be positive, got {}",
                req.amount_cents
            )));
        }
        self.validate_picks(&config, req)?;

        let draw_at = self.resolve_draw_instant(&config, Utc::now())?;

        let txn = self.pool.begin().await?;

        let mut series = self
            .series_service
            .ensure_series(&txn, &config, req.channel_id)
            .await?;
        match series.status {
            SeriesStatus::Active => {}
            SeriesStatus::Full => {
                series = self
                    .series_service
                    .open_next_series(&txn, &config, req.channel_id)
                    .await?;
            }
            SeriesStatus::Paused => {
                return Err(EngineError::Capacity(format!(
                    "series {} is paused",
                    series.series_number
                )));
            }
            SeriesStatus::Closed => {
                return Err(EngineError::Capacity(format!(
                    "series {} is closed",
                    series.series_number
                )));
            }
        }

        let (series, slot) = self.series_service.reserve_slot(&txn, series.id).await?;

        let numbers = match config.numbering_mode {
            NumberingMode::Sequential => {
                // 批次内序号即票号 (渠道票号, 非投注号码)
                if req.anchor.is_some() {
                    return Err(EngineError::Validation(
                        "anchor numbers only apply to random numbering".into(),
                    ));
                }
                vec![i64::from(slot)]
            }
            NumberingMode::Random => {
                let issued = self.issued_numbers(&txn, series.id).await?;
                let mut rng = rand::thread_rng();
                pick_unique_numbers(&mut rng, &config, req.anchor, &issued)?
            }
        };
        let ticket_code = format_ticket_code(slot, series.max_tickets);

        self.ensure_draw(&txn, config.id, draw_at).await?;

        let picks_json = match &req.picks {
            Some(p) => Some(serde_json::to_string(p)?),
            None => None,
        };
        let model = tickets::ActiveModel {
            public_id: Set(Uuid::new_v4()),
            game_id: Set(config.id),
            channel_id: Set(req.channel_id),
            series_id: Set(series.id),
            series_number: Set(series.series_number),
            slot: Set(slot),
            ticket_code: Set(ticket_code),
            numbers: Set(serde_json::to_string(&numbers)?),
            picks: Set(picks_json),
            draw_at: Set(draw_at),
            amount_cents: Set(req.amount_cents),
            status: Set(TicketStatus::Pending),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        log::info!(
            "sold ticket {} game {} channel {} series {} slot {} draw {}",
            model.public_id,
            model.game_id,
            model.channel_id,
            model.series_number,
            model.slot,
            model.draw_at
        );
        TicketResponse::try_from(model)
    }

    /// 支付确认 (外部支付网关回调驱动): PENDING -> PAID
    pub async fn mark_paid(&self, public_id: Uuid) -> EngineResult<TicketResponse> {
        let ticket = self.require_ticket(public_id).await?;
        if ticket.status != TicketStatus::Pending {
            return Err(EngineError::Validation(format!(
                "ticket {} is {}, not pending",
                public_id, ticket.status
            )));
        }
        let mut am = ticket.into_active_model();
        am.status = Set(TicketStatus::Paid);
        am.updated_at = Set(Some(Utc::now()));
        let updated = am.update(self.pool.as_ref()).await?;
        log::info!("ticket {public_id} confirmed paid");
        TicketResponse::try_from(updated)
    }

    /// 取消票据: 开奖封盘后不可取消
    pub async fn cancel_ticket(&self, public_id: Uuid) -> EngineResult<TicketResponse> {
        let ticket = self.require_ticket(public_id).await?;
        match ticket.status {
            TicketStatus::Pending | TicketStatus::Paid => {}
            _ => {
                return Err(EngineError::Validation(format!(
                    "ticket {} is {}, cannot be cancelled",
                    public_id, ticket.status
                )));
            }
        }
        if Utc::now() >= ticket.draw_at {
            return Err(EngineError::Validation(format!(
                "ticket {} draw is sealed, cannot be cancelled",
                public_id
            )));
        }
        let mut am = ticket.into_active_model();
        am.status = Set(TicketStatus::Cancelled);
        am.updated_at = Set(Some(Utc::now()));
        let updated = am.update(self.pool.as_ref()).await?;
        log::info!("ticket {public_id} cancelled");
        TicketResponse::try_from(updated)
    }

    pub async fn get_ticket(&self, public_id: Uuid) -> EngineResult<TicketResponse> {
        TicketResponse::try_from(self.require_ticket(public_id).await?)
    }

    // -----------------------------
    // 内部辅助方法
    // -----------------------------

    /// 按玩法的固定民用时偏移解析下一开奖时刻并换算回 UTC
    fn resolve_draw_instant(
        &self,
        config: &GameConfig,
        now_utc: DateTime<Utc>,
    ) -> EngineResult<DateTime<Utc>> {
        let local_now = now_utc.with_timezone(&config.utc_offset).naive_local();
        let draw_local =
            resolve_next_draw(&config.extraction_times, config.cutoff_minutes, local_now)?;
        let offset_secs = i64::from(config.utc_offset.local_minus_utc());
        Ok(Utc.from_utc_datetime(&(draw_local - Duration::seconds(offset_secs))))
    }

    fn validate_picks(&self, config: &GameConfig, req: &SellTicketRequest) -> EngineResult<()> {
        match config.kind {
            GameKind::Pool => {
                let picks = req
                    .picks
                    .as_ref()
                    .ok_or_else(|| EngineError::Validation("pool game requires picks".into()))?;
                if picks.len() != POOL_MATCH_COUNT {
                    return Err(EngineError::Validation(format!(
                        "pool game requires exactly {} picks, got {}",
                        POOL_MATCH_COUNT,
                        picks.len()
                    )));
                }
            }
            GameKind::Digit => {
                if req.picks.is_some() {
                    return Err(EngineError::Validation(
                        "digit game does not accept picks".into(),
                    ));
                }
            }
        }
        Ok(())
    }

    /// 本批次已占用号码 (未取消票据), 在售票事务内读取
    async fn issued_numbers<C: ConnectionTrait>(
        &self,
        conn: &C,
        series_id: i64,
    ) -> EngineResult<HashSet<i64>> {
        let rows = tickets::Entity::find()
            .filter(tickets::Column::SeriesId.eq(series_id))
            .filter(tickets::Column::Status.ne(TicketStatus::Cancelled))
            .all(conn)
            .await?;
        let mut issued = HashSet::new();
        for row in rows {
            issued.extend(row.parse_numbers()?);
        }
        Ok(issued)
    }

    /// 开奖期记录按 (game_id, draw_at) 惰性创建。
    /// 并发首售会同时尝试落期: ON CONFLICT DO NOTHING 保持事务存活,
    /// 落期失败方改读胜者写入的行。
    async fn ensure_draw<C: ConnectionTrait>(
        &self,
        conn: &C,
        game_id: i64,
        draw_at: DateTime<Utc>,
    ) -> EngineResult<draws::Model> {
        if let Some(d) = self.find_draw(conn, game_id, draw_at).await? {
            return Ok(d);
        }
        let attempt = draws::Entity::insert(draws::ActiveModel {
            game_id: Set(game_id),
            draw_at: Set(draw_at),
            total_collected_cents: Set(0),
            ..Default::default()
        })
        .on_conflict(
            OnConflict::columns([draws::Column::GameId, draws::Column::DrawAt])
                .do_nothing()
                .to_owned(),
        )
        .exec(conn)
        .await;
        match attempt {
            Ok(_) | Err(DbErr::RecordNotInserted) => {}
            Err(e) => return Err(e.into()),
        }
        self.find_draw(conn, game_id, draw_at)
            .await?
            .ok_or_else(|| {
                EngineError::Internal(format!(
                    "draw of game {game_id} at {draw_at} vanished after insert"
                ))
            })
    }

    async fn find_draw<C: ConnectionTrait>(
        &self,
        conn: &C,
        game_id: i64,
        draw_at: DateTime<Utc>,
    ) -> EngineResult<Option<draws::Model>> {
        Ok(draws::Entity::find()
            .filter(draws::Column::GameId.eq(game_id))
            .filter(draws::Column::DrawAt.eq(draw_at))
            .one(conn)
            .await?)
    }

    async fn require_ticket(&self, public_id: Uuid) -> EngineResult<tickets::Model> {
        tickets::Entity::find()
            .filter(tickets::Column::PublicId.eq(public_id))
            .one(self.pool.as_ref())
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("ticket {public_id}")))
    }
}
