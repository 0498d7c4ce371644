use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, Set,
};
use std::sync::Arc;

use crate::entities::{SeriesStatus, game_entity as games, series_entity as series};
use crate::error::{EngineError, EngineResult};
use crate::models::{GameConfig, GameUpsertRequest};

/// 玩法配置管理 (管理端)。
/// 所有配置错误在创建/更新时一次性暴露给操作员, 不进入销售流程。
#[derive(Clone)]
pub struct GameService {
    pool: Arc<DatabaseConnection>,
}

impl GameService {
    pub fn new(pool: Arc<DatabaseConnection>) -> Self {
        Self { pool }
    }

    /// 创建玩法。先校验再落库, 非法配置不会被持久化。
    pub async fn create_game(&self, req: &GameUpsertRequest) -> EngineResult<games::Model> {
        let draft = Self::draft_model(0, req)?;
        GameConfig::try_from(draft.clone())?;

        let model = games::ActiveModel {
            name: Set(draft.name),
            kind: Set(draft.kind),
            extraction_times: Set(draft.extraction_times),
            cutoff_minutes: Set(draft.cutoff_minutes),
            utc_offset_minutes: Set(draft.utc_offset_minutes),
            numbering_mode: Set(draft.numbering_mode),
            max_tickets_per_series: Set(draft.max_tickets_per_series),
            numbers_per_ticket: Set(draft.numbers_per_ticket),
            number_range: Set(draft.number_range),
            milhar_prize_cents: Set(draft.milhar_prize_cents),
            centena_prize_cents: Set(draft.centena_prize_cents),
            dezena_prize_cents: Set(draft.dezena_prize_cents),
            pool_bp: Set(draft.pool_bp),
            top_bp: Set(draft.top_bp),
            second_bp: Set(draft.second_bp),
            third_bp: Set(draft.third_bp),
            top_hits: Set(draft.top_hits),
            second_hits: Set(draft.second_hits),
            third_hits: Set(draft.third_hits),
            unclaimed_policy: Set(draft.unclaimed_policy),
            is_active: Set(true),
            ..Default::default()
        }
        .insert(self.pool.as_ref())
        .await?;
        log::info!("game {} ({}) created", model.id, model.name);
        Ok(model)
    }

    /// 更新玩法。存在未收尾批次 (ACTIVE/PAUSED) 时拒绝: 配置在开批期间不可变。
    pub async fn update_game(
        &self,
        game_id: i64,
        req: &GameUpsertRequest,
    ) -> EngineResult<games::Model> {
        let existing = self.require_game(game_id).await?;

        let open_series = series::Entity::find()
            .filter(series::Column::GameId.eq(game_id))
            .filter(
                series::Column::Status
                    .is_in([SeriesStatus::Active, SeriesStatus::Paused]),
            )
            .count(self.pool.as_ref())
            .await?;
        if open_series > 0 {
            return Err(EngineError::Validation(format!(
                "game {game_id} has {open_series} open series, configuration is frozen"
            )));
        }

        let draft = Self::draft_model(game_id, req)?;
        GameConfig::try_from(draft.clone())?;

        let mut am = existing.into_active_model();
        am.name = Set(draft.name);
        am.kind = Set(draft.kind);
        am.extraction_times = Set(draft.extraction_times);
        am.cutoff_minutes = Set(draft.cutoff_minutes);
        am.utc_offset_minutes = Set(draft.utc_offset_minutes);
        am.numbering_mode = Set(draft.numbering_mode);
        am.max_tickets_per_series = Set(draft.max_tickets_per_series);
        am.numbers_per_ticket = Set(draft.numbers_per_ticket);
        am.number_range = Set(draft.number_range);
        am.milhar_prize_cents = Set(draft.milhar_prize_cents);
        am.centena_prize_cents = Set(draft.centena_prize_cents);
        am.dezena_prize_cents = Set(draft.dezena_prize_cents);
        am.pool_bp = Set(draft.pool_bp);
        am.top_bp = Set(draft.top_bp);
        am.second_bp = Set(draft.second_bp);
        am.third_bp = Set(draft.third_bp);
        am.top_hits = Set(draft.top_hits);
        am.second_hits = Set(draft.second_hits);
        am.third_hits = Set(draft.third_hits);
        am.unclaimed_policy = Set(draft.unclaimed_policy);
        am.updated_at = Set(Some(Utc::now()));
        let updated = am.update(self.pool.as_ref()).await?;
        log::info!("game {} configuration updated", updated.id);
        Ok(updated)
    }

    /// 启用/停用玩法 (停用后拒售, 不影响已售票据的结算)
    pub async fn set_active(&self, game_id: i64, active: bool) -> EngineResult<games::Model> {
        let existing = self.require_game(game_id).await?;
        let mut am = existing.into_active_model();
        am.is_active = Set(active);
        am.updated_at = Set(Some(Utc::now()));
        Ok(am.update(self.pool.as_ref()).await?)
    }

    pub async fn get_config(&self, game_id: i64) -> EngineResult<GameConfig> {
        GameConfig::try_from(self.require_game(game_id).await?)
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

    /// 请求体转临时实体用于统一校验 (不落库)
    fn draft_model(id: i64, req: &GameUpsertRequest) -> EngineResult<games::Model> {
        Ok(games::Model {
            id,
            name: req.name.clone(),
            kind: req.kind.clone(),
            extraction_times: serde_json::to_string(&req.extraction_times)?,
            cutoff_minutes: req.cutoff_minutes,
            utc_offset_minutes: req.utc_offset_minutes,
            numbering_mode: req.numbering_mode.clone(),
            max_tickets_per_series: req.max_tickets_per_series,
            numbers_per_ticket: req.numbers_per_ticket,
            number_range: req.number_range,
            milhar_prize_cents: req.milhar_prize_cents,
            centena_prize_cents: req.centena_prize_cents,
            dezena_prize_cents: req.dezena_prize_cents,
            pool_bp: req.pool_bp,
            top_bp: req.top_bp,
            second_bp: req.second_bp,
            third_bp: req.third_bp,
            top_hits: req.top_hits,
            second_hits: req.second_hits,
            third_hits: req.third_hits,
            unclaimed_policy: req.unclaimed_policy.clone(),
            is_active: true,
            created_at: None,
            updated_at: None,
        })
    }
}
