use sea_orm_migration::prelude::extension::postgres::Type;
use sea_orm_migration::prelude::*;

/// Games (玩法配置表)
/// 数字类玩法 (milhar/centena/dezena) 与足球竞猜 (pool) 共用一张配置表,
/// 按 kind 区分, 不相关的列保持默认值。
#[derive(DeriveIden)]
enum Games {
    Table,
    Id,
    Name,
    Kind,
    ExtractionTimes,
    CutoffMinutes,
    UtcOffsetMinutes,
    NumberingMode,
    MaxTicketsPerSeries,
    NumbersPerTicket,
    NumberRange,
    MilharPrizeCents,
    CentenaPrizeCents,
    DezenaPrizeCents,
    PoolBp,
    TopBp,
    SecondBp,
    ThirdBp,
    TopHits,
    SecondHits,
    ThirdHits,
    UnclaimedPolicy,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

/// Series (票据批次表) - 按 (game, channel) 滚动编号
#[derive(DeriveIden)]
enum Series {
    Table,
    Id,
    GameId,
    ChannelId,
    SeriesNumber,
    SoldCount,
    MaxTickets,
    Status,
    CreatedAt,
    UpdatedAt,
}

/// Tickets (票据表)
#[derive(DeriveIden)]
enum Tickets {
    Table,
    Id,
    PublicId,
    GameId,
    ChannelId,
    SeriesId,
    SeriesNumber,
    Slot,
    TicketCode,
    Numbers,
    Picks,
    DrawAt,
    AmountCents,
    Status,
    HitCount,
    PrizeCents,
    CreatedAt,
    UpdatedAt,
}

/// Draws (开奖期表) - (game_id, draw_at) 唯一
#[derive(DeriveIden)]
enum Draws {
    Table,
    Id,
    GameId,
    DrawAt,
    Result,
    PublishedAt,
    SettledAt,
    TotalCollectedCents,
    CreatedAt,
    UpdatedAt,
}

/// Matches (竞猜场次表, 仅 pool 玩法)
#[derive(DeriveIden)]
enum Matches {
    Table,
    Id,
    DrawId,
    MatchOrder,
    HomeTeam,
    AwayTeam,
    Result,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 枚举类型
        manager
            .create_type(
                Type::create()
                    .as_enum(Alias::new("game_kind"))
                    .values(vec![Alias::new("digit"), Alias::new("pool")])
                    .to_owned(),
            )
            .await?;

        manager
            .create_type(
                Type::create()
                    .as_enum(Alias::new("numbering_mode"))
                    .values(vec![Alias::new("sequential"), Alias::new("random")])
                    .to_owned(),
            )
            .await?;

        manager
            .create_type(
                Type::create()
                    .as_enum(Alias::new("unclaimed_policy"))
                    .values(vec![Alias::new("house"), Alias::new("carry_over")])
                    .to_owned(),
            )
            .await?;

        manager
            .create_type(
                Type::create()
                    .as_enum(Alias::new("series_status"))
                    .values(vec![
                        Alias::new("active"),
                        Alias::new("full"),
                        Alias::new("paused"),
                        Alias::new("closed"),
                    ])
                    .to_owned(),
            )
            .await?;

        manager
            .create_type(
                Type::create()
                    .as_enum(Alias::new("ticket_status"))
                    .values(vec![
                        Alias::new("pending"),
                        Alias::new("paid"),
                        Alias::new("cancelled"),
                        Alias::new("winner"),
                    ])
                    .to_owned(),
            )
            .await?;

        manager
            .create_type(
                Type::create()
                    .as_enum(Alias::new("match_result"))
                    .values(vec![
                        Alias::new("home"),
                        Alias::new("draw"),
                        Alias::new("away"),
                    ])
                    .to_owned(),
            )
            .await?;

        // 玩法配置表
        manager
            .create_table(
                Table::create()
                    .table(Games::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Games::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Games::Name).string_len(255).not_null())
                    .col(
                        ColumnDef::new(Games::Kind)
                            .custom(Alias::new("game_kind"))
                            .not_null()
                            .default(Expr::cust("'digit'::game_kind")),
                    )
                    .col(ColumnDef::new(Games::ExtractionTimes).text().not_null())
                    .col(
                        ColumnDef::new(Games::CutoffMinutes)
                            .integer()
                            .not_null()
                            .default(10),
                    )
                    .col(
                        ColumnDef::new(Games::UtcOffsetMinutes)
                            .integer()
                            .not_null()
                            .default(-180),
                    )
                    .col(
                        ColumnDef::new(Games::NumberingMode)
                            .custom(Alias::new("numbering_mode"))
                            .not_null()
                            .default(Expr::cust("'sequential'::numbering_mode")),
                    )
                    .col(
                        ColumnDef::new(Games::MaxTicketsPerSeries)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Games::NumbersPerTicket)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(Games::NumberRange)
                            .big_integer()
                            .not_null()
                            .default(10000),
                    )
                    .col(
                        ColumnDef::new(Games::MilharPrizeCents)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Games::CentenaPrizeCents)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Games::DezenaPrizeCents)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Games::PoolBp).integer().not_null().default(7000))
                    .col(ColumnDef::new(Games::TopBp).integer().not_null().default(5000))
                    .col(ColumnDef::new(Games::SecondBp).integer().not_null().default(1500))
                    .col(ColumnDef::new(Games::ThirdBp).integer().not_null().default(500))
                    .col(ColumnDef::new(Games::TopHits).integer().not_null().default(14))
                    .col(ColumnDef::new(Games::SecondHits).integer().not_null().default(13))
                    .col(ColumnDef::new(Games::ThirdHits).integer().not_null().default(12))
                    .col(
                        ColumnDef::new(Games::UnclaimedPolicy)
                            .custom(Alias::new("unclaimed_policy"))
                            .not_null()
                            .default(Expr::cust("'house'::unclaimed_policy")),
                    )
                    .col(
                        ColumnDef::new(Games::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Games::CreatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Games::UpdatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // 批次表
        manager
            .create_table(
                Table::create()
                    .table(Series::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Series::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Series::GameId).big_integer().not_null())
                    .col(ColumnDef::new(Series::ChannelId).big_integer().not_null())
                    .col(ColumnDef::new(Series::SeriesNumber).integer().not_null())
                    .col(
                        ColumnDef::new(Series::SoldCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Series::MaxTickets).integer().not_null())
                    .col(
                        ColumnDef::new(Series::Status)
                            .custom(Alias::new("series_status"))
                            .not_null()
                            .default(Expr::cust("'active'::series_status")),
                    )
                    .col(
                        ColumnDef::new(Series::CreatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Series::UpdatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uidx_series_game_channel_number")
                    .table(Series::Table)
                    .col(Series::GameId)
                    .col(Series::ChannelId)
                    .col(Series::SeriesNumber)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // 票据表
        manager
            .create_table(
                Table::create()
                    .table(Tickets::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Tickets::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Tickets::PublicId)
                            .uuid()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Tickets::GameId).big_integer().not_null())
                    .col(ColumnDef::new(Tickets::ChannelId).big_integer().not_null())
                    .col(ColumnDef::new(Tickets::SeriesId).big_integer().not_null())
                    .col(ColumnDef::new(Tickets::SeriesNumber).integer().not_null())
                    .col(ColumnDef::new(Tickets::Slot).integer().not_null())
                    .col(ColumnDef::new(Tickets::TicketCode).string_len(32).not_null())
                    .col(ColumnDef::new(Tickets::Numbers).text().not_null())
                    .col(ColumnDef::new(Tickets::Picks).text().null())
                    .col(
                        ColumnDef::new(Tickets::DrawAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Tickets::AmountCents).big_integer().not_null())
                    .col(
                        ColumnDef::new(Tickets::Status)
                            .custom(Alias::new("ticket_status"))
                            .not_null()
                            .default(Expr::cust("'pending'::ticket_status")),
                    )
                    .col(ColumnDef::new(Tickets::HitCount).integer().null())
                    .col(ColumnDef::new(Tickets::PrizeCents).big_integer().null())
                    .col(
                        ColumnDef::new(Tickets::CreatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Tickets::UpdatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_tickets_game_draw_at")
                    .table(Tickets::Table)
                    .col(Tickets::GameId)
                    .col(Tickets::DrawAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_tickets_series_id")
                    .table(Tickets::Table)
                    .col(Tickets::SeriesId)
                    .to_owned(),
            )
            .await?;

        // 开奖期表
        manager
            .create_table(
                Table::create()
                    .table(Draws::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Draws::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Draws::GameId).big_integer().not_null())
                    .col(
                        ColumnDef::new(Draws::DrawAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Draws::Result).string_len(32).null())
                    .col(
                        ColumnDef::new(Draws::PublishedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Draws::SettledAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Draws::TotalCollectedCents)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Draws::CreatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Draws::UpdatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uidx_draws_game_draw_at")
                    .table(Draws::Table)
                    .col(Draws::GameId)
                    .col(Draws::DrawAt)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // 竞猜场次表
        manager
            .create_table(
                Table::create()
                    .table(Matches::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Matches::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Matches::DrawId).big_integer().not_null())
                    .col(ColumnDef::new(Matches::MatchOrder).integer().not_null())
                    .col(ColumnDef::new(Matches::HomeTeam).string_len(255).not_null())
                    .col(ColumnDef::new(Matches::AwayTeam).string_len(255).not_null())
                    .col(
                        ColumnDef::new(Matches::Result)
                            .custom(Alias::new("match_result"))
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Matches::CreatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Matches::UpdatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uidx_matches_draw_order")
                    .table(Matches::Table)
                    .col(Matches::DrawId)
                    .col(Matches::MatchOrder)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Matches::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Draws::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Tickets::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Series::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Games::Table).to_owned())
            .await?;

        for name in [
            "match_result",
            "ticket_status",
            "series_status",
            "unclaimed_policy",
            "numbering_mode",
            "game_kind",
        ] {
            manager
                .drop_type(Type::drop().name(Alias::new(name)).to_owned())
                .await?;
        }

        Ok(())
    }
}
