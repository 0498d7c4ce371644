use chrono::Local;
use env_logger::{Env, Target};
use std::io::Write; // for env_logger custom formatter
use std::sync::Arc;

use sorteio_engine::{
    config::Config,
    database::{create_pool, run_migrations},
    services::{GameService, SeriesService, SettlementService, TicketService},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let ts = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
            let level = record.level().as_str().to_ascii_lowercase();
            let msg_json = serde_json::to_string(&format!("{}", record.args()))
                .unwrap_or_else(|_| "\"<invalid utf8>\"".to_string());
            writeln!(
                buf,
                "{{\"timestamp\":\"{}\",\"level\":\"{}\",\"message\":{},\"target\":\"{}\"}}",
                ts,
                level,
                msg_json,
                record.target(),
            )
        })
        .target(Target::Stdout)
        .init();

    // 加载配置
    let config = Config::from_toml().map_err(|e| anyhow::anyhow!("{e}"))?;

    // 创建数据库连接池并执行迁移 (连接句柄以 Arc 在各服务间共享)
    let pool = Arc::new(create_pool(&config.database).await?);
    run_migrations(pool.as_ref()).await?;

    // 组装引擎服务 (销售/管理端进程内集成使用)
    let series_service = SeriesService::new(pool.clone());
    let _game_service = GameService::new(pool.clone());
    let _ticket_service = TicketService::new(pool.clone(), series_service.clone());
    let _settlement_service = SettlementService::new(pool.clone());

    log::info!("sorteio engine schema is up to date, services ready");
    Ok(())
}
