// ==========================================
// 培训中心排课系统 - HTTP 服务入口
// ==========================================

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use tokio::net::TcpListener;

use training_scheduler::app::{router, AppState};
use training_scheduler::config::AppConfig;
use training_scheduler::{i18n, logging};

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    tracing::info!("==================================================");
    tracing::info!("{}", training_scheduler::APP_NAME);
    tracing::info!("系统版本: {}", training_scheduler::VERSION);
    tracing::info!("==================================================");

    let config = AppConfig::from_env().context("加载进程配置失败")?;
    i18n::set_locale(&config.locale);
    tracing::info!(db_path = %config.db_path, locale = %config.locale, "使用数据库");

    let state = AppState::new(config.db_path.clone(), config.default_site_id).map_err(|e| anyhow!(e))?;
    let app = router(Arc::new(state));

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("无法监听 {}", config.bind_addr))?;
    tracing::info!(bind = %config.bind_addr, "HTTP 服务已启动");

    axum::serve(listener, app).await?;
    Ok(())
}
