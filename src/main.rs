// ==========================================
// 系统初始化导入中心 - HTTP 服务入口
// ==========================================
// 技术栈: axum + tokio + SQLite
// 环境变量: IMPORT_HUB_DB_PATH / IMPORT_HUB_BIND / RUST_LOG / IMPORT_HUB_LOG_FORMAT
// ==========================================

use anyhow::Context;
use system_init_import::app::{get_default_db_path, router, AppState, API_PREFIX};

/// 默认监听地址
const DEFAULT_BIND: &str = "127.0.0.1:8080";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志系统
    system_init_import::logging::init();

    tracing::info!("==================================================");
    tracing::info!("{}", system_init_import::APP_NAME);
    tracing::info!("系统版本: {}", system_init_import::VERSION);
    tracing::info!("==================================================");

    let db_path = get_default_db_path();
    tracing::info!("使用数据库: {}", db_path);

    let state = AppState::open(&db_path)
        .await
        .context("无法初始化AppState")?;
    system_init_import::i18n::set_locale(&state.settings.locale);
    tracing::info!("AppState初始化成功");

    let bind = std::env::var("IMPORT_HUB_BIND")
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_BIND.to_string());
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("无法监听地址 {}", bind))?;
    tracing::info!(addr = %bind, prefix = API_PREFIX, "HTTP 服务已启动");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP 服务异常退出")?;

    tracing::info!("HTTP 服务已停止");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "监听退出信号失败");
    }
}
