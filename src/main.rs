//! chainsig 主入口

use std::sync::Arc;

use anyhow::Result;
use chainsig::{api, app_state::AppState, config::Config, infrastructure::logging};

#[tokio::main]
async fn main() -> Result<()> {
    // 1. 加载环境变量
    dotenvy::dotenv().ok();

    // 2. 加载配置（CONFIG_PATH 指向的 TOML 文件优先）
    let config_path = std::env::var("CONFIG_PATH").ok();
    let config = Config::from_env_and_file(config_path.as_deref())?;
    config.validate()?;

    // 3. 初始化日志
    logging::init_logging(&config.logging)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    tracing::info!(
        network = %config.network.mode,
        rpc_url = %config.network.rpc_url,
        "Starting chainsig"
    );

    // 4. 构建共享状态
    let bind_addr = config.server.bind_addr.clone();
    let state = Arc::new(AppState::new(Arc::new(config))?);

    // 不可用只告警，MPC 合约恢复后派生请求自然成功
    if !state.coordinator.is_chain_signatures_enabled().await {
        tracing::warn!(
            contract = %state.coordinator.key_client().contract_id(),
            "MPC contract not reachable at startup"
        );
    }

    // 5. 启动服务器
    let app = api::routes(state);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Server listening on http://{}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
