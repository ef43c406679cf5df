//! 基础端点：健康检查与链列表

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;

use crate::{
    api::response::{success_response, ApiResponse},
    app_state::AppState,
    domain::chain_config::{ChainConfig, NetworkMode},
    error::AppError,
};

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub version: &'static str,
    pub network: NetworkMode,
}

#[derive(Debug, Serialize)]
pub struct ListChainsResponse {
    pub network: NetworkMode,
    pub total: usize,
    pub chains: Vec<ChainConfig>,
}

/// GET /api/health
///
/// 只反映进程存活，不探测 MPC 合约（见 /api/v1/chain-signatures/status）
pub async fn api_health(
    State(st): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Health>>, AppError> {
    success_response(Health {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        network: st.registry.network(),
    })
}

/// GET /api/v1/chains
pub async fn list_chains(
    State(st): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<ListChainsResponse>>, AppError> {
    let chains = st.registry.list_all().to_vec();
    success_response(ListChainsResponse {
        network: st.registry.network(),
        total: chains.len(),
        chains,
    })
}
