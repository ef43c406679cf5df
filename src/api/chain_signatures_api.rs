//! 链签名 API（只读）
//!
//! 外链地址派生与功能状态查询。签名需要钱包会话层提供交易执行方，不经 HTTP 暴露。

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    api::response::{success_response, ApiResponse},
    app_state::AppState,
    domain::{
        chain_config::{Chain, NetworkMode},
        derivation::{parse_index, validate_account_id, DerivationPath, DEFAULT_INDEX},
        public_key::PublicKey,
    },
    error::{AppError, ChainSigError},
    service::signature_coordinator::DerivedAddress,
};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// 请求/响应模型
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub enabled: bool,
    pub network: NetworkMode,
    pub mpc_contract_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_public_key: Option<PublicKey>,
}

#[derive(Debug, Serialize)]
pub struct AddressView {
    pub chain: Chain,
    pub address: String,
    pub path: DerivationPath,
    pub public_key: PublicKey,
    pub explorer_url: String,
}

#[derive(Debug, Serialize)]
pub struct AddressesResponse {
    pub account_id: String,
    pub network: NetworkMode,
    pub total: usize,
    pub addresses: Vec<AddressView>,
}

#[derive(Debug, Deserialize)]
pub struct IndexQuery {
    pub index: Option<String>,
}

fn to_view(st: &AppState, derived: DerivedAddress) -> AddressView {
    let explorer_url = st
        .registry
        .get(derived.chain)
        .map(|config| config.address_url(&derived.address))
        .unwrap_or_default();

    AddressView {
        chain: derived.chain,
        address: derived.address,
        path: derived.path,
        public_key: derived.public_key,
        explorer_url,
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// API Handlers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// GET /api/v1/chain-signatures/status
pub async fn get_status(
    State(st): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<StatusResponse>>, AppError> {
    let root_public_key = st.coordinator.ensure_enabled().await.ok();

    success_response(StatusResponse {
        enabled: root_public_key.is_some(),
        network: st.registry.network(),
        mpc_contract_id: st.coordinator.key_client().contract_id().to_string(),
        root_public_key,
    })
}

/// GET /api/v1/chain-signatures/:account_id/addresses
///
/// 派生失败的链被省略，不影响其余链
pub async fn list_derived_addresses(
    State(st): State<Arc<AppState>>,
    Path(account_id): Path<String>,
) -> Result<Json<ApiResponse<AddressesResponse>>, AppError> {
    validate_account_id(&account_id)?;

    let addresses: Vec<AddressView> = st
        .coordinator
        .get_all_derived_addresses_concurrent(&account_id)
        .await
        .into_iter()
        .map(|derived| to_view(&st, derived))
        .collect();

    success_response(AddressesResponse {
        network: st.registry.network(),
        total: addresses.len(),
        account_id,
        addresses,
    })
}

/// GET /api/v1/chain-signatures/:account_id/addresses/:chain?index=N
pub async fn get_derived_address(
    State(st): State<Arc<AppState>>,
    Path((account_id, chain)): Path<(String, String)>,
    Query(query): Query<IndexQuery>,
) -> Result<Json<ApiResponse<AddressView>>, AppError> {
    validate_account_id(&account_id)?;

    let chain: Chain = chain
        .parse()
        .map_err(|e: ChainSigError| AppError::chain_not_supported(e.to_string()))?;
    st.registry
        .get(chain)
        .map_err(|e| AppError::chain_not_supported(e.to_string()))?;

    let index = match query.index.as_deref() {
        Some(raw) => parse_index(raw)?,
        None => DEFAULT_INDEX,
    };

    let derived = st
        .coordinator
        .derive_foreign_address(&account_id, chain, index)
        .await
        .ok_or_else(|| {
            AppError::not_found(format!(
                "no {} address could be derived for {} at index {}",
                chain, account_id, index
            ))
        })?;

    success_response(to_view(&st, derived))
}
