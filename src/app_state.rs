use std::{sync::Arc, time::Duration};

use anyhow::Result;

use crate::{
    config::Config,
    domain::chain_config::ChainRegistry,
    infrastructure::near_rpc::{NearRpcClient, ViewCaller},
    service::{mpc_key_client::MpcKeyClient, signature_coordinator::SignatureRequestCoordinator},
};

/// 应用状态
/// 包含所有共享资源
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub registry: &'static ChainRegistry,
    pub coordinator: Arc<SignatureRequestCoordinator>,
}

impl AppState {
    /// 创建新的应用状态（真实 NEAR RPC）
    pub fn new(config: Arc<Config>) -> Result<Self> {
        let caller = Arc::new(NearRpcClient::new(
            config.network.rpc_url.clone(),
            Duration::from_secs(config.network.request_timeout_secs),
        ));
        Self::with_caller(config, caller)
    }

    /// 使用指定的查询实现构建（测试中注入桩）
    pub fn with_caller(config: Arc<Config>, caller: Arc<dyn ViewCaller>) -> Result<Self> {
        // 进程级注册表，每个网络模式只构建一次
        let registry = ChainRegistry::for_network(config.network.mode);
        registry
            .validate_configs()
            .map_err(|errors| anyhow::anyhow!("invalid chain configs: {}", errors.join("; ")))?;

        let key_client = Arc::new(MpcKeyClient::new(
            caller,
            config.network.mpc_contract_id.clone(),
        ));
        let coordinator = SignatureRequestCoordinator::new(Arc::new(registry.clone()), key_client)
            .with_signing_params(config.network.signing_params());

        tracing::info!(
            network = %config.network.mode,
            contract = %config.network.mpc_contract_id,
            chains = registry.list_all().len(),
            "Chain signature state initialized"
        );

        Ok(Self {
            config,
            registry,
            coordinator: Arc::new(coordinator),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::chain_config::NetworkMode;

    #[test]
    fn test_state_uses_process_wide_registry() {
        let mut config = Config::from_env().unwrap();
        config.network.mode = NetworkMode::Mainnet;

        let a = AppState::new(Arc::new(config.clone())).unwrap();
        let b = AppState::new(Arc::new(config)).unwrap();

        assert!(std::ptr::eq(a.registry, b.registry));
        assert!(std::ptr::eq(
            a.registry,
            ChainRegistry::for_network(NetworkMode::Mainnet)
        ));
        assert_eq!(a.coordinator.registry().network(), NetworkMode::Mainnet);
    }
}
