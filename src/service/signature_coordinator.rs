//! 链签名协调服务
//!
//! 组合派生路径、MPC 公钥派生与地址编码，对外提供：
//! - 单链 / 批量外链地址派生（单链失败不影响其他链）
//! - 通过交易执行方向 MPC 合约发起签名
//! - 功能可用性检查

use std::sync::Arc;

use serde::Serialize;
use serde_json::json;

use crate::{
    domain::{
        chain_config::{Chain, ChainRegistry},
        derivation::{build_derivation_path, DerivationPath, DEFAULT_INDEX},
        public_key::PublicKey,
    },
    error::ChainSigError,
    infrastructure::near_rpc::{ExecutionOutcome, FunctionCall, TransactionExecutor, TGAS},
    service::{
        address_encoder::public_key_to_address,
        mpc_key_client::{MpcKeyClient, METHOD_SIGN},
    },
};

/// 默认签名 gas
pub const DEFAULT_SIGN_GAS: u64 = 250 * TGAS;
/// 默认押金：1 yoctoNEAR（防刷）
pub const DEFAULT_SIGN_DEPOSIT: u128 = 1;
/// 默认密钥版本
pub const DEFAULT_KEY_VERSION: u32 = 0;

/// 派生出的外链地址
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DerivedAddress {
    pub chain: Chain,
    pub address: String,
    pub path: DerivationPath,
    pub public_key: PublicKey,
}

/// 签名请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureRequest {
    pub chain: Chain,
    pub payload: Vec<u8>,
    pub path: DerivationPath,
    pub key_version: u32,
}

impl SignatureRequest {
    /// `sign` 方法参数：`{request: {payload, path, key_version}}`
    pub fn to_sign_args(&self) -> serde_json::Value {
        json!({
            "request": {
                "payload": self.payload,
                "path": self.path,
                "key_version": self.key_version,
            }
        })
    }
}

/// 从交易结果中取出的签名分量
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignatureParts {
    pub r: String,
    pub s: String,
    pub v: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignatureResult {
    pub r: String,
    pub s: String,
    pub v: u8,
    pub public_key: PublicKey,
}

/// 从 `sign` 交易结果中提取 {r, s, v}
///
/// 结果结构取决于 MPC 网络的执行结果格式，由集成方实现。
pub trait SignatureExtractor: Send + Sync {
    fn extract(&self, outcome: &ExecutionOutcome) -> Result<SignatureParts, ChainSigError>;
}

/// 默认提取器：结果格式未确定前一律报错，不返回占位签名
pub struct UnsupportedOutcomeExtractor;

impl SignatureExtractor for UnsupportedOutcomeExtractor {
    fn extract(&self, _outcome: &ExecutionOutcome) -> Result<SignatureParts, ChainSigError> {
        Err(ChainSigError::protocol(
            "signature extraction is not implemented for this MPC outcome format",
        ))
    }
}

/// 签名交易参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SigningParams {
    pub gas: u64,
    pub deposit: u128,
}

impl Default for SigningParams {
    fn default() -> Self {
        Self {
            gas: DEFAULT_SIGN_GAS,
            deposit: DEFAULT_SIGN_DEPOSIT,
        }
    }
}

pub struct SignatureRequestCoordinator {
    registry: Arc<ChainRegistry>,
    key_client: Arc<MpcKeyClient>,
    executor: Option<Arc<dyn TransactionExecutor>>,
    extractor: Arc<dyn SignatureExtractor>,
    signing: SigningParams,
}

impl SignatureRequestCoordinator {
    pub fn new(registry: Arc<ChainRegistry>, key_client: Arc<MpcKeyClient>) -> Self {
        Self {
            registry,
            key_client,
            executor: None,
            extractor: Arc::new(UnsupportedOutcomeExtractor),
            signing: SigningParams::default(),
        }
    }

    pub fn with_executor(mut self, executor: Arc<dyn TransactionExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn SignatureExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_signing_params(mut self, signing: SigningParams) -> Self {
        self.signing = signing;
        self
    }

    pub fn registry(&self) -> &ChainRegistry {
        &self.registry
    }

    pub fn key_client(&self) -> &MpcKeyClient {
        &self.key_client
    }

    /// 派生单条链的外链地址，失败时返回 `None`
    pub async fn derive_foreign_address(
        &self,
        account_id: &str,
        chain: Chain,
        index: u32,
    ) -> Option<DerivedAddress> {
        match self.try_derive_foreign_address(account_id, chain, index).await {
            Ok(derived) => Some(derived),
            Err(e) => {
                tracing::warn!(
                    account = %account_id,
                    chain = %chain,
                    index = index,
                    error = %e,
                    "Failed to derive foreign address"
                );
                None
            }
        }
    }

    /// 同上，但保留错误
    pub async fn try_derive_foreign_address(
        &self,
        account_id: &str,
        chain: Chain,
        index: u32,
    ) -> Result<DerivedAddress, ChainSigError> {
        self.registry.get(chain)?;
        let path = build_derivation_path(account_id, chain, index)?;

        // 根公钥可用是派生的前提（命中缓存时不发请求）
        self.key_client.fetch_root_public_key().await?;

        let public_key = self
            .key_client
            .derive_child_public_key(account_id, &path)
            .await?;
        let address = public_key_to_address(&public_key, chain, self.registry.network())?;

        tracing::debug!(chain = %chain, path = %path, address = %address, "Derived foreign address");

        Ok(DerivedAddress {
            chain,
            address,
            path,
            public_key,
        })
    }

    /// 按注册表顺序逐条派生，只返回成功的链
    pub async fn get_all_derived_addresses(&self, account_id: &str) -> Vec<DerivedAddress> {
        let mut results = Vec::new();

        for chain in self.registry.chains() {
            if let Some(derived) = self
                .derive_foreign_address(account_id, chain, DEFAULT_INDEX)
                .await
            {
                results.push(derived);
            }
        }

        if results.is_empty() {
            tracing::warn!(account = %account_id, "No foreign address could be derived");
        }

        results
    }

    /// 并发派生；输出仍按注册表顺序，单链失败同样被忽略
    pub async fn get_all_derived_addresses_concurrent(
        &self,
        account_id: &str,
    ) -> Vec<DerivedAddress> {
        let tasks = self
            .registry
            .chains()
            .map(|chain| self.derive_foreign_address(account_id, chain, DEFAULT_INDEX));

        futures::future::join_all(tasks)
            .await
            .into_iter()
            .flatten()
            .collect()
    }

    /// 以默认密钥版本请求签名
    pub async fn request_signature(
        &self,
        chain: Chain,
        payload: &[u8],
        index: u32,
    ) -> Result<SignatureResult, ChainSigError> {
        self.request_signature_with_version(chain, payload, index, DEFAULT_KEY_VERSION)
            .await
    }

    pub async fn request_signature_with_version(
        &self,
        chain: Chain,
        payload: &[u8],
        index: u32,
        key_version: u32,
    ) -> Result<SignatureResult, ChainSigError> {
        let executor = self
            .executor
            .as_ref()
            .ok_or_else(|| ChainSigError::unavailable("no transaction executor configured"))?;

        self.registry.get(chain)?;
        if payload.is_empty() {
            return Err(ChainSigError::invalid_input("payload must not be empty"));
        }

        let account_id = executor.signer_account_id().to_string();
        let request = SignatureRequest {
            chain,
            payload: payload.to_vec(),
            path: build_derivation_path(&account_id, chain, index)?,
            key_version,
        };

        // 先取子公钥：失败必须发生在付费的 sign 交易之前
        let public_key = self
            .key_client
            .derive_child_public_key(&account_id, &request.path)
            .await?;

        let call = FunctionCall {
            receiver_id: self.key_client.contract_id().to_string(),
            method_name: METHOD_SIGN.to_string(),
            args: request.to_sign_args(),
            gas: self.signing.gas,
            deposit: self.signing.deposit,
        };

        tracing::info!(
            account = %account_id,
            chain = %chain,
            path = %request.path,
            key_version = key_version,
            "Submitting MPC sign request"
        );

        let outcome = executor.function_call(call).await?;
        let parts = self.extractor.extract(&outcome)?;

        Ok(SignatureResult {
            r: parts.r,
            s: parts.s,
            v: parts.v,
            public_key,
        })
    }

    /// 根公钥可取到即视为可用；任何失败都归为 `Unavailable`
    pub async fn ensure_enabled(&self) -> Result<PublicKey, ChainSigError> {
        self.key_client.fetch_root_public_key().await.map_err(|e| {
            tracing::warn!(
                contract = %self.key_client.contract_id(),
                error = %e,
                "Chain signatures unavailable"
            );
            ChainSigError::unavailable(e.to_string())
        })
    }

    /// 只返回布尔值，从不报错
    pub async fn is_chain_signatures_enabled(&self) -> bool {
        self.ensure_enabled().await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::chain_config::NetworkMode;

    #[test]
    fn test_sign_args_shape() {
        let request = SignatureRequest {
            chain: Chain::Ethereum,
            payload: vec![1, 2, 3],
            path: build_derivation_path("alice.near", Chain::Ethereum, 0).unwrap(),
            key_version: 0,
        };
        let args = request.to_sign_args();
        assert_eq!(args["request"]["payload"], json!([1, 2, 3]));
        assert_eq!(args["request"]["path"], "alice.near,ethereum,0");
        assert_eq!(args["request"]["key_version"], 0);
    }

    #[test]
    fn test_default_extractor_refuses() {
        let outcome = ExecutionOutcome(json!({"status": {"SuccessValue": ""}}));
        assert!(matches!(
            UnsupportedOutcomeExtractor.extract(&outcome),
            Err(ChainSigError::Protocol(_))
        ));
    }

    #[test]
    fn test_default_signing_params() {
        let params = SigningParams::default();
        assert_eq!(params.gas, 250_000_000_000_000);
        assert_eq!(params.deposit, 1);
    }

    #[test]
    fn test_registry_accessor() {
        use crate::infrastructure::near_rpc::NearRpcClient;

        let caller = Arc::new(NearRpcClient::new(
            "http://127.0.0.1:1",
            std::time::Duration::from_secs(1),
        ));
        let coordinator = SignatureRequestCoordinator::new(
            Arc::new(ChainRegistry::new(NetworkMode::Testnet)),
            Arc::new(MpcKeyClient::new(caller, "v1.signer-prod.testnet")),
        );
        assert_eq!(coordinator.registry().network(), NetworkMode::Testnet);
        assert_eq!(coordinator.key_client().contract_id(), "v1.signer-prod.testnet");
    }
}
