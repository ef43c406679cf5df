//! MPC 签名网络客户端
//!
//! 通过源链合约接口读取根公钥（进程内缓存一次）和按路径派生的子公钥。

use std::sync::Arc;

use once_cell::sync::OnceCell;
use serde::Serialize;

use crate::{
    domain::{
        chain_config::NetworkMode,
        derivation::{validate_account_id, DerivationPath},
        public_key::PublicKey,
    },
    error::ChainSigError,
    infrastructure::near_rpc::{call_view_function, ViewCaller},
};

/// 主网 MPC 合约
pub const MAINNET_MPC_CONTRACT: &str = "v1.signer";
/// 测试网 MPC 合约
pub const TESTNET_MPC_CONTRACT: &str = "v1.signer-prod.testnet";

pub const METHOD_PUBLIC_KEY: &str = "public_key";
pub const METHOD_DERIVED_PUBLIC_KEY: &str = "derived_public_key";
pub const METHOD_SIGN: &str = "sign";

pub fn default_mpc_contract(network: NetworkMode) -> &'static str {
    match network {
        NetworkMode::Mainnet => MAINNET_MPC_CONTRACT,
        NetworkMode::Testnet => TESTNET_MPC_CONTRACT,
    }
}

#[derive(Serialize)]
struct DerivedPublicKeyArgs<'a> {
    path: &'a str,
    predecessor: &'a str,
}

pub struct MpcKeyClient {
    caller: Arc<dyn ViewCaller>,
    contract_id: String,
    root_key: OnceCell<PublicKey>,
}

impl MpcKeyClient {
    /// 每个实例持有自己的空缓存
    pub fn new(caller: Arc<dyn ViewCaller>, contract_id: impl Into<String>) -> Self {
        Self {
            caller,
            contract_id: contract_id.into(),
            root_key: OnceCell::new(),
        }
    }

    pub fn contract_id(&self) -> &str {
        &self.contract_id
    }

    /// 已缓存的根公钥（不触发远程调用）
    pub fn cached_root_public_key(&self) -> Option<&PublicKey> {
        self.root_key.get()
    }

    /// 获取 MPC 网络根公钥
    ///
    /// 缓存为空时发起一次远程查询，成功后写入缓存。并发调用方在缓存写入前可能各自
    /// 发起请求；只有第一个成功的响应会被保存。
    pub async fn fetch_root_public_key(&self) -> Result<PublicKey, ChainSigError> {
        if let Some(key) = self.root_key.get() {
            return Ok(key.clone());
        }

        let raw: String = call_view_function(
            self.caller.as_ref(),
            &self.contract_id,
            METHOD_PUBLIC_KEY,
            &serde_json::json!({}),
        )
        .await?;
        let key: PublicKey = raw.parse()?;

        if self.root_key.set(key.clone()).is_err() {
            tracing::debug!(
                contract = %self.contract_id,
                "Root public key already cached by a concurrent caller"
            );
            if let Some(cached) = self.root_key.get() {
                return Ok(cached.clone());
            }
        } else {
            tracing::info!(contract = %self.contract_id, root_key = %key, "Cached MPC root public key");
        }

        Ok(key)
    }

    /// 按路径派生子公钥（不缓存）
    pub async fn derive_child_public_key(
        &self,
        account_id: &str,
        path: &DerivationPath,
    ) -> Result<PublicKey, ChainSigError> {
        validate_account_id(account_id)?;

        let args = DerivedPublicKeyArgs {
            path: path.as_str(),
            predecessor: account_id,
        };
        let raw: String = call_view_function(
            self.caller.as_ref(),
            &self.contract_id,
            METHOD_DERIVED_PUBLIC_KEY,
            &args,
        )
        .await?;

        raw.parse()
    }
}
