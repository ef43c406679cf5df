//! 测试辅助模块
//! 提供 NEAR RPC 桩、交易执行桩和应用状态构造函数

#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use base64::Engine;
use chainsig::{
    app_state::AppState,
    config::Config,
    domain::chain_config::{ChainRegistry, NetworkMode},
    error::ChainSigError,
    infrastructure::near_rpc::{
        ExecutionOutcome, FunctionCall, RpcEnvelope, TransactionExecutor, ViewCaller,
        ViewFunctionRequest,
    },
    service::{
        mpc_key_client::{MpcKeyClient, METHOD_PUBLIC_KEY, TESTNET_MPC_CONTRACT},
        signature_coordinator::{SignatureExtractor, SignatureParts, SignatureRequestCoordinator},
    },
};
use sha2::{Digest, Sha256};

/// secp256k1 生成元 G 的压缩公钥，作为根公钥
pub const ROOT_KEY: &str = "secp256k1:0x0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";

/// 桩的行为模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StubMode {
    Healthy,
    NetworkDown,
    MalformedResult,
    RemoteError,
    MissingResult,
}

/// 按路径确定性地返回子公钥的 MPC 合约桩
pub struct StubCaller {
    mode: StubMode,
    failing_chains: Vec<&'static str>,
    pub calls: AtomicUsize,
    pub root_calls: AtomicUsize,
    pub paths: Mutex<Vec<String>>,
}

impl StubCaller {
    pub fn new(mode: StubMode) -> Self {
        Self {
            mode,
            failing_chains: Vec::new(),
            calls: AtomicUsize::new(0),
            root_calls: AtomicUsize::new(0),
            paths: Mutex::new(Vec::new()),
        }
    }

    pub fn healthy() -> Self {
        Self::new(StubMode::Healthy)
    }

    /// 派生路径中的链名命中时返回远端错误
    pub fn failing_for(mut self, chain: &'static str) -> Self {
        self.failing_chains.push(chain);
        self
    }
}

/// 子公钥：0x02 || SHA256(path)
pub fn child_key_for(path: &str) -> String {
    let mut bytes = vec![0x02];
    bytes.extend_from_slice(&Sha256::digest(path.as_bytes()));
    format!("secp256k1:0x{}", hex::encode(bytes))
}

fn json_bytes(value: &str) -> Vec<u8> {
    serde_json::to_vec(value).unwrap()
}

#[async_trait]
impl ViewCaller for StubCaller {
    async fn query(&self, request: &ViewFunctionRequest) -> Result<RpcEnvelope, ChainSigError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        match self.mode {
            StubMode::Healthy => {}
            StubMode::NetworkDown => return Err(ChainSigError::network("connection refused")),
            StubMode::MalformedResult => {
                return Ok(RpcEnvelope::success(b"{not json".to_vec()))
            }
            StubMode::RemoteError => {
                return Ok(RpcEnvelope::failure("Server error: contract not deployed"))
            }
            StubMode::MissingResult => return Ok(RpcEnvelope::default()),
        }

        if request.method_name == METHOD_PUBLIC_KEY {
            self.root_calls.fetch_add(1, Ordering::SeqCst);
            return Ok(RpcEnvelope::success(json_bytes(ROOT_KEY)));
        }

        let raw = base64::engine::general_purpose::STANDARD
            .decode(&request.args_base64)
            .unwrap();
        let args: serde_json::Value = serde_json::from_slice(&raw).unwrap();
        let path = args["path"].as_str().unwrap_or_default().to_string();
        self.paths.lock().unwrap().push(path.clone());

        if self
            .failing_chains
            .iter()
            .any(|chain| path.split(',').nth(1) == Some(*chain))
        {
            return Ok(RpcEnvelope::failure("derivation failed"));
        }

        Ok(RpcEnvelope::success(json_bytes(&child_key_for(&path))))
    }
}

/// 记录提交的交易并返回固定结果
pub struct StubExecutor {
    pub account_id: String,
    pub calls: Mutex<Vec<FunctionCall>>,
}

impl StubExecutor {
    pub fn new(account_id: &str) -> Self {
        Self {
            account_id: account_id.to_string(),
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl TransactionExecutor for StubExecutor {
    fn signer_account_id(&self) -> &str {
        &self.account_id
    }

    async fn function_call(&self, call: FunctionCall) -> Result<ExecutionOutcome, ChainSigError> {
        self.calls.lock().unwrap().push(call);
        Ok(ExecutionOutcome(serde_json::json!({
            "big_r": {"affine_point": "02aa"},
            "s": {"scalar": "bb"},
            "recovery_id": 1
        })))
    }
}

/// 读取桩结果里的签名分量
pub struct StubExtractor;

impl SignatureExtractor for StubExtractor {
    fn extract(&self, outcome: &ExecutionOutcome) -> Result<SignatureParts, ChainSigError> {
        let value = &outcome.0;
        Ok(SignatureParts {
            r: value["big_r"]["affine_point"]
                .as_str()
                .ok_or_else(|| ChainSigError::protocol("missing big_r"))?
                .to_string(),
            s: value["s"]["scalar"]
                .as_str()
                .ok_or_else(|| ChainSigError::protocol("missing s"))?
                .to_string(),
            v: value["recovery_id"]
                .as_u64()
                .ok_or_else(|| ChainSigError::protocol("missing recovery_id"))? as u8,
        })
    }
}

pub fn coordinator_with(
    caller: Arc<StubCaller>,
    registry: ChainRegistry,
) -> SignatureRequestCoordinator {
    SignatureRequestCoordinator::new(
        Arc::new(registry),
        Arc::new(MpcKeyClient::new(caller, TESTNET_MPC_CONTRACT)),
    )
}

pub fn testnet_coordinator(caller: Arc<StubCaller>) -> SignatureRequestCoordinator {
    coordinator_with(caller, ChainRegistry::new(NetworkMode::Testnet))
}

pub fn test_config(mode: NetworkMode) -> Config {
    let mut config = Config::from_env().unwrap();
    config.network.mode = mode;
    config.network.mpc_contract_id = TESTNET_MPC_CONTRACT.to_string();
    config
}

/// 创建测试应用状态
pub fn create_test_app_state(caller: Arc<StubCaller>) -> Arc<AppState> {
    Arc::new(AppState::with_caller(Arc::new(test_config(NetworkMode::Testnet)), caller).unwrap())
}
