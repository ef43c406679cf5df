//! 源链（NEAR）RPC 边界
//!
//! - `ViewCaller`: 只读合约查询（`query` / `call_function`）
//! - `TransactionExecutor`: 状态变更调用，由钱包会话层实现
//! - `NearRpcClient`: 基于 reqwest 的 `ViewCaller` 实现

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::ChainSigError;

/// 1 TGas
pub const TGAS: u64 = 1_000_000_000_000;

/// 只读查询请求（`query` 方法的 params）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewFunctionRequest {
    pub request_type: &'static str,
    pub finality: &'static str,
    pub account_id: String,
    pub method_name: String,
    pub args_base64: String,
}

impl ViewFunctionRequest {
    pub fn new<A: Serialize>(
        contract_id: &str,
        method_name: &str,
        args: &A,
    ) -> Result<Self, ChainSigError> {
        let args_json = serde_json::to_vec(args)?;
        Ok(Self {
            request_type: "call_function",
            finality: "final",
            account_id: contract_id.to_string(),
            method_name: method_name.to_string(),
            args_base64: base64::engine::general_purpose::STANDARD.encode(args_json),
        })
    }
}

/// RPC 响应信封：`{result?: {result: [u8]}, error?: {message}}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RpcEnvelope {
    #[serde(default)]
    pub result: Option<CallFunctionResult>,
    #[serde(default)]
    pub error: Option<RpcErrorBody>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallFunctionResult {
    /// UTF-8 编码的 JSON 字节
    #[serde(default)]
    pub result: Option<Vec<u8>>,
    #[serde(default)]
    pub logs: Vec<String>,
    /// 旧版节点在这里返回合约执行错误
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RpcErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub cause: Option<RpcErrorCause>,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RpcErrorCause {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub info: Option<serde_json::Value>,
}

impl RpcErrorBody {
    fn describe(&self) -> String {
        let mut parts = Vec::new();
        if let Some(message) = &self.message {
            parts.push(message.clone());
        }
        if let Some(cause) = self.cause.as_ref().and_then(|c| c.name.as_ref()) {
            parts.push(cause.clone());
        } else if let Some(name) = &self.name {
            parts.push(name.clone());
        }
        if let Some(data) = &self.data {
            parts.push(data.to_string());
        }
        if parts.is_empty() {
            "unspecified RPC error".to_string()
        } else {
            parts.join(": ")
        }
    }
}

impl RpcEnvelope {
    pub fn success(bytes: Vec<u8>) -> Self {
        Self {
            result: Some(CallFunctionResult {
                result: Some(bytes),
                ..Default::default()
            }),
            error: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            result: None,
            error: Some(RpcErrorBody {
                message: Some(message.into()),
                ..Default::default()
            }),
        }
    }

    /// 严格解包 `result.result`
    pub fn into_result_bytes(self) -> Result<Vec<u8>, ChainSigError> {
        if let Some(error) = self.error {
            return Err(ChainSigError::remote(error.describe()));
        }

        let result = self
            .result
            .ok_or_else(|| ChainSigError::protocol("RPC response is missing `result`"))?;

        if let Some(error) = result.error {
            return Err(ChainSigError::remote(error));
        }

        result
            .result
            .ok_or_else(|| ChainSigError::protocol("RPC response is missing `result.result`"))
    }

    /// 解包并把字节按 UTF-8 JSON 反序列化
    pub fn decode_json<T: DeserializeOwned>(self) -> Result<T, ChainSigError> {
        let bytes = self.into_result_bytes()?;
        let text = std::str::from_utf8(&bytes)
            .map_err(|e| ChainSigError::protocol(format!("result is not UTF-8: {}", e)))?;
        Ok(serde_json::from_str(text)?)
    }
}

/// 只读合约查询
#[async_trait]
pub trait ViewCaller: Send + Sync {
    async fn query(&self, request: &ViewFunctionRequest) -> Result<RpcEnvelope, ChainSigError>;
}

/// 调用合约 view 方法并解析 JSON 结果
pub async fn call_view_function<T, A>(
    caller: &dyn ViewCaller,
    contract_id: &str,
    method_name: &str,
    args: &A,
) -> Result<T, ChainSigError>
where
    T: DeserializeOwned,
    A: Serialize + Sync,
{
    let request = ViewFunctionRequest::new(contract_id, method_name, args)?;
    tracing::debug!(
        contract = %contract_id,
        method = %method_name,
        "Calling view function"
    );
    caller.query(&request).await?.decode_json()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// 状态变更调用（由钱包会话层实现）
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// 合约函数调用交易
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionCall {
    pub receiver_id: String,
    pub method_name: String,
    pub args: serde_json::Value,
    pub gas: u64,
    /// yoctoNEAR
    pub deposit: u128,
}

/// 交易执行结果（原样保留，由 `SignatureExtractor` 解读）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionOutcome(pub serde_json::Value);

#[async_trait]
pub trait TransactionExecutor: Send + Sync {
    /// 发起交易的源链账户
    fn signer_account_id(&self) -> &str;

    /// 提交交易并等待最终结果
    async fn function_call(&self, call: FunctionCall) -> Result<ExecutionOutcome, ChainSigError>;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// JSON-RPC 客户端
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: &'static str,
    method: &'static str,
    params: &'a ViewFunctionRequest,
}

#[derive(Clone)]
pub struct NearRpcClient {
    http_client: reqwest::Client,
    rpc_url: String,
}

impl NearRpcClient {
    pub fn new(rpc_url: impl Into<String>, timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            http_client,
            rpc_url: rpc_url.into(),
        }
    }
}

#[async_trait]
impl ViewCaller for NearRpcClient {
    async fn query(&self, request: &ViewFunctionRequest) -> Result<RpcEnvelope, ChainSigError> {
        let payload = JsonRpcRequest {
            jsonrpc: "2.0",
            id: "dontcare",
            method: "query",
            params: request,
        };

        let response = self
            .http_client
            .post(&self.rpc_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ChainSigError::network(format!("NEAR RPC request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| ChainSigError::network(format!("NEAR RPC body read failed: {}", e)))?;

        match serde_json::from_slice::<RpcEnvelope>(&body) {
            Ok(envelope) => Ok(envelope),
            Err(_) if !status.is_success() => Err(ChainSigError::network(format!(
                "NEAR RPC returned HTTP {}",
                status
            ))),
            Err(e) => Err(ChainSigError::protocol(format!(
                "NEAR RPC returned malformed JSON: {}",
                e
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_view_request_shape() {
        let request =
            ViewFunctionRequest::new("v1.signer", "derived_public_key", &json!({"path": "p"}))
                .unwrap();
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["request_type"], "call_function");
        assert_eq!(value["finality"], "final");
        assert_eq!(value["account_id"], "v1.signer");
        assert_eq!(value["method_name"], "derived_public_key");

        let args = base64::engine::general_purpose::STANDARD
            .decode(value["args_base64"].as_str().unwrap())
            .unwrap();
        assert_eq!(args, br#"{"path":"p"}"#);
    }

    #[test]
    fn test_envelope_success_decodes_json() {
        let raw = json!({
            "jsonrpc": "2.0",
            "id": "dontcare",
            "result": {
                "result": br#""secp256k1:abc""#.to_vec(),
                "logs": [],
                "block_height": 1
            }
        });
        let envelope: RpcEnvelope = serde_json::from_value(raw).unwrap();
        let key: String = envelope.decode_json().unwrap();
        assert_eq!(key, "secp256k1:abc");
    }

    #[test]
    fn test_envelope_missing_result_is_protocol_error() {
        let envelope: RpcEnvelope = serde_json::from_value(json!({"result": {"logs": []}})).unwrap();
        assert!(matches!(
            envelope.into_result_bytes(),
            Err(ChainSigError::Protocol(_))
        ));

        let envelope: RpcEnvelope = serde_json::from_value(json!({})).unwrap();
        assert!(matches!(
            envelope.into_result_bytes(),
            Err(ChainSigError::Protocol(_))
        ));
    }

    #[test]
    fn test_envelope_explicit_error_is_remote() {
        let envelope: RpcEnvelope = serde_json::from_value(json!({
            "error": {"message": "Server error", "cause": {"name": "UNKNOWN_ACCOUNT"}}
        }))
        .unwrap();
        match envelope.into_result_bytes() {
            Err(ChainSigError::Remote(msg)) => assert!(msg.contains("UNKNOWN_ACCOUNT")),
            other => panic!("unexpected: {:?}", other),
        }

        let envelope: RpcEnvelope =
            serde_json::from_value(json!({"result": {"error": "wasm execution failed"}})).unwrap();
        assert!(matches!(
            envelope.into_result_bytes(),
            Err(ChainSigError::Remote(_))
        ));
    }

    #[test]
    fn test_envelope_bad_payload_is_protocol_error() {
        let envelope = RpcEnvelope::success(vec![0xff, 0xfe]);
        assert!(matches!(
            envelope.decode_json::<String>(),
            Err(ChainSigError::Protocol(_))
        ));

        let envelope = RpcEnvelope::success(b"not json".to_vec());
        assert!(matches!(
            envelope.decode_json::<String>(),
            Err(ChainSigError::Protocol(_))
        ));
    }
}
