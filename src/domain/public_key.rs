//! 带曲线标签的公钥
//!
//! 线上格式：`<curve>:<body>`，例如 `secp256k1:4Gt...`。body 通常是 Base58，
//! 也接受十六进制（可带 `0x`）。

use std::{fmt, str::FromStr};

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ChainSigError;

/// 加密曲线类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CurveType {
    Secp256k1,
    Ed25519,
}

impl CurveType {
    pub fn tag(&self) -> &'static str {
        match self {
            CurveType::Secp256k1 => "secp256k1",
            CurveType::Ed25519 => "ed25519",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "secp256k1" => Some(CurveType::Secp256k1),
            "ed25519" => Some(CurveType::Ed25519),
            _ => None,
        }
    }
}

/// 公钥：曲线标签 + 原始字节
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PublicKey {
    curve: CurveType,
    bytes: Vec<u8>,
}

impl PublicKey {
    pub fn new(curve: CurveType, bytes: Vec<u8>) -> Self {
        Self { curve, bytes }
    }

    pub fn curve(&self) -> CurveType {
        self.curve
    }

    /// 去掉曲线标签后的原始字节（地址编码的输入）
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl FromStr for PublicKey {
    type Err = ChainSigError;

    /// 没有标签时按 secp256k1 处理
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (curve, body) = match s.split_once(':') {
            Some((tag, body)) => {
                let curve = CurveType::from_tag(tag).ok_or_else(|| {
                    ChainSigError::protocol(format!("unknown curve tag: {}", tag))
                })?;
                (curve, body)
            }
            None => (CurveType::Secp256k1, s),
        };

        if body.is_empty() {
            return Err(ChainSigError::protocol("public key body is empty"));
        }

        Ok(Self::new(curve, decode_key_body(body)?))
    }
}

fn decode_key_body(body: &str) -> Result<Vec<u8>, ChainSigError> {
    let hex_body = body.strip_prefix("0x").unwrap_or(body);
    let looks_hex = hex_body.len() % 2 == 0 && hex_body.chars().all(|c| c.is_ascii_hexdigit());

    // Base58 字母表不含 '0'，纯十六进制串只有全是 1-9a-fA-F 时才会有歧义，此时按十六进制解释
    if body.starts_with("0x") || looks_hex {
        return hex::decode(hex_body)
            .map_err(|e| ChainSigError::protocol(format!("invalid hex public key: {}", e)));
    }

    bs58::decode(body)
        .into_vec()
        .map_err(|e| ChainSigError::protocol(format!("invalid base58 public key: {}", e)))
}

impl fmt::Display for PublicKey {
    /// 规范输出为 `<curve>:<base58>`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}",
            self.curve.tag(),
            bs58::encode(&self.bytes).into_string()
        )
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}
