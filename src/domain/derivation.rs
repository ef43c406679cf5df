//! 派生路径
//!
//! 规范格式：`{account_id},{chain},{index}`。路径不保密，但必须可重现，
//! 以便之后重新得到同一个地址。

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{domain::chain_config::Chain, error::ChainSigError};

/// 默认地址索引
pub const DEFAULT_INDEX: u32 = 0;

/// MPC 派生路径（不透明字符串）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DerivationPath(String);

impl DerivationPath {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 拆回 (account, chain, index)
    ///
    /// chain 与 index 不含逗号，所以从右侧切分总能还原账户（即便账户本身含逗号）。
    pub fn components(&self) -> Option<(&str, &str, u32)> {
        let mut parts = self.0.rsplitn(3, ',');
        let index = parts.next()?.parse().ok()?;
        let chain = parts.next()?;
        let account = parts.next()?;
        Some((account, chain, index))
    }
}

impl fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DerivationPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// 账户标识不能为空，也不能只有空白
pub fn validate_account_id(account_id: &str) -> Result<(), ChainSigError> {
    if account_id.trim().is_empty() {
        return Err(ChainSigError::invalid_input("account id must not be empty"));
    }
    Ok(())
}

/// 构建规范派生路径
///
/// 纯函数：相同输入必得相同路径，任一输入不同则路径不同。
pub fn build_derivation_path(
    account_id: &str,
    chain: Chain,
    index: u32,
) -> Result<DerivationPath, ChainSigError> {
    validate_account_id(account_id)?;

    Ok(DerivationPath(format!(
        "{},{},{}",
        account_id,
        chain.as_str(),
        index
    )))
}

/// 解析外部传入的索引（拒绝负数和非数字）
pub fn parse_index(raw: &str) -> Result<u32, ChainSigError> {
    let trimmed = raw.trim();
    if trimmed.starts_with('-') {
        return Err(ChainSigError::invalid_input(format!(
            "index must be non-negative: {}",
            raw
        )));
    }
    trimmed
        .parse::<u32>()
        .map_err(|_| ChainSigError::invalid_input(format!("unsupported index: {}", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_format() {
        let path = build_derivation_path("grace-textiles.testnet", Chain::Ethereum, 0).unwrap();
        assert_eq!(path.as_str(), "grace-textiles.testnet,ethereum,0");
    }

    #[test]
    fn test_deterministic() {
        let a = build_derivation_path("alice.near", Chain::Bitcoin, 7).unwrap();
        let b = build_derivation_path("alice.near", Chain::Bitcoin, 7).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_single_differing_input_changes_path() {
        let base = build_derivation_path("alice.near", Chain::Ethereum, 0).unwrap();

        let other_account = build_derivation_path("bob.near", Chain::Ethereum, 0).unwrap();
        let other_chain = build_derivation_path("alice.near", Chain::Base, 0).unwrap();
        let other_index = build_derivation_path("alice.near", Chain::Ethereum, 1).unwrap();

        assert_ne!(base, other_account);
        assert_ne!(base, other_chain);
        assert_ne!(base, other_index);
    }

    #[test]
    fn test_injective_over_all_chains_and_indices() {
        let mut seen = std::collections::HashSet::new();
        for account in ["a", "a,ethereum", "alice.near"] {
            for chain in Chain::ALL {
                for index in 0..4 {
                    let path = build_derivation_path(account, chain, index).unwrap();
                    assert!(seen.insert(path), "duplicate path for {account}/{chain}/{index}");
                }
            }
        }
    }

    #[test]
    fn test_components_roundtrip_with_comma_in_account() {
        let path = build_derivation_path("weird,account", Chain::Polygon, 3).unwrap();
        assert_eq!(path.components(), Some(("weird,account", "polygon", 3)));
    }

    #[test]
    fn test_empty_account_rejected() {
        let err = build_derivation_path("", Chain::Ethereum, 0).unwrap_err();
        assert!(matches!(err, ChainSigError::InvalidInput(_)));
    }

    #[test]
    fn test_blank_account_rejected() {
        for blank in ["  ", "\t", " \n "] {
            assert!(matches!(
                build_derivation_path(blank, Chain::Bitcoin, 0),
                Err(ChainSigError::InvalidInput(_))
            ));
            assert!(validate_account_id(blank).is_err());
        }
        assert!(validate_account_id("alice.near").is_ok());
    }

    #[test]
    fn test_parse_index() {
        assert_eq!(parse_index("0").unwrap(), 0);
        assert_eq!(parse_index(" 42 ").unwrap(), 42);
        assert!(parse_index("-1").is_err());
        assert!(parse_index("abc").is_err());
        assert!(parse_index("4294967296").is_err());
    }
}
