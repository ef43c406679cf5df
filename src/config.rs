//! 配置管理模块
//! 支持从环境变量和配置文件加载配置

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    domain::chain_config::NetworkMode,
    infrastructure::near_rpc::TGAS,
    service::{
        mpc_key_client::default_mpc_contract,
        signature_coordinator::{SigningParams, DEFAULT_SIGN_DEPOSIT},
    },
};

/// 应用配置结构体
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// 源链 / MPC 网络配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub mode: NetworkMode,
    pub rpc_url: String,
    pub mpc_contract_id: String,
    /// HTTP 传输层超时（秒）
    pub request_timeout_secs: u64,
    pub sign_gas_tgas: u64,
    /// yoctoNEAR
    pub sign_deposit_yocto: u64,
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_addr: String,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "text"
}

pub fn default_rpc_url(mode: NetworkMode) -> &'static str {
    match mode {
        NetworkMode::Mainnet => "https://rpc.mainnet.near.org",
        NetworkMode::Testnet => "https://rpc.testnet.near.org",
    }
}

impl NetworkConfig {
    pub fn signing_params(&self) -> SigningParams {
        SigningParams {
            gas: self.sign_gas_tgas.saturating_mul(TGAS),
            deposit: u128::from(self.sign_deposit_yocto),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        let mode = std::env::var("CHAINSIG_NETWORK")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(NetworkMode::Testnet);

        Self {
            mode,
            rpc_url: std::env::var("NEAR_RPC_URL")
                .unwrap_or_else(|_| default_rpc_url(mode).to_string()),
            mpc_contract_id: std::env::var("MPC_CONTRACT_ID")
                .unwrap_or_else(|_| default_mpc_contract(mode).to_string()),
            request_timeout_secs: std::env::var("NEAR_RPC_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
            sign_gas_tgas: std::env::var("MPC_SIGN_GAS_TGAS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(250),
            sign_deposit_yocto: std::env::var("MPC_SIGN_DEPOSIT_YOCTO")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_SIGN_DEPOSIT as u64),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8088".into()),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            format: std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".into()),
        }
    }
}

impl Config {
    /// 从环境变量加载配置
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            network: NetworkConfig::default(),
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
        })
    }

    /// 从配置文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: Config =
            toml::from_str(&content).with_context(|| "Failed to parse config file as TOML")?;

        Ok(config)
    }

    /// 从环境变量和配置文件合并加载（配置文件优先级更高）
    pub fn from_env_and_file<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        let mut config = Self::from_env()?;

        if let Some(path) = path {
            if path.as_ref().exists() {
                config = Self::from_file(path)?;
            }
        }

        Ok(config)
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<()> {
        if !self.network.rpc_url.starts_with("http://")
            && !self.network.rpc_url.starts_with("https://")
        {
            anyhow::bail!("NEAR_RPC_URL must start with http:// or https://");
        }

        if self.network.mpc_contract_id.is_empty() {
            anyhow::bail!("MPC_CONTRACT_ID must not be empty");
        }

        if self.network.request_timeout_secs == 0 {
            anyhow::bail!("NEAR_RPC_TIMEOUT_SECS must be greater than 0");
        }

        // NEAR 单笔交易 gas 上限 300 TGas
        if self.network.sign_gas_tgas == 0 || self.network.sign_gas_tgas > 300 {
            anyhow::bail!("MPC_SIGN_GAS_TGAS must be between 1 and 300");
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            anyhow::bail!("LOG_LEVEL must be one of: {:?}", valid_levels);
        }

        if self.logging.format != "json" && self.logging.format != "text" {
            anyhow::bail!("LOG_FORMAT must be 'json' or 'text'");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    #[test]
    fn test_config_from_env_defaults() {
        let config = Config::from_env().unwrap();
        assert!(!config.network.rpc_url.is_empty());
        assert!(!config.network.mpc_contract_id.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[network]
mode = "mainnet"
rpc_url = "https://rpc.mainnet.near.org"
mpc_contract_id = "v1.signer"
request_timeout_secs = 10
sign_gas_tgas = 250
sign_deposit_yocto = 1

[server]
bind_addr = "127.0.0.1:9090"

[logging]
level = "debug"
format = "json"
"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.network.mode, NetworkMode::Mainnet);
        assert_eq!(config.network.mpc_contract_id, "v1.signer");
        assert_eq!(config.server.bind_addr, "127.0.0.1:9090");
        assert_eq!(config.network.signing_params().gas, 250 * TGAS);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_rejects_bad_values() {
        let mut config = Config::from_env().unwrap();
        config.network.rpc_url = "ftp://example".into();
        assert!(config.validate().is_err());

        let mut config = Config::from_env().unwrap();
        config.network.sign_gas_tgas = 301;
        assert!(config.validate().is_err());

        let mut config = Config::from_env().unwrap();
        config.logging.format = "xml".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file_falls_back_to_env() {
        let config = Config::from_env_and_file(Some("/nonexistent/chainsig.toml")).unwrap();
        assert!(!config.server.bind_addr.is_empty());
    }
}
