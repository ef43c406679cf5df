//! 多链配置模块
//!
//! 定义所有支持的目标链及其网络参数。注册表按网络模式（主网 / 测试网）各构建一次，
//! 进程启动后不可变。

use std::{fmt, str::FromStr};

use once_cell::sync::Lazy;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::ChainSigError;

/// 网络模式（全局唯一开关，进程启动时确定）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkMode {
    Mainnet,
    Testnet,
}

impl NetworkMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkMode::Mainnet => "mainnet",
            NetworkMode::Testnet => "testnet",
        }
    }
}

impl fmt::Display for NetworkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NetworkMode {
    type Err = ChainSigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mainnet" | "main" => Ok(NetworkMode::Mainnet),
            "testnet" | "test" => Ok(NetworkMode::Testnet),
            other => Err(ChainSigError::invalid_input(format!(
                "unknown network mode: {}",
                other
            ))),
        }
    }
}

/// 地址编码族
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressFamily {
    /// Keccak-256 派生的 0x 地址 (Ethereum 系列)
    Evm,
    /// Base58Check P2PKH (Bitcoin legacy)
    Bitcoin,
}

/// 支持的目标链（封闭集合，新增链需要修改此枚举）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    Ethereum,
    Base,
    Arbitrum,
    Polygon,
    Bitcoin,
}

impl Chain {
    /// 注册表顺序，也是批量派生的输出顺序
    pub const ALL: [Chain; 5] = [
        Chain::Ethereum,
        Chain::Base,
        Chain::Arbitrum,
        Chain::Polygon,
        Chain::Bitcoin,
    ];

    /// 规范名称（小写，用于派生路径）
    pub fn as_str(&self) -> &'static str {
        match self {
            Chain::Ethereum => "ethereum",
            Chain::Base => "base",
            Chain::Arbitrum => "arbitrum",
            Chain::Polygon => "polygon",
            Chain::Bitcoin => "bitcoin",
        }
    }

    pub fn family(&self) -> AddressFamily {
        match self {
            Chain::Ethereum | Chain::Base | Chain::Arbitrum | Chain::Polygon => AddressFamily::Evm,
            Chain::Bitcoin => AddressFamily::Bitcoin,
        }
    }

    fn aliases(&self) -> &'static [&'static str] {
        match self {
            Chain::Ethereum => &["ethereum", "eth", "mainnet", "sepolia"],
            Chain::Base => &["base"],
            Chain::Arbitrum => &["arbitrum", "arb", "arbitrum-one"],
            Chain::Polygon => &["polygon", "matic", "pol", "amoy"],
            Chain::Bitcoin => &["bitcoin", "btc"],
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Chain {
    type Err = ChainSigError;

    /// 接受规范名称、符号或常见别名（不区分大小写）
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        Chain::ALL
            .into_iter()
            .find(|chain| chain.aliases().contains(&needle.as_str()))
            .ok_or_else(|| ChainSigError::invalid_input(format!("unsupported chain: {}", s)))
    }
}

/// 链配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    pub chain: Chain,
    /// 链名称
    pub name: String,
    /// 原生代币符号
    pub symbol: String,
    /// 精度（链上整数金额 / 10^decimals）
    pub decimals: u32,
    pub rpc_url: String,
    /// 区块浏览器根地址（不带末尾斜杠）
    pub explorer_url: String,
    pub address_family: AddressFamily,
    /// EIP-155 chain id（仅 EVM 链）
    pub evm_chain_id: Option<u64>,
    pub is_testnet: bool,
}

impl ChainConfig {
    /// `{explorer}/address/{address}`
    pub fn address_url(&self, address: &str) -> String {
        format!("{}/address/{}", self.explorer_url, address)
    }

    /// `{explorer}/tx/{tx_hash}`
    pub fn tx_url(&self, tx_hash: &str) -> String {
        format!("{}/tx/{}", self.explorer_url, tx_hash)
    }

    /// 格式化链上金额：`raw / 10^decimals`，固定 6 位小数加符号
    pub fn format_amount(&self, raw: u128) -> Result<String, ChainSigError> {
        let raw = i128::try_from(raw)
            .map_err(|_| ChainSigError::invalid_input(format!("amount out of range: {}", raw)))?;
        let amount = Decimal::try_from_i128_with_scale(raw, self.decimals).map_err(|e| {
            ChainSigError::invalid_input(format!("amount {} not representable: {}", raw, e))
        })?;
        let rounded = amount.round_dp_with_strategy(6, RoundingStrategy::MidpointAwayFromZero);
        Ok(format!("{:.6} {}", rounded, self.symbol))
    }
}

static MAINNET_REGISTRY: Lazy<ChainRegistry> =
    Lazy::new(|| ChainRegistry::new(NetworkMode::Mainnet));
static TESTNET_REGISTRY: Lazy<ChainRegistry> =
    Lazy::new(|| ChainRegistry::new(NetworkMode::Testnet));

/// 链配置注册表
#[derive(Debug, Clone)]
pub struct ChainRegistry {
    network: NetworkMode,
    configs: Vec<ChainConfig>,
}

impl ChainRegistry {
    /// 进程级共享注册表（每个网络模式一份）
    pub fn for_network(network: NetworkMode) -> &'static ChainRegistry {
        match network {
            NetworkMode::Mainnet => &MAINNET_REGISTRY,
            NetworkMode::Testnet => &TESTNET_REGISTRY,
        }
    }

    /// 创建包含全部默认链的注册表
    pub fn new(network: NetworkMode) -> Self {
        Self::with_chains(network, &Chain::ALL)
    }

    /// 创建仅包含指定链的注册表（顺序与传入顺序一致，重复项忽略）
    pub fn with_chains(network: NetworkMode, chains: &[Chain]) -> Self {
        let mut configs: Vec<ChainConfig> = Vec::with_capacity(chains.len());
        for chain in chains {
            if configs.iter().all(|c| c.chain != *chain) {
                configs.push(default_config(*chain, network));
            }
        }
        Self { network, configs }
    }

    pub fn network(&self) -> NetworkMode {
        self.network
    }

    pub fn get(&self, chain: Chain) -> Result<&ChainConfig, ChainSigError> {
        self.configs
            .iter()
            .find(|c| c.chain == chain)
            .ok_or_else(|| {
                ChainSigError::invalid_input(format!(
                    "chain {} is not configured on {}",
                    chain, self.network
                ))
            })
    }

    /// 通过名称 / 别名获取配置
    pub fn get_by_name(&self, name: &str) -> Result<&ChainConfig, ChainSigError> {
        self.get(name.parse()?)
    }

    pub fn chains(&self) -> impl Iterator<Item = Chain> + '_ {
        self.configs.iter().map(|c| c.chain)
    }

    pub fn list_all(&self) -> &[ChainConfig] {
        &self.configs
    }

    pub fn get_by_family(&self, family: AddressFamily) -> Vec<&ChainConfig> {
        self.configs
            .iter()
            .filter(|c| c.address_family == family)
            .collect()
    }

    /// 验证链配置完整性，一次返回全部问题
    pub fn validate_configs(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        for config in &self.configs {
            if config.name.is_empty() {
                errors.push(format!("Chain {} has empty name", config.chain));
            }
            if config.symbol.is_empty() {
                errors.push(format!("Chain {} has empty symbol", config.chain));
            }
            if config.explorer_url.ends_with('/') {
                errors.push(format!(
                    "Chain {} explorer url must not end with '/'",
                    config.chain
                ));
            }
            if config.is_testnet != (self.network == NetworkMode::Testnet) {
                errors.push(format!(
                    "Chain {} network flag does not match registry ({})",
                    config.chain, self.network
                ));
            }

            match (config.address_family, config.evm_chain_id) {
                (AddressFamily::Evm, Some(_)) => {
                    if config.decimals == 0 {
                        errors.push(format!("Chain {} has zero decimals", config.chain));
                    }
                }
                (AddressFamily::Bitcoin, None) => {}
                (family, chain_id) => {
                    errors.push(format!(
                        "Chain {} has incompatible family and chain id: {:?} / {:?}",
                        config.chain, family, chain_id
                    ));
                }
            }

            if config.address_family != config.chain.family() {
                errors.push(format!(
                    "Chain {} registered with wrong address family {:?}",
                    config.chain, config.address_family
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn default_config(chain: Chain, network: NetworkMode) -> ChainConfig {
    let testnet = network == NetworkMode::Testnet;

    // (name, symbol, decimals, rpc, explorer, evm chain id)
    let (name, symbol, decimals, rpc_url, explorer_url, evm_chain_id) = match (chain, testnet) {
        // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
        // EVM 系列
        // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
        (Chain::Ethereum, false) => (
            "Ethereum",
            "ETH",
            18,
            "https://ethereum-rpc.publicnode.com",
            "https://etherscan.io",
            Some(1),
        ),
        (Chain::Ethereum, true) => (
            "Ethereum Sepolia",
            "ETH",
            18,
            "https://ethereum-sepolia-rpc.publicnode.com",
            "https://sepolia.etherscan.io",
            Some(11155111),
        ),
        (Chain::Base, false) => (
            "Base",
            "ETH",
            18,
            "https://mainnet.base.org",
            "https://basescan.org",
            Some(8453),
        ),
        (Chain::Base, true) => (
            "Base Sepolia",
            "ETH",
            18,
            "https://sepolia.base.org",
            "https://sepolia.basescan.org",
            Some(84532),
        ),
        (Chain::Arbitrum, false) => (
            "Arbitrum One",
            "ETH",
            18,
            "https://arb1.arbitrum.io/rpc",
            "https://arbiscan.io",
            Some(42161),
        ),
        (Chain::Arbitrum, true) => (
            "Arbitrum Sepolia",
            "ETH",
            18,
            "https://sepolia-rollup.arbitrum.io/rpc",
            "https://sepolia.arbiscan.io",
            Some(421614),
        ),
        (Chain::Polygon, false) => (
            "Polygon",
            "POL",
            18,
            "https://polygon-rpc.com",
            "https://polygonscan.com",
            Some(137),
        ),
        (Chain::Polygon, true) => (
            "Polygon Amoy",
            "POL",
            18,
            "https://rpc-amoy.polygon.technology",
            "https://amoy.polygonscan.com",
            Some(80002),
        ),
        // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
        // UTXO 系列
        // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
        (Chain::Bitcoin, false) => (
            "Bitcoin",
            "BTC",
            8,
            "https://blockstream.info/api",
            "https://mempool.space",
            None,
        ),
        (Chain::Bitcoin, true) => (
            "Bitcoin Testnet",
            "BTC",
            8,
            "https://blockstream.info/testnet/api",
            "https://mempool.space/testnet",
            None,
        ),
    };

    ChainConfig {
        chain,
        name: name.to_string(),
        symbol: symbol.to_string(),
        decimals,
        rpc_url: rpc_url.to_string(),
        explorer_url: explorer_url.to_string(),
        address_family: chain.family(),
        evm_chain_id,
        is_testnet: testnet,
    }
}
