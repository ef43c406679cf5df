//! Domain 模块
//!
//! 目标链配置、派生路径与 MPC 公钥模型

pub mod chain_config;
pub mod derivation;
pub mod public_key;

// 重新导出常用类型
pub use chain_config::{AddressFamily, Chain, ChainConfig, ChainRegistry, NetworkMode};
pub use derivation::{build_derivation_path, parse_index, DerivationPath, DEFAULT_INDEX};
pub use public_key::{CurveType, PublicKey};
