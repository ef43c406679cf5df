//! chainsig - NEAR MPC 链签名：跨链地址派生与签名请求引擎
//!
//! 后端不持有任何外链私钥：地址由 MPC 网络按 `{account},{chain},{index}` 路径派生，
//! 签名由 MPC 合约完成。

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod service;

// 重新导出常用类型
pub use app_state::AppState;
pub use error::{AppError, AppErrorCode, ChainSigError};

pub mod prelude {
    pub use crate::{
        app_state::AppState,
        domain::{Chain, ChainConfig, ChainRegistry, DerivationPath, NetworkMode, PublicKey},
        error::{AppError, AppErrorCode, ChainSigError},
        service::{DerivedAddress, MpcKeyClient, SignatureRequestCoordinator},
    };
}
