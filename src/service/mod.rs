pub mod address_encoder;
pub mod mpc_key_client; // MPC 合约 view 调用 + 根公钥缓存
pub mod signature_coordinator;

pub use address_encoder::{public_key_to_address, AddressEncoderFactory, AddressEncoding};
pub use mpc_key_client::MpcKeyClient;
pub use signature_coordinator::{DerivedAddress, SignatureRequestCoordinator, SignatureResult};
