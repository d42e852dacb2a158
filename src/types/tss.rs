//! TSS key records and custodial address derivation
//!
//! TSS public keys are carried as hex-encoded compressed secp256k1 points.
//! - EVM chains: keccak256 of the uncompressed point, last 20 bytes
//! - UTXO chains: P2WPKH segwit address of hash160(compressed point)

use super::chain::{Chain, Network};
use crate::error::{CrosschainError, CrosschainResult};

use alloy_primitives::Address;
use bech32::{ToBase32, Variant};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use ripemd::Ripemd160;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use sha3::{Digest, Keccak256};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tss {
    pub tss_pubkey: String,
    pub tss_participant_list: Vec<String>,
    pub operator_address_list: Vec<String>,
    pub finalized_zeta_height: i64,
    pub keygen_zeta_height: i64,
}

/// Migration cctx created for a chain while the TSS key is rotated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TssFundMigratorInfo {
    pub chain_id: i64,
    pub migration_cctx_index: String,
}

fn decode_pubkey(tss_pubkey: &str) -> CrosschainResult<k256::PublicKey> {
    let bytes = hex::decode(tss_pubkey.trim_start_matches("0x"))
        .map_err(|e| CrosschainError::InvalidAddress(format!("tss pubkey {}: {}", tss_pubkey, e)))?;
    k256::PublicKey::from_sec1_bytes(&bytes)
        .map_err(|e| CrosschainError::InvalidAddress(format!("tss pubkey {}: {}", tss_pubkey, e)))
}

/// EVM address controlled by a TSS key
pub fn tss_evm_address(tss_pubkey: &str) -> CrosschainResult<Address> {
    let pubkey = decode_pubkey(tss_pubkey)?;
    let uncompressed = pubkey.to_encoded_point(false);
    // skip the 0x04 tag
    let hash = Keccak256::digest(&uncompressed.as_bytes()[1..]);
    Ok(Address::from_slice(&hash[12..]))
}

/// Segwit (P2WPKH) address controlled by a TSS key
pub fn tss_utxo_address(tss_pubkey: &str, network: Network) -> CrosschainResult<String> {
    let pubkey = decode_pubkey(tss_pubkey)?;
    let compressed = pubkey.to_encoded_point(true);
    let program = Ripemd160::digest(Sha256::digest(compressed.as_bytes()));

    let hrp = match network {
        Network::Mainnet => "bc",
        Network::Testnet => "tb",
        Network::Privnet => "bcrt",
    };
    let witness_version = bech32::u5::try_from_u8(0)
        .map_err(|e| CrosschainError::Internal(e.to_string()))?;
    let mut data = vec![witness_version];
    data.extend(program.to_base32());

    bech32::encode(hrp, data, Variant::Bech32)
        .map_err(|e| CrosschainError::InvalidAddress(format!("bech32 encoding failed: {}", e)))
}

/// Custodial address of a TSS key on a given chain
pub fn tss_address_for_chain(tss_pubkey: &str, chain: &Chain) -> CrosschainResult<String> {
    if chain.is_evm() {
        return Ok(tss_evm_address(tss_pubkey)?.to_checksum(None));
    }
    if chain.is_utxo() {
        return tss_utxo_address(tss_pubkey, chain.network);
    }
    Err(CrosschainError::UnsupportedChain {
        chain_id: chain.chain_id,
    })
}
