//! Coin classes carried by a cross-chain transaction

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Asset class of the value moved by a CCTX
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoinType {
    /// Native coin of the hub chain
    #[default]
    Zeta,
    /// Native gas coin of an external chain
    Gas,
    /// Token of an external chain, represented on the hub as a ZRC20
    Erc20,
    /// Administrative command (fund migration, custody updates)
    Cmd,
    /// Message passing without any value attached
    NoAssetCall,
}

impl CoinType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CoinType::Zeta => "zeta",
            CoinType::Gas => "gas",
            CoinType::Erc20 => "erc20",
            CoinType::Cmd => "cmd",
            CoinType::NoAssetCall => "no_asset_call",
        }
    }
}

impl fmt::Display for CoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// External asset registered on the hub as a ZRC20
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignCoin {
    pub zrc20: Address,
    pub foreign_chain_id: i64,
    /// Contract of the asset on its chain; empty for gas coins
    pub asset: String,
    pub coin_type: CoinType,
    /// `GAS_LIMIT` of the ZRC20, used for withdrawals
    pub gas_limit: u64,
}
