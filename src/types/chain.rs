//! Chain registry records consumed from the observer collaborator

use serde::{Deserialize, Serialize};

/// Execution environment of a connected chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Vm {
    Evm,
    /// Bitcoin-like chains using segwit outputs
    Utxo,
    Svm,
    /// The hub's own EVM
    Zevm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Network {
    Mainnet,
    Testnet,
    Privnet,
}

/// How outbound settlement is initiated on a destination chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayKind {
    /// External chain, settled by observers signing with the TSS
    Observers,
    /// Hub chain, settled synchronously by a deposit into the hub EVM
    Zevm,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chain {
    pub chain_id: i64,
    pub name: String,
    pub vm: Vm,
    pub network: Network,
    pub gateway: GatewayKind,
}

impl Chain {
    pub fn is_external(&self) -> bool {
        self.gateway == GatewayKind::Observers
    }

    pub fn is_evm(&self) -> bool {
        self.vm == Vm::Evm
    }

    pub fn is_utxo(&self) -> bool {
        self.vm == Vm::Utxo
    }
}

/// Per-chain parameters maintained by the observer collaborator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainParams {
    pub chain_id: i64,
    /// Address of the hub-native token contract deployed on this chain
    pub zeta_token_contract_address: String,
    /// Share of unused gas fees kept in the gas stability pool
    pub stability_pool_percentage: u64,
    pub is_supported: bool,
}
