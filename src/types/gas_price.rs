//! Observer-voted gas prices per chain

use serde::{Deserialize, Serialize};

/// Gas prices reported by observers for one chain
///
/// Each signer owns one slot; a new vote from the same signer overwrites it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasPrice {
    pub creator: String,
    pub index: String,
    pub chain_id: i64,
    pub signers: Vec<String>,
    pub block_nums: Vec<u64>,
    pub prices: Vec<u64>,
    pub priority_fees: Vec<u64>,
    pub median_index: u64,
}

impl GasPrice {
    pub fn new(chain_id: i64, creator: &str) -> Self {
        Self {
            creator: creator.to_string(),
            index: chain_id.to_string(),
            chain_id,
            ..Default::default()
        }
    }

    /// Record a signer's vote and recompute the median
    pub fn vote(&mut self, signer: &str, price: u64, priority_fee: u64, block_number: u64) {
        // records written before priority fees existed have shorter vectors
        self.priority_fees.resize(self.prices.len(), 0);

        match self.signers.iter().position(|s| s == signer) {
            Some(slot) => {
                self.block_nums[slot] = block_number;
                self.prices[slot] = price;
                self.priority_fees[slot] = priority_fee;
            }
            None => {
                self.signers.push(signer.to_string());
                self.block_nums.push(block_number);
                self.prices.push(price);
                self.priority_fees.push(priority_fee);
            }
        }

        self.median_index = median_index(&self.prices) as u64;
    }

    pub fn median_price(&self) -> Option<u64> {
        self.prices.get(self.median_index as usize).copied()
    }

    /// Median of the priority fees, independent of the price median
    pub fn median_priority_fee(&self) -> u64 {
        let mut fees: Vec<u64> = self.priority_fees.clone();
        fees.resize(self.prices.len(), 0);
        if fees.is_empty() {
            return 0;
        }
        fees.sort_unstable();
        fees[fees.len() / 2]
    }
}

/// Position in `values` of the upper median
fn median_index(values: &[u64]) -> usize {
    if values.is_empty() {
        return 0;
    }
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by_key(|&i| values[i]);
    order[values.len() / 2]
}
