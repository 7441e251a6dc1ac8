use alloy_primitives::{Address, I256, U256};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::TaskId;

/// Direct payout from the hook to an intent owner
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferBalance {
    pub amount: U256,
    pub currency: Address,
    pub recipient: Address,
}

/// Residual swap the hook executes against the pool
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapBalance {
    pub amount_specified: I256,
    pub zero_for_one: bool,
    pub sqrt_price_limit_x96: U256,
}

/// Instructions that close out one batch on chain
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub transfers: Vec<TransferBalance>,
    pub swaps: Vec<SwapBalance>,
    /// Human readable accounting per task
    pub analysis: BTreeMap<TaskId, String>,
}

impl Settlement {
    pub fn is_empty(&self) -> bool {
        self.transfers.is_empty() && self.swaps.is_empty()
    }

    /// Sum of all transfers paid in `currency`
    pub fn transferred(&self, currency: Address) -> U256 {
        self.transfers
            .iter()
            .filter(|t| t.currency == currency)
            .map(|t| t.amount)
            .fold(U256::ZERO, |acc, amount| acc + amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transferred_sums_by_currency() {
        let token0 = Address::repeat_byte(0x01);
        let token1 = Address::repeat_byte(0x02);
        let settlement = Settlement {
            transfers: vec![
                TransferBalance {
                    amount: U256::from(5u64),
                    currency: token0,
                    recipient: Address::repeat_byte(0xaa),
                },
                TransferBalance {
                    amount: U256::from(7u64),
                    currency: token0,
                    recipient: Address::repeat_byte(0xbb),
                },
                TransferBalance {
                    amount: U256::from(11u64),
                    currency: token1,
                    recipient: Address::repeat_byte(0xcc),
                },
            ],
            swaps: vec![],
            analysis: BTreeMap::new(),
        };

        assert_eq!(settlement.transferred(token0), U256::from(12u64));
        assert_eq!(settlement.transferred(token1), U256::from(11u64));
        assert!(!settlement.is_empty());
        assert!(Settlement::default().is_empty());
    }
}
