// SPDX-FileCopyrightText: 2026 Restock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Move pricing. One fixed fee per attempt, charged up front.

use restock_config::model::PricingConfig;
use restock_core::types::Task;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pricing {
    move_fee: i64,
}

impl Pricing {
    pub fn new(move_fee: i64) -> Self {
        Self {
            move_fee: move_fee.max(0),
        }
    }

    pub fn from_config(config: &PricingConfig) -> Self {
        Self::new(config.move_fee)
    }

    /// Fee for one attempt of `task`. Independent of quantity and route.
    pub fn fee_for(&self, _task: &Task) -> i64 {
        self.move_fee
    }

    pub fn move_fee(&self) -> i64 {
        self.move_fee
    }
}

impl Default for Pricing {
    fn default() -> Self {
        Self::from_config(&PricingConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_fee_comes_from_config() {
        assert_eq!(Pricing::default().move_fee(), 50);
    }

    #[test]
    fn negative_fee_is_clamped() {
        assert_eq!(Pricing::new(-10).move_fee(), 0);
    }
}
