//! The fear reserve: a depletable resource the player spends on stun, teleport and harvest.
//!
//! Harvesting a stunned agent pays back more than it costs; running dry blocks every action.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::EconomyError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FearAction {
    Stun,
    Teleport,
    Harvest,
}

impl fmt::Display for FearAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FearAction::Stun => "stun",
            FearAction::Teleport => "teleport",
            FearAction::Harvest => "harvest",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FearCosts {
    pub stun: u32,
    pub teleport: u32,
    pub harvest: u32,
    /// Credited after a successful harvest.
    pub harvest_yield: u32,
}

impl Default for FearCosts {
    fn default() -> Self {
        Self {
            stun: 10,
            teleport: 25,
            harvest: 5,
            harvest_yield: 30,
        }
    }
}

impl FearCosts {
    pub fn cost(&self, action: FearAction) -> u32 {
        match action {
            FearAction::Stun => self.stun,
            FearAction::Teleport => self.teleport,
            FearAction::Harvest => self.harvest,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FearReserve {
    amount: u32,
    capacity: u32,
    costs: FearCosts,
}

impl FearReserve {
    /// A full reserve.
    pub fn new(capacity: u32, costs: FearCosts) -> Self {
        Self {
            amount: capacity,
            capacity,
            costs,
        }
    }

    pub fn with_amount(mut self, amount: u32) -> Self {
        self.amount = amount.min(self.capacity);
        self
    }

    pub fn amount(&self) -> u32 {
        self.amount
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn costs(&self) -> &FearCosts {
        &self.costs
    }

    pub fn can_afford(&self, action: FearAction) -> bool {
        self.amount >= self.costs.cost(action)
    }

    /// Pays for `action`; on failure nothing is deducted. Returns the amount left.
    pub fn spend(&mut self, action: FearAction) -> Result<u32, EconomyError> {
        let cost = self.costs.cost(action);
        if self.amount < cost {
            return Err(EconomyError::Depleted {
                action,
                cost,
                available: self.amount,
            });
        }
        self.amount -= cost;
        Ok(self.amount)
    }

    /// Adds `amount`, saturating at capacity. Returns the amount actually credited.
    pub fn gain(&mut self, amount: u32) -> u32 {
        let before = self.amount;
        self.amount = self.amount.saturating_add(amount).min(self.capacity);
        self.amount - before
    }
}
