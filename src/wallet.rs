//! Locally tracked wallet for simulated trading

use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use tracing::debug;

use crate::common::errors::Result;
use crate::common::traits::Wallet;

/// Wallet whose balance only moves when trades are applied to it
#[derive(Debug)]
pub struct SimulatedWallet {
    balance: Mutex<Decimal>,
}

impl SimulatedWallet {
    pub fn new(initial_balance: Decimal) -> Self {
        Self {
            balance: Mutex::new(initial_balance),
        }
    }

    pub fn balance(&self) -> Decimal {
        *self.balance.lock()
    }
}

#[async_trait]
impl Wallet for SimulatedWallet {
    async fn get_balance(&self) -> Result<Decimal> {
        Ok(self.balance())
    }

    async fn apply_delta(&self, amount: Decimal) -> Result<Decimal> {
        let mut balance = self.balance.lock();
        *balance += amount;
        debug!(delta = %amount, balance = %*balance, "Simulated balance updated");
        Ok(*balance)
    }
}
