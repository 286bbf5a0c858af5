//! In-process ledger standing in for the monetary transfer primitive

use chargepool_util::{AccountId, Amount};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use tracing::debug;

/// Failure of a single funds movement
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    #[error("account {account} holds {balance}, needs {amount}")]
    InsufficientFunds {
        account: AccountId,
        balance: Amount,
        amount: Amount,
    },

    #[error("account {0} rejects incoming transfers")]
    Rejected(AccountId),

    #[error("balance overflow on account {0}")]
    Overflow(AccountId),
}

/// Outgoing payments from the service account
pub trait Payments {
    /// Funds currently held by the service
    fn service_balance(&self) -> Amount;

    /// Move `amount` from the service account to `to`
    fn transfer(&mut self, to: &AccountId, amount: Amount) -> Result<(), TransferError>;
}

/// Account balances, including the service's own account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ledger {
    service: AccountId,
    balances: BTreeMap<AccountId, Amount>,
    frozen: BTreeSet<AccountId>,
}

impl Ledger {
    pub fn new() -> Self {
        Self {
            service: AccountId::service(),
            balances: BTreeMap::new(),
            frozen: BTreeSet::new(),
        }
    }

    /// Ledger seeded with opening balances
    pub fn with_balances(
        balances: impl IntoIterator<Item = (AccountId, Amount)>,
    ) -> Result<Self, TransferError> {
        let mut ledger = Self::new();
        for (account, amount) in balances {
            ledger.credit(&account, amount)?;
        }
        Ok(ledger)
    }

    pub fn balance_of(&self, account: &AccountId) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    /// Add externally sourced funds to an account
    pub fn credit(&mut self, account: &AccountId, amount: Amount) -> Result<(), TransferError> {
        let balance = self.balances.entry(account.clone()).or_insert(0);
        *balance = balance
            .checked_add(amount)
            .ok_or_else(|| TransferError::Overflow(account.clone()))?;
        Ok(())
    }

    /// Move a call's attached payment from the caller into the service account
    pub fn collect(&mut self, from: &AccountId, amount: Amount) -> Result<(), TransferError> {
        let service = self.service.clone();
        self.move_funds(from, &service, amount)
    }

    /// Make every transfer into `account` fail
    pub fn freeze(&mut self, account: &AccountId) {
        self.frozen.insert(account.clone());
    }

    fn move_funds(
        &mut self,
        from: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<(), TransferError> {
        if self.frozen.contains(to) {
            return Err(TransferError::Rejected(to.clone()));
        }

        let balance = self.balance_of(from);
        if balance < amount {
            return Err(TransferError::InsufficientFunds {
                account: from.clone(),
                balance,
                amount,
            });
        }

        let credited = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or_else(|| TransferError::Overflow(to.clone()))?;

        // A self-transfer must not double the balance
        if from != to {
            self.balances.insert(from.clone(), balance - amount);
            self.balances.insert(to.clone(), credited);
        }

        debug!(from = %from, to = %to, amount, "Funds moved");
        Ok(())
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

impl Payments for Ledger {
    fn service_balance(&self) -> Amount {
        self.balance_of(&self.service)
    }

    fn transfer(&mut self, to: &AccountId, amount: Amount) -> Result<(), TransferError> {
        let service = self.service.clone();
        self.move_funds(&service, to, amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> AccountId {
        AccountId::new("alice")
    }

    #[test]
    fn collect_and_refund() {
        let mut ledger = Ledger::with_balances([(alice(), 20_000)]).unwrap();

        ledger.collect(&alice(), 16_000).unwrap();
        assert_eq!(ledger.balance_of(&alice()), 4_000);
        assert_eq!(ledger.service_balance(), 16_000);

        ledger.transfer(&alice(), 1_000).unwrap();
        assert_eq!(ledger.balance_of(&alice()), 5_000);
        assert_eq!(ledger.service_balance(), 15_000);
    }

    #[test]
    fn insufficient_funds() {
        let mut ledger = Ledger::with_balances([(alice(), 10)]).unwrap();
        let err = ledger.collect(&alice(), 11).unwrap_err();
        assert_eq!(
            err,
            TransferError::InsufficientFunds {
                account: alice(),
                balance: 10,
                amount: 11
            }
        );
        assert_eq!(ledger.balance_of(&alice()), 10);
    }

    #[test]
    fn frozen_accounts_reject_incoming() {
        let mut ledger = Ledger::with_balances([(alice(), 100)]).unwrap();
        ledger.collect(&alice(), 100).unwrap();
        ledger.freeze(&alice());

        assert_eq!(
            ledger.transfer(&alice(), 1).unwrap_err(),
            TransferError::Rejected(alice())
        );

        assert_eq!(ledger.balance_of(&alice()), 0);
        assert_eq!(ledger.service_balance(), 100);
    }

    #[test]
    fn self_transfer_keeps_balance() {
        let mut ledger = Ledger::new();
        ledger.credit(&AccountId::service(), 50).unwrap();
        ledger.transfer(&AccountId::service(), 50).unwrap();
        assert_eq!(ledger.service_balance(), 50);
    }
}
