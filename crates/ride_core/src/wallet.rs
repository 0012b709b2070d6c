//! Mock wallet: per-rider balance, saved cards and a ledger of top-ups and
//! ride charges. Nothing is settled anywhere; balances live in memory.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::error::{RideError, RideResult};
use crate::lifecycle::{RideRequest, RideStatus};
use crate::model::{RideId, UserId};

/// Balance a new account opens with.
pub const STARTING_BALANCE: f64 = 25.50;

/// A saved card. Only the last four digits are kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentMethod {
    pub id: String,
    pub masked_number: String,
    pub cardholder_name: String,
    pub expiry: String,
}

impl PaymentMethod {
    /// Builds a card from a raw number; spaces and dashes are ignored.
    pub fn card(
        id: impl Into<String>,
        number: &str,
        cardholder_name: impl Into<String>,
        expiry: impl Into<String>,
    ) -> RideResult<Self> {
        let digits: String = number.chars().filter(|c| !matches!(c, ' ' | '-')).collect();
        if digits.len() < 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(RideError::InvalidCardNumber);
        }
        let last4 = &digits[digits.len() - 4..];
        Ok(Self {
            id: id.into(),
            masked_number: format!("****-****-****-{last4}"),
            cardholder_name: cardholder_name.into(),
            expiry: expiry.into(),
        })
    }

    pub fn last4(&self) -> &str {
        let len = self.masked_number.len();
        &self.masked_number[len.saturating_sub(4)..]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Transaction {
    TopUp { amount: f64, at: u64 },
    /// Paid from the balance when `method_id` is `None`, else from that card.
    RideCharge {
        ride_id: RideId,
        amount: f64,
        method_id: Option<String>,
        at: u64,
    },
}

/// How a ride was paid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChargeSource {
    Balance,
    Card(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Account {
    balance: f64,
    methods: Vec<PaymentMethod>,
    default_method: Option<String>,
    transactions: Vec<Transaction>,
}

impl Account {
    fn new(balance: f64) -> Self {
        Self {
            balance,
            methods: Vec::new(),
            default_method: None,
            transactions: Vec::new(),
        }
    }

    pub fn balance(&self) -> f64 {
        self.balance
    }

    pub fn methods(&self) -> &[PaymentMethod] {
        &self.methods
    }

    pub fn default_method(&self) -> Option<&PaymentMethod> {
        let id = self.default_method.as_ref()?;
        self.methods.iter().find(|m| &m.id == id)
    }

    /// Ledger entries, oldest first.
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }
}

#[derive(Debug, Default)]
pub struct Wallet {
    accounts: HashMap<UserId, Account>,
    charged: HashSet<RideId>,
}

impl Wallet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn account(&self, user_id: &UserId) -> Option<&Account> {
        self.accounts.get(user_id)
    }

    /// Current balance; users without an account see the starting balance.
    pub fn balance(&self, user_id: &UserId) -> f64 {
        self.account(user_id)
            .map_or(STARTING_BALANCE, Account::balance)
    }

    fn account_mut(&mut self, user_id: &UserId) -> &mut Account {
        self.accounts
            .entry(user_id.clone())
            .or_insert_with(|| Account::new(STARTING_BALANCE))
    }

    /// Tops up the balance; returns the new balance.
    pub fn add_funds(&mut self, user_id: &UserId, amount: f64, at: u64) -> RideResult<f64> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(RideError::InvalidAmount(amount));
        }
        let account = self.account_mut(user_id);
        account.balance = round_cents(account.balance + amount);
        account.transactions.push(Transaction::TopUp {
            amount: round_cents(amount),
            at,
        });
        Ok(account.balance)
    }

    /// Saves a card. The first card becomes the default.
    pub fn add_payment_method(&mut self, user_id: &UserId, method: PaymentMethod) -> RideResult<()> {
        let account = self.account_mut(user_id);
        if account.methods.iter().any(|m| m.id == method.id) {
            return Err(RideError::DuplicatePaymentMethod(method.id));
        }
        if account.default_method.is_none() {
            account.default_method = Some(method.id.clone());
        }
        account.methods.push(method);
        Ok(())
    }

    /// Removes a card. If it was the default, the oldest remaining card takes over.
    pub fn remove_payment_method(&mut self, user_id: &UserId, method_id: &str) -> RideResult<PaymentMethod> {
        let account = self.account_mut(user_id);
        let idx = account
            .methods
            .iter()
            .position(|m| m.id == method_id)
            .ok_or_else(|| RideError::UnknownPaymentMethod(method_id.to_string()))?;
        let removed = account.methods.remove(idx);
        if account.default_method.as_deref() == Some(method_id) {
            account.default_method = account.methods.first().map(|m| m.id.clone());
        }
        Ok(removed)
    }

    pub fn set_default_method(&mut self, user_id: &UserId, method_id: &str) -> RideResult<()> {
        let account = self.account_mut(user_id);
        if !account.methods.iter().any(|m| m.id == method_id) {
            return Err(RideError::UnknownPaymentMethod(method_id.to_string()));
        }
        account.default_method = Some(method_id.to_string());
        Ok(())
    }

    /// Charges the rider for a completed ride, once.
    ///
    /// The balance pays when it covers the fare; otherwise the default card
    /// does. With neither, nothing changes.
    pub fn charge_ride(&mut self, ride: &RideRequest, at: u64) -> RideResult<ChargeSource> {
        if ride.status() != RideStatus::Completed {
            return Err(RideError::NotCompleted {
                ride_id: ride.id().clone(),
                status: ride.status(),
            });
        }
        if self.charged.contains(ride.id()) {
            return Err(RideError::AlreadyCharged(ride.id().clone()));
        }
        let amount = ride.price();
        let account = self.account_mut(ride.rider_id());
        let source = if account.balance >= amount {
            account.balance = round_cents(account.balance - amount);
            ChargeSource::Balance
        } else if let Some(card) = account.default_method() {
            ChargeSource::Card(card.id.clone())
        } else {
            return Err(RideError::InsufficientFunds {
                user_id: ride.rider_id().clone(),
                balance: account.balance,
                amount,
            });
        };
        let method_id = match &source {
            ChargeSource::Balance => None,
            ChargeSource::Card(id) => Some(id.clone()),
        };
        account.transactions.push(Transaction::RideCharge {
            ride_id: ride.id().clone(),
            amount,
            method_id,
            at,
        });
        self.charged.insert(ride.id().clone());
        Ok(source)
    }

    pub fn is_charged(&self, ride_id: &RideId) -> bool {
        self.charged.contains(ride_id)
    }
}

fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::{Location, Place};
    use crate::lifecycle::RideEvent;
    use crate::pricing::{FareTable, RideClass};
    use crate::routing::RouteEstimate;

    fn rider() -> UserId {
        UserId::from("rider_1")
    }

    fn ride(id: &str, distance_km: f64) -> RideRequest {
        let here = Location::new(40.7128, -74.0060).unwrap();
        let there = Location::new(40.7580, -73.9855).unwrap();
        RideRequest::new(
            RideId::from(id),
            rider(),
            Place::new("123 Main St", here),
            Place::new("456 Broadway", there),
            RideClass::Economy,
            RouteEstimate::new(distance_km, 15),
            &FareTable::default(),
            0,
        )
        .unwrap()
    }

    fn completed(id: &str, distance_km: f64) -> RideRequest {
        let mut r = ride(id, distance_km);
        r.apply(RideEvent::Accept {
            driver_id: UserId::from("driver_1"),
            at: 1,
        })
        .unwrap();
        r.apply(RideEvent::DriverArrived { at: 2 }).unwrap();
        r.apply(RideEvent::Complete { at: 3 }).unwrap();
        r
    }

    fn visa() -> PaymentMethod {
        PaymentMethod::card("card_1", "4111 1111 1111 1234", "John Doe", "12/25").unwrap()
    }

    #[test]
    fn new_account_starts_with_balance() {
        let wallet = Wallet::new();
        assert_eq!(wallet.balance(&rider()), STARTING_BALANCE);
        assert!(wallet.account(&rider()).is_none());
    }

    #[test]
    fn add_funds_rejects_bad_amounts() {
        let mut wallet = Wallet::new();
        assert_eq!(wallet.add_funds(&rider(), 10.0, 5).unwrap(), 35.50);
        for bad in [0.0, -3.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                wallet.add_funds(&rider(), bad, 6),
                Err(RideError::InvalidAmount(_))
            ));
        }
        let account = wallet.account(&rider()).unwrap();
        assert_eq!(account.balance(), 35.50);
        assert_eq!(account.transactions(), [Transaction::TopUp { amount: 10.0, at: 5 }]);
    }

    #[test]
    fn cards_are_masked() {
        let card = visa();
        assert_eq!(card.masked_number, "****-****-****-1234");
        assert_eq!(card.last4(), "1234");
        assert_eq!(
            PaymentMethod::card("c", "12a4", "x", "01/30"),
            Err(RideError::InvalidCardNumber)
        );
        assert_eq!(
            PaymentMethod::card("c", "123", "x", "01/30"),
            Err(RideError::InvalidCardNumber)
        );
    }

    #[test]
    fn first_card_is_default_until_removed() {
        let mut wallet = Wallet::new();
        let mastercard = PaymentMethod::card("card_2", "5500-0000-0000-5678", "John Doe", "09/26").unwrap();
        wallet.add_payment_method(&rider(), visa()).unwrap();
        wallet.add_payment_method(&rider(), mastercard).unwrap();
        assert_eq!(
            wallet.add_payment_method(&rider(), visa()),
            Err(RideError::DuplicatePaymentMethod("card_1".to_string()))
        );
        let account = wallet.account(&rider()).unwrap();
        assert_eq!(account.default_method().map(|m| m.id.as_str()), Some("card_1"));

        wallet.set_default_method(&rider(), "card_2").unwrap();
        assert!(wallet.set_default_method(&rider(), "card_9").is_err());
        wallet.remove_payment_method(&rider(), "card_2").unwrap();
        let account = wallet.account(&rider()).unwrap();
        assert_eq!(account.default_method().map(|m| m.id.as_str()), Some("card_1"));
        assert_eq!(
            wallet.remove_payment_method(&rider(), "card_2"),
            Err(RideError::UnknownPaymentMethod("card_2".to_string()))
        );
    }

    #[test]
    fn charge_uses_balance_then_card_once() {
        let mut wallet = Wallet::new();
        let first = completed("ride_001", 5.2);
        assert_eq!(wallet.charge_ride(&first, 10).unwrap(), ChargeSource::Balance);
        assert!((wallet.balance(&rider()) - (25.50 - 8.74)).abs() < 1e-9);
        assert_eq!(
            wallet.charge_ride(&first, 11),
            Err(RideError::AlreadyCharged(first.id().clone()))
        );

        // 2.50 + 1.20 * 20 = 26.50, more than what is left.
        let long = completed("ride_002", 20.0);
        assert!(matches!(
            wallet.charge_ride(&long, 12),
            Err(RideError::InsufficientFunds { .. })
        ));
        assert!(!wallet.is_charged(long.id()));

        wallet.add_payment_method(&rider(), visa()).unwrap();
        let before = wallet.balance(&rider());
        assert_eq!(
            wallet.charge_ride(&long, 13).unwrap(),
            ChargeSource::Card("card_1".to_string())
        );
        assert_eq!(wallet.balance(&rider()), before);
        assert_eq!(wallet.account(&rider()).unwrap().transactions().len(), 2);
    }

    #[test]
    fn open_rides_are_not_charged() {
        let mut wallet = Wallet::new();
        let pending = ride("ride_001", 5.2);
        assert!(matches!(
            wallet.charge_ride(&pending, 0),
            Err(RideError::NotCompleted { .. })
        ));
        assert_eq!(wallet.balance(&rider()), STARTING_BALANCE);
    }
}
