use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::decimal::Money;

/// unique identifier for a loan
pub type LoanId = Uuid;

/// unique identifier for a borrower
pub type PersonId = Uuid;

/// unique identifier for a ledger movement
pub type MovementId = Uuid;

/// period the interest rate is quoted in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InterestPeriod {
    /// rate applies per 30-day month
    Monthly,
    /// rate applies per 365-day year
    Annual,
}

impl InterestPeriod {
    /// day-count divisor for the daily rate
    pub fn days_in_period(&self) -> u32 {
        match self {
            InterestPeriod::Monthly => 30,
            InterestPeriod::Annual => 365,
        }
    }
}

/// loan status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoanStatus {
    /// accruing interest and accepting payments
    Active,
    /// principal fully repaid
    Paid,
    /// administratively closed
    Cancelled,
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LoanStatus::Active => "ACTIVE",
            LoanStatus::Paid => "PAID",
            LoanStatus::Cancelled => "CANCELLED",
        };
        f.write_str(s)
    }
}

/// ledger movement type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementKind {
    InterestConsolidation,
    Payment,
    PartialPayment,
}

impl MovementKind {
    /// whether entries of this kind reduce principal
    pub fn is_payment(&self) -> bool {
        matches!(self, MovementKind::Payment | MovementKind::PartialPayment)
    }
}

/// caller-declared payment label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentKind {
    Full,
    Partial,
}

impl PaymentKind {
    pub fn movement_kind(&self) -> MovementKind {
        match self {
            PaymentKind::Full => MovementKind::Payment,
            PaymentKind::Partial => MovementKind::PartialPayment,
        }
    }
}

/// what to do with the part of a payment that exceeds the total owed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OverpaymentPolicy {
    /// apply up to the amount owed and report the rest as excess
    #[default]
    Cap,
    /// refuse the payment outright
    Reject,
}

/// borrower identity, owned by the person directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: PersonId,
    pub name: String,
    pub identification: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

impl Person {
    pub fn new(name: impl Into<String>, identification: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            identification: identification.into(),
            phone: None,
            email: None,
            address: None,
            notes: None,
        }
    }
}

/// loan listing filter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanFilter {
    pub status: Option<LoanStatus>,
    pub person_id: Option<PersonId>,
}

impl LoanFilter {
    pub fn active() -> Self {
        Self { status: Some(LoanStatus::Active), person_id: None }
    }

    pub fn for_person(person_id: PersonId) -> Self {
        Self { status: None, person_id: Some(person_id) }
    }

    pub fn matches(&self, status: LoanStatus, person_id: PersonId) -> bool {
        self.status.map_or(true, |s| s == status) && self.person_id.map_or(true, |p| p == person_id)
    }
}

/// payment application result
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct PaymentApplication {
    pub to_interest: Money,
    pub to_principal: Money,
    /// portion of the payment that was not applied
    pub excess: Money,
}

impl PaymentApplication {
    pub fn total_applied(&self) -> Money {
        self.to_interest + self.to_principal
    }
}
