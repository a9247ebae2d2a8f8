use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::access::AccessCode;
use crate::decimal::{Money, Rate};
use crate::errors::{LoanError, Result};
use crate::interest::{daily_rate, AccrualEngine, InterestCalculation};
use crate::types::{InterestPeriod, LoanId, LoanStatus, PersonId};

/// terms supplied when a loan is created
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLoan {
    pub person_id: PersonId,
    pub initial_capital: Money,
    pub interest_rate: Rate,
    pub interest_period: InterestPeriod,
    pub start_date: NaiveDate,
    pub notes: Option<String>,
}

impl NewLoan {
    /// capital in `(0, Money::MAX]`, rate in `(0, Rate::MAX]`
    pub fn validate(&self) -> Result<()> {
        if !self.initial_capital.is_positive() || self.initial_capital > Money::MAX {
            return Err(LoanError::InvalidCapital { amount: self.initial_capital });
        }
        if !self.interest_rate.is_positive() || self.interest_rate > Rate::MAX {
            return Err(LoanError::InvalidInterestRate { rate: self.interest_rate });
        }
        Ok(())
    }
}

/// a borrower's loan and its cached balances
///
/// The balance fields mirror what replaying the loan's movements yields;
/// they are only changed together with a ledger append.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    // identification
    pub id: LoanId,
    pub person_id: PersonId,

    // balances
    pub initial_capital: Money,
    pub current_capital: Money,

    // terms
    pub interest_rate: Rate,
    pub interest_period: InterestPeriod,
    pub start_date: NaiveDate,
    pub last_consolidation_date: NaiveDate,

    // status
    pub status: LoanStatus,
    pub status_changed_at: DateTime<Utc>,

    // borrower access
    pub access_code: AccessCode,
    pub access_link: String,

    pub notes: Option<String>,

    /// optimistic concurrency token, bumped by the store on every commit
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Loan {
    /// create an active loan from validated terms
    pub fn originate(
        id: LoanId,
        terms: NewLoan,
        access_code: AccessCode,
        access_link: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            person_id: terms.person_id,
            initial_capital: terms.initial_capital,
            current_capital: terms.initial_capital,
            interest_rate: terms.interest_rate,
            interest_period: terms.interest_period,
            start_date: terms.start_date,
            last_consolidation_date: terms.start_date,
            status: LoanStatus::Active,
            status_changed_at: now,
            access_code,
            access_link,
            notes: terms.notes,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == LoanStatus::Active
    }

    /// fail with `InvalidState` unless the loan is active
    pub fn ensure_active(&self, operation: &'static str) -> Result<()> {
        if !self.is_active() {
            return Err(LoanError::InvalidState { current: self.status, operation });
        }
        Ok(())
    }

    pub fn accrual_engine(&self) -> AccrualEngine {
        AccrualEngine::new(self.interest_rate, self.interest_period)
    }

    /// interest accrued since the last consolidation; nothing accrues on closed loans
    pub fn accrued_interest(&self, as_of: NaiveDate) -> InterestCalculation {
        if !self.is_active() {
            return InterestCalculation {
                interest_amount: Money::ZERO,
                daily_rate: daily_rate(self.interest_rate, self.interest_period),
                days: 0,
                principal_base: self.current_capital,
            };
        }
        self.accrual_engine()
            .calculate(self.current_capital, self.last_consolidation_date, as_of)
    }

    /// principal plus accrued interest as of a date
    pub fn total_debt(&self, as_of: NaiveDate) -> Money {
        self.current_capital + self.accrued_interest(as_of).interest_amount
    }

    /// ACTIVE -> PAID, only once the principal is exactly zero
    pub fn mark_paid(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.ensure_active("mark as paid")?;
        if !self.current_capital.is_zero() {
            return Err(LoanError::InvariantViolation {
                message: format!("cannot mark loan {} paid with capital {}", self.id, self.current_capital),
            });
        }
        self.transition(LoanStatus::Paid, now);
        Ok(())
    }

    /// ACTIVE -> CANCELLED
    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.ensure_active("cancel")?;
        self.transition(LoanStatus::Cancelled, now);
        Ok(())
    }

    fn transition(&mut self, status: LoanStatus, now: DateTime<Utc>) {
        self.status = status;
        self.status_changed_at = now;
        self.updated_at = now;
    }

    pub fn check_invariants(&self) -> Result<()> {
        let violation = |message: String| Err(LoanError::InvariantViolation { message });

        if self.current_capital.is_negative() {
            return violation(format!("loan {} has negative capital {}", self.id, self.current_capital));
        }
        if self.current_capital > self.initial_capital {
            return violation(format!(
                "loan {} capital {} exceeds initial capital {}",
                self.id, self.current_capital, self.initial_capital
            ));
        }
        if self.last_consolidation_date < self.start_date {
            return violation(format!(
                "loan {} consolidated on {} before its start date {}",
                self.id, self.last_consolidation_date, self.start_date
            ));
        }
        if self.status == LoanStatus::Paid && !self.current_capital.is_zero() {
            return violation(format!("loan {} is paid but still owes {}", self.id, self.current_capital));
        }
        Ok(())
    }
}
