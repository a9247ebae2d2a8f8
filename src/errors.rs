use chrono::NaiveDate;
use thiserror::Error;

use crate::decimal::{Money, Rate};
use crate::types::{LoanId, LoanStatus, PersonId};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoanError {
    #[error("loan not found: {id}")]
    LoanNotFound {
        id: LoanId,
    },

    #[error("person not found: {id}")]
    PersonNotFound {
        id: PersonId,
    },

    #[error("no loan with access code {code}")]
    AccessCodeNotFound {
        code: String,
    },

    #[error("invalid state: cannot {operation} a loan that is {current}")]
    InvalidState {
        current: LoanStatus,
        operation: &'static str,
    },

    #[error("invalid payment amount: {amount}")]
    InvalidPaymentAmount {
        amount: Money,
    },

    #[error("invalid capital amount: {amount}")]
    InvalidCapital {
        amount: Money,
    },

    #[error("invalid interest rate: {rate}")]
    InvalidInterestRate {
        rate: Rate,
    },

    #[error("payment exceeds total debt: paid {amount}, owed {owed}")]
    Overpayment {
        amount: Money,
        owed: Money,
    },

    #[error("payment date {date} is before {boundary}")]
    BackdatedPayment {
        date: NaiveDate,
        boundary: NaiveDate,
    },

    #[error("invalid date: {message}")]
    InvalidDate {
        message: String,
    },

    #[error("validation failed: {message}")]
    Validation {
        message: String,
    },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        message: String,
    },

    #[error("ledger invariant violated: {message}")]
    InvariantViolation {
        message: String,
    },

    #[error("concurrent modification of loan {loan_id}: expected version {expected}, found {found}")]
    Conflict {
        loan_id: LoanId,
        expected: u64,
        found: u64,
    },

    #[error("duplicate loan id: {id}")]
    DuplicateLoan {
        id: LoanId,
    },

    #[error("access code already issued: {code}")]
    DuplicateAccessCode {
        code: String,
    },

    #[error("no unique access code after {attempts} attempts")]
    AccessCodeExhausted {
        attempts: u32,
    },

    #[error("storage error: {message}")]
    Storage {
        message: String,
    },
}

/// error taxonomy exposed to the application layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidState,
    Validation,
    Conflict,
    Storage,
}

impl LoanError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LoanError::LoanNotFound { .. }
            | LoanError::PersonNotFound { .. }
            | LoanError::AccessCodeNotFound { .. } => ErrorKind::NotFound,
            LoanError::InvalidState { .. } => ErrorKind::InvalidState,
            LoanError::InvalidPaymentAmount { .. }
            | LoanError::InvalidCapital { .. }
            | LoanError::InvalidInterestRate { .. }
            | LoanError::Overpayment { .. }
            | LoanError::BackdatedPayment { .. }
            | LoanError::InvalidDate { .. }
            | LoanError::Validation { .. }
            | LoanError::InvalidConfiguration { .. } => ErrorKind::Validation,
            LoanError::Conflict { .. }
            | LoanError::DuplicateLoan { .. }
            | LoanError::DuplicateAccessCode { .. } => ErrorKind::Conflict,
            LoanError::InvariantViolation { .. }
            | LoanError::AccessCodeExhausted { .. }
            | LoanError::Storage { .. } => ErrorKind::Storage,
        }
    }

    /// whether the caller may retry the whole operation unchanged
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Conflict
    }
}

pub type Result<T> = std::result::Result<T, LoanError>;
