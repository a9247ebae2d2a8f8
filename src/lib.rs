pub mod access;
pub mod commands;
pub mod config;
pub mod decimal;
pub mod errors;
pub mod interest;
pub mod ledger;
pub mod loan;
pub mod payments;
pub mod serialization;
pub mod service;
pub mod store;
pub mod telemetry;
pub mod types;

// re-export key types
pub use access::{AccessCode, AccessCodeIssuer};
pub use config::EngineConfig;
pub use decimal::{Money, Rate};
pub use errors::{ErrorKind, LoanError, Result};
pub use interest::{accrued_interest, elapsed_days, AccrualEngine, InterestCalculation};
pub use ledger::{LedgerAudit, Movement};
pub use loan::{Loan, NewLoan};
pub use payments::{PaymentOutcome, PaymentProcessor, PaymentRequest};
pub use service::{LoanService, PortfolioSummary};
pub use store::{InMemoryStore, LedgerCommit, LedgerStore, LoanStore, MovementStore, PersonDirectory};
pub use types::{
    InterestPeriod, LoanFilter, LoanId, LoanStatus, MovementKind, OverpaymentPolicy,
    PaymentApplication, PaymentKind, Person, PersonId,
};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
