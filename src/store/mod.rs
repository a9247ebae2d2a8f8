//! Storage ports the engine depends on.
//!
//! Implementations decide the persistence technology; the engine only
//! relies on `LedgerStore::commit` applying a loan update and its
//! movements as one unit.

pub mod memory;

use std::sync::Arc;

use crate::access::AccessCode;
use crate::errors::Result;
use crate::ledger::Movement;
use crate::loan::Loan;
use crate::types::{LoanFilter, LoanId, Person, PersonId};

pub use memory::InMemoryStore;

/// read-only view of the borrower directory
pub trait PersonDirectory {
    /// fails with `PersonNotFound` when absent
    fn find_person(&self, id: PersonId) -> Result<Person>;
}

pub trait LoanStore {
    /// fails with `LoanNotFound` when absent
    fn load_loan(&self, id: LoanId) -> Result<Loan>;

    /// store a new loan; rejects duplicate ids and access codes
    fn insert_loan(&self, loan: Loan) -> Result<Loan>;

    /// replace a loan whose stored version equals `loan.version`, bumping it
    fn save_loan(&self, loan: Loan) -> Result<Loan>;

    fn find_loan_by_access_code(&self, code: &AccessCode) -> Result<Option<Loan>>;

    fn list_loans(&self, filter: &LoanFilter) -> Result<Vec<Loan>>;
}

pub trait MovementStore {
    /// append one movement, assigning its sequence
    fn append_movement(&self, movement: Movement) -> Result<Movement>;

    /// movements of a loan in append order
    fn list_movements(&self, loan_id: LoanId) -> Result<Vec<Movement>>;
}

/// a loan update and the movements that justify it
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerCommit {
    pub expected_version: u64,
    pub loan: Loan,
    pub movements: Vec<Movement>,
}

pub trait LedgerStore: LoanStore + MovementStore {
    /// atomically save `loan` and append `movements`
    ///
    /// Fails with `Conflict`, writing nothing, when the stored loan's
    /// version differs from `expected_version`. Returns the saved loan
    /// and the movements with their assigned sequences.
    fn commit(&self, commit: LedgerCommit) -> Result<(Loan, Vec<Movement>)>;
}

// shared stores, e.g. several services over one `Arc<InMemoryStore>`
impl<T: PersonDirectory + ?Sized> PersonDirectory for Arc<T> {
    fn find_person(&self, id: PersonId) -> Result<Person> {
        (**self).find_person(id)
    }
}

impl<T: LoanStore + ?Sized> LoanStore for Arc<T> {
    fn load_loan(&self, id: LoanId) -> Result<Loan> {
        (**self).load_loan(id)
    }

    fn insert_loan(&self, loan: Loan) -> Result<Loan> {
        (**self).insert_loan(loan)
    }

    fn save_loan(&self, loan: Loan) -> Result<Loan> {
        (**self).save_loan(loan)
    }

    fn find_loan_by_access_code(&self, code: &AccessCode) -> Result<Option<Loan>> {
        (**self).find_loan_by_access_code(code)
    }

    fn list_loans(&self, filter: &LoanFilter) -> Result<Vec<Loan>> {
        (**self).list_loans(filter)
    }
}

impl<T: MovementStore + ?Sized> MovementStore for Arc<T> {
    fn append_movement(&self, movement: Movement) -> Result<Movement> {
        (**self).append_movement(movement)
    }

    fn list_movements(&self, loan_id: LoanId) -> Result<Vec<Movement>> {
        (**self).list_movements(loan_id)
    }
}

impl<T: LedgerStore + ?Sized> LedgerStore for Arc<T> {
    fn commit(&self, commit: LedgerCommit) -> Result<(Loan, Vec<Movement>)> {
        (**self).commit(commit)
    }
}
