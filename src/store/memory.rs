use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::access::AccessCode;
use crate::errors::{LoanError, Result};
use crate::ledger::Movement;
use crate::loan::Loan;
use crate::store::{LedgerCommit, LedgerStore, LoanStore, MovementStore, PersonDirectory};
use crate::types::{LoanFilter, LoanId, Person, PersonId};

#[derive(Debug, Default)]
struct Tables {
    persons: HashMap<PersonId, Person>,
    loans: HashMap<LoanId, Loan>,
    access_codes: HashMap<AccessCode, LoanId>,
    movements: HashMap<LoanId, Vec<Movement>>,
    /// insertion order of loans, for stable listings
    loan_order: Vec<LoanId>,
}

impl Tables {
    fn loan(&self, id: LoanId) -> Result<&Loan> {
        self.loans.get(&id).ok_or(LoanError::LoanNotFound { id })
    }

    fn check_version(&self, loan: &Loan, expected: u64) -> Result<()> {
        let found = self.loan(loan.id)?.version;
        if found != expected {
            return Err(LoanError::Conflict { loan_id: loan.id, expected, found });
        }
        Ok(())
    }

    /// identity, origination terms and the access code never change after insert
    fn check_immutable(&self, loan: &Loan) -> Result<()> {
        let stored = self.loan(loan.id)?;
        let changed = if stored.person_id != loan.person_id {
            Some("person_id")
        } else if stored.access_code != loan.access_code {
            Some("access_code")
        } else if stored.initial_capital != loan.initial_capital {
            Some("initial_capital")
        } else if stored.start_date != loan.start_date {
            Some("start_date")
        } else {
            None
        };
        match changed {
            Some(field) => Err(LoanError::InvariantViolation {
                message: format!("loan {} cannot change its {field}", loan.id),
            }),
            None => Ok(()),
        }
    }

    fn check_movement(&self, movement: &Movement) -> Result<()> {
        if !self.loans.contains_key(&movement.loan_id) {
            return Err(LoanError::LoanNotFound { id: movement.loan_id });
        }
        if !movement.is_balanced() {
            return Err(LoanError::InvariantViolation {
                message: format!("movement {} has unbalanced capital snapshots", movement.id),
            });
        }
        Ok(())
    }

    fn push_movement(&mut self, mut movement: Movement) -> Movement {
        let stream = self.movements.entry(movement.loan_id).or_default();
        movement.sequence = stream.len() as u64 + 1;
        stream.push(movement.clone());
        movement
    }

    fn replace_loan(&mut self, mut loan: Loan) -> Loan {
        loan.version += 1;
        self.loans.insert(loan.id, loan.clone());
        loan
    }
}

/// In-memory store implementing every storage port.
///
/// All tables sit behind one lock, so a commit is observed either
/// entirely or not at all.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// register a borrower in the directory
    pub fn add_person(&self, person: Person) -> Result<Person> {
        self.write()?.persons.insert(person.id, person.clone());
        Ok(person)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>> {
        self.tables.read().map_err(|_| LoanError::Storage { message: "lock poisoned".to_string() })
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>> {
        self.tables.write().map_err(|_| LoanError::Storage { message: "lock poisoned".to_string() })
    }
}

impl PersonDirectory for InMemoryStore {
    fn find_person(&self, id: PersonId) -> Result<Person> {
        self.read()?
            .persons
            .get(&id)
            .cloned()
            .ok_or(LoanError::PersonNotFound { id })
    }
}

impl LoanStore for InMemoryStore {
    fn load_loan(&self, id: LoanId) -> Result<Loan> {
        self.read()?.loan(id).cloned()
    }

    fn insert_loan(&self, loan: Loan) -> Result<Loan> {
        let mut tables = self.write()?;
        if tables.loans.contains_key(&loan.id) {
            return Err(LoanError::DuplicateLoan { id: loan.id });
        }
        if tables.access_codes.contains_key(&loan.access_code) {
            return Err(LoanError::DuplicateAccessCode { code: loan.access_code.to_string() });
        }

        let loan = Loan { version: 1, ..loan };
        tables.access_codes.insert(loan.access_code.clone(), loan.id);
        tables.loan_order.push(loan.id);
        tables.loans.insert(loan.id, loan.clone());
        Ok(loan)
    }

    fn save_loan(&self, loan: Loan) -> Result<Loan> {
        let mut tables = self.write()?;
        tables.check_version(&loan, loan.version)?;
        tables.check_immutable(&loan)?;
        Ok(tables.replace_loan(loan))
    }

    fn find_loan_by_access_code(&self, code: &AccessCode) -> Result<Option<Loan>> {
        let tables = self.read()?;
        Ok(tables
            .access_codes
            .get(code)
            .and_then(|id| tables.loans.get(id))
            .cloned())
    }

    fn list_loans(&self, filter: &LoanFilter) -> Result<Vec<Loan>> {
        let tables = self.read()?;
        Ok(tables
            .loan_order
            .iter()
            .filter_map(|id| tables.loans.get(id))
            .filter(|loan| filter.matches(loan.status, loan.person_id))
            .cloned()
            .collect())
    }
}

impl MovementStore for InMemoryStore {
    fn append_movement(&self, movement: Movement) -> Result<Movement> {
        let mut tables = self.write()?;
        tables.check_movement(&movement)?;
        Ok(tables.push_movement(movement))
    }

    fn list_movements(&self, loan_id: LoanId) -> Result<Vec<Movement>> {
        Ok(self.read()?.movements.get(&loan_id).cloned().unwrap_or_default())
    }
}

impl LedgerStore for InMemoryStore {
    fn commit(&self, commit: LedgerCommit) -> Result<(Loan, Vec<Movement>)> {
        let mut tables = self.write()?;

        // validate everything before the first write
        tables.check_version(&commit.loan, commit.expected_version)?;
        tables.check_immutable(&commit.loan)?;
        for movement in &commit.movements {
            if movement.loan_id != commit.loan.id {
                return Err(LoanError::InvariantViolation {
                    message: format!(
                        "movement {} belongs to loan {}, not {}",
                        movement.id, movement.loan_id, commit.loan.id
                    ),
                });
            }
            tables.check_movement(movement)?;
        }

        let movements = commit
            .movements
            .into_iter()
            .map(|m| tables.push_movement(m))
            .collect();
        let loan = tables.replace_loan(Loan { version: commit.expected_version, ..commit.loan });
        Ok((loan, movements))
    }
}
