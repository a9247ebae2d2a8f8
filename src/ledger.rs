use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;
use crate::loan::Loan;
use crate::types::{LoanId, MovementId, MovementKind};

pub const CONSOLIDATION_NOTE: &str = "Interest consolidation on payment";
pub const PAYMENT_NOTE: &str = "Payment received";
pub const PARTIAL_PAYMENT_NOTE: &str = "Partial payment received";
pub const PAYOFF_NOTE: &str = "Loan fully paid";

/// immutable ledger entry for one loan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movement {
    pub id: MovementId,
    pub loan_id: LoanId,
    /// append position within the loan's ledger, assigned by the store
    pub sequence: u64,
    pub kind: MovementKind,
    pub amount: Money,
    pub interest_amount: Money,
    pub capital_amount: Money,
    pub days_calculated: u32,
    pub capital_before: Money,
    pub capital_after: Money,
    pub movement_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub notes: Option<String>,
}

impl Movement {
    /// interest folded into the ledger; principal is unchanged
    pub fn consolidation(
        loan_id: LoanId,
        interest: Money,
        days: u32,
        capital: Money,
        movement_date: NaiveDate,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            loan_id,
            sequence: 0,
            kind: MovementKind::InterestConsolidation,
            amount: interest,
            interest_amount: interest,
            capital_amount: Money::ZERO,
            days_calculated: days,
            capital_before: capital,
            capital_after: capital,
            movement_date,
            created_at,
            notes: Some(CONSOLIDATION_NOTE.to_string()),
        }
    }

    /// payment split into its interest and principal portions
    #[allow(clippy::too_many_arguments)]
    pub fn payment(
        loan_id: LoanId,
        kind: MovementKind,
        amount: Money,
        interest_paid: Money,
        capital_paid: Money,
        days: u32,
        capital_before: Money,
        movement_date: NaiveDate,
        created_at: DateTime<Utc>,
    ) -> Self {
        let notes = match kind {
            MovementKind::PartialPayment => PARTIAL_PAYMENT_NOTE,
            _ => PAYMENT_NOTE,
        };
        Self {
            id: Uuid::new_v4(),
            loan_id,
            sequence: 0,
            kind,
            amount,
            interest_amount: interest_paid,
            capital_amount: capital_paid,
            days_calculated: days,
            capital_before,
            capital_after: capital_before - capital_paid,
            movement_date,
            created_at,
            notes: Some(notes.to_string()),
        }
    }

    /// zero-valued entry marking the point a loan became paid
    pub fn payoff_marker(loan_id: LoanId, movement_date: NaiveDate, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            loan_id,
            sequence: 0,
            kind: MovementKind::InterestConsolidation,
            amount: Money::ZERO,
            interest_amount: Money::ZERO,
            capital_amount: Money::ZERO,
            days_calculated: 0,
            capital_before: Money::ZERO,
            capital_after: Money::ZERO,
            movement_date,
            created_at,
            notes: Some(PAYOFF_NOTE.to_string()),
        }
    }

    pub fn is_payoff_marker(&self) -> bool {
        self.kind == MovementKind::InterestConsolidation
            && self.amount.is_zero()
            && self.notes.as_deref() == Some(PAYOFF_NOTE)
    }

    /// snapshot rule: payments move capital by exactly `capital_amount`,
    /// consolidations never move it
    pub fn is_balanced(&self) -> bool {
        if self.kind.is_payment() {
            self.capital_after == self.capital_before - self.capital_amount
        } else {
            self.capital_amount.is_zero() && self.capital_after == self.capital_before
        }
    }
}

/// principal remaining after replaying every payment in the ledger
pub fn replay_capital(initial_capital: Money, movements: &[Movement]) -> Money {
    movements
        .iter()
        .filter(|m| m.kind.is_payment())
        .fold(initial_capital, |capital, m| capital - m.capital_amount)
}

/// total interest paid across the ledger
pub fn interest_paid(movements: &[Movement]) -> Money {
    movements
        .iter()
        .filter(|m| m.kind.is_payment())
        .map(|m| m.interest_amount)
        .sum()
}

/// movements in display order: by movement date, then append order
pub fn sort_for_display(movements: &[Movement]) -> Vec<Movement> {
    let mut sorted = movements.to_vec();
    sorted.sort_by_key(|m| (m.movement_date, m.sequence));
    sorted
}

/// result of reconciling a loan against its ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerAudit {
    pub loan_id: LoanId,
    pub movement_count: usize,
    pub cached_capital: Money,
    pub replayed_capital: Money,
    pub last_capital_after: Option<Money>,
    /// sequences of entries whose before/after snapshots don't balance
    pub unbalanced_movements: Vec<u64>,
    pub sequence_gaps: bool,
}

impl LedgerAudit {
    pub fn is_consistent(&self) -> bool {
        self.cached_capital == self.replayed_capital
            && self.last_capital_after.map_or(true, |c| c == self.cached_capital)
            && self.unbalanced_movements.is_empty()
            && !self.sequence_gaps
    }
}

/// reconcile a loan's cached balance with its movements
pub fn audit(loan: &Loan, movements: &[Movement]) -> LedgerAudit {
    let unbalanced_movements = movements
        .iter()
        .filter(|m| !m.is_balanced())
        .map(|m| m.sequence)
        .collect();
    let sequence_gaps = movements
        .iter()
        .enumerate()
        .any(|(i, m)| m.sequence != i as u64 + 1);

    LedgerAudit {
        loan_id: loan.id,
        movement_count: movements.len(),
        cached_capital: loan.current_capital,
        replayed_capital: replay_capital(loan.initial_capital, movements),
        last_capital_after: movements.last().map(|m| m.capital_after),
        unbalanced_movements,
        sequence_gaps,
    }
}
