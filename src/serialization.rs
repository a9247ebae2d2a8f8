/// serializable views over loans and their ledgers
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::ledger::{self, Movement};
use crate::loan::Loan;
use crate::types::{InterestPeriod, LoanId, LoanStatus, MovementKind, PersonId};

/// loan together with its debt as of a date
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanView {
    pub id: LoanId,
    pub person_id: PersonId,
    pub status: LoanStatus,
    pub initial_capital: Money,
    pub current_capital: Money,
    pub interest_rate: Rate,
    pub interest_type: InterestPeriod,
    pub start_date: NaiveDate,
    pub last_consolidation_date: NaiveDate,
    pub access_code: String,
    pub access_link: String,
    pub notes: Option<String>,
    pub debt: DebtView,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebtView {
    pub as_of: NaiveDate,
    pub days_accrued: i64,
    pub accrued_interest: Money,
    pub total_debt: Money,
}

impl LoanView {
    /// amounts are rounded to `currency_scale` for presentation
    pub fn from_loan(loan: &Loan, as_of: NaiveDate, currency_scale: u32) -> Self {
        let interest = loan.accrued_interest(as_of);
        LoanView {
            id: loan.id,
            person_id: loan.person_id,
            status: loan.status,
            initial_capital: loan.initial_capital,
            current_capital: loan.current_capital,
            interest_rate: loan.interest_rate,
            interest_type: loan.interest_period,
            start_date: loan.start_date,
            last_consolidation_date: loan.last_consolidation_date,
            access_code: loan.access_code.to_string(),
            access_link: loan.access_link.clone(),
            notes: loan.notes.clone(),
            debt: DebtView {
                as_of,
                days_accrued: interest.days.max(0),
                accrued_interest: interest.interest_amount.round_dp(currency_scale),
                total_debt: loan.total_debt(as_of).round_dp(currency_scale),
            },
        }
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementView {
    pub sequence: u64,
    #[serde(rename = "type")]
    pub kind: MovementKind,
    pub amount: Money,
    pub interest_amount: Money,
    pub capital_amount: Money,
    pub days_calculated: u32,
    pub capital_before: Money,
    pub capital_after: Money,
    pub movement_date: NaiveDate,
    pub notes: Option<String>,
}

impl From<&Movement> for MovementView {
    fn from(m: &Movement) -> Self {
        MovementView {
            sequence: m.sequence,
            kind: m.kind,
            amount: m.amount,
            interest_amount: m.interest_amount,
            capital_amount: m.capital_amount,
            days_calculated: m.days_calculated,
            capital_before: m.capital_before,
            capital_after: m.capital_after,
            movement_date: m.movement_date,
            notes: m.notes.clone(),
        }
    }
}

impl MovementView {
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// movement history in display order (movement date, then append order)
pub fn movement_history(movements: &[Movement]) -> Vec<MovementView> {
    ledger::sort_for_display(movements).iter().map(MovementView::from).collect()
}
