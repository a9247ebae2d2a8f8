//! Request shapes as they arrive from an outer layer, validated once into
//! typed values.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::decimal::{Money, Rate};
use crate::errors::{LoanError, Result};
use crate::loan::NewLoan;
use crate::payments::PaymentRequest;
use crate::types::{InterestPeriod, LoanId, PaymentKind, PersonId};

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLoanCommand {
    pub person_id: String,
    pub initial_capital: String,
    pub interest_rate: String,
    pub interest_type: String,
    pub start_date: String,
    #[serde(default)]
    pub notes: Option<String>,
}

impl CreateLoanCommand {
    pub fn validate(&self) -> Result<NewLoan> {
        let terms = NewLoan {
            person_id: parse_uuid("personId", &self.person_id)?,
            initial_capital: parse_money("initialCapital", &self.initial_capital)?,
            interest_rate: Rate::from_percentage_decimal(parse_decimal("interestRate", &self.interest_rate)?),
            interest_period: parse_period(&self.interest_type)?,
            start_date: parse_date(&self.start_date)?,
            notes: self.notes.clone().filter(|n| !n.trim().is_empty()),
        };
        terms.validate()?;
        Ok(terms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentCommand {
    pub amount: String,
    pub date: String,
}

impl PaymentCommand {
    pub fn validate(&self, loan_id: LoanId, kind: PaymentKind, currency_scale: u32) -> Result<PaymentRequest> {
        let request = PaymentRequest::new(
            loan_id,
            parse_money("amount", &self.amount)?,
            parse_date(&self.date)?,
            kind,
        );
        request.validate(currency_scale)?;
        Ok(request)
    }
}

/// parse an ISO `YYYY-MM-DD` calendar date
pub fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|e| LoanError::InvalidDate {
        message: format!("{value:?}: {e}"),
    })
}

pub fn parse_period(value: &str) -> Result<InterestPeriod> {
    match value.trim().to_ascii_uppercase().as_str() {
        "MONTHLY" => Ok(InterestPeriod::Monthly),
        "ANNUAL" => Ok(InterestPeriod::Annual),
        other => Err(LoanError::Validation {
            message: format!("unknown interest period {other:?}"),
        }),
    }
}

fn parse_uuid(field: &str, value: &str) -> Result<PersonId> {
    uuid::Uuid::parse_str(value.trim()).map_err(|e| LoanError::Validation {
        message: format!("{field}: {e}"),
    })
}

fn parse_decimal(field: &str, value: &str) -> Result<Decimal> {
    Decimal::from_str(value.trim()).map_err(|e| LoanError::Validation {
        message: format!("{field}: {value:?} is not a number ({e})"),
    })
}

fn parse_money(field: &str, value: &str) -> Result<Money> {
    parse_decimal(field, value).map(Money::from_decimal)
}
