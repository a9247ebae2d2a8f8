pub mod waterfall;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::decimal::Money;
use crate::errors::{LoanError, Result};
use crate::interest::InterestCalculation;
use crate::ledger::Movement;
use crate::loan::Loan;
use crate::types::{LoanId, OverpaymentPolicy, PaymentApplication, PaymentKind};

pub use waterfall::{allocate, OutstandingBalances};

/// payment request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub loan_id: LoanId,
    pub amount: Money,
    pub payment_date: NaiveDate,
    pub kind: PaymentKind,
}

impl PaymentRequest {
    pub fn new(loan_id: LoanId, amount: Money, payment_date: NaiveDate, kind: PaymentKind) -> Self {
        Self { loan_id, amount, payment_date, kind }
    }

    /// amounts must be positive and expressible in the currency's minor unit
    pub fn validate(&self, currency_scale: u32) -> Result<()> {
        if !self.amount.is_positive() {
            return Err(LoanError::InvalidPaymentAmount { amount: self.amount });
        }
        if self.amount.scale() > currency_scale {
            return Err(LoanError::Validation {
                message: format!(
                    "payment amount {} has more than {} decimal places",
                    self.amount, currency_scale
                ),
            });
        }
        Ok(())
    }
}

/// everything a payment changes, computed before anything is written
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentPlan {
    /// version the loan had when it was read
    pub expected_version: u64,
    pub loan: Loan,
    /// consolidation, payment and optional payoff marker, in append order
    pub movements: Vec<Movement>,
    pub application: PaymentApplication,
    pub interest: InterestCalculation,
}

impl PaymentPlan {
    pub fn pays_off(&self) -> bool {
        self.movements.iter().any(Movement::is_payoff_marker)
    }
}

/// committed result of a payment
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentOutcome {
    pub loan: Loan,
    pub movements: Vec<Movement>,
    pub application: PaymentApplication,
    pub paid_off: bool,
}

/// payment processor
#[derive(Debug, Clone)]
pub struct PaymentProcessor {
    currency_scale: u32,
    overpayment_policy: OverpaymentPolicy,
}

impl PaymentProcessor {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            currency_scale: config.currency_scale,
            overpayment_policy: config.overpayment_policy,
        }
    }

    /// compute the consolidation, allocation and payoff for a payment
    ///
    /// Pure: the returned plan holds the updated loan and the movements to
    /// append, and must be committed as one unit.
    pub fn plan(&self, loan: &Loan, request: &PaymentRequest, now: DateTime<Utc>) -> Result<PaymentPlan> {
        loan.ensure_active("apply a payment to")?;
        request.validate(self.currency_scale)?;
        self.validate_date(loan, request.payment_date)?;

        let date = request.payment_date;
        let capital_before = loan.current_capital;

        // consolidate accrued interest at ledger precision
        let interest = loan.accrued_interest(date);
        let accrued = interest.interest_amount.round_dp(self.currency_scale);
        let days = interest.days_calculated();

        let mut movements = Vec::with_capacity(3);
        movements.push(Movement::consolidation(loan.id, accrued, days, capital_before, date, now));

        let balances = OutstandingBalances { interest: accrued, principal: capital_before };
        let application = allocate(balances, request.amount);

        if application.excess.is_positive() {
            match self.overpayment_policy {
                OverpaymentPolicy::Reject => {
                    return Err(LoanError::Overpayment {
                        amount: request.amount,
                        owed: balances.total(),
                    });
                }
                OverpaymentPolicy::Cap => {
                    warn!(
                        loan_id = %loan.id,
                        amount = %request.amount,
                        excess = %application.excess,
                        "payment exceeds total debt, excess not applied"
                    );
                }
            }
        }

        let mut updated = loan.clone();
        updated.current_capital = capital_before - application.to_principal;
        updated.last_consolidation_date = date;
        updated.updated_at = now;

        movements.push(Movement::payment(
            loan.id,
            request.kind.movement_kind(),
            request.amount,
            application.to_interest,
            application.to_principal,
            days,
            capital_before,
            date,
            now,
        ));

        if updated.current_capital.is_zero() {
            updated.mark_paid(now)?;
            movements.push(Movement::payoff_marker(loan.id, date, now));
            info!(loan_id = %loan.id, %date, "loan paid off");
        }

        updated.check_invariants()?;

        Ok(PaymentPlan {
            expected_version: loan.version,
            loan: updated,
            movements,
            application,
            interest,
        })
    }

    fn validate_date(&self, loan: &Loan, date: NaiveDate) -> Result<()> {
        if date < loan.start_date {
            return Err(LoanError::BackdatedPayment { date, boundary: loan.start_date });
        }
        if date < loan.last_consolidation_date {
            return Err(LoanError::BackdatedPayment {
                date,
                boundary: loan.last_consolidation_date,
            });
        }
        Ok(())
    }
}
