use chrono::NaiveDate;
use hourglass_rs::SafeTimeProvider;
use tracing::debug;

use crate::decimal::{Money, Rate};
use crate::interest::{accrued_interest, daily_rate, elapsed_days, InterestCalculation};
use crate::types::InterestPeriod;

/// engine for accruing simple interest on a loan's principal
#[derive(Debug, Clone, Copy)]
pub struct AccrualEngine {
    pub rate: Rate,
    pub period: InterestPeriod,
}

impl AccrualEngine {
    pub fn new(rate: Rate, period: InterestPeriod) -> Self {
        Self { rate, period }
    }

    /// interest accrued on `principal` between `from` and `to`
    pub fn calculate(&self, principal: Money, from: NaiveDate, to: NaiveDate) -> InterestCalculation {
        let days = elapsed_days(from, to);
        let interest_amount = accrued_interest(principal, self.rate, self.period, days);

        debug!(%principal, %interest_amount, days, "interest calculated");

        InterestCalculation {
            interest_amount,
            daily_rate: daily_rate(self.rate, self.period),
            days,
            principal_base: principal,
        }
    }

    /// interest accrued from `from` up to the provider's current date
    pub fn calculate_to_now(
        &self,
        principal: Money,
        from: NaiveDate,
        time_provider: &SafeTimeProvider,
    ) -> InterestCalculation {
        self.calculate(principal, from, time_provider.now().date_naive())
    }
}
