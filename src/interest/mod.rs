pub mod accrual;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::decimal::{Money, Rate};
use crate::types::InterestPeriod;

pub use accrual::AccrualEngine;

/// interest calculation result
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InterestCalculation {
    pub interest_amount: Money,
    pub daily_rate: Rate,
    /// signed whole days; zero or negative means nothing accrued
    pub days: i64,
    pub principal_base: Money,
}

impl InterestCalculation {
    /// elapsed days clamped at zero, as recorded on ledger movements
    pub fn days_calculated(&self) -> u32 {
        u32::try_from(self.days.max(0)).unwrap_or(u32::MAX)
    }
}

/// whole days between two calendar dates, negative when `to` precedes `from`
pub fn elapsed_days(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

/// simple interest on `capital` for `days` at `rate` quoted per `period`
///
/// `capital × rate × days / divisor`, where the divisor is 30 for monthly
/// and 365 for annual rates. Zero when `days <= 0`.
pub fn accrued_interest(capital: Money, rate: Rate, period: InterestPeriod, days: i64) -> Money {
    if days <= 0 || capital.is_zero() {
        return Money::ZERO;
    }
    let numerator = capital.as_decimal() * rate.as_decimal() * Decimal::from(days);
    Money::from_decimal(numerator / Decimal::from(period.days_in_period()))
}

/// daily rate for a rate quoted per `period`
pub fn daily_rate(rate: Rate, period: InterestPeriod) -> Rate {
    Rate::from_decimal(rate.as_decimal() / Decimal::from(period.days_in_period()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_monthly_rate_over_thirty_days() {
        let interest = accrued_interest(
            Money::from_major(1_000_000),
            Rate::from_percentage(10),
            InterestPeriod::Monthly,
            30,
        );
        assert_eq!(interest, Money::from_major(100_000));
    }

    #[test]
    fn test_annual_rate_over_full_year() {
        let interest = accrued_interest(
            Money::from_major(10_000),
            Rate::from_percentage(5),
            InterestPeriod::Annual,
            365,
        );
        assert_eq!(interest, Money::from_major(500));
    }

    #[test]
    fn test_partial_period_keeps_precision() {
        let interest = accrued_interest(
            Money::from_major(1_000_000),
            Rate::from_percentage(10),
            InterestPeriod::Monthly,
            10,
        );
        assert_eq!(interest, Money::from_decimal(dec!(33333.33333333)));
    }

    #[test]
    fn test_no_interest_for_non_positive_days() {
        let capital = Money::from_major(5_000);
        let rate = Rate::from_percentage(3);
        assert_eq!(accrued_interest(capital, rate, InterestPeriod::Monthly, 0), Money::ZERO);
        assert_eq!(accrued_interest(capital, rate, InterestPeriod::Monthly, -12), Money::ZERO);
    }

    #[test]
    fn test_elapsed_days() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(elapsed_days(start, end), 30);
        assert_eq!(elapsed_days(end, start), -30);
    }

    #[test]
    fn test_daily_rate() {
        let rate = Rate::from_percentage(3);
        assert_eq!(daily_rate(rate, InterestPeriod::Monthly).as_decimal(), dec!(0.001));
    }
}
