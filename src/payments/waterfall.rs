use crate::decimal::Money;
use crate::types::PaymentApplication;

/// balances a payment is allocated against
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutstandingBalances {
    pub interest: Money,
    pub principal: Money,
}

impl OutstandingBalances {
    pub fn total(&self) -> Money {
        self.interest + self.principal
    }
}

#[derive(Debug, Clone, Copy)]
enum PaymentComponent {
    Interest,
    Principal,
}

/// interest is always satisfied before principal
const WATERFALL: [PaymentComponent; 2] = [PaymentComponent::Interest, PaymentComponent::Principal];

/// split `amount` over the outstanding balances in waterfall order
///
/// Each component receives at most what it owes; whatever is left after
/// principal is reported as `excess` and not applied.
pub fn allocate(balances: OutstandingBalances, amount: Money) -> PaymentApplication {
    let mut application = PaymentApplication::default();
    let mut remaining = amount.max(Money::ZERO);

    for component in WATERFALL {
        let (owed, applied_field) = match component {
            PaymentComponent::Interest => (balances.interest, &mut application.to_interest),
            PaymentComponent::Principal => (balances.principal, &mut application.to_principal),
        };

        let payment = remaining.min(owed.max(Money::ZERO));
        *applied_field = payment;
        remaining -= payment;

        if remaining.is_zero() {
            break;
        }
    }

    application.excess = remaining;
    application
}
