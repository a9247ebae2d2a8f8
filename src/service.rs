use chrono::{DateTime, NaiveDate, Utc};
use hourglass_rs::{SafeTimeProvider, TimeSource};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};
use uuid::Uuid;

use crate::access::{access_link, AccessCode, AccessCodeIssuer};
use crate::config::EngineConfig;
use crate::decimal::Money;
use crate::errors::{LoanError, Result};
use crate::ledger::{self, LedgerAudit, Movement};
use crate::loan::{Loan, NewLoan};
use crate::payments::{PaymentOutcome, PaymentProcessor, PaymentRequest};
use crate::store::{LedgerCommit, LedgerStore, PersonDirectory};
use crate::types::{LoanFilter, LoanId, PaymentKind};

/// aggregate figures over the active portfolio
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    pub as_of: NaiveDate,
    pub active_loans: usize,
    pub principal_outstanding: Money,
    pub interest_accrued: Money,
    pub total_to_collect: Money,
}

/// per-loan mutexes serializing read-modify-write sequences
///
/// An entry lives only while some caller holds or waits on it.
#[derive(Debug, Default)]
struct LoanLocks {
    locks: Mutex<HashMap<LoanId, Arc<Mutex<()>>>>,
}

impl LoanLocks {
    /// run `f` while holding the loan's mutex
    fn with_loan<T>(&self, id: LoanId, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let lock = self.for_loan(id)?;
        let result = match lock.lock() {
            Ok(_guard) => f(),
            Err(_) => Err(poisoned()),
        };
        self.release(id, lock)?;
        result
    }

    fn for_loan(&self, id: LoanId) -> Result<Arc<Mutex<()>>> {
        let mut locks = self.locks.lock().map_err(|_| poisoned())?;
        Ok(locks.entry(id).or_default().clone())
    }

    fn release(&self, id: LoanId, lock: Arc<Mutex<()>>) -> Result<()> {
        let mut locks = self.locks.lock().map_err(|_| poisoned())?;
        // the table and `lock` are the last two handles
        if Arc::strong_count(&lock) == 2 {
            locks.remove(&id);
        }
        Ok(())
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.lock().map(|l| l.len()).unwrap_or_default()
    }
}

fn poisoned() -> LoanError {
    LoanError::Storage { message: "loan lock poisoned".to_string() }
}

/// loan accounting service over an injected store
pub struct LoanService<S> {
    store: S,
    config: EngineConfig,
    processor: PaymentProcessor,
    issuer: AccessCodeIssuer,
    time: SafeTimeProvider,
    locks: LoanLocks,
}

impl<S> LoanService<S>
where
    S: PersonDirectory + LedgerStore,
{
    /// create a service using the system clock
    pub fn new(store: S, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            processor: PaymentProcessor::new(&config),
            issuer: AccessCodeIssuer::new(config.max_access_code_attempts),
            time: SafeTimeProvider::new(TimeSource::System),
            locks: LoanLocks::default(),
            config,
        })
    }

    /// replace the clock, e.g. with a test time source
    pub fn with_time(mut self, time: SafeTimeProvider) -> Self {
        self.time = time;
        self
    }

    pub fn with_issuer(mut self, issuer: AccessCodeIssuer) -> Self {
        self.issuer = issuer;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn now(&self) -> DateTime<Utc> {
        self.time.now()
    }

    /// originate a loan for an existing person and issue its access code
    pub fn create_loan(&self, terms: NewLoan) -> Result<Loan> {
        terms.validate()?;
        let person = self.store.find_person(terms.person_id)?;

        let id = Uuid::new_v4();
        let link = access_link(&self.config.access_link_base, id);

        // the store's unique index has the final say; losing a race just means drawing again
        for _ in 0..self.config.max_access_code_attempts {
            let code = self
                .issuer
                .issue(|code| Ok(self.store.find_loan_by_access_code(code)?.is_some()))?;
            let loan = Loan::originate(id, terms.clone(), code, link.clone(), self.now());

            match self.store.insert_loan(loan) {
                Ok(loan) => {
                    info!(
                        loan_id = %loan.id,
                        person = %person.name,
                        capital = %loan.initial_capital,
                        rate = %loan.interest_rate,
                        period = ?loan.interest_period,
                        "loan created"
                    );
                    return Ok(loan);
                }
                Err(LoanError::DuplicateAccessCode { code }) => {
                    warn!(%code, "access code taken at commit, regenerating");
                }
                Err(e) => return Err(e),
            }
        }

        Err(LoanError::AccessCodeExhausted { attempts: self.config.max_access_code_attempts })
    }

    pub fn get_loan(&self, loan_id: LoanId) -> Result<Loan> {
        self.store.load_loan(loan_id)
    }

    /// apply a payment: consolidate interest, allocate, detect payoff
    pub fn apply_payment(&self, loan_id: LoanId, amount: Money, date: NaiveDate) -> Result<PaymentOutcome> {
        self.pay(PaymentRequest::new(loan_id, amount, date, PaymentKind::Full))
    }

    /// same algorithm as `apply_payment`, recorded as a partial payment
    pub fn apply_partial_payment(
        &self,
        loan_id: LoanId,
        amount: Money,
        date: NaiveDate,
    ) -> Result<PaymentOutcome> {
        self.pay(PaymentRequest::new(loan_id, amount, date, PaymentKind::Partial))
    }

    /// validate, then plan and commit under the loan's lock
    pub fn pay(&self, request: PaymentRequest) -> Result<PaymentOutcome> {
        request.validate(self.config.currency_scale)?;
        self.locks.with_loan(request.loan_id, || self.pay_locked(&request))
    }

    fn pay_locked(&self, request: &PaymentRequest) -> Result<PaymentOutcome> {
        let loan = self.store.load_loan(request.loan_id)?;
        let plan = self.processor.plan(&loan, request, self.now())?;
        let paid_off = plan.pays_off();
        let application = plan.application;

        let (loan, movements) = self.store.commit(LedgerCommit {
            expected_version: plan.expected_version,
            loan: plan.loan,
            movements: plan.movements,
        })?;

        info!(
            loan_id = %loan.id,
            amount = %request.amount,
            to_interest = %application.to_interest,
            to_principal = %application.to_principal,
            capital = %loan.current_capital,
            paid_off,
            "payment applied"
        );

        Ok(PaymentOutcome { loan, movements, application, paid_off })
    }

    /// administrative ACTIVE -> CANCELLED transition; appends no movement
    pub fn cancel_loan(&self, loan_id: LoanId) -> Result<Loan> {
        self.locks.with_loan(loan_id, || {
            let mut loan = self.store.load_loan(loan_id)?;
            let expected_version = loan.version;
            loan.cancel(self.now())?;

            let (loan, _) = self.store.commit(LedgerCommit { expected_version, loan, movements: Vec::new() })?;
            info!(loan_id = %loan.id, capital = %loan.current_capital, "loan cancelled");
            Ok(loan)
        })
    }

    /// principal plus interest accrued up to `as_of`
    pub fn get_total_debt(&self, loan: &Loan, as_of: NaiveDate) -> Money {
        loan.total_debt(as_of)
    }

    /// total debt as of the service clock's current date
    pub fn total_debt_today(&self, loan_id: LoanId) -> Result<Money> {
        let loan = self.store.load_loan(loan_id)?;
        Ok(loan.total_debt(self.now().date_naive()))
    }

    /// movements in append order; fails if the loan does not exist
    pub fn list_movements(&self, loan_id: LoanId) -> Result<Vec<Movement>> {
        self.store.load_loan(loan_id)?;
        self.store.list_movements(loan_id)
    }

    pub fn list_loans(&self, filter: &LoanFilter) -> Result<Vec<Loan>> {
        self.store.list_loans(filter)
    }

    /// resolve a borrower's access code to their loan
    pub fn find_by_access_code(&self, code: &str) -> Result<Loan> {
        let code = AccessCode::parse(code)?;
        self.store
            .find_loan_by_access_code(&code)?
            .ok_or_else(|| LoanError::AccessCodeNotFound { code: code.to_string() })
    }

    /// reconcile a loan's cached balance against its ledger
    pub fn audit_loan(&self, loan_id: LoanId) -> Result<LedgerAudit> {
        let loan = self.store.load_loan(loan_id)?;
        let movements = self.store.list_movements(loan_id)?;
        let report = ledger::audit(&loan, &movements);
        if !report.is_consistent() {
            warn!(loan_id = %loan_id, ?report, "ledger disagrees with loan balance");
        }
        Ok(report)
    }

    pub fn portfolio_summary(&self, as_of: NaiveDate) -> Result<PortfolioSummary> {
        let loans = self.store.list_loans(&LoanFilter::active())?;
        let principal_outstanding: Money = loans.iter().map(|l| l.current_capital).sum();
        let interest_accrued: Money = loans
            .iter()
            .map(|l| l.accrued_interest(as_of).interest_amount)
            .sum();

        Ok(PortfolioSummary {
            as_of,
            active_loans: loans.len(),
            principal_outstanding,
            interest_accrued,
            total_to_collect: principal_outstanding + interest_accrued,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Rate;
    use crate::errors::ErrorKind;
    use crate::store::InMemoryStore;
    use crate::types::{InterestPeriod, LoanStatus, Person};
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn setup() -> (LoanService<InMemoryStore>, Person) {
        let store = InMemoryStore::new();
        let person = store.add_person(Person::new("Carlos Ruiz", "79001122")).unwrap();
        let time = SafeTimeProvider::new(TimeSource::Test(Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap()));
        let service = LoanService::new(store, EngineConfig::default()).unwrap().with_time(time);
        (service, person)
    }

    fn terms(person: &Person) -> NewLoan {
        NewLoan {
            person_id: person.id,
            initial_capital: Money::from_major(1_000_000),
            interest_rate: Rate::from_percentage(10),
            interest_period: InterestPeriod::Monthly,
            start_date: date(2024, 1, 1),
            notes: Some("family loan".to_string()),
        }
    }

    #[test]
    fn test_create_loan() {
        let (service, person) = setup();
        let loan = service.create_loan(terms(&person)).unwrap();

        assert_eq!(loan.status, LoanStatus::Active);
        assert_eq!(loan.current_capital, Money::from_major(1_000_000));
        assert_eq!(loan.access_link, format!("https://tuapp.com/loan/{}", loan.id));
        assert_eq!(loan.notes.as_deref(), Some("family loan"));
        assert_eq!(service.find_by_access_code(loan.access_code.as_str()).unwrap().id, loan.id);
        assert!(service.list_movements(loan.id).unwrap().is_empty());
    }

    #[test]
    fn test_create_loan_requires_person() {
        let (service, person) = setup();
        let mut t = terms(&person);
        t.person_id = Uuid::new_v4();
        assert_eq!(service.create_loan(t).unwrap_err().kind(), ErrorKind::NotFound);
        assert!(service.list_loans(&LoanFilter::default()).unwrap().is_empty());
    }

    #[test]
    fn test_create_loan_validates_terms() {
        let (service, person) = setup();
        let mut t = terms(&person);
        t.interest_rate = Rate::ZERO;
        assert_eq!(service.create_loan(t).unwrap_err().kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_payment_flow() {
        let (service, person) = setup();
        let loan = service.create_loan(terms(&person)).unwrap();

        let outcome = service
            .apply_payment(loan.id, Money::from_major(50_000), date(2024, 1, 11))
            .unwrap();

        assert_eq!(outcome.loan.current_capital, Money::from_decimal(dec!(983333.33)));
        assert_eq!(outcome.movements.len(), 2);
        assert!(!outcome.paid_off);
        assert_eq!(service.get_loan(loan.id).unwrap(), outcome.loan);
        assert!(service.audit_loan(loan.id).unwrap().is_consistent());
    }

    #[test]
    fn test_cancel_stops_payments() {
        let (service, person) = setup();
        let loan = service.create_loan(terms(&person)).unwrap();

        let cancelled = service.cancel_loan(loan.id).unwrap();
        assert_eq!(cancelled.status, LoanStatus::Cancelled);
        assert_eq!(service.get_total_debt(&cancelled, date(2024, 6, 1)), Money::from_major(1_000_000));

        let err = service.apply_payment(loan.id, Money::from_major(10), date(2024, 2, 1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert_eq!(service.cancel_loan(loan.id).unwrap_err().kind(), ErrorKind::InvalidState);
        assert!(service.list_movements(loan.id).unwrap().is_empty());
    }

    #[test]
    fn test_total_debt_follows_clock() {
        let store = InMemoryStore::new();
        let person = store.add_person(Person::new("Luisa Mora", "52998877")).unwrap();
        let time = SafeTimeProvider::new(TimeSource::Test(Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap()));
        let control = time.test_control().unwrap();
        let service = LoanService::new(store, EngineConfig::default()).unwrap().with_time(time);
        let loan = service.create_loan(terms(&person)).unwrap();

        assert_eq!(service.total_debt_today(loan.id).unwrap(), Money::from_major(1_000_000));
        control.advance(Duration::days(30));
        assert_eq!(service.total_debt_today(loan.id).unwrap(), Money::from_major(1_100_000));
    }

    #[test]
    fn test_unknown_loan_is_not_found() {
        let (service, _) = setup();
        let id = Uuid::new_v4();
        assert_eq!(service.get_loan(id).unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(service.list_movements(id).unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(
            service.apply_payment(id, Money::from_major(1), date(2024, 1, 1)).unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert_eq!(service.find_by_access_code("AAA-000-AAA").unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(service.find_by_access_code("bogus").unwrap_err().kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_invalid_amount_rejected_before_lookup() {
        let (service, person) = setup();
        let err = service
            .apply_payment(Uuid::new_v4(), Money::from_major(-5), date(2024, 1, 2))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let loan = service.create_loan(terms(&person)).unwrap();
        service.apply_payment(loan.id, Money::from_major(1_000_000), date(2024, 1, 1)).unwrap();
        let err = service.apply_payment(loan.id, Money::ZERO, date(2024, 1, 2)).unwrap_err();
        assert!(matches!(err, LoanError::InvalidPaymentAmount { .. }));
        let err = service
            .apply_payment(loan.id, Money::from_decimal(dec!(1.005)), date(2024, 1, 2))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_lock_table_is_emptied_after_use() {
        let (service, person) = setup();
        for _ in 0..10 {
            let _ = service.apply_payment(Uuid::new_v4(), Money::from_major(1), date(2024, 1, 2));
            let _ = service.cancel_loan(Uuid::new_v4());
        }
        assert_eq!(service.locks.len(), 0);

        let loan = service.create_loan(terms(&person)).unwrap();
        service.apply_payment(loan.id, Money::from_major(10), date(2024, 1, 2)).unwrap();
        service.cancel_loan(loan.id).unwrap();
        assert_eq!(service.locks.len(), 0);
    }

    #[test]
    fn test_portfolio_summary() {
        let (service, person) = setup();
        let first = service.create_loan(terms(&person)).unwrap();
        let mut small = terms(&person);
        small.initial_capital = Money::from_major(36_500);
        small.interest_rate = Rate::from_percentage(12);
        small.interest_period = InterestPeriod::Annual;
        service.create_loan(small).unwrap();
        let third = service.create_loan(terms(&person)).unwrap();
        service.cancel_loan(third.id).unwrap();

        let summary = service.portfolio_summary(date(2024, 1, 11)).unwrap();
        assert_eq!(summary.active_loans, 2);
        assert_eq!(summary.principal_outstanding, Money::from_major(1_036_500));
        assert_eq!(
            summary.interest_accrued,
            Money::from_decimal(dec!(33333.33333333)) + Money::from_major(120)
        );
        assert_eq!(summary.total_to_collect, summary.principal_outstanding + summary.interest_accrued);
        assert!(service.get_loan(first.id).is_ok());
    }
}
