use chrono::NaiveDate;
use loan_ledger_rs::{
    AccessCode, AccessCodeIssuer, EngineConfig, InMemoryStore, InterestPeriod, LoanFilter, LoanService, Money,
    NewLoan, Person, Rate,
};
use std::collections::HashSet;
use std::sync::Arc;

fn terms(person: &Person) -> NewLoan {
    NewLoan {
        person_id: person.id,
        initial_capital: Money::from_major(250_000),
        interest_rate: Rate::from_percentage(3),
        interest_period: InterestPeriod::Monthly,
        start_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
        notes: None,
    }
}

#[test]
fn ten_thousand_loans_get_distinct_codes() {
    let store = InMemoryStore::new();
    let person = store.add_person(Person::new("Ana Gómez", "1019283746")).unwrap();
    let service = LoanService::new(store, EngineConfig::default()).unwrap();

    let mut codes = HashSet::new();
    for _ in 0..10_000 {
        let loan = service.create_loan(terms(&person)).unwrap();
        assert!(AccessCode::parse(loan.access_code.as_str()).is_ok());
        assert!(codes.insert(loan.access_code));
    }

    assert_eq!(service.list_loans(&LoanFilter::default()).unwrap().len(), 10_000);
}

#[test]
fn services_sharing_a_store_never_reuse_a_code() {
    let store = Arc::new(InMemoryStore::new());
    let person = store.add_person(Person::new("Ana Gómez", "1019283746")).unwrap();

    // identical seeds make both issuers propose the same sequence of codes
    let first = LoanService::new(Arc::clone(&store), EngineConfig::default())
        .unwrap()
        .with_issuer(AccessCodeIssuer::with_seed(42, 64));
    let second = LoanService::new(Arc::clone(&store), EngineConfig::default())
        .unwrap()
        .with_issuer(AccessCodeIssuer::with_seed(42, 64));

    let mut codes = HashSet::new();
    for _ in 0..200 {
        let a = first.create_loan(terms(&person)).unwrap();
        let b = second.create_loan(terms(&person)).unwrap();
        assert!(codes.insert(a.access_code));
        assert!(codes.insert(b.access_code));
    }

    for code in &codes {
        let loan = first.find_by_access_code(code.as_str()).unwrap();
        assert_eq!(&loan.access_code, code);
    }
}

#[test]
fn access_link_embeds_loan_id() {
    let store = InMemoryStore::new();
    let person = store.add_person(Person::new("Ana Gómez", "1019283746")).unwrap();
    let config = EngineConfig::default().with_access_link_base("https://prestamos.example/l/");
    let service = LoanService::new(store, config).unwrap();

    let loan = service.create_loan(terms(&person)).unwrap();
    assert_eq!(loan.access_link, format!("https://prestamos.example/l/{}", loan.id));
}
