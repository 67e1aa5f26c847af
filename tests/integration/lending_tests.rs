//! Lending rules against a real database
//!
//! Needs `DATABASE_URL` pointing at a disposable Postgres database.
//! Run with: cargo test --test lending_tests -- --ignored

use std::sync::atomic::{AtomicU64, Ordering};

use lending_server::{
    config::LendingConfig,
    models::{
        item::{CatalogItem, CreateItem},
        loan::LendingRecord,
        penalty::CreatePayment,
        user::{AccountType, User, UserClaims},
    },
    repository::Repository,
    services::{users::hash_password, Services},
    AppError,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sqlx::postgres::PgPoolOptions;

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

struct Fixture {
    repository: Repository,
    services: Services,
    admin: User,
}

fn unique(prefix: &str) -> String {
    let n = SEQUENCE.fetch_add(1, Ordering::SeqCst);
    let ts = chrono::Utc::now().timestamp_micros();
    format!("{}{}x{}", prefix, ts, n)
}

fn claims(user: &User) -> UserClaims {
    let now = chrono::Utc::now().timestamp();
    UserClaims {
        sub: user.username.clone(),
        user_id: user.id,
        account_type: user.account_type,
        exp: now + 3600,
        iat: now,
    }
}

async fn setup() -> Fixture {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests");

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .connect(&database_url)
        .await
        .expect("Failed to connect to DB");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    let repository = Repository::new(pool);
    let services = Services::new(
        repository.clone(),
        Default::default(),
        LendingConfig::default(),
    );

    let admin = create_user(&repository, AccountType::Administrator).await;
    Fixture {
        repository,
        services,
        admin,
    }
}

async fn create_user(repository: &Repository, account_type: AccountType) -> User {
    let username = unique("user");
    let hash = hash_password("secret-password").expect("hash");
    repository
        .users
        .create(&username, &format!("{}@example.com", username), &hash, account_type)
        .await
        .expect("Failed to create user")
}

async fn reader(fixture: &Fixture) -> User {
    create_user(&fixture.repository, AccountType::Regular).await
}

async fn item(fixture: &Fixture, total_stock: i32) -> CatalogItem {
    fixture
        .services
        .catalog
        .create_item(
            CreateItem {
                name: unique("title"),
                writer: "Octavia E. Butler".to_string(),
                identifier: None,
                total_stock,
            },
            fixture.admin.id,
        )
        .await
        .expect("Failed to create item")
}

async fn borrow(fixture: &Fixture, borrower: &User, item: &CatalogItem) -> Result<LendingRecord, AppError> {
    fixture.services.loans.create_loan(borrower.id, item.id).await
}

async fn make_overdue(fixture: &Fixture, record: &LendingRecord, days: i32) {
    sqlx::query(
        "UPDATE lending_records SET due_date = NOW() - make_interval(days => $2) WHERE id = $1",
    )
    .bind(record.id)
    .bind(days)
    .execute(&fixture.repository.pool)
    .await
    .expect("Failed to move due date");
}

#[tokio::test]
#[ignore]
async fn test_single_copy_changes_hands_after_return() {
    let fixture = setup().await;
    let first = reader(&fixture).await;
    let second = reader(&fixture).await;
    let book = item(&fixture, 1).await;

    let record = borrow(&fixture, &first, &book).await.expect("first borrow");
    assert_eq!(record.borrower_id, first.id);
    assert!(!record.is_returned);
    assert_eq!(record.due_date - record.date_borrowed, chrono::Duration::days(14));

    let err = borrow(&fixture, &second, &book).await.unwrap_err();
    assert!(matches!(err, AppError::ItemUnavailable(_)));

    fixture
        .services
        .loans
        .return_loan(&claims(&first), record.id, Decimal::ZERO)
        .await
        .expect("return");

    borrow(&fixture, &second, &book).await.expect("second borrow");

    let stored = fixture.services.catalog.get_item(book.id).await.unwrap();
    assert_eq!(stored.available_stock, 0);
}

#[tokio::test]
#[ignore]
async fn test_borrowing_limit_holds_under_concurrency() {
    let fixture = setup().await;
    let borrower = reader(&fixture).await;

    let mut books = Vec::new();
    for _ in 0..8 {
        books.push(item(&fixture, 1).await);
    }

    let handles: Vec<_> = books
        .iter()
        .map(|book| {
            let loans = fixture.services.loans.clone();
            let (borrower_id, item_id) = (borrower.id, book.id);
            tokio::spawn(async move { loans.create_loan(borrower_id, item_id).await })
        })
        .collect();

    let mut granted = 0;
    let mut refused = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => granted += 1,
            Err(AppError::BorrowingLimitReached(active)) => {
                assert_eq!(active, 5);
                refused += 1;
            }
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(granted, 5);
    assert_eq!(refused, 3);
}

#[tokio::test]
#[ignore]
async fn test_stock_never_goes_negative() {
    let fixture = setup().await;
    let book = item(&fixture, 3).await;

    let mut handles = Vec::new();
    for _ in 0..6 {
        let borrower = reader(&fixture).await;
        let loans = fixture.services.loans.clone();
        let item_id = book.id;
        handles.push(tokio::spawn(async move { loans.create_loan(borrower.id, item_id).await }));
    }

    let mut granted = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => granted += 1,
            Err(err) => assert!(matches!(err, AppError::ItemUnavailable(_))),
        }
    }

    assert_eq!(granted, 3);
    let stored = fixture.services.catalog.get_item(book.id).await.unwrap();
    assert_eq!(stored.available_stock, 0);
}

#[tokio::test]
#[ignore]
async fn test_record_is_returned_once() {
    let fixture = setup().await;
    let borrower = reader(&fixture).await;
    let book = item(&fixture, 2).await;
    let record = borrow(&fixture, &borrower, &book).await.unwrap();

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let loans = fixture.services.loans.clone();
            let actor = claims(&borrower);
            let id = record.id;
            tokio::spawn(async move { loans.return_loan(&actor, id, Decimal::ZERO).await })
        })
        .collect();

    let mut returned = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => returned += 1,
            Err(err) => assert!(matches!(err, AppError::AlreadyReturned(id) if id == record.id)),
        }
    }
    assert_eq!(returned, 1);

    let stored = fixture.services.catalog.get_item(book.id).await.unwrap();
    assert_eq!(stored.available_stock, 2);
}

#[tokio::test]
#[ignore]
async fn test_only_borrower_can_return() {
    let fixture = setup().await;
    let borrower = reader(&fixture).await;
    let other = reader(&fixture).await;
    let book = item(&fixture, 1).await;
    let record = borrow(&fixture, &borrower, &book).await.unwrap();

    let err = fixture
        .services
        .loans
        .return_loan(&claims(&other), record.id, Decimal::ZERO)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Authorization(_)));

    // Not visible to other readers either
    let err = fixture
        .services
        .loans
        .get_loan(&claims(&other), record.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
#[ignore]
async fn test_payment_requires_return() {
    let fixture = setup().await;
    let borrower = reader(&fixture).await;
    let book = item(&fixture, 1).await;
    let record = borrow(&fixture, &borrower, &book).await.unwrap();

    let err = fixture
        .services
        .penalties
        .record_payment(
            &claims(&borrower),
            CreatePayment {
                lending_record: record.id,
                penalty: None,
                amount_settled: dec!(5),
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::NotReturned(id) if id == record.id));
}

async fn promote_to_administrator(fixture: &Fixture, user: &User) {
    fixture
        .repository
        .users
        .update(user.id, None, None, None, Some(AccountType::Administrator))
        .await
        .expect("Failed to change account type");
}

#[tokio::test]
#[ignore]
async fn test_stale_token_cannot_return_after_role_change() {
    let fixture = setup().await;
    let borrower = reader(&fixture).await;
    let stale = claims(&borrower);
    let book = item(&fixture, 1).await;
    let record = borrow(&fixture, &borrower, &book).await.unwrap();

    promote_to_administrator(&fixture, &borrower).await;

    let err = fixture
        .services
        .loans
        .return_loan(&stale, record.id, Decimal::ZERO)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Authorization(_)));

    let loan = fixture.services.loans.get_loan(&stale, record.id).await.unwrap();
    assert!(!loan.is_returned);
    let unchanged = fixture.services.catalog.get_item(book.id).await.unwrap();
    assert_eq!(unchanged.available_stock, 0);
}

#[tokio::test]
#[ignore]
async fn test_stale_token_cannot_pay_after_role_change() {
    let fixture = setup().await;
    let borrower = reader(&fixture).await;
    let stale = claims(&borrower);
    let book = item(&fixture, 1).await;
    let record = borrow(&fixture, &borrower, &book).await.unwrap();
    fixture
        .services
        .loans
        .return_loan(&stale, record.id, Decimal::ZERO)
        .await
        .unwrap();

    promote_to_administrator(&fixture, &borrower).await;

    let err = fixture
        .services
        .penalties
        .record_payment(
            &stale,
            CreatePayment {
                lending_record: record.id,
                penalty: None,
                amount_settled: dec!(5),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Authorization(_)));
}

#[tokio::test]
#[ignore]
async fn test_late_return_raises_penalty_settled_once() {
    let fixture = setup().await;
    let borrower = reader(&fixture).await;
    let actor = claims(&borrower);
    let book = item(&fixture, 1).await;
    let record = borrow(&fixture, &borrower, &book).await.unwrap();
    make_overdue(&fixture, &record, 10).await;

    let owed = fixture
        .services
        .penalties
        .current_penalty(&actor, record.id)
        .await
        .unwrap();
    assert_eq!(owed, dec!(50));

    let details = fixture
        .services
        .loans
        .return_loan(&actor, record.id, Decimal::ZERO)
        .await
        .unwrap();
    assert_eq!(details.penalty, dec!(50));

    let penalties = fixture.services.penalties.list_penalties(&actor).await.unwrap();
    assert_eq!(penalties.len(), 1);
    let penalty = &penalties[0];
    assert_eq!(penalty.lending_record_id, record.id);
    assert_eq!(penalty.amount, dec!(50));
    assert!(!penalty.is_paid);

    for _ in 0..2 {
        fixture
            .services
            .penalties
            .record_payment(
                &actor,
                CreatePayment {
                    lending_record: record.id,
                    penalty: Some(penalty.id),
                    amount_settled: dec!(50),
                },
            )
            .await
            .unwrap();
    }

    let settled = fixture
        .services
        .penalties
        .get_penalty(&actor, penalty.id)
        .await
        .unwrap();
    assert!(settled.is_paid);
    assert_eq!(settled.amount, dec!(50));

    let payments = fixture.services.penalties.list_payments(&actor).await.unwrap();
    assert_eq!(payments.len(), 2);
}

#[tokio::test]
#[ignore]
async fn test_on_time_return_raises_no_penalty() {
    let fixture = setup().await;
    let borrower = reader(&fixture).await;
    let actor = claims(&borrower);
    let book = item(&fixture, 1).await;
    let record = borrow(&fixture, &borrower, &book).await.unwrap();
    assert!(!record.is_overdue(chrono::Utc::now()));

    let owed = fixture
        .services
        .penalties
        .current_penalty(&actor, record.id)
        .await
        .unwrap();
    assert_eq!(owed, Decimal::ZERO);

    let details = fixture
        .services
        .loans
        .return_loan(&actor, record.id, Decimal::ZERO)
        .await
        .unwrap();

    assert_eq!(details.penalty, Decimal::ZERO);
    assert!(fixture
        .services
        .penalties
        .list_penalties(&actor)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
#[ignore]
async fn test_item_on_loan_cannot_be_deleted() {
    let fixture = setup().await;
    let borrower = reader(&fixture).await;
    let book = item(&fixture, 1).await;
    borrow(&fixture, &borrower, &book).await.unwrap();

    let err = fixture.services.catalog.delete_item(book.id).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let err = fixture.services.users.delete_user(borrower.id).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

#[tokio::test]
#[ignore]
async fn test_user_without_loans_is_deleted() {
    let fixture = setup().await;
    let user = reader(&fixture).await;

    fixture.services.users.delete_user(user.id).await.unwrap();

    let err = fixture.services.users.get_by_id(user.id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
#[ignore]
async fn test_blank_identifiers_do_not_conflict() {
    let fixture = setup().await;

    for _ in 0..2 {
        let created = fixture
            .services
            .catalog
            .create_item(
                CreateItem {
                    name: unique("title"),
                    writer: "Ursula K. Le Guin".to_string(),
                    identifier: Some(String::new()),
                    total_stock: 1,
                },
                fixture.admin.id,
            )
            .await
            .expect("blank identifier accepted");
        assert_eq!(created.identifier, None);
    }
}
