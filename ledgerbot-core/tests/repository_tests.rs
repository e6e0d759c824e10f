// tests/repository_tests.rs
//
// Postgres-backed. Run with `--ignored --test-threads=1` and TEST_DATABASE_URL
// pointing at a disposable database.

use ledgerbot_common::models::{Account, Decision, LotKey, NewCoupon, RequestKind, RequestStatus};
use ledgerbot_common::traits::repository_traits::{AccountRepository, CouponRepository, RequestRepository};
use ledgerbot_core::engine::rules;
use ledgerbot_core::repositories::LedgerRepos;
use ledgerbot_core::test_utils::helpers::setup_test_database;
use ledgerbot_core::Error;

#[tokio::test]
#[ignore]
async fn test_account_repository() -> Result<(), Error> {
    let db = setup_test_database().await?;
    let repos = LedgerRepos::postgres(&db);

    let (acc, created) = repos.accounts.get_or_create_account(10).await?;
    assert!(created);
    assert_eq!(acc.balance, 0);
    let (_, created_again) = repos.accounts.get_or_create_account(10).await?;
    assert!(!created_again);

    let today = chrono::NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
    let claimed = repos
        .accounts
        .update_account(10, &|a: &Account| rules::apply_daily_claim(a, today, 5))
        .await?;
    assert_eq!((claimed.balance, claimed.streak), (5, 1));
    let twice = repos
        .accounts
        .update_account(10, &|a: &Account| rules::apply_daily_claim(a, today, 5))
        .await;
    assert!(matches!(twice, Err(Error::AlreadyClaimed)));

    repos.accounts.get_or_create_account(11).await?;
    assert!(repos.accounts.link_referral(11, 10, 5).await?);
    assert!(!repos.accounts.link_referral(11, 10, 5).await?);
    assert_eq!(repos.accounts.count_referrals(10).await?, 1);
    assert_eq!(repos.accounts.get_account(10).await?.unwrap().balance, 10);

    assert!(matches!(repos.accounts.credit(999, 5).await, Err(Error::UserNotFound(999))));
    assert_eq!(repos.accounts.clear_all_balances().await?, 1);
    Ok(())
}

#[tokio::test]
#[ignore]
async fn test_coupon_purchase_locks_one_unit() -> Result<(), Error> {
    let db = setup_test_database().await?;
    let repos = LedgerRepos::postgres(&db);
    repos.accounts.get_or_create_account(20).await?;
    repos.accounts.credit(20, 100).await?;

    let row = repos
        .coupons
        .insert_coupon(&NewCoupon { name: "VIP".into(), code: "V-1".into(), cost: 50, stock: 1 })
        .await?;
    let lot = LotKey::new("VIP", 50);

    let (sold, buyer) = repos.coupons.purchase(20, &lot).await?;
    assert_eq!(sold.code, "V-1");
    assert_eq!(buyer.balance, 50);
    assert_eq!(repos.coupons.get_coupon(row.coupon_id).await?.unwrap().stock, 0);
    assert!(matches!(repos.coupons.purchase(20, &lot).await, Err(Error::OutOfStock)));
    assert!(matches!(
        repos.coupons.purchase(20, &LotKey::new("None", 1)).await,
        Err(Error::ItemUnavailable)
    ));

    assert_eq!(repos.coupons.set_lot_active(&lot, false).await?, 1);
    assert!(repos.coupons.list_shop().await?.is_empty());
    assert_eq!(repos.coupons.list_groups().await?, vec![lot]);
    assert_eq!(repos.coupons.purge_inactive().await?, 1);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore]
async fn test_last_unit_sold_once_under_row_locks() -> Result<(), Error> {
    let db = setup_test_database().await?;
    let repos = LedgerRepos::postgres(&db);
    for buyer in [40, 41] {
        repos.accounts.get_or_create_account(buyer).await?;
        repos.accounts.credit(buyer, 50).await?;
    }
    let row = repos
        .coupons
        .insert_coupon(&NewCoupon { name: "VIP".into(), code: "LAST".into(), cost: 50, stock: 1 })
        .await?;
    let lot = LotKey::new("VIP", 50);

    let handles: Vec<_> = [40, 41]
        .into_iter()
        .map(|buyer| {
            let coupons = repos.coupons.clone();
            let lot = lot.clone();
            tokio::spawn(async move { coupons.purchase(buyer, &lot).await })
        })
        .collect();
    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.expect("buyer task panicked"));
    }

    let sold: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(sold.len(), 1);
    assert_eq!(sold[0].0.code, "LAST");
    assert_eq!(
        results.iter().filter(|r| matches!(r, Err(Error::OutOfStock))).count(),
        1
    );

    assert_eq!(repos.coupons.get_coupon(row.coupon_id).await?.unwrap().stock, 0);
    let mut remaining = 0;
    for buyer in [40, 41] {
        remaining += repos.accounts.get_account(buyer).await?.unwrap().balance;
    }
    assert_eq!(remaining, 100 - 50);
    Ok(())
}

#[tokio::test]
#[ignore]
async fn test_request_lifecycle() -> Result<(), Error> {
    let db = setup_test_database().await?;
    let repos = LedgerRepos::postgres(&db);
    repos.accounts.get_or_create_account(30).await?;
    repos.accounts.credit(30, 120).await?;

    let w = repos.requests.open_withdrawal(30, &|a: &Account| Ok(a.balance)).await?;
    assert_eq!(w.amount, 120);
    assert_eq!(repos.accounts.get_account(30).await?.unwrap().balance, 0);

    let rejected = repos.requests.resolve_request(RequestKind::Withdrawal, w.request_id, Decision::Reject).await?;
    assert_eq!(rejected.status, RequestStatus::Rejected);
    assert_eq!(repos.accounts.get_account(30).await?.unwrap().balance, 120);
    assert!(matches!(
        repos.requests.resolve_request(RequestKind::Withdrawal, w.request_id, Decision::Approve).await,
        Err(Error::InvalidRequestState { status: Some(RequestStatus::Rejected), .. })
    ));

    let d = repos.requests.create_deposit(30, 40).await?;
    repos.requests.attach_reference(d.request_id, "UTR-000111").await?;
    assert_eq!(repos.requests.list_pending(RequestKind::Deposit, 10).await?.len(), 1);
    repos.requests.resolve_request(RequestKind::Deposit, d.request_id, Decision::Approve).await?;
    assert_eq!(repos.accounts.get_account(30).await?.unwrap().balance, 160);

    let huge = repos.requests.create_deposit(30, i64::MAX).await?;
    assert!(matches!(
        repos.requests.resolve_request(RequestKind::Deposit, huge.request_id, Decision::Approve).await,
        Err(Error::InvalidAmount(_))
    ));
    assert_eq!(repos.accounts.get_account(30).await?.unwrap().balance, 160);
    assert!(matches!(repos.accounts.credit(30, i64::MAX).await, Err(Error::InvalidAmount(_))));
    Ok(())
}
