// tests/purchase_tests.rs

mod test_utils;

use std::sync::Arc;
use ledgerbot_common::models::{LotKey, NewCoupon};
use ledgerbot_common::traits::repository_traits::{AccountRepository, CouponRepository};
use ledgerbot_core::services::InventoryOp;
use ledgerbot_core::Error;
use test_utils::*;

async fn add_coupon(h: &Harness, name: &str, code: &str, cost: i64, stock: i32) {
    h.bot
        .handle_admin_inventory_op(
            ADMIN,
            InventoryOp::AddSingle(NewCoupon { name: name.into(), code: code.into(), cost, stock }),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_vip_lot_sells_its_only_unit() -> Result<(), Error> {
    let h = harness();
    add_coupon(&h, "VIP", "VIP-0001", 50, 1).await;
    h.seed(500, 50, 0).await;
    h.seed(501, 80, 0).await;

    let bought = h.bot.handle_purchase(500, "VIP", 50).await?;
    assert_eq!(bought.code, "VIP-0001");
    assert_eq!(bought.balance, 0);
    assert_eq!(h.balance(500).await, 0);

    let second = h.bot.handle_purchase(501, "VIP", 50).await;
    assert!(matches!(second, Err(Error::OutOfStock)));
    assert_eq!(h.balance(501).await, 80);

    let shop = h.bot.handle_shop_list().await?;
    assert_eq!(shop.len(), 1);
    assert!(!shop[0].in_stock);
    assert!(shop[0].token.is_none());
    Ok(())
}

#[tokio::test]
async fn test_funds_checked_before_stock() -> Result<(), Error> {
    let h = harness();
    add_coupon(&h, "VIP", "VIP-0001", 50, 0).await;
    h.seed(502, 10, 0).await;
    match h.bot.handle_purchase(502, "VIP", 50).await {
        Err(Error::InsufficientFunds { needed, available }) => assert_eq!((needed, available), (50, 10)),
        other => panic!("expected InsufficientFunds, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_unknown_lot_is_unavailable() -> Result<(), Error> {
    let h = harness();
    h.seed(503, 100, 0).await;
    assert!(matches!(h.bot.handle_purchase(503, "Nope", 10).await, Err(Error::ItemUnavailable)));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_buyers_of_last_unit() -> Result<(), Error> {
    let h = harness();
    add_coupon(&h, "Solo", "ONLY-ONE", 30, 1).await;
    h.seed(600, 30, 0).await;
    h.seed(601, 30, 0).await;
    let store = h.store.clone();
    let bot = Arc::new(h.bot);

    let a = tokio::spawn({
        let bot = bot.clone();
        async move { bot.handle_purchase(600, "Solo", 30).await }
    });
    let b = tokio::spawn({
        let bot = bot.clone();
        async move { bot.handle_purchase(601, "Solo", 30).await }
    });
    let results = [a.await.unwrap(), b.await.unwrap()];

    let sold: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(sold.len(), 1);
    assert_eq!(sold[0].code, "ONLY-ONE");
    assert_eq!(
        results.iter().filter(|r| matches!(r, Err(Error::OutOfStock))).count(),
        1
    );

    let a_left = store.get_account(600).await?.unwrap().balance;
    let b_left = store.get_account(601).await?.unwrap().balance;
    assert_eq!(a_left + b_left, 30);
    assert_eq!(store.get_coupon(1).await?.unwrap().stock, 0);
    Ok(())
}

#[tokio::test]
async fn test_purchase_by_shop_token() -> Result<(), Error> {
    let h = harness();
    add_coupon(&h, "Gift", "G-1", 20, 1).await;
    add_coupon(&h, "Gift", "G-2", 20, 1).await;
    h.seed(700, 100, 0).await;

    let shop = h.bot.handle_shop_list().await?;
    assert_eq!(shop[0].total_stock, 2);
    let token = shop[0].token.clone().expect("in-stock lot has a token");

    let first = h.bot.handle_purchase_token(700, &token).await?;
    let second = h.bot.handle_purchase_token(700, &token).await?;
    assert_ne!(first.code, second.code);
    assert_eq!(second.balance, 60);

    assert!(matches!(
        h.bot.handle_purchase_token(700, "made-up").await,
        Err(Error::ItemUnavailable)
    ));
    Ok(())
}

#[tokio::test]
async fn test_deactivated_lot_cannot_be_bought_by_stale_token() -> Result<(), Error> {
    let h = harness();
    add_coupon(&h, "Gift", "G-1", 20, 1).await;
    h.seed(701, 100, 0).await;
    let token = h.bot.handle_shop_list().await?[0].token.clone().unwrap();

    h.bot
        .handle_admin_inventory_op(
            ADMIN,
            InventoryOp::SetLotActive { lot: LotKey::new("Gift", 20), active: false },
        )
        .await?;

    assert!(h.bot.handle_shop_list().await?.is_empty());
    assert!(matches!(
        h.bot.handle_purchase_token(701, &token).await,
        Err(Error::ItemUnavailable)
    ));
    assert_eq!(h.balance(701).await, 100);
    Ok(())
}

#[tokio::test]
async fn test_multi_stock_coupon_hands_out_same_code() -> Result<(), Error> {
    let h = harness();
    add_coupon(&h, "Promo", "SAME", 10, 2).await;
    h.seed(702, 100, 0).await;
    assert_eq!(h.bot.handle_purchase(702, "Promo", 10).await?.code, "SAME");
    assert_eq!(h.bot.handle_purchase(702, "Promo", 10).await?.code, "SAME");
    assert!(matches!(h.bot.handle_purchase(702, "Promo", 10).await, Err(Error::OutOfStock)));
    assert_eq!(h.balance(702).await, 80);
    Ok(())
}
