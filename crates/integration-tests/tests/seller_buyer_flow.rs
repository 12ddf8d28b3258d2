//! End-to-end scenario: both sides of the warung sharing one store.
//!
//! The seller curates the catalog in the console while a buyer shops in
//! the storefront; live watches on both collections keep the console
//! current. This is the full loop the two applications run in production,
//! minus rendering.

use chrono::{Duration, Utc};
use warung_console::{
    CatalogStats, OrderDesk, OrderEvent, ProductEvent, ProductForm, ProductManager,
    spawn_order_watch, spawn_product_watch, verify_connection,
};
use warung_core::OrderId;
use warung_integration_tests::{init_tracing, list_orders, memory_store, seed_order, seed_product};
use warung_storefront::{CartLedger, Catalog, Checkout, MemoryStorage};

#[tokio::test]
async fn test_full_loop_from_product_creation_to_completed_order() {
    init_tracing();
    let store = memory_store();
    verify_connection(&store).await.expect("store reachable");

    // --- Seller: create the catalog from raw form input. ----------------
    let manager = ProductManager::new(store.clone());
    let bandeng_id = manager
        .create(
            &ProductForm {
                name: "Bandeng Presto".to_owned(),
                description: "Bandeng duri lunak".to_owned(),
                price: "45000".to_owned(),
                stock: "5".to_owned(),
                image: String::new(),
            }
            .parse()
            .expect("form parses"),
        )
        .await
        .expect("create product");

    let mut product_watch = spawn_product_watch(store.clone()).await.expect("product watch");
    match product_watch.recv().await.expect("initial products") {
        ProductEvent::Updated { products } => {
            assert_eq!(products.len(), 1);
            assert_eq!(
                CatalogStats::from_products(&products),
                CatalogStats {
                    total: 1,
                    out_of_stock: 0
                }
            );
        }
        other => panic!("expected Updated, got {other:?}"),
    }

    let mut order_watch = spawn_order_watch(store.clone()).await.expect("order watch");
    assert_eq!(
        order_watch.recv().await.expect("initial orders"),
        OrderEvent::Updated {
            total: 0,
            pending: 0
        }
    );

    // --- Buyer: browse, fill the cart, check out. ------------------------
    let catalog = Catalog::new(store.clone());
    let available = catalog.available_products().await.expect("catalog");
    let bandeng = available.first().expect("bandeng is on sale").clone();
    assert_eq!(bandeng.id, bandeng_id);

    let mut cart = CartLedger::load(Box::new(MemoryStorage::new())).expect("cart");
    cart.add_or_merge(&bandeng, 2).expect("add to cart");

    let placed = Checkout::new(store.clone())
        .checkout(&mut cart)
        .await
        .expect("checkout");
    assert_eq!(placed.len(), 1);
    assert!(cart.is_empty());

    // --- Console: the purchase shows up live on both watches. ------------
    match product_watch.recv().await.expect("stock change") {
        ProductEvent::Updated { products } => {
            assert_eq!(products.first().expect("bandeng").stock, 3);
        }
        other => panic!("expected Updated, got {other:?}"),
    }

    // The order's creation stamp is "now", well past the session grace
    // window, so the snapshot update is followed by one alert.
    assert_eq!(
        order_watch.recv().await.expect("order update"),
        OrderEvent::Updated {
            total: 1,
            pending: 1
        }
    );
    assert_eq!(
        order_watch.recv().await.expect("order alert"),
        OrderEvent::NewOrders { count: 1 }
    );

    // --- Seller: complete the order; pending drops to zero. --------------
    let order_id = placed.first().expect("receipt").order_id.clone();
    OrderDesk::new(store.clone())
        .complete(&order_id)
        .await
        .expect("complete");

    assert_eq!(
        order_watch.recv().await.expect("completion update"),
        OrderEvent::Updated {
            total: 1,
            pending: 0
        }
    );

    let orders = list_orders(&store).await;
    let doc = orders.first().expect("order doc");
    assert_eq!(*doc.field("status").expect("status"), "completed");
    assert!(doc.field("completedAt").is_some());
}

#[tokio::test]
async fn test_completing_twice_restamps_completed_at() {
    init_tracing();
    let store = memory_store();
    let lumpia = seed_product(&store, "Lumpia", 20000.0, 5).await;
    let order_id = OrderId::new(
        seed_order(
            &store,
            &lumpia,
            1,
            "pending",
            Utc::now() - Duration::minutes(2),
        )
        .await,
    );

    let desk = OrderDesk::new(store.clone());
    desk.complete(&order_id).await.expect("first completion");
    let first_stamp = list_orders(&store)
        .await
        .first()
        .expect("order")
        .field("completedAt")
        .expect("stamp")
        .clone();

    // Completing again succeeds and overwrites the stamp rather than
    // rejecting the call; the desk does not gate on the current status.
    tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    desk.complete(&order_id).await.expect("second completion");

    let orders = list_orders(&store).await;
    let doc = orders.first().expect("order");
    assert_eq!(*doc.field("status").expect("status"), "completed");
    assert_ne!(*doc.field("completedAt").expect("stamp"), first_stamp);
}

#[tokio::test]
async fn test_seller_edits_reach_the_buyer_after_invalidation() {
    init_tracing();
    let store = memory_store();
    let manager = ProductManager::new(store.clone());

    let id = manager
        .create(
            &ProductForm {
                name: "Tahu Bakso".to_owned(),
                description: String::new(),
                price: "12000".to_owned(),
                stock: "8".to_owned(),
                image: String::new(),
            }
            .parse()
            .expect("form parses"),
        )
        .await
        .expect("create");

    let catalog = Catalog::new(store.clone());
    assert_eq!(
        catalog.product(&id).await.expect("product").name,
        "Tahu Bakso"
    );

    // The seller fixes the name and price; the buyer's cached snapshot
    // keeps serving the old data until it is invalidated.
    manager
        .update(
            &id,
            &ProductForm {
                name: "Tahu Bakso Spesial".to_owned(),
                description: String::new(),
                price: "14000".to_owned(),
                stock: "8".to_owned(),
                image: String::new(),
            }
            .parse()
            .expect("form parses"),
        )
        .await
        .expect("update");

    assert_eq!(
        catalog.product(&id).await.expect("cached product").name,
        "Tahu Bakso"
    );
    catalog.invalidate().await;
    assert_eq!(
        catalog.product(&id).await.expect("fresh product").name,
        "Tahu Bakso Spesial"
    );

    // Deleting makes the detail view a not-found for the buyer.
    manager.delete(&id).await.expect("delete");
    catalog.invalidate().await;
    assert!(catalog.product(&id).await.expect_err("gone").is_not_found());
}
