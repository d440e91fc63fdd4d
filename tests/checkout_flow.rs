//! End-to-end storefront flows over the in-memory adapters: admin seeds the
//! catalog, a shopper signs in, fills a cart and checks out.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;

use florest_storefront::adapters::memory::{MemoryNotifier, MemoryStore, MemoryUploader};
use florest_storefront::admin::{AdminService, ProductInput};
use florest_storefront::cart_store::CartStore;
use florest_storefront::catalog::Catalog;
use florest_storefront::checkout::{
    fetch_order, orders_for, CheckoutForm, CheckoutOrchestrator, CheckoutState,
};
use florest_storefront::config::PricingConfig;
use florest_storefront::domain::catalog::{CategoryRef, CollectionRef};
use florest_storefront::domain::order::{CheckoutMethod, ContactInfo, PickupInfo, ShippingAddress};
use florest_storefront::ports::UserIdentity;
use florest_storefront::StorefrontError;

fn product_input(title: &str, price: i64, discount: Option<i64>) -> ProductInput {
    ProductInput {
        title: title.into(),
        description: String::new(),
        images: vec![],
        base_price: Decimal::from(price),
        discount_percent: discount.map(Decimal::from),
        tags: vec![],
        colors: vec![],
        category: CategoryRef { id: "c1".into(), name: "Hampers".into() },
        collection: CollectionRef { id: "col1".into(), name: "Featured".into() },
        sub_categories: vec![],
    }
}

fn shopper() -> UserIdentity {
    UserIdentity {
        id: "shopper-1".into(),
        email: "shopper@example.com".into(),
        display_name: Some("Priya".into()),
    }
}

fn cod_form() -> CheckoutForm {
    CheckoutForm {
        method: CheckoutMethod::CashOnDelivery,
        contact: ContactInfo {
            full_name: "Priya Sharma".into(),
            email: "shopper@example.com".into(),
            phone: "9998887776".into(),
        },
        shipping: Some(ShippingAddress {
            address: "12 Kanke Road".into(),
            city: "Ranchi".into(),
            postal_code: "834008".into(),
            country: "India".into(),
        }),
        pickup: None,
    }
}

#[tokio::test]
async fn admin_seeds_catalog_then_shopper_checks_out() {
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(MemoryNotifier::new());
    let admin = AdminService::new(store.clone(), Arc::new(MemoryUploader::new()));

    let hamper = admin.create_product(product_input("Rose Hamper", 60, Some(10))).await.unwrap();
    let candle = admin.create_product(product_input("Candle Set", 25, None)).await.unwrap();
    let catalog = Catalog::load(store.as_ref()).await;
    assert_eq!(catalog.products.len(), 2);

    let mut cart = CartStore::new(store.clone());
    cart.identity_changed(Some(shopper()), &catalog).await;
    cart.add_to_cart(catalog.product(&hamper).unwrap().clone()).await;
    cart.add_to_cart(catalog.product(&hamper).unwrap().clone()).await;
    cart.add_to_cart(catalog.product(&candle).unwrap().clone()).await;
    assert_eq!(cart.cart_count(), 3);

    let mut orchestrator =
        CheckoutOrchestrator::new(store.clone(), notifier.clone(), PricingConfig::default());
    let outcome = orchestrator.submit(&mut cart, cod_form()).await.unwrap();

    // 2 * 54 (10% off 60) + 25 = 133: above the free-shipping threshold.
    assert_eq!(outcome.order.subtotal, Decimal::from(133));
    assert_eq!(outcome.order.shipping_fee, Decimal::ZERO);
    assert_eq!(outcome.order.cod_fee, Decimal::from(5));
    assert_eq!(
        outcome.order.total,
        outcome.order.subtotal + outcome.order.shipping_fee + outcome.order.tax + outcome.order.cod_fee
    );
    assert!(outcome.email_sent);
    assert!(cart.cart().is_empty());
    assert_eq!(orchestrator.state(), CheckoutState::Complete);

    // Confirmation went to the purchaser with the persisted id.
    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].recipient, "shopper@example.com");
    assert_eq!(sent[0].customer_name, "Priya");

    // The order is readable by id and in the shopper's history.
    let persisted = fetch_order(store.as_ref(), &outcome.order.id).await.unwrap().unwrap();
    assert_eq!(persisted.items.len(), 2);
    let history = orders_for(store.as_ref(), "shopper@example.com").await.unwrap();
    assert_eq!(history.len(), 1);
}

#[tokio::test]
async fn cart_survives_failed_persist_and_retries() {
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(MemoryNotifier::new());
    let admin = AdminService::new(store.clone(), Arc::new(MemoryUploader::new()));
    let id = admin.create_product(product_input("Candle Set", 25, None)).await.unwrap();
    let catalog = Catalog::load(store.as_ref()).await;

    let mut cart = CartStore::new(store.clone());
    cart.identity_changed(Some(shopper()), &catalog).await;
    cart.add_to_cart(catalog.product(&id).unwrap().clone()).await;

    let mut orchestrator =
        CheckoutOrchestrator::new(store.clone(), notifier.clone(), PricingConfig::default());
    store.fail_writes(true);
    let err = orchestrator.submit(&mut cart, cod_form()).await.unwrap_err();
    assert!(matches!(err, StorefrontError::StoreWrite(_)));
    assert_eq!(cart.cart_count(), 1);
    assert!(notifier.sent().is_empty());

    store.fail_writes(false);
    let outcome = orchestrator.submit(&mut cart, cod_form()).await.unwrap();
    assert!(cart.cart().is_empty());
    assert_eq!(notifier.sent().len(), 1);
    assert_eq!(notifier.sent()[0].order_id, outcome.order.id);
}

#[tokio::test]
async fn pickup_order_with_degraded_confirmation() {
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(MemoryNotifier::new());
    notifier.fail(true);
    let admin = AdminService::new(store.clone(), Arc::new(MemoryUploader::new()));
    let id = admin.create_product(product_input("Rose Hamper", 50, Some(20))).await.unwrap();
    let catalog = Catalog::load(store.as_ref()).await;

    let mut cart = CartStore::new(store.clone());
    cart.identity_changed(Some(shopper()), &catalog).await;
    cart.add_to_cart(catalog.product(&id).unwrap().clone()).await;

    let form = CheckoutForm {
        method: CheckoutMethod::StorePickup,
        contact: cod_form().contact,
        shipping: None,
        pickup: Some(PickupInfo {
            store_location: catalog.store_locations[0].id.clone(),
            pickup_date: Utc::now().date_naive(),
        }),
    };

    let mut orchestrator =
        CheckoutOrchestrator::new(store.clone(), notifier, PricingConfig::default());
    let outcome = orchestrator.submit(&mut cart, form).await.unwrap();

    // Order stands even though the email failed, and the cart is gone.
    assert!(!outcome.email_sent);
    assert!(cart.cart().is_empty());
    assert_eq!(outcome.order.subtotal, Decimal::from(40));
    assert_eq!(outcome.order.total, Decimal::new(4320, 2));
    assert!(fetch_order(store.as_ref(), &outcome.order.id).await.unwrap().is_some());
}

#[tokio::test]
async fn favorites_follow_the_user_across_sessions() {
    let store = Arc::new(MemoryStore::new());
    let admin = AdminService::new(store.clone(), Arc::new(MemoryUploader::new()));
    let id = admin.create_product(product_input("Rose Hamper", 60, None)).await.unwrap();
    let catalog = Catalog::load(store.as_ref()).await;

    let mut first = CartStore::new(store.clone());
    first.identity_changed(Some(shopper()), &catalog).await;
    first.add_to_favorites(catalog.product(&id).unwrap().clone()).await.unwrap();

    // A fresh session for the same user sees the favorite after sign-in.
    let mut second = CartStore::new(store.clone());
    assert_eq!(second.favorites_count(), 0);
    second.identity_changed(Some(shopper()), &catalog).await;
    assert_eq!(second.favorites_count(), 1);
    assert!(second.favorites().contains(&id));
}

#[tokio::test]
async fn anonymous_cart_merges_into_account_on_sign_in() {
    let store = Arc::new(MemoryStore::new());
    let admin = AdminService::new(store.clone(), Arc::new(MemoryUploader::new()));
    let id = admin.create_product(product_input("Candle Set", 25, None)).await.unwrap();
    let catalog = Catalog::load(store.as_ref()).await;

    let mut cart = CartStore::new(store.clone());
    cart.add_to_cart(catalog.product(&id).unwrap().clone()).await;
    cart.identity_changed(Some(shopper()), &catalog).await;
    assert_eq!(cart.cart_count(), 1);

    // The merged cart was mirrored; a later session starts from it.
    let mut later = CartStore::new(store);
    later.identity_changed(Some(shopper()), &catalog).await;
    assert_eq!(later.cart_count(), 1);
}
