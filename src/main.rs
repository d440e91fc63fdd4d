//! Florest Storefront - self-hosted storefront service.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::postgres::PgPoolOptions;
use tokio::sync::{Mutex, RwLock};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use florest_storefront::adapters::http::{HttpImageUploader, HttpNotifier};
use florest_storefront::adapters::pg::PgDocumentStore;
use florest_storefront::admin::{AdminService, CarouselInput, CategoryInput, ProductInput};
use florest_storefront::cart_store::{CartStore, SyncStatus};
use florest_storefront::catalog::Catalog;
use florest_storefront::checkout::{
    errors_by_field, fetch_order, orders_for, CheckoutForm, CheckoutOrchestrator,
};
use florest_storefront::config::PricingConfig;
use florest_storefront::domain::cart::CartItem;
use florest_storefront::domain::order::CheckoutMethod;
use florest_storefront::ports::{DocumentStore, ImageUploader, Notifier, UserIdentity};
use florest_storefront::pricing::{subtotal, Totals};
use florest_storefront::StorefrontError;

struct Session {
    cart: CartStore,
    checkout: CheckoutOrchestrator,
}

type Sessions = Arc<Mutex<HashMap<String, Session>>>;

#[derive(Clone)]
struct AppState {
    store: Arc<dyn DocumentStore>,
    catalog: Arc<RwLock<Catalog>>,
    sessions: Sessions,
    admin: Arc<AdminService>,
    notifier: Arc<dyn Notifier>,
    pricing: PricingConfig,
    nats: Option<async_nats::Client>,
}

impl AppState {
    fn new_session(&self) -> Session {
        Session {
            cart: CartStore::new(self.store.clone()),
            checkout: CheckoutOrchestrator::new(
                self.store.clone(),
                self.notifier.clone(),
                self.pricing.clone(),
            ),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let db = PgPoolOptions::new()
        .max_connections(10)
        .connect(&std::env::var("DATABASE_URL")?)
        .await?;
    sqlx::migrate!("./migrations").run(&db).await?;
    let store: Arc<dyn DocumentStore> = Arc::new(PgDocumentStore::new(db));

    let notifier: Arc<dyn Notifier> = match std::env::var("MAIL_ENDPOINT") {
        Ok(endpoint) => Arc::new(HttpNotifier::new(endpoint)),
        Err(_) => {
            warn!("MAIL_ENDPOINT unset, order confirmations will only be logged");
            Arc::new(LogNotifier)
        }
    };
    let uploader: Arc<dyn ImageUploader> =
        match (std::env::var("IMAGE_API_URL"), std::env::var("IMAGE_API_KEY")) {
            (Ok(url), Ok(key)) => Arc::new(HttpImageUploader::new(url, key)),
            _ => {
                warn!("IMAGE_API_URL/IMAGE_API_KEY unset, image uploads disabled");
                Arc::new(UnconfiguredUploader)
            }
        };
    let nats = match std::env::var("NATS_URL") {
        Ok(url) => async_nats::connect(&url).await.ok(),
        Err(_) => None,
    };

    let catalog = Catalog::load(store.as_ref()).await;
    info!(products = catalog.products.len(), "catalog snapshot loaded");

    let state = AppState {
        admin: Arc::new(AdminService::new(store.clone(), uploader)),
        catalog: Arc::new(RwLock::new(catalog)),
        sessions: Arc::new(Mutex::new(HashMap::new())),
        notifier,
        pricing: PricingConfig::from_env(),
        nats,
        store,
    };

    let app = Router::new()
        .route("/health", get(|| async { Json(json!({"status": "healthy", "service": "florest-storefront"})) }))
        .route("/api/v1/catalog", get(get_catalog))
        .route("/api/v1/catalog/refresh", post(refresh_catalog))
        .route("/api/v1/store-locations", get(store_locations))
        .route("/api/v1/products", post(create_product))
        .route("/api/v1/products/:id", put(update_product).delete(delete_product))
        .route("/api/v1/categories", post(create_category))
        .route("/api/v1/categories/:id", delete(delete_category))
        .route("/api/v1/carousel", post(add_carousel_item))
        .route("/api/v1/carousel/:id", delete(delete_carousel_item))
        .route("/api/v1/uploads", post(upload_image))
        .route("/api/v1/sessions/:sid/sign-in", post(sign_in))
        .route("/api/v1/sessions/:sid/sign-out", post(sign_out))
        .route("/api/v1/sessions/:sid/cart", get(get_cart).post(add_cart_item).delete(clear_cart))
        .route("/api/v1/sessions/:sid/cart/:pid", put(set_cart_quantity).delete(remove_cart_item))
        .route("/api/v1/sessions/:sid/favorites", get(get_favorites).post(add_favorite))
        .route("/api/v1/sessions/:sid/favorites/:pid", delete(remove_favorite))
        .route("/api/v1/sessions/:sid/quote", get(quote))
        .route("/api/v1/sessions/:sid/checkout", post(checkout))
        .route("/api/v1/orders", get(list_orders))
        .route("/api/v1/orders/:id", get(get_order))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let port = std::env::var("PORT").unwrap_or_else(|_| "8084".to_string());
    info!("florest-storefront listening on 0.0.0.0:{}", port);
    axum::serve(tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?, app).await?;
    Ok(())
}

// =============================================================================
// Error mapping
// =============================================================================

enum ApiError {
    Storefront(StorefrontError),
    NotFound(&'static str),
}

impl From<StorefrontError> for ApiError {
    fn from(e: StorefrontError) -> Self {
        Self::Storefront(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::NotFound(what) => {
                (StatusCode::NOT_FOUND, json!({"error": format!("{what} not found")}))
            }
            ApiError::Storefront(StorefrontError::Validation(errors)) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({"error": "validation failed", "fields": errors_by_field(&errors)}),
            ),
            ApiError::Storefront(StorefrontError::Unauthenticated) => {
                (StatusCode::UNAUTHORIZED, json!({"error": "sign-in required"}))
            }
            ApiError::Storefront(StorefrontError::CheckoutInFlight) => (
                StatusCode::CONFLICT,
                json!({"error": "a checkout attempt is already in progress"}),
            ),
            ApiError::Storefront(e @ StorefrontError::InvalidDiscountFormat(_)) => {
                (StatusCode::UNPROCESSABLE_ENTITY, json!({"error": e.to_string()}))
            }
            ApiError::Storefront(e) => (StatusCode::BAD_GATEWAY, json!({"error": e.to_string()})),
        };
        (status, Json(body)).into_response()
    }
}

// =============================================================================
// Catalog & admin handlers
// =============================================================================

async fn get_catalog(State(s): State<AppState>) -> Json<Catalog> {
    Json(s.catalog.read().await.clone())
}

async fn refresh_catalog(State(s): State<AppState>) -> Json<serde_json::Value> {
    let products = reload_catalog(&s).await;
    Json(json!({"status": "refreshed", "products": products}))
}

async fn store_locations(State(s): State<AppState>) -> Json<serde_json::Value> {
    Json(json!(s.catalog.read().await.store_locations))
}

async fn create_product(
    State(s): State<AppState>,
    Json(input): Json<ProductInput>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let id = s.admin.create_product(input).await?;
    reload_catalog(&s).await;
    Ok((StatusCode::CREATED, Json(json!({"id": id}))))
}

async fn update_product(
    State(s): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<ProductInput>,
) -> Result<Json<serde_json::Value>, ApiError> {
    s.admin.update_product(&id, input).await?;
    reload_catalog(&s).await;
    Ok(Json(json!({"id": id})))
}

async fn delete_product(State(s): State<AppState>, Path(id): Path<String>) -> Result<StatusCode, ApiError> {
    s.admin.delete_product(&id).await?;
    reload_catalog(&s).await;
    Ok(StatusCode::NO_CONTENT)
}

async fn create_category(
    State(s): State<AppState>,
    Json(input): Json<CategoryInput>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let id = s.admin.create_category(input).await?;
    reload_catalog(&s).await;
    Ok((StatusCode::CREATED, Json(json!({"id": id}))))
}

async fn delete_category(State(s): State<AppState>, Path(id): Path<String>) -> Result<StatusCode, ApiError> {
    s.admin.delete_category(&id).await?;
    reload_catalog(&s).await;
    Ok(StatusCode::NO_CONTENT)
}

async fn add_carousel_item(
    State(s): State<AppState>,
    Json(input): Json<CarouselInput>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let id = s.admin.add_carousel_item(input).await?;
    reload_catalog(&s).await;
    Ok((StatusCode::CREATED, Json(json!({"id": id}))))
}

async fn delete_carousel_item(
    State(s): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    s.admin.delete_carousel_item(&id).await?;
    reload_catalog(&s).await;
    Ok(StatusCode::NO_CONTENT)
}

async fn upload_image(
    State(s): State<AppState>,
    bytes: Bytes,
) -> Result<Json<serde_json::Value>, ApiError> {
    let url = s.admin.upload_image(bytes.to_vec()).await?;
    Ok(Json(json!({"url": url})))
}

async fn reload_catalog(s: &AppState) -> usize {
    let fresh = Catalog::load(s.store.as_ref()).await;
    let products = fresh.products.len();
    *s.catalog.write().await = fresh;
    products
}

// =============================================================================
// Session handlers
// =============================================================================

#[derive(Serialize)]
struct CartView {
    items: Vec<CartItem>,
    count: u32,
    subtotal: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    sync: Option<&'static str>,
}

fn cart_view(cart: &CartStore, sync: Option<SyncStatus>) -> CartView {
    CartView {
        items: cart.cart().items().to_vec(),
        count: cart.cart_count(),
        subtotal: subtotal(cart.cart()),
        sync: sync.map(|s| match s {
            SyncStatus::Synced => "synced",
            SyncStatus::LocalOnly => "local-only",
        }),
    }
}

async fn sign_in(
    State(s): State<AppState>,
    Path(sid): Path<String>,
    Json(user): Json<UserIdentity>,
) -> Json<CartView> {
    let catalog = s.catalog.read().await.clone();
    let mut sessions = s.sessions.lock().await;
    let session = sessions.entry(sid).or_insert_with(|| s.new_session());
    session.cart.identity_changed(Some(user), &catalog).await;
    Json(cart_view(&session.cart, None))
}

async fn sign_out(State(s): State<AppState>, Path(sid): Path<String>) -> Json<CartView> {
    let catalog = s.catalog.read().await.clone();
    let mut sessions = s.sessions.lock().await;
    let session = sessions.entry(sid).or_insert_with(|| s.new_session());
    session.cart.identity_changed(None, &catalog).await;
    Json(cart_view(&session.cart, None))
}

async fn get_cart(State(s): State<AppState>, Path(sid): Path<String>) -> Json<CartView> {
    let mut sessions = s.sessions.lock().await;
    let session = sessions.entry(sid).or_insert_with(|| s.new_session());
    Json(cart_view(&session.cart, None))
}

#[derive(Deserialize)]
struct AddItemRequest {
    product_id: String,
}

async fn add_cart_item(
    State(s): State<AppState>,
    Path(sid): Path<String>,
    Json(r): Json<AddItemRequest>,
) -> Result<Json<CartView>, ApiError> {
    let product = s
        .catalog
        .read()
        .await
        .product(&r.product_id)
        .cloned()
        .ok_or(ApiError::NotFound("product"))?;
    let mut sessions = s.sessions.lock().await;
    let session = sessions.entry(sid).or_insert_with(|| s.new_session());
    let sync = session.cart.add_to_cart(product).await;
    Ok(Json(cart_view(&session.cart, Some(sync))))
}

#[derive(Deserialize)]
struct QuantityRequest {
    quantity: i64,
}

async fn set_cart_quantity(
    State(s): State<AppState>,
    Path((sid, pid)): Path<(String, String)>,
    Json(r): Json<QuantityRequest>,
) -> Json<CartView> {
    let mut sessions = s.sessions.lock().await;
    let session = sessions.entry(sid).or_insert_with(|| s.new_session());
    let sync = session.cart.set_quantity(&pid, r.quantity).await;
    Json(cart_view(&session.cart, Some(sync)))
}

async fn remove_cart_item(
    State(s): State<AppState>,
    Path((sid, pid)): Path<(String, String)>,
) -> Json<CartView> {
    let mut sessions = s.sessions.lock().await;
    let session = sessions.entry(sid).or_insert_with(|| s.new_session());
    let sync = session.cart.remove_from_cart(&pid).await;
    Json(cart_view(&session.cart, Some(sync)))
}

async fn clear_cart(State(s): State<AppState>, Path(sid): Path<String>) -> Json<CartView> {
    let mut sessions = s.sessions.lock().await;
    let session = sessions.entry(sid).or_insert_with(|| s.new_session());
    let sync = session.cart.clear_cart().await;
    Json(cart_view(&session.cart, Some(sync)))
}

async fn get_favorites(State(s): State<AppState>, Path(sid): Path<String>) -> Json<serde_json::Value> {
    let mut sessions = s.sessions.lock().await;
    let session = sessions.entry(sid).or_insert_with(|| s.new_session());
    Json(json!({
        "products": session.cart.favorites().products(),
        "count": session.cart.favorites_count(),
    }))
}

async fn add_favorite(
    State(s): State<AppState>,
    Path(sid): Path<String>,
    Json(r): Json<AddItemRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let product = s
        .catalog
        .read()
        .await
        .product(&r.product_id)
        .cloned()
        .ok_or(ApiError::NotFound("product"))?;
    let mut sessions = s.sessions.lock().await;
    let session = sessions.entry(sid).or_insert_with(|| s.new_session());
    session.cart.add_to_favorites(product).await?;
    Ok(Json(json!({"status": "added", "count": session.cart.favorites_count()})))
}

async fn remove_favorite(
    State(s): State<AppState>,
    Path((sid, pid)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mut sessions = s.sessions.lock().await;
    let session = sessions.entry(sid).or_insert_with(|| s.new_session());
    session.cart.remove_from_favorites(&pid).await?;
    Ok(Json(json!({"status": "removed", "count": session.cart.favorites_count()})))
}

#[derive(Deserialize)]
struct QuoteParams {
    method: CheckoutMethod,
}

async fn quote(
    State(s): State<AppState>,
    Path(sid): Path<String>,
    Query(p): Query<QuoteParams>,
) -> Json<Totals> {
    let mut sessions = s.sessions.lock().await;
    let session = sessions.entry(sid).or_insert_with(|| s.new_session());
    Json(Totals::compute(&s.pricing, session.cart.cart(), p.method).rounded())
}

async fn checkout(
    State(s): State<AppState>,
    Path(sid): Path<String>,
    Json(form): Json<CheckoutForm>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let outcome = {
        let mut sessions = s.sessions.lock().await;
        let session = sessions.entry(sid).or_insert_with(|| s.new_session());
        let Session { cart, checkout } = session;
        checkout.submit(cart, form).await?
    };

    if let Some(nats) = &s.nats {
        let payload = serde_json::to_vec(&json!({
            "order_id": outcome.order.id,
            "email": outcome.order.email,
            "total": outcome.order.total,
        }))
        .unwrap_or_default();
        if let Err(e) = nats.publish("orders.created".to_string(), payload.into()).await {
            warn!(error = %e, "failed to publish orders.created");
        }
    }

    Ok(Json(json!({
        "order_id": outcome.order.id,
        "total": outcome.order.total,
        "email_sent": outcome.email_sent,
    })))
}

// =============================================================================
// Order handlers
// =============================================================================

#[derive(Deserialize)]
struct OrdersParams {
    email: String,
}

async fn list_orders(
    State(s): State<AppState>,
    Query(p): Query<OrdersParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let orders = orders_for(s.store.as_ref(), &p.email).await?;
    let views: Vec<serde_json::Value> = orders
        .iter()
        .map(|o| json!({"id": o.id, "total": o.total, "created_at": o.created_at, "method": o.method}))
        .collect();
    Ok(Json(json!({"orders": views})))
}

async fn get_order(
    State(s): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let order = fetch_order(s.store.as_ref(), &id)
        .await?
        .ok_or(ApiError::NotFound("order"))?;
    let mut body = serde_json::to_value(&order)
        .map_err(|e| StorefrontError::StoreRead(e.to_string()))?;
    if let Some(obj) = body.as_object_mut() {
        obj.insert("id".to_string(), json!(order.id));
    }
    Ok(Json(body))
}

// =============================================================================
// Fallback adapters for unconfigured collaborators
// =============================================================================

/// Logs confirmations instead of sending them when no mail endpoint is
/// configured.
struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(
        &self,
        recipient: &str,
        customer_name: &str,
        order_id: &str,
    ) -> florest_storefront::Result<()> {
        info!(recipient, customer_name, order_id, "order confirmation (mail endpoint unset)");
        Ok(())
    }
}

struct UnconfiguredUploader;

#[async_trait]
impl ImageUploader for UnconfiguredUploader {
    async fn upload(&self, _bytes: Vec<u8>) -> florest_storefront::Result<String> {
        Err(StorefrontError::Upload("image hosting is not configured".into()))
    }
}
