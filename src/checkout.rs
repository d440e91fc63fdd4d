//! Checkout orchestration: a single-pass state machine per attempt.
//!
//! `Idle -> Validating -> Submitting -> Persisted -> NotifyAttempted ->
//! Complete`, with `Failed` reachable from `Validating` and `Submitting`.
//! Persist and notify are independent failure domains: a failed insert
//! leaves the cart untouched for retry, while a failed confirmation email
//! only degrades an already-durable success.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use tracing::{info, warn};
use validator::Validate;

use crate::cart_store::CartStore;
use crate::config::PricingConfig;
use crate::domain::cart::Cart;
use crate::domain::order::{
    CheckoutMethod, ContactInfo, Order, OrderLine, PickupInfo, ShippingAddress,
};
use crate::domain::value_objects::round_money;
use crate::ports::{collections, DocumentStore, Notifier};
use crate::pricing::{discounted_price, line_total, Totals};
use crate::{FieldError, Result, StorefrontError};

/// Submitted checkout form. Which optional section is required depends on
/// the method.
#[derive(Clone, Debug, Deserialize)]
pub struct CheckoutForm {
    pub method: CheckoutMethod,
    pub contact: ContactInfo,
    pub shipping: Option<ShippingAddress>,
    pub pickup: Option<PickupInfo>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CheckoutState {
    Idle,
    Validating,
    Submitting,
    Persisted,
    NotifyAttempted,
    Complete,
    Failed,
}

/// Result of a completed checkout. `email_sent == false` is the degraded
/// success: the order is durable but the confirmation did not go out.
#[derive(Clone, Debug)]
pub struct CheckoutOutcome {
    pub order: Order,
    pub email_sent: bool,
}

pub struct CheckoutOrchestrator {
    store: Arc<dyn DocumentStore>,
    notifier: Arc<dyn Notifier>,
    pricing: PricingConfig,
    state: CheckoutState,
}

impl CheckoutOrchestrator {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        notifier: Arc<dyn Notifier>,
        pricing: PricingConfig,
    ) -> Self {
        Self { store, notifier, pricing, state: CheckoutState::Idle }
    }

    pub fn state(&self) -> CheckoutState {
        self.state
    }

    /// Runs one checkout attempt against the current cart snapshot.
    ///
    /// The cart must not be mutated while this is in flight; a second
    /// submission during an active attempt is refused outright.
    pub async fn submit(
        &mut self,
        cart_store: &mut CartStore,
        form: CheckoutForm,
    ) -> Result<CheckoutOutcome> {
        if matches!(
            self.state,
            CheckoutState::Validating
                | CheckoutState::Submitting
                | CheckoutState::Persisted
                | CheckoutState::NotifyAttempted
        ) {
            return Err(StorefrontError::CheckoutInFlight);
        }
        let Some(user) = cart_store.user().cloned() else {
            return Err(StorefrontError::Unauthenticated);
        };

        self.state = CheckoutState::Validating;
        if let Err(errors) = validate_form(&form, cart_store.cart()) {
            self.state = CheckoutState::Idle;
            return Err(StorefrontError::Validation(errors));
        }

        self.state = CheckoutState::Submitting;
        let order = build_order(&self.pricing, cart_store.cart(), &form, &user.email);
        let data = serde_json::to_value(&order)
            .map_err(|e| StorefrontError::StoreWrite(e.to_string()))?;
        let order_id = match self.store.insert(collections::ORDERS, data).await {
            Ok(id) => id,
            Err(e) => {
                // Cart untouched so the shopper can retry as-is.
                self.state = CheckoutState::Failed;
                return Err(e);
            }
        };
        self.state = CheckoutState::Persisted;
        let order = Order { id: order_id, ..order };
        info!(order_id = %order.id, total = %order.total, "order persisted");

        // The order is durable: clear the cart exactly once before anything
        // else can fail.
        cart_store.clear_cart().await;

        self.state = CheckoutState::NotifyAttempted;
        let email_sent = match self
            .notifier
            .send(&user.email, user.customer_name(), &order.id)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                warn!(order_id = %order.id, error = %e, "confirmation email failed, order stands");
                false
            }
        };

        self.state = CheckoutState::Complete;
        Ok(CheckoutOutcome { order, email_sent })
    }
}

/// Field-level validation. An empty cart blocks submission regardless of
/// method; contact info is always required; shipping or pickup details are
/// required by their respective methods.
pub fn validate_form(form: &CheckoutForm, cart: &Cart) -> std::result::Result<(), Vec<FieldError>> {
    let mut errors = Vec::new();
    if cart.is_empty() {
        errors.push(FieldError::new("cart", "your cart is empty"));
    }
    collect_field_errors("contact", form.contact.validate(), &mut errors);
    match form.method {
        CheckoutMethod::CashOnDelivery => match &form.shipping {
            Some(shipping) => collect_field_errors("shipping", shipping.validate(), &mut errors),
            None => errors.push(FieldError::new("shipping", "shipping details are required")),
        },
        CheckoutMethod::StorePickup => match &form.pickup {
            Some(pickup) => {
                if pickup.store_location.trim().is_empty() {
                    errors.push(FieldError::new("pickup.store_location", "select a store location"));
                }
                if pickup.pickup_date < Utc::now().date_naive() {
                    errors.push(FieldError::new("pickup.pickup_date", "pickup date cannot be in the past"));
                }
            }
            None => errors.push(FieldError::new("pickup", "store pickup details are required")),
        },
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn collect_field_errors(
    prefix: &str,
    result: std::result::Result<(), validator::ValidationErrors>,
    out: &mut Vec<FieldError>,
) {
    let Err(errors) = result else { return };
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by_key(|(field, _)| *field);
    for (field, failures) in fields {
        for failure in failures {
            let message = failure
                .message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| failure.code.to_string());
            out.push(FieldError::new(format!("{prefix}.{field}"), message));
        }
    }
}

/// Freezes the cart into an order document with totals computed once.
fn build_order(cfg: &PricingConfig, cart: &Cart, form: &CheckoutForm, email: &str) -> Order {
    let totals = Totals::compute(cfg, cart, form.method).rounded();
    let items = cart
        .items()
        .iter()
        .map(|item| OrderLine {
            product_id: item.product.id.clone(),
            title: item.product.title.clone(),
            unit_price: round_money(discounted_price(item.product.base_price, item.product.discount)),
            quantity: item.quantity,
            line_total: round_money(line_total(item)),
        })
        .collect();
    Order {
        id: String::new(),
        items,
        method: form.method,
        contact: form.contact.clone(),
        shipping: if form.method == CheckoutMethod::CashOnDelivery { form.shipping.clone() } else { None },
        pickup: if form.method == CheckoutMethod::StorePickup { form.pickup.clone() } else { None },
        subtotal: totals.subtotal,
        shipping_fee: totals.shipping_fee,
        tax: totals.tax,
        cod_fee: totals.cod_fee,
        total: totals.total,
        email: email.to_string(),
        created_at: Utc::now(),
    }
}

/// Order-detail lookup by store-assigned id.
pub async fn fetch_order(store: &dyn DocumentStore, id: &str) -> Result<Option<Order>> {
    let Some(doc) = store.get(collections::ORDERS, id).await? else {
        return Ok(None);
    };
    let order: Order = serde_json::from_value(doc.data)
        .map_err(|e| StorefrontError::StoreRead(e.to_string()))?;
    Ok(Some(Order { id: doc.id, ..order }))
}

/// Order history for one purchaser, oldest first. Malformed documents are
/// skipped rather than failing the whole listing.
pub async fn orders_for(store: &dyn DocumentStore, email: &str) -> Result<Vec<Order>> {
    let docs = store.query(collections::ORDERS).await?;
    let mut orders = Vec::new();
    for doc in docs {
        match serde_json::from_value::<Order>(doc.data) {
            Ok(order) if order.email == email => orders.push(Order { id: doc.id, ..order }),
            Ok(_) => {}
            Err(e) => warn!(id = %doc.id, error = %e, "skipping malformed order document"),
        }
    }
    Ok(orders)
}

/// Groups field errors by field for API responses.
pub fn errors_by_field(errors: &[FieldError]) -> HashMap<String, Vec<String>> {
    let mut grouped: HashMap<String, Vec<String>> = HashMap::new();
    for error in errors {
        grouped.entry(error.field.clone()).or_default().push(error.message.clone());
    }
    grouped
}
