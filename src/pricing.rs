//! Pricing engine: pure functions from cart contents and checkout method to
//! monetary totals.
//!
//! All arithmetic is `Decimal` at full precision; rounding happens once, in
//! [`Totals::rounded`], when a quote is persisted or rendered.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::PricingConfig;
use crate::domain::cart::{Cart, CartItem};
use crate::domain::order::CheckoutMethod;
use crate::domain::value_objects::{round_money, Percent};

/// Unit price after any discount; the base price passes through unchanged
/// when no discount is set.
pub fn discounted_price(base_price: Decimal, discount: Option<Percent>) -> Decimal {
    match discount {
        Some(pct) => pct.apply_to(base_price),
        None => base_price,
    }
}

/// Discounted unit price times quantity.
pub fn line_total(item: &CartItem) -> Decimal {
    discounted_price(item.product.base_price, item.product.discount)
        * Decimal::from(item.quantity)
}

/// Sum of line totals; exactly zero for an empty cart.
pub fn subtotal(cart: &Cart) -> Decimal {
    cart.items().iter().map(line_total).sum()
}

/// Store pickup always ships free; otherwise free above the configured
/// threshold, flat fee below it.
pub fn shipping_fee(cfg: &PricingConfig, subtotal: Decimal, method: CheckoutMethod) -> Decimal {
    if method == CheckoutMethod::StorePickup || subtotal > cfg.free_shipping_threshold {
        Decimal::ZERO
    } else {
        cfg.flat_shipping_fee
    }
}

/// Tax applies to the subtotal regardless of method.
pub fn tax(cfg: &PricingConfig, subtotal: Decimal) -> Decimal {
    subtotal * cfg.tax_rate
}

pub fn cod_fee(cfg: &PricingConfig, method: CheckoutMethod) -> Decimal {
    if method == CheckoutMethod::CashOnDelivery {
        cfg.cod_fee
    } else {
        Decimal::ZERO
    }
}

/// A computed quote. Invariant: `total` is always the exact sum of the four
/// components, both at full precision and after [`Totals::rounded`].
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Totals {
    pub subtotal: Decimal,
    pub shipping_fee: Decimal,
    pub tax: Decimal,
    pub cod_fee: Decimal,
    pub total: Decimal,
}

impl Totals {
    pub fn compute(cfg: &PricingConfig, cart: &Cart, method: CheckoutMethod) -> Self {
        let subtotal = subtotal(cart);
        let shipping_fee = shipping_fee(cfg, subtotal, method);
        let tax = tax(cfg, subtotal);
        let cod_fee = cod_fee(cfg, method);
        Self { subtotal, shipping_fee, tax, cod_fee, total: subtotal + shipping_fee + tax + cod_fee }
    }

    /// Rounds each component to two decimals and recomputes the total from
    /// the rounded components, so the persisted sum invariant holds exactly.
    pub fn rounded(&self) -> Self {
        let subtotal = round_money(self.subtotal);
        let shipping_fee = round_money(self.shipping_fee);
        let tax = round_money(self.tax);
        let cod_fee = round_money(self.cod_fee);
        Self { subtotal, shipping_fee, tax, cod_fee, total: subtotal + shipping_fee + tax + cod_fee }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::{CategoryRef, CollectionRef, Product};

    fn product(id: &str, price: i64, discount: Option<&str>) -> Product {
        Product {
            id: id.into(),
            title: id.into(),
            description: String::new(),
            images: vec![],
            base_price: Decimal::from(price),
            discount: discount.map(|d| Percent::parse_label(d).unwrap()),
            tags: vec![],
            colors: vec![],
            rating: 0.0,
            category: CategoryRef { id: "c".into(), name: "c".into() },
            collection: CollectionRef { id: "l".into(), name: "l".into() },
            sub_categories: vec![],
        }
    }

    fn cart_of(entries: &[(&str, i64, Option<&str>, u32)]) -> Cart {
        let mut cart = Cart::new();
        for (id, price, discount, qty) in entries {
            cart.add(product(id, *price, *discount));
            cart.set_quantity(id, i64::from(*qty));
        }
        cart
    }

    #[test]
    fn empty_cart_subtotal_is_zero() {
        assert_eq!(subtotal(&Cart::new()), Decimal::ZERO);
    }

    #[test]
    fn discounted_price_stays_within_bounds() {
        for pct in [0i64, 1, 20, 50, 99, 100] {
            let discount = Percent::new(Decimal::from(pct)).unwrap();
            let price = discounted_price(Decimal::from(80), Some(discount));
            assert!(price >= Decimal::ZERO && price <= Decimal::from(80), "pct {pct}");
        }
    }

    #[test]
    fn cod_order_with_free_shipping() {
        // Two units at 100, no discount, cash on delivery: subtotal 200
        // clears the threshold, tax 16, COD fee 5, total 221.
        let cart = cart_of(&[("x", 100, None, 2)]);
        let totals = Totals::compute(&PricingConfig::default(), &cart, CheckoutMethod::CashOnDelivery);
        assert_eq!(totals.subtotal, Decimal::from(200));
        assert_eq!(totals.shipping_fee, Decimal::ZERO);
        assert_eq!(totals.tax, Decimal::from(16));
        assert_eq!(totals.cod_fee, Decimal::from(5));
        assert_eq!(totals.total, Decimal::from(221));
    }

    #[test]
    fn discounted_pickup_order() {
        // 50 with "20% OFF" picked up in store: unit 40, tax 3.2, total 43.2.
        let cart = cart_of(&[("y", 50, Some("20% OFF"), 1)]);
        let totals = Totals::compute(&PricingConfig::default(), &cart, CheckoutMethod::StorePickup);
        assert_eq!(totals.subtotal, Decimal::from(40));
        assert_eq!(totals.shipping_fee, Decimal::ZERO);
        assert_eq!(totals.tax, Decimal::new(32, 1));
        assert_eq!(totals.cod_fee, Decimal::ZERO);
        assert_eq!(totals.total, Decimal::new(432, 1));
    }

    #[test]
    fn flat_fee_below_threshold() {
        let cart = cart_of(&[("z", 30, None, 1)]);
        let cfg = PricingConfig::default();
        assert_eq!(
            shipping_fee(&cfg, subtotal(&cart), CheckoutMethod::CashOnDelivery),
            cfg.flat_shipping_fee
        );
        // Threshold is strict: exactly at the threshold still pays shipping.
        assert_eq!(
            shipping_fee(&cfg, cfg.free_shipping_threshold, CheckoutMethod::CashOnDelivery),
            cfg.flat_shipping_fee
        );
    }

    #[test]
    fn total_is_sum_of_components() {
        let cart = cart_of(&[("a", 33, Some("15% OFF"), 3), ("b", 7, None, 2)]);
        let cfg = PricingConfig::default();
        for method in [CheckoutMethod::CashOnDelivery, CheckoutMethod::StorePickup] {
            let t = Totals::compute(&cfg, &cart, method);
            assert_eq!(t.total, t.subtotal + t.shipping_fee + t.tax + t.cod_fee);
            let r = t.rounded();
            assert_eq!(r.total, r.subtotal + r.shipping_fee + r.tax + r.cod_fee);
            assert_eq!(r.tax, r.tax.round_dp(2));
        }
    }

    #[test]
    fn subtotal_matches_line_totals() {
        let cart = cart_of(&[("a", 12, None, 4), ("b", 99, Some("10% OFF"), 1)]);
        let sum: Decimal = cart.items().iter().map(line_total).sum();
        assert_eq!(subtotal(&cart), sum);
    }
}
