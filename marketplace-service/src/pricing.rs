use crate::config::PricingConfig;
use crate::ledger::round_money;
use crate::models::{Customer, Product};
use rust_decimal::Decimal;

/// Unit price a customer pays: its own price, then its parent account's,
/// then the list price.
pub fn resolve_unit_price(product: &Product, customer: &Customer, parent: Option<&Customer>) -> Decimal {
    customer
        .prices
        .get(&product.id)
        .or_else(|| parent.and_then(|p| p.prices.get(&product.id)))
        .copied()
        .unwrap_or(product.price)
}

/// Delivery fee for an order subtotal. A seller-supplied fee wins over the
/// configured one.
pub fn delivery_fee(subtotal: Decimal, pricing: &PricingConfig, seller_override: Option<Decimal>) -> Decimal {
    if let Some(fee) = seller_override {
        return round_money(fee);
    }
    if subtotal >= pricing.free_delivery_threshold {
        round_money(Decimal::ZERO)
    } else {
        round_money(pricing.delivery_fee)
    }
}
