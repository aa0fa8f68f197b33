use crate::ledger::statement::Period;
use crate::models::{Customer, Order, OrderStatus};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerSales {
    pub customer_id: String,
    pub business_name: String,
    pub orders: usize,
    pub invoiced: Decimal,
    pub credited: Decimal,
    pub paid: Decimal,
    pub outstanding: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSales {
    pub product_id: String,
    pub name: String,
    pub quantity: u64,
    pub revenue: Decimal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesReport {
    pub seller_id: String,
    pub period: Period,
    pub order_count: usize,
    pub customers: Vec<CustomerSales>,
    pub products: Vec<ProductSales>,
    pub total_invoiced: Decimal,
    pub total_credited: Decimal,
    pub total_paid: Decimal,
    pub total_outstanding: Decimal,
    pub generated_at: DateTime<Utc>,
}

/// Per-customer and per-product totals over a seller's non-cancelled orders
/// placed within the period.
pub fn build_sales_report(
    seller_id: &str,
    orders: &[Order],
    customers: &[Customer],
    period: Period,
    now: DateTime<Utc>,
) -> SalesReport {
    let names: HashMap<&str, &str> = customers
        .iter()
        .map(|c| (c.id.as_str(), c.business_name.as_str()))
        .collect();

    let mut by_customer: HashMap<&str, CustomerSales> = HashMap::new();
    let mut by_product: HashMap<&str, ProductSales> = HashMap::new();
    let mut order_count = 0;

    for order in orders.iter().filter(|o| {
        o.seller_id == seller_id && o.status != OrderStatus::Cancelled && period.contains(o.created_at)
    }) {
        order_count += 1;
        let entry = by_customer
            .entry(order.customer_id.as_str())
            .or_insert_with(|| CustomerSales {
                customer_id: order.customer_id.clone(),
                business_name: names
                    .get(order.customer_id.as_str())
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| order.customer_id.clone()),
                orders: 0,
                invoiced: Decimal::ZERO,
                credited: Decimal::ZERO,
                paid: Decimal::ZERO,
                outstanding: Decimal::ZERO,
            });
        entry.orders += 1;
        entry.invoiced += order.invoiced_total();
        entry.credited += order.credited_total();
        entry.paid += order.total_paid;
        entry.outstanding += order.remaining_amount.max(Decimal::ZERO);

        for item in &order.items {
            let p = by_product
                .entry(item.product_id.as_str())
                .or_insert_with(|| ProductSales {
                    product_id: item.product_id.clone(),
                    name: item.name.clone(),
                    quantity: 0,
                    revenue: Decimal::ZERO,
                });
            p.quantity += u64::from(item.quantity);
            p.revenue += item.line_total;
        }
    }

    let mut customers: Vec<CustomerSales> = by_customer.into_values().collect();
    customers.sort_by(|a, b| b.invoiced.cmp(&a.invoiced).then_with(|| a.business_name.cmp(&b.business_name)));
    let mut products: Vec<ProductSales> = by_product.into_values().collect();
    products.sort_by(|a, b| b.revenue.cmp(&a.revenue).then_with(|| a.name.cmp(&b.name)));

    SalesReport {
        seller_id: seller_id.to_string(),
        period,
        order_count,
        total_invoiced: customers.iter().map(|c| c.invoiced).sum(),
        total_credited: customers.iter().map(|c| c.credited).sum(),
        total_paid: customers.iter().map(|c| c.paid).sum(),
        total_outstanding: customers.iter().map(|c| c.outstanding).sum(),
        customers,
        products,
        generated_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::fixtures::{at, order};
    use crate::models::OrderItem;

    #[test]
    fn totals_skip_cancelled_and_other_sellers() {
        let mut a = order("o-1", 100, at(2026, 5, 1));
        a.items = vec![OrderItem {
            product_id: "p-1".into(),
            name: "Olive oil".into(),
            quantity: 4,
            unit_price: Decimal::from(25),
            line_total: Decimal::from(100),
        }];
        let mut cancelled = order("o-2", 40, at(2026, 5, 2));
        cancelled.status = OrderStatus::Cancelled;
        let mut foreign = order("o-3", 70, at(2026, 5, 3));
        foreign.seller_id = "seller-2".into();

        let report = build_sales_report(
            "seller-1",
            &[a, cancelled, foreign],
            &[],
            Period::default(),
            at(2026, 6, 1),
        );

        assert_eq!(report.order_count, 1);
        assert_eq!(report.total_invoiced, Decimal::from(100));
        assert_eq!(report.total_outstanding, Decimal::from(100));
        assert_eq!(report.products[0].quantity, 4);
        assert_eq!(report.customers[0].business_name, "cust-1");
    }
}
