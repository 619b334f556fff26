//! Order lifecycle: creation (totals, items, history, stock) inside one
//! transaction, listing, status transitions, cancellation, statistics.

use crate::error::AppError;
use crate::models::{
    Order, OrderDetail, OrderItem, OrderItemDetail, OrderStatus, OrderStatusHistoryEntry, Product,
    ProductSummary, ProductVariant, UserSummary,
};
use crate::sql::{limit_offset, PgArg, QueryBuf};
use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::{PgConnection, PgPool};
use std::collections::HashMap;

/// Flat 8% tax on the subtotal, as the original checkout computed.
const TAX_RATE: f64 = 0.08;
const DEFAULT_SHIPPING: f64 = 10.0;
const ORDER_NUMBER_ATTEMPTS: u32 = 10;

const PAYMENT_METHODS: [&str; 4] = ["creditCard", "debitCard", "paypal", "cashOnDelivery"];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub items: Vec<OrderItemRequest>,
    pub shipping_address: Option<Value>,
    pub billing_address: Option<Value>,
    #[serde(default = "default_payment_method")]
    pub payment_method: String,
    pub special_instructions: Option<String>,
    pub coupon_code: Option<String>,
    #[serde(default = "default_shipping")]
    pub shipping: f64,
    #[serde(default)]
    pub discount: f64,
}

fn default_payment_method() -> String {
    "creditCard".into()
}

fn default_shipping() -> f64 {
    DEFAULT_SHIPPING
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemRequest {
    pub id: Option<i64>,
    pub product_id: Option<i64>,
    pub name: Option<String>,
    pub image: Option<String>,
    pub color: Option<String>,
    pub size: Option<String>,
    pub carat: Option<String>,
    pub quantity: i32,
    pub price: f64,
}

impl OrderItemRequest {
    fn product_ref(&self) -> Option<i64> {
        self.id.or(self.product_id)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Totals {
    pub subtotal: f64,
    pub tax: f64,
    pub total: f64,
}

/// subtotal + shipping + tax − discount; tax is derived, client totals are
/// never trusted.
pub fn compute_totals(items: &[OrderItemRequest], shipping: f64, discount: f64) -> Totals {
    let subtotal: f64 = items
        .iter()
        .map(|i| i.price * f64::from(i.quantity))
        .sum();
    let tax = subtotal * TAX_RATE;
    Totals {
        subtotal,
        tax,
        total: subtotal + shipping + tax - discount,
    }
}

/// `NYR-` + last six digits of the millisecond clock + three random digits.
pub fn generate_order_number() -> String {
    let millis = Utc::now().timestamp_millis().to_string();
    let tail: String = millis
        .chars()
        .rev()
        .take(6)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    let random = rand::thread_rng().gen_range(0..1000);
    format!("NYR-{tail}{random:03}")
}

/// Subtract a purchased quantity from the matching (color, size) variant.
/// Returns the updated list and whether a variant matched.
pub fn decrement_variant(
    mut variants: Vec<ProductVariant>,
    color: Option<&str>,
    size: Option<&str>,
    quantity: i64,
) -> (Vec<ProductVariant>, bool) {
    let matched = variants.iter_mut().find(|v| {
        color.map_or(true, |c| v.color.eq_ignore_ascii_case(c))
            && size.map_or(true, |s| v.size.eq_ignore_ascii_case(s))
    });
    match matched {
        Some(v) => {
            v.quantity = (v.quantity - quantity).max(0);
            (variants, true)
        }
        None => (variants, false),
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatsOverview {
    pub total_orders: i64,
    pub pending_orders: i64,
    pub processing_orders: i64,
    pub shipped_orders: i64,
    pub delivered_orders: i64,
    pub cancelled_orders: i64,
    pub total_revenue: f64,
}

#[derive(Serialize, sqlx::FromRow)]
pub struct StatusRollup {
    pub status: String,
    pub count: i64,
    pub revenue: f64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentOrder {
    #[serde(flatten)]
    pub order: Order,
    pub user: Option<UserSummary>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStats {
    pub overview: OrderStatsOverview,
    pub recent_orders: Vec<RecentOrder>,
    pub orders_by_status: Vec<StatusRollup>,
}

pub struct OrderService;

impl OrderService {
    /// Create an order for `user_id`. The order row, its items, the
    /// initial history row, the stock decrement, and the user statistics
    /// all commit or roll back together.
    pub async fn create(
        pool: &PgPool,
        user_id: i64,
        req: &CreateOrderRequest,
    ) -> Result<OrderDetail, AppError> {
        if req.items.is_empty() {
            return Err(AppError::BadRequest("Order items are required".into()));
        }
        let shipping_address = req
            .shipping_address
            .clone()
            .ok_or_else(|| AppError::BadRequest("Shipping address is required".into()))?;
        crate::validation::one_of("paymentMethod", &req.payment_method, &PAYMENT_METHODS)?;
        for item in &req.items {
            if item.product_ref().is_none() {
                return Err(AppError::BadRequest(
                    "Each order item must reference a product".into(),
                ));
            }
            if item.quantity <= 0 {
                return Err(AppError::BadRequest(
                    "Each order item must have a positive quantity".into(),
                ));
            }
        }

        let mut tx = pool.begin().await?;

        let mut ids: Vec<i64> = req.items.iter().filter_map(|i| i.product_ref()).collect();
        ids.sort_unstable();
        ids.dedup();
        let products: Vec<Product> = sqlx::query_as("SELECT * FROM products WHERE id = ANY($1)")
            .bind(&ids)
            .fetch_all(&mut *tx)
            .await?;
        if products.len() != ids.len() {
            return Err(AppError::BadRequest(format!(
                "Some products are not available. Found {} out of {} products.",
                products.len(),
                ids.len()
            )));
        }
        let products_by_id: HashMap<i64, &Product> =
            products.iter().map(|p| (p.id, p)).collect();

        let order_number = Self::unique_order_number(&mut tx).await?;
        let totals = compute_totals(&req.items, req.shipping, req.discount);

        let order: Order = sqlx::query_as(
            r#"
            INSERT INTO orders (order_number, user_id, status, payment_status, payment_method,
                                subtotal, shipping, tax, discount, total,
                                shipping_address, billing_address, special_instructions, coupon_code)
            VALUES ($1, $2, 'pending', 'pending', $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *
            "#,
        )
        .bind(&order_number)
        .bind(user_id)
        .bind(&req.payment_method)
        .bind(totals.subtotal)
        .bind(req.shipping)
        .bind(totals.tax)
        .bind(req.discount)
        .bind(totals.total)
        .bind(&shipping_address)
        .bind(req.billing_address.as_ref().unwrap_or(&shipping_address))
        .bind(&req.special_instructions)
        .bind(&req.coupon_code)
        .fetch_one(&mut *tx)
        .await?;

        for item in &req.items {
            let product_id = item.product_ref().unwrap_or_default();
            let Some(product) = products_by_id.get(&product_id) else {
                continue;
            };
            let product_name = item
                .name
                .clone()
                .unwrap_or_else(|| product.name.clone());
            let product_image = item.image.clone().or_else(|| product.primary_image());
            let variant = json!({
                "color": item.color,
                "size": item.size,
                "carat": item.carat,
            });
            sqlx::query(
                r#"
                INSERT INTO order_items (order_id, product_id, product_name, product_image,
                                         variant, quantity, unit_price, total_price)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(order.id)
            .bind(product_id)
            .bind(&product_name)
            .bind(&product_image)
            .bind(&variant)
            .bind(item.quantity)
            .bind(item.price)
            .bind(item.price * f64::from(item.quantity))
            .execute(&mut *tx)
            .await?;

            // Stock: take the purchased quantity off the matching variant
            // and count the sale.
            let (variants, matched) = decrement_variant(
                product.parsed_variants(),
                item.color.as_deref(),
                item.size.as_deref(),
                i64::from(item.quantity),
            );
            if matched {
                let variants_json = serde_json::to_value(&variants)
                    .map_err(|e| AppError::Internal(format!("variants: {e}")))?;
                sqlx::query(
                    "UPDATE products SET variants = $1, sales_count = sales_count + $2, updated_at = NOW() WHERE id = $3",
                )
                .bind(&variants_json)
                .bind(i64::from(item.quantity))
                .bind(product_id)
                .execute(&mut *tx)
                .await?;
            } else {
                tracing::warn!(product_id, "no variant matched order item, stock not decremented");
            }
        }

        sqlx::query(
            "INSERT INTO order_status_history (order_id, status, comment, changed_by) VALUES ($1, 'pending', 'Order created', 'system')",
        )
        .bind(order.id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE users SET total_orders = total_orders + 1, total_spent = total_spent + $1, updated_at = NOW() WHERE id = $2",
        )
        .bind(totals.total)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(order_id = order.id, order_number = %order.order_number, "order created");

        Self::detail(pool, order.id, None, false)
            .await?
            .ok_or_else(|| AppError::Internal("order vanished after commit".into()))
    }

    async fn unique_order_number(tx: &mut PgConnection) -> Result<String, AppError> {
        for _ in 0..ORDER_NUMBER_ATTEMPTS {
            let candidate = generate_order_number();
            let taken: Option<(i64,)> =
                sqlx::query_as("SELECT id FROM orders WHERE order_number = $1")
                    .bind(&candidate)
                    .fetch_optional(&mut *tx)
                    .await?;
            if taken.is_none() {
                return Ok(candidate);
            }
        }
        Err(AppError::Internal(
            "Failed to generate unique order number".into(),
        ))
    }

    /// Page of a user's orders, newest first, items included.
    pub async fn list(
        pool: &PgPool,
        user_id: i64,
        status: Option<&str>,
        page: u32,
        limit: u32,
    ) -> Result<(Vec<OrderDetail>, i64), AppError> {
        let mut q = QueryBuf::new();
        q.condition("user_id = {}", PgArg::I64(user_id));
        if let Some(status) = status {
            q.condition("status = {}", PgArg::Text(status.to_string()));
        }

        let mut count = QueryBuf::new();
        count.sql = format!("SELECT COUNT(*) FROM orders{}", q.where_clause());
        count.params = q.params.clone();
        let total: i64 = count.query_scalar().fetch_one(pool).await?;

        q.sql = format!(
            "SELECT * FROM orders{} ORDER BY created_at DESC{}",
            q.where_clause(),
            limit_offset(page, limit)
        );
        let orders: Vec<Order> = q.query_as().fetch_all(pool).await?;
        let details = Self::attach_items(pool, orders).await?;
        Ok((details, total))
    }

    /// One order with items, history, and the buyer. `restrict_user`
    /// scopes the lookup so customers only ever see their own orders.
    pub async fn detail(
        pool: &PgPool,
        order_id: i64,
        restrict_user: Option<i64>,
        with_history: bool,
    ) -> Result<Option<OrderDetail>, AppError> {
        let mut q = QueryBuf::new();
        q.condition("id = {}", PgArg::I64(order_id));
        if let Some(uid) = restrict_user {
            q.condition("user_id = {}", PgArg::I64(uid));
        }
        q.sql = format!("SELECT * FROM orders{}", q.where_clause());
        let Some(order) = q.query_as::<Order>().fetch_optional(pool).await? else {
            return Ok(None);
        };

        let mut details = Self::attach_items(pool, vec![order]).await?;
        let mut detail = details.remove(0);

        if with_history {
            let history: Vec<OrderStatusHistoryEntry> = sqlx::query_as(
                "SELECT * FROM order_status_history WHERE order_id = $1 ORDER BY created_at ASC",
            )
            .bind(order_id)
            .fetch_all(pool)
            .await?;
            detail.status_history = Some(history);
        }

        let user: Option<UserSummary> =
            sqlx::query_as("SELECT id, name, email, phone FROM users WHERE id = $1")
                .bind(detail.order.user_id)
                .fetch_optional(pool)
                .await?;
        detail.user = user;
        Ok(Some(detail))
    }

    /// Batch-load items and product summaries for a page of orders.
    async fn attach_items(
        pool: &PgPool,
        orders: Vec<Order>,
    ) -> Result<Vec<OrderDetail>, AppError> {
        if orders.is_empty() {
            return Ok(Vec::new());
        }
        let order_ids: Vec<i64> = orders.iter().map(|o| o.id).collect();
        let items: Vec<OrderItem> =
            sqlx::query_as("SELECT * FROM order_items WHERE order_id = ANY($1) ORDER BY id")
                .bind(&order_ids)
                .fetch_all(pool)
                .await?;

        let mut product_ids: Vec<i64> = items.iter().map(|i| i.product_id).collect();
        product_ids.sort_unstable();
        product_ids.dedup();
        let summaries: Vec<ProductSummary> =
            sqlx::query_as("SELECT id, name, images, slug FROM products WHERE id = ANY($1)")
                .bind(&product_ids)
                .fetch_all(pool)
                .await?;
        let summaries_by_id: HashMap<i64, ProductSummary> =
            summaries.into_iter().map(|p| (p.id, p)).collect();

        let mut items_by_order: HashMap<i64, Vec<OrderItemDetail>> = HashMap::new();
        for item in items {
            let product = summaries_by_id.get(&item.product_id).cloned();
            items_by_order
                .entry(item.order_id)
                .or_default()
                .push(OrderItemDetail { item, product });
        }

        Ok(orders
            .into_iter()
            .map(|order| {
                let items = items_by_order.remove(&order.id).unwrap_or_default();
                OrderDetail {
                    order,
                    items,
                    status_history: None,
                    user: None,
                }
            })
            .collect())
    }

    /// Admin status transition. Stamps the lifecycle timestamps and
    /// appends the history row in the same transaction.
    pub async fn update_status(
        pool: &PgPool,
        order_id: i64,
        status: OrderStatus,
        comment: Option<&str>,
        tracking_number: Option<&str>,
        changed_by: &str,
    ) -> Result<OrderDetail, AppError> {
        let mut tx = pool.begin().await?;

        let existing: Option<(i64,)> = sqlx::query_as("SELECT id FROM orders WHERE id = $1")
            .bind(order_id)
            .fetch_optional(&mut *tx)
            .await?;
        if existing.is_none() {
            return Err(AppError::NotFound("Order not found".into()));
        }

        sqlx::query(
            r#"
            UPDATE orders SET
                status = $1,
                tracking_number = COALESCE($2, tracking_number),
                delivered_at = CASE WHEN $1 = 'delivered' THEN NOW() ELSE delivered_at END,
                cancelled_at = CASE WHEN $1 = 'cancelled' THEN NOW() ELSE cancelled_at END,
                refunded_at = CASE WHEN $1 = 'refunded' THEN NOW() ELSE refunded_at END,
                payment_status = CASE WHEN $1 = 'refunded' THEN 'refunded' ELSE payment_status END,
                updated_at = NOW()
            WHERE id = $3
            "#,
        )
        .bind(status.as_str())
        .bind(tracking_number)
        .bind(order_id)
        .execute(&mut *tx)
        .await?;

        let comment = comment
            .map(String::from)
            .unwrap_or_else(|| format!("Order status changed to {status}"));
        sqlx::query(
            "INSERT INTO order_status_history (order_id, status, comment, changed_by) VALUES ($1, $2, $3, $4)",
        )
        .bind(order_id)
        .bind(status.as_str())
        .bind(&comment)
        .bind(changed_by)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Self::detail(pool, order_id, None, true)
            .await?
            .ok_or_else(|| AppError::NotFound("Order not found".into()))
    }

    /// Customer (or admin) cancellation; only before fulfilment starts.
    pub async fn cancel(
        pool: &PgPool,
        order_id: i64,
        restrict_user: Option<i64>,
        reason: Option<&str>,
        changed_by: &str,
    ) -> Result<Order, AppError> {
        let mut tx = pool.begin().await?;

        let mut q = QueryBuf::new();
        q.condition("id = {}", PgArg::I64(order_id));
        if let Some(uid) = restrict_user {
            q.condition("user_id = {}", PgArg::I64(uid));
        }
        q.sql = format!("SELECT * FROM orders{} FOR UPDATE", q.where_clause());
        let order: Option<Order> = q.query_as().fetch_optional(&mut *tx).await?;
        let order = order.ok_or_else(|| AppError::NotFound("Order not found".into()))?;

        let current: OrderStatus = order
            .status
            .parse()
            .map_err(|()| AppError::Internal(format!("bad status in db: {}", order.status)))?;
        if !current.cancellable_by_customer() {
            return Err(AppError::BadRequest(
                "Order cannot be cancelled at this stage".into(),
            ));
        }

        let cancelled: Order = sqlx::query_as(
            "UPDATE orders SET status = 'cancelled', cancelled_at = NOW(), updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(order_id)
        .fetch_one(&mut *tx)
        .await?;

        let comment = reason
            .map(String::from)
            .unwrap_or_else(|| "Order cancelled by customer".into());
        sqlx::query(
            "INSERT INTO order_status_history (order_id, status, comment, changed_by) VALUES ($1, 'cancelled', $2, $3)",
        )
        .bind(order_id)
        .bind(&comment)
        .bind(changed_by)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(cancelled)
    }

    pub async fn stats(pool: &PgPool) -> Result<OrderStats, AppError> {
        let rollup: Vec<StatusRollup> = sqlx::query_as(
            "SELECT status, COUNT(*) AS count, COALESCE(SUM(total), 0) AS revenue FROM orders GROUP BY status",
        )
        .fetch_all(pool)
        .await?;

        let count_for = |s: OrderStatus| {
            rollup
                .iter()
                .find(|r| r.status == s.as_str())
                .map_or(0, |r| r.count)
        };
        let total_orders: i64 = rollup.iter().map(|r| r.count).sum();
        let total_revenue: f64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(total), 0) FROM orders WHERE status IN ('delivered', 'shipped', 'processing')",
        )
        .fetch_one(pool)
        .await?;

        let overview = OrderStatsOverview {
            total_orders,
            pending_orders: count_for(OrderStatus::Pending),
            processing_orders: count_for(OrderStatus::Processing),
            shipped_orders: count_for(OrderStatus::Shipped),
            delivered_orders: count_for(OrderStatus::Delivered),
            cancelled_orders: count_for(OrderStatus::Cancelled),
            total_revenue,
        };

        let recent: Vec<Order> =
            sqlx::query_as("SELECT * FROM orders ORDER BY created_at DESC LIMIT 10")
                .fetch_all(pool)
                .await?;
        let mut user_ids: Vec<i64> = recent.iter().map(|o| o.user_id).collect();
        user_ids.sort_unstable();
        user_ids.dedup();
        let users: Vec<UserSummary> = sqlx::query_as(
            "SELECT id, name, email, NULL::varchar AS phone FROM users WHERE id = ANY($1)",
        )
        .bind(&user_ids)
        .fetch_all(pool)
        .await?;
        let users_by_id: HashMap<i64, UserSummary> =
            users.into_iter().map(|u| (u.id, u)).collect();
        let recent_orders = recent
            .into_iter()
            .map(|order| RecentOrder {
                user: users_by_id.get(&order.user_id).cloned(),
                order,
            })
            .collect();

        Ok(OrderStats {
            overview,
            recent_orders,
            orders_by_status: rollup,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(price: f64, quantity: i32) -> OrderItemRequest {
        OrderItemRequest {
            id: Some(1),
            product_id: None,
            name: None,
            image: None,
            color: None,
            size: None,
            carat: None,
            quantity,
            price,
        }
    }

    #[test]
    fn totals_add_shipping_and_tax_minus_discount() {
        let items = [item(100.0, 2), item(50.0, 1)];
        let t = compute_totals(&items, 10.0, 5.0);
        assert_eq!(t.subtotal, 250.0);
        assert!((t.tax - 20.0).abs() < 1e-9);
        assert!((t.total - 275.0).abs() < 1e-9);
    }

    #[test]
    fn totals_for_empty_cart_are_just_fees() {
        let t = compute_totals(&[], 10.0, 0.0);
        assert_eq!(t.subtotal, 0.0);
        assert_eq!(t.total, 10.0);
    }

    #[test]
    fn order_number_has_prefix_and_nine_digits() {
        let n = generate_order_number();
        assert!(n.starts_with("NYR-"));
        let digits = &n[4..];
        assert_eq!(digits.len(), 9);
        assert!(digits.chars().all(|c| c.is_ascii_digit()));
    }

    fn variant(color: &str, size: &str, quantity: i64) -> ProductVariant {
        ProductVariant {
            color: color.into(),
            size: size.into(),
            kind: "standard".into(),
            price: 10.0,
            original_price: None,
            quantity,
        }
    }

    #[test]
    fn decrement_hits_the_matching_variant_only() {
        let variants = vec![variant("Red", "M", 5), variant("Blue", "M", 5)];
        let (updated, matched) = decrement_variant(variants, Some("blue"), Some("m"), 2);
        assert!(matched);
        assert_eq!(updated[0].quantity, 5);
        assert_eq!(updated[1].quantity, 3);
    }

    #[test]
    fn decrement_floors_at_zero() {
        let (updated, matched) = decrement_variant(vec![variant("Red", "M", 1)], None, None, 4);
        assert!(matched);
        assert_eq!(updated[0].quantity, 0);
    }

    #[test]
    fn decrement_reports_no_match() {
        let (updated, matched) =
            decrement_variant(vec![variant("Red", "M", 5)], Some("Green"), None, 1);
        assert!(!matched);
        assert_eq!(updated[0].quantity, 5);
    }
}
