//! Admin CRM: customer records with their recent orders and statistics.
//! Orders are linked through the storefront account with the same email.

use crate::error::AppError;
use crate::models::customer::{Customer, CustomerWithOrders, OrderSummary, CUSTOMER_STATUSES};
use crate::sql::{like_pattern, limit_offset, order_by, PgArg, QueryBuf};
use crate::validation;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::PgPool;
use std::collections::HashMap;

const DEFAULT_PAGE_SIZE: u32 = 10;
const RECENT_ORDERS_PER_CUSTOMER: u32 = 5;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerListParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
    pub status: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<String>,
    pub gender: Option<String>,
    /// JSON value, or a JSON-encoded string as the admin panel submits it.
    pub addresses: Option<Value>,
    pub preferences: Option<Value>,
    pub notes: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, sqlx::FromRow)]
struct CustomerOrderRow {
    id: i64,
    order_number: String,
    total: f64,
    status: String,
    created_at: chrono::DateTime<Utc>,
    user_email: String,
}

#[derive(Serialize, sqlx::FromRow)]
pub struct MonthlyRegistrations {
    pub month: String,
    pub count: i64,
}

#[derive(Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TopCustomer {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub total_spent: f64,
    pub total_orders: i32,
}

#[derive(Serialize, sqlx::FromRow)]
pub struct GenderCount {
    pub gender: Option<String>,
    pub count: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerStatsOverview {
    pub total_customers: i64,
    pub active_customers: i64,
    pub inactive_customers: i64,
    pub blocked_customers: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerStats {
    pub overview: CustomerStatsOverview,
    pub monthly_registrations: Vec<MonthlyRegistrations>,
    pub top_customers: Vec<TopCustomer>,
    pub gender_stats: Vec<GenderCount>,
}

fn parse_json_field(field: &str, raw: &Value) -> Result<Value, AppError> {
    match raw {
        Value::String(s) => serde_json::from_str(s)
            .map_err(|_| AppError::BadRequest(format!("Invalid {field} format"))),
        other => Ok(other.clone()),
    }
}

fn parse_date(field: &str, raw: &str) -> Result<NaiveDate, AppError> {
    let day = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("{field} must be a YYYY-MM-DD date")))
}

fn generate_referral_code() -> String {
    let millis = Utc::now().timestamp_millis().to_string();
    let tail: String = millis
        .chars()
        .rev()
        .take(6)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    format!("REF{tail}")
}

pub struct CustomerService;

impl CustomerService {
    pub async fn list(
        pool: &PgPool,
        params: &CustomerListParams,
    ) -> Result<(Vec<CustomerWithOrders>, i64, u32, u32), AppError> {
        let page = params.page.unwrap_or(1).max(1);
        let limit = params.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, 100);

        let mut q = QueryBuf::new();
        if let Some(search) = params.search.as_deref().filter(|s| !s.trim().is_empty()) {
            q.any_of(
                &["name ILIKE {}", "email ILIKE {}", "phone ILIKE {}"],
                PgArg::Text(like_pattern(search.trim())),
            );
        }
        if let Some(status) = &params.status {
            q.condition("status = {}", PgArg::Text(status.clone()));
        }

        let mut count = QueryBuf::new();
        count.sql = format!("SELECT COUNT(*) FROM customers{}", q.where_clause());
        count.params = q.params.clone();
        let total: i64 = count.query_scalar().fetch_one(pool).await?;

        let order = order_by(
            params.sort_by.as_deref(),
            params.sort_order.as_deref(),
            &[
                ("createdAt", "created_at"),
                ("name", "name"),
                ("totalSpent", "total_spent"),
                ("totalOrders", "total_orders"),
            ],
            "created_at",
        );
        q.sql = format!(
            "SELECT * FROM customers{}{order}{}",
            q.where_clause(),
            limit_offset(page, limit)
        );
        let customers: Vec<Customer> = q.query_as().fetch_all(pool).await?;

        let emails: Vec<String> = customers.iter().map(|c| c.email.clone()).collect();
        let mut orders_by_email =
            Self::recent_orders_by_email(pool, &emails, Some(RECENT_ORDERS_PER_CUSTOMER)).await?;

        let rows = customers
            .into_iter()
            .map(|customer| {
                let orders = orders_by_email.remove(&customer.email).unwrap_or_default();
                CustomerWithOrders { customer, orders }
            })
            .collect();
        Ok((rows, total, page, limit))
    }

    pub async fn get(pool: &PgPool, id: i64) -> Result<Option<CustomerWithOrders>, AppError> {
        let customer: Option<Customer> = sqlx::query_as("SELECT * FROM customers WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        let Some(customer) = customer else {
            return Ok(None);
        };
        let mut orders_by_email =
            Self::recent_orders_by_email(pool, &[customer.email.clone()], None).await?;
        let orders = orders_by_email.remove(&customer.email).unwrap_or_default();
        Ok(Some(CustomerWithOrders { customer, orders }))
    }

    pub async fn create(pool: &PgPool, input: &CustomerInput) -> Result<Customer, AppError> {
        let name = validation::required("name", input.name.as_deref())?;
        let email = validation::required("email", input.email.as_deref())?;
        validation::email("email", &email)?;
        let email = email.to_lowercase();

        let existing: Option<(i64,)> = sqlx::query_as("SELECT id FROM customers WHERE email = $1")
            .bind(&email)
            .fetch_optional(pool)
            .await?;
        if existing.is_some() {
            return Err(AppError::BadRequest(
                "Customer with this email already exists".into(),
            ));
        }

        let date_of_birth = input
            .date_of_birth
            .as_deref()
            .map(|d| parse_date("dateOfBirth", d))
            .transpose()?;
        let addresses = input
            .addresses
            .as_ref()
            .map(|a| parse_json_field("addresses", a))
            .transpose()?;
        let preferences = input
            .preferences
            .as_ref()
            .map(|p| parse_json_field("preferences", p))
            .transpose()?;

        let customer: Customer = sqlx::query_as(
            r#"
            INSERT INTO customers (name, email, phone, date_of_birth, gender,
                                   addresses, preferences, referral_code, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(&name)
        .bind(&email)
        .bind(&input.phone)
        .bind(date_of_birth)
        .bind(&input.gender)
        .bind(addresses)
        .bind(preferences)
        .bind(generate_referral_code())
        .bind(&input.notes)
        .fetch_one(pool)
        .await?;
        Ok(customer)
    }

    pub async fn update(
        pool: &PgPool,
        id: i64,
        input: &CustomerInput,
    ) -> Result<Customer, AppError> {
        let mut q = QueryBuf::new();
        let mut sets: Vec<String> = Vec::new();
        fn set(q: &mut QueryBuf, sets: &mut Vec<String>, column: &str, arg: PgArg) {
            let n = q.push(arg);
            sets.push(format!("{column} = ${n}"));
        }

        if let Some(name) = &input.name {
            set(&mut q, &mut sets, "name", PgArg::Text(name.clone()));
        }
        if let Some(email) = input.email.as_deref() {
            validation::email("email", email)?;
            set(&mut q, &mut sets, "email", PgArg::Text(email.to_lowercase()));
        }
        if let Some(phone) = &input.phone {
            set(&mut q, &mut sets, "phone", PgArg::Text(phone.clone()));
        }
        if let Some(dob) = input.date_of_birth.as_deref() {
            let date = parse_date("dateOfBirth", dob)?;
            let n = q.push(PgArg::Text(date.to_string()));
            sets.push(format!("date_of_birth = ${n}::date"));
        }
        if let Some(gender) = &input.gender {
            set(&mut q, &mut sets, "gender", PgArg::Text(gender.clone()));
        }
        if let Some(addresses) = &input.addresses {
            let value = parse_json_field("addresses", addresses)?;
            set(&mut q, &mut sets, "addresses", PgArg::Json(value));
        }
        if let Some(preferences) = &input.preferences {
            let value = parse_json_field("preferences", preferences)?;
            set(&mut q, &mut sets, "preferences", PgArg::Json(value));
        }
        if let Some(notes) = &input.notes {
            set(&mut q, &mut sets, "notes", PgArg::Text(notes.clone()));
        }
        if let Some(status) = &input.status {
            validation::one_of("status", status, &CUSTOMER_STATUSES)?;
            set(&mut q, &mut sets, "status", PgArg::Text(status.clone()));
        }

        sets.push("updated_at = NOW()".into());
        let id_param = q.push(PgArg::I64(id));
        q.sql = format!(
            "UPDATE customers SET {} WHERE id = ${id_param} RETURNING *",
            sets.join(", ")
        );
        let updated: Option<Customer> = q.query_as().fetch_optional(pool).await?;
        updated.ok_or_else(|| AppError::NotFound("Customer not found".into()))
    }

    pub async fn delete(pool: &PgPool, id: i64) -> Result<(), AppError> {
        let customer: Option<Customer> = sqlx::query_as("SELECT * FROM customers WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        let customer = customer.ok_or_else(|| AppError::NotFound("Customer not found".into()))?;

        let order_count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM orders o JOIN users u ON u.id = o.user_id WHERE u.email = $1",
        )
        .bind(&customer.email)
        .fetch_one(pool)
        .await?;
        if order_count > 0 {
            return Err(AppError::BadRequest(
                "Cannot delete customer with existing orders".into(),
            ));
        }

        sqlx::query("DELETE FROM customers WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn stats(pool: &PgPool) -> Result<CustomerStats, AppError> {
        let total_customers: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers")
            .fetch_one(pool)
            .await?;
        let mut by_status: HashMap<String, i64> = sqlx::query_as::<_, (String, i64)>(
            "SELECT status, COUNT(*) FROM customers GROUP BY status",
        )
        .fetch_all(pool)
        .await?
        .into_iter()
        .collect();

        let monthly_registrations: Vec<MonthlyRegistrations> = sqlx::query_as(
            r#"
            SELECT to_char(created_at, 'YYYY-MM') AS month, COUNT(*) AS count
            FROM customers
            WHERE created_at >= NOW() - INTERVAL '12 months'
            GROUP BY 1 ORDER BY 1
            "#,
        )
        .fetch_all(pool)
        .await?;

        let top_customers: Vec<TopCustomer> = sqlx::query_as(
            "SELECT id, name, email, total_spent, total_orders FROM customers ORDER BY total_spent DESC LIMIT 10",
        )
        .fetch_all(pool)
        .await?;

        let gender_stats: Vec<GenderCount> = sqlx::query_as(
            "SELECT gender, COUNT(*) AS count FROM customers WHERE gender IS NOT NULL GROUP BY gender",
        )
        .fetch_all(pool)
        .await?;

        Ok(CustomerStats {
            overview: CustomerStatsOverview {
                total_customers,
                active_customers: by_status.remove("Active").unwrap_or(0),
                inactive_customers: by_status.remove("Inactive").unwrap_or(0),
                blocked_customers: by_status.remove("Blocked").unwrap_or(0),
            },
            monthly_registrations,
            top_customers,
            gender_stats,
        })
    }

    /// Orders for the storefront accounts matching these emails, newest
    /// first, optionally capped per customer.
    async fn recent_orders_by_email(
        pool: &PgPool,
        emails: &[String],
        per_customer: Option<u32>,
    ) -> Result<HashMap<String, Vec<OrderSummary>>, AppError> {
        if emails.is_empty() {
            return Ok(HashMap::new());
        }
        let cap = per_customer.map_or(String::new(), |n| format!(" WHERE rn <= {n}"));
        let sql = format!(
            r#"
            SELECT id, order_number, total, status, created_at, user_email FROM (
                SELECT o.id, o.order_number, o.total, o.status, o.created_at,
                       u.email AS user_email,
                       ROW_NUMBER() OVER (PARTITION BY u.email ORDER BY o.created_at DESC) AS rn
                FROM orders o
                JOIN users u ON u.id = o.user_id
                WHERE u.email = ANY($1)
            ) ranked{cap}
            "#
        );
        let rows: Vec<CustomerOrderRow> = sqlx::query_as(&sql)
            .bind(emails)
            .fetch_all(pool)
            .await?;
        let mut grouped: HashMap<String, Vec<OrderSummary>> = HashMap::new();
        for row in rows {
            grouped
                .entry(row.user_email.clone())
                .or_default()
                .push(OrderSummary {
                    id: row.id,
                    order_number: row.order_number,
                    total: row.total,
                    status: row.status,
                    created_at: row.created_at,
                });
        }
        Ok(grouped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn referral_codes_have_prefix_and_six_digits() {
        let code = generate_referral_code();
        assert!(code.starts_with("REF"));
        assert_eq!(code.len(), 9);
        assert!(code[3..].chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn date_parsing_accepts_full_timestamps() {
        assert_eq!(
            parse_date("dateOfBirth", "1994-02-11T00:00:00.000Z").unwrap(),
            NaiveDate::from_ymd_opt(1994, 2, 11).unwrap()
        );
        assert!(parse_date("dateOfBirth", "11/02/1994").is_err());
    }

    #[test]
    fn json_fields_accept_encoded_strings() {
        let parsed =
            parse_json_field("addresses", &Value::String(r#"[{"city":"Chennai"}]"#.into()))
                .unwrap();
        assert!(parsed.is_array());
        assert!(parse_json_field("addresses", &Value::String("not json".into())).is_err());
    }
}
