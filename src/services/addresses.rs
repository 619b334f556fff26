//! Saved addresses: owner-scoped CRUD with single-default bookkeeping.

use crate::error::AppError;
use crate::models::address::{Address, ADDRESS_TYPES};
use crate::sql::{PgArg, QueryBuf};
use crate::validation;
use serde::Deserialize;
use sqlx::PgPool;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressInput {
    pub name: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub country: Option<String>,
    pub phone: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}

/// Field rules carried over from the original model validations.
fn validate_fields(input: &AddressInput, creating: bool) -> Result<(), AppError> {
    if creating {
        validation::required("name", input.name.as_deref())?;
        validation::required("street", input.street.as_deref())?;
        validation::required("city", input.city.as_deref())?;
        validation::required("state", input.state.as_deref())?;
        validation::required("zip", input.zip.as_deref())?;
        validation::required("phone", input.phone.as_deref())?;
    }
    if let Some(name) = input.name.as_deref() {
        validation::length("name", name, 2, 255)?;
    }
    if let Some(city) = input.city.as_deref() {
        validation::length("city", city, 2, 100)?;
    }
    if let Some(state) = input.state.as_deref() {
        validation::length("state", state, 2, 100)?;
    }
    if let Some(zip) = input.zip.as_deref() {
        validation::length("zip", zip, 3, 20)?;
    }
    if let Some(phone) = input.phone.as_deref() {
        validation::length("phone", phone, 10, 20)?;
    }
    if let Some(kind) = input.kind.as_deref() {
        validation::one_of("type", kind, &ADDRESS_TYPES)?;
    }
    Ok(())
}

pub struct AddressService;

impl AddressService {
    /// Default address first, then newest.
    pub async fn list(pool: &PgPool, user_id: i64) -> Result<Vec<Address>, AppError> {
        Ok(sqlx::query_as(
            "SELECT * FROM addresses WHERE user_id = $1 ORDER BY is_default DESC, created_at DESC",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?)
    }

    pub async fn get(
        pool: &PgPool,
        user_id: i64,
        address_id: i64,
    ) -> Result<Option<Address>, AppError> {
        Ok(
            sqlx::query_as("SELECT * FROM addresses WHERE id = $1 AND user_id = $2")
                .bind(address_id)
                .bind(user_id)
                .fetch_optional(pool)
                .await?,
        )
    }

    pub async fn get_default(pool: &PgPool, user_id: i64) -> Result<Option<Address>, AppError> {
        Ok(
            sqlx::query_as("SELECT * FROM addresses WHERE user_id = $1 AND is_default")
                .bind(user_id)
                .fetch_optional(pool)
                .await?,
        )
    }

    pub async fn create(
        pool: &PgPool,
        user_id: i64,
        input: &AddressInput,
    ) -> Result<Address, AppError> {
        validate_fields(input, true)?;

        let mut tx = pool.begin().await?;
        if input.is_default {
            sqlx::query("UPDATE addresses SET is_default = FALSE, updated_at = NOW() WHERE user_id = $1 AND is_default")
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
        }
        let address: Address = sqlx::query_as(
            r#"
            INSERT INTO addresses (user_id, name, street, city, state, zip, country, phone, "type", is_default)
            VALUES ($1, $2, $3, $4, $5, $6, COALESCE($7, 'United States'), $8, COALESCE($9, 'home'), $10)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(&input.name)
        .bind(&input.street)
        .bind(&input.city)
        .bind(&input.state)
        .bind(&input.zip)
        .bind(&input.country)
        .bind(&input.phone)
        .bind(&input.kind)
        .bind(input.is_default)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(address)
    }

    pub async fn update(
        pool: &PgPool,
        user_id: i64,
        address_id: i64,
        input: &AddressInput,
    ) -> Result<Address, AppError> {
        validate_fields(input, false)?;

        let mut tx = pool.begin().await?;
        let existing: Option<Address> =
            sqlx::query_as("SELECT * FROM addresses WHERE id = $1 AND user_id = $2 FOR UPDATE")
                .bind(address_id)
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await?;
        if existing.is_none() {
            return Err(AppError::NotFound("Address not found".into()));
        }

        if input.is_default {
            sqlx::query(
                "UPDATE addresses SET is_default = FALSE, updated_at = NOW() WHERE user_id = $1 AND is_default AND id <> $2",
            )
            .bind(user_id)
            .bind(address_id)
            .execute(&mut *tx)
            .await?;
        }

        let mut q = QueryBuf::new();
        let mut sets: Vec<String> = Vec::new();
        fn set(q: &mut QueryBuf, sets: &mut Vec<String>, column: &str, value: &Option<String>) {
            if let Some(v) = value {
                let n = q.push(PgArg::Text(v.clone()));
                sets.push(format!("{column} = ${n}"));
            }
        }
        set(&mut q, &mut sets, "name", &input.name);
        set(&mut q, &mut sets, "street", &input.street);
        set(&mut q, &mut sets, "city", &input.city);
        set(&mut q, &mut sets, "state", &input.state);
        set(&mut q, &mut sets, "zip", &input.zip);
        set(&mut q, &mut sets, "country", &input.country);
        set(&mut q, &mut sets, "phone", &input.phone);
        set(&mut q, &mut sets, "\"type\"", &input.kind);
        if input.is_default {
            sets.push("is_default = TRUE".into());
        }
        sets.push("updated_at = NOW()".into());

        let id_param = q.push(PgArg::I64(address_id));
        let user_param = q.push(PgArg::I64(user_id));
        q.sql = format!(
            "UPDATE addresses SET {} WHERE id = ${id_param} AND user_id = ${user_param} RETURNING *",
            sets.join(", ")
        );
        let address: Address = q.query_as().fetch_one(&mut *tx).await?;
        tx.commit().await?;
        Ok(address)
    }

    pub async fn set_default(
        pool: &PgPool,
        user_id: i64,
        address_id: i64,
    ) -> Result<Address, AppError> {
        let mut tx = pool.begin().await?;
        let existing: Option<(i64,)> =
            sqlx::query_as("SELECT id FROM addresses WHERE id = $1 AND user_id = $2 FOR UPDATE")
                .bind(address_id)
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await?;
        if existing.is_none() {
            return Err(AppError::NotFound("Address not found".into()));
        }
        sqlx::query(
            "UPDATE addresses SET is_default = FALSE, updated_at = NOW() WHERE user_id = $1 AND is_default AND id <> $2",
        )
        .bind(user_id)
        .bind(address_id)
        .execute(&mut *tx)
        .await?;
        let address: Address = sqlx::query_as(
            "UPDATE addresses SET is_default = TRUE, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(address_id)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(address)
    }

    /// Delete; when the default is removed the newest remaining address
    /// becomes the default.
    pub async fn delete(pool: &PgPool, user_id: i64, address_id: i64) -> Result<(), AppError> {
        let mut tx = pool.begin().await?;
        let existing: Option<Address> =
            sqlx::query_as("SELECT * FROM addresses WHERE id = $1 AND user_id = $2 FOR UPDATE")
                .bind(address_id)
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await?;
        let existing = existing.ok_or_else(|| AppError::NotFound("Address not found".into()))?;

        sqlx::query("DELETE FROM addresses WHERE id = $1")
            .bind(address_id)
            .execute(&mut *tx)
            .await?;

        if existing.is_default {
            sqlx::query(
                r#"
                UPDATE addresses SET is_default = TRUE, updated_at = NOW()
                WHERE id = (SELECT id FROM addresses WHERE user_id = $1 ORDER BY created_at DESC LIMIT 1)
                "#,
            )
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_input() -> AddressInput {
        AddressInput {
            name: Some("Asha Rao".into()),
            street: Some("12 Marine Drive".into()),
            city: Some("Chennai".into()),
            state: Some("Tamil Nadu".into()),
            zip: Some("600042".into()),
            country: None,
            phone: Some("9876543210".into()),
            kind: Some("home".into()),
            is_default: false,
        }
    }

    #[test]
    fn complete_input_passes_validation() {
        assert!(validate_fields(&full_input(), true).is_ok());
    }

    #[test]
    fn creation_requires_all_core_fields() {
        let mut input = full_input();
        input.street = None;
        assert!(validate_fields(&input, true).is_err());
        // Partial update may omit fields entirely.
        assert!(validate_fields(&input, false).is_ok());
    }

    #[test]
    fn short_phone_is_rejected_even_on_update() {
        let mut input = full_input();
        input.phone = Some("12345".into());
        assert!(validate_fields(&input, false).is_err());
    }

    #[test]
    fn unknown_type_is_rejected() {
        let mut input = full_input();
        input.kind = Some("office".into());
        assert!(validate_fields(&input, true).is_err());
    }
}
