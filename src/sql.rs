//! Parameterized SQL assembly for dynamic list queries.

use serde_json::Value;
use sqlx::encode::{Encode, IsNull};
use sqlx::postgres::{PgArguments, PgTypeInfo, Postgres};
use sqlx::Database;

/// A value bound to a PostgreSQL placeholder. One enum so heterogeneous
/// filter values can live in a single `Vec`.
#[derive(Clone, Debug)]
pub enum PgArg {
    Null,
    Bool(bool),
    I64(i64),
    F64(f64),
    Text(String),
    Json(Value),
}

impl<'q> Encode<'q, Postgres> for PgArg {
    fn encode_by_ref(
        &self,
        buf: &mut <Postgres as Database>::ArgumentBuffer<'q>,
    ) -> Result<IsNull, Box<dyn std::error::Error + Send + Sync>> {
        Ok(match self {
            PgArg::Null => <Option<&str> as Encode<Postgres>>::encode_by_ref(&None, buf)?,
            PgArg::Bool(b) => <bool as Encode<Postgres>>::encode_by_ref(b, buf)?,
            PgArg::I64(n) => <i64 as Encode<Postgres>>::encode_by_ref(n, buf)?,
            PgArg::F64(n) => <f64 as Encode<Postgres>>::encode_by_ref(n, buf)?,
            PgArg::Text(s) => {
                let s: &str = s.as_str();
                <&str as Encode<Postgres>>::encode_by_ref(&s, buf)?
            }
            PgArg::Json(v) => <Value as Encode<Postgres>>::encode_by_ref(v, buf)?,
        })
    }

    fn produces(&self) -> Option<PgTypeInfo> {
        Some(match self {
            PgArg::Null | PgArg::Text(_) => PgTypeInfo::with_name("TEXT"),
            PgArg::Bool(_) => PgTypeInfo::with_name("BOOL"),
            PgArg::I64(_) => PgTypeInfo::with_name("INT8"),
            PgArg::F64(_) => PgTypeInfo::with_name("FLOAT8"),
            PgArg::Json(_) => PgTypeInfo::with_name("JSONB"),
        })
    }
}

impl sqlx::Type<Postgres> for PgArg {
    fn type_info() -> PgTypeInfo {
        PgTypeInfo::with_name("TEXT")
    }
}

/// SQL text plus its bind values, grown incrementally while composing a
/// WHERE clause.
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<PgArg>,
    conditions: Vec<String>,
}

impl QueryBuf {
    pub fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
            conditions: Vec::new(),
        }
    }

    /// Register a bind value; returns its 1-based placeholder number.
    pub fn push(&mut self, arg: PgArg) -> usize {
        self.params.push(arg);
        self.params.len()
    }

    /// Add a condition with one bind value. `{}` in the fragment is
    /// replaced with the placeholder (e.g. `"status = {}"`).
    pub fn condition(&mut self, fragment: &str, arg: PgArg) {
        let n = self.push(arg);
        self.conditions
            .push(fragment.replace("{}", &format!("${n}")));
    }

    /// Add a condition with no bind value.
    pub fn raw_condition(&mut self, fragment: &str) {
        self.conditions.push(fragment.to_string());
    }

    /// ` WHERE a AND b AND c`, or empty when no conditions were added.
    pub fn where_clause(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.conditions.join(" AND "))
        }
    }

    /// An `(a OR b OR c)` group binding the same value for each fragment.
    pub fn any_of(&mut self, fragments: &[&str], arg: PgArg) {
        let n = self.push(arg);
        let parts: Vec<String> = fragments
            .iter()
            .map(|f| f.replace("{}", &format!("${n}")))
            .collect();
        self.conditions.push(format!("({})", parts.join(" OR ")));
    }

    pub fn query(&self) -> sqlx::query::Query<'_, Postgres, PgArguments> {
        let mut q = sqlx::query(&self.sql);
        for p in &self.params {
            q = q.bind(p.clone());
        }
        q
    }

    pub fn query_as<T>(&self) -> sqlx::query::QueryAs<'_, Postgres, T, PgArguments>
    where
        T: for<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow>,
    {
        let mut q = sqlx::query_as(&self.sql);
        for p in &self.params {
            q = q.bind(p.clone());
        }
        q
    }

    pub fn query_scalar<T>(&self) -> sqlx::query::QueryScalar<'_, Postgres, T, PgArguments>
    where
        (T,): for<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow>,
    {
        let mut q = sqlx::query_scalar(&self.sql);
        for p in &self.params {
            q = q.bind(p.clone());
        }
        q
    }
}

impl Default for QueryBuf {
    fn default() -> Self {
        Self::new()
    }
}

/// `%term%` pattern for ILIKE filters.
pub fn like_pattern(term: &str) -> String {
    format!("%{}%", term.replace('%', "\\%").replace('_', "\\_"))
}

/// ORDER BY clause from client sort params. `allowed` maps API names to
/// column names; anything else falls back to `default_col`. Direction is
/// ASC only when explicitly requested.
pub fn order_by(
    sort_by: Option<&str>,
    sort_order: Option<&str>,
    allowed: &[(&str, &str)],
    default_col: &str,
) -> String {
    let col = sort_by
        .and_then(|s| {
            allowed
                .iter()
                .find(|(api, _)| api.eq_ignore_ascii_case(s))
                .map(|(_, col)| *col)
        })
        .unwrap_or(default_col);
    let dir = match sort_order {
        Some(s) if s.eq_ignore_ascii_case("asc") => "ASC",
        _ => "DESC",
    };
    format!(" ORDER BY {col} {dir}")
}

/// LIMIT/OFFSET from 1-based page params.
pub fn limit_offset(page: u32, limit: u32) -> String {
    let limit = limit.clamp(1, 1000);
    let offset = (page.max(1) - 1) * limit;
    format!(" LIMIT {limit} OFFSET {offset}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conditions_number_placeholders_in_order() {
        let mut q = QueryBuf::new();
        q.condition("status = {}", PgArg::Text("active".into()));
        q.condition("featured = {}", PgArg::Bool(true));
        assert_eq!(q.where_clause(), " WHERE status = $1 AND featured = $2");
        assert_eq!(q.params.len(), 2);
    }

    #[test]
    fn empty_where_clause_is_empty() {
        let q = QueryBuf::new();
        assert_eq!(q.where_clause(), "");
    }

    #[test]
    fn any_of_binds_one_param_for_all_branches() {
        let mut q = QueryBuf::new();
        q.any_of(
            &["name ILIKE {}", "brand ILIKE {}"],
            PgArg::Text("%silk%".into()),
        );
        assert_eq!(q.where_clause(), " WHERE (name ILIKE $1 OR brand ILIKE $1)");
        assert_eq!(q.params.len(), 1);
    }

    #[test]
    fn order_by_rejects_unknown_columns() {
        let allowed = [("createdAt", "created_at"), ("name", "name")];
        assert_eq!(
            order_by(Some("createdAt"), Some("asc"), &allowed, "created_at"),
            " ORDER BY created_at ASC"
        );
        assert_eq!(
            order_by(Some("password; DROP"), None, &allowed, "created_at"),
            " ORDER BY created_at DESC"
        );
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[test]
    fn limit_offset_is_one_based() {
        assert_eq!(limit_offset(1, 10), " LIMIT 10 OFFSET 0");
        assert_eq!(limit_offset(3, 10), " LIMIT 10 OFFSET 20");
    }
}
