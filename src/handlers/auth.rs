//! Authentication endpoints: admin/user login, OTP login, Google sign-in,
//! profile management.

use crate::auth::jwt::{self, TokenKind, ADMIN_TOKEN_DAYS, GOOGLE_TOKEN_DAYS, USER_TOKEN_DAYS};
use crate::auth::{extract::Account, google::GoogleVerifier, otp, password, AuthUser};
use crate::error::AppError;
use crate::handlers::request_base_url;
use crate::handlers::uploads::collect_multipart;
use crate::models::{Admin, User};
use crate::state::AppState;
use axum::extract::{Multipart, State};
use axum::http::HeaderMap;
use axum::{Json, response::IntoResponse};
use chrono::{Duration, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Deserialize)]
pub struct AdminLoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct UserLoginRequest {
    pub email: String,
    pub password: String,
}

/// The combined endpoint takes either shape.
#[derive(Deserialize)]
pub struct CombinedLoginRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Deserialize)]
pub struct SendOtpRequest {
    pub email: Option<String>,
}

#[derive(Deserialize)]
pub struct VerifyOtpRequest {
    pub email: Option<String>,
    /// Clients send this as a string or a bare number.
    pub otp: Option<Value>,
}

#[derive(Deserialize)]
pub struct GoogleLoginRequest {
    pub token: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub join_date: Option<String>,
    pub department: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: Option<String>,
    pub password: String,
}

fn login_body(token: String, user: Value) -> Json<Value> {
    Json(json!({ "success": true, "token": token, "user": user }))
}

async fn find_user_by_email(state: &AppState, email: &str) -> Result<Option<User>, AppError> {
    Ok(sqlx::query_as("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(&state.pool)
        .await?)
}

async fn do_admin_login(
    state: &AppState,
    username: &str,
    plain: &str,
) -> Result<Json<Value>, AppError> {
    let admin: Option<Admin> = sqlx::query_as("SELECT * FROM admins WHERE username = $1")
        .bind(username)
        .fetch_optional(&state.pool)
        .await?;
    let admin = admin.ok_or_else(|| AppError::Unauthorized("Invalid credentials".into()))?;
    if !password::verify(plain, &admin.password) {
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    }

    sqlx::query("UPDATE admins SET last_login = NOW(), updated_at = NOW() WHERE id = $1")
        .bind(admin.id)
        .execute(&state.pool)
        .await?;

    let token = jwt::sign(
        &state.config.jwt_secret,
        admin.id,
        TokenKind::Admin,
        ADMIN_TOKEN_DAYS,
    )?;
    Ok(login_body(token, json!(admin.profile())))
}

async fn do_user_login(
    state: &AppState,
    email: &str,
    plain: &str,
) -> Result<Json<Value>, AppError> {
    let email = email.trim().to_lowercase();
    let user = find_user_by_email(state, &email)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid credentials".into()))?;

    if user.provider == "google" {
        return Err(AppError::BadRequest(
            "Please use Google login for this account".into(),
        ));
    }
    let Some(stored) = &user.password else {
        return Err(AppError::BadRequest(
            "Please set a password for your account or use OTP login".into(),
        ));
    };
    if !password::verify(plain, stored) {
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    }

    let token = jwt::sign(
        &state.config.jwt_secret,
        user.id,
        TokenKind::User,
        USER_TOKEN_DAYS,
    )?;
    Ok(login_body(token, json!(user.profile())))
}

/// POST /api/auth/admin/login
pub async fn admin_login(
    State(state): State<AppState>,
    Json(body): Json<AdminLoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    do_admin_login(&state, &body.username, &body.password).await
}

/// POST /api/auth/user/login
pub async fn user_login(
    State(state): State<AppState>,
    Json(body): Json<UserLoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    do_user_login(&state, &body.email, &body.password).await
}

/// POST /api/auth/login. A username means admin, an email means user.
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<CombinedLoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let plain = body.password.as_deref().unwrap_or_default();
    if let Some(username) = &body.username {
        do_admin_login(&state, username, plain).await
    } else if let Some(email) = &body.email {
        do_user_login(&state, email, plain).await
    } else {
        Err(AppError::BadRequest("Username or email required".into()))
    }
}

/// POST /api/auth/send-otp. Creates the account on first contact.
pub async fn send_otp(
    State(state): State<AppState>,
    Json(body): Json<SendOtpRequest>,
) -> Result<impl IntoResponse, AppError> {
    let email = body
        .email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .ok_or_else(|| AppError::BadRequest("Email is required".into()))?
        .to_lowercase();
    crate::validation::email("email", &email)?;

    let user = match find_user_by_email(&state, &email).await? {
        Some(user) => user,
        None => {
            let created: User = sqlx::query_as(
                r#"
                INSERT INTO users (email, name, role, join_date, provider, status)
                VALUES ($1, '', 'user', CURRENT_DATE, 'email', 'Active')
                RETURNING *
                "#,
            )
            .bind(&email)
            .fetch_one(&state.pool)
            .await?;
            tracing::info!(email = %created.email, "created new user");
            created
        }
    };

    if user.provider == "google" {
        return Err(AppError::BadRequest(
            "Google accounts cannot use OTP login. Please use Google Sign-In.".into(),
        ));
    }

    let code = otp::generate();
    let expires = Utc::now() + Duration::minutes(otp::OTP_TTL_MINUTES);
    sqlx::query("UPDATE users SET otp = $1, otp_expires = $2, updated_at = NOW() WHERE id = $3")
        .bind(&code)
        .bind(expires)
        .bind(user.id)
        .execute(&state.pool)
        .await?;

    // Delivery failure is logged, never surfaced: the code is stored and a
    // retry costs nothing.
    if let Err(e) = state.mailer.send_otp(&email, &code).await {
        tracing::error!(error = %e, email = %email, "failed to send OTP email");
    }

    Ok(Json(json!({
        "success": true,
        "message": "OTP sent to your email",
        "email": email,
    })))
}

/// POST /api/auth/verify-otp
pub async fn verify_otp(
    State(state): State<AppState>,
    Json(body): Json<VerifyOtpRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (Some(email), Some(code)) = (body.email.as_deref(), body.otp.as_ref()) else {
        return Err(AppError::BadRequest("Email and OTP are required".into()));
    };
    let email = email.trim().to_lowercase();
    let code = match code {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return Err(AppError::BadRequest("Email and OTP are required".into())),
    };

    let user = find_user_by_email(&state, &email)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    let (Some(stored), Some(expires)) = (&user.otp, user.otp_expires) else {
        return Err(AppError::BadRequest(
            "No OTP found. Please request a new OTP.".into(),
        ));
    };
    if *stored != code {
        return Err(AppError::BadRequest("Invalid OTP".into()));
    }
    if Utc::now() > expires {
        return Err(AppError::BadRequest(
            "OTP has expired. Please request a new OTP.".into(),
        ));
    }

    let user: User = sqlx::query_as(
        "UPDATE users SET otp = NULL, otp_expires = NULL, is_verified = TRUE, updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(user.id)
    .fetch_one(&state.pool)
    .await?;

    let token = jwt::sign(
        &state.config.jwt_secret,
        user.id,
        TokenKind::User,
        USER_TOKEN_DAYS,
    )?;
    Ok(Json(json!({
        "success": true,
        "message": "OTP verified successfully",
        "token": token,
        "user": user.profile(),
    })))
}

/// POST /api/auth/google: verify the ID token, create or refresh the
/// account, log them in.
pub async fn google_login(
    State(state): State<AppState>,
    Json(body): Json<GoogleLoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let client_id = state.config.google_client_id.clone().ok_or_else(|| {
        tracing::warn!("GOOGLE_CLIENT_ID not configured");
        AppError::Unauthorized("Google authentication failed".into())
    })?;
    let identity = GoogleVerifier::new(client_id).verify(&body.token).await?;
    let email = identity.email.trim().to_lowercase();

    let existing = find_user_by_email(&state, &email).await?;
    let is_new_user = existing.is_none();
    let user: User = match existing {
        None => {
            sqlx::query_as(
                r#"
                INSERT INTO users (email, name, avatar, role, join_date, provider, is_verified, status)
                VALUES ($1, COALESCE($2, ''), COALESCE($3, ''), 'user', CURRENT_DATE, 'google', TRUE, 'Active')
                RETURNING *
                "#,
            )
            .bind(&email)
            .bind(&identity.name)
            .bind(&identity.picture)
            .fetch_one(&state.pool)
            .await?
        }
        Some(user) => {
            sqlx::query_as(
                r#"
                UPDATE users SET
                    provider = 'google',
                    name = COALESCE($1, name),
                    avatar = COALESCE($2, avatar),
                    is_verified = TRUE,
                    updated_at = NOW()
                WHERE id = $3
                RETURNING *
                "#,
            )
            .bind(&identity.name)
            .bind(&identity.picture)
            .bind(user.id)
            .fetch_one(&state.pool)
            .await?
        }
    };

    let token = jwt::sign(
        &state.config.jwt_secret,
        user.id,
        TokenKind::User,
        GOOGLE_TOKEN_DAYS,
    )?;
    Ok(Json(json!({
        "success": true,
        "token": token,
        "isNewUser": is_new_user || !user.profile_complete(),
        "user": user.profile(),
    })))
}

/// GET /api/auth/profile
pub async fn get_profile(auth: AuthUser) -> Json<Value> {
    match &auth.account {
        Account::Admin(admin) => Json(json!(admin.profile())),
        Account::User(user) => Json(json!(user.profile())),
    }
}

fn parse_join_date(raw: &str) -> Result<NaiveDate, AppError> {
    let day = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .map_err(|_| AppError::Validation("joinDate must be a YYYY-MM-DD date".into()))
}

/// PUT /api/auth/profile
pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    let join_date = body.join_date.as_deref().map(parse_join_date).transpose()?;
    let email = crate::validation::normalize_email(body.email.as_deref());

    match &auth.account {
        Account::User(user) => {
            // A phone number identifies one account.
            if let Some(phone) = body.phone.as_deref().map(str::trim) {
                if !phone.is_empty() && Some(phone) != user.phone.as_deref() {
                    let taken: Option<(i64,)> =
                        sqlx::query_as("SELECT id FROM users WHERE phone = $1 AND id <> $2")
                            .bind(phone)
                            .bind(user.id)
                            .fetch_optional(&state.pool)
                            .await?;
                    if taken.is_some() {
                        return Err(AppError::BadRequest(
                            "This phone number is already registered with another account".into(),
                        ));
                    }
                }
            }
            let updated: User = sqlx::query_as(
                r#"
                UPDATE users SET
                    name = COALESCE($1, name),
                    email = COALESCE($2, email),
                    phone = COALESCE($3, phone),
                    join_date = COALESCE($4, join_date),
                    updated_at = NOW()
                WHERE id = $5
                RETURNING *
                "#,
            )
            .bind(&body.name)
            .bind(&email)
            .bind(&body.phone)
            .bind(join_date)
            .bind(user.id)
            .fetch_one(&state.pool)
            .await?;
            Ok(Json(json!(updated.profile())))
        }
        Account::Admin(admin) => {
            let updated: Admin = sqlx::query_as(
                r#"
                UPDATE admins SET
                    name = COALESCE($1, name),
                    email = COALESCE($2, email),
                    phone = COALESCE($3, phone),
                    department = COALESCE($4, department),
                    join_date = COALESCE($5, join_date),
                    updated_at = NOW()
                WHERE id = $6
                RETURNING *
                "#,
            )
            .bind(&body.name)
            .bind(&email)
            .bind(&body.phone)
            .bind(&body.department)
            .bind(join_date)
            .bind(admin.id)
            .fetch_one(&state.pool)
            .await?;
            Ok(Json(json!(updated.profile())))
        }
    }
}

/// PUT /api/auth/change-password
pub async fn change_password(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    match &auth.account {
        Account::User(user) => {
            if user.provider == "google" {
                return Err(AppError::BadRequest(
                    "Google accounts cannot change password here".into(),
                ));
            }
            let message = match &user.password {
                // OTP-only accounts set their first password without a
                // current-password check.
                None => "Password set successfully.",
                Some(stored) => {
                    let current = body.current_password.as_deref().unwrap_or_default();
                    if !password::verify(current, stored) {
                        return Err(AppError::BadRequest("Incorrect current password.".into()));
                    }
                    "Password successfully changed."
                }
            };
            let hashed = password::hash(&body.password)?;
            sqlx::query("UPDATE users SET password = $1, updated_at = NOW() WHERE id = $2")
                .bind(&hashed)
                .bind(user.id)
                .execute(&state.pool)
                .await?;
            Ok(Json(json!({ "message": message })))
        }
        Account::Admin(admin) => {
            let current = body.current_password.as_deref().unwrap_or_default();
            if !password::verify(current, &admin.password) {
                return Err(AppError::BadRequest("Incorrect current password.".into()));
            }
            let hashed = password::hash(&body.password)?;
            sqlx::query("UPDATE admins SET password = $1, updated_at = NOW() WHERE id = $2")
                .bind(&hashed)
                .bind(admin.id)
                .execute(&state.pool)
                .await?;
            Ok(Json(json!({ "message": "Password successfully changed." })))
        }
    }
}

/// POST /api/auth/upload-avatar (multipart)
pub async fn upload_avatar(
    State(state): State<AppState>,
    auth: AuthUser,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let form = collect_multipart(&mut multipart, &state.config.uploads_dir, "avatars").await?;
    let Some(path) = form.files.first() else {
        return Err(AppError::BadRequest("No file uploaded".into()));
    };
    let base = request_base_url(&headers, &state.config);
    let avatar = format!("{base}/{path}");

    let user_json = match &auth.account {
        Account::User(user) => {
            let updated: User = sqlx::query_as(
                "UPDATE users SET avatar = $1, updated_at = NOW() WHERE id = $2 RETURNING *",
            )
            .bind(&avatar)
            .bind(user.id)
            .fetch_one(&state.pool)
            .await?;
            json!(updated.profile())
        }
        Account::Admin(admin) => {
            let updated: Admin = sqlx::query_as(
                "UPDATE admins SET avatar = $1, updated_at = NOW() WHERE id = $2 RETURNING *",
            )
            .bind(&avatar)
            .bind(admin.id)
            .fetch_one(&state.pool)
            .await?;
            json!(updated.profile())
        }
    };
    Ok(Json(json!({ "success": true, "user": user_json })))
}
