//! Signup, login and the caller's own profile.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::validated;
use crate::auth::{self, CurrentUser};
use crate::domain::aggregates::{Address, Role, Session, User};
use crate::error::{EcommerceError, Result};
use crate::services::accounts;
use crate::state::AppState;

/// A user as returned over the API; credentials never leave the store.
#[derive(Debug, Serialize)]
pub struct UserView {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub blocked: bool,
    pub referral_code: String,
    pub referred_by: Option<Uuid>,
    pub addresses: Vec<Address>,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserView {
    fn from(u: &User) -> Self {
        Self {
            id: u.id(),
            name: u.name().to_string(),
            email: u.email().to_string(),
            role: u.role(),
            blocked: u.is_blocked(),
            referral_code: u.referral_code().to_string(),
            referred_by: u.referred_by(),
            addresses: u.addresses().to_vec(),
            created_at: u.created_at(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub token: Uuid,
    pub expires_at: DateTime<Utc>,
    pub user: UserView,
}

impl SessionResponse {
    fn new(user: &User, session: Session) -> Self {
        Self { token: session.id, expires_at: session.expires_at, user: user.into() }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    pub referral_code: Option<String>,
}

pub async fn signup(State(s): State<AppState>, Json(r): Json<SignupRequest>) -> Result<(StatusCode, Json<SessionResponse>)> {
    let r = validated(r)?;
    let (user, session) = accounts::signup(&s, accounts::Signup {
        name: r.name,
        email: r.email,
        password: r.password,
        referral_code: r.referral_code,
    })
    .await?;
    Ok((StatusCode::CREATED, Json(SessionResponse::new(&user, session))))
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

pub async fn login(State(s): State<AppState>, Json(r): Json<LoginRequest>) -> Result<Json<SessionResponse>> {
    let r = validated(r)?;
    let (user, session) = accounts::login(&s, &r.email, &r.password).await?;
    tracing::info!(user_id = %user.id(), "user logged in");
    Ok(Json(SessionResponse::new(&user, session)))
}

pub async fn logout(State(s): State<AppState>, headers: HeaderMap) -> Result<StatusCode> {
    let token = auth::bearer_token(&headers).ok_or(EcommerceError::Unauthorized)?;
    accounts::logout(&s, token).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn me(Extension(CurrentUser(user)): Extension<CurrentUser>) -> Json<UserView> {
    Json((&user).into())
}

pub async fn list_addresses(Extension(CurrentUser(user)): Extension<CurrentUser>) -> Json<Vec<Address>> {
    Json(user.addresses().to_vec())
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddressRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 1, max = 200))]
    pub line1: String,
    pub line2: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub city: String,
    pub state: Option<String>,
    #[validate(length(min = 3, max = 12))]
    pub zip: String,
    #[validate(length(min = 2, max = 60))]
    pub country: String,
    #[validate(length(min = 7, max = 20))]
    pub phone: Option<String>,
}

pub async fn add_address(
    State(s): State<AppState>,
    Extension(CurrentUser(mut user)): Extension<CurrentUser>,
    Json(r): Json<AddressRequest>,
) -> Result<(StatusCode, Json<Address>)> {
    let r = validated(r)?;
    let address = user
        .add_address(Address {
            id: Uuid::nil(),
            name: r.name,
            line1: r.line1,
            line2: r.line2,
            city: r.city,
            state: r.state,
            zip: r.zip,
            country: r.country,
            phone: r.phone,
        })
        .clone();
    s.store.put(&user).await?;
    Ok((StatusCode::CREATED, Json(address)))
}

pub async fn remove_address(
    State(s): State<AppState>,
    Extension(CurrentUser(mut user)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    user.remove_address(id)?;
    s.store.put(&user).await?;
    Ok(StatusCode::NO_CONTENT)
}
