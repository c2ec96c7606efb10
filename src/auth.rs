//! Password hashing, bearer sessions and the auth middleware.

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use rand::{distributions::Alphanumeric, Rng};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::domain::aggregates::{Credentials, Session, User};
use crate::error::{EcommerceError, Result};
use crate::state::AppState;

const HASH_ROUNDS: u32 = 10_000;

/// The authenticated caller, inserted into request extensions by
/// [`require_user`].
#[derive(Clone, Debug)]
pub struct CurrentUser(pub User);

pub fn hash_password(password: &str, salt: &str) -> String {
    let mut digest = Sha256::new()
        .chain_update(salt.as_bytes())
        .chain_update(password.as_bytes())
        .finalize();
    for _ in 1..HASH_ROUNDS {
        digest = Sha256::new().chain_update(salt.as_bytes()).chain_update(digest).finalize();
    }
    hex::encode(digest)
}

pub fn new_credentials(password: &str) -> Credentials {
    let salt: [u8; 16] = rand::thread_rng().gen();
    let salt = hex::encode(salt);
    Credentials { password_hash: hash_password(password, &salt), salt }
}

pub fn verify_password(user: &User, password: &str) -> bool {
    let candidate = hash_password(password, user.salt());
    let stored = user.password_hash().as_bytes();
    candidate.len() == stored.len()
        && candidate.as_bytes().iter().zip(stored).fold(0u8, |acc, (a, b)| acc | (a ^ b)) == 0
}

pub fn generate_referral_code() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(|b| (b as char).to_ascii_uppercase())
        .collect()
}

/// The session token of an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<Uuid> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ").or_else(|| value.strip_prefix("bearer "))?;
    Uuid::parse_str(token.trim()).ok()
}

/// Resolves a session token to an active, unblocked user.
pub async fn authenticate(state: &AppState, token: Uuid) -> Result<User> {
    let session: Session = state.store.get(token).await?.ok_or(EcommerceError::Unauthorized)?;
    if session.is_expired(Utc::now()) {
        state.store.delete::<Session>(token).await?;
        return Err(EcommerceError::Unauthorized);
    }
    let user: User = state.store.get(session.user_id).await?.ok_or(EcommerceError::Unauthorized)?;
    if user.is_blocked() {
        return Err(EcommerceError::Blocked);
    }
    Ok(user)
}

pub async fn require_user(State(state): State<AppState>, mut req: Request, next: Next) -> Result<Response> {
    let token = bearer_token(req.headers()).ok_or(EcommerceError::Unauthorized)?;
    let user = authenticate(&state, token).await?;
    req.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(req).await)
}

/// Must run inside [`require_user`].
pub async fn require_admin(req: Request, next: Next) -> Result<Response> {
    match req.extensions().get::<CurrentUser>() {
        Some(CurrentUser(user)) if user.is_admin() => Ok(next.run(req).await),
        Some(_) => Err(EcommerceError::Forbidden),
        None => Err(EcommerceError::Unauthorized),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_is_salted_and_verifiable() {
        let creds = new_credentials("hunter22");
        let other = new_credentials("hunter22");
        assert_ne!(creds.password_hash, other.password_hash);
        let user = User::register("T", "t@x.io", creds, generate_referral_code(), None);
        assert!(verify_password(&user, "hunter22"));
        assert!(!verify_password(&user, "hunter23"));
    }

    #[tokio::test]
    async fn expired_sessions_are_rejected_and_removed() {
        let state = AppState::in_memory(crate::config::Config::default());
        let user = User::register("T", "t@x.io", new_credentials("hunter22"), generate_referral_code(), None);
        state.store.put(&user).await.unwrap();
        let live = Session::issue(user.id(), chrono::Duration::hours(1));
        let stale = Session { id: Uuid::new_v4(), user_id: user.id(), expires_at: Utc::now() - chrono::Duration::minutes(1) };
        state.store.put(&live).await.unwrap();
        state.store.put(&stale).await.unwrap();

        assert_eq!(authenticate(&state, live.id).await.unwrap().id(), user.id());
        assert!(matches!(authenticate(&state, stale.id).await, Err(EcommerceError::Unauthorized)));
        let gone: Option<Session> = state.store.get(stale.id).await.unwrap();
        assert!(gone.is_none());
        assert!(matches!(authenticate(&state, stale.id).await, Err(EcommerceError::Unauthorized)));
    }

    #[test]
    fn referral_codes_are_upper_alphanumeric() {
        let code = generate_referral_code();
        assert_eq!(code.len(), 8);
        assert!(code.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }
}
