//! Signup, login and the bootstrap admin account.

use uuid::Uuid;

use crate::auth;
use crate::domain::aggregates::user::normalize_email;
use crate::domain::aggregates::{Session, User};
use crate::error::{EcommerceError, Result};
use crate::services::referral;
use crate::state::AppState;

pub struct Signup {
    pub name: String,
    pub email: String,
    pub password: String,
    pub referral_code: Option<String>,
}

pub async fn find_by_email(state: &AppState, email: &str) -> Result<Option<User>> {
    state.store.find_one_by("email", &normalize_email(email)).await
}

pub async fn signup(state: &AppState, req: Signup) -> Result<(User, Session)> {
    if find_by_email(state, &req.email).await?.is_some() {
        return Err(EcommerceError::Conflict("Email already registered".into()));
    }
    let referrer = match req.referral_code.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        Some(code) => Some(referral::find_referrer(state, code).await?),
        None => None,
    };

    let code = unique_referral_code(state).await?;
    let mut user = User::register(
        req.name.trim(),
        &req.email,
        auth::new_credentials(&req.password),
        code,
        referrer.as_ref().map(User::id),
    );
    state.store.put(&user).await?;
    state.events.publish(user.take_events()).await;
    tracing::info!(user_id = %user.id(), referred = referrer.is_some(), "user registered");

    if let Some(referrer) = &referrer {
        referral::reward_signup(state, referrer, &user).await?;
    }
    let session = open_session(state, &user).await?;
    Ok((user, session))
}

pub async fn login(state: &AppState, email: &str, password: &str) -> Result<(User, Session)> {
    let user = find_by_email(state, email).await?.ok_or(EcommerceError::InvalidCredentials)?;
    if !auth::verify_password(&user, password) {
        return Err(EcommerceError::InvalidCredentials);
    }
    if user.is_blocked() {
        return Err(EcommerceError::Blocked);
    }
    let session = open_session(state, &user).await?;
    Ok((user, session))
}

pub async fn logout(state: &AppState, token: Uuid) -> Result<()> {
    state.store.delete::<Session>(token).await?;
    Ok(())
}

/// Every account, oldest first.
pub async fn list_users(state: &AppState) -> Result<Vec<User>> {
    state.store.all().await
}

pub async fn set_blocked(state: &AppState, user_id: Uuid, blocked: bool) -> Result<User> {
    let mut user: User = state.store.get(user_id).await?.ok_or(EcommerceError::UserNotFound)?;
    if blocked {
        user.block()?;
    } else {
        user.unblock();
    }
    state.store.put(&user).await?;
    state.events.publish(user.take_events()).await;
    tracing::info!(%user_id, blocked, "user access changed");
    Ok(user)
}

async fn open_session(state: &AppState, user: &User) -> Result<Session> {
    let session = Session::issue(user.id(), state.config.session_ttl());
    state.store.put(&session).await?;
    Ok(session)
}

async fn unique_referral_code(state: &AppState) -> Result<String> {
    loop {
        let code = auth::generate_referral_code();
        if state.store.find_one_by::<User>("referral_code", &code).await?.is_none() {
            return Ok(code);
        }
    }
}

/// Creates, or promotes, the account named by `ADMIN_EMAIL`/`ADMIN_PASSWORD`.
pub async fn ensure_admin(state: &AppState) -> Result<()> {
    let (Some(email), Some(password)) = (&state.config.admin_email, &state.config.admin_password) else {
        return Ok(());
    };
    let mut admin = match find_by_email(state, email).await? {
        Some(mut existing) => {
            existing.set_credentials(auth::new_credentials(password));
            existing
        }
        None => User::register("Administrator", email, auth::new_credentials(password), unique_referral_code(state).await?, None),
    };
    admin.promote_to_admin();
    state.store.put(&admin).await?;
    tracing::info!(email = %admin.email(), "admin account ready");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn signup_req(email: &str) -> Signup {
        Signup { name: "Grace".into(), email: email.into(), password: "correct horse".into(), referral_code: None }
    }

    #[tokio::test]
    async fn signup_then_login() {
        let state = AppState::in_memory(Config::default());
        let (user, _) = signup(&state, signup_req("Grace@Example.com")).await.unwrap();
        let (again, session) = login(&state, "grace@example.com", "correct horse").await.unwrap();
        assert_eq!(user.id(), again.id());
        assert_eq!(session.user_id, user.id());
        assert!(matches!(login(&state, "grace@example.com", "nope").await, Err(EcommerceError::InvalidCredentials)));
        assert!(matches!(signup(&state, signup_req("grace@example.com")).await, Err(EcommerceError::Conflict(_))));
    }

    #[tokio::test]
    async fn bootstrap_admin() {
        let config = Config {
            admin_email: Some("root@shop.io".into()),
            admin_password: Some("rootpass".into()),
            ..Config::default()
        };
        let state = AppState::in_memory(config);
        ensure_admin(&state).await.unwrap();
        let (admin, _) = login(&state, "root@shop.io", "rootpass").await.unwrap();
        assert!(admin.is_admin());
    }

    #[tokio::test]
    async fn blocked_users_cannot_log_in() {
        let state = AppState::in_memory(Config::default());
        let (user, _) = signup(&state, signup_req("mal@example.com")).await.unwrap();
        set_blocked(&state, user.id(), true).await.unwrap();
        assert!(matches!(login(&state, "mal@example.com", "correct horse").await, Err(EcommerceError::Blocked)));
        set_blocked(&state, user.id(), false).await.unwrap();
        assert!(login(&state, "mal@example.com", "correct horse").await.is_ok());
        assert!(matches!(set_blocked(&state, Uuid::now_v7(), true).await, Err(EcommerceError::UserNotFound)));
    }
}
