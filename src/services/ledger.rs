//! Wallet ledger operations shared by checkout, refunds, referrals and
//! top-ups.

use uuid::Uuid;

use crate::domain::aggregates::{Entry, TransactionSource, Wallet, WalletTransaction};
use crate::domain::value_objects::Money;
use crate::error::{EcommerceError, Result};
use crate::payments;
use crate::state::AppState;

/// The user's wallet, opened empty on first access.
pub async fn wallet(state: &AppState, user_id: Uuid) -> Result<Wallet> {
    Ok(state.store.get(user_id).await?.unwrap_or_else(|| Wallet::open(user_id)))
}

pub async fn balance(state: &AppState, user_id: Uuid) -> Result<Money> {
    Ok(wallet(state, user_id).await?.balance())
}

pub async fn credit(state: &AppState, user_id: Uuid, entry: Entry) -> Result<WalletTransaction> {
    let mut w = wallet(state, user_id).await?;
    let txn = w.credit(entry)?.clone();
    persist(state, &mut w).await?;
    tracing::info!(%user_id, amount = %txn.amount, source = %txn.source, balance = %txn.balance_after, "wallet credited");
    Ok(txn)
}

pub async fn debit(state: &AppState, user_id: Uuid, entry: Entry) -> Result<WalletTransaction> {
    let mut w = wallet(state, user_id).await?;
    let txn = w.debit(entry)?.clone();
    persist(state, &mut w).await?;
    tracing::info!(%user_id, amount = %txn.amount, source = %txn.source, balance = %txn.balance_after, "wallet debited");
    Ok(txn)
}

/// Adds gateway-confirmed funds. The signature covers the user id, the
/// gateway reference and the amount; a reference is only ever credited once.
pub async fn top_up(state: &AppState, user_id: Uuid, amount: Money, reference: &str, signature: &str) -> Result<WalletTransaction> {
    if !payments::verify(&state.config.payment_signing_secret, &user_id.to_string(), reference, amount, signature) {
        tracing::warn!(%user_id, "top-up signature mismatch");
        return Err(EcommerceError::InvalidSignature);
    }
    let w = wallet(state, user_id).await?;
    let seen = w
        .transactions()
        .iter()
        .any(|t| t.source == TransactionSource::TopUp && t.reference.as_deref() == Some(reference));
    if seen {
        return Err(EcommerceError::Conflict("Top-up already credited".into()));
    }
    credit(state, user_id, Entry {
        amount,
        source: TransactionSource::TopUp,
        order_id: None,
        reference: Some(reference.to_string()),
        description: "Wallet top-up".into(),
    })
    .await
}

async fn persist(state: &AppState, w: &mut Wallet) -> Result<()> {
    state.store.put(&*w).await?;
    state.events.publish(w.take_events()).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::domain::aggregates::WalletError;

    fn entry(cents: i64, source: TransactionSource) -> Entry {
        Entry { amount: Money::from_cents(cents), source, order_id: None, reference: None, description: "t".into() }
    }

    #[tokio::test]
    async fn credits_and_debits_persist() {
        let state = AppState::in_memory(Config::default());
        let user = Uuid::now_v7();
        assert_eq!(wallet(&state, user).await.unwrap().balance(), Money::ZERO);

        credit(&state, user, entry(2000, TransactionSource::TopUp)).await.unwrap();
        let t = debit(&state, user, entry(750, TransactionSource::OrderPayment)).await.unwrap();
        assert_eq!(t.balance_after, Money::from_cents(1250));

        let err = debit(&state, user, entry(5000, TransactionSource::OrderPayment)).await.unwrap_err();
        assert!(matches!(err, EcommerceError::Wallet(WalletError::InsufficientBalance { .. })));

        let w = wallet(&state, user).await.unwrap();
        assert_eq!(w.balance(), Money::from_cents(1250));
        assert_eq!(w.transactions().len(), 2);
        assert_eq!(w.replayed_balance(), w.balance());
    }

    #[tokio::test]
    async fn top_up_needs_a_valid_signature_once() {
        let state = AppState::in_memory(Config::default());
        let user = Uuid::now_v7();
        let secret = state.config.payment_signing_secret.clone();
        let sig = payments::sign(&secret, &user.to_string(), "pay_1", Money::from_cents(500)).unwrap();

        let bad = top_up(&state, user, Money::from_cents(500), "pay_1", "deadbeef").await.unwrap_err();
        assert!(matches!(bad, EcommerceError::InvalidSignature));
        let inflated = top_up(&state, user, Money::from_cents(1_000_000), "pay_1", &sig).await.unwrap_err();
        assert!(matches!(inflated, EcommerceError::InvalidSignature));

        let t = top_up(&state, user, Money::from_cents(500), "pay_1", &sig).await.unwrap();
        assert_eq!(t.source, TransactionSource::TopUp);
        let dup = top_up(&state, user, Money::from_cents(500), "pay_1", &sig).await.unwrap_err();
        assert!(matches!(dup, EcommerceError::Conflict(_)));
        assert_eq!(wallet(&state, user).await.unwrap().balance(), Money::from_cents(500));
    }
}
