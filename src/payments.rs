//! Confirmation signatures for gateway callbacks.
//!
//! A gateway adapter confirms a payment by presenting its reference together
//! with the hex HMAC-SHA256 of `subject \n reference \n amount \n`, where
//! `subject` is the order id (order payment) or the user id (wallet top-up)
//! and `amount` is the charged amount with two decimals.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::domain::value_objects::Money;

type HmacSha256 = Hmac<Sha256>;

fn mac(secret: &str, subject: &str, reference: &str, amount: Money) -> Option<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    let payload = format!("{subject}\n{reference}\n{amount}\n");
    mac.update(payload.as_bytes());
    Some(mac)
}

pub fn sign(secret: &str, subject: &str, reference: &str, amount: Money) -> Option<String> {
    let mac = mac(secret, subject, reference, amount)?;
    Some(hex::encode(mac.finalize().into_bytes()))
}

pub fn verify(secret: &str, subject: &str, reference: &str, amount: Money, signature: &str) -> bool {
    let Ok(bytes) = hex::decode(signature.trim()) else {
        return false;
    };
    mac(secret, subject, reference, amount).is_some_and(|m| m.verify_slice(&bytes).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_binds_subject_reference_and_amount() {
        let amount = Money::from_cents(2500);
        let sig = sign("s3cret", "order-1", "pay_42", amount).unwrap();
        assert_eq!(sig.len(), 64);
        assert!(verify("s3cret", "order-1", "pay_42", amount, &sig));
        assert!(verify("s3cret", "order-1", "pay_42", amount, &sig.to_uppercase()));
        assert!(!verify("s3cret", "order-2", "pay_42", amount, &sig));
        assert!(!verify("s3cret", "order-1", "pay_43", amount, &sig));
        assert!(!verify("s3cret", "order-1", "pay_42", Money::from_cents(2501), &sig));
        assert!(!verify("other", "order-1", "pay_42", amount, &sig));
    }

    #[test]
    fn malformed_signatures_are_rejected() {
        let amount = Money::from_cents(100);
        assert!(!verify("s3cret", "u", "r", amount, "not-hex"));
        assert!(!verify("s3cret", "u", "r", amount, ""));
        assert!(!verify("s3cret", "u", "r", amount, &"0".repeat(64)));
    }
}
