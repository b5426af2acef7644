//! Confirmation signing and verification.
//!
//! The gateway signs `"{order_id}|{payment_id}"` with HMAC-SHA256 using the
//! key secret shared with this service. Verification recomputes the
//! signature and compares in constant time.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use campus_types::PaymentConfirmation;

type HmacSha256 = Hmac<Sha256>;

fn sign_payload(payload: &str, secret: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Signs a confirmation payload, returning the hex-encoded signature.
pub fn sign_confirmation(order_id: &str, payment_id: &str, secret: &str) -> String {
    sign_payload(&format!("{order_id}|{payment_id}"), secret)
}

/// Verifies a confirmation signature using constant-time comparison.
pub fn verify_confirmation(confirmation: &PaymentConfirmation, secret: &str) -> bool {
    let expected = sign_payload(&confirmation.signed_payload(), secret);
    expected
        .as_bytes()
        .ct_eq(confirmation.signature.as_bytes())
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn confirmation(order_id: &str, payment_id: &str, signature: String) -> PaymentConfirmation {
        PaymentConfirmation {
            order_id: order_id.into(),
            payment_id: payment_id.into(),
            signature,
        }
    }

    #[test]
    fn test_signing_is_deterministic() {
        let a = sign_confirmation("order_abc", "pay_xyz", "secret");
        let b = sign_confirmation("order_abc", "pay_xyz", "secret");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_valid_signature_verifies() {
        let sig = sign_confirmation("order_abc", "pay_xyz", "secret");
        assert!(verify_confirmation(
            &confirmation("order_abc", "pay_xyz", sig),
            "secret"
        ));
    }

    #[test]
    fn test_tampered_payment_id_fails() {
        let sig = sign_confirmation("order_abc", "pay_xyz", "secret");
        assert!(!verify_confirmation(
            &confirmation("order_abc", "pay_xyZ", sig),
            "secret"
        ));
    }

    #[test]
    fn test_wrong_secret_fails() {
        let sig = sign_confirmation("order_abc", "pay_xyz", "secret");
        assert!(!verify_confirmation(
            &confirmation("order_abc", "pay_xyz", sig),
            "other_secret"
        ));
    }

    #[test]
    fn test_single_bit_mutation_invalidates() {
        let sig = sign_confirmation("order_abc", "pay_xyz", "secret");
        let mut bytes = sig.into_bytes();
        bytes[0] ^= 0x01;
        let mutated = String::from_utf8(bytes).unwrap();
        assert!(!verify_confirmation(
            &confirmation("order_abc", "pay_xyz", mutated),
            "secret"
        ));
    }
}
