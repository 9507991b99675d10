//! HMAC-SHA256 signatures used by the payment gateway.
//!
//! Two things are signed: the client callback (`order_id|payment_id`, keyed with
//! the API key secret) and webhook bodies (raw bytes, keyed with the webhook
//! secret). Both are lowercase hex on the wire.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Message signed for a client-reported payment.
pub fn payment_signature_message(order_id: &str, payment_id: &str) -> String {
    format!("{}|{}", order_id, payment_id)
}

/// Hex-encoded HMAC-SHA256 of `message`.
pub fn sign(secret: &[u8], message: &[u8]) -> String {
    hex::encode(mac(secret, message))
}

/// Checks a hex signature against `message` in constant time.
///
/// Malformed hex or a wrong-length digest is a mismatch, not an error.
pub fn verify(secret: &[u8], message: &[u8], provided_hex: &str) -> bool {
    let provided = match hex::decode(provided_hex.trim()) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };
    constant_time_compare(&mac(secret, message), &provided)
}

/// Verifies the signature a client forwards after checkout.
pub fn verify_payment_signature(
    key_secret: &[u8],
    order_id: &str,
    payment_id: &str,
    signature: &str,
) -> bool {
    let message = payment_signature_message(order_id, payment_id);
    verify(key_secret, message.as_bytes(), signature)
}

fn mac(secret: &[u8], message: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key");
    mac.update(message);
    mac.finalize().into_bytes().to_vec()
}

fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test_key_secret";

    #[test]
    fn payment_message_joins_with_pipe() {
        assert_eq!(payment_signature_message("order_1", "pay_1"), "order_1|pay_1");
    }

    #[test]
    fn sign_is_lowercase_hex_sha256() {
        let sig = sign(SECRET, b"hello");
        assert_eq!(sig.len(), 64);
        assert!(sig.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn verify_accepts_own_signature() {
        let sig = sign(SECRET, b"order_1|pay_1");
        assert!(verify_payment_signature(SECRET, "order_1", "pay_1", &sig));
    }

    #[test]
    fn verify_rejects_other_payment() {
        let sig = sign(SECRET, b"order_1|pay_1");
        assert!(!verify_payment_signature(SECRET, "order_1", "pay_2", &sig));
    }

    #[test]
    fn verify_rejects_wrong_secret() {
        let sig = sign(b"another_secret", b"order_1|pay_1");
        assert!(!verify_payment_signature(SECRET, "order_1", "pay_1", &sig));
    }

    #[test]
    fn sign_accepts_empty_and_long_keys() {
        assert_eq!(sign(b"", b"body").len(), 64);
        let long_key = vec![7u8; 200];
        let sig = sign(&long_key, b"body");
        assert!(verify(&long_key, b"body", &sig));
    }

    #[test]
    fn verify_rejects_malformed_hex() {
        assert!(!verify(SECRET, b"body", "zz-not-hex"));
        assert!(!verify(SECRET, b"body", ""));
        assert!(!verify(SECRET, b"body", "abcd"));
    }

    #[test]
    fn verify_tolerates_surrounding_whitespace() {
        let sig = sign(SECRET, b"body");
        assert!(verify(SECRET, b"body", &format!(" {}\n", sig)));
    }

    #[test]
    fn constant_time_compare_different_lengths() {
        assert!(!constant_time_compare(&[1, 2, 3], &[1, 2]));
        assert!(constant_time_compare(&[], &[]));
    }
}
