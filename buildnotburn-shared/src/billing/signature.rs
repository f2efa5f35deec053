/// Webhook signature verification
///
/// Both providers sign the raw request body with HMAC-SHA256 and a shared
/// webhook secret:
///
/// - **Lemon Squeezy** sends the hex digest of the body in `X-Signature`.
/// - **Stripe** sends `Stripe-Signature: t=<unix>,v1=<hex>[,v1=<hex>...]`
///   where each `v1` is the hex digest of `"{t}.{body}"`. Requests whose
///   timestamp is further than [`STRIPE_TOLERANCE_SECS`] from now are
///   rejected to limit replays.
///
/// Digests are compared in constant time.
///
/// # Example
///
/// ```
/// use buildnotburn_shared::billing::signature::{sign, verify_lemonsqueezy_signature};
///
/// let body = br#"{"meta":{"event_name":"subscription_created"}}"#;
/// let header = sign("whsec", body).unwrap();
///
/// assert!(verify_lemonsqueezy_signature("whsec", body, Some(&header)).is_ok());
/// assert!(verify_lemonsqueezy_signature("whsec", b"tampered", Some(&header)).is_err());
/// ```

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Accepted clock difference for Stripe signatures
pub const STRIPE_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("Missing signature header")]
    Missing,

    #[error("Malformed signature header")]
    Malformed,

    #[error("Signature does not match payload")]
    Mismatch,

    #[error("Signature timestamp outside tolerance")]
    Expired,
}

fn mac_for(secret: &str, payload: &[u8]) -> Result<HmacSha256, SignatureError> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::Mismatch)?;
    mac.update(payload);
    Ok(mac)
}

/// Hex HMAC-SHA256 of `payload`
pub fn sign(secret: &str, payload: &[u8]) -> Result<String, SignatureError> {
    let mac = mac_for(secret, payload)?;
    Ok(hex::encode(mac.finalize().into_bytes()))
}

fn verify_hex(secret: &str, payload: &[u8], signature: &str) -> Result<(), SignatureError> {
    let expected = hex::decode(signature.trim()).map_err(|_| SignatureError::Malformed)?;

    mac_for(secret, payload)?
        .verify_slice(&expected)
        .map_err(|_| SignatureError::Mismatch)
}

/// Checks the `X-Signature` header of a Lemon Squeezy webhook
pub fn verify_lemonsqueezy_signature(
    secret: &str,
    body: &[u8],
    header: Option<&str>,
) -> Result<(), SignatureError> {
    let signature = header.ok_or(SignatureError::Missing)?;
    verify_hex(secret, body, signature)
}

/// Checks the `Stripe-Signature` header against `body` at time `now`
///
/// Any one matching `v1` entry is enough.
pub fn verify_stripe_signature(
    secret: &str,
    body: &[u8],
    header: Option<&str>,
    now: i64,
) -> Result<(), SignatureError> {
    let header = header.ok_or(SignatureError::Missing)?;

    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => {
                timestamp = Some(value.parse::<i64>().map_err(|_| SignatureError::Malformed)?);
            }
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(SignatureError::Malformed)?;
    if signatures.is_empty() {
        return Err(SignatureError::Malformed);
    }

    if (now - timestamp).abs() > STRIPE_TOLERANCE_SECS {
        return Err(SignatureError::Expired);
    }

    let mut signed = format!("{}.", timestamp).into_bytes();
    signed.extend_from_slice(body);

    if signatures
        .iter()
        .any(|signature| verify_hex(secret, &signed, signature).is_ok())
    {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

/// Builds a `Stripe-Signature` header value for `body` at `timestamp`
pub fn stripe_signature_header(
    secret: &str,
    body: &[u8],
    timestamp: i64,
) -> Result<String, SignatureError> {
    let mut signed = format!("{}.", timestamp).into_bytes();
    signed.extend_from_slice(body);
    Ok(format!("t={},v1={}", timestamp, sign(secret, &signed)?))
}
