//! Stripe webhook events: signature check and the entitlement change an
//! event implies.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::Value;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Maximum age of a signed event, in seconds.
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("missing Stripe-Signature header")]
    MissingHeader,
    #[error("malformed Stripe-Signature header")]
    Malformed,
    #[error("timestamp outside the tolerance zone")]
    Expired,
    #[error("no signatures found matching the expected signature for payload")]
    Mismatch,
}

/// Verify a `Stripe-Signature` header (`t=<unix>,v1=<hex>[,v1=...]`) against
/// the raw request body.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    now: i64,
) -> Result<(), SignatureError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        let (key, value) = part.trim().split_once('=').ok_or(SignatureError::Malformed)?;
        match key {
            "t" => {
                timestamp = Some(value.parse::<i64>().map_err(|_| SignatureError::Malformed)?)
            }
            "v1" => signatures.push(value),
            _ => {}
        }
    }
    let timestamp = timestamp.ok_or(SignatureError::Malformed)?;
    if signatures.is_empty() {
        return Err(SignatureError::Malformed);
    }
    let age = now.checked_sub(timestamp).map(i64::unsigned_abs);
    if !age.is_some_and(|age| age <= SIGNATURE_TOLERANCE_SECS.unsigned_abs()) {
        return Err(SignatureError::Expired);
    }

    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::Malformed)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);

    for sig in signatures {
        let Ok(expected) = hex::decode(sig) else {
            continue;
        };
        if mac.clone().verify_slice(&expected).is_ok() {
            return Ok(());
        }
    }
    Err(SignatureError::Mismatch)
}

#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: EventData,
}

#[derive(Debug, Default, Deserialize)]
pub struct EventData {
    #[serde(default)]
    pub object: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entitlement {
    Grant { user_id: i64 },
    Revoke { user_id: i64 },
    Unchanged,
}

const ENDED_SUBSCRIPTION_STATUSES: &[&str] = &["canceled", "unpaid", "incomplete_expired"];

impl WebhookEvent {
    pub fn is_recognized(&self) -> bool {
        matches!(
            self.kind.as_str(),
            "checkout.session.completed"
                | "customer.subscription.updated"
                | "customer.subscription.deleted"
        )
    }

    pub fn entitlement(&self) -> Entitlement {
        let object = &self.data.object;
        let change = match self.kind.as_str() {
            "checkout.session.completed" => user_id_of(&object["client_reference_id"])
                .map(|user_id| Entitlement::Grant { user_id }),
            "customer.subscription.updated" => {
                let ended = object["status"]
                    .as_str()
                    .is_some_and(|s| ENDED_SUBSCRIPTION_STATUSES.contains(&s));
                if ended {
                    user_id_of(&object["metadata"]["user_id"])
                        .map(|user_id| Entitlement::Revoke { user_id })
                } else {
                    None
                }
            }
            "customer.subscription.deleted" => user_id_of(&object["metadata"]["user_id"])
                .map(|user_id| Entitlement::Revoke { user_id }),
            _ => None,
        };
        change.unwrap_or(Entitlement::Unchanged)
    }
}

fn user_id_of(value: &Value) -> Option<i64> {
    match value {
        Value::String(s) => s.trim().parse().ok(),
        Value::Number(n) => n.as_i64(),
        _ => None,
    }
}

#[cfg(test)]
pub(crate) fn sign(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(format!("{timestamp}.").as_bytes());
    mac.update(payload);
    format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test";
    const NOW: i64 = 1_700_000_000;

    fn event(json: Value) -> WebhookEvent {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn accepts_valid_signature() {
        let body = br#"{"id":"evt_1","type":"checkout.session.completed"}"#;
        let header = sign(body, SECRET, NOW);
        assert_eq!(verify_signature(body, &header, SECRET, NOW + 10), Ok(()));
    }

    #[test]
    fn accepts_when_any_v1_matches() {
        let body = b"{}";
        let good = sign(body, SECRET, NOW);
        let header = format!("t={NOW},v1=deadbeef,{}", good.split_once(',').unwrap().1);
        assert_eq!(verify_signature(body, &header, SECRET, NOW), Ok(()));
    }

    #[test]
    fn rejects_tampered_body_and_wrong_secret() {
        let header = sign(b"{\"a\":1}", SECRET, NOW);
        assert_eq!(
            verify_signature(b"{\"a\":2}", &header, SECRET, NOW),
            Err(SignatureError::Mismatch)
        );
        assert_eq!(
            verify_signature(b"{\"a\":1}", &header, "whsec_other", NOW),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn rejects_stale_and_malformed_headers() {
        let header = sign(b"{}", SECRET, NOW);
        assert_eq!(
            verify_signature(b"{}", &header, SECRET, NOW + SIGNATURE_TOLERANCE_SECS + 1),
            Err(SignatureError::Expired)
        );
        assert_eq!(
            verify_signature(b"{}", "garbage", SECRET, NOW),
            Err(SignatureError::Malformed)
        );
        assert_eq!(
            verify_signature(b"{}", "v1=abcd", SECRET, NOW),
            Err(SignatureError::Malformed)
        );
        assert_eq!(
            verify_signature(b"{}", &format!("t={NOW}"), SECRET, NOW),
            Err(SignatureError::Malformed)
        );
    }

    #[test]
    fn extreme_timestamps_are_expired_not_overflowed() {
        let header = format!("t={},v1=00", i64::MIN);
        assert_eq!(
            verify_signature(b"{}", &header, SECRET, NOW),
            Err(SignatureError::Expired)
        );
        let header = format!("t={},v1=00", i64::MAX);
        assert_eq!(
            verify_signature(b"{}", &header, SECRET, -NOW),
            Err(SignatureError::Expired)
        );
    }

    #[test]
    fn completed_checkout_grants_premium() {
        let e = event(serde_json::json!({
            "id": "evt_1",
            "type": "checkout.session.completed",
            "data": { "object": { "id": "cs_1", "client_reference_id": "7" } }
        }));
        assert!(e.is_recognized());
        assert_eq!(e.entitlement(), Entitlement::Grant { user_id: 7 });
    }

    #[test]
    fn ended_subscription_revokes_premium() {
        let updated = event(serde_json::json!({
            "type": "customer.subscription.updated",
            "data": { "object": { "status": "canceled", "metadata": { "user_id": "7" } } }
        }));
        assert_eq!(updated.entitlement(), Entitlement::Revoke { user_id: 7 });

        let deleted = event(serde_json::json!({
            "type": "customer.subscription.deleted",
            "data": { "object": { "status": "canceled", "metadata": { "user_id": 9 } } }
        }));
        assert_eq!(deleted.entitlement(), Entitlement::Revoke { user_id: 9 });
    }

    #[test]
    fn active_subscription_update_and_unknown_events_leave_plan() {
        let active = event(serde_json::json!({
            "type": "customer.subscription.updated",
            "data": { "object": { "status": "active", "metadata": { "user_id": "7" } } }
        }));
        assert_eq!(active.entitlement(), Entitlement::Unchanged);

        let other = event(serde_json::json!({ "type": "invoice.paid" }));
        assert!(!other.is_recognized());
        assert_eq!(other.entitlement(), Entitlement::Unchanged);

        let no_ref = event(serde_json::json!({
            "type": "checkout.session.completed",
            "data": { "object": { "id": "cs_2" } }
        }));
        assert_eq!(no_ref.entitlement(), Entitlement::Unchanged);
    }
}
