//! Access tokens
//!
//! Compact JWS tokens signed with HMAC-SHA256 (`alg: HS256`). The payload
//! carries the actor row id (`sub`), the actor kind (`type`), the backing
//! session id (`sid`) and the issue/expiry times as Unix seconds.

use chrono::{DateTime, Duration, Utc};
use data_encoding::BASE64URL_NOPAD;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::config::MAX_TOKEN_TTL_HOURS;
use crate::models::ActorType;

type HmacSha256 = Hmac<Sha256>;

const HEADER_JSON: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

/// Token payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Actor row id
    pub sub: i64,
    #[serde(rename = "type")]
    pub actor_type: ActorType,
    /// Session id
    pub sid: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("unsupported token algorithm")]
    UnsupportedAlgorithm,
    #[error("invalid token signature")]
    BadSignature,
    #[error("token expired")]
    Expired,
}

#[derive(Deserialize)]
struct Header {
    alg: String,
}

/// Signs and verifies access tokens
#[derive(Clone)]
pub struct TokenCodec {
    /// HMAC keyed with the signing secret, cloned per operation
    mac: HmacSha256,
    ttl: Duration,
}

impl TokenCodec {
    pub fn new(secret: &str, ttl_hours: i64) -> anyhow::Result<Self> {
        let mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| anyhow::anyhow!("Invalid token secret: {}", e))?;
        let ttl = Some(ttl_hours)
            .filter(|h| (1..=MAX_TOKEN_TTL_HOURS).contains(h))
            .and_then(Duration::try_hours)
            .ok_or_else(|| anyhow::anyhow!("Invalid token lifetime: {} hours", ttl_hours))?;
        Ok(Self { mac, ttl })
    }

    /// Lifetime of issued tokens
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token for `claims`, returning the compact serialization.
    pub fn encode(&self, claims: &Claims) -> anyhow::Result<String> {
        let header = BASE64URL_NOPAD.encode(HEADER_JSON.as_bytes());
        let payload = BASE64URL_NOPAD.encode(&serde_json::to_vec(claims)?);
        let signing_input = format!("{}.{}", header, payload);

        let mut mac = self.mac.clone();
        mac.update(signing_input.as_bytes());
        let signature = BASE64URL_NOPAD.encode(&mac.finalize().into_bytes());

        Ok(format!("{}.{}", signing_input, signature))
    }

    /// Build claims for a new session starting at `now`.
    pub fn claims_for(
        &self,
        actor_type: ActorType,
        actor_id: i64,
        session_id: &str,
        now: DateTime<Utc>,
    ) -> Claims {
        Claims {
            sub: actor_id,
            actor_type,
            sid: session_id.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        }
    }

    /// Verify signature and expiry, returning the claims.
    pub fn decode(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        let mut parts = token.split('.');
        let (header, payload, signature) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(h), Some(p), Some(s), None) => (h, p, s),
            _ => return Err(TokenError::Malformed),
        };

        let header_bytes = BASE64URL_NOPAD
            .decode(header.as_bytes())
            .map_err(|_| TokenError::Malformed)?;
        let header: Header = serde_json::from_slice(&header_bytes).map_err(|_| TokenError::Malformed)?;
        if header.alg != "HS256" {
            return Err(TokenError::UnsupportedAlgorithm);
        }

        let signature = BASE64URL_NOPAD
            .decode(signature.as_bytes())
            .map_err(|_| TokenError::Malformed)?;
        let signing_input_len = token.len() - signature_len(token);
        let mut mac = self.mac.clone();
        mac.update(token[..signing_input_len].as_bytes());
        mac.verify_slice(&signature).map_err(|_| TokenError::BadSignature)?;

        let payload_bytes = BASE64URL_NOPAD
            .decode(payload.as_bytes())
            .map_err(|_| TokenError::Malformed)?;
        let claims: Claims = serde_json::from_slice(&payload_bytes).map_err(|_| TokenError::Malformed)?;

        if claims.exp <= now.timestamp() {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }
}

/// Length of the signature segment including its leading dot.
fn signature_len(token: &str) -> usize {
    token.rfind('.').map(|idx| token.len() - idx).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn codec() -> TokenCodec {
        TokenCodec::new("test-secret", 24).unwrap()
    }

    #[test]
    fn test_encode_decode() {
        let codec = codec();
        let now = Utc::now();
        let claims = codec.claims_for(ActorType::Moderator, 7, "sid-1", now);

        let token = codec.encode(&claims).unwrap();
        assert_eq!(token.split('.').count(), 3);

        let decoded = codec.decode(&token, now).expect("token should verify");
        assert_eq!(decoded, claims);
        assert_eq!(decoded.exp - decoded.iat, 24 * 3600);
    }

    #[test]
    fn test_payload_uses_type_claim() {
        let codec = codec();
        let token = codec
            .encode(&codec.claims_for(ActorType::Administrator, 1, "s", Utc::now()))
            .unwrap();
        let payload = token.split('.').nth(1).unwrap();
        let json: serde_json::Value =
            serde_json::from_slice(&BASE64URL_NOPAD.decode(payload.as_bytes()).unwrap()).unwrap();
        assert_eq!(json["type"], "administrator");
        assert_eq!(json["sub"], 1);
        assert_eq!(json["sid"], "s");
    }

    #[test]
    fn test_expired_token_rejected() {
        let codec = codec();
        let issued = Utc::now() - Duration::hours(25);
        let token = codec.encode(&codec.claims_for(ActorType::Member, 1, "s", issued)).unwrap();
        assert_eq!(codec.decode(&token, Utc::now()), Err(TokenError::Expired));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let now = Utc::now();
        let token = codec().encode(&codec().claims_for(ActorType::Member, 1, "s", now)).unwrap();
        let other = TokenCodec::new("other-secret", 24).unwrap();
        assert_eq!(other.decode(&token, now), Err(TokenError::BadSignature));
    }

    #[test]
    fn test_out_of_range_ttl_is_an_error() {
        for hours in [0, -5, MAX_TOKEN_TTL_HOURS + 1, i64::MAX] {
            assert!(TokenCodec::new("k", hours).is_err());
        }
        assert!(TokenCodec::new("k", MAX_TOKEN_TTL_HOURS).is_ok());
    }

    #[test]
    fn test_malformed_tokens_rejected() {
        let codec = codec();
        let now = Utc::now();
        assert_eq!(codec.decode("", now), Err(TokenError::Malformed));
        assert_eq!(codec.decode("a.b", now), Err(TokenError::Malformed));
        assert_eq!(codec.decode("a.b.c.d", now), Err(TokenError::Malformed));
        assert_eq!(codec.decode("!!.??.**", now), Err(TokenError::Malformed));
    }

    #[test]
    fn test_alg_none_rejected() {
        let codec = codec();
        let now = Utc::now();
        let token = codec.encode(&codec.claims_for(ActorType::Member, 1, "s", now)).unwrap();
        let rest = token.split_once('.').unwrap().1;
        let forged = format!(
            "{}.{}",
            BASE64URL_NOPAD.encode(br#"{"alg":"none","typ":"JWT"}"#),
            rest
        );
        assert_eq!(codec.decode(&forged, now), Err(TokenError::UnsupportedAlgorithm));
    }

    proptest! {
        #[test]
        fn tampered_payload_never_verifies(sub in 1i64..1_000_000, forged_sub in 1i64..1_000_000) {
            prop_assume!(sub != forged_sub);
            let codec = codec();
            let now = Utc::now();
            let token = codec.encode(&codec.claims_for(ActorType::Member, sub, "sid", now)).unwrap();

            let mut forged_claims = codec.claims_for(ActorType::Member, forged_sub, "sid", now);
            forged_claims.iat = now.timestamp();
            let forged_payload = BASE64URL_NOPAD.encode(&serde_json::to_vec(&forged_claims).unwrap());
            let parts: Vec<&str> = token.split('.').collect();
            let forged = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);

            prop_assert_eq!(codec.decode(&forged, now), Err(TokenError::BadSignature));
        }

        #[test]
        fn round_trip_preserves_claims(sub in 1i64..i64::MAX / 2, ttl in 1i64..1000) {
            let codec = TokenCodec::new("k", ttl).unwrap();
            let now = Utc::now();
            let claims = codec.claims_for(ActorType::Guest, sub, "sid", now);
            prop_assert_eq!(codec.decode(&codec.encode(&claims).unwrap(), now), Ok(claims));
        }
    }
}
