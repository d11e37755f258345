use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::debug;

use shared_models::auth::{Principal, TokenClaims};

type HmacSha256 = Hmac<Sha256>;

/// Verify an identity-provider bearer token and extract its principal.
///
/// The provider signs tokens with HMAC-SHA256 over `header.claims`; we hold
/// the shared secret and accept only tokens whose signature checks out and
/// whose `exp` has not passed.
pub fn verify_token(token: &str, jwt_secret: &str) -> Result<Principal, String> {
    if jwt_secret.is_empty() {
        return Err("Token secret is not set".to_string());
    }

    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err("Invalid token format".to_string());
    }

    let header_b64 = parts[0];
    let claims_b64 = parts[1];
    let signature_b64 = parts[2];

    let signature = match URL_SAFE_NO_PAD.decode(signature_b64) {
        Ok(sig) => sig,
        Err(e) => {
            debug!("Failed to decode signature: {}", e);
            return Err("Invalid signature encoding".to_string());
        }
    };

    let signing_input = format!("{}.{}", header_b64, claims_b64);

    let mut mac = match HmacSha256::new_from_slice(jwt_secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => return Err("Failed to create HMAC".to_string()),
    };

    mac.update(signing_input.as_bytes());

    if mac.verify_slice(&signature).is_err() {
        debug!("Token signature verification failed");
        return Err("Invalid token signature".to_string());
    }

    let claims_json = match URL_SAFE_NO_PAD.decode(claims_b64) {
        Ok(bytes) => match String::from_utf8(bytes) {
            Ok(json_str) => json_str,
            Err(_) => return Err("Invalid claims encoding".to_string()),
        },
        Err(_) => return Err("Invalid claims encoding".to_string()),
    };

    let claims: TokenClaims = match serde_json::from_str(&claims_json) {
        Ok(c) => c,
        Err(e) => {
            debug!("Failed to parse claims: {}", e);
            return Err("Invalid claims format".to_string());
        }
    };

    if let Some(exp) = claims.exp {
        let now = chrono::Utc::now().timestamp() as u64;
        if exp < now {
            debug!("Token expired at {} (now: {})", exp, now);
            return Err("Token expired".to_string());
        }
    }

    let principal = Principal {
        subject: claims.sub,
        email: claims.email,
    };

    debug!("Token verified for subject: {}", principal.subject);
    Ok(principal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{TestPatient, TokenTestUtils};

    const SECRET: &str = "test-secret-key-for-token-verification-must-be-long-enough";

    #[test]
    fn accepts_valid_token() {
        let patient = TestPatient::default();
        let token = TokenTestUtils::create_test_token(&patient, SECRET, None);

        let principal = verify_token(&token, SECRET).unwrap();
        assert_eq!(principal.subject, patient.id);
        assert_eq!(principal.email.as_deref(), Some(patient.email.as_str()));
    }

    #[test]
    fn rejects_expired_token() {
        let patient = TestPatient::default();
        let token = TokenTestUtils::create_expired_token(&patient, SECRET);

        let err = verify_token(&token, SECRET).unwrap_err();
        assert_eq!(err, "Token expired");
    }

    #[test]
    fn rejects_foreign_signature() {
        let patient = TestPatient::default();
        let token = TokenTestUtils::create_invalid_signature_token(&patient);

        let err = verify_token(&token, SECRET).unwrap_err();
        assert_eq!(err, "Invalid token signature");
    }

    #[test]
    fn rejects_malformed_token() {
        let err = verify_token("not-even-a-token", SECRET).unwrap_err();
        assert_eq!(err, "Invalid token format");
    }

    #[test]
    fn rejects_when_secret_unset() {
        let patient = TestPatient::default();
        let token = TokenTestUtils::create_test_token(&patient, SECRET, None);

        assert!(verify_token(&token, "").is_err());
    }
}
