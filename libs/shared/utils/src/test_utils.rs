use std::sync::Arc;

use base64::{engine::general_purpose, Engine as _};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::Principal;

pub struct TestConfig {
    pub jwt_secret: String,
    pub database_url: String,
    pub database_anon_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-token-verification-must-be-long-enough".to_string(),
            database_url: "http://localhost:54321".to_string(),
            database_anon_key: "test-anon-key".to_string(),
        }
    }
}

impl TestConfig {
    pub fn with_database_url(url: &str) -> Self {
        Self {
            database_url: url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            database_url: self.database_url.clone(),
            database_anon_key: self.database_anon_key.clone(),
            auth_jwt_secret: self.jwt_secret.clone(),
            redis_url: None,
            smtp_host: String::new(),
            smtp_port: 587,
            smtp_username: String::new(),
            smtp_password: String::new(),
            sender_email: String::new(),
            push_gateway_url: None,
            request_timeout_seconds: 5,
            max_delivery_attempts: 3,
            dispatcher_workers: 1,
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestPatient {
    pub id: String,
    pub email: String,
}

impl Default for TestPatient {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: "patient@example.com".to_string(),
        }
    }
}

impl TestPatient {
    pub fn new(email: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
        }
    }

    pub fn to_principal(&self) -> Principal {
        Principal {
            subject: self.id.clone(),
            email: Some(self.email.clone()),
        }
    }
}

pub struct TokenTestUtils;

impl TokenTestUtils {
    pub fn create_test_token(patient: &TestPatient, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": patient.id,
            "email": patient.email,
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(patient: &TestPatient, secret: &str) -> String {
        Self::create_test_token(patient, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(patient: &TestPatient) -> String {
        Self::create_test_token(patient, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

pub struct MockDatastoreResponses;

impl MockDatastoreResponses {
    /// An `appointments` row the way the REST head returns it.
    pub fn appointment_row(
        id: i64,
        patient_id: &str,
        date: &str,
        time: &str,
        status: &str,
    ) -> serde_json::Value {
        json!({
            "id": id,
            "patient_id": patient_id,
            "patient_email": "patient@example.com",
            "appointment_date": date,
            "appointment_time": time,
            "service_type": "checkup",
            "notes": null,
            "status": status,
            "created_at": "2024-06-01T08:30:00Z"
        })
    }
}
