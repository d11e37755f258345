use std::sync::Arc;

use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};

use shared_config::AppConfig;
use shared_models::auth::Principal;
use shared_models::error::AppError;

use crate::token::verify_token;

/// Bearer-token gate applied to every route that touches appointment state.
/// On success the verified [`Principal`] is attached to the request
/// extensions for handlers to pick up.
pub async fn auth_middleware(
    State(config): State<Arc<AppConfig>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get("Authorization")
        .ok_or_else(|| AppError::Auth("Missing authorization header".to_string()))?;

    let auth_value = auth_header
        .to_str()
        .map_err(|_| AppError::Auth("Invalid authorization header format".to_string()))?;

    if !auth_value.starts_with("Bearer ") {
        return Err(AppError::Auth(
            "Invalid authorization header format".to_string(),
        ));
    }

    let token = &auth_value[7..];

    let principal = verify_token(token, &config.auth_jwt_secret).map_err(AppError::Auth)?;

    request.extensions_mut().insert(principal);

    Ok(next.run(request).await)
}

/// Reject a request whose claimed patient id differs from the authenticated
/// subject. Patients may only act on their own appointments.
pub fn assert_ownership(principal: &Principal, claimed_patient_id: &str) -> Result<(), AppError> {
    if claimed_patient_id != principal.subject {
        return Err(AppError::Forbidden(
            "Mismatched patient ID".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn ownership_accepts_own_subject() {
        let principal = Principal {
            subject: "uid-1".to_string(),
            email: None,
        };
        assert!(assert_ownership(&principal, "uid-1").is_ok());
    }

    #[test]
    fn ownership_rejects_foreign_subject() {
        let principal = Principal {
            subject: "uid-1".to_string(),
            email: None,
        };
        assert_matches!(
            assert_ownership(&principal, "uid-2"),
            Err(AppError::Forbidden(_))
        );
    }
}
