use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use base64::{engine::general_purpose, Engine as _};
use std::sync::Arc;

use crate::error::ApiError;
use crate::models::User;
use crate::services::auth;

/// Аутентифицированный пользователь запроса.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i64,
    pub email: String,
}

enum Scheme<'a> {
    Bearer(&'a str),
    Basic(&'a str),
}

fn parse_authorization(value: &str) -> Option<Scheme<'_>> {
    if let Some(token) = value.strip_prefix("Bearer ") {
        return Some(Scheme::Bearer(token.trim()));
    }
    value.strip_prefix("Basic ").map(|encoded| Scheme::Basic(encoded.trim()))
}

// base64(email:password) -> (email, password)
fn decode_basic(encoded: &str) -> Option<(String, String)> {
    let decoded = general_purpose::STANDARD.decode(encoded).ok()?;
    let credentials = String::from_utf8(decoded).ok()?;
    let (email, password) = credentials.split_once(':')?;
    Some((email.to_string(), password.to_string()))
}

/// Испорченный хеш в БД считается несовпадением пароля, а не ошибкой сервера.
pub async fn password_matches(password: String, hash: String) -> bool {
    auth::verify_password(password, hash).await.unwrap_or_else(|e| {
        tracing::warn!("password verification failed: {:?}", e);
        false
    })
}

// Bearer JWT или Basic Auth
impl FromRequestParts<Arc<crate::AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<crate::AppState>,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(ApiError::Unauthorized)?;

        match parse_authorization(auth_header).ok_or(ApiError::Unauthorized)? {
            Scheme::Bearer(token) => {
                let claims = auth::verify_token(&state.config.jwt, token).map_err(|e| {
                    tracing::debug!("rejected bearer token: {}", e);
                    ApiError::Unauthorized
                })?;

                // пользователь мог быть удалён или заблокирован после выдачи токена
                if !User::is_active(&state.db.pool, claims.sub).await? {
                    return Err(ApiError::Unauthorized);
                }

                Ok(AuthUser {
                    user_id: claims.sub,
                    email: claims.email,
                })
            }
            Scheme::Basic(encoded) => {
                let (email, password) = decode_basic(encoded).ok_or(ApiError::Unauthorized)?;

                let user = User::find_active_by_email(&state.db.pool, &email)
                    .await?
                    .ok_or(ApiError::Unauthorized)?;

                if !password_matches(password, user.password_hash).await {
                    return Err(ApiError::Unauthorized);
                }

                Ok(AuthUser {
                    user_id: user.id,
                    email: user.email,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognises_both_schemes() {
        assert!(matches!(parse_authorization("Bearer abc"), Some(Scheme::Bearer("abc"))));
        assert!(matches!(parse_authorization("Basic Zm9v"), Some(Scheme::Basic("Zm9v"))));
        assert!(parse_authorization("Token abc").is_none());
    }

    #[test]
    fn basic_credentials_split_on_first_colon() {
        let encoded = general_purpose::STANDARD.encode("neo@zion.io:pa:ss");
        assert_eq!(
            decode_basic(&encoded),
            Some(("neo@zion.io".to_string(), "pa:ss".to_string()))
        );
        assert_eq!(decode_basic("%%%"), None);
        assert_eq!(decode_basic(&general_purpose::STANDARD.encode("no-colon")), None);
    }

    #[tokio::test]
    async fn malformed_hash_is_a_mismatch() {
        assert!(!password_matches("hunter22".into(), "not-a-bcrypt-hash".into()).await);
        assert!(!password_matches("hunter22".into(), String::new()).await);
    }
}
