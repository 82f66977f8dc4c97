use axum::{async_trait, extract::FromRequestParts, http::StatusCode, Json};
use cp_tracker_libs::api::ErrorResponse;
use http::{header::AUTHORIZATION, request::Parts};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::{convert::Infallible, sync::Arc};

/// JWT検証に使う共有設定
///
/// トークンの発行は別システムの責務で、ここでは検証のみを行う
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub id: i64,
    pub username: String,
    pub exp: usize,
}

/// 認証必須エンドポイント用のエクストラクタ
///
/// Authorizationヘッダのベアラトークンを検証し、失敗時は401を返す
pub struct AuthUser(pub Claims);

fn verify(parts: &Parts) -> Result<Claims, &'static str> {
    let config = parts
        .extensions
        .get::<Arc<AuthConfig>>()
        .ok_or("auth config is not configured")?;
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or("authorization header is missing")?;
    let token = header
        .strip_prefix("Bearer ")
        .ok_or("authorization header is not a bearer token")?;

    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| {
        tracing::warn!("token verification failed: {}", e);
        "invalid or expired token"
    })?;

    Ok(data.claims)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match verify(parts) {
            Ok(claims) => Ok(AuthUser(claims)),
            Err(reason) => Err((
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse::new(format!("not authorized: {}", reason))),
            )),
        }
    }
}

/// 認証任意エンドポイント用のエクストラクタ
///
/// トークンがない・不正な場合もリクエストは通し、Noneを渡す
pub struct OptionalAuthUser(pub Option<Claims>);

#[async_trait]
impl<S> FromRequestParts<S> for OptionalAuthUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(OptionalAuthUser(verify(parts).ok()))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn make_parts(auth_header: Option<String>, secret: Option<&str>) -> Parts {
        let mut builder = http::Request::builder().uri("/api/problems");
        if let Some(header) = auth_header {
            builder = builder.header(AUTHORIZATION, header);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        if let Some(secret) = secret {
            parts.extensions.insert(Arc::new(AuthConfig {
                jwt_secret: String::from(secret),
            }));
        }
        parts
    }

    fn make_token(secret: &str) -> String {
        let claims = Claims {
            id: 42,
            username: String::from("tourist"),
            exp: usize::MAX,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn valid_token_yields_claims() {
        let token = make_token("secret");
        let parts = make_parts(Some(format!("Bearer {}", token)), Some("secret"));
        let claims = verify(&parts).unwrap();

        assert_eq!(claims.id, 42);
        assert_eq!(claims.username, "tourist");
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = make_token("secret");
        let parts = make_parts(Some(format!("Bearer {}", token)), Some("other"));
        assert!(verify(&parts).is_err());
    }

    #[test]
    fn missing_header_is_rejected() {
        let parts = make_parts(None, Some("secret"));
        assert!(verify(&parts).is_err());
    }

    #[test]
    fn non_bearer_header_is_rejected() {
        let parts = make_parts(Some(String::from("Basic dXNlcjpwdw==")), Some("secret"));
        assert!(verify(&parts).is_err());
    }
}
