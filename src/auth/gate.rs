use axum::{
    extract::{Request, State},
    http::header::SET_COOKIE,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;
use tracing::{debug, info};

use super::{extract_auth_token, removal_header, SessionClaims, TokenVerifier};

/// Paths reachable without a session, matched exactly
pub const DEFAULT_PUBLIC_PATHS: [&str; 9] = [
    "/",
    "/api/auth/login",
    "/api/auth/verify",
    "/stock-insumos",
    "/labi",
    "/api/labi",
    "/sirius",
    "/api/sirius",
    "/api/sirius-audio",
];

/// Where rejected requests are sent
pub const REDIRECT_TARGET: &str = "/";

#[derive(Debug, Clone, PartialEq)]
pub enum GateDecision {
    Public,
    Authenticated(SessionClaims),
    /// `clear_cookie` is set when a token was presented but failed verification
    Redirect { clear_cookie: bool },
}

#[derive(Debug, Clone)]
pub struct AccessGate {
    verifier: Arc<TokenVerifier>,
    public_paths: Vec<String>,
}

impl AccessGate {
    /// Uses the built-in allow-list unless `public_paths` overrides it
    pub fn new(verifier: Arc<TokenVerifier>, public_paths: Option<Vec<String>>) -> Self {
        let public_paths = public_paths.unwrap_or_else(|| {
            DEFAULT_PUBLIC_PATHS
                .iter()
                .map(|p| p.to_string())
                .collect()
        });
        Self {
            verifier,
            public_paths,
        }
    }

    pub fn is_public(&self, path: &str) -> bool {
        self.public_paths.iter().any(|p| p == path)
    }

    pub fn decide(&self, path: &str, token: Option<&str>) -> GateDecision {
        if self.is_public(path) {
            return GateDecision::Public;
        }

        let Some(token) = token else {
            debug!(path, "no session token; redirecting");
            return GateDecision::Redirect {
                clear_cookie: false,
            };
        };

        match self.verifier.verify(token) {
            Ok(claims) => {
                debug!(path, user = %claims.nombre, "session accepted");
                GateDecision::Authenticated(claims)
            }
            Err(err) => {
                info!(path, error = %err, "invalid session token; clearing cookie");
                GateDecision::Redirect { clear_cookie: true }
            }
        }
    }
}

/// Lets public paths through, attaches [`SessionClaims`] to authenticated
/// requests and redirects everything else to `/`.
pub async fn access_gate_middleware(
    State(gate): State<Arc<AccessGate>>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = extract_auth_token(request.headers());

    match gate.decide(request.uri().path(), token.as_deref()) {
        GateDecision::Public => next.run(request).await,
        GateDecision::Authenticated(claims) => {
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        GateDecision::Redirect { clear_cookie } => {
            let mut response = Redirect::temporary(REDIRECT_TARGET).into_response();
            if clear_cookie {
                if let Some(value) = removal_header() {
                    response.headers_mut().append(SET_COOKIE, value);
                }
            }
            response
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        extract::Extension,
        http::{header, Request as HttpRequest, StatusCode},
        routing::get,
        Router,
    };
    use chrono::Duration;
    use rstest::rstest;
    use tower::ServiceExt;

    const SECRET: &str = "5f0c9e1d7a2b4c8e6f3a1d9b7c5e2f04";

    fn gate() -> AccessGate {
        AccessGate::new(Arc::new(TokenVerifier::new(SECRET)), None)
    }

    fn token(ttl: Duration) -> String {
        TokenVerifier::new(SECRET)
            .issue(&SessionClaims::new("Luis", ttl))
            .unwrap()
    }

    #[rstest]
    #[case("/")]
    #[case("/api/auth/login")]
    #[case("/api/auth/verify")]
    #[case("/stock-insumos")]
    #[case("/api/sirius-audio")]
    fn public_paths_pass_without_token(#[case] path: &str) {
        assert_eq!(gate().decide(path, None), GateDecision::Public);
    }

    #[rstest]
    #[case("/api/entrada-insumos")]
    #[case("/stock-insumos/")]
    #[case("/api/stock-insumos")]
    #[case("/labi/chat")]
    fn private_paths_without_token_redirect(#[case] path: &str) {
        assert_eq!(
            gate().decide(path, None),
            GateDecision::Redirect {
                clear_cookie: false
            }
        );
    }

    #[test]
    fn valid_token_authenticates() {
        let decision = gate().decide("/api/equipo", Some(&token(Duration::hours(1))));
        assert!(matches!(decision, GateDecision::Authenticated(claims) if claims.nombre == "Luis"));
    }

    #[test]
    fn bad_tokens_redirect_and_clear() {
        let expired = token(Duration::hours(-1));
        let mut tampered = token(Duration::hours(1));
        tampered.push('x');

        for bad in [expired.as_str(), tampered.as_str(), "garbage"] {
            assert_eq!(
                gate().decide("/api/equipo", Some(bad)),
                GateDecision::Redirect { clear_cookie: true }
            );
        }
    }

    #[test]
    fn configured_allow_list_replaces_defaults() {
        let gate = AccessGate::new(
            Arc::new(TokenVerifier::new(SECRET)),
            Some(vec!["/health".into()]),
        );
        assert!(gate.is_public("/health"));
        assert!(!gate.is_public("/labi"));
    }

    async fn whoami(claims: Option<Extension<SessionClaims>>) -> String {
        claims.map(|Extension(c)| c.nombre).unwrap_or_default()
    }

    fn app() -> Router {
        Router::new()
            .route("/", get(whoami))
            .route("/privado", get(whoami))
            .layer(axum::middleware::from_fn_with_state(
                Arc::new(gate()),
                access_gate_middleware,
            ))
    }

    async fn send(uri: &str, cookie: Option<&str>) -> Response {
        let mut builder = HttpRequest::builder().uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        app().oneshot(builder.body(Body::empty()).unwrap()).await.unwrap()
    }

    #[tokio::test]
    async fn middleware_passes_public_request_untouched() {
        let response = send("/", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(SET_COOKIE).is_none());
    }

    #[tokio::test]
    async fn middleware_attaches_claims() {
        let cookie = format!("auth_token={}", token(Duration::hours(1)));
        let response = send("/privado", Some(&cookie)).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"Luis");
    }

    #[tokio::test]
    async fn middleware_redirects_without_clearing_when_token_missing() {
        let response = send("/privado", None).await;
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/");
        assert!(response.headers().get(SET_COOKIE).is_none());
    }

    #[tokio::test]
    async fn middleware_clears_cookie_for_expired_token() {
        let cookie = format!("auth_token={}", token(Duration::hours(-3)));
        let response = send("/privado", Some(&cookie)).await;
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);

        let set_cookie = response.headers().get(SET_COOKIE).unwrap().to_str().unwrap();
        assert!(set_cookie.starts_with("auth_token=;"));
        assert!(set_cookie.contains("Max-Age=0"));
    }
}
