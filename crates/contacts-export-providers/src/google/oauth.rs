//! OAuth 2.0 PKCE flow for the Google People API.
//!
//! Authorization Code flow with PKCE (RFC 7636) and a loopback redirect, the
//! recipe Google documents for desktop applications:
//!
//! 1. Generate a code verifier and its SHA-256 challenge
//! 2. Bind a local HTTP listener on a port from the configured range
//! 3. Open the consent page in the browser (the URL is printed as well)
//! 4. Receive the redirect carrying the authorization code
//! 5. Exchange the code (with the verifier) for access and refresh tokens

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng as _;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, error, info, warn};

use crate::error::{ProviderError, ProviderResult};
use crate::provider::BoxFuture;

use super::config::{GoogleConfig, OAuthCredentials};
use super::tokens::TokenInfo;

/// The PKCE code verifier length (in bytes, before base64 encoding).
const CODE_VERIFIER_LENGTH: usize = 32;

/// Timeout for waiting for the OAuth callback.
const CALLBACK_TIMEOUT: Duration = Duration::from_secs(300); // 5 minutes

/// How long one loopback connection may stay silent before it is dropped.
const CALLBACK_READ_TIMEOUT: Duration = Duration::from_secs(5);

/// OAuth client for Google APIs.
#[derive(Debug)]
pub struct OAuthClient {
    credentials: OAuthCredentials,
    auth_url: String,
    token_url: String,
    http_client: reqwest::Client,
}

/// Outcome of a successful refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshedToken {
    /// The new access token.
    pub access_token: String,
    /// Lifetime of the new access token in seconds.
    pub expires_in: Option<i64>,
    /// A rotated refresh token, if Google issued one.
    pub refresh_token: Option<String>,
}

/// The two token grants the authenticator needs.
///
/// [`OAuthClient`] talks to Google; tests substitute their own.
pub trait AuthorizationGrant: Send + Sync {
    /// Obtains a fresh token set through user consent.
    fn request_consent<'a>(
        &'a self,
        scopes: &'a [String],
        port_range: (u16, u16),
    ) -> BoxFuture<'a, ProviderResult<TokenInfo>>;

    /// Trades a refresh token for a new access token.
    fn refresh_access<'a>(
        &'a self,
        refresh_token: &'a str,
    ) -> BoxFuture<'a, ProviderResult<RefreshedToken>>;
}

impl AuthorizationGrant for OAuthClient {
    fn request_consent<'a>(
        &'a self,
        scopes: &'a [String],
        port_range: (u16, u16),
    ) -> BoxFuture<'a, ProviderResult<TokenInfo>> {
        Box::pin(self.authorize(scopes, port_range))
    }

    fn refresh_access<'a>(
        &'a self,
        refresh_token: &'a str,
    ) -> BoxFuture<'a, ProviderResult<RefreshedToken>> {
        Box::pin(self.refresh_token(refresh_token))
    }
}

impl OAuthClient {
    /// Creates a new OAuth client talking to the endpoints in `config`.
    ///
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be built.
    pub fn new(config: &GoogleConfig) -> ProviderResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| {
                ProviderError::configuration(format!("failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            credentials: config.credentials.clone(),
            auth_url: config.auth_url.clone(),
            token_url: config.token_url.clone(),
            http_client,
        })
    }

    /// Runs the interactive consent flow and returns the obtained tokens.
    ///
    /// The scopes on the returned token are the ones Google reports as
    /// granted, which may be fewer than requested.
    ///
    /// # Errors
    ///
    /// - no free port in `port_range` (configuration error)
    /// - consent denied, state mismatch or callback timeout (authentication error)
    /// - the token exchange fails
    pub async fn authorize(
        &self,
        scopes: &[String],
        port_range: (u16, u16),
    ) -> ProviderResult<TokenInfo> {
        let pkce = PkceFlow::new();

        let (listener, port) = Self::bind_loopback_server(port_range)?;
        let redirect_uri = format!("http://127.0.0.1:{}/callback", port);

        let auth_url = pkce.build_auth_url(
            &self.auth_url,
            &self.credentials.client_id,
            &redirect_uri,
            scopes,
        );

        info!("starting OAuth flow, opening browser...");
        debug!("authorization URL: {}", auth_url);

        eprintln!("\nIf your browser does not open, visit this URL:\n\n{}\n", auth_url);
        if let Err(e) = open::that(&auth_url) {
            warn!("failed to open browser: {}", e);
        }

        let callback = Self::wait_for_callback(listener)?;

        if callback.state != pkce.state {
            return Err(ProviderError::authentication(
                "OAuth state mismatch, the redirect did not come from this session",
            ));
        }

        info!("received authorization code, exchanging for tokens...");

        self.exchange_code(&callback.code, &pkce.verifier, &redirect_uri, scopes)
            .await
    }

    /// Exchanges a refresh token for a new access token.
    ///
    /// # Errors
    ///
    /// A 4xx answer means Google no longer honours the refresh token and is
    /// an authentication error; other failures keep their transport class.
    pub async fn refresh_token(&self, refresh_token: &str) -> ProviderResult<RefreshedToken> {
        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];

        let token_response = self.post_token_request(&params, "token refresh").await?;

        info!("successfully refreshed access token");
        Ok(RefreshedToken {
            access_token: token_response.access_token,
            expires_in: token_response.expires_in,
            refresh_token: token_response.refresh_token,
        })
    }

    /// Exchanges an authorization code for tokens.
    async fn exchange_code(
        &self,
        code: &str,
        verifier: &str,
        redirect_uri: &str,
        scopes: &[String],
    ) -> ProviderResult<TokenInfo> {
        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("code", code),
            ("code_verifier", verifier),
            ("grant_type", "authorization_code"),
            ("redirect_uri", redirect_uri),
        ];

        let token_response = self.post_token_request(&params, "token exchange").await?;
        let granted = token_response.granted_scopes(scopes);

        info!("successfully obtained tokens");
        Ok(TokenInfo::new(
            token_response.access_token,
            token_response.refresh_token,
            token_response.expires_in,
            granted,
        ))
    }

    async fn post_token_request(
        &self,
        params: &[(&str, &str)],
        what: &str,
    ) -> ProviderResult<TokenResponse> {
        let response = self
            .http_client
            .post(&self.token_url)
            .form(params)
            .send()
            .await
            .map_err(|e| ProviderError::network(format!("{} request failed: {}", what, e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::network(format!("failed to read response: {}", e)))?;

        if status.is_client_error() {
            return Err(ProviderError::authentication(format!(
                "{} rejected ({}): {}",
                what, status, body
            )));
        }
        if !status.is_success() {
            return Err(ProviderError::server(format!(
                "{} failed ({}): {}",
                what, status, body
            )));
        }

        serde_json::from_str(&body)
            .map_err(|e| ProviderError::invalid_response(format!("invalid token response: {}", e)))
    }

    /// Tries to bind a TCP listener on an available port in the given range.
    fn bind_loopback_server(port_range: (u16, u16)) -> ProviderResult<(TcpListener, u16)> {
        for port in port_range.0..=port_range.1 {
            match TcpListener::bind(("127.0.0.1", port)) {
                Ok(listener) => {
                    debug!("bound loopback server on port {}", port);
                    return Ok((listener, port));
                }
                Err(_) => continue,
            }
        }
        Err(ProviderError::configuration(format!(
            "no available port in range {}-{}",
            port_range.0, port_range.1
        )))
    }

    /// Waits for the OAuth redirect and extracts the authorization code.
    fn wait_for_callback(listener: TcpListener) -> ProviderResult<CallbackParams> {
        let (tx, rx) = mpsc::channel();

        // Handle the callback in a separate thread to allow timeout
        let _handle = thread::spawn(move || {
            for stream in listener.incoming() {
                match stream {
                    Ok(stream) => {
                        if let Some(result) = Self::handle_callback(stream) {
                            let _ = tx.send(result);
                            return;
                        }
                    }
                    Err(e) => {
                        error!("failed to accept connection: {}", e);
                    }
                }
            }
        });

        match rx.recv_timeout(CALLBACK_TIMEOUT) {
            Ok(result) => result,
            Err(mpsc::RecvTimeoutError::Timeout) => Err(ProviderError::authentication(
                "timed out waiting for the browser to complete consent",
            )),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(ProviderError::authentication(
                "OAuth callback listener stopped unexpectedly",
            )),
        }
    }

    /// Answers one request on the loopback listener.
    ///
    /// Returns `None` for requests that are not the OAuth redirect (favicon
    /// fetches, connections the browser opens and never uses) so the
    /// listener keeps waiting.
    fn handle_callback(mut stream: TcpStream) -> Option<ProviderResult<CallbackParams>> {
        if let Err(e) = stream.set_read_timeout(Some(CALLBACK_READ_TIMEOUT)) {
            debug!("dropping loopback connection: {}", e);
            return None;
        }

        let mut request_line = String::new();
        {
            let mut reader = BufReader::new(&stream);
            if let Err(e) = reader.read_line(&mut request_line) {
                debug!("dropping silent loopback connection: {}", e);
                return None;
            }
        }

        let result = parse_callback_request(&request_line)?;

        let response = if result.is_ok() {
            "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n\
            <html><body><h1>Authorization Successful</h1>\
            <p>You can close this window and return to the terminal.</p></body></html>"
        } else {
            "HTTP/1.1 400 Bad Request\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n\
            <html><body><h1>Authorization Failed</h1>\
            <p>You can close this window.</p></body></html>"
        };

        let _ = stream.write_all(response.as_bytes());
        let _ = stream.flush();

        Some(result)
    }
}

/// Query parameters of a successful redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
struct CallbackParams {
    code: String,
    state: String,
}

/// Parses the request line of the redirect: `GET /callback?code=..&state=.. HTTP/1.1`.
fn parse_callback_request(request_line: &str) -> Option<ProviderResult<CallbackParams>> {
    let mut parts = request_line.split_whitespace();
    if parts.next() != Some("GET") {
        return None;
    }
    let path = parts.next()?;
    if !path.starts_with("/callback") {
        return None;
    }

    let query = path.split_once('?').map(|(_, q)| q).unwrap_or_default();

    let mut code = None;
    let mut state = None;
    let mut denied = None;

    for param in query.split('&') {
        if let Some((key, value)) = param.split_once('=') {
            let value = urlencoding::decode(value).unwrap_or_default().into_owned();
            match key {
                "code" => code = Some(value),
                "state" => state = Some(value),
                "error" => denied = Some(value),
                _ => {}
            }
        }
    }

    if let Some(reason) = denied {
        return Some(Err(ProviderError::authentication(format!(
            "authorization denied: {}",
            reason
        ))));
    }

    Some(match code {
        Some(code) => Ok(CallbackParams {
            code,
            state: state.unwrap_or_default(),
        }),
        None => Err(ProviderError::authentication(
            "missing authorization code in callback",
        )),
    })
}

/// PKCE flow state and utilities.
///
/// Implements RFC 7636 (Proof Key for Code Exchange).
#[derive(Debug)]
pub struct PkceFlow {
    /// The code verifier (high-entropy random string).
    pub verifier: String,
    /// The code challenge (SHA-256 hash of verifier, base64url encoded).
    pub challenge: String,
    /// Random state echoed back by the redirect.
    pub state: String,
}

impl PkceFlow {
    /// Creates a new PKCE flow with random verifier and state.
    pub fn new() -> Self {
        let verifier = Self::generate_verifier();
        let challenge = Self::compute_challenge(&verifier);
        let state = Self::generate_state();

        Self {
            verifier,
            challenge,
            state,
        }
    }

    fn generate_verifier() -> String {
        let mut rng = rand::rng();
        let bytes: Vec<u8> = (0..CODE_VERIFIER_LENGTH).map(|_| rng.random()).collect();
        URL_SAFE_NO_PAD.encode(&bytes)
    }

    fn compute_challenge(verifier: &str) -> String {
        let digest = Sha256::digest(verifier.as_bytes());
        URL_SAFE_NO_PAD.encode(digest)
    }

    fn generate_state() -> String {
        let mut rng = rand::rng();
        let bytes: Vec<u8> = (0..16).map(|_| rng.random()).collect();
        URL_SAFE_NO_PAD.encode(&bytes)
    }

    /// Builds the consent page URL.
    pub fn build_auth_url(
        &self,
        auth_endpoint: &str,
        client_id: &str,
        redirect_uri: &str,
        scopes: &[String],
    ) -> String {
        let scope = scopes.join(" ");

        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&\
            code_challenge={}&code_challenge_method=S256&state={}&\
            access_type=offline&prompt=consent",
            auth_endpoint,
            urlencoding::encode(client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(&scope),
            urlencoding::encode(&self.challenge),
            urlencoding::encode(&self.state),
        )
    }
}

impl Default for PkceFlow {
    fn default() -> Self {
        Self::new()
    }
}

/// Response from Google's token endpoint.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    /// Space-separated list of granted scopes.
    #[serde(default)]
    scope: Option<String>,
}

impl TokenResponse {
    /// Granted scopes, or the requested ones when Google omits the field.
    fn granted_scopes(&self, requested: &[String]) -> Vec<String> {
        match self.scope.as_deref() {
            Some(scope) if !scope.trim().is_empty() => {
                scope.split_whitespace().map(str::to_string).collect()
            }
            _ => requested.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(server: &MockServer) -> GoogleConfig {
        GoogleConfig::new(OAuthCredentials::new(
            "test-client.apps.googleusercontent.com",
            "test-secret",
        ))
        .with_token_url(format!("{}/token", server.uri()))
    }

    #[test]
    fn pkce_verifier_length() {
        let flow = PkceFlow::new();
        // Base64 encoding of 32 bytes = 43 characters (no padding)
        assert_eq!(flow.verifier.len(), 43);
    }

    #[test]
    fn pkce_challenge_is_deterministic() {
        let verifier = "test-verifier-string";
        assert_eq!(
            PkceFlow::compute_challenge(verifier),
            PkceFlow::compute_challenge(verifier)
        );
    }

    #[test]
    fn pkce_flows_are_random() {
        let flow1 = PkceFlow::new();
        let flow2 = PkceFlow::new();
        assert_ne!(flow1.challenge, flow2.challenge);
        assert_ne!(flow1.state, flow2.state);
    }

    #[test]
    fn auth_url_format() {
        let flow = PkceFlow::new();
        let url = flow.build_auth_url(
            GoogleConfig::DEFAULT_AUTH_URL,
            "test-client.apps.googleusercontent.com",
            "http://127.0.0.1:8080/callback",
            &[GoogleConfig::DEFAULT_SCOPE.to_string()],
        );

        assert!(url.starts_with(GoogleConfig::DEFAULT_AUTH_URL));
        assert!(url.contains("client_id="));
        assert!(url.contains("redirect_uri=http%3A%2F%2F127.0.0.1%3A8080%2Fcallback"));
        assert!(url.contains("scope=https%3A%2F%2Fwww.googleapis.com%2Fauth%2Fcontacts.readonly"));
        assert!(url.contains("code_challenge_method=S256"));
        assert!(url.contains("access_type=offline"));
        assert!(url.contains("prompt=consent"));
    }

    #[test]
    fn callback_with_code_and_state() {
        let parsed = parse_callback_request("GET /callback?code=4%2Fabc&state=xyz HTTP/1.1\r\n")
            .unwrap()
            .unwrap();
        assert_eq!(
            parsed,
            CallbackParams {
                code: "4/abc".into(),
                state: "xyz".into()
            }
        );
    }

    #[test]
    fn callback_with_error_is_denied_consent() {
        let err = parse_callback_request("GET /callback?error=access_denied&state=xyz HTTP/1.1")
            .unwrap()
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Auth);
        assert!(err.message().contains("access_denied"));
    }

    #[test]
    fn callback_without_code_is_an_error() {
        let result = parse_callback_request("GET /callback?state=xyz HTTP/1.1").unwrap();
        assert!(result.is_err());
    }

    #[test]
    fn unrelated_requests_are_ignored() {
        assert!(parse_callback_request("GET /favicon.ico HTTP/1.1").is_none());
        assert!(parse_callback_request("POST /callback?code=a HTTP/1.1").is_none());
        assert!(parse_callback_request("").is_none());
    }

    #[test]
    fn granted_scopes_fall_back_to_requested() {
        let requested = vec![GoogleConfig::DEFAULT_SCOPE.to_string()];
        let without: TokenResponse = serde_json::from_str(r#"{"access_token": "a"}"#).unwrap();
        assert_eq!(without.granted_scopes(&requested), requested);

        let with: TokenResponse =
            serde_json::from_str(r#"{"access_token": "a", "scope": "openid email"}"#).unwrap();
        assert_eq!(with.granted_scopes(&requested), vec!["openid", "email"]);
    }

    #[test]
    fn exhausted_port_range_is_a_config_error() {
        let taken = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = taken.local_addr().unwrap().port();
        let err = OAuthClient::bind_loopback_server((port, port)).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Config);
    }

    #[test]
    fn idle_connection_does_not_block_redirect() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let _idle = TcpStream::connect(addr).unwrap();
        let mut redirect = TcpStream::connect(addr).unwrap();
        redirect
            .write_all(b"GET /callback?code=abc&state=s HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .unwrap();

        let callback = OAuthClient::wait_for_callback(listener).unwrap();
        assert_eq!(callback.code, "abc");
        assert_eq!(callback.state, "s");
    }

    #[tokio::test]
    async fn refresh_returns_new_access_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=r1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "fresh",
                "expires_in": 3599,
                "token_type": "Bearer"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = OAuthClient::new(&test_config(&server)).unwrap();
        let refreshed = client.refresh_token("r1").await.unwrap();
        assert_eq!(refreshed.access_token, "fresh");
        assert_eq!(refreshed.expires_in, Some(3599));
        assert_eq!(refreshed.refresh_token, None);
    }

    #[tokio::test]
    async fn code_exchange_sends_verifier_and_reports_granted_scopes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=abc"))
            .and(body_string_contains("code_verifier=verifier-123"))
            .and(body_string_contains("client_secret=test-secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "first",
                "refresh_token": "r1",
                "expires_in": 3599,
                "scope": "openid https://www.googleapis.com/auth/contacts.readonly"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = OAuthClient::new(&test_config(&server)).unwrap();
        let scopes = vec![GoogleConfig::DEFAULT_SCOPE.to_string()];
        let tokens = client
            .exchange_code("abc", "verifier-123", "http://127.0.0.1:8080/callback", &scopes)
            .await
            .unwrap();

        assert_eq!(tokens.access_token, "first");
        assert_eq!(tokens.refresh_token.as_deref(), Some("r1"));
        assert!(tokens.has_scopes(&scopes));
        assert!(tokens.scopes.contains(&"openid".to_string()));
    }

    #[tokio::test]
    async fn rejected_code_exchange_is_an_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(
                ResponseTemplate::new(400).set_body_string(r#"{"error": "invalid_grant"}"#),
            )
            .mount(&server)
            .await;

        let client = OAuthClient::new(&test_config(&server)).unwrap();
        let err = client
            .exchange_code("used", "v", "http://127.0.0.1:8080/callback", &[])
            .await
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Auth);
    }

    #[tokio::test]
    async fn rejected_refresh_is_an_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(
                ResponseTemplate::new(400).set_body_string(r#"{"error": "invalid_grant"}"#),
            )
            .mount(&server)
            .await;

        let client = OAuthClient::new(&test_config(&server)).unwrap();
        let err = client.refresh_token("revoked").await.unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Auth);
        assert!(err.message().contains("invalid_grant"));
    }

    #[tokio::test]
    async fn token_endpoint_outage_is_an_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = OAuthClient::new(&test_config(&server)).unwrap();
        let err = client.refresh_token("r1").await.unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Api);
    }
}
