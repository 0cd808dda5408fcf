//! Google People API client.
//!
//! Low-level HTTP client for `people/me/connections`: request building,
//! status mapping and conversion of `Person` resources into [`RawContact`].

use serde::Deserialize;
use tracing::debug;

use crate::error::{ProviderError, ProviderResult};
use crate::provider::{ContactPage, PageRequest};
use crate::raw_contact::{RawContact, RawContactMetadata, RawName, RawOrganization, RawValue};

use super::config::GoogleConfig;

/// Fields requested for every person; exactly what the normalizer reads.
pub const PERSON_FIELDS: &str = "names,emailAddresses,phoneNumbers,organizations,metadata";

/// Source type of the user's own contact entry.
const CONTACT_SOURCE: &str = "CONTACT";

/// Google People API client.
#[derive(Debug)]
pub struct PeopleClient {
    http_client: reqwest::Client,
    access_token: String,
    base_url: String,
}

impl PeopleClient {
    /// Creates a client using `access_token` against the API host in `config`.
    pub fn new(config: &GoogleConfig, access_token: impl Into<String>) -> ProviderResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| {
                ProviderError::configuration(format!("failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            http_client,
            access_token: access_token.into(),
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetches one page of the authenticated user's connections.
    pub async fn list_connections(&self, request: &PageRequest) -> ProviderResult<ContactPage> {
        let url = format!("{}/v1/people/me/connections", self.base_url);

        let mut http_request = self
            .http_client
            .get(&url)
            .bearer_auth(&self.access_token)
            .query(&[
                ("personFields", PERSON_FIELDS.to_string()),
                ("pageSize", request.page_size.to_string()),
            ]);

        if let Some(token) = request.page_token.as_deref() {
            http_request = http_request.query(&[("pageToken", token)]);
        }

        debug!(
            "GET {} (pageSize={}, pageToken={})",
            url,
            request.page_size,
            request.page_token.as_deref().unwrap_or("-")
        );

        let response = http_request.send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::network("request timeout")
            } else if e.is_connect() {
                ProviderError::network(format!("connection failed: {}", e))
            } else {
                ProviderError::network(format!("request failed: {}", e))
            }
        })?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok());
            return Err(ProviderError::rate_limited(format!(
                "rate limit exceeded{}",
                retry_after
                    .map(|s| format!(", retry after {} seconds", s))
                    .unwrap_or_default()
            )));
        }

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ProviderError::unauthorized(
                "access token rejected; run again with --reauth",
            ));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(error_for_status(status, &body));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::network(format!("failed to read response: {}", e)))?;

        let list: ConnectionsResponse = serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response(format!("failed to parse response: {}", e))
        })?;

        Ok(list.into_page())
    }
}

/// Maps a non-success status (other than 401/429) to an error.
fn error_for_status(status: reqwest::StatusCode, body: &str) -> ProviderError {
    if status == reqwest::StatusCode::FORBIDDEN {
        if body.contains("ACCESS_TOKEN_SCOPE_INSUFFICIENT") || body.contains("insufficient") {
            return ProviderError::insufficient_scope(
                "the granted permissions do not include reading contacts; run again with --reauth",
            );
        }
        return ProviderError::server(format!("access denied ({}): {}", status, body));
    }

    if status == reqwest::StatusCode::BAD_REQUEST {
        return ProviderError::bad_request(format!("bad request: {}", body));
    }

    ProviderError::server(format!("API error ({}): {}", status, body))
}

/// Response from the connections.list endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConnectionsResponse {
    #[serde(default)]
    connections: Vec<ApiPerson>,
    next_page_token: Option<String>,
    total_people: Option<usize>,
    total_items: Option<usize>,
}

impl ConnectionsResponse {
    fn into_page(self) -> ContactPage {
        let mut page = ContactPage::with_contacts(
            self.connections.into_iter().map(ApiPerson::into_raw).collect(),
        );
        if let Some(token) = self.next_page_token {
            page = page.with_next_page_token(token);
        }
        if let Some(total) = self.total_items.or(self.total_people) {
            page = page.with_total_items(total);
        }
        page
    }
}

/// A person resource.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiPerson {
    resource_name: Option<String>,
    #[serde(default)]
    names: Vec<ApiName>,
    #[serde(default)]
    email_addresses: Vec<ApiValue>,
    #[serde(default)]
    phone_numbers: Vec<ApiValue>,
    #[serde(default)]
    organizations: Vec<ApiOrganization>,
    metadata: Option<ApiPersonMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiName {
    display_name: Option<String>,
    given_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiValue {
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiOrganization {
    name: Option<String>,
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiPersonMetadata {
    #[serde(default)]
    sources: Vec<ApiSource>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiSource {
    #[serde(rename = "type")]
    source_type: Option<String>,
    create_time: Option<String>,
    update_time: Option<String>,
}

impl ApiPerson {
    fn into_raw(self) -> RawContact {
        // Timestamps come from the CONTACT source, else whichever source is first.
        let metadata = self.metadata.and_then(|m| {
            let mut sources = m.sources;
            let index = sources
                .iter()
                .position(|s| s.source_type.as_deref() == Some(CONTACT_SOURCE))
                .unwrap_or(0);
            if sources.is_empty() {
                return None;
            }
            let source = sources.swap_remove(index);
            Some(RawContactMetadata {
                created: source.create_time,
                updated: source.update_time,
            })
        });

        RawContact {
            resource_name: self.resource_name,
            names: self
                .names
                .into_iter()
                .map(|n| RawName {
                    display_name: n.display_name,
                    given_name: n.given_name,
                })
                .collect(),
            email_addresses: self
                .email_addresses
                .into_iter()
                .map(|e| RawValue { value: e.value })
                .collect(),
            phone_numbers: self
                .phone_numbers
                .into_iter()
                .map(|p| RawValue { value: p.value })
                .collect(),
            organizations: self
                .organizations
                .into_iter()
                .map(|o| RawOrganization {
                    name: o.name,
                    title: o.title,
                })
                .collect(),
            metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorCategory, ProviderErrorCode};
    use crate::google::config::OAuthCredentials;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const CONNECTIONS_PATH: &str = "/v1/people/me/connections";

    fn client_for(server: &MockServer) -> PeopleClient {
        let config = GoogleConfig::new(OAuthCredentials::new(
            "test-client.apps.googleusercontent.com",
            "test-secret",
        ))
        .with_api_base_url(server.uri());
        PeopleClient::new(&config, "test-token").unwrap()
    }

    fn john_doe() -> serde_json::Value {
        serde_json::json!({
            "resourceName": "people/c1",
            "names": [{"displayName": "John Doe", "givenName": "John"}],
            "emailAddresses": [{"value": "john@example.com", "metadata": {"primary": true}}],
            "phoneNumbers": [{"value": "+1 555 555 1234"}],
            "organizations": [{"name": "Acme Corp", "title": "Software Engineer"}],
            "metadata": {
                "sources": [{
                    "type": "CONTACT",
                    "id": "1",
                    "createTime": "2021-06-02T18:44:32Z",
                    "updateTime": "2024-10-05T09:21:17Z"
                }]
            }
        })
    }

    #[test]
    fn parse_connections_response() {
        let json = serde_json::json!({
            "connections": [john_doe()],
            "nextPageToken": "page2",
            "totalPeople": 2437,
            "totalItems": 2437
        });

        let response: ConnectionsResponse = serde_json::from_value(json).unwrap();
        let page = response.into_page();
        assert_eq!(page.contacts.len(), 1);
        assert_eq!(page.next_page_token.as_deref(), Some("page2"));
        assert_eq!(page.total_items, Some(2437));

        let contact = &page.contacts[0];
        assert_eq!(contact.resource_name.as_deref(), Some("people/c1"));
        assert_eq!(contact.names[0].display_name.as_deref(), Some("John Doe"));
        assert_eq!(contact.organizations[0].title.as_deref(), Some("Software Engineer"));
        let metadata = contact.metadata.as_ref().unwrap();
        assert_eq!(metadata.created.as_deref(), Some("2021-06-02T18:44:32Z"));
        assert_eq!(metadata.updated.as_deref(), Some("2024-10-05T09:21:17Z"));
    }

    #[test]
    fn empty_response_is_a_final_empty_page() {
        let response: ConnectionsResponse = serde_json::from_str("{}").unwrap();
        let page = response.into_page();
        assert!(page.contacts.is_empty());
        assert!(page.next_page_token.is_none());
        assert!(page.total_items.is_none());
    }

    #[test]
    fn contact_source_is_preferred_for_timestamps() {
        let person: ApiPerson = serde_json::from_value(serde_json::json!({
            "metadata": {
                "sources": [
                    {"type": "PROFILE", "updateTime": "2020-01-01T00:00:00Z"},
                    {"type": "CONTACT", "updateTime": "2023-03-03T00:00:00Z"}
                ]
            }
        }))
        .unwrap();
        let metadata = person.into_raw().metadata.unwrap();
        assert_eq!(metadata.updated.as_deref(), Some("2023-03-03T00:00:00Z"));
        assert!(metadata.created.is_none());
    }

    #[test]
    fn first_source_is_the_fallback() {
        let person: ApiPerson = serde_json::from_value(serde_json::json!({
            "metadata": {
                "sources": [
                    {"type": "PROFILE", "updateTime": "2020-01-01T00:00:00Z"},
                    {"type": "DOMAIN_PROFILE", "updateTime": "2021-01-01T00:00:00Z"}
                ]
            }
        }))
        .unwrap();
        let metadata = person.into_raw().metadata.unwrap();
        assert_eq!(metadata.updated.as_deref(), Some("2020-01-01T00:00:00Z"));
    }

    #[test]
    fn no_sources_means_no_metadata() {
        let person: ApiPerson =
            serde_json::from_value(serde_json::json!({"metadata": {"sources": []}})).unwrap();
        assert!(person.into_raw().metadata.is_none());

        assert!(ApiPerson::default().into_raw().metadata.is_none());
    }

    #[tokio::test]
    async fn list_sends_field_mask_page_size_and_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(CONNECTIONS_PATH))
            .and(header("authorization", "Bearer test-token"))
            .and(query_param("personFields", PERSON_FIELDS))
            .and(query_param("pageSize", "1000"))
            .and(query_param("pageToken", "page2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "connections": [john_doe()],
                "totalItems": 1
            })))
            .expect(1)
            .mount(&server)
            .await;

        let page = client_for(&server)
            .list_connections(&PageRequest::next(1000, "page2"))
            .await
            .unwrap();
        assert_eq!(page.contacts.len(), 1);
        assert!(page.next_page_token.is_none());
    }

    #[tokio::test]
    async fn first_page_has_no_page_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(CONNECTIONS_PATH))
            .and(query_param("pageSize", "50"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server)
            .list_connections(&PageRequest::first(50))
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        assert!(!requests[0].url.query().unwrap_or_default().contains("pageToken"));
    }

    async fn error_for(status: u16, body: &str) -> ProviderError {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(CONNECTIONS_PATH))
            .respond_with(
                ResponseTemplate::new(status)
                    .insert_header("Retry-After", "30")
                    .set_body_string(body),
            )
            .mount(&server)
            .await;

        client_for(&server)
            .list_connections(&PageRequest::first(1000))
            .await
            .unwrap_err()
    }

    #[tokio::test]
    async fn unauthorized_is_an_api_error() {
        let err = error_for(401, "").await;
        assert_eq!(err.code(), ProviderErrorCode::Unauthorized);
        assert_eq!(err.category(), ErrorCategory::Api);
    }

    #[tokio::test]
    async fn insufficient_scope_is_a_scope_error() {
        let body = r#"{"error": {"code": 403, "status": "PERMISSION_DENIED",
            "details": [{"reason": "ACCESS_TOKEN_SCOPE_INSUFFICIENT"}]}}"#;
        let err = error_for(403, body).await;
        assert_eq!(err.category(), ErrorCategory::Scope);
    }

    #[tokio::test]
    async fn other_forbidden_is_an_api_error() {
        let err = error_for(403, r#"{"error": {"message": "People API has not been used"}}"#).await;
        assert_eq!(err.category(), ErrorCategory::Api);
    }

    #[tokio::test]
    async fn rate_limit_reports_retry_after() {
        let err = error_for(429, "").await;
        assert_eq!(err.code(), ProviderErrorCode::RateLimited);
        assert!(err.message().contains("30 seconds"));
    }

    #[tokio::test]
    async fn server_error_is_an_api_error() {
        let err = error_for(500, "boom").await;
        assert_eq!(err.code(), ProviderErrorCode::ServerError);
        assert!(err.message().contains("boom"));
    }

    #[tokio::test]
    async fn undecodable_body_is_an_invalid_response() {
        let err = error_for(200, "<html>").await;
        assert_eq!(err.code(), ProviderErrorCode::InvalidResponse);
        assert_eq!(err.category(), ErrorCategory::Api);
    }
}
