//! Lead store backed by the hosted database's REST interface.
//!
//! Inserts go to `POST {base_url}/rest/v1/{table}` with
//! `Prefer: return=representation`, which makes the backend echo the stored
//! rows back as a JSON array.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::LeadStore;
use crate::config::BackendConfig;
use crate::domain::lead::{Industry, Lead, LeadId, NewLead, mask_email};
use crate::error::{LeadCaptureError, Result};
use crate::http::{HttpClient, HttpRequest, HttpResponse};
use crate::session::SessionId;

/// Row shape accepted and returned by the `leads` table.
#[derive(Debug, Serialize)]
struct InsertRow<'a> {
    name: &'a str,
    email: &'a str,
    industry: Industry,
    session_id: &'a SessionId,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct LeadRow {
    id: Uuid,
    name: String,
    email: String,
    industry: Industry,
    session_id: SessionId,
    created_at: DateTime<Utc>,
}

impl From<LeadRow> for Lead {
    fn from(row: LeadRow) -> Self {
        Lead {
            id: LeadId::from(row.id),
            name: row.name,
            email: row.email,
            industry: row.industry,
            session_id: row.session_id,
            submitted_at: row.created_at,
        }
    }
}

/// [`LeadStore`] talking to the backend over HTTP.
#[derive(Clone)]
pub struct RestLeadStore<H: HttpClient> {
    http_client: H,
    config: BackendConfig,
}

impl<H: HttpClient> RestLeadStore<H> {
    pub fn new(http_client: H, config: BackendConfig) -> Self {
        Self {
            http_client,
            config,
        }
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    fn table_path(&self) -> String {
        format!("/rest/v1/{}", self.config.leads_table)
    }

    fn authorize(&self, request: HttpRequest) -> HttpRequest {
        request
            .header("apikey", self.config.api_key.as_str())
            .header("Authorization", format!("Bearer {}", self.config.api_key))
    }

    /// Path plus an encoded query string.
    fn query_path(&self, pairs: &[(&str, &str)]) -> Result<String> {
        let mut url = reqwest::Url::parse(&self.config.base_url).map_err(|e| {
            LeadCaptureError::Config(format!(
                "invalid backend base_url '{}': {}",
                self.config.base_url, e
            ))
        })?;
        url.set_path(&self.table_path());
        url.query_pairs_mut().extend_pairs(pairs);
        Ok(format!("{}?{}", url.path(), url.query().unwrap_or_default()))
    }
}

/// Decode either a representation array or a single row object.
fn decode_rows(body: &str) -> Result<Vec<LeadRow>> {
    let value: serde_json::Value = serde_json::from_str(body)?;
    if value.is_array() {
        Ok(serde_json::from_value(value)?)
    } else {
        Ok(vec![serde_json::from_value(value)?])
    }
}

fn status_error(response: &HttpResponse) -> String {
    format!("backend returned status {}: {}", response.status, response.body)
}

#[async_trait]
impl<H: HttpClient> LeadStore for RestLeadStore<H> {
    #[tracing::instrument(skip(self, lead), fields(session_id = %lead.session_id, industry = %lead.industry))]
    async fn insert_lead(&self, lead: &NewLead) -> Result<Lead> {
        let body = serde_json::to_string(&InsertRow {
            name: &lead.name,
            email: &lead.email,
            industry: lead.industry,
            session_id: &lead.session_id,
            created_at: lead.submitted_at,
        })?;

        let request = self
            .authorize(HttpRequest::post_json(
                &self.config.base_url,
                self.table_path(),
                body,
            ))
            .header("Prefer", "return=representation");

        let response = self
            .http_client
            .execute(&request, self.config.timeout_ms)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Lead insert request failed");
                LeadCaptureError::Persistence(e.to_string())
            })?;

        if !response.is_success() {
            tracing::error!(status = response.status, "Lead insert rejected by backend");
            return Err(LeadCaptureError::Persistence(status_error(&response)));
        }

        let row = decode_rows(&response.body)
            .map_err(|e| LeadCaptureError::Persistence(format!("unreadable insert response: {e}")))?
            .into_iter()
            .next()
            .ok_or_else(|| {
                LeadCaptureError::Persistence("backend returned no stored row".to_string())
            })?;

        let stored = Lead::from(row);
        tracing::info!(
            lead_id = %stored.id,
            email = %mask_email(&stored.email),
            "Lead stored"
        );
        Ok(stored)
    }

    #[tracing::instrument(skip(self))]
    async fn list_session_leads(&self, session_id: &SessionId) -> Result<Vec<Lead>> {
        let filter = format!("eq.{session_id}");
        let path = self.query_path(&[
            ("session_id", filter.as_str()),
            ("order", "created_at.desc"),
        ])?;
        let request = self.authorize(HttpRequest::get(&self.config.base_url, path));

        let response = self
            .http_client
            .execute(&request, self.config.timeout_ms)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Session lead listing request failed");
                LeadCaptureError::Persistence(e.to_string())
            })?;
        if !response.is_success() {
            return Err(LeadCaptureError::Persistence(status_error(&response)));
        }

        let rows = decode_rows(&response.body).map_err(|e| {
            LeadCaptureError::Persistence(format!("unreadable session listing: {e}"))
        })?;
        Ok(rows.into_iter().map(Lead::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::MockHttpClient;

    const INSERT_KEY: &str = "POST /rest/v1/leads";

    fn config() -> BackendConfig {
        BackendConfig {
            base_url: "https://proj.example.co".to_string(),
            api_key: "anon-key".to_string(),
            ..Default::default()
        }
    }

    fn new_lead() -> NewLead {
        NewLead {
            name: "Ana".to_string(),
            email: "ana@x.com".to_string(),
            industry: Industry::Technology,
            session_id: SessionId::parse("session_1_abc").unwrap(),
            submitted_at: "2026-01-02T03:04:05Z".parse().unwrap(),
        }
    }

    fn row_json(id: Uuid) -> String {
        format!(
            r#"[{{"id":"{id}","name":"Ana","email":"ana@x.com","industry":"technology","session_id":"session_1_abc","created_at":"2026-01-02T03:04:05Z"}}]"#
        )
    }

    #[tokio::test]
    async fn test_insert_posts_row_and_decodes_representation() {
        let http = MockHttpClient::new();
        let id = Uuid::new_v4();
        http.add_response(
            INSERT_KEY,
            Ok(HttpResponse {
                status: 201,
                body: row_json(id),
            }),
        );
        let store = RestLeadStore::new(http.clone(), config());

        let lead = store.insert_lead(&new_lead()).await.unwrap();
        assert_eq!(lead.id, LeadId(id));
        assert_eq!(lead.industry, Industry::Technology);
        assert_eq!(lead.session_id.as_str(), "session_1_abc");

        let calls = http.calls_to(INSERT_KEY);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].base_url, "https://proj.example.co");
        assert_eq!(calls[0].header("apikey"), Some("anon-key"));
        assert_eq!(calls[0].header("Authorization"), Some("Bearer anon-key"));
        assert_eq!(calls[0].header("Prefer"), Some("return=representation"));
        assert_eq!(calls[0].timeout_ms, 10_000);

        let sent: serde_json::Value = serde_json::from_str(&calls[0].body).unwrap();
        assert_eq!(sent["name"], "Ana");
        assert_eq!(sent["industry"], "technology");
        assert_eq!(sent["session_id"], "session_1_abc");
    }

    #[tokio::test]
    async fn test_insert_accepts_single_object_response() {
        let http = MockHttpClient::new();
        let id = Uuid::new_v4();
        let body = row_json(id);
        http.add_response(
            INSERT_KEY,
            Ok(HttpResponse {
                status: 201,
                body: body[1..body.len() - 1].to_string(),
            }),
        );
        let store = RestLeadStore::new(http, config());
        assert_eq!(store.insert_lead(&new_lead()).await.unwrap().id, LeadId(id));
    }

    #[tokio::test]
    async fn test_insert_error_status_is_persistence_error() {
        let http = MockHttpClient::new();
        http.add_response(
            INSERT_KEY,
            Ok(HttpResponse {
                status: 409,
                body: r#"{"message":"duplicate key"}"#.to_string(),
            }),
        );
        let store = RestLeadStore::new(http, config());
        let err = store.insert_lead(&new_lead()).await.unwrap_err();
        assert!(matches!(err, LeadCaptureError::Persistence(ref m) if m.contains("409")));
    }

    #[tokio::test]
    async fn test_insert_transport_error_is_persistence_error() {
        let http = MockHttpClient::new();
        http.add_response(
            INSERT_KEY,
            Err(LeadCaptureError::Other(anyhow::anyhow!("connection reset"))),
        );
        let store = RestLeadStore::new(http, config());
        let err = store.insert_lead(&new_lead()).await.unwrap_err();
        assert!(matches!(err, LeadCaptureError::Persistence(_)));
    }

    #[tokio::test]
    async fn test_insert_empty_representation_is_persistence_error() {
        let http = MockHttpClient::new();
        http.add_response(
            INSERT_KEY,
            Ok(HttpResponse {
                status: 201,
                body: "[]".to_string(),
            }),
        );
        let store = RestLeadStore::new(http, config());
        assert!(matches!(
            store.insert_lead(&new_lead()).await,
            Err(LeadCaptureError::Persistence(_))
        ));
    }

    #[tokio::test]
    async fn test_list_session_leads_filters_by_session() {
        let http = MockHttpClient::new();
        let id = Uuid::new_v4();
        let key = "GET /rest/v1/leads?session_id=eq.session_1_abc&order=created_at.desc";
        http.add_response(
            key,
            Ok(HttpResponse {
                status: 200,
                body: row_json(id),
            }),
        );
        let store = RestLeadStore::new(http.clone(), config());

        let session = SessionId::parse("session_1_abc").unwrap();
        let leads = store.list_session_leads(&session).await.unwrap();
        assert_eq!(leads.len(), 1);
        assert_eq!(leads[0].id, LeadId(id));
        assert_eq!(http.calls_to(key).len(), 1);
    }

    #[tokio::test]
    async fn test_list_session_leads_failures_are_persistence_errors() {
        let http = MockHttpClient::new();
        let key = "GET /rest/v1/leads?session_id=eq.session_1_abc&order=created_at.desc";
        http.add_response(
            key,
            Ok(HttpResponse {
                status: 200,
                body: "<html>gateway</html>".to_string(),
            }),
        );
        // Second call has no canned response, so the transport itself fails
        let store = RestLeadStore::new(http, config());
        let session = SessionId::parse("session_1_abc").unwrap();

        for _ in 0..2 {
            let err = store.list_session_leads(&session).await.unwrap_err();
            assert!(matches!(err, LeadCaptureError::Persistence(_)), "got {err:?}");
        }
    }
}
