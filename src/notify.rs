//! Confirmation email notification.
//!
//! The email itself is sent by a serverless function on the backend; this
//! module only invokes it. Failures here never undo a stored lead, so callers
//! receive a [`NotificationOutcome`] rather than an error.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::BackendConfig;
use crate::domain::lead::{Industry, Lead, mask_email};
use crate::error::{LeadCaptureError, Result};
use crate::http::{HttpClient, HttpRequest};

/// Payload handed to the confirmation function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationRequest {
    pub name: String,
    pub email: String,
    pub industry: Industry,
}

impl From<&Lead> for ConfirmationRequest {
    fn from(lead: &Lead) -> Self {
        Self {
            name: lead.name.clone(),
            email: lead.email.clone(),
            industry: lead.industry,
        }
    }
}

/// What happened when the confirmation was triggered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum NotificationOutcome {
    Sent,
    Failed {
        status: Option<u16>,
        message: String,
    },
}

impl NotificationOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, NotificationOutcome::Sent)
    }
}

impl From<Result<()>> for NotificationOutcome {
    fn from(result: Result<()>) -> Self {
        match result {
            Ok(()) => NotificationOutcome::Sent,
            Err(LeadCaptureError::Notification { status, message }) => {
                NotificationOutcome::Failed { status, message }
            }
            Err(other) => NotificationOutcome::Failed {
                status: None,
                message: other.to_string(),
            },
        }
    }
}

/// Triggers the out-of-band confirmation email.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_confirmation(&self, request: &ConfirmationRequest) -> Result<()>;
}

#[async_trait]
impl<N: Notifier + ?Sized> Notifier for std::sync::Arc<N> {
    async fn send_confirmation(&self, request: &ConfirmationRequest) -> Result<()> {
        (**self).send_confirmation(request).await
    }
}

/// [`Notifier`] that invokes `POST {base_url}/functions/v1/{function}`.
#[derive(Clone)]
pub struct FunctionNotifier<H: HttpClient> {
    http_client: H,
    config: BackendConfig,
}

impl<H: HttpClient> FunctionNotifier<H> {
    pub fn new(http_client: H, config: BackendConfig) -> Self {
        Self {
            http_client,
            config,
        }
    }

    fn function_path(&self) -> String {
        format!("/functions/v1/{}", self.config.confirmation_function)
    }
}

#[async_trait]
impl<H: HttpClient> Notifier for FunctionNotifier<H> {
    #[tracing::instrument(skip(self, request), fields(email = %mask_email(&request.email), industry = %request.industry))]
    async fn send_confirmation(&self, request: &ConfirmationRequest) -> Result<()> {
        let body = serde_json::to_string(request)?;
        let http_request =
            HttpRequest::post_json(&self.config.base_url, self.function_path(), body)
                .header("Authorization", format!("Bearer {}", self.config.api_key));

        let response = self
            .http_client
            .execute(&http_request, self.config.timeout_ms)
            .await
            .map_err(|e| LeadCaptureError::Notification {
                status: None,
                message: e.to_string(),
            })?;

        if !response.is_success() {
            return Err(LeadCaptureError::Notification {
                status: Some(response.status),
                message: response.body,
            });
        }

        tracing::debug!(status = response.status, "Confirmation function invoked");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{HttpResponse, MockHttpClient};

    const FUNCTION_KEY: &str = "POST /functions/v1/send-confirmation";

    fn notifier(http: MockHttpClient) -> FunctionNotifier<MockHttpClient> {
        FunctionNotifier::new(
            http,
            BackendConfig {
                base_url: "https://proj.example.co".to_string(),
                api_key: "anon-key".to_string(),
                ..Default::default()
            },
        )
    }

    fn request() -> ConfirmationRequest {
        ConfirmationRequest {
            name: "Ana".to_string(),
            email: "ana@x.com".to_string(),
            industry: Industry::Education,
        }
    }

    #[tokio::test]
    async fn test_sends_name_email_and_industry() {
        let http = MockHttpClient::new();
        http.add_response(
            FUNCTION_KEY,
            Ok(HttpResponse {
                status: 200,
                body: r#"{"ok":true}"#.to_string(),
            }),
        );

        notifier(http.clone())
            .send_confirmation(&request())
            .await
            .unwrap();

        let calls = http.calls_to(FUNCTION_KEY);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].header("Authorization"), Some("Bearer anon-key"));
        let sent: ConfirmationRequest = serde_json::from_str(&calls[0].body).unwrap();
        assert_eq!(sent, request());
    }

    #[tokio::test]
    async fn test_error_status_becomes_notification_error() {
        let http = MockHttpClient::new();
        http.add_response(
            FUNCTION_KEY,
            Ok(HttpResponse {
                status: 500,
                body: "mail provider down".to_string(),
            }),
        );

        let err = notifier(http)
            .send_confirmation(&request())
            .await
            .unwrap_err();

        let outcome = NotificationOutcome::from(Err(err));
        assert_eq!(
            outcome,
            NotificationOutcome::Failed {
                status: Some(500),
                message: "mail provider down".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_transport_error_becomes_notification_error() {
        let http = MockHttpClient::new();
        let err = notifier(http)
            .send_confirmation(&request())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LeadCaptureError::Notification { status: None, .. }
        ));
    }
}
