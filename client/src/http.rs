//! HTTP implementation of the collaborator interface.

use async_trait::async_trait;
use frontdesk_core::{Appointment, AppointmentId, BranchId, ErrorKind, SalonId};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use std::time::Duration;

use crate::backend::{Actor, Backend, BookingRequest, CommandReceipt};
use crate::error::ClientError;
use crate::page::{Page, PageQuery};

/// Default per-request deadline.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Error body the collaborator sends on rejections, in either casing.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default, alias = "error_code", alias = "errorCode")]
    code: Option<String>,
    #[serde(default, alias = "detail", alias = "error")]
    message: Option<String>,
}

/// Mutation envelope sent with every command.
#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct CommandEnvelope<'a> {
    actor: &'a str,
    role: &'a crate::backend::ActorRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'a str>,
}

/// REST client for the salon collaborator.
#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
    salon: SalonId,
    branch: Option<BranchId>,
    timeout: Duration,
}

impl BackendClient {
    /// Creates a client for one salon against a base URL.
    ///
    /// Trailing slashes on the base URL are tolerated.
    #[must_use]
    pub fn new(base_url: impl Into<String>, salon: SalonId) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            client: Client::new(),
            base_url,
            salon,
            branch: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Scopes every request to a branch.
    #[must_use]
    pub fn with_branch(mut self, branch: BranchId) -> Self {
        self.branch = Some(branch);
        self
    }

    /// Replaces the per-request deadline.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn listing_params(&self, query: &PageQuery) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("salonId", self.salon.to_string()),
            ("page", query.page.to_string()),
            ("size", query.size.to_string()),
        ];
        if let Some(branch) = &self.branch {
            params.push(("branchId", branch.to_string()));
        }
        if let Some(sort) = &query.sort {
            params.push(("sort", sort.as_param()));
        }
        params
    }

    fn map_transport(error: &reqwest::Error) -> ClientError {
        if error.is_timeout() {
            ClientError::TimedOut(error.to_string())
        } else {
            ClientError::RequestFailed(error.to_string())
        }
    }

    /// Maps a non-success response to a classified error.
    ///
    /// A recognized code in the body wins over the HTTP status, because
    /// some collaborator builds put domain rejections behind generic 400s.
    fn classify_failure(status: StatusCode, body: &str) -> ClientError {
        let parsed: Option<ErrorBody> = serde_json::from_str(body).ok();
        let message = parsed
            .as_ref()
            .and_then(|b| b.message.clone())
            .unwrap_or_else(|| {
                if body.trim().is_empty() {
                    status.to_string()
                } else {
                    body.to_string()
                }
            });

        let coded = parsed
            .and_then(|b| b.code)
            .and_then(|code| ErrorKind::from_code(&code));
        match coded {
            Some(ErrorKind::PermissionDenied) => {
                return ClientError::PermissionDenied { message };
            }
            Some(ErrorKind::InvalidStatus) => return ClientError::InvalidStatus { message },
            Some(ErrorKind::BusinessRuleViolation) => {
                return ClientError::BusinessRule { message };
            }
            _ => {}
        }

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                ClientError::PermissionDenied { message }
            }
            StatusCode::CONFLICT => ClientError::InvalidStatus { message },
            StatusCode::UNPROCESSABLE_ENTITY => ClientError::BusinessRule { message },
            _ => ClientError::ApiError {
                status: status.as_u16(),
                message,
            },
        }
    }

    async fn decode<T>(response: Response) -> Result<T, ClientError>
    where
        T: serde::de::DeserializeOwned,
    {
        let status = response.status();
        if status.is_success() {
            response
                .json::<T>()
                .await
                .map_err(|e| ClientError::ResponseParseFailed(e.to_string()))
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(Self::classify_failure(status, &body))
        }
    }

    async fn get_page(
        &self,
        path: &str,
        query: &PageQuery,
    ) -> Result<Page<Appointment>, ClientError> {
        tracing::debug!(path, page = query.page, size = query.size, "listing appointments");
        let response = self
            .client
            .get(format!("{}{path}", self.base_url))
            .timeout(self.timeout)
            .query(&self.listing_params(query))
            .send()
            .await
            .map_err(|e| Self::map_transport(&e))?;
        Self::decode(response).await
    }

    async fn post_command(
        &self,
        path: &str,
        actor: &Actor,
        reason: Option<&str>,
    ) -> Result<CommandReceipt, ClientError> {
        let envelope = CommandEnvelope {
            actor: &actor.display_name,
            role: &actor.role,
            reason,
        };
        let response = self
            .client
            .post(format!("{}{path}", self.base_url))
            .timeout(self.timeout)
            .query(&[("salonId", self.salon.to_string())])
            .json(&envelope)
            .send()
            .await
            .map_err(|e| Self::map_transport(&e))?;

        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            return Ok(CommandReceipt::default());
        }
        Self::decode(response).await
    }
}

#[async_trait]
impl Backend for BackendClient {
    async fn list_appointments(&self, query: &PageQuery) -> Result<Page<Appointment>, ClientError> {
        self.get_page("/appointments", query).await
    }

    async fn list_today_appointments(
        &self,
        query: &PageQuery,
    ) -> Result<Page<Appointment>, ClientError> {
        self.get_page("/appointments/today", query).await
    }

    async fn list_pending_payments(
        &self,
        query: &PageQuery,
    ) -> Result<Page<Appointment>, ClientError> {
        self.get_page("/appointments/pending-payments", query).await
    }

    async fn fetch_appointment(
        &self,
        id: &AppointmentId,
    ) -> Result<Option<Appointment>, ClientError> {
        let response = self
            .client
            .get(format!("{}/appointments/{id}", self.base_url))
            .timeout(self.timeout)
            .query(&[("salonId", self.salon.to_string())])
            .send()
            .await
            .map_err(|e| Self::map_transport(&e))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Self::decode(response).await.map(Some)
    }

    async fn book_appointment(
        &self,
        request: &BookingRequest,
        actor: &Actor,
    ) -> Result<CommandReceipt, ClientError> {
        tracing::debug!(customer = %request.customer_name, "booking appointment");
        let response = self
            .client
            .post(format!("{}/appointments", self.base_url))
            .timeout(self.timeout)
            .query(&[
                ("salonId", self.salon.to_string()),
                ("actor", actor.display_name.clone()),
            ])
            .json(request)
            .send()
            .await
            .map_err(|e| Self::map_transport(&e))?;
        Self::decode(response).await
    }

    async fn confirm_payment(
        &self,
        id: &AppointmentId,
        actor: &Actor,
    ) -> Result<CommandReceipt, ClientError> {
        self.post_command(&format!("/appointments/{id}/confirm-payment"), actor, None)
            .await
    }

    async fn complete_session(
        &self,
        id: &AppointmentId,
        actor: &Actor,
    ) -> Result<CommandReceipt, ClientError> {
        self.post_command(&format!("/appointments/{id}/complete"), actor, None)
            .await
    }

    async fn cancel_appointment(
        &self,
        id: &AppointmentId,
        actor: &Actor,
        reason: Option<&str>,
    ) -> Result<CommandReceipt, ClientError> {
        self.post_command(&format!("/appointments/{id}/cancel"), actor, reason)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_loses_trailing_slashes() {
        let client = BackendClient::new("http://localhost:8080/", SalonId::new("salon-1"));
        assert_eq!(client.base_url, "http://localhost:8080");
    }

    #[test]
    fn listing_params_carry_scope_paging_and_sort() {
        use crate::page::{SortDirection, SortSpec};

        let client = BackendClient::new("http://localhost:8080", SalonId::new("salon-1"))
            .with_branch(BranchId::new("downtown"));
        let query = PageQuery {
            page: 2,
            size: 25,
            sort: Some(SortSpec::by("scheduledAt", SortDirection::Descending)),
        };
        let params = client.listing_params(&query);
        assert!(params.contains(&("salonId", "salon-1".to_string())));
        assert!(params.contains(&("branchId", "downtown".to_string())));
        assert!(params.contains(&("page", "2".to_string())));
        assert!(params.contains(&("size", "25".to_string())));
        assert!(params.contains(&("sort", "scheduledAt,desc".to_string())));
    }

    #[test]
    fn body_code_wins_over_the_http_status() {
        let error = BackendClient::classify_failure(
            StatusCode::BAD_REQUEST,
            r#"{"code": "INVALID_STATUS", "message": "appointment already cancelled"}"#,
        );
        assert!(matches!(error, ClientError::InvalidStatus { ref message }
            if message == "appointment already cancelled"));
    }

    #[test]
    fn status_classifies_when_the_body_says_nothing() {
        assert!(matches!(
            BackendClient::classify_failure(StatusCode::FORBIDDEN, ""),
            ClientError::PermissionDenied { .. }
        ));
        assert!(matches!(
            BackendClient::classify_failure(StatusCode::CONFLICT, "taken"),
            ClientError::InvalidStatus { .. }
        ));
        assert!(matches!(
            BackendClient::classify_failure(StatusCode::UNPROCESSABLE_ENTITY, "{}"),
            ClientError::BusinessRule { .. }
        ));
        assert!(matches!(
            BackendClient::classify_failure(StatusCode::INTERNAL_SERVER_ERROR, "boom"),
            ClientError::ApiError { status: 500, .. }
        ));
    }
}
