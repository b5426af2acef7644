//! # Campus Client SDK
//!
//! A typed Rust client for the event registration API.

use campus_types::{
    AssignRankRequest, AttendanceRequest, BulkAttendanceRequest, CancelCheckoutRequest,
    ConfirmPaymentRequest, CreateOrderRequest, CreateOrderResponse, EventId,
    ParticipantCountResponse, RegistrationId, RegistrationResponse, StudentId, SubeventId,
};
use reqwest::Client;
use serde::de::DeserializeOwned;

/// Error type for client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Registration API client.
pub struct CampusClient {
    base_url: String,
    api_key: Option<String>,
    http: Client,
}

impl CampusClient {
    /// Creates a new client.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
            http: Client::new(),
        }
    }

    /// Sets the API key for authentication.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Checks if the API is healthy.
    pub async fn health(&self) -> Result<bool, ClientError> {
        let resp = self
            .http
            .get(format!("{}/health", self.base_url))
            .send()
            .await?;
        Ok(resp.status().is_success())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // API keys
    // ─────────────────────────────────────────────────────────────────────────

    /// Bootstraps the first API key. Only works when none exist yet.
    pub async fn bootstrap(&self, name: &str) -> Result<String, ClientError> {
        let resp: serde_json::Value = self
            .post("/api/bootstrap", &serde_json::json!({ "name": name }))
            .await?;
        Ok(resp["api_key"].as_str().unwrap_or_default().to_string())
    }

    /// Creates a new API key, returning the raw key.
    pub async fn create_api_key(&self, name: &str) -> Result<String, ClientError> {
        let resp: serde_json::Value = self
            .post("/api/keys", &serde_json::json!({ "name": name }))
            .await?;
        Ok(resp["api_key"].as_str().unwrap_or_default().to_string())
    }

    /// Lists API keys (without raw key material).
    pub async fn list_api_keys(&self) -> Result<serde_json::Value, ClientError> {
        self.get("/api/keys").await
    }

    /// Deletes (deactivates) an API key.
    pub async fn delete_api_key(&self, id: &str) -> Result<(), ClientError> {
        self.delete(&format!("/api/keys/{}", id)).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Checkout
    // ─────────────────────────────────────────────────────────────────────────

    /// Creates a gateway order for a registration intent.
    pub async fn create_order(
        &self,
        req: &CreateOrderRequest,
    ) -> Result<CreateOrderResponse, ClientError> {
        self.post("/api/payments/order", req).await
    }

    /// Submits a gateway confirmation for verification and commit.
    pub async fn confirm_payment(
        &self,
        req: &ConfirmPaymentRequest,
    ) -> Result<RegistrationResponse, ClientError> {
        self.post("/api/payments/confirm", req).await
    }

    /// Records an abandoned checkout.
    pub async fn cancel_checkout(&self, order_id: &str) -> Result<(), ClientError> {
        let req = CancelCheckoutRequest {
            order_id: order_id.to_string(),
        };
        self.post_no_content("/api/payments/cancel", &req).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Registrations
    // ─────────────────────────────────────────────────────────────────────────

    /// Lists a student's registrations.
    pub async fn student_registrations(
        &self,
        student_id: StudentId,
    ) -> Result<Vec<RegistrationResponse>, ClientError> {
        self.get(&format!("/api/registrations/student/{}", student_id))
            .await
    }

    /// Lists registrations for an event, optionally for one sub-event.
    pub async fn event_registrations(
        &self,
        event_id: EventId,
        subevent_id: Option<SubeventId>,
    ) -> Result<Vec<RegistrationResponse>, ClientError> {
        self.get(&event_path("/api/registrations/event", event_id, subevent_id))
            .await
    }

    /// Counts paid participants for an event or sub-event.
    pub async fn participant_count(
        &self,
        event_id: EventId,
        subevent_id: Option<SubeventId>,
    ) -> Result<i64, ClientError> {
        let path = match subevent_id {
            Some(s) => format!("/api/registrations/event/{}/count?subevent={}", event_id, s),
            None => format!("/api/registrations/event/{}/count", event_id),
        };
        let resp: ParticipantCountResponse = self.get(&path).await?;
        Ok(resp.count)
    }

    /// Marks attendance on one registration.
    pub async fn mark_attendance(
        &self,
        id: RegistrationId,
        present: bool,
    ) -> Result<RegistrationResponse, ClientError> {
        let req = AttendanceRequest { present };
        self.post(&format!("/api/registrations/{}/attendance", id), &req)
            .await
    }

    /// Marks attendance on every paid registration of a sub-event.
    pub async fn bulk_attendance(
        &self,
        event_id: EventId,
        subevent_id: SubeventId,
        present: bool,
    ) -> Result<Vec<RegistrationResponse>, ClientError> {
        let req = BulkAttendanceRequest {
            event_id,
            subevent_id,
            present,
        };
        self.post("/api/registrations/attendance/bulk", &req).await
    }

    /// Assigns a competition rank.
    pub async fn assign_rank(
        &self,
        id: RegistrationId,
        rank: i32,
    ) -> Result<RegistrationResponse, ClientError> {
        let req = AssignRankRequest { rank };
        self.post(&format!("/api/registrations/{}/rank", id), &req)
            .await
    }

    /// Ranked leaderboard for a sub-event.
    pub async fn leaderboard(
        &self,
        event_id: EventId,
        subevent_id: SubeventId,
    ) -> Result<Vec<RegistrationResponse>, ClientError> {
        self.get(&format!("/api/leaderboard/{}/{}", event_id, subevent_id))
            .await
    }

    /// Deletes every registration of an event. Returns rows removed.
    pub async fn purge_event(&self, event_id: EventId) -> Result<u64, ClientError> {
        let resp: serde_json::Value = self
            .delete_json(&format!("/api/registrations/event/{}", event_id))
            .await?;
        Ok(resp["removed"].as_u64().unwrap_or(0))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Transport helpers
    // ─────────────────────────────────────────────────────────────────────────

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => req.header("Authorization", format!("Bearer {}", key)),
            None => req,
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let req = self.authorize(self.http.get(format!("{}{}", self.base_url, path)));
        let resp = req.send().await?;
        self.handle_response(resp).await
    }

    async fn post<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let req = self.authorize(
            self.http
                .post(format!("{}{}", self.base_url, path))
                .json(body),
        );
        let resp = req.send().await?;
        self.handle_response(resp).await
    }

    async fn post_no_content<B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<(), ClientError> {
        let req = self.authorize(
            self.http
                .post(format!("{}{}", self.base_url, path))
                .json(body),
        );
        let resp = req.send().await?;
        self.handle_empty(resp).await
    }

    async fn delete(&self, path: &str) -> Result<(), ClientError> {
        let req = self.authorize(self.http.delete(format!("{}{}", self.base_url, path)));
        let resp = req.send().await?;
        self.handle_empty(resp).await
    }

    async fn delete_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let req = self.authorize(self.http.delete(format!("{}{}", self.base_url, path)));
        let resp = req.send().await?;
        self.handle_response(resp).await
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = resp.status();
        if status.is_success() {
            let body = resp.text().await?;
            Ok(serde_json::from_str(&body)?)
        } else {
            Err(self.api_error(status, resp).await)
        }
    }

    async fn handle_empty(&self, resp: reqwest::Response) -> Result<(), ClientError> {
        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(self.api_error(status, resp).await)
        }
    }

    async fn api_error(
        &self,
        status: reqwest::StatusCode,
        resp: reqwest::Response,
    ) -> ClientError {
        let body = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(String::from))
            .unwrap_or(body);
        ClientError::Api {
            status: status.as_u16(),
            message,
        }
    }
}

fn event_path(base: &str, event_id: EventId, subevent_id: Option<SubeventId>) -> String {
    match subevent_id {
        Some(s) => format!("{}/{}?subevent={}", base, event_id, s),
        None => format!("{}/{}", base, event_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = CampusClient::new("http://localhost:3000");
        assert_eq!(client.base_url, "http://localhost:3000");
    }

    #[test]
    fn test_client_with_trailing_slash() {
        let client = CampusClient::new("http://localhost:3000/");
        assert_eq!(client.base_url, "http://localhost:3000");
    }

    #[test]
    fn test_client_with_api_key() {
        let client = CampusClient::new("http://localhost:3000").with_api_key("test-key");
        assert_eq!(client.api_key, Some("test-key".to_string()));
    }

    #[test]
    fn test_event_path_with_subevent() {
        assert_eq!(
            event_path("/api/registrations/event", EventId::new(7), Some(SubeventId::new(3))),
            "/api/registrations/event/7?subevent=3"
        );
    }
}
