//! Typed calls for each backend resource the client consumes.

use reqwest::Method;
use serde_json::Value;

use super::client::{ApiClient, Auth, decode, json_body};
use super::error::ApiError;
use super::transport::RequestBody;
use crate::config::routes;
use crate::domain::{
    Credentials, ExportFormat, Feedback, Quota, RefreshRequest, RegisterRequest, TokenPair,
    UploadFile, UserProfile,
};

impl ApiClient {
    // --- auth ---

    pub async fn login(&self, credentials: &Credentials) -> Result<TokenPair, ApiError> {
        let body = json_body(routes::AUTH_LOGIN, credentials)?;
        let response = self
            .dispatch(Method::POST, routes::AUTH_LOGIN, body, Auth::Anonymous)
            .await?;
        decode(&response)
    }

    /// Creates the account. The caller logs in afterwards.
    pub async fn register(&self, request: &RegisterRequest) -> Result<(), ApiError> {
        let body = json_body(routes::AUTH_REGISTER, request)?;
        self.dispatch(Method::POST, routes::AUTH_REGISTER, body, Auth::Anonymous)
            .await?;
        Ok(())
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, ApiError> {
        let body = json_body(routes::AUTH_REFRESH, &RefreshRequest { refresh_token })?;
        let response = self
            .dispatch(Method::POST, routes::AUTH_REFRESH, body, Auth::Anonymous)
            .await?;
        decode(&response)
    }

    pub async fn current_user(&self) -> Result<UserProfile, ApiError> {
        self.get_json(routes::AUTH_ME).await
    }

    /// `/auth/me` with a token that has not been committed to the session yet.
    pub async fn current_user_with(&self, access_token: &str) -> Result<UserProfile, ApiError> {
        let response = self
            .dispatch(
                Method::GET,
                routes::AUTH_ME,
                RequestBody::Empty,
                Auth::Bearer(access_token.to_string()),
            )
            .await?;
        decode(&response)
    }

    pub async fn logout(&self) -> Result<(), ApiError> {
        self.request(Method::POST, routes::AUTH_LOGOUT, RequestBody::Empty)
            .await?;
        Ok(())
    }

    // --- conversions & results ---

    pub async fn conversions(&self) -> Result<Value, ApiError> {
        self.get_json(routes::CONVERSIONS).await
    }

    pub async fn conversion(&self, conversion_id: &str) -> Result<Value, ApiError> {
        self.get_json(&format!("{}/{}", routes::CONVERSIONS, encode(conversion_id)))
            .await
    }

    pub async fn schema(&self, conversion_id: Option<&str>) -> Result<Value, ApiError> {
        self.get_json(&with_conversion(routes::SCHEMA, conversion_id))
            .await
    }

    pub async fn summary(&self, conversion_id: Option<&str>) -> Result<Value, ApiError> {
        self.get_json(&with_conversion(routes::SUMMARY, conversion_id))
            .await
    }

    pub async fn outputs(&self, conversion_id: Option<&str>) -> Result<Value, ApiError> {
        self.get_json(&with_conversion(routes::OUTPUTS, conversion_id))
            .await
    }

    pub async fn quota(&self) -> Result<Quota, ApiError> {
        self.get_json(routes::QUOTA).await
    }

    pub async fn submit_feedback(&self, feedback: &Feedback) -> Result<(), ApiError> {
        let body = json_body(routes::FEEDBACK, feedback)?;
        self.request(Method::POST, routes::FEEDBACK, body).await?;
        Ok(())
    }

    // --- documents ---

    pub async fn documents(&self) -> Result<Value, ApiError> {
        self.get_json(routes::DOCUMENTS).await
    }

    pub async fn extract_document(&self, file: UploadFile) -> Result<Value, ApiError> {
        let response = self
            .request(Method::POST, routes::DOCS_EXTRACT, RequestBody::File(file))
            .await?;
        decode(&response)
    }

    /// Raw export bytes in the requested format.
    pub async fn export_document(
        &self,
        document_id: &str,
        format: ExportFormat,
    ) -> Result<Vec<u8>, ApiError> {
        let path = format!(
            "{}?format={}",
            routes::doc_export(&encode(document_id)),
            format
        );
        let response = self
            .request(Method::GET, &path, RequestBody::Empty)
            .await?;
        Ok(response.body)
    }
}

fn encode(segment: &str) -> String {
    url::form_urlencoded::byte_serialize(segment.as_bytes()).collect()
}

fn with_conversion(route: &str, conversion_id: Option<&str>) -> String {
    match conversion_id {
        Some(id) => format!("{}?conversion_id={}", route, encode(id)),
        None => route.to_string(),
    }
}
