//! CMS backend client
//!
//! `CmsApi` is the seam the workflows and the query cache talk to;
//! `HttpApi` implements it over reqwest; `client.api_url` points at the
//! `/api/v1` root.

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::error::{ClientError, FALLBACK_MESSAGE};
use crate::config::ClientConfig;
use crate::models::{
    BulkCreateFaqItemsInput, DeleteUniversityRequest, DeleteUniversityResponse, EditUniversityRequest,
    EditUniversityResponse, Faq, FaqItem, FaqPair, ProcessSubmissionInput, Program, SubmissionCount,
    SubmissionDetail, University,
};

/// Backend operations consumed by the admin client
#[async_trait]
pub trait CmsApi: Send + Sync {
    async fn get_university(&self) -> Result<University, ClientError>;

    async fn edit_university(&self, request: &EditUniversityRequest) -> Result<EditUniversityResponse, ClientError>;

    async fn delete_university(
        &self,
        request: &DeleteUniversityRequest,
    ) -> Result<DeleteUniversityResponse, ClientError>;

    async fn get_faq(&self, college_id: i64) -> Result<Faq, ClientError>;

    async fn bulk_create_faq_items(&self, college_id: i64, items: &[FaqPair]) -> Result<Vec<FaqItem>, ClientError>;

    async fn list_submissions(&self, college_id: i64) -> Result<Vec<SubmissionDetail>, ClientError>;

    async fn count_submissions(&self, college_id: i64) -> Result<SubmissionCount, ClientError>;

    async fn process_submission(
        &self,
        college_id: i64,
        submission_id: i64,
        input: &ProcessSubmissionInput,
    ) -> Result<(), ClientError>;

    async fn list_programs(&self, college_id: i64) -> Result<Vec<Program>, ClientError>;
}

/// reqwest implementation of [`CmsApi`]
#[derive(Debug, Clone)]
pub struct HttpApi {
    client: reqwest::Client,
    base_url: String,
    tenant: String,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorBody>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl HttpApi {
    pub fn new(config: &ClientConfig, tenant: impl Into<String>, token: Option<String>) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("unicms/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.request_timeout_secs.max(1)))
            .build()
            .map_err(|e| ClientError::Network(format!("HTTP client error: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            tenant: tenant.into(),
            token,
        })
    }

    /// Public link to a form, shared with students
    pub fn form_link(&self, form_id: i64) -> String {
        form_link(&self.base_url, form_id)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let builder = self
            .client
            .request(method, url)
            .header("X-University", &self.tenant);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ClientError> {
        let response = check_status(builder.send().await?).await?;
        response.json::<T>().await.map_err(|e| ClientError::Decode(e.to_string()))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.send(self.request(Method::GET, path)).await
    }

    async fn post<B: Serialize + ?Sized + Sync, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T, ClientError> {
        self.send(self.request(Method::POST, path).json(body)).await
    }
}

pub fn form_link(api_url: &str, form_id: i64) -> String {
    format!("{}/forms/{}", api_url.trim_end_matches('/'), form_id)
}

/// Turn a non-2xx response into a server error carrying its message
async fn check_status(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ClientError::Server {
        status: status.as_u16(),
        message: error_message(&body),
    })
}

/// Server-provided message, or the generic fallback
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|env| env.error.and_then(|e| e.message).or(env.message))
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| FALLBACK_MESSAGE.to_string())
}

#[async_trait]
impl CmsApi for HttpApi {
    async fn get_university(&self) -> Result<University, ClientError> {
        self.get("/uni").await
    }

    async fn edit_university(&self, request: &EditUniversityRequest) -> Result<EditUniversityResponse, ClientError> {
        self.post("/uni/edit", request).await
    }

    async fn delete_university(
        &self,
        request: &DeleteUniversityRequest,
    ) -> Result<DeleteUniversityResponse, ClientError> {
        self.post("/uni/delete", request).await
    }

    async fn get_faq(&self, college_id: i64) -> Result<Faq, ClientError> {
        self.get(&format!("/colleges/{}/faq", college_id)).await
    }

    async fn bulk_create_faq_items(&self, college_id: i64, items: &[FaqPair]) -> Result<Vec<FaqItem>, ClientError> {
        let body = BulkCreateFaqItemsInput { items: items.to_vec() };
        self.post(&format!("/colleges/{}/faq/items/bulk", college_id), &body).await
    }

    async fn list_submissions(&self, college_id: i64) -> Result<Vec<SubmissionDetail>, ClientError> {
        self.get(&format!("/colleges/{}/faq/submissions", college_id)).await
    }

    async fn count_submissions(&self, college_id: i64) -> Result<SubmissionCount, ClientError> {
        self.get(&format!("/colleges/{}/faq/submissions/count", college_id)).await
    }

    async fn process_submission(
        &self,
        college_id: i64,
        submission_id: i64,
        input: &ProcessSubmissionInput,
    ) -> Result<(), ClientError> {
        let _: serde_json::Value = self
            .post(&format!("/colleges/{}/faq/submissions/{}", college_id, submission_id), input)
            .await?;
        Ok(())
    }

    async fn list_programs(&self, college_id: i64) -> Result<Vec<Program>, ClientError> {
        self.get(&format!("/colleges/{}/programs", college_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_from_envelope() {
        let body = r#"{"error":{"code":"VALIDATION_ERROR","message":"Invalid verification code"}}"#;
        assert_eq!(error_message(body), "Invalid verification code");
    }

    #[test]
    fn test_error_message_top_level() {
        assert_eq!(error_message(r#"{"message":"Slug taken"}"#), "Slug taken");
    }

    #[test]
    fn test_error_message_fallback() {
        assert_eq!(error_message(""), FALLBACK_MESSAGE);
        assert_eq!(error_message("<html>502</html>"), FALLBACK_MESSAGE);
        assert_eq!(error_message(r#"{"error":{"message":""}}"#), FALLBACK_MESSAGE);
    }

    #[test]
    fn test_form_link() {
        assert_eq!(form_link("https://cms.example.edu/", 12), "https://cms.example.edu/forms/12");

        let api = HttpApi::new(&ClientConfig::default(), "north", None).unwrap();
        assert!(api.form_link(3).ends_with("/forms/3"));
    }
}
