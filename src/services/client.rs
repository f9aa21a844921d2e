use reqwest::{multipart, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::models::{Division, Invoice, InvoiceId, InvoiceStatus, Role};
use crate::services::auth::{AuthContext, UnauthorizedHook};
use crate::utils::DateRange;

/// Filter parameters for invoice listing. Date-range filtering happens on
/// the backend; nothing here is re-filtered client-side.
#[derive(Debug, Clone, Default)]
pub struct InvoiceQuery {
    pub status: Option<InvoiceStatus>,
    pub range: Option<DateRange>,
}

impl InvoiceQuery {
    pub fn pending() -> Self {
        Self {
            status: Some(InvoiceStatus::Pending),
            range: None,
        }
    }

    pub fn in_range(mut self, range: DateRange) -> Self {
        self.range = Some(range);
        self
    }

    fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(status) = self.status {
            params.push(("status", status.to_string()));
        }
        if let Some(range) = &self.range {
            params.push(("start_date", range.start_param()));
            params.push(("end_date", range.end_param()));
        }
        params
    }
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    token: String,
    role: Role,
}

#[derive(Serialize)]
struct RegisterRequest<'a> {
    username: &'a str,
    password: &'a str,
    role: Role,
}

#[derive(Deserialize)]
struct RegisterResponse {
    message: String,
}

/// Extraction receipt returned by the upload endpoint. The `data` payload
/// is informational; the edit flow re-fetches the stored invoice.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadReceipt {
    pub id: InvoiceId,
    #[serde(default)]
    pub data: Value,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Typed client for the invoice extraction service. One instance shares a
/// connection pool across all requests; the session token is passed per
/// call, never stored here.
pub struct ApiClient {
    base_url: String,
    client: reqwest::Client,
    on_unauthorized: Option<UnauthorizedHook>,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
            on_unauthorized: None,
        })
    }

    /// Install a callback fired whenever the backend answers 401, so the
    /// caller can route to re-authentication.
    pub fn with_unauthorized_hook(mut self, hook: UnauthorizedHook) -> Self {
        self.on_unauthorized = Some(hook);
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<AuthContext, ApiError> {
        let response = self
            .client
            .post(self.url("/login"))
            .json(&LoginRequest { username, password })
            .send()
            .await?;
        let body: LoginResponse = self.check(response).await?.json().await?;
        debug!(username, role = body.role.as_str(), "login succeeded");
        Ok(AuthContext::new(username, body.role, body.token))
    }

    pub async fn register(
        &self,
        auth: &AuthContext,
        username: &str,
        password: &str,
        role: Role,
    ) -> Result<String, ApiError> {
        let response = self
            .client
            .post(self.url("/register"))
            .bearer_auth(auth.token())
            .json(&RegisterRequest {
                username,
                password,
                role,
            })
            .send()
            .await?;
        let body: RegisterResponse = self.check(response).await?.json().await?;
        Ok(body.message)
    }

    pub async fn get_invoices(
        &self,
        auth: &AuthContext,
        division: Division,
        query: &InvoiceQuery,
    ) -> Result<Vec<Invoice>, ApiError> {
        let response = self
            .client
            .get(self.url(&format!("/get_invoices/{}", division)))
            .query(&query.params())
            .bearer_auth(auth.token())
            .send()
            .await?;
        let invoices: Vec<Invoice> = self.check(response).await?.json().await?;
        debug!(%division, count = invoices.len(), "fetched invoices");
        Ok(invoices)
    }

    pub async fn get_invoice(
        &self,
        auth: &AuthContext,
        division: Division,
        id: &InvoiceId,
    ) -> Result<Invoice, ApiError> {
        let response = self
            .client
            .get(self.url(&format!("/get_invoice/{}/{}", division, id.as_path_segment())))
            .bearer_auth(auth.token())
            .send()
            .await?;
        Ok(self.check(response).await?.json().await?)
    }

    /// Sends the full flat record. The backend applies it atomically; there
    /// is no partial update and no version check (last write wins).
    pub async fn edit_invoice(
        &self,
        auth: &AuthContext,
        division: Division,
        id: &InvoiceId,
        invoice: &Invoice,
    ) -> Result<(), ApiError> {
        let response = self
            .client
            .put(self.url(&format!("/edit_invoice/{}/{}", division, id.as_path_segment())))
            .bearer_auth(auth.token())
            .json(invoice)
            .send()
            .await?;
        self.check(response).await?;
        Ok(())
    }

    pub async fn approve_invoice(
        &self,
        auth: &AuthContext,
        division: Division,
        id: &InvoiceId,
    ) -> Result<(), ApiError> {
        let response = self
            .client
            .put(self.url(&format!(
                "/approve_invoice/{}/{}",
                division,
                id.as_path_segment()
            )))
            .bearer_auth(auth.token())
            .send()
            .await?;
        self.check(response).await?;
        Ok(())
    }

    pub async fn upload_invoice(
        &self,
        auth: &AuthContext,
        division: Division,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadReceipt, ApiError> {
        if bytes.is_empty() {
            return Err(ApiError::Validation("file is empty".to_string()));
        }
        if !file_name.to_ascii_lowercase().ends_with(".pdf") {
            return Err(ApiError::Validation(format!(
                "not a PDF file: {}",
                file_name
            )));
        }

        let part = multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str("application/pdf")
            .map_err(|e| ApiError::Validation(e.to_string()))?;
        let form = multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(self.url(&format!("/upload_invoice/{}", division)))
            .bearer_auth(auth.token())
            .multipart(form)
            .send()
            .await?;
        Ok(self.check(response).await?.json().await?)
    }

    pub async fn get_pdf(
        &self,
        auth: &AuthContext,
        division: Division,
        id: &InvoiceId,
    ) -> Result<Vec<u8>, ApiError> {
        let response = self
            .client
            .get(self.url(&format!("/get_pdf/{}/{}", division, id.as_path_segment())))
            .bearer_auth(auth.token())
            .send()
            .await?;
        Ok(self.check(response).await?.bytes().await?.to_vec())
    }

    pub async fn generate_report(
        &self,
        auth: &AuthContext,
        range: &DateRange,
    ) -> Result<Vec<Value>, ApiError> {
        let response = self
            .client
            .get(self.url("/generate_report"))
            .query(&[
                ("start_date", range.start_param()),
                ("end_date", range.end_param()),
            ])
            .bearer_auth(auth.token())
            .send()
            .await?;
        Ok(self.check(response).await?.json().await?)
    }

    /// Maps non-2xx statuses into the failure taxonomy instead of letting
    /// them surface as successful responses with bad bodies.
    async fn check(&self, response: Response) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|b| b.error)
            .unwrap_or_else(|_| {
                if body.trim().is_empty() {
                    status
                        .canonical_reason()
                        .unwrap_or("request failed")
                        .to_string()
                } else {
                    body
                }
            });

        warn!(status = status.as_u16(), %message, "request rejected");
        match status {
            StatusCode::UNAUTHORIZED => {
                if let Some(hook) = &self.on_unauthorized {
                    hook();
                }
                Err(ApiError::Auth(message))
            }
            StatusCode::NOT_FOUND => Err(ApiError::NotFound(message)),
            _ => Err(ApiError::Server {
                status: status.as_u16(),
                message,
            }),
        }
    }
}
