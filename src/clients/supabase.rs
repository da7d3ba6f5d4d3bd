//! Thin client for a hosted Supabase project: `PostgREST` under `/rest/v1` and
//! the identity service under `/auth/v1`.

use std::sync::RwLock;
use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use url::Url;

/// `PostgREST` code for "the result contains 0 rows" on a single-object request.
pub const NO_ROWS_CODE: &str = "PGRST116";

const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

#[derive(Debug, Error)]
pub enum SupabaseError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Invalid header value: {0}")]
    Header(#[from] reqwest::header::InvalidHeaderValue),

    #[error("{status}: {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl SupabaseError {
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Api { status, code, .. } => {
                code.as_deref() == Some(NO_ROWS_CODE) || *status == StatusCode::NOT_FOUND.as_u16()
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    pub url: String,

    pub api_key: String,

    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthUser {
    pub id: String,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthSession {
    pub access_token: String,

    #[serde(default)]
    pub refresh_token: Option<String>,

    pub user: AuthUser,
}

/// Sign-up either yields a session straight away or, when the project
/// requires email confirmation, only the pending user.
#[derive(Debug, Clone)]
pub enum SignUpResponse {
    Session(AuthSession),
    Pending(AuthUser),
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<serde_json::Value>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug)]
pub struct SupabaseClient {
    client: Client,
    base: Url,
    api_key: String,
    access_token: RwLock<Option<String>>,
}

impl SupabaseClient {
    pub fn new(config: &SupabaseConfig) -> Result<Self, SupabaseError> {
        let base = Url::parse(&format!("{}/", config.url.trim_end_matches('/')))?;

        let mut builder = Client::builder().user_agent("anishelf/0.1");
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base,
            api_key: config.api_key.clone(),
            access_token: RwLock::new(None),
        })
    }

    /// Token sent as the bearer for subsequent requests. `None` falls back to
    /// the anonymous API key.
    pub fn set_access_token(&self, token: Option<String>) {
        if let Ok(mut guard) = self.access_token.write() {
            *guard = token;
        }
    }

    #[must_use]
    pub fn access_token(&self) -> Option<String> {
        self.access_token.read().ok().and_then(|t| t.clone())
    }

    fn endpoint(&self, path: &str, query: &[(&str, &str)]) -> Result<Url, SupabaseError> {
        let mut url = self.base.join(path)?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> Result<RequestBuilder, SupabaseError> {
        let bearer = self
            .access_token()
            .unwrap_or_else(|| self.api_key.clone());

        let mut headers = HeaderMap::new();
        headers.insert("apikey", HeaderValue::from_str(&self.api_key)?);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {bearer}"))?,
        );

        debug!(%method, %url, "Supabase request");
        Ok(self.client.request(method, url).headers(headers))
    }

    async fn check(response: Response) -> Result<Response, SupabaseError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let body: ErrorBody = serde_json::from_str(&text).unwrap_or_default();
        let code = body.code.map(|c| match c {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        });
        let message = body
            .message
            .or(body.msg)
            .or(body.error_description)
            .or(body.error)
            .unwrap_or(text);

        Err(SupabaseError::Api {
            status: status.as_u16(),
            code,
            message,
        })
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, SupabaseError> {
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| SupabaseError::Decode(e.to_string()))
    }

    /// `GET /rest/v1/<table>` with raw `PostgREST` query pairs.
    pub async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>, SupabaseError> {
        let url = self.endpoint(&format!("rest/v1/{table}"), query)?;
        let response = self.request(Method::GET, url)?.send().await?;
        Self::decode(Self::check(response).await?).await
    }

    /// Single-row select. Zero rows surfaces as an error for which
    /// [`SupabaseError::is_not_found`] holds.
    pub async fn select_single<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, &str)],
    ) -> Result<T, SupabaseError> {
        let url = self.endpoint(&format!("rest/v1/{table}"), query)?;
        let response = self
            .request(Method::GET, url)?
            .header(ACCEPT, SINGLE_OBJECT)
            .send()
            .await?;
        Self::decode(Self::check(response).await?).await
    }

    /// Inserts one row and returns it as stored.
    pub async fn insert<B, T>(&self, table: &str, row: &B) -> Result<T, SupabaseError>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(&format!("rest/v1/{table}"), &[])?;
        let response = self
            .request(Method::POST, url)?
            .header("Prefer", "return=representation")
            .header(ACCEPT, SINGLE_OBJECT)
            .json(row)
            .send()
            .await?;
        Self::decode(Self::check(response).await?).await
    }

    pub async fn insert_minimal<B>(&self, table: &str, row: &B) -> Result<(), SupabaseError>
    where
        B: Serialize + Sync + ?Sized,
    {
        let url = self.endpoint(&format!("rest/v1/{table}"), &[])?;
        let response = self
            .request(Method::POST, url)?
            .header("Prefer", "return=minimal")
            .json(row)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    pub async fn update<B>(
        &self,
        table: &str,
        filters: &[(&str, &str)],
        patch: &B,
    ) -> Result<(), SupabaseError>
    where
        B: Serialize + Sync + ?Sized,
    {
        let url = self.endpoint(&format!("rest/v1/{table}"), filters)?;
        let response = self
            .request(Method::PATCH, url)?
            .header("Prefer", "return=minimal")
            .json(patch)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    pub async fn delete(&self, table: &str, filters: &[(&str, &str)]) -> Result<(), SupabaseError> {
        let url = self.endpoint(&format!("rest/v1/{table}"), filters)?;
        let response = self.request(Method::DELETE, url)?.send().await?;
        Self::check(response).await?;
        Ok(())
    }

    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
    ) -> Result<SignUpResponse, SupabaseError> {
        let url = self.endpoint("auth/v1/signup", &[])?;
        let response = self
            .request(Method::POST, url)?
            .json(&Credentials { email, password })
            .send()
            .await?;
        let value: serde_json::Value = Self::decode(Self::check(response).await?).await?;

        let parsed = if value.get("access_token").is_some() {
            serde_json::from_value(value).map(SignUpResponse::Session)
        } else if let Some(user) = value.get("user").cloned() {
            serde_json::from_value(user).map(SignUpResponse::Pending)
        } else {
            serde_json::from_value(value).map(SignUpResponse::Pending)
        };
        parsed.map_err(|e| SupabaseError::Decode(e.to_string()))
    }

    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, SupabaseError> {
        let url = self.endpoint("auth/v1/token", &[("grant_type", "password")])?;
        let response = self
            .request(Method::POST, url)?
            .json(&Credentials { email, password })
            .send()
            .await?;
        Self::decode(Self::check(response).await?).await
    }

    /// Revokes the current access token server-side.
    pub async fn sign_out(&self) -> Result<(), SupabaseError> {
        let url = self.endpoint("auth/v1/logout", &[])?;
        let response = self.request(Method::POST, url)?.send().await?;
        Self::check(response).await?;
        Ok(())
    }

    pub async fn recover(&self, email: &str) -> Result<(), SupabaseError> {
        let url = self.endpoint("auth/v1/recover", &[])?;
        let response = self
            .request(Method::POST, url)?
            .json(&serde_json::json!({ "email": email }))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(url: &str) -> SupabaseClient {
        SupabaseClient::new(&SupabaseConfig {
            url: url.to_string(),
            api_key: "anon".to_string(),
            timeout: None,
        })
        .unwrap()
    }

    #[test]
    fn endpoint_keeps_project_path_and_encodes_query() {
        let c = client("https://example.supabase.co/base");
        let url = c
            .endpoint("rest/v1/anime", &[("is_archived", "eq.false")])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://example.supabase.co/base/rest/v1/anime?is_archived=eq.false"
        );
    }

    #[test]
    fn not_found_matches_postgrest_code() {
        let err = SupabaseError::Api {
            status: 406,
            code: Some(NO_ROWS_CODE.to_string()),
            message: "JSON object requested, multiple (or no) rows returned".to_string(),
        };
        assert!(err.is_not_found());

        let other = SupabaseError::Api {
            status: 409,
            code: Some("23505".to_string()),
            message: "duplicate key".to_string(),
        };
        assert!(!other.is_not_found());
    }

    #[test]
    fn access_token_overrides_api_key() {
        let c = client("https://example.supabase.co");
        assert_eq!(c.access_token(), None);
        c.set_access_token(Some("jwt".to_string()));
        assert_eq!(c.access_token().as_deref(), Some("jwt"));
        c.set_access_token(None);
        assert_eq!(c.access_token(), None);
    }
}
