use anyhow::{anyhow, Result};
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client, Method,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error};

use shared_config::AppConfig;

/// Thin PostgREST client. Row filters are expressed in the path
/// (`?uid=eq.XC-001`), mutations opt into `return=representation` so the
/// stored row comes back in the same round trip.
pub struct SupabaseClient {
    client: Client,
    base_url: String,
    anon_key: String,
}

impl SupabaseClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.supabase_url.clone(),
            anon_key: config.supabase_anon_key.clone(),
        }
    }

    fn get_headers(&self, auth_token: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();

        if let Ok(key) = HeaderValue::from_str(&self.anon_key) {
            headers.insert("apikey", key);
        }
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = auth_token {
            if let Ok(bearer) = HeaderValue::from_str(&format!("Bearer {}", token)) {
                headers.insert(AUTHORIZATION, bearer);
            }
        }

        headers
    }

    pub async fn request<T>(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
    ) -> Result<T>
    where
        T: DeserializeOwned,
    {
        self.request_with_headers(method, path, auth_token, body, None)
            .await
    }

    pub async fn request_with_headers<T>(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
        extra_headers: Option<HeaderMap>,
    ) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making request to {}", url);

        let mut headers = self.get_headers(auth_token);
        if let Some(extra) = extra_headers {
            headers.extend(extra);
        }

        let mut req = self.client.request(method, &url).headers(headers);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            error!("API error ({}): {}", status, error_text);

            return Err(match status.as_u16() {
                401 | 403 => anyhow!("Authentication error: {}", error_text),
                404 => anyhow!("Resource not found: {}", error_text),
                409 => anyhow!("Conflict: {}", error_text),
                _ => anyhow!("API error ({}): {}", status, error_text),
            });
        }

        // DELETE without representation returns an empty body
        let text = response.text().await?;
        if text.is_empty() {
            return serde_json::from_str("null")
                .map_err(|e| anyhow!("Failed to decode empty response: {}", e));
        }

        let data = serde_json::from_str::<T>(&text)
            .map_err(|e| anyhow!("Failed to decode response: {}", e))?;
        Ok(data)
    }

    /// Insert one row and return the stored representation.
    pub async fn insert(
        &self,
        table: &str,
        auth_token: Option<&str>,
        body: Value,
    ) -> Result<Vec<Value>> {
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));

        self.request_with_headers(
            Method::POST,
            &format!("/rest/v1/{}", table),
            auth_token,
            Some(body),
            Some(headers),
        )
        .await
    }

    /// Patch rows matched by `filter` (e.g. `id=eq.<uuid>`) and return them.
    pub async fn patch(
        &self,
        table: &str,
        filter: &str,
        auth_token: Option<&str>,
        body: Value,
    ) -> Result<Vec<Value>> {
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));

        self.request_with_headers(
            Method::PATCH,
            &format!("/rest/v1/{}?{}", table, filter),
            auth_token,
            Some(body),
            Some(headers),
        )
        .await
    }

    /// Upsert keyed by a unique column: insert, or overwrite the existing
    /// row when `on_conflict` matches.
    pub async fn upsert(
        &self,
        table: &str,
        on_conflict: &str,
        auth_token: Option<&str>,
        body: Value,
    ) -> Result<Vec<Value>> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "Prefer",
            HeaderValue::from_static("resolution=merge-duplicates,return=representation"),
        );

        self.request_with_headers(
            Method::POST,
            &format!("/rest/v1/{}?on_conflict={}", table, on_conflict),
            auth_token,
            Some(body),
            Some(headers),
        )
        .await
    }

    pub async fn delete(&self, table: &str, filter: &str, auth_token: Option<&str>) -> Result<()> {
        let _: Value = self
            .request_with_headers(
                Method::DELETE,
                &format!("/rest/v1/{}?{}", table, filter),
                auth_token,
                None,
                None,
            )
            .await?;
        Ok(())
    }

    pub fn get_base_url(&self) -> &str {
        &self.base_url
    }
}
