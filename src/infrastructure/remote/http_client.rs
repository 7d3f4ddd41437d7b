use crate::application::ports::remote_api::{RemoteApi, RemoteError};
use crate::domain::entities::QueueEntry;
use crate::domain::value_objects::{Collection, MutationType};
use crate::shared::config::RemoteConfig;
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Method, RequestBuilder, Response};
use serde_json::Value;
use std::time::Duration;

pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";
const MAX_ERROR_BODY: usize = 512;

/// JSON-over-HTTP client for the per-collection REST endpoints.
pub struct HttpRemoteApi {
    client: reqwest::Client,
    base_url: String,
    auth_token: Option<String>,
}

impl HttpRemoteApi {
    pub fn new(config: &RemoteConfig) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout.max(1)))
            .build()
            .map_err(|err| AppError::ConfigurationError(err.to_string()))?;

        Ok(Self::with_client(
            client,
            config.base_url.clone(),
            config.auth_token.clone(),
        ))
    }

    pub fn with_client(
        client: reqwest::Client,
        base_url: String,
        auth_token: Option<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_token,
        }
    }

    fn collection_url(&self, collection: Collection) -> String {
        format!("{}/api/{}", self.base_url, collection.endpoint())
    }

    fn request(&self, method: Method, url: String) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.auth_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn mutation_request(&self, entry: &QueueEntry) -> Result<RequestBuilder, RemoteError> {
        let base = self.collection_url(entry.entity);
        let builder = match entry.mutation_type {
            MutationType::Create => self.request(Method::POST, base).json(entry.data.as_json()),
            MutationType::Update => {
                let id = routable_id(entry)?;
                self.request(Method::PUT, format!("{base}/{id}"))
                    .json(entry.data.as_json())
            }
            MutationType::Delete => {
                let id = routable_id(entry)?;
                self.request(Method::DELETE, format!("{base}/{id}"))
            }
        };

        Ok(builder.header(IDEMPOTENCY_HEADER, entry.id.as_str()))
    }
}

#[async_trait]
impl RemoteApi for HttpRemoteApi {
    async fn submit(&self, entry: &QueueEntry) -> Result<(), RemoteError> {
        let response = self
            .mutation_request(entry)?
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        tracing::debug!(
            target: "remote::http",
            entry_id = %entry.id,
            mutation = entry.mutation_type.as_str(),
            entity = entry.entity.as_str(),
            status = status.as_u16(),
            "mutation submitted"
        );

        if status.is_success() {
            Ok(())
        } else {
            Err(status_error(response).await)
        }
    }

    async fn fetch_updated(
        &self,
        collection: Collection,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Value>, RemoteError> {
        let mut builder = self.request(Method::GET, self.collection_url(collection));
        if let Some(since) = since {
            builder = builder.query(&[(
                "updated_since",
                since.to_rfc3339_opts(SecondsFormat::Millis, true),
            )]);
        }

        let response = builder.send().await.map_err(transport_error)?;
        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let body: Value = response
            .json()
            .await
            .map_err(|err| RemoteError::Retryable(format!("invalid response body: {err}")))?;

        records_from_body(body)
    }
}

fn routable_id(entry: &QueueEntry) -> Result<i64, RemoteError> {
    entry.remote_id().ok_or_else(|| RemoteError::Permanent {
        status: None,
        message: format!(
            "{} {} has no server id to address",
            entry.mutation_type, entry.entity
        ),
    })
}

fn transport_error(err: reqwest::Error) -> RemoteError {
    if err.is_builder() {
        RemoteError::Permanent {
            status: None,
            message: err.to_string(),
        }
    } else {
        RemoteError::Retryable(err.to_string())
    }
}

async fn status_error(response: Response) -> RemoteError {
    let status = response.status().as_u16();
    let mut body = response.text().await.unwrap_or_default();
    if body.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    RemoteError::from_status(status, body)
}

fn records_from_body(body: Value) -> Result<Vec<Value>, RemoteError> {
    match body {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(RemoteError::Permanent {
                status: Some(200),
                message: "response object has no data array".to_string(),
            }),
        },
        _ => Err(RemoteError::Permanent {
            status: Some(200),
            message: "response body is not a record list".to_string(),
        }),
    }
}
