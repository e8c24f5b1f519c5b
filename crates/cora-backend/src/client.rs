//! Backend client: one typed operation per endpoint.
//!
//! Every operation goes through [`BackendClient::call`], which fetches a
//! fresh identity token, performs exactly one HTTP request and translates
//! any failure into a [`BackendError`] for that endpoint.

use std::sync::Arc;

use async_trait::async_trait;
use cora_core::config::{join_url, CoraConfig, EndpointsConfig};
use cora_core::{Endpoint, GeneratedQuery, QueryResult, VisualizationSpec, SUCCESS_STATUS};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::BackendError;
use crate::identity::TokenProvider;
use crate::wire::{
    rows_from, strings_from, EmbedSqlRequest, GenerateSqlRequest, GenerateSqlResponse,
    GenerateVizRequest, GenerateVizResponse, KnownDbResponse, KnownSqlRequest, KnownSqlResponse,
    NaturalResponseRequest, NaturalResponseResponse, RunQueryRequest,
};

/// The NL-to-SQL backend's capabilities.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Databases known to the backend's vector store.
    async fn list_databases(&self) -> Result<Vec<String>, BackendError>;

    /// Suggested questions for a database.
    async fn get_known_sql(&self, database: &str) -> Result<Vec<String>, BackendError>;

    /// Generate SQL for a question.
    async fn generate_sql(
        &self,
        question: &str,
        database: &str,
    ) -> Result<GeneratedQuery, BackendError>;

    /// Execute SQL through the backend.
    async fn run_query(&self, database: &str, sql: &str) -> Result<QueryResult, BackendError>;

    /// Record a question/SQL pair as known-good.
    async fn embed_sql(&self, question: &str, sql: &str, database: &str)
        -> Result<(), BackendError>;

    /// Answer a question in natural language.
    async fn natural_response(
        &self,
        question: &str,
        database: &str,
    ) -> Result<String, BackendError>;

    /// Generate chart definitions for a result set.
    ///
    /// `rows_json` is a JSON array of records.
    async fn generate_visualization(
        &self,
        question: &str,
        sql: &str,
        rows_json: &str,
    ) -> Result<VisualizationSpec, BackendError>;
}

/// HTTP implementation of [`Backend`].
pub struct BackendClient {
    http: reqwest::Client,
    tokens: Arc<dyn TokenProvider>,
    base_url: String,
    endpoints: EndpointsConfig,
}

enum Method {
    Get,
    Post,
}

impl BackendClient {
    pub fn new(
        http: reqwest::Client,
        tokens: Arc<dyn TokenProvider>,
        base_url: impl Into<String>,
        endpoints: EndpointsConfig,
    ) -> Self {
        Self {
            http,
            tokens,
            base_url: base_url.into(),
            endpoints,
        }
    }

    /// Build a client for the backend described by `config`.
    pub fn from_config(
        config: &CoraConfig,
        http: reqwest::Client,
        tokens: Arc<dyn TokenProvider>,
    ) -> Self {
        Self::new(
            http,
            tokens,
            config.project.backend_url.clone(),
            config.endpoints.clone(),
        )
    }

    /// Absolute URL of `endpoint`.
    pub fn url(&self, endpoint: Endpoint) -> String {
        join_url(&self.base_url, self.endpoints.path(endpoint))
    }

    /// Send one authorized request and return the raw response body.
    async fn send<B: Serialize + Sync>(
        &self,
        endpoint: Endpoint,
        method: Method,
        body: Option<&B>,
    ) -> Result<String, BackendError> {
        // The backend URL doubles as the token audience.
        let token = self
            .tokens
            .fetch_token(&self.base_url)
            .await
            .map_err(|e| BackendError::auth(endpoint, e))?;

        let url = self.url(endpoint);
        let mut request = match method {
            Method::Get => self.http.get(&url),
            Method::Post => self.http.post(&url),
        }
        .bearer_auth(token.secret());
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| BackendError::transport(endpoint, e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| BackendError::transport(endpoint, e.to_string()))?;
        debug!(endpoint = %endpoint, status = status.as_u16(), bytes = text.len(), "Backend call");

        if !status.is_success() {
            return Err(BackendError::status(endpoint, status.as_u16(), text));
        }
        Ok(text)
    }

    /// POST `body` and decode the JSON response.
    async fn call<B, R>(&self, endpoint: Endpoint, body: &B) -> Result<R, BackendError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let text = self.send(endpoint, Method::Post, Some(body)).await?;
        serde_json::from_str(&text).map_err(|e| BackendError::decode(endpoint, e.to_string()))
    }
}

#[async_trait]
impl Backend for BackendClient {
    async fn list_databases(&self) -> Result<Vec<String>, BackendError> {
        let endpoint = Endpoint::AvailableDatabases;
        let text = self.send::<()>(endpoint, Method::Get, None).await?;
        let resp: KnownDbResponse = serde_json::from_str(&text)
            .map_err(|e| BackendError::decode(endpoint, e.to_string()))?;
        strings_from(resp.known_db, "table_schema").map_err(|e| BackendError::decode(endpoint, e))
    }

    async fn get_known_sql(&self, database: &str) -> Result<Vec<String>, BackendError> {
        let endpoint = Endpoint::GetKnownSql;
        let resp: KnownSqlResponse = self
            .call(
                endpoint,
                &KnownSqlRequest {
                    user_database: database,
                },
            )
            .await?;
        strings_from(resp.known_sql, "example_user_question")
            .map_err(|e| BackendError::decode(endpoint, e))
    }

    async fn generate_sql(
        &self,
        question: &str,
        database: &str,
    ) -> Result<GeneratedQuery, BackendError> {
        let endpoint = Endpoint::GenerateSql;
        let resp: GenerateSqlResponse = self
            .call(
                endpoint,
                &GenerateSqlRequest {
                    user_question: question,
                    user_database: database,
                },
            )
            .await?;

        // SQL may be absent only when generation failed.
        let sql = resp.generated_sql.unwrap_or_default();
        if resp.response_code == SUCCESS_STATUS && sql.trim().is_empty() {
            return Err(BackendError::decode(endpoint, "missing GeneratedSQL"));
        }
        Ok(GeneratedQuery::new(sql, resp.response_code))
    }

    async fn run_query(&self, database: &str, sql: &str) -> Result<QueryResult, BackendError> {
        let endpoint = Endpoint::RunQuery;
        // Rows come back under the same key as the database list.
        let resp: KnownDbResponse = self
            .call(
                endpoint,
                &RunQueryRequest {
                    user_database: database,
                    generated_sql: sql,
                },
            )
            .await?;
        let rows = rows_from(resp.known_db).map_err(|e| BackendError::decode(endpoint, e))?;
        Ok(QueryResult::new(rows))
    }

    async fn embed_sql(
        &self,
        question: &str,
        sql: &str,
        database: &str,
    ) -> Result<(), BackendError> {
        self.send(
            Endpoint::EmbedSql,
            Method::Post,
            Some(&EmbedSqlRequest {
                user_question: question,
                generated_sql: sql,
                user_database: database,
            }),
        )
        .await?;
        Ok(())
    }

    async fn natural_response(
        &self,
        question: &str,
        database: &str,
    ) -> Result<String, BackendError> {
        let resp: NaturalResponseResponse = self
            .call(
                Endpoint::NaturalResponse,
                &NaturalResponseRequest {
                    user_question: question,
                    user_database: database,
                },
            )
            .await?;
        Ok(resp.natural_response)
    }

    async fn generate_visualization(
        &self,
        question: &str,
        sql: &str,
        rows_json: &str,
    ) -> Result<VisualizationSpec, BackendError> {
        let resp: GenerateVizResponse = self
            .call(
                Endpoint::GenerateViz,
                &GenerateVizRequest {
                    user_question: question,
                    sql_generated: sql,
                    sql_results: rows_json,
                },
            )
            .await?;
        Ok(resp.generated_chartjs.into())
    }
}
