use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use thiserror::Error;

use crate::core::config::Settings;
use crate::schemas::{NewExam, ResultRecord, StoredExam};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record store request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("record store rejected the request (status {status}): {detail}")]
    Rejected { status: u16, detail: String },
    #[error("record store returned an unexpected payload: {0}")]
    Decode(String),
}

/// The persistence boundary. One read used by the loader, one write used on
/// session finish; the rest serves the authoring side.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn fetch_exam(&self, id: &str) -> Result<Option<StoredExam>, StoreError>;
    async fn insert_exam(&self, exam: &NewExam) -> Result<StoredExam, StoreError>;
    async fn list_exams(&self, teacher_id: &str, limit: usize)
        -> Result<Vec<StoredExam>, StoreError>;
    async fn delete_exam(&self, id: &str) -> Result<(), StoreError>;
    async fn delete_exams_by_teacher(&self, teacher_id: &str) -> Result<(), StoreError>;
    async fn insert_result(&self, record: &ResultRecord) -> Result<(), StoreError>;
}

/// Supabase-convention REST client: `apikey` header plus bearer auth, row
/// filters as `column=eq.value` query parameters.
#[derive(Debug, Clone)]
pub struct RestStore {
    client: Client,
    base_url: String,
    api_key: String,
}

impl RestStore {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Option<Self>> {
        let Some(base_url) = settings.backend().base_url.clone() else {
            return Ok(None);
        };

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(settings.backend().timeout_seconds))
            .build()
            .context("Failed to build record store HTTP client")?;

        Ok(Some(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: settings.backend().api_key.clone(),
        }))
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base_url)
    }

    fn get(&self, table: &str) -> reqwest::RequestBuilder {
        self.authorized(self.client.get(self.table_url(table)))
    }

    fn post(&self, table: &str) -> reqwest::RequestBuilder {
        self.authorized(self.client.post(self.table_url(table)))
    }

    fn delete(&self, table: &str) -> reqwest::RequestBuilder {
        self.authorized(self.client.delete(self.table_url(table)))
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder.header("apikey", &self.api_key).bearer_auth(&self.api_key)
    }
}

async fn rejected(status: StatusCode, response: Response) -> StoreError {
    let detail = response.text().await.unwrap_or_default();
    StoreError::Rejected { status: status.as_u16(), detail }
}

async fn decode_rows(response: Response) -> Result<Vec<StoredExam>, StoreError> {
    let status = response.status();
    if !status.is_success() {
        return Err(rejected(status, response).await);
    }
    response.json::<Vec<StoredExam>>().await.map_err(|err| StoreError::Decode(err.to_string()))
}

async fn expect_success(response: Response) -> Result<(), StoreError> {
    let status = response.status();
    if !status.is_success() {
        return Err(rejected(status, response).await);
    }
    Ok(())
}

#[async_trait]
impl RecordStore for RestStore {
    async fn fetch_exam(&self, id: &str) -> Result<Option<StoredExam>, StoreError> {
        let id_filter = format!("eq.{id}");
        let response = self
            .get("exams")
            .query(&[("select", "*"), ("id", id_filter.as_str()), ("limit", "1")])
            .send()
            .await?;

        let rows = decode_rows(response).await?;
        Ok(rows.into_iter().next())
    }

    async fn insert_exam(&self, exam: &NewExam) -> Result<StoredExam, StoreError> {
        let response = self
            .post("exams")
            .header("Prefer", "return=representation")
            .json(&[exam])
            .send()
            .await?;

        let rows = decode_rows(response).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| StoreError::Decode("insert returned no rows".to_string()))
    }

    async fn list_exams(
        &self,
        teacher_id: &str,
        limit: usize,
    ) -> Result<Vec<StoredExam>, StoreError> {
        let teacher_filter = format!("eq.{teacher_id}");
        let limit = limit.to_string();
        let response = self
            .get("exams")
            .query(&[
                ("select", "*"),
                ("teacher_id", teacher_filter.as_str()),
                ("order", "created_at.desc"),
                ("limit", limit.as_str()),
            ])
            .send()
            .await?;

        decode_rows(response).await
    }

    async fn delete_exam(&self, id: &str) -> Result<(), StoreError> {
        let id_filter = format!("eq.{id}");
        let response =
            self.delete("exams").query(&[("id", id_filter.as_str())]).send().await?;
        expect_success(response).await
    }

    async fn delete_exams_by_teacher(&self, teacher_id: &str) -> Result<(), StoreError> {
        let teacher_filter = format!("eq.{teacher_id}");
        let response = self
            .delete("exams")
            .query(&[("teacher_id", teacher_filter.as_str())])
            .send()
            .await?;
        expect_success(response).await
    }

    async fn insert_result(&self, record: &ResultRecord) -> Result<(), StoreError> {
        let response = self
            .post("results")
            .header("Prefer", "return=minimal")
            .json(&[record])
            .send()
            .await?;
        expect_success(response).await
    }
}
