use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use reqwest::blocking::Client;
use reqwest::blocking::multipart::Form;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::config::{LIST_JOBS_TIMEOUT, REQUEST_TIMEOUT};
use crate::credentials::CachedAuth;
use crate::domain::{JobSelector, JobType};
use crate::error::BystroError;
use crate::http::{attach_files, build_client, decode_json, expect_ok, with_bearer};

pub const DEFAULT_QUERY_SIZE: u64 = 10;

/// Entry of the job list endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempts: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A single job record. Fields the client does not interpret are kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assembly: Option<String>,
    #[serde(default)]
    pub config: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submission: Option<Submission>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Job {
    /// Decodes a job document, expanding a `config` stored as a JSON string.
    pub fn from_value(mut value: Value) -> Result<Self, BystroError> {
        if let Some(config) = value.get_mut("config")
            && let Value::String(raw) = config
        {
            let decoded: Value = serde_json::from_str(raw)
                .map_err(|err| BystroError::Decode(format!("job config: {err}")))?;
            *config = decoded;
        }
        serde_json::from_value(value).map_err(|err| BystroError::Decode(err.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum JobsResponse {
    Single(Box<Job>),
    List(Vec<JobSummary>),
}

#[derive(Debug, Clone)]
pub struct CreateJobRequest {
    pub files: Vec<PathBuf>,
    pub assembly: String,
    pub index: bool,
}

impl CreateJobRequest {
    /// Value of the multipart `job` field.
    pub fn job_payload(&self) -> Value {
        json!({
            "assembly": self.assembly,
            "options": { "index": self.index },
        })
    }

    pub fn file_names(&self) -> Vec<String> {
        self.files
            .iter()
            .filter_map(|path| path.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub job_id: String,
    pub query: String,
    pub size: u64,
    pub from: u64,
}

impl SearchRequest {
    pub fn new(job_id: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            query: query.into(),
            size: DEFAULT_QUERY_SIZE,
            from: 0,
        }
    }

    /// Request body for `/api/jobs/{id}/search`: an OpenSearch `query_string`
    /// query wrapped with the job id.
    pub fn body(&self) -> Value {
        json!({
            "id": self.job_id,
            "searchBody": {
                "from": self.from,
                "query": {
                    "bool": {
                        "must": {
                            "query_string": {
                                "default_operator": "AND",
                                "query": self.query,
                                "lenient": true,
                                "phrase_slop": 5,
                                "tie_breaker": 0.3,
                            }
                        }
                    }
                },
                "size": self.size,
            }
        })
    }

    pub fn path(&self) -> String {
        format!("/api/jobs/{}/search", self.job_id)
    }
}

pub trait JobsClient: Send + Sync {
    fn list_jobs(
        &self,
        auth: &CachedAuth,
        job_type: JobType,
    ) -> Result<Vec<JobSummary>, BystroError>;
    fn get_job(&self, auth: &CachedAuth, job_id: &str) -> Result<Job, BystroError>;
    fn create_job(
        &self,
        auth: &CachedAuth,
        request: &CreateJobRequest,
    ) -> Result<Value, BystroError>;
    fn search(&self, auth: &CachedAuth, request: &SearchRequest) -> Result<Value, BystroError>;
}

#[derive(Clone)]
pub struct JobsHttpClient {
    client: Client,
}

impl JobsHttpClient {
    pub fn new() -> Result<Self, BystroError> {
        Ok(Self {
            client: build_client()?,
        })
    }

    fn get(
        &self,
        auth: &CachedAuth,
        selector: &JobSelector,
    ) -> Result<reqwest::blocking::Response, BystroError> {
        let url = auth.endpoint(&selector.path());
        tracing::debug!(%url, "GET jobs");
        let response = with_bearer(self.client.get(&url), auth)?
            .timeout(LIST_JOBS_TIMEOUT)
            .send()
            .map_err(|err| BystroError::JobsHttp(err.to_string()))?;
        expect_ok(response)
            .map_err(|(status, message)| BystroError::FetchJobsStatus { status, message })
    }
}

impl JobsClient for JobsHttpClient {
    fn list_jobs(
        &self,
        auth: &CachedAuth,
        job_type: JobType,
    ) -> Result<Vec<JobSummary>, BystroError> {
        let response = self.get(auth, &JobSelector::Type(job_type))?;
        decode_json(response)
    }

    fn get_job(&self, auth: &CachedAuth, job_id: &str) -> Result<Job, BystroError> {
        let response = self.get(auth, &JobSelector::Id(job_id.to_string()))?;
        let value: Value = decode_json(response)?;
        Job::from_value(value)
    }

    fn create_job(
        &self,
        auth: &CachedAuth,
        request: &CreateJobRequest,
    ) -> Result<Value, BystroError> {
        let url = auth.endpoint("/api/jobs/upload/");
        let paths = request.files.iter().map(PathBuf::as_path).collect::<Vec<&Path>>();
        let form = Form::new().text("job", request.job_payload().to_string());
        let form = attach_files(form, &paths)?;
        tracing::debug!(%url, files = paths.len(), "POST job upload");
        let response = with_bearer(self.client.post(&url), auth)?
            .multipart(form)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .map_err(|err| BystroError::JobsHttp(err.to_string()))?;
        let response = expect_ok(response)
            .map_err(|(status, message)| BystroError::CreateJobStatus { status, message })?;
        decode_json(response)
    }

    fn search(&self, auth: &CachedAuth, request: &SearchRequest) -> Result<Value, BystroError> {
        let url = auth.endpoint(&request.path());
        tracing::debug!(%url, size = request.size, from = request.from, "POST search");
        let response = with_bearer(self.client.post(&url), auth)?
            .json(&request.body())
            .timeout(REQUEST_TIMEOUT)
            .send()
            .map_err(|err| BystroError::JobsHttp(err.to_string()))?;
        let response = expect_ok(response)
            .map_err(|(status, message)| BystroError::QueryStatus { status, message })?;
        decode_json(response)
    }
}
