use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use reqwest::blocking::Client;
use reqwest::blocking::multipart::Form;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::config::{PROTEOMICS_UPLOAD_TIMEOUT, REQUEST_TIMEOUT};
use crate::credentials::CachedAuth;
use crate::domain::ProteomicsDatasetType;
use crate::error::BystroError;
use crate::http::{attach_files, build_client, decode_json, expect_ok, file_name, with_bearer};

pub const UPLOAD_PROTEOMICS_ENDPOINT: &str = "/api/jobs/proteomics/";

pub const ABUNDANCE_REQUIRED_HEADERS: [&str; 5] = [
    "Index",
    "NumberPSM",
    "ProteinID",
    "MaxPepProb",
    "ReferenceIntensity",
];

#[derive(Debug, Clone)]
pub struct ProteomicsUpload {
    pub protein_abundance_file: PathBuf,
    pub experiment_annotation_file: Option<PathBuf>,
    pub annotation_job_id: Option<String>,
    pub dataset_type: ProteomicsDatasetType,
}

impl ProteomicsUpload {
    pub fn new(protein_abundance_file: impl Into<PathBuf>) -> Self {
        Self {
            protein_abundance_file: protein_abundance_file.into(),
            experiment_annotation_file: None,
            annotation_job_id: None,
            dataset_type: ProteomicsDatasetType::default(),
        }
    }

    /// Value of the multipart `job` field.
    pub fn job_payload(&self) -> Result<Value, BystroError> {
        Ok(json!({
            "protein_abundance_file": file_name(&self.protein_abundance_file)?,
            "proteomics_dataset_type": self.dataset_type.as_str(),
            "assembly": "N/A",
        }))
    }

    pub fn files(&self) -> Vec<&Path> {
        let mut files = vec![self.protein_abundance_file.as_path()];
        if let Some(annotation) = &self.experiment_annotation_file {
            files.push(annotation.as_path());
        }
        files
    }
}

/// Result of a completed upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProteomicsLink {
    #[serde(rename = "annotationID")]
    pub annotation_id: Option<String>,
    #[serde(rename = "proteomicsID")]
    pub proteomics_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Linked(ProteomicsLink),
    /// The abundance file lacks some required headers; nothing was sent.
    MissingHeaders(Vec<String>),
    /// The annotation job does not exist or is not visible to the user.
    AnnotationNotFound(String),
}

impl UploadOutcome {
    pub fn link(&self) -> Option<&ProteomicsLink> {
        match self {
            UploadOutcome::Linked(link) => Some(link),
            _ => None,
        }
    }
}

/// Returns the required headers absent from the first line of `path`,
/// compared case-insensitively. Bytes that are not UTF-8 never match.
pub fn missing_abundance_headers(path: &Path) -> Result<Vec<String>, BystroError> {
    let file = File::open(path)
        .map_err(|err| BystroError::Filesystem(format!("open {}: {err}", path.display())))?;
    let mut first_line = Vec::new();
    BufReader::new(file)
        .read_until(b'\n', &mut first_line)
        .map_err(|err| BystroError::Filesystem(format!("read {}: {err}", path.display())))?;
    Ok(missing_headers(&String::from_utf8_lossy(&first_line)))
}

pub fn missing_headers(header_line: &str) -> Vec<String> {
    let line = header_line.trim().to_lowercase();
    ABUNDANCE_REQUIRED_HEADERS
        .iter()
        .filter(|header| !line.contains(&header.to_lowercase()))
        .map(|header| header.to_string())
        .collect()
}

pub trait ProteomicsClient: Send + Sync {
    fn annotation_exists(
        &self,
        auth: &CachedAuth,
        annotation_job_id: &str,
    ) -> Result<bool, BystroError>;
    /// Uploads the dataset and returns the created proteomics job id.
    fn upload(&self, auth: &CachedAuth, upload: &ProteomicsUpload) -> Result<String, BystroError>;
    /// PATCHes `body` onto the job at `path`. Returns the HTTP status.
    fn patch_job(&self, auth: &CachedAuth, path: &str, body: &Value) -> Result<u16, BystroError>;
}

pub fn annotation_job_path(annotation_job_id: &str) -> String {
    format!("/api/jobs/{annotation_job_id}")
}

pub fn proteomics_job_path(proteomics_job_id: &str) -> String {
    format!("{UPLOAD_PROTEOMICS_ENDPOINT}{proteomics_job_id}")
}

#[derive(Clone)]
pub struct ProteomicsHttpClient {
    client: Client,
}

impl ProteomicsHttpClient {
    pub fn new() -> Result<Self, BystroError> {
        Ok(Self {
            client: build_client()?,
        })
    }
}

impl ProteomicsClient for ProteomicsHttpClient {
    fn annotation_exists(
        &self,
        auth: &CachedAuth,
        annotation_job_id: &str,
    ) -> Result<bool, BystroError> {
        let url = auth.endpoint(&annotation_job_path(annotation_job_id));
        tracing::debug!(%url, "GET annotation job");
        let response = with_bearer(self.client.get(&url), auth)?
            .timeout(REQUEST_TIMEOUT)
            .send()
            .map_err(|err| BystroError::ProteomicsHttp(err.to_string()))?;
        Ok(response.status() == reqwest::StatusCode::OK)
    }

    fn upload(&self, auth: &CachedAuth, upload: &ProteomicsUpload) -> Result<String, BystroError> {
        let url = auth.endpoint(UPLOAD_PROTEOMICS_ENDPOINT);
        let form = Form::new().text("job", upload.job_payload()?.to_string());
        let form = attach_files(form, &upload.files())?;
        tracing::debug!(%url, dataset_type = %upload.dataset_type, "POST proteomics upload");
        let response = with_bearer(self.client.post(&url), auth)?
            .multipart(form)
            .timeout(PROTEOMICS_UPLOAD_TIMEOUT)
            .send()
            .map_err(|err| BystroError::ProteomicsHttp(err.to_string()))?;
        let response = expect_ok(response)
            .map_err(|(status, message)| BystroError::ProteomicsStatus { status, message })?;
        let body: Value = decode_json(response)?;
        body.get("_id")
            .and_then(Value::as_str)
            .map(|id| id.to_string())
            .ok_or(BystroError::MissingProteomicsId)
    }

    fn patch_job(&self, auth: &CachedAuth, path: &str, body: &Value) -> Result<u16, BystroError> {
        let url = auth.endpoint(path);
        tracing::debug!(%url, "PATCH job");
        let response = with_bearer(self.client.patch(&url), auth)?
            .json(body)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .map_err(|err| BystroError::ProteomicsHttp(err.to_string()))?;
        Ok(response.status().as_u16())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headers_match_case_insensitively() {
        let line = "index\tnumberpsm\tproteinid\tmaxpepprob\treferenceintensity\tSample1\n";
        assert!(missing_headers(line).is_empty());
    }

    #[test]
    fn reports_each_missing_header() {
        let line = "Index\tProteinID\tGene";
        assert_eq!(
            missing_headers(line),
            vec![
                "NumberPSM".to_string(),
                "MaxPepProb".to_string(),
                "ReferenceIntensity".to_string()
            ]
        );
    }

    #[test]
    fn link_paths() {
        assert_eq!(annotation_job_path("abc"), "/api/jobs/abc");
        assert_eq!(proteomics_job_path("xyz"), "/api/jobs/proteomics/xyz");
    }
}
