use std::time::{Duration, Instant};

use camino::Utf8PathBuf;
use serde::Serialize;
use serde_json::{Value, json};

use crate::auth::{AuthClient, LoginRequest, SignupRequest};
use crate::credentials::{CachedAuth, CredentialStore};
use crate::domain::{JobSelector, fq_host};
use crate::error::BystroError;
use crate::jobs::{CreateJobRequest, JobsClient, JobsResponse, SearchRequest};
use crate::proteomics::{
    ProteomicsClient, ProteomicsLink, ProteomicsUpload, UploadOutcome, annotation_job_path,
    missing_abundance_headers, proteomics_job_path,
};
use crate::user::{UserClient, UserProfile};

#[derive(Debug, Clone)]
pub struct Credentials {
    pub host: String,
    pub port: u16,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionResult {
    #[serde(flatten)]
    pub auth: CachedAuth,
    pub credentials_path: Utf8PathBuf,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

fn note(sink: &dyn ProgressSink, message: impl Into<String>) {
    sink.event(ProgressEvent {
        message: message.into(),
        elapsed: None,
    });
}

fn timed(sink: &dyn ProgressSink, message: impl Into<String>, start: Instant) {
    sink.event(ProgressEvent {
        message: message.into(),
        elapsed: Some(start.elapsed()),
    });
}

#[derive(Clone)]
pub struct App<A: AuthClient, J: JobsClient, U: UserClient, P: ProteomicsClient> {
    store: CredentialStore,
    auth: A,
    jobs: J,
    user: U,
    proteomics: P,
}

impl<A: AuthClient, J: JobsClient, U: UserClient, P: ProteomicsClient> App<A, J, U, P> {
    pub fn new(store: CredentialStore, auth: A, jobs: J, user: U, proteomics: P) -> Self {
        Self {
            store,
            auth,
            jobs,
            user,
            proteomics,
        }
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    pub fn jobs_client(&self) -> &J {
        &self.jobs
    }

    pub fn proteomics_client(&self) -> &P {
        &self.proteomics
    }

    pub fn signup(
        &self,
        credentials: &Credentials,
        name: &str,
        sink: &dyn ProgressSink,
    ) -> Result<SessionResult, BystroError> {
        note(
            sink,
            format!(
                "Signing up for Bystro with email: {}, name: {name}",
                credentials.email
            ),
        );
        let base_url = fq_host(&credentials.host, credentials.port);
        let request = SignupRequest {
            email: &credentials.email,
            name,
            password: &credentials.password,
        };
        let start = Instant::now();
        let token = self.auth.signup(&base_url, &request)?;
        timed(sink, "signup accepted", start);
        self.persist(&credentials.email, token.access_token, base_url, sink)
    }

    pub fn login(
        &self,
        credentials: &Credentials,
        sink: &dyn ProgressSink,
    ) -> Result<SessionResult, BystroError> {
        let base_url = fq_host(&credentials.host, credentials.port);
        note(
            sink,
            format!("Logging into {base_url} with email: {}.", credentials.email),
        );
        let request = LoginRequest {
            email: &credentials.email,
            password: &credentials.password,
        };
        let start = Instant::now();
        let token = self.auth.login(&base_url, &request)?;
        timed(sink, "login accepted", start);
        self.persist(&credentials.email, token.access_token, base_url, sink)
    }

    fn persist(
        &self,
        email: &str,
        access_token: String,
        base_url: String,
        sink: &dyn ProgressSink,
    ) -> Result<SessionResult, BystroError> {
        let auth = CachedAuth {
            email: email.to_string(),
            access_token,
            base_url,
        };
        let credentials_path = self.store.save(&auth)?;
        note(sink, format!("Saved auth credentials to {credentials_path}"));
        Ok(SessionResult {
            auth,
            credentials_path,
        })
    }

    pub fn profile(&self, sink: &dyn ProgressSink) -> Result<UserProfile, BystroError> {
        let auth = self.store.authenticate()?;
        note(sink, "Fetching user profile");
        let start = Instant::now();
        let profile = self.user.profile(&auth)?;
        timed(sink, format!("Fetched profile for email {}", auth.email), start);
        Ok(profile)
    }

    /// Fetches one job by id or the jobs of one category. The selector is
    /// validated before credentials are read.
    pub fn get_jobs(
        &self,
        job_id: Option<&str>,
        job_type: Option<&str>,
        sink: &dyn ProgressSink,
    ) -> Result<JobsResponse, BystroError> {
        let selector = JobSelector::from_parts(job_id, job_type)?;
        let auth = self.store.authenticate()?;
        let start = Instant::now();
        let response = match selector {
            JobSelector::Id(id) => {
                note(sink, format!("Fetching job with id: {id}"));
                JobsResponse::Single(Box::new(self.jobs.get_job(&auth, &id)?))
            }
            JobSelector::Type(job_type) => {
                note(sink, format!("Fetching jobs of type: {job_type}"));
                JobsResponse::List(self.jobs.list_jobs(&auth, job_type)?)
            }
        };
        timed(sink, "Job(s) fetched successfully", start);
        Ok(response)
    }

    pub fn create_job(
        &self,
        request: &CreateJobRequest,
        sink: &dyn ProgressSink,
    ) -> Result<Value, BystroError> {
        if request.files.is_empty() {
            return Err(BystroError::NoInputFiles);
        }
        let auth = self.store.authenticate()?;
        note(
            sink,
            format!("Creating jobs for files: {}", request.file_names().join(",")),
        );
        let start = Instant::now();
        let job = self.jobs.create_job(&auth, request)?;
        timed(sink, "Job creation successful", start);
        Ok(job)
    }

    pub fn query(
        &self,
        request: &SearchRequest,
        sink: &dyn ProgressSink,
    ) -> Result<Value, BystroError> {
        let auth = self.store.authenticate()?;
        note(
            sink,
            format!("Querying job {}: {}", request.job_id, request.query),
        );
        let start = Instant::now();
        let results = self.jobs.search(&auth, request)?;
        timed(sink, "Query complete", start);
        Ok(results)
    }

    /// Uploads a proteomics dataset and, when an annotation job id is given,
    /// links the two jobs in both directions. A bad abundance header or an
    /// unknown annotation job ends the flow without sending the dataset.
    pub fn upload_proteomics(
        &self,
        upload: &ProteomicsUpload,
        sink: &dyn ProgressSink,
    ) -> Result<UploadOutcome, BystroError> {
        let missing = missing_abundance_headers(&upload.protein_abundance_file)?;
        if !missing.is_empty() {
            tracing::warn!(?missing, "protein abundance file is missing required headers");
            return Ok(UploadOutcome::MissingHeaders(missing));
        }

        let auth = self.store.authenticate()?;
        let annotation_id = upload
            .annotation_job_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty());

        if let Some(annotation_id) = annotation_id {
            note(sink, format!("Checking annotation job {annotation_id}"));
            if !self.proteomics.annotation_exists(&auth, annotation_id)? {
                return Ok(UploadOutcome::AnnotationNotFound(annotation_id.to_string()));
            }
        }

        note(
            sink,
            format!(
                "Uploading {} dataset {}",
                upload.dataset_type,
                upload.protein_abundance_file.display()
            ),
        );
        let start = Instant::now();
        let proteomics_id = self.proteomics.upload(&auth, upload)?;
        timed(sink, format!("Proteomics job {proteomics_id} created"), start);

        if let Some(annotation_id) = annotation_id {
            let annotation_linked = self.link(
                &auth,
                &annotation_job_path(annotation_id),
                json!({ "proteomicsID": proteomics_id }),
                "annotation",
            );
            let proteomics_linked = self.link(
                &auth,
                &proteomics_job_path(&proteomics_id),
                json!({ "annotationID": annotation_id }),
                "proteomics",
            );
            if annotation_linked && proteomics_linked {
                note(sink, "Link established successfully");
            }
        }

        Ok(UploadOutcome::Linked(ProteomicsLink {
            annotation_id: annotation_id.map(str::to_string),
            proteomics_id,
        }))
    }

    /// PATCHes one side of the link. Failures are logged, never returned.
    fn link(&self, auth: &CachedAuth, path: &str, body: Value, kind: &str) -> bool {
        match self.proteomics.patch_job(auth, path, &body) {
            Ok(200) => true,
            Ok(status) => {
                tracing::warn!(status, "failed to update {kind} job");
                false
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to update {kind} job");
                false
            }
        }
    }
}
