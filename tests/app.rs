use std::sync::Mutex;

use assert_matches::assert_matches;
use camino::Utf8PathBuf;
use serde_json::{Value, json};

use bystro_api::app::{App, Credentials};
use bystro_api::auth::{AuthClient, LoginRequest, SignupRequest, TokenResponse};
use bystro_api::credentials::{CachedAuth, CredentialStore};
use bystro_api::domain::{JobType, ProteomicsDatasetType};
use bystro_api::error::BystroError;
use bystro_api::jobs::{CreateJobRequest, Job, JobSummary, JobsClient, JobsResponse, SearchRequest};
use bystro_api::output::JsonOutput;
use bystro_api::proteomics::{ProteomicsClient, ProteomicsUpload, UploadOutcome};
use bystro_api::user::{UserClient, UserProfile};

#[derive(Default)]
struct MockAuth {
    calls: Mutex<Vec<String>>,
    reject_with: Option<u16>,
}

impl AuthClient for MockAuth {
    fn signup(
        &self,
        base_url: &str,
        request: &SignupRequest<'_>,
    ) -> Result<TokenResponse, BystroError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("signup {base_url} {} {}", request.email, request.name));
        Ok(TokenResponse {
            access_token: "20302493029=02934".to_string(),
        })
    }

    fn login(
        &self,
        base_url: &str,
        request: &LoginRequest<'_>,
    ) -> Result<TokenResponse, BystroError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("login {base_url} {}", request.email));
        if let Some(status) = self.reject_with {
            return Err(BystroError::LoginStatus {
                status,
                message: "error".to_string(),
            });
        }
        Ok(TokenResponse {
            access_token: "TOKEN".to_string(),
        })
    }
}

#[derive(Default)]
struct MockJobs {
    calls: Mutex<Vec<String>>,
}

impl JobsClient for MockJobs {
    fn list_jobs(
        &self,
        auth: &CachedAuth,
        job_type: JobType,
    ) -> Result<Vec<JobSummary>, BystroError> {
        self.calls
            .lock()
            .unwrap()
            .push(auth.endpoint(&format!("/api/jobs{}", job_type.route())));
        Ok(Vec::new())
    }

    fn get_job(&self, auth: &CachedAuth, job_id: &str) -> Result<Job, BystroError> {
        self.calls
            .lock()
            .unwrap()
            .push(auth.endpoint(&format!("/api/jobs/{job_id}")));
        Job::from_value(json!({
            "_id": job_id,
            "name": "trio.trim.vep.vcf",
            "assembly": "hg38",
            "config": "{\"assembly\":\"hg38\"}",
        }))
    }

    fn create_job(
        &self,
        _auth: &CachedAuth,
        request: &CreateJobRequest,
    ) -> Result<Value, BystroError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("create {}", request.file_names().join(",")));
        Ok(json!({"success": true}))
    }

    fn search(&self, auth: &CachedAuth, request: &SearchRequest) -> Result<Value, BystroError> {
        self.calls.lock().unwrap().push(auth.endpoint(&request.path()));
        Ok(json!({"hits": {"total": {"value": 0}, "hits": []}}))
    }
}

#[derive(Default)]
struct MockUser;

impl UserClient for MockUser {
    fn profile(&self, _auth: &CachedAuth) -> Result<UserProfile, BystroError> {
        Err(BystroError::UserHttp("not used".to_string()))
    }
}

#[derive(Default)]
struct MockProteomics {
    calls: Mutex<Vec<String>>,
    annotation_missing: bool,
    patch_status: Option<u16>,
    patch_error: bool,
}

impl ProteomicsClient for MockProteomics {
    fn annotation_exists(
        &self,
        _auth: &CachedAuth,
        annotation_job_id: &str,
    ) -> Result<bool, BystroError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("GET {annotation_job_id}"));
        Ok(!self.annotation_missing)
    }

    fn upload(&self, _auth: &CachedAuth, upload: &ProteomicsUpload) -> Result<String, BystroError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("POST {} files", upload.files().len()));
        Ok("prot-1".to_string())
    }

    fn patch_job(&self, _auth: &CachedAuth, path: &str, body: &Value) -> Result<u16, BystroError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("PATCH {path} {body}"));
        if self.patch_error {
            return Err(BystroError::ProteomicsHttp("connection reset".to_string()));
        }
        Ok(self.patch_status.unwrap_or(200))
    }
}

type TestApp = App<MockAuth, MockJobs, MockUser, MockProteomics>;

fn store_in(temp: &tempfile::TempDir) -> CredentialStore {
    let dir = Utf8PathBuf::from_path_buf(temp.path().join("bystro")).unwrap();
    CredentialStore::new(dir)
}

fn logged_in_store(temp: &tempfile::TempDir) -> CredentialStore {
    let store = store_in(temp);
    store
        .save(&CachedAuth {
            email: "blah".to_string(),
            access_token: "blah".to_string(),
            base_url: "http://localhost".to_string(),
        })
        .unwrap();
    store
}

fn app_with(store: CredentialStore, proteomics: MockProteomics) -> TestApp {
    App::new(
        store,
        MockAuth::default(),
        MockJobs::default(),
        MockUser,
        proteomics,
    )
}

fn credentials() -> Credentials {
    Credentials {
        host: "http://localhost".to_string(),
        port: 8080,
        email: "test@example.com".to_string(),
        password: "password".to_string(),
    }
}

fn write_abundance(temp: &tempfile::TempDir, header: &str) -> std::path::PathBuf {
    let path = temp.path().join("protein_abundance_file.tsv");
    std::fs::write(&path, format!("{header}\n1\t2\tP1\t0.99\t1000\n")).unwrap();
    path
}

const GOOD_HEADER: &str = "Index\tNumberPSM\tProteinID\tMaxPepProb\tReferenceIntensity\tS1";

#[test]
fn login_saves_credentials_for_later_calls() {
    let temp = tempfile::tempdir().unwrap();
    let app = app_with(store_in(&temp), MockProteomics::default());

    let result = app.login(&credentials(), &JsonOutput).unwrap();

    assert_eq!(result.auth.base_url, "http://localhost:8080");
    assert_eq!(result.auth.access_token, "TOKEN");
    let loaded = app.store().authenticate().unwrap();
    assert_eq!(loaded, result.auth);
}

#[test]
fn signup_returns_cached_auth() {
    let temp = tempfile::tempdir().unwrap();
    let app = app_with(store_in(&temp), MockProteomics::default());

    let result = app.signup(&credentials(), "test", &JsonOutput).unwrap();

    assert_eq!(
        result.auth,
        CachedAuth {
            email: "test@example.com".to_string(),
            access_token: "20302493029=02934".to_string(),
            base_url: "http://localhost:8080".to_string(),
        }
    );
}

#[test]
fn failed_login_leaves_store_untouched() {
    let temp = tempfile::tempdir().unwrap();
    let app = App::new(
        store_in(&temp),
        MockAuth {
            reject_with: Some(404),
            ..MockAuth::default()
        },
        MockJobs::default(),
        MockUser,
        MockProteomics::default(),
    );

    let err = app.login(&credentials(), &JsonOutput).unwrap_err();

    assert_matches!(err, BystroError::LoginStatus { status: 404, .. });
    assert!(err.to_string().starts_with("Login failed with response status: 404"));
    assert_matches!(app.store().load(), Ok(None));
}

#[test]
fn get_jobs_validates_before_reading_credentials() {
    let temp = tempfile::tempdir().unwrap();
    let app = app_with(store_in(&temp), MockProteomics::default());

    assert_matches!(
        app.get_jobs(None, None, &JsonOutput),
        Err(BystroError::MissingJobSelector)
    );
    assert_matches!(
        app.get_jobs(Some("1234"), Some("completed"), &JsonOutput),
        Err(BystroError::ConflictingJobSelector)
    );
    let err = app.get_jobs(None, Some("dasfa"), &JsonOutput).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Invalid job type: dasfa. Valid types are: all, public, shared, incomplete, completed, failed"
    );
    assert_matches!(
        app.get_jobs(None, Some("all"), &JsonOutput),
        Err(BystroError::NotLoggedIn)
    );
}

#[test]
fn get_jobs_with_id_and_unknown_type_reports_both() {
    let temp = tempfile::tempdir().unwrap();
    let app = app_with(logged_in_store(&temp), MockProteomics::default());

    let err = app.get_jobs(Some("1"), Some("bogus"), &JsonOutput).unwrap_err();

    assert_matches!(err, BystroError::ConflictingJobSelector);
    assert!(app_calls(&app).is_empty());
}

#[test]
fn get_jobs_routes_each_type() {
    let temp = tempfile::tempdir().unwrap();
    let app = app_with(logged_in_store(&temp), MockProteomics::default());

    for job_type in ["completed", "failed", "public", "shared", "all", "incomplete"] {
        let response = app.get_jobs(None, Some(job_type), &JsonOutput).unwrap();
        assert_eq!(response, JobsResponse::List(Vec::new()));
    }

    let calls = app_calls(&app);
    assert_eq!(
        calls,
        vec![
            "http://localhost/api/jobs/list/completed",
            "http://localhost/api/jobs/list/failed",
            "http://localhost/api/jobs/list/all/public",
            "http://localhost/api/jobs/list/shared",
            "http://localhost/api/jobs/list/all",
            "http://localhost/api/jobs/list/incomplete",
        ]
    );
}

#[test]
fn get_job_by_id_decodes_config() {
    let temp = tempfile::tempdir().unwrap();
    let app = app_with(logged_in_store(&temp), MockProteomics::default());

    let response = app.get_jobs(Some("12341"), None, &JsonOutput).unwrap();

    let JobsResponse::Single(job) = response else {
        panic!("expected a single job");
    };
    assert_eq!(job.id, "12341");
    assert_eq!(job.config, json!({"assembly": "hg38"}));
}

#[test]
fn create_job_requires_files() {
    let temp = tempfile::tempdir().unwrap();
    let app = app_with(logged_in_store(&temp), MockProteomics::default());
    let request = CreateJobRequest {
        files: Vec::new(),
        assembly: "hg38".to_string(),
        index: true,
    };

    assert_matches!(
        app.create_job(&request, &JsonOutput),
        Err(BystroError::NoInputFiles)
    );
}

#[test]
fn query_posts_to_job_search() {
    let temp = tempfile::tempdir().unwrap();
    let app = app_with(logged_in_store(&temp), MockProteomics::default());

    let results = app
        .query(&SearchRequest::new("64db4e67", "cadd: >= 20"), &JsonOutput)
        .unwrap();

    assert_eq!(results["hits"]["total"]["value"], 0);
    assert_eq!(app_calls(&app), vec!["http://localhost/api/jobs/64db4e67/search"]);
}

#[test]
fn proteomics_upload_links_both_jobs() {
    let temp = tempfile::tempdir().unwrap();
    let app = app_with(logged_in_store(&temp), MockProteomics::default());
    let mut upload = ProteomicsUpload::new(write_abundance(&temp, GOOD_HEADER));
    upload.annotation_job_id = Some("123".to_string());

    let outcome = app.upload_proteomics(&upload, &JsonOutput).unwrap();

    let link = outcome.link().unwrap();
    assert_eq!(link.annotation_id.as_deref(), Some("123"));
    assert_eq!(link.proteomics_id, "prot-1");
    assert_eq!(
        serde_json::to_value(link).unwrap(),
        json!({"annotationID": "123", "proteomicsID": "prot-1"})
    );
    assert_eq!(
        proteomics_calls(&app),
        vec![
            "GET 123".to_string(),
            "POST 1 files".to_string(),
            r#"PATCH /api/jobs/123 {"proteomicsID":"prot-1"}"#.to_string(),
            r#"PATCH /api/jobs/proteomics/prot-1 {"annotationID":"123"}"#.to_string(),
        ]
    );
}

#[test]
fn proteomics_upload_without_annotation_skips_links() {
    let temp = tempfile::tempdir().unwrap();
    let app = app_with(logged_in_store(&temp), MockProteomics::default());
    let mut upload = ProteomicsUpload::new(write_abundance(&temp, GOOD_HEADER));
    let annotation = temp.path().join("experiment_annotation_file.tsv");
    std::fs::write(&annotation, "file\tsample\n").unwrap();
    upload.experiment_annotation_file = Some(annotation);
    upload.dataset_type = ProteomicsDatasetType::Somascan;

    let outcome = app.upload_proteomics(&upload, &JsonOutput).unwrap();

    assert_eq!(outcome.link().unwrap().annotation_id, None);
    assert_eq!(proteomics_calls(&app), vec!["POST 2 files".to_string()]);
}

#[test]
fn proteomics_upload_rejects_bad_header_without_network() {
    let temp = tempfile::tempdir().unwrap();
    let app = app_with(store_in(&temp), MockProteomics::default());
    let upload = ProteomicsUpload::new(write_abundance(&temp, "Index\tProteinID"));

    let outcome = app.upload_proteomics(&upload, &JsonOutput).unwrap();

    assert_matches!(outcome, UploadOutcome::MissingHeaders(ref missing) if missing.len() == 3);
    assert!(proteomics_calls(&app).is_empty());
}

#[test]
fn proteomics_upload_stops_on_unknown_annotation() {
    let temp = tempfile::tempdir().unwrap();
    let app = app_with(
        logged_in_store(&temp),
        MockProteomics {
            annotation_missing: true,
            ..MockProteomics::default()
        },
    );
    let mut upload = ProteomicsUpload::new(write_abundance(&temp, GOOD_HEADER));
    upload.annotation_job_id = Some("missing".to_string());

    let outcome = app.upload_proteomics(&upload, &JsonOutput).unwrap();

    assert_eq!(outcome, UploadOutcome::AnnotationNotFound("missing".to_string()));
    assert_eq!(proteomics_calls(&app), vec!["GET missing".to_string()]);
}

#[test]
fn failed_link_patch_is_not_fatal() {
    let temp = tempfile::tempdir().unwrap();
    let app = app_with(
        logged_in_store(&temp),
        MockProteomics {
            patch_status: Some(500),
            ..MockProteomics::default()
        },
    );
    let mut upload = ProteomicsUpload::new(write_abundance(&temp, GOOD_HEADER));
    upload.annotation_job_id = Some("123".to_string());

    let outcome = app.upload_proteomics(&upload, &JsonOutput).unwrap();

    assert_eq!(outcome.link().unwrap().proteomics_id, "prot-1");
    assert_eq!(proteomics_calls(&app).len(), 4);
}

#[test]
fn link_transport_error_still_returns_proteomics_id() {
    let temp = tempfile::tempdir().unwrap();
    let app = app_with(
        logged_in_store(&temp),
        MockProteomics {
            patch_error: true,
            ..MockProteomics::default()
        },
    );
    let mut upload = ProteomicsUpload::new(write_abundance(&temp, GOOD_HEADER));
    upload.annotation_job_id = Some("123".to_string());

    let outcome = app.upload_proteomics(&upload, &JsonOutput).unwrap();

    let link = outcome.link().unwrap();
    assert_eq!(link.proteomics_id, "prot-1");
    assert_eq!(link.annotation_id.as_deref(), Some("123"));
    assert_eq!(
        proteomics_calls(&app),
        vec![
            "GET 123".to_string(),
            "POST 1 files".to_string(),
            r#"PATCH /api/jobs/123 {"proteomicsID":"prot-1"}"#.to_string(),
            r#"PATCH /api/jobs/proteomics/prot-1 {"annotationID":"123"}"#.to_string(),
        ]
    );
}

#[test]
fn blank_annotation_id_is_treated_as_absent() {
    let temp = tempfile::tempdir().unwrap();
    let app = app_with(logged_in_store(&temp), MockProteomics::default());

    for blank in ["", "   "] {
        let mut upload = ProteomicsUpload::new(write_abundance(&temp, GOOD_HEADER));
        upload.annotation_job_id = Some(blank.to_string());

        let outcome = app.upload_proteomics(&upload, &JsonOutput).unwrap();

        assert_eq!(outcome.link().unwrap().annotation_id, None);
    }
    assert_eq!(
        proteomics_calls(&app),
        vec!["POST 1 files".to_string(), "POST 1 files".to_string()]
    );
}

#[test]
fn binary_abundance_header_reports_missing_headers() {
    let temp = tempfile::tempdir().unwrap();
    let app = app_with(logged_in_store(&temp), MockProteomics::default());
    let path = temp.path().join("bin.tsv");
    std::fs::write(&path, [0xff, 0xfe, 0x00, b'\n']).unwrap();

    let outcome = app
        .upload_proteomics(&ProteomicsUpload::new(path), &JsonOutput)
        .unwrap();

    assert_matches!(outcome, UploadOutcome::MissingHeaders(ref missing) if missing.len() == 5);
    assert!(proteomics_calls(&app).is_empty());
}

fn app_calls(app: &TestApp) -> Vec<String> {
    app.jobs_client().calls.lock().unwrap().clone()
}

fn proteomics_calls(app: &TestApp) -> Vec<String> {
    app.proteomics_client().calls.lock().unwrap().clone()
}
