use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum BystroError {
    #[error("You are not logged in. Please login first.")]
    #[diagnostic(help("run `bystro-api login --host <HOST> --email <EMAIL> --password <PASSWORD>`"))]
    NotLoggedIn,

    #[error("failed to read credentials at {}", .path.display())]
    CredentialsRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse credentials file: {0}")]
    CredentialsParse(String),

    #[error("Please specify either a job id or a job type")]
    MissingJobSelector,

    #[error("Please specify either a job id or a job type, not both")]
    ConflictingJobSelector,

    #[error("Invalid job type: {given}. Valid types are: {valid}")]
    InvalidJobType { given: String, valid: String },

    #[error("at least one file is required to create a job")]
    NoInputFiles,

    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),

    #[error("invalid header value: {0}")]
    InvalidHeader(String),

    #[error("auth request failed: {0}")]
    AuthHttp(String),

    #[error("Login failed with response status: {status}. Error: \n{message}\n")]
    LoginStatus { status: u16, message: String },

    #[error("Signup failed with response status: {status}. Error: \n{message}\n")]
    SignupStatus { status: u16, message: String },

    #[error("user request failed: {0}")]
    UserHttp(String),

    #[error("Fetching profile failed with response status: {status}. Error: \n{message}\n")]
    UserStatus { status: u16, message: String },

    #[error("jobs request failed: {0}")]
    JobsHttp(String),

    #[error("Fetching jobs failed with response status: {status}. Error: {message}")]
    FetchJobsStatus { status: u16, message: String },

    #[error("Job creation failed with response status: {status}. Error: \n{message}\n")]
    CreateJobStatus { status: u16, message: String },

    #[error("Query failed with status: {status}. Error: \n{message}\n")]
    QueryStatus { status: u16, message: String },

    #[error("proteomics request failed: {0}")]
    ProteomicsHttp(String),

    #[error(
        "Proteomics job creation failed with response status: {status}. Error: \n{message}\n"
    )]
    ProteomicsStatus { status: u16, message: String },

    #[error("proteomics upload response has no job id")]
    MissingProteomicsId,

    #[error("unexpected response body: {0}")]
    Decode(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
