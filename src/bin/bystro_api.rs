use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use bystro_api::app::{App, Credentials, ProgressSink};
use bystro_api::auth::AuthHttpClient;
use bystro_api::config::ClientConfig;
use bystro_api::credentials::CredentialStore;
use bystro_api::domain::{DEFAULT_PORT, ProteomicsDatasetType};
use bystro_api::error::BystroError;
use bystro_api::jobs::{CreateJobRequest, DEFAULT_QUERY_SIZE, JobsHttpClient, SearchRequest};
use bystro_api::output::{ConsoleOutput, JsonOutput, OutputMode};
use bystro_api::proteomics::{ProteomicsHttpClient, ProteomicsUpload};
use bystro_api::user::UserHttpClient;

type HttpApp = App<AuthHttpClient, JobsHttpClient, UserHttpClient, ProteomicsHttpClient>;

#[derive(Parser)]
#[command(name = "bystro-api")]
#[command(about = "Bystro CLI tool for making API calls.")]
#[command(version)]
struct Cli {
    /// Where Bystro API login state is saved (default: $BYSTRO_DIR or ~/.bystro)
    #[arg(long, global = true)]
    dir: Option<String>,

    /// Print only the JSON result
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Authenticate with the Bystro API")]
    Login(LoginArgs),
    #[command(about = "Sign up to Bystro")]
    Signup(SignupArgs),
    #[command(about = "Fetch the user profile")]
    GetUser,
    #[command(about = "Create an annotation job")]
    CreateJob(CreateJobArgs),
    #[command(about = "Fetch one job or a list of jobs")]
    GetJobs(GetJobsArgs),
    #[command(about = "Run an OpenSearch query string query against a job, e.g. (cadd: >= 20)")]
    Query(QueryArgs),
    #[command(about = "Upload a proteomics dataset")]
    UploadProteomics(UploadProteomicsArgs),
}

#[derive(Args)]
struct ServerArgs {
    /// Host of the Bystro API server, e.g. https://bystro-dev.emory.edu
    #[arg(long)]
    host: String,

    /// Port of the Bystro API server
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,

    #[arg(long)]
    email: String,

    #[arg(long)]
    password: String,
}

impl ServerArgs {
    fn into_credentials(self) -> Credentials {
        Credentials {
            host: self.host,
            port: self.port,
            email: self.email,
            password: self.password,
        }
    }
}

#[derive(Args)]
struct LoginArgs {
    #[command(flatten)]
    server: ServerArgs,
}

#[derive(Args)]
struct SignupArgs {
    #[command(flatten)]
    server: ServerArgs,

    /// The name you'd like to use on the Bystro platform
    #[arg(long)]
    name: String,
}

#[derive(Args)]
struct CreateJobArgs {
    /// Paths to files: .vcf and .snp formats accepted
    #[arg(long, num_args = 1.., required = true)]
    files: Vec<PathBuf>,

    /// Genome assembly (e.g., hg19 or hg38 for human genomes)
    #[arg(long)]
    assembly: String,

    /// Skip building the natural language search index
    #[arg(long)]
    no_index: bool,
}

#[derive(Args)]
struct GetJobsArgs {
    /// Get a specific job by ID
    #[arg(long)]
    id: Option<String>,

    /// Get a list of jobs of a specific type: all, public, shared, incomplete, completed, failed
    #[arg(long = "type")]
    job_type: Option<String>,
}

#[derive(Args)]
struct QueryArgs {
    /// The job id to query
    #[arg(long, alias = "job_id")]
    job_id: String,

    /// The OpenSearch query string query
    #[arg(long)]
    query: String,

    /// How many records to return
    #[arg(long, default_value_t = DEFAULT_QUERY_SIZE)]
    size: u64,

    /// The first record to return from the matching results
    #[arg(long, alias = "from_", default_value_t = 0)]
    from: u64,
}

#[derive(Args)]
struct UploadProteomicsArgs {
    #[arg(long)]
    protein_abundance_file: PathBuf,

    #[arg(long)]
    experiment_annotation_file: Option<PathBuf>,

    /// ID of the annotation job to associate with this dataset
    #[arg(long)]
    annotation_job_id: Option<String>,

    #[arg(long, value_enum, default_value_t = ProteomicsDatasetType::FragpipeTmt)]
    proteomics_dataset_type: ProteomicsDatasetType,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<BystroError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &BystroError) -> u8 {
    match error {
        BystroError::NotLoggedIn
        | BystroError::MissingJobSelector
        | BystroError::ConflictingJobSelector
        | BystroError::InvalidJobType { .. }
        | BystroError::NoInputFiles => 2,
        BystroError::AuthHttp(_)
        | BystroError::LoginStatus { .. }
        | BystroError::SignupStatus { .. }
        | BystroError::UserHttp(_)
        | BystroError::UserStatus { .. }
        | BystroError::JobsHttp(_)
        | BystroError::FetchJobsStatus { .. }
        | BystroError::CreateJobStatus { .. }
        | BystroError::QueryStatus { .. }
        | BystroError::ProteomicsHttp(_)
        | BystroError::ProteomicsStatus { .. }
        | BystroError::MissingProteomicsId
        | BystroError::Decode(_) => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Human
    };

    let config = ClientConfig::resolve(cli.dir.as_deref())?;
    let store = CredentialStore::new(config.credentials_dir);
    let app = App::new(
        store,
        AuthHttpClient::new()?,
        JobsHttpClient::new()?,
        UserHttpClient::new()?,
        ProteomicsHttpClient::new()?,
    );

    let sink: &dyn ProgressSink = match output_mode {
        OutputMode::Json => &JsonOutput,
        OutputMode::Human => &ConsoleOutput,
    };

    match cli.command {
        Commands::Login(args) => run_login(args, &app, sink, output_mode),
        Commands::Signup(args) => run_signup(args, &app, sink, output_mode),
        Commands::GetUser => run_get_user(&app, sink, output_mode),
        Commands::CreateJob(args) => run_create_job(args, &app, sink, output_mode),
        Commands::GetJobs(args) => run_get_jobs(args, &app, sink, output_mode),
        Commands::Query(args) => run_query(args, &app, sink, output_mode),
        Commands::UploadProteomics(args) => run_upload_proteomics(args, &app, sink, output_mode),
    }
}

fn run_login(
    args: LoginArgs,
    app: &HttpApp,
    sink: &dyn ProgressSink,
    output_mode: OutputMode,
) -> miette::Result<()> {
    let result = app.login(&args.server.into_credentials(), sink)?;
    match output_mode {
        OutputMode::Json => JsonOutput::print_json(&result).into_diagnostic(),
        OutputMode::Human => ConsoleOutput::print_session(&result, "Login").into_diagnostic(),
    }
}

fn run_signup(
    args: SignupArgs,
    app: &HttpApp,
    sink: &dyn ProgressSink,
    output_mode: OutputMode,
) -> miette::Result<()> {
    let result = app.signup(&args.server.into_credentials(), &args.name, sink)?;
    match output_mode {
        OutputMode::Json => JsonOutput::print_json(&result).into_diagnostic(),
        OutputMode::Human => {
            ConsoleOutput::print_session(&result, "Signup & authentication").into_diagnostic()
        }
    }
}

fn run_get_user(
    app: &HttpApp,
    sink: &dyn ProgressSink,
    output_mode: OutputMode,
) -> miette::Result<()> {
    let profile = app.profile(sink)?;
    match output_mode {
        OutputMode::Json => JsonOutput::print_json(&profile).into_diagnostic(),
        OutputMode::Human => ConsoleOutput::print_profile(&profile).into_diagnostic(),
    }
}

fn run_create_job(
    args: CreateJobArgs,
    app: &HttpApp,
    sink: &dyn ProgressSink,
    output_mode: OutputMode,
) -> miette::Result<()> {
    let request = CreateJobRequest {
        files: args.files,
        assembly: args.assembly,
        index: !args.no_index,
    };
    let job = app.create_job(&request, sink)?;
    match output_mode {
        OutputMode::Json => JsonOutput::print_json(&job).into_diagnostic(),
        OutputMode::Human => {
            ConsoleOutput::print_value("Job creation successful:", &job).into_diagnostic()
        }
    }
}

fn run_get_jobs(
    args: GetJobsArgs,
    app: &HttpApp,
    sink: &dyn ProgressSink,
    output_mode: OutputMode,
) -> miette::Result<()> {
    let response = app.get_jobs(args.id.as_deref(), args.job_type.as_deref(), sink)?;
    match output_mode {
        OutputMode::Json => JsonOutput::print_json(&response).into_diagnostic(),
        OutputMode::Human => ConsoleOutput::print_jobs(&response).into_diagnostic(),
    }
}

fn run_query(
    args: QueryArgs,
    app: &HttpApp,
    sink: &dyn ProgressSink,
    output_mode: OutputMode,
) -> miette::Result<()> {
    let request = SearchRequest {
        job_id: args.job_id,
        query: args.query,
        size: args.size,
        from: args.from,
    };
    let results = app.query(&request, sink)?;
    match output_mode {
        OutputMode::Json => JsonOutput::print_json(&results).into_diagnostic(),
        OutputMode::Human => {
            ConsoleOutput::print_value("Query Results:", &results).into_diagnostic()
        }
    }
}

fn run_upload_proteomics(
    args: UploadProteomicsArgs,
    app: &HttpApp,
    sink: &dyn ProgressSink,
    output_mode: OutputMode,
) -> miette::Result<()> {
    let upload = ProteomicsUpload {
        protein_abundance_file: args.protein_abundance_file,
        experiment_annotation_file: args.experiment_annotation_file,
        annotation_job_id: args.annotation_job_id,
        dataset_type: args.proteomics_dataset_type,
    };
    let outcome = app.upload_proteomics(&upload, sink)?;
    match output_mode {
        OutputMode::Json => match outcome.link() {
            Some(link) => JsonOutput::print_json(link).into_diagnostic(),
            None => JsonOutput::print_json(&serde_json::json!({})).into_diagnostic(),
        },
        OutputMode::Human => ConsoleOutput::print_upload(&outcome).into_diagnostic(),
    }
}
