use std::io::{self, Write};

use serde::Serialize;

use crate::app::{ProgressEvent, ProgressSink, SessionResult};
use crate::jobs::JobsResponse;
use crate::proteomics::UploadOutcome;
use crate::user::UserProfile;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const RESET: &str = "\x1b[0m";

/// Progress on stderr, results on stdout.
pub struct ConsoleOutput;

impl ConsoleOutput {
    pub fn print_session(result: &SessionResult, action: &str) -> io::Result<()> {
        println!("{GREEN}{action} successful. You may now use the Bystro API!{RESET}");
        println!("  email: {}", result.auth.email);
        println!("  server: {}", result.auth.base_url);
        println!("  credentials: {}", result.credentials_path);
        Ok(())
    }

    pub fn print_profile(profile: &UserProfile) -> io::Result<()> {
        println!("{CYAN}Profile{RESET}");
        JsonOutput::print_json(profile)
    }

    pub fn print_jobs(response: &JobsResponse) -> io::Result<()> {
        match response {
            JobsResponse::List(jobs) if jobs.is_empty() => {
                println!("{YELLOW}No jobs found{RESET}");
                Ok(())
            }
            JobsResponse::List(jobs) => {
                for job in jobs {
                    println!(
                        "{CYAN}{}{RESET}  {}  {}",
                        job.id,
                        job.created_at.format("%Y-%m-%d %H:%M"),
                        job.name
                    );
                }
                Ok(())
            }
            JobsResponse::Single(job) => JsonOutput::print_json(job),
        }
    }

    pub fn print_value(title: &str, value: &serde_json::Value) -> io::Result<()> {
        println!("{CYAN}{title}{RESET}");
        JsonOutput::print_json(value)
    }

    pub fn print_upload(outcome: &UploadOutcome) -> io::Result<()> {
        match outcome {
            UploadOutcome::Linked(link) => {
                println!("{GREEN}Proteomics upload complete{RESET}");
                JsonOutput::print_json(link)
            }
            UploadOutcome::MissingHeaders(missing) => {
                println!(
                    "{YELLOW}Error: The protein abundance file does not contain the required headers: {}{RESET}",
                    missing.join(", ")
                );
                Ok(())
            }
            UploadOutcome::AnnotationNotFound(id) => {
                println!(
                    "{YELLOW}The annotation with ID {id} does not exist or you do not have permissions to access this annotation.{RESET}"
                );
                Ok(())
            }
        }
    }
}

impl ProgressSink for ConsoleOutput {
    fn event(&self, event: ProgressEvent) {
        match event.elapsed {
            Some(elapsed) => eprintln!("{} ({} ms)", event.message, elapsed.as_millis()),
            None => eprintln!("{}", event.message),
        }
    }
}
