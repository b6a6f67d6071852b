use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::BystroError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobType {
    All,
    Public,
    Shared,
    Incomplete,
    Completed,
    Failed,
}

impl JobType {
    pub const ALL: [JobType; 6] = [
        JobType::All,
        JobType::Public,
        JobType::Shared,
        JobType::Incomplete,
        JobType::Completed,
        JobType::Failed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            JobType::All => "all",
            JobType::Public => "public",
            JobType::Shared => "shared",
            JobType::Incomplete => "incomplete",
            JobType::Completed => "completed",
            JobType::Failed => "failed",
        }
    }

    /// Route appended to `/api/jobs` for the list endpoint of this category.
    pub fn route(self) -> &'static str {
        match self {
            JobType::All => "/list/all",
            JobType::Public => "/list/all/public",
            JobType::Shared => "/list/shared",
            JobType::Incomplete => "/list/incomplete",
            JobType::Completed => "/list/completed",
            JobType::Failed => "/list/failed",
        }
    }

    fn valid_names() -> String {
        Self::ALL
            .iter()
            .map(|job_type| job_type.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobType {
    type Err = BystroError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|job_type| job_type.as_str() == value.trim())
            .ok_or_else(|| BystroError::InvalidJobType {
                given: value.to_string(),
                valid: Self::valid_names(),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobSelector {
    Id(String),
    Type(JobType),
}

impl JobSelector {
    /// Exactly one of `id` and `job_type` must be set. Empty strings count as unset.
    pub fn from_parts(id: Option<&str>, job_type: Option<&str>) -> Result<Self, BystroError> {
        let id = id.map(str::trim).filter(|value| !value.is_empty());
        let job_type = job_type.map(str::trim).filter(|value| !value.is_empty());
        match (id, job_type) {
            (None, None) => Err(BystroError::MissingJobSelector),
            (Some(_), Some(_)) => Err(BystroError::ConflictingJobSelector),
            (Some(id), None) => Ok(JobSelector::Id(id.to_string())),
            (None, Some(job_type)) => Ok(JobSelector::Type(job_type.parse()?)),
        }
    }

    /// Path below the server root, e.g. `/api/jobs/list/completed`.
    pub fn path(&self) -> String {
        match self {
            JobSelector::Id(id) => format!("/api/jobs/{id}"),
            JobSelector::Type(job_type) => format!("/api/jobs{}", job_type.route()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum ProteomicsDatasetType {
    #[default]
    #[serde(rename = "fragpipe-TMT")]
    #[value(name = "fragpipe-TMT", alias = "fragpipe_TMT")]
    FragpipeTmt,
    #[serde(rename = "somascan")]
    #[value(name = "somascan")]
    Somascan,
}

impl ProteomicsDatasetType {
    pub fn as_str(self) -> &'static str {
        match self {
            ProteomicsDatasetType::FragpipeTmt => "fragpipe-TMT",
            ProteomicsDatasetType::Somascan => "somascan",
        }
    }
}

impl fmt::Display for ProteomicsDatasetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const DEFAULT_PORT: u16 = 443;

/// Fully qualified host, e.g. `https://bystro-dev.emory.edu:443`.
pub fn fq_host(host: &str, port: u16) -> String {
    format!("{}:{port}", host.trim().trim_end_matches('/'))
}
