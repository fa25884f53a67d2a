pub mod client;
pub mod config;
pub mod error;
pub mod milestoner;
pub mod schedule;
pub mod types;

use chrono::{DateTime, Utc};
use log::info;

pub use client::{ApiResponse, GitHubClient, Verb};
pub use config::{GitHubConfig, MilestonerConfig, ScheduleConfig};
pub use error::{MilestonerError, Result};
pub use milestoner::{ClosureReport, CreationReport, MilestoneCache, Milestoner};
pub use types::{Milestone, MilestoneState, MilestoneUpdate, NewMilestone, Repository};

#[derive(Debug, Clone, PartialEq)]
pub struct RepositoryReport {
    pub repository: Repository,
    pub creation: CreationReport,
    pub closure: ClosureReport,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub repositories: Vec<RepositoryReport>,
}

impl RunSummary {
    pub fn created(&self) -> usize {
        self.repositories
            .iter()
            .map(|r| r.creation.created.len())
            .sum()
    }

    pub fn closed(&self) -> usize {
        self.repositories.iter().map(|r| r.closure.closed.len()).sum()
    }

    pub fn failures(&self) -> usize {
        self.repositories
            .iter()
            .map(|r| r.creation.failed.len() + r.closure.failed.len())
            .sum()
    }
}

/// Runs the creation and closing passes over every configured repository,
/// one after the other.
pub struct MilestoneRunner {
    client: GitHubClient,
    config: MilestonerConfig,
}

impl MilestoneRunner {
    pub fn new() -> Result<Self> {
        Self::with_config(MilestonerConfig::default())
    }

    pub fn with_config(config: MilestonerConfig) -> Result<Self> {
        let client = GitHubClient::with_config(config.github.clone())?;
        Ok(Self { client, config })
    }

    pub fn with_client(client: GitHubClient, config: MilestonerConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &MilestonerConfig {
        &self.config
    }

    pub fn repositories(&self) -> Vec<Repository> {
        self.config
            .repositories
            .iter()
            .map(|name| Repository::new(self.config.owner.as_str(), name.as_str()))
            .collect()
    }

    pub async fn run(&self) -> RunSummary {
        self.run_at(Utc::now()).await
    }

    /// `now` drives both the desired weeks (through its UTC date) and the
    /// expiry check.
    pub async fn run_at(&self, now: DateTime<Utc>) -> RunSummary {
        let mut summary = RunSummary::default();

        for repository in self.repositories() {
            let mut milestoner = Milestoner::new(
                &self.client,
                repository.clone(),
                self.config.schedule.clone(),
            );
            let creation = milestoner.create_next_milestones_on(now.date_naive()).await;
            let closure = milestoner.close_expired_milestones_at(now).await;

            info!(
                "{}: created {}, closed {}, failed {}",
                repository.full_name,
                creation.created.len(),
                closure.closed.len(),
                creation.failed.len() + closure.failed.len()
            );

            summary.repositories.push(RepositoryReport {
                repository,
                creation,
                closure,
            });
        }

        summary
    }
}

pub struct MilestoneRunnerBuilder {
    config: MilestonerConfig,
}

impl MilestoneRunnerBuilder {
    pub fn new() -> Self {
        Self {
            config: MilestonerConfig::default(),
        }
    }

    pub fn owner(mut self, owner: impl Into<String>) -> Self {
        self.config.owner = owner.into();
        self
    }

    pub fn repositories<I, S>(mut self, repositories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.repositories = repositories.into_iter().map(Into::into).collect();
        self
    }

    pub fn token_env_var(mut self, var_name: impl Into<String>) -> Self {
        self.config.github.token_env_var = var_name.into();
        self
    }

    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.github.api_base_url = url.into();
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.github.user_agent = agent.into();
        self
    }

    pub fn timeout(mut self, seconds: u64) -> Self {
        self.config.github.timeout_seconds = seconds;
        self
    }

    pub fn milestone_count(mut self, count: u32) -> Self {
        self.config.schedule.milestone_count = count;
        self
    }

    pub fn config(&self) -> &MilestonerConfig {
        &self.config
    }

    pub fn build(self) -> Result<MilestoneRunner> {
        MilestoneRunner::with_config(self.config)
    }

    /// Like `build`, with the token handed over directly instead of read from
    /// the environment.
    pub fn build_with_token(self, token: &str) -> Result<MilestoneRunner> {
        let client = GitHubClient::with_token(self.config.github.clone(), token)?;
        Ok(MilestoneRunner::with_client(client, self.config))
    }
}

impl Default for MilestoneRunnerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
