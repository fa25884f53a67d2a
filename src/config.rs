use chrono::{Duration, Weekday};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MilestonerConfig {
    pub owner: String,
    pub repositories: Vec<String>,
    pub github: GitHubConfig,
    pub schedule: ScheduleConfig,
}

impl Default for MilestonerConfig {
    fn default() -> Self {
        Self {
            owner: "mozilla".to_string(),
            repositories: [
                "addons",
                "addons-frontend",
                "addons-server",
                "addons-linter",
                "addons-code-manager",
                "addons-blog",
            ]
            .iter()
            .map(|repo| repo.to_string())
            .collect(),
            github: GitHubConfig::default(),
            schedule: ScheduleConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    pub token_env_var: String,
    pub api_base_url: String,
    pub user_agent: String,
    pub timeout_seconds: u64,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token_env_var: "MILESTONER_GITHUB_API_TOKEN".to_string(),
            api_base_url: "https://api.github.com".to_string(),
            user_agent: "milestoner/0.1.0".to_string(),
            timeout_seconds: 30,
        }
    }
}

impl GitHubConfig {
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_seconds)
    }
}

/// Date rules shared by the creation and closing passes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// How many upcoming weekly milestones should exist.
    pub milestone_count: u32,
    /// Day of the ISO week a milestone is named after.
    pub target_weekday: Weekday,
    /// A milestone is due this many days before its target day.
    pub due_offset_days: i64,
    /// An open milestone is closed once its due date is older than this.
    pub close_grace_days: i64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            milestone_count: 5,
            target_weekday: Weekday::Thu,
            due_offset_days: 2,
            close_grace_days: 3,
        }
    }
}

impl ScheduleConfig {
    pub fn due_offset(&self) -> Duration {
        Duration::days(self.due_offset_days)
    }

    pub fn close_grace(&self) -> Duration {
        Duration::days(self.close_grace_days)
    }
}
