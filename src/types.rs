use serde::{Deserialize, Serialize};

use crate::error::{MilestonerError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Repository {
    pub owner: String,
    pub name: String,
    pub full_name: String,
}

impl Repository {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        let owner = owner.into();
        let name = name.into();
        let full_name = format!("{}/{}", owner, name);
        Self {
            owner,
            name,
            full_name,
        }
    }

    pub fn from_full_name(full_name: &str) -> Result<Self> {
        let parts: Vec<&str> = full_name.split('/').collect();
        if parts.len() != 2 || parts.iter().any(|part| part.is_empty()) {
            return Err(MilestonerError::InvalidRepository(format!(
                "Expected 'owner/name', got: {}",
                full_name
            )));
        }
        Ok(Self::new(parts[0], parts[1]))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MilestoneState {
    Open,
    Closed,
}

/// A milestone as returned by the GitHub API.
///
/// `due_on` is kept as the raw timestamp text so that a record with a missing
/// or odd due date still makes it into the cache.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Milestone {
    pub id: u64,
    pub number: u64,
    pub title: String,
    pub state: MilestoneState,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub due_on: Option<String>,
}

/// Body of `POST /repos/{owner}/{repo}/milestones`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewMilestone {
    pub title: String,
    pub state: MilestoneState,
    pub description: String,
    pub due_on: String,
}

/// Body of `PATCH /repos/{owner}/{repo}/milestones/{number}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MilestoneUpdate {
    pub state: MilestoneState,
}

impl MilestoneUpdate {
    pub fn close() -> Self {
        Self {
            state: MilestoneState::Closed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_repository_from_full_name() {
        let repo = Repository::from_full_name("mozilla/addons-server").unwrap();
        assert_eq!(repo.owner, "mozilla");
        assert_eq!(repo.name, "addons-server");
        assert_eq!(repo.full_name, "mozilla/addons-server");

        assert!(Repository::from_full_name("addons-server").is_err());
        assert!(Repository::from_full_name("mozilla/").is_err());
        assert!(Repository::from_full_name("a/b/c").is_err());
    }

    #[test]
    fn test_milestone_tolerates_missing_due_date() {
        let milestone: Milestone = serde_json::from_value(json!({
            "id": 42,
            "number": 7,
            "title": "backlog",
            "state": "open",
            "description": null,
            "due_on": null,
            "open_issues": 12
        }))
        .unwrap();

        assert_eq!(milestone.number, 7);
        assert_eq!(milestone.state, MilestoneState::Open);
        assert!(milestone.due_on.is_none());
    }

    #[test]
    fn test_close_payload_shape() {
        let body = serde_json::to_value(MilestoneUpdate::close()).unwrap();
        assert_eq!(body, json!({"state": "closed"}));
    }
}
