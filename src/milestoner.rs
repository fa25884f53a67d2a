use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use log::{error, info, warn};
use serde::Deserialize;
use serde_json::Value;

use crate::client::{ApiResponse, GitHubClient, Verb};
use crate::config::ScheduleConfig;
use crate::schedule::{
    desired_milestones, due_date_for, format_due_on, is_expired, milestone_title, parse_due_on,
    parse_milestone_title,
};
use crate::types::{Milestone, MilestoneState, MilestoneUpdate, NewMilestone, Repository};

/// Snapshot of a repository's open milestones, filled at most once.
///
/// A failed fetch still counts as the one fetch; the snapshot is then empty
/// and flagged so that nothing gets created from it.
#[derive(Debug, Default)]
pub struct MilestoneCache {
    populated: bool,
    fetch_failed: bool,
    records: Vec<Milestone>,
}

impl MilestoneCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_populated(&self) -> bool {
        self.populated
    }

    pub fn fetch_failed(&self) -> bool {
        self.fetch_failed
    }

    pub fn records(&self) -> &[Milestone] {
        &self.records
    }

    pub fn fill(&mut self, records: Vec<Milestone>) {
        self.records = records;
        self.populated = true;
        self.fetch_failed = false;
    }

    pub fn mark_failed(&mut self) {
        self.records.clear();
        self.populated = true;
        self.fetch_failed = true;
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreationReport {
    pub created: Vec<NaiveDate>,
    pub failed: Vec<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClosureReport {
    /// Numbers of the milestones that were closed.
    pub closed: Vec<u64>,
    pub failed: Vec<u64>,
}

/// One reconciliation pass over a single repository.
///
/// Build a fresh instance per repository: the open milestones are fetched once
/// and the same snapshot serves both the creation and the closing pass.
pub struct Milestoner<'a> {
    client: &'a GitHubClient,
    repo: Repository,
    schedule: ScheduleConfig,
    cache: MilestoneCache,
}

impl<'a> Milestoner<'a> {
    pub fn new(client: &'a GitHubClient, repo: Repository, schedule: ScheduleConfig) -> Self {
        Self {
            client,
            repo,
            schedule,
            cache: MilestoneCache::new(),
        }
    }

    pub fn cache(&self) -> &MilestoneCache {
        &self.cache
    }

    /// Target dates of the currently open, date-titled milestones.
    pub async fn fetch_open_milestones(&mut self) -> Vec<NaiveDate> {
        self.ensure_cache().await;

        let mut existing = Vec::new();
        for record in self.cache.records() {
            match parse_milestone_title(&record.title) {
                Some(date) => existing.push(date),
                None => warn!(
                    "Ignoring broken existing milestone {:?} on {}",
                    record.title, self.repo.full_name
                ),
            }
        }

        info!(
            "We currently have {:?} on {}",
            existing, self.repo.full_name
        );
        existing
    }

    async fn ensure_cache(&mut self) {
        if self.cache.is_populated() {
            return;
        }

        let query = [("state", "open")];
        let response = self
            .client
            .request(&self.repo, Verb::Get, "milestones", None::<&()>, Some(&query[..]))
            .await;

        match response {
            ApiResponse::Success(Value::Array(items)) => {
                let records = decode_milestones(items, &self.repo);
                self.cache.fill(records);
            }
            ApiResponse::Success(other) => {
                error!(
                    "Expected a list of milestones from {}, got: {}",
                    self.repo.full_name, other
                );
                self.cache.mark_failed();
            }
            ApiResponse::Failure { .. } => {
                error!(
                    "Could not fetch open milestones for {}",
                    self.repo.full_name
                );
                self.cache.mark_failed();
            }
        }
    }

    pub async fn create_next_milestones(&mut self) -> CreationReport {
        self.create_next_milestones_on(Utc::now().date_naive()).await
    }

    /// Creates the desired milestones for the weeks starting at `today` that
    /// are not open yet.
    pub async fn create_next_milestones_on(&mut self, today: NaiveDate) -> CreationReport {
        let desired = desired_milestones(
            today,
            self.schedule.milestone_count,
            self.schedule.target_weekday,
        );
        info!("We want to have {:?}", desired);

        let existing = self.fetch_open_milestones().await;
        if self.cache.fetch_failed() {
            error!(
                "Not creating milestones on {}, its open milestones are unknown",
                self.repo.full_name
            );
            return CreationReport::default();
        }

        let missing = missing_milestones(&desired, &existing);
        info!(
            "We are missing {:?} on {}",
            missing, self.repo.full_name
        );

        let mut report = CreationReport::default();
        for target in missing {
            let payload = self.new_milestone(target);
            let response = self
                .client
                .request(&self.repo, Verb::Post, "milestones", Some(&payload), None)
                .await;

            match created_milestone(response) {
                Ok(milestone) => {
                    info!(
                        "Created milestone {} (#{}) on {}",
                        target, milestone.number, self.repo.full_name
                    );
                    report.created.push(target);
                }
                Err(payload) => {
                    error!(
                        "Failed to create milestone {} on {}",
                        target, self.repo.full_name
                    );
                    error!("{}", payload);
                    report.failed.push(target);
                }
            }
        }

        report
    }

    pub fn new_milestone(&self, target: NaiveDate) -> NewMilestone {
        let due_on = due_date_for(target, self.schedule.due_offset());
        NewMilestone {
            title: milestone_title(target),
            state: MilestoneState::Open,
            description: String::new(),
            due_on: format_due_on(due_on),
        }
    }

    pub async fn close_expired_milestones(&mut self) -> ClosureReport {
        self.close_expired_milestones_at(Utc::now()).await
    }

    /// Closes every cached milestone whose due date is more than the grace
    /// period before `now`.
    pub async fn close_expired_milestones_at(&mut self, now: DateTime<Utc>) -> ClosureReport {
        self.ensure_cache().await;

        let grace = self.schedule.close_grace();
        let expired: Vec<(u64, String)> = self
            .cache
            .records()
            .iter()
            .filter(|record| {
                if parse_milestone_title(&record.title).is_none() {
                    warn!(
                        "Ignoring broken existing milestone {:?} on {}",
                        record.title, self.repo.full_name
                    );
                    return false;
                }
                let Some(raw) = record.due_on.as_deref() else {
                    warn!(
                        "Milestone {:?} on {} has no due date, leaving it alone",
                        record.title, self.repo.full_name
                    );
                    return false;
                };
                match parse_due_on(raw) {
                    Some(due_on) => is_expired(due_on, now, grace),
                    None => {
                        warn!(
                            "Milestone {:?} on {} has an unreadable due date {:?}",
                            record.title, self.repo.full_name, raw
                        );
                        false
                    }
                }
            })
            .map(|record| (record.number, record.title.clone()))
            .collect();

        let mut report = ClosureReport::default();
        for (number, title) in expired {
            info!("Closing milestone {} on {}", title, self.repo.full_name);
            let path = format!("milestones/{}", number);
            let response = self
                .client
                .request(
                    &self.repo,
                    Verb::Patch,
                    &path,
                    Some(&MilestoneUpdate::close()),
                    None,
                )
                .await;

            if response.is_success() {
                report.closed.push(number);
            } else {
                error!(
                    "Failed to close milestone {} on {}",
                    title, self.repo.full_name
                );
                error!("{}", response.payload());
                report.failed.push(number);
            }
        }

        report
    }
}

/// Desired dates that have no open milestone yet, in ascending order.
pub fn missing_milestones(desired: &[NaiveDate], existing: &[NaiveDate]) -> BTreeSet<NaiveDate> {
    let existing: BTreeSet<&NaiveDate> = existing.iter().collect();
    desired
        .iter()
        .filter(|date| !existing.contains(date))
        .copied()
        .collect()
}

fn decode_milestones(items: Vec<Value>, repo: &Repository) -> Vec<Milestone> {
    items
        .into_iter()
        .filter_map(|item| match Milestone::deserialize(&item) {
            Ok(milestone) => Some(milestone),
            Err(e) => {
                warn!(
                    "Dropping undecodable milestone on {}: {} ({})",
                    repo.full_name, item, e
                );
                None
            }
        })
        .collect()
}

/// A creation only counts when the answer is a milestone record.
fn created_milestone(response: ApiResponse) -> std::result::Result<Milestone, Value> {
    match response {
        ApiResponse::Success(payload) => Milestone::deserialize(&payload).map_err(|_| payload),
        ApiResponse::Failure { payload, .. } => Err(payload),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn test_missing_excludes_existing() {
        let desired = vec![date(2024, 3, 7), date(2024, 3, 14), date(2024, 3, 21)];
        let existing = vec![date(2024, 3, 7), date(2024, 2, 29)];

        let missing = missing_milestones(&desired, &existing);
        assert_eq!(
            missing.into_iter().collect::<Vec<_>>(),
            vec![date(2024, 3, 14), date(2024, 3, 21)]
        );
    }

    #[test]
    fn test_missing_is_empty_once_everything_exists() {
        let desired = vec![date(2024, 3, 7), date(2024, 3, 14)];
        let first = missing_milestones(&desired, &[date(2024, 3, 7)]);

        let mut existing = vec![date(2024, 3, 7)];
        existing.extend(first);
        assert!(missing_milestones(&desired, &existing).is_empty());
    }

    #[test]
    fn test_cache_starts_empty_and_fills_once() {
        let mut cache = MilestoneCache::new();
        assert!(!cache.is_populated());
        assert!(cache.records().is_empty());

        cache.fill(Vec::new());
        assert!(cache.is_populated());
        assert!(!cache.fetch_failed());
        assert!(cache.records().is_empty());
    }

    #[test]
    fn test_failed_fetch_counts_as_the_one_fetch() {
        let mut cache = MilestoneCache::new();
        cache.mark_failed();

        assert!(cache.is_populated());
        assert!(cache.fetch_failed());
        assert!(cache.records().is_empty());
    }

    #[test]
    fn test_decode_drops_records_without_identity() {
        let repo = Repository::new("mozilla", "addons");
        let items = vec![
            json!({"id": 1, "number": 3, "title": "2024.03.07", "state": "open",
                   "due_on": "2024-03-05T08:00:00Z"}),
            json!({"title": "no id or number"}),
        ];

        let decoded = decode_milestones(items, &repo);
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].number, 3);
    }

    #[test]
    fn test_created_milestone_requires_a_record() {
        let ok = ApiResponse::Success(json!({
            "id": 10, "number": 4, "title": "2024.03.14", "state": "open",
            "description": "", "due_on": "2024-03-12T08:00:00Z"
        }));
        assert_eq!(created_milestone(ok).unwrap().number, 4);

        let odd = ApiResponse::Success(json!({"message": "accepted"}));
        assert_eq!(created_milestone(odd).unwrap_err()["message"], "accepted");

        let failed = ApiResponse::Failure {
            status: Some(422),
            payload: json!({"message": "Validation Failed"}),
        };
        assert!(created_milestone(failed).is_err());
    }
}
