use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};
use std::fmt;

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Summary,
    Detail,
}

/// Lookback window the metrics API aggregates over.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Window {
    SixHours,
    #[default]
    Day,
    Week,
}

impl Window {
    /// Parses a window label. Unknown labels fall back to `24h`, same as the server.
    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "6h" => Window::SixHours,
            "7d" => Window::Week,
            _ => Window::Day,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Window::SixHours => "6h",
            Window::Day => "24h",
            Window::Week => "7d",
        }
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct RepoSummary {
    pub id: i64,
    pub full_name: String,
    pub commits_count: u64,
    pub is_private: bool,
}

/// One successful `/metrics/summary` response. Replaced wholesale, never patched.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct SummarySnapshot {
    pub window: String,
    pub total_commits: u64,
    #[serde(default)]
    pub total_lines_updated: u64,
    #[serde(default)]
    pub repos_updated_count: u64,
    #[serde(default, deserialize_with = "optional_timestamp")]
    pub last_checked_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub per_repo: Vec<RepoSummary>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct RepoMetrics {
    pub window: String,
    pub repo_id: i64,
    pub full_name: String,
    pub commits_count: u64,
    pub lines_added: u64,
    pub lines_deleted: u64,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct CommitRecord {
    pub sha: String,
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default)]
    pub author_login: Option<String>,
    #[serde(deserialize_with = "timestamp")]
    pub committed_at: DateTime<Utc>,
    pub message: String,
    pub additions: u64,
    pub deletions: u64,
    pub changed_files: u64,
    #[serde(default)]
    pub url: Option<String>,
}

impl CommitRecord {
    pub fn author(&self) -> &str {
        non_empty(&self.author_login)
            .or_else(|| non_empty(&self.author_name))
            .unwrap_or("Unknown")
    }

    /// First line of the commit message.
    pub fn headline(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

/// Body of `POST /admin/ingest`. Only logged, never acted on.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct IngestReceipt {
    #[serde(default)]
    pub ingested_new: Option<u64>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Health {
    pub status: String,
}

/// Parses RFC 3339, falling back to naive ISO-8601 interpreted as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

fn timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
}

fn optional_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) => parse_timestamp(&raw)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}"))),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn window_falls_back_to_a_day() {
        assert_eq!(Window::parse("6h"), Window::SixHours);
        assert_eq!(Window::parse("7d"), Window::Week);
        assert_eq!(Window::parse("24h"), Window::Day);
        assert_eq!(Window::parse("3y"), Window::Day);
        assert_eq!(Window::Week.to_string(), "7d");
    }

    #[test]
    fn summary_decodes_with_offset_timestamp() {
        let json = r#"{
            "window": "24h",
            "total_commits": 12,
            "total_lines_updated": 340,
            "repos_updated_count": 3,
            "last_checked_at": "2024-01-01T00:00:00Z",
            "per_repo": [
                {"id": 2, "full_name": "me/b", "commits_count": 9, "is_private": true},
                {"id": 1, "full_name": "me/a", "commits_count": 3, "is_private": false}
            ]
        }"#;
        let snapshot: SummarySnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.total_lines_updated, 340);
        assert_eq!(snapshot.repos_updated_count, 3);
        assert_eq!(
            snapshot.last_checked_at,
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
        );
        // API order is kept as-is
        let ids: Vec<i64> = snapshot.per_repo.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[test]
    fn summary_tolerates_older_payloads() {
        let json = r#"{
            "window": "24h",
            "total_commits": 0,
            "last_checked_at": "2024-03-05T10:11:12.123456",
            "per_repo": []
        }"#;
        let snapshot: SummarySnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.total_lines_updated, 0);
        assert_eq!(snapshot.repos_updated_count, 0);
        let checked = snapshot.last_checked_at.unwrap();
        assert_eq!(checked.format("%H:%M:%S").to_string(), "10:11:12");

        let null_checked = r#"{"window":"24h","total_commits":0,"last_checked_at":null,"per_repo":[]}"#;
        let snapshot: SummarySnapshot = serde_json::from_str(null_checked).unwrap();
        assert!(snapshot.last_checked_at.is_none());
    }

    #[test]
    fn commit_author_prefers_login() {
        let json = r#"{
            "sha": "abc123",
            "author_name": "Ada",
            "author_login": null,
            "committed_at": "2024-01-01T08:30:00+02:00",
            "message": "Fix parser\n\nlonger body",
            "additions": 10,
            "deletions": 2,
            "changed_files": 1,
            "url": null
        }"#;
        let mut commit: CommitRecord = serde_json::from_str(json).unwrap();
        assert_eq!(commit.author(), "Ada");
        assert_eq!(commit.headline(), "Fix parser");
        assert_eq!(commit.committed_at.format("%H:%M").to_string(), "06:30");

        commit.author_login = Some("ada".into());
        assert_eq!(commit.author(), "ada");
        commit.author_login = Some(String::new());
        assert_eq!(commit.author(), "Ada");
        commit.author_login = None;
        commit.author_name = None;
        assert_eq!(commit.author(), "Unknown");
    }

    #[test]
    fn bad_timestamp_is_rejected() {
        assert!(parse_timestamp("yesterday").is_none());
        let json = r#"{"sha":"x","committed_at":"nope","message":"m","additions":0,"deletions":0,"changed_files":0}"#;
        assert!(serde_json::from_str::<CommitRecord>(json).is_err());
    }
}
