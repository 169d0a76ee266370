use std::cmp::Reverse;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::de::DeserializeOwned;
use sqlx::PgPool;
use tracing::info;

use crate::dates;
use crate::db;
use crate::models::{CommunicationRecord, Intervention, MemberProfile, StaffActivityRecord};

pub const INTERVENTIONS_FILE: &str = "interventions.csv";
pub const STAFF_ACTIVITY_FILE: &str = "staff_activity.csv";
pub const COMMUNICATIONS_FILE: &str = "communications.csv";
pub const PROFILES_FILE: &str = "member_profiles.csv";

/// Where already-persisted journey records are read from.
pub enum RecordSource {
    Postgres(PgPool),
    CsvDir(PathBuf),
}

impl RecordSource {
    pub async fn interventions(&self, member_id: i64) -> anyhow::Result<Vec<Intervention>> {
        match self {
            RecordSource::Postgres(pool) => db::fetch_interventions(pool, member_id).await,
            RecordSource::CsvDir(dir) => {
                let mut records = load_interventions(&dir.join(INTERVENTIONS_FILE))?;
                records.retain(|record| record.member_id == member_id);
                Ok(records)
            }
        }
    }

    pub async fn staff_activity(&self) -> anyhow::Result<Vec<StaffActivityRecord>> {
        match self {
            RecordSource::Postgres(pool) => db::fetch_staff_activity(pool).await,
            RecordSource::CsvDir(dir) => load_staff_activity(&dir.join(STAFF_ACTIVITY_FILE)),
        }
    }

    pub async fn communications(
        &self,
        member_id: i64,
        limit: usize,
    ) -> anyhow::Result<Vec<CommunicationRecord>> {
        let records = match self {
            RecordSource::Postgres(pool) => db::fetch_communications(pool, member_id).await?,
            RecordSource::CsvDir(dir) => {
                let path = dir.join(COMMUNICATIONS_FILE);
                if !path.exists() {
                    info!(path = %path.display(), "no communications export found");
                    return Ok(Vec::new());
                }
                let mut records = load_communications(&path)?;
                records.retain(|record| record.member_id == member_id);
                records
            }
        };
        Ok(most_recent(records, limit))
    }

    pub async fn member_profile(&self, member_id: i64) -> anyhow::Result<Option<MemberProfile>> {
        match self {
            RecordSource::Postgres(pool) => db::fetch_member_profile(pool, member_id).await,
            RecordSource::CsvDir(dir) => {
                let path = dir.join(PROFILES_FILE);
                if !path.exists() {
                    info!(path = %path.display(), "no member profile export found");
                    return Ok(None);
                }
                Ok(load_member_profiles(&path)?
                    .into_iter()
                    .find(|profile| profile.member_id == member_id))
            }
        }
    }
}

/// Newest first by normalized date, unparseable dates last, then by
/// descending record id; keeps at most `limit`.
pub fn most_recent(mut records: Vec<CommunicationRecord>, limit: usize) -> Vec<CommunicationRecord> {
    records.sort_by_cached_key(|record| {
        (
            Reverse(dates::normalize(&record.date).ok()),
            Reverse(record.id),
        )
    });
    records.truncate(limit);
    records
}

/// Health goals are stored as a JSON array of strings; blank means none.
pub fn parse_health_goals(raw: Option<&str>) -> serde_json::Result<Vec<String>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(Vec::new()),
        Some(json) => serde_json::from_str(json),
    }
}

fn read_rows<T: DeserializeOwned>(path: &Path) -> anyhow::Result<Vec<(i64, T)>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    let mut rows = Vec::new();
    for (index, result) in reader.deserialize::<T>().enumerate() {
        let row_number = index as i64 + 1;
        let row = result
            .with_context(|| format!("{} row {row_number} is malformed", path.display()))?;
        rows.push((row_number, row));
    }

    info!(path = %path.display(), rows = rows.len(), "loaded csv export");
    Ok(rows)
}

pub fn load_interventions(path: &Path) -> anyhow::Result<Vec<Intervention>> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        member_id: i64,
        date: String,
        #[serde(rename = "type")]
        intervention_type: String,
        category: String,
        description: String,
        reason: String,
        outcome: Option<String>,
        staff_member: Option<String>,
        duration_minutes: Option<u32>,
    }

    Ok(read_rows::<CsvRow>(path)?
        .into_iter()
        .map(|(id, row)| Intervention {
            id,
            member_id: row.member_id,
            date: row.date,
            intervention_type: row.intervention_type,
            category: row.category,
            description: row.description,
            reason: row.reason,
            outcome: row.outcome,
            staff_member: row.staff_member,
            duration_minutes: row.duration_minutes,
        })
        .collect())
}

pub fn load_staff_activity(path: &Path) -> anyhow::Result<Vec<StaffActivityRecord>> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        staff_name: Option<String>,
        role: String,
        date: String,
        activity_type: String,
        duration_minutes: u32,
        member_id: Option<i64>,
    }

    Ok(read_rows::<CsvRow>(path)?
        .into_iter()
        .map(|(id, row)| StaffActivityRecord {
            id,
            staff_name: row.staff_name,
            role: row.role,
            date: row.date,
            activity_type: row.activity_type,
            duration_minutes: row.duration_minutes,
            member_id: row.member_id,
        })
        .collect())
}

pub fn load_communications(path: &Path) -> anyhow::Result<Vec<CommunicationRecord>> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        member_id: i64,
        date: String,
        sender: String,
        message: String,
        category: String,
    }

    Ok(read_rows::<CsvRow>(path)?
        .into_iter()
        .map(|(id, row)| CommunicationRecord {
            id,
            member_id: row.member_id,
            date: row.date,
            sender: row.sender,
            message: row.message,
            category: row.category,
        })
        .collect())
}

pub fn load_member_profiles(path: &Path) -> anyhow::Result<Vec<MemberProfile>> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        member_id: i64,
        dob: Option<String>,
        gender: Option<String>,
        location: Option<String>,
        occupation: Option<String>,
        health_goals: Option<String>,
        chronic_condition: Option<String>,
    }

    read_rows::<CsvRow>(path)?
        .into_iter()
        .map(|(row_number, row)| {
            let health_goals = parse_health_goals(row.health_goals.as_deref()).with_context(|| {
                format!("{} row {row_number} has malformed health goals", path.display())
            })?;
            Ok(MemberProfile {
                member_id: row.member_id,
                dob: row.dob,
                gender: row.gender,
                location: row.location,
                occupation: row.occupation,
                health_goals,
                chronic_condition: row.chronic_condition,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &Path, name: &str, contents: &str) {
        fs::write(dir.join(name), contents).unwrap();
    }

    #[test]
    fn loads_interventions_with_optional_fields() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            INTERVENTIONS_FILE,
            "member_id,date,type,category,description,reason,outcome,staff_member,duration_minutes\n\
             1,2025-01-15,Diagnostic,Blood Test,Initial blood panel,Baseline health assessment,Pending,Dr. Warren,30\n\
             1,02/10/25,Medication,Supplement,Magnesium Threonate,Improve sleep quality,,,\n",
        );

        let records = load_interventions(&dir.path().join(INTERVENTIONS_FILE)).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, 1);
        assert_eq!(records[0].intervention_type, "Diagnostic");
        assert_eq!(records[0].duration_minutes, Some(30));
        assert_eq!(records[1].id, 2);
        assert_eq!(records[1].date, "02/10/25");
        assert_eq!(records[1].outcome, None);
        assert_eq!(records[1].staff_member, None);
        assert_eq!(records[1].duration_minutes, None);
    }

    #[test]
    fn loads_staff_activity_without_member() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            STAFF_ACTIVITY_FILE,
            "staff_name,role,date,activity_type,duration_minutes,member_id\n\
             Ruby,Concierge,2025-01-15,Consultation,45,1\n\
             Advik,Performance Scientist,2025-01-16,Research,90,\n",
        );

        let records = load_staff_activity(&dir.path().join(STAFF_ACTIVITY_FILE)).unwrap();

        assert_eq!(records[0].staff(), Some("Ruby"));
        assert_eq!(records[0].member_id, Some(1));
        assert_eq!(records[1].member_id, None);
        assert_eq!(records[1].duration_minutes, 90);
    }

    #[test]
    fn malformed_row_names_file_and_row() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            STAFF_ACTIVITY_FILE,
            "staff_name,role,date,activity_type,duration_minutes,member_id\n\
             Ruby,Concierge,2025-01-15,Consultation,forty,1\n",
        );

        let err = load_staff_activity(&dir.path().join(STAFF_ACTIVITY_FILE)).unwrap_err();
        assert!(err.to_string().contains("row 1"));
    }

    #[tokio::test]
    async fn csv_source_filters_by_member_and_limits() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            INTERVENTIONS_FILE,
            "member_id,date,type,category,description,reason,outcome,staff_member,duration_minutes\n\
             1,2025-01-15,Diagnostic,Blood Test,Initial blood panel,Baseline,Pending,Dr. Warren,30\n\
             2,2025-01-20,Therapy,Physical,Physio assessment,Back pain,,Rachel,60\n",
        );
        write(
            dir.path(),
            COMMUNICATIONS_FILE,
            "member_id,date,sender,message,category\n\
             1,2025-01-15,Rohan Patel,Can we review my results?,Test Results\n\
             1,2025-01-16,Ruby,Scheduling a follow-up.,Follow-up\n\
             2,2025-01-16,Ruby,Welcome aboard.,General Query\n",
        );
        let source = RecordSource::CsvDir(dir.path().to_path_buf());

        let interventions = source.interventions(1).await.unwrap();
        assert_eq!(interventions.len(), 1);
        assert_eq!(interventions[0].category, "Blood Test");

        let communications = source.communications(1, 1).await.unwrap();
        assert_eq!(communications.len(), 1);
        assert_eq!(communications[0].sender, "Ruby");
    }

    fn message(id: i64, date: &str) -> CommunicationRecord {
        CommunicationRecord {
            id,
            member_id: 1,
            date: date.to_string(),
            sender: "Ruby".to_string(),
            message: format!("message {id}"),
            category: "Follow-up".to_string(),
        }
    }

    #[test]
    fn most_recent_orders_mixed_formats_by_calendar_date() {
        let records = vec![
            message(1, "12/31/24"),
            message(2, "2025-06-01"),
            message(3, "not a date"),
            message(4, "15-03-2025"),
            message(5, "2025-06-01"),
        ];

        let ids: Vec<i64> = most_recent(records.clone(), 10)
            .iter()
            .map(|record| record.id)
            .collect();
        assert_eq!(ids, vec![5, 2, 4, 1, 3]);

        let ids: Vec<i64> = most_recent(records, 2).iter().map(|record| record.id).collect();
        assert_eq!(ids, vec![5, 2]);
    }

    #[tokio::test]
    async fn csv_communications_return_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            COMMUNICATIONS_FILE,
            "member_id,date,sender,message,category\n\
             1,12/31/24,Rohan Patel,Happy new year,General Query\n\
             1,2025-06-01,Ruby,Weekly summary attached.,Weekly Report\n\
             1,01-02-2025,Carla,Updated meal plan.,Plan Update\n",
        );
        let source = RecordSource::CsvDir(dir.path().to_path_buf());

        let communications = source.communications(1, 2).await.unwrap();
        let senders: Vec<&str> = communications.iter().map(|c| c.sender.as_str()).collect();
        assert_eq!(senders, vec!["Ruby", "Carla"]);
    }

    #[test]
    fn health_goals_parse_from_json_array() {
        assert_eq!(
            parse_health_goals(Some(r#"["Lower ApoB", "Sleep 8 hours"]"#)).unwrap(),
            vec!["Lower ApoB", "Sleep 8 hours"]
        );
        assert!(parse_health_goals(None).unwrap().is_empty());
        assert!(parse_health_goals(Some("  ")).unwrap().is_empty());
        assert!(parse_health_goals(Some("Lower ApoB")).is_err());
    }

    #[tokio::test]
    async fn csv_profile_is_found_by_member() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            PROFILES_FILE,
            "member_id,dob,gender,location,occupation,health_goals,chronic_condition\n\
             1,1979-03-12,Male,Singapore,Regional Head of Sales,\"[\"\"Reduce heart disease risk\"\"]\",High blood pressure\n",
        );
        let source = RecordSource::CsvDir(dir.path().to_path_buf());

        let profile = source.member_profile(1).await.unwrap().unwrap();
        assert_eq!(profile.location.as_deref(), Some("Singapore"));
        assert_eq!(profile.health_goals, vec!["Reduce heart disease risk"]);
        assert!(source.member_profile(2).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_profile_export_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let source = RecordSource::CsvDir(dir.path().to_path_buf());

        assert!(source.member_profile(1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_communications_export_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let source = RecordSource::CsvDir(dir.path().to_path_buf());

        assert!(source.communications(1, 10).await.unwrap().is_empty());
    }
}
