use std::collections::BTreeMap;

use serde::Serialize;

use crate::dates::{self, NormalizedDate};

#[derive(Debug, Clone)]
pub struct Intervention {
    pub id: i64,
    pub member_id: i64,
    pub date: String,
    pub intervention_type: String,
    pub category: String,
    pub description: String,
    pub reason: String,
    pub outcome: Option<String>,
    pub staff_member: Option<String>,
    pub duration_minutes: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemberProfile {
    pub member_id: i64,
    pub dob: Option<String>,
    pub gender: Option<String>,
    pub location: Option<String>,
    pub occupation: Option<String>,
    pub health_goals: Vec<String>,
    pub chronic_condition: Option<String>,
}

impl MemberProfile {
    /// Whole years of age on `on`; `None` when the birth date is missing or unparseable.
    pub fn age_on(&self, on: NormalizedDate) -> Option<u32> {
        let dob = dates::normalize(self.dob.as_deref()?).ok()?;
        dob.years_until(on)
    }
}

#[derive(Debug, Clone)]
pub struct CommunicationRecord {
    pub id: i64,
    pub member_id: i64,
    pub date: String,
    pub sender: String,
    pub message: String,
    pub category: String,
}

#[derive(Debug, Clone)]
pub struct StaffActivityRecord {
    pub id: i64,
    pub staff_name: Option<String>,
    pub role: String,
    pub date: String,
    pub activity_type: String,
    pub duration_minutes: u32,
    pub member_id: Option<i64>,
}

impl StaffActivityRecord {
    /// Staff name with blank values treated as missing.
    pub fn staff(&self) -> Option<&str> {
        self.staff_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelineEvent {
    pub date: NormalizedDate,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRecord {
    pub record_id: i64,
    pub raw_date: String,
    pub reason: String,
}

/// Accounting of what an aggregation pass kept and dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    pub total: usize,
    pub accepted: usize,
    pub skipped: Vec<SkippedRecord>,
}

impl Diagnostics {
    pub fn excluded(&self) -> usize {
        self.skipped.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StaffMetric {
    pub staff_name: String,
    pub role: String,
    pub total_minutes: u64,
    pub activity_count: usize,
    /// Count per activity type, by name.
    pub activities: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PersonaMetric {
    pub name: &'static str,
    pub value: u8,
}
