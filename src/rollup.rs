use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;
use tracing::{debug, warn};

use crate::chart::{self, ChartError, ChartSeries};
use crate::dates::{self, MonthKey};
use crate::models::{Diagnostics, SkippedRecord, StaffActivityRecord, StaffMetric};

const MINUTES_PER_HOUR: f64 = 60.0;

/// Summed activity per (month, staff). Pairs without activity are absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonthlyStaffHours {
    minutes: BTreeMap<(MonthKey, String), u64>,
}

/// Hours per staff member over one shared ascending month axis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StaffHoursPivot {
    pub months: Vec<MonthKey>,
    pub series: Vec<(String, Vec<f64>)>,
}

impl MonthlyStaffHours {
    pub fn hours(&self, month: MonthKey, staff: &str) -> Option<f64> {
        self.minutes
            .get(&(month, staff.to_string()))
            .map(|&minutes| minutes as f64 / MINUTES_PER_HOUR)
    }

    pub fn months(&self) -> Vec<MonthKey> {
        self.minutes
            .keys()
            .map(|(month, _)| *month)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn staff_names(&self) -> Vec<String> {
        self.minutes
            .keys()
            .map(|(_, staff)| staff.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.minutes.is_empty()
    }

    /// Staff in name order, each zero-filled across every month seen.
    pub fn pivot(&self) -> StaffHoursPivot {
        let months = self.months();
        let series = self
            .staff_names()
            .into_iter()
            .map(|staff| {
                let values = months
                    .iter()
                    .map(|&month| self.hours(month, &staff).unwrap_or(0.0))
                    .collect();
                (staff, values)
            })
            .collect();

        StaffHoursPivot { months, series }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaffRollup {
    pub hours: MonthlyStaffHours,
    pub diagnostics: Diagnostics,
    /// Records with a valid date but no staff name.
    pub unattributed: usize,
}

impl StaffRollup {
    pub fn chart(&self) -> Result<ChartSeries, ChartError> {
        chart::staff_hours_chart(&self.hours)
    }
}

pub fn rollup(records: &[StaffActivityRecord]) -> StaffRollup {
    let mut result = StaffRollup {
        diagnostics: Diagnostics {
            total: records.len(),
            ..Diagnostics::default()
        },
        ..StaffRollup::default()
    };

    for record in records {
        let date = match dates::normalize(&record.date) {
            Ok(date) => date,
            Err(err) => {
                warn!(record_id = record.id, raw_date = %err.raw, "skipping staff activity with invalid date");
                result.diagnostics.skipped.push(SkippedRecord {
                    record_id: record.id,
                    raw_date: err.raw.clone(),
                    reason: err.to_string(),
                });
                continue;
            }
        };
        result.diagnostics.accepted += 1;

        let Some(staff) = record.staff() else {
            debug!(record_id = record.id, "staff activity has no staff name");
            result.unattributed += 1;
            continue;
        };

        *result
            .hours
            .minutes
            .entry((date.month_key(), staff.to_string()))
            .or_insert(0) += u64::from(record.duration_minutes);
    }

    debug!(
        total = result.diagnostics.total,
        accepted = result.diagnostics.accepted,
        unattributed = result.unattributed,
        "staff activity rolled up"
    );

    result
}

/// Totals per staff member regardless of date, busiest first.
pub fn staff_metrics(records: &[StaffActivityRecord]) -> Vec<StaffMetric> {
    let mut map: HashMap<&str, StaffMetric> = HashMap::new();

    for record in records {
        let Some(staff) = record.staff() else {
            continue;
        };
        let entry = map.entry(staff).or_insert_with(|| StaffMetric {
            staff_name: staff.to_string(),
            role: record.role.clone(),
            total_minutes: 0,
            activity_count: 0,
            activities: BTreeMap::new(),
        });
        entry.total_minutes += u64::from(record.duration_minutes);
        entry.activity_count += 1;
        *entry
            .activities
            .entry(record.activity_type.clone())
            .or_insert(0) += 1;
    }

    let mut metrics: Vec<StaffMetric> = map.into_values().collect();
    metrics.sort_by(|a, b| {
        b.total_minutes
            .cmp(&a.total_minutes)
            .then_with(|| a.staff_name.cmp(&b.staff_name))
    });
    metrics
}
