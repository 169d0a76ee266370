use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, warn};

use crate::chart::{self, ChartError, ChartSeries};
use crate::dates::{self, NormalizedDate};
use crate::models::{Diagnostics, Intervention, SkippedRecord, TimelineEvent};

/// Events grouped by category.
///
/// Categories keep the order in which they first appear when interventions
/// are walked by ascending date; that order is also the color rank. Events
/// inside a category are ascending by date, same-day events in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CategorySeries {
    categories: IndexMap<String, Vec<TimelineEvent>>,
}

impl CategorySeries {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[TimelineEvent])> {
        self.categories
            .iter()
            .map(|(category, events)| (category.as_str(), events.as_slice()))
    }

    #[cfg(test)]
    pub fn get(&self, category: &str) -> Option<&[TimelineEvent]> {
        self.categories.get(category).map(Vec::as_slice)
    }

    #[cfg(test)]
    pub fn color_of(&self, category: &str) -> Option<&'static str> {
        self.categories
            .get_index_of(category)
            .map(chart::palette_color)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    #[cfg(test)]
    pub fn event_count(&self) -> usize {
        self.categories.values().map(Vec::len).sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Timeline {
    pub categories: CategorySeries,
    pub diagnostics: Diagnostics,
}

impl Timeline {
    pub fn chart(&self) -> Result<ChartSeries, ChartError> {
        chart::timeline_chart(&self.categories)
    }
}

pub fn aggregate(interventions: &[Intervention]) -> Timeline {
    let mut diagnostics = Diagnostics {
        total: interventions.len(),
        ..Diagnostics::default()
    };
    let mut by_date: BTreeMap<NormalizedDate, Vec<&Intervention>> = BTreeMap::new();

    for intervention in interventions {
        match dates::normalize(&intervention.date) {
            Ok(date) => {
                by_date.entry(date).or_default().push(intervention);
                diagnostics.accepted += 1;
            }
            Err(err) => {
                warn!(record_id = intervention.id, raw_date = %err.raw, "skipping intervention with invalid date");
                diagnostics.skipped.push(SkippedRecord {
                    record_id: intervention.id,
                    raw_date: err.raw.clone(),
                    reason: err.to_string(),
                });
            }
        }
    }

    let mut categories: IndexMap<String, Vec<TimelineEvent>> = IndexMap::new();
    for (date, day) in by_date {
        for intervention in day {
            categories
                .entry(intervention.category.clone())
                .or_default()
                .push(TimelineEvent {
                    date,
                    description: intervention.description.clone(),
                });
        }
    }

    debug!(
        total = diagnostics.total,
        accepted = diagnostics.accepted,
        categories = categories.len(),
        "timeline aggregated"
    );

    Timeline {
        categories: CategorySeries { categories },
        diagnostics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::Values;
    use proptest::prelude::*;

    fn intervention(id: i64, date: &str, category: &str, description: &str) -> Intervention {
        Intervention {
            id,
            member_id: 1,
            date: date.to_string(),
            intervention_type: "Diagnostic".to_string(),
            category: category.to_string(),
            description: description.to_string(),
            reason: "Baseline health assessment".to_string(),
            outcome: None,
            staff_member: Some("Dr. Warren".to_string()),
            duration_minutes: Some(30),
        }
    }

    fn ymd(year: i32, month: u32, day: u32) -> NormalizedDate {
        NormalizedDate::from_ymd(year, month, day).unwrap()
    }

    #[test]
    fn mixed_formats_share_a_date_and_keep_input_order() {
        let records = vec![
            intervention(1, "01/15/25", "Blood Test", "A"),
            intervention(2, "2025-01-15", "Blood Test", "B"),
        ];
        let timeline = aggregate(&records);

        assert_eq!(timeline.categories.len(), 1);
        assert_eq!(
            timeline.categories.get("Blood Test").unwrap(),
            &[
                TimelineEvent {
                    date: ymd(2025, 1, 15),
                    description: "A".to_string(),
                },
                TimelineEvent {
                    date: ymd(2025, 1, 15),
                    description: "B".to_string(),
                },
            ]
        );
    }

    #[test]
    fn categories_follow_first_appearance_by_date() {
        let records = vec![
            intervention(1, "2025-07-15", "Blood Test", "Advanced lipid panel"),
            intervention(2, "2025-02-10", "Supplement", "Magnesium Threonate"),
            intervention(3, "2025-01-20", "Physical", "Initial physio assessment"),
            intervention(4, "2025-01-15", "Blood Test", "Initial blood panel"),
        ];
        let timeline = aggregate(&records);

        let order: Vec<&str> = timeline.categories.iter().map(|(name, _)| name).collect();
        assert_eq!(order, vec!["Blood Test", "Physical", "Supplement"]);
        assert_eq!(timeline.categories.color_of("Blood Test"), Some("#636EFA"));
        assert_eq!(timeline.categories.color_of("Supplement"), Some("#00CC96"));

        let blood: Vec<&str> = timeline
            .categories
            .get("Blood Test")
            .unwrap()
            .iter()
            .map(|event| event.description.as_str())
            .collect();
        assert_eq!(blood, vec!["Initial blood panel", "Advanced lipid panel"]);
    }

    #[test]
    fn invalid_dates_are_skipped_and_reported() {
        let records = vec![
            intervention(1, "2025-01-15", "Blood Test", "A"),
            intervention(7, "sometime in May", "IV Therapy", "B"),
            intervention(9, "", "Diet", "C"),
        ];
        let timeline = aggregate(&records);

        assert_eq!(timeline.diagnostics.total, 3);
        assert_eq!(timeline.diagnostics.accepted, 1);
        let skipped: Vec<(i64, &str)> = timeline
            .diagnostics
            .skipped
            .iter()
            .map(|record| (record.record_id, record.raw_date.as_str()))
            .collect();
        assert_eq!(skipped, vec![(7, "sometime in May"), (9, "")]);
        assert!(timeline.categories.get("IV Therapy").is_none());
    }

    #[test]
    fn two_digit_years_in_dash_dates_are_skipped() {
        let records = vec![
            intervention(1, "15-01-25", "Blood Test", "A"),
            intervention(2, "25-12-31", "Diet", "B"),
            intervention(3, "15-01-2025", "Blood Test", "C"),
        ];
        let timeline = aggregate(&records);

        assert_eq!(timeline.diagnostics.accepted, 1);
        let skipped: Vec<&str> = timeline
            .diagnostics
            .skipped
            .iter()
            .map(|record| record.raw_date.as_str())
            .collect();
        assert_eq!(skipped, vec!["15-01-25", "25-12-31"]);
        assert_eq!(
            timeline.categories.get("Blood Test").unwrap()[0].date,
            ymd(2025, 1, 15)
        );
        assert!(timeline.categories.get("Diet").is_none());
    }

    #[test]
    fn empty_input_gives_empty_chart() {
        let timeline = aggregate(&[]);
        let chart = timeline.chart().unwrap();

        assert!(timeline.categories.is_empty());
        assert!(chart.series.is_empty());
        assert!(chart.is_empty());
    }

    #[test]
    fn all_invalid_input_gives_empty_chart_with_full_diagnostics() {
        let records = vec![
            intervention(1, "n/a", "Blood Test", "A"),
            intervention(2, "31-31-2025", "Diet", "B"),
        ];
        let timeline = aggregate(&records);

        assert!(timeline.categories.is_empty());
        assert!(timeline.chart().unwrap().series.is_empty());
        assert_eq!(timeline.diagnostics.excluded(), 2);
    }

    #[test]
    fn chart_series_carry_labels_text_and_hover() {
        let records = vec![
            intervention(1, "2025-01-15", "Blood Test", "Initial blood panel"),
            intervention(2, "2025-01-20", "Physical", "Initial physio assessment"),
        ];
        let chart = aggregate(&records).chart().unwrap();

        assert_eq!(chart.series.len(), 2);
        let blood = &chart.series[0];
        assert_eq!(blood.name, "Blood Test");
        assert_eq!(blood.x, vec!["2025-01-15"]);
        assert_eq!(blood.y, Values::Labels(vec!["Blood Test".to_string()]));
        assert_eq!(blood.text, vec!["Initial blood panel"]);
        assert_eq!(
            blood.hover,
            vec!["Jan 15, 2025, Blood Test, Initial blood panel"]
        );
        assert_eq!(blood.color, "#636EFA");
        assert_eq!(chart.series[1].color, "#EF553B");
    }

    #[test]
    fn colors_cycle_after_six_categories() {
        let records: Vec<Intervention> = (1..=7)
            .map(|day| {
                intervention(
                    day,
                    &format!("2025-03-{:02}", day),
                    &format!("Category {day}"),
                    "event",
                )
            })
            .collect();
        let timeline = aggregate(&records);

        assert_eq!(timeline.categories.color_of("Category 7"), Some("#636EFA"));
    }

    fn raw_date() -> impl Strategy<Value = String> {
        prop_oneof![
            (1u32..=12, 1u32..=28).prop_map(|(m, d)| format!("{:02}/{:02}/25", m, d)),
            (1u32..=12, 1u32..=28).prop_map(|(m, d)| format!("2025-{:02}-{:02}", m, d)),
            (1u32..=12, 1u32..=28).prop_map(|(m, d)| format!("{:02}-{:02}-2025", d, m)),
            "[a-z]{1,8}",
        ]
    }

    proptest! {
        #[test]
        fn aggregation_conserves_sorts_and_repeats(
            rows in proptest::collection::vec(
                (raw_date(), prop_oneof![Just("Blood Test"), Just("Diet"), Just("Cardio")]),
                0..40,
            )
        ) {
            let records: Vec<Intervention> = rows
                .iter()
                .enumerate()
                .map(|(i, (date, category))| intervention(i as i64, date, category, &i.to_string()))
                .collect();

            let first = aggregate(&records);
            let second = aggregate(&records);
            prop_assert_eq!(&first, &second);
            prop_assert_eq!(first.chart().unwrap(), second.chart().unwrap());

            let diagnostics = &first.diagnostics;
            prop_assert_eq!(diagnostics.accepted + diagnostics.excluded(), records.len());
            prop_assert_eq!(first.categories.event_count(), diagnostics.accepted);

            for (_, events) in first.categories.iter() {
                prop_assert!(!events.is_empty());
                for pair in events.windows(2) {
                    prop_assert!(pair[0].date <= pair[1].date);
                    if pair[0].date == pair[1].date {
                        let a: usize = pair[0].description.parse().unwrap();
                        let b: usize = pair[1].description.parse().unwrap();
                        prop_assert!(a < b);
                    }
                }
            }
        }
    }
}
