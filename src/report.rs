use std::fmt::Write;

use crate::dates::NormalizedDate;
use crate::models::{
    CommunicationRecord, Diagnostics, Intervention, MemberProfile, PersonaMetric, StaffMetric,
};
use crate::rollup::StaffRollup;
use crate::timeline::Timeline;

pub struct JourneyReport<'a> {
    pub member_id: i64,
    /// Date ages are computed against.
    pub as_of: NormalizedDate,
    pub profile: Option<&'a MemberProfile>,
    pub interventions: &'a [Intervention],
    pub timeline: &'a Timeline,
    pub staff: &'a StaffRollup,
    pub staff_metrics: &'a [StaffMetric],
    pub persona: &'a [PersonaMetric],
    pub communications: &'a [CommunicationRecord],
}

pub fn build_report(report: &JourneyReport<'_>) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Member Journey Report");
    let _ = writeln!(output, "Generated for member {}", report.member_id);
    let _ = writeln!(output);
    write_profile(&mut output, report.profile, report.as_of);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Journey Timeline");

    if report.timeline.categories.is_empty() {
        let _ = writeln!(output, "No interventions recorded for this member.");
    } else {
        for (category, events) in report.timeline.categories.iter() {
            let _ = writeln!(output, "### {} ({} events)", category, events.len());
            for event in events {
                let _ = writeln!(output, "- {}: {}", event.date, event.description);
            }
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Intervention Details");

    if report.interventions.is_empty() {
        let _ = writeln!(output, "No interventions recorded for this member.");
    } else {
        for intervention in report.interventions {
            let _ = writeln!(
                output,
                "- {}: {} - {} ({})",
                intervention.date,
                intervention.intervention_type,
                intervention.category,
                intervention.description
            );
            let _ = writeln!(output, "  - Reason: {}", intervention.reason);
            let _ = writeln!(
                output,
                "  - Outcome: {}",
                intervention.outcome.as_deref().unwrap_or("not yet recorded")
            );
            if let Some(staff) = &intervention.staff_member {
                match intervention.duration_minutes {
                    Some(minutes) => {
                        let _ = writeln!(output, "  - Performed by {} ({} min)", staff, minutes);
                    }
                    None => {
                        let _ = writeln!(output, "  - Performed by {}", staff);
                    }
                }
            }
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Staff Hours by Month");

    let pivot = report.staff.hours.pivot();
    if pivot.series.is_empty() {
        let _ = writeln!(output, "No staff activity recorded.");
    } else {
        let _ = write!(output, "| Staff |");
        for month in &pivot.months {
            let _ = write!(output, " {} |", month);
        }
        let _ = writeln!(output);
        let _ = writeln!(output, "|---|{}", "---|".repeat(pivot.months.len()));
        for (staff, hours) in &pivot.series {
            let _ = write!(output, "| {} |", staff);
            for value in hours {
                let _ = write!(output, " {:.2} |", value);
            }
            let _ = writeln!(output);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Staff Workload");

    if report.staff_metrics.is_empty() {
        let _ = writeln!(output, "No staff activity recorded.");
    } else {
        for metric in report.staff_metrics {
            let breakdown: Vec<String> = metric
                .activities
                .iter()
                .map(|(activity, count)| format!("{activity} {count}"))
                .collect();
            let _ = writeln!(
                output,
                "- {} ({}): {:.1} hours across {} activities ({})",
                metric.staff_name,
                metric.role,
                metric.total_minutes as f64 / 60.0,
                metric.activity_count,
                breakdown.join(", ")
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Member Persona (placeholder scores)");

    if report.persona.is_empty() {
        let _ = writeln!(output, "No persona metrics available.");
    } else {
        for metric in report.persona {
            let _ = writeln!(output, "- {}: {}", metric.name, metric.value);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Communications");

    if report.communications.is_empty() {
        let _ = writeln!(output, "No communications recorded for this member.");
    } else {
        for message in report.communications {
            let _ = writeln!(
                output,
                "- {} {} ({}): {}",
                message.date, message.sender, message.category, message.message
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Skipped Records");
    write_skipped(&mut output, "intervention", &report.timeline.diagnostics);
    write_skipped(&mut output, "staff activity", &report.staff.diagnostics);
    if report.staff.unattributed > 0 {
        let _ = writeln!(
            output,
            "- staff activity: {} records had no staff name and were left out of hours",
            report.staff.unattributed
        );
    }

    output
}

fn write_profile(output: &mut String, profile: Option<&MemberProfile>, as_of: NormalizedDate) {
    let _ = writeln!(output, "## Member Profile");

    let Some(profile) = profile else {
        let _ = writeln!(output, "No profile information available.");
        return;
    };

    let unknown = "not recorded";
    let dob = profile.dob.as_deref().unwrap_or(unknown);
    match profile.age_on(as_of) {
        Some(age) => {
            let _ = writeln!(output, "- Date of birth: {} (age {})", dob, age);
        }
        None => {
            let _ = writeln!(output, "- Date of birth: {}", dob);
        }
    }
    let _ = writeln!(output, "- Gender: {}", profile.gender.as_deref().unwrap_or(unknown));
    let _ = writeln!(output, "- Location: {}", profile.location.as_deref().unwrap_or(unknown));
    let _ = writeln!(
        output,
        "- Occupation: {}",
        profile.occupation.as_deref().unwrap_or(unknown)
    );
    let _ = writeln!(
        output,
        "- Chronic condition: {}",
        profile.chronic_condition.as_deref().unwrap_or("none recorded")
    );
    if profile.health_goals.is_empty() {
        let _ = writeln!(output, "- Health goals: none recorded");
    } else {
        let _ = writeln!(output, "- Health goals:");
        for goal in &profile.health_goals {
            let _ = writeln!(output, "  - {}", goal);
        }
    }
}

fn write_skipped(output: &mut String, label: &str, diagnostics: &Diagnostics) {
    if diagnostics.skipped.is_empty() {
        let _ = writeln!(
            output,
            "- {}: all {} records had valid dates",
            label, diagnostics.total
        );
        return;
    }

    let _ = writeln!(
        output,
        "- {}: skipped {} of {} records",
        label,
        diagnostics.excluded(),
        diagnostics.total
    );
    for skipped in &diagnostics.skipped {
        let _ = writeln!(
            output,
            "  - record {} with date {:?}",
            skipped.record_id, skipped.raw_date
        );
    }
}
