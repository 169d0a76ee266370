use anyhow::Context;
use sqlx::{PgPool, Row};

use crate::models::{CommunicationRecord, Intervention, MemberProfile, StaffActivityRecord};
use crate::source;

// Dates are stored as free text and read back untouched; normalization
// happens in the aggregation pipeline.

pub async fn fetch_interventions(pool: &PgPool, member_id: i64) -> anyhow::Result<Vec<Intervention>> {
    let rows = sqlx::query(
        r#"
        SELECT id, member_id, date, type, category, description, reason,
               outcome, staff_member, duration_minutes
        FROM member_journey.interventions
        WHERE member_id = $1
        ORDER BY id
        "#,
    )
    .bind(member_id)
    .fetch_all(pool)
    .await?;

    let mut interventions = Vec::with_capacity(rows.len());
    for row in rows {
        let id: i64 = row.get("id");
        let duration: Option<i32> = row.get("duration_minutes");
        interventions.push(Intervention {
            id,
            member_id: row.get("member_id"),
            date: row.get("date"),
            intervention_type: row.get("type"),
            category: row.get("category"),
            description: row.get("description"),
            reason: row.get("reason"),
            outcome: row.get("outcome"),
            staff_member: row.get("staff_member"),
            duration_minutes: duration
                .map(u32::try_from)
                .transpose()
                .with_context(|| format!("intervention {id} has a negative duration"))?,
        });
    }

    Ok(interventions)
}

pub async fn fetch_staff_activity(pool: &PgPool) -> anyhow::Result<Vec<StaffActivityRecord>> {
    let rows = sqlx::query(
        r#"
        SELECT id, staff_name, role, date, activity_type, duration_minutes, member_id
        FROM member_journey.staff_activity
        ORDER BY id
        "#,
    )
    .fetch_all(pool)
    .await?;

    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        let id: i64 = row.get("id");
        let duration: i32 = row.get("duration_minutes");
        records.push(StaffActivityRecord {
            id,
            staff_name: row.get("staff_name"),
            role: row.get("role"),
            date: row.get("date"),
            activity_type: row.get("activity_type"),
            duration_minutes: u32::try_from(duration)
                .with_context(|| format!("staff activity {id} has a negative duration"))?,
            member_id: row.get("member_id"),
        });
    }

    Ok(records)
}

pub async fn fetch_member_profile(
    pool: &PgPool,
    member_id: i64,
) -> anyhow::Result<Option<MemberProfile>> {
    let row = sqlx::query(
        r#"
        SELECT member_id, dob, gender, location, occupation, health_goals, chronic_condition
        FROM member_journey.member_profiles
        WHERE member_id = $1
        "#,
    )
    .bind(member_id)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };
    let health_goals: Option<String> = row.get("health_goals");

    Ok(Some(MemberProfile {
        member_id: row.get("member_id"),
        dob: row.get("dob"),
        gender: row.get("gender"),
        location: row.get("location"),
        occupation: row.get("occupation"),
        health_goals: source::parse_health_goals(health_goals.as_deref())
            .with_context(|| format!("member {member_id} has malformed health goals"))?,
        chronic_condition: row.get("chronic_condition"),
    }))
}

/// All communications for a member; ordering and limiting happen in
/// `source::most_recent`, since raw date text does not sort chronologically.
pub async fn fetch_communications(
    pool: &PgPool,
    member_id: i64,
) -> anyhow::Result<Vec<CommunicationRecord>> {
    let rows = sqlx::query(
        r#"
        SELECT id, member_id, date, sender, message, category
        FROM member_journey.communications
        WHERE member_id = $1
        ORDER BY id
        "#,
    )
    .bind(member_id)
    .fetch_all(pool)
    .await?;

    let mut communications = Vec::with_capacity(rows.len());
    for row in rows {
        communications.push(CommunicationRecord {
            id: row.get("id"),
            member_id: row.get("member_id"),
            date: row.get("date"),
            sender: row.get("sender"),
            message: row.get("message"),
            category: row.get("category"),
        });
    }

    Ok(communications)
}
