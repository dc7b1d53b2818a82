//! Boundary normalization for deal snapshots.
//!
//! The persistence layer hands the engine loosely typed JSON records. This
//! module turns them into typed [`Deal`] values up front: structural problems
//! (a non-array payload, an unparsable timestamp) are rejected with a
//! [`ValidationError`], while per-record gaps such as a missing stage or a null
//! value are normalized to safe defaults so one bad record cannot block the
//! dashboard.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use tracing::debug;

use crate::analytics::Recommendation;
use crate::domain::deal::{
    clamp_probability, Deal, DealId, DealStatus, FollowUp, FollowUpStatus, Proposal,
    ProposalStatus, Stage, StageCategory,
};
use crate::errors::ValidationError;

/// A snapshot document: either a bare deal array or an envelope that carries
/// the reference time and per-call options next to the deals.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotEnvelope {
    pub now: Option<String>,
    pub lookback_days: Option<u32>,
    pub deals: Value,
    pub recommendations: Option<Vec<Recommendation>>,
}

pub fn parse_envelope(document: &Value) -> Result<SnapshotEnvelope, ValidationError> {
    let fields = match document {
        Value::Array(_) => {
            return Ok(SnapshotEnvelope {
                now: None,
                lookback_days: None,
                deals: document.clone(),
                recommendations: None,
            })
        }
        Value::Object(fields) => fields,
        _ => return Err(ValidationError::DealsNotAList),
    };

    let now = match fields.get("now") {
        None | Some(Value::Null) => None,
        Some(Value::String(raw)) => Some(raw.clone()),
        Some(other) => {
            return Err(ValidationError::InvalidReferenceTime { value: other.to_string() })
        }
    };

    let lookback_days = match fields.get("lookbackDays") {
        None | Some(Value::Null) => None,
        Some(value) => Some(
            value.as_u64().and_then(|days| u32::try_from(days).ok()).ok_or_else(|| {
                ValidationError::MalformedEnvelope {
                    message: format!("lookbackDays must be a whole number of days, found {value}"),
                }
            })?,
        ),
    };

    let recommendations = match fields.get("recommendations") {
        None | Some(Value::Null) => None,
        Some(value) => Some(serde_json::from_value::<Vec<Recommendation>>(value.clone()).map_err(
            |error| ValidationError::MalformedEnvelope {
                message: format!("recommendations: {error}"),
            },
        )?),
    };

    Ok(SnapshotEnvelope {
        now,
        lookback_days,
        deals: fields.get("deals").cloned().unwrap_or(Value::Null),
        recommendations,
    })
}

pub fn parse_reference_time(value: &str) -> Result<DateTime<Utc>, ValidationError> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|_| ValidationError::InvalidReferenceTime { value: value.to_string() })
}

pub fn normalize_deals(deals: &Value) -> Result<Vec<Deal>, ValidationError> {
    let records = deals.as_array().ok_or(ValidationError::DealsNotAList)?;
    records.iter().enumerate().map(|(index, record)| normalize_deal(index, record)).collect()
}

pub fn normalize_deal(index: usize, record: &Value) -> Result<Deal, ValidationError> {
    let fields = record.as_object().ok_or_else(|| ValidationError::MalformedDeal {
        index,
        message: format!("expected an object, found {}", json_kind(record)),
    })?;

    let id = fields
        .get("id")
        .and_then(scalar_string)
        .map(DealId)
        .unwrap_or_else(|| DealId(format!("deal-{index}")));

    let stage_id = fields.get("stageId").and_then(scalar_string);
    let stage = match fields.get("stage").and_then(Value::as_object) {
        Some(stage) => normalize_stage(stage, stage_id.as_deref()),
        None => {
            debug!(deal_id = %id, "deal has no stage snapshot; using unassigned stage");
            Stage { id: stage_id.clone().unwrap_or_default(), ..Stage::unassigned() }
        }
    };

    let status = match fields.get("status").and_then(Value::as_str).and_then(DealStatus::parse) {
        Some(status) => status,
        None => {
            let derived = match stage.status_category {
                StageCategory::Won => DealStatus::Won,
                StageCategory::Lost => DealStatus::Lost,
                StageCategory::Open => DealStatus::Open,
            };
            debug!(
                deal_id = %id,
                derived_status = derived.as_str(),
                "deal status missing or unknown; derived from stage category"
            );
            derived
        }
    };

    let pipeline_value = match fields.get("pipelineValue").and_then(decimal_value) {
        Some(value) if value.is_sign_negative() => {
            debug!(deal_id = %id, %value, "negative pipeline value clamped to zero");
            Decimal::ZERO
        }
        Some(value) => value,
        None => Decimal::ZERO,
    };

    let win_probability =
        fields.get("winProbability").and_then(decimal_value).map(clamp_probability);

    let follow_ups = list_field(fields, "followUps")
        .iter()
        .enumerate()
        .filter_map(|(position, item)| item.as_object().map(|item| (position, item)))
        .map(|(position, item)| normalize_follow_up(&id, position, item))
        .collect::<Result<Vec<_>, _>>()?;

    let proposals = list_field(fields, "proposals")
        .iter()
        .enumerate()
        .filter_map(|(position, item)| item.as_object().map(|item| (position, item)))
        .map(|(position, item)| normalize_proposal(&id, position, item))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Deal {
        created_at: timestamp_field(&id, fields, "createdAt")?,
        updated_at: timestamp_field(&id, fields, "updatedAt")?,
        last_contact_at: timestamp_field(&id, fields, "lastContactAt")?,
        next_follow_up_at: timestamp_field(&id, fields, "nextFollowUpAt")?,
        expected_close_date: timestamp_field(&id, fields, "expectedCloseDate")?,
        id,
        stage_id,
        stage,
        status,
        pipeline_value,
        win_probability,
        follow_ups,
        proposals,
    })
}

fn normalize_stage(stage: &Map<String, Value>, stage_id: Option<&str>) -> Stage {
    let id = stage
        .get("id")
        .and_then(scalar_string)
        .or_else(|| stage_id.map(str::to_string))
        .unwrap_or_default();
    let name = stage
        .get("name")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| "Unassigned".to_string());
    let win_probability =
        stage.get("winProbability").and_then(decimal_value).unwrap_or(Decimal::ZERO);
    let status_category = stage
        .get("statusCategory")
        .and_then(Value::as_str)
        .and_then(StageCategory::parse)
        .unwrap_or(StageCategory::Open);

    Stage::new(id, name, win_probability, status_category)
}

fn normalize_follow_up(
    deal_id: &DealId,
    position: usize,
    item: &Map<String, Value>,
) -> Result<FollowUp, ValidationError> {
    Ok(FollowUp {
        id: item
            .get("id")
            .and_then(scalar_string)
            .unwrap_or_else(|| format!("{deal_id}-follow-up-{position}")),
        due_at: timestamp_field(deal_id, item, "dueAt")?,
        status: item
            .get("status")
            .and_then(Value::as_str)
            .map(FollowUpStatus::parse)
            .unwrap_or(FollowUpStatus::Scheduled),
    })
}

fn normalize_proposal(
    deal_id: &DealId,
    position: usize,
    item: &Map<String, Value>,
) -> Result<Proposal, ValidationError> {
    Ok(Proposal {
        id: item
            .get("id")
            .and_then(scalar_string)
            .unwrap_or_else(|| format!("{deal_id}-proposal-{position}")),
        status: item
            .get("status")
            .and_then(Value::as_str)
            .map(ProposalStatus::parse)
            .unwrap_or(ProposalStatus::Draft),
        accepted_at: timestamp_field(deal_id, item, "acceptedAt")?,
    })
}

fn timestamp_field(
    deal_id: &DealId,
    fields: &Map<String, Value>,
    field: &'static str,
) -> Result<Option<DateTime<Utc>>, ValidationError> {
    match fields.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(raw)) if raw.trim().is_empty() => Ok(None),
        Some(Value::String(raw)) => parse_timestamp(raw).map(Some).ok_or_else(|| {
            ValidationError::InvalidTimestamp {
                deal_id: deal_id.0.clone(),
                field,
                value: raw.clone(),
            }
        }),
        Some(other) => Err(ValidationError::InvalidTimestamp {
            deal_id: deal_id.0.clone(),
            field,
            value: other.to_string(),
        }),
    }
}

/// RFC 3339 first, then the bare `YYYY-MM-DD` dates some stores emit for
/// date-only columns such as expected close dates.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn list_field<'a>(fields: &'a Map<String, Value>, key: &str) -> &'a [Value] {
    fields.get(key).and_then(Value::as_array).map(Vec::as_slice).unwrap_or(&[])
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn decimal_value(value: &Value) -> Option<Decimal> {
    let text = match value {
        Value::Number(number) => number.to_string(),
        Value::String(text) => text.trim().to_string(),
        _ => return None,
    };

    Decimal::from_str(&text).or_else(|_| Decimal::from_scientific(&text)).ok()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
