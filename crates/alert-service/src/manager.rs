use crate::store::AlertTimeline;
use crate::types::{anomaly_type_for, Alert, AlertContext, AlertStatus};
use chrono::{DateTime, Duration, Utc};
use common::Severity;
use crowd_analytics::AnomalyResult;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

const DEFAULT_TTL_MINUTES: i64 = 30;
/// Ten years
pub const MAX_TTL_MINUTES: i64 = 10 * 365 * 24 * 60;
const ALERT_ID_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AlertConfigError {
    #[error("alert TTL must be between 1 and {max} minutes (got {0})", max = MAX_TTL_MINUTES)]
    TtlOutOfRange(i64),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlertConfig {
    /// Minutes an alert stays ACTIVE after it is raised
    #[serde(default = "default_ttl_minutes")]
    pub ttl_minutes: i64,
}

fn default_ttl_minutes() -> i64 {
    DEFAULT_TTL_MINUTES
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            ttl_minutes: DEFAULT_TTL_MINUTES,
        }
    }
}

impl AlertConfig {
    pub fn validate(&self) -> Result<(), AlertConfigError> {
        if !(1..=MAX_TTL_MINUTES).contains(&self.ttl_minutes) {
            return Err(AlertConfigError::TtlOutOfRange(self.ttl_minutes));
        }
        Ok(())
    }
}

/// Raises alerts for actionable anomalies and records them on its timeline.
///
/// The timeline is the only record of issued ids; a new id is redrawn until
/// it is not already on it.
#[derive(Debug, Clone)]
pub struct AlertLifecycleManager {
    ttl: Duration,
    timeline: AlertTimeline,
}

impl AlertLifecycleManager {
    /// TTLs outside `1..=MAX_TTL_MINUTES` are clamped; use
    /// [`AlertConfig::validate`] to reject them up front.
    pub fn new(config: &AlertConfig) -> Self {
        Self {
            ttl: Duration::minutes(config.ttl_minutes.clamp(1, MAX_TTL_MINUTES)),
            timeline: AlertTimeline::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn timeline(&self) -> &AlertTimeline {
        &self.timeline
    }

    pub fn into_timeline(self) -> AlertTimeline {
        self.timeline
    }

    pub fn should_alert(severity: Severity) -> bool {
        severity != Severity::Low
    }

    pub fn generate(&mut self, anomaly: &AnomalyResult, ctx: &AlertContext) -> Option<Alert> {
        self.generate_at(anomaly, ctx, common::timefmt::now())
    }

    /// Same as [`generate`](Self::generate) with an explicit creation instant
    pub fn generate_at(
        &mut self,
        anomaly: &AnomalyResult,
        ctx: &AlertContext,
        now: DateTime<Utc>,
    ) -> Option<Alert> {
        if !Self::should_alert(anomaly.severity) {
            return None;
        }

        let anomaly_type = anomaly_type_for(anomaly.severity);
        let alert = Alert {
            alert_id: self.next_alert_id(),
            anomaly_type,
            severity: anomaly.severity,
            zone: ctx.zone.clone(),
            created_at: now,
            person_count: ctx.person_count,
            baseline_density: ctx.baseline_density,
            message: format!("{} detected in {}", anomaly_type, ctx.zone),
            operator_note: operator_note(anomaly.severity, ctx.person_count, ctx.baseline_people),
            expiry: now
                .checked_add_signed(self.ttl)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
            status: AlertStatus::Active,
        };

        if let Err(e) = self.timeline.push(alert.clone()) {
            tracing::warn!(error = %e, "Alert not recorded");
            return None;
        }

        tracing::info!(
            alert_id = %alert.alert_id,
            severity = %alert.severity,
            zone = %alert.zone,
            person_count = alert.person_count,
            z_score = anomaly.z_score,
            "Alert raised"
        );

        Some(alert)
    }

    /// Short random id, redrawn until it is not on the timeline
    fn next_alert_id(&self) -> String {
        loop {
            let candidate: String = Uuid::new_v4()
                .simple()
                .to_string()
                .chars()
                .take(ALERT_ID_LEN)
                .collect();
            if !self.timeline.contains(&candidate) {
                return candidate;
            }
        }
    }
}

impl Default for AlertLifecycleManager {
    fn default() -> Self {
        Self::new(&AlertConfig::default())
    }
}

pub fn is_expired(alert: &Alert, now: DateTime<Utc>) -> bool {
    alert.is_expired(now)
}

/// Guidance text for the operator, by severity
pub fn operator_note(severity: Severity, person_count: u32, baseline_people: f64) -> String {
    match severity {
        Severity::High => format!(
            "High density ({} people, baseline {}). Verify if event-related.",
            person_count,
            baseline_people.trunc() as i64
        ),
        Severity::Medium => "Moderate density increase. Check zone for unusual activity.".to_string(),
        Severity::Low => "Slight deviation from baseline.".to_string(),
    }
}
