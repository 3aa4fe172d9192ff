use crate::types::{Alert, AlertStatus};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimelineError {
    #[error("alert {0} is already on the timeline")]
    DuplicateAlert(String),
}

/// Append-only record of every alert raised during a run.
///
/// Alerts are kept in insertion order and are never removed; expiry is
/// answered at query time against a caller-supplied instant.
#[derive(Debug, Clone, Default)]
pub struct AlertTimeline {
    alerts: Vec<Alert>,
    ids: HashSet<String>,
}

impl AlertTimeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, alert: Alert) -> Result<(), TimelineError> {
        if !self.ids.insert(alert.alert_id.clone()) {
            return Err(TimelineError::DuplicateAlert(alert.alert_id));
        }
        self.alerts.push(alert);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }

    pub fn contains(&self, alert_id: &str) -> bool {
        self.ids.contains(alert_id)
    }

    pub fn get(&self, alert_id: &str) -> Option<&Alert> {
        self.alerts.iter().find(|a| a.alert_id == alert_id)
    }

    /// Insertion order
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Alert> {
        self.alerts.iter()
    }

    /// Display order
    pub fn newest_first(&self) -> impl Iterator<Item = &Alert> {
        self.alerts.iter().rev()
    }

    pub fn active_at(&self, now: DateTime<Utc>) -> impl Iterator<Item = &Alert> {
        self.with_status(AlertStatus::Active, now)
    }

    pub fn expired_at(&self, now: DateTime<Utc>) -> impl Iterator<Item = &Alert> {
        self.with_status(AlertStatus::Expired, now)
    }

    fn with_status(&self, status: AlertStatus, now: DateTime<Utc>) -> impl Iterator<Item = &Alert> {
        self.alerts
            .iter()
            .filter(move |a| a.status_at(now) == status)
    }

    /// Every alert with its status as of `now`, insertion order
    pub fn materialized_at(&self, now: DateTime<Utc>) -> Vec<Alert> {
        self.alerts.iter().map(|a| a.materialized_at(now)).collect()
    }

    pub fn into_vec(self) -> Vec<Alert> {
        self.alerts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::AlertLifecycleManager;
    use crate::types::AlertContext;
    use chrono::{Duration, TimeZone};
    use common::Severity;
    use crowd_analytics::AnomalyResult;

    fn raise(manager: &mut AlertLifecycleManager, at: DateTime<Utc>, count: u32) -> Alert {
        let anomaly = AnomalyResult {
            z_score: 2.5,
            is_anomaly: true,
            severity: Severity::High,
            threshold: 1.0,
        };
        let ctx = AlertContext {
            zone: "Platform 2".to_string(),
            person_count: count,
            baseline_density: 0.5,
            baseline_people: 10.0,
        };
        manager.generate_at(&anomaly, &ctx, at).unwrap()
    }

    #[test]
    fn test_newest_first_and_duplicates() {
        let t0 = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let mut manager = AlertLifecycleManager::default();
        let mut timeline = AlertTimeline::new();

        let first = raise(&mut manager, t0, 20);
        let second = raise(&mut manager, t0 + Duration::seconds(1), 30);
        timeline.push(first.clone()).unwrap();
        timeline.push(second.clone()).unwrap();

        let order: Vec<_> = timeline.newest_first().map(|a| a.person_count).collect();
        assert_eq!(order, vec![30, 20]);

        assert_eq!(
            timeline.push(first.clone()),
            Err(TimelineError::DuplicateAlert(first.alert_id.clone()))
        );
        assert_eq!(timeline.len(), 2);
        assert_eq!(timeline.get(&second.alert_id), Some(&second));
        assert!(timeline.contains(&first.alert_id));
        assert!(!timeline.contains("00000000"));
    }

    #[test]
    fn test_active_and_expired_partition() {
        let t0 = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let mut manager = AlertLifecycleManager::default();
        let mut timeline = AlertTimeline::new();

        timeline.push(raise(&mut manager, t0, 11)).unwrap();
        timeline
            .push(raise(&mut manager, t0 + Duration::minutes(20), 12))
            .unwrap();

        let probe = t0 + Duration::minutes(30);
        let active: Vec<_> = timeline.active_at(probe).map(|a| a.person_count).collect();
        let expired: Vec<_> = timeline.expired_at(probe).map(|a| a.person_count).collect();
        assert_eq!(active, vec![12]);
        assert_eq!(expired, vec![11]);

        // expired alerts are never dropped
        assert_eq!(timeline.len(), 2);
        let snapshot = timeline.materialized_at(probe);
        assert_eq!(snapshot[0].status, AlertStatus::Expired);
        assert_eq!(snapshot[1].status, AlertStatus::Active);
    }
}
