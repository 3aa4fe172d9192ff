use chrono::{DateTime, Utc};
use common::Severity;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnomalyType {
    AtypicalDensityIncrease,
    UnexpectedSpatialConcentration,
    MinorDeviation,
}

impl AnomalyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnomalyType::AtypicalDensityIncrease => "ATYPICAL_DENSITY_INCREASE",
            AnomalyType::UnexpectedSpatialConcentration => "UNEXPECTED_SPATIAL_CONCENTRATION",
            AnomalyType::MinorDeviation => "MINOR_DEVIATION",
        }
    }
}

impl std::fmt::Display for AnomalyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AnomalyType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "ATYPICAL_DENSITY_INCREASE" => Ok(AnomalyType::AtypicalDensityIncrease),
            "UNEXPECTED_SPATIAL_CONCENTRATION" => Ok(AnomalyType::UnexpectedSpatialConcentration),
            "MINOR_DEVIATION" => Ok(AnomalyType::MinorDeviation),
            _ => Err(format!("Invalid anomaly type: {}", s)),
        }
    }
}

/// Anomaly category reported for a severity
pub fn anomaly_type_for(severity: Severity) -> AnomalyType {
    match severity {
        Severity::High => AnomalyType::AtypicalDensityIncrease,
        Severity::Medium => AnomalyType::UnexpectedSpatialConcentration,
        Severity::Low => AnomalyType::MinorDeviation,
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertStatus {
    #[default]
    Active,
    Expired,
}

impl std::fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertStatus::Active => write!(f, "ACTIVE"),
            AlertStatus::Expired => write!(f, "EXPIRED"),
        }
    }
}

/// Operator-facing alert raised for a MEDIUM or HIGH anomaly.
///
/// Flat on purpose so a row of `alerts.csv` maps onto it one to one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Alert {
    pub alert_id: String,
    pub anomaly_type: AnomalyType,
    pub severity: Severity,
    pub zone: String,
    #[serde(with = "common::timefmt")]
    pub created_at: DateTime<Utc>,
    pub person_count: u32,
    pub baseline_density: f64,
    pub message: String,
    pub operator_note: String,
    #[serde(with = "common::timefmt")]
    pub expiry: DateTime<Utc>,
    /// Status when the record was last materialized; see [`Alert::status_at`]
    pub status: AlertStatus,
}

impl Alert {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expiry
    }

    pub fn status_at(&self, now: DateTime<Utc>) -> AlertStatus {
        if self.is_expired(now) {
            AlertStatus::Expired
        } else {
            AlertStatus::Active
        }
    }

    /// Copy of the alert with `status` brought up to date
    pub fn materialized_at(&self, now: DateTime<Utc>) -> Self {
        Self {
            status: self.status_at(now),
            ..self.clone()
        }
    }
}

/// Per-frame inputs an alert is built from besides the anomaly itself
#[derive(Debug, Clone, PartialEq)]
pub struct AlertContext {
    pub zone: String,
    pub person_count: u32,
    /// Calibrated mean density of the zone
    pub baseline_density: f64,
    /// Calibrated mean person count of the zone
    pub baseline_people: f64,
}
