use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::attendance::EventType;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum AnomalyType {
    Late,
    Early,
    Missing,
    Duplicate,
    Unusual,
}

impl AnomalyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnomalyType::Late => "late",
            AnomalyType::Early => "early",
            AnomalyType::Missing => "missing",
            AnomalyType::Duplicate => "duplicate",
            AnomalyType::Unusual => "unusual",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AnomalyType::Late => "遲到",
            AnomalyType::Early => "早退",
            AnomalyType::Missing => "未打卡",
            AnomalyType::Duplicate => "重複打卡",
            AnomalyType::Unusual => "非常規時間",
        }
    }
}

impl fmt::Display for AnomalyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for AnomalyType {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "late" => Ok(AnomalyType::Late),
            "early" => Ok(AnomalyType::Early),
            "missing" => Ok(AnomalyType::Missing),
            "duplicate" => Ok(AnomalyType::Duplicate),
            "unusual" => Ok(AnomalyType::Unusual),
            other => Err(format!("unsupported anomaly type: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }

    /// Only medium and high findings are pushed to admins.
    pub fn is_notifiable(&self) -> bool {
        matches!(self, Severity::Medium | Severity::High)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Severity {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            other => Err(format!("unsupported severity: {other}")),
        }
    }
}

/// Check-specific payload kept alongside the anomaly row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum AnomalyDetails {
    #[serde(rename_all = "camelCase")]
    Late {
        time: String,
        expected_time: String,
        minutes_late: i64,
    },
    #[serde(rename_all = "camelCase")]
    Early {
        time: String,
        expected_time: String,
        minutes_early: i64,
    },
    #[serde(rename_all = "camelCase")]
    Missing {
        expected_time: String,
        missing_type: String,
    },
    #[serde(rename_all = "camelCase")]
    Duplicate { count: usize, duplicate_type: String },
    #[serde(rename_all = "camelCase")]
    Unusual { time: String, record_type: EventType },
}

/// Result of a single check, before it is attributed to an employee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnomalyFinding {
    pub anomaly_type: AnomalyType,
    pub severity: Severity,
    pub message: String,
    pub details: AnomalyDetails,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Anomaly {
    #[serde(rename = "type")]
    pub anomaly_type: AnomalyType,
    pub severity: Severity,
    pub employee_id: String,
    pub employee_name: String,
    pub message: String,
    /// Wall-clock time of detection, distinct from `date`.
    pub detected_at: String,
    pub date: String,
    pub details: AnomalyDetails,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AnomalyRecord {
    pub id: i64,
    #[serde(flatten)]
    pub anomaly: Anomaly,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeAnomalyStats {
    pub count: i64,
    pub types: BTreeMap<String, i64>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AnomalyStats {
    pub total: i64,
    pub by_type: BTreeMap<String, i64>,
    pub by_severity: BTreeMap<String, i64>,
    pub by_employee: BTreeMap<String, EmployeeAnomalyStats>,
}
