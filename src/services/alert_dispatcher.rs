use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::error::AppResult;
use crate::models::anomaly::{Anomaly, AnomalyType, Severity};
use crate::services::anomaly_service::AnomalyService;
use crate::services::employee_service::EmployeeService;
use crate::services::notification_service::NotificationService;
use crate::services::settings_service::SettingsService;

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AlertRunSummary {
    pub total: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    /// Admins the summary reached.
    pub notified: usize,
    pub failed: usize,
    /// Alerts are switched off in settings; nothing was checked.
    pub skipped: bool,
}

/// Periodic anomaly check that pushes a summary to admins.
pub struct AlertDispatcher {
    settings: Arc<SettingsService>,
    anomalies: Arc<AnomalyService>,
    employees: Arc<EmployeeService>,
    notifications: Arc<NotificationService>,
}

impl AlertDispatcher {
    pub fn new(
        settings: Arc<SettingsService>,
        anomalies: Arc<AnomalyService>,
        employees: Arc<EmployeeService>,
        notifications: Arc<NotificationService>,
    ) -> Self {
        Self {
            settings,
            anomalies,
            employees,
            notifications,
        }
    }

    pub async fn run(&self) -> AppResult<AlertRunSummary> {
        if !self.settings.get().enable_alerts {
            info!(target: "app::notify", "alerts disabled, skipping anomaly check");
            return Ok(AlertRunSummary {
                skipped: true,
                ..AlertRunSummary::default()
            });
        }

        let anomalies = self.anomalies.check_today()?;
        let count = |severity: Severity| anomalies.iter().filter(|a| a.severity == severity).count();
        let mut summary = AlertRunSummary {
            total: anomalies.len(),
            high: count(Severity::High),
            medium: count(Severity::Medium),
            low: count(Severity::Low),
            ..AlertRunSummary::default()
        };

        // High first, then medium; low findings are logged but never pushed.
        let notifiable: Vec<&Anomaly> = anomalies
            .iter()
            .filter(|a| a.severity == Severity::High)
            .chain(anomalies.iter().filter(|a| a.severity == Severity::Medium))
            .collect();
        if notifiable.is_empty() {
            info!(target: "app::notify", total = summary.total, "no notifiable anomalies");
            return Ok(summary);
        }

        let admins: Vec<String> = self
            .employees
            .list_active_admins()?
            .into_iter()
            .map(|admin| admin.user_id)
            .collect();
        if admins.is_empty() {
            info!(target: "app::notify", "anomalies recorded but no admin to notify");
            return Ok(summary);
        }

        let outcome = self
            .notifications
            .broadcast(&admins, &alert_message(&notifiable))
            .await;
        summary.notified = outcome.sent;
        summary.failed = outcome.failed;

        info!(
            target: "app::notify",
            total = summary.total,
            notified = summary.notified,
            failed = summary.failed,
            "anomaly alerts dispatched"
        );
        Ok(summary)
    }
}

/// Plain-text summary, grouped by anomaly type in first-seen order.
pub fn alert_message(anomalies: &[&Anomaly]) -> String {
    let mut groups: Vec<(AnomalyType, Vec<&Anomaly>)> = Vec::new();
    for &anomaly in anomalies {
        match groups.iter_mut().find(|(kind, _)| *kind == anomaly.anomaly_type) {
            Some((_, items)) => items.push(anomaly),
            None => groups.push((anomaly.anomaly_type, vec![anomaly])),
        }
    }

    let mut lines = vec![format!("🚨 異常打卡警報：發現 {} 個異常", anomalies.len())];
    for (kind, items) in groups {
        lines.push(format!("【{}】", kind.label()));
        for item in items {
            let level = if item.severity == Severity::High { "高" } else { "中" };
            lines.push(format!("・{}：{}（{}）", item.employee_name, item.message, level));
        }
    }
    lines.join("\n")
}
