//! One-line system health derived from a snapshot.

use std::fmt;

use tagwatch_types::{MonitoringSnapshot, TagId};

/// Overall health, most severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum StatusLevel {
    Paused,
    ManualFailure,
    Alerting,
    Normal,
}

impl StatusLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusLevel::Paused => "paused",
            StatusLevel::ManualFailure => "manual-failure",
            StatusLevel::Alerting => "alerting",
            StatusLevel::Normal => "normal",
        }
    }
}

impl fmt::Display for StatusLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSummary {
    pub level: StatusLevel,
    pub message: String,
    pub tag_count: usize,
    pub alert_messages: Vec<String>,
    /// Monitored tags with an open circuit, short circuit or force applied.
    pub manual_failures: Vec<TagId>,
}

impl StatusSummary {
    pub fn from_snapshot(snapshot: &MonitoringSnapshot) -> Self {
        let manual_failures: Vec<TagId> = snapshot
            .tags
            .values()
            .filter(|t| t.has_failure_override())
            .map(|t| t.id.clone())
            .collect();
        let alert_messages: Vec<String> = snapshot
            .alerts
            .iter()
            .filter(|a| a.triggered)
            .map(|a| a.rule.message.clone())
            .collect();

        let (level, message) = if snapshot.status.is_paused() {
            (StatusLevel::Paused, "Simulation paused or stopped".to_string())
        } else if !manual_failures.is_empty() {
            (
                StatusLevel::ManualFailure,
                format!(
                    "Manual failure injection applied to: {}",
                    manual_failures.join(", ")
                ),
            )
        } else if !alert_messages.is_empty() {
            (StatusLevel::Alerting, "Active alerts present".to_string())
        } else {
            (StatusLevel::Normal, "System running normally".to_string())
        };

        Self {
            level,
            message,
            tag_count: snapshot.len(),
            alert_messages,
            manual_failures,
        }
    }

    pub fn alert_count(&self) -> usize {
        self.alert_messages.len()
    }
}

impl fmt::Display for StatusSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} (tags: {}, alerts: {}, manual failures: {})",
            self.level,
            self.message,
            self.tag_count,
            self.alert_count(),
            self.manual_failures.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tagwatch_types::{AlertEvaluation, AlertRule, RunStatus, Tag, TagValue};

    fn alert(message: &str) -> AlertEvaluation {
        AlertEvaluation {
            rule: AlertRule::greater_than("level", 1.0, message),
            value: TagValue::Number(2.0),
            triggered: true,
        }
    }

    #[test]
    fn normal_when_nothing_is_wrong() {
        let snapshot = MonitoringSnapshot::builder()
            .tag(Tag::builder("level").float(0.5).build())
            .build();
        let summary = StatusSummary::from_snapshot(&snapshot);
        assert_eq!(summary.level, StatusLevel::Normal);
        assert_eq!(summary.message, "System running normally");
        assert_eq!(summary.tag_count, 1);
    }

    #[test]
    fn alerts_then_failures_then_pause() {
        let mut snapshot = MonitoringSnapshot::builder()
            .tag(Tag::builder("level").float(2.0).build())
            .alerts(vec![alert("too high")])
            .build();
        let summary = StatusSummary::from_snapshot(&snapshot);
        assert_eq!(summary.level, StatusLevel::Alerting);
        assert_eq!(summary.alert_messages, vec!["too high".to_string()]);

        snapshot
            .tags
            .insert("pump".into(), Tag::builder("pump").bit(false).short_circuit().build());
        let summary = StatusSummary::from_snapshot(&snapshot);
        assert_eq!(summary.level, StatusLevel::ManualFailure);
        assert_eq!(summary.message, "Manual failure injection applied to: pump");

        snapshot.status = RunStatus::Paused;
        let summary = StatusSummary::from_snapshot(&snapshot);
        assert_eq!(summary.level, StatusLevel::Paused);
        assert_eq!(summary.alert_count(), 1);
    }

    #[test]
    fn display_is_one_line() {
        let summary = StatusSummary::from_snapshot(&MonitoringSnapshot::default());
        assert_eq!(
            summary.to_string(),
            "[normal] System running normally (tags: 0, alerts: 0, manual failures: 0)"
        );
    }
}
