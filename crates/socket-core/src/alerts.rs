//! Security alert records from the batch purl endpoint, and the
//! blocking/non-blocking classification used by the shadow wrapper.

use serde_json::Value;

/// What the organization's policy says to do about an alert.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AlertAction {
    Error,
    Warn,
    Monitor,
    Ignore,
}

impl AlertAction {
    fn parse(s: &str) -> Option<AlertAction> {
        match s {
            "error" => Some(AlertAction::Error),
            "warn" => Some(AlertAction::Warn),
            "monitor" => Some(AlertAction::Monitor),
            "ignore" => Some(AlertAction::Ignore),
            _ => None,
        }
    }
}

/// One alert on one package version.
#[derive(Clone, Debug)]
pub struct PackageAlert {
    pub key: String,
    pub kind: String,
    pub severity: String,
    pub action: AlertAction,
}

impl PackageAlert {
    pub fn is_blocking(&self) -> bool {
        self.action == AlertAction::Error
    }
}

/// Alerts for a single purl.
#[derive(Clone, Debug)]
pub struct PackageReport {
    pub purl: String,
    pub alerts: Vec<PackageAlert>,
}

impl PackageReport {
    pub fn blocking_alerts(&self) -> impl Iterator<Item = &PackageAlert> {
        self.alerts.iter().filter(|a| a.is_blocking())
    }
}

/// Lenient parse of API rows; rows or alerts with no usable fields are
/// dropped rather than failing the whole lookup.
pub fn parse_alert_rows(rows: &[Value]) -> Vec<PackageReport> {
    let mut reports = Vec::new();
    for row in rows {
        let purl = row
            .get("purl")
            .and_then(|p| p.as_str())
            .map(String::from)
            .or_else(|| {
                let name = row.get("name").and_then(|n| n.as_str())?;
                let version = row.get("version").and_then(|v| v.as_str())?;
                Some(crate::purl::npm_purl(name, version))
            });
        let Some(purl) = purl else { continue };
        let mut alerts = Vec::new();
        if let Some(raw_alerts) = row.get("alerts").and_then(|a| a.as_array()) {
            for raw in raw_alerts {
                let kind = raw
                    .get("type")
                    .and_then(|t| t.as_str())
                    .unwrap_or("unknown")
                    .to_string();
                let severity = raw
                    .get("severity")
                    .and_then(|s| s.as_str())
                    .unwrap_or("unknown")
                    .to_string();
                let action = raw
                    .get("action")
                    .and_then(|a| a.as_str())
                    .and_then(AlertAction::parse)
                    .unwrap_or(match severity.as_str() {
                        // No policy action on the row: block on the worst severities.
                        "critical" | "high" => AlertAction::Error,
                        _ => AlertAction::Warn,
                    });
                alerts.push(PackageAlert {
                    key: raw
                        .get("key")
                        .and_then(|k| k.as_str())
                        .unwrap_or("")
                        .to_string(),
                    kind,
                    severity,
                    action,
                });
            }
        }
        reports.push(PackageReport { purl, alerts });
    }
    reports
}

pub fn has_blocking(reports: &[PackageReport]) -> bool {
    reports.iter().any(|r| r.blocking_alerts().next().is_some())
}

/// Human-readable risk report. With `view_all`, non-blocking alerts are
/// listed too; otherwise only the blocking ones.
pub fn render_report(reports: &[PackageReport], view_all: bool) -> String {
    let mut shown_packages = 0usize;
    let mut lines: Vec<String> = Vec::new();
    for report in reports {
        let shown: Vec<&PackageAlert> = report
            .alerts
            .iter()
            .filter(|a| view_all || a.is_blocking())
            .collect();
        if shown.is_empty() {
            continue;
        }
        shown_packages += 1;
        lines.push(format!("  {}", report.purl));
        for alert in shown {
            let marker = if alert.is_blocking() { "blocked" } else { "notice" };
            lines.push(format!(
                "    [{}] {} ({}){}",
                marker,
                alert.kind,
                alert.severity,
                if alert.key.is_empty() {
                    String::new()
                } else {
                    format!(" {}", alert.key)
                }
            ));
        }
    }
    if lines.is_empty() {
        return "No risks found.\n".to_string();
    }
    let mut out = format!("Socket found risks in {} package(s):\n", shown_packages);
    out.push_str(&lines.join("\n"));
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(purl: &str, alerts: Value) -> Value {
        json!({ "purl": purl, "alerts": alerts })
    }

    #[test]
    fn action_drives_blocking() {
        let rows = vec![row(
            "pkg:npm/evil@1.0.0",
            json!([{ "key": "a1", "type": "malware", "severity": "low", "action": "error" }]),
        )];
        let reports = parse_alert_rows(&rows);
        assert!(has_blocking(&reports));
    }

    #[test]
    fn severity_fallback_when_action_missing() {
        let rows = vec![
            row(
                "pkg:npm/risky@2.0.0",
                json!([{ "key": "b1", "type": "installScripts", "severity": "critical" }]),
            ),
            row(
                "pkg:npm/fine@1.0.0",
                json!([{ "key": "c1", "type": "unmaintained", "severity": "low" }]),
            ),
        ];
        let reports = parse_alert_rows(&rows);
        assert!(reports[0].alerts[0].is_blocking());
        assert!(!reports[1].alerts[0].is_blocking());
    }

    #[test]
    fn report_hides_non_blocking_unless_view_all() {
        let rows = vec![row(
            "pkg:npm/mixed@1.0.0",
            json!([
                { "key": "a", "type": "malware", "severity": "critical", "action": "error" },
                { "key": "b", "type": "unmaintained", "severity": "low", "action": "warn" }
            ]),
        )];
        let reports = parse_alert_rows(&rows);
        let short = render_report(&reports, false);
        assert!(short.contains("malware"));
        assert!(!short.contains("unmaintained"));
        let full = render_report(&reports, true);
        assert!(full.contains("unmaintained"));
    }

    #[test]
    fn rows_without_purl_use_name_and_version() {
        let rows = vec![json!({
            "name": "@scope/pkg",
            "version": "1.0.0",
            "alerts": []
        })];
        let reports = parse_alert_rows(&rows);
        assert_eq!(reports[0].purl, "pkg:npm/%40scope/pkg@1.0.0");
    }
}
