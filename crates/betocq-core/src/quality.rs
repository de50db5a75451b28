//! Per-attempt connection quality record

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::INVALID_INT;
use crate::medium::ConnectionMedium;

/// Milestones of one connection attempt, filled in as phases complete.
///
/// A `None` latency means the attempt never reached that milestone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetupQualityInfo {
    pub discovery_latency: Option<Duration>,
    pub connection_latency: Option<Duration>,
    pub medium_upgrade_latency: Option<Duration>,
    pub medium_upgrade_expected: bool,
    /// Medium the connection ended up on after the bandwidth upgrade
    pub upgrade_medium: Option<ConnectionMedium>,
    /// Operating frequency of the negotiated P2P medium, or -1
    pub medium_frequency: i64,
}

impl Default for SetupQualityInfo {
    fn default() -> Self {
        Self {
            discovery_latency: None,
            connection_latency: None,
            medium_upgrade_latency: None,
            medium_upgrade_expected: false,
            upgrade_medium: None,
            medium_frequency: INVALID_INT,
        }
    }
}

impl SetupQualityInfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report name of the negotiated medium, `na` when none
    pub fn medium_name(&self) -> &'static str {
        self.upgrade_medium.map(|m| m.name()).unwrap_or("na")
    }

    /// Compact `key: value` summary used in logs
    pub fn summary(&self) -> Vec<(String, String)> {
        let mut out = vec![
            ("discovery".to_string(), format_latency(self.discovery_latency)),
            ("connection".to_string(), format_latency(self.connection_latency)),
        ];
        if self.medium_upgrade_expected {
            out.push(("upgrade".to_string(), format_latency(self.medium_upgrade_latency)));
        }
        if let Some(medium) = self.upgrade_medium {
            out.push(("medium".to_string(), medium.name().to_string()));
        }
        out
    }
}

/// Seconds rounded to one decimal
pub fn latency_secs(latency: Duration) -> f64 {
    (latency.as_secs_f64() * 10.0).round() / 10.0
}

pub(crate) fn format_latency(latency: Option<Duration>) -> String {
    match latency {
        Some(l) => format!("{}s", latency_secs(l)),
        None => "na".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_empty() {
        let info = SetupQualityInfo::new();
        assert!(info.discovery_latency.is_none());
        assert_eq!(info.medium_frequency, -1);
        assert_eq!(info.medium_name(), "na");
        assert_eq!(info.summary().len(), 2);
    }

    #[test]
    fn test_summary_includes_upgrade() {
        let info = SetupQualityInfo {
            discovery_latency: Some(Duration::from_millis(2_340)),
            connection_latency: Some(Duration::from_millis(1_050)),
            medium_upgrade_latency: Some(Duration::from_millis(3_960)),
            medium_upgrade_expected: true,
            upgrade_medium: Some(ConnectionMedium::WifiDirect),
            medium_frequency: 5180,
        };
        let summary = info.summary();
        assert_eq!(summary[0].1, "2.3s");
        assert_eq!(summary[2], ("upgrade".to_string(), "4s".to_string()));
        assert_eq!(summary[3].1, "WIFI_DIRECT");
    }
}
