//! Noteworthy facts pulled from scan reports.
//!
//! The registry is owned by the coordinator and handed to every host worker
//! as a cloned handle. It is append-only and keeps at most one finding per
//! (host, title).

use crate::policy::parser::{self, HiddenState};
use crate::types::HostId;
use serde::Serialize;
use std::sync::{Arc, Mutex};

/// A single reportable fact about a host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub host: HostId,
    pub title: String,
    /// The report line the finding was taken from.
    pub snippet: String,
    /// The complete report the line came from.
    #[serde(skip)]
    pub raw_output: String,
}

/// Extract findings from one report.
///
/// - `Closed Ports` / `Filtered Ports` from the `Not shown:` summary line
/// - `Open Port <n>/tcp` for every open TCP row
pub fn extract_findings(host: &HostId, report: &str) -> Vec<Finding> {
    let mut found = Vec::new();
    let mut push = |title: String, line: &str| {
        found.push(Finding {
            host: host.clone(),
            title,
            snippet: line.trim().to_string(),
            raw_output: report.to_string(),
        });
    };

    for line in report.lines() {
        for state in parser::hidden_states(line) {
            let title = match state {
                HiddenState::Closed => "Closed Ports",
                HiddenState::Filtered => "Filtered Ports",
            };
            push(title.to_string(), line);
        }

        if let Some(port) = parser::open_tcp_port(line) {
            push(format!("Open Port {}/tcp", port), line);
        }
    }

    found
}

/// Shared, deduplicating finding store.
#[derive(Debug, Clone, Default)]
pub struct LootRegistry {
    inner: Arc<Mutex<Vec<Finding>>>,
}

impl LootRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a finding unless one with the same host and title exists.
    ///
    /// Returns `true` if the finding was added.
    pub fn record(&self, finding: Finding) -> bool {
        let mut findings = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let exists = findings
            .iter()
            .any(|f| f.host == finding.host && f.title == finding.title);
        if exists {
            return false;
        }

        findings.push(finding);
        true
    }

    /// Record every finding in `findings`, returning how many were new.
    pub fn record_all(&self, findings: impl IntoIterator<Item = Finding>) -> usize {
        findings.into_iter().filter(|f| self.record(f.clone())).count()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|f| f.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of all findings in insertion order.
    pub fn snapshot(&self) -> Vec<Finding> {
        match self.inner.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT: &str = "\
Nmap scan report for scanme.nmap.org (45.33.32.156)
Host is up (0.15s latency).
Not shown: 996 closed tcp ports (conn-refused)
PORT      STATE SERVICE
22/tcp    open  ssh
80/tcp    open  http
9929/tcp  open  nping-echo
";

    fn host(name: &str) -> HostId {
        HostId::parse(name).unwrap()
    }

    #[test]
    fn test_extract_findings() {
        let findings = extract_findings(&host("scanme.nmap.org"), REPORT);
        let titles: Vec<&str> = findings.iter().map(|f| f.title.as_str()).collect();

        assert_eq!(
            titles,
            vec![
                "Closed Ports",
                "Open Port 22/tcp",
                "Open Port 80/tcp",
                "Open Port 9929/tcp",
            ]
        );
        assert_eq!(findings[1].snippet, "22/tcp    open  ssh");
        assert_eq!(findings[0].raw_output, REPORT);
    }

    #[test]
    fn test_extract_nothing_from_down_host() {
        let findings = extract_findings(&host("10.0.0.9"), "Note: Host seems down.\n");
        assert!(findings.is_empty());
    }

    #[test]
    fn test_registry_deduplicates_by_host_and_title() {
        let registry = LootRegistry::new();
        let a = host("a.example");
        let b = host("b.example");

        assert_eq!(registry.record_all(extract_findings(&a, REPORT)), 4);
        assert_eq!(registry.record_all(extract_findings(&a, REPORT)), 0);
        assert_eq!(registry.record_all(extract_findings(&b, REPORT)), 4);
        assert_eq!(registry.len(), 8);
    }

    #[test]
    fn test_registry_clones_share_state() {
        let registry = LootRegistry::new();
        let handle = registry.clone();
        handle.record_all(extract_findings(&host("a.example"), "22/tcp open ssh\n"));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.snapshot()[0].title, "Open Port 22/tcp");
    }

    #[tokio::test]
    async fn test_registry_concurrent_writers() {
        let registry = LootRegistry::new();
        let mut handles = Vec::new();

        for i in 0..16 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                let h = host(&format!("10.0.0.{i}"));
                registry.record_all(extract_findings(&h, REPORT));
                registry.record_all(extract_findings(&h, REPORT));
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(registry.len(), 16 * 4);
    }
}
