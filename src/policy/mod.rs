//! Stage transition policy.
//!
//! Reads the raw text of one stage's report and decides whether the host
//! needs another stage, and if so which one with which arguments. The policy
//! is a pure, total function: it never fails, never blocks and answers
//! `Stop` for anything it cannot make sense of.

pub mod parser;

use crate::scanner::ScanTask;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Port argument for a full TCP range scan.
pub const FULL_RANGE_PORTS: &str = "-p-";
/// TCP connect scan switch.
pub const CONNECT_SWITCH: &str = "-sT";
/// Skip host discovery switch.
pub const NO_DISCOVERY_SWITCH: &str = "-Pn";
/// Host discovery only switch used by the initial sweep.
pub const SWEEP_SWITCH: &str = "-sn";
/// UDP scan switch.
pub const UDP_SWITCH: &str = "-sU";
/// Port argument for the UDP probe.
pub const UDP_PORTS: &str = "--top-ports 100";

/// One discrete phase of escalating reconnaissance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Initial reachability sweep.
    Sweep,
    /// Default port scan with discovery disabled, for hosts that ignore pings.
    QuickNoDiscovery,
    /// Every TCP port.
    FullRange,
    /// Focused analysis of previously discovered open ports.
    Deeper,
    /// Top UDP ports.
    Udp,
    /// Nothing left to do.
    Terminal,
}

impl Stage {
    /// Stage name used in artifact file names.
    pub fn name(self) -> &'static str {
        match self {
            Self::Sweep => "sweep",
            Self::QuickNoDiscovery => "quick",
            Self::FullRange => "fullrange",
            Self::Deeper => "deeper",
            Self::Udp => "udp",
            Self::Terminal => "terminal",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Terminal)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sweep => write!(f, "Sweep"),
            Self::QuickNoDiscovery => write!(f, "Quick (no discovery)"),
            Self::FullRange => write!(f, "Full Range"),
            Self::Deeper => write!(f, "Deeper"),
            Self::Udp => write!(f, "UDP"),
            Self::Terminal => write!(f, "Terminal"),
        }
    }
}

/// Why a host needs no further stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Neither the sweep nor the no-discovery recheck saw the host.
    Unreachable,
    /// The single level of deep analysis has run.
    DeepAnalysisDone,
    /// The report listed no open TCP ports.
    NoOpenPorts,
    /// The stage was already terminal.
    Terminal,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unreachable => write!(f, "host unreachable"),
            Self::DeepAnalysisDone => write!(f, "deep analysis complete"),
            Self::NoOpenPorts => write!(f, "no open ports"),
            Self::Terminal => write!(f, "already terminal"),
        }
    }
}

/// The stage to run next and its engine arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextScan {
    pub stage: Stage,
    pub ports: String,
    pub switches: String,
}

impl NextScan {
    fn new(stage: Stage, ports: impl Into<String>, switches: impl Into<String>) -> Self {
        Self {
            stage,
            ports: ports.into(),
            switches: switches.into(),
        }
    }

    fn full_range() -> Self {
        Self::new(Stage::FullRange, FULL_RANGE_PORTS, CONNECT_SWITCH)
    }
}

/// Outcome of evaluating one stage's report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    Stop(StopReason),
    Next(NextScan),
}

impl Decision {
    pub fn is_stop(&self) -> bool {
        matches!(self, Self::Stop(_))
    }

    /// The follow-up scan, if any.
    pub fn next(&self) -> Option<&NextScan> {
        match self {
            Self::Next(next) => Some(next),
            Self::Stop(_) => None,
        }
    }
}

/// Decide the follow-up for a report produced by `stage`.
///
/// Rules, in order:
/// - `Sweep`: host up → full range connect scan; otherwise recheck with
///   discovery disabled.
/// - `QuickNoDiscovery`: host up → full range connect scan; otherwise stop.
/// - `Deeper`: always stop, deep analysis never recurses.
/// - any other stage: open TCP ports → deep analysis of exactly those
///   ports; none → stop.
///
/// Reachability means the report carries [`parser::HOST_UP_MARKER`]; a
/// missing marker counts as down whatever else the report says.
pub fn decide(stage: Stage, text: &str) -> Decision {
    match stage {
        Stage::Sweep => {
            if parser::host_is_up(text) {
                Decision::Next(NextScan::full_range())
            } else {
                Decision::Next(NextScan::new(
                    Stage::QuickNoDiscovery,
                    "",
                    NO_DISCOVERY_SWITCH,
                ))
            }
        }
        Stage::QuickNoDiscovery => {
            if parser::host_is_up(text) {
                Decision::Next(NextScan::full_range())
            } else {
                Decision::Stop(StopReason::Unreachable)
            }
        }
        Stage::Deeper => Decision::Stop(StopReason::DeepAnalysisDone),
        Stage::Terminal => Decision::Stop(StopReason::Terminal),
        Stage::FullRange | Stage::Udp => {
            let ports = parser::open_tcp_ports(text);
            if ports.is_empty() {
                Decision::Stop(StopReason::NoOpenPorts)
            } else {
                Decision::Next(NextScan::new(
                    Stage::Deeper,
                    ports.to_port_arg(),
                    CONNECT_SWITCH,
                ))
            }
        }
    }
}

/// Transition policy with optional extra stages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// Probe the top UDP ports when a full range scan finds no open TCP port.
    pub udp_probe: bool,
}

impl Policy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable the UDP probe follow-up.
    pub fn with_udp_probe(mut self) -> Self {
        self.udp_probe = true;
        self
    }

    /// Evaluate the report of an executed task.
    pub fn evaluate(&self, task: &ScanTask, text: &str) -> Decision {
        let decision = decide(task.stage(), text);

        if self.udp_probe
            && task.stage() == Stage::FullRange
            && decision == Decision::Stop(StopReason::NoOpenPorts)
        {
            return Decision::Next(NextScan::new(Stage::Udp, UDP_PORTS, UDP_SWITCH));
        }

        decision
    }
}
