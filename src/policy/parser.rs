//! Text patterns recognised in scan engine output.
//!
//! The engine's normal-format report is matched line by line. Each pattern
//! lives here as a named constant or function so the transition policy and
//! the loot extractor never match raw substrings themselves.

use crate::types::{Port, PortList};

/// Affirmative reachability marker printed when the target answered a probe.
///
/// The latency in parentheses is only present when a real response was
/// received, which is what separates it from the bare `Host is up.` printed
/// when discovery is skipped.
pub const HOST_UP_MARKER: &str = "Host is up (";

/// Suffix of the port token on a TCP port table row, e.g. `22/tcp`.
pub const TCP_PORT_SUFFIX: &str = "/tcp";

/// State token for an open port.
pub const OPEN_STATE: &str = "open";

/// Prefix of the hidden-ports summary line, e.g.
/// `Not shown: 997 closed tcp ports (conn-refused)`.
pub const NOT_SHOWN_PREFIX: &str = "Not shown:";

/// Port states the engine folds into its `Not shown:` summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HiddenState {
    Closed,
    Filtered,
}

/// Whether the report carries the host-up marker.
pub fn host_is_up(text: &str) -> bool {
    text.contains(HOST_UP_MARKER)
}

/// Parse a port table row of the form `<port>/tcp <state> ...`.
///
/// Returns the port when the state is `open` (or an `open|...` compound
/// state). Any other shape yields `None`.
pub fn open_tcp_port(line: &str) -> Option<Port> {
    let mut tokens = line.split_whitespace();
    let port = tokens
        .next()?
        .strip_suffix(TCP_PORT_SUFFIX)?
        .parse::<Port>()
        .ok()?;
    let state = tokens.next()?;

    let is_open = state == OPEN_STATE
        || state
            .strip_prefix(OPEN_STATE)
            .is_some_and(|rest| rest.starts_with('|'));
    is_open.then_some(port)
}

/// Collect every open TCP port in the report, sorted and deduplicated.
pub fn open_tcp_ports(text: &str) -> PortList {
    text.lines().filter_map(open_tcp_port).collect()
}

/// States mentioned by a `Not shown:` summary line.
///
/// Handles both the single form (`Not shown: 998 closed ports`) and the
/// comma-separated form (`Not shown: 65530 filtered tcp ports (no-response),
/// 3 closed tcp ports (reset)`).
pub fn hidden_states(line: &str) -> Vec<HiddenState> {
    let Some(rest) = line.trim_start().strip_prefix(NOT_SHOWN_PREFIX) else {
        return Vec::new();
    };

    rest.split(',')
        .filter_map(|part| {
            let mut tokens = part.split_whitespace();
            tokens.next()?.parse::<u32>().ok()?;
            match tokens.next()? {
                "closed" => Some(HiddenState::Closed),
                "filtered" => Some(HiddenState::Filtered),
                _ => None,
            }
        })
        .collect()
}
