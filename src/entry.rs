//! Address list parsing
//! Turns raw `address[#label]` lines into labelled proxy entries

use rand::seq::SliceRandom;
use std::collections::{HashMap, HashSet};

/// Ports a portless address may be assigned
pub const DEFAULT_PORTS: [u16; 4] = [443, 2053, 2096, 8443];

/// A single proxy parsed from the upstream list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyEntry {
    /// Always `host:port` once parsed
    pub address: String,
    /// Display name, unique within one parse
    pub label: String,
}

impl ProxyEntry {
    /// Host part of the address (everything before the last `:`)
    pub fn host(&self) -> &str {
        match self.address.rsplit_once(':') {
            Some((host, _)) => host,
            None => &self.address,
        }
    }

    /// Port part of the address, unvalidated
    pub fn port(&self) -> &str {
        match self.address.rsplit_once(':') {
            Some((_, port)) => port,
            None => "",
        }
    }
}

/// Per-invocation label de-duplication state
///
/// The first use of a base label keeps it as is; later uses get `_2`, `_3`, ...
/// A suffixed label that was already handed out is skipped, so every label
/// returned by one counter is distinct.
#[derive(Debug, Default)]
pub struct LabelCounter {
    counts: HashMap<String, usize>,
    emitted: HashSet<String>,
}

impl LabelCounter {
    /// Create an empty counter
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a unique label derived from `base`
    pub fn assign(&mut self, base: &str) -> String {
        let count = self.counts.entry(base.to_string()).or_insert(0);
        *count += 1;

        let mut label = if *count == 1 {
            base.to_string()
        } else {
            format!("{}_{}", base, count)
        };

        while self.emitted.contains(&label) {
            *count += 1;
            label = format!("{}_{}", base, count);
        }

        self.emitted.insert(label.clone());
        label
    }
}

/// Split fetched text into lines, dropping whitespace-only ones
pub fn split_lines(text: &str) -> Vec<String> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.to_string())
        .collect()
}

/// Pick a port uniformly at random from `ports`
pub fn random_port(ports: &[u16]) -> u16 {
    ports
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(DEFAULT_PORTS[0])
}

/// Parse one line into an entry
///
/// Never fails: a missing label falls back to the address as written and a
/// missing port is filled in by `pick_port`.
pub fn parse_entry<F>(line: &str, counter: &mut LabelCounter, ports: &[u16], pick_port: &mut F) -> ProxyEntry
where
    F: FnMut(&[u16]) -> u16,
{
    let (address, label) = match line.split_once('#') {
        Some((address, label)) => (address.trim(), label.trim()),
        None => (line.trim(), ""),
    };

    let base = if label.is_empty() { address } else { label };
    let label = counter.assign(base);

    let address = if address.contains(':') {
        address.to_string()
    } else {
        format!("{}:{}", address, pick_port(ports))
    };

    ProxyEntry { address, label }
}

/// Parse an ordered list of lines with a fresh label counter
pub fn parse_entries<S, F>(lines: &[S], ports: &[u16], mut pick_port: F) -> Vec<ProxyEntry>
where
    S: AsRef<str>,
    F: FnMut(&[u16]) -> u16,
{
    let mut counter = LabelCounter::new();

    lines
        .iter()
        .map(|line| parse_entry(line.as_ref(), &mut counter, ports, &mut pick_port))
        .collect()
}
