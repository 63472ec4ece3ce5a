use std::str::FromStr;

use serde::Deserialize;

use reduce_api::LogStatistics;

use crate::rate::{estimate_rate, raw_span, span_seconds};

/// Ceiling used when none (or an unusable one) is configured, messages/s.
pub const DEFAULT_MAX_FREQUENCY: f64 = 50.0;

// ═══════════════════════════════════════════════════════════════
//  PolicyKind / PolicyConfig
// ═══════════════════════════════════════════════════════════════

/// Decimation strategy. The two variants classify channels with different
/// span formulas and drop different messages; they are never mixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    /// Keep every `ceil(rate / max)`-th message by arrival index.
    #[default]
    Modulo,
    /// Classify by rate over the raw nanosecond span; frequent channels keep
    /// only their first message.
    Toggle,
}

impl PolicyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyKind::Modulo => "modulo",
            PolicyKind::Toggle => "toggle",
        }
    }
}

impl std::fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PolicyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "modulo" => Ok(PolicyKind::Modulo),
            "toggle" => Ok(PolicyKind::Toggle),
            other => Err(format!("unknown policy '{other}'. Supported: modulo, toggle")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolicyConfig {
    pub kind: PolicyKind,
    /// Frequency ceiling, messages/s. Finite and positive.
    pub max_frequency: f64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            kind: PolicyKind::default(),
            max_frequency: DEFAULT_MAX_FREQUENCY,
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Decimator: per-channel decision state
// ═══════════════════════════════════════════════════════════════

/// Keep/drop state of one channel for one reduction run.
///
/// Created before the pass, asked exactly once per arriving message.
/// Decisions depend only on the arrival index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decimator {
    Modulo { keep_rate: u64, seen: u64 },
    Toggle(Toggle),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    /// Non-frequent channel, everything passes.
    PassAll,
    /// Frequent channel. The first arrival is written; every later arrival
    /// takes the already-written branch and is dropped. Nothing re-arms the
    /// write branch, so the channel keeps exactly one message.
    Frequent { written: bool },
}

/// Stride of the modulo policy. `1` at or below the ceiling, otherwise
/// `ceil(rate / max)`; an unbounded rate saturates to `u64::MAX` (float to
/// int casts saturate), which keeps only the first arrival.
pub fn keep_rate(rate: f64, max_frequency: f64) -> u64 {
    if rate <= max_frequency {
        return 1;
    }
    ((rate / max_frequency).ceil() as u64).max(1)
}

impl Decimator {
    pub fn modulo(rate: f64, max_frequency: f64) -> Self {
        Decimator::Modulo {
            keep_rate: keep_rate(rate, max_frequency),
            seen: 0,
        }
    }

    pub fn toggle(frequent: bool) -> Self {
        if frequent {
            Decimator::Toggle(Toggle::Frequent { written: false })
        } else {
            Decimator::Toggle(Toggle::PassAll)
        }
    }

    /// State for a channel with `count` messages in a log described by `stats`.
    pub fn for_channel(policy: &PolicyConfig, count: u64, stats: &LogStatistics) -> Self {
        match policy.kind {
            PolicyKind::Modulo => {
                let rate = estimate_rate(count, span_seconds(stats));
                Decimator::modulo(rate, policy.max_frequency)
            }
            PolicyKind::Toggle => {
                let rate = estimate_rate(count, raw_span(stats));
                Decimator::toggle(rate > policy.max_frequency)
            }
        }
    }

    /// Decide the next arrival and advance the state.
    pub fn admit(&mut self) -> bool {
        match self {
            Decimator::Modulo { keep_rate, seen } => {
                let keep = *seen % *keep_rate == 0;
                *seen += 1;
                keep
            }
            Decimator::Toggle(Toggle::PassAll) => true,
            Decimator::Toggle(Toggle::Frequent { written }) => {
                if *written {
                    return false;
                }
                *written = true;
                true
            }
        }
    }

    /// Modulo stride, `None` for the toggle policy.
    pub fn keep_rate(&self) -> Option<u64> {
        match self {
            Decimator::Modulo { keep_rate, .. } => Some(*keep_rate),
            Decimator::Toggle(_) => None,
        }
    }

    /// Whether the channel loses messages at all.
    pub fn is_decimating(&self) -> bool {
        match self {
            Decimator::Modulo { keep_rate, .. } => *keep_rate > 1,
            Decimator::Toggle(t) => matches!(t, Toggle::Frequent { .. }),
        }
    }
}
