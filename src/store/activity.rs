use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::info;

/// Entries kept before the oldest is dropped
pub const ACTIVITY_LOG_CAPACITY: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Buy,
    Sell,
    Graduation,
    Payout,
}

impl ActivityKind {
    fn emoji(&self) -> &'static str {
        match self {
            ActivityKind::Buy => "🎯",
            ActivityKind::Sell => "💸",
            ActivityKind::Graduation => "🎓",
            ActivityKind::Payout => "✅",
        }
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActivityKind::Buy => "BUY",
            ActivityKind::Sell => "SELL",
            ActivityKind::Graduation => "GRADUATION",
            ActivityKind::Payout => "PAYOUT",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEntry {
    /// Unix seconds, supplied by the caller
    pub timestamp: u64,
    pub kind: ActivityKind,
    pub market_id: String,
    pub outcome: Option<usize>,
    pub amount: Option<f64>,
    pub details: String,
}

impl fmt::Display for ActivityEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {} | {} | {}",
            self.timestamp,
            self.kind.emoji(),
            self.kind,
            self.market_id,
            self.details
        )
    }
}

/// Bounded trade log. Oldest entries fall off once capacity is reached.
#[derive(Debug, Clone)]
pub struct ActivityLog {
    entries: VecDeque<ActivityEntry>,
    capacity: usize,
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::with_capacity(ACTIVITY_LOG_CAPACITY)
    }
}

impl ActivityLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(ACTIVITY_LOG_CAPACITY)),
            capacity: capacity.max(1),
        }
    }

    pub fn record(&mut self, entry: ActivityEntry) {
        info!(
            kind = %entry.kind,
            market_id = %entry.market_id,
            outcome = ?entry.outcome,
            amount = ?entry.amount,
            "{}",
            entry.details
        );
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries oldest first
    pub fn entries(&self) -> impl Iterator<Item = &ActivityEntry> {
        self.entries.iter()
    }

    /// The `n` newest entries, newest first
    pub fn recent(&self, n: usize) -> Vec<&ActivityEntry> {
        self.entries.iter().rev().take(n).collect()
    }

    pub fn for_market<'a>(&'a self, market_id: &'a str) -> impl Iterator<Item = &'a ActivityEntry> {
        self.entries.iter().filter(move |e| e.market_id == market_id)
    }
}
