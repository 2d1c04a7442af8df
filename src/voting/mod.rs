pub mod plurality;

use serde::Serialize;

pub use plurality::compute_results;

// Tally derived from the current vote set, never persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tally {
    pub results: Vec<OptionResult>,
    pub total_votes: u64,
}

// Count and share for a single option
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionResult {
    pub id: u32,
    pub text: String,
    pub votes: u64,
    pub percentage: u8,
}

impl Tally {
    pub fn result_for(&self, option_id: u32) -> Option<&OptionResult> {
        self.results.iter().find(|result| result.id == option_id)
    }

    /// Options sharing the highest count. Empty when nobody has voted.
    pub fn leaders(&self) -> Vec<&OptionResult> {
        let top = self.results.iter().map(|r| r.votes).max().unwrap_or(0);
        if top == 0 {
            return Vec::new();
        }
        self.results.iter().filter(|r| r.votes == top).collect()
    }
}
