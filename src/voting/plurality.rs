use crate::models::{Poll, Vote};
use crate::voting::{OptionResult, Tally};
use std::collections::HashMap;

/// Tallies single-choice votes for `poll`.
///
/// Votes naming another poll or an option the poll does not have are not
/// counted, so `total_votes` is always the sum of the per-option counts.
/// Each percentage is rounded on its own (half up); the column is not forced
/// to add up to 100.
pub fn compute_results(poll: &Poll, votes: &[Vote]) -> Tally {
    // Initialize all options with 0 votes
    let mut vote_counts: HashMap<u32, u64> = poll.options.iter().map(|o| (o.id, 0)).collect();

    for vote in votes.iter().filter(|vote| vote.poll_id == poll.id) {
        if let Some(count) = vote_counts.get_mut(&vote.option_id) {
            *count += 1;
        }
    }

    let total_votes: u64 = vote_counts.values().sum();

    let results = poll
        .options
        .iter()
        .map(|option| {
            let votes = vote_counts.get(&option.id).copied().unwrap_or(0);
            OptionResult {
                id: option.id,
                text: option.text.clone(),
                votes,
                percentage: percentage(votes, total_votes),
            }
        })
        .collect();

    Tally {
        results,
        total_votes,
    }
}

// round(100 * count / total), halves rounded up, integer math only
fn percentage(count: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    let rounded = (200 * count + total) / (2 * total);
    rounded.min(100) as u8
}
