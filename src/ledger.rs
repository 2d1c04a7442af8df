use std::sync::Arc;

use log::{debug, info};

use crate::db::VoteRepository;
use crate::error::PollError;
use crate::identity::VoterIdentity;
use crate::models::Vote;
use crate::polls::PollStore;

/// Holds at most one current vote per (poll, user).
///
/// A revote overwrites the previous vote in a single keyed write, so there is
/// nothing to lock. When the same user submits twice at the same moment the
/// store keeps whichever write arrives last; which one that is stays
/// undefined.
#[derive(Clone)]
pub struct VoteLedger {
    votes: Arc<dyn VoteRepository>,
    polls: PollStore,
}

impl VoteLedger {
    pub fn new(votes: Arc<dyn VoteRepository>, polls: PollStore) -> Self {
        Self { votes, polls }
    }

    pub async fn cast_vote<V>(
        &self,
        poll_id: &str,
        voter: &V,
        option_id: Option<u32>,
    ) -> Result<Vote, PollError>
    where
        V: VoterIdentity + ?Sized,
    {
        let user_id = voter.voter_id();
        let option_id = match option_id {
            Some(id) if !user_id.is_empty() => id,
            _ => return Err(PollError::validation("optionId and userId are required")),
        };

        let poll = self.polls.get(poll_id).await?;
        if !poll.has_option(option_id) {
            debug!("Rejected option {} for poll {}", option_id, poll_id);
            return Err(PollError::validation("Invalid option"));
        }

        let vote = Vote::new(poll.id, user_id, option_id);
        self.votes.put_vote(&vote).await?;
        info!(
            "Recorded vote in poll {} for option {}",
            vote.poll_id, vote.option_id
        );
        Ok(vote)
    }

    pub async fn votes_for(&self, poll_id: &str) -> Result<Vec<Vote>, PollError> {
        Ok(self.votes.votes_for_poll(poll_id).await?)
    }
}
