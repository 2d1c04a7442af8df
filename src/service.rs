use std::sync::Arc;

use log::debug;

use crate::db::{PollRepository, VoteRepository};
use crate::error::PollError;
use crate::identity::VoterIdentity;
use crate::ledger::VoteLedger;
use crate::models::{Poll, PollWithResults, VoteRecorded};
use crate::polls::PollStore;
use crate::voting::compute_results;

/// The four request operations, composed from the poll store, the vote
/// ledger and the tally engine over one injected store.
#[derive(Clone)]
pub struct PollService {
    polls: PollStore,
    ledger: VoteLedger,
}

impl PollService {
    pub fn new<S>(store: Arc<S>) -> Self
    where
        S: PollRepository + VoteRepository + 'static,
    {
        let polls = PollStore::new(store.clone());
        let ledger = VoteLedger::new(store, polls.clone());
        Self { polls, ledger }
    }

    pub async fn create_poll<S: AsRef<str>>(&self, question: &str, options: &[S]) -> Result<Poll, PollError> {
        self.polls.create(question, options).await
    }

    pub async fn list_polls(&self) -> Result<Vec<Poll>, PollError> {
        self.polls.list().await
    }

    /// Reads the poll, then every current vote for it, and tallies them.
    /// The two reads are not one atomic unit; a vote landing in between may
    /// or may not be counted.
    pub async fn get_poll_with_results(&self, poll_id: &str) -> Result<PollWithResults, PollError> {
        let poll = self.polls.get(poll_id).await?;
        let votes = self.ledger.votes_for(&poll.id).await?;
        let tally = compute_results(&poll, &votes);
        debug!("Tallied {} votes for poll {}", tally.total_votes, poll.id);

        Ok(PollWithResults { poll, tally })
    }

    pub async fn cast_vote<V>(
        &self,
        poll_id: &str,
        voter: &V,
        option_id: Option<u32>,
    ) -> Result<VoteRecorded, PollError>
    where
        V: VoterIdentity + ?Sized,
    {
        let vote = self.ledger.cast_vote(poll_id, voter, option_id).await?;
        Ok(VoteRecorded::new(vote))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::db::memory::MemoryStore;
    use crate::identity::ClaimedVoter;

    fn service() -> (Arc<MemoryStore>, PollService) {
        let memory = Arc::new(MemoryStore::new());
        (memory.clone(), PollService::new(memory))
    }

    #[tokio::test]
    async fn results_follow_the_votes() {
        let (_, service) = service();
        let poll = service.create_poll("X or Y?", &["X", "Y"]).await.unwrap();

        for (user, option) in [("u1", 0), ("u2", 0), ("u3", 1)] {
            service
                .cast_vote(&poll.id, &ClaimedVoter(user.to_string()), Some(option))
                .await
                .unwrap();
        }
        let read = service.get_poll_with_results(&poll.id).await.unwrap();

        assert_eq!(read.poll, poll);
        assert_eq!(read.tally.total_votes, 3);
        assert_eq!(read.tally.results[0].votes, 2);
        assert_eq!(read.tally.results[0].percentage, 67);
        assert_eq!(read.tally.results[1].votes, 1);
        assert_eq!(read.tally.results[1].percentage, 33);
    }

    #[tokio::test]
    async fn fresh_poll_has_empty_tally() {
        let (_, service) = service();
        let poll = service.create_poll("Q", &["a", "b"]).await.unwrap();

        let read = service.get_poll_with_results(&poll.id).await.unwrap();

        assert_eq!(read.tally.total_votes, 0);
        assert!(read.tally.results.iter().all(|r| r.percentage == 0));
    }

    #[tokio::test]
    async fn unknown_poll_results_are_not_found() {
        let (_, service) = service();

        let result = service.get_poll_with_results("nonexistent").await;

        assert!(matches!(result, Err(PollError::NotFound(_))));
    }

    #[tokio::test]
    async fn cast_vote_confirms_with_the_written_vote() {
        let (_, service) = service();
        let poll = service.create_poll("Q", &["a", "b"]).await.unwrap();

        let recorded = service
            .cast_vote(&poll.id, &ClaimedVoter("u1".to_string()), Some(1))
            .await
            .unwrap();

        assert_eq!(recorded.message, "Vote recorded");
        assert_eq!(recorded.vote.poll_id, poll.id);
        assert_eq!(recorded.vote.option_id, 1);
    }

    #[tokio::test]
    async fn listing_fails_cleanly_when_store_is_down() {
        let (memory, service) = service();
        service.create_poll("Q", &["a", "b"]).await.unwrap();
        memory.set_offline(true);

        assert!(matches!(
            service.list_polls().await,
            Err(PollError::StoreUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn results_serialize_like_the_rest_api() {
        let (_, service) = service();
        let poll = service.create_poll("Q", &["a", "b"]).await.unwrap();
        service
            .cast_vote(&poll.id, &ClaimedVoter("u1".to_string()), Some(0))
            .await
            .unwrap();

        let read = service.get_poll_with_results(&poll.id).await.unwrap();
        let json = serde_json::to_value(&read).unwrap();

        assert_eq!(json["id"], poll.id.as_str());
        assert_eq!(json["totalVotes"], 1);
        assert_eq!(json["results"][0]["percentage"], 100);
    }

    #[tokio::test]
    async fn works_against_sqlite() {
        let db = Database::connect("sqlite::memory:", 1, "polls", "votes")
            .await
            .unwrap();
        let service = PollService::new(Arc::new(db));
        let poll = service.create_poll("Q", &["a", "b", "c"]).await.unwrap();

        service
            .cast_vote(&poll.id, &ClaimedVoter("u1".to_string()), Some(2))
            .await
            .unwrap();
        service
            .cast_vote(&poll.id, &ClaimedVoter("u1".to_string()), Some(0))
            .await
            .unwrap();
        let invalid = service
            .cast_vote(&poll.id, &ClaimedVoter("u2".to_string()), Some(99))
            .await;
        let read = service.get_poll_with_results(&poll.id).await.unwrap();

        assert!(matches!(invalid, Err(PollError::Validation(_))));
        assert_eq!(read.tally.total_votes, 1);
        assert_eq!(read.tally.results[0].votes, 1);
        assert_eq!(service.list_polls().await.unwrap().len(), 1);
    }
}
