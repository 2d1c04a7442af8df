use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use crate::db::{PollRepository, VoteRepository};
use crate::error::StoreError;
use crate::models::{Poll, Vote};

/// In-process store used by the test suites. Can be switched offline to
/// simulate an unreachable backend.
#[derive(Default)]
pub struct MemoryStore {
    polls: Mutex<HashMap<String, Poll>>,
    votes: Mutex<HashMap<(String, String), Vote>>,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn poll_count(&self) -> usize {
        self.polls.lock().unwrap().len()
    }

    pub fn vote_count(&self) -> usize {
        self.votes.lock().unwrap().len()
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store is offline".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl PollRepository for MemoryStore {
    async fn insert_poll(&self, poll: &Poll) -> Result<(), StoreError> {
        self.check_online()?;
        self.polls
            .lock()
            .unwrap()
            .insert(poll.id.clone(), poll.clone());
        Ok(())
    }

    async fn find_poll(&self, poll_id: &str) -> Result<Option<Poll>, StoreError> {
        self.check_online()?;
        Ok(self.polls.lock().unwrap().get(poll_id).cloned())
    }

    async fn all_polls(&self) -> Result<Vec<Poll>, StoreError> {
        self.check_online()?;
        let mut polls: Vec<Poll> = self.polls.lock().unwrap().values().cloned().collect();
        polls.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(polls)
    }
}

#[async_trait]
impl VoteRepository for MemoryStore {
    async fn put_vote(&self, vote: &Vote) -> Result<(), StoreError> {
        self.check_online()?;
        self.votes.lock().unwrap().insert(
            (vote.poll_id.clone(), vote.user_id.clone()),
            vote.clone(),
        );
        Ok(())
    }

    async fn votes_for_poll(&self, poll_id: &str) -> Result<Vec<Vote>, StoreError> {
        self.check_online()?;
        Ok(self
            .votes
            .lock()
            .unwrap()
            .values()
            .filter(|vote| vote.poll_id == poll_id)
            .cloned()
            .collect())
    }
}
