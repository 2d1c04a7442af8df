use std::sync::Arc;

use log::{debug, info};

use crate::db::PollRepository;
use crate::error::PollError;
use crate::models::Poll;

pub const MIN_OPTIONS: usize = 2;

/// Creates and reads poll definitions. Polls are never changed after
/// creation.
#[derive(Clone)]
pub struct PollStore {
    repo: Arc<dyn PollRepository>,
}

impl PollStore {
    pub fn new(repo: Arc<dyn PollRepository>) -> Self {
        Self { repo }
    }

    pub async fn create<S: AsRef<str>>(&self, question: &str, options: &[S]) -> Result<Poll, PollError> {
        let (question, options) = validate(question, options)?;
        let poll = Poll::new(question, options);

        self.repo.insert_poll(&poll).await?;
        info!(
            "Created poll {} with {} options",
            poll.id,
            poll.options.len()
        );
        Ok(poll)
    }

    pub async fn get(&self, poll_id: &str) -> Result<Poll, PollError> {
        self.repo
            .find_poll(poll_id)
            .await?
            .ok_or_else(|| PollError::NotFound(poll_id.to_string()))
    }

    /// Every poll, most recently created first.
    pub async fn list(&self) -> Result<Vec<Poll>, PollError> {
        let polls = self.repo.all_polls().await?;
        debug!("Listed {} polls", polls.len());
        Ok(polls)
    }
}

// Returns the trimmed question and option texts
fn validate<S: AsRef<str>>(question: &str, options: &[S]) -> Result<(String, Vec<String>), PollError> {
    let question = question.trim();
    if question.is_empty() {
        return Err(PollError::validation("Poll must have a question"));
    }
    if options.len() < MIN_OPTIONS {
        return Err(PollError::validation(format!(
            "Poll must have at least {MIN_OPTIONS} options"
        )));
    }

    let mut texts = Vec::with_capacity(options.len());
    for (position, option) in options.iter().enumerate() {
        let text = option.as_ref().trim();
        if text.is_empty() {
            return Err(PollError::validation(format!(
                "Option {} must not be blank",
                position + 1
            )));
        }
        texts.push(text.to_string());
    }

    Ok((question.to_string(), texts))
}
