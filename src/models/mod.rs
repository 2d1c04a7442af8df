use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::voting::Tally;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Poll {
    pub id: String,
    pub question: String,
    pub options: Vec<PollOption>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollOption {
    pub id: u32,
    pub text: String,
}

/// The single current vote of one user in one poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    pub poll_id: String,
    pub user_id: String,
    pub option_id: u32,
    pub voted_at: DateTime<Utc>,
}

/// A poll together with the tally computed at read time.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollWithResults {
    #[serde(flatten)]
    pub poll: Poll,
    #[serde(flatten)]
    pub tally: Tally,
}

#[derive(Debug, Clone, Serialize)]
pub struct VoteRecorded {
    pub message: String,
    pub vote: Vote,
}

impl Poll {
    /// Builds a fresh poll. Option ids are the zero-based input positions.
    /// Callers validate the text beforehand.
    pub fn new(question: String, options: Vec<String>) -> Self {
        let options = options
            .into_iter()
            .enumerate()
            .map(|(position, text)| PollOption {
                id: position as u32,
                text,
            })
            .collect();

        Self {
            id: Uuid::new_v4().to_string(),
            question,
            options,
            created_at: Utc::now(),
        }
    }

    pub fn option(&self, option_id: u32) -> Option<&PollOption> {
        self.options.iter().find(|option| option.id == option_id)
    }

    pub fn has_option(&self, option_id: u32) -> bool {
        self.option(option_id).is_some()
    }
}

impl Vote {
    pub fn new(poll_id: String, user_id: String, option_id: u32) -> Self {
        Self {
            poll_id,
            user_id,
            option_id,
            voted_at: Utc::now(),
        }
    }
}

impl VoteRecorded {
    pub fn new(vote: Vote) -> Self {
        Self {
            message: "Vote recorded".to_string(),
            vote,
        }
    }
}
