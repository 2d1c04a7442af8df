use serenity::model::user::User;

/// Who a vote is attributed to.
///
/// Every implementation here trusts its source as-is. A verified identity
/// scheme only needs a new implementation; the ledger never looks past
/// `voter_id`.
pub trait VoterIdentity: Send + Sync {
    fn voter_id(&self) -> String;
}

/// An identifier supplied by the caller and taken at face value.
#[derive(Debug, Clone)]
pub struct ClaimedVoter(pub String);

impl VoterIdentity for ClaimedVoter {
    fn voter_id(&self) -> String {
        self.0.clone()
    }
}

// Discord already authenticated the user that clicked
impl VoterIdentity for User {
    fn voter_id(&self) -> String {
        self.id.to_string()
    }
}
