pub mod candidate;
pub mod election;
pub mod office;

/// Election IDs are auto-incremented integers.
pub type ElectionId = u32;
/// Candidate IDs are auto-incremented integers.
pub type CandidateId = u32;
/// Voting center IDs are auto-incremented integers.
pub type CenterId = u32;
/// Voting office (bureau) IDs are auto-incremented integers.
pub type OfficeId = u32;
/// Users are managed by the external identity provider; we only see their numeric ID.
pub type UserId = u32;
