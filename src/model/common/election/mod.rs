mod kind;
mod state;

pub use kind::ElectionType;
pub use state::ElectionStatus;
