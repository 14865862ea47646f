pub mod badge;
pub mod profile;
pub mod session;

pub use badge::{Badge, BadgeCriterion};
pub use profile::{Profile, UserSummary};
pub use session::{SessionRecord, SessionRow};
