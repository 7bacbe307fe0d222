pub mod api;
pub mod kinds;
pub mod models;

pub use kinds::{MembershipStatus, MessageKind, ParticipantRole};
