use uuid::Uuid;

// External collaborators, read-only from the meeting core
pub mod group_members;
pub mod group_role;
pub mod groups;
pub mod users;

// Meeting / note / summary pipeline
pub mod meeting_participations;
pub mod meeting_status;
pub mod meetings;
pub mod notes;
pub mod summaries;

/// A type alias that represents any Entity's internal id field data type.
/// Aliased so that it's easy to change the underlying type if necessary.
pub type Id = Uuid;
