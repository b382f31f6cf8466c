//! Meeting, note and summary business logic.
//!
//! Entity types are re-exported from `entity_api` so that consumers of the `domain` crate do not
//! need to depend on `entity` or `entity_api` directly.
pub use entity_api::{
    group_members, group_role, groups, meeting_participations, meeting_status, meetings, notes,
    summaries, users, Id,
};

pub mod document;
pub mod error;
pub mod gateway;
pub mod meeting;
pub mod note;
pub mod prompt;
pub mod summary;
pub mod summary_contract;
