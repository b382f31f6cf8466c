//! Meeting lifecycle: creation with room provisioning, joining and leaving, room credentials,
//! and the end-of-meeting transition that captures the room into a note and summarizes it.

use crate::error::Error;
use crate::gateway::{
    self, AccessToken, RoomMetadata, RoomProvider, RoomUserInfo, SummaryProvider,
};
use crate::prompt::PromptTemplate;
use crate::summary;
use crate::{group_members, meeting_participations, meetings, summaries, users, Id};
use chrono::Utc;
use entity::meeting_status::MeetingStatus;
use entity_api::{group, meeting, meeting_participation, note, user};
use log::*;
use sea_orm::entity::prelude::DateTimeWithTimeZone;
use sea_orm::{DatabaseConnection, TransactionTrait};
use serde::Serialize;
use service::config::Config;

/// The provider room backing a meeting. Depends only on the two ids, so any caller can
/// recompute it.
pub fn room_id(group_id: Id, meeting_id: Id) -> String {
    format!("group:{group_id}:meeting:{meeting_id}")
}

/// Applies the ONGOING → ENDED transition, stamping `at` as the end time.
pub fn end_transition(
    meeting: meetings::Model,
    at: DateTimeWithTimeZone,
) -> Result<meetings::Model, Error> {
    if !meeting.status.can_transition_to(MeetingStatus::Ended) {
        return Err(Error::conflict(format!(
            "meeting {} has already ended",
            meeting.id
        )));
    }

    Ok(meetings::Model {
        status: MeetingStatus::Ended,
        ended_at: Some(at),
        ..meeting
    })
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Participant {
    pub user_id: Id,
    pub name: String,
    pub joined_at: DateTimeWithTimeZone,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MeetingDetail {
    pub meeting: meetings::Model,
    pub participants: Vec<Participant>,
}

/// Result of joining: the caller's participation plus a fresh room credential.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct JoinedMeeting {
    pub participation: meeting_participations::Model,
    pub access_token: AccessToken,
}

pub async fn find_by_id(db: &DatabaseConnection, meeting_id: Id) -> Result<meetings::Model, Error> {
    Ok(meeting::find_by_id(db, meeting_id).await?)
}

pub async fn find_detail(db: &DatabaseConnection, meeting_id: Id) -> Result<MeetingDetail, Error> {
    let meeting = meeting::find_by_id(db, meeting_id).await?;
    let participants = meeting_participation::find_with_users_by_meeting_id(db, meeting_id)
        .await?
        .into_iter()
        .map(|(participation, user)| Participant {
            user_id: user.id,
            name: user.name,
            joined_at: participation.joined_at,
        })
        .collect();

    Ok(MeetingDetail {
        meeting,
        participants,
    })
}

pub async fn find_by_group(
    db: &DatabaseConnection,
    group_id: Id,
) -> Result<Vec<meetings::Model>, Error> {
    group::find_by_id(db, group_id).await?;
    Ok(meeting::find_by_group_id(db, group_id).await?)
}

/// Meetings the user currently participates in.
pub async fn find_by_participant(
    db: &DatabaseConnection,
    user_id: Id,
) -> Result<Vec<meetings::Model>, Error> {
    Ok(meeting::find_by_participant(db, user_id).await?)
}

pub async fn create(
    db: &DatabaseConnection,
    config: &Config,
    group_id: Id,
    creator_id: Id,
    title: String,
) -> Result<meetings::Model, Error> {
    let rooms = gateway::room_provider(config)?;
    create_with(db, &rooms, group_id, creator_id, title).await
}

/// Provisions the meeting's room first, then persists the meeting together with the creator's
/// host participation. A failed room provisioning leaves nothing behind.
pub async fn create_with(
    db: &DatabaseConnection,
    rooms: &dyn RoomProvider,
    group_id: Id,
    creator_id: Id,
    title: String,
) -> Result<meetings::Model, Error> {
    user::find_by_id(db, creator_id).await?;
    group::find_by_id(db, group_id).await?;

    let meeting_id = Id::new_v4();
    let room = room_id(group_id, meeting_id);
    rooms
        .create_room(
            &room,
            &RoomMetadata {
                group_id,
                meeting_id,
            },
        )
        .await?;

    let now = Utc::now().into();
    let txn = db.begin().await?;
    let created = meeting::create(&txn, meeting_id, group_id, creator_id, title, now).await?;
    meeting_participation::create(&txn, meeting_id, creator_id, now).await?;
    txn.commit().await?;

    info!("User {creator_id} created meeting {meeting_id} in group {group_id}");
    Ok(created)
}

pub async fn join(
    db: &DatabaseConnection,
    config: &Config,
    meeting_id: Id,
    user_id: Id,
) -> Result<JoinedMeeting, Error> {
    let rooms = gateway::room_provider(config)?;
    join_with(db, &rooms, meeting_id, user_id).await
}

/// Joins the meeting, or re-joins it if the user already participates, and issues a room
/// credential either way.
pub async fn join_with(
    db: &DatabaseConnection,
    rooms: &dyn RoomProvider,
    meeting_id: Id,
    user_id: Id,
) -> Result<JoinedMeeting, Error> {
    let (user, meeting, membership) = authorize_room_access(db, meeting_id, user_id).await?;

    let participation =
        meeting_participation::find_or_create(db, meeting_id, user_id, Utc::now().into()).await?;
    debug!("User {user_id} participates in meeting {meeting_id} as {}", participation.id);

    let access_token = request_token(rooms, &meeting, &user, &membership).await?;

    Ok(JoinedMeeting {
        participation,
        access_token,
    })
}

pub async fn issue_access_token(
    db: &DatabaseConnection,
    config: &Config,
    meeting_id: Id,
    user_id: Id,
) -> Result<AccessToken, Error> {
    let rooms = gateway::room_provider(config)?;
    issue_access_token_with(db, &rooms, meeting_id, user_id).await
}

/// Issues a room credential to a current participant. All checks happen before the provider
/// is contacted.
pub async fn issue_access_token_with(
    db: &DatabaseConnection,
    rooms: &dyn RoomProvider,
    meeting_id: Id,
    user_id: Id,
) -> Result<AccessToken, Error> {
    let (user, meeting, membership) = authorize_room_access(db, meeting_id, user_id).await?;

    if meeting_participation::find_by_meeting_and_user(db, meeting_id, user_id)
        .await?
        .is_none()
    {
        warn!("User {user_id} requested a room token for meeting {meeting_id} without joining");
        return Err(Error::forbidden("user is not participating in this meeting"));
    }

    request_token(rooms, &meeting, &user, &membership).await
}

/// The checks shared by join and token issuance: user and meeting exist, the meeting is still
/// ongoing and the user belongs to its group.
async fn authorize_room_access(
    db: &DatabaseConnection,
    meeting_id: Id,
    user_id: Id,
) -> Result<(users::Model, meetings::Model, group_members::Model), Error> {
    let user = user::find_by_id(db, user_id).await?;
    let meeting = meeting::find_by_id(db, meeting_id).await?;

    if meeting.status == MeetingStatus::Ended {
        warn!("User {user_id} tried to access ended meeting {meeting_id}");
        return Err(Error::forbidden("meeting has already ended"));
    }

    let membership = group::find_membership(db, meeting.group_id, user_id)
        .await?
        .ok_or_else(|| {
            warn!(
                "User {user_id} is not a member of group {}",
                meeting.group_id
            );
            Error::forbidden("user is not a member of the meeting's group")
        })?;

    Ok((user, meeting, membership))
}

async fn request_token(
    rooms: &dyn RoomProvider,
    meeting: &meetings::Model,
    user: &users::Model,
    membership: &group_members::Model,
) -> Result<AccessToken, Error> {
    let user_info = RoomUserInfo {
        id: format!("User#{}", user.id),
        name: user.name.clone(),
        role: membership.role.tag().to_string(),
    };

    rooms
        .issue_access_token(
            &room_id(meeting.group_id, meeting.id),
            &user.id.to_string(),
            &user_info,
        )
        .await
}

/// Removes the user's participation. The host can never leave their own meeting.
pub async fn leave(db: &DatabaseConnection, meeting_id: Id, user_id: Id) -> Result<(), Error> {
    let meeting = meeting::find_by_id(db, meeting_id).await?;
    let participation = meeting_participation::find_by_meeting_and_user(db, meeting_id, user_id)
        .await?
        .ok_or_else(Error::not_found)?;

    if meeting.creator_id == user_id {
        return Err(Error::forbidden("the host cannot leave the meeting"));
    }

    meeting_participation::delete_by_id(db, participation.id).await?;
    info!("User {user_id} left meeting {meeting_id}");
    Ok(())
}

pub async fn end(
    db: &DatabaseConnection,
    config: &Config,
    meeting_id: Id,
    caller_id: Id,
) -> Result<summaries::Model, Error> {
    let rooms = gateway::room_provider(config)?;
    let summarizer = gateway::summary_provider(config)?;
    let template = PromptTemplate::from_config(config)?;
    end_with(
        db,
        &rooms,
        summarizer.as_ref(),
        &template,
        meeting_id,
        caller_id,
    )
    .await
}

/// Ends the meeting and returns its summary.
///
/// Order matters: the room snapshot is fetched before the room is deleted, and nothing is
/// persisted unless the snapshot was fetched. A failed room deletion is logged and does not
/// stop the meeting from ending. The meeting row is locked while it is marked ended so that
/// concurrent calls cannot both succeed.
pub async fn end_with(
    db: &DatabaseConnection,
    rooms: &dyn RoomProvider,
    summarizer: &dyn SummaryProvider,
    template: &PromptTemplate,
    meeting_id: Id,
    caller_id: Id,
) -> Result<summaries::Model, Error> {
    let current = meeting::find_by_id(db, meeting_id).await?;
    if current.creator_id != caller_id {
        warn!("User {caller_id} tried to end meeting {meeting_id} without being its host");
        return Err(Error::forbidden("only the host can end the meeting"));
    }
    end_transition(current.clone(), Utc::now().into())?;

    let room = room_id(current.group_id, current.id);
    let snapshot = rooms.fetch_snapshot(&room).await.map_err(|err| {
        warn!("Not ending meeting {meeting_id}: snapshot of room {room} failed: {err}");
        err
    })?;

    if let Err(err) = rooms.delete_room(&room).await {
        warn!("Failed to delete room {room} while ending meeting {meeting_id}: {err}");
    }

    let now = Utc::now().into();
    let txn = db.begin().await?;
    let locked = meeting::find_by_id_for_update(&txn, meeting_id).await?;
    let ended = meeting::save_ended(&txn, end_transition(locked, now)?).await?;
    let note = note::upsert_for_meeting(&txn, meeting_id, snapshot, now).await?;
    txn.commit().await?;

    info!(
        "Meeting {} ended at {:?}, captured note {}",
        ended.id, ended.ended_at, note.id
    );

    summary::summarize_note(db, summarizer, template, &note).await
}
