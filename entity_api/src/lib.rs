use chrono::Utc;
use log::*;
use sea_orm::{DatabaseConnection, TransactionTrait};

pub use entity::{
    group_members, group_role, groups, meeting_participations, meeting_status, meetings, notes,
    summaries, users, Id,
};

pub mod error;
pub mod group;
pub mod meeting;
pub mod meeting_participation;
pub mod note;
pub mod summary;
pub mod user;

/// Inserts a small set of users and a group with one member per role so that a local
/// environment can create and join meetings right away.
pub async fn seed_database(db: &DatabaseConnection) -> Result<(), error::Error> {
    let now = Utc::now().into();
    let txn = db.begin().await?;

    let group = group::create(&txn, "Spreado".to_owned(), now).await?;
    info!("Seeded group {} ({})", group.name, group.id);

    let members = [
        ("Minji Park", "minji@spreado.dev", group_role::GroupRole::Pm),
        ("Haeun Lee", "haeun@spreado.dev", group_role::GroupRole::Pd),
        ("Seojun Kim", "seojun@spreado.dev", group_role::GroupRole::Fe),
        ("Dohyun Choi", "dohyun@spreado.dev", group_role::GroupRole::Be),
        ("Yuna Jung", "yuna@spreado.dev", group_role::GroupRole::Ai),
    ];

    for (name, email, role) in members {
        let user = user::create(&txn, name.to_owned(), email.to_owned(), now).await?;
        group::add_member(&txn, group.id, user.id, role, now).await?;
        info!("Seeded user {} <{}> as {}", user.name, user.email, role);
    }

    txn.commit().await?;
    Ok(())
}
