use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        db.execute_unprepared(
            "CREATE TYPE spreado.group_role AS ENUM (
                'pm',
                'pd',
                'fe',
                'be',
                'ai'
            )",
        )
        .await?;

        db.execute_unprepared(
            "CREATE TYPE spreado.meeting_status AS ENUM (
                'ongoing',
                'ended'
            )",
        )
        .await?;

        let create_users_sql = r#"
            CREATE TABLE IF NOT EXISTS spreado.users (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                name VARCHAR(255) NOT NULL,
                email VARCHAR(255) NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

                CONSTRAINT users_email_unique UNIQUE(email)
            )
        "#;
        db.execute_unprepared(create_users_sql).await?;

        let create_groups_sql = r#"
            CREATE TABLE IF NOT EXISTS spreado.groups (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                name VARCHAR(255) NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
        "#;
        db.execute_unprepared(create_groups_sql).await?;

        let create_group_members_sql = r#"
            CREATE TABLE IF NOT EXISTS spreado.group_members (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                group_id UUID NOT NULL
                    REFERENCES spreado.groups(id) ON DELETE CASCADE,
                user_id UUID NOT NULL
                    REFERENCES spreado.users(id) ON DELETE CASCADE,
                role spreado.group_role NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

                CONSTRAINT group_members_group_user_unique UNIQUE(group_id, user_id)
            )
        "#;
        db.execute_unprepared(create_group_members_sql).await?;

        // Meeting ids are allocated by the application before the room is provisioned
        let create_meetings_sql = r#"
            CREATE TABLE IF NOT EXISTS spreado.meetings (
                id UUID PRIMARY KEY,
                group_id UUID NOT NULL
                    REFERENCES spreado.groups(id) ON DELETE CASCADE,
                creator_id UUID NOT NULL
                    REFERENCES spreado.users(id),
                title VARCHAR(255) NOT NULL,
                status spreado.meeting_status NOT NULL DEFAULT 'ongoing',
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                ended_at TIMESTAMPTZ
            )
        "#;
        db.execute_unprepared(create_meetings_sql).await?;

        let create_participations_sql = r#"
            CREATE TABLE IF NOT EXISTS spreado.meeting_participations (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                meeting_id UUID NOT NULL
                    REFERENCES spreado.meetings(id) ON DELETE CASCADE,
                user_id UUID NOT NULL
                    REFERENCES spreado.users(id) ON DELETE CASCADE,
                joined_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

                CONSTRAINT meeting_participations_meeting_user_unique UNIQUE(meeting_id, user_id)
            )
        "#;
        db.execute_unprepared(create_participations_sql).await?;

        let create_notes_sql = r#"
            CREATE TABLE IF NOT EXISTS spreado.notes (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                meeting_id UUID NOT NULL
                    REFERENCES spreado.meetings(id) ON DELETE CASCADE,
                content JSONB NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

                CONSTRAINT notes_meeting_unique UNIQUE(meeting_id)
            )
        "#;
        db.execute_unprepared(create_notes_sql).await?;

        let create_summaries_sql = r#"
            CREATE TABLE IF NOT EXISTS spreado.summaries (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                note_id UUID NOT NULL
                    REFERENCES spreado.notes(id) ON DELETE CASCADE,
                summary_json JSONB NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

                CONSTRAINT summaries_note_unique UNIQUE(note_id)
            )
        "#;
        db.execute_unprepared(create_summaries_sql).await?;

        // Lookups the meeting core runs on every request
        db.execute_unprepared(
            "CREATE INDEX IF NOT EXISTS meetings_group_created_at_idx
                ON spreado.meetings (group_id, created_at DESC)",
        )
        .await?;

        db.execute_unprepared(
            "CREATE INDEX IF NOT EXISTS meeting_participations_user_idx
                ON spreado.meeting_participations (user_id)",
        )
        .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        for table in [
            "summaries",
            "notes",
            "meeting_participations",
            "meetings",
            "group_members",
            "groups",
            "users",
        ] {
            db.execute_unprepared(&format!("DROP TABLE IF EXISTS spreado.{table}"))
                .await?;
        }

        db.execute_unprepared("DROP TYPE IF EXISTS spreado.meeting_status")
            .await?;
        db.execute_unprepared("DROP TYPE IF EXISTS spreado.group_role")
            .await?;

        Ok(())
    }
}
