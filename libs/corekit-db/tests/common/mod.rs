#![allow(clippy::unwrap_used, clippy::expect_used)]
#![allow(dead_code)]

use corekit_db::{BaseRepository, ConnectOpts, Db, DbHandle, RequestContext};
use sea_orm::{ConnectionTrait, EntityTrait, Schema, Set};

pub mod note {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "notes")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i32,
        #[sea_orm(unique)]
        pub code: String,
        pub body: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

pub type NoteRepo = BaseRepository<note::Entity>;

/// In-memory database with the `notes` table. One pooled connection keeps
/// the schema alive for the whole test.
pub async fn setup() -> (DbHandle, NoteRepo) {
    let opts = ConnectOpts {
        max_conns: Some(1),
        min_conns: Some(1),
        ..ConnectOpts::default()
    };
    let handle = DbHandle::connect("sqlite::memory:", &opts)
        .await
        .expect("Failed to connect to database");

    let conn = handle.sea();
    let backend = conn.get_database_backend();
    let stmt = Schema::new(backend).create_table_from_entity(note::Entity);
    conn.execute(backend.build(&stmt))
        .await
        .expect("Failed to create table");

    let repo = BaseRepository::new(handle.db());
    (handle, repo)
}

pub fn note(code: &str, body: &str) -> note::ActiveModel {
    note::ActiveModel {
        code: Set(code.to_owned()),
        body: Set(body.to_owned()),
        ..Default::default()
    }
}

pub async fn count_notes(db: &Db) -> usize {
    db.find_all(&RequestContext::new(), note::Entity::find())
        .await
        .expect("Failed to count notes")
        .len()
}
