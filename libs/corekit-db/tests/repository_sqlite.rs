#![allow(clippy::unwrap_used, clippy::expect_used)]

#[cfg(feature = "sqlite")]
mod common;

#[cfg(feature = "sqlite")]
mod sqlite_repository_tests {
    use corekit_db::RequestContext;
    use corekit_errors::{ErrorKind, StatusRegistry};
    use http::StatusCode;
    use sea_orm::{ActiveValue::Set, IntoActiveModel};

    use super::common::{count_notes, note, setup};

    #[tokio::test]
    async fn standalone_create_is_visible_immediately() {
        let (_handle, repo) = setup().await;
        let ctx = RequestContext::new();

        let created = repo.create(&ctx, note("A", "body")).await.unwrap();

        assert_eq!(created.code, "A");
        let found = repo.find_by_id(&ctx, created.id).await.unwrap();
        assert_eq!(found, Some(created));
    }

    #[tokio::test]
    async fn find_by_id_reports_absence_as_none() {
        let (_handle, repo) = setup().await;
        let found = repo.find_by_id(&RequestContext::new(), 404).await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn update_persists_changes() {
        let (_handle, repo) = setup().await;
        let ctx = RequestContext::new();
        let created = repo.create(&ctx, note("A", "old")).await.unwrap();

        let mut active = created.clone().into_active_model();
        active.body = Set("new".to_owned());
        let updated = repo.update(&ctx, active).await.unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.body, "new");
        let stored = repo.find_by_id(&ctx, created.id).await.unwrap().unwrap();
        assert_eq!(stored.body, "new");
    }

    #[tokio::test]
    async fn update_of_missing_row_is_not_found() {
        let (_handle, repo) = setup().await;
        let ghost = super::common::note::Model {
            id: 999,
            code: "GHOST".to_owned(),
            body: "nobody".to_owned(),
        };

        let err = repo
            .update(&RequestContext::new(), ghost.into_active_model())
            .await
            .unwrap_err();

        assert_eq!(err.code(), "NOT_FOUND");
        assert_eq!(err.kind(), ErrorKind::Persistent);
    }

    #[tokio::test]
    async fn delete_removes_row_and_tolerates_missing_rows() {
        let (_handle, repo) = setup().await;
        let ctx = RequestContext::new();
        let created = repo.create(&ctx, note("A", "body")).await.unwrap();

        let removed = repo
            .delete(&ctx, created.clone().into_active_model())
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(count_notes(repo.db()).await, 0);

        let removed = repo.delete(&ctx, created.into_active_model()).await.unwrap();
        assert_eq!(removed, 0);
    }

    #[tokio::test]
    async fn duplicate_key_is_a_persistent_conflict() {
        let (_handle, repo) = setup().await;
        let ctx = RequestContext::new();
        repo.create(&ctx, note("DUP", "first")).await.unwrap();

        let err = repo.create(&ctx, note("DUP", "second")).await.unwrap_err();

        assert_eq!(err.code(), "DB_CONFLICT");
        assert_eq!(err.kind(), ErrorKind::Persistent);
        assert!(!err.is_retryable());
        let constraint = err
            .details()
            .get("constraint")
            .and_then(|v| v.as_str())
            .unwrap();
        assert!(constraint.contains("code"), "constraint was {constraint:?}");
        assert!(err.cause().is_some());
    }

    #[tokio::test]
    async fn duplicate_key_resolves_through_registry() {
        let (_handle, repo) = setup().await;
        let ctx = RequestContext::new();
        repo.create(&ctx, note("DUP", "first")).await.unwrap();
        let err = repo.create(&ctx, note("DUP", "second")).await.unwrap_err();

        let registry = StatusRegistry::with_defaults();
        assert_eq!(registry.resolve(&err), StatusCode::BAD_REQUEST);

        registry.register("DB_CONFLICT", StatusCode::CONFLICT);
        assert_eq!(registry.resolve(&err), StatusCode::CONFLICT);

        let problem = registry.problem(&err);
        let body = serde_json::to_string(&problem).unwrap();
        assert!(body.contains("\"code\":\"DB_CONFLICT\""));
        assert!(!body.contains("UNIQUE constraint failed"));
    }

    #[tokio::test]
    async fn conflict_inside_unit_rolls_back_earlier_writes() {
        let (_handle, repo) = setup().await;
        let ctx = RequestContext::new();
        repo.create(&ctx, note("TAKEN", "existing")).await.unwrap();

        let err = repo
            .db()
            .atomic(&ctx, |tx| {
                let repo = &repo;
                async move {
                    repo.create(&tx, note("FRESH", "fresh")).await?;
                    repo.create(&tx, note("TAKEN", "clash")).await?;
                    Ok(())
                }
            })
            .await
            .unwrap_err();

        assert_eq!(err.code(), "DB_CONFLICT");
        assert_eq!(count_notes(repo.db()).await, 1);
    }

    #[tokio::test]
    async fn sibling_contexts_do_not_share_transactions() {
        let (_handle, repo) = setup().await;
        let db = repo.db();
        let parent = RequestContext::new();
        let (left, right) = (parent.child(), parent.child());

        let (a, b) = tokio::join!(
            db.atomic(&left, |tx| {
                let repo = &repo;
                async move {
                    repo.create(&tx, note("LEFT", "left")).await?;
                    Ok(tx.transaction_id())
                }
            }),
            db.atomic(&right, |tx| {
                let repo = &repo;
                async move {
                    repo.create(&tx, note("RIGHT", "right")).await?;
                    Ok(tx.transaction_id())
                }
            }),
        );

        let (a, b) = (a.unwrap(), b.unwrap());
        assert!(a.is_some() && b.is_some());
        assert_ne!(a, b);
        assert!(parent.transaction_id().is_none());
        assert!(left.transaction_id().is_none());
        assert!(right.transaction_id().is_none());
        assert_eq!(count_notes(db).await, 2);
    }

    #[tokio::test]
    async fn detached_context_leaves_the_ambient_transaction() {
        let (_handle, repo) = setup().await;
        let parent = RequestContext::new();

        let (inside, detached) = repo
            .db()
            .atomic(&parent, |tx| async move {
                Ok((tx.transaction_id(), tx.detached().transaction_id()))
            })
            .await
            .unwrap();

        assert!(inside.is_some());
        assert!(detached.is_none());
    }
}
