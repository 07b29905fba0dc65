//! Access and validation gates: who may clone what, and which roots are
//! rejected before anything is written.

use cadence_db::test_fixtures::{artist_in, ContentBuilder, ProgramGraph};
use cadence_db::{
    AccessContext, CloneManager, CloneRequest, EntityKind, Error, HubGate, LibraryAttributes,
    MemoryContentStore, ProgramAttributes, Ref, SequenceAttributes, UserRole,
};
use uuid::Uuid;

struct World {
    store: MemoryContentStore,
    account: Uuid,
    library: Uuid,
    graph: ProgramGraph,
    foreign_account: Uuid,
    foreign_library: Uuid,
    deleted_program: Uuid,
}

fn world() -> World {
    let store = MemoryContentStore::new();
    let mut content = ContentBuilder::new();
    let account = content.account("Aural");
    let library = content.library(account, "Beats");
    let graph = ProgramGraph::build(&mut content, library);
    let deleted_program = content.program(library, "Retired");
    content.delete(deleted_program);
    let foreign_account = content.account("Elsewhere");
    let foreign_library = content.library(foreign_account, "Theirs");
    content.seed_memory(&store).unwrap();
    World {
        store,
        account,
        library,
        graph,
        foreign_account,
        foreign_library,
        deleted_program,
    }
}

fn manager(store: &MemoryContentStore) -> CloneManager<MemoryContentStore, HubGate> {
    CloneManager::new(store.clone(), HubGate::new())
}

#[tokio::test]
async fn test_artist_clones_within_own_account() {
    let w = world();
    let result = manager(&w.store)
        .clone_program(&artist_in(w.account), CloneRequest::verbatim(w.graph.program))
        .await;
    assert!(result.is_ok(), "{:?}", result.err());
}

#[tokio::test]
async fn test_missing_source_is_not_found() {
    let w = world();
    let err = manager(&w.store)
        .clone_program(
            &AccessContext::internal(),
            CloneRequest::verbatim(Uuid::from_u128(404)),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    assert!(err.is_client_error());
}

#[tokio::test]
async fn test_soft_deleted_source_is_not_found() {
    let w = world();
    let err = manager(&w.store)
        .clone_program(
            &AccessContext::internal(),
            CloneRequest::verbatim(w.deleted_program),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn test_unreadable_source_is_reported_as_not_found() {
    let w = world();
    let before = w.store.total_rows().unwrap();
    let err = manager(&w.store)
        .clone_program(
            &artist_in(w.foreign_account),
            CloneRequest::verbatim(w.graph.program),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)), "{:?}", err);
    assert_eq!(w.store.total_rows().unwrap(), before);
}

#[tokio::test]
async fn test_reader_without_artist_role_is_forbidden() {
    let w = world();
    let reader = AccessContext::for_accounts(Uuid::from_u128(7), vec![w.account], vec![UserRole::User]);
    let err = manager(&w.store)
        .clone_program(&reader, CloneRequest::verbatim(w.graph.program))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Forbidden(_)), "{:?}", err);
    assert_eq!(w.store.insert_attempts(), 0);
}

#[tokio::test]
async fn test_writing_into_foreign_library_is_forbidden() {
    let w = world();
    let err = manager(&w.store)
        .clone_program(
            &artist_in(w.account),
            CloneRequest::new(w.graph.program, ProgramAttributes::in_library(w.foreign_library)),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Forbidden(_)), "{:?}", err);
    assert_eq!(w.store.count(EntityKind::Program).unwrap(), 2);
}

#[tokio::test]
async fn test_admin_may_copy_across_accounts() {
    let w = world();
    let admin = AccessContext::for_accounts(Uuid::from_u128(7), Vec::new(), vec![UserRole::Admin]);
    let cloned = manager(&w.store)
        .clone_library(
            &admin,
            CloneRequest::new(
                w.library,
                LibraryAttributes {
                    account_id: Some(w.foreign_account),
                    ..Default::default()
                },
            ),
        )
        .await
        .unwrap();
    assert_eq!(
        cloned.root.reference(Ref::AccountId),
        Some(w.foreign_account)
    );
}

#[tokio::test]
async fn test_invalid_root_is_rejected_before_any_write() {
    let w = world();
    let err = manager(&w.store)
        .clone_program(
            &AccessContext::internal(),
            CloneRequest::new(
                w.graph.program,
                ProgramAttributes {
                    tempo: Some(0.0),
                    ..Default::default()
                },
            ),
        )
        .await
        .unwrap_err();
    match err {
        Error::Validation(message) => assert_eq!(message, "Tempo must be a non-zero number"),
        other => panic!("expected validation error, got {:?}", other),
    }
    assert_eq!(w.store.insert_attempts(), 0);
}

#[tokio::test]
async fn test_sequence_total_must_stay_positive() {
    let w = world();
    let err = manager(&w.store)
        .clone_sequence(
            &AccessContext::internal(),
            CloneRequest::new(
                w.graph.verse,
                SequenceAttributes {
                    total: Some(0),
                    ..Default::default()
                },
            ),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

#[tokio::test]
async fn test_clone_into_missing_library_is_not_found() {
    let w = world();
    let err = manager(&w.store)
        .clone_program(
            &AccessContext::internal(),
            CloneRequest::new(w.graph.program, ProgramAttributes::in_library(Uuid::from_u128(404))),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}
