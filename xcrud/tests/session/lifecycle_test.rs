use xcrud::{bson::doc, memory::InMemorySession, prelude::*};

use crate::support::{fixture, with_backend};

fn is_gone<T>(result: CrudResult<T>) -> bool {
    matches!(result, Err(CrudError::CollectionGone(_)))
}

#[tokio::test]
async fn builders_outliving_their_collection_fail() {
    let fx = fixture();
    let items = fx.session.schema("shop").collection("scratch");
    let mut find = items.find_all();
    let mut add = items.add(doc! { "a": 1 });
    drop(items);

    assert!(is_gone(find.execute().await));
    assert!(is_gone(add.execute().await));
    assert!(fx.memory.frames().await.is_empty());
}

#[tokio::test]
async fn builders_outliving_their_session_fail() {
    let fx = fixture();
    let mut remove = fx.items.remove_all();
    drop(fx.session);

    assert!(is_gone(remove.execute().await));
    assert!(fx.memory.frames().await.is_empty());
}

#[tokio::test]
async fn closing_rejects_later_executes() {
    let fx = fixture();
    fx.items.add(doc! { "a": 1 }).execute().await.unwrap();
    assert!(fx.session.is_open());

    fx.session.close().await;
    fx.session.close().await;

    assert!(!fx.session.is_open());
    assert!(is_gone(fx.items.find_all().execute().await));
    assert_eq!(fx.memory.frames().await.len(), 1);
}

#[tokio::test]
async fn closing_cancels_pending_executes() {
    let fx = fixture();
    fx.memory.stall(true);
    let mut find = fx.items.find_all();

    let (result, ()) = tokio::join!(find.execute(), async {
        while fx.memory.frames().await.is_empty() {
            tokio::task::yield_now().await;
        }
        fx.session.close().await;
    });

    assert_eq!(result.unwrap_err(), CrudError::Cancelled);
    assert!(is_gone(find.execute().await));
}

#[tokio::test]
async fn shutdown_stops_the_backend() {
    let fx = fixture();
    fx.items.add(doc! { "a": 1 }).execute().await.unwrap();

    fx.session.shutdown().await.unwrap();

    assert!(!SessionBackend::is_alive(&fx.memory));
    assert!(is_gone(fx.items.find_all().execute().await));
}

#[tokio::test]
async fn sessions_expose_their_backend_and_config() {
    let fx = fixture();

    assert!(fx.session.backend::<InMemorySession>().is_some());
    assert_eq!(fx.session.config().default_schema.as_deref(), Some("shop"));
    assert_eq!(fx.session.default_schema().unwrap().name(), "shop");
    assert_eq!(fx.items.schema_name(), "shop");
    assert_eq!(fx.items.name(), "items");
}

#[tokio::test]
async fn sessions_can_be_configured_from_json() {
    let config = SessionConfig::from_json_str(r#"{ "default_schema": "depot", "max_allowed_packet": 4096 }"#).unwrap();
    let session = Session::builder(InMemorySession::new()).config(config).build().unwrap();

    assert_eq!(session.config().max_allowed_packet, 4096);
    assert_eq!(session.default_schema().unwrap().name(), "depot");

    assert!(matches!(
        SessionConfig::from_json_str(r#"{ "max_allowed_packet": 0 }"#),
        Err(CrudError::InvalidArgument(_))
    ));
    assert!(matches!(
        Session::builder(InMemorySession::new()).default_schema(" ").build(),
        Err(CrudError::InvalidArgument(_))
    ));
}

#[tokio::test]
async fn default_schema_must_be_configured() {
    let session = Session::new(InMemorySession::new());

    assert!(matches!(session.default_schema(), Err(CrudError::InvalidArgument(_))));
}

#[tokio::test]
async fn collections_of_one_session_share_the_backend() {
    let memory = InMemorySession::new();
    let fx = with_backend(memory.clone());
    let other = fx.session.schema("depot").collection("items");

    fx.items.add(doc! { "a": 1 }).execute().await.unwrap();
    other.add(doc! { "a": 2 }).execute().await.unwrap();

    assert_eq!(memory.documents("shop", "items").await.len(), 1);
    assert_eq!(memory.documents("depot", "items").await.len(), 1);
    let sequences: Vec<u64> = memory.frames().await.iter().map(|frame| frame.sequence).collect();
    assert!(sequences[0] < sequences[1]);
}
