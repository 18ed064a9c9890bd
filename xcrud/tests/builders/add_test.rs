use serde::Deserialize;
use serde_json::json;
use xcrud::{
    bson::doc,
    prelude::*,
};

use crate::support::{fixture, ints};

#[derive(Debug, Deserialize, PartialEq)]
struct Item {
    name: String,
    price: i64,
}

#[tokio::test]
async fn keeps_documents_in_call_order() {
    let fx = fixture();
    let mut add = fx.items.add_op().add(r#"{"n": 0}"#);
    for n in 1..5 {
        add = if n % 2 == 0 {
            add.add(format!(r#"{{"n": {n}}}"#)).unwrap()
        } else {
            add.add(doc! { "n": n }).unwrap()
        };
    }

    add.execute().await.unwrap();

    let request = &fx.memory.requests().await[0];
    assert_eq!(ints(&request.docs, "n"), vec![0, 1, 2, 3, 4]);
}

#[tokio::test]
async fn accepts_json_values_and_serializable_types() {
    let fx = fixture();

    #[derive(serde::Serialize)]
    struct NewItem<'a> {
        name: &'a str,
        price: i64,
    }

    let result = fx.items
        .add(json!({ "name": "lamp", "price": 30 }))
        .add(DocSource::from_serialize(&NewItem { name: "desk", price: 120 }).unwrap())
        .unwrap()
        .execute()
        .await
        .unwrap();

    assert_eq!(result.count(), 2);
    assert_eq!(result.generated_ids().len(), 2);

    let mut found = fx.items.find_all().sort("price").unwrap().execute().await.unwrap();
    let items: Vec<Item> = found.fetch_all_as().unwrap();
    assert_eq!(
        items,
        vec![
            Item { name: "lamp".into(), price: 30 },
            Item { name: "desk".into(), price: 120 },
        ]
    );
}

#[tokio::test]
async fn reports_only_generated_ids() {
    let fx = fixture();

    let result = fx.items
        .add(doc! { "_id": "own", "a": 1 })
        .add(doc! { "a": 2 })
        .unwrap()
        .execute()
        .await
        .unwrap();

    assert_eq!(result.count(), 2);
    assert_eq!(result.generated_ids().len(), 1);
    assert_ne!(result.generated_ids()[0], "own");

    let stored = fx.memory.documents("shop", "items").await;
    assert_eq!(stored[0].get_str("_id").unwrap(), "own");
    assert_eq!(stored[1].get_str("_id").unwrap(), result.generated_ids()[0]);
}

#[tokio::test]
async fn identical_builders_encode_identical_payloads() {
    let fx = fixture();
    let docs = vec![r#"{"b": 2, "a": [1, 2]}"#, r#"{"c": {"d": null}}"#];

    fx.items.add_all(docs.clone()).execute().await.unwrap();
    fx.items.add_all(docs).execute().await.unwrap();

    let payloads = fx.memory.payloads().await;
    assert_eq!(payloads.len(), 2);
    assert_eq!(payloads[0], payloads[1]);
}

#[tokio::test]
async fn malformed_json_fails_before_the_wire() {
    let fx = fixture();

    for bad in [r#"{"a": "#, "[1, 2]", "42"] {
        let err = fx.items.add(r#"{"ok": 1}"#).add(bad).unwrap().execute().await.unwrap_err();
        assert!(matches!(err, CrudError::InvalidArgument(_)), "{bad}: {err:?}");
    }

    assert!(fx.memory.frames().await.is_empty());
}

#[tokio::test]
async fn duplicate_ids_surface_as_server_errors() {
    let fx = fixture();
    fx.items.add(doc! { "_id": "x" }).execute().await.unwrap();

    let err = fx.items.add(doc! { "_id": "x" }).execute().await.unwrap_err();

    assert!(matches!(err, CrudError::Server { code: 5116, .. }));
    assert_eq!(fx.memory.documents("shop", "items").await.len(), 1);
}

#[tokio::test]
async fn executed_add_rejects_more_documents() {
    let fx = fixture();
    let mut add = fx.items.add(doc! { "a": 1 });
    add.execute().await.unwrap();

    assert!(matches!(add.execute().await, Err(CrudError::StageMisuse(_))));
    assert!(matches!(add.add(doc! { "a": 2 }), Err(CrudError::StageMisuse(_))));
    assert_eq!(fx.memory.frames().await.len(), 1);
}

#[tokio::test]
async fn failed_add_can_be_retried() {
    let fx = fixture();
    let mut add = fx.items.add(r#"{"a": 1}"#).add(doc! { "a": 2 }).unwrap();

    fx.memory.fail_next(CrudError::Transport("connection reset".into())).await;
    assert_eq!(
        add.execute().await.unwrap_err(),
        CrudError::Transport("connection reset".into())
    );

    let result = add.execute().await.unwrap();
    assert_eq!(result.count(), 2);

    let requests = fx.memory.requests().await;
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].docs, requests[1].docs);
    assert_eq!(ints(&fx.memory.documents("shop", "items").await, "a"), vec![1, 2]);
}
