use xcrud::{
    bson::doc,
    prelude::*,
};

use crate::support::{Fixture, ints, seeded};

async fn prices() -> Fixture {
    seeded(vec![
        doc! { "_id": "a", "price": 30, "kind": "lamp" },
        doc! { "_id": "b", "price": 120, "kind": "desk" },
        doc! { "_id": "c", "price": 15, "kind": "lamp" },
        doc! { "_id": "d", "price": 60, "kind": "chair" },
    ])
    .await
}

#[tokio::test]
async fn removes_matching_documents() {
    let fx = prices().await;

    let result = fx.items.remove("kind = 'lamp'").execute().await.unwrap();

    assert_eq!(result.kind(), CrudKind::Remove);
    assert_eq!(result.count(), 2);
    assert_eq!(ints(&fx.memory.documents("shop", "items").await, "price"), vec![120, 60]);
}

#[tokio::test]
async fn removes_the_first_rows_in_sort_order() {
    let fx = prices().await;

    let result = fx.items
        .remove_all()
        .sort("price DESC")
        .unwrap()
        .limit(2)
        .unwrap()
        .execute()
        .await
        .unwrap();

    assert_eq!(result.count(), 2);
    assert_eq!(ints(&fx.memory.documents("shop", "items").await, "price"), vec![30, 15]);
}

#[tokio::test]
async fn remove_all_sends_no_filter() {
    let fx = prices().await;

    fx.items.remove_all().execute().await.unwrap();

    assert_eq!(fx.memory.requests().await[0].filter, None);
    assert!(fx.memory.documents("shop", "items").await.is_empty());
}

#[tokio::test]
async fn rebinding_removes_again() {
    let fx = prices().await;
    let mut remove = fx.items.remove("kind = :kind").bind("kind", "desk").unwrap();

    assert_eq!(remove.execute().await.unwrap().count(), 1);
    assert!(matches!(remove.execute().await, Err(CrudError::StageMisuse(_))));

    let mut remove = remove.bind("kind", "chair").unwrap();
    assert_eq!(remove.execute().await.unwrap().count(), 1);
    assert_eq!(fx.memory.documents("shop", "items").await.len(), 2);
}

#[tokio::test]
async fn unbound_parameters_fail_before_the_wire() {
    let fx = prices().await;

    let err = fx.items.remove("price < :max").limit(1).unwrap().execute().await.unwrap_err();

    assert_eq!(err, CrudError::UnresolvedBinding("max".into()));
    assert!(err.is_pre_wire());
    assert_eq!(fx.memory.documents("shop", "items").await.len(), 4);
}
