use xcrud::{
    bson::{Document, doc},
    prelude::*,
};

use crate::support::{Fixture, int, ints, seeded};

async fn numbers() -> Fixture {
    seeded(
        (1..=6)
            .map(|n| doc! { "_id": n.to_string(), "n": n, "even": n % 2 == 0 })
            .collect(),
    )
    .await
}

fn ns(docs: &[Document]) -> Vec<i64> {
    ints(docs, "n")
}

#[tokio::test]
async fn sort_keys_keep_declaration_order() {
    let fx = numbers().await;

    fx.items
        .find_all()
        .sort("even DESC")
        .unwrap()
        .sort(["n", "x ASC"])
        .unwrap()
        .sort(vec!["n".to_string()])
        .unwrap()
        .execute()
        .await
        .unwrap();

    let sort: Vec<String> = fx.memory.requests().await[0]
        .sort
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(sort, vec!["even DESC", "n ASC", "x ASC", "n ASC"]);
}

#[tokio::test]
async fn pages_through_sorted_documents() {
    let fx = numbers().await;

    let mut page = fx.items
        .find_all()
        .sort("n DESC")
        .unwrap()
        .limit(2)
        .unwrap()
        .offset(1)
        .unwrap()
        .execute()
        .await
        .unwrap();

    assert_eq!(page.count(), 2);
    assert_eq!(ns(&page.fetch_all()), vec![5, 4]);
}

#[tokio::test]
async fn later_limit_offset_and_bind_win() {
    let fx = numbers().await;

    let mut result = fx.items
        .find("n > :min")
        .sort("n")
        .unwrap()
        .limit(1)
        .unwrap()
        .limit(3)
        .unwrap()
        .offset(4)
        .unwrap()
        .offset(1)
        .unwrap()
        .bind("min", 5)
        .unwrap()
        .bind("min", 1)
        .unwrap()
        .execute()
        .await
        .unwrap();

    let request = &fx.memory.requests().await[0];
    assert_eq!(request.limit, Some(3));
    assert_eq!(request.offset, Some(1));
    assert_eq!(request.bindings.get("min"), Some(&ExprValue::Int(1)));
    assert_eq!(ns(&result.fetch_all()), vec![3, 4, 5]);
}

#[tokio::test]
async fn limit_zero_returns_nothing() {
    let fx = numbers().await;

    let result = fx.items.find_all().limit(0).unwrap().execute().await.unwrap();

    assert_eq!(result.count(), 0);
    assert_eq!(result.remaining(), 0);
}

#[tokio::test]
async fn blank_filter_matches_everything() {
    let fx = numbers().await;

    let result = fx.items.find("   ").execute().await.unwrap();

    assert_eq!(result.count(), 6);
    assert_eq!(fx.memory.requests().await[0].filter, None);
}

#[tokio::test]
async fn unbound_parameters_fail_before_the_wire() {
    let fx = numbers().await;

    let err = fx.items
        .find("n > :min AND even = :flag")
        .bind("min", 1)
        .unwrap()
        .execute()
        .await
        .unwrap_err();

    assert_eq!(err, CrudError::UnresolvedBinding("flag".into()));
    assert!(fx.memory.frames().await.is_empty());
}

#[tokio::test]
async fn quoted_colons_are_not_parameters() {
    let fx = seeded(vec![doc! { "_id": "1", "label": "a:b" }]).await;

    let result = fx.items.find("label = 'a:b'").execute().await.unwrap();

    assert_eq!(result.count(), 1);
}

#[tokio::test]
async fn rebinding_executes_again_with_independent_results() {
    let fx = numbers().await;
    let mut find = fx.items
        .find("n >= :min")
        .sort("n")
        .unwrap()
        .bind("min", 5)
        .unwrap();

    let mut first = find.execute().await.unwrap();
    let mut find = find.bind("min", 3).unwrap();
    let mut second = find.execute().await.unwrap();

    assert_eq!(ns(&second.fetch_all()), vec![3, 4, 5, 6]);
    assert_eq!(ns(&first.fetch_all()), vec![5, 6]);
    assert_eq!(fx.memory.frames().await.len(), 2);
}

#[tokio::test]
async fn fetches_one_document_at_a_time() {
    let fx = numbers().await;
    let mut result = fx.items.find("n <= 2").sort("n").unwrap().execute().await.unwrap();

    assert_eq!(result.fetch_one().map(|doc| int(&doc, "n")), Some(1));
    assert_eq!(result.remaining(), 1);
    result.close();
    assert_eq!(result.fetch_one(), None);
    assert_eq!(result.count(), 2);
}

#[tokio::test]
async fn rejects_invalid_arguments() {
    let fx = numbers().await;

    assert!(matches!(fx.items.find_all().sort(""), Err(CrudError::InvalidArgument(_))));
    assert!(matches!(fx.items.find_all().sort(["n", "  "]), Err(CrudError::InvalidArgument(_))));
    assert!(matches!(fx.items.find_all().bind("1st", 1), Err(CrudError::InvalidArgument(_))));

    let err = fx.items.find_all().limit(u64::MAX).unwrap().execute().await.unwrap_err();
    assert!(matches!(err, CrudError::InvalidArgument(_)));
    assert!(fx.memory.frames().await.is_empty());
}

#[tokio::test]
async fn unsupported_filters_are_server_errors() {
    let fx = numbers().await;

    let err = fx.items.find("n IN (1, 2)").execute().await.unwrap_err();

    assert!(matches!(err, CrudError::Server { code: 5150, .. }));
    assert!(!err.is_pre_wire());
}
