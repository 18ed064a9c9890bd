use xcrud::{
    bson::{Bson, doc},
    prelude::*,
};

use crate::support::{Fixture, int, seeded};

async fn catalog() -> Fixture {
    seeded(vec![
        doc! { "_id": "1", "name": "lamp", "price": 30, "tags": ["home"] },
        doc! { "_id": "2", "name": "desk", "price": 120, "tags": ["office", "wood"] },
    ])
    .await
}

#[tokio::test]
async fn applies_updates_to_matching_documents() {
    let fx = catalog().await;

    let result = fx.items
        .modify("name = :name")
        .set("price", param("price"))
        .unwrap()
        .set("meta.updated", true)
        .unwrap()
        .array_insert("tags[0]", "sale")
        .unwrap()
        .array_delete("tags[1]")
        .unwrap()
        .bind("name", "lamp")
        .unwrap()
        .bind("price", 25)
        .unwrap()
        .execute()
        .await
        .unwrap();

    assert_eq!(result.count(), 1);

    let docs = fx.memory.documents("shop", "items").await;
    assert_eq!(int(&docs[0], "price"), 25);
    assert_eq!(docs[0].get_document("meta").unwrap().get_bool("updated").unwrap(), true);
    assert_eq!(docs[0].get_array("tags").unwrap(), &vec![Bson::String("sale".into())]);
    assert_eq!(int(&docs[1], "price"), 120);
}

#[tokio::test]
async fn update_steps_follow_the_filter_in_declaration_order() {
    let fx = catalog().await;

    fx.items
        .modify("price > 10")
        .sort("price")
        .unwrap()
        .set("a", 1)
        .unwrap()
        .limit(1)
        .unwrap()
        .unset("b")
        .unwrap()
        .array_append("tags", expr("name"))
        .unwrap()
        .execute()
        .await
        .unwrap();

    let request = &fx.memory.requests().await[0];
    let paths: Vec<&str> = request.updates.iter().map(|step| step.path().as_str()).collect();
    assert_eq!(paths, vec!["a", "b", "tags"]);
    assert_eq!(request.limit, Some(1));

    // Only the cheapest document is touched.
    let docs = fx.memory.documents("shop", "items").await;
    assert_eq!(
        docs[0].get_array("tags").unwrap(),
        &vec![Bson::String("home".into()), Bson::String("lamp".into())]
    );
    assert!(docs[1].get("a").is_none());
}

#[tokio::test]
async fn modify_all_touches_every_document() {
    let fx = catalog().await;

    let result = fx.items.modify_all().set("stock", 0).unwrap().execute().await.unwrap();

    assert_eq!(result.count(), 2);
    assert_eq!(fx.memory.requests().await[0].filter, None);
}

#[tokio::test]
async fn parameters_in_update_values_must_be_bound() {
    let fx = catalog().await;

    let err = fx.items
        .modify_all()
        .set("price", expr(":base + 1"))
        .unwrap()
        .execute()
        .await
        .unwrap_err();
    assert_eq!(err, CrudError::UnresolvedBinding("base".into()));

    let err = fx.items
        .modify_all()
        .array_append("tags", vec![param("first"), param("second")])
        .unwrap()
        .bind("first", "x")
        .unwrap()
        .execute()
        .await
        .unwrap_err();
    assert_eq!(err, CrudError::UnresolvedBinding("second".into()));

    assert!(fx.memory.frames().await.is_empty());
}

#[tokio::test]
async fn rejects_bad_paths() {
    let fx = catalog().await;

    assert!(matches!(fx.items.modify_all().set("", 1), Err(CrudError::InvalidArgument(_))));
    assert!(matches!(fx.items.modify_all().set("a..b", 1), Err(CrudError::InvalidArgument(_))));
    assert!(matches!(fx.items.modify_all().unset("tags[*]"), Err(CrudError::InvalidArgument(_))));
    assert!(matches!(fx.items.modify_all().array_insert("tags", 1), Err(CrudError::InvalidArgument(_))));
    assert!(matches!(fx.items.modify_all().array_delete("tags"), Err(CrudError::InvalidArgument(_))));
}

#[tokio::test]
async fn modify_without_updates_is_rejected() {
    let fx = catalog().await;

    let err = fx.items.modify("price > 1").execute().await.unwrap_err();

    assert!(matches!(err, CrudError::InvalidArgument(_)));
    assert!(fx.memory.frames().await.is_empty());
}

#[tokio::test]
async fn id_cannot_be_modified() {
    let fx = catalog().await;

    let err = fx.items.modify_all().set("_id", "x").unwrap().execute().await.unwrap_err();

    assert!(matches!(err, CrudError::Server { code: 5053, .. }));
}

#[tokio::test]
async fn only_bind_may_follow_an_execute() {
    let fx = catalog().await;
    let mut modify = fx.items.modify("name = :name").set("price", 1).unwrap().bind("name", "lamp").unwrap();
    modify.execute().await.unwrap();

    let mut modify = modify.bind("name", "desk").unwrap();
    modify.execute().await.unwrap();
    assert!(matches!(modify.set("price", 2), Err(CrudError::StageMisuse(_))));

    let docs = fx.memory.documents("shop", "items").await;
    assert_eq!(int(&docs[0], "price"), 1);
    assert_eq!(int(&docs[1], "price"), 1);
}

#[tokio::test]
async fn rebinding_does_not_reopen_updates() {
    let fx = catalog().await;
    let mut modify = fx.items.modify("name = :name").set("price", 1).unwrap().bind("name", "lamp").unwrap();
    modify.execute().await.unwrap();

    let modify = modify.bind("name", "desk").unwrap();
    assert!(matches!(modify.set("price", 99), Err(CrudError::StageMisuse(_))));

    let mut modify = fx.items.modify_all().set("stock", 0).unwrap();
    modify.execute().await.unwrap();
    let modify = modify.bind("unused", 1).unwrap();
    assert!(matches!(modify.unset("stock"), Err(CrudError::StageMisuse(_))));

    assert_eq!(fx.memory.frames().await.len(), 2);
    let docs = fx.memory.documents("shop", "items").await;
    assert_eq!(int(&docs[1], "price"), 120);
}

#[tokio::test]
async fn invalid_param_names_fail_fast() {
    let fx = catalog().await;

    assert!(matches!(
        fx.items.modify_all().set("price", param("9bad")),
        Err(CrudError::InvalidArgument(_))
    ));
    assert!(matches!(
        fx.items.modify_all().array_append("tags", vec![param("ok"), param("not-ok")]),
        Err(CrudError::InvalidArgument(_))
    ));
    assert!(matches!(
        fx.items.modify_all().bind("value", param("")),
        Err(CrudError::InvalidArgument(_))
    ));
    assert!(fx.memory.frames().await.is_empty());
}
