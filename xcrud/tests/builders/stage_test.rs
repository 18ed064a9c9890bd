use xcrud::{
    bson::doc,
    prelude::*,
};

use crate::support::fixture;

fn is_misuse<T>(result: CrudResult<T>) -> bool {
    matches!(result, Err(CrudError::StageMisuse(_)))
}

#[tokio::test]
async fn non_bind_mutations_after_execute_are_rejected() {
    let fx = fixture();

    let mut find = fx.items.find_all();
    find.execute().await.unwrap();
    assert!(is_misuse(find.sort("a")));

    let mut find = fx.items.find_all().limit(1).unwrap();
    find.execute().await.unwrap();
    assert!(is_misuse(find.offset(1)));

    let mut remove = fx.items.remove_all();
    remove.execute().await.unwrap();
    assert!(is_misuse(remove.limit(1)));

    let mut modify = fx.items.modify_all().unset("a").unwrap();
    modify.execute().await.unwrap();
    assert!(is_misuse(modify.array_append("b", 1)));

    let mut add = fx.items.add(doc! { "a": 1 });
    add.execute().await.unwrap();
    assert!(is_misuse(add.add_all([doc! { "a": 2 }])));

    assert_eq!(fx.memory.frames().await.len(), 5);
}

#[tokio::test]
async fn bind_reopens_a_paged_find() {
    let fx = fixture();
    let mut find = fx.items.find_all().limit(5).unwrap().offset(0).unwrap();

    find.execute().await.unwrap();
    assert!(is_misuse(find.execute().await));

    let mut find = find.bind("unused", 1).unwrap();
    find.execute().await.unwrap();
    assert!(is_misuse(find.execute().await));

    assert_eq!(fx.memory.frames().await.len(), 2);
}

#[tokio::test]
async fn failed_execute_can_be_repeated_after_binding() {
    let fx = fixture();
    let mut find = fx.items.find("a = :a");

    assert_eq!(find.execute().await.unwrap_err(), CrudError::UnresolvedBinding("a".into()));

    let mut find = find.bind("a", 1).unwrap();
    assert_eq!(find.execute().await.unwrap().count(), 0);
}

#[tokio::test]
async fn binding_values_reach_the_wire_unchanged() {
    let fx = fixture();

    fx.items
        .find_all()
        .bind("null", ())
        .unwrap()
        .bind("flag", true)
        .unwrap()
        .bind("neg", -7i64)
        .unwrap()
        .bind("big", u64::MAX)
        .unwrap()
        .bind("ratio", 0.5)
        .unwrap()
        .bind("raw", ExprValue::bytes(vec![0u8, 255, 7]))
        .unwrap()
        .bind("text", "héllo")
        .unwrap()
        .bind("doc", doc! { "k": [1, 2] })
        .unwrap()
        .bind("list", vec![1, 2, 3])
        .unwrap()
        .bind("none", Option::<i32>::None)
        .unwrap()
        .execute()
        .await
        .unwrap();

    let bindings = &fx.memory.requests().await[0].bindings;
    assert_eq!(bindings.get("null"), Some(&ExprValue::Null));
    assert_eq!(bindings.get("flag"), Some(&ExprValue::Bool(true)));
    assert_eq!(bindings.get("neg"), Some(&ExprValue::Int(-7)));
    assert_eq!(bindings.get("big"), Some(&ExprValue::UInt(u64::MAX)));
    assert_eq!(bindings.get("ratio"), Some(&ExprValue::Double(0.5)));
    assert_eq!(bindings.get("raw"), Some(&ExprValue::Bytes(vec![0, 255, 7])));
    assert_eq!(bindings.get("text"), Some(&ExprValue::String("héllo".into())));
    assert_eq!(bindings.get("doc"), Some(&ExprValue::Document(doc! { "k": [1, 2] })));
    assert_eq!(
        bindings.get("list"),
        Some(&ExprValue::Array(vec![ExprValue::Int(1), ExprValue::Int(2), ExprValue::Int(3)]))
    );
    assert_eq!(bindings.get("none"), Some(&ExprValue::Null));

    let names: Vec<&String> = bindings.keys().collect();
    assert_eq!(names, ["big", "doc", "flag", "list", "neg", "none", "null", "ratio", "raw", "text"]);
}

#[tokio::test]
async fn executes_reach_the_session_in_program_order() {
    let fx = fixture();

    fx.items.add(doc! { "a": 1 }).execute().await.unwrap();
    fx.items.find_all().execute().await.unwrap();
    fx.items.modify_all().set("a", 2).unwrap().execute().await.unwrap();
    fx.items.remove_all().execute().await.unwrap();

    let frames = fx.memory.frames().await;
    let kinds: Vec<CrudKind> = frames.iter().map(|frame| frame.kind).collect();
    assert_eq!(kinds, vec![CrudKind::Add, CrudKind::Find, CrudKind::Modify, CrudKind::Remove]);
    assert!(frames.windows(2).all(|pair| pair[0].sequence < pair[1].sequence));
}
