use xcrud::{
    bson::{Bson, Document},
    memory::InMemorySession,
    prelude::*,
};

pub struct Fixture {
    pub memory: InMemorySession,
    pub session: Session,
    pub items: Collection,
}

/// A session over an empty in-memory backend with `shop` as default schema.
pub fn fixture() -> Fixture {
    with_backend(InMemorySession::new())
}

/// Like [`fixture`], with `shop.items` pre-loaded.
pub async fn seeded(docs: Vec<Document>) -> Fixture {
    let memory = InMemorySession::builder()
        .seed("shop", "items", docs)
        .build()
        .await
        .unwrap();

    with_backend(memory)
}

pub fn with_backend(memory: InMemorySession) -> Fixture {
    let session = Session::builder(memory.clone())
        .default_schema("shop")
        .build()
        .unwrap();
    let items = session.default_schema().unwrap().collection("items");

    Fixture { memory, session, items }
}

/// Reads an integer regardless of whether it was stored as 32 or 64 bit.
pub fn int(doc: &Document, key: &str) -> i64 {
    match doc.get(key) {
        Some(Bson::Int32(value)) => i64::from(*value),
        Some(Bson::Int64(value)) => *value,
        other => panic!("{key} is not an integer: {other:?}"),
    }
}

pub fn ints(docs: &[Document], key: &str) -> Vec<i64> {
    docs.iter().map(|doc| int(doc, key)).collect()
}
