//! Tests for the memory driver through the docmap driver traits

use std::sync::Arc;

use super::*;
use bson::doc;
use docmap_core::{
    Collection, Connection, ConnectionFactory, DocmapError, DocumentStream, Namespace, StoreDriver,
    UpdateOutcome,
};
use pretty_assertions::assert_eq;

fn ns() -> Namespace {
    Namespace::new("app", "people").expect("namespace")
}

mod driver_metadata_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_memory_driver_id() {
        let driver = MemoryDriver::new();
        assert_eq!(driver.id(), "memory");
        assert_eq!(driver.display_name(), "In-memory");
        assert!(driver.accepts("memory://test"));
        assert!(!driver.accepts("mongodb://localhost"));
    }

    #[test]
    fn test_store_name() {
        assert_eq!(store_name("memory://orders"), Some("orders"));
        assert_eq!(store_name("memory://orders/app?x=1"), Some("orders"));
        assert_eq!(store_name("MEMORY://Orders"), Some("Orders"));
        assert_eq!(store_name("memory://"), Some(DEFAULT_STORE_NAME));
        assert_eq!(store_name("mongodb://localhost"), None);
        assert_eq!(store_name("orders"), None);
    }
}

mod connector_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_connector_rejects_foreign_uri() {
        let err = MemoryDriver::new()
            .connector("mongodb://localhost")
            .await
            .err()
            .expect("wrong scheme");
        assert!(matches!(err, DocmapError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_same_name_shares_data() {
        let driver = MemoryDriver::new();

        let writer = driver.connector("memory://shared").await.expect("connector");
        let reader = driver.connector("memory://shared").await.expect("connector");
        let other = driver.connector("memory://other").await.expect("connector");

        let conn = writer.create().await.expect("connection");
        conn.collection(&ns())
            .expect("collection")
            .insert_one(doc! { "k": "v" })
            .await
            .expect("insert");

        let count = |factory: Arc<dyn ConnectionFactory>| async move {
            let conn = factory.create().await.expect("connection");
            conn.collection(&ns()).expect("collection").count(doc! {}).await.expect("count")
        };
        assert_eq!(count(reader).await, 1);
        assert_eq!(count(other).await, 0);
        assert_eq!(driver.store("shared").len(&ns()), 1);
    }

    #[tokio::test]
    async fn test_separate_drivers_are_isolated() {
        let first = MemoryDriver::new();
        let second = MemoryDriver::new();
        first.store("db").set_read_only(true);
        assert!(!second.store("db").is_read_only());
    }
}

mod collection_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    async fn collection(driver: &MemoryDriver) -> Box<dyn Collection> {
        let factory = driver.connector("memory://crud").await.expect("connector");
        let conn = factory.create().await.expect("connection");
        conn.collection(&ns()).expect("collection")
    }

    #[tokio::test]
    async fn test_insert_find_count_delete() {
        let driver = MemoryDriver::new();
        let coll = collection(&driver).await;

        coll.insert_one(doc! { "_id": 1, "kind": "a" }).await.expect("insert");
        coll.insert_one(doc! { "_id": 2, "kind": "b" }).await.expect("insert");
        coll.insert_one(doc! { "_id": 3, "kind": "a" }).await.expect("insert");

        assert_eq!(coll.count(doc! { "kind": "a" }).await.expect("count"), 2);

        let mut stream = coll.find(doc! { "kind": "a" }).await.expect("find");
        let mut ids = Vec::new();
        while let Some(document) = stream.next_document().await.expect("next") {
            ids.push(document.get_i32("_id").expect("_id"));
        }
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(stream.next_document().await.expect("next"), None);

        assert_eq!(coll.delete_one(doc! { "kind": "a" }).await.expect("delete"), 1);
        assert_eq!(coll.count(doc! {}).await.expect("count"), 2);
    }

    #[tokio::test]
    async fn test_update_operator_and_replacement() {
        let driver = MemoryDriver::new();
        let coll = collection(&driver).await;
        coll.insert_one(doc! { "_id": 1, "a": "1" }).await.expect("insert");

        let outcome = coll
            .update_one(doc! { "_id": 1 }, doc! { "$set": { "b": "2" } })
            .await
            .expect("operator update");
        assert_eq!(outcome, UpdateOutcome::new(1, 1));

        let outcome = coll
            .update_one(doc! { "_id": 1 }, doc! { "c": "3" })
            .await
            .expect("replacement");
        assert_eq!(outcome, UpdateOutcome::new(1, 1));

        let mut stream = coll.find(doc! {}).await.expect("find");
        assert_eq!(
            stream.next_document().await.expect("next"),
            Some(doc! { "_id": 1, "c": "3" })
        );
    }

    #[tokio::test]
    async fn test_find_is_a_snapshot() {
        let driver = MemoryDriver::new();
        let coll = collection(&driver).await;
        coll.insert_one(doc! { "_id": 1 }).await.expect("insert");

        let mut stream = coll.find(doc! {}).await.expect("find");
        coll.insert_one(doc! { "_id": 2 }).await.expect("insert");

        assert!(stream.next_document().await.expect("next").is_some());
        assert!(stream.next_document().await.expect("next").is_none());
    }

    #[tokio::test]
    async fn test_closed_connection_refuses_collections() {
        let driver = MemoryDriver::new();
        let factory = driver.connector("memory://closed").await.expect("connector");
        let conn = factory.create().await.expect("connection");

        conn.close().await.expect("close");
        assert!(conn.is_closed());
        assert!(matches!(
            conn.collection(&ns()).err(),
            Some(DocmapError::Connection(_))
        ));
    }
}
