use std::sync::Arc;
use tcg_checkout::application::unit_of_work::UnitOfWork;
use tcg_checkout::domain::ports::{StoreHandle, Table};
use tcg_checkout::domain::sequence::SequenceCounter;
use tcg_checkout::infrastructure::in_memory::InMemoryStore;

#[tokio::test]
async fn test_store_as_trait_object() {
    let store: StoreHandle = Arc::new(InMemoryStore::new());

    // Verify Send + Sync by spawning tasks that share the handle
    let writer = {
        let store = store.clone();
        tokio::spawn(async move {
            let mut uow = UnitOfWork::begin(store);
            uow.put(Table::Sequences, "ORD", &SequenceCounter::new("ORD"))
                .unwrap();
            uow.commit().await.unwrap();
        })
    };
    writer.await.unwrap();

    let reader = tokio::spawn(async move {
        let mut uow = UnitOfWork::begin(store);
        uow.require::<SequenceCounter>(Table::Sequences, "ORD", "counter")
            .await
            .unwrap()
    });

    let counter = reader.await.unwrap();
    assert_eq!(counter.id, "ORD");
    assert_eq!(counter.sequence, 1);
}

#[cfg(feature = "storage-rocksdb")]
#[tokio::test]
async fn test_rocksdb_as_trait_object() {
    use tcg_checkout::infrastructure::rocksdb::RocksDBStore;

    let dir = tempfile::tempdir().unwrap();
    let store: StoreHandle = Arc::new(RocksDBStore::open(dir.path()).unwrap());

    let handle = tokio::spawn(async move {
        let mut uow = UnitOfWork::begin(store.clone());
        uow.put(Table::Sequences, "ORD", &SequenceCounter::new("ORD"))
            .unwrap();
        uow.commit().await.unwrap();
        store.get(Table::Sequences, "ORD").await.unwrap()
    });

    assert!(handle.await.unwrap().is_some());
}
