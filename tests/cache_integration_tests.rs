//! Integration Tests for the Record Cache
//!
//! Drives the public API end to end: cache definitions built from a backend
//! registry, read-through retrieval against a store of truth, and invalidation
//! wired through a change feed.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use record_cache::{
    spawn_cleanup_task, BackendRegistry, CacheBuilder, CacheError, CacheOptions, ChangeFeed,
    ChangeNotification, IndexDefinition, Invalidator, JsonSerializer, LookupValue, MemoryBackend,
    ReadOptions, Record, RecordCache, RecordFilter, RecordStore, Retriever,
};
use serde::Serialize;
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

// == Fixtures ==
#[derive(Debug, Clone, Serialize)]
struct Product {
    id: u64,
    sku: String,
    name: String,
    categories: Vec<String>,
}

impl Product {
    fn new(id: u64, sku: &str) -> Self {
        Self {
            id,
            sku: sku.to_string(),
            name: format!("Product {}", id),
            categories: Vec::new(),
        }
    }

    fn named(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    fn in_categories(mut self, categories: &[&str]) -> Self {
        self.categories = categories.iter().map(|c| c.to_string()).collect();
        self
    }
}

impl Record for Product {
    fn attribute(&self, field: &str) -> Option<LookupValue> {
        match field {
            "pk" | "id" => Some(self.id.into()),
            "sku" => Some(self.sku.as_str().into()),
            "name" => Some(self.name.as_str().into()),
            _ => None,
        }
    }
}

/// Store of truth that answers batch queries in a scrambled order.
#[derive(Default)]
struct ProductStore {
    products: Mutex<HashMap<u64, Product>>,
    loads: AtomicUsize,
}

impl ProductStore {
    fn with(products: Vec<Product>) -> Arc<Self> {
        let store = Self::default();
        for product in products {
            store.save(product);
        }
        Arc::new(store)
    }

    fn save(&self, product: Product) {
        self.products.lock().unwrap().insert(product.id, product);
    }

    fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    fn select(&self, field: &str, values: &[LookupValue]) -> Vec<Product> {
        let mut found: Vec<Product> = self
            .products
            .lock()
            .unwrap()
            .values()
            .filter(|p| p.attribute(field).is_some_and(|v| values.contains(&v)))
            .cloned()
            .collect();
        found.sort_by_key(|p| std::cmp::Reverse(p.id));
        found
    }
}

#[async_trait]
impl RecordStore<Product> for ProductStore {
    async fn find(&self, field: &str, value: &LookupValue) -> record_cache::Result<Option<Product>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(self.select(field, std::slice::from_ref(value)).into_iter().next())
    }

    async fn find_many(
        &self,
        field: &str,
        values: &[LookupValue],
    ) -> record_cache::Result<Vec<Product>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(self.select(field, values))
    }

    async fn find_by_index(
        &self,
        index: &IndexDefinition<Product>,
        value: &str,
    ) -> record_cache::Result<Option<Product>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .products
            .lock()
            .unwrap()
            .values()
            .find(|p| index.values(p).iter().any(|v| v == value))
            .cloned())
    }

    async fn filter(&self, filter: &RecordFilter) -> record_cache::Result<Vec<Product>> {
        Ok(self
            .products
            .lock()
            .unwrap()
            .values()
            .filter(|p| filter.matches(*p))
            .cloned()
            .collect())
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn registry() -> (BackendRegistry, Arc<MemoryBackend>) {
    let backend = Arc::new(MemoryBackend::new(1_000));
    (BackendRegistry::with_default(backend.clone()), backend)
}

fn product_cache(registry: &BackendRegistry) -> Arc<RecordCache<Product>> {
    Arc::new(
        CacheBuilder::<Product>::new("Product", JsonSerializer)
            .key_prefix("shop:")
            .index("sku", |p: &Product| vec![p.sku.clone()])
            .index("category", |p: &Product| p.categories.clone())
            .build(registry)
            .unwrap(),
    )
}

fn ids(values: &[Value]) -> Vec<u64> {
    values.iter().map(|v| v["id"].as_u64().unwrap()).collect()
}

// == Batch Retrieval ==
#[tokio::test]
async fn test_batch_page_keeps_requested_order() {
    init_tracing();
    let (registry, _) = registry();
    let cache = product_cache(&registry);
    let store = ProductStore::with(vec![
        Product::new(2, "sku-2"),
        Product::new(5, "sku-5"),
        Product::new(9, "sku-9"),
    ]);
    cache.set(&Product::new(5, "sku-5"), "").await.unwrap();
    cache.set(&Product::new(9, "sku-9"), "").await.unwrap();

    let retriever = Retriever::builder(cache.clone(), store.clone()).build().unwrap();
    let page: Vec<LookupValue> = [5u64, 2, 9].into_iter().map(LookupValue::from).collect();

    let result = retriever.retrieve_batch(&page, &ReadOptions::new()).await.unwrap();

    assert_eq!(ids(&result), vec![5, 2, 9]);
    assert_eq!(store.loads(), 1);
    assert!(cache.get(&2u64.into(), "").await.unwrap().is_some());
}

// == Single Retrieval ==
#[tokio::test]
async fn test_force_refresh_reloads_and_overwrites() {
    init_tracing();
    let (registry, _) = registry();
    let cache = product_cache(&registry);
    let store = ProductStore::with(vec![Product::new(1, "sku-1").named("Kettle")]);
    let retriever = Retriever::builder(cache.clone(), store.clone()).build().unwrap();

    let first = retriever.retrieve(1u64, &ReadOptions::new()).await.unwrap();
    assert_eq!(first["name"], "Kettle");

    store.save(Product::new(1, "sku-1").named("Electric Kettle"));
    let cached = retriever.retrieve(1u64, &ReadOptions::new()).await.unwrap();
    assert_eq!(cached["name"], "Kettle");
    assert_eq!(store.loads(), 1);

    let refreshed = retriever.retrieve(1u64, &ReadOptions::refresh()).await.unwrap();
    assert_eq!(refreshed["name"], "Electric Kettle");
    assert_eq!(store.loads(), 2);

    let stored = cache.get(&1u64.into(), "").await.unwrap().unwrap();
    assert_eq!(stored["name"], "Electric Kettle");
}

#[tokio::test]
async fn test_retrieve_missing_record_is_not_found() {
    init_tracing();
    let (registry, _) = registry();
    let retriever = Retriever::builder(product_cache(&registry), ProductStore::with(vec![]))
        .build()
        .unwrap();

    let result = retriever.retrieve(404u64, &ReadOptions::new()).await;

    assert!(matches!(result, Err(CacheError::NotFound(id)) if id == "404"));
}

#[tokio::test]
async fn test_retrieve_by_index_reads_through() {
    init_tracing();
    let (registry, _) = registry();
    let cache = product_cache(&registry);
    let store = ProductStore::with(vec![Product::new(3, "abc")]);
    let retriever = Retriever::builder(cache.clone(), store.clone()).build().unwrap();

    let loaded = retriever
        .retrieve_by_index("sku", "abc", &ReadOptions::new())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(loaded["id"], 3);

    retriever
        .retrieve_by_index("sku", "abc", &ReadOptions::new())
        .await
        .unwrap();
    assert_eq!(store.loads(), 1);

    let missing = retriever
        .retrieve_by_index("sku", "xyz", &ReadOptions::new())
        .await
        .unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn test_retrieve_by_category_index_loads_and_refreshes() {
    init_tracing();
    let (registry, _) = registry();
    let cache = product_cache(&registry);
    let store = ProductStore::with(vec![
        Product::new(11, "sku-11").named("Rake").in_categories(&["garden", "tools"]),
        Product::new(12, "sku-12").named("Pan").in_categories(&["kitchen"]),
    ]);
    let retriever = Retriever::builder(cache.clone(), store.clone()).build().unwrap();

    let cold = retriever
        .retrieve_by_index("category", "tools", &ReadOptions::new())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(cold["id"], 11);
    assert!(cache.get_for_index("category", "garden", "").await.unwrap().is_some());

    let warm = retriever
        .retrieve_by_index("category", "tools", &ReadOptions::new())
        .await
        .unwrap();
    assert_eq!(warm, Some(cold));
    assert_eq!(store.loads(), 1);

    store.save(Product::new(11, "sku-11").named("Steel Rake").in_categories(&["garden", "tools"]));
    let refreshed = retriever
        .retrieve_by_index("category", "tools", &ReadOptions::refresh())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(refreshed["name"], "Steel Rake");
    assert_eq!(store.loads(), 2);
}

#[tokio::test]
async fn test_suffix_variants_and_post_processing() {
    init_tracing();
    let (registry, _) = registry();
    let cache = product_cache(&registry);
    let store = ProductStore::with(vec![Product::new(4, "sku-4")]);
    let retriever = Retriever::builder(cache.clone(), store)
        .post_process(|mut value| {
            value["served"] = json!(true);
            value
        })
        .build()
        .unwrap();

    let value = retriever
        .retrieve(4u64, &ReadOptions::new().with_suffix(":v2"))
        .await
        .unwrap();

    assert_eq!(value["served"], true);
    assert!(cache.get(&4u64.into(), ":v2").await.unwrap().is_some());
    assert!(cache.get(&4u64.into(), "").await.unwrap().is_none());
    let stored = cache.get(&4u64.into(), ":v2").await.unwrap().unwrap();
    assert!(stored.get("served").is_none());
}

// == Expiry ==
#[tokio::test(start_paused = true)]
async fn test_ttl_entry_expires() {
    init_tracing();
    let (registry, backend) = registry();
    let options: CacheOptions = serde_json::from_value(json!({"ttl_secs": 60, "version": 1})).unwrap();
    let cache = CacheBuilder::<Product>::new("Product", JsonSerializer)
        .options(options)
        .build(&registry)
        .unwrap();

    let stored = cache.set(&Product::new(7, "sku-7"), "").await.unwrap();
    assert_eq!(cache.get(&7u64.into(), "").await.unwrap(), Some(stored));

    let sweeper = spawn_cleanup_task(backend.clone(), 30);
    tokio::time::advance(Duration::from_secs(61)).await;
    assert_eq!(cache.get(&7u64.into(), "").await.unwrap(), None);

    sweeper.abort();
}

// == Indexes ==
#[tokio::test]
async fn test_index_lookup_hit_and_miss() {
    init_tracing();
    let (registry, _) = registry();
    let cache = product_cache(&registry);
    let product = Product::new(3, "abc");

    cache.set(&product, "").await.unwrap();

    assert_eq!(
        cache.get_for_index("sku", "abc", "").await.unwrap(),
        Some(serde_json::to_value(&product).unwrap())
    );
    assert_eq!(cache.get_for_index("sku", "xyz", "").await.unwrap(), None);
}

#[tokio::test]
async fn test_unknown_index_is_config_error() {
    init_tracing();
    let (registry, _) = registry();
    let cache = product_cache(&registry);

    let err = cache.get_for_index("colour", "red", "").await.unwrap_err();

    assert!(err.is_config_error());
    assert!(matches!(err, CacheError::UnknownIndex(_)));
}

#[tokio::test]
async fn test_retriever_rejects_undeclared_index() {
    init_tracing();
    let (registry, _) = registry();
    let result = Retriever::builder(product_cache(&registry), ProductStore::with(vec![]))
        .cache_index("barcode")
        .build();

    assert!(result.unwrap_err().is_config_error());
}

#[tokio::test]
async fn test_unknown_backend_is_config_error() {
    let (registry, _) = registry();
    let result = CacheBuilder::<Product>::new("Product", JsonSerializer)
        .backend("sessions")
        .build(&registry);

    assert!(result.unwrap_err().is_config_error());
}

// == Delete ==
#[tokio::test]
async fn test_delete_clears_entries_and_indexes() {
    init_tracing();
    let (registry, backend) = registry();
    let cache = product_cache(&registry);
    let product = Product::new(8, "sku-8").in_categories(&["kitchen", "garden"]);

    cache.set(&product, "").await.unwrap();
    cache.set(&product, ":compact").await.unwrap();
    cache.delete(&product, "").await.unwrap();

    assert_eq!(cache.get(&8u64.into(), "").await.unwrap(), None);
    assert_eq!(cache.get(&8u64.into(), ":compact").await.unwrap(), None);
    assert_eq!(cache.get_for_index("sku", "sku-8", "").await.unwrap(), None);
    assert_eq!(cache.get_for_index("category", "kitchen", "").await.unwrap(), None);
    assert_eq!(cache.get_for_index("category", "garden", "").await.unwrap(), None);
    assert!(backend.is_empty().await);
}

// == Invalidation ==
#[tokio::test]
async fn test_change_feed_keeps_cache_in_step() {
    init_tracing();
    let (registry, _) = registry();
    let cache = product_cache(&registry);
    let invalidator = Invalidator::new(cache.clone())
        .watch_association("categories")
        .unwrap();
    let mut feed: ChangeFeed<Product> = ChangeFeed::new();
    feed.subscribe(Arc::new(invalidator));

    let product = Product::new(6, "sku-6").named("Lamp");
    feed.publish(&ChangeNotification::created(product.clone())).await;
    assert_eq!(
        cache.get(&6u64.into(), "").await.unwrap().unwrap()["name"],
        "Lamp"
    );

    let renamed = product.clone().named("Desk Lamp").in_categories(&["lighting"]);
    feed.publish(&ChangeNotification::association_changed("categories", renamed.clone()))
        .await;
    assert_eq!(
        cache.get_for_index("category", "lighting", "").await.unwrap().unwrap()["name"],
        "Desk Lamp"
    );

    feed.publish(&ChangeNotification::deleted(renamed)).await;
    assert_eq!(cache.get(&6u64.into(), "").await.unwrap(), None);
    assert_eq!(cache.get_for_index("sku", "sku-6", "").await.unwrap(), None);
}

#[tokio::test]
async fn test_populate_warms_filtered_records() {
    init_tracing();
    let (registry, _) = registry();
    let cache = product_cache(&registry);
    let store = ProductStore::with(vec![
        Product::new(1, "sku-1").named("Chair"),
        Product::new(2, "sku-2").named("Table"),
    ]);

    let warmed = cache
        .populate(store.as_ref(), &RecordFilter::all().field_eq("name", "Table"), "")
        .await
        .unwrap();

    assert_eq!(warmed, 1);
    assert!(cache.get(&1u64.into(), "").await.unwrap().is_none());
    assert!(cache.get_for_index("sku", "sku-2", "").await.unwrap().is_some());
}
