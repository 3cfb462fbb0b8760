use std::{env, sync::Once};

use lexa_ai::{
    config::{Config, StoreBackend},
    embedding,
    qdrant::QdrantService,
    store::DocumentStore,
};

static INIT: Once = Once::new();

fn set_default_env(key: &str, value: &str) {
    let needs_value = env::var(key).map(|v| v.trim().is_empty()).unwrap_or(true);
    if needs_value {
        // SAFETY: Tests run serially via Once and we intentionally mutate process env.
        unsafe {
            env::set_var(key, value);
        }
    }
}

fn live_config() -> Config {
    INIT.call_once(|| {
        set_default_env("QDRANT_URL", "http://127.0.0.1:6333");
        set_default_env("QDRANT_COLLECTION_NAME", "lexa-live-validation");
        set_default_env("EMBEDDING_PROVIDER", "ollama");
        set_default_env("EMBEDDING_MODEL", "all-minilm");
        set_default_env("EMBEDDING_DIMENSION", "384");
        set_default_env("OLLAMA_URL", "http://127.0.0.1:11434");
    });
    Config::from_env().expect("live configuration")
}

#[tokio::test]
#[ignore = "Requires live Qdrant"]
async fn live_qdrant_collection_roundtrip() {
    let config = Config {
        store_backend: StoreBackend::Qdrant,
        ..live_config()
    };
    let qdrant = QdrantService::new(&config).expect("qdrant client");
    qdrant.ensure_ready().await.expect("collection ready");
    qdrant.ping().await.expect("collection reachable");

    let collections = qdrant.list_collections().await.expect("collections");
    assert!(
        collections.iter().any(|name| name == qdrant.collection()),
        "collection must exist after ensure_ready: {collections:?}"
    );

    let stats = qdrant.stats().await.expect("stats");
    assert_eq!(stats.categories_count, stats.categories.len());
}

#[tokio::test]
#[ignore = "Requires live Ollama embeddings"]
async fn live_ollama_embedding_roundtrip() {
    let config = live_config();
    let client = embedding::build_embedding_client(&config).expect("embedding client");
    let vectors = client
        .generate_embeddings(vec!["lexa live embedding".to_string()])
        .await
        .expect("failed to request embeddings from provider");
    assert_eq!(vectors.len(), 1, "expected embedding per input chunk");
    assert_eq!(
        vectors[0].len(),
        config.embedding_dimension,
        "embedding dimension mismatch"
    );
}
