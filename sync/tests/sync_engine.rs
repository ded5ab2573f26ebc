use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use memos_embeddings::{Embedding, EmbeddingError, EmbeddingProvider, HashingProvider};
use memos_source::{
    DocId, DocStatus, Document, InMemoryRepository, SensitiveConfig, SensitiveContentFilter,
    Visibility,
};
use memos_sync::{
    IngestEvent, IngestOutcome, ManualClock, SyncConfig, SyncEngine, SyncError, WatermarkStore,
};
use memos_vector_index::{FlatVectorIndex, VectorIndex};
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use tokio::sync::Notify;

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().unwrap()
}

fn note(id: i64, content: &str, updated: i64) -> Document {
    Document::new(id, content, at(updated))
}

/// Counts calls and can be switched to fail like a dropped connection.
struct CountingEmbedder {
    inner: HashingProvider,
    texts: AtomicUsize,
    fail: std::sync::atomic::AtomicBool,
}

impl CountingEmbedder {
    fn new() -> Self {
        Self {
            inner: HashingProvider::new(32),
            texts: AtomicUsize::new(0),
            fail: std::sync::atomic::AtomicBool::new(false),
        }
    }

    fn embedded(&self) -> usize {
        self.texts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for CountingEmbedder {
    fn name(&self) -> &str {
        "counting"
    }

    fn model(&self) -> &str {
        "test"
    }

    async fn embed(&self, texts: &[String]) -> memos_embeddings::Result<Vec<Embedding>> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(EmbeddingError::ApiRequest("connection reset".to_string()));
        }
        self.texts.fetch_add(texts.len(), Ordering::SeqCst);
        self.inner.embed(texts).await
    }
}

struct Harness {
    _dir: TempDir,
    repo: Arc<InMemoryRepository>,
    embedder: Arc<CountingEmbedder>,
    index: Arc<FlatVectorIndex>,
    clock: Arc<ManualClock>,
    watermark: WatermarkStore,
    engine: Arc<SyncEngine>,
}

async fn harness(docs: Vec<Document>, filter: SensitiveContentFilter) -> Harness {
    let dir = TempDir::new().unwrap();
    let repo = Arc::new(InMemoryRepository::with_documents(docs));
    let embedder = Arc::new(CountingEmbedder::new());
    let index = Arc::new(FlatVectorIndex::open(dir.path().join("index")).await.unwrap());
    let clock = Arc::new(ManualClock::at(1_000));
    let watermark = WatermarkStore::new(dir.path().join("sync_state.txt"));

    let engine = SyncEngine::new(
        repo.clone(),
        embedder.clone(),
        index.clone(),
        watermark.clone(),
    )
    .with_filter(filter)
    .with_clock(clock.clone())
    .with_config(SyncConfig::default().with_batch_size(2));

    Harness {
        _dir: dir,
        repo,
        embedder,
        index,
        clock,
        watermark,
        engine: Arc::new(engine),
    }
}

async fn sorted_ids(index: &FlatVectorIndex) -> Vec<String> {
    let mut ids = index.all_ids().await;
    ids.sort();
    ids
}

fn denylist_password() -> SensitiveContentFilter {
    SensitiveContentFilter::new(&SensitiveConfig::empty().with_keyword("password"))
}

#[tokio::test]
async fn test_full_sync_indexes_exactly_active_non_sensitive_notes() {
    let h = harness(
        vec![
            note(1, "cats are great", 10),
            note(2, "my password is x", 10),
            note(3, "archived idea", 10).with_status(DocStatus::Archived),
            note(4, "public post", 10).with_visibility(Visibility::Public),
            note(5, "dogs are great", 10),
            note(6, "birds are great", 10),
        ],
        denylist_password(),
    )
    .await;
    h.index
        .add_or_update(&["99".to_string()], &[HashingProvider::new(32).embed_text("stale")])
        .await
        .unwrap();

    let report = h.engine.full_sync().await.unwrap();

    assert_eq!(sorted_ids(&h.index).await, vec!["1", "5", "6"]);
    assert_eq!(report.indexed, 3);
    assert_eq!(report.skipped_sensitive, 1);
    assert_eq!(report.watermark, at(1_000));
    assert_eq!(h.watermark.load().await, at(1_000));
}

#[tokio::test]
async fn test_full_sync_counts_replaced_notes_as_deleted() {
    let h = harness(
        vec![note(1, "cats", 10), note(2, "dogs", 10)],
        SensitiveContentFilter::permissive(),
    )
    .await;
    h.engine.full_sync().await.unwrap();

    h.repo.remove(&DocId::from(1_i64)).await;
    h.repo.remove(&DocId::from(2_i64)).await;
    h.repo.upsert(note(3, "birds", 1_500)).await;
    h.repo.upsert(note(4, "fish", 1_500)).await;
    h.clock.set(2_000);

    let report = h.engine.full_sync().await.unwrap();
    assert_eq!(report.indexed, 2);
    assert_eq!(report.deleted, 2);
    assert_eq!(sorted_ids(&h.index).await, vec!["3", "4"]);
}

#[tokio::test]
async fn test_engines_sharing_a_data_dir_see_each_others_commits() {
    let dir = TempDir::new().unwrap();
    let repo = Arc::new(InMemoryRepository::with_documents([
        note(1, "cats", 500),
        note(2, "dogs", 500),
    ]));
    let embedder = Arc::new(HashingProvider::new(16));
    let watermark = WatermarkStore::new(dir.path().join("sync_state.txt"));

    // Two handles on one directory, like two CLI processes.
    let index_a = Arc::new(FlatVectorIndex::open(dir.path().join("index")).await.unwrap());
    let index_b = Arc::new(FlatVectorIndex::open(dir.path().join("index")).await.unwrap());
    let clock_a = Arc::new(ManualClock::at(1_000));
    let clock_b = Arc::new(ManualClock::at(2_000));
    let engine_a = SyncEngine::new(repo.clone(), embedder.clone(), index_a, watermark.clone())
        .with_filter(SensitiveContentFilter::permissive())
        .with_clock(clock_a);
    let engine_b = SyncEngine::new(repo.clone(), embedder, index_b.clone(), watermark.clone())
        .with_filter(SensitiveContentFilter::permissive())
        .with_clock(clock_b);

    engine_a.full_sync().await.unwrap();
    repo.upsert(note(3, "birds", 1_500)).await;

    let report = engine_b.incremental_sync().await.unwrap();
    assert_eq!(report.indexed, 1);
    assert_eq!(report.deleted, 0);
    assert_eq!(sorted_ids(&index_b).await, vec!["1", "2", "3"]);

    let reopened = FlatVectorIndex::open(dir.path().join("index")).await.unwrap();
    assert_eq!(sorted_ids(&reopened).await, vec!["1", "2", "3"]);
    assert_eq!(watermark.load().await, at(2_000));
}

#[tokio::test]
async fn test_incremental_respects_watermark() {
    let h = harness(
        vec![note(1, "edited after the watermark", 150), note(2, "older note", 90)],
        SensitiveContentFilter::permissive(),
    )
    .await;
    h.watermark.store(at(100)).await.unwrap();

    let report = h.engine.incremental_sync().await.unwrap();

    assert_eq!(sorted_ids(&h.index).await, vec!["1"]);
    assert_eq!(report.indexed, 1);
    assert_eq!(h.embedder.embedded(), 1);
    assert_eq!(h.watermark.load().await, at(1_000));
}

#[tokio::test]
async fn test_incremental_picks_up_latest_content_and_deletions() {
    let h = harness(
        vec![note(1, "cats are great", 10), note(2, "dogs are great", 10)],
        SensitiveContentFilter::permissive(),
    )
    .await;
    h.engine.full_sync().await.unwrap();

    h.repo.upsert(note(1, "parrots are loud", 1_500)).await;
    h.repo.remove(&DocId::from(2_i64)).await;
    h.repo.upsert(note(3, "new fish note", 1_600)).await;
    h.clock.set(2_000);

    let report = h.engine.incremental_sync().await.unwrap();
    assert_eq!(report.deleted, 1);
    assert_eq!(report.indexed, 2);
    assert_eq!(sorted_ids(&h.index).await, vec!["1", "3"]);

    let query = HashingProvider::new(32).embed_text("parrots are loud");
    let hits = h.index.search(&query, 1).await.unwrap();
    assert_eq!(hits[0].id, "1");
    assert!(hits[0].score > 0.99);
}

#[tokio::test]
async fn test_sensitive_notes_never_indexed() {
    let h = harness(
        vec![note(1, "my password is x", 500), note(2, "cats", 500)],
        denylist_password(),
    )
    .await;

    h.engine.incremental_sync().await.unwrap();
    assert_eq!(sorted_ids(&h.index).await, vec!["2"]);

    h.engine.full_sync().await.unwrap();
    assert_eq!(sorted_ids(&h.index).await, vec!["2"]);

    // An indexed note edited to become sensitive is withdrawn.
    h.repo.upsert(note(2, "cats, password hunter2", 3_000)).await;
    h.clock.set(4_000);
    let report = h.engine.incremental_sync().await.unwrap();
    assert_eq!(report.skipped_sensitive, 1);
    assert!(h.index.all_ids().await.is_empty());
}

#[tokio::test]
async fn test_transport_failure_keeps_watermark() {
    let h = harness(vec![note(1, "cats", 500)], SensitiveContentFilter::permissive()).await;
    h.watermark.store(at(100)).await.unwrap();
    h.embedder.fail.store(true, Ordering::SeqCst);

    let err = h.engine.incremental_sync().await.unwrap_err();
    assert!(matches!(err, SyncError::Embedding(_)));
    assert_eq!(h.watermark.load().await, at(100));

    let err = h.engine.full_sync().await.unwrap_err();
    assert!(matches!(err, SyncError::Embedding(_)));
    assert_eq!(h.watermark.load().await, at(100));

    h.embedder.fail.store(false, Ordering::SeqCst);
    h.engine.incremental_sync().await.unwrap();
    assert_eq!(sorted_ids(&h.index).await, vec!["1"]);
}

/// Blocks inside `embed` until released.
struct GatedEmbedder {
    entered: Notify,
    release: Notify,
}

#[async_trait]
impl EmbeddingProvider for GatedEmbedder {
    fn name(&self) -> &str {
        "gated"
    }

    fn model(&self) -> &str {
        "test"
    }

    async fn embed(&self, texts: &[String]) -> memos_embeddings::Result<Vec<Embedding>> {
        self.entered.notify_one();
        self.release.notified().await;
        HashingProvider::new(8).embed(texts).await
    }
}

#[tokio::test]
async fn test_overlapping_sync_is_rejected() {
    let dir = TempDir::new().unwrap();
    let embedder = Arc::new(GatedEmbedder {
        entered: Notify::new(),
        release: Notify::new(),
    });
    let index = Arc::new(FlatVectorIndex::ephemeral());
    let engine = Arc::new(SyncEngine::new(
        Arc::new(InMemoryRepository::with_documents([note(1, "cats", 10)])),
        embedder.clone(),
        index.clone(),
        WatermarkStore::new(dir.path().join("sync_state.txt")),
    ));

    let running = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.full_sync().await })
    };
    embedder.entered.notified().await;

    assert!(matches!(
        engine.incremental_sync().await,
        Err(SyncError::Conflict)
    ));
    assert!(matches!(engine.full_sync().await, Err(SyncError::Conflict)));

    embedder.release.notify_one();
    running.await.unwrap().unwrap();
    assert_eq!(index.all_ids().await, vec!["1".to_string()]);
}

#[tokio::test]
async fn test_sync_in_another_engine_is_rejected() {
    let dir = TempDir::new().unwrap();
    let repo = Arc::new(InMemoryRepository::with_documents([note(1, "cats", 10)]));
    let embedder = Arc::new(GatedEmbedder {
        entered: Notify::new(),
        release: Notify::new(),
    });
    let watermark = WatermarkStore::new(dir.path().join("sync_state.txt"));
    let running_engine = Arc::new(SyncEngine::new(
        repo.clone(),
        embedder.clone(),
        Arc::new(FlatVectorIndex::open(dir.path().join("index")).await.unwrap()),
        watermark.clone(),
    ));
    let other_engine = SyncEngine::new(
        repo,
        Arc::new(HashingProvider::new(8)),
        Arc::new(FlatVectorIndex::open(dir.path().join("index")).await.unwrap()),
        watermark,
    );

    let running = tokio::spawn(async move { running_engine.full_sync().await });
    embedder.entered.notified().await;

    assert!(matches!(
        other_engine.incremental_sync().await,
        Err(SyncError::Conflict)
    ));
    assert!(matches!(
        other_engine.full_sync().await,
        Err(SyncError::Conflict)
    ));

    embedder.release.notify_one();
    running.await.unwrap().unwrap();
    other_engine.incremental_sync().await.unwrap();
}

#[tokio::test]
async fn test_event_waits_for_running_sync() {
    let dir = TempDir::new().unwrap();
    let embedder = Arc::new(GatedEmbedder {
        entered: Notify::new(),
        release: Notify::new(),
    });
    let index = Arc::new(FlatVectorIndex::ephemeral());
    let engine = Arc::new(SyncEngine::new(
        Arc::new(InMemoryRepository::with_documents([note(1, "cats", 10)])),
        embedder.clone(),
        index.clone(),
        WatermarkStore::new(dir.path().join("sync_state.txt")),
    ));

    let sync = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.full_sync().await })
    };
    embedder.entered.notified().await;

    let event = tokio::spawn(async move {
        engine
            .apply_event(IngestEvent::Delete {
                id: DocId::from(1_i64),
            })
            .await
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!event.is_finished());

    embedder.release.notify_one();
    sync.await.unwrap().unwrap();
    assert_eq!(event.await.unwrap().unwrap(), IngestOutcome::Removed);
    // The delete ran after the sync had indexed note 1.
    assert!(index.all_ids().await.is_empty());
}

#[tokio::test]
async fn test_sync_is_rejected_while_event_runs() {
    let dir = TempDir::new().unwrap();
    let embedder = Arc::new(GatedEmbedder {
        entered: Notify::new(),
        release: Notify::new(),
    });
    let index = Arc::new(FlatVectorIndex::ephemeral());
    let engine = Arc::new(SyncEngine::new(
        Arc::new(InMemoryRepository::with_documents([note(1, "cats", 10)])),
        embedder.clone(),
        index.clone(),
        WatermarkStore::new(dir.path().join("sync_state.txt")),
    ));

    let event = {
        let engine = engine.clone();
        tokio::spawn(async move {
            engine
                .apply_event(IngestEvent::Upsert {
                    id: DocId::from(7_i64),
                    content: "dogs are great".to_string(),
                    visibility: Visibility::Private,
                })
                .await
        })
    };
    embedder.entered.notified().await;

    assert!(matches!(
        engine.incremental_sync().await,
        Err(SyncError::Conflict)
    ));
    assert!(matches!(engine.full_sync().await, Err(SyncError::Conflict)));

    embedder.release.notify_one();
    assert_eq!(event.await.unwrap().unwrap(), IngestOutcome::Indexed);
    assert_eq!(index.all_ids().await, vec!["7".to_string()]);
}

#[tokio::test]
async fn test_ingestion_events() {
    let h = harness(Vec::new(), denylist_password()).await;

    let outcome = h
        .engine
        .apply_event(IngestEvent::Upsert {
            id: DocId::from(7_i64),
            content: "cats are great".to_string(),
            visibility: Visibility::Private,
        })
        .await
        .unwrap();
    assert_eq!(outcome, IngestOutcome::Indexed);
    assert!(h.index.contains("7").await);

    let outcome = h
        .engine
        .apply_event(IngestEvent::Upsert {
            id: DocId::from(7_i64),
            content: "now public".to_string(),
            visibility: Visibility::Public,
        })
        .await
        .unwrap();
    assert_eq!(outcome, IngestOutcome::Removed);
    assert!(!h.index.contains("7").await);

    h.engine
        .apply_event(IngestEvent::Upsert {
            id: DocId::from(8_i64),
            content: "password: hunter2".to_string(),
            visibility: Visibility::Private,
        })
        .await
        .unwrap();
    assert!(h.index.all_ids().await.is_empty());

    // Deleting an absent note is a no-op.
    let outcome = h
        .engine
        .apply_event(IngestEvent::Delete {
            id: DocId::from(8_i64),
        })
        .await
        .unwrap();
    assert_eq!(outcome, IngestOutcome::Removed);
}

#[test]
fn test_ingest_event_wire_format() {
    let event: IngestEvent = serde_json::from_str(
        r#"{"type": "upsert", "id": "12", "content": "hi", "visibility": "private"}"#,
    )
    .unwrap();
    assert_eq!(
        event,
        IngestEvent::Upsert {
            id: DocId::from("12"),
            content: "hi".to_string(),
            visibility: Visibility::Private,
        }
    );
}
