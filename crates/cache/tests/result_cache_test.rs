//! ResultCache behaviour against in-memory and failing stores.

use async_trait::async_trait;
use cache::{
    CacheEntry, CacheError, Clock, KeyValueStore, ManualClock, MemoryStore, ResultCache, StoreError, result_key,
};
use catalog::{FeatureVector, Mode};
use matcher::{FeatureValue, MatchResult, ScoreEngine};
use std::sync::Arc;
use std::time::Duration;

fn song(valence: f64, tempo: f64) -> FeatureVector {
    FeatureVector {
        valence,
        energy: 0.7,
        danceability: 0.75,
        tempo,
        acousticness: 0.3,
        key: 0,
        mode: Mode::Major,
        time_signature: 4,
        loudness: -5.0,
        duration_ms: 200_000,
        genres: vec![],
        artist: None,
        release_year: None,
    }
}

struct Fixture {
    clock: Arc<ManualClock>,
    store: Arc<MemoryStore>,
    cache: ResultCache,
}

fn fixture() -> Fixture {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let clock = Arc::new(ManualClock::default());
    let store = Arc::new(MemoryStore::with_clock(clock.clone()));
    let cache = ResultCache::new(store.clone(), Arc::new(ScoreEngine::new()), clock.clone());
    Fixture { clock, store, cache }
}

/// Let the background write land
async fn wait_for_key(store: &MemoryStore, key: &str) {
    for _ in 0..100 {
        if store.get(key).await.unwrap().is_some() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("background write for {} never landed", key);
}

/// A store where every operation fails
struct BrokenStore;

#[async_trait]
impl KeyValueStore for BrokenStore {
    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    async fn set_with_ttl(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    async fn delete(&self, _key: &str) -> Result<bool, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    async fn delete_many(&self, _keys: &[String]) -> Result<usize, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    async fn keys_by_prefix(&self, _prefix: &str) -> Result<Vec<String>, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    async fn ttl_remaining(&self, _key: &str) -> Result<Option<Duration>, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }
}

#[tokio::test]
async fn test_miss_computes_and_writes() {
    let f = fixture();
    let (a, b) = (song(0.8, 120.0), song(0.6, 100.0));

    let result = f.cache.get_or_compute("a", "b", &a, &b, false).await;
    let direct = ScoreEngine::new().score(&a, &b);
    assert!(result.same_outcome(&direct));

    wait_for_key(&f.store, &result_key("a", "b")).await;
    let cached = f.cache.lookup("a", "b").await.expect("entry written");
    assert!(cached.same_outcome(&direct));
}

#[tokio::test]
async fn test_cached_result_survives_round_trip() {
    let f = fixture();
    let a = song(0.8, 120.0).with_genres(["pop"]).with_artist("Band").with_release_year(2019);
    let b = song(0.3, 87.5).with_genres(["pop", "rock"]).with_release_year(2011);

    let computed = f.cache.get_or_compute("x", "y", &a, &b, false).await;
    wait_for_key(&f.store, &result_key("x", "y")).await;

    let cached = f.cache.lookup("x", "y").await.expect("entry written");
    assert!(cached.same_outcome(&computed));
    assert_eq!(cached.explanation, computed.explanation);
}

#[tokio::test]
async fn test_hit_is_served_from_store_in_either_order() {
    let f = fixture();
    let (a, b) = (song(0.8, 120.0), song(0.6, 100.0));

    // Plant a recognisable entry so a hit cannot be confused with a recompute
    let mut planted: MatchResult = ScoreEngine::new().score(&a, &b);
    planted.overall_score = 3;
    let entry = CacheEntry::new(result_key("a", "b"), planted, f.clock.now(), f.cache.ttl());
    f.store
        .set_with_ttl(&entry.key, entry.encode().unwrap(), f.cache.ttl())
        .await
        .unwrap();

    assert_eq!(f.cache.get_or_compute("a", "b", &a, &b, false).await.overall_score, 3);
    assert_eq!(f.cache.get_or_compute("b", "a", &b, &a, false).await.overall_score, 3);
}

#[tokio::test]
async fn test_reverse_order_hit_describes_requested_order() {
    let f = fixture();
    let a = song(0.8, 120.0).with_genres(["pop"]).with_release_year(2019);
    let b = song(0.3, 87.5).with_genres(["pop", "rock"]).with_release_year(2011);
    let engine = ScoreEngine::new();

    f.cache.get_or_compute("a", "b", &a, &b, false).await;
    wait_for_key(&f.store, &result_key("a", "b")).await;

    let reversed = f.cache.get_or_compute("b", "a", &b, &a, false).await;
    assert!(reversed.same_outcome(&engine.score(&b, &a)));
    assert_eq!(reversed.breakdown.layer1.components["valence"].value_a, FeatureValue::Number(0.3));
    assert!(reversed.explanation.details.rhythm.contains("slow tempo"));

    let forward = f.cache.get_or_compute("a", "b", &a, &b, false).await;
    assert!(forward.same_outcome(&engine.score(&a, &b)));
}

#[tokio::test]
async fn test_reverse_order_miss_is_stored_in_canonical_order() {
    let f = fixture();
    let (a, b) = (song(0.8, 120.0), song(0.6, 100.0));
    let engine = ScoreEngine::new();

    let result = f.cache.get_or_compute("b", "a", &b, &a, false).await;
    assert!(result.same_outcome(&engine.score(&b, &a)));

    wait_for_key(&f.store, &result_key("a", "b")).await;
    let stored = f.cache.lookup("b", "a").await.expect("entry written");
    assert!(stored.same_outcome(&engine.score(&a, &b)));
}

#[tokio::test]
async fn test_ids_containing_colons_get_separate_entries() {
    let f = fixture();
    let (a, b) = (song(0.8, 120.0), song(0.6, 100.0));
    let (c, d) = (song(0.1, 70.0), song(0.9, 180.0));
    let engine = ScoreEngine::new();

    f.cache.get_or_compute("a:b", "c", &a, &b, false).await;
    wait_for_key(&f.store, &result_key("a:b", "c")).await;

    let second = f.cache.get_or_compute("a", "b:c", &c, &d, false).await;
    assert!(second.same_outcome(&engine.score(&c, &d)));
    wait_for_key(&f.store, &result_key("a", "b:c")).await;

    let first = f.cache.lookup("a:b", "c").await.expect("first pair kept");
    assert!(first.same_outcome(&engine.score(&a, &b)));
}

#[tokio::test]
async fn test_bypass_recomputes_and_overwrites() {
    let f = fixture();
    let (a, b) = (song(0.8, 120.0), song(0.6, 100.0));

    let mut planted = ScoreEngine::new().score(&a, &b);
    let expected = planted.overall_score;
    planted.overall_score = 3;
    let entry = CacheEntry::new(result_key("a", "b"), planted, f.clock.now(), f.cache.ttl());
    f.store
        .set_with_ttl(&entry.key, entry.encode().unwrap(), f.cache.ttl())
        .await
        .unwrap();

    let fresh = f.cache.get_or_compute("a", "b", &a, &b, true).await;
    assert_eq!(fresh.overall_score, expected);

    for _ in 0..100 {
        if f.cache.lookup("a", "b").await.map(|r| r.overall_score) == Some(expected) {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("bypass did not refresh the stored entry");
}

#[tokio::test]
async fn test_expired_entry_is_recomputed() {
    let f = fixture();
    let (a, b) = (song(0.8, 120.0), song(0.6, 100.0));

    f.cache.get_or_compute("a", "b", &a, &b, false).await;
    wait_for_key(&f.store, &result_key("a", "b")).await;

    f.clock.advance(f.cache.ttl());
    assert!(f.cache.lookup("a", "b").await.is_none());

    let result = f.cache.get_or_compute("a", "b", &a, &b, false).await;
    assert!(result.same_outcome(&ScoreEngine::new().score(&a, &b)));
    wait_for_key(&f.store, &result_key("a", "b")).await;
}

#[tokio::test]
async fn test_short_ttl() {
    let clock = Arc::new(ManualClock::default());
    let store = Arc::new(MemoryStore::with_clock(clock.clone()));
    let cache = ResultCache::new(store.clone(), Arc::new(ScoreEngine::new()), clock.clone())
        .with_ttl(Duration::from_secs(60));
    let (a, b) = (song(0.8, 120.0), song(0.6, 100.0));

    cache.get_or_compute("a", "b", &a, &b, false).await;
    wait_for_key(&store, &result_key("a", "b")).await;

    clock.advance(Duration::from_secs(59));
    assert!(cache.lookup("a", "b").await.is_some());
    clock.advance(Duration::from_secs(1));
    assert!(cache.lookup("a", "b").await.is_none());
}

#[tokio::test]
async fn test_broken_store_never_fails_scoring() {
    let clock = Arc::new(ManualClock::default());
    let cache = ResultCache::new(Arc::new(BrokenStore), Arc::new(ScoreEngine::new()), clock);
    let (a, b) = (song(0.8, 120.0), song(0.6, 100.0));

    let result = cache.get_or_compute("a", "b", &a, &b, false).await;
    assert!(result.same_outcome(&ScoreEngine::new().score(&a, &b)));
    assert!(cache.lookup("a", "b").await.is_none());

    // Admin operations do report the outage
    assert!(matches!(cache.stats().await, Err(CacheError::Store(_))));
    assert!(cache.clear_all().await.is_err());
}

#[tokio::test]
async fn test_corrupt_entry_is_a_miss() {
    let f = fixture();
    let (a, b) = (song(0.8, 120.0), song(0.6, 100.0));
    f.store
        .set_with_ttl(&result_key("a", "b"), b"{not json".to_vec(), Duration::from_secs(60))
        .await
        .unwrap();

    assert!(f.cache.lookup("a", "b").await.is_none());
    let result = f.cache.get_or_compute("a", "b", &a, &b, false).await;
    assert!(result.same_outcome(&ScoreEngine::new().score(&a, &b)));
}

#[tokio::test]
async fn test_invalidate_and_clear_all() {
    let f = fixture();
    let (a, b, c) = (song(0.8, 120.0), song(0.6, 100.0), song(0.1, 70.0));

    f.cache.get_or_compute("a", "b", &a, &b, false).await;
    f.cache.get_or_compute("a", "c", &a, &c, false).await;
    wait_for_key(&f.store, &result_key("a", "b")).await;
    wait_for_key(&f.store, &result_key("a", "c")).await;

    // Unrelated keys must survive clear_all
    f.store
        .set_with_ttl("track:spotify:1", vec![1], Duration::from_secs(60))
        .await
        .unwrap();

    assert!(f.cache.invalidate("b", "a").await.unwrap());
    assert!(!f.cache.invalidate("b", "a").await.unwrap());
    assert!(f.cache.lookup("a", "b").await.is_none());

    assert_eq!(f.cache.clear_all().await.unwrap(), 1);
    assert!(f.cache.lookup("a", "c").await.is_none());
    assert!(f.store.get("track:spotify:1").await.unwrap().is_some());
}

#[tokio::test]
async fn test_stats() {
    let f = fixture();
    let empty = f.cache.stats().await.unwrap();
    assert_eq!(empty.entries, 0);
    assert_eq!(empty.approx_bytes, 0);
    assert_eq!(empty.oldest_key, None);

    let (a, b, c) = (song(0.8, 120.0), song(0.6, 100.0), song(0.1, 70.0));
    f.cache.get_or_compute("a", "b", &a, &b, false).await;
    wait_for_key(&f.store, &result_key("a", "b")).await;
    f.clock.advance(Duration::from_secs(3600));
    f.cache.get_or_compute("a", "c", &a, &c, false).await;
    wait_for_key(&f.store, &result_key("a", "c")).await;

    let stats = f.cache.stats().await.unwrap();
    assert_eq!(stats.entries, 2);
    assert_eq!(stats.sampled, 2);
    assert!(stats.approx_bytes > 0);
    assert_eq!(stats.oldest_key.as_deref(), Some(result_key("a", "b").as_str()));
}

#[tokio::test]
async fn test_stats_sample_is_bounded() {
    let clock = Arc::new(ManualClock::default());
    let store = Arc::new(MemoryStore::with_clock(clock.clone()));
    let cache = ResultCache::new(store.clone(), Arc::new(ScoreEngine::new()), clock).with_stats_sample(2);

    for i in 0..5 {
        store
            .set_with_ttl(&format!("match:{}:z", i), vec![0; 10], Duration::from_secs(60))
            .await
            .unwrap();
    }

    let stats = cache.stats().await.unwrap();
    assert_eq!(stats.entries, 5);
    assert_eq!(stats.sampled, 2);
    assert_eq!(stats.approx_bytes, 50);
}
