//! 内存缓存客户端
//!
//! - 每个缓存是一个独立命名空间，操作不存在的缓存返回 `NOT_FOUND_ERROR`
//! - 所有条目都有 TTL，未指定时使用默认 TTL
//! - 过期采用惰性清理，访问时判断；每隔若干次写操作清扫一次所在命名空间

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use kvbridge_errors::ErrorCode;
use kvbridge_ports::{
    CacheClient, CacheError, DeleteResponse, DictionaryFetchResponse, DictionaryGetFieldResponse,
    DictionaryGetFieldsResponse, DictionaryRemoveFieldsResponse, DictionarySetFieldsResponse,
    FlushResponse, GetBatchResponse, GetResponse, IncrementResponse, ItemGetTtlResponse,
    SetBatchResponse, SetIfAbsentResponse, SetResponse, UpdateTtlResponse,
};
use parking_lot::RwLock;
use tracing::{debug, info};

/// 条目内容
#[derive(Debug, Clone)]
enum Item {
    Scalar(Vec<u8>),
    Dictionary(HashMap<Vec<u8>, Vec<u8>>),
}

/// 带过期时间的条目
#[derive(Debug, Clone)]
struct Entry {
    item: Item,
    expires_at: Instant,
}

/// 截止时间上限，超出的 TTL 按此处理
const MAX_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// 默认每 1024 次写操作清扫一次
const DEFAULT_SWEEP_INTERVAL: u64 = 1024;

fn deadline(ttl: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(ttl)
        .or_else(|| now.checked_add(MAX_TTL))
        .unwrap_or(now)
}

impl Entry {
    fn new(item: Item, ttl: Duration) -> Self {
        Self {
            item,
            expires_at: deadline(ttl),
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    fn remaining(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }
}

type Namespace = HashMap<Vec<u8>, Entry>;

/// 进程内缓存客户端
#[derive(Debug)]
pub struct MemoryCacheClient {
    caches: RwLock<HashMap<String, Namespace>>,
    default_ttl: Duration,
    latency: Option<Duration>,
    sweep_interval: u64,
    writes: AtomicU64,
    closed: AtomicBool,
}

impl MemoryCacheClient {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            caches: RwLock::new(HashMap::new()),
            default_ttl,
            latency: None,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            writes: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// 预先创建缓存
    pub fn with_cache(self, cache_name: impl Into<String>) -> Self {
        self.create_cache(cache_name);
        self
    }

    /// 每次操作前附加的固定延迟
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn create_cache(&self, cache_name: impl Into<String>) -> bool {
        let cache_name = cache_name.into();
        let mut caches = self.caches.write();
        if caches.contains_key(&cache_name) {
            return false;
        }
        info!(cache = %cache_name, "Memory cache created");
        caches.insert(cache_name, Namespace::new());
        true
    }

    /// 每 `interval` 次写操作清扫一次过期条目，0 表示只惰性清理
    pub fn with_sweep_interval(mut self, interval: u64) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// 清除所有缓存中的过期条目，返回清除数量
    pub fn purge_expired(&self) -> usize {
        self.caches.write().values_mut().map(sweep).sum()
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// 未过期条目数
    pub fn item_count(&self, cache_name: &str) -> usize {
        self.caches
            .read()
            .get(cache_name)
            .map(|ns| ns.values().filter(|e| !e.is_expired()).count())
            .unwrap_or(0)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    /// 在指定缓存上执行操作
    fn with_namespace<T>(
        &self,
        cache_name: &str,
        f: impl FnOnce(&mut Namespace) -> T,
    ) -> Result<T, CacheError> {
        if self.is_closed() {
            return Err(CacheError::new(ErrorCode::ConnectionError, "Client is closed"));
        }
        let mut caches = self.caches.write();
        let namespace = caches.get_mut(cache_name).ok_or_else(|| {
            CacheError::new(
                ErrorCode::NotFoundError,
                format!("Cache not found: {}", cache_name),
            )
        })?;
        Ok(f(namespace))
    }

    /// 写操作入口，按间隔顺带清扫
    fn with_namespace_mut<T>(
        &self,
        cache_name: &str,
        f: impl FnOnce(&mut Namespace) -> T,
    ) -> Result<T, CacheError> {
        let writes = self.writes.fetch_add(1, Ordering::Relaxed) + 1;
        let due = self.sweep_interval > 0 && writes % self.sweep_interval == 0;
        self.with_namespace(cache_name, |ns| {
            if due {
                let removed = sweep(ns);
                debug!(cache = %cache_name, removed, "Swept expired entries");
            }
            f(ns)
        })
    }

    fn ttl_or_default(&self, ttl: Option<Duration>) -> Duration {
        ttl.unwrap_or(self.default_ttl)
    }
}

fn sweep(namespace: &mut Namespace) -> usize {
    let before = namespace.len();
    namespace.retain(|_, entry| !entry.is_expired());
    before - namespace.len()
}

/// 读取未过期条目，过期条目顺便清理
fn live<'a>(namespace: &'a mut Namespace, key: &[u8]) -> Option<&'a mut Entry> {
    if namespace.get(key).is_some_and(Entry::is_expired) {
        namespace.remove(key);
    }
    namespace.get_mut(key)
}

fn wrong_type(expected: &str) -> CacheError {
    CacheError::new(
        ErrorCode::BadRequestError,
        format!("Item at key is not a {}", expected),
    )
}

fn read_scalar(namespace: &mut Namespace, key: &[u8]) -> GetResponse {
    match live(namespace, key) {
        Some(Entry {
            item: Item::Scalar(value),
            ..
        }) => GetResponse::Hit(value.clone()),
        Some(_) => GetResponse::Error(wrong_type("scalar")),
        None => GetResponse::Miss,
    }
}

fn read_dictionary<'a>(
    namespace: &'a mut Namespace,
    dictionary: &[u8],
) -> Result<Option<&'a mut HashMap<Vec<u8>, Vec<u8>>>, CacheError> {
    match live(namespace, dictionary) {
        Some(Entry {
            item: Item::Dictionary(fields),
            ..
        }) => Ok(Some(fields)),
        Some(_) => Err(wrong_type("dictionary")),
        None => Ok(None),
    }
}

#[async_trait]
impl CacheClient for MemoryCacheClient {
    async fn get(&self, cache_name: &str, key: &[u8]) -> GetResponse {
        self.simulate_latency().await;
        match self.with_namespace(cache_name, |ns| read_scalar(ns, key)) {
            Ok(rsp) => rsp,
            Err(e) => GetResponse::Error(e),
        }
    }

    async fn set(
        &self,
        cache_name: &str,
        key: &[u8],
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> SetResponse {
        self.simulate_latency().await;
        let ttl = self.ttl_or_default(ttl);
        match self.with_namespace_mut(cache_name, |ns| {
            ns.insert(key.to_vec(), Entry::new(Item::Scalar(value), ttl));
        }) {
            Ok(()) => SetResponse::Success,
            Err(e) => SetResponse::Error(e),
        }
    }

    async fn set_if_absent(
        &self,
        cache_name: &str,
        key: &[u8],
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> SetIfAbsentResponse {
        self.simulate_latency().await;
        let ttl = self.ttl_or_default(ttl);
        let result = self.with_namespace_mut(cache_name, |ns| {
            if live(ns, key).is_some() {
                return false;
            }
            ns.insert(key.to_vec(), Entry::new(Item::Scalar(value), ttl));
            true
        });
        match result {
            Ok(true) => SetIfAbsentResponse::Stored,
            Ok(false) => SetIfAbsentResponse::NotStored,
            Err(e) => SetIfAbsentResponse::Error(e),
        }
    }

    async fn delete(&self, cache_name: &str, key: &[u8]) -> DeleteResponse {
        self.simulate_latency().await;
        match self.with_namespace(cache_name, |ns| {
            ns.remove(key);
        }) {
            Ok(()) => DeleteResponse::Success,
            Err(e) => DeleteResponse::Error(e),
        }
    }

    async fn get_batch(&self, cache_name: &str, keys: &[Vec<u8>]) -> GetBatchResponse {
        self.simulate_latency().await;
        let result = self.with_namespace(cache_name, |ns| {
            keys.iter().map(|key| read_scalar(ns, key)).collect()
        });
        match result {
            Ok(responses) => GetBatchResponse::Success(responses),
            Err(e) => GetBatchResponse::Error(e),
        }
    }

    async fn set_batch(
        &self,
        cache_name: &str,
        items: Vec<(Vec<u8>, Vec<u8>)>,
        ttl: Option<Duration>,
    ) -> SetBatchResponse {
        self.simulate_latency().await;
        let ttl = self.ttl_or_default(ttl);
        let result = self.with_namespace_mut(cache_name, |ns| {
            items
                .into_iter()
                .map(|(key, value)| {
                    ns.insert(key, Entry::new(Item::Scalar(value), ttl));
                    SetResponse::Success
                })
                .collect()
        });
        match result {
            Ok(responses) => SetBatchResponse::Success(responses),
            Err(e) => SetBatchResponse::Error(e),
        }
    }

    async fn increment(&self, cache_name: &str, key: &[u8], amount: i64) -> IncrementResponse {
        self.simulate_latency().await;
        let default_ttl = self.default_ttl;
        let result = self.with_namespace_mut(cache_name, |ns| match live(ns, key) {
            Some(entry) => {
                let Item::Scalar(current) = &entry.item else {
                    return Err(wrong_type("scalar"));
                };
                let next = std::str::from_utf8(current)
                    .ok()
                    .and_then(|s| s.parse::<i64>().ok())
                    .and_then(|n| n.checked_add(amount))
                    .ok_or_else(|| {
                        CacheError::new(
                            ErrorCode::FailedPreconditionError,
                            "failed to parse value into long",
                        )
                    })?;
                entry.item = Item::Scalar(next.to_string().into_bytes());
                Ok(next)
            }
            None => {
                ns.insert(
                    key.to_vec(),
                    Entry::new(Item::Scalar(amount.to_string().into_bytes()), default_ttl),
                );
                Ok(amount)
            }
        });
        match result {
            Ok(Ok(value)) => IncrementResponse::Success(value),
            Ok(Err(e)) | Err(e) => IncrementResponse::Error(e),
        }
    }

    async fn item_get_ttl(&self, cache_name: &str, key: &[u8]) -> ItemGetTtlResponse {
        self.simulate_latency().await;
        match self.with_namespace(cache_name, |ns| live(ns, key).map(|e| e.remaining())) {
            Ok(Some(remaining)) => ItemGetTtlResponse::Hit(remaining),
            Ok(None) => ItemGetTtlResponse::Miss,
            Err(e) => ItemGetTtlResponse::Error(e),
        }
    }

    async fn update_ttl(&self, cache_name: &str, key: &[u8], ttl: Duration) -> UpdateTtlResponse {
        self.simulate_latency().await;
        let result = self.with_namespace_mut(cache_name, |ns| match live(ns, key) {
            Some(entry) => {
                entry.expires_at = deadline(ttl);
                true
            }
            None => false,
        });
        match result {
            Ok(true) => UpdateTtlResponse::Set,
            Ok(false) => UpdateTtlResponse::Miss,
            Err(e) => UpdateTtlResponse::Error(e),
        }
    }

    async fn dictionary_set_fields(
        &self,
        cache_name: &str,
        dictionary: &[u8],
        fields: Vec<(Vec<u8>, Vec<u8>)>,
    ) -> DictionarySetFieldsResponse {
        self.simulate_latency().await;
        let default_ttl = self.default_ttl;
        let result = self.with_namespace_mut(cache_name, |ns| {
            match read_dictionary(ns, dictionary)? {
                Some(existing) => existing.extend(fields),
                None => {
                    let map = fields.into_iter().collect();
                    ns.insert(
                        dictionary.to_vec(),
                        Entry::new(Item::Dictionary(map), default_ttl),
                    );
                }
            }
            Ok(())
        });
        match result {
            Ok(Ok(())) => DictionarySetFieldsResponse::Success,
            Ok(Err(e)) | Err(e) => DictionarySetFieldsResponse::Error(e),
        }
    }

    async fn dictionary_get_field(
        &self,
        cache_name: &str,
        dictionary: &[u8],
        field: &[u8],
    ) -> DictionaryGetFieldResponse {
        self.simulate_latency().await;
        let result = self.with_namespace(cache_name, |ns| {
            read_dictionary(ns, dictionary).map(|d| d.and_then(|fields| fields.get(field).cloned()))
        });
        match result {
            Ok(Ok(Some(value))) => DictionaryGetFieldResponse::Hit(value),
            Ok(Ok(None)) => DictionaryGetFieldResponse::Miss,
            Ok(Err(e)) | Err(e) => DictionaryGetFieldResponse::Error(e),
        }
    }

    async fn dictionary_get_fields(
        &self,
        cache_name: &str,
        dictionary: &[u8],
        fields: &[Vec<u8>],
    ) -> DictionaryGetFieldsResponse {
        self.simulate_latency().await;
        let result = self.with_namespace(cache_name, |ns| {
            read_dictionary(ns, dictionary).map(|d| {
                d.map(|stored| {
                    fields
                        .iter()
                        .map(|field| match stored.get(field) {
                            Some(value) => DictionaryGetFieldResponse::Hit(value.clone()),
                            None => DictionaryGetFieldResponse::Miss,
                        })
                        .collect::<Vec<_>>()
                })
            })
        });
        match result {
            Ok(Ok(Some(responses))) => DictionaryGetFieldsResponse::Hit(responses),
            Ok(Ok(None)) => DictionaryGetFieldsResponse::Miss,
            Ok(Err(e)) | Err(e) => DictionaryGetFieldsResponse::Error(e),
        }
    }

    async fn dictionary_fetch(&self, cache_name: &str, dictionary: &[u8]) -> DictionaryFetchResponse {
        self.simulate_latency().await;
        let result = self.with_namespace(cache_name, |ns| {
            read_dictionary(ns, dictionary).map(|d| {
                d.filter(|fields| !fields.is_empty()).map(|fields| {
                    fields
                        .iter()
                        .map(|(k, v)| (k.clone(), v.clone()))
                        .collect::<Vec<_>>()
                })
            })
        });
        match result {
            Ok(Ok(Some(pairs))) => DictionaryFetchResponse::Hit(pairs),
            Ok(Ok(None)) => DictionaryFetchResponse::Miss,
            Ok(Err(e)) | Err(e) => DictionaryFetchResponse::Error(e),
        }
    }

    async fn dictionary_remove_fields(
        &self,
        cache_name: &str,
        dictionary: &[u8],
        fields: &[Vec<u8>],
    ) -> DictionaryRemoveFieldsResponse {
        self.simulate_latency().await;
        let result = self.with_namespace(cache_name, |ns| {
            let now_empty = match read_dictionary(ns, dictionary)? {
                Some(stored) => {
                    for field in fields {
                        stored.remove(field);
                    }
                    stored.is_empty()
                }
                None => false,
            };
            if now_empty {
                ns.remove(dictionary);
            }
            Ok(())
        });
        match result {
            Ok(Ok(())) => DictionaryRemoveFieldsResponse::Success,
            Ok(Err(e)) | Err(e) => DictionaryRemoveFieldsResponse::Error(e),
        }
    }

    async fn flush_cache(&self, cache_name: &str) -> FlushResponse {
        self.simulate_latency().await;
        match self.with_namespace(cache_name, |ns| ns.clear()) {
            Ok(()) => {
                debug!(cache = %cache_name, "Memory cache flushed");
                FlushResponse::Success
            }
            Err(e) => FlushResponse::Error(e),
        }
    }

    async fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            info!("Memory cache client closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CACHE: &str = "test-cache";

    fn client() -> MemoryCacheClient {
        MemoryCacheClient::new(Duration::from_secs(60)).with_cache(CACHE)
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let client = client();
        assert_eq!(
            client.set(CACHE, b"key", b"value".to_vec(), None).await,
            SetResponse::Success
        );
        assert_eq!(client.get(CACHE, b"key").await, GetResponse::Hit(b"value".to_vec()));
        assert_eq!(client.get(CACHE, b"missing").await, GetResponse::Miss);
    }

    #[tokio::test]
    async fn test_unknown_cache_is_an_error() {
        let client = client();
        match client.get("nope", b"key").await {
            GetResponse::Error(e) => assert_eq!(e.code, ErrorCode::NotFoundError),
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_ttl_expiration() {
        let client = client();
        client
            .set(CACHE, b"short", b"v".to_vec(), Some(Duration::from_millis(50)))
            .await;
        assert!(matches!(client.get(CACHE, b"short").await, GetResponse::Hit(_)));

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(client.get(CACHE, b"short").await, GetResponse::Miss);
        assert_eq!(client.item_get_ttl(CACHE, b"short").await, ItemGetTtlResponse::Miss);
    }

    #[tokio::test]
    async fn test_set_if_absent() {
        let client = client();
        assert_eq!(
            client.set_if_absent(CACHE, b"k", b"v1".to_vec(), None).await,
            SetIfAbsentResponse::Stored
        );
        assert_eq!(
            client.set_if_absent(CACHE, b"k", b"v2".to_vec(), None).await,
            SetIfAbsentResponse::NotStored
        );
        assert_eq!(client.get(CACHE, b"k").await, GetResponse::Hit(b"v1".to_vec()));
    }

    #[tokio::test]
    async fn test_increment() {
        let client = client();
        assert_eq!(client.increment(CACHE, b"n", 1).await, IncrementResponse::Success(1));
        assert_eq!(client.increment(CACHE, b"n", 1).await, IncrementResponse::Success(2));

        client.set(CACHE, b"s", b"monkey".to_vec(), None).await;
        match client.increment(CACHE, b"s", 1).await {
            IncrementResponse::Error(e) => {
                assert_eq!(e.code, ErrorCode::FailedPreconditionError);
                assert_eq!(e.message(), "failed to parse value into long");
            }
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_ttl_lookup_and_update() {
        let client = client();
        client
            .set(CACHE, b"k", b"v".to_vec(), Some(Duration::from_secs(5)))
            .await;

        let ItemGetTtlResponse::Hit(remaining) = client.item_get_ttl(CACHE, b"k").await else {
            panic!("expected ttl hit");
        };
        assert!(remaining <= Duration::from_secs(5));
        assert!(remaining > Duration::from_secs(4));

        assert_eq!(
            client.update_ttl(CACHE, b"k", Duration::from_secs(30)).await,
            UpdateTtlResponse::Set
        );
        let ItemGetTtlResponse::Hit(remaining) = client.item_get_ttl(CACHE, b"k").await else {
            panic!("expected ttl hit");
        };
        assert!(remaining > Duration::from_secs(25));

        assert_eq!(
            client.update_ttl(CACHE, b"missing", Duration::from_secs(30)).await,
            UpdateTtlResponse::Miss
        );
    }

    #[tokio::test]
    async fn test_dictionary_lifecycle() {
        let client = client();
        let fields = vec![
            (b"f1".to_vec(), b"v1".to_vec()),
            (b"f2".to_vec(), b"v2".to_vec()),
        ];
        assert_eq!(
            client.dictionary_set_fields(CACHE, b"dict", fields).await,
            DictionarySetFieldsResponse::Success
        );
        assert_eq!(
            client.dictionary_get_field(CACHE, b"dict", b"f1").await,
            DictionaryGetFieldResponse::Hit(b"v1".to_vec())
        );
        assert_eq!(
            client
                .dictionary_get_fields(CACHE, b"dict", &[b"f2".to_vec(), b"nope".to_vec()])
                .await,
            DictionaryGetFieldsResponse::Hit(vec![
                DictionaryGetFieldResponse::Hit(b"v2".to_vec()),
                DictionaryGetFieldResponse::Miss,
            ])
        );

        client
            .dictionary_remove_fields(CACHE, b"dict", &[b"f1".to_vec()])
            .await;
        let DictionaryFetchResponse::Hit(pairs) = client.dictionary_fetch(CACHE, b"dict").await
        else {
            panic!("expected dictionary hit");
        };
        assert_eq!(pairs, vec![(b"f2".to_vec(), b"v2".to_vec())]);

        client
            .dictionary_remove_fields(CACHE, b"dict", &[b"f2".to_vec()])
            .await;
        assert_eq!(
            client.dictionary_fetch(CACHE, b"dict").await,
            DictionaryFetchResponse::Miss
        );
    }

    #[tokio::test]
    async fn test_type_mismatch() {
        let client = client();
        client.set(CACHE, b"scalar", b"v".to_vec(), None).await;
        assert!(matches!(
            client.dictionary_fetch(CACHE, b"scalar").await,
            DictionaryFetchResponse::Error(_)
        ));
    }

    #[tokio::test]
    async fn test_batch_operations_keep_order() {
        let client = client();
        let items = vec![
            (b"a".to_vec(), b"1".to_vec()),
            (b"b".to_vec(), b"2".to_vec()),
        ];
        assert_eq!(
            client.set_batch(CACHE, items, None).await,
            SetBatchResponse::Success(vec![SetResponse::Success, SetResponse::Success])
        );
        assert_eq!(
            client
                .get_batch(CACHE, &[b"b".to_vec(), b"x".to_vec(), b"a".to_vec()])
                .await,
            GetBatchResponse::Success(vec![
                GetResponse::Hit(b"2".to_vec()),
                GetResponse::Miss,
                GetResponse::Hit(b"1".to_vec()),
            ])
        );
    }

    #[tokio::test]
    async fn test_flush_and_close() {
        let client = client();
        client.set(CACHE, b"a", b"1".to_vec(), None).await;
        assert_eq!(client.item_count(CACHE), 1);

        assert_eq!(client.flush_cache(CACHE).await, FlushResponse::Success);
        assert_eq!(client.item_count(CACHE), 0);

        client.close().await;
        client.close().await;
        assert!(client.is_closed());
        assert!(matches!(client.get(CACHE, b"a").await, GetResponse::Error(_)));
    }

    fn stored(client: &MemoryCacheClient) -> usize {
        client.caches.read().get(CACHE).map(HashMap::len).unwrap_or(0)
    }

    #[tokio::test]
    async fn test_huge_ttl_saturates() {
        let client = client();
        let huge = Duration::from_secs(u64::MAX);
        assert_eq!(
            client.set(CACHE, b"k", b"v".to_vec(), Some(huge)).await,
            SetResponse::Success
        );
        assert_eq!(client.update_ttl(CACHE, b"k", huge).await, UpdateTtlResponse::Set);

        let ItemGetTtlResponse::Hit(remaining) = client.item_get_ttl(CACHE, b"k").await else {
            panic!("expected ttl hit");
        };
        assert!(remaining > Duration::from_secs(365 * 24 * 60 * 60));
    }

    #[tokio::test]
    async fn test_writes_sweep_expired_entries() {
        let client = client().with_sweep_interval(3);
        for key in [b"a", b"b"] {
            client
                .set(CACHE, key, b"v".to_vec(), Some(Duration::from_millis(10)))
                .await;
        }
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(stored(&client), 2);

        client.set(CACHE, b"c", b"v".to_vec(), None).await;
        assert_eq!(stored(&client), 1);
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let client = client().with_sweep_interval(0);
        client
            .set(CACHE, b"short", b"v".to_vec(), Some(Duration::from_millis(10)))
            .await;
        client.set(CACHE, b"long", b"v".to_vec(), None).await;
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert_eq!(client.purge_expired(), 1);
        assert_eq!(stored(&client), 1);
        assert_eq!(client.purge_expired(), 0);
    }
}
