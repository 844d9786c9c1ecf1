//! Redis 回退后端集成测试
//!
//! 需要本地 Redis：`cargo test -p kvbridge-adapter-redis -- --ignored`
//! 集群测试读取 `KVBRIDGE_TEST_CLUSTER_NODES`，默认 `redis://127.0.0.1:7000`

use kvbridge_adapter_redis::{RedisBackend, RedisClusterBackend};
use kvbridge_common::{ExpireCondition, HashFields, Key, SetOptions, Value};
use kvbridge_errors::{AppError, Platform};
use kvbridge_ports::RedisCommands;
use tokio_test::{assert_err, assert_ok};
use uuid::Uuid;

const REDIS_URL: &str = "redis://127.0.0.1:6379";

fn key() -> Key {
    Key::from(format!("kvbridge:{}", Uuid::new_v4()))
}

#[tokio::test]
#[ignore]
async fn test_set_get_with_expiry() {
    let backend = assert_ok!(RedisBackend::connect(REDIS_URL).await);
    let k = key();

    let ok = assert_ok!(
        backend
            .set(k.clone(), Value::from("v"), SetOptions::new().ex(30))
            .await
    );
    assert!(ok.is_some());
    assert_eq!(assert_ok!(backend.get(k.clone()).await), Some("v".to_string()));
    assert!(matches!(assert_ok!(backend.ttl(k.clone()).await), Some(29..=30)));

    let again = assert_ok!(
        backend
            .set(k.clone(), Value::from("w"), SetOptions::new().nx())
            .await
    );
    assert_eq!(again, None);

    assert_eq!(assert_ok!(backend.del(vec![k.clone(), key()]).await), 1);
}

#[tokio::test]
#[ignore]
async fn test_hash_and_counter() {
    let backend = assert_ok!(RedisBackend::connect(REDIS_URL).await);
    let (h, counter) = (key(), key());

    let added = assert_ok!(
        backend
            .hset(h.clone(), HashFields::new().field("a", "1").field("b", "2"))
            .await
    );
    assert_eq!(added, 2);
    let values = assert_ok!(backend.hmget(h.clone(), vec!["b".into(), "zz".into()]).await);
    assert_eq!(values, vec![Some("2".to_string()), None]);
    assert_eq!(assert_ok!(backend.hgetall(h.clone()).await).len(), 2);

    assert_eq!(assert_ok!(backend.incr(counter.clone()).await), 1);
    assert_eq!(assert_ok!(backend.incr(counter.clone()).await), 2);
    assert_ok!(backend.del(vec![h, counter]).await);
}

#[tokio::test]
#[ignore]
async fn test_incr_on_text_is_a_backend_error() {
    let backend = assert_ok!(RedisBackend::connect(REDIS_URL).await);
    let k = key();
    assert_ok!(backend.set(k.clone(), Value::from("abc"), SetOptions::new()).await);

    let err = assert_err!(backend.incr(k.clone()).await);
    assert!(matches!(err, AppError::Backend(_)));
    assert_ok!(backend.del(vec![k]).await);
}

#[tokio::test]
#[ignore]
async fn test_pexpire_conditions() {
    let backend = assert_ok!(RedisBackend::connect(REDIS_URL).await);
    let k = key();
    assert_ok!(
        backend
            .set(k.clone(), Value::from(1), SetOptions::new().px(10_000))
            .await
    );

    let shorter = assert_ok!(
        backend
            .pexpire(k.clone(), 5_000, Some(ExpireCondition::Gt))
            .await
    );
    assert_eq!(shorter, 0);
    let longer = assert_ok!(
        backend
            .pexpire(k.clone(), 20_000, Some(ExpireCondition::Gt))
            .await
    );
    assert_eq!(longer, 1);
    assert_eq!(assert_ok!(backend.pexpire(key(), 1_000, None).await), 0);
    assert_ok!(backend.del(vec![k]).await);
}

#[tokio::test]
#[ignore]
async fn test_quit_closes_backend() {
    let backend = assert_ok!(RedisBackend::connect(REDIS_URL).await);
    assert_ok!(backend.quit().await);
    assert!(backend.is_closed());

    let err = assert_err!(backend.get(key()).await);
    assert!(matches!(err, AppError::Closed(_)));
}

fn cluster_nodes() -> Vec<String> {
    std::env::var("KVBRIDGE_TEST_CLUSTER_NODES")
        .unwrap_or_else(|_| "redis://127.0.0.1:7000".to_string())
        .split(',')
        .map(|node| node.trim().to_string())
        .collect()
}

#[tokio::test]
#[ignore]
async fn test_cluster_round_trip() {
    let backend = assert_ok!(RedisClusterBackend::connect_cluster(&cluster_nodes()).await);
    assert_eq!(backend.platform(), Platform::FallbackBackend);

    let (k1, k2) = (key(), key());
    assert_ok!(
        backend
            .set(k1.clone(), Value::from("one"), SetOptions::new().ex(30))
            .await
    );
    assert_ok!(backend.set(k2.clone(), Value::from("two"), SetOptions::new()).await);
    assert_eq!(assert_ok!(backend.get(k1.clone()).await), Some("one".to_string()));
    assert!(matches!(assert_ok!(backend.ttl(k1.clone()).await), Some(29..=30)));

    let h = key();
    assert_ok!(backend.hset(h.clone(), HashFields::new().field("f", "v")).await);
    assert_eq!(
        assert_ok!(backend.hget(h.clone(), "f".into()).await),
        Some("v".to_string())
    );

    for k in [k1, k2, h] {
        assert_eq!(assert_ok!(backend.del(vec![k]).await), 1);
    }
}
