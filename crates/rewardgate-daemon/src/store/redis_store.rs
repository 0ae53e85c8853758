use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::Script;

use super::{ClaimStore, StoreError};

const RELEASE_IF_OWNER: &str = r#"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    return redis.call('DEL', KEYS[1])
end
return 0
"#;

#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    release: Script,
}

impl RedisStore {
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        tracing::info!("connected to redis claim store");
        Ok(Self {
            conn,
            release: Script::new(RELEASE_IF_OWNER),
        })
    }
}

#[async_trait]
impl ClaimStore for RedisStore {
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("PX")
            .arg(ttl.as_millis() as u64)
            .query_async(&mut conn)
            .await?;
        Ok(reply.is_some())
    }

    async fn delete_if_equals(&self, key: &str, expected: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        let deleted: i64 = self
            .release
            .key(key)
            .arg(expected)
            .invoke_async(&mut conn)
            .await?;
        Ok(deleted > 0)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let () = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn push_capped(&self, key: &str, value: &str, cap: usize) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let stop = cap.saturating_sub(1) as i64;
        let () = redis::pipe()
            .atomic()
            .cmd("LPUSH")
            .arg(key)
            .arg(value)
            .ignore()
            .cmd("LTRIM")
            .arg(key)
            .arg(0)
            .arg(stop)
            .ignore()
            .query_async(&mut conn)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::REDIS_URL_ENV;

    #[tokio::test]
    #[ignore = "needs a redis server at REWARDGATE_REDIS_URL"]
    async fn redis_backend_honours_store_contract() {
        let Ok(url) = std::env::var(REDIS_URL_ENV) else {
            eprintln!("{REDIS_URL_ENV} not set; skipping");
            return;
        };
        let store = RedisStore::connect(&url).await.unwrap();
        let key = format!("rewardgate:test:{:032x}", rand::random::<u128>());
        let ttl = Duration::from_secs(5);

        assert!(store.set_if_absent(&key, "owner-a", ttl).await.unwrap());
        assert!(!store.set_if_absent(&key, "owner-b", ttl).await.unwrap());
        assert!(!store.delete_if_equals(&key, "owner-b").await.unwrap());
        assert_eq!(store.get(&key).await.unwrap().as_deref(), Some("owner-a"));
        assert!(store.delete_if_equals(&key, "owner-a").await.unwrap());
        assert_eq!(store.get(&key).await.unwrap(), None);

        assert!(store
            .set_if_absent(&key, "short", Duration::from_millis(50))
            .await
            .unwrap());
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(store.set_if_absent(&key, "after-expiry", ttl).await.unwrap());
        assert!(store.delete_if_equals(&key, "after-expiry").await.unwrap());

        let list = format!("{key}:audit");
        for i in 0..5 {
            store.push_capped(&list, &i.to_string(), 3).await.unwrap();
        }
        let mut conn = store.conn.clone();
        let entries: Vec<String> = redis::cmd("LRANGE")
            .arg(&list)
            .arg(0)
            .arg(-1)
            .query_async(&mut conn)
            .await
            .unwrap();
        assert_eq!(entries, vec!["4", "3", "2"]);

        store.set(&key, "1700000000000").await.unwrap();
        assert_eq!(store.get(&key).await.unwrap().as_deref(), Some("1700000000000"));
        let _: i64 = redis::cmd("DEL")
            .arg(&key)
            .arg(&list)
            .query_async(&mut conn)
            .await
            .unwrap();
    }
}
