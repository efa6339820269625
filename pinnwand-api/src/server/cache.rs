use pinnwand_common::model::post::Post;
use std::{
    fmt::{Debug, Formatter},
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::Mutex;

/// How long a cached global listing keeps being served. Writes do not
/// invalidate the slot, so the index feed may lag by up to this long.
pub const GLOBAL_FEED_TTL: Duration = Duration::from_secs(20);

pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Single-slot expiry cache for the global post listing. There is exactly
/// one entry for the whole system, not one per viewer.
pub struct FeedCache {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    slot: Mutex<Option<Snapshot>>,
}

#[derive(Clone, Debug)]
struct Snapshot {
    stored_at: Instant,
    posts: Arc<[Post]>,
}

impl FeedCache {
    #[must_use]
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            slot: Mutex::new(None),
        }
    }

    /// Return the stored snapshot while it is fresh; otherwise run `load`
    /// and store its result with a new timestamp. The loader runs under the
    /// slot lock, so concurrent misses populate once.
    pub async fn get_or_populate<F, Fut, E>(&self, load: F) -> Result<Arc<[Post]>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<Post>, E>>,
    {
        let mut slot = self.slot.lock().await;
        let now = self.clock.now();

        if let Some(snapshot) = slot.as_ref()
            && now.duration_since(snapshot.stored_at) < self.ttl
        {
            return Ok(Arc::clone(&snapshot.posts));
        }

        let posts: Arc<[Post]> = load().await?.into();
        *slot = Some(Snapshot {
            stored_at: now,
            posts: Arc::clone(&posts),
        });

        Ok(posts)
    }
}

impl Debug for FeedCache {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedCache")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pinnwand_common::model::{
        post::{Post, PostText},
        user::{User, Username},
    };
    use std::convert::Infallible;
    use std::sync::Mutex as StdMutex;
    use time::UtcDateTime;

    pub(crate) struct ManualClock {
        start: Instant,
        advanced: StdMutex<Duration>,
    }

    impl ManualClock {
        pub(crate) fn new() -> Self {
            Self {
                start: Instant::now(),
                advanced: StdMutex::new(Duration::ZERO),
            }
        }

        pub(crate) fn advance(&self, by: Duration) {
            *self.advanced.lock().unwrap() += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            self.start + *self.advanced.lock().unwrap()
        }
    }

    fn post(id: i64, text: &str) -> Post {
        Post {
            id: id.into(),
            author: User {
                id: 1.into(),
                username: Username::new("leo".to_owned()).unwrap(),
            },
            text: PostText::new(text).unwrap(),
            published_at: UtcDateTime::now(),
            group: None,
            image: None,
        }
    }

    async fn populate(cache: &FeedCache, posts: Vec<Post>, loads: &StdMutex<u32>) -> Arc<[Post]> {
        cache
            .get_or_populate(|| async {
                *loads.lock().unwrap() += 1;
                Ok::<_, Infallible>(posts)
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn serves_the_stored_snapshot_within_the_ttl() {
        let clock = Arc::new(ManualClock::new());
        let cache = FeedCache::new(GLOBAL_FEED_TTL, Arc::clone(&clock) as Arc<dyn Clock>);
        let loads = StdMutex::new(0);

        let first = populate(&cache, vec![post(1, "old")], &loads).await;
        clock.advance(Duration::from_secs(19));
        // A post was written in between, but the slot is still fresh.
        let second = populate(&cache, vec![post(1, "old"), post(2, "new")], &loads).await;

        assert_eq!(first, second);
        assert_eq!(second.len(), 1);
        assert_eq!(*loads.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn reloads_once_the_ttl_has_elapsed() {
        let clock = Arc::new(ManualClock::new());
        let cache = FeedCache::new(GLOBAL_FEED_TTL, Arc::clone(&clock) as Arc<dyn Clock>);
        let loads = StdMutex::new(0);

        populate(&cache, vec![post(1, "old")], &loads).await;
        clock.advance(GLOBAL_FEED_TTL);
        let refreshed = populate(&cache, vec![post(1, "old"), post(2, "new")], &loads).await;

        assert_eq!(refreshed.len(), 2);
        assert_eq!(*loads.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn a_failed_load_leaves_the_slot_unpopulated() {
        let clock = Arc::new(ManualClock::new());
        let cache = FeedCache::new(GLOBAL_FEED_TTL, Arc::clone(&clock) as Arc<dyn Clock>);

        let result: Result<_, &str> = cache.get_or_populate(|| async { Err("boom") }).await;
        assert!(result.is_err());

        let loads = StdMutex::new(0);
        let posts = populate(&cache, vec![post(1, "first")], &loads).await;
        assert_eq!(posts.len(), 1);
        assert_eq!(*loads.lock().unwrap(), 1);
    }
}
