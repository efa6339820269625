//! The cache staleness window, driven end to end: a manually advanced clock
//! against the real loader and a live PostgreSQL instance. Skipped unless
//! `DATABASE_URL` is set.

use pinnwand_api::server::cache::{Clock, FeedCache, GLOBAL_FEED_TTL};
use pinnwand_common::model::post::{NewPost, PostText};
use pinnwand_common::model::user::{CreateUser, Username};
use pinnwand_db::client::DbClient;
use sqlx::postgres::PgPoolOptions;
use std::{
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

struct ManualClock {
    start: Instant,
    advanced: Mutex<Duration>,
}

impl ManualClock {
    fn new() -> Self {
        Self {
            start: Instant::now(),
            advanced: Mutex::new(Duration::ZERO),
        }
    }

    fn advance(&self, by: Duration) {
        *self.advanced.lock().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.start + *self.advanced.lock().unwrap()
    }
}

async fn connect() -> Option<DbClient> {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping");
        return None;
    };

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&url)
        .await
        .expect("connecting to the test database");
    sqlx::raw_sql(pinnwand_db::SCHEMA_SQL)
        .execute(&pool)
        .await
        .expect("applying the schema");

    Some(DbClient::new(pool))
}

#[tokio::test]
async fn a_post_written_mid_window_only_shows_up_after_expiry() {
    let Some(db) = connect().await else { return };

    let clock = Arc::new(ManualClock::new());
    let cache = FeedCache::new(GLOBAL_FEED_TTL, Arc::clone(&clock) as Arc<dyn Clock>);
    let load = || async { db.fetch_all_posts().await };

    let before = cache.get_or_populate(load).await.unwrap();

    let username = Username::new(format!("cached-{:016x}", rand::random::<u64>())).unwrap();
    let author = db.create_user(&CreateUser { username }).await.unwrap();
    let marker = format!("written mid-window {:016x}", rand::random::<u64>());
    db.create_post(&NewPost {
        author,
        text: PostText::new(&marker).unwrap(),
        group: None,
        image: None,
    })
    .await
    .unwrap();

    // Still inside the window: the identical snapshot is served back.
    clock.advance(GLOBAL_FEED_TTL - Duration::from_secs(1));
    let during = cache.get_or_populate(load).await.unwrap();
    assert!(Arc::ptr_eq(&before, &during));
    assert!(!during.iter().any(|post| post.text.get() == marker));

    // One more second and the slot has expired.
    clock.advance(Duration::from_secs(1));
    let after = cache.get_or_populate(load).await.unwrap();
    assert!(after.iter().any(|post| post.text.get() == marker));
}
