//! Integration tests against a live PostgreSQL instance.
//!
//! They are skipped unless `DATABASE_URL` points at a database the tests may
//! write to. Fixtures use randomized names so cases stay independent of each
//! other and of leftover data.

use pinnwand_common::model::comment::{CommentText, NewComment};
use pinnwand_common::model::group::{CreateGroup, GroupSlug};
use pinnwand_common::model::post::{NewPost, PostMarker, PostText, PostUpdate};
use pinnwand_common::model::user::{CreateUser, User, UserMarker, Username};
use pinnwand_common::model::{Id, session::SessionToken};
use pinnwand_db::client::DbClient;
use sqlx::postgres::PgPoolOptions;

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

fn unique(prefix: &str) -> String {
    format!("{prefix}-{:016x}", rand::random::<u64>())
}

async fn create_test_user(db: &DbClient, prefix: &str) -> User {
    let username = Username::new(unique(prefix)).unwrap();
    let id = db
        .create_user(&CreateUser {
            username: username.clone(),
        })
        .await
        .unwrap();

    User { id, username }
}

async fn create_test_post(db: &DbClient, author: Id<UserMarker>, text: &str) -> Id<PostMarker> {
    db.create_post(&NewPost {
        author,
        text: PostText::new(text).unwrap(),
        group: None,
        image: None,
    })
    .await
    .unwrap()
}

#[tokio::test]
async fn follow_is_idempotent() {
    let Some(db) = connect().await else { return };

    let user = create_test_user(&db, "follower").await;
    let author = create_test_user(&db, "author").await;

    db.create_follow(user.id, author.id).await.unwrap();
    db.create_follow(user.id, author.id).await.unwrap();

    assert!(db.is_following(user.id, author.id).await.unwrap());
    let stats = db.follow_stats(author.id).await.unwrap();
    assert_eq!(stats.followers, 1);
}

#[tokio::test]
async fn unfollow_of_a_missing_edge_is_a_no_op() {
    let Some(db) = connect().await else { return };

    let user = create_test_user(&db, "follower").await;
    let author = create_test_user(&db, "author").await;

    db.delete_follow(user.id, author.id).await.unwrap();
    assert!(!db.is_following(user.id, author.id).await.unwrap());
}

#[tokio::test]
async fn follow_stats_count_both_directions() {
    let Some(db) = connect().await else { return };

    let a = create_test_user(&db, "a").await;
    let b = create_test_user(&db, "b").await;
    let c = create_test_user(&db, "c").await;

    db.create_follow(a.id, b.id).await.unwrap();
    db.create_follow(c.id, b.id).await.unwrap();
    db.create_follow(b.id, a.id).await.unwrap();

    let stats_b = db.follow_stats(b.id).await.unwrap();
    assert_eq!(stats_b.followers, 2);
    assert_eq!(stats_b.following, 1);

    let stats_c = db.follow_stats(c.id).await.unwrap();
    assert_eq!(stats_c.followers, 0);
    assert_eq!(stats_c.following, 1);
}

#[tokio::test]
async fn group_feed_only_contains_posts_of_that_group() {
    let Some(db) = connect().await else { return };

    let author = create_test_user(&db, "author").await;
    let slug = GroupSlug::new(unique("cats")).unwrap();
    let group = db
        .create_group(&CreateGroup {
            title: "Cats".to_owned(),
            slug: slug.clone(),
            description: "All about cats".to_owned(),
        })
        .await
        .unwrap();

    db.create_post(&NewPost {
        author: author.id,
        text: PostText::new("in the group").unwrap(),
        group: Some(group),
        image: None,
    })
    .await
    .unwrap();
    create_test_post(&db, author.id, "not in the group").await;

    let posts = db.fetch_posts_by_group(group, 10, 0).await.unwrap();
    assert_eq!(db.count_posts_by_group(group).await.unwrap(), 1);
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].text.get(), "in the group");
    assert_eq!(posts[0].group.as_ref().unwrap().slug, slug);
}

#[tokio::test]
async fn author_feed_is_newest_first() {
    let Some(db) = connect().await else { return };

    let author = create_test_user(&db, "author").await;
    let first = create_test_post(&db, author.id, "first").await;
    let second = create_test_post(&db, author.id, "second").await;

    let posts = db.fetch_posts_by_author(author.id, 10, 0).await.unwrap();
    assert_eq!(posts.len(), 2);
    assert_eq!(posts[0].id, second);
    assert_eq!(posts[1].id, first);
}

#[tokio::test]
async fn followed_feed_is_the_union_of_followed_authors() {
    let Some(db) = connect().await else { return };

    let viewer = create_test_user(&db, "viewer").await;
    let followed = create_test_user(&db, "followed").await;
    let stranger = create_test_user(&db, "stranger").await;

    create_test_post(&db, followed.id, "from followed").await;
    create_test_post(&db, stranger.id, "from stranger").await;
    db.create_follow(viewer.id, followed.id).await.unwrap();

    let posts = db.fetch_followed_posts(viewer.id, 10, 0).await.unwrap();
    assert_eq!(db.count_followed_posts(viewer.id).await.unwrap(), 1);
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].author.id, followed.id);
}

#[tokio::test]
async fn post_update_keeps_the_image_when_none_is_given() {
    let Some(db) = connect().await else { return };

    let author = create_test_user(&db, "author").await;
    let post = db
        .create_post(&NewPost {
            author: author.id,
            text: PostText::new("with image").unwrap(),
            group: None,
            image: Some("posts/abc".to_owned()),
        })
        .await
        .unwrap();

    db.update_post(
        post,
        &PostUpdate {
            text: PostText::new("edited").unwrap(),
            group: None,
            image: None,
        },
    )
    .await
    .unwrap();

    let fetched = db.fetch_post(post).await.unwrap().unwrap();
    assert_eq!(fetched.text.get(), "edited");
    assert_eq!(fetched.image.as_deref(), Some("posts/abc"));
}

#[tokio::test]
async fn comments_are_newest_first_and_scoped_to_their_post() {
    let Some(db) = connect().await else { return };

    let author = create_test_user(&db, "author").await;
    let commenter = create_test_user(&db, "commenter").await;
    let post = create_test_post(&db, author.id, "a post").await;
    let other_post = create_test_post(&db, author.id, "another post").await;

    for text in ["first", "second"] {
        db.create_comment(&NewComment {
            post,
            author: commenter.id,
            text: CommentText::new(text).unwrap(),
        })
        .await
        .unwrap();
    }

    let comments = db.fetch_comments_by_post(post).await.unwrap();
    assert_eq!(comments.len(), 2);
    assert_eq!(comments[0].text.get(), "second");
    assert_eq!(comments[1].text.get(), "first");
    assert!(db.fetch_comments_by_post(other_post).await.unwrap().is_empty());
}

#[tokio::test]
async fn sessions_round_trip_by_token_hash() {
    let Some(db) = connect().await else { return };

    let user = create_test_user(&db, "sessions").await;
    let token = SessionToken::generate_random(user.id);
    let token_hash = token.hash().unwrap();

    db.create_session(user.id, &token_hash, None).await.unwrap();

    let session = db.fetch_session(&token_hash).await.unwrap().unwrap();
    assert_eq!(session.user, user.id);
    assert_eq!(session.expires_at, None);

    let other = SessionToken::generate_random(user.id).hash().unwrap();
    assert!(db.fetch_session(&other).await.unwrap().is_none());
}
