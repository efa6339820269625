use crate::server::{
    Result, ServerError, ServerRouter,
    access::profile_path,
    extract::{Json, Query},
    feed::{self, FeedPage},
    routes::PageQuery,
    session::{AuthenticatedUser, MaybeAuthenticated},
};
use axum::{extract::State, response::Redirect};
use axum_extra::routing::{RouterExt, TypedPath};
use pinnwand_common::model::{
    follow::FollowStats,
    user::{User, Username},
};
use pinnwand_db::client::DbClient;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(profile)
        .typed_get(follow_author)
        .typed_post(follow_author)
        .typed_get(unfollow_author)
        .typed_post(unfollow_author)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/{username}", rejection(ServerError))]
struct ProfilePath {
    username: Username,
}

#[derive(Clone, Eq, PartialEq, Debug, Deserialize, Serialize)]
pub struct ProfileFeed {
    pub author: User,
    pub feed: FeedPage,
    pub posts_count: u64,
    pub follow_stats: FollowStats,
    /// Whether the authenticated viewer follows this author; false for
    /// anonymous viewers.
    pub following: bool,
}

async fn profile(
    ProfilePath { username }: ProfilePath,
    Query(PageQuery { page }): Query<PageQuery>,
    State(db): State<Arc<DbClient>>,
    MaybeAuthenticated(viewer): MaybeAuthenticated,
) -> Result<Json<ProfileFeed>> {
    let author = db
        .fetch_user_by_username(&username)
        .await?
        .ok_or(ServerError::UserByUsernameNotFound(username))?;
    let feed = feed::by_author(&db, author.id, page).await?;
    let follow_stats = db.follow_stats(author.id).await?;
    let following = match viewer {
        Some(viewer) => db.is_following(viewer.user_id(), author.id).await?,
        None => false,
    };

    Ok(Json(ProfileFeed {
        posts_count: feed.total_count,
        author,
        feed,
        follow_stats,
        following,
    }))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/{username}/follow", rejection(ServerError))]
struct FollowAuthorPath {
    username: Username,
}

async fn follow_author(
    FollowAuthorPath { username }: FollowAuthorPath,
    State(db): State<Arc<DbClient>>,
    viewer: AuthenticatedUser,
) -> Result<Redirect> {
    let author = db
        .fetch_user_by_username(&username)
        .await?
        .ok_or_else(|| ServerError::UserByUsernameNotFound(username.clone()))?;

    // Following yourself is silently skipped, not an error.
    if viewer.user_id() != author.id {
        db.create_follow(viewer.user_id(), author.id).await?;
    }

    Ok(Redirect::to(&profile_path(&username)))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/{username}/unfollow", rejection(ServerError))]
struct UnfollowAuthorPath {
    username: Username,
}

async fn unfollow_author(
    UnfollowAuthorPath { username }: UnfollowAuthorPath,
    State(db): State<Arc<DbClient>>,
    viewer: AuthenticatedUser,
) -> Result<Redirect> {
    let author = db
        .fetch_user_by_username(&username)
        .await?
        .ok_or_else(|| ServerError::UserByUsernameNotFound(username.clone()))?;

    db.delete_follow(viewer.user_id(), author.id).await?;

    Ok(Redirect::to(&profile_path(&username)))
}
