use crate::server::{
    Result, ServerError, ServerRouter,
    cache::FeedCache,
    extract::{Json, Query},
    feed::{self, FeedPage},
    routes::PageQuery,
    session::AuthenticatedUser,
};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use pinnwand_common::model::group::{Group, GroupSlug};
use pinnwand_db::client::DbClient;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(index)
        .typed_get(group_posts)
        .typed_get(follow_index)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/", rejection(ServerError))]
struct IndexPath();

async fn index(
    _: IndexPath,
    Query(PageQuery { page }): Query<PageQuery>,
    State(db): State<Arc<DbClient>>,
    State(cache): State<Arc<FeedCache>>,
) -> Result<Json<FeedPage>> {
    let feed = feed::global(&db, &cache, page).await?;

    Ok(Json(feed))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/group/{slug}", rejection(ServerError))]
struct GroupPostsPath {
    slug: GroupSlug,
}

#[derive(Clone, Eq, PartialEq, Debug, Deserialize, Serialize)]
pub struct GroupFeed {
    pub group: Group,
    pub feed: FeedPage,
}

async fn group_posts(
    GroupPostsPath { slug }: GroupPostsPath,
    Query(PageQuery { page }): Query<PageQuery>,
    State(db): State<Arc<DbClient>>,
) -> Result<Json<GroupFeed>> {
    let group = db
        .fetch_group_by_slug(&slug)
        .await?
        .ok_or(ServerError::GroupBySlugNotFound(slug))?;
    let feed = feed::by_group(&db, group.id, page).await?;

    Ok(Json(GroupFeed { group, feed }))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/follow", rejection(ServerError))]
struct FollowIndexPath();

async fn follow_index(
    _: FollowIndexPath,
    Query(PageQuery { page }): Query<PageQuery>,
    State(db): State<Arc<DbClient>>,
    viewer: AuthenticatedUser,
) -> Result<Json<FeedPage>> {
    let feed = feed::by_followed(&db, viewer.user_id(), page).await?;

    Ok(Json(feed))
}
