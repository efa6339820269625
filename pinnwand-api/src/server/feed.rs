use crate::server::{Result, cache::FeedCache};
use pinnwand_common::model::{
    Id,
    group::GroupMarker,
    post::Post,
    user::UserMarker,
};
use pinnwand_common::pagination::{POSTS_PER_PAGE, Paginator};
use pinnwand_db::client::DbClient;
use serde::{Deserialize, Serialize};

/// One page of a feed, newest post first.
#[derive(Clone, Eq, PartialEq, Debug, Deserialize, Serialize)]
pub struct FeedPage {
    pub posts: Vec<Post>,
    pub page: u64,
    pub num_pages: u64,
    pub total_count: u64,
}

impl FeedPage {
    /// Page out of a fully materialized listing (the cached global feed).
    #[must_use]
    pub fn from_listing(posts: &[Post], requested: Option<u64>) -> Self {
        let paginator = Paginator::new(posts.len() as u64, POSTS_PER_PAGE);
        let page = paginator.resolve_page(requested);

        Self {
            posts: paginator.slice(posts, page).to_vec(),
            page,
            num_pages: paginator.num_pages(),
            total_count: paginator.total(),
        }
    }
}

/// All posts, served through the cache; staleness is bounded by its TTL.
pub async fn global(db: &DbClient, cache: &FeedCache, requested: Option<u64>) -> Result<FeedPage> {
    let posts = cache
        .get_or_populate(|| async { db.fetch_all_posts().await })
        .await?;

    Ok(FeedPage::from_listing(&posts, requested))
}

pub async fn by_group(
    db: &DbClient,
    group: Id<GroupMarker>,
    requested: Option<u64>,
) -> Result<FeedPage> {
    let total = db.count_posts_by_group(group).await?;
    let paginator = Paginator::new(total, POSTS_PER_PAGE);
    let page = paginator.resolve_page(requested);
    let posts = db
        .fetch_posts_by_group(group, paginator.limit(), paginator.offset(page))
        .await?;

    Ok(FeedPage {
        posts,
        page,
        num_pages: paginator.num_pages(),
        total_count: total,
    })
}

pub async fn by_author(
    db: &DbClient,
    author: Id<UserMarker>,
    requested: Option<u64>,
) -> Result<FeedPage> {
    let total = db.count_posts_by_author(author).await?;
    let paginator = Paginator::new(total, POSTS_PER_PAGE);
    let page = paginator.resolve_page(requested);
    let posts = db
        .fetch_posts_by_author(author, paginator.limit(), paginator.offset(page))
        .await?;

    Ok(FeedPage {
        posts,
        page,
        num_pages: paginator.num_pages(),
        total_count: total,
    })
}

/// Posts by every author the viewer follows.
pub async fn by_followed(
    db: &DbClient,
    viewer: Id<UserMarker>,
    requested: Option<u64>,
) -> Result<FeedPage> {
    let total = db.count_followed_posts(viewer).await?;
    let paginator = Paginator::new(total, POSTS_PER_PAGE);
    let page = paginator.resolve_page(requested);
    let posts = db
        .fetch_followed_posts(viewer, paginator.limit(), paginator.offset(page))
        .await?;

    Ok(FeedPage {
        posts,
        page,
        num_pages: paginator.num_pages(),
        total_count: total,
    })
}
