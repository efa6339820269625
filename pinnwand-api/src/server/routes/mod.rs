use crate::server::ServerRouter;
use axum::Router;
use serde::Deserialize;

mod feed;
mod posts;
mod profiles;

pub use feed::GroupFeed;
pub use posts::{AddCommentRequest, EditPostRequest, NewPostRequest, PostDetail};
pub use profiles::ProfileFeed;

pub fn routes() -> ServerRouter {
    Router::new()
        .merge(feed::routes())
        .merge(posts::routes())
        .merge(profiles::routes())
}

/// `?page=` as every feed endpoint takes it.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u64>,
}
