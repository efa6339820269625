use crate::server::{
    Result, ServerError, ServerRouter,
    access::{self, AccessDecision},
    extract::Json,
    media::MediaStore,
    session::{AuthenticatedUser, MaybeAuthenticated},
};
use axum::{extract::State, response::Redirect};
use axum_extra::routing::{RouterExt, TypedPath};
use base64::{Engine, prelude::BASE64_STANDARD};
use pinnwand_common::model::{
    Id,
    comment::{Comment, CommentText, NewComment},
    follow::FollowStats,
    group::{GroupMarker, GroupSlug},
    post::{NewPost, Post, PostMarker, PostText, PostUpdate},
    user::Username,
};
use pinnwand_db::client::DbClient;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(post_view)
        .typed_post(new_post)
        .typed_post(edit_post)
        .typed_post(add_comment)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/{username}/{post_id}", rejection(ServerError))]
struct PostViewPath {
    username: Username,
    post_id: Id<PostMarker>,
}

#[derive(Clone, Eq, PartialEq, Debug, Deserialize, Serialize)]
pub struct PostDetail {
    pub post: Post,
    pub comments: Vec<Comment>,
    /// Total number of posts by the author.
    pub posts_count: u64,
    pub follow_stats: FollowStats,
    pub following: bool,
}

async fn post_view(
    PostViewPath { username, post_id }: PostViewPath,
    State(db): State<Arc<DbClient>>,
    MaybeAuthenticated(viewer): MaybeAuthenticated,
) -> Result<Json<PostDetail>> {
    let post = fetch_authored_post(&db, &username, post_id).await?;
    let comments = db.fetch_comments_by_post(post.id).await?;
    let posts_count = db.count_posts_by_author(post.author.id).await?;
    let follow_stats = db.follow_stats(post.author.id).await?;
    let following = match viewer {
        Some(viewer) => db.is_following(viewer.user_id(), post.author.id).await?,
        None => false,
    };

    Ok(Json(PostDetail {
        post,
        comments,
        posts_count,
        follow_stats,
        following,
    }))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/new", rejection(ServerError))]
struct NewPostPath();

#[derive(Clone, Eq, PartialEq, Debug, Default, Deserialize)]
pub struct NewPostRequest {
    pub text: PostText,
    pub group: Option<GroupSlug>,
    /// Base64-encoded image payload.
    pub image: Option<String>,
}

async fn new_post(
    _: NewPostPath,
    State(db): State<Arc<DbClient>>,
    State(media): State<Arc<MediaStore>>,
    author: AuthenticatedUser,
    Json(request): Json<NewPostRequest>,
) -> Result<Redirect> {
    let group = resolve_group(&db, request.group.as_ref()).await?;
    let image = store_image(&media, request.image.as_deref()).await?;

    db.create_post(&NewPost {
        author: author.user_id(),
        text: request.text,
        group,
        image,
    })
    .await?;

    Ok(Redirect::to("/"))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/{username}/{post_id}/edit", rejection(ServerError))]
struct EditPostPath {
    username: Username,
    post_id: Id<PostMarker>,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Deserialize)]
pub struct EditPostRequest {
    pub text: PostText,
    pub group: Option<GroupSlug>,
    /// Base64-encoded replacement image; absent keeps the stored one.
    pub image: Option<String>,
}

async fn edit_post(
    EditPostPath { username, post_id }: EditPostPath,
    State(db): State<Arc<DbClient>>,
    State(media): State<Arc<MediaStore>>,
    viewer: AuthenticatedUser,
    Json(request): Json<EditPostRequest>,
) -> Result<Redirect> {
    let post = fetch_authored_post(&db, &username, post_id).await?;

    if let AccessDecision::RedirectTo(target) = access::edit_post(viewer.user_id(), &post) {
        return Ok(Redirect::to(&target));
    }

    let group = resolve_group(&db, request.group.as_ref()).await?;
    let image = store_image(&media, request.image.as_deref()).await?;

    db.update_post(
        post.id,
        &PostUpdate {
            text: request.text,
            group,
            image,
        },
    )
    .await?;

    Ok(Redirect::to(&access::post_path(&username, post.id)))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/{username}/{post_id}/comment", rejection(ServerError))]
struct AddCommentPath {
    username: Username,
    post_id: Id<PostMarker>,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Deserialize)]
pub struct AddCommentRequest {
    pub text: CommentText,
}

async fn add_comment(
    AddCommentPath { username, post_id }: AddCommentPath,
    State(db): State<Arc<DbClient>>,
    viewer: AuthenticatedUser,
    Json(request): Json<AddCommentRequest>,
) -> Result<Redirect> {
    let post = fetch_authored_post(&db, &username, post_id).await?;

    db.create_comment(&NewComment {
        post: post.id,
        author: viewer.user_id(),
        text: request.text,
    })
    .await?;

    Ok(Redirect::to(&access::post_path(&username, post.id)))
}

/// Post resolved through its author's username; a mismatch is a 404 just
/// like an unknown id.
async fn fetch_authored_post(
    db: &DbClient,
    username: &Username,
    post_id: Id<PostMarker>,
) -> Result<Post> {
    let post = db
        .fetch_post(post_id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(post_id))?;

    if post.author.username != *username {
        return Err(ServerError::PostByIdNotFound(post_id));
    }

    Ok(post)
}

async fn resolve_group(
    db: &DbClient,
    slug: Option<&GroupSlug>,
) -> Result<Option<Id<GroupMarker>>> {
    let Some(slug) = slug else {
        return Ok(None);
    };

    let group = db
        .fetch_group_by_slug(slug)
        .await?
        .ok_or_else(|| ServerError::GroupBySlugNotFound(slug.clone()))?;

    Ok(Some(group.id))
}

async fn store_image(media: &MediaStore, encoded: Option<&str>) -> Result<Option<String>> {
    let Some(encoded) = encoded else {
        return Ok(None);
    };

    let data = BASE64_STANDARD
        .decode(encoded)
        .map_err(ServerError::InvalidImageData)?;
    let relative = media
        .store_post_image(&data)
        .await
        .map_err(ServerError::MediaWrite)?;

    Ok(Some(relative))
}
