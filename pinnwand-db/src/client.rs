use crate::record::{CommentRecord, GroupRecord, PostRecord, SessionRecord, UserRecord};
use pinnwand_common::model::follow::FollowStats;
use pinnwand_common::model::group::{CreateGroup, Group, GroupMarker, GroupSlug};
use pinnwand_common::model::post::{NewPost, Post, PostMarker, PostUpdate};
use pinnwand_common::model::session::{Session, SessionTokenHash};
use pinnwand_common::model::user::{CreateUser, User, UserMarker, Username};
use pinnwand_common::model::{
    Id, ModelValidationError,
    comment::{Comment, CommentMarker, NewComment},
};
use sqlx::PgPool;
use thiserror::Error;
use time::{PrimitiveDateTime, UtcDateTime};

pub type Result<T, E = DbError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("An object in the database was invalid: {0}")]
    Data(#[from] ModelValidationError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Post listing with author and group joined in; the fragments below append
/// the scope filter and the shared newest-first ordering.
const SELECT_POSTS: &str = "
    SELECT
        posts.id,
        posts.text,
        posts.published_at,
        posts.image,
        users.id AS author_id,
        users.username AS author_username,
        groups.id AS group_id,
        groups.title AS group_title,
        groups.slug AS group_slug,
        groups.description AS group_description
    FROM posts.posts AS posts
    JOIN users.users AS users ON users.id = posts.author_id
    LEFT JOIN posts.groups AS groups ON groups.id = posts.group_id
";

const ORDER_POSTS: &str = " ORDER BY posts.published_at DESC, posts.id DESC ";

#[derive(Debug)]
pub struct DbClient {
    pool: PgPool,
}

impl DbClient {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn fetch_user_by_username(&self, username: &Username) -> Result<Option<User>> {
        let record = sqlx::query_as::<_, UserRecord>(
            "
            SELECT id, username
            FROM users.users
            WHERE username = $1
            ",
        )
        .bind(username.get())
        .fetch_optional(&self.pool)
        .await?;

        let user = record.map(User::try_from).transpose()?;
        Ok(user)
    }

    pub async fn create_user(&self, user: &CreateUser) -> Result<Id<UserMarker>> {
        let id = sqlx::query_scalar::<_, i64>(
            "
            INSERT INTO users.users (username)
            VALUES ($1)
            RETURNING id
            ",
        )
        .bind(user.username.get())
        .fetch_one(&self.pool)
        .await?;

        Ok(id.into())
    }

    pub async fn fetch_group_by_slug(&self, slug: &GroupSlug) -> Result<Option<Group>> {
        let record = sqlx::query_as::<_, GroupRecord>(
            "
            SELECT id, title, slug, description
            FROM posts.groups
            WHERE slug = $1
            ",
        )
        .bind(slug.get())
        .fetch_optional(&self.pool)
        .await?;

        let group = record.map(Group::try_from).transpose()?;
        Ok(group)
    }

    pub async fn create_group(&self, group: &CreateGroup) -> Result<Id<GroupMarker>> {
        let id = sqlx::query_scalar::<_, i64>(
            "
            INSERT INTO posts.groups (title, slug, description)
            VALUES ($1, $2, $3)
            RETURNING id
            ",
        )
        .bind(&group.title)
        .bind(group.slug.get())
        .bind(&group.description)
        .fetch_one(&self.pool)
        .await?;

        Ok(id.into())
    }

    /// The full global listing, newest first. This is the cache loader for
    /// the index feed; every other scope pages in SQL.
    pub async fn fetch_all_posts(&self) -> Result<Vec<Post>> {
        let query = format!("{SELECT_POSTS}{ORDER_POSTS}");
        let records = sqlx::query_as::<_, PostRecord>(&query)
            .fetch_all(&self.pool)
            .await?;

        collect_posts(records)
    }

    pub async fn fetch_posts_by_group(
        &self,
        group: Id<GroupMarker>,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<Post>> {
        let query =
            format!("{SELECT_POSTS} WHERE posts.group_id = $1 {ORDER_POSTS} LIMIT $2 OFFSET $3");
        let records = sqlx::query_as::<_, PostRecord>(&query)
            .bind(group.get())
            .bind(limit.cast_signed())
            .bind(offset.cast_signed())
            .fetch_all(&self.pool)
            .await?;

        collect_posts(records)
    }

    pub async fn count_posts_by_group(&self, group: Id<GroupMarker>) -> Result<u64> {
        let count = sqlx::query_scalar::<_, i64>(
            "
            SELECT COUNT(*)
            FROM posts.posts
            WHERE group_id = $1
            ",
        )
        .bind(group.get())
        .fetch_one(&self.pool)
        .await?;

        Ok(count.cast_unsigned())
    }

    pub async fn fetch_posts_by_author(
        &self,
        author: Id<UserMarker>,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<Post>> {
        let query =
            format!("{SELECT_POSTS} WHERE posts.author_id = $1 {ORDER_POSTS} LIMIT $2 OFFSET $3");
        let records = sqlx::query_as::<_, PostRecord>(&query)
            .bind(author.get())
            .bind(limit.cast_signed())
            .bind(offset.cast_signed())
            .fetch_all(&self.pool)
            .await?;

        collect_posts(records)
    }

    pub async fn count_posts_by_author(&self, author: Id<UserMarker>) -> Result<u64> {
        let count = sqlx::query_scalar::<_, i64>(
            "
            SELECT COUNT(*)
            FROM posts.posts
            WHERE author_id = $1
            ",
        )
        .bind(author.get())
        .fetch_one(&self.pool)
        .await?;

        Ok(count.cast_unsigned())
    }

    /// Posts authored by anyone the viewer follows.
    pub async fn fetch_followed_posts(
        &self,
        viewer: Id<UserMarker>,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<Post>> {
        let query = format!(
            "{SELECT_POSTS}
            WHERE posts.author_id IN (
                SELECT author_id FROM posts.follows WHERE user_id = $1
            )
            {ORDER_POSTS} LIMIT $2 OFFSET $3"
        );
        let records = sqlx::query_as::<_, PostRecord>(&query)
            .bind(viewer.get())
            .bind(limit.cast_signed())
            .bind(offset.cast_signed())
            .fetch_all(&self.pool)
            .await?;

        collect_posts(records)
    }

    pub async fn count_followed_posts(&self, viewer: Id<UserMarker>) -> Result<u64> {
        let count = sqlx::query_scalar::<_, i64>(
            "
            SELECT COUNT(*)
            FROM posts.posts
            WHERE author_id IN (
                SELECT author_id FROM posts.follows WHERE user_id = $1
            )
            ",
        )
        .bind(viewer.get())
        .fetch_one(&self.pool)
        .await?;

        Ok(count.cast_unsigned())
    }

    pub async fn fetch_post(&self, post: Id<PostMarker>) -> Result<Option<Post>> {
        let query = format!("{SELECT_POSTS} WHERE posts.id = $1");
        let record = sqlx::query_as::<_, PostRecord>(&query)
            .bind(post.get())
            .fetch_optional(&self.pool)
            .await?;

        let post = record.map(Post::try_from).transpose()?;
        Ok(post)
    }

    pub async fn create_post(&self, post: &NewPost) -> Result<Id<PostMarker>> {
        let id = sqlx::query_scalar::<_, i64>(
            "
            INSERT INTO posts.posts (text, author_id, group_id, image)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            ",
        )
        .bind(post.text.get())
        .bind(post.author.get())
        .bind(post.group.map(Id::get))
        .bind(post.image.as_deref())
        .fetch_one(&self.pool)
        .await?;

        Ok(id.into())
    }

    /// `published_at` and the author are immutable; a `None` image keeps the
    /// stored one.
    pub async fn update_post(&self, post: Id<PostMarker>, update: &PostUpdate) -> Result<()> {
        sqlx::query(
            "
            UPDATE posts.posts
            SET text = $2, group_id = $3, image = COALESCE($4, image)
            WHERE id = $1
            ",
        )
        .bind(post.get())
        .bind(update.text.get())
        .bind(update.group.map(Id::get))
        .bind(update.image.as_deref())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Comments of a post, newest first.
    pub async fn fetch_comments_by_post(&self, post: Id<PostMarker>) -> Result<Vec<Comment>> {
        let records = sqlx::query_as::<_, CommentRecord>(
            "
            SELECT
                comments.id,
                comments.post_id,
                comments.text,
                comments.created_at,
                users.id AS author_id,
                users.username AS author_username
            FROM posts.comments AS comments
            JOIN users.users AS users ON users.id = comments.author_id
            WHERE comments.post_id = $1
            ORDER BY comments.created_at DESC, comments.id DESC
            ",
        )
        .bind(post.get())
        .fetch_all(&self.pool)
        .await?;

        let comments = records
            .into_iter()
            .map(Comment::try_from)
            .collect::<Result<_, _>>()?;
        Ok(comments)
    }

    pub async fn create_comment(&self, comment: &NewComment) -> Result<Id<CommentMarker>> {
        let id = sqlx::query_scalar::<_, i64>(
            "
            INSERT INTO posts.comments (post_id, author_id, text)
            VALUES ($1, $2, $3)
            RETURNING id
            ",
        )
        .bind(comment.post.get())
        .bind(comment.author.get())
        .bind(comment.text.get())
        .fetch_one(&self.pool)
        .await?;

        Ok(id.into())
    }

    /// Idempotent: an existing edge is left alone.
    pub async fn create_follow(
        &self,
        user: Id<UserMarker>,
        author: Id<UserMarker>,
    ) -> Result<()> {
        sqlx::query(
            "
            INSERT INTO posts.follows (user_id, author_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            ",
        )
        .bind(user.get())
        .bind(author.get())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Idempotent: deleting a missing edge is a no-op.
    pub async fn delete_follow(
        &self,
        user: Id<UserMarker>,
        author: Id<UserMarker>,
    ) -> Result<()> {
        sqlx::query(
            "
            DELETE FROM posts.follows
            WHERE user_id = $1 AND author_id = $2
            ",
        )
        .bind(user.get())
        .bind(author.get())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn is_following(
        &self,
        user: Id<UserMarker>,
        author: Id<UserMarker>,
    ) -> Result<bool> {
        let following = sqlx::query_scalar::<_, bool>(
            "
            SELECT EXISTS (
                SELECT 1 FROM posts.follows
                WHERE user_id = $1 AND author_id = $2
            )
            ",
        )
        .bind(user.get())
        .bind(author.get())
        .fetch_one(&self.pool)
        .await?;

        Ok(following)
    }

    pub async fn follow_stats(&self, user: Id<UserMarker>) -> Result<FollowStats> {
        let (followers, following) = sqlx::query_as::<_, (i64, i64)>(
            "
            SELECT
                (SELECT COUNT(*) FROM posts.follows WHERE author_id = $1),
                (SELECT COUNT(*) FROM posts.follows WHERE user_id = $1)
            ",
        )
        .bind(user.get())
        .fetch_one(&self.pool)
        .await?;

        Ok(FollowStats {
            followers: followers.cast_unsigned(),
            following: following.cast_unsigned(),
        })
    }

    pub async fn create_session(
        &self,
        user: Id<UserMarker>,
        token_hash: &SessionTokenHash,
        expires_at: Option<UtcDateTime>,
    ) -> Result<()> {
        sqlx::query(
            "
            INSERT INTO users.sessions (token_hash, user_id, expires_at)
            VALUES ($1, $2, $3)
            ",
        )
        .bind(token_hash.0.as_slice())
        .bind(user.get())
        .bind(expires_at.map(|at| PrimitiveDateTime::new(at.date(), at.time())))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn fetch_session(&self, token_hash: &SessionTokenHash) -> Result<Option<Session>> {
        let record = sqlx::query_as::<_, SessionRecord>(
            "
            SELECT user_id, token_hash, created_at, expires_at
            FROM users.sessions
            WHERE token_hash = $1
            ",
        )
        .bind(token_hash.0.as_slice())
        .fetch_optional(&self.pool)
        .await?;

        let session = record.map(Session::try_from).transpose()?;
        Ok(session)
    }
}

fn collect_posts(records: Vec<PostRecord>) -> Result<Vec<Post>> {
    let posts = records
        .into_iter()
        .map(Post::try_from)
        .collect::<Result<_, ModelValidationError>>()?;
    Ok(posts)
}
