use pinnwand_common::model::{
    Id,
    post::{Post, PostMarker},
    user::{UserMarker, Username},
};

/// Outcome of an author-only check. Denial is navigation back to the post
/// view, not an error response.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub enum AccessDecision {
    Granted,
    RedirectTo(String),
}

#[must_use]
pub fn profile_path(username: &Username) -> String {
    format!("/{username}")
}

#[must_use]
pub fn post_path(username: &Username, post: Id<PostMarker>) -> String {
    format!("/{username}/{post}")
}

/// Only the author may edit a post; everyone else is sent to the post view.
#[must_use]
pub fn edit_post(viewer: Id<UserMarker>, post: &Post) -> AccessDecision {
    if viewer == post.author.id {
        AccessDecision::Granted
    } else {
        AccessDecision::RedirectTo(post_path(&post.author.username, post.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pinnwand_common::model::{post::PostText, user::User};
    use time::UtcDateTime;

    fn post_by(author_id: i64, username: &str) -> Post {
        Post {
            id: 5.into(),
            author: User {
                id: author_id.into(),
                username: Username::new(username.to_owned()).unwrap(),
            },
            text: PostText::new("Hello").unwrap(),
            published_at: UtcDateTime::now(),
            group: None,
            image: None,
        }
    }

    #[test]
    fn the_author_may_edit() {
        let post = post_by(1, "leo");

        assert_eq!(edit_post(Id::new(1), &post), AccessDecision::Granted);
    }

    #[test]
    fn everyone_else_is_redirected_to_the_post_view() {
        let post = post_by(1, "leo");

        assert_eq!(
            edit_post(Id::new(2), &post),
            AccessDecision::RedirectTo("/leo/5".to_owned())
        );
    }
}
