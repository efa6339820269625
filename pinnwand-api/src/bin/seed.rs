//! Creates a user (and optionally a group) and prints a fresh session token.
//!
//! User and token management have no HTTP surface; this is the operator-side
//! tool for both. Run with: cargo run --bin seed

use pinnwand_common::model::{
    ModelValidationError,
    group::{CreateGroup, GroupSlug},
    session::{SessionToken, SessionTokenHashError},
    user::{CreateUser, Username},
};
use pinnwand_db::client::{DbClient, DbError};
use sqlx::postgres::PgPoolOptions;
use std::env;
use thiserror::Error;

#[derive(Debug, Error)]
enum SeedError {
    #[error("Error parsing .env file: {0}")]
    Dotenv(#[from] dotenvy::Error),
    #[error("Environment variable {0} is required")]
    MissingVar(&'static str),
    #[error(transparent)]
    Validation(#[from] ModelValidationError),
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    TokenHash(#[from] SessionTokenHashError),
}

#[tokio::main]
async fn main() -> Result<(), SeedError> {
    if let Err(e) = dotenvy::dotenv()
        && !e.not_found()
    {
        return Err(e.into());
    }

    let database_url =
        env::var("DATABASE_URL").map_err(|_| SeedError::MissingVar("DATABASE_URL"))?;
    let username = env::var("SEED_USERNAME").map_err(|_| SeedError::MissingVar("SEED_USERNAME"))?;
    let username = Username::new(username).map_err(ModelValidationError::from)?;

    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&database_url)
        .await?;
    let db = DbClient::new(pool);

    let user_id = match db.fetch_user_by_username(&username).await? {
        Some(user) => user.id,
        None => {
            db.create_user(&CreateUser {
                username: username.clone(),
            })
            .await?
        }
    };

    if let Ok(slug) = env::var("SEED_GROUP_SLUG") {
        let slug = GroupSlug::new(slug).map_err(ModelValidationError::from)?;
        if db.fetch_group_by_slug(&slug).await?.is_none() {
            db.create_group(&CreateGroup {
                title: env::var("SEED_GROUP_TITLE").unwrap_or_else(|_| slug.get().to_owned()),
                slug,
                description: env::var("SEED_GROUP_DESCRIPTION").unwrap_or_default(),
            })
            .await?;
        }
    }

    let token = SessionToken::generate_random(user_id);
    db.create_session(user_id, &token.hash()?, None).await?;

    println!("{}", token.as_token_str());

    Ok(())
}
