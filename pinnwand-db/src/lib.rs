pub mod client;
mod record;

/// Idempotent DDL for everything the client queries.
pub const SCHEMA_SQL: &str = include_str!("../schema.sql");
