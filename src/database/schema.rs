// Database schema definitions
// This module contains the SQL schema for the review assignment database

pub const INITIAL_SCHEMA: &str = include_str!("../../migrations/001_initial_schema.sql");

/// Migrations in application order.
pub const MIGRATIONS: &[(&str, &str)] = &[("001_initial_schema", INITIAL_SCHEMA)];
