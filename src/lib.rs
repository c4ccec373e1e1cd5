//! csvdb - A small SQL query engine over delimited-text tables
//!
//! This crate provides:
//! - SQL parsing (lexer, parser, AST) for SELECT, INSERT and DELETE
//! - Query planning and execution: joins, filters, grouping, aggregates,
//!   ordering, limits, distinct and projection
//! - Pluggable table stores: in-memory and CSV files

pub mod error;
pub mod sql;
pub mod storage;
