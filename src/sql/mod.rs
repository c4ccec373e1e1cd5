//! SQL processing module
//!
//! This module provides:
//! - `parser`: SQL lexer and parser
//! - `types`: values, rows and literal coercion
//! - `schema`: tables as header plus rows
//! - `plan`: Execution plan generation
//! - `executor`: Query and mutation execution
//! - `engine`: Session entry point

pub mod parser;
pub mod types;
pub mod schema;
pub mod plan;
pub mod executor;
pub mod engine;
