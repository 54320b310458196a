//! # MARROW
//!
//! Structural and call-graph extraction for C# codebases.
//!
//! MARROW parses every C# file under a directory, builds a structural model
//! of the classes it finds, resolves method invocations into a call graph
//! with dispatch-kind classification, and can reduce each file to a
//! declaration skeleton that still parses.
//!
//! ## Pipeline
//!
//! - **Phase one** parses files in parallel and folds each tree into plain
//!   per-file facts: declared types, extracted classes, call sites.
//! - **Phase two** freezes the facts into a whole-compilation symbol table
//!   and resolves everything that needs cross-file knowledge: base types,
//!   implemented interfaces, and call targets.

pub mod core;
pub mod parser;
