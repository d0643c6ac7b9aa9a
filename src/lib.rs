//! Permissions migration - Ranger policies and HDFS permissions to cloud IAM
//!
//! Reads table translations, a principal mapping, a Ranger policy dump and an
//! HDFS permission dump, runs rule-driven mappers for each target platform
//! and merges their candidate bindings into one conflict-free document.
//! The `expand` step derives the principal mapping itself from the Ranger
//! and HDFS identities. It exposes all modules for testing purposes.

pub mod build;
pub mod errors;
pub mod expand;
pub mod mapping;
pub mod merge;
pub mod models;
pub mod readers;
pub mod rules;
pub mod settings;
pub mod source;
