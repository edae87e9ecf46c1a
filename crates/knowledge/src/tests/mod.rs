//! Shared fixtures and end-to-end scenarios for the knowledge pipeline.

pub(crate) mod fixtures;

mod scenarios;
