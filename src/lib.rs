//! PlazaCache is the read-side caching layer of the DocPlaza publishing
//! backend.
//!
//! DocPlaza serves a public catalog of published documents (the "tech
//! square") whose browse, search, and statistics endpoints are backed by a
//! relational store. This crate sits in front of that store with a
//! Redis-backed read-through cache:
//!
//! - [`cache::client`] and [`cache::memory`] hold the key-value client:
//!   Redis in production, an in-process store for tests and single-node
//!   development.
//! - [`cache::keys`] renders the typed cache keys and hashes free-text
//!   keywords into them.
//! - [`cache::service`] runs the read-through protocol, with one wrapper
//!   per endpoint family (document lists, hot data, search, stats, user
//!   profiles).
//! - [`cache::invalidator`] reacts to write events from the owning domains
//!   with pattern-scan invalidation.
//! - [`cache::fallback`] keeps handlers alive when the cache path itself
//!   fails.
//! - [`cache::metrics`] carries the per-operation instrumentation and the
//!   per-response debug block.
//!
//! The cache is eventually consistent with staleness bounded by per-family
//! TTLs. It never authors data and never turns a cache failure into a
//! user-facing error.

pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
