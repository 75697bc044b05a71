//! PC build engine library crate.
//!
//! This crate turns a storefront's product catalog into complete PC
//! builds: it splits a budget across component categories according to
//! a PC type profile, picks a product per category and, for an exact
//! custom budget, refines the picks toward the target.  Callers may use
//! `engine::configure` directly or embed the HTTP API via `api::router`.

pub mod money;
pub mod models;
pub mod error;
pub mod catalog;
pub mod profile;
pub mod allocator;
pub mod strategy;
pub mod refiner;
pub mod engine;
pub mod config;
pub mod api;

pub use engine::{configure, configure_batch, configure_presets, generate};
pub use error::ConfigError;
pub use models::{Configuration, ConfigureRequest, PcType, Product};
pub use profile::{Profile, ProfileTable};
