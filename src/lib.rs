//! Where@ Core Library
//!
//! Core functionality for Where@ - sharing your location with the people
//! you choose. This crate provides the location publishing coordinator and
//! the storage, preference and remote API pieces it runs on.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![deny(unsafe_code)]

mod api;
pub mod config;
pub mod events;
pub mod identity;
pub mod location;
pub mod prefs;
pub mod publisher;
pub mod remote;
pub mod retention;
pub mod source;
pub mod store;

pub use api::{CoreError, WhereatCore};
pub use config::PublisherConfig;
pub use events::{EventBus, PublisherEvent};
pub use location::{Fix, UserLocation};
pub use publisher::{LocationPublisher, PublisherDeps, StartStatus};
