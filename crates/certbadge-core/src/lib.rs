//! Core library for certbadge.
//!
//! Holds the certificate record model and store, the badge and certificate
//! SVG renderers with their shared width calculator, the raster format
//! converter, the in-memory response cache, and the [`service::ImageService`]
//! that ties them together for each image request. This crate depends on
//! `certbadge-storage` for persistence and knows nothing about HTTP.

pub mod badge;
pub mod cache;
pub mod certificate;
pub mod convert;
pub mod error;
mod escape;
pub mod layout;
pub mod overrides;
pub mod record;
pub mod request;
pub mod service;
pub mod template;
