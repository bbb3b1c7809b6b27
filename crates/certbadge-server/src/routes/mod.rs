//! HTTP route handlers for `certbadge`.
//!
//! Routes are organized by surface:
//! - `images`: public badge and certificate images
//! - `certificates`: admin CRUD over certificate records
//! - `sys`: health and render statistics

pub mod certificates;
pub mod images;
pub mod sys;
