//! Analytics and table engine for the Daily Open Court application register.
//!
//! Records come in as JSON dumps of the applications endpoint. The
//! [`pipeline`] module drives every paged table (filter, sort, paginate) and
//! [`analytics`] turns a record set into the fixed-shape aggregates behind the
//! dashboard charts. Both are pure; only [`source`], [`import`], [`export`]
//! and [`config`] touch the outside world.

pub mod analytics;
pub mod config;
pub mod error;
pub mod export;
pub mod import;
pub mod logging;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod report;
pub mod source;
pub mod staff;
pub mod validation;
pub mod video;

pub use error::{CourtError, Result};
