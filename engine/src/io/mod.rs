//! # IO Module
//!
//! The programmatic surface handed to the host page. [`CalendarApi`] shares
//! the engine with the page's input handlers and drives the remote round
//! trips, which are the only operations that suspend.

pub mod api;

pub use api::CalendarApi;
