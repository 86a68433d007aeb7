//! # Pricing Calendar Engine
//!
//! Non-UI logic of the pricing calendar widget.
//!
//! - **domain**: month grid, price resolution, range selection and the
//!   [`CalendarEngine`] that ties them together
//! - **storage**: key-value and remote period persistence behind traits
//! - **io**: the programmatic surface handed to the host page
//!
//! ```text
//! Host page (DOM binding)
//!     ↓
//! IO layer (CalendarApi)
//!     ↓
//! Domain layer (CalendarEngine)
//!     ↓
//! Storage layer (local key-value / remote periods)
//! ```
//!
//! Everything runs on one thread; the engine is mutated synchronously from
//! input handlers and only the remote round trips suspend.

pub mod config;
pub mod domain;
pub mod error;
pub mod io;
pub mod storage;

pub use config::{EngineConfig, RemoteConfig, StorageMode};
pub use domain::*;
pub use error::CalendarError;
pub use io::CalendarApi;
