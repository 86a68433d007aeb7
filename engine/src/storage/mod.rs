//! # Storage Module
//!
//! Persistence for the pricing calendar, behind two narrow traits so the
//! domain never touches a concrete backend:
//!
//! - [`KeyValueStore`]: synchronous string storage (browser `localStorage`,
//!   or memory in tests). [`LocalStore`] layers the creation-flow keys and
//!   JSON formats on top of it.
//! - [`PeriodStore`]: the remote periods table, one row per priced date.
//!   [`remote`] flattens the in-memory price table into rows and groups rows
//!   back into month tables.
//!
//! Implementations: [`MemoryKeyValueStore`] and [`MemoryPeriodStore`]
//! here, and the browser-backed stores in the frontend crate.

pub mod local;
pub mod memory;
pub mod remote;
pub mod traits;

pub use local::LocalStore;
pub use memory::{MemoryKeyValueStore, MemoryPeriodStore};
pub use remote::LoadedPeriods;
pub use traits::{KeyValueStore, PeriodStore};
