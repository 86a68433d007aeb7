pub mod browser_storage;
pub mod date_utils;
pub mod logging;
pub mod page_context;
pub mod rest_store;
