//! `localStorage` as a [`KeyValueStore`].

use anyhow::{anyhow, Result};
use pricing_calendar::storage::KeyValueStore;
use wasm_bindgen::JsValue;
use web_sys::Storage;

pub struct BrowserStorage {
    storage: Storage,
}

impl BrowserStorage {
    /// The window's local storage; fails when the browser denies access
    pub fn open() -> Result<Self> {
        let window = web_sys::window().ok_or_else(|| anyhow!("no window"))?;
        let storage = window
            .local_storage()
            .map_err(js_error)?
            .ok_or_else(|| anyhow!("localStorage is not available"))?;
        Ok(Self { storage })
    }
}

fn js_error(value: JsValue) -> anyhow::Error {
    anyhow!("storage error: {:?}", value)
}

impl KeyValueStore for BrowserStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.storage.get_item(key).map_err(js_error)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.storage.set_item(key, value).map_err(js_error)
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.storage.remove_item(key).map_err(js_error)
    }

    fn keys(&self) -> Result<Vec<String>> {
        let length = self.storage.length().map_err(js_error)?;
        let mut keys = Vec::with_capacity(length as usize);
        for index in 0..length {
            if let Some(key) = self.storage.key(index).map_err(js_error)? {
                keys.push(key);
            }
        }
        Ok(keys)
    }
}
