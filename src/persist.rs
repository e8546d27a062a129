use std::marker::PhantomData;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::storage::Store;

pub const API_KEY: &str = "apiKey";
pub const CHANNEL_ID: &str = "channelId";
pub const MAX_RESULTS: &str = "maxResults";
pub const COMMENTS: &str = "comments";
pub const ACCOUNTS: &str = "accounts";
pub const ACTIVE_ACCOUNT_INDEX: &str = "activeAccountIndex";
pub const VIDEOS: &str = "videos";

pub struct PersistentField<T> {
    key: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> PersistentField<T>
where
    T: Serialize + DeserializeOwned,
{
    pub const fn new(key: &'static str) -> Self {
        Self {
            key,
            _marker: PhantomData,
        }
    }

    pub fn key(&self) -> &'static str {
        self.key
    }

    pub fn load(&self, store: &Store, default: T) -> T {
        self.load_or_else(store, || default)
    }

    pub fn load_or_else(&self, store: &Store, default: impl FnOnce() -> T) -> T {
        let raw = match store.get(self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return default(),
            Err(err) => {
                log::warn!("persist: reading {} failed: {err:#}", self.key);
                return default();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(err) => {
                log::warn!("persist: discarding corrupt {}: {err}", self.key);
                default()
            }
        }
    }

    pub fn save(&self, store: &Store, value: &T) -> Result<()> {
        let encoded = serde_json::to_string(value)
            .with_context(|| format!("persist: encode {}", self.key))?;
        store.put(self.key, &encoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NUMBERS: PersistentField<Vec<u32>> = PersistentField::new("numbers");

    #[test]
    fn absent_key_yields_default() {
        let store = Store::in_memory().unwrap();
        assert_eq!(NUMBERS.load(&store, vec![7]), vec![7]);
    }

    #[test]
    fn saved_value_is_reloaded() {
        let store = Store::in_memory().unwrap();
        NUMBERS.save(&store, &vec![1, 2, 3]).unwrap();
        assert_eq!(NUMBERS.load(&store, Vec::new()), vec![1, 2, 3]);
        assert_eq!(store.get("numbers").unwrap().as_deref(), Some("[1,2,3]"));
    }

    #[test]
    fn corrupt_value_is_treated_as_absent() {
        let store = Store::in_memory().unwrap();
        store.put("numbers", "{not json").unwrap();
        assert_eq!(NUMBERS.load(&store, vec![9]), vec![9]);

        store.put("numbers", "\"a string\"").unwrap();
        assert!(NUMBERS.load(&store, Vec::new()).is_empty());
    }
}
