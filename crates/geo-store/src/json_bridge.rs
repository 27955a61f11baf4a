use std::fs;
use std::path::Path;

use geo_core::{
    AnchorHistoryCollection, HISTORY_STORAGE_KEY, HistoryConfig, decode_history, encode_history,
};

use crate::error::{Result, StoreError};
use crate::store::Store;

impl Store {
    /// Stored history, or an empty collection when none was saved.
    pub fn load_history(&self) -> Result<AnchorHistoryCollection> {
        match self.get_preference(HISTORY_STORAGE_KEY)? {
            None => Ok(AnchorHistoryCollection::new()),
            Some(json) => decode_history(&json)
                .map_err(|e| StoreError::InvalidData(format!("stored history: {e}"))),
        }
    }

    /// Replace the stored history. Applies the same ordering and capacity as
    /// a session save.
    pub fn replace_history(
        &self,
        mut collection: AnchorHistoryCollection,
        config: &HistoryConfig,
    ) -> Result<usize> {
        collection.sort_and_truncate(config.capacity);
        let json = encode_history(&collection)
            .map_err(|e| StoreError::InvalidData(format!("history encode failed: {e}")))?;
        self.set_preference(HISTORY_STORAGE_KEY, &json)?;
        Ok(collection.len())
    }

    /// Import a history JSON string. Records with unparseable timestamps are
    /// dropped. Returns the number of records kept.
    pub fn import_history_str(&self, json: &str, config: &HistoryConfig) -> Result<usize> {
        let collection = decode_history(json)
            .map_err(|e| StoreError::InvalidData(format!("invalid JSON: {e}")))?;
        self.replace_history(collection, config)
    }

    pub fn import_history_file(&self, path: &Path, config: &HistoryConfig) -> Result<usize> {
        let json = fs::read_to_string(path)?;
        self.import_history_str(&json, config)
    }

    pub fn export_history_string(&self) -> Result<String> {
        let collection = self.load_history()?;
        encode_history(&collection)
            .map_err(|e| StoreError::InvalidData(format!("JSON export failed: {e}")))
    }

    pub fn export_history_file(&self, path: &Path) -> Result<()> {
        let json = self.export_history_string()?;
        fs::write(path, json)?;
        Ok(())
    }
}
