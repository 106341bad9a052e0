//! Texture table keyed by source identifier
//!
//! Maps texture filenames (and two reserved sentinel keys) to backend texture
//! handles. Lookups of unknown keys go through
//! [`TextureTable::get_or_insert_fallback`], which binds the key to the label
//! texture so every later lookup of the same key returns the same handle.

use crate::render::api::TextureHandle;
use std::collections::HashMap;

/// Sentinel key of the fallback texture
pub const LABEL_TEXTURE_KEY: &str = "label";

/// Sentinel key of the 1x1 opaque white texture
pub const DEFAULT_WHITE_KEY: &str = "defaultWhite";

/// Source identifier to texture handle mapping
#[derive(Debug, Clone)]
pub struct TextureTable {
    entries: HashMap<String, TextureHandle>,
    label: TextureHandle,
    default_white: TextureHandle,
}

impl TextureTable {
    /// Create a table holding the two sentinel textures
    pub fn new(label: TextureHandle, default_white: TextureHandle) -> Self {
        let mut entries = HashMap::new();
        entries.insert(LABEL_TEXTURE_KEY.to_string(), label);
        entries.insert(DEFAULT_WHITE_KEY.to_string(), default_white);

        Self {
            entries,
            label,
            default_white,
        }
    }

    /// Register a loaded texture under `key`, returning any handle it replaces
    pub fn insert(&mut self, key: impl Into<String>, handle: TextureHandle) -> Option<TextureHandle> {
        self.entries.insert(key.into(), handle)
    }

    /// Look up a texture without modifying the table
    pub fn get(&self, key: &str) -> Option<TextureHandle> {
        self.entries.get(key).copied()
    }

    /// Look up `key`, binding it to the label texture if absent
    pub fn get_or_insert_fallback(&mut self, key: &str) -> TextureHandle {
        if let Some(handle) = self.entries.get(key) {
            return *handle;
        }

        log::debug!("Texture '{}' not loaded; using '{}' fallback", key, LABEL_TEXTURE_KEY);
        self.entries.insert(key.to_string(), self.label);
        self.label
    }

    /// Handle used for unresolved references
    pub fn fallback(&self) -> TextureHandle {
        self.label
    }

    /// Handle of the 1x1 white texture
    pub fn default_white(&self) -> TextureHandle {
        self.default_white
    }

    /// Whether `key` has an entry
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of entries, sentinels included
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false; the sentinels are present from construction
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn table() -> (TextureTable, TextureHandle, TextureHandle) {
        let mut handles: SlotMap<TextureHandle, ()> = SlotMap::with_key();
        let label = handles.insert(());
        let white = handles.insert(());
        (TextureTable::new(label, white), label, white)
    }

    #[test]
    fn test_sentinels_present() {
        let (table, label, white) = table();

        assert_eq!(table.len(), 2);
        assert_eq!(table.get(LABEL_TEXTURE_KEY), Some(label));
        assert_eq!(table.get(DEFAULT_WHITE_KEY), Some(white));
        assert_eq!(table.fallback(), label);
    }

    #[test]
    fn test_fallback_is_memoized() {
        let (mut table, label, _) = table();

        assert_eq!(table.get("missing.png"), None);
        assert_eq!(table.get_or_insert_fallback("missing.png"), label);
        assert_eq!(table.len(), 3);

        assert_eq!(table.get_or_insert_fallback("missing.png"), label);
        assert_eq!(table.len(), 3);
        assert_eq!(table.get("missing.png"), Some(label));
    }

    #[test]
    fn test_loaded_texture_wins_over_fallback() {
        let (mut table, label, _) = table();
        let mut handles: SlotMap<TextureHandle, ()> = SlotMap::with_key();
        let _ = handles.insert(());
        let _ = handles.insert(());
        let wood = handles.insert(());

        table.insert("wood.png", wood);

        assert_eq!(table.get_or_insert_fallback("wood.png"), wood);
        assert_ne!(wood, label);
    }
}
