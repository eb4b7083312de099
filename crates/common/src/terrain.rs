use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// Terrain type stored per block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct BlockTypeId(pub i32);

impl BlockTypeId {
    /// Reported for blocks outside an interior's dimensions.
    pub const INVALID: BlockTypeId = BlockTypeId(-1);
    pub const NONE: BlockTypeId = BlockTypeId(0);
}

/// Static properties of one terrain type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockType {
    pub name: String,
    #[serde(default)]
    pub is_blocking: bool,
    #[serde(default)]
    pub is_hitable: bool,
}

/// Content-defined lookup from terrain id to its flags.
///
/// Unknown ids and [`BlockTypeId::INVALID`] block and are hitable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockTypeTable {
    types: HashMap<BlockTypeId, BlockType>,
}

impl BlockTypeTable {
    pub fn empty() -> Self {
        Self {
            types: HashMap::new(),
        }
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let file = std::fs::File::open(path)?;
        Ok(serde_json::from_reader(file)?)
    }

    pub fn insert(&mut self, id: BlockTypeId, block_type: BlockType) -> Option<BlockType> {
        self.types.insert(id, block_type)
    }

    pub fn get(&self, id: BlockTypeId) -> Option<&BlockType> {
        self.types.get(&id)
    }

    pub fn is_blocking(&self, id: BlockTypeId) -> bool {
        self.types.get(&id).is_none_or(|t| t.is_blocking)
    }

    pub fn is_hitable(&self, id: BlockTypeId) -> bool {
        self.types.get(&id).is_none_or(|t| t.is_hitable)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl Default for BlockTypeTable {
    fn default() -> Self {
        let mut table = Self::empty();
        table.insert(
            BlockTypeId::NONE,
            BlockType {
                name: "None".into(),
                is_blocking: true,
                is_hitable: true,
            },
        );
        table.insert(
            BlockTypeId(1),
            BlockType {
                name: "Grass".into(),
                is_blocking: false,
                is_hitable: false,
            },
        );
        table.insert(
            BlockTypeId(2),
            BlockType {
                name: "Water".into(),
                is_blocking: true,
                is_hitable: true,
            },
        );
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_flags() {
        let table = BlockTypeTable::default();
        assert!(table.is_blocking(BlockTypeId::NONE));
        assert!(!table.is_blocking(BlockTypeId(1)));
        assert!(table.is_hitable(BlockTypeId(2)));
    }

    #[test]
    fn unknown_and_invalid_ids_block() {
        let table = BlockTypeTable::default();
        assert!(table.is_blocking(BlockTypeId(99)));
        assert!(table.is_blocking(BlockTypeId::INVALID));
        assert!(table.is_hitable(BlockTypeId::INVALID));
    }

    #[test]
    fn table_loads_from_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blocks.json");
        std::fs::write(
            &path,
            r#"{"types":{"5":{"name":"Fence","is_blocking":true}}}"#,
        )
        .unwrap();
        let table = BlockTypeTable::from_json_file(&path).unwrap();
        assert_eq!(table.len(), 1);
        assert!(table.is_blocking(BlockTypeId(5)));
        assert!(!table.is_hitable(BlockTypeId(5)));
    }
}
