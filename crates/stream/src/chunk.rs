use std::collections::HashMap;

use worldpart_common::{AmbientRef, BlockCoord, BlockTypeId, ChunkKey, ObjectId, ObjectRef, Rect};

use crate::cache::PartError;
use crate::link::WorldLink;
use crate::list::ObjectList;

/// One streamable square of the outdoor world.
///
/// Objects fully inside the chunk are "contained"; objects whose bounds
/// straddle chunk borders are "overlapping" and listed in every chunk they
/// touch.
#[derive(Debug, Clone)]
pub struct Chunk {
    key: ChunkKey,
    span: i32,
    blocks: Vec<BlockTypeId>,
    contained: ObjectList<ObjectRef>,
    overlapping: ObjectList<ObjectRef>,
    ambient: ObjectList<AmbientRef>,
    links: HashMap<u64, WorldLink>,
}

impl Chunk {
    /// A chunk of `span * span` blocks, all of type `fill`.
    pub fn new(key: ChunkKey, span: i32, fill: BlockTypeId) -> Self {
        let len = (span * span) as usize;
        Self {
            key,
            span,
            blocks: vec![fill; len],
            contained: ObjectList::new(),
            overlapping: ObjectList::new(),
            ambient: ObjectList::new(),
            links: HashMap::new(),
        }
    }

    /// Build from a row-major terrain grid.
    pub fn from_blocks(
        key: ChunkKey,
        span: i32,
        blocks: Vec<BlockTypeId>,
    ) -> Result<Self, PartError> {
        let expected = (span * span) as usize;
        if span <= 0 || blocks.len() != expected {
            return Err(PartError::Corrupt {
                key: format!("{key:?}"),
                reason: format!("expected {expected} blocks, got {}", blocks.len()),
            });
        }
        let mut chunk = Self::new(key, span, BlockTypeId::NONE);
        chunk.blocks = blocks;
        Ok(chunk)
    }

    pub fn key(&self) -> ChunkKey {
        self.key
    }

    pub fn span(&self) -> i32 {
        self.span
    }

    /// Row-major terrain grid.
    pub fn blocks(&self) -> &[BlockTypeId] {
        &self.blocks
    }

    /// Pixel bounds of the chunk.
    pub fn bounds(&self, block_size: i32) -> Rect {
        let size = self.span * block_size;
        Rect::new(self.key.x * size, self.key.y * size, size, size)
    }

    /// Terrain at a world block; the block is resolved through its offset
    /// inside this chunk.
    pub fn block_type(&self, block: BlockCoord) -> BlockTypeId {
        self.blocks[self.index(block)]
    }

    pub(crate) fn set_block_type(&mut self, block: BlockCoord, block_type: BlockTypeId) {
        let index = self.index(block);
        self.blocks[index] = block_type;
    }

    fn index(&self, block: BlockCoord) -> usize {
        debug_assert_eq!(block.chunk(self.span), self.key, "block outside chunk");
        let (x, y) = block.local_offset(self.span);
        y * self.span as usize + x
    }

    pub fn add_contained_object(&mut self, object: ObjectRef) -> bool {
        self.contained.add(object)
    }

    pub fn remove_contained_object(&mut self, id: ObjectId) -> bool {
        self.contained.remove(id)
    }

    pub fn contained_objects(&self) -> &[ObjectRef] {
        self.contained.as_slice()
    }

    pub fn add_overlapping_object(&mut self, object: ObjectRef) -> bool {
        self.overlapping.add(object)
    }

    pub fn remove_overlapping_object(&mut self, id: ObjectId) -> bool {
        self.overlapping.remove(id)
    }

    pub fn overlapping_objects(&self) -> &[ObjectRef] {
        self.overlapping.as_slice()
    }

    pub fn add_ambient_object(&mut self, object: AmbientRef) -> bool {
        self.ambient.add(object)
    }

    pub fn remove_ambient_object(&mut self, id: ObjectId) -> bool {
        self.ambient.remove(id)
    }

    pub fn ambient_objects(&self) -> &[AmbientRef] {
        self.ambient.as_slice()
    }

    /// Overlapping objects first, then contained ones. This is the order
    /// every query visits them in.
    pub fn hitable_objects(&self) -> impl Iterator<Item = &ObjectRef> {
        self.overlapping
            .as_slice()
            .iter()
            .chain(self.contained.as_slice())
    }

    /// Whether any object list is currently allocated.
    pub fn has_objects(&self) -> bool {
        self.contained.is_allocated() || self.overlapping.is_allocated() || self.ambient.is_allocated()
    }

    pub fn add_world_link(&mut self, link: WorldLink) -> Option<WorldLink> {
        self.links.insert(link.from_block.pack(), link)
    }

    pub fn remove_world_link(&mut self, from_block: BlockCoord) -> Option<WorldLink> {
        self.links.remove(&from_block.pack())
    }

    pub fn world_link_at(&self, block: BlockCoord) -> Option<&WorldLink> {
        self.links.get(&block.pack())
    }

    pub fn world_links(&self) -> impl Iterator<Item = &WorldLink> {
        self.links.values()
    }
}
