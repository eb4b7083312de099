use worldpart_common::{AmbientRef, ObjectId, ObjectRef};

/// Handle that can be told apart by object identity.
pub trait Identified {
    fn object_id(&self) -> ObjectId;
}

impl Identified for ObjectRef {
    fn object_id(&self) -> ObjectId {
        self.id()
    }
}

impl Identified for AmbientRef {
    fn object_id(&self) -> ObjectId {
        self.id()
    }
}

/// Lazily allocated object list: absent while empty, never holds an
/// object twice.
#[derive(Debug, Clone)]
pub struct ObjectList<T> {
    items: Option<Vec<T>>,
}

impl<T> Default for ObjectList<T> {
    fn default() -> Self {
        Self { items: None }
    }
}

impl<T: Identified> ObjectList<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if an object with the same identity is already listed.
    pub fn add(&mut self, item: T) -> bool {
        let id = item.object_id();
        let items = self.items.get_or_insert_with(Vec::new);
        if items.iter().any(|existing| existing.object_id() == id) {
            return false;
        }
        items.push(item);
        true
    }

    pub fn remove(&mut self, id: ObjectId) -> bool {
        let Some(items) = self.items.as_mut() else {
            return false;
        };
        let before = items.len();
        items.retain(|existing| existing.object_id() != id);
        let removed = items.len() != before;
        if items.is_empty() {
            self.items = None;
        }
        removed
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.as_slice().iter().any(|item| item.object_id() == id)
    }

    pub fn as_slice(&self) -> &[T] {
        self.items.as_deref().unwrap_or(&[])
    }

    pub fn is_allocated(&self) -> bool {
        self.items.is_some()
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_none()
    }
}
