use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::ops::{Deref, Index};

use blmx_common::indexmap::{map::Iter, IndexMap};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub mod image;
pub mod shader;

pub use image::*;
pub use shader::*;

/// Names a node of a tree by its Blender node name, the key links refer to.
/// Serialized as the bare name.
pub struct NodeRef<T> {
    name: String,
    phantom: PhantomData<fn() -> T>,
}
impl<T> NodeRef<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            phantom: PhantomData,
        }
    }
    pub fn name(&self) -> &str {
        &self.name
    }
}
impl<T> Clone for NodeRef<T> {
    fn clone(&self) -> Self {
        Self::new(self.name.clone())
    }
}
impl<T> PartialEq for NodeRef<T> {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}
impl<T> Eq for NodeRef<T> {}
impl<T> Hash for NodeRef<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state)
    }
}
impl<T> Deref for NodeRef<T> {
    type Target = str;
    fn deref(&self) -> &str {
        &self.name
    }
}
impl<T> fmt::Debug for NodeRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeRef({:?})", self.name)
    }
}
impl<T> fmt::Display for NodeRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
impl<T> Serialize for NodeRef<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.name)
    }
}
impl<'de, T> Deserialize<'de> for NodeRef<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(NodeRef::new)
    }
}

/// Nodes of one tree in authoring order, serialized as a JSON object keyed by
/// node name.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeMap<T>(IndexMap<NodeRef<T>, T>);

impl<T> Default for NodeMap<T> {
    fn default() -> Self {
        Self(IndexMap::new())
    }
}
impl<T> NodeMap<T> {
    /// Inserts `value` under `name`, replacing a node of the same name.
    pub fn add(&mut self, name: impl Into<String>, value: T) -> NodeRef<T> {
        let node = NodeRef::new(name);
        self.0.insert(node.clone(), value);
        node
    }
    pub fn get(&self, node: &NodeRef<T>) -> Option<&T> {
        self.0.get(node)
    }
    /// Handle of the node called `name`, if the tree has one.
    pub fn resolve(&self, name: &str) -> Option<&NodeRef<T>> {
        self.0.keys().find(|k| k.name() == name)
    }
    pub fn len(&self) -> usize {
        self.0.len()
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
    pub fn iter(&self) -> Iter<'_, NodeRef<T>, T> {
        self.0.iter()
    }
}
impl<'a, T> IntoIterator for &'a NodeMap<T> {
    type Item = (&'a NodeRef<T>, &'a T);
    type IntoIter = Iter<'a, NodeRef<T>, T>;
    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
impl<'a, T> Index<&'a NodeRef<T>> for NodeMap<T> {
    type Output = T;
    fn index(&self, node: &'a NodeRef<T>) -> &T {
        &self.0[node]
    }
}
