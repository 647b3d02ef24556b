use std::collections::BTreeMap;
use std::ops::Index;

use crate::{image::ImageSource, NodeMap, NodeRef};
use serde::{Deserialize, Serialize};

pub const NODE_REROUTE: &str = "NodeReroute";
pub const NODE_GROUP: &str = "ShaderNodeGroup";
pub const NODE_GROUP_INPUT: &str = "NodeGroupInput";
pub const NODE_GROUP_OUTPUT: &str = "NodeGroupOutput";
pub const NODE_OUTPUT_MATERIAL: &str = "ShaderNodeOutputMaterial";

/// Authored socket default value.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum SocketValue {
    Bool(bool),
    Float(f32),
    Vector(Vec<f32>),
    String(String),
}

/// Node property such as `operation`, `blend_type` or `use_clamp`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Socket {
    pub identifier: String,
    pub name: String,
    #[serde(default)]
    pub default_value: Option<SocketValue>,
}

#[derive(Clone, Copy, Debug)]
pub enum SocketKey<'a> {
    /// Matches the socket's display name first, then its identifier.
    Name(&'a str),
    /// Exact identifier, as stored in links and shared by group sockets.
    Identifier(&'a str),
    Index(usize),
}
impl<'a> From<&'a str> for SocketKey<'a> {
    fn from(name: &'a str) -> Self {
        SocketKey::Name(name)
    }
}
impl From<usize> for SocketKey<'_> {
    fn from(index: usize) -> Self {
        SocketKey::Index(index)
    }
}
impl std::fmt::Display for SocketKey<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SocketKey::Name(name) => write!(f, "'{}'", name),
            SocketKey::Identifier(id) => f.write_str(id),
            SocketKey::Index(i) => write!(f, "#{}", i),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ShaderNode {
    pub bl_idname: String,
    #[serde(default)]
    pub inputs: Vec<Socket>,
    #[serde(default)]
    pub outputs: Vec<Socket>,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyValue>,
    #[serde(default)]
    pub image: Option<ImageSource>,
    /// Node tree of a `ShaderNodeGroup`.
    #[serde(default)]
    pub group: Option<Box<ShaderNodeTree>>,
}

fn find_socket<'s>(sockets: &'s [Socket], key: SocketKey<'_>) -> Option<&'s Socket> {
    match key {
        SocketKey::Index(i) => sockets.get(i),
        SocketKey::Identifier(id) => sockets.iter().find(|s| s.identifier == id),
        SocketKey::Name(name) => sockets
            .iter()
            .find(|s| s.name == name)
            .or_else(|| sockets.iter().find(|s| s.identifier == name)),
    }
}

impl ShaderNode {
    pub fn new(bl_idname: impl Into<String>) -> Self {
        Self {
            bl_idname: bl_idname.into(),
            inputs: vec![],
            outputs: vec![],
            properties: BTreeMap::new(),
            image: None,
            group: None,
        }
    }
    pub fn isa(&self, bl_idname: &str) -> bool {
        self.bl_idname == bl_idname
    }
    pub fn input(&self, key: SocketKey<'_>) -> Option<&Socket> {
        find_socket(&self.inputs, key)
    }
    pub fn output(&self, key: SocketKey<'_>) -> Option<&Socket> {
        find_socket(&self.outputs, key)
    }
    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }
    pub fn prop_str(&self, name: &str) -> Option<&str> {
        match self.properties.get(name) {
            Some(PropertyValue::String(s)) => Some(s),
            _ => None,
        }
    }
    pub fn prop_bool(&self, name: &str) -> bool {
        match self.properties.get(name) {
            Some(PropertyValue::Bool(b)) => *b,
            Some(PropertyValue::Int(i)) => *i != 0,
            _ => false,
        }
    }

    // builder helpers, mostly for tests and the host side
    pub fn with_input(self, name: &str, default_value: impl Into<SocketValue>) -> Self {
        self.push_input(name, Some(default_value.into()))
    }
    /// Input without a default, e.g. a shader socket.
    pub fn with_link_input(self, name: &str) -> Self {
        self.push_input(name, None)
    }
    pub fn with_output(mut self, name: &str) -> Self {
        let identifier = unique_identifier(&self.outputs, name);
        self.outputs.push(Socket {
            identifier,
            name: name.into(),
            default_value: None,
        });
        self
    }
    pub fn with_output_value(mut self, name: &str, default_value: impl Into<SocketValue>) -> Self {
        self = self.with_output(name);
        if let Some(socket) = self.outputs.last_mut() {
            socket.default_value = Some(default_value.into());
        }
        self
    }
    fn push_input(mut self, name: &str, default_value: Option<SocketValue>) -> Self {
        let identifier = unique_identifier(&self.inputs, name);
        self.inputs.push(Socket {
            identifier,
            name: name.into(),
            default_value,
        });
        self
    }
    pub fn with_property(mut self, name: &str, value: PropertyValue) -> Self {
        self.properties.insert(name.into(), value);
        self
    }
}

// Blender suffixes repeated socket names: "Value", "Value_001", ...
fn unique_identifier(sockets: &[Socket], name: &str) -> String {
    let count = sockets.iter().filter(|s| s.name == name).count();
    if count == 0 {
        name.to_string()
    } else {
        format!("{}_{:03}", name, count)
    }
}

impl From<f32> for SocketValue {
    fn from(v: f32) -> Self {
        SocketValue::Float(v)
    }
}
impl From<f64> for SocketValue {
    fn from(v: f64) -> Self {
        SocketValue::Float(v as f32)
    }
}
impl<const N: usize> From<[f32; N]> for SocketValue {
    fn from(v: [f32; N]) -> Self {
        SocketValue::Vector(v.to_vec())
    }
}
impl<const N: usize> From<[f64; N]> for SocketValue {
    fn from(v: [f64; N]) -> Self {
        SocketValue::Vector(v.iter().map(|x| *x as f32).collect())
    }
}
impl From<&str> for SocketValue {
    fn from(v: &str) -> Self {
        SocketValue::String(v.into())
    }
}
impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        PropertyValue::String(v.into())
    }
}
impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        PropertyValue::Bool(v)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Link {
    pub from_node: NodeRef<ShaderNode>,
    /// Output socket identifier.
    pub from_socket: String,
    pub to_node: NodeRef<ShaderNode>,
    /// Input socket identifier.
    pub to_socket: String,
    #[serde(default = "default_true")]
    pub is_valid: bool,
}
fn default_true() -> bool {
    true
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ShaderNodeTree {
    #[serde(default)]
    pub name: String,
    pub nodes: NodeMap<ShaderNode>,
    #[serde(default)]
    pub links: Vec<Link>,
}
impl<'a> Index<&'a NodeRef<ShaderNode>> for ShaderNodeTree {
    type Output = ShaderNode;
    fn index(&self, index: &'a NodeRef<ShaderNode>) -> &Self::Output {
        &self.nodes[index]
    }
}

impl ShaderNodeTree {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
    pub fn node(&self, node: &NodeRef<ShaderNode>) -> Option<&ShaderNode> {
        self.nodes.get(node)
    }
    pub fn add_node(&mut self, id: impl Into<String>, node: ShaderNode) -> NodeRef<ShaderNode> {
        self.nodes.add(id, node)
    }
    /// Links `from.outputs[from_socket]` to `to.inputs[to_socket]`, both given by name or index.
    /// Returns `false` if either node or socket does not exist.
    pub fn link<'k>(
        &mut self,
        from: &NodeRef<ShaderNode>,
        from_socket: impl Into<SocketKey<'k>>,
        to: &NodeRef<ShaderNode>,
        to_socket: impl Into<SocketKey<'k>>,
    ) -> bool {
        let from_id = self
            .node(from)
            .and_then(|n| n.output(from_socket.into()))
            .map(|s| s.identifier.clone());
        let to_id = self
            .node(to)
            .and_then(|n| n.input(to_socket.into()))
            .map(|s| s.identifier.clone());
        match (from_id, to_id) {
            (Some(from_socket), Some(to_socket)) => {
                self.links.push(Link {
                    from_node: from.clone(),
                    from_socket,
                    to_node: to.clone(),
                    to_socket,
                    is_valid: true,
                });
                true
            }
            _ => false,
        }
    }
    /// First link feeding `node.inputs[socket]`, Blender sockets accept a single link.
    pub fn input_link(&self, node: &NodeRef<ShaderNode>, socket: &str) -> Option<&Link> {
        self.links
            .iter()
            .find(|l| &l.to_node == node && l.to_socket == socket)
    }
    /// The output node flagged `is_active_output`, falling back to the first one.
    pub fn active_output(&self, bl_idname: &str) -> Option<&NodeRef<ShaderNode>> {
        let mut first = None;
        for (r, node) in &self.nodes {
            if !node.isa(bl_idname) {
                continue;
            }
            if node.prop_bool("is_active_output") {
                return Some(r);
            }
            first.get_or_insert(r);
        }
        first
    }
}
