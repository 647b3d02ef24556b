//! In-memory MaterialX document built by the compiler.

use std::collections::HashMap;
use std::fmt;

use blmx_common::indexmap::IndexMap;
use blmx_common::smallvec::SmallVec;
use serde::{Deserialize, Serialize};

pub mod nodedef;
mod xml;

pub use nodedef::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MxType {
    #[serde(rename = "float")]
    Float,
    #[serde(rename = "integer")]
    Integer,
    #[serde(rename = "boolean")]
    Boolean,
    #[serde(rename = "string")]
    String,
    #[serde(rename = "filename")]
    Filename,
    #[serde(rename = "vector2")]
    Vector2,
    #[serde(rename = "vector3")]
    Vector3,
    #[serde(rename = "vector4")]
    Vector4,
    #[serde(rename = "color3")]
    Color3,
    #[serde(rename = "color4")]
    Color4,
    #[serde(rename = "BSDF")]
    Bsdf,
    #[serde(rename = "EDF")]
    Edf,
    #[serde(rename = "surfaceshader")]
    SurfaceShader,
    #[serde(rename = "displacementshader")]
    DisplacementShader,
    #[serde(rename = "material")]
    Material,
}

impl MxType {
    pub fn as_str(self) -> &'static str {
        match self {
            MxType::Float => "float",
            MxType::Integer => "integer",
            MxType::Boolean => "boolean",
            MxType::String => "string",
            MxType::Filename => "filename",
            MxType::Vector2 => "vector2",
            MxType::Vector3 => "vector3",
            MxType::Vector4 => "vector4",
            MxType::Color3 => "color3",
            MxType::Color4 => "color4",
            MxType::Bsdf => "BSDF",
            MxType::Edf => "EDF",
            MxType::SurfaceShader => "surfaceshader",
            MxType::DisplacementShader => "displacementshader",
            MxType::Material => "material",
        }
    }
    /// Number of float channels for arithmetic types.
    pub fn channels(self) -> Option<usize> {
        match self {
            MxType::Float => Some(1),
            MxType::Vector2 => Some(2),
            MxType::Vector3 | MxType::Color3 => Some(3),
            MxType::Vector4 | MxType::Color4 => Some(4),
            _ => None,
        }
    }
    /// Type of a constant tuple when nothing else decides it.
    pub fn from_channels(n: usize) -> MxType {
        match n {
            0 | 1 => MxType::Float,
            2 => MxType::Vector2,
            3 => MxType::Color3,
            _ => MxType::Color4,
        }
    }
    pub fn is_numeric(self) -> bool {
        self.channels().is_some()
    }
    pub fn is_shader(self) -> bool {
        matches!(
            self,
            MxType::Bsdf
                | MxType::Edf
                | MxType::SurfaceShader
                | MxType::DisplacementShader
                | MxType::Material
        )
    }
    /// `self` when it is an arithmetic type, otherwise `fallback`.
    ///
    /// Data producers compiled for a shader consumer (an image linked straight into
    /// `Surface`) still have to pick a data type for themselves.
    pub fn data_or(self, fallback: MxType) -> MxType {
        if self.is_numeric() {
            self
        } else {
            fallback
        }
    }
}

impl fmt::Display for MxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GraphId(pub u32);

/// Handle to a node inside a [`Document`], carrying its output type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MxNodeRef {
    pub graph: GraphId,
    pub index: u32,
    pub ty: MxType,
}

/// Constant bound to a node input.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MxValue {
    Boolean(bool),
    Integer(i32),
    Float(f32),
    Tuple(SmallVec<[f32; 4]>),
    String(String),
}

impl fmt::Display for MxValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MxValue::Boolean(b) => write!(f, "{}", b),
            MxValue::Integer(i) => write!(f, "{}", i),
            MxValue::Float(x) => write!(f, "{}", x),
            MxValue::Tuple(v) => {
                for (i, x) in v.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", x)?;
                }
                Ok(())
            }
            MxValue::String(s) => f.write_str(s),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputBinding {
    Value(MxValue),
    /// Name of a node in the same graph.
    Node(String),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MxInput {
    #[serde(rename = "type")]
    pub ty: MxType,
    #[serde(flatten)]
    pub binding: InputBinding,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MxNode {
    pub name: String,
    pub category: String,
    #[serde(rename = "type")]
    pub ty: MxType,
    pub inputs: IndexMap<String, MxInput>,
}

impl MxNode {
    pub fn input(&self, name: &str) -> Option<&MxInput> {
        self.inputs.get(name)
    }
    /// Name of the node bound to `input`, if it is bound to a node.
    pub fn input_node(&self, name: &str) -> Option<&str> {
        match &self.inputs.get(name)?.binding {
            InputBinding::Node(n) => Some(n),
            InputBinding::Value(_) => None,
        }
    }
    pub fn input_value(&self, name: &str) -> Option<&MxValue> {
        match &self.inputs.get(name)?.binding {
            InputBinding::Value(v) => Some(v),
            InputBinding::Node(_) => None,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NodeGraph {
    pub name: String,
    pub nodes: Vec<MxNode>,
    #[serde(skip)]
    by_name: HashMap<String, usize>,
}

impl NodeGraph {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
    pub fn node(&self, name: &str) -> Option<&MxNode> {
        match self.by_name.get(name) {
            Some(&i) => self.nodes.get(i),
            // deserialized graphs have no index
            None => self.nodes.iter().find(|n| n.name == name),
        }
    }
    pub fn nodes_of(&self, category: &str) -> impl Iterator<Item = &MxNode> + '_ {
        let category = category.to_string();
        self.nodes.iter().filter(move |n| n.category == category)
    }
    pub fn len(&self) -> usize {
        self.nodes.len()
    }
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Source of the numeric suffix of generated node names.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct IdGenerator {
    next: u64,
}
impl IdGenerator {
    pub fn next_id(&mut self) -> u64 {
        self.next += 1;
        self.next
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Document {
    pub version: String,
    pub graphs: Vec<NodeGraph>,
    #[serde(skip)]
    ids: IdGenerator,
}

impl Default for Document {
    fn default() -> Self {
        Self::new("1.38")
    }
}

impl Document {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            graphs: vec![],
            ids: IdGenerator::default(),
        }
    }
    /// Adds a graph. A taken name gets the next id appended.
    pub fn add_graph(&mut self, name: &str) -> GraphId {
        let name = if self.graph_by_name(name).is_some() {
            format!("{}_{}", name, self.ids.next_id())
        } else {
            name.to_string()
        };
        self.graphs.push(NodeGraph::new(name));
        GraphId(self.graphs.len() as u32 - 1)
    }
    pub fn graph(&self, id: GraphId) -> &NodeGraph {
        &self.graphs[id.0 as usize]
    }
    pub fn graph_by_name(&self, name: &str) -> Option<&NodeGraph> {
        self.graphs.iter().find(|g| g.name == name)
    }
    pub fn add_node(&mut self, graph: GraphId, category: &str, ty: MxType) -> MxNodeRef {
        let name = format!("{}_{}", category, self.ids.next_id());
        let graph_ref = &mut self.graphs[graph.0 as usize];
        let index = graph_ref.nodes.len();
        graph_ref.by_name.insert(name.clone(), index);
        graph_ref.nodes.push(MxNode {
            name,
            category: category.to_string(),
            ty,
            inputs: IndexMap::new(),
        });
        MxNodeRef {
            graph,
            index: index as u32,
            ty,
        }
    }
    pub fn node(&self, node: MxNodeRef) -> &MxNode {
        &self.graphs[node.graph.0 as usize].nodes[node.index as usize]
    }
    pub fn node_mut(&mut self, node: MxNodeRef) -> &mut MxNode {
        &mut self.graphs[node.graph.0 as usize].nodes[node.index as usize]
    }
    pub fn node_count(&self) -> usize {
        self.graphs.iter().map(|g| g.nodes.len()).sum()
    }
    /// Moves the graphs of `other` into `self`, renaming nodes so names stay unique.
    /// Returns the new id of each moved graph.
    pub fn merge(&mut self, other: Document) -> Vec<GraphId> {
        let mut ids = vec![];
        for graph in other.graphs {
            let id = self.add_graph(&graph.name);
            ids.push(id);
            let mut renamed = HashMap::new();
            for node in &graph.nodes {
                let new_name = format!("{}_{}", node.category, self.ids.next_id());
                renamed.insert(node.name.clone(), new_name);
            }
            for mut node in graph.nodes {
                node.name = renamed[&node.name].clone();
                for input in node.inputs.values_mut() {
                    if let InputBinding::Node(n) = &mut input.binding {
                        if let Some(new_name) = renamed.get(n) {
                            *n = new_name.clone();
                        }
                    }
                }
                let graph_ref = &mut self.graphs[id.0 as usize];
                graph_ref.by_name.insert(node.name.clone(), graph_ref.nodes.len());
                graph_ref.nodes.push(node);
            }
        }
        ids
    }
}
