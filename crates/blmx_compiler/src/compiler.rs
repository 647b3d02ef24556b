use std::collections::{HashMap, HashSet};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use blmx_common::indexmap::IndexMap;
use blmx_common::log;
use blmx_common::rayon::prelude::*;
use blmx_common::Config;
use blmx_scenegraph::{
    Link, NodeRef, ShaderNode, ShaderNodeTree, SocketKey, NODE_GROUP, NODE_GROUP_INPUT,
    NODE_GROUP_OUTPUT, NODE_OUTPUT_MATERIAL, NODE_REROUTE,
};

use crate::error::{CompileError, Diagnostic, Level};
use crate::expr::MxBuilder;
use crate::image_cache::ImageCache;
use crate::mtlx::{Document, MxNodeRef, MxType};
use crate::nodes::{ExporterRegistry, DEFAULT_REGISTRY};
use crate::value::Value;

/// Enclosing group nodes, outermost first. Extending returns a new stack.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct GroupStack(Vec<NodeRef<ShaderNode>>);

impl GroupStack {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn push(&self, group: &NodeRef<ShaderNode>) -> Self {
        let mut stack = self.0.clone();
        stack.push(group.clone());
        Self(stack)
    }
    /// The enclosing scope and the group node that opened the current one.
    pub fn pop(&self) -> Option<(GroupStack, NodeRef<ShaderNode>)> {
        let (last, rest) = self.0.split_last()?;
        Some((Self(rest.to_vec()), last.clone()))
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
    pub fn len(&self) -> usize {
        self.0.len()
    }
    /// `Group/Inner/node`
    pub fn path(&self, node: &NodeRef<ShaderNode>) -> String {
        let mut path = self.to_string();
        if !path.is_empty() {
            path.push('/');
        }
        path.push_str(node);
        path
    }
}

impl fmt::Display for GroupStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, group) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            f.write_str(group)?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct CacheKey {
    stack: GroupStack,
    node: NodeRef<ShaderNode>,
    output: String,
    ty: MxType,
}

#[derive(Clone, Copy)]
pub struct CompileContext<'a> {
    pub tree: &'a ShaderNodeTree,
    pub registry: &'a ExporterRegistry,
    pub images: &'a ImageCache,
}

#[derive(Clone, Debug)]
pub struct CompiledMaterial {
    pub name: String,
    /// The `surfacematerial` node, `None` if the tree has no output node.
    pub material: Option<MxNodeRef>,
    pub diagnostics: Vec<Diagnostic>,
}

/// One compilation pass over a material's node tree.
pub struct Compiler<'a> {
    ctx: CompileContext<'a>,
    builder: MxBuilder<'a>,
    cache: HashMap<CacheKey, Option<Value>>,
    in_progress: HashSet<CacheKey>,
    diagnostics: Vec<Diagnostic>,
}

fn graph_name(material: &str) -> String {
    let name: String = material
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("NG_{}", name)
}

impl<'a> Compiler<'a> {
    fn new(ctx: CompileContext<'a>, builder: MxBuilder<'a>) -> Self {
        Self {
            ctx,
            builder,
            cache: HashMap::new(),
            in_progress: HashSet::new(),
            diagnostics: vec![],
        }
    }

    /// Compiles the active material output of `ctx.tree` into a new graph of `doc`.
    pub fn compile(
        ctx: CompileContext<'a>,
        doc: &'a mut Document,
        name: &str,
    ) -> Result<CompiledMaterial, CompileError> {
        let graph = doc.add_graph(&graph_name(name));
        let mut compiler = Self::new(ctx, MxBuilder::new(doc, graph));
        let material = match ctx.tree.active_output(NODE_OUTPUT_MATERIAL) {
            Some(output) => compiler
                .compile_node(&GroupStack::new(), output, "", MxType::Material)?
                .and_then(|v| v.as_node()),
            None => {
                compiler.warn(&GroupStack::new(), None, "material has no output node");
                None
            }
        };
        log::debug!(
            "compiled material `{}`: {} cache entries, {} diagnostics",
            name,
            compiler.cache.len(),
            compiler.diagnostics.len()
        );
        Ok(CompiledMaterial {
            name: name.to_string(),
            material,
            diagnostics: compiler.diagnostics,
        })
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    fn warn(&mut self, stack: &GroupStack, node: Option<&NodeRef<ShaderNode>>, message: impl Into<String>) {
        let diagnostic = Diagnostic {
            level: Level::Warning,
            node: node.map(|n| stack.path(n)),
            message: message.into(),
        };
        log::warn!("{}", diagnostic);
        self.diagnostics.push(diagnostic);
    }

    fn tree_for(&self, stack: &GroupStack) -> Result<&'a ShaderNodeTree, CompileError> {
        let mut tree = self.ctx.tree;
        for group in &stack.0 {
            tree = tree
                .node(group)
                .and_then(|n| n.group.as_deref())
                .ok_or_else(|| CompileError::BadGroupStack(stack.to_string()))?;
        }
        Ok(tree)
    }

    /// Compiles `node.outputs[output]` for a consumer that wants `ty`.
    /// Each key is compiled at most once per pass, including `None` results.
    pub fn compile_node(
        &mut self,
        stack: &GroupStack,
        node: &NodeRef<ShaderNode>,
        output: &str,
        ty: MxType,
    ) -> Result<Option<Value>, CompileError> {
        let key = CacheKey {
            stack: stack.clone(),
            node: node.clone(),
            output: output.to_string(),
            ty,
        };
        if let Some(value) = self.cache.get(&key) {
            return Ok(value.clone());
        }
        if !self.in_progress.insert(key.clone()) {
            self.warn(stack, Some(node), "node depends on itself, cycle ignored");
            return Ok(None);
        }
        let result = self.dispatch(stack, node, output, ty);
        self.in_progress.remove(&key);
        let value = result?;
        if self.cache.insert(key, value.clone()).is_some() {
            return Err(CompileError::CacheCollision(stack.path(node)));
        }
        Ok(value)
    }

    fn dispatch(
        &mut self,
        stack: &GroupStack,
        node: &NodeRef<ShaderNode>,
        output: &str,
        ty: MxType,
    ) -> Result<Option<Value>, CompileError> {
        let tree = self.tree_for(stack)?;
        let Some(data) = tree.node(node) else {
            self.warn(stack, Some(node), "link from a node that does not exist");
            return Ok(None);
        };
        match data.bl_idname.as_str() {
            NODE_GROUP => return self.compile_group(stack, node, data, output, ty),
            NODE_GROUP_INPUT => return self.compile_group_input(stack, node, output, ty),
            _ => {}
        }
        let registry = self.ctx.registry;
        let Some(exporter) = registry.get(&data.bl_idname) else {
            self.warn(
                stack,
                Some(node),
                format!("unsupported node `{}`", data.bl_idname),
            );
            return Ok(None);
        };
        log::debug!("export {} ({}) as {}", stack.path(node), data.bl_idname, ty);
        let outer = self.builder.set_target(Some(ty));
        let result = {
            let mut ctx = NodeContext {
                compiler: &mut *self,
                stack: stack.clone(),
                node: node.clone(),
                data,
                output: output.to_string(),
                ty,
            };
            exporter.export(&mut ctx)
        };
        self.builder.set_target(outer);
        result
    }

    fn compile_group(
        &mut self,
        stack: &GroupStack,
        node: &NodeRef<ShaderNode>,
        data: &'a ShaderNode,
        output: &str,
        ty: MxType,
    ) -> Result<Option<Value>, CompileError> {
        let Some(group) = data.group.as_deref() else {
            self.warn(stack, Some(node), "group node without a node tree");
            return Ok(None);
        };
        let Some(group_output) = group.active_output(NODE_GROUP_OUTPUT) else {
            self.warn(stack, Some(node), "group has no output node");
            return Ok(None);
        };
        let inner = stack.push(node);
        self.input_value(&inner, group_output, SocketKey::Identifier(output), ty)
    }

    fn compile_group_input(
        &mut self,
        stack: &GroupStack,
        node: &NodeRef<ShaderNode>,
        output: &str,
        ty: MxType,
    ) -> Result<Option<Value>, CompileError> {
        let Some((outer, group)) = stack.pop() else {
            self.warn(stack, Some(node), "group input node outside of a group");
            return Ok(None);
        };
        self.input_value(&outer, &group, SocketKey::Identifier(output), ty)
    }

    /// Link feeding `node.inputs[socket]` with reroutes skipped. `None` for unlinked
    /// sockets, invalid links and reroute chains that lead nowhere.
    fn follow_link(
        &mut self,
        stack: &GroupStack,
        tree: &'a ShaderNodeTree,
        node: &NodeRef<ShaderNode>,
        socket: &str,
    ) -> Option<&'a Link> {
        let mut link = tree.input_link(node, socket)?;
        for _ in 0..=tree.nodes.len() {
            if !link.is_valid {
                self.warn(
                    stack,
                    Some(node),
                    format!("invalid link from `{}` ignored", link.from_node),
                );
                return None;
            }
            let from = tree.node(&link.from_node)?;
            if !from.isa(NODE_REROUTE) {
                return Some(link);
            }
            let input = from.inputs.first()?;
            link = tree.input_link(&link.from_node, &input.identifier)?;
        }
        self.warn(stack, Some(node), "reroute loop ignored");
        None
    }

    pub fn input_link(
        &mut self,
        stack: &GroupStack,
        node: &NodeRef<ShaderNode>,
        key: SocketKey<'_>,
        ty: MxType,
    ) -> Result<Option<Value>, CompileError> {
        let tree = self.tree_for(stack)?;
        let Some(socket) = tree.node(node).and_then(|n| n.input(key)) else {
            return Ok(None);
        };
        let Some(link) = self.follow_link(stack, tree, node, &socket.identifier) else {
            return Ok(None);
        };
        self.compile_node(stack, &link.from_node, &link.from_socket, ty)
    }

    pub fn input_default(
        &self,
        stack: &GroupStack,
        node: &NodeRef<ShaderNode>,
        key: SocketKey<'_>,
    ) -> Result<Option<Value>, CompileError> {
        let tree = self.tree_for(stack)?;
        Ok(tree
            .node(node)
            .and_then(|n| n.input(key))
            .and_then(|s| s.default_value.as_ref())
            .and_then(Value::from_socket))
    }

    /// The linked value, or the socket's default shaped to `ty` when unlinked or
    /// when the upstream node produced nothing.
    pub fn input_value(
        &mut self,
        stack: &GroupStack,
        node: &NodeRef<ShaderNode>,
        key: SocketKey<'_>,
        ty: MxType,
    ) -> Result<Option<Value>, CompileError> {
        match self.input_link(stack, node, key, ty)? {
            Some(value) => Ok(Some(value)),
            None => Ok(self.input_default(stack, node, key)?.map(|v| v.fit(ty))),
        }
    }
}

/// What an exporter sees of the node it is compiling.
///
/// Derefs to the session's [`MxBuilder`], so expression methods can be called on
/// the context directly.
pub struct NodeContext<'c, 'a> {
    compiler: &'c mut Compiler<'a>,
    stack: GroupStack,
    node: NodeRef<ShaderNode>,
    data: &'a ShaderNode,
    output: String,
    ty: MxType,
}

impl<'c, 'a> NodeContext<'c, 'a> {
    pub fn node(&self) -> &'a ShaderNode {
        self.data
    }
    pub fn id(&self) -> &NodeRef<ShaderNode> {
        &self.node
    }
    pub fn group_stack(&self) -> &GroupStack {
        &self.stack
    }
    /// Identifier of the output socket being compiled.
    pub fn output(&self) -> &str {
        &self.output
    }
    /// Type the consumer asked for.
    pub fn out_type(&self) -> MxType {
        self.ty
    }
    pub fn images(&self) -> &'a ImageCache {
        self.compiler.ctx.images
    }
    pub fn has_input<'k>(&self, key: impl Into<SocketKey<'k>>) -> bool {
        self.data.input(key.into()).is_some()
    }
    pub fn prop_str(&self, name: &str) -> Option<&'a str> {
        self.data.prop_str(name)
    }
    pub fn prop_bool(&self, name: &str) -> bool {
        self.data.prop_bool(name)
    }

    /// Compiled upstream value, `None` when the socket is unlinked.
    pub fn input_link<'k>(
        &mut self,
        key: impl Into<SocketKey<'k>>,
        ty: MxType,
    ) -> Result<Option<Value>, CompileError> {
        self.compiler.input_link(&self.stack, &self.node, key.into(), ty)
    }

    pub fn input_default<'k>(&self, key: impl Into<SocketKey<'k>>) -> Option<Value> {
        self.data
            .input(key.into())
            .and_then(|s| s.default_value.as_ref())
            .and_then(Value::from_socket)
    }

    /// Linked value or socket default. A socket with neither yields `0.0`.
    pub fn input_value<'k>(
        &mut self,
        key: impl Into<SocketKey<'k>>,
        ty: MxType,
    ) -> Result<Value, CompileError> {
        let key = key.into();
        match self.compiler.input_value(&self.stack, &self.node, key, ty)? {
            Some(value) => Ok(value),
            None => {
                self.warn(format!("input {} has no value, using 0", key));
                Ok(Value::Scalar(0.0))
            }
        }
    }

    /// Default value of the output being compiled.
    pub fn output_default(&self) -> Option<Value> {
        self.data
            .output(SocketKey::Identifier(&self.output))
            .or_else(|| self.data.outputs.first())
            .and_then(|s| s.default_value.as_ref())
            .and_then(Value::from_socket)
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.compiler.warn(&self.stack, Some(&self.node), message);
    }
}

impl<'c, 'a> Deref for NodeContext<'c, 'a> {
    type Target = MxBuilder<'a>;
    fn deref(&self) -> &Self::Target {
        &self.compiler.builder
    }
}
impl<'c, 'a> DerefMut for NodeContext<'c, 'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.compiler.builder
    }
}

/// Compiles `tree` into a document of its own.
pub fn compile_material(
    name: &str,
    tree: &ShaderNodeTree,
    registry: &ExporterRegistry,
    images: &ImageCache,
    version: &str,
) -> Result<(Document, CompiledMaterial), CompileError> {
    let mut doc = Document::new(version);
    let ctx = CompileContext {
        tree,
        registry,
        images,
    };
    let material = Compiler::compile(ctx, &mut doc, name)?;
    Ok((doc, material))
}

/// Collects the materials of one export into a single document.
pub struct CompilerDriver {
    registry: Arc<ExporterRegistry>,
    images: Arc<ImageCache>,
    document: Document,
    materials: IndexMap<String, CompiledMaterial>,
}

impl CompilerDriver {
    pub fn new(config: &Config) -> Self {
        Self::with_parts(
            &config.mtlx_version,
            DEFAULT_REGISTRY.clone(),
            Arc::new(ImageCache::from_config(config)),
        )
    }
    pub fn with_parts(version: &str, registry: Arc<ExporterRegistry>, images: Arc<ImageCache>) -> Self {
        Self {
            registry,
            images,
            document: Document::new(version),
            materials: IndexMap::new(),
        }
    }
    pub fn material_count(&self) -> usize {
        self.materials.len()
    }
    pub fn material(&self, name: &str) -> Option<&CompiledMaterial> {
        self.materials.get(name)
    }
    pub fn materials(&self) -> impl Iterator<Item = &CompiledMaterial> {
        self.materials.values()
    }
    pub fn document(&self) -> &Document {
        &self.document
    }
    pub fn images(&self) -> &Arc<ImageCache> {
        &self.images
    }

    pub fn compile(
        &mut self,
        name: &str,
        tree: &ShaderNodeTree,
    ) -> Result<&CompiledMaterial, CompileError> {
        let ctx = CompileContext {
            tree,
            registry: &self.registry,
            images: &self.images,
        };
        let material = Compiler::compile(ctx, &mut self.document, name)?;
        Ok(self.insert(material))
    }

    /// Compiles every tree on the rayon pool, each into its own document, then
    /// merges the results in input order.
    pub fn compile_parallel(&mut self, trees: &[(String, ShaderNodeTree)]) -> Result<(), CompileError> {
        let version = self.document.version.clone();
        let registry = &*self.registry;
        let images = &*self.images;
        let results: Vec<_> = trees
            .par_iter()
            .map(|(name, tree)| compile_material(name, tree, registry, images, &version))
            .collect();
        for result in results {
            let (doc, mut material) = result?;
            let graphs = self.document.merge(doc);
            if let Some(node) = &mut material.material {
                node.graph = graphs[node.graph.0 as usize];
            }
            self.insert(material);
        }
        log::info!("compiled {} materials", trees.len());
        Ok(())
    }

    fn insert(&mut self, material: CompiledMaterial) -> &CompiledMaterial {
        if self.materials.contains_key(&material.name) {
            log::warn!("material `{}` compiled twice, keeping the last one", material.name);
        }
        let name = material.name.clone();
        self.materials.insert(name.clone(), material);
        &self.materials[&name]
    }

    pub fn finish(self) -> Document {
        self.document
    }
}
