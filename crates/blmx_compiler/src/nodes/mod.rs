//! Exporters for the Blender shader nodes the compiler understands.

use std::collections::HashMap;
use std::sync::Arc;

use blmx_common::lazy_static::lazy_static;

use crate::compiler::NodeContext;
use crate::error::CompileError;
use crate::value::Value;

mod color;
mod input;
mod math;
mod output;
mod shader;
mod texture;
mod vector;

pub use color::*;
pub use input::*;
pub use math::*;
pub use output::*;
pub use shader::*;
pub use texture::*;
pub use vector::*;

/// Compiles one kind of Blender node.
///
/// `Ok(None)` means the node produces nothing usable and the consumer falls back
/// to its socket default.
pub trait NodeExporter: Send + Sync {
    fn export(&self, ctx: &mut NodeContext<'_, '_>) -> Result<Option<Value>, CompileError>;
}

/// `bl_idname` to exporter.
#[derive(Default)]
pub struct ExporterRegistry {
    exporters: HashMap<String, Box<dyn NodeExporter>>,
}

impl ExporterRegistry {
    pub fn new() -> Self {
        Self::default()
    }
    /// Registry with every built-in exporter.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register("ShaderNodeMath", ShaderNodeMath);
        registry.register("ShaderNodeMixRGB", ShaderNodeMixRGB);
        registry.register("ShaderNodeMix", ShaderNodeMix);
        registry.register("ShaderNodeInvert", ShaderNodeInvert);
        registry.register("ShaderNodeValue", ShaderNodeValue);
        registry.register("ShaderNodeRGB", ShaderNodeRGB);
        registry.register("ShaderNodeBsdfPrincipled", ShaderNodeBsdfPrincipled);
        registry.register("ShaderNodeBsdfDiffuse", ShaderNodeBsdfDiffuse);
        registry.register("ShaderNodeBsdfGlass", ShaderNodeBsdfGlass);
        registry.register("ShaderNodeEmission", ShaderNodeEmission);
        registry.register("ShaderNodeMixShader", ShaderNodeMixShader);
        registry.register("ShaderNodeAddShader", ShaderNodeAddShader);
        registry.register("ShaderNodeTexImage", ShaderNodeTexImage);
        registry.register("ShaderNodeTexNoise", ShaderNodeTexNoise);
        registry.register("ShaderNodeNormalMap", ShaderNodeNormalMap);
        registry.register("ShaderNodeOutputMaterial", ShaderNodeOutputMaterial);
        registry
    }
    /// Replaces any exporter already registered for `bl_idname`.
    pub fn register(&mut self, bl_idname: &str, exporter: impl NodeExporter + 'static) {
        self.exporters
            .insert(bl_idname.to_string(), Box::new(exporter));
    }
    pub fn get(&self, bl_idname: &str) -> Option<&dyn NodeExporter> {
        self.exporters.get(bl_idname).map(|e| e.as_ref())
    }
    pub fn contains(&self, bl_idname: &str) -> bool {
        self.exporters.contains_key(bl_idname)
    }
    pub fn len(&self) -> usize {
        self.exporters.len()
    }
    pub fn is_empty(&self) -> bool {
        self.exporters.is_empty()
    }
}

lazy_static! {
    pub static ref DEFAULT_REGISTRY: Arc<ExporterRegistry> = Arc::new(ExporterRegistry::builtin());
}
