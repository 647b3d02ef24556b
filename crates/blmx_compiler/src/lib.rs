pub use blmx_common::*;
pub use blmx_scenegraph as scene_graph;

pub mod compiler;
pub mod error;
pub mod expr;
pub mod image_cache;
pub mod mtlx;
pub mod nodes;
pub mod value;

pub use compiler::{
    compile_material, CompileContext, CompiledMaterial, Compiler, CompilerDriver, GroupStack,
    NodeContext,
};
pub use error::{CompileError, Diagnostic, Level};
pub use expr::{Arg, Cond, MxBuilder};
pub use image_cache::{ImageCache, ImageError};
pub use mtlx::{Document, MxNodeRef, MxType, MxValue};
pub use nodes::{ExporterRegistry, NodeExporter, DEFAULT_REGISTRY};
pub use value::Value;
