use crate::compiler::NodeContext;
use crate::error::CompileError;
use crate::value::Value;

use super::NodeExporter;

fn constant_output(ctx: &mut NodeContext<'_, '_>) -> Option<Value> {
    let value = ctx.output_default();
    if value.is_none() {
        ctx.warn("output has no value");
    }
    value
}

pub struct ShaderNodeValue;

impl NodeExporter for ShaderNodeValue {
    fn export(&self, ctx: &mut NodeContext<'_, '_>) -> Result<Option<Value>, CompileError> {
        Ok(constant_output(ctx))
    }
}

pub struct ShaderNodeRGB;

impl NodeExporter for ShaderNodeRGB {
    fn export(&self, ctx: &mut NodeContext<'_, '_>) -> Result<Option<Value>, CompileError> {
        Ok(constant_output(ctx))
    }
}
