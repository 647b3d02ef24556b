use crate::compiler::NodeContext;
use crate::error::CompileError;
use crate::mtlx::MxType;
use crate::value::{BinaryOp, UnaryOp, Value};

use super::NodeExporter;

pub struct ShaderNodeMath;

impl NodeExporter for ShaderNodeMath {
    fn export(&self, ctx: &mut NodeContext<'_, '_>) -> Result<Option<Value>, CompileError> {
        let op = ctx.prop_str("operation").unwrap_or("ADD");
        let ty = ctx.out_type().data_or(MxType::Float);
        let a = ctx.input_value(0usize, ty)?;

        let unary = match op {
            "SINE" => Some(UnaryOp::Sin),
            "COSINE" => Some(UnaryOp::Cos),
            "TANGENT" => Some(UnaryOp::Tan),
            "ARCSINE" => Some(UnaryOp::Asin),
            "ARCCOSINE" => Some(UnaryOp::Acos),
            "ARCTANGENT" => Some(UnaryOp::Atan),
            "LOGARITHM" => Some(UnaryOp::Ln),
            "ABSOLUTE" => Some(UnaryOp::Abs),
            "FLOOR" => Some(UnaryOp::Floor),
            _ => None,
        };
        let binary = match op {
            "ADD" => Some(BinaryOp::Add),
            "SUBTRACT" => Some(BinaryOp::Subtract),
            "MULTIPLY" => Some(BinaryOp::Multiply),
            "DIVIDE" => Some(BinaryOp::Divide),
            "POWER" => Some(BinaryOp::Power),
            "MINIMUM" => Some(BinaryOp::Min),
            "MAXIMUM" => Some(BinaryOp::Max),
            "MODULO" => Some(BinaryOp::Modulo),
            _ => None,
        };

        let res = if let Some(op) = unary {
            ctx.unary(op, a)?
        } else if let Some(op) = binary {
            let b = ctx.input_value(1usize, ty)?;
            ctx.binary(op, a, b)?
        } else {
            match op {
                "FRACT" => ctx.modulo(a, 1.0)?,
                "CEIL" => ctx.ceil(a)?,
                "ROUND" => ctx.round(a)?,
                "MULTIPLY_ADD" => {
                    let b = ctx.input_value(1usize, ty)?;
                    let c = ctx.input_value(2usize, ty)?;
                    let ab = ctx.mul(a, b)?;
                    ctx.add(ab, c)?
                }
                _ => {
                    ctx.warn(format!("math operation `{}` is not supported", op));
                    return Ok(None);
                }
            }
        };

        let res = if ctx.prop_bool("use_clamp") {
            ctx.clamp(res, 0.0, 1.0)?
        } else {
            res
        };
        Ok(Some(res))
    }
}
