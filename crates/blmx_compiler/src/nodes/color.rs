use crate::compiler::NodeContext;
use crate::error::CompileError;
use crate::expr::Cond;
use crate::mtlx::MxType;
use crate::value::Value;

use super::NodeExporter;

/// Blends `c2` over `c1` the way Blender's MixRGB `blend_type` does.
fn mix_colors(
    ctx: &mut NodeContext<'_, '_>,
    blend_type: &str,
    fac: Value,
    c1: Value,
    c2: Value,
) -> Result<Value, CompileError> {
    Ok(match blend_type {
        "MIX" | "COLOR" => ctx.blend(fac, c1, c2)?,
        "ADD" => {
            let c = ctx.add(&c1, c2)?;
            ctx.blend(fac, c1, c)?
        }
        "MULTIPLY" => {
            let c = ctx.mul(&c1, c2)?;
            ctx.blend(fac, c1, c)?
        }
        "SUBTRACT" => {
            let c = ctx.sub(&c1, c2)?;
            ctx.blend(fac, c1, c)?
        }
        "DIVIDE" => {
            let c = ctx.div(&c1, c2)?;
            ctx.blend(fac, c1, c)?
        }
        "DIFFERENCE" => {
            let d = ctx.sub(&c1, c2)?;
            let c = ctx.abs(d)?;
            ctx.blend(fac, c1, c)?
        }
        "DARKEN" => {
            let c = ctx.min(&c1, c2)?;
            ctx.blend(fac, c1, c)?
        }
        "LIGHTEN" => {
            let c = ctx.max(&c1, c2)?;
            ctx.blend(fac, c1, c)?
        }
        "VALUE" => c1,
        "SCREEN" => {
            // 1 - (1 - fac + fac * (1 - c2)) * (1 - c1)
            let inv_fac = ctx.sub(1.0, &fac)?;
            let inv_c2 = ctx.sub(1.0, c2)?;
            let t = ctx.mul(fac, inv_c2)?;
            let t = ctx.add(inv_fac, t)?;
            let inv_c1 = ctx.sub(1.0, c1)?;
            let t = ctx.mul(t, inv_c1)?;
            ctx.sub(1.0, t)?
        }
        "SOFT_LIGHT" => {
            // (1 - fac) * c1 + fac * ((1 - c1) * c2 * c1 + c1 * scr)
            // scr = 1 - (1 - c2) * (1 - c1)
            let inv_c1 = ctx.sub(1.0, &c1)?;
            let inv_c2 = ctx.sub(1.0, &c2)?;
            let scr = ctx.mul(inv_c2, &inv_c1)?;
            let scr = ctx.sub(1.0, scr)?;
            let a = ctx.mul(inv_c1, c2)?;
            let a = ctx.mul(a, &c1)?;
            let b = ctx.mul(&c1, scr)?;
            let lit = ctx.add(a, b)?;
            let lit = ctx.mul(&fac, lit)?;
            let inv_fac = ctx.sub(1.0, fac)?;
            let base = ctx.mul(inv_fac, c1)?;
            ctx.add(base, lit)?
        }
        "LINEAR_LIGHT" => {
            // c2 > 0.5 ? c1 + fac * (2 * (c2 - 0.5)) : c1 + fac * (2 * c2 - 1)
            let t = ctx.sub(&c2, 0.5)?;
            let t = ctx.mul(2.0, t)?;
            let t = ctx.mul(&fac, t)?;
            let bright = ctx.add(&c1, t)?;
            let t = ctx.mul(2.0, &c2)?;
            let t = ctx.sub(t, 1.0)?;
            let t = ctx.mul(fac, t)?;
            let dark = ctx.add(c1, t)?;
            ctx.if_else(Cond::Greater, c2, 0.5, bright, dark)?
        }
        _ => {
            ctx.warn(format!("blend type `{}` is not supported, using MIX", blend_type));
            ctx.blend(fac, c1, c2)?
        }
    })
}

pub struct ShaderNodeMixRGB;

impl NodeExporter for ShaderNodeMixRGB {
    fn export(&self, ctx: &mut NodeContext<'_, '_>) -> Result<Option<Value>, CompileError> {
        let ty = ctx.out_type().data_or(MxType::Color3);
        let fac = ctx.input_value("Fac", MxType::Float)?;
        let c1 = ctx.input_value("Color1", ty)?;
        let c2 = ctx.input_value("Color2", ty)?;
        let blend_type = ctx.prop_str("blend_type").unwrap_or("MIX");
        let res = mix_colors(ctx, blend_type, fac, c1, c2)?;
        let res = if ctx.prop_bool("use_clamp") {
            ctx.clamp(res, 0.0, 1.0)?
        } else {
            res
        };
        Ok(Some(res))
    }
}

/// The generic Mix node. Its float, vector and color variants have separate
/// sockets, told apart by identifier.
pub struct ShaderNodeMix;

impl NodeExporter for ShaderNodeMix {
    fn export(&self, ctx: &mut NodeContext<'_, '_>) -> Result<Option<Value>, CompileError> {
        let data_type = ctx.prop_str("data_type").unwrap_or("RGBA");
        let (ty, a, b) = match data_type {
            "FLOAT" => (MxType::Float, "A_Float", "B_Float"),
            "VECTOR" => (MxType::Vector3, "A_Vector", "B_Vector"),
            "RGBA" => (MxType::Color3, "A_Color", "B_Color"),
            other => {
                ctx.warn(format!("mix data type `{}` is not supported", other));
                return Ok(None);
            }
        };
        let ty = ctx.out_type().data_or(ty);
        let factor = if data_type == "VECTOR" && ctx.prop_str("factor_mode") == Some("NON_UNIFORM") {
            ctx.input_value("Factor_Vector", ty)?
        } else {
            ctx.input_value("Factor_Float", MxType::Float)?
        };
        let fac = if ctx.prop_bool("clamp_factor") {
            ctx.clamp(factor, 0.0, 1.0)?
        } else {
            factor
        };
        let c1 = ctx.input_value(a, ty)?;
        let c2 = ctx.input_value(b, ty)?;
        let res = if data_type == "RGBA" {
            let blend_type = ctx.prop_str("blend_type").unwrap_or("MIX");
            mix_colors(ctx, blend_type, fac, c1, c2)?
        } else {
            ctx.blend(fac, c1, c2)?
        };
        let res = if ctx.prop_bool("clamp_result") {
            ctx.clamp(res, 0.0, 1.0)?
        } else {
            res
        };
        Ok(Some(res))
    }
}

pub struct ShaderNodeInvert;

impl NodeExporter for ShaderNodeInvert {
    fn export(&self, ctx: &mut NodeContext<'_, '_>) -> Result<Option<Value>, CompileError> {
        let ty = ctx.out_type().data_or(MxType::Color3);
        let fac = ctx.input_value("Fac", MxType::Float)?;
        let color = ctx.input_value("Color", ty)?;
        let inverted = ctx.sub(1.0, &color)?;
        Ok(Some(ctx.blend(fac, color, inverted)?))
    }
}
