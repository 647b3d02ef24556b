use crate::compiler::NodeContext;
use crate::error::CompileError;
use crate::mtlx::{MxNodeRef, MxType};
use crate::value::Value;

use super::NodeExporter;

/// Root of every material: a `surfacematerial` node.
pub struct ShaderNodeOutputMaterial;

impl ShaderNodeOutputMaterial {
    fn surface(ctx: &mut NodeContext<'_, '_>) -> Result<Option<MxNodeRef>, CompileError> {
        let shader = match ctx.input_link("Surface", MxType::SurfaceShader)? {
            Some(Value::Node(node)) => node,
            Some(other) => {
                ctx.warn(format!("Surface is linked to {}, not a shader", other));
                return Ok(None);
            }
            None => return Ok(None),
        };
        let surface = match shader.ty {
            MxType::SurfaceShader => shader,
            MxType::Bsdf => ctx.create_node("surface", MxType::SurfaceShader, [("bsdf", shader.into())])?,
            MxType::Edf => ctx.create_node("surface", MxType::SurfaceShader, [("edf", shader.into())])?,
            ty => {
                ctx.warn(format!("Surface is linked to a {} node, not a shader", ty));
                return Ok(None);
            }
        };
        Ok(Some(surface))
    }

    fn displacement(ctx: &mut NodeContext<'_, '_>) -> Result<Option<MxNodeRef>, CompileError> {
        let displacement = match ctx.input_link("Displacement", MxType::Vector3)? {
            Some(Value::Node(node)) if node.ty == MxType::DisplacementShader => return Ok(Some(node)),
            Some(Value::Node(node)) if !node.ty.is_numeric() => {
                ctx.warn(format!("Displacement is linked to a {} node", node.ty));
                return Ok(None);
            }
            Some(value) => value,
            None => return Ok(None),
        };
        let node = ctx.create_node(
            "displacement",
            MxType::DisplacementShader,
            [("displacement", displacement.into())],
        )?;
        Ok(Some(node))
    }
}

impl NodeExporter for ShaderNodeOutputMaterial {
    fn export(&self, ctx: &mut NodeContext<'_, '_>) -> Result<Option<Value>, CompileError> {
        let surface = Self::surface(ctx)?;
        let displacement = if ctx.has_input("Displacement") {
            Self::displacement(ctx)?
        } else {
            None
        };
        let material = ctx.create_node(
            "surfacematerial",
            MxType::Material,
            [
                ("surfaceshader", surface.into()),
                ("displacementshader", displacement.into()),
            ],
        )?;
        Ok(Some(Value::Node(material)))
    }
}
