use crate::compiler::NodeContext;
use crate::error::CompileError;
use crate::expr::Arg;
use crate::mtlx::{MxNodeRef, MxType};
use crate::value::Value;

use super::NodeExporter;

/// First of `names` the node has a socket for. Blender renamed several
/// Principled inputs in 4.0, both spellings are accepted.
fn socket_name<'k>(ctx: &NodeContext<'_, '_>, names: &[&'k str]) -> &'k str {
    names
        .iter()
        .copied()
        .find(|name| ctx.has_input(*name))
        .unwrap_or(names[0])
}

fn enabled(value: &Value) -> bool {
    !value.is_disabled()
}

/// Value of a shader socket, `None` if it is not linked to a shader.
fn shader_input<'k>(
    ctx: &mut NodeContext<'_, '_>,
    key: impl Into<blmx_scenegraph::SocketKey<'k>>,
) -> Result<Option<MxNodeRef>, CompileError> {
    let ty = if ctx.out_type().is_shader() {
        ctx.out_type()
    } else {
        MxType::SurfaceShader
    };
    let key = key.into();
    match ctx.input_link(key, ty)? {
        Some(Value::Node(node)) if node.ty.is_shader() => Ok(Some(node)),
        Some(v) => {
            ctx.warn(format!("input {} is linked to {}, not a shader", key, v));
            Ok(None)
        }
        None => Ok(None),
    }
}

pub struct ShaderNodeBsdfPrincipled;

impl NodeExporter for ShaderNodeBsdfPrincipled {
    fn export(&self, ctx: &mut NodeContext<'_, '_>) -> Result<Option<Value>, CompileError> {
        use MxType::*;

        let base_color = ctx.input_value("Base Color", Color3)?;

        let name = socket_name(ctx, &["Subsurface", "Subsurface Weight"]);
        let subsurface = ctx.input_value(name, Float)?;
        let (subsurface_radius, subsurface_color) = if enabled(&subsurface) {
            let radius = ctx.input_value("Subsurface Radius", Color3)?;
            let color = if ctx.has_input("Subsurface Color") {
                ctx.input_value("Subsurface Color", Color3)?
            } else {
                base_color.clone()
            };
            (Some(radius), Some(color))
        } else {
            (None, None)
        };

        let metallic = ctx.input_value("Metallic", Float)?;
        let name = socket_name(ctx, &["Specular", "Specular IOR Level"]);
        let specular = ctx.input_value(name, Float)?;
        let roughness = ctx.input_value("Roughness", Float)?;

        let (anisotropic, anisotropic_rotation) = if enabled(&metallic) {
            let anisotropic = ctx.input_value("Anisotropic", Float)?;
            let rotation = if enabled(&anisotropic) {
                Some(ctx.input_value("Anisotropic Rotation", Float)?)
            } else {
                None
            };
            (Some(anisotropic), rotation)
        } else {
            (None, None)
        };

        let name = socket_name(ctx, &["Sheen", "Sheen Weight"]);
        let sheen = ctx.input_value(name, Float)?;

        let name = socket_name(ctx, &["Clearcoat", "Coat Weight"]);
        let clearcoat = ctx.input_value(name, Float)?;
        let clearcoat_roughness = if enabled(&clearcoat) {
            let name = socket_name(ctx, &["Clearcoat Roughness", "Coat Roughness"]);
            Some(ctx.input_value(name, Float)?)
        } else {
            None
        };

        let ior = ctx.input_value("IOR", Float)?;

        let name = socket_name(ctx, &["Transmission", "Transmission Weight"]);
        let transmission = ctx.input_value(name, Float)?;
        let transmission_roughness = if enabled(&transmission) && ctx.has_input("Transmission Roughness") {
            Some(ctx.input_value("Transmission Roughness", Float)?)
        } else {
            None
        };

        let name = socket_name(ctx, &["Emission", "Emission Color"]);
        let emission = ctx.input_value(name, Color3)?;
        let emission_strength = if ctx.has_input("Emission Strength") {
            ctx.input_value("Emission Strength", Float)?
        } else {
            Value::Scalar(1.0)
        };

        let alpha = ctx.input_value("Alpha", Float)?;

        let normal = ctx.input_link("Normal", Vector3)?;
        let name = socket_name(ctx, &["Clearcoat Normal", "Coat Normal"]);
        let clearcoat_normal = ctx.input_link(name, Vector3)?;
        let tangent = ctx.input_link("Tangent", Vector3)?;

        let result = ctx.create_node(
            "standard_surface",
            SurfaceShader,
            [
                ("base", Arg::from(1.0f32)),
                ("base_color", (&base_color).into()),
                ("diffuse_roughness", (&roughness).into()),
                ("normal", normal.into()),
                ("tangent", tangent.into()),
            ],
        )?;

        if alpha.first() != Some(1.0) {
            ctx.set_input(result, "opacity", &alpha)?;
        }

        if enabled(&metallic) {
            ctx.set_input(result, "metalness", &metallic)?;
        }

        if enabled(&specular) {
            ctx.set_inputs(
                result,
                [
                    ("specular", (&specular).into()),
                    ("specular_color", (&base_color).into()),
                    ("specular_roughness", (&roughness).into()),
                    ("specular_IOR", (&ior).into()),
                    ("specular_anisotropy", anisotropic.as_ref().into()),
                    ("specular_rotation", anisotropic_rotation.as_ref().into()),
                ],
            )?;
        }

        if enabled(&transmission) {
            ctx.set_inputs(
                result,
                [
                    ("transmission", (&transmission).into()),
                    ("transmission_color", (&base_color).into()),
                    ("transmission_extra_roughness", transmission_roughness.into()),
                ],
            )?;
        }

        if enabled(&subsurface) {
            ctx.set_inputs(
                result,
                [
                    ("subsurface", (&subsurface).into()),
                    ("subsurface_color", subsurface_color.into()),
                    ("subsurface_radius", subsurface_radius.into()),
                    ("subsurface_anisotropy", anisotropic.as_ref().into()),
                ],
            )?;
        }

        if enabled(&sheen) {
            ctx.set_inputs(
                result,
                [
                    ("sheen", (&sheen).into()),
                    ("sheen_color", (&base_color).into()),
                    ("sheen_roughness", (&roughness).into()),
                ],
            )?;
        }

        if enabled(&clearcoat) {
            ctx.set_inputs(
                result,
                [
                    ("coat", (&clearcoat).into()),
                    ("coat_color", (&base_color).into()),
                    ("coat_roughness", clearcoat_roughness.into()),
                    ("coat_IOR", (&ior).into()),
                    ("coat_anisotropy", anisotropic.as_ref().into()),
                    ("coat_rotation", anisotropic_rotation.as_ref().into()),
                    ("coat_normal", clearcoat_normal.into()),
                ],
            )?;
        }

        if enabled(&emission) && enabled(&emission_strength) {
            ctx.set_inputs(
                result,
                [
                    ("emission", emission_strength.into()),
                    ("emission_color", emission.into()),
                ],
            )?;
        }

        Ok(Some(Value::Node(result)))
    }
}

pub struct ShaderNodeBsdfDiffuse;

impl NodeExporter for ShaderNodeBsdfDiffuse {
    fn export(&self, ctx: &mut NodeContext<'_, '_>) -> Result<Option<Value>, CompileError> {
        let color = ctx.input_value("Color", MxType::Color3)?;
        let roughness = ctx.input_value("Roughness", MxType::Float)?;
        let normal = ctx.input_link("Normal", MxType::Vector3)?;
        let result = ctx.create_node(
            "diffuse_brdf",
            MxType::Bsdf,
            [
                ("color", color.into()),
                ("roughness", roughness.into()),
                ("normal", normal.into()),
            ],
        )?;
        Ok(Some(Value::Node(result)))
    }
}

pub struct ShaderNodeBsdfGlass;

impl NodeExporter for ShaderNodeBsdfGlass {
    fn export(&self, ctx: &mut NodeContext<'_, '_>) -> Result<Option<Value>, CompileError> {
        let color = ctx.input_value("Color", MxType::Color3)?;
        let roughness = ctx.input_value("Roughness", MxType::Float)?;
        let ior = ctx.input_value("IOR", MxType::Float)?;
        let normal = ctx.input_link("Normal", MxType::Vector3)?;
        let result = ctx.create_node(
            "dielectric_bsdf",
            MxType::Bsdf,
            [
                ("tint", color.into()),
                ("ior", ior.into()),
                ("roughness", roughness.into()),
                ("normal", normal.into()),
                ("scatter_mode", "RT".into()),
            ],
        )?;
        Ok(Some(Value::Node(result)))
    }
}

pub struct ShaderNodeEmission;

impl NodeExporter for ShaderNodeEmission {
    fn export(&self, ctx: &mut NodeContext<'_, '_>) -> Result<Option<Value>, CompileError> {
        let color = ctx.input_value("Color", MxType::Color3)?;
        let strength = ctx.input_value("Strength", MxType::Float)?;
        if !enabled(&color) || !enabled(&strength) {
            return Ok(None);
        }
        let radiance = ctx.mul(color, strength)?;
        let result = ctx.create_node("uniform_edf", MxType::Edf, [("color", radiance.into())])?;
        Ok(Some(Value::Node(result)))
    }
}

pub struct ShaderNodeMixShader;

impl NodeExporter for ShaderNodeMixShader {
    fn export(&self, ctx: &mut NodeContext<'_, '_>) -> Result<Option<Value>, CompileError> {
        let factor = ctx.input_value(0usize, MxType::Float)?;
        let shader1 = shader_input(ctx, 1usize)?;
        let shader2 = shader_input(ctx, 2usize)?;
        let (a, b) = match (shader1, shader2) {
            (None, None) => return Ok(None),
            (Some(s), None) | (None, Some(s)) => return Ok(Some(Value::Node(s))),
            (Some(a), Some(b)) if a.ty != b.ty => {
                ctx.warn(format!("cannot mix {} with {}, using the first shader", a.ty, b.ty));
                return Ok(Some(Value::Node(a)));
            }
            (Some(a), Some(b)) => (a, b),
        };
        // mix = fg * mix + bg * (1 - mix), Blender's factor 0 selects the first shader
        let result = ctx.create_node(
            "mix",
            a.ty,
            [("fg", b.into()), ("bg", a.into()), ("mix", factor.into())],
        )?;
        Ok(Some(Value::Node(result)))
    }
}

pub struct ShaderNodeAddShader;

impl NodeExporter for ShaderNodeAddShader {
    fn export(&self, ctx: &mut NodeContext<'_, '_>) -> Result<Option<Value>, CompileError> {
        let shader1 = shader_input(ctx, 0usize)?;
        let shader2 = shader_input(ctx, 1usize)?;
        let (a, b) = match (shader1, shader2) {
            (None, None) => return Ok(None),
            (Some(s), None) | (None, Some(s)) => return Ok(Some(Value::Node(s))),
            (Some(a), Some(b)) if a.ty != b.ty => {
                ctx.warn(format!("cannot add {} to {}, using the first shader", b.ty, a.ty));
                return Ok(Some(Value::Node(a)));
            }
            (Some(a), Some(b)) => (a, b),
        };
        let result = ctx.create_node("add", a.ty, [("in1", a.into()), ("in2", b.into())])?;
        Ok(Some(Value::Node(result)))
    }
}
