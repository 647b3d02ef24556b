use crate::compiler::NodeContext;
use crate::error::CompileError;
use crate::expr::Arg;
use crate::mtlx::MxType;
use crate::value::Value;

use super::NodeExporter;

/// Cycles shows broken textures in magenta.
const TEXTURE_ERROR_COLOR: [f32; 3] = [1.0, 0.0, 1.0];

fn address_mode(extension: &str) -> Option<&'static str> {
    match extension {
        "REPEAT" => Some("periodic"),
        "EXTEND" => Some("clamp"),
        "CLIP" => Some("constant"),
        "MIRROR" => Some("mirror"),
        _ => None,
    }
}

pub struct ShaderNodeTexImage;

impl NodeExporter for ShaderNodeTexImage {
    fn export(&self, ctx: &mut NodeContext<'_, '_>) -> Result<Option<Value>, CompileError> {
        let alpha = ctx.output() == "Alpha";
        let error_color = if alpha {
            Value::Scalar(1.0)
        } else {
            Value::from(TEXTURE_ERROR_COLOR)
        };
        let Some(image) = ctx.node().image.as_ref() else {
            ctx.warn("image texture has no image");
            return Ok(Some(error_color));
        };
        let path = match ctx.images().resolve(image) {
            Ok(path) => path,
            Err(err) => {
                ctx.warn(err.to_string());
                return Ok(Some(error_color));
            }
        };

        let uv = match ctx.input_link("Vector", MxType::Vector2)? {
            Some(uv) => uv,
            None => Value::Node(ctx.create_node("texcoord", MxType::Vector2, [])?),
        };
        // alpha is channel 3 of an rgba lookup
        let ty = if alpha {
            MxType::Color4
        } else {
            ctx.out_type().data_or(MxType::Color3)
        };
        let result = ctx.create_node(
            "image",
            ty,
            [
                ("file", Arg::from(path.to_string_lossy().into_owned())),
                ("texcoord", uv.into()),
            ],
        )?;

        if let Some(extension) = ctx.prop_str("extension") {
            match address_mode(extension) {
                Some(mode) => ctx.set_inputs(
                    result,
                    [("uaddressmode", mode.into()), ("vaddressmode", mode.into())],
                )?,
                None => ctx.warn(format!("image extension `{}` is not supported", extension)),
            }
        }
        if alpha {
            return Ok(Some(Value::Node(ctx.extract(result, 3)?)));
        }
        Ok(Some(Value::Node(result)))
    }
}

pub struct ShaderNodeTexNoise;

impl NodeExporter for ShaderNodeTexNoise {
    fn export(&self, ctx: &mut NodeContext<'_, '_>) -> Result<Option<Value>, CompileError> {
        let position = match ctx.input_link("Vector", MxType::Vector3)? {
            Some(position) => position,
            None => Value::Node(ctx.create_node(
                "position",
                MxType::Vector3,
                [("space", "object".into())],
            )?),
        };
        let scale = ctx.input_value("Scale", MxType::Float)?;
        let position = ctx.mul(position, scale)?;

        let detail = ctx.input_value("Detail", MxType::Float)?;
        let detail = match detail.first() {
            Some(detail) => detail,
            None => {
                ctx.warn("linked Detail is not supported, using 2");
                2.0
            }
        };
        let octaves = (detail.floor() as i32 + 1).max(1);
        let diminish = ctx.input_value("Roughness", MxType::Float)?;
        let lacunarity = if ctx.has_input("Lacunarity") {
            ctx.input_value("Lacunarity", MxType::Float)?
        } else {
            Value::Scalar(2.0)
        };

        let ty = ctx.out_type().data_or(MxType::Float);
        let result = ctx.create_node(
            "fractal3d",
            ty,
            [
                ("amplitude", Arg::from(1.0f32)),
                ("octaves", octaves.into()),
                ("lacunarity", lacunarity.into()),
                ("diminish", diminish.into()),
                ("position", position.into()),
            ],
        )?;
        Ok(Some(Value::Node(result)))
    }
}
