use crate::compiler::NodeContext;
use crate::error::CompileError;
use crate::mtlx::MxType;
use crate::value::Value;

use super::NodeExporter;

const DEFAULT_SPACE: &str = "OBJECT";

pub struct ShaderNodeNormalMap;

impl NodeExporter for ShaderNodeNormalMap {
    fn export(&self, ctx: &mut NodeContext<'_, '_>) -> Result<Option<Value>, CompileError> {
        let color = ctx.input_value("Color", MxType::Vector3)?;
        let strength = ctx.input_value("Strength", MxType::Float)?;
        let space = match ctx.prop_str("space").unwrap_or("TANGENT") {
            space @ ("TANGENT" | "OBJECT") => space,
            other => {
                ctx.warn(format!(
                    "normal map space `{}` is not supported, using {}",
                    other, DEFAULT_SPACE
                ));
                DEFAULT_SPACE
            }
        };
        if space == "TANGENT" {
            ctx.warn("normal map UV map is ignored");
        }
        let result = ctx.create_node(
            "normalmap",
            MxType::Vector3,
            [
                ("in", color.into()),
                ("scale", strength.into()),
                ("space", space.to_lowercase().into()),
            ],
        )?;
        Ok(Some(Value::Node(result)))
    }
}
