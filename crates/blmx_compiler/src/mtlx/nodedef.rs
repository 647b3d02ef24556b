//! Input signatures of the MaterialX nodes the compiler emits.

use super::MxType;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputType {
    Fixed(MxType),
    /// Same as the node's output type.
    Output,
    /// Typed by whatever is bound to it.
    Operand,
}

#[derive(Debug)]
pub struct NodeDef {
    pub category: &'static str,
    pub inputs: &'static [(&'static str, InputType)],
}

impl NodeDef {
    pub fn input(&self, name: &str) -> Option<InputType> {
        self.inputs
            .iter()
            .find(|(input, _)| *input == name)
            .map(|(_, ty)| *ty)
    }
}

use InputType::*;
use MxType::*;

const BINARY: &[(&str, InputType)] = &[("in1", Output), ("in2", Output)];
const UNARY: &[(&str, InputType)] = &[("in", Output)];
const COMPARE: &[(&str, InputType)] = &[
    ("value1", Fixed(Float)),
    ("value2", Fixed(Float)),
    ("in1", Output),
    ("in2", Output),
];

static NODEDEFS: &[NodeDef] = &[
    NodeDef { category: "add", inputs: BINARY },
    NodeDef { category: "subtract", inputs: BINARY },
    NodeDef { category: "multiply", inputs: BINARY },
    NodeDef { category: "divide", inputs: BINARY },
    NodeDef { category: "modulo", inputs: BINARY },
    NodeDef { category: "power", inputs: BINARY },
    NodeDef { category: "min", inputs: BINARY },
    NodeDef { category: "max", inputs: BINARY },
    NodeDef { category: "absval", inputs: UNARY },
    NodeDef { category: "floor", inputs: UNARY },
    NodeDef { category: "sin", inputs: UNARY },
    NodeDef { category: "cos", inputs: UNARY },
    NodeDef { category: "tan", inputs: UNARY },
    NodeDef { category: "asin", inputs: UNARY },
    NodeDef { category: "acos", inputs: UNARY },
    NodeDef { category: "ln", inputs: UNARY },
    NodeDef {
        category: "atan2",
        inputs: &[("iny", Output), ("inx", Output)],
    },
    NodeDef {
        category: "dotproduct",
        inputs: &[("in1", Operand), ("in2", Operand)],
    },
    NodeDef { category: "ifgreater", inputs: COMPARE },
    NodeDef { category: "ifgreatereq", inputs: COMPARE },
    NodeDef { category: "ifequal", inputs: COMPARE },
    NodeDef {
        category: "convert",
        inputs: &[("in", Operand)],
    },
    NodeDef {
        category: "extract",
        inputs: &[("in", Operand), ("index", Fixed(Integer))],
    },
    NodeDef {
        category: "combine2",
        inputs: &[("in1", Fixed(Float)), ("in2", Fixed(Float))],
    },
    NodeDef {
        category: "combine3",
        inputs: &[("in1", Fixed(Float)), ("in2", Fixed(Float)), ("in3", Fixed(Float))],
    },
    NodeDef {
        category: "combine4",
        inputs: &[
            ("in1", Fixed(Float)),
            ("in2", Fixed(Float)),
            ("in3", Fixed(Float)),
            ("in4", Fixed(Float)),
        ],
    },
    NodeDef {
        category: "mix",
        inputs: &[("fg", Output), ("bg", Output), ("mix", Fixed(Float))],
    },
    NodeDef {
        category: "texcoord",
        inputs: &[("index", Fixed(Integer))],
    },
    NodeDef {
        category: "position",
        inputs: &[("space", Fixed(String))],
    },
    NodeDef {
        category: "image",
        inputs: &[
            ("file", Fixed(Filename)),
            ("default", Output),
            ("texcoord", Fixed(Vector2)),
            ("uaddressmode", Fixed(String)),
            ("vaddressmode", Fixed(String)),
        ],
    },
    NodeDef {
        category: "fractal3d",
        inputs: &[
            ("amplitude", Output),
            ("octaves", Fixed(Integer)),
            ("lacunarity", Fixed(Float)),
            ("diminish", Fixed(Float)),
            ("position", Fixed(Vector3)),
        ],
    },
    NodeDef {
        category: "normalmap",
        inputs: &[
            ("in", Fixed(Vector3)),
            ("scale", Fixed(Float)),
            ("space", Fixed(String)),
        ],
    },
    NodeDef {
        category: "standard_surface",
        inputs: &[
            ("base", Fixed(Float)),
            ("base_color", Fixed(Color3)),
            ("diffuse_roughness", Fixed(Float)),
            ("metalness", Fixed(Float)),
            ("specular", Fixed(Float)),
            ("specular_color", Fixed(Color3)),
            ("specular_roughness", Fixed(Float)),
            ("specular_IOR", Fixed(Float)),
            ("specular_anisotropy", Fixed(Float)),
            ("specular_rotation", Fixed(Float)),
            ("transmission", Fixed(Float)),
            ("transmission_color", Fixed(Color3)),
            ("transmission_extra_roughness", Fixed(Float)),
            ("subsurface", Fixed(Float)),
            ("subsurface_color", Fixed(Color3)),
            ("subsurface_radius", Fixed(Color3)),
            ("subsurface_scale", Fixed(Float)),
            ("subsurface_anisotropy", Fixed(Float)),
            ("sheen", Fixed(Float)),
            ("sheen_color", Fixed(Color3)),
            ("sheen_roughness", Fixed(Float)),
            ("coat", Fixed(Float)),
            ("coat_color", Fixed(Color3)),
            ("coat_roughness", Fixed(Float)),
            ("coat_IOR", Fixed(Float)),
            ("coat_anisotropy", Fixed(Float)),
            ("coat_rotation", Fixed(Float)),
            ("coat_normal", Fixed(Vector3)),
            ("emission", Fixed(Float)),
            ("emission_color", Fixed(Color3)),
            ("opacity", Fixed(Color3)),
            ("normal", Fixed(Vector3)),
            ("tangent", Fixed(Vector3)),
        ],
    },
    NodeDef {
        category: "diffuse_brdf",
        inputs: &[
            ("weight", Fixed(Float)),
            ("color", Fixed(Color3)),
            ("roughness", Fixed(Float)),
            ("normal", Fixed(Vector3)),
        ],
    },
    NodeDef {
        category: "dielectric_bsdf",
        inputs: &[
            ("weight", Fixed(Float)),
            ("tint", Fixed(Color3)),
            ("ior", Fixed(Float)),
            ("roughness", Fixed(Vector2)),
            ("normal", Fixed(Vector3)),
            ("scatter_mode", Fixed(String)),
        ],
    },
    NodeDef {
        category: "uniform_edf",
        inputs: &[("color", Fixed(Color3))],
    },
    NodeDef {
        category: "surface",
        inputs: &[
            ("bsdf", Fixed(Bsdf)),
            ("edf", Fixed(Edf)),
            ("opacity", Fixed(Float)),
        ],
    },
    NodeDef {
        category: "displacement",
        inputs: &[("displacement", Fixed(Vector3)), ("scale", Fixed(Float))],
    },
    NodeDef {
        category: "surfacematerial",
        inputs: &[
            ("surfaceshader", Fixed(SurfaceShader)),
            ("displacementshader", Fixed(DisplacementShader)),
        ],
    },
];

pub fn nodedef(category: &str) -> Option<&'static NodeDef> {
    NODEDEFS.iter().find(|def| def.category == category)
}
