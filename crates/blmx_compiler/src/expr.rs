//! Arithmetic over [`Value`]s that folds constants and emits MaterialX nodes
//! for everything else.

use std::collections::HashMap;

use crate::error::CompileError;
use crate::mtlx::{
    nodedef, Document, GraphId, InputBinding, InputType, MxInput, MxNodeRef, MxType, MxValue,
};
use crate::value::{eval_binary, eval_unary, BinaryOp, UnaryOp, Value};

/// Something that can be bound to a node input.
#[derive(Clone, Debug, PartialEq)]
pub enum Arg {
    Value(Value),
    Str(String),
    Int(i32),
    /// Leaves the input unbound.
    Unset,
}

impl Arg {
    fn natural_type(&self) -> MxType {
        match self {
            Arg::Value(v) => v.natural_type(),
            Arg::Str(_) => MxType::String,
            Arg::Int(_) => MxType::Integer,
            Arg::Unset => MxType::Float,
        }
    }
}

impl From<Value> for Arg {
    fn from(v: Value) -> Self {
        Arg::Value(v)
    }
}
impl From<&Value> for Arg {
    fn from(v: &Value) -> Self {
        Arg::Value(v.clone())
    }
}
impl From<Option<Value>> for Arg {
    fn from(v: Option<Value>) -> Self {
        v.map_or(Arg::Unset, Arg::Value)
    }
}
impl From<Option<&Value>> for Arg {
    fn from(v: Option<&Value>) -> Self {
        v.map_or(Arg::Unset, |v| Arg::Value(v.clone()))
    }
}
impl From<MxNodeRef> for Arg {
    fn from(n: MxNodeRef) -> Self {
        Arg::Value(Value::Node(n))
    }
}
impl From<Option<MxNodeRef>> for Arg {
    fn from(n: Option<MxNodeRef>) -> Self {
        n.map_or(Arg::Unset, Arg::from)
    }
}
impl From<f32> for Arg {
    fn from(x: f32) -> Self {
        Arg::Value(Value::Scalar(x))
    }
}
impl From<f64> for Arg {
    fn from(x: f64) -> Self {
        Arg::Value(Value::from(x))
    }
}
impl<const N: usize> From<[f32; N]> for Arg {
    fn from(v: [f32; N]) -> Self {
        Arg::Value(Value::from(v))
    }
}
impl From<i32> for Arg {
    fn from(i: i32) -> Self {
        Arg::Int(i)
    }
}
impl From<&str> for Arg {
    fn from(s: &str) -> Self {
        Arg::Str(s.to_string())
    }
}
impl From<String> for Arg {
    fn from(s: String) -> Self {
        Arg::Str(s)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cond {
    Greater,
    GreaterEq,
    Equal,
    Less,
    LessEq,
    NotEqual,
}

impl Cond {
    pub fn eval(self, a: f32, b: f32) -> bool {
        match self {
            Cond::Greater => a > b,
            Cond::GreaterEq => a >= b,
            Cond::Equal => a == b,
            Cond::Less => a < b,
            Cond::LessEq => a <= b,
            Cond::NotEqual => a != b,
        }
    }
}

/// Type of the node emitted for `f(a, b)`: the first node operand's type.
///
/// A `float` node against a wider operand takes `target` when that is an
/// arithmetic type, otherwise the wider operand's type.
fn result_type(a: &Value, b: &Value, target: Option<MxType>) -> MxType {
    let (first, other) = if a.is_node() { (a, b) } else { (b, a) };
    let ty = first.natural_type();
    if ty != MxType::Float || other.channels() <= 1 {
        return ty;
    }
    match target {
        Some(target) if target.is_numeric() => target,
        _ => other.natural_type(),
    }
}

const COMBINE_INPUTS: [&str; 4] = ["in1", "in2", "in3", "in4"];

/// Writes nodes into one graph of a [`Document`].
pub struct MxBuilder<'a> {
    doc: &'a mut Document,
    graph: GraphId,
    /// Type requested from the node being exported.
    target: Option<MxType>,
    converts: HashMap<(MxNodeRef, MxType), MxNodeRef>,
    extracts: HashMap<(MxNodeRef, usize), MxNodeRef>,
}

impl<'a> MxBuilder<'a> {
    pub fn new(doc: &'a mut Document, graph: GraphId) -> Self {
        Self {
            doc,
            graph,
            target: None,
            converts: HashMap::new(),
            extracts: HashMap::new(),
        }
    }
    /// Sets the type arithmetic results should not widen past, returning the
    /// previous one.
    pub fn set_target(&mut self, target: Option<MxType>) -> Option<MxType> {
        std::mem::replace(&mut self.target, target)
    }
    pub fn target(&self) -> Option<MxType> {
        self.target
    }
    /// Constant type for `natural`, spelled as the target when both have the
    /// same channel count (`vector3` rather than `color3`).
    fn target_or(&self, natural: MxType) -> MxType {
        match self.target {
            Some(target) if target.is_numeric() && target.channels() == natural.channels() => target,
            _ => natural,
        }
    }
    pub fn document(&self) -> &Document {
        self.doc
    }
    pub fn graph(&self) -> GraphId {
        self.graph
    }
    pub fn node_name(&self, node: MxNodeRef) -> &str {
        &self.doc.node(node).name
    }

    pub fn create_node<'n>(
        &mut self,
        category: &str,
        ty: MxType,
        inputs: impl IntoIterator<Item = (&'n str, Arg)>,
    ) -> Result<MxNodeRef, CompileError> {
        if nodedef(category).is_none() {
            return Err(CompileError::UnknownNodeDef(category.to_string()));
        }
        let node = self.doc.add_node(self.graph, category, ty);
        self.set_inputs(node, inputs)?;
        Ok(node)
    }

    pub fn set_inputs<'n>(
        &mut self,
        node: MxNodeRef,
        inputs: impl IntoIterator<Item = (&'n str, Arg)>,
    ) -> Result<(), CompileError> {
        for (name, arg) in inputs {
            self.set_input(node, name, arg)?;
        }
        Ok(())
    }

    pub fn set_input(
        &mut self,
        node: MxNodeRef,
        name: &str,
        arg: impl Into<Arg>,
    ) -> Result<(), CompileError> {
        self.set_input_as(node, name, arg.into(), None)
    }

    /// `operand_ty` types inputs whose nodedef leaves the type to the bound value.
    fn set_input_as(
        &mut self,
        node: MxNodeRef,
        name: &str,
        arg: Arg,
        operand_ty: Option<MxType>,
    ) -> Result<(), CompileError> {
        let category = self.doc.node(node).category.clone();
        let def = nodedef(&category).ok_or_else(|| CompileError::UnknownNodeDef(category.clone()))?;
        let slot = def.input(name).ok_or_else(|| CompileError::UnknownInput {
            category: category.clone(),
            input: name.to_string(),
        })?;
        let ty = match slot {
            InputType::Fixed(ty) => ty,
            InputType::Output => node.ty,
            InputType::Operand => operand_ty.unwrap_or_else(|| arg.natural_type()),
        };
        let mismatch = |found: String| CompileError::TypeMismatch {
            input: format!("{}.{}", category, name),
            expected: ty,
            found,
        };
        let binding = match arg {
            Arg::Unset => return Ok(()),
            Arg::Value(Value::Node(src)) => {
                let src = if src.ty == ty {
                    src
                } else if ty == MxType::Float && src.ty.channels().map_or(false, |n| n > 1) {
                    self.extract(src, 0)?
                } else if src.ty.is_numeric() && ty.is_numeric() {
                    self.convert(src, ty)?
                } else {
                    return Err(mismatch(src.ty.to_string()));
                };
                InputBinding::Node(self.doc.node(src).name.clone())
            }
            Arg::Value(v) => match v.to_mx_value(ty) {
                Some(value) => InputBinding::Value(value),
                None => return Err(mismatch(v.to_string())),
            },
            Arg::Str(s) => match ty {
                MxType::String | MxType::Filename => InputBinding::Value(MxValue::String(s)),
                _ => return Err(mismatch(format!("string \"{}\"", s))),
            },
            Arg::Int(i) => match ty {
                MxType::Integer => InputBinding::Value(MxValue::Integer(i)),
                _ => match Value::Scalar(i as f32).to_mx_value(ty) {
                    Some(value) => InputBinding::Value(value),
                    None => return Err(mismatch(format!("integer {}", i))),
                },
            },
        };
        self.doc
            .node_mut(node)
            .inputs
            .insert(name.to_string(), MxInput { ty, binding });
        Ok(())
    }

    /// `convert` node from `src` to `ty`, shared by every input that needs it.
    pub fn convert(&mut self, src: MxNodeRef, ty: MxType) -> Result<MxNodeRef, CompileError> {
        if let Some(node) = self.converts.get(&(src, ty)) {
            return Ok(*node);
        }
        let node = self.doc.add_node(self.graph, "convert", ty);
        self.set_input_as(node, "in", src.into(), Some(src.ty))?;
        self.converts.insert((src, ty), node);
        Ok(node)
    }

    /// `float` node holding channel `index` of `src`, shared like [`convert`](Self::convert).
    pub fn extract(&mut self, src: MxNodeRef, index: usize) -> Result<MxNodeRef, CompileError> {
        if let Some(node) = self.extracts.get(&(src, index)) {
            return Ok(*node);
        }
        let node = self.doc.add_node(self.graph, "extract", MxType::Float);
        self.set_input_as(node, "in", src.into(), Some(src.ty))?;
        self.set_input(node, "index", Arg::Int(index as i32))?;
        self.extracts.insert((src, index), node);
        Ok(node)
    }

    /// Channel `index` of `v` as a float. Scalars and float nodes are their own
    /// channels, missing channels read as `1.0`.
    pub fn channel(&mut self, v: &Value, index: usize) -> Result<Value, CompileError> {
        Ok(match v {
            Value::Scalar(_) => v.clone(),
            Value::Tuple(t) => Value::Scalar(t.get(index).copied().unwrap_or(1.0)),
            Value::Node(n) => match n.ty.channels() {
                Some(c) if c > 1 && index < c => Value::Node(self.extract(*n, index)?),
                Some(c) if c > 1 => Value::Scalar(1.0),
                _ => v.clone(),
            },
        })
    }

    /// `combine2`, `combine3` or `combine4` node of type `ty` from one float per channel.
    pub fn combine(&mut self, ty: MxType, channels: Vec<Value>) -> Result<Value, CompileError> {
        let category = match channels.len() {
            2 => "combine2",
            3 => "combine3",
            4 => "combine4",
            _ => return Err(CompileError::UnknownNodeDef(format!("combine{}", channels.len()))),
        };
        let inputs = COMBINE_INPUTS.into_iter().zip(channels.into_iter().map(Arg::from));
        Ok(Value::Node(self.create_node(category, ty, inputs)?))
    }

    pub fn binary(
        &mut self,
        op: BinaryOp,
        a: impl Into<Value>,
        b: impl Into<Value>,
    ) -> Result<Value, CompileError> {
        let (a, b) = (a.into(), b.into());
        if let Some(v) = eval_binary(&a, &b, |x, y| op.eval(x, y)) {
            return Ok(v);
        }
        let ty = result_type(&a, &b, self.target);
        let node = self.create_node(op.category(), ty, [("in1", a.into()), ("in2", b.into())])?;
        Ok(Value::Node(node))
    }

    pub fn unary(&mut self, op: UnaryOp, a: impl Into<Value>) -> Result<Value, CompileError> {
        let a = a.into();
        if let Some(v) = eval_unary(&a, |x| op.eval(x)) {
            return Ok(v);
        }
        let ty = a.natural_type();
        let node = match op {
            UnaryOp::Atan => {
                self.create_node(op.category(), ty, [("iny", a.into()), ("inx", Arg::from(1.0f32))])?
            }
            _ => self.create_node(op.category(), ty, [("in", a.into())])?,
        };
        Ok(Value::Node(node))
    }

    pub fn add(&mut self, a: impl Into<Value>, b: impl Into<Value>) -> Result<Value, CompileError> {
        self.binary(BinaryOp::Add, a, b)
    }
    pub fn sub(&mut self, a: impl Into<Value>, b: impl Into<Value>) -> Result<Value, CompileError> {
        self.binary(BinaryOp::Subtract, a, b)
    }
    pub fn mul(&mut self, a: impl Into<Value>, b: impl Into<Value>) -> Result<Value, CompileError> {
        self.binary(BinaryOp::Multiply, a, b)
    }
    pub fn div(&mut self, a: impl Into<Value>, b: impl Into<Value>) -> Result<Value, CompileError> {
        self.binary(BinaryOp::Divide, a, b)
    }
    pub fn modulo(
        &mut self,
        a: impl Into<Value>,
        b: impl Into<Value>,
    ) -> Result<Value, CompileError> {
        self.binary(BinaryOp::Modulo, a, b)
    }
    pub fn pow(&mut self, a: impl Into<Value>, b: impl Into<Value>) -> Result<Value, CompileError> {
        self.binary(BinaryOp::Power, a, b)
    }
    pub fn min(&mut self, a: impl Into<Value>, b: impl Into<Value>) -> Result<Value, CompileError> {
        self.binary(BinaryOp::Min, a, b)
    }
    pub fn max(&mut self, a: impl Into<Value>, b: impl Into<Value>) -> Result<Value, CompileError> {
        self.binary(BinaryOp::Max, a, b)
    }
    pub fn neg(&mut self, a: impl Into<Value>) -> Result<Value, CompileError> {
        self.binary(BinaryOp::Subtract, 0.0, a)
    }
    pub fn abs(&mut self, a: impl Into<Value>) -> Result<Value, CompileError> {
        self.unary(UnaryOp::Abs, a)
    }
    pub fn floor(&mut self, a: impl Into<Value>) -> Result<Value, CompileError> {
        self.unary(UnaryOp::Floor, a)
    }

    /// `x == floor(x) ? x : floor(x) + 1`
    pub fn ceil(&mut self, a: impl Into<Value>) -> Result<Value, CompileError> {
        let a = a.into();
        let f = self.floor(&a)?;
        let f1 = self.add(&f, 1.0)?;
        self.if_else(Cond::Equal, &a, &f, &a, f1)
    }

    /// `x - floor(x)`
    pub fn fract(&mut self, a: impl Into<Value>) -> Result<Value, CompileError> {
        let a = a.into();
        let f = self.floor(&a)?;
        self.sub(a, f)
    }

    /// `x % 1 < 0.5 ? floor(x) : floor(x) + 1`
    pub fn round(&mut self, a: impl Into<Value>) -> Result<Value, CompileError> {
        let a = a.into();
        let frac = self.modulo(&a, 1.0)?;
        let f = self.floor(&a)?;
        let f1 = self.add(&f, 1.0)?;
        self.if_else(Cond::Less, frac, 0.5, f, f1)
    }

    /// Sum of the element-wise product; a `dotproduct` node for node operands.
    pub fn dot(&mut self, a: impl Into<Value>, b: impl Into<Value>) -> Result<Value, CompileError> {
        let (a, b) = (a.into(), b.into());
        if let Some(product) = eval_binary(&a, &b, |x, y| x * y) {
            return Ok(match product {
                Value::Tuple(t) => Value::Scalar(t.iter().sum()),
                v => v,
            });
        }
        let operand_ty = result_type(&a, &b, None);
        let node = self.doc.add_node(self.graph, "dotproduct", MxType::Float);
        self.set_input_as(node, "in1", a.into(), Some(operand_ty))?;
        self.set_input_as(node, "in2", b.into(), Some(operand_ty))?;
        Ok(Value::Node(node))
    }

    /// `min(max(x, lo), hi)`
    pub fn clamp(
        &mut self,
        a: impl Into<Value>,
        lo: impl Into<Value>,
        hi: impl Into<Value>,
    ) -> Result<Value, CompileError> {
        let v = self.min(a, hi)?;
        self.max(v, lo)
    }

    /// `fac * hi + (1 - fac) * lo`, unclamped.
    pub fn blend(
        &mut self,
        fac: impl Into<Value>,
        lo: impl Into<Value>,
        hi: impl Into<Value>,
    ) -> Result<Value, CompileError> {
        let fac = fac.into();
        let a = self.mul(&fac, hi)?;
        let inv = self.sub(1.0, &fac)?;
        let b = self.mul(inv, lo)?;
        self.add(a, b)
    }

    /// `a <cond> b ? if_value : else_value`
    ///
    /// Folds to one of the two values when `a` and `b` are constants (tuples
    /// compare by their first channel). Otherwise emits an `ifgreater`,
    /// `ifgreatereq` or `ifequal` node, whose compared inputs are floats: a
    /// multi-channel comparison with a multi-channel result is done per channel
    /// and recombined.
    pub fn if_else(
        &mut self,
        cond: Cond,
        a: impl Into<Value>,
        b: impl Into<Value>,
        if_value: impl Into<Value>,
        else_value: impl Into<Value>,
    ) -> Result<Value, CompileError> {
        let (a, b) = (a.into(), b.into());
        let (if_value, else_value) = (if_value.into(), else_value.into());
        if let (Some(x), Some(y)) = (a.first(), b.first()) {
            return Ok(if cond.eval(x, y) { if_value } else { else_value });
        }
        let (cond, a, b, if_value, else_value) = match cond {
            Cond::Less => (Cond::Greater, b, a, if_value, else_value),
            Cond::LessEq => (Cond::GreaterEq, b, a, if_value, else_value),
            Cond::NotEqual => (Cond::Equal, a, b, else_value, if_value),
            cond => (cond, a, b, if_value, else_value),
        };
        let out_ty = if if_value.is_node() || else_value.is_node() {
            result_type(&if_value, &else_value, self.target)
        } else {
            self.target_or(MxType::from_channels(
                if_value.channels().max(else_value.channels()),
            ))
        };
        let lanes = match out_ty.channels() {
            Some(n) if a.channels().max(b.channels()) > 1 => n,
            _ => 1,
        };
        if lanes == 1 {
            let (v1, v2) = (self.channel(&a, 0)?, self.channel(&b, 0)?);
            return self.compare(cond, out_ty, v1, v2, if_value, else_value);
        }
        let mut channels = Vec::with_capacity(lanes);
        for i in 0..lanes {
            let (v1, v2) = (self.channel(&a, i)?, self.channel(&b, i)?);
            let (t, e) = (self.channel(&if_value, i)?, self.channel(&else_value, i)?);
            channels.push(self.compare(cond, MxType::Float, v1, v2, t, e)?);
        }
        self.combine(out_ty, channels)
    }

    /// One `if*` node over float operands, folded when both are constants.
    fn compare(
        &mut self,
        cond: Cond,
        ty: MxType,
        value1: Value,
        value2: Value,
        if_value: Value,
        else_value: Value,
    ) -> Result<Value, CompileError> {
        if let (Some(x), Some(y)) = (value1.first(), value2.first()) {
            return Ok(if cond.eval(x, y) { if_value } else { else_value });
        }
        let category = match cond {
            Cond::Greater => "ifgreater",
            Cond::GreaterEq => "ifgreatereq",
            _ => "ifequal",
        };
        let node = self.doc.add_node(self.graph, category, ty);
        self.set_input(node, "value1", value1)?;
        self.set_input(node, "value2", value2)?;
        self.set_input(node, "in1", if_value)?;
        self.set_input(node, "in2", else_value)?;
        Ok(Value::Node(node))
    }
}
