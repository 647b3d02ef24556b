use std::fmt;

use blmx_common::smallvec::SmallVec;
use blmx_scenegraph::SocketValue;

use crate::mtlx::{MxNodeRef, MxType, MxValue};

pub type Tuple = SmallVec<[f32; 4]>;

/// Result of compiling a socket: a constant or a node in the document.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Scalar(f32),
    /// 2 to 4 channels.
    Tuple(Tuple),
    Node(MxNodeRef),
}

impl Value {
    /// A slice of length 1 is a scalar. Longer slices keep their first 4 channels.
    pub fn from_slice(v: &[f32]) -> Option<Value> {
        match v.len() {
            0 => None,
            1 => Some(Value::Scalar(v[0])),
            n => Some(Value::Tuple(v[..n.min(4)].iter().copied().collect())),
        }
    }
    pub fn from_socket(v: &SocketValue) -> Option<Value> {
        match v {
            SocketValue::Bool(b) => Some(Value::Scalar(if *b { 1.0 } else { 0.0 })),
            SocketValue::Float(x) => Some(Value::Scalar(*x)),
            SocketValue::Vector(v) => Value::from_slice(v),
            SocketValue::String(_) => None,
        }
    }
    pub fn is_node(&self) -> bool {
        matches!(self, Value::Node(_))
    }
    pub fn as_node(&self) -> Option<MxNodeRef> {
        match self {
            Value::Node(n) => Some(*n),
            _ => None,
        }
    }
    pub fn channels(&self) -> usize {
        match self {
            Value::Scalar(_) => 1,
            Value::Tuple(t) => t.len(),
            Value::Node(n) => n.ty.channels().unwrap_or(1),
        }
    }
    /// Node type, or the type a constant takes when nothing else decides it.
    pub fn natural_type(&self) -> MxType {
        match self {
            Value::Scalar(_) => MxType::Float,
            Value::Tuple(t) => MxType::from_channels(t.len()),
            Value::Node(n) => n.ty,
        }
    }
    /// Channel used when a constant drives a condition.
    pub fn first(&self) -> Option<f32> {
        match self {
            Value::Scalar(x) => Some(*x),
            Value::Tuple(t) => t.first().copied(),
            Value::Node(_) => None,
        }
    }
    /// Statically known to contribute nothing: zero scalar or black color.
    /// Node values are always considered enabled.
    pub fn is_disabled(&self) -> bool {
        const EPS: f32 = 1e-6;
        match self {
            Value::Scalar(x) => x.abs() < EPS,
            Value::Tuple(t) => t.iter().take(3).all(|x| x.abs() < EPS),
            Value::Node(_) => false,
        }
    }
    /// Constant reshaped to the channel count of `ty`. Scalars, nodes and
    /// non-arithmetic types are left alone.
    pub fn fit(self, ty: MxType) -> Value {
        let Some(n) = ty.channels() else {
            return self;
        };
        match self {
            Value::Tuple(t) if t.len() != n && !t.is_empty() => {
                if n == 1 {
                    let k = t.len().min(3);
                    Value::Scalar(t[..k].iter().sum::<f32>() / k as f32)
                } else {
                    Value::Tuple((0..n).map(|i| t.get(i).copied().unwrap_or(1.0)).collect())
                }
            }
            v => v,
        }
    }
    /// Constant as it has to be written into an input of type `ty`.
    ///
    /// Tuples narrowed to `float` take the mean of their color channels, shorter
    /// tuples are padded with `1.0`.
    pub fn to_mx_value(&self, ty: MxType) -> Option<MxValue> {
        let channels: Tuple = match self {
            Value::Scalar(x) => std::iter::once(*x).collect(),
            Value::Tuple(t) => t.clone(),
            Value::Node(_) => return None,
        };
        match ty {
            MxType::Float => {
                let n = channels.len().min(3);
                Some(MxValue::Float(channels[..n].iter().sum::<f32>() / n as f32))
            }
            MxType::Integer => Some(MxValue::Integer(channels[0].round() as i32)),
            MxType::Boolean => Some(MxValue::Boolean(channels[0] != 0.0)),
            ty => {
                let n = ty.channels()?;
                let v = if channels.len() == 1 {
                    std::iter::repeat(channels[0]).take(n).collect()
                } else {
                    (0..n)
                        .map(|i| channels.get(i).copied().unwrap_or(1.0))
                        .collect()
                };
                Some(MxValue::Tuple(v))
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Scalar(x) => write!(f, "{}", x),
            Value::Tuple(t) => write!(f, "{:?}", t.as_slice()),
            Value::Node(n) => write!(f, "<{} node {}:{}>", n.ty, n.graph.0, n.index),
        }
    }
}

impl From<f32> for Value {
    fn from(x: f32) -> Self {
        Value::Scalar(x)
    }
}
impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Scalar(x as f32)
    }
}
impl<const N: usize> From<[f32; N]> for Value {
    fn from(v: [f32; N]) -> Self {
        match v.as_slice() {
            [x] => Value::Scalar(*x),
            s => Value::Tuple(s.iter().copied().take(4).collect()),
        }
    }
}
impl<const N: usize> From<[f64; N]> for Value {
    fn from(v: [f64; N]) -> Self {
        match v.as_slice() {
            [x] => Value::Scalar(*x as f32),
            s => Value::Tuple(s.iter().map(|x| *x as f32).take(4).collect()),
        }
    }
}
impl From<MxNodeRef> for Value {
    fn from(n: MxNodeRef) -> Self {
        Value::Node(n)
    }
}
impl From<&Value> for Value {
    fn from(v: &Value) -> Self {
        v.clone()
    }
}

/// Element-wise `f` over two constants. `None` if either side is a node.
///
/// A scalar is repeated to the other operand's length; the shorter of two
/// tuples is padded with `1.0`.
pub fn eval_binary(a: &Value, b: &Value, f: impl Fn(f32, f32) -> f32) -> Option<Value> {
    match (a, b) {
        (Value::Scalar(x), Value::Scalar(y)) => Some(Value::Scalar(f(*x, *y))),
        (Value::Scalar(x), Value::Tuple(t)) => {
            Some(Value::Tuple(t.iter().map(|y| f(*x, *y)).collect()))
        }
        (Value::Tuple(t), Value::Scalar(y)) => {
            Some(Value::Tuple(t.iter().map(|x| f(*x, *y)).collect()))
        }
        (Value::Tuple(s), Value::Tuple(t)) => {
            let n = s.len().max(t.len());
            let at = |v: &Tuple, i: usize| v.get(i).copied().unwrap_or(1.0);
            Some(Value::Tuple((0..n).map(|i| f(at(s, i), at(t, i))).collect()))
        }
        _ => None,
    }
}

pub fn eval_unary(a: &Value, f: impl Fn(f32) -> f32) -> Option<Value> {
    match a {
        Value::Scalar(x) => Some(Value::Scalar(f(*x))),
        Value::Tuple(t) => Some(Value::Tuple(t.iter().map(|x| f(*x)).collect())),
        Value::Node(_) => None,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Power,
    Min,
    Max,
}

impl BinaryOp {
    pub fn category(self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::Subtract => "subtract",
            BinaryOp::Multiply => "multiply",
            BinaryOp::Divide => "divide",
            BinaryOp::Modulo => "modulo",
            BinaryOp::Power => "power",
            BinaryOp::Min => "min",
            BinaryOp::Max => "max",
        }
    }
    pub fn eval(self, a: f32, b: f32) -> f32 {
        match self {
            BinaryOp::Add => a + b,
            BinaryOp::Subtract => a - b,
            BinaryOp::Multiply => a * b,
            BinaryOp::Divide => {
                if b == 0.0 {
                    0.0
                } else {
                    a / b
                }
            }
            // floored: the result takes the sign of the divisor
            BinaryOp::Modulo => {
                if b == 0.0 {
                    0.0
                } else {
                    a - b * (a / b).floor()
                }
            }
            BinaryOp::Power => a.powf(b),
            BinaryOp::Min => a.min(b),
            BinaryOp::Max => a.max(b),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Abs,
    Floor,
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Ln,
}

impl UnaryOp {
    pub fn category(self) -> &'static str {
        match self {
            UnaryOp::Abs => "absval",
            UnaryOp::Floor => "floor",
            UnaryOp::Sin => "sin",
            UnaryOp::Cos => "cos",
            UnaryOp::Tan => "tan",
            UnaryOp::Asin => "asin",
            UnaryOp::Acos => "acos",
            UnaryOp::Atan => "atan2",
            UnaryOp::Ln => "ln",
        }
    }
    pub fn eval(self, x: f32) -> f32 {
        match self {
            UnaryOp::Abs => x.abs(),
            UnaryOp::Floor => x.floor(),
            UnaryOp::Sin => x.sin(),
            UnaryOp::Cos => x.cos(),
            UnaryOp::Tan => x.tan(),
            UnaryOp::Asin => x.asin(),
            UnaryOp::Acos => x.acos(),
            UnaryOp::Atan => x.atan(),
            UnaryOp::Ln => x.ln(),
        }
    }
}
