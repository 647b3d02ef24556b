use std::fmt;

use serde::{Deserialize, Serialize};

use crate::mtlx::MxType;

/// Broken invariants of the compiler itself. Problems with the user's node tree
/// are reported as [`Diagnostic`]s instead.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("no nodedef for category `{0}`")]
    UnknownNodeDef(String),

    #[error("`{category}` has no input `{input}`")]
    UnknownInput { category: String, input: String },

    #[error("cannot bind {found} to input `{input}` of type {expected}")]
    TypeMismatch {
        input: String,
        expected: MxType,
        found: String,
    },

    #[error("`{0}` was compiled twice in one pass")]
    CacheCollision(String),

    #[error("group stack `{0}` does not resolve to a node tree")]
    BadGroupStack(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Warning,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub level: Level,
    /// Node path inside the material, group nodes separated by `/`.
    pub node: Option<String>,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.node {
            Some(node) => write!(f, "[{}] {}", node, self.message),
            None => f.write_str(&self.message),
        }
    }
}
