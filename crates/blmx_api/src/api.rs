use std::cell::RefCell;

use blmx_common::log;
use blmx_common::Config;
use blmx_compiler::{CompileError, CompilerDriver, Diagnostic};
use blmx_scenegraph::ShaderNodeTree;
use serde::{Deserialize, Serialize};

#[derive(Clone, Serialize, Deserialize, Debug)]
pub enum Api {
    Init {
        name: String,
        #[serde(default)]
        config: Option<Config>,
    },
    Finalize,
    CompileMaterial {
        name: String,
        tree: ShaderNodeTree,
    },
    ToMtlx,
    WriteDocument {
        path: String,
    },
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub enum ApiResult {
    None,
    Material {
        name: String,
        /// Name of the `surfacematerial` node.
        node: Option<String>,
        diagnostics: Vec<Diagnostic>,
    },
    Mtlx {
        xml: String,
    },
    Error {
        message: String,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("no session, call Init first")]
    NoSession,
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error("failed to write `{path}`: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },
}

/// Materials of one export.
pub struct Session {
    name: String,
    driver: CompilerDriver,
}

thread_local! {
    static SESSION: RefCell<Option<Session>> = RefCell::new(None);
}

fn with_session<T>(f: impl FnOnce(&mut Session) -> Result<T, ApiError>) -> Result<T, ApiError> {
    SESSION.with(|session| {
        let mut session = session.borrow_mut();
        let session = session.as_mut().ok_or(ApiError::NoSession)?;
        f(session)
    })
}

pub fn call(api: Api) -> Result<ApiResult, ApiError> {
    match api {
        Api::Init { name, config } => {
            let config = config.unwrap_or_default();
            log::info!("session `{}` started", name);
            SESSION.with(|session| {
                *session.borrow_mut() = Some(Session {
                    name,
                    driver: CompilerDriver::new(&config),
                });
            });
            Ok(ApiResult::None)
        }
        Api::Finalize => {
            SESSION.with(|session| {
                if let Some(session) = session.borrow_mut().take() {
                    log::info!(
                        "session `{}` finished with {} materials",
                        session.name,
                        session.driver.material_count()
                    );
                }
            });
            Ok(ApiResult::None)
        }
        Api::CompileMaterial { name, tree } => with_session(|session| {
            let material = session.driver.compile(&name, &tree)?.clone();
            let node = material
                .material
                .map(|node| session.driver.document().node(node).name.clone());
            Ok(ApiResult::Material {
                name: material.name,
                node,
                diagnostics: material.diagnostics,
            })
        }),
        Api::ToMtlx => with_session(|session| {
            Ok(ApiResult::Mtlx {
                xml: session.driver.document().to_mtlx(),
            })
        }),
        Api::WriteDocument { path } => with_session(|session| {
            session
                .driver
                .document()
                .write_mtlx(&path)
                .map_err(|source| ApiError::Write {
                    path: path.clone(),
                    source,
                })?;
            log::info!("wrote {}", path);
            Ok(ApiResult::None)
        }),
    }
}

/// Like [`call`], with errors folded into [`ApiResult::Error`].
pub fn dispatch(api: Api) -> ApiResult {
    call(api).unwrap_or_else(|err| {
        log::error!("{}", err);
        ApiResult::Error {
            message: err.to_string(),
        }
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use blmx_scenegraph::{ShaderNode, NODE_OUTPUT_MATERIAL};

    fn diffuse_tree() -> ShaderNodeTree {
        let mut tree = ShaderNodeTree::new("Material");
        let bsdf = tree.add_node(
            "Diffuse BSDF",
            ShaderNode::new("ShaderNodeBsdfDiffuse")
                .with_input("Color", [0.8f32, 0.8, 0.8, 1.0])
                .with_input("Roughness", 0.0f32)
                .with_link_input("Normal")
                .with_output("BSDF"),
        );
        let output = tree.add_node(
            "Material Output",
            ShaderNode::new(NODE_OUTPUT_MATERIAL)
                .with_link_input("Surface")
                .with_link_input("Displacement"),
        );
        assert!(tree.link(&bsdf, "BSDF", &output, "Surface"));
        tree
    }

    #[test]
    fn test_requires_session() {
        let result = dispatch(Api::ToMtlx);
        assert!(matches!(result, ApiResult::Error { .. }));
    }

    #[test]
    fn test_session() {
        let init = Api::Init {
            name: "scene".into(),
            config: None,
        };
        assert!(matches!(dispatch(init), ApiResult::None));
        let result = dispatch(Api::CompileMaterial {
            name: "Material".into(),
            tree: diffuse_tree(),
        });
        match result {
            ApiResult::Material {
                name,
                node,
                diagnostics,
            } => {
                assert_eq!(name, "Material");
                assert!(node.unwrap().starts_with("surfacematerial_"));
                assert!(diagnostics.is_empty());
            }
            r => panic!("unexpected result {:?}", r),
        }
        match dispatch(Api::ToMtlx) {
            ApiResult::Mtlx { xml } => {
                assert!(xml.contains("<diffuse_brdf"));
                assert!(xml.contains("<surfacematerial"));
            }
            r => panic!("unexpected result {:?}", r),
        }
        assert!(matches!(dispatch(Api::Finalize), ApiResult::None));
        assert!(matches!(dispatch(Api::ToMtlx), ApiResult::Error { .. }));
    }

    #[test]
    fn test_api_json() {
        let api: Api = blmx_common::serde_json::from_str(r#"{"WriteDocument": {"path": "a.mtlx"}}"#).unwrap();
        assert!(matches!(api, Api::WriteDocument { path } if path == "a.mtlx"));
        let api: Api = blmx_common::serde_json::from_str(r#"{"Init": {"name": "x"}}"#).unwrap();
        assert!(matches!(api, Api::Init { config: None, .. }));
    }

    #[test]
    fn test_compile_linked_tree_from_json() {
        let json = r#"{"CompileMaterial": {"name": "Material", "tree": {
            "name": "Material",
            "nodes": {
                "Diffuse BSDF": {
                    "bl_idname": "ShaderNodeBsdfDiffuse",
                    "inputs": [
                        {"identifier": "Color", "name": "Color", "default_value": [0.8, 0.2, 0.2, 1.0]},
                        {"identifier": "Roughness", "name": "Roughness", "default_value": 0.25},
                        {"identifier": "Normal", "name": "Normal"}
                    ],
                    "outputs": [{"identifier": "BSDF", "name": "BSDF"}]
                },
                "Material Output": {
                    "bl_idname": "ShaderNodeOutputMaterial",
                    "inputs": [
                        {"identifier": "Surface", "name": "Surface"},
                        {"identifier": "Displacement", "name": "Displacement"}
                    ]
                }
            },
            "links": [
                {"from_node": "Diffuse BSDF", "from_socket": "BSDF", "to_node": "Material Output", "to_socket": "Surface"}
            ]
        }}}"#;
        let api: Api = blmx_common::serde_json::from_str(json).unwrap();
        let Api::CompileMaterial { tree, .. } = &api else {
            panic!("unexpected api {:?}", api);
        };
        let link = &tree.links[0];
        assert_eq!(link.from_node.name(), "Diffuse BSDF");
        assert!(tree.node(&link.to_node).is_some());
        let round_trip = blmx_common::serde_json::to_string(tree).unwrap();
        assert!(round_trip.contains(r#""from_node":"Diffuse BSDF""#));

        let init = Api::Init {
            name: "scene".into(),
            config: None,
        };
        assert!(matches!(dispatch(init), ApiResult::None));
        match dispatch(api) {
            ApiResult::Material {
                node, diagnostics, ..
            } => {
                assert!(node.is_some());
                assert!(diagnostics.is_empty(), "{:?}", diagnostics);
            }
            r => panic!("unexpected result {:?}", r),
        }
        match dispatch(Api::ToMtlx) {
            ApiResult::Mtlx { xml } => {
                assert!(xml.contains("<diffuse_brdf"));
                assert!(xml.contains("value=\"0.8, 0.2, 0.2\""));
            }
            r => panic!("unexpected result {:?}", r),
        }
        assert!(matches!(dispatch(Api::Finalize), ApiResult::None));
    }
}
