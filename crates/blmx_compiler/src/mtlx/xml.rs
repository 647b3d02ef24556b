use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use super::{Document, InputBinding, MxInput, MxNode, NodeGraph};

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

fn output_name(node: &str) -> String {
    format!("out_{}", node)
}

/// Data nodes live in a `<nodegraph>`, shader nodes at document level.
/// Shader inputs fed by data nodes go through a nodegraph `<output>`.
fn write_graph(f: &mut fmt::Formatter<'_>, graph: &NodeGraph) -> fmt::Result {
    let is_data = |name: &str| graph.node(name).map_or(false, |n| !n.ty.is_shader());
    let mut exported = vec![];
    let mut seen = HashSet::new();
    for node in graph.nodes.iter().filter(|n| n.ty.is_shader()) {
        for input in node.inputs.values() {
            if let InputBinding::Node(src) = &input.binding {
                if is_data(src) && seen.insert(src.as_str()) {
                    exported.push(src.as_str());
                }
            }
        }
    }

    let data_nodes: Vec<_> = graph.nodes.iter().filter(|n| !n.ty.is_shader()).collect();
    if !data_nodes.is_empty() {
        writeln!(f, "  <nodegraph name=\"{}\">", escape(&graph.name))?;
        for node in &data_nodes {
            write_node(f, "    ", graph, node, |_| false)?;
        }
        for name in &exported {
            if let Some(node) = graph.node(name) {
                writeln!(
                    f,
                    "    <output name=\"{}\" type=\"{}\" nodename=\"{}\" />",
                    output_name(name),
                    node.ty,
                    escape(name)
                )?;
            }
        }
        writeln!(f, "  </nodegraph>")?;
    }
    for node in graph.nodes.iter().filter(|n| n.ty.is_shader()) {
        write_node(f, "  ", graph, node, is_data)?;
    }
    Ok(())
}

fn write_node(
    f: &mut fmt::Formatter<'_>,
    indent: &str,
    graph: &NodeGraph,
    node: &MxNode,
    via_output: impl Fn(&str) -> bool,
) -> fmt::Result {
    write!(
        f,
        "{}<{} name=\"{}\" type=\"{}\"",
        indent,
        node.category,
        escape(&node.name),
        node.ty
    )?;
    if node.inputs.is_empty() {
        return writeln!(f, " />");
    }
    writeln!(f, ">")?;
    for (name, input) in &node.inputs {
        write_input(f, indent, graph, name, input, &via_output)?;
    }
    writeln!(f, "{}</{}>", indent, node.category)
}

fn write_input(
    f: &mut fmt::Formatter<'_>,
    indent: &str,
    graph: &NodeGraph,
    name: &str,
    input: &MxInput,
    via_output: &impl Fn(&str) -> bool,
) -> fmt::Result {
    write!(f, "{}  <input name=\"{}\" type=\"{}\"", indent, name, input.ty)?;
    match &input.binding {
        InputBinding::Value(v) => write!(f, " value=\"{}\"", escape(&v.to_string()))?,
        InputBinding::Node(src) if via_output(src) => write!(
            f,
            " nodegraph=\"{}\" output=\"{}\"",
            escape(&graph.name),
            output_name(src)
        )?,
        InputBinding::Node(src) => write!(f, " nodename=\"{}\"", escape(src))?,
    }
    writeln!(f, " />")
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "<?xml version=\"1.0\"?>")?;
        writeln!(f, "<materialx version=\"{}\">", escape(&self.version))?;
        for graph in &self.graphs {
            write_graph(f, graph)?;
        }
        writeln!(f, "</materialx>")
    }
}

impl Document {
    /// MaterialX XML text of the whole document.
    pub fn to_mtlx(&self) -> String {
        self.to_string()
    }
    pub fn write_mtlx<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        std::fs::write(path, self.to_mtlx())
    }
}
