//! Extract the node graph from a TensorFlow `GraphDef` and format it as a
//! Graphviz DOT graph.
//!
//! Only the fields needed to draw the graph are read:
//!
//! ```proto
//! message GraphDef {
//!   repeated NodeDef node = 1;
//! }
//!
//! message NodeDef {
//!   string name = 1;
//!   string op = 2;
//!   repeated string input = 3;
//! }
//! ```

use std::fmt::{Display, Formatter};
use std::io::Write;

use picoproto::Message;

const GRAPH_DEF_NODE_FIELD: i32 = 1;
const NODE_DEF_NAME_FIELD: i32 = 1;
const NODE_DEF_OP_FIELD: i32 = 2;
const NODE_DEF_INPUT_FIELD: i32 = 3;

/// A node in a `GraphDef`.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub name: String,
    pub op: String,

    /// Names of the nodes whose outputs this node uses.
    pub inputs: Vec<String>,
}

impl Node {
    fn from_message(node: &Message) -> Self {
        Node {
            name: node.get_string(NODE_DEF_NAME_FIELD).into_owned(),
            op: node.get_string(NODE_DEF_OP_FIELD).into_owned(),
            inputs: node
                .get_string_array(NODE_DEF_INPUT_FIELD)
                .iter()
                .map(|input| input_node_name(input).to_string())
                .collect(),
        }
    }
}

/// Return the name of the node referenced by a `NodeDef` input.
///
/// Inputs have the form `node`, `node:output_index` or `^node` for control
/// dependencies.
pub fn input_node_name(input: &str) -> &str {
    let name = input.strip_prefix('^').unwrap_or(input);
    match name.find(':') {
        Some(colon_pos) => &name[..colon_pos],
        None => name,
    }
}

/// Warning about a node that could not be fully decoded.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeWarning {
    /// Position of the node in the graph.
    pub index: usize,
    pub message: String,
}

/// Nodes of a decoded `GraphDef`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Graph {
    pub nodes: Vec<Node>,

    /// Problems found decoding individual nodes.
    pub warnings: Vec<NodeWarning>,
}

impl Graph {
    /// Extract the nodes of a decoded `GraphDef` message.
    pub fn from_message(graph_def: &Message) -> Self {
        let mut graph = Graph::default();
        for (index, node) in graph_def
            .get_message_array(GRAPH_DEF_NODE_FIELD)
            .iter()
            .enumerate()
        {
            if let Some(err) = node.decode_error() {
                graph.warnings.push(NodeWarning {
                    index,
                    message: err.to_string(),
                });
            }
            graph.nodes.push(Node::from_message(node));
        }
        graph
    }

    /// Write the graph in DOT format.
    pub fn write_dot<W: Write>(&self, mut out: W) -> std::io::Result<()> {
        write!(out, "{}", self)?;
        out.flush()
    }
}

/// Escape a string for use in a quoted DOT identifier.
fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

impl Display for Graph {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "digraph graphname {{")?;
        for node in &self.nodes {
            let name = escape(&node.name);
            writeln!(f, "  \"{}\" [label=\"{}\"];", name, escape(&node.op))?;
            for input in &node.inputs {
                writeln!(f, "  \"{}\" -> \"{}\";", escape(input), name)?;
            }
        }
        writeln!(f, "}}")
    }
}
