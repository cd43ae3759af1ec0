use graphviz_rust::{
    cmd::{CommandArg, Format},
    dot_structures::{
        Attribute, Edge, EdgeTy, Graph, GraphAttributes, Id, Node, NodeId, Stmt, Vertex,
    },
    exec, print,
    printer::PrinterContext,
};

use crate::neuron::NeuronKind;
use crate::topology::Topology;

fn attr(key: &str, value: &str) -> Attribute {
    Attribute(Id::Plain(key.into()), Id::Plain(value.into()))
}

fn node_id(index: usize) -> NodeId {
    NodeId(Id::Plain(format!("n{}", index)), None)
}

/// Excitatory nodes are drawn red, inhibitory blue. Duplicate edges are kept.
fn to_graph(topology: &Topology) -> Graph {
    let mut g = Graph::DiGraph {
        id: Id::Plain("network".to_string()),
        strict: false,
        stmts: Vec::new(),
    };

    g.add_stmt(Stmt::GAttribute(GraphAttributes::Graph(vec![
        attr("layout", "neato"),
        attr("overlap", "false"),
        attr("splines", "line"),
        attr("mode", "sgd"),
    ])));

    for i in 0..topology.len() {
        let color = match topology.kind_of(i) {
            NeuronKind::Excitatory => "red",
            NeuronKind::Inhibitory => "blue",
        };
        g.add_stmt(Stmt::Node(Node::new(
            node_id(i),
            vec![attr("shape", "point"), attr("color", color)],
        )));

        for &target in topology.targets(i) {
            let edge = Edge {
                ty: EdgeTy::Pair(Vertex::N(node_id(i)), Vertex::N(node_id(target as usize))),
                attributes: vec![attr("color", color)],
            };
            g.add_stmt(Stmt::Edge(edge));
        }
    }

    g
}

/// DOT source of the topology. Meant for small networks.
pub fn to_dot(topology: &Topology) -> String {
    print(to_graph(topology), &mut PrinterContext::default())
}

/// Render the topology with Graphviz' **neato** engine into an in-memory PNG.
/// Requires a local Graphviz installation.
pub fn to_neato_png(topology: &Topology) -> std::io::Result<Vec<u8>> {
    let mut ctx = PrinterContext::default();
    exec(to_graph(topology), &mut ctx, vec![CommandArg::Format(Format::Png)])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dot_lists_every_edge() {
        let mut topology = Topology::empty(2, 1);
        topology.add_edge(0, 2).unwrap();
        topology.add_edge(0, 2).unwrap();
        topology.add_edge(2, 1).unwrap();

        let dot = to_dot(&topology);
        assert!(dot.contains("digraph network"));
        assert_eq!(dot.matches("->").count(), 3);
        assert!(dot.contains("n1"));
        assert!(dot.contains("blue"));
    }
}
