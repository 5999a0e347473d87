//! Canonical labels of diagrams
//!
//! A diagram is viewed as an undirected tree whose nodes are its vertices
//! and external legs. The label of the part of the tree hanging off an edge
//! records interactions, codes and external leg numbers, with children
//! sorted, so two diagrams get the same label exactly when they are
//! isomorphic as graphs labelled by external leg numbers.

use std::collections::HashMap;
use std::fmt;

use crate::diagram::Diagram;
use crate::id::{InteractionId, LegNumber, LegSet, PdgCode};
use crate::model::Model;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TreeLabel {
    Leg {
        number: LegNumber,
        id: PdgCode,
    },
    Vertex {
        interaction: InteractionId,
        id: PdgCode,
        children: Vec<TreeLabel>,
    },
}

impl fmt::Display for TreeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TreeLabel::Leg { number, id } => write!(f, "{}({})", number, id),
            TreeLabel::Vertex {
                interaction,
                id,
                children,
            } => {
                write!(f, "[{}:{}](", interaction, id)?;
                for (i, c) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", c)?;
                }
                write!(f, ")")
            }
        }
    }
}

/// One line of a diagram; `id` is the code seen leaving the producer side
#[derive(Clone, Debug)]
pub(crate) struct Edge {
    pub legset: LegSet,
    pub id: PdgCode,
    pub number: LegNumber,
    /// `None` for an external leg
    pub producer: Option<usize>,
    pub consumer: usize,
}

impl Edge {
    /// The vertex at the other end, `None` when that end is an external leg
    pub fn other_end(&self, vertex: usize) -> Option<usize> {
        if self.consumer == vertex {
            self.producer
        } else {
            Some(self.consumer)
        }
    }
}

/// Undirected view of a diagram
pub(crate) struct DiagramGraph<'a> {
    pub diagram: &'a Diagram,
    pub edges: Vec<Edge>,
    pub incident: Vec<Vec<usize>>,
}

impl<'a> DiagramGraph<'a> {
    pub fn new(diagram: &'a Diagram) -> Self {
        let n = diagram.vertices.len();
        let producer_of: HashMap<LegSet, usize> = diagram
            .vertices
            .iter()
            .enumerate()
            .take(n.saturating_sub(1))
            .filter_map(|(i, v)| v.output().map(|l| (l.legset, i)))
            .collect();
        let mut edges = Vec::new();
        let mut incident = vec![Vec::new(); n];
        for (j, v) in diagram.vertices.iter().enumerate() {
            let inputs = if j + 1 == n { &v.legs[..] } else { v.inputs() };
            for leg in inputs {
                let producer = if leg.is_external() {
                    None
                } else {
                    producer_of.get(&leg.legset).copied()
                };
                let e = edges.len();
                edges.push(Edge {
                    legset: leg.legset,
                    id: leg.id,
                    number: leg.number,
                    producer,
                    consumer: j,
                });
                incident[j].push(e);
                if let Some(p) = producer {
                    incident[p].push(e);
                }
            }
        }
        DiagramGraph {
            diagram,
            edges,
            incident,
        }
    }

    /// Code flowing through `edge` from `from` towards the other end
    pub fn flow_from(&self, model: &Model, edge: usize, from: usize) -> PdgCode {
        let e = &self.edges[edge];
        if e.producer == Some(from) {
            e.id
        } else {
            model.anti(e.id)
        }
    }

    /// Label of everything beyond `edge`, seen from `vertex`
    pub fn label_beyond(&self, model: &Model, vertex: usize, edge: usize) -> TreeLabel {
        let e = &self.edges[edge];
        match e.other_end(vertex) {
            None => TreeLabel::Leg {
                number: e.number,
                id: e.id,
            },
            Some(far) => {
                // Code leaving the far side, towards `vertex`
                let id = self.flow_from(model, edge, far);
                let mut children: Vec<TreeLabel> = self.incident[far]
                    .iter()
                    .filter(|&&f| f != edge)
                    .map(|&f| self.label_beyond(model, far, f))
                    .collect();
                children.sort();
                TreeLabel::Vertex {
                    interaction: self.diagram.vertices[far].interaction,
                    id,
                    children,
                }
            }
        }
    }

    /// Label of the whole diagram, rooted at its root vertex
    pub fn root_label(&self, model: &Model) -> TreeLabel {
        let root = self.diagram.vertices.len().saturating_sub(1);
        let mut children: Vec<TreeLabel> = self.incident[root]
            .iter()
            .map(|&e| self.label_beyond(model, root, e))
            .collect();
        children.sort();
        TreeLabel::Vertex {
            interaction: self.diagram.vertices[root].interaction,
            id: 0,
            children,
        }
    }

    /// Vertex path from `from` to `to` and the edges along it
    pub fn path(&self, from: usize, to: usize) -> Option<(Vec<usize>, Vec<usize>)> {
        let n = self.incident.len();
        let mut prev: Vec<Option<(usize, usize)>> = vec![None; n];
        let mut seen = vec![false; n];
        let mut queue = std::collections::VecDeque::from([from]);
        seen[from] = true;
        while let Some(v) = queue.pop_front() {
            if v == to {
                break;
            }
            for &e in &self.incident[v] {
                if let Some(w) = self.edges[e].other_end(v) {
                    if !seen[w] {
                        seen[w] = true;
                        prev[w] = Some((v, e));
                        queue.push_back(w);
                    }
                }
            }
        }
        if !seen[to] {
            return None;
        }
        let mut vertices = vec![to];
        let mut edges = Vec::new();
        let mut cur = to;
        while let Some((p, e)) = prev[cur] {
            edges.push(e);
            vertices.push(p);
            cur = p;
        }
        vertices.reverse();
        edges.reverse();
        Some((vertices, edges))
    }

    /// Edge of the external leg `number`
    pub fn external_edge(&self, number: LegNumber) -> Option<usize> {
        self.edges
            .iter()
            .position(|e| e.producer.is_none() && e.number == number)
    }
}

/// Canonical label of a tree diagram
pub fn diagram_label(model: &Model, diagram: &Diagram) -> TreeLabel {
    DiagramGraph::new(diagram).root_label(model)
}
