use glam::Vec3;
use log::warn;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Color {
    Red,
    Blue,
    Green,
}

impl Color {
    pub fn label(self) -> &'static str {
        match self {
            Self::Red => "red",
            Self::Blue => "blue",
            Self::Green => "green",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Source { color: Color },
    Connector,
    Target { required: Color },
}

#[derive(Clone, Debug)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    pub position: Vec3,
    pub selected: bool,
    outputs: Vec<NodeId>,
    inputs: Vec<NodeId>,
    input_colors: Vec<Color>,
}

impl Node {
    pub fn outputs(&self) -> &[NodeId] {
        &self.outputs
    }

    pub fn inputs(&self) -> &[NodeId] {
        &self.inputs
    }

    pub fn input_colors(&self) -> &[Color] {
        &self.input_colors
    }

    pub fn source_color(&self) -> Option<Color> {
        match self.kind {
            NodeKind::Source { color } => Some(color),
            _ => None,
        }
    }

    /// Terminal nodes end a path: any target, or a source other than the root.
    pub fn is_terminal_for(&self, root: NodeId) -> bool {
        match self.kind {
            NodeKind::Target { .. } => true,
            NodeKind::Source { .. } => self.id != root,
            NodeKind::Connector => false,
        }
    }

    pub fn is_active(&self) -> bool {
        match self.kind {
            NodeKind::Target { required } => self.input_colors.contains(&required),
            _ => false,
        }
    }

    /// A node relays its beam to an inert branch only when it carries
    /// exactly one color.
    pub fn shareable_color(&self) -> Option<Color> {
        if self.input_colors.len() == 1 {
            Some(self.input_colors[0])
        } else {
            None
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct NodeGraph {
    nodes: Vec<Node>,
}

impl NodeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, kind: NodeKind, position: Vec3) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            id,
            kind,
            position,
            selected: false,
            outputs: Vec::new(),
            inputs: Vec::new(),
            input_colors: Vec::new(),
        });
        id
    }

    pub fn add_source(&mut self, position: Vec3, color: Color) -> NodeId {
        self.push(NodeKind::Source { color }, position)
    }

    pub fn add_connector(&mut self, position: Vec3) -> NodeId {
        self.push(NodeKind::Connector, position)
    }

    pub fn add_target(&mut self, position: Vec3, required: Color) -> NodeId {
        self.push(NodeKind::Target { required }, position)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub fn position(&self, id: NodeId) -> Vec3 {
        self.nodes[id.index()].position
    }

    /// All sources in ascending id order; drives deterministic pass output.
    pub fn sources(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|node| matches!(node.kind, NodeKind::Source { .. }))
            .map(|node| node.id)
            .collect()
    }

    fn contains(&self, id: NodeId) -> bool {
        id.index() < self.nodes.len()
    }

    pub fn connect(&mut self, a: NodeId, b: NodeId) {
        if a == b {
            warn!("ignoring self-connection on node {}", a.0);
            return;
        }
        if !self.contains(a) || !self.contains(b) {
            warn!("connect with unknown node ({}, {})", a.0, b.0);
            return;
        }
        if self.nodes[a.index()].outputs.contains(&b) {
            return;
        }

        self.nodes[a.index()].outputs.push(b);
        if !self.nodes[b.index()].inputs.contains(&a) {
            self.nodes[b.index()].inputs.push(a);
        }
    }

    pub fn disconnect(&mut self, a: NodeId, b: NodeId) {
        if !self.contains(a) || !self.contains(b) {
            warn!("disconnect with unknown node ({}, {})", a.0, b.0);
            return;
        }

        self.nodes[a.index()].outputs.retain(|&id| id != b);
        self.nodes[a.index()].inputs.retain(|&id| id != b);
        self.nodes[b.index()].outputs.retain(|&id| id != a);
        self.nodes[b.index()].inputs.retain(|&id| id != a);
    }

    pub fn clear_connections(&mut self, id: NodeId) {
        if !self.contains(id) {
            warn!("clear_connections with unknown node {}", id.0);
            return;
        }

        let outputs = std::mem::take(&mut self.nodes[id.index()].outputs);
        for target in outputs {
            self.nodes[target.index()].inputs.retain(|&other| other != id);
        }

        let inputs = std::mem::take(&mut self.nodes[id.index()].inputs);
        for source in inputs {
            self.nodes[source.index()].outputs.retain(|&other| other != id);
        }
    }

    pub fn reset(&mut self, id: NodeId) {
        if let Some(node) = self.nodes.get_mut(id.index()) {
            node.input_colors.clear();
        }
    }

    pub fn add_input_color(&mut self, id: NodeId, color: Color) {
        let Some(node) = self.nodes.get_mut(id.index()) else {
            warn!("add_input_color with unknown node {}", id.0);
            return;
        };
        if !node.input_colors.contains(&color) {
            node.input_colors.push(color);
        }
    }

    /// Inputs then outputs, first occurrence wins. Connection order is
    /// preserved so traversal is reproducible across passes.
    pub fn neighbors(&self, id: NodeId) -> Vec<NodeId> {
        let node = &self.nodes[id.index()];
        let mut out = Vec::with_capacity(node.inputs.len() + node.outputs.len());
        for &next in node.inputs.iter().chain(node.outputs.iter()) {
            if !out.contains(&next) {
                out.push(next);
            }
        }
        out
    }
}
