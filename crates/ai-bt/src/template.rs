use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::bt::{BtAction, BtCtx, BtDomain, ConditionFn, DynAction};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BtError {
    #[error("composite node `{0}` has no children")]
    EmptyComposite(String),
    #[error("tree `{0}` has more nodes than a node id can address")]
    TooManyNodes(String),
}

/// Index of a node inside a compiled [`BtTemplate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Runs children in order; resumes at a running child on the next step.
    Sequence,
    /// Re-checks every child from the first on each step; a failure aborts the running child.
    ReactiveSequence,
    /// Priority selector: re-evaluated from the first child on each step, a higher-priority
    /// child that succeeds or runs aborts a lower-priority running child.
    Selector,
    Condition,
    Action,
}

impl NodeKind {
    pub fn is_composite(self) -> bool {
        matches!(
            self,
            NodeKind::Sequence | NodeKind::ReactiveSequence | NodeKind::Selector
        )
    }
}

enum NodeBody<D: BtDomain> {
    Composite(Vec<Node<D>>),
    Condition(ConditionFn<D>),
    Action(Box<dyn DynAction<D>>),
}

/// Tree description used to build a template.
pub struct Node<D: BtDomain> {
    name: Cow<'static, str>,
    kind: NodeKind,
    body: NodeBody<D>,
}

impl<D: BtDomain> Node<D> {
    pub fn sequence(name: impl Into<Cow<'static, str>>, children: Vec<Node<D>>) -> Self {
        Self::composite(name, NodeKind::Sequence, children)
    }

    pub fn reactive_sequence(name: impl Into<Cow<'static, str>>, children: Vec<Node<D>>) -> Self {
        Self::composite(name, NodeKind::ReactiveSequence, children)
    }

    pub fn selector(name: impl Into<Cow<'static, str>>, children: Vec<Node<D>>) -> Self {
        Self::composite(name, NodeKind::Selector, children)
    }

    pub fn condition<F>(name: impl Into<Cow<'static, str>>, predicate: F) -> Self
    where
        F: Fn(&BtCtx<'_, D>) -> bool + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            kind: NodeKind::Condition,
            body: NodeBody::Condition(Box::new(predicate)),
        }
    }

    pub fn action<A>(name: impl Into<Cow<'static, str>>, action: A) -> Self
    where
        A: BtAction<D>,
    {
        Self {
            name: name.into(),
            kind: NodeKind::Action,
            body: NodeBody::Action(Box::new(action)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    fn composite(
        name: impl Into<Cow<'static, str>>,
        kind: NodeKind,
        children: Vec<Node<D>>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            body: NodeBody::Composite(children),
        }
    }
}

pub(crate) enum CompiledBody<D: BtDomain> {
    Composite(Vec<NodeId>),
    Condition(ConditionFn<D>),
    Action(Box<dyn DynAction<D>>),
}

pub(crate) struct CompiledNode<D: BtDomain> {
    pub(crate) name: Cow<'static, str>,
    pub(crate) kind: NodeKind,
    pub(crate) body: CompiledBody<D>,
}

/// Immutable, shareable tree structure.
///
/// Nodes live in a flat arena; children always have smaller ids than their parent and the root is
/// the last node. Per-agent progress lives in [`crate::BtInstance`], never here.
pub struct BtTemplate<D: BtDomain> {
    name: String,
    nodes: Vec<CompiledNode<D>>,
}

impl<D: BtDomain> fmt::Debug for BtTemplate<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BtTemplate")
            .field("name", &self.name)
            .field("nodes", &self.nodes.len())
            .finish()
    }
}

impl<D: BtDomain> BtTemplate<D> {
    pub fn compile(name: impl Into<String>, root: Node<D>) -> Result<Self, BtError> {
        let name = name.into();
        let mut nodes = Vec::new();
        flatten(&name, root, &mut nodes)?;
        Ok(Self { name, nodes })
    }

    /// Compiles and wraps the template for sharing between instances.
    pub fn shared(name: impl Into<String>, root: Node<D>) -> Result<Arc<Self>, BtError> {
        Self::compile(name, root).map(Arc::new)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn root(&self) -> NodeId {
        NodeId(self.nodes.len().saturating_sub(1) as u32)
    }

    pub fn node_name(&self, id: NodeId) -> Option<&str> {
        self.nodes.get(id.index()).map(|n| n.name.as_ref())
    }

    pub fn node_kind(&self, id: NodeId) -> Option<NodeKind> {
        self.nodes.get(id.index()).map(|n| n.kind)
    }

    /// First node (in id order) carrying `name`.
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|n| n.name == name)
            .map(|i| NodeId(i as u32))
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        match self.nodes.get(id.index()).map(|n| &n.body) {
            Some(CompiledBody::Composite(children)) => children,
            _ => &[],
        }
    }

    pub(crate) fn node(&self, id: NodeId) -> &CompiledNode<D> {
        &self.nodes[id.index()]
    }
}

fn flatten<D: BtDomain>(
    tree: &str,
    node: Node<D>,
    out: &mut Vec<CompiledNode<D>>,
) -> Result<NodeId, BtError> {
    let body = match node.body {
        NodeBody::Composite(children) => {
            if children.is_empty() {
                return Err(BtError::EmptyComposite(node.name.into_owned()));
            }
            let ids = children
                .into_iter()
                .map(|child| flatten(tree, child, out))
                .collect::<Result<Vec<_>, _>>()?;
            CompiledBody::Composite(ids)
        }
        NodeBody::Condition(predicate) => CompiledBody::Condition(predicate),
        NodeBody::Action(action) => CompiledBody::Action(action),
    };
    let id = u32::try_from(out.len()).map_err(|_| BtError::TooManyNodes(tree.to_string()))?;
    out.push(CompiledNode {
        name: node.name,
        kind: node.kind,
        body,
    });
    Ok(NodeId(id))
}
