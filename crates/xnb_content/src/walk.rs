//! Structural paths and traversal of the decoded tree.
//!
//! A path is a list of mapping keys and sequence indices joined by dots, for
//! example `tiles.3.texture`. Tags are transparent: a tagged object has the
//! same path as its data.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use derive_more::derive::{Deref, Display, From};

use crate::types::Node;

/// One step of a [`NodePath`]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, From)]
pub enum PathStep {
    /// A mapping key
    #[display("{_0}")]
    Field(String),
    /// A sequence position
    #[display("{_0}")]
    Index(usize),
}

impl From<&str> for PathStep {
    fn from(field: &str) -> Self {
        PathStep::Field(field.to_owned())
    }
}

/// Address of a node inside the tree
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Deref)]
pub struct NodePath(Vec<PathStep>);

impl NodePath {
    pub fn root() -> NodePath {
        NodePath::default()
    }

    /// This path extended by one step
    pub fn child(&self, step: impl Into<PathStep>) -> NodePath {
        let mut steps = self.0.clone();
        steps.push(step.into());
        NodePath(steps)
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{}", step)?;
        }
        Ok(())
    }
}

impl FromStr for NodePath {
    type Err = Infallible;

    /// Steps written exactly as a number prints are read as indices. They
    /// still resolve against a mapping whose key is that number. Anything
    /// else, such as `01` or `+1`, stays a field so it keeps its spelling.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(NodePath::root());
        }

        Ok(NodePath(
            s.split('.')
                .map(|step| match step.parse::<usize>() {
                    Ok(index) if index.to_string() == step => PathStep::Index(index),
                    _ => PathStep::Field(step.to_owned()),
                })
                .collect(),
        ))
    }
}

/// Visit every tagged object below `node` in definition order.
///
/// `visit` is called with the tagged object and its path before its data is
/// walked.
pub fn walk<'a, F>(node: &'a Node, path: &NodePath, visit: &mut F)
where
    F: FnMut(&'a Node, &NodePath),
{
    match node {
        Node::TaggedObject(tagged) => {
            visit(node, path);
            walk(&tagged.data, path, visit);
        }
        Node::Sequence(items) => {
            for (i, item) in items.iter().enumerate() {
                walk(item, &path.child(i), visit);
            }
        }
        Node::Mapping(fields) => {
            for (key, value) in fields {
                walk(value, &path.child(key.clone()), visit);
            }
        }
        Node::Scalar(_) => {}
    }
}

/// Paths of every tagged object matching `predicate`, in walk order
pub fn find_tagged<P>(node: &Node, mut predicate: P) -> Vec<NodePath>
where
    P: FnMut(&Node) -> bool,
{
    let mut found = Vec::new();
    walk(node, &NodePath::root(), &mut |tagged, path| {
        if predicate(tagged) {
            found.push(path.clone());
        }
    });
    found
}

fn step_into<'a>(node: &'a Node, step: &PathStep) -> Option<&'a Node> {
    match (node.untagged(), step) {
        (Node::Sequence(items), PathStep::Index(i)) => items.get(*i),
        (Node::Mapping(fields), step) => fields.get(&step.to_string()),
        _ => None,
    }
}

impl Node {
    /// Replay a path, descending through tags. Returns the untagged node.
    pub fn resolve(&self, path: &NodePath) -> Option<&Node> {
        let mut current = self;
        for step in path.iter() {
            current = step_into(current, step)?;
        }
        Some(current.untagged())
    }

    /// Mutable version of [`Node::resolve`].
    pub fn resolve_mut(&mut self, path: &NodePath) -> Option<&mut Node> {
        self.resolve_tagged_mut(path).map(Node::untagged_mut)
    }

    /// Like [`Node::resolve_mut`], but the node at the end of the path keeps
    /// its tags.
    pub fn resolve_tagged_mut(&mut self, path: &NodePath) -> Option<&mut Node> {
        let mut current = self;
        for step in path.iter() {
            current = match (current.untagged_mut(), step) {
                (Node::Sequence(items), PathStep::Index(i)) => items.get_mut(*i)?,
                (Node::Mapping(fields), step) => fields.get_mut(&step.to_string())?,
                _ => return None,
            };
        }
        Some(current)
    }
}
