use std::fmt;
use std::ops::Index;

use thiserror::Error;

use crate::TermF;

/// A child reference as stored in a DAG: how many positions back the child sits.
pub type Offset = u64;

/// A node whose children are backward offsets.
pub type DagNode<J, Ty, W> = TermF<J, Ty, W, Offset>;

/// An untyped node.
pub type RawNode<J, W> = DagNode<J, (), W>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RefError {
    #[error("child offset {offset} is out of range")]
    Overflow { offset: Offset },
    #[error("child offset {offset} does not point at an earlier node")]
    OutOfRange { offset: Offset },
}

/// Resolve the child `offset` of the node at `pos` to an absolute position.
/// Valid offsets satisfy `0 < offset <= pos`.
pub fn resolve_offset(pos: usize, offset: Offset) -> Result<usize, RefError> {
    let back = u32::try_from(offset).map_err(|_| RefError::Overflow { offset })?;
    let back = back as usize;
    if back == 0 || back > pos {
        return Err(RefError::OutOfRange { offset });
    }
    Ok(pos - back)
}

/// A program as a topologically sorted node sequence. Children always point
/// strictly backwards and the last node is the root.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Dag<J, Ty, W> {
    nodes: Vec<DagNode<J, Ty, W>>,
}

pub type RawDag<J, W> = Dag<J, (), W>;

impl<J, Ty, W> Default for Dag<J, Ty, W> {
    fn default() -> Self {
        Self { nodes: Vec::new() }
    }
}

impl<J, Ty, W> Dag<J, Ty, W> {
    pub fn new(nodes: Vec<DagNode<J, Ty, W>>) -> Self {
        Self { nodes }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[DagNode<J, Ty, W>] {
        &self.nodes
    }

    pub fn get(&self, pos: usize) -> Option<&DagNode<J, Ty, W>> {
        self.nodes.get(pos)
    }

    pub fn root(&self) -> Option<&DagNode<J, Ty, W>> {
        self.nodes.last()
    }

    pub fn push(&mut self, node: DagNode<J, Ty, W>) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DagNode<J, Ty, W>> {
        self.nodes.iter()
    }

    pub fn into_nodes(self) -> Vec<DagNode<J, Ty, W>> {
        self.nodes
    }

    /// The node the child `offset` of the node at `pos` points at.
    pub fn child(&self, pos: usize, offset: Offset) -> Result<(usize, &DagNode<J, Ty, W>), RefError> {
        let idx = resolve_offset(pos, offset)?;
        Ok((idx, &self.nodes[idx]))
    }

    /// Check every child reference. Returns the first bad one with its node position.
    pub fn validate(&self) -> Result<(), (usize, RefError)> {
        for (pos, node) in self.nodes.iter().enumerate() {
            let (s, t) = node.children();
            for &offset in [s, t].into_iter().flatten() {
                resolve_offset(pos, offset).map_err(|e| (pos, e))?;
            }
        }
        Ok(())
    }
}

impl<J, Ty, W> Index<usize> for Dag<J, Ty, W> {
    type Output = DagNode<J, Ty, W>;

    fn index(&self, pos: usize) -> &Self::Output {
        &self.nodes[pos]
    }
}

impl<J, Ty, W> FromIterator<DagNode<J, Ty, W>> for Dag<J, Ty, W> {
    fn from_iter<I: IntoIterator<Item = DagNode<J, Ty, W>>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<J, Ty, W> IntoIterator for Dag<J, Ty, W> {
    type Item = DagNode<J, Ty, W>;
    type IntoIter = std::vec::IntoIter<DagNode<J, Ty, W>>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.into_iter()
    }
}

impl<'a, J, Ty, W> IntoIterator for &'a Dag<J, Ty, W> {
    type Item = &'a DagNode<J, Ty, W>;
    type IntoIter = std::slice::Iter<'a, DagNode<J, Ty, W>>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter()
    }
}

/// One node per line in the text format.
impl<J: fmt::Display, Ty, W> fmt::Display for Dag<J, Ty, W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for node in &self.nodes {
            writeln!(f, "{node}")?;
        }
        Ok(())
    }
}
