//! Span forest construction.
//!
//! Spans arrive as a flat list linked by parent ids. The forest stores them
//! in an arena and links nodes by index, so traversal never chases owned
//! pointers and a malformed batch cannot produce a reference cycle.

use super::schema::SpanRef;
use crate::utils::error::ForestError;
use log::debug;
use std::collections::HashMap;

/// A span plus its position in the forest
#[derive(Debug, Clone)]
pub struct SpanNode {
    pub span: SpanRef,

    /// Arena index of the parent, `None` for roots
    pub parent: Option<usize>,

    /// Arena indices of the children, in input order
    pub children: Vec<usize>,

    /// Spans on the path from the root, this one included
    pub depth: usize,
}

/// Parent-rooted trees of spans
#[derive(Debug, Clone, Default)]
pub struct SpanForest {
    nodes: Vec<SpanNode>,
    roots: Vec<usize>,
    index: HashMap<String, usize>,
}

impl SpanForest {
    /// Link spans into trees
    ///
    /// **Public** - main entry point for forest construction
    ///
    /// A span becomes a root when it has no parent id or its parent is not
    /// in the batch. Children and roots keep input order.
    ///
    /// # Errors
    /// * `ForestError::DuplicateSpan` - Two spans share an id
    /// * `ForestError::CyclicLinkage` - Following parents never reaches a root
    /// * `ForestError::DepthExceeded` - A path from a root is longer than `max_depth`
    pub fn build(spans: Vec<SpanRef>, max_depth: usize) -> Result<Self, ForestError> {
        let mut index = HashMap::with_capacity(spans.len());
        for (i, span) in spans.iter().enumerate() {
            if index.insert(span.span_id.clone(), i).is_some() {
                return Err(ForestError::DuplicateSpan {
                    span_id: span.span_id.clone(),
                });
            }
        }

        let parents: Vec<Option<usize>> = spans
            .iter()
            .map(|span| {
                span.parent_span_id
                    .as_ref()
                    .and_then(|parent| index.get(parent).copied())
            })
            .collect();

        let depths = compute_depths(&spans, &parents, max_depth)?;

        let mut nodes: Vec<SpanNode> = spans
            .into_iter()
            .zip(parents.iter().zip(depths))
            .map(|(span, (&parent, depth))| SpanNode {
                span,
                parent,
                children: Vec::new(),
                depth,
            })
            .collect();

        let mut roots = Vec::new();
        for (i, parent) in parents.iter().enumerate() {
            match parent {
                Some(p) => nodes[*p].children.push(i),
                None => roots.push(i),
            }
        }

        debug!("Built span forest: {} spans, {} roots", nodes.len(), roots.len());

        Ok(Self { nodes, roots, index })
    }

    /// Arena indices of the roots, in input order
    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    pub fn node(&self, index: usize) -> Option<&SpanNode> {
        self.nodes.get(index)
    }

    pub fn get(&self, span_id: &str) -> Option<&SpanNode> {
        self.index.get(span_id).and_then(|&i| self.nodes.get(i))
    }

    pub fn nodes(&self) -> &[SpanNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes of one tree in pre-order, siblings in input order
    pub fn preorder(&self, root: usize) -> Vec<&SpanNode> {
        let mut visited = Vec::new();
        let mut pending = vec![root];

        while let Some(i) = pending.pop() {
            let Some(node) = self.nodes.get(i) else {
                continue;
            };
            visited.push(node);
            pending.extend(node.children.iter().rev().copied());
        }

        visited
    }
}

/// Depth of every node, rejecting cycles and overlong chains
fn compute_depths(
    spans: &[SpanRef],
    parents: &[Option<usize>],
    max_depth: usize,
) -> Result<Vec<usize>, ForestError> {
    let mut depths: Vec<Option<usize>> = vec![None; spans.len()];

    for start in 0..spans.len() {
        if depths[start].is_some() {
            continue;
        }

        // Walk up until a root or a node with a known depth
        let mut path = vec![start];
        let mut base = 0;
        let mut current = start;
        while let Some(parent) = parents[current] {
            if let Some(known) = depths[parent] {
                base = known;
                break;
            }
            if path.contains(&parent) {
                return Err(ForestError::CyclicLinkage {
                    span_id: spans[parent].span_id.clone(),
                });
            }
            if path.len() > max_depth {
                return Err(ForestError::DepthExceeded {
                    span_id: spans[start].span_id.clone(),
                    max_depth,
                });
            }
            path.push(parent);
            current = parent;
        }

        for (offset, &node) in path.iter().rev().enumerate() {
            let depth = base + offset + 1;
            if depth > max_depth {
                return Err(ForestError::DepthExceeded {
                    span_id: spans[node].span_id.clone(),
                    max_depth,
                });
            }
            depths[node] = Some(depth);
        }
    }

    Ok(depths.into_iter().map(|d| d.unwrap_or(1)).collect())
}
