//! Prefix-compressed trie used to build standalone token indices.
//!
//! Nodes live in an append-only arena and refer to their children by id.
//! Every edge carries a label of one or more characters, and no two sibling
//! labels share a non-empty prefix, so at most one child can continue any
//! given string.
//!
//! The serialized form is written bottom-up, children before their parent,
//! so every child offset is known by the time its parent is written. A node
//! is stored as:
//!
//! ```text
//! u8         collapsed flag
//! i32        child count
//! (string, i64) * n   child label and offset
//! i32        descriptor count
//! (i64, i32) * n      descriptor offset and token count
//! ```
//!
//! The trie ends with the `i64` offset of the root node.


use std::collections::{BTreeMap, BTreeSet};
use std::io::{self, Write};
use std::ops::Bound;

use arrayvec::ArrayVec;
use byteorder::{BigEndian, WriteBytesExt};

use crate::container::codec::{write_len, write_string, Output, Reader};
use crate::error::Error;

/// Where a token occurs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Descriptor {
    pub offset: u64,
    /// Number of tokens in the text the token was taken from.
    pub token_count: u32,
}

impl Descriptor {
    pub fn new(offset: u64, token_count: u32) -> Self {
        Self {
            offset,
            token_count,
        }
    }
}

type NodeId = usize;

const ROOT: NodeId = 0;

#[derive(Default)]
struct Node {
    children: BTreeMap<String, NodeId>,
    /// Sorted and deduplicated.
    descriptors: Vec<Descriptor>,
    collapsed: bool,
}

/// A node as visited by [`TrieBuilder::entries`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrieEntry {
    /// Concatenated labels from the root.
    pub prefix: String,
    pub descriptors: Vec<Descriptor>,
    pub collapsed: bool,
}

/// Builds a prefix trie in memory.
pub struct TrieBuilder {
    nodes: Vec<Node>,
}

impl Default for TrieBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TrieBuilder {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::default()],
        }
    }

    fn push(&mut self) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node::default());
        id
    }

    fn attach(&mut self, node: NodeId, descriptor: Descriptor) {
        let descriptors = &mut self.nodes[node].descriptors;

        if let Err(at) = descriptors.binary_search(&descriptor) {
            descriptors.insert(at, descriptor);
        }
    }

    /// Find the child of `node` sharing the longest common prefix with
    /// `rest`, returning its label, id and the length of the shared prefix.
    ///
    /// Since siblings share no prefix, the only candidates are the
    /// immediate neighbours of `rest` in label order.
    fn closest_child(&self, node: NodeId, rest: &str) -> Option<(String, NodeId, usize)> {
        let children = &self.nodes[node].children;

        let mut candidates = ArrayVec::<_, 2>::new();

        candidates.extend(
            children
                .range::<str, _>((Bound::Unbounded, Bound::Included(rest)))
                .next_back(),
        );

        candidates.extend(
            children
                .range::<str, _>((Bound::Excluded(rest), Bound::Unbounded))
                .next(),
        );

        let mut best = None;

        for (label, &child) in candidates {
            let len = common_prefix(label, rest);

            if len > 0 && best.as_ref().map_or(true, |&(_, _, best)| len > best) {
                best = Some((label.clone(), child, len));
            }
        }

        best
    }

    /// Insert a token, attaching `descriptor` to the node representing it.
    pub fn insert(&mut self, token: &str, descriptor: Descriptor) {
        let mut node = ROOT;
        let mut pos = 0;

        loop {
            if pos == token.len() {
                self.attach(node, descriptor);
                return;
            }

            let rest = &token[pos..];

            let Some((label, child, len)) = self.closest_child(node, rest) else {
                let leaf = self.push();
                self.nodes[node].children.insert(rest.to_owned(), leaf);
                self.attach(leaf, descriptor);
                return;
            };

            if len < label.len() {
                // Split the edge so that the shared part gets its own node.
                let middle = self.push();
                self.nodes[node].children.remove(&label);
                self.nodes[node]
                    .children
                    .insert(label[..len].to_owned(), middle);
                self.nodes[middle]
                    .children
                    .insert(label[len..].to_owned(), child);
                node = middle;
            } else {
                node = child;
            }

            pos += len;
        }
    }

    fn pre_order(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![ROOT];

        while let Some(node) = stack.pop() {
            order.push(node);
            stack.extend(self.nodes[node].children.values().rev().copied());
        }

        order
    }

    /// Collapse every subtree holding at most `bound` distinct descriptors
    /// into its topmost node.
    ///
    /// Collapsed nodes keep the merged descriptors of their subtree and lose
    /// their children. Returns the number of nodes which were collapsed.
    pub fn prune(&mut self, bound: usize) -> usize {
        let order = self.pre_order();

        // Distinct descriptors below each node. Walking the pre-order
        // backwards visits every child before its parent, so child sets can
        // be merged into their parent small-to-large.
        let mut counts = vec![0; self.nodes.len()];
        let mut sets = BTreeMap::<NodeId, BTreeSet<Descriptor>>::new();

        for &node in order.iter().rev() {
            let mut set = BTreeSet::new();

            for child in self.nodes[node].children.values() {
                let Some(mut other) = sets.remove(child) else {
                    continue;
                };

                if other.len() > set.len() {
                    std::mem::swap(&mut set, &mut other);
                }

                set.append(&mut other);
            }

            set.extend(self.nodes[node].descriptors.iter().copied());
            counts[node] = set.len();
            sets.insert(node, set);
        }

        let mut collapsed = 0;
        let mut stack = vec![ROOT];

        while let Some(node) = stack.pop() {
            if self.nodes[node].children.is_empty() {
                continue;
            }

            if counts[node] > bound {
                stack.extend(self.nodes[node].children.values().copied());
                continue;
            }

            let descriptors = self.collect(node);
            let n = &mut self.nodes[node];
            n.descriptors = descriptors;
            n.children.clear();
            n.collapsed = true;
            collapsed += 1;
        }

        tracing::debug!(bound, collapsed, "Pruned trie");
        collapsed
    }

    /// Sorted and deduplicated descriptors of the subtree at `node`.
    fn collect(&self, node: NodeId) -> Vec<Descriptor> {
        let mut output = Vec::new();
        let mut stack = vec![node];

        while let Some(node) = stack.pop() {
            let n = &self.nodes[node];
            output.extend_from_slice(&n.descriptors);
            stack.extend(n.children.values().copied());
        }

        output.sort();
        output.dedup();
        output
    }

    /// Visit every reachable node in label order.
    pub fn entries(&self) -> Vec<TrieEntry> {
        let mut output = Vec::new();
        let mut stack = vec![(ROOT, String::new())];

        while let Some((node, prefix)) = stack.pop() {
            let n = &self.nodes[node];

            for (label, &child) in n.children.iter().rev() {
                stack.push((child, format!("{prefix}{label}")));
            }

            output.push(TrieEntry {
                prefix,
                descriptors: n.descriptors.clone(),
                collapsed: n.collapsed,
            });
        }

        output
    }

    /// Serialize the trie, returning the number of bytes written.
    pub fn write<W>(&self, out: W) -> Result<u64, Error>
    where
        W: Write,
    {
        let mut out = Output::new(out);
        let root = self.write_node(ROOT, &mut out)?;
        out.write_i64::<BigEndian>(root as i64)?;
        let len = out.position();
        out.into_inner().flush()?;
        Ok(len)
    }

    fn write_node<W>(&self, node: NodeId, out: &mut Output<W>) -> io::Result<u64>
    where
        W: Write,
    {
        let n = &self.nodes[node];

        let mut children = Vec::with_capacity(n.children.len());

        for (label, &child) in &n.children {
            children.push((label.as_str(), self.write_node(child, out)?));
        }

        let offset = out.position();

        out.write_all(&[u8::from(n.collapsed)])?;
        write_len(out, children.len())?;

        for (label, child) in children {
            write_string(out, label)?;
            out.write_i64::<BigEndian>(child as i64)?;
        }

        write_len(out, n.descriptors.len())?;

        for d in &n.descriptors {
            out.write_i64::<BigEndian>(d.offset as i64)?;
            write_len(out, d.token_count as usize)?;
        }

        Ok(offset)
    }
}

/// Length in bytes of the common prefix of `a` and `b`, on a character
/// boundary.
fn common_prefix(a: &str, b: &str) -> usize {
    a.char_indices()
        .zip(b.chars())
        .find(|((_, a), b)| a != b)
        .map_or(a.len().min(b.len()), |((n, _), _)| n)
}

struct RawNode<'a> {
    collapsed: bool,
    children: Vec<(&'a str, usize)>,
    descriptors: Vec<Descriptor>,
}

/// Read-only access to a serialized trie.
pub struct TrieReader<'a> {
    data: &'a [u8],
    root: usize,
}

impl<'a> TrieReader<'a> {
    pub fn new(data: &'a [u8]) -> Result<Self, Error> {
        let Some(at) = data.len().checked_sub(8) else {
            return Err(Error::malformed(0, "trie root"));
        };

        let root = Reader::at(data, at)?.offset("trie root")?;

        if root >= at {
            return Err(Error::malformed(at, "trie root"));
        }

        Ok(Self {
            data: &data[..at],
            root,
        })
    }

    fn node(&self, offset: usize) -> Result<RawNode<'a>, Error> {
        let mut r = Reader::at(self.data, offset)?;

        let collapsed = r.bool("trie node flag")?;
        let len = r.u32("trie child count")? as usize;
        let mut children = Vec::with_capacity(len.min(r.remaining() / 12));

        for _ in 0..len {
            let label = r.string("trie label")?;
            let at = r.position();
            let child = r.offset("trie child")?;

            if label.is_empty() || child >= offset {
                return Err(Error::malformed(at, "trie child"));
            }

            children.push((label, child));
        }

        let len = r.u32("trie descriptor count")? as usize;
        let mut descriptors = Vec::with_capacity(len.min(r.remaining() / 12));

        for _ in 0..len {
            let at = r.position();

            let Ok(offset) = u64::try_from(r.i64("trie descriptor")?) else {
                return Err(Error::malformed(at, "trie descriptor"));
            };

            let token_count = r.u32("trie descriptor")?;
            descriptors.push(Descriptor::new(offset, token_count));
        }

        Ok(RawNode {
            collapsed,
            children,
            descriptors,
        })
    }

    /// Find the descriptors of all tokens starting with `prefix`.
    ///
    /// Once the search reaches a node collapsed by pruning its merged
    /// descriptors are returned as candidates, which may include tokens not
    /// matching the rest of the prefix. The result is sorted and
    /// deduplicated.
    pub fn search(&self, prefix: &str) -> Result<Vec<Descriptor>, Error> {
        let mut node = self.node(self.root)?;
        let mut rest = prefix;

        loop {
            if rest.is_empty() {
                return self.subtree(node);
            }

            if node.collapsed {
                return Ok(node.descriptors);
            }

            let mut next = None;

            for &(label, child) in &node.children {
                if let Some(tail) = rest.strip_prefix(label) {
                    next = Some((child, tail));
                    break;
                }

                if label.starts_with(rest) {
                    return self.subtree(self.node(child)?);
                }
            }

            let Some((child, tail)) = next else {
                return Ok(Vec::new());
            };

            node = self.node(child)?;
            rest = tail;
        }
    }

    fn subtree(&self, node: RawNode<'a>) -> Result<Vec<Descriptor>, Error> {
        let mut output = Vec::new();
        let mut stack = vec![node];

        while let Some(node) = stack.pop() {
            output.extend(node.descriptors);

            for (_, child) in node.children {
                stack.push(self.node(child)?);
            }
        }

        output.sort();
        output.dedup();
        Ok(output)
    }
}
