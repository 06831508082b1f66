//! A directed graph, with the dominator and loop computations the analyses
//! need.

use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::Error;

pub trait Vertex: Clone {
    /// The index of this vertex.
    fn index(&self) -> usize;
}

pub trait Edge: Clone {
    /// The index of the head vertex.
    fn head(&self) -> usize;
    /// The index of the tail vertex.
    fn tail(&self) -> usize;
}

/// A natural loop.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Loop {
    header: usize,
    nodes: BTreeSet<usize>,
}

impl Loop {
    pub fn new(header: usize, nodes: BTreeSet<usize>) -> Loop {
        Loop { header, nodes }
    }

    /// The loop header node
    pub fn header(&self) -> usize {
        self.header
    }

    /// The set of nodes part of this loop, header included.
    pub fn nodes(&self) -> &BTreeSet<usize> {
        &self.nodes
    }

    pub fn contains(&self, index: usize) -> bool {
        self.nodes.contains(&index)
    }
}

impl fmt::Display for Loop {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let nodes: Vec<String> = self.nodes.iter().map(|n| n.to_string()).collect();
        write!(f, "Loop {}: {{{}}}", self.header, nodes.join(", "))
    }
}

/// A directed graph.
#[derive(Clone, Debug)]
pub struct Graph<V: Vertex, E: Edge> {
    vertices: BTreeMap<usize, V>,
    edges: BTreeMap<(usize, usize), E>,
    successors: BTreeMap<usize, BTreeSet<usize>>,
    predecessors: BTreeMap<usize, BTreeSet<usize>>,
}

impl<V: Vertex, E: Edge> Default for Graph<V, E> {
    fn default() -> Graph<V, E> {
        Graph::new()
    }
}

impl<V, E> Graph<V, E>
where
    V: Vertex,
    E: Edge,
{
    pub fn new() -> Graph<V, E> {
        Graph {
            vertices: BTreeMap::new(),
            edges: BTreeMap::new(),
            successors: BTreeMap::new(),
            predecessors: BTreeMap::new(),
        }
    }

    pub fn has_vertex(&self, index: usize) -> bool {
        self.vertices.contains_key(&index)
    }

    pub fn has_edge(&self, head: usize, tail: usize) -> bool {
        self.edges.contains_key(&(head, tail))
    }

    /// Inserts a vertex into the graph.
    /// # Errors
    /// Error if the vertex already exists by index.
    pub fn insert_vertex(&mut self, v: V) -> Result<(), Error> {
        let index = v.index();
        if self.vertices.contains_key(&index) {
            return Err(format!("duplicate vertex index {}", index).into());
        }
        self.vertices.insert(index, v);
        self.successors.insert(index, BTreeSet::new());
        self.predecessors.insert(index, BTreeSet::new());
        Ok(())
    }

    /// Inserts an edge into the graph.
    /// # Errors
    /// Error if the edge already exists, or if one of its vertices does not.
    pub fn insert_edge(&mut self, edge: E) -> Result<(), Error> {
        let (head, tail) = (edge.head(), edge.tail());
        if self.edges.contains_key(&(head, tail)) {
            return Err(format!("duplicate edge {} -> {}", head, tail).into());
        }
        if !self.has_vertex(tail) {
            return Err(Error::GraphVertexNotFound(tail));
        }
        match self.successors.get_mut(&head) {
            Some(successors) => successors.insert(tail),
            None => return Err(Error::GraphVertexNotFound(head)),
        };
        if let Some(predecessors) = self.predecessors.get_mut(&tail) {
            predecessors.insert(head);
        }
        self.edges.insert((head, tail), edge);
        Ok(())
    }

    /// Returns the indices of all immediate successors of a vertex.
    pub fn successor_indices(&self, index: usize) -> Result<Vec<usize>, Error> {
        self.successors
            .get(&index)
            .map(|successors| successors.iter().cloned().collect())
            .ok_or(Error::GraphVertexNotFound(index))
    }

    /// Returns the indices of all immediate predecessors of a vertex.
    pub fn predecessor_indices(&self, index: usize) -> Result<Vec<usize>, Error> {
        self.predecessors
            .get(&index)
            .map(|predecessors| predecessors.iter().cloned().collect())
            .ok_or(Error::GraphVertexNotFound(index))
    }

    /// Computes the set of vertices reachable from the given index.
    pub fn reachable_vertices(&self, index: usize) -> Result<FxHashSet<usize>, Error> {
        if !self.has_vertex(index) {
            return Err(Error::GraphVertexNotFound(index));
        }

        let mut reachable: FxHashSet<usize> = FxHashSet::default();
        let mut queue: Vec<usize> = vec![index];
        reachable.insert(index);

        while let Some(vertex) = queue.pop() {
            for &successor in &self.successors[&vertex] {
                if reachable.insert(successor) {
                    queue.push(successor);
                }
            }
        }

        Ok(reachable)
    }

    /// Post order of the vertices reachable from `root`. Successors are
    /// visited by increasing index.
    pub fn compute_post_order(&self, root: usize) -> Result<Vec<usize>, Error> {
        if !self.has_vertex(root) {
            return Err(Error::GraphVertexNotFound(root));
        }

        let mut visited: FxHashSet<usize> = FxHashSet::default();
        let mut order: Vec<usize> = Vec::new();
        // (vertex, position of the next successor to visit)
        let mut stack: Vec<(usize, usize)> = vec![(root, 0)];
        visited.insert(root);

        while let Some(top) = stack.last_mut() {
            let (node, position) = *top;
            top.1 += 1;
            match self.successors[&node].iter().nth(position) {
                Some(&successor) => {
                    if visited.insert(successor) {
                        stack.push((successor, 0));
                    }
                }
                None => {
                    order.push(node);
                    stack.pop();
                }
            }
        }

        Ok(order)
    }

    /// Reverse post order of the vertices reachable from `root`.
    pub fn compute_reverse_post_order(&self, root: usize) -> Result<Vec<usize>, Error> {
        let mut order = self.compute_post_order(root)?;
        order.reverse();
        Ok(order)
    }

    /// Computes the immediate dominator of every vertex reachable from `root`,
    /// `root` excepted.
    ///
    /// Iterative algorithm of Cooper, Harvey and Kennedy, "A Simple, Fast
    /// Dominance Algorithm".
    pub fn compute_immediate_dominators(
        &self,
        root: usize,
    ) -> Result<FxHashMap<usize, usize>, Error> {
        let post_order = self.compute_post_order(root)?;
        let number: FxHashMap<usize, usize> = post_order
            .iter()
            .enumerate()
            .map(|(number, vertex)| (*vertex, number))
            .collect();

        let mut idoms: FxHashMap<usize, usize> = FxHashMap::default();
        idoms.insert(root, root);

        let intersect = |idoms: &FxHashMap<usize, usize>, mut a: usize, mut b: usize| {
            while a != b {
                while number[&a] < number[&b] {
                    a = idoms[&a];
                }
                while number[&b] < number[&a] {
                    b = idoms[&b];
                }
            }
            a
        };

        let mut changed = true;
        while changed {
            changed = false;
            for &vertex in post_order.iter().rev().skip(1) {
                let mut new_idom: Option<usize> = None;
                for &predecessor in &self.predecessors[&vertex] {
                    if !idoms.contains_key(&predecessor) {
                        continue;
                    }
                    new_idom = Some(match new_idom {
                        None => predecessor,
                        Some(idom) => intersect(&idoms, predecessor, idom),
                    });
                }
                if let Some(idom) = new_idom {
                    if idoms.get(&vertex) != Some(&idom) {
                        idoms.insert(vertex, idom);
                        changed = true;
                    }
                }
            }
        }

        idoms.remove(&root);
        Ok(idoms)
    }

    /// Computes the dominators of every vertex reachable from `root`.
    pub fn compute_dominators(
        &self,
        root: usize,
    ) -> Result<FxHashMap<usize, FxHashSet<usize>>, Error> {
        let idoms = self.compute_immediate_dominators(root)?;
        let mut dominators: FxHashMap<usize, FxHashSet<usize>> = FxHashMap::default();

        for vertex in self.compute_reverse_post_order(root)? {
            let mut doms = match idoms.get(&vertex) {
                Some(idom) => dominators[idom].clone(),
                None => FxHashSet::default(),
            };
            doms.insert(vertex);
            dominators.insert(vertex, doms);
        }

        Ok(dominators)
    }

    /// Edges whose tail dominates their head.
    pub fn compute_back_edges(&self, root: usize) -> Result<FxHashSet<(usize, usize)>, Error> {
        let mut back_edges: FxHashSet<(usize, usize)> = FxHashSet::default();

        for (node, dominators) in self.compute_dominators(root)? {
            for successor in &self.successors[&node] {
                if dominators.contains(successor) {
                    back_edges.insert((node, *successor));
                }
            }
        }

        Ok(back_edges)
    }

    /// Computes the natural loops of the graph. Loops sharing a header are
    /// merged.
    pub fn compute_loops(&self, root: usize) -> Result<Vec<Loop>, Error> {
        let mut loops: BTreeMap<usize, BTreeSet<usize>> = BTreeMap::new();

        for (tail, header) in self.compute_back_edges(root)? {
            let nodes = loops.entry(header).or_default();
            nodes.insert(header);

            let mut queue: Vec<usize> = Vec::new();
            if nodes.insert(tail) {
                queue.push(tail);
            }
            while let Some(node) = queue.pop() {
                for &predecessor in &self.predecessors[&node] {
                    if nodes.insert(predecessor) {
                        queue.push(predecessor);
                    }
                }
            }
        }

        Ok(loops
            .into_iter()
            .map(|(header, nodes)| Loop::new(header, nodes))
            .collect())
    }

    /// Returns all vertices in the graph.
    pub fn vertices(&self) -> Vec<&V> {
        self.vertices.values().collect()
    }

    pub fn vertex(&self, index: usize) -> Result<&V, Error> {
        self.vertices
            .get(&index)
            .ok_or(Error::GraphVertexNotFound(index))
    }

    pub fn vertex_mut(&mut self, index: usize) -> Result<&mut V, Error> {
        self.vertices
            .get_mut(&index)
            .ok_or(Error::GraphVertexNotFound(index))
    }

    pub fn edge(&self, head: usize, tail: usize) -> Result<&E, Error> {
        self.edges
            .get(&(head, tail))
            .ok_or(Error::GraphEdgeNotFound(head, tail))
    }

    pub fn edge_mut(&mut self, head: usize, tail: usize) -> Result<&mut E, Error> {
        self.edges
            .get_mut(&(head, tail))
            .ok_or(Error::GraphEdgeNotFound(head, tail))
    }

    /// Get a reference to every `Edge` in the `Graph`.
    pub fn edges(&self) -> Vec<&E> {
        self.edges.values().collect()
    }

    /// Return all edges out for a vertex
    pub fn edges_out(&self, index: usize) -> Result<Vec<&E>, Error> {
        self.successors
            .get(&index)
            .map(|succs| {
                succs
                    .iter()
                    .map(|succ| &self.edges[&(index, *succ)])
                    .collect()
            })
            .ok_or(Error::GraphVertexNotFound(index))
    }

    /// Return all edges in for a vertex
    pub fn edges_in(&self, index: usize) -> Result<Vec<&E>, Error> {
        self.predecessors
            .get(&index)
            .map(|preds| {
                preds
                    .iter()
                    .map(|pred| &self.edges[&(*pred, index)])
                    .collect()
            })
            .ok_or(Error::GraphVertexNotFound(index))
    }
}
