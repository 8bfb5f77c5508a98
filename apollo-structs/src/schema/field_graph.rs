use std::cmp::Reverse;
use std::fmt::Write;

use apollo_compiler::Name;
use apollo_compiler::ast::Type;
use apollo_compiler::collections::IndexMap;
use apollo_compiler::collections::IndexSet;
use petgraph::graph::DiGraph;
use petgraph::graph::EdgeIndex;
use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;

use super::StructSchema;
use super::TypeDefinition;

/// How one struct-like type reaches another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FieldEdge {
    /// The struct field, or `None` for the edge from a struct union to one of its members.
    pub(crate) field: Option<Name>,
    /// A breaking edge can be left empty when building a value: the field is nullable or a
    /// list. Union membership edges never break.
    pub(crate) breaking: bool,
}

/// The graph of struct and struct union types, with an edge for every field or membership
/// that references another struct-like type. Types of other kinds are not represented.
pub(crate) struct FieldTypeGraph {
    graph: DiGraph<Name, FieldEdge>,
    nodes: IndexMap<Name, NodeIndex>,
    unions: IndexSet<NodeIndex>,
    /// Types for which a finite value exists.
    instantiable: IndexSet<NodeIndex>,
}

/// Only a single non-null named reference forces the referenced value to exist.
fn is_breaking_reference(ty: &Type) -> bool {
    !matches!(ty, Type::NonNullNamed(_))
}

impl FieldTypeGraph {
    pub(crate) fn new(schema: &StructSchema) -> Self {
        let mut graph = DiGraph::new();
        let mut nodes = IndexMap::default();
        let mut unions = IndexSet::default();
        for (name, ty) in &schema.types {
            if ty.kind().is_struct_like() {
                let node = graph.add_node(name.clone());
                nodes.insert(name.clone(), node);
                if matches!(ty, TypeDefinition::StructUnion(_)) {
                    unions.insert(node);
                }
            }
        }

        for ty in schema.types.values() {
            match ty {
                TypeDefinition::Struct(struct_type) => {
                    let Some(&source) = nodes.get(&struct_type.name) else {
                        continue;
                    };
                    for field in struct_type.fields.values() {
                        let Some(&target) = nodes.get(field.ty.inner_named_type()) else {
                            continue;
                        };
                        graph.add_edge(
                            source,
                            target,
                            FieldEdge {
                                field: Some(field.name.clone()),
                                breaking: is_breaking_reference(&field.ty),
                            },
                        );
                    }
                }
                TypeDefinition::StructUnion(union_type) => {
                    let Some(&source) = nodes.get(&union_type.name) else {
                        continue;
                    };
                    let distinct_members: IndexSet<&Name> = union_type.members.iter().collect();
                    for member in &distinct_members {
                        let Some(&target) = nodes.get(*member) else {
                            continue;
                        };
                        graph.add_edge(
                            source,
                            target,
                            FieldEdge {
                                field: None,
                                breaking: false,
                            },
                        );
                    }
                }
                _ => {}
            }
        }

        let mut graph = Self {
            graph,
            nodes,
            unions,
            instantiable: IndexSet::default(),
        };
        graph.instantiable = graph.compute_instantiable();
        graph
    }

    pub(crate) fn node(&self, name: &str) -> Option<NodeIndex> {
        self.nodes.get(name).copied()
    }

    pub(crate) fn is_instantiable(&self, node: NodeIndex) -> bool {
        self.instantiable.contains(&node)
    }

    /// Least fixpoint: a struct is instantiable once every non-breaking field targets an
    /// instantiable type, a union once one of its members is (or when it has no struct
    /// members to pick from).
    fn compute_instantiable(&self) -> IndexSet<NodeIndex> {
        let mut instantiable = IndexSet::default();
        loop {
            let mut changed = false;
            for node in self.graph.node_indices() {
                if instantiable.contains(&node) {
                    continue;
                }
                let mut required = self
                    .graph
                    .edges(node)
                    .filter(|edge| !edge.weight().breaking)
                    .map(|edge| edge.target())
                    .peekable();
                let buildable = if self.unions.contains(&node) {
                    required.peek().is_none()
                        || required.any(|target| instantiable.contains(&target))
                } else {
                    required.all(|target| instantiable.contains(&target))
                };
                if buildable {
                    instantiable.insert(node);
                    changed = true;
                }
            }
            if !changed {
                return instantiable;
            }
        }
    }

    /// Outgoing non-breaking edges into types that cannot be instantiated, ordered so that
    /// popping yields declaration order.
    fn unbreakable_edges(&self, node: NodeIndex) -> Vec<(EdgeIndex, NodeIndex)> {
        let mut edges: Vec<_> = self
            .graph
            .edges(node)
            .filter(|edge| !edge.weight().breaking && !self.is_instantiable(edge.target()))
            .map(|edge| (edge.id(), edge.target()))
            .collect();
        edges.sort_by_key(|(edge, _)| Reverse(edge.index()));
        edges
    }

    /// Returns the edges of an unbreakable cycle when `root` cannot be instantiated.
    ///
    /// Depth-first search from `root` with an explicit stack, along non-breaking edges into
    /// types that cannot be instantiated. Every such type has one of those edges, so the search
    /// always ends on a cycle.
    pub(crate) fn find_unbreakable_cycle(&self, root: NodeIndex) -> Option<Vec<EdgeIndex>> {
        if self.is_instantiable(root) {
            return None;
        }
        let mut acyclic: IndexSet<NodeIndex> = IndexSet::default();
        let mut on_path: IndexSet<NodeIndex> = IndexSet::default();
        let mut path_edges: Vec<EdgeIndex> = vec![];
        let mut stack = vec![(root, self.unbreakable_edges(root))];
        on_path.insert(root);

        loop {
            let Some((node, pending)) = stack.last_mut() else {
                return None;
            };
            let node = *node;
            match pending.pop() {
                Some((edge, target)) => {
                    if acyclic.contains(&target) {
                        continue;
                    }
                    if let Some(position) = on_path.get_index_of(&target) {
                        let mut cycle = path_edges[position..].to_vec();
                        cycle.push(edge);
                        return Some(cycle);
                    }
                    on_path.insert(target);
                    path_edges.push(edge);
                    stack.push((target, self.unbreakable_edges(target)));
                }
                None => {
                    stack.pop();
                    on_path.pop();
                    path_edges.pop();
                    acyclic.insert(node);
                }
            }
        }
    }

    /// Renders a cycle as `A.b -> B.a -> A`.
    pub(crate) fn describe_cycle(&self, cycle: &[EdgeIndex]) -> String {
        let mut out = String::new();
        let mut start = None;
        for edge in cycle {
            let Some((source, _)) = self.graph.edge_endpoints(*edge) else {
                continue;
            };
            start.get_or_insert(source);
            let source_name = &self.graph[source];
            match &self.graph[*edge].field {
                Some(field) => {
                    let _ = write!(out, "{source_name}.{field} -> ");
                }
                None => {
                    let _ = write!(out, "{source_name} -> ");
                }
            }
        }
        if let Some(start) = start {
            out.push_str(&self.graph[start]);
        }
        out
    }
}
