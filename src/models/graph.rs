//! Relation graph over indexed entities.
//!
//! The graph is a derived view: it is rebuilt from an [`OntologyIndex`] on
//! demand and never mutated independently. Only relations whose target is
//! indexed become edges; dangling targets are reported by the validator.

use crate::index::OntologyIndex;
use crate::models::{EntityId, RelationType};
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::unionfind::UnionFind;
use petgraph::visit::EdgeRef;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

/// Edge payload: the relation that produced the edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationEdge {
    pub relation_type: RelationType,
    pub description: Option<String>,
}

/// Directed multigraph of entity IDs.
#[derive(Debug, Clone, Default)]
pub struct RelationGraph {
    graph: DiGraph<EntityId, RelationEdge>,
    nodes: HashMap<EntityId, NodeIndex>,
}

impl RelationGraph {
    /// Build the graph from every entity in the index.
    pub fn build(index: &OntologyIndex) -> Self {
        let mut graph = DiGraph::with_capacity(index.len(), 0);
        let mut nodes = HashMap::with_capacity(index.len());
        for id in index.ids() {
            nodes.insert(*id, graph.add_node(*id));
        }

        for entity in index.iter() {
            let source = nodes[&entity.id];
            for relation in &entity.relations {
                let Some(target) =
                    EntityId::parse_exact(&relation.target).and_then(|id| nodes.get(&id))
                else {
                    continue;
                };
                graph.add_edge(
                    source,
                    *target,
                    RelationEdge {
                        relation_type: relation.relation_type,
                        description: relation.description.clone(),
                    },
                );
            }
        }

        Self { graph, nodes }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.nodes.contains_key(id)
    }

    /// All edges as `(source, target, payload)`.
    pub fn edges(&self) -> impl Iterator<Item = (EntityId, EntityId, &RelationEdge)> {
        self.graph.edge_references().map(|edge| {
            (
                self.graph[edge.source()],
                self.graph[edge.target()],
                edge.weight(),
            )
        })
    }

    /// Entities reachable within `depth` hops, following edges both ways.
    ///
    /// The start node is never part of the result. Depth 0 or an unknown ID
    /// yields an empty set.
    pub fn neighbors(&self, id: &EntityId, depth: usize) -> BTreeSet<EntityId> {
        let mut found = BTreeSet::new();
        let Some(&start) = self.nodes.get(id) else {
            return found;
        };
        if depth == 0 {
            return found;
        }

        let mut seen = BTreeSet::from([start]);
        let mut queue = VecDeque::from([(start, 0usize)]);
        while let Some((node, hops)) = queue.pop_front() {
            if hops == depth {
                continue;
            }
            for next in self.graph.neighbors_undirected(node) {
                if seen.insert(next) {
                    found.insert(self.graph[next]);
                    queue.push_back((next, hops + 1));
                }
            }
        }
        found
    }

    /// Entities with no incoming or outgoing edges, ordered by ID.
    pub fn isolated_nodes(&self) -> Vec<EntityId> {
        let mut isolated: Vec<EntityId> = self
            .graph
            .node_indices()
            .filter(|&n| {
                self.graph.edges_directed(n, Direction::Outgoing).next().is_none()
                    && self.graph.edges_directed(n, Direction::Incoming).next().is_none()
            })
            .map(|n| self.graph[n])
            .collect();
        isolated.sort();
        isolated
    }

    /// Weakly connected components, each sorted, largest first.
    pub fn components(&self) -> Vec<Vec<EntityId>> {
        let mut sets = UnionFind::<usize>::new(self.graph.node_count());
        for edge in self.graph.edge_references() {
            sets.union(edge.source().index(), edge.target().index());
        }

        let mut groups: BTreeMap<usize, Vec<EntityId>> = BTreeMap::new();
        for node in self.graph.node_indices() {
            groups
                .entry(sets.find(node.index()))
                .or_default()
                .push(self.graph[node]);
        }

        let mut components: Vec<Vec<EntityId>> = groups
            .into_values()
            .map(|mut ids| {
                ids.sort();
                ids
            })
            .collect();
        components.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        components
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Entity, EntityKind};

    fn id(s: &str) -> EntityId {
        s.parse().unwrap()
    }

    fn index_with(edges: &[(&str, &str, RelationType)], ids: &[&str]) -> OntologyIndex {
        let mut index = OntologyIndex::new();
        for raw in ids {
            let id = id(raw);
            let mut entity = Entity::create(id.kind, raw, id).unwrap();
            for (source, target, kind) in edges {
                if source == raw {
                    entity.add_relation(*target, *kind, None);
                }
            }
            index.add(entity).unwrap();
        }
        index
    }

    #[test]
    fn test_build_skips_dangling_targets() {
        let index = index_with(
            &[
                ("C_1", "C_2", RelationType::Requires),
                ("C_1", "C_99", RelationType::Requires),
                ("C_1", "garbage", RelationType::RelatesTo),
            ],
            &["C_1", "C_2"],
        );
        let graph = RelationGraph::build(&index);
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);

        let edges: Vec<_> = graph.edges().collect();
        assert_eq!(edges[0].0, id("C_1"));
        assert_eq!(edges[0].1, id("C_2"));
        assert_eq!(edges[0].2.relation_type, RelationType::Requires);
    }

    #[test]
    fn test_parallel_edges_of_different_types() {
        let index = index_with(
            &[
                ("C_1", "C_2", RelationType::Requires),
                ("C_1", "C_2", RelationType::Enables),
            ],
            &["C_1", "C_2"],
        );
        assert_eq!(RelationGraph::build(&index).edge_count(), 2);
    }

    #[test]
    fn test_neighbors_depth() {
        // C_1 -> C_2 -> C_3 -> C_4, plus M_1 -> C_1
        let index = index_with(
            &[
                ("C_1", "C_2", RelationType::Requires),
                ("C_2", "C_3", RelationType::Requires),
                ("C_3", "C_4", RelationType::Requires),
                ("M_1", "C_1", RelationType::Enables),
            ],
            &["C_1", "C_2", "C_3", "C_4", "M_1"],
        );
        let graph = RelationGraph::build(&index);

        assert_eq!(
            graph.neighbors(&id("C_2"), 1),
            BTreeSet::from([id("C_1"), id("C_3")])
        );
        assert_eq!(
            graph.neighbors(&id("C_2"), 2),
            BTreeSet::from([id("C_1"), id("C_3"), id("C_4"), id("M_1")])
        );
        assert!(!graph.neighbors(&id("C_2"), 10).contains(&id("C_2")));
    }

    #[test]
    fn test_neighbors_depth_zero_and_unknown() {
        let index = index_with(&[("C_1", "C_2", RelationType::Requires)], &["C_1", "C_2"]);
        let graph = RelationGraph::build(&index);
        assert!(graph.neighbors(&id("C_1"), 0).is_empty());
        assert!(graph.neighbors(&id("C_9"), 3).is_empty());
    }

    #[test]
    fn test_neighbors_excludes_start_on_cycle() {
        let index = index_with(
            &[
                ("C_1", "C_2", RelationType::RelatesTo),
                ("C_2", "C_1", RelationType::RelatesTo),
                ("C_1", "C_1", RelationType::SimilarTo),
            ],
            &["C_1", "C_2"],
        );
        let graph = RelationGraph::build(&index);
        assert_eq!(graph.neighbors(&id("C_1"), 3), BTreeSet::from([id("C_2")]));
    }

    #[test]
    fn test_isolated_nodes() {
        let index = index_with(
            &[("C_1", "C_2", RelationType::Requires), ("S_1", "S_1", RelationType::PartOf)],
            &["C_1", "C_2", "C_3", "A_1", "S_1"],
        );
        let graph = RelationGraph::build(&index);
        assert_eq!(graph.isolated_nodes(), vec![id("C_3"), id("A_1")]);
    }

    #[test]
    fn test_components() {
        let index = index_with(
            &[
                ("C_1", "C_2", RelationType::Requires),
                ("C_3", "C_2", RelationType::PartOf),
                ("M_1", "M_2", RelationType::Enables),
            ],
            &["C_1", "C_2", "C_3", "M_1", "M_2", "P_1"],
        );
        let components = RelationGraph::build(&index).components();
        assert_eq!(
            components,
            vec![
                vec![id("C_1"), id("C_2"), id("C_3")],
                vec![id("M_1"), id("M_2")],
                vec![id("P_1")],
            ]
        );
    }

    #[test]
    fn test_empty_graph() {
        let graph = RelationGraph::build(&OntologyIndex::new());
        assert_eq!(graph.node_count(), 0);
        assert!(graph.components().is_empty());
        assert!(graph.isolated_nodes().is_empty());
        assert!(!graph.contains(&EntityId::new(EntityKind::Concept, 1).unwrap()));
    }
}
