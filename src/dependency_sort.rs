// Copyright 2025 Cowboy AI, LLC.

//! Mixin grouping and ordering
//!
//! Mixins connected by dependencies (in either direction) form a cluster.
//! Each cluster is sorted topologically so that a mixin comes before every
//! mixin it requires; ties keep declaration order. Clusters are then ordered
//! by the full name of their first mixin and concatenated.
//!
//! ```mermaid
//! graph LR
//!     A[Tracing] -->|requires| B[Caching]
//!     B -->|requires| C[Persistence]
//!     D[Audit] -->|requires| E[Clock]
//!     subgraph cluster 1
//!         D
//!         E
//!     end
//!     subgraph cluster 2
//!         A
//!         B
//!         C
//!     end
//! ```

use std::collections::BTreeSet;
use tracing::debug;

use crate::context::MixinEntry;
use crate::errors::{ConfigurationError, ConfigurationResult};
use crate::types::{Ascription, TypeId, TypeIntrospector};

/// A mixin as seen by the sorter
pub trait DependencyNode {
    /// The mixin type
    fn mixin_type(&self) -> TypeId;

    /// Dependencies configured on the mixin entry
    fn explicit_dependencies(&self) -> Vec<TypeId>;

    /// Interfaces the mixin calls on the next element of the chain
    fn next_call_dependencies(&self) -> Vec<TypeId>;
}

impl DependencyNode for MixinEntry {
    fn mixin_type(&self) -> TypeId {
        MixinEntry::mixin_type(self)
    }

    fn explicit_dependencies(&self) -> Vec<TypeId> {
        MixinEntry::explicit_dependencies(self).collect()
    }

    fn next_call_dependencies(&self) -> Vec<TypeId> {
        Vec::new()
    }
}

impl<T: DependencyNode + ?Sized> DependencyNode for &T {
    fn mixin_type(&self) -> TypeId {
        (**self).mixin_type()
    }

    fn explicit_dependencies(&self) -> Vec<TypeId> {
        (**self).explicit_dependencies()
    }

    fn next_call_dependencies(&self) -> Vec<TypeId> {
        (**self).next_call_dependencies()
    }
}

/// Orders the mixins of one target
pub struct MixinDependencySorter<'a> {
    types: &'a dyn TypeIntrospector,
}

impl<'a> MixinDependencySorter<'a> {
    /// Create a sorter over a type graph
    pub fn new(types: &'a dyn TypeIntrospector) -> Self {
        Self { types }
    }

    /// Whether `dependent` requires `provider`
    pub fn requires(&self, dependent: &dyn DependencyNode, provider: &dyn DependencyNode) -> bool {
        let provided = provider.mixin_type();
        if dependent.mixin_type() == provided {
            return false;
        }

        let explicit = dependent.explicit_dependencies().into_iter().any(|dependency| {
            !dependency.is_root()
                && (Ascription::of(self.types, provided, dependency).is_related()
                    || self.types.is_assignable_from(dependency, provided))
        });

        explicit
            || dependent
                .next_call_dependencies()
                .into_iter()
                .any(|iface| !iface.is_root() && self.types.is_assignable_from(iface, provided))
    }

    /// Partition mixins into clusters of connected mixins
    ///
    /// Clusters hold declaration indices in ascending order and are listed
    /// by their smallest index.
    pub fn group<T: DependencyNode>(&self, mixins: &[T]) -> Vec<Vec<usize>> {
        let edges = self.edges(mixins);
        let mut parent: Vec<usize> = (0..mixins.len()).collect();

        fn find(parent: &mut [usize], mut node: usize) -> usize {
            while parent[node] != node {
                parent[node] = parent[parent[node]];
                node = parent[node];
            }
            node
        }

        for (from, targets) in edges.iter().enumerate() {
            for &to in targets {
                let a = find(&mut parent, from);
                let b = find(&mut parent, to);
                if a != b {
                    parent[a.max(b)] = a.min(b);
                }
            }
        }

        let mut clusters: Vec<Vec<usize>> = Vec::new();
        let mut cluster_of_root: Vec<Option<usize>> = vec![None; mixins.len()];
        for node in 0..mixins.len() {
            let root = find(&mut parent, node);
            match cluster_of_root[root] {
                Some(cluster) => clusters[cluster].push(node),
                None => {
                    cluster_of_root[root] = Some(clusters.len());
                    clusters.push(vec![node]);
                }
            }
        }
        clusters
    }

    /// Final order of the mixins of `target`
    ///
    /// Fails with the first cyclic subset found, named in declaration order.
    pub fn order<T: DependencyNode>(&self, target: TypeId, mixins: Vec<T>) -> ConfigurationResult<Vec<T>> {
        let edges = self.edges(&mixins);
        let clusters = self.group(&mixins);

        let mut sorted_clusters = Vec::with_capacity(clusters.len());
        for cluster in &clusters {
            sorted_clusters.push(self.sort_cluster(target, cluster, &edges, &mixins)?);
        }

        sorted_clusters.sort_by(|a, b| {
            let name_a = self.types.full_name(mixins[a[0]].mixin_type());
            let name_b = self.types.full_name(mixins[b[0]].mixin_type());
            name_a.cmp(name_b)
        });

        debug!(
            "Ordered {} mixin(s) of {} in {} cluster(s)",
            mixins.len(),
            self.types.full_name(target),
            sorted_clusters.len()
        );

        let mut slots: Vec<Option<T>> = mixins.into_iter().map(Some).collect();
        Ok(sorted_clusters
            .into_iter()
            .flatten()
            .filter_map(|index| slots[index].take())
            .collect())
    }

    fn edges<T: DependencyNode>(&self, mixins: &[T]) -> Vec<Vec<usize>> {
        mixins
            .iter()
            .map(|dependent| {
                mixins
                    .iter()
                    .enumerate()
                    .filter(|(_, provider)| self.requires(dependent, *provider))
                    .map(|(index, _)| index)
                    .collect()
            })
            .collect()
    }

    fn sort_cluster<T: DependencyNode>(
        &self,
        target: TypeId,
        cluster: &[usize],
        edges: &[Vec<usize>],
        mixins: &[T],
    ) -> ConfigurationResult<Vec<usize>> {
        let mut in_degree = vec![0usize; mixins.len()];
        for &node in cluster {
            for &required in &edges[node] {
                in_degree[required] += 1;
            }
        }

        let mut ready: BTreeSet<usize> = cluster
            .iter()
            .copied()
            .filter(|&node| in_degree[node] == 0)
            .collect();
        let mut sorted = Vec::with_capacity(cluster.len());

        while let Some(node) = ready.pop_first() {
            sorted.push(node);
            for &required in &edges[node] {
                in_degree[required] -= 1;
                if in_degree[required] == 0 {
                    ready.insert(required);
                }
            }
        }

        if sorted.len() < cluster.len() {
            let remaining: Vec<usize> = cluster
                .iter()
                .copied()
                .filter(|node| !sorted.contains(node))
                .collect();
            let cycle = first_cycle(&remaining, edges);
            return Err(ConfigurationError::CircularDependency {
                target: self.types.full_name(target).to_string(),
                cycle: cycle
                    .into_iter()
                    .map(|node| self.types.full_name(mixins[node].mixin_type()).to_string())
                    .collect(),
            });
        }

        debug!(
            "Sorted cluster of {} mixin(s) starting with {}",
            sorted.len(),
            self.types.full_name(mixins[sorted[0]].mixin_type())
        );
        Ok(sorted)
    }
}

/// Strongly connected component with more than one node that contains the
/// smallest declaration index, in ascending index order
fn first_cycle(nodes: &[usize], edges: &[Vec<usize>]) -> Vec<usize> {
    struct Tarjan<'e> {
        edges: &'e [Vec<usize>],
        allowed: Vec<bool>,
        index: Vec<Option<usize>>,
        low: Vec<usize>,
        on_stack: Vec<bool>,
        stack: Vec<usize>,
        counter: usize,
        components: Vec<Vec<usize>>,
    }

    impl Tarjan<'_> {
        fn visit(&mut self, node: usize) {
            self.index[node] = Some(self.counter);
            self.low[node] = self.counter;
            self.counter += 1;
            self.stack.push(node);
            self.on_stack[node] = true;

            let edges = self.edges;
            for &next in &edges[node] {
                if !self.allowed[next] {
                    continue;
                }
                match self.index[next] {
                    None => {
                        self.visit(next);
                        self.low[node] = self.low[node].min(self.low[next]);
                    }
                    Some(next_index) if self.on_stack[next] => {
                        self.low[node] = self.low[node].min(next_index);
                    }
                    Some(_) => {}
                }
            }

            if Some(self.low[node]) == self.index[node] {
                let mut component = Vec::new();
                while let Some(member) = self.stack.pop() {
                    self.on_stack[member] = false;
                    component.push(member);
                    if member == node {
                        break;
                    }
                }
                self.components.push(component);
            }
        }
    }

    let size = edges.len();
    let mut allowed = vec![false; size];
    for &node in nodes {
        allowed[node] = true;
    }
    let mut tarjan = Tarjan {
        edges,
        allowed,
        index: vec![None; size],
        low: vec![0; size],
        on_stack: vec![false; size],
        stack: Vec::new(),
        counter: 0,
        components: Vec::new(),
    };
    for &node in nodes {
        if tarjan.index[node].is_none() {
            tarjan.visit(node);
        }
    }

    let mut cycles: Vec<Vec<usize>> = tarjan
        .components
        .into_iter()
        .filter(|component| component.len() > 1)
        .map(|mut component| {
            component.sort_unstable();
            component
        })
        .collect();
    cycles.sort();
    // Nodes left over by Kahn's algorithm always include a cycle
    cycles.into_iter().next().unwrap_or_else(|| nodes.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TypeDecl, TypeUniverse};
    use pretty_assertions::assert_eq;

    #[derive(Debug)]
    struct Node {
        ty: TypeId,
        explicit: Vec<TypeId>,
        next_call: Vec<TypeId>,
    }

    impl DependencyNode for Node {
        fn mixin_type(&self) -> TypeId {
            self.ty
        }

        fn explicit_dependencies(&self) -> Vec<TypeId> {
            self.explicit.clone()
        }

        fn next_call_dependencies(&self) -> Vec<TypeId> {
            self.next_call.clone()
        }
    }

    fn node(ty: TypeId, explicit: &[TypeId]) -> Node {
        Node {
            ty,
            explicit: explicit.to_vec(),
            next_call: Vec::new(),
        }
    }

    fn names(types: &TypeUniverse, nodes: &[Node]) -> Vec<String> {
        nodes.iter().map(|n| types.full_name(n.ty).to_string()).collect()
    }

    #[test]
    fn test_dependents_come_first() {
        let mut types = TypeUniverse::new();
        let target = types.declare(TypeDecl::class("app::Target"));
        let a = types.declare(TypeDecl::class("app::A"));
        let b = types.declare(TypeDecl::class("app::B"));
        let c = types.declare(TypeDecl::class("app::C"));

        let sorter = MixinDependencySorter::new(&types);
        let ordered = sorter
            .order(target, vec![node(c, &[]), node(b, &[c]), node(a, &[b])])
            .unwrap();
        assert_eq!(names(&types, &ordered), vec!["app::A", "app::B", "app::C"]);
    }

    #[test]
    fn test_next_call_dependency_matches_implementing_mixin() {
        let mut types = TypeUniverse::new();
        let target = types.declare(TypeDecl::class("app::Target"));
        let store = types.declare(TypeDecl::interface("app::IStore"));
        let caching = types.declare(TypeDecl::class("app::Caching"));
        let persistence = types.declare(TypeDecl::class("app::Persistence").implements(store));

        let sorter = MixinDependencySorter::new(&types);
        let caching_node = Node {
            ty: caching,
            explicit: Vec::new(),
            next_call: vec![store],
        };
        assert!(sorter.requires(&caching_node, &node(persistence, &[])));

        let ordered = sorter
            .order(target, vec![node(persistence, &[]), caching_node])
            .unwrap();
        assert_eq!(names(&types, &ordered), vec!["app::Caching", "app::Persistence"]);
    }

    #[test]
    fn test_root_dependencies_do_not_connect() {
        let mut types = TypeUniverse::new();
        let a = types.declare(TypeDecl::class("app::A"));
        let b = types.declare(TypeDecl::class("app::B"));

        let sorter = MixinDependencySorter::new(&types);
        assert!(!sorter.requires(&node(a, &[TypeId::ROOT]), &node(b, &[])));
    }

    #[test]
    fn test_group_collects_connected_mixins() {
        let mut types = TypeUniverse::new();
        let a = types.declare(TypeDecl::class("app::A"));
        let b = types.declare(TypeDecl::class("app::B"));
        let c = types.declare(TypeDecl::class("app::C"));
        let d = types.declare(TypeDecl::class("app::D"));

        let sorter = MixinDependencySorter::new(&types);
        let clusters = sorter.group(&[node(a, &[]), node(b, &[]), node(c, &[a]), node(d, &[b])]);
        assert_eq!(clusters, vec![vec![0, 2], vec![1, 3]]);
    }

    #[test]
    fn test_ties_keep_declaration_order() {
        let mut types = TypeUniverse::new();
        let target = types.declare(TypeDecl::class("app::Target"));
        let shared = types.declare(TypeDecl::class("app::Shared"));
        let z = types.declare(TypeDecl::class("app::Z"));
        let y = types.declare(TypeDecl::class("app::Y"));

        let sorter = MixinDependencySorter::new(&types);
        let ordered = sorter
            .order(target, vec![node(z, &[shared]), node(shared, &[]), node(y, &[shared])])
            .unwrap();
        assert_eq!(names(&types, &ordered), vec!["app::Z", "app::Y", "app::Shared"]);
    }

    #[test]
    fn test_cycle_reports_only_cyclic_subset() {
        let mut types = TypeUniverse::new();
        let target = types.declare(TypeDecl::class("app::Target"));
        let a = types.declare(TypeDecl::class("app::A"));
        let b = types.declare(TypeDecl::class("app::B"));
        let c = types.declare(TypeDecl::class("app::C"));

        let sorter = MixinDependencySorter::new(&types);
        let err = sorter
            .order(target, vec![node(c, &[a]), node(a, &[b]), node(b, &[a])])
            .unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::CircularDependency {
                target: "app::Target".to_string(),
                cycle: vec!["app::A".to_string(), "app::B".to_string()],
            }
        );
    }

    #[test]
    fn test_sorting_mixin_entries_directly() {
        let mut types = TypeUniverse::new();
        let target = types.declare(TypeDecl::class("app::Target"));
        let logging = types.declare(TypeDecl::class("app::Logging"));
        let clock = types.declare(TypeDecl::class("app::Clock"));

        let sorter = MixinDependencySorter::new(&types);
        let ordered = sorter
            .order(
                target,
                vec![MixinEntry::used(clock), MixinEntry::used(logging).with_dependency(clock)],
            )
            .unwrap();
        let order: Vec<_> = ordered.iter().map(|e| e.mixin_type()).collect();
        assert_eq!(order, vec![logging, clock]);
    }
}
