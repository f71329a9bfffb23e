//! Dependency planner
//!
//! Orders an unordered change-set so that base devices are built before the
//! interfaces layered on them, and dependents are torn down before their
//! base devices. The base-iface relation is modelled as an explicit
//! directed graph with a stable topological sort; a cycle in the relation
//! is a user-configuration error, never a plan.

use crate::diff::{ChangeSet, Operation};
use crate::error::{NetstateError, NetstateResult};
use std::collections::HashMap;
use tracing::debug;

/// Directed dependency graph over interface names, edge base -> dependent
///
/// Nodes are indexed in first-appearance order, which is what makes the
/// sort stable and the plan deterministic.
struct DependencyGraph {
    names: Vec<String>,
    index: HashMap<String, usize>,
    /// adjacency: edges[base] = dependents
    edges: Vec<Vec<usize>>,
    in_degree: Vec<usize>,
}

impl DependencyGraph {
    fn new() -> Self {
        Self {
            names: Vec::new(),
            index: HashMap::new(),
            edges: Vec::new(),
            in_degree: Vec::new(),
        }
    }

    fn node(&mut self, name: &str) -> usize {
        if let Some(&i) = self.index.get(name) {
            return i;
        }
        let i = self.names.len();
        self.names.push(name.to_string());
        self.index.insert(name.to_string(), i);
        self.edges.push(Vec::new());
        self.in_degree.push(0);
        i
    }

    fn edge(&mut self, base: &str, dependent: &str) {
        let from = self.node(base);
        let to = self.node(dependent);
        self.edges[from].push(to);
        self.in_degree[to] += 1;
    }

    /// Kahn's algorithm with input-order tie-break. Returns the topological
    /// rank per name (base strictly below dependent), or the names stuck on
    /// a cycle.
    fn topo_rank(&self) -> Result<HashMap<String, usize>, Vec<String>> {
        let n = self.names.len();
        let mut in_degree = self.in_degree.clone();
        let mut done = vec![false; n];
        let mut rank = HashMap::with_capacity(n);

        for next_rank in 0..n {
            // Lowest input index among ready nodes keeps ties deterministic
            let ready = (0..n).find(|&i| !done[i] && in_degree[i] == 0);
            let Some(i) = ready else {
                let cycle: Vec<String> = (0..n)
                    .filter(|&i| !done[i])
                    .map(|i| self.names[i].clone())
                    .collect();
                return Err(cycle);
            };
            done[i] = true;
            rank.insert(self.names[i].clone(), next_rank);
            for &dep in &self.edges[i] {
                in_degree[dep] -= 1;
            }
        }

        Ok(rank)
    }
}

/// Order a change-set along the base-iface dependency graph
///
/// Teardown operations (deactivate, delete) come first, dependents before
/// their bases; buildup operations (create, modify, activate) follow, bases
/// before their dependents. Independent interfaces keep their input order.
pub fn order(changeset: &ChangeSet) -> NetstateResult<ChangeSet> {
    let mut graph = DependencyGraph::new();
    for op in &changeset.ops {
        graph.node(&op.iface.name);
        if let Some(base) = &op.iface.base_iface {
            graph.edge(base, &op.iface.name);
        }
    }

    let rank = graph
        .topo_rank()
        .map_err(|cycle| NetstateError::CyclicDependency { cycle })?;

    let mut teardown: Vec<(usize, &Operation)> = Vec::new();
    let mut buildup: Vec<(usize, &Operation)> = Vec::new();
    for (idx, op) in changeset.ops.iter().enumerate() {
        if op.is_creation_direction() {
            buildup.push((idx, op));
        } else {
            teardown.push((idx, op));
        }
    }

    // Dependents (higher rank) torn down first; ties stay in input order
    teardown.sort_by_key(|(idx, op)| (std::cmp::Reverse(rank[&op.iface.name]), *idx));
    buildup.sort_by_key(|(idx, op)| (rank[&op.iface.name], *idx));

    let ops: Vec<Operation> = teardown
        .into_iter()
        .chain(buildup)
        .map(|(_, op)| op.clone())
        .collect();

    debug!("plan: {} operation(s): {:?}",
        ops.len(),
        ops.iter().map(|o| o.describe()).collect::<Vec<_>>()
    );

    Ok(ChangeSet { ops })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::OperationKind;
    use crate::state::{AdminState, InterfaceState, InterfaceType};

    fn create(iface: InterfaceState) -> Operation {
        Operation::new(OperationKind::Create, iface)
    }

    fn eth(name: &str) -> InterfaceState {
        InterfaceState::new(name, InterfaceType::Ethernet, AdminState::Up)
    }

    fn names(changeset: &ChangeSet) -> Vec<String> {
        changeset.ops.iter().map(|o| o.iface.name.clone()).collect()
    }

    #[test]
    fn test_base_created_before_dependent() {
        let bond = InterfaceState::new("bond0", InterfaceType::Bond, AdminState::Up);
        let vlan = InterfaceState::vlan("bond0", 10);
        let changeset = ChangeSet { ops: vec![create(vlan), create(bond)] };
        let ordered = order(&changeset).unwrap();
        assert_eq!(names(&ordered), vec!["bond0", "bond0.10"]);
    }

    #[test]
    fn test_dependent_deleted_before_base() {
        let bond = InterfaceState::new("bond0", InterfaceType::Bond, AdminState::Up);
        let vlan = InterfaceState::vlan("bond0", 10);
        let changeset = ChangeSet {
            ops: vec![
                Operation::new(OperationKind::Delete, bond),
                Operation::new(OperationKind::Delete, vlan),
            ],
        };
        let ordered = order(&changeset).unwrap();
        assert_eq!(names(&ordered), vec!["bond0.10", "bond0"]);
    }

    #[test]
    fn test_teardown_precedes_buildup() {
        let old = InterfaceState::vlan("eth1", 101);
        let new = InterfaceState::vlan("eth1", 102);
        let changeset = ChangeSet {
            ops: vec![
                create(new),
                Operation::new(OperationKind::Deactivate, old.clone()),
                Operation::new(OperationKind::Delete, old),
            ],
        };
        let ordered = order(&changeset).unwrap();
        let kinds: Vec<_> = ordered.ops.iter().map(|o| o.kind).collect();
        assert_eq!(
            kinds,
            vec![OperationKind::Deactivate, OperationKind::Delete, OperationKind::Create]
        );
    }

    #[test]
    fn test_independent_interfaces_keep_input_order() {
        let changeset = ChangeSet {
            ops: vec![create(eth("eth2")), create(eth("eth0")), create(eth("eth1"))],
        };
        let ordered = order(&changeset).unwrap();
        assert_eq!(names(&ordered), vec!["eth2", "eth0", "eth1"]);
    }

    #[test]
    fn test_deterministic_for_same_input() {
        let bond = InterfaceState::new("bond0", InterfaceType::Bond, AdminState::Up);
        let changeset = ChangeSet {
            ops: vec![
                create(InterfaceState::vlan("bond0", 20)),
                create(InterfaceState::vlan("bond0", 10)),
                create(bond),
            ],
        };
        let first = order(&changeset).unwrap();
        let second = order(&changeset).unwrap();
        assert_eq!(first, second);
        assert_eq!(names(&first), vec!["bond0", "bond0.20", "bond0.10"]);
    }

    #[test]
    fn test_chain_is_fully_ordered() {
        // bridge on vlan on bond
        let bond = InterfaceState::new("bond0", InterfaceType::Bond, AdminState::Up);
        let vlan = InterfaceState::vlan("bond0", 10);
        let mut bridge = InterfaceState::new("br0", InterfaceType::Bridge, AdminState::Up);
        bridge.base_iface = Some("bond0.10".to_string());
        let changeset = ChangeSet {
            ops: vec![create(bridge), create(bond), create(vlan)],
        };
        let ordered = order(&changeset).unwrap();
        assert_eq!(names(&ordered), vec!["bond0", "bond0.10", "br0"]);
    }

    #[test]
    fn test_cycle_yields_error() {
        let mut a = eth("a");
        a.base_iface = Some("b".to_string());
        let mut b = eth("b");
        b.base_iface = Some("a".to_string());
        let changeset = ChangeSet { ops: vec![create(a), create(b)] };
        match order(&changeset) {
            Err(NetstateError::CyclicDependency { cycle }) => {
                assert!(cycle.contains(&"a".to_string()));
                assert!(cycle.contains(&"b".to_string()));
            }
            other => panic!("expected CyclicDependency, got {:?}", other.map(|c| c.len())),
        }
    }

    #[test]
    fn test_base_outside_changeset_imposes_no_constraint() {
        // eth1 exists on the system already; only the vlan is planned
        let changeset = ChangeSet { ops: vec![create(InterfaceState::vlan("eth1", 101))] };
        let ordered = order(&changeset).unwrap();
        assert_eq!(names(&ordered), vec!["eth1.101"]);
    }
}
