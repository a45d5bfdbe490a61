use std::{
    collections::{HashMap, HashSet},
    fmt,
};

use thiserror::Error;

use crate::{component::Component, key::Key};

/// Index of a component in the container's arena, stable for the
/// container's lifetime.
pub(crate) type ComponentId = usize;

/// Dependency graph over the bound components.
///
/// Built once per container and checked in full before anything is
/// constructed.
#[derive(Debug)]
pub(crate) struct DependencyGraph {
    pub(crate) bindings: HashMap<Key, ComponentId>,
}

impl DependencyGraph {
    /// Indexes every binding key, rejecting keys claimed twice.
    pub(crate) fn new(components: &[Component]) -> Result<Self, GraphErrors> {
        let mut bindings = HashMap::new();
        let mut errors = Vec::new();

        for (id, component) in components.iter().enumerate() {
            for key in component.bindings() {
                if let Some(existing) = bindings.insert(key.clone(), id) {
                    errors.push(GraphError::DuplicateBinding {
                        key: key.clone(),
                        first: components[existing].name().clone(),
                        second: component.name().clone(),
                    });
                }
            }
        }

        if !errors.is_empty() {
            return Err(GraphErrors { errors });
        }
        Ok(DependencyGraph { bindings })
    }

    /// Validates the graph.
    ///
    /// Collects all issues instead of stopping at the first one.
    pub(crate) fn check(&self, components: &[Component]) -> Result<(), GraphErrors> {
        let mut errors = Vec::new();

        for component in components {
            for dependency in component.dependencies() {
                if !self.bindings.contains_key(dependency) {
                    errors.push(GraphError::MissingDependency {
                        dependency: dependency.clone(),
                        dependent: component.name().clone(),
                    });
                }
            }
        }

        let mut checked = HashSet::new();
        for id in 0..components.len() {
            let mut chain = Vec::new();
            check_recurse(self, components, &mut checked, &mut errors, &mut chain, id);
        }

        if !errors.is_empty() {
            return Err(GraphErrors { errors });
        }

        return Ok(());

        fn check_recurse(
            graph: &DependencyGraph,
            components: &[Component],
            checked: &mut HashSet<ComponentId>,
            errors: &mut Vec<GraphError>,
            chain: &mut Vec<ComponentId>,
            id: ComponentId,
        ) {
            // Only a node on the current chain closes a cycle
            if let Some(start) = chain.iter().position(|on_chain| *on_chain == id) {
                let mut cycle: Vec<Key> = chain[start..]
                    .iter()
                    .map(|on_chain| components[*on_chain].name().clone())
                    .collect();
                cycle.push(components[id].name().clone());
                errors.push(GraphError::CircularDependency { cycle });
                return;
            }

            // Already-walked nodes are done; diamonds are not cycles
            if !checked.insert(id) {
                return;
            }

            chain.push(id);
            for dependency in components[id].dependencies() {
                let Some(next) = graph.bindings.get(dependency) else {
                    // Reported by the missing-dependency pass
                    continue;
                };
                check_recurse(graph, components, checked, errors, chain, *next);
            }
            chain.pop();
        }
    }
}

#[derive(Error, Debug, Clone)]
pub enum GraphError {
    #[error("key '{key}' is bound twice: by '{first}' and by '{second}'")]
    DuplicateBinding { key: Key, first: Key, second: Key },
    #[error("'{dependent}' needs '{dependency}' but nothing is bound under that key")]
    MissingDependency { dependency: Key, dependent: Key },
    #[error("circular dependency: {}", join_cycle(.cycle))]
    CircularDependency { cycle: Vec<Key> },
}

fn join_cycle(cycle: &[Key]) -> String {
    cycle.iter().map(Key::as_str).collect::<Vec<_>>().join(" -> ")
}

/// All issues found while validating a component graph.
#[derive(Error, Debug, Clone)]
pub struct GraphErrors {
    pub errors: Vec<GraphError>,
}

impl fmt::Display for GraphErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut display = Vec::new();
        display.push("the component graph has one or more errors:".to_string());
        for error in &self.errors {
            display.push(format!("- {}", error));
        }
        f.write_str(&display.join("\n"))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn component(name: &str, dependencies: &[&str]) -> Component {
        Component::factory(name, |_| async { Ok(()) })
            .depends_on(dependencies.iter().copied())
            .build()
    }

    fn names(cycle: &[Key]) -> Vec<&str> {
        cycle.iter().map(Key::as_str).collect()
    }

    #[test]
    fn accepts_resolved_acyclic_graphs() {
        let components = [
            component("a", &[]),
            component("b", &["a"]),
            component("c", &["a", "b"]),
        ];
        let graph = DependencyGraph::new(&components).unwrap();
        graph.check(&components).unwrap();
    }

    #[test]
    fn rejects_duplicate_bindings() {
        let components = [
            component("a", &[]),
            Component::factory("b", |_| async { Ok(()) }).bind("a").build(),
        ];
        let errors = DependencyGraph::new(&components).unwrap_err().errors;
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            &errors[0],
            GraphError::DuplicateBinding { key, first, second }
                if key.as_str() == "a" && first.as_str() == "a" && second.as_str() == "b"
        ));
    }

    #[test]
    fn reports_missing_dependencies_with_both_sides() {
        let components = [component("a", &["ghost"])];
        let graph = DependencyGraph::new(&components).unwrap();
        let errors = graph.check(&components).unwrap_err().errors;
        assert!(matches!(
            &errors[0],
            GraphError::MissingDependency { dependency, dependent }
                if dependency.as_str() == "ghost" && dependent.as_str() == "a"
        ));
    }

    #[test]
    fn reports_the_full_cycle_path() {
        let components = [component("c", &["d"]), component("d", &["c"])];
        let graph = DependencyGraph::new(&components).unwrap();
        let errors = graph.check(&components).unwrap_err().errors;
        let GraphError::CircularDependency { cycle } = &errors[0] else {
            panic!("expected a cycle, got {:?}", errors);
        };
        assert_eq!(names(cycle), ["c", "d", "c"]);
    }

    #[test]
    fn reports_cycles_through_intermediate_components() {
        let components = [
            component("a", &["b"]),
            component("b", &["c"]),
            component("c", &["a"]),
        ];
        let graph = DependencyGraph::new(&components).unwrap();
        let errors = graph.check(&components).unwrap_err().errors;
        let GraphError::CircularDependency { cycle } = &errors[0] else {
            panic!("expected a cycle, got {:?}", errors);
        };
        assert_eq!(names(cycle), ["a", "b", "c", "a"]);
    }

    #[test]
    fn reports_self_cycles() {
        let components = [component("a", &["a"])];
        let graph = DependencyGraph::new(&components).unwrap();
        let errors = graph.check(&components).unwrap_err().errors;
        let GraphError::CircularDependency { cycle } = &errors[0] else {
            panic!("expected a cycle, got {:?}", errors);
        };
        assert_eq!(names(cycle), ["a", "a"]);
    }

    #[test]
    fn shared_subtrees_are_not_cycles() {
        let components = [
            component("root", &["left", "right"]),
            component("left", &["shared"]),
            component("right", &["shared"]),
            component("shared", &[]),
        ];
        let graph = DependencyGraph::new(&components).unwrap();
        graph.check(&components).unwrap();
    }

    #[test]
    fn collects_every_issue_in_one_pass() {
        let components = [
            component("a", &["ghost"]),
            component("c", &["d"]),
            component("d", &["c"]),
        ];
        let graph = DependencyGraph::new(&components).unwrap();
        let report = graph.check(&components).unwrap_err();
        assert_eq!(report.errors.len(), 2);
        assert!(report.to_string().contains("ghost"));
        assert!(report.to_string().contains("c -> d -> c"));
    }
}
