//! Test utilities for property-based testing
//!
//! This module provides generators and helpers for proptest.

#[cfg(test)]
pub mod generators {
    use proptest::prelude::*;

    /// A package graph as `(name, dependencies)` pairs
    pub type Graph = Vec<(String, Vec<String>)>;

    /// Generate a valid package name (lowercase alphanumeric with hyphens)
    pub fn package_name() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9-]{0,30}[a-z0-9]?".prop_filter("Name must not be empty", |s| !s.is_empty())
    }

    /// Name of node `idx` out of `n`
    ///
    /// Later nodes get smaller names so that name order and dependency
    /// order disagree.
    fn node_name(idx: usize, n: usize) -> String {
        format!("pkg-{:02}", n - 1 - idx)
    }

    /// Generate an acyclic package graph of 1 to 12 packages
    ///
    /// Node `i` may only depend on nodes `j < i`.
    pub fn acyclic_graph() -> impl Strategy<Value = Graph> {
        (1usize..=12)
            .prop_flat_map(|n| (Just(n), prop::collection::vec(prop::collection::vec(any::<bool>(), n), n)))
            .prop_map(|(n, matrix)| {
                (0..n)
                    .map(|i| {
                        let deps = (0..i)
                            .filter(|&j| matrix[i][j])
                            .map(|j| node_name(j, n))
                            .collect();
                        (node_name(i, n), deps)
                    })
                    .collect()
            })
    }

    /// Generate a package graph that contains at least one cycle
    ///
    /// Chains every node to its predecessor, then closes the chain.
    pub fn cyclic_graph() -> impl Strategy<Value = Graph> {
        acyclic_graph()
            .prop_filter("Need at least two packages", |g| g.len() >= 2)
            .prop_map(|mut graph| {
                let n = graph.len();
                for i in 1..n {
                    let prev = node_name(i - 1, n);
                    if !graph[i].1.contains(&prev) {
                        graph[i].1.push(prev);
                    }
                }
                let last = node_name(n - 1, n);
                graph[0].1.push(last);
                graph
            })
    }

    /// Generate a valid SHA256 hash (64 hex characters)
    pub fn sha256_hash() -> impl Strategy<Value = String> {
        "[0-9a-f]{64}"
    }
}

#[cfg(test)]
mod tests {
    use super::generators::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn test_package_name_generator(name in package_name()) {
            prop_assert!(!name.is_empty());
            prop_assert!(name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
        }

        #[test]
        fn test_acyclic_graph_names_are_unique(graph in acyclic_graph()) {
            let mut names: Vec<&String> = graph.iter().map(|(n, _)| n).collect();
            names.sort();
            names.dedup();
            prop_assert_eq!(names.len(), graph.len());
        }

        #[test]
        fn test_cyclic_graph_closes_chain(graph in cyclic_graph()) {
            let last = &graph[graph.len() - 1].0;
            prop_assert!(graph[0].1.contains(last));
        }

        #[test]
        fn test_sha256_hash_generator(hash in sha256_hash()) {
            prop_assert_eq!(hash.len(), 64);
            prop_assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
        }
    }
}
