//! Transitive dependency expansion across the resource tree.
//!
//! Requests name only primitive resources as dependencies, because only
//! primitives correspond to engine-managed objects. Depending on a
//! composite means depending on whatever it contains, so the walker
//! descends through composites and stops at primitives.

use futures::future::try_join_all;
use hashbrown::HashSet;
use std::collections::BTreeSet;
use strata_core::output::OutputError;
use strata_core::resource::{Resource, Urn};

/// Expands directly named resources to everything reachable through
/// composite membership.
///
/// Primitive resources are leaves: they are kept but never expanded, even
/// when they have children of their own. Each resource is visited once no
/// matter how many paths reach it, so shared membership and long chains
/// cost linear work.
#[must_use]
pub fn expand_composites<I>(roots: I) -> HashSet<Resource>
where
    I: IntoIterator<Item = Resource>,
{
    let mut visited: HashSet<Resource> = HashSet::new();
    let mut frontier: Vec<Resource> = roots.into_iter().collect();
    while let Some(resource) = frontier.pop() {
        let expand = resource.kind().is_composite();
        if visited.insert(resource.clone()) && expand {
            frontier.extend(resource.children());
        }
    }
    visited
}

/// Reduces directly named resources to the sorted URN set of every
/// reachable primitive.
///
/// A composite with no primitive descendants contributes nothing; the
/// composite's own URN never appears. Awaiting a URN suspends until that
/// resource's registration completes, which is how registration ordering
/// is enforced.
///
/// # Errors
///
/// Fails when any reachable primitive's registration failed.
pub async fn primitive_dependency_urns<I>(roots: I) -> Result<BTreeSet<Urn>, OutputError>
where
    I: IntoIterator<Item = Resource>,
{
    let primitives: Vec<Resource> = expand_composites(roots)
        .into_iter()
        .filter(|resource| resource.kind().is_primitive())
        .collect();
    let urns = try_join_all(primitives.iter().map(|resource| {
        let urn = resource.urn();
        async move { urn.value().await }
    }))
    .await?;
    Ok(urns.into_iter().collect())
}

// ─────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::resource::{KeyAllocator, ResourceKey, ResourceKind};

    struct Tree {
        keys: KeyAllocator,
    }

    impl Tree {
        fn new() -> Self {
            Self { keys: KeyAllocator::new() }
        }

        fn node(&self, name: &str, kind: ResourceKind, parent: Option<&Resource>) -> Resource {
            let resource = Resource::new(
                self.keys.allocate(),
                format!("test:tree:{kind:?}"),
                name,
                kind,
                parent,
                Vec::new(),
                Vec::new(),
            );
            if kind.is_primitive() {
                resource
                    .urn_promise()
                    .resolve(Urn::new(format!("urn:{name}")), true, false);
            }
            resource
        }
    }

    fn keys(resources: &HashSet<Resource>) -> BTreeSet<ResourceKey> {
        resources.iter().map(Resource::key).collect()
    }

    #[tokio::test]
    async fn composites_expand_to_their_primitive_leaves() {
        let tree = Tree::new();
        let group = tree.node("group", ResourceKind::Composite, None);
        let first = tree.node("first", ResourceKind::Primitive, Some(&group));
        let second = tree.node("second", ResourceKind::Primitive, Some(&group));

        let expanded = expand_composites([group.clone()]);
        assert_eq!(
            keys(&expanded),
            BTreeSet::from_iter([group.key(), first.key(), second.key()])
        );

        let urns = primitive_dependency_urns([group]).await.unwrap();
        assert_eq!(
            urns,
            BTreeSet::from_iter([Urn::new("urn:first"), Urn::new("urn:second")])
        );
    }

    #[tokio::test]
    async fn primitives_are_never_expanded() {
        let tree = Tree::new();
        let server = tree.node("server", ResourceKind::Primitive, None);
        let _child = tree.node("disk", ResourceKind::Primitive, Some(&server));

        let urns = primitive_dependency_urns([server]).await.unwrap();
        assert_eq!(urns, BTreeSet::from_iter([Urn::new("urn:server")]));
    }

    #[tokio::test]
    async fn nested_composites_flatten_completely() {
        let tree = Tree::new();
        let outer = tree.node("outer", ResourceKind::Composite, None);
        let inner = tree.node("inner", ResourceKind::Composite, Some(&outer));
        let _leaf = tree.node("leaf", ResourceKind::Primitive, Some(&inner));

        let urns = primitive_dependency_urns([outer]).await.unwrap();
        assert_eq!(urns, BTreeSet::from_iter([Urn::new("urn:leaf")]));
    }

    #[tokio::test]
    async fn shared_members_are_visited_once() {
        let tree = Tree::new();
        let group = tree.node("group", ResourceKind::Composite, None);
        let shared = tree.node("shared", ResourceKind::Primitive, Some(&group));

        let expanded = expand_composites([group.clone(), shared.clone(), group.clone()]);
        assert_eq!(expanded.len(), 2);

        let urns = primitive_dependency_urns([group, shared]).await.unwrap();
        assert_eq!(urns, BTreeSet::from_iter([Urn::new("urn:shared")]));
    }

    #[tokio::test]
    async fn empty_composites_contribute_nothing() {
        let tree = Tree::new();
        let empty = tree.node("empty", ResourceKind::Composite, None);

        let urns = primitive_dependency_urns([empty]).await.unwrap();
        assert!(urns.is_empty());
    }

    #[tokio::test]
    async fn failed_members_fail_the_expansion() {
        let tree = Tree::new();
        let group = tree.node("group", ResourceKind::Composite, None);
        let broken = Resource::new(
            tree.keys.allocate(),
            "test:tree:Primitive",
            "broken",
            ResourceKind::Primitive,
            Some(&group),
            Vec::new(),
            Vec::new(),
        );
        let cause = OutputError::Registration {
            label: broken.label(),
            reason: "rejected".to_string(),
        };
        broken.urn_promise().fail(cause.clone());

        let error = primitive_dependency_urns([group]).await.unwrap_err();
        assert_eq!(error, cause);
    }
}
