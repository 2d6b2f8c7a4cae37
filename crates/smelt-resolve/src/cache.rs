use dashmap::DashMap;
use smelt_graph::{MethodRef, TypeRef};

use crate::resolver::MethodResolver;
use crate::result::MethodResolutionResult;

/// Concurrent memoization of resolution results.
///
/// Keys are `(holder, reference)` pairs; the entry API performs an atomic
/// insert-if-absent, so under a race each distinct pair is computed at most
/// once and every caller observes the same result.
pub struct ResolutionCache<'a> {
    results: DashMap<(TypeRef, MethodRef), MethodResolutionResult<'a>>,
}

impl<'a> ResolutionCache<'a> {
    pub fn new() -> Self {
        Self {
            results: DashMap::new(),
        }
    }

    pub fn resolve_method(
        &self,
        resolver: &MethodResolver<'a>,
        reference: MethodRef,
    ) -> MethodResolutionResult<'a> {
        let key = (resolver.factory().method_holder(reference), reference);
        self.results
            .entry(key)
            .or_insert_with(|| resolver.resolve_method(reference))
            .clone()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

impl<'a> Default for ResolutionCache<'a> {
    fn default() -> Self {
        Self::new()
    }
}
