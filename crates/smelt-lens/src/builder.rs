use std::collections::HashMap;

use dashmap::DashMap;
use smelt_graph::{FieldRef, MethodRef, TypeRef};

use crate::bidi::BidiMap;
use crate::lookup::PrototypeChanges;
use crate::nested::{InvocationTypeMapping, NestedLens};
use crate::GraphLens;

/// Accumulates one pass's rename/move mappings and appends them to a chain.
///
/// Self-mappings are dropped on insert, and a builder that ends up with no
/// entries produces exactly `previous` again rather than a redundant layer.
/// The one exception is a layer flagged as invocation-type-only, whose
/// entire purpose is the invoke-kind fixup.
#[derive(Default)]
pub struct LensBuilder {
    type_map: HashMap<TypeRef, TypeRef>,
    type_inverse: HashMap<TypeRef, TypeRef>,
    method_map: HashMap<MethodRef, MethodRef>,
    moved_method_signatures: BidiMap<MethodRef>,
    field_map: BidiMap<FieldRef>,
    method_rebound_map: HashMap<MethodRef, MethodRef>,
    field_rebound_map: HashMap<FieldRef, FieldRef>,
    prototype_changes: HashMap<MethodRef, PrototypeChanges>,
    invocation_mapping: InvocationTypeMapping,
    context_sensitive: bool,
}

impl LensBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn map_type(&mut self, from: TypeRef, to: TypeRef) -> &mut Self {
        if from != to {
            self.type_map.insert(from, to);
            // First original recorded for a merge target stays the
            // representative for original-type queries.
            self.type_inverse.entry(to).or_insert(from);
        }
        self
    }

    /// Record a moved method: both invoke rewriting and the signature
    /// history follow the mapping.
    pub fn move_method(&mut self, from: MethodRef, to: MethodRef) -> &mut Self {
        if from != to {
            self.method_map.insert(from, to);
            self.moved_method_signatures.insert(from, to);
        }
        self
    }

    /// Rewrite invokes of `from` to `to` without moving the definition.
    /// Used by passes that split a method: the body moves one way while the
    /// call sites are redirected elsewhere.
    pub fn map_method(&mut self, from: MethodRef, to: MethodRef) -> &mut Self {
        if from != to {
            self.method_map.insert(from, to);
        }
        self
    }

    pub fn move_field(&mut self, from: FieldRef, to: FieldRef) -> &mut Self {
        if from != to {
            self.field_map.insert(from, to);
        }
        self
    }

    /// Record the precise defining member for a (possibly rewritten)
    /// reference; lookups through the new layer will carry it as the rebound
    /// reference.
    pub fn rebind_method(&mut self, reference: MethodRef, rebound: MethodRef) -> &mut Self {
        self.method_rebound_map.insert(reference, rebound);
        self
    }

    pub fn rebind_field(&mut self, reference: FieldRef, rebound: FieldRef) -> &mut Self {
        self.field_rebound_map.insert(reference, rebound);
        self
    }

    /// Record prototype changes for a method, keyed by its signature after
    /// this pass.
    pub fn set_prototype_changes(
        &mut self,
        method: MethodRef,
        changes: PrototypeChanges,
    ) -> &mut Self {
        if !changes.is_empty() {
            self.prototype_changes.insert(method, changes);
        }
        self
    }

    /// Make the new layer recompute virtual-vs-interface invoke kinds from
    /// the new holder. A layer carrying only this fixup is not elided even
    /// with empty maps.
    pub fn map_virtual_interface_invocation_types(&mut self) -> &mut Self {
        self.invocation_mapping = InvocationTypeMapping::VirtualInterface;
        self
    }

    /// Mark the layer's rewrite as dependent on the calling context.
    pub fn mark_context_sensitive(&mut self) -> &mut Self {
        self.context_sensitive = true;
        self
    }

    fn has_mappings(&self) -> bool {
        !self.type_map.is_empty()
            || !self.method_map.is_empty()
            || !self.moved_method_signatures.is_empty()
            || !self.field_map.is_empty()
            || !self.method_rebound_map.is_empty()
            || !self.field_rebound_map.is_empty()
            || !self.prototype_changes.is_empty()
    }

    /// Append the accumulated mappings as a new layer on `previous`, or
    /// return `previous` unchanged when there is nothing to record.
    pub fn build(self, previous: GraphLens) -> GraphLens {
        if !self.has_mappings() && self.invocation_mapping == InvocationTypeMapping::Identity {
            tracing::trace!("eliding graph lens with empty mappings");
            return previous;
        }
        tracing::debug!(
            types = self.type_map.len(),
            methods = self.method_map.len(),
            fields = self.field_map.len(),
            "appending graph lens"
        );
        GraphLens::Nested(NestedLens {
            previous: Box::new(previous),
            type_map: self.type_map,
            type_inverse: self.type_inverse,
            method_map: self.method_map,
            moved_method_signatures: self.moved_method_signatures,
            field_map: self.field_map,
            method_rebound_map: self.method_rebound_map,
            field_rebound_map: self.field_rebound_map,
            prototype_changes: self.prototype_changes,
            invocation_mapping: self.invocation_mapping,
            context_sensitive: self.context_sensitive,
            array_cache: DashMap::new(),
        })
    }
}
