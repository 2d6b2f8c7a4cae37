use std::collections::HashMap;

use dashmap::DashMap;
use smelt_graph::{Definitions, FieldRef, ItemFactory, MethodRef, TypeRef};

use crate::bidi::BidiMap;
use crate::lookup::{FieldLookupResult, InvokeKind, MethodLookupResult, PrototypeChanges};
use crate::GraphLens;

/// How a layer maps invocation kinds when members move.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InvocationTypeMapping {
    /// Kinds pass through unchanged.
    #[default]
    Identity,
    /// Recompute virtual-vs-interface invokes from the new holder's
    /// interface-ness; used when a layer moves members across the
    /// class/interface boundary.
    VirtualInterface,
}

/// One rewrite layer: identity-keyed maps from the reference space produced
/// by `previous` to the space after this compiler pass.
#[derive(Debug)]
pub struct NestedLens {
    pub(crate) previous: Box<GraphLens>,
    pub(crate) type_map: HashMap<TypeRef, TypeRef>,
    /// Inverse of `type_map`; first-inserted original wins as representative.
    pub(crate) type_inverse: HashMap<TypeRef, TypeRef>,
    /// How invoke-method instructions are rewritten.
    pub(crate) method_map: HashMap<MethodRef, MethodRef>,
    /// Where method definitions moved. Usually identical to `method_map`,
    /// but a pass may move `m1` to `m2` while rewriting invokes of `m1` to
    /// `m3`; mapping output must follow this map, not `method_map`.
    pub(crate) moved_method_signatures: BidiMap<MethodRef>,
    pub(crate) field_map: BidiMap<FieldRef>,
    /// Rebinding information: rewritten reference to its precise defining
    /// member, when this layer knows it.
    pub(crate) method_rebound_map: HashMap<MethodRef, MethodRef>,
    pub(crate) field_rebound_map: HashMap<FieldRef, FieldRef>,
    /// Prototype changes applied by this layer, keyed by the rewritten
    /// method.
    pub(crate) prototype_changes: HashMap<MethodRef, PrototypeChanges>,
    pub(crate) invocation_mapping: InvocationTypeMapping,
    pub(crate) context_sensitive: bool,
    /// Per-layer memoization of rewritten array types. Insert-if-absent
    /// keeps racing readers agreeing on one result per key.
    pub(crate) array_cache: DashMap<TypeRef, TypeRef>,
}

impl NestedLens {
    pub fn previous(&self) -> &GraphLens {
        &self.previous
    }

    pub(crate) fn rewrite_class_type(&self, ty: TypeRef) -> TypeRef {
        self.type_map.get(&ty).copied().unwrap_or(ty)
    }

    pub(crate) fn original_class_type(&self, ty: TypeRef) -> TypeRef {
        self.type_inverse.get(&ty).copied().unwrap_or(ty)
    }

    pub(crate) fn previous_method_signature(&self, method: MethodRef) -> MethodRef {
        self.moved_method_signatures.representative_key_or_default(method)
    }

    pub(crate) fn next_method_signature(&self, method: MethodRef) -> MethodRef {
        self.moved_method_signatures.get_or_default(method)
    }

    pub(crate) fn previous_field_signature(&self, field: FieldRef) -> FieldRef {
        self.field_map.representative_key_or_default(field)
    }

    pub(crate) fn next_field_signature(&self, field: FieldRef) -> FieldRef {
        self.field_map.get_or_default(field)
    }

    pub(crate) fn prototype_changes_for(&self, method: MethodRef) -> PrototypeChanges {
        self.prototype_changes
            .get(&method)
            .cloned()
            .unwrap_or_else(PrototypeChanges::none)
    }

    /// Apply this layer's rewrite to the result accumulated from the older
    /// layers. The context parameter is the calling context expressed in
    /// this layer's input space; the base layer ignores it, context-sensitive
    /// layers refine their answer with it.
    pub(crate) fn describe_lookup_method(
        &self,
        definitions: &dyn Definitions,
        factory: &ItemFactory,
        previous: MethodLookupResult,
        _context: Option<MethodRef>,
    ) -> MethodLookupResult {
        if let Some(rebound) = previous.rebound_reference {
            let rewritten_rebound = self.method_map.get(&rebound).copied().unwrap_or(rebound);
            let rewritten_reference = if previous.reference == rebound {
                rewritten_rebound
            } else {
                // The non-rebound holder is assumed to move in lock-step
                // with the member.
                factory.with_method_holder(
                    rewritten_rebound,
                    self.rewrite_class_type(factory.method_holder(previous.reference)),
                )
            };
            let prototype_changes = previous
                .prototype_changes
                .compose(&self.prototype_changes_for(rewritten_rebound));
            let invoke_kind = self.map_invocation_kind(
                definitions,
                factory,
                rewritten_rebound,
                previous.reference,
                previous.invoke_kind,
            );
            MethodLookupResult {
                reference: rewritten_reference,
                rebound_reference: Some(rewritten_rebound),
                invoke_kind,
                prototype_changes,
            }
        } else {
            let new_method = self
                .method_map
                .get(&previous.reference)
                .copied()
                .unwrap_or(previous.reference);
            let rebound_reference = self.method_rebound_map.get(&new_method).copied();
            let prototype_changes = previous
                .prototype_changes
                .compose(&self.prototype_changes_for(new_method));
            if new_method == previous.reference
                && rebound_reference.is_none()
                && prototype_changes == previous.prototype_changes
                && self.invocation_mapping == InvocationTypeMapping::Identity
            {
                return previous;
            }
            let invoke_kind = self.map_invocation_kind(
                definitions,
                factory,
                new_method,
                previous.reference,
                previous.invoke_kind,
            );
            MethodLookupResult {
                reference: new_method,
                rebound_reference,
                invoke_kind,
                prototype_changes,
            }
        }
    }

    pub(crate) fn describe_lookup_field(
        &self,
        factory: &ItemFactory,
        previous: FieldLookupResult,
    ) -> FieldLookupResult {
        if let Some(rebound) = previous.rebound_reference {
            let rewritten_rebound = self.field_map.get_or_default(rebound);
            let rewritten_reference = if previous.reference == rebound {
                rewritten_rebound
            } else {
                factory.with_field_holder(
                    rewritten_rebound,
                    self.rewrite_class_type(factory.field_holder(previous.reference)),
                )
            };
            FieldLookupResult {
                reference: rewritten_reference,
                rebound_reference: Some(rewritten_rebound),
            }
        } else {
            let reference = self.field_map.get_or_default(previous.reference);
            let rebound_reference = self.field_rebound_map.get(&reference).copied();
            FieldLookupResult {
                reference,
                rebound_reference,
            }
        }
    }

    fn map_invocation_kind(
        &self,
        definitions: &dyn Definitions,
        factory: &ItemFactory,
        new_method: MethodRef,
        original_method: MethodRef,
        kind: InvokeKind,
    ) -> InvokeKind {
        match self.invocation_mapping {
            InvocationTypeMapping::Identity => kind,
            InvocationTypeMapping::VirtualInterface => map_virtual_interface_invocation_kind(
                definitions,
                factory,
                new_method,
                original_method,
                kind,
            ),
        }
    }
}

/// Standard mapping between interface and virtual invoke kinds for members
/// that moved across the class/interface boundary.
pub fn map_virtual_interface_invocation_kind(
    definitions: &dyn Definitions,
    factory: &ItemFactory,
    new_method: MethodRef,
    original_method: MethodRef,
    kind: InvokeKind,
) -> InvokeKind {
    if kind != InvokeKind::Virtual && kind != InvokeKind::Interface {
        return kind;
    }
    let Some(new_holder) = definitions.definition_for(factory.method_holder(new_method)) else {
        return kind;
    };
    if let Some(original_holder) = definitions.definition_for(factory.method_holder(original_method))
    {
        if original_holder.is_interface() != (kind == InvokeKind::Interface) {
            // The invoke was wrong to start with, so it stays wrong on the
            // new holder: a later verifier must raise the same
            // IncompatibleClassChangeError the unmodified program would
            // have.
            return if new_holder.is_interface() {
                InvokeKind::Virtual
            } else {
                InvokeKind::Interface
            };
        }
    }
    if new_holder.is_interface() {
        InvokeKind::Interface
    } else {
        InvokeKind::Virtual
    }
}
