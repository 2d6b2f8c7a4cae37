//! The layered rewrite chain ("graph lens") of the Smelt optimizer.
//!
//! Every optimization pass records its renames and moves in a new lens layer
//! appended to the chain. Lookups compose the layers oldest-first, so each
//! layer's maps are interpreted in the reference space produced by its
//! predecessor; original-signature queries run the chain in reverse. Chains
//! are append-only and effectively immutable once a compiler round starts
//! reading them.

#![forbid(unsafe_code)]

mod bidi;
mod builder;
mod lookup;
mod nested;

use smelt_graph::{Definitions, FieldRef, ItemFactory, MethodRef, Reference, TypeRef};

pub use crate::builder::LensBuilder;
pub use crate::lookup::{FieldLookupResult, InvokeKind, MethodLookupResult, PrototypeChanges};
pub use crate::nested::{map_virtual_interface_invocation_kind, InvocationTypeMapping, NestedLens};

/// A lens over the symbol graph: a virtual view that delays global rewrites
/// until later processing stages.
///
/// Valid remappings are limited to renaming members, moving them to another
/// holder, and mapping a class type to another class type; moved methods may
/// additionally require a changed invocation kind at the call site.
#[derive(Debug)]
pub enum GraphLens {
    /// The terminal layer: every reference is a fixed point.
    Identity,
    /// A map-backed rewrite layer on top of a previous lens.
    Nested(NestedLens),
    /// Clears accumulated code rewritings (lookups behave as identity) while
    /// original/renamed signature queries still see the whole chain.
    ClearCodeRewriting(ClearCodeRewritingLens),
}

#[derive(Debug)]
pub struct ClearCodeRewritingLens {
    pub(crate) previous: Box<GraphLens>,
}

impl ClearCodeRewritingLens {
    pub fn previous(&self) -> &GraphLens {
        &self.previous
    }
}

impl GraphLens {
    pub fn identity() -> GraphLens {
        GraphLens::Identity
    }

    pub fn is_identity(&self) -> bool {
        matches!(self, GraphLens::Identity)
    }

    pub fn previous(&self) -> Option<&GraphLens> {
        match self {
            GraphLens::Identity => None,
            GraphLens::Nested(nested) => Some(&nested.previous),
            GraphLens::ClearCodeRewriting(clear) => Some(&clear.previous),
        }
    }

    fn previous_mut(&mut self) -> Option<&mut Box<GraphLens>> {
        match self {
            GraphLens::Identity => None,
            GraphLens::Nested(nested) => Some(&mut nested.previous),
            GraphLens::ClearCodeRewriting(clear) => Some(&mut clear.previous),
        }
    }

    /// True unless this chain is the bare identity: code objects still carry
    /// rewritings that a later stage must apply.
    pub fn has_code_rewritings(&self) -> bool {
        !self.is_identity()
    }

    /// Wrap this chain so that lookups start from a clean slate while
    /// signature history is preserved.
    pub fn with_code_rewritings_applied(self) -> GraphLens {
        if self.has_code_rewritings() {
            GraphLens::ClearCodeRewriting(ClearCodeRewritingLens {
                previous: Box::new(self),
            })
        } else {
            self
        }
    }

    /// Temporarily view the chain through an alternate ancestor: swaps
    /// `alternative` in as this node's `previous` for the duration of `f`,
    /// restoring the original on exit (strict stack discipline).
    pub fn with_alternative_previous<R>(
        &mut self,
        alternative: &mut GraphLens,
        f: impl FnOnce(&GraphLens) -> R,
    ) -> R {
        {
            let slot = self
                .previous_mut()
                .expect("the identity lens has no previous layer");
            std::mem::swap(&mut **slot, alternative);
        }
        let result = f(&*self);
        {
            let slot = self.previous_mut().expect("previous layer vanished");
            std::mem::swap(&mut **slot, alternative);
        }
        result
    }

    // Current-view lookups.

    /// Rewrite a type to its current view. Primitives, `void` and the null
    /// type are fixed points under every lens; array types are rewritten
    /// through their base element type and memoized per concrete array type.
    pub fn lookup_type(
        &self,
        factory: &ItemFactory,
        ty: TypeRef,
        applied: Option<&GraphLens>,
    ) -> TypeRef {
        if let Some(applied) = applied {
            if std::ptr::eq(self, applied) {
                return ty;
            }
        }
        if factory.is_rewrite_fixed_point(ty) {
            return ty;
        }
        if factory.is_array_type(ty) {
            return match self {
                GraphLens::Identity => ty,
                GraphLens::ClearCodeRewriting(clear) => {
                    clear.previous.lookup_type(factory, ty, applied)
                }
                GraphLens::Nested(nested) => {
                    if let Some(cached) = nested.array_cache.get(&ty) {
                        return *cached;
                    }
                    let base = factory.base_element_type(ty);
                    let new_base = self.lookup_type(factory, base, applied);
                    let result = if new_base == base {
                        ty
                    } else {
                        factory.replace_base_element_type(ty, new_base)
                    };
                    nested.array_cache.insert(ty, result);
                    result
                }
            };
        }
        self.lookup_class_type(factory, ty, applied)
    }

    /// Rewrite a class type, oldest layer first.
    pub fn lookup_class_type(
        &self,
        factory: &ItemFactory,
        ty: TypeRef,
        applied: Option<&GraphLens>,
    ) -> TypeRef {
        debug_assert!(
            factory.is_class_type(ty),
            "expected class type, but was `{}`",
            factory.type_to_string(ty)
        );
        let mut layers: Vec<&NestedLens> = Vec::new();
        let mut current = self;
        loop {
            if let Some(applied) = applied {
                if std::ptr::eq(current, applied) {
                    break;
                }
            }
            match current {
                GraphLens::Identity => break,
                GraphLens::Nested(nested) => {
                    layers.push(nested);
                    current = &nested.previous;
                }
                GraphLens::ClearCodeRewriting(clear) => {
                    current = &clear.previous;
                }
            }
        }
        let mut result = ty;
        for layer in layers.iter().rev() {
            result = layer.rewrite_class_type(result);
        }
        result
    }

    /// Look a method reference up through the chain.
    ///
    /// The maps of each layer are defined in the reference space produced by
    /// its predecessor, so the oldest layer is consulted first and the
    /// result is transformed forward, with the calling context mapped into
    /// each layer's input space along the way. An unmapped reference is
    /// returned unchanged; there is no "not found" outcome.
    ///
    /// `applied` designates a lens that has already been applied to the code
    /// object: the walk will not recurse past it, so no mapping is applied
    /// twice.
    pub fn lookup_method(
        &self,
        definitions: &dyn Definitions,
        factory: &ItemFactory,
        reference: MethodRef,
        context: Option<MethodRef>,
        kind: InvokeKind,
        applied: Option<&GraphLens>,
    ) -> MethodLookupResult {
        debug_assert!(
            context.is_some() || self.is_context_free_for_methods(applied),
            "a context-sensitive lens chain requires a calling context"
        );
        let holder = factory.method_holder(reference);
        if factory.is_array_type(holder) {
            // Array methods (`clone`) never move; only the holder type is
            // rewritten.
            let rewritten = factory.with_method_holder(reference, self.lookup_type(factory, holder, applied));
            return MethodLookupResult::identity(rewritten, kind);
        }
        debug_assert!(factory.is_class_type(holder));

        let mut layers: Vec<(&NestedLens, Option<MethodRef>)> = Vec::new();
        let mut current = self;
        let mut layer_context = context;
        loop {
            if let Some(applied) = applied {
                if std::ptr::eq(current, applied) {
                    break;
                }
            }
            match current {
                GraphLens::Identity | GraphLens::ClearCodeRewriting(_) => break,
                GraphLens::Nested(nested) => {
                    layers.push((nested, layer_context));
                    layer_context = layer_context.map(|c| nested.previous_method_signature(c));
                    current = &nested.previous;
                }
            }
        }

        let mut result = MethodLookupResult::identity(reference, kind);
        for (layer, context) in layers.iter().rev() {
            result = layer.describe_lookup_method(definitions, factory, result, *context);
        }
        result
    }

    pub fn lookup_invoke_virtual(
        &self,
        definitions: &dyn Definitions,
        factory: &ItemFactory,
        reference: MethodRef,
        context: MethodRef,
    ) -> MethodLookupResult {
        self.lookup_method(
            definitions,
            factory,
            reference,
            Some(context),
            InvokeKind::Virtual,
            None,
        )
    }

    pub fn lookup_invoke_interface(
        &self,
        definitions: &dyn Definitions,
        factory: &ItemFactory,
        reference: MethodRef,
        context: MethodRef,
    ) -> MethodLookupResult {
        self.lookup_method(
            definitions,
            factory,
            reference,
            Some(context),
            InvokeKind::Interface,
            None,
        )
    }

    pub fn lookup_invoke_super(
        &self,
        definitions: &dyn Definitions,
        factory: &ItemFactory,
        reference: MethodRef,
        context: MethodRef,
    ) -> MethodLookupResult {
        self.lookup_method(
            definitions,
            factory,
            reference,
            Some(context),
            InvokeKind::Super,
            None,
        )
    }

    pub fn lookup_invoke_direct(
        &self,
        definitions: &dyn Definitions,
        factory: &ItemFactory,
        reference: MethodRef,
        context: MethodRef,
    ) -> MethodLookupResult {
        self.lookup_method(
            definitions,
            factory,
            reference,
            Some(context),
            InvokeKind::Direct,
            None,
        )
    }

    pub fn lookup_invoke_static(
        &self,
        definitions: &dyn Definitions,
        factory: &ItemFactory,
        reference: MethodRef,
        context: MethodRef,
    ) -> MethodLookupResult {
        self.lookup_method(
            definitions,
            factory,
            reference,
            Some(context),
            InvokeKind::Static,
            None,
        )
    }

    /// Look a field reference up through the chain. Same layering rules as
    /// [`GraphLens::lookup_method`], without kinds or contexts.
    pub fn lookup_field_result(
        &self,
        factory: &ItemFactory,
        reference: FieldRef,
        applied: Option<&GraphLens>,
    ) -> FieldLookupResult {
        let mut layers: Vec<&NestedLens> = Vec::new();
        let mut current = self;
        loop {
            if let Some(applied) = applied {
                if std::ptr::eq(current, applied) {
                    break;
                }
            }
            match current {
                GraphLens::Identity | GraphLens::ClearCodeRewriting(_) => break,
                GraphLens::Nested(nested) => {
                    layers.push(nested);
                    current = &nested.previous;
                }
            }
        }
        let mut result = FieldLookupResult::identity(reference);
        for layer in layers.iter().rev() {
            result = layer.describe_lookup_field(factory, result);
        }
        result
    }

    pub fn lookup_field(
        &self,
        factory: &ItemFactory,
        reference: FieldRef,
        applied: Option<&GraphLens>,
    ) -> FieldRef {
        self.lookup_field_result(factory, reference, applied).reference
    }

    /// Accumulated prototype changes for a method definition, composed from
    /// the oldest layer forward. A clearing layer resets the accumulation.
    pub fn lookup_prototype_changes_for_method_definition(
        &self,
        method: MethodRef,
        applied: Option<&GraphLens>,
    ) -> PrototypeChanges {
        let mut layers: Vec<(&NestedLens, MethodRef)> = Vec::new();
        let mut current = self;
        let mut signature = method;
        loop {
            if let Some(applied) = applied {
                if std::ptr::eq(current, applied) {
                    break;
                }
            }
            match current {
                GraphLens::Identity | GraphLens::ClearCodeRewriting(_) => break,
                GraphLens::Nested(nested) => {
                    layers.push((nested, signature));
                    signature = nested.previous_method_signature(signature);
                    current = &nested.previous;
                }
            }
        }
        let mut changes = PrototypeChanges::none();
        for (layer, signature) in layers.iter().rev() {
            changes = changes.compose(&layer.prototype_changes_for(*signature));
        }
        changes
    }

    // Original-view queries: invert this chain's maps newest-first.

    pub fn get_original_type(&self, ty: TypeRef) -> TypeRef {
        let mut current = self;
        let mut original = ty;
        loop {
            match current {
                GraphLens::Identity => return original,
                GraphLens::Nested(nested) => {
                    original = nested.original_class_type(original);
                    current = &nested.previous;
                }
                GraphLens::ClearCodeRewriting(clear) => current = &clear.previous,
            }
        }
    }

    /// The pre-pipeline signature of a method, optionally stopping at a
    /// designated ancestor lens instead of the chain root.
    pub fn get_original_method_signature(
        &self,
        method: MethodRef,
        at: Option<&GraphLens>,
    ) -> MethodRef {
        let mut current = self;
        let mut original = method;
        loop {
            if let Some(at) = at {
                if std::ptr::eq(current, at) {
                    return original;
                }
            }
            match current {
                GraphLens::Identity => return original,
                GraphLens::Nested(nested) => {
                    original = nested.previous_method_signature(original);
                    current = &nested.previous;
                }
                GraphLens::ClearCodeRewriting(clear) => current = &clear.previous,
            }
        }
    }

    pub fn get_original_field_signature(&self, field: FieldRef) -> FieldRef {
        let mut current = self;
        let mut original = field;
        loop {
            match current {
                GraphLens::Identity => return original,
                GraphLens::Nested(nested) => {
                    original = nested.previous_field_signature(original);
                    current = &nested.previous;
                }
                GraphLens::ClearCodeRewriting(clear) => current = &clear.previous,
            }
        }
    }

    // Renamed-view queries: run the moved-signature maps oldest-first.

    pub fn get_renamed_method_signature(
        &self,
        original: MethodRef,
        applied: Option<&GraphLens>,
    ) -> MethodRef {
        let mut layers: Vec<&NestedLens> = Vec::new();
        let mut current = self;
        loop {
            if let Some(applied) = applied {
                if std::ptr::eq(current, applied) {
                    break;
                }
            }
            match current {
                GraphLens::Identity => break,
                GraphLens::Nested(nested) => {
                    layers.push(nested);
                    current = &nested.previous;
                }
                GraphLens::ClearCodeRewriting(clear) => current = &clear.previous,
            }
        }
        let mut renamed = original;
        for layer in layers.iter().rev() {
            renamed = layer.next_method_signature(renamed);
        }
        renamed
    }

    pub fn get_renamed_field_signature(
        &self,
        original: FieldRef,
        applied: Option<&GraphLens>,
    ) -> FieldRef {
        let mut layers: Vec<&NestedLens> = Vec::new();
        let mut current = self;
        loop {
            if let Some(applied) = applied {
                if std::ptr::eq(current, applied) {
                    break;
                }
            }
            match current {
                GraphLens::Identity => break,
                GraphLens::Nested(nested) => {
                    layers.push(nested);
                    current = &nested.previous;
                }
                GraphLens::ClearCodeRewriting(clear) => current = &clear.previous,
            }
        }
        let mut renamed = original;
        for layer in layers.iter().rev() {
            renamed = layer.next_field_signature(renamed);
        }
        renamed
    }

    /// True iff no layer of this chain needs a calling context to pick a
    /// method target.
    pub fn is_context_free_for_methods(&self, applied: Option<&GraphLens>) -> bool {
        let mut current = self;
        loop {
            if let Some(applied) = applied {
                if std::ptr::eq(current, applied) {
                    return true;
                }
            }
            match current {
                GraphLens::Identity | GraphLens::ClearCodeRewriting(_) => return true,
                GraphLens::Nested(nested) => {
                    if nested.context_sensitive {
                        return false;
                    }
                    current = &nested.previous;
                }
            }
        }
    }

    /// Debug-build consistency check: none of the given references may be
    /// touched by this chain. A failure signals a compiler bug; call this
    /// under `debug_assert!`.
    pub fn verify_references_not_modified(
        &self,
        factory: &ItemFactory,
        references: &[Reference],
    ) -> bool {
        references.iter().all(|&reference| match reference {
            Reference::Type(ty) => self.lookup_type(factory, ty, None) == ty,
            Reference::Method(method) => {
                self.get_renamed_method_signature(method, None) == method
            }
            Reference::Field(field) => self.get_renamed_field_signature(field, None) == field,
        })
    }
}
