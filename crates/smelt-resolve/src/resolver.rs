//! Resolution of a symbolic method reference against a type, per JVMS
//! 5.4.3.3 (classes) and 5.4.3.4 (interfaces).

use indexmap::IndexMap;
use smelt_graph::{ClassDef, Definitions, ItemFactory, MethodDef, MethodRef, TypeRef};

use crate::builder::ResolutionResultBuilder;
use crate::result::{FailedResolution, MethodResolutionResult, SingleResolution};

/// Resolves symbolic method references against the current hierarchy view.
///
/// The resolver is a pure function of its inputs: results are plain value
/// objects, safe to recompute redundantly and cache externally.
pub struct MethodResolver<'a> {
    definitions: &'a dyn Definitions,
    factory: &'a ItemFactory,
}

impl<'a> MethodResolver<'a> {
    pub fn new(definitions: &'a dyn Definitions, factory: &'a ItemFactory) -> Self {
        Self {
            definitions,
            factory,
        }
    }

    pub fn factory(&self) -> &'a ItemFactory {
        self.factory
    }

    pub fn definitions(&self) -> &'a dyn Definitions {
        self.definitions
    }

    /// Resolve a reference, deciding class vs. interface resolution from the
    /// holder's definition. Call-site encodings do not always record which
    /// one the reference means, so this entry point queries the definition
    /// to pick.
    pub fn resolve_method(&self, reference: MethodRef) -> MethodResolutionResult<'a> {
        let holder = self.factory.method_holder(reference);
        if self.factory.is_array_type(holder) {
            return self.resolve_method_on_array(holder, reference);
        }
        let mut builder = ResolutionResultBuilder::new();
        self.definitions.for_each_definition(holder, &mut |class| {
            let result = if class.is_interface() {
                self.resolve_method_on_interface_class(class, reference)
            } else {
                self.resolve_method_on_class_def(class, reference)
            };
            builder.add_resolution_result(result);
        });
        builder.build_or_if_empty(
            MethodResolutionResult::Failed(FailedResolution::ClassNotFound),
            &[holder],
        )
    }

    /// Resolution against an array type (JLS 10.7): every method resolves on
    /// `java.lang.Object`, except `clone` which has no declaring class.
    fn resolve_method_on_array(
        &self,
        holder: TypeRef,
        reference: MethodRef,
    ) -> MethodResolutionResult<'a> {
        debug_assert!(self.factory.is_array_type(holder));
        if self.factory.method_name(reference) == self.factory.clone_name() {
            MethodResolutionResult::ArrayClone
        } else {
            self.resolve_method_on_class_type(self.factory.object_type(), reference)
        }
    }

    /// Class-kind resolution rooted at `holder` (JVMS 5.4.3.3). Resolution
    /// against an interface holder fails with IncompatibleClassChangeError.
    pub fn resolve_method_on_class_type(
        &self,
        holder: TypeRef,
        reference: MethodRef,
    ) -> MethodResolutionResult<'a> {
        if self.factory.is_array_type(holder) {
            return self.resolve_method_on_array(holder, reference);
        }
        let mut builder = ResolutionResultBuilder::new();
        self.definitions.for_each_definition(holder, &mut |class| {
            // Step 1: a class-kind reference naming an interface is an ICCE.
            let result = if class.is_interface() {
                MethodResolutionResult::Failed(FailedResolution::incompatible_class())
            } else {
                self.resolve_method_on_class_def(class, reference)
            };
            builder.add_resolution_result(result);
        });
        builder.build_or_if_empty(
            MethodResolutionResult::Failed(FailedResolution::ClassNotFound),
            &[holder],
        )
    }

    pub fn resolve_method_on_class_def(
        &self,
        class: &'a ClassDef,
        reference: MethodRef,
    ) -> MethodResolutionResult<'a> {
        debug_assert!(!class.is_interface());
        // Step 2: the class and its superclass chain.
        if let Some(result) = self.resolve_method_on_class_step2(class, reference, class) {
            return result;
        }
        // Step 3: maximally specific superinterface methods.
        self.resolve_method_step3(class, reference)
    }

    fn resolve_method_on_class_step2(
        &self,
        class: &'a ClassDef,
        reference: MethodRef,
        initial_holder: &'a ClassDef,
    ) -> Option<MethodResolutionResult<'a>> {
        // Pt. 1: signature-polymorphic methods (JVMS 2.9).
        if let Some(method) =
            class.lookup_signature_polymorphic_method(self.factory, self.factory.method_name(reference))
        {
            return Some(MethodResolutionResult::Single(SingleResolution::new(
                initial_holder,
                class,
                method,
            )));
        }
        // Pt. 2: a declared method matching the descriptor.
        if let Some(method) = class.lookup_method(self.factory, reference) {
            if method.flags.is_private() && class.ty != initial_holder.ty {
                // A private method is only visible to a reference that
                // resolved on its declaring class. Whether this is an
                // IllegalAccessError or (under nest access) a
                // NoSuchMethodError cannot be decided without the calling
                // context.
                return Some(MethodResolutionResult::Failed(
                    FailedResolution::IllegalAccessOrNoSuchMethod {
                        initial_holder,
                        methods_causing_error: vec![(class, method)],
                    },
                ));
            }
            return Some(MethodResolutionResult::Single(SingleResolution::new(
                initial_holder,
                class,
                method,
            )));
        }
        // Pt. 3: recurse on the direct superclass.
        let mut builder = ResolutionResultBuilder::new();
        if let Some(super_type) = class.super_type {
            self.definitions
                .for_each_definition(super_type, &mut |super_class| {
                    if let Some(result) =
                        self.resolve_method_on_class_step2(super_class, reference, initial_holder)
                    {
                        builder.add_resolution_result(result);
                    }
                });
        }
        builder.build()
    }

    /// Interface-kind resolution rooted at `holder` (JVMS 5.4.3.4).
    pub fn resolve_method_on_interface_type(
        &self,
        holder: TypeRef,
        reference: MethodRef,
    ) -> MethodResolutionResult<'a> {
        if self.factory.is_array_type(holder) {
            return MethodResolutionResult::Failed(FailedResolution::incompatible_class());
        }
        let mut builder = ResolutionResultBuilder::new();
        self.definitions.for_each_definition(holder, &mut |class| {
            let result = if class.is_interface() {
                self.resolve_method_on_interface_class(class, reference)
            } else {
                MethodResolutionResult::Failed(FailedResolution::incompatible_class())
            };
            builder.add_resolution_result(result);
        });
        builder.build_or_if_empty(
            MethodResolutionResult::Failed(FailedResolution::ClassNotFound),
            &[holder],
        )
    }

    pub fn resolve_method_on_interface_class(
        &self,
        definition: &'a ClassDef,
        reference: MethodRef,
    ) -> MethodResolutionResult<'a> {
        debug_assert!(definition.is_interface());
        // Step 2: the interface itself.
        if let Some(method) = definition.lookup_method(self.factory, reference) {
            return MethodResolutionResult::Single(SingleResolution::new(
                definition, definition, method,
            ));
        }
        // Step 3: a public non-abstract method on java.lang.Object, else the
        // maximally specific superinterface methods.
        let object_type = self.factory.object_type();
        let mut builder = ResolutionResultBuilder::new();
        self.definitions
            .for_each_definition(object_type, &mut |object_class| {
                let object_method = object_class.lookup_method(self.factory, reference);
                let result = match object_method {
                    Some(method) if method.flags.is_public() && !method.flags.is_abstract() => {
                        MethodResolutionResult::Single(SingleResolution::new(
                            definition,
                            object_class,
                            method,
                        ))
                    }
                    _ => self.resolve_method_step3(definition, reference),
                };
                builder.add_resolution_result(result);
            });
        builder.build_or_if_empty(
            MethodResolutionResult::Failed(FailedResolution::ClassNotFound),
            &[object_type],
        )
    }

    fn resolve_method_step3(
        &self,
        class: &'a ClassDef,
        reference: MethodRef,
    ) -> MethodResolutionResult<'a> {
        let mut builder = MaximallySpecificMethodsBuilder::new();
        self.resolve_method_step3_helper(reference, class, &mut builder);
        builder.resolve(Some(class), self.factory)
    }

    /// Maximally specific resolution across the interface lattice of
    /// `class`, with `class` itself as the initial holder. Virtual dispatch
    /// falls back to this when the receiver chain declares nothing.
    pub fn resolve_maximally_specific_target(
        &self,
        class: &'a ClassDef,
        reference: MethodRef,
    ) -> MethodResolutionResult<'a> {
        let mut builder = MaximallySpecificMethodsBuilder::new();
        self.resolve_method_step3_helper(reference, class, &mut builder);
        builder.resolve(Some(class), self.factory)
    }

    /// Non-resolution lookup of the unique maximally specific target, used
    /// by invoke-special step 4.
    pub fn lookup_maximally_specific_target(
        &self,
        class: &'a ClassDef,
        reference: MethodRef,
    ) -> Option<(&'a ClassDef, &'a MethodDef)> {
        let mut builder = MaximallySpecificMethodsBuilder::new();
        self.resolve_method_step3_helper(reference, class, &mut builder);
        match builder.resolve(None, self.factory) {
            MethodResolutionResult::Single(single) => {
                Some((single.resolved_holder(), single.method()))
            }
            _ => None,
        }
    }

    fn resolve_method_step3_helper(
        &self,
        reference: MethodRef,
        class: &'a ClassDef,
        builder: &mut MaximallySpecificMethodsBuilder<'a>,
    ) {
        for &interface in &class.interfaces {
            let Some(definition) = self.definitions.definition_for(interface) else {
                continue;
            };
            debug_assert!(definition.is_interface());
            match definition.lookup_method(self.factory, reference) {
                Some(method) if is_maximally_specific_candidate(method) => {
                    // Adding the candidate also prohibits shadowed methods
                    // further up the lattice from entering the set.
                    builder.add_candidate(self.definitions, definition, method);
                }
                _ => {
                    // Private or static matches do not participate; keep
                    // searching the superinterfaces.
                    self.resolve_method_step3_helper(reference, definition, builder);
                }
            }
        }
        // Indirect superinterfaces through the superclass chain.
        if let Some(super_type) = class.super_type {
            if let Some(super_class) = self.definitions.definition_for(super_type) {
                self.resolve_method_step3_helper(reference, super_class, builder);
            }
        }
    }
}

/// A maximally specific candidate must be neither private nor static. It may
/// still be shadowed by a subinterface, which the builder tracks separately.
fn is_maximally_specific_candidate(method: &MethodDef) -> bool {
    !method.flags.is_private() && !method.flags.is_static()
}

/// Builds the set of maximally specific interface methods.
///
/// The map is insertion-ordered so that when several abstract candidates
/// remain, a deterministic representative is picked. A `None` entry is a
/// tombstone: the type's candidate is shadowed by a subinterface, and the
/// type must not contribute again.
pub(crate) struct MaximallySpecificMethodsBuilder<'a> {
    candidates: IndexMap<TypeRef, Option<(&'a ClassDef, &'a MethodDef)>>,
}

impl<'a> MaximallySpecificMethodsBuilder<'a> {
    pub(crate) fn new() -> Self {
        Self {
            candidates: IndexMap::new(),
        }
    }

    pub(crate) fn add_candidate(
        &mut self,
        definitions: &'a dyn Definitions,
        holder: &'a ClassDef,
        method: &'a MethodDef,
    ) {
        // Already a candidate or already shadowed.
        if self.candidates.contains_key(&holder.ty) {
            return;
        }
        debug_assert!(holder.is_interface());
        self.candidates.insert(holder.ty, Some((holder, method)));
        // Prune existing candidates and prohibit future ones above this one.
        for &interface in &holder.interfaces {
            self.mark_shadowed(definitions, interface);
        }
    }

    fn mark_shadowed(&mut self, definitions: &'a dyn Definitions, ty: TypeRef) {
        let Some(class) = definitions.definition_for(ty) else {
            return;
        };
        debug_assert!(class.is_interface());
        // If the type is already shadowed there is no need to walk further
        // up; otherwise overwrite any candidate with a tombstone.
        if let Some(None) = self.candidates.get(&ty) {
            return;
        }
        self.candidates.insert(ty, None);
        for &interface in &class.interfaces {
            self.mark_shadowed(definitions, interface);
        }
    }

    pub(crate) fn resolve(
        &self,
        initial_holder: Option<&'a ClassDef>,
        factory: &ItemFactory,
    ) -> MethodResolutionResult<'a> {
        let mut surviving = self
            .candidates
            .values()
            .filter_map(|entry| *entry)
            .peekable();
        let Some(first) = surviving.peek().copied() else {
            return MethodResolutionResult::Failed(FailedResolution::no_such_method());
        };
        let non_abstract: Vec<(&ClassDef, &MethodDef)> = surviving
            .filter(|(_, method)| method.is_non_abstract_virtual(factory))
            .collect();
        match non_abstract.len() {
            // All candidates are abstract: any will do as a resolution
            // target, deterministically the first recorded.
            0 => single_result(initial_holder, first),
            // Exactly one default method: it is the resolution target.
            1 => single_result(initial_holder, non_abstract[0]),
            // Equally specific default methods: a real JVM raises
            // IncompatibleClassChangeError, so this must fail rather than
            // pick arbitrarily.
            _ => {
                tracing::debug!(
                    candidates = non_abstract.len(),
                    "ambiguous maximally specific interface methods"
                );
                MethodResolutionResult::Failed(FailedResolution::IncompatibleClass {
                    methods_causing_error: non_abstract,
                })
            }
        }
    }
}

fn single_result<'a>(
    initial_holder: Option<&'a ClassDef>,
    (holder, method): (&'a ClassDef, &'a MethodDef),
) -> MethodResolutionResult<'a> {
    MethodResolutionResult::Single(SingleResolution::new(
        initial_holder.unwrap_or(holder),
        holder,
        method,
    ))
}
