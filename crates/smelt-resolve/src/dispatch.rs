//! Dispatch target computation for each invoke kind, on top of a successful
//! resolution.

use smelt_graph::{
    is_strict_subtype, is_subtype, ClassDef, Definitions, ItemFactory, MethodDef, TypeRef,
};

use crate::resolver::MethodResolver;
use crate::result::{MethodResolutionResult, SingleResolution};

/// The method actually invoked for a given invoke kind and, for virtual
/// dispatch, a specific runtime receiver.
#[derive(Debug, Clone, Copy)]
pub struct DispatchTarget<'a> {
    pub holder: &'a ClassDef,
    pub method: &'a MethodDef,
    /// Present when dispatch had to widen access past a package-blocked
    /// declaration; access checks must be performed against this override
    /// rather than the resolved member.
    pub access_override: Option<(&'a ClassDef, &'a MethodDef)>,
}

impl<'a> DispatchTarget<'a> {
    fn plain(holder: &'a ClassDef, method: &'a MethodDef) -> Self {
        Self {
            holder,
            method,
            access_override: None,
        }
    }
}

impl<'a> SingleResolution<'a> {
    fn resolution_pair(&self) -> DispatchTarget<'a> {
        DispatchTarget::plain(self.resolved_holder(), self.method())
    }

    /// Target of an invoke-special, modeling the runtime behavior of JVMS
    /// 6.5 `invokespecial`. `None` models the linking or runtime error the
    /// unmodified program would raise.
    pub fn lookup_invoke_special_target(
        &self,
        resolver: &MethodResolver<'a>,
        context: &ClassDef,
    ) -> Option<DispatchTarget<'a>> {
        let definitions = resolver.definitions();
        let factory = resolver.factory();
        if !self
            .is_accessible_from(definitions, factory, context)
            .is_possibly_true()
        {
            return None;
        }
        self.invoke_special_or_super(resolver, context, |sup, sub| {
            is_strict_subtype(definitions, factory, sub.ty, sup.ty)
        })
    }

    /// Target of an invoke-super from `context`.
    ///
    /// Valid only when the symbolic reference names the context itself or a
    /// strict supertype of it; an invoke-special on the context's own type
    /// should have been rewritten to invoke-direct, but class merging can
    /// reintroduce the equality.
    pub fn lookup_invoke_super_target(
        &self,
        resolver: &MethodResolver<'a>,
        context: &ClassDef,
    ) -> Option<DispatchTarget<'a>> {
        let definitions = resolver.definitions();
        let factory = resolver.factory();
        if self.method().is_instance_initializer(factory)
            || (self.initial_holder().ty != context.ty
                && !is_strict_subtype(definitions, factory, context.ty, self.initial_holder().ty))
        {
            return None;
        }
        if !self
            .is_accessible_from(definitions, factory, context)
            .is_possibly_true()
        {
            return None;
        }
        self.invoke_special_or_super(resolver, context, |_, _| true)
    }

    /// Target of an invoke-static: the resolved member, when it is static
    /// and accessible.
    pub fn lookup_invoke_static_target(
        &self,
        resolver: &MethodResolver<'a>,
        context: &ClassDef,
    ) -> Option<DispatchTarget<'a>> {
        if self
            .is_accessible_from(resolver.definitions(), resolver.factory(), context)
            .is_false()
        {
            return None;
        }
        if self.method().flags.is_static() {
            Some(self.resolution_pair())
        } else {
            None
        }
    }

    /// Target of an invoke-direct: the resolved member, when it belongs to
    /// the direct pool (privates and initializers) and is accessible.
    pub fn lookup_invoke_direct_target(
        &self,
        resolver: &MethodResolver<'a>,
        context: &ClassDef,
    ) -> Option<DispatchTarget<'a>> {
        if self
            .is_accessible_from(resolver.definitions(), resolver.factory(), context)
            .is_false()
        {
            return None;
        }
        if self.method().belongs_to_direct_pool(resolver.factory())
            && !self.method().flags.is_static()
        {
            Some(self.resolution_pair())
        } else {
            None
        }
    }

    fn invoke_special_or_super(
        &self,
        resolver: &MethodResolver<'a>,
        context: &ClassDef,
        is_superclass: impl Fn(&ClassDef, &ClassDef) -> bool,
    ) -> Option<DispatchTarget<'a>> {
        let definitions = resolver.definitions();
        let factory = resolver.factory();

        // A static target raises IncompatibleClassChangeError.
        if self.method().flags.is_static() {
            return None;
        }

        // Private interface members are never overridden; the resolution
        // pair is the target.
        if self.resolved_holder().is_interface() && self.method().flags.is_private() {
            return Some(self.resolution_pair());
        }

        let symbolic_reference = self.initial_holder();

        // JVMS 6.5 conditions the immediate-superclass start on the
        // symbolic reference being a class; for interfaces real JVMs start
        // at the reference itself, which keeps the walk from collapsing to
        // java.lang.Object.
        let start: &ClassDef = if !self.method().is_instance_initializer(factory)
            && !symbolic_reference.is_interface()
            && is_superclass(symbolic_reference, context)
        {
            definitions.definition_for(context.super_type?)?
        } else {
            symbolic_reference
        };

        // 1-3. The start class and its superclasses, in order.
        let reference = self.method().reference;
        let mut target: Option<(&ClassDef, &MethodDef)> = None;
        let mut current = Some(start);
        while let Some(class) = current {
            if let Some(found) = class.lookup_method(factory, reference) {
                target = Some((class, found));
                break;
            }
            current = class
                .super_type
                .and_then(|super_type| definitions.definition_for(super_type));
        }
        // 4. Otherwise the single maximally specific default method.
        let (holder, method) = match target {
            Some(target) => target,
            None => resolver.lookup_maximally_specific_target(start, reference)?,
        };

        // Linking exceptions: a static target is an
        // IncompatibleClassChangeError.
        if method.flags.is_static() {
            return None;
        }
        // An initializer or private member not declared on the exact
        // symbolic reference is a NoSuchMethodError.
        if (method.is_instance_initializer(factory) || method.flags.is_private())
            && holder.ty != symbolic_reference.ty
        {
            return None;
        }
        // Runtime exceptions: an abstract target is an AbstractMethodError.
        if method.flags.is_abstract() {
            return None;
        }
        Some(DispatchTarget::plain(holder, method))
    }

    /// The method selected for a virtual or interface invoke with the given
    /// concrete receiver class (JVMS 6.5 `invokevirtual` selection).
    pub fn lookup_virtual_dispatch_target(
        &self,
        resolver: &MethodResolver<'a>,
        dynamic_receiver: &'a ClassDef,
    ) -> Option<DispatchTarget<'a>> {
        self.lookup_virtual_dispatch_target_with_callbacks(
            resolver,
            dynamic_receiver,
            &mut |_| {},
            &mut |_| {},
        )
    }

    /// Like [`Self::lookup_virtual_dispatch_target`], reporting the types
    /// and methods responsible when the interface fallback fails, so a
    /// whole-program pass can batch every failure reason in one traversal.
    pub fn lookup_virtual_dispatch_target_with_callbacks(
        &self,
        resolver: &MethodResolver<'a>,
        dynamic_receiver: &'a ClassDef,
        type_causing_failure: &mut dyn FnMut(TypeRef),
        method_causing_failure: &mut dyn FnMut(&'a MethodDef),
    ) -> Option<DispatchTarget<'a>> {
        let definitions = resolver.definitions();
        let factory = resolver.factory();
        debug_assert!(
            is_subtype(definitions, factory, dynamic_receiver.ty, self.initial_holder().ty),
            "{} is not a subtype of {}",
            factory.type_to_string(dynamic_receiver.ty),
            factory.type_to_string(self.initial_holder().ty)
        );

        // A private resolved reference dispatches to itself; accessibility
        // already implied self or nest access.
        if self.method().flags.is_private() {
            return Some(self.resolution_pair());
        }
        debug_assert!(self.is_virtual_target(factory));

        let initial_pair = (self.resolved_holder(), self.method());
        let mut allow_package_blocked = self.method().flags.is_package_private();
        let mut override_target = initial_pair;
        let mut current = Some(dynamic_receiver);
        while let Some(class) = current {
            match lookup_override_candidate(factory, override_target.1, class) {
                OverrideCandidate::Blocked if allow_package_blocked => {
                    // The declaration matches but does not legally override.
                    // Search upward for a public/protected override that
                    // widens access back into reach, then re-examine this
                    // class against it.
                    override_target =
                        find_widening_override(definitions, factory, initial_pair, class);
                    allow_package_blocked = false;
                    continue;
                }
                OverrideCandidate::Blocked | OverrideCandidate::Absent => {
                    // No target exists above the resolved method.
                    if class.ty == override_target.0.ty {
                        return None;
                    }
                    current = class
                        .super_type
                        .and_then(|super_type| definitions.definition_for(super_type));
                }
                OverrideCandidate::Found(candidate) => {
                    let access_override = (!std::ptr::eq(override_target.1, initial_pair.1))
                        .then_some(override_target);
                    return Some(DispatchTarget {
                        holder: class,
                        method: candidate,
                        access_override,
                    });
                }
            }
        }

        // The receiver chain declared nothing. For a class-rooted
        // resolution this means a class was missing; for an interface root
        // the target is the maximally specific default method.
        if !self.resolved_holder().is_interface() {
            return None;
        }
        self.lookup_maximally_specific_dispatch_target(
            resolver,
            dynamic_receiver,
            type_causing_failure,
            method_causing_failure,
        )
    }

    fn lookup_maximally_specific_dispatch_target(
        &self,
        resolver: &MethodResolver<'a>,
        dynamic_receiver: &'a ClassDef,
        type_causing_failure: &mut dyn FnMut(TypeRef),
        method_causing_failure: &mut dyn FnMut(&'a MethodDef),
    ) -> Option<DispatchTarget<'a>> {
        match resolver.resolve_maximally_specific_target(dynamic_receiver, self.method().reference)
        {
            MethodResolutionResult::Single(single) => Some(DispatchTarget::plain(
                single.resolved_holder(),
                single.method(),
            )),
            MethodResolutionResult::Failed(failure) => {
                // Ambiguity is a failure, never an arbitrary pick: real JVMs
                // raise IncompatibleClassChangeError here.
                failure.for_each_failure_dependency(type_causing_failure, method_causing_failure);
                None
            }
            _ => None,
        }
    }
}

enum OverrideCandidate<'a> {
    /// A declaration that legally overrides the override target.
    Found(&'a MethodDef),
    /// A same-signature declaration that fails the override legality check:
    /// a blocking sentinel, not a candidate.
    Blocked,
    Absent,
}

/// If `class` declares an instance method with the same signature that
/// legally overrides (JVMS 5.4.5) the current override target, that is the
/// method to invoke. A matching declaration that is not a legal override
/// blocks the walk instead.
fn lookup_override_candidate<'a>(
    factory: &ItemFactory,
    override_target: &MethodDef,
    class: &'a ClassDef,
) -> OverrideCandidate<'a> {
    match class.lookup_virtual_method(factory, override_target.reference) {
        Some(candidate) => {
            debug_assert!(!candidate.flags.is_private());
            if is_overriding(factory, override_target, candidate) {
                OverrideCandidate::Found(candidate)
            } else {
                OverrideCandidate::Blocked
            }
        }
        None => OverrideCandidate::Absent,
    }
}

/// Method overriding per JVMS 5.4.5, assuming the candidate's holder is a
/// subtype of the resolved method's holder. Public and protected members are
/// always overridable; package-private members only from the same runtime
/// package.
pub fn is_overriding(factory: &ItemFactory, resolved: &MethodDef, candidate: &MethodDef) -> bool {
    debug_assert!(factory.same_signature(resolved.reference, candidate.reference));
    debug_assert!(!candidate.flags.is_private());
    if resolved.flags.is_public() || resolved.flags.is_protected() {
        return true;
    }
    debug_assert!(resolved.flags.is_package_private());
    factory.same_package(
        factory.method_holder(resolved.reference),
        factory.method_holder(candidate.reference),
    )
}

/// Walk upward from `class` for the first public/protected declaration that
/// legally overrides the resolved member, re-exposing a package-private
/// method past a blocking sentinel. Falls back to the resolved pair when no
/// such override exists.
fn find_widening_override<'a>(
    definitions: &'a dyn Definitions,
    factory: &ItemFactory,
    resolved: (&'a ClassDef, &'a MethodDef),
    class: &ClassDef,
) -> (&'a ClassDef, &'a MethodDef) {
    debug_assert!(resolved.1.flags.is_package_private());
    let mut current = class
        .super_type
        .and_then(|super_type| definitions.definition_for(super_type));
    while let Some(candidate_holder) = current {
        if let Some(candidate) =
            candidate_holder.lookup_virtual_method(factory, resolved.1.reference)
        {
            if is_overriding(factory, resolved.1, candidate)
                && (candidate.flags.is_public() || candidate.flags.is_protected())
            {
                debug_assert!(!std::ptr::eq(resolved.1, candidate));
                return (candidate_holder, candidate);
            }
        }
        current = candidate_holder
            .super_type
            .and_then(|super_type| definitions.definition_for(super_type));
    }
    resolved
}
