use smelt_graph::{ClassDef, Definitions, ItemFactory, MethodDef, TypeRef};

use crate::access::{is_member_accessible, OptionalBool};

/// Outcome of resolving a symbolic method reference.
///
/// The taxonomy is closed on purpose: every consumption site matches
/// exhaustively, so invariants like "never silently pick a candidate on
/// ambiguity" are enforced by the compiler instead of runtime predicates.
#[derive(Debug, Clone)]
pub enum MethodResolutionResult<'a> {
    /// Nothing is known; used by callers that have to give up without
    /// consulting the hierarchy.
    Unknown,
    /// Resolution succeeded with a known declaring class and definition.
    Single(SingleResolution<'a>),
    /// Duplicate definitions of the holder produced several candidate
    /// outcomes; all of them are retained.
    Multiple(MultipleResolutions<'a>),
    /// The `clone()` method on an array type: resolution succeeds but there
    /// is no declaring class.
    ArrayClone,
    Failed(FailedResolution<'a>),
}

impl<'a> MethodResolutionResult<'a> {
    pub fn single(&self) -> Option<&SingleResolution<'a>> {
        match self {
            MethodResolutionResult::Single(single) => Some(single),
            _ => None,
        }
    }

    pub fn failed(&self) -> Option<&FailedResolution<'a>> {
        match self {
            MethodResolutionResult::Failed(failed) => Some(failed),
            _ => None,
        }
    }

    pub fn is_array_clone(&self) -> bool {
        matches!(self, MethodResolutionResult::ArrayClone)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, MethodResolutionResult::Failed(_))
    }
}

/// A successful resolution: the class named by the symbolic reference, the
/// class that actually declares the member, and the member itself.
#[derive(Debug, Clone, Copy)]
pub struct SingleResolution<'a> {
    initial_holder: &'a ClassDef,
    resolved_holder: &'a ClassDef,
    method: &'a MethodDef,
}

impl<'a> SingleResolution<'a> {
    pub fn new(
        initial_holder: &'a ClassDef,
        resolved_holder: &'a ClassDef,
        method: &'a MethodDef,
    ) -> Self {
        debug_assert!(
            resolved_holder
                .methods()
                .any(|candidate| std::ptr::eq(candidate, method)),
            "resolved method must be declared on the resolved holder"
        );
        debug_assert!(
            !method.flags.is_private() || initial_holder.ty == resolved_holder.ty,
            "a private resolution must start at its declaring class"
        );
        Self {
            initial_holder,
            resolved_holder,
            method,
        }
    }

    pub fn initial_holder(&self) -> &'a ClassDef {
        self.initial_holder
    }

    pub fn resolved_holder(&self) -> &'a ClassDef {
        self.resolved_holder
    }

    pub fn method(&self) -> &'a MethodDef {
        self.method
    }

    pub fn with_initial_holder(self, initial_holder: &'a ClassDef) -> Self {
        if std::ptr::eq(initial_holder, self.initial_holder) {
            self
        } else {
            Self {
                initial_holder,
                ..self
            }
        }
    }

    /// True when the resolved member participates in virtual dispatch.
    pub fn is_virtual_target(&self, factory: &ItemFactory) -> bool {
        !self.method.belongs_to_direct_pool(factory)
    }

    pub fn is_accessible_from(
        &self,
        definitions: &dyn Definitions,
        factory: &ItemFactory,
        context: &ClassDef,
    ) -> OptionalBool {
        is_member_accessible(
            definitions,
            factory,
            self.resolved_holder,
            self.method.flags,
            self.initial_holder,
            context,
        )
    }
}

/// All outcomes collected across duplicate definitions of the holder.
#[derive(Debug, Clone, Default)]
pub struct MultipleResolutions<'a> {
    pub(crate) program_or_classpath: Vec<SingleResolution<'a>>,
    pub(crate) library: Vec<SingleResolution<'a>>,
    pub(crate) failed: Vec<FailedResolution<'a>>,
}

impl<'a> MultipleResolutions<'a> {
    pub fn program_or_classpath_results(&self) -> &[SingleResolution<'a>] {
        &self.program_or_classpath
    }

    pub fn library_results(&self) -> &[SingleResolution<'a>] {
        &self.library
    }

    pub fn failed_results(&self) -> &[FailedResolution<'a>] {
        &self.failed
    }

    pub fn for_each_resolution(&self, f: &mut dyn FnMut(&SingleResolution<'a>)) {
        self.program_or_classpath.iter().for_each(&mut *f);
        self.library.iter().for_each(f);
    }
}

/// A resolution failure, categorized so passes can pick a conservative,
/// category-specific fallback.
#[derive(Debug, Clone)]
pub enum FailedResolution<'a> {
    /// The holder (or a class it depends on) has no definition at all.
    ClassNotFound,
    NoSuchMethod {
        /// Types that must be preserved for the error to still be observed;
        /// non-empty when the failure stems from duplicate class
        /// definitions.
        types_causing_error: Vec<TypeRef>,
        due_to_multiple_definitions: bool,
    },
    /// IncompatibleClassChangeError: class/interface mismatch, or an
    /// ambiguous set of maximally specific methods.
    IncompatibleClass {
        methods_causing_error: Vec<(&'a ClassDef, &'a MethodDef)>,
    },
    /// The resolved method is private and the symbolic reference did not
    /// start at its declaring class. Whether the JVM raises
    /// IllegalAccessError or NoSuchMethodError depends on the calling
    /// context (nest access interleaves with the existence check), so the
    /// distinction stays lazy until a context is supplied.
    IllegalAccessOrNoSuchMethod {
        initial_holder: &'a ClassDef,
        methods_causing_error: Vec<(&'a ClassDef, &'a MethodDef)>,
    },
}

impl<'a> FailedResolution<'a> {
    pub fn no_such_method() -> Self {
        FailedResolution::NoSuchMethod {
            types_causing_error: Vec::new(),
            due_to_multiple_definitions: false,
        }
    }

    pub fn incompatible_class() -> Self {
        FailedResolution::IncompatibleClass {
            methods_causing_error: Vec::new(),
        }
    }

    /// Report every type and method responsible for this failure, so a
    /// whole-program pass can batch all reasons in one traversal.
    pub fn for_each_failure_dependency(
        &self,
        type_consumer: &mut dyn FnMut(TypeRef),
        method_consumer: &mut dyn FnMut(&'a MethodDef),
    ) {
        match self {
            FailedResolution::ClassNotFound => {}
            FailedResolution::NoSuchMethod {
                types_causing_error,
                ..
            } => {
                for &ty in types_causing_error {
                    type_consumer(ty);
                }
            }
            FailedResolution::IncompatibleClass {
                methods_causing_error,
            }
            | FailedResolution::IllegalAccessOrNoSuchMethod {
                methods_causing_error,
                ..
            } => {
                for &(holder, method) in methods_causing_error {
                    type_consumer(holder.ty);
                    method_consumer(method);
                }
            }
        }
    }

    pub fn is_incompatible_class_change_error(&self) -> bool {
        matches!(self, FailedResolution::IncompatibleClass { .. })
    }

    pub fn is_class_not_found(&self) -> bool {
        matches!(self, FailedResolution::ClassNotFound)
    }

    /// Disambiguate against a calling context: IllegalAccessError is raised
    /// when some failure dependency is (possibly) inaccessible from there.
    pub fn is_illegal_access_error(
        &self,
        definitions: &dyn Definitions,
        factory: &ItemFactory,
        context: &ClassDef,
    ) -> bool {
        let FailedResolution::IllegalAccessOrNoSuchMethod {
            initial_holder,
            methods_causing_error,
        } = self
        else {
            return false;
        };
        methods_causing_error.iter().any(|&(holder, method)| {
            is_member_accessible(
                definitions,
                factory,
                holder,
                method.flags,
                initial_holder,
                context,
            )
            .is_possibly_false()
        })
    }

    pub fn is_no_such_method_error(
        &self,
        definitions: &dyn Definitions,
        factory: &ItemFactory,
        context: &ClassDef,
    ) -> bool {
        match self {
            FailedResolution::NoSuchMethod { .. } => true,
            FailedResolution::IllegalAccessOrNoSuchMethod {
                methods_causing_error,
                ..
            } => {
                // With access to every dependency (nest access), what is
                // left is an invalid symbolic reference: NoSuchMethodError.
                methods_causing_error.is_empty()
                    || !self.is_illegal_access_error(definitions, factory, context)
            }
            _ => false,
        }
    }
}
