//! Access control per JVMS 5.4.4, including JEP 181 nests.

use smelt_graph::{is_subtype, same_nest, AccessFlags, ClassDef, Definitions, ItemFactory};

/// Tri-state answer for accessibility questions asked against a possibly
/// incomplete hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionalBool {
    True,
    False,
    Unknown,
}

impl OptionalBool {
    pub fn is_true(self) -> bool {
        self == OptionalBool::True
    }

    pub fn is_false(self) -> bool {
        self == OptionalBool::False
    }

    pub fn is_possibly_true(self) -> bool {
        !self.is_false()
    }

    pub fn is_possibly_false(self) -> bool {
        !self.is_true()
    }
}

/// Whether `class` is accessible from code in `context` (JVMS 5.4.4).
pub fn is_class_accessible(
    factory: &ItemFactory,
    class: &ClassDef,
    context: &ClassDef,
) -> OptionalBool {
    if class.flags.is_public() || factory.same_package(class.ty, context.ty) {
        OptionalBool::True
    } else {
        OptionalBool::False
    }
}

/// Whether a member declared on `member_holder` with `member_flags` is
/// accessible from `context`, when named through `initial_holder`.
///
/// The class named by the symbolic reference must be accessible before the
/// member check even applies (JVMS 5.4.3.1).
pub fn is_member_accessible(
    definitions: &dyn Definitions,
    factory: &ItemFactory,
    member_holder: &ClassDef,
    member_flags: AccessFlags,
    initial_holder: &ClassDef,
    context: &ClassDef,
) -> OptionalBool {
    let class_access = is_class_accessible(factory, initial_holder, context);
    if class_access.is_false() {
        return OptionalBool::False;
    }

    let member_access = if member_flags.is_public() {
        OptionalBool::True
    } else if member_flags.is_private() {
        // Private members are accessible to the declaring class and, since
        // JDK 11, to its nestmates.
        if same_nest(member_holder, context) {
            OptionalBool::True
        } else {
            OptionalBool::False
        }
    } else if factory.same_package(member_holder.ty, context.ty) {
        OptionalBool::True
    } else if member_flags.is_protected()
        && is_subtype(definitions, factory, context.ty, member_holder.ty)
    {
        OptionalBool::True
    } else {
        OptionalBool::False
    };

    match (class_access, member_access) {
        (_, OptionalBool::False) => OptionalBool::False,
        (OptionalBool::Unknown, _) | (_, OptionalBool::Unknown) => OptionalBool::Unknown,
        _ => OptionalBool::True,
    }
}
