use std::collections::{HashMap, HashSet, VecDeque};

use crate::class::{ClassDef, ClassOrigin};
use crate::intern::{ItemFactory, TypeRef};

/// Read-only view of the class definitions of a compilation.
///
/// Implementations may hold more than one definition for a type (duplicate
/// classes on the classpath are a fact of life); `for_each_definition`
/// surfaces all of them, `definition_for` picks the canonical one with
/// program classes winning over classpath and library ones.
pub trait Definitions {
    fn for_each_definition<'a>(&'a self, ty: TypeRef, f: &mut dyn FnMut(&'a ClassDef));

    fn definition_for(&self, ty: TypeRef) -> Option<&ClassDef>;

    fn has_multiple_definitions(&self, ty: TypeRef) -> bool {
        let mut count = 0usize;
        self.for_each_definition(ty, &mut |_| count += 1);
        count > 1
    }
}

/// Owner of every class definition, indexed by type.
///
/// Built single-threaded by the front end, then read concurrently by the
/// analysis threads. Mutating member lists requires `&mut self`, so the
/// single-writer rule is enforced by the borrow checker rather than a lock.
#[derive(Default)]
pub struct ClassGraph {
    classes: HashMap<TypeRef, Vec<ClassDef>>,
}

impl ClassGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, class: ClassDef) {
        self.classes.entry(class.ty).or_default().push(class);
    }

    pub fn class_mut(&mut self, ty: TypeRef) -> Option<&mut ClassDef> {
        self.classes.get_mut(&ty).and_then(|defs| defs.first_mut())
    }

    pub fn classes(&self) -> impl Iterator<Item = &ClassDef> {
        self.classes.values().flatten()
    }
}

impl Definitions for ClassGraph {
    fn for_each_definition<'a>(&'a self, ty: TypeRef, f: &mut dyn FnMut(&'a ClassDef)) {
        if let Some(defs) = self.classes.get(&ty) {
            for def in defs {
                f(def);
            }
        }
    }

    fn definition_for(&self, ty: TypeRef) -> Option<&ClassDef> {
        let defs = self.classes.get(&ty)?;
        defs.iter()
            .find(|def| def.origin == ClassOrigin::Program)
            .or_else(|| defs.iter().find(|def| def.origin == ClassOrigin::Classpath))
            .or_else(|| defs.first())
    }
}

/// Reflexive subtype test over the class hierarchy, interfaces included.
pub fn is_subtype(
    definitions: &dyn Definitions,
    factory: &ItemFactory,
    sub: TypeRef,
    sup: TypeRef,
) -> bool {
    sub == sup || is_strict_subtype(definitions, factory, sub, sup)
}

/// Strict subtype test: walks superclasses and superinterfaces breadth
/// first. Every class type is a strict subtype of `java.lang.Object` except
/// `Object` itself; unknown classes conservatively answer `false` beyond
/// that.
pub fn is_strict_subtype(
    definitions: &dyn Definitions,
    factory: &ItemFactory,
    sub: TypeRef,
    sup: TypeRef,
) -> bool {
    if sub == sup {
        return false;
    }
    if sup == factory.object_type() {
        return factory.is_class_type(sub) || factory.is_array_type(sub);
    }
    let mut queue: VecDeque<TypeRef> = VecDeque::new();
    let mut seen: HashSet<TypeRef> = HashSet::new();
    queue.push_back(sub);
    while let Some(current) = queue.pop_front() {
        if !seen.insert(current) {
            continue;
        }
        let Some(class) = definitions.definition_for(current) else {
            continue;
        };
        if let Some(super_type) = class.super_type {
            if super_type == sup {
                return true;
            }
            queue.push_back(super_type);
        }
        for &interface in &class.interfaces {
            if interface == sup {
                return true;
            }
            queue.push_back(interface);
        }
    }
    false
}

/// Two classes are nestmates when they agree on the nest host (JEP 181).
pub fn same_nest(a: &ClassDef, b: &ClassDef) -> bool {
    a.nest_host_type() == b.nest_host_type()
}
