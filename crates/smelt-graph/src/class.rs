use serde::{Deserialize, Serialize};

use crate::flags::AccessFlags;
use crate::intern::{FieldRef, ItemFactory, MethodRef, TypeRef};

/// Where a class definition came from. Program classes are rewritten by the
/// compiler, classpath classes are visible but immutable, library classes
/// are only a link-time promise.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassOrigin {
    #[default]
    Program,
    Classpath,
    Library,
}

/// A method definition inside a class: the symbolic reference it was declared
/// under plus its access flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodDef {
    pub reference: MethodRef,
    pub flags: AccessFlags,
}

impl MethodDef {
    pub fn new(reference: MethodRef, flags: AccessFlags) -> Self {
        Self { reference, flags }
    }

    pub fn is_instance_initializer(&self, factory: &ItemFactory) -> bool {
        factory.is_instance_initializer(self.reference)
    }

    /// Members of the direct pool: statics, privates and initializers are
    /// never dispatched virtually.
    pub fn belongs_to_direct_pool(&self, factory: &ItemFactory) -> bool {
        self.flags.is_static()
            || self.flags.is_private()
            || factory.is_instance_initializer(self.reference)
            || factory.is_class_initializer(self.reference)
    }

    /// A non-abstract virtual method, e.g. a default method when declared on
    /// an interface.
    pub fn is_non_abstract_virtual(&self, factory: &ItemFactory) -> bool {
        !self.flags.is_abstract() && !self.belongs_to_direct_pool(factory)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    pub reference: FieldRef,
    pub flags: AccessFlags,
}

impl FieldDef {
    pub fn new(reference: FieldRef, flags: AccessFlags) -> Self {
        Self { reference, flags }
    }
}

/// A class definition: flags, hierarchy links and member pools.
///
/// Definitions are exclusively owned by the [`ClassGraph`](crate::ClassGraph)
/// and never duplicated; member lists are split into the direct pool
/// (statics, privates, initializers) and the virtual pool, mirroring how
/// dispatch treats them.
#[derive(Debug, Clone)]
pub struct ClassDef {
    pub origin: ClassOrigin,
    pub ty: TypeRef,
    pub flags: AccessFlags,
    pub super_type: Option<TypeRef>,
    pub interfaces: Vec<TypeRef>,
    /// JEP 181 nest host; `None` means the class hosts its own nest.
    pub nest_host: Option<TypeRef>,
    pub direct_methods: Vec<MethodDef>,
    pub virtual_methods: Vec<MethodDef>,
    pub static_fields: Vec<FieldDef>,
    pub instance_fields: Vec<FieldDef>,
}

impl ClassDef {
    pub fn is_interface(&self) -> bool {
        self.flags.is_interface()
    }

    pub fn is_program_class(&self) -> bool {
        self.origin == ClassOrigin::Program
    }

    pub fn is_library_class(&self) -> bool {
        self.origin == ClassOrigin::Library
    }

    /// The nest this class belongs to, represented by its host type.
    pub fn nest_host_type(&self) -> TypeRef {
        self.nest_host.unwrap_or(self.ty)
    }

    pub fn methods(&self) -> impl Iterator<Item = &MethodDef> {
        self.direct_methods.iter().chain(self.virtual_methods.iter())
    }

    /// Find a declared method with the same name and prototype as
    /// `reference`, in either pool. The reference's holder is ignored: the
    /// caller is typically walking a hierarchy that the reference does not
    /// name.
    pub fn lookup_method(&self, factory: &ItemFactory, reference: MethodRef) -> Option<&MethodDef> {
        self.methods()
            .find(|method| factory.same_signature(method.reference, reference))
    }

    pub fn lookup_virtual_method(
        &self,
        factory: &ItemFactory,
        reference: MethodRef,
    ) -> Option<&MethodDef> {
        self.virtual_methods
            .iter()
            .find(|method| factory.same_signature(method.reference, reference))
    }

    pub fn lookup_direct_method(
        &self,
        factory: &ItemFactory,
        reference: MethodRef,
    ) -> Option<&MethodDef> {
        self.direct_methods
            .iter()
            .find(|method| factory.same_signature(method.reference, reference))
    }

    /// Signature-polymorphic lookup (JVMS 2.9): only `MethodHandle` and
    /// `VarHandle` declare such methods, all with the `(Object[])Object`
    /// prototype and native+varargs flags.
    pub fn lookup_signature_polymorphic_method(
        &self,
        factory: &ItemFactory,
        name: lasso::Spur,
    ) -> Option<&MethodDef> {
        if !factory.is_signature_polymorphic_holder(self.ty) {
            return None;
        }
        self.virtual_methods.iter().find(|method| {
            factory.method_name(method.reference) == name
                && factory.method_proto(method.reference) == factory.polymorphic_proto()
        })
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.static_fields.iter().chain(self.instance_fields.iter())
    }

    pub fn lookup_field(&self, factory: &ItemFactory, reference: FieldRef) -> Option<&FieldDef> {
        self.fields().find(|field| {
            factory.field_name(field.reference) == factory.field_name(reference)
                && factory.field_type(field.reference) == factory.field_type(reference)
        })
    }
}
