//! Serializable class shapes used by front ends and test fixtures.
//!
//! A stub declares a class by descriptor strings; lowering it interns every
//! reference through the factory and splits the member pools the way
//! dispatch wants them.

use serde::{Deserialize, Serialize};

use crate::class::{ClassDef, ClassOrigin, FieldDef, MethodDef};
use crate::descriptor::{parse_field_descriptor, parse_method_descriptor, DescriptorError};
use crate::flags::AccessFlags;
use crate::graph::ClassGraph;
use crate::intern::{ItemFactory, TypeRef};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassStub {
    pub binary_name: String,
    pub access_flags: u16,
    pub super_class: Option<String>,
    #[serde(default)]
    pub interfaces: Vec<String>,
    #[serde(default)]
    pub nest_host: Option<String>,
    #[serde(default)]
    pub origin: ClassOrigin,
    #[serde(default)]
    pub fields: Vec<FieldStub>,
    #[serde(default)]
    pub methods: Vec<MethodStub>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodStub {
    pub name: String,
    pub descriptor: String,
    pub access_flags: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldStub {
    pub name: String,
    pub descriptor: String,
    pub access_flags: u16,
}

impl ClassStub {
    /// Lower this stub into an interned [`ClassDef`].
    pub fn lower(&self, factory: &ItemFactory) -> Result<ClassDef, DescriptorError> {
        let ty = factory.class_type(&self.binary_name);
        let super_type = self
            .super_class
            .as_deref()
            .map(|name| factory.class_type(name));
        let interfaces = self
            .interfaces
            .iter()
            .map(|name| factory.class_type(name))
            .collect();
        let nest_host = self.nest_host.as_deref().map(|name| factory.class_type(name));

        let mut direct_methods = Vec::new();
        let mut virtual_methods = Vec::new();
        for method in &self.methods {
            let proto = parse_method_descriptor(factory, &method.descriptor)?;
            let def = MethodDef::new(
                factory.method(ty, &method.name, proto),
                AccessFlags::new(method.access_flags),
            );
            if def.belongs_to_direct_pool(factory) {
                direct_methods.push(def);
            } else {
                virtual_methods.push(def);
            }
        }

        let mut static_fields = Vec::new();
        let mut instance_fields = Vec::new();
        for field in &self.fields {
            let field_type = parse_field_descriptor(factory, &field.descriptor)?;
            let def = FieldDef::new(
                factory.field(ty, &field.name, field_type),
                AccessFlags::new(field.access_flags),
            );
            if def.flags.is_static() {
                static_fields.push(def);
            } else {
                instance_fields.push(def);
            }
        }

        Ok(ClassDef {
            origin: self.origin,
            ty,
            flags: AccessFlags::new(self.access_flags),
            super_type,
            interfaces,
            nest_host,
            direct_methods,
            virtual_methods,
            static_fields,
            instance_fields,
        })
    }
}

impl ClassGraph {
    /// Lower and insert a stub, returning the type it defined.
    pub fn insert_stub(
        &mut self,
        factory: &ItemFactory,
        stub: &ClassStub,
    ) -> Result<TypeRef, DescriptorError> {
        let class = stub.lower(factory)?;
        let ty = class.ty;
        self.insert(class);
        Ok(ty)
    }
}
