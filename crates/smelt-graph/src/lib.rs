//! The interned symbol graph of the Smelt optimizer.
//!
//! Every type, prototype, method and field reference in a compilation is
//! interned through one [`ItemFactory`], so reference equality is symbol
//! identity. Class definitions live in a [`ClassGraph`] and are read
//! concurrently by the analysis stages once construction is done.

#![forbid(unsafe_code)]

mod class;
mod descriptor;
mod flags;
mod graph;
mod intern;
mod stub;

pub use crate::class::{ClassDef, ClassOrigin, FieldDef, MethodDef};
pub use crate::descriptor::{parse_field_descriptor, parse_method_descriptor, DescriptorError};
pub use crate::flags::{
    AccessFlags, ACC_ABSTRACT, ACC_BRIDGE, ACC_ENUM, ACC_FINAL, ACC_INTERFACE, ACC_NATIVE,
    ACC_PRIVATE, ACC_PROTECTED, ACC_PUBLIC, ACC_STATIC, ACC_SYNCHRONIZED, ACC_SYNTHETIC,
    ACC_VARARGS,
};
pub use crate::graph::{is_strict_subtype, is_subtype, same_nest, ClassGraph, Definitions};
pub use crate::intern::{
    FieldRef, ItemFactory, MethodRef, PrimitiveKind, ProtoRef, Reference, TypeRef,
};
pub use crate::stub::{ClassStub, FieldStub, MethodStub};

pub use lasso::Spur;
