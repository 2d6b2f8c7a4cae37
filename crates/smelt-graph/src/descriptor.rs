//! Parsing of JVM field and method descriptors into interned references.

use thiserror::Error;

use crate::intern::{ItemFactory, PrimitiveKind, ProtoRef, TypeRef};

#[derive(Debug, Error)]
pub enum DescriptorError {
    #[error("invalid descriptor: {0}")]
    Invalid(String),
    #[error("trailing characters in descriptor: {0}")]
    Trailing(String),
}

type Result<T> = std::result::Result<T, DescriptorError>;

/// Parse a field descriptor such as `[[Ljava/lang/String;` into a type.
pub fn parse_field_descriptor(factory: &ItemFactory, desc: &str) -> Result<TypeRef> {
    let (ty, rest) = parse_type(factory, desc)?;
    if !rest.is_empty() {
        return Err(DescriptorError::Trailing(desc.to_string()));
    }
    Ok(ty)
}

/// Parse a method descriptor such as `(ILjava/lang/String;)V` into a
/// prototype.
pub fn parse_method_descriptor(factory: &ItemFactory, desc: &str) -> Result<ProtoRef> {
    let Some(mut rest) = desc.strip_prefix('(') else {
        return Err(DescriptorError::Invalid(desc.to_string()));
    };

    let mut parameters = Vec::new();
    loop {
        if let Some(after) = rest.strip_prefix(')') {
            rest = after;
            break;
        }
        if rest.is_empty() {
            return Err(DescriptorError::Invalid(desc.to_string()));
        }
        let (parameter, after) = parse_type(factory, rest)?;
        parameters.push(parameter);
        rest = after;
    }

    let (return_type, rest) = if let Some(after) = rest.strip_prefix('V') {
        (factory.void_type(), after)
    } else {
        parse_type(factory, rest)?
    };
    if !rest.is_empty() {
        return Err(DescriptorError::Trailing(desc.to_string()));
    }

    Ok(factory.proto(return_type, &parameters))
}

fn parse_type<'a>(factory: &ItemFactory, input: &'a str) -> Result<(TypeRef, &'a str)> {
    let Some(first) = input.chars().next() else {
        return Err(DescriptorError::Invalid(input.to_string()));
    };
    let primitive = |kind: PrimitiveKind| Ok((factory.primitive_type(kind), &input[1..]));
    match first {
        'Z' => primitive(PrimitiveKind::Boolean),
        'B' => primitive(PrimitiveKind::Byte),
        'C' => primitive(PrimitiveKind::Char),
        'S' => primitive(PrimitiveKind::Short),
        'I' => primitive(PrimitiveKind::Int),
        'J' => primitive(PrimitiveKind::Long),
        'F' => primitive(PrimitiveKind::Float),
        'D' => primitive(PrimitiveKind::Double),
        'L' => {
            let Some(end) = input.find(';') else {
                return Err(DescriptorError::Invalid(input.to_string()));
            };
            let binary_name = input[1..end].replace('/', ".");
            Ok((factory.class_type(&binary_name), &input[end + 1..]))
        }
        '[' => {
            let (element, rest) = parse_type(factory, &input[1..])?;
            Ok((factory.array_type(element), rest))
        }
        _ => Err(DescriptorError::Invalid(input.to_string())),
    }
}
