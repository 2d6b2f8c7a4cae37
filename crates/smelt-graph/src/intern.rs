use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use lasso::{Spur, ThreadedRodeo};
use parking_lot::RwLock;

/// Interned reference to a type (class, interface, array, primitive, `void`
/// or the null type).
///
/// References are minted by an [`ItemFactory`] and are plain indices into its
/// arenas, so equality on a reference *is* identity of the symbol. Every map
/// in the lens chain and every comparison in the resolution engine relies on
/// this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeRef(u32);

/// Interned method prototype: a return type plus parameter types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProtoRef(u32);

/// Interned symbolic method reference: `(holder, name, proto)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodRef(u32);

/// Interned symbolic field reference: `(holder, name, type)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldRef(u32);

/// Any interned reference: a type, a method or a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reference {
    Type(TypeRef),
    Method(MethodRef),
    Field(FieldRef),
}

impl From<TypeRef> for Reference {
    fn from(ty: TypeRef) -> Self {
        Reference::Type(ty)
    }
}

impl From<MethodRef> for Reference {
    fn from(method: MethodRef) -> Self {
        Reference::Method(method)
    }
}

impl From<FieldRef> for Reference {
    fn from(field: FieldRef) -> Self {
        Reference::Field(field)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrimitiveKind {
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
}

impl PrimitiveKind {
    pub fn descriptor_char(self) -> char {
        match self {
            PrimitiveKind::Boolean => 'Z',
            PrimitiveKind::Byte => 'B',
            PrimitiveKind::Char => 'C',
            PrimitiveKind::Short => 'S',
            PrimitiveKind::Int => 'I',
            PrimitiveKind::Long => 'J',
            PrimitiveKind::Float => 'F',
            PrimitiveKind::Double => 'D',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum TypeData {
    Primitive(PrimitiveKind),
    Void,
    /// The type of the `null` literal. Not denotable in source, but flow
    /// analyses produce it and every lens must treat it as a fixed point.
    Null,
    /// A class or interface type, by interned binary name
    /// (`java.lang.Object`).
    Class { name: Spur },
    Array { element: TypeRef },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ProtoData {
    return_type: TypeRef,
    parameters: Arc<[TypeRef]>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct MethodData {
    holder: TypeRef,
    name: Spur,
    proto: ProtoRef,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct FieldData {
    holder: TypeRef,
    name: Spur,
    ty: TypeRef,
}

struct Table<T> {
    map: HashMap<T, u32>,
    items: Vec<T>,
}

impl<T: Clone + Eq + Hash> Table<T> {
    fn new() -> Self {
        Self {
            map: HashMap::new(),
            items: Vec::new(),
        }
    }

    fn intern(&mut self, value: T) -> u32 {
        if let Some(&index) = self.map.get(&value) {
            return index;
        }
        let index = u32::try_from(self.items.len()).expect("item table overflow");
        self.items.push(value.clone());
        self.map.insert(value, index);
        index
    }

    fn get(&self, index: u32) -> &T {
        &self.items[index as usize]
    }
}

/// The interner that owns every symbolic reference in a compilation.
///
/// The factory is built once per compilation and then shared read-mostly
/// across worker threads. Interning stays available concurrently because
/// lens lookups mint holder-rewritten references on the fly; writes take a
/// brief exclusive lock, reads only a shared one.
pub struct ItemFactory {
    names: ThreadedRodeo,
    types: RwLock<Table<TypeData>>,
    protos: RwLock<Table<ProtoData>>,
    methods: RwLock<Table<MethodData>>,
    fields: RwLock<Table<FieldData>>,

    object_type: TypeRef,
    void_type: TypeRef,
    null_type: TypeRef,
    primitive_types: [TypeRef; 8],
    method_handle_type: TypeRef,
    var_handle_type: TypeRef,
    polymorphic_proto: ProtoRef,

    clone_name: Spur,
    init_name: Spur,
    class_init_name: Spur,
}

impl ItemFactory {
    pub fn new() -> Self {
        let names = ThreadedRodeo::default();
        let mut types = Table::new();
        let mut protos = Table::new();

        let primitive_types = [
            PrimitiveKind::Boolean,
            PrimitiveKind::Byte,
            PrimitiveKind::Char,
            PrimitiveKind::Short,
            PrimitiveKind::Int,
            PrimitiveKind::Long,
            PrimitiveKind::Float,
            PrimitiveKind::Double,
        ]
        .map(|kind| TypeRef(types.intern(TypeData::Primitive(kind))));
        let void_type = TypeRef(types.intern(TypeData::Void));
        let null_type = TypeRef(types.intern(TypeData::Null));
        let object_type = TypeRef(types.intern(TypeData::Class {
            name: names.get_or_intern("java.lang.Object"),
        }));
        let method_handle_type = TypeRef(types.intern(TypeData::Class {
            name: names.get_or_intern("java.lang.invoke.MethodHandle"),
        }));
        let var_handle_type = TypeRef(types.intern(TypeData::Class {
            name: names.get_or_intern("java.lang.invoke.VarHandle"),
        }));
        let object_array = TypeRef(types.intern(TypeData::Array {
            element: object_type,
        }));
        let polymorphic_proto = ProtoRef(protos.intern(ProtoData {
            return_type: object_type,
            parameters: Arc::from([object_array]),
        }));

        let clone_name = names.get_or_intern("clone");
        let init_name = names.get_or_intern("<init>");
        let class_init_name = names.get_or_intern("<clinit>");

        Self {
            names,
            types: RwLock::new(types),
            protos: RwLock::new(protos),
            methods: RwLock::new(Table::new()),
            fields: RwLock::new(Table::new()),
            object_type,
            void_type,
            null_type,
            primitive_types,
            method_handle_type,
            var_handle_type,
            polymorphic_proto,
            clone_name,
            init_name,
            class_init_name,
        }
    }

    pub fn intern_name(&self, name: &str) -> Spur {
        self.names.get_or_intern(name)
    }

    pub fn name_str(&self, name: Spur) -> &str {
        self.names.resolve(&name)
    }

    fn intern_type(&self, data: TypeData) -> TypeRef {
        if let Some(&index) = self.types.read().map.get(&data) {
            return TypeRef(index);
        }
        TypeRef(self.types.write().intern(data))
    }

    fn type_data(&self, ty: TypeRef) -> TypeData {
        *self.types.read().get(ty.0)
    }

    // Well-known items.

    pub fn object_type(&self) -> TypeRef {
        self.object_type
    }

    pub fn void_type(&self) -> TypeRef {
        self.void_type
    }

    pub fn null_type(&self) -> TypeRef {
        self.null_type
    }

    pub fn primitive_type(&self, kind: PrimitiveKind) -> TypeRef {
        self.primitive_types[kind as usize]
    }

    pub fn int_type(&self) -> TypeRef {
        self.primitive_type(PrimitiveKind::Int)
    }

    pub fn clone_name(&self) -> Spur {
        self.clone_name
    }

    pub fn init_name(&self) -> Spur {
        self.init_name
    }

    pub fn class_init_name(&self) -> Spur {
        self.class_init_name
    }

    /// True for `java.lang.invoke.MethodHandle`/`VarHandle`, the only types
    /// that may declare signature-polymorphic methods (JVMS 2.9).
    pub fn is_signature_polymorphic_holder(&self, ty: TypeRef) -> bool {
        ty == self.method_handle_type || ty == self.var_handle_type
    }

    /// The `(Object[])Object` prototype shared by every signature-polymorphic
    /// declaration.
    pub fn polymorphic_proto(&self) -> ProtoRef {
        self.polymorphic_proto
    }

    // Types.

    /// Intern a class or interface type by binary name (`java.lang.Object`).
    pub fn class_type(&self, binary_name: &str) -> TypeRef {
        let name = self.names.get_or_intern(binary_name);
        self.intern_type(TypeData::Class { name })
    }

    pub fn array_type(&self, element: TypeRef) -> TypeRef {
        self.intern_type(TypeData::Array { element })
    }

    pub fn is_class_type(&self, ty: TypeRef) -> bool {
        matches!(self.type_data(ty), TypeData::Class { .. })
    }

    pub fn is_array_type(&self, ty: TypeRef) -> bool {
        matches!(self.type_data(ty), TypeData::Array { .. })
    }

    pub fn is_primitive_type(&self, ty: TypeRef) -> bool {
        matches!(self.type_data(ty), TypeData::Primitive(_))
    }

    /// True for the fixed points of every lens: primitives, `void` and the
    /// null type.
    pub fn is_rewrite_fixed_point(&self, ty: TypeRef) -> bool {
        matches!(
            self.type_data(ty),
            TypeData::Primitive(_) | TypeData::Void | TypeData::Null
        )
    }

    pub fn array_element_type(&self, ty: TypeRef) -> Option<TypeRef> {
        match self.type_data(ty) {
            TypeData::Array { element } => Some(element),
            _ => None,
        }
    }

    /// Strip every array dimension: `int[][]` yields `int`, non-arrays yield
    /// themselves.
    pub fn base_element_type(&self, ty: TypeRef) -> TypeRef {
        let mut current = ty;
        while let TypeData::Array { element } = self.type_data(current) {
            current = element;
        }
        current
    }

    /// Rebuild `ty` with its base element type replaced, preserving the
    /// array dimensions.
    pub fn replace_base_element_type(&self, ty: TypeRef, new_base: TypeRef) -> TypeRef {
        match self.type_data(ty) {
            TypeData::Array { element } => {
                let new_element = self.replace_base_element_type(element, new_base);
                self.array_type(new_element)
            }
            _ => new_base,
        }
    }

    /// The interned binary name of a class type.
    pub fn class_name(&self, ty: TypeRef) -> Option<Spur> {
        match self.type_data(ty) {
            TypeData::Class { name } => Some(name),
            _ => None,
        }
    }

    /// Runtime-package comparison on binary names (JVMS 5.3). Non-class
    /// types are never in a package.
    pub fn same_package(&self, a: TypeRef, b: TypeRef) -> bool {
        let (Some(a), Some(b)) = (self.class_name(a), self.class_name(b)) else {
            return false;
        };
        let package = |name: Spur| {
            let name = self.names.resolve(&name);
            name.rsplit_once('.').map(|(package, _)| package).unwrap_or("")
        };
        package(a) == package(b)
    }

    // Prototypes.

    pub fn proto(&self, return_type: TypeRef, parameters: &[TypeRef]) -> ProtoRef {
        let data = ProtoData {
            return_type,
            parameters: Arc::from(parameters),
        };
        if let Some(&index) = self.protos.read().map.get(&data) {
            return ProtoRef(index);
        }
        ProtoRef(self.protos.write().intern(data))
    }

    pub fn return_type(&self, proto: ProtoRef) -> TypeRef {
        self.protos.read().get(proto.0).return_type
    }

    pub fn parameters(&self, proto: ProtoRef) -> Arc<[TypeRef]> {
        self.protos.read().get(proto.0).parameters.clone()
    }

    // Methods.

    pub fn method(&self, holder: TypeRef, name: &str, proto: ProtoRef) -> MethodRef {
        self.method_interned(holder, self.names.get_or_intern(name), proto)
    }

    pub fn method_interned(&self, holder: TypeRef, name: Spur, proto: ProtoRef) -> MethodRef {
        let data = MethodData { holder, name, proto };
        if let Some(&index) = self.methods.read().map.get(&data) {
            return MethodRef(index);
        }
        MethodRef(self.methods.write().intern(data))
    }

    pub fn method_holder(&self, method: MethodRef) -> TypeRef {
        self.methods.read().get(method.0).holder
    }

    pub fn method_name(&self, method: MethodRef) -> Spur {
        self.methods.read().get(method.0).name
    }

    pub fn method_proto(&self, method: MethodRef) -> ProtoRef {
        self.methods.read().get(method.0).proto
    }

    /// Mint the reference obtained by swapping the holder, keeping name and
    /// prototype. Used by lenses to fix up non-rebound references whose
    /// holder moved in lock-step with the member.
    pub fn with_method_holder(&self, method: MethodRef, holder: TypeRef) -> MethodRef {
        let data = *self.methods.read().get(method.0);
        if data.holder == holder {
            return method;
        }
        self.method_interned(holder, data.name, data.proto)
    }

    /// True when the two references agree on name and prototype (the
    /// "same signature" comparison of JVMS 5.4.5, holder excluded).
    pub fn same_signature(&self, a: MethodRef, b: MethodRef) -> bool {
        let methods = self.methods.read();
        let a = *methods.get(a.0);
        let b = *methods.get(b.0);
        a.name == b.name && a.proto == b.proto
    }

    pub fn is_instance_initializer(&self, method: MethodRef) -> bool {
        self.method_name(method) == self.init_name
    }

    pub fn is_class_initializer(&self, method: MethodRef) -> bool {
        self.method_name(method) == self.class_init_name
    }

    // Fields.

    pub fn field(&self, holder: TypeRef, name: &str, ty: TypeRef) -> FieldRef {
        self.field_interned(holder, self.names.get_or_intern(name), ty)
    }

    pub fn field_interned(&self, holder: TypeRef, name: Spur, ty: TypeRef) -> FieldRef {
        let data = FieldData { holder, name, ty };
        if let Some(&index) = self.fields.read().map.get(&data) {
            return FieldRef(index);
        }
        FieldRef(self.fields.write().intern(data))
    }

    pub fn field_holder(&self, field: FieldRef) -> TypeRef {
        self.fields.read().get(field.0).holder
    }

    pub fn field_name(&self, field: FieldRef) -> Spur {
        self.fields.read().get(field.0).name
    }

    pub fn field_type(&self, field: FieldRef) -> TypeRef {
        self.fields.read().get(field.0).ty
    }

    pub fn with_field_holder(&self, field: FieldRef, holder: TypeRef) -> FieldRef {
        let data = *self.fields.read().get(field.0);
        if data.holder == holder {
            return field;
        }
        self.field_interned(holder, data.name, data.ty)
    }

    // Rendering, for diagnostics and mapping output.

    pub fn type_descriptor(&self, ty: TypeRef) -> String {
        match self.type_data(ty) {
            TypeData::Primitive(kind) => kind.descriptor_char().to_string(),
            TypeData::Void => "V".to_string(),
            TypeData::Null => "null".to_string(),
            TypeData::Class { name } => {
                format!("L{};", self.names.resolve(&name).replace('.', "/"))
            }
            TypeData::Array { element } => format!("[{}", self.type_descriptor(element)),
        }
    }

    pub fn proto_descriptor(&self, proto: ProtoRef) -> String {
        let protos = self.protos.read();
        let data = protos.get(proto.0).clone();
        drop(protos);
        let mut out = String::from("(");
        for &parameter in data.parameters.iter() {
            out.push_str(&self.type_descriptor(parameter));
        }
        out.push(')');
        out.push_str(&self.type_descriptor(data.return_type));
        out
    }

    pub fn type_to_string(&self, ty: TypeRef) -> String {
        match self.type_data(ty) {
            TypeData::Class { name } => self.names.resolve(&name).to_string(),
            TypeData::Array { element } => format!("{}[]", self.type_to_string(element)),
            TypeData::Void => "void".to_string(),
            TypeData::Null => "null".to_string(),
            TypeData::Primitive(kind) => match kind {
                PrimitiveKind::Boolean => "boolean",
                PrimitiveKind::Byte => "byte",
                PrimitiveKind::Char => "char",
                PrimitiveKind::Short => "short",
                PrimitiveKind::Int => "int",
                PrimitiveKind::Long => "long",
                PrimitiveKind::Float => "float",
                PrimitiveKind::Double => "double",
            }
            .to_string(),
        }
    }

    pub fn method_to_string(&self, method: MethodRef) -> String {
        let data = *self.methods.read().get(method.0);
        format!(
            "{}#{}{}",
            self.type_to_string(data.holder),
            self.names.resolve(&data.name),
            self.proto_descriptor(data.proto)
        )
    }

    pub fn field_to_string(&self, field: FieldRef) -> String {
        let data = *self.fields.read().get(field.0);
        format!(
            "{}#{}:{}",
            self.type_to_string(data.holder),
            self.names.resolve(&data.name),
            self.type_descriptor(data.ty)
        )
    }
}

impl Default for ItemFactory {
    fn default() -> Self {
        Self::new()
    }
}
