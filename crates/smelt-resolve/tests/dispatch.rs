use pretty_assertions::assert_eq;
use smelt_graph::{
    ClassGraph, ClassOrigin, ClassStub, Definitions, ItemFactory, MethodRef, MethodStub, TypeRef,
    ACC_ABSTRACT, ACC_INTERFACE, ACC_PRIVATE, ACC_PUBLIC, ACC_STATIC,
};
use smelt_resolve::{MethodResolver, SingleResolution};

fn class(name: &str) -> ClassStub {
    ClassStub {
        binary_name: name.to_string(),
        access_flags: ACC_PUBLIC,
        super_class: Some("java.lang.Object".to_string()),
        interfaces: vec![],
        nest_host: None,
        origin: ClassOrigin::Program,
        fields: vec![],
        methods: vec![],
    }
}

fn interface(name: &str) -> ClassStub {
    let mut stub = class(name);
    stub.access_flags = ACC_PUBLIC | ACC_INTERFACE | ACC_ABSTRACT;
    stub
}

fn extending(name: &str, super_class: &str) -> ClassStub {
    let mut stub = class(name);
    stub.super_class = Some(super_class.to_string());
    stub
}

fn with_method(mut stub: ClassStub, name: &str, descriptor: &str, access_flags: u16) -> ClassStub {
    stub.methods.push(MethodStub {
        name: name.to_string(),
        descriptor: descriptor.to_string(),
        access_flags,
    });
    stub
}

fn setup(stubs: Vec<ClassStub>) -> (ItemFactory, ClassGraph) {
    let factory = ItemFactory::new();
    let mut graph = ClassGraph::new();
    let mut object = class("java.lang.Object");
    object.super_class = None;
    graph.insert_stub(&factory, &object).unwrap();
    for stub in &stubs {
        graph.insert_stub(&factory, stub).unwrap();
    }
    (factory, graph)
}

fn void_method(factory: &ItemFactory, holder: TypeRef, name: &str) -> MethodRef {
    factory.method(holder, name, factory.proto(factory.void_type(), &[]))
}

fn resolve_single<'a>(
    resolver: &MethodResolver<'a>,
    holder: TypeRef,
    reference: MethodRef,
) -> SingleResolution<'a> {
    *resolver
        .resolve_method_on_class_type(holder, reference)
        .single()
        .expect("resolution should succeed")
}

#[test]
fn virtual_dispatch_selects_the_receiver_override() {
    let (factory, graph) = setup(vec![
        with_method(class("com.example.A"), "m", "()V", ACC_PUBLIC),
        with_method(
            extending("com.example.B", "com.example.A"),
            "m",
            "()V",
            ACC_PUBLIC,
        ),
    ]);
    let a = factory.class_type("com.example.A");
    let b = factory.class_type("com.example.B");
    let resolver = MethodResolver::new(&graph, &factory);
    let resolution = resolve_single(&resolver, a, void_method(&factory, a, "m"));

    let on_a = resolution
        .lookup_virtual_dispatch_target(&resolver, graph.definition_for(a).unwrap())
        .expect("A receives A.m");
    assert_eq!(on_a.method.reference, void_method(&factory, a, "m"));

    let on_b = resolution
        .lookup_virtual_dispatch_target(&resolver, graph.definition_for(b).unwrap())
        .expect("B receives B.m");
    assert_eq!(on_b.method.reference, void_method(&factory, b, "m"));
    assert!(on_b.access_override.is_none());
}

#[test]
fn invoke_special_on_a_private_method_needs_nest_access() {
    let (factory, graph) = setup(vec![
        with_method(class("com.example.A"), "m", "()V", ACC_PRIVATE),
        {
            let mut inner = class("com.example.A$Inner");
            inner.nest_host = Some("com.example.A".to_string());
            inner
        },
        class("com.example.C"),
    ]);
    let a = factory.class_type("com.example.A");
    let resolver = MethodResolver::new(&graph, &factory);
    let resolution = resolve_single(&resolver, a, void_method(&factory, a, "m"));

    // An unrelated context has no access: no target, modeling
    // IllegalAccessError.
    let stranger = graph.definition_for(factory.class_type("com.example.C")).unwrap();
    assert!(resolution
        .lookup_invoke_special_target(&resolver, stranger)
        .is_none());

    // A nestmate reaches the private method without a bridge.
    let nestmate = graph
        .definition_for(factory.class_type("com.example.A$Inner"))
        .unwrap();
    let target = resolution
        .lookup_invoke_special_target(&resolver, nestmate)
        .expect("nest access");
    assert_eq!(target.method.reference, void_method(&factory, a, "m"));

    // The declaring class itself, of course.
    let declaring = graph.definition_for(a).unwrap();
    assert!(resolution
        .lookup_invoke_special_target(&resolver, declaring)
        .is_some());
}

#[test]
fn invoke_super_skips_the_callers_own_override() {
    let (factory, graph) = setup(vec![
        with_method(class("com.example.A"), "m", "()V", ACC_PUBLIC),
        with_method(
            extending("com.example.B", "com.example.A"),
            "m",
            "()V",
            ACC_PUBLIC,
        ),
        class("com.example.Unrelated"),
    ]);
    let a = factory.class_type("com.example.A");
    let b = factory.class_type("com.example.B");
    let resolver = MethodResolver::new(&graph, &factory);
    let resolution = resolve_single(&resolver, a, void_method(&factory, a, "m"));

    let context = graph.definition_for(b).unwrap();
    let target = resolution
        .lookup_invoke_super_target(&resolver, context)
        .expect("super call from B");
    assert_eq!(target.method.reference, void_method(&factory, a, "m"));

    // invoke-super is only valid on a supertype of the calling context.
    let unrelated = graph
        .definition_for(factory.class_type("com.example.Unrelated"))
        .unwrap();
    assert!(resolution
        .lookup_invoke_super_target(&resolver, unrelated)
        .is_none());
}

#[test]
fn invoke_super_rejects_abstract_and_initializer_targets() {
    let (factory, graph) = setup(vec![
        with_method(
            {
                let mut a = class("com.example.A");
                a.access_flags |= ACC_ABSTRACT;
                a
            },
            "m",
            "()V",
            ACC_PUBLIC | ACC_ABSTRACT,
        ),
        with_method(
            extending("com.example.B", "com.example.A"),
            "m",
            "()V",
            ACC_PUBLIC,
        ),
        with_method(class("com.example.Init"), "<init>", "()V", ACC_PUBLIC),
    ]);
    let a = factory.class_type("com.example.A");
    let b = factory.class_type("com.example.B");
    let resolver = MethodResolver::new(&graph, &factory);

    // An abstract target raises AbstractMethodError at runtime: no target.
    let resolution = resolve_single(&resolver, a, void_method(&factory, a, "m"));
    let context = graph.definition_for(b).unwrap();
    assert!(resolution
        .lookup_invoke_super_target(&resolver, context)
        .is_none());

    // Instance initializers are never valid invoke-super targets.
    let init_ty = factory.class_type("com.example.Init");
    let init_ref = void_method(&factory, init_ty, "<init>");
    let init_resolution = resolve_single(&resolver, init_ty, init_ref);
    let init_context = graph.definition_for(init_ty).unwrap();
    assert!(init_resolution
        .lookup_invoke_super_target(&resolver, init_context)
        .is_none());
}

#[test]
fn invoke_static_requires_a_static_target() {
    let (factory, graph) = setup(vec![with_method(
        with_method(class("com.example.A"), "s", "()V", ACC_PUBLIC | ACC_STATIC),
        "v",
        "()V",
        ACC_PUBLIC,
    )]);
    let a = factory.class_type("com.example.A");
    let resolver = MethodResolver::new(&graph, &factory);
    let context = graph.definition_for(a).unwrap();

    let static_resolution = resolve_single(&resolver, a, void_method(&factory, a, "s"));
    assert!(static_resolution
        .lookup_invoke_static_target(&resolver, context)
        .is_some());
    // A static invoke of an instance method is an
    // IncompatibleClassChangeError.
    let virtual_resolution = resolve_single(&resolver, a, void_method(&factory, a, "v"));
    assert!(virtual_resolution
        .lookup_invoke_static_target(&resolver, context)
        .is_none());
    // And vice versa for invoke-special on the static member.
    assert!(static_resolution
        .lookup_invoke_special_target(&resolver, context)
        .is_none());
}

#[test]
fn package_private_dispatch_passes_blocking_sentinels() {
    // p1.A declares a package-private m(). p2.B redeclares the signature in
    // another package, which is not a legal override and only blocks. p1.C
    // widens back into the original package.
    let (factory, graph) = setup(vec![
        with_method(class("p1.A"), "m", "()V", 0),
        with_method(extending("p2.B", "p1.A"), "m", "()V", ACC_PUBLIC),
        with_method(extending("p1.C", "p2.B"), "m", "()V", ACC_PUBLIC),
        extending("p2.D", "p2.B"),
    ]);
    let a = factory.class_type("p1.A");
    let b = factory.class_type("p2.B");
    let c = factory.class_type("p1.C");
    let resolver = MethodResolver::new(&graph, &factory);
    let resolution = resolve_single(&resolver, a, void_method(&factory, a, "m"));

    // Receiver C: B's declaration is a sentinel, not a candidate; the
    // search must find C.m, which legally overrides A.m from p1.
    let on_c = resolution
        .lookup_virtual_dispatch_target(&resolver, graph.definition_for(c).unwrap())
        .expect("C.m is a legal override");
    assert_eq!(on_c.method.reference, void_method(&factory, c, "m"));

    // Receiver D (below B, no own declaration): the blocked declaration
    // hides nothing it can legally claim, so dispatch lands on A.m.
    let d = factory.class_type("p2.D");
    let on_d = resolution
        .lookup_virtual_dispatch_target(&resolver, graph.definition_for(d).unwrap())
        .expect("falls back to the resolved method");
    assert_eq!(on_d.method.reference, void_method(&factory, a, "m"));

    // Receiver B itself: its declaration never overrides A.m.
    let on_b = resolution
        .lookup_virtual_dispatch_target(&resolver, graph.definition_for(b).unwrap())
        .expect("dispatches to A.m");
    assert_eq!(on_b.method.reference, void_method(&factory, a, "m"));
}

#[test]
fn widening_override_carries_the_access_override_pair() {
    // p1.A declares package-private m(); p1.C widens it to public; p2.E
    // declares the signature again. E cannot override A.m directly, but it
    // does override the public C.m, so dispatch selects E.m and records C.m
    // as the access override.
    let (factory, graph) = setup(vec![
        with_method(class("p1.A"), "m", "()V", 0),
        with_method(extending("p1.C", "p1.A"), "m", "()V", ACC_PUBLIC),
        with_method(extending("p2.E", "p1.C"), "m", "()V", ACC_PUBLIC),
    ]);
    let a = factory.class_type("p1.A");
    let c = factory.class_type("p1.C");
    let e = factory.class_type("p2.E");
    let resolver = MethodResolver::new(&graph, &factory);
    let resolution = resolve_single(&resolver, a, void_method(&factory, a, "m"));

    let target = resolution
        .lookup_virtual_dispatch_target(&resolver, graph.definition_for(e).unwrap())
        .expect("E.m overrides the widened C.m");
    assert_eq!(target.method.reference, void_method(&factory, e, "m"));
    let (override_holder, override_method) =
        target.access_override.expect("widening was required");
    assert_eq!(override_holder.ty, c);
    assert_eq!(override_method.reference, void_method(&factory, c, "m"));
}

#[test]
fn interface_dispatch_falls_back_to_the_unique_default() {
    let (factory, graph) = setup(vec![
        with_method(interface("com.example.I"), "m", "()V", ACC_PUBLIC),
        {
            let mut x = class("com.example.X");
            x.interfaces = vec!["com.example.I".to_string()];
            x
        },
    ]);
    let iface = factory.class_type("com.example.I");
    let x = factory.class_type("com.example.X");
    let resolver = MethodResolver::new(&graph, &factory);

    let resolution = *resolver
        .resolve_method_on_interface_type(iface, void_method(&factory, iface, "m"))
        .single()
        .expect("interface resolution");
    let target = resolution
        .lookup_virtual_dispatch_target(&resolver, graph.definition_for(x).unwrap())
        .expect("the default method is the target");
    assert_eq!(target.method.reference, void_method(&factory, iface, "m"));
}

#[test]
fn ambiguous_defaults_report_failure_causes_instead_of_picking() {
    let (factory, graph) = setup(vec![
        with_method(interface("com.example.I1"), "m", "()V", ACC_PUBLIC),
        with_method(interface("com.example.I2"), "m", "()V", ACC_PUBLIC),
        with_method(interface("com.example.Root"), "m", "()V", ACC_PUBLIC | ACC_ABSTRACT),
        {
            let mut x = class("com.example.X");
            x.interfaces = vec![
                "com.example.Root".to_string(),
                "com.example.I1".to_string(),
                "com.example.I2".to_string(),
            ];
            x
        },
    ]);
    let root = factory.class_type("com.example.Root");
    let x = factory.class_type("com.example.X");
    let resolver = MethodResolver::new(&graph, &factory);

    let resolution = *resolver
        .resolve_method_on_interface_type(root, void_method(&factory, root, "m"))
        .single()
        .expect("the abstract root method resolves");

    let mut failing_types: Vec<TypeRef> = Vec::new();
    let mut failing_methods: Vec<MethodRef> = Vec::new();
    let target = resolution.lookup_virtual_dispatch_target_with_callbacks(
        &resolver,
        graph.definition_for(x).unwrap(),
        &mut |ty| failing_types.push(ty),
        &mut |method| failing_methods.push(method.reference),
    );
    assert!(target.is_none(), "ambiguity must never pick a candidate");
    assert_eq!(failing_methods.len(), 2);
    assert!(failing_types.contains(&factory.class_type("com.example.I1")));
    assert!(failing_types.contains(&factory.class_type("com.example.I2")));
}

#[test]
fn private_interface_members_dispatch_to_themselves() {
    let (factory, graph) = setup(vec![
        with_method(interface("com.example.I"), "helper", "()V", ACC_PRIVATE),
    ]);
    let iface = factory.class_type("com.example.I");
    let resolver = MethodResolver::new(&graph, &factory);

    let resolution = *resolver
        .resolve_method_on_interface_type(iface, void_method(&factory, iface, "helper"))
        .single()
        .expect("private interface method resolves on itself");
    let context = graph.definition_for(iface).unwrap();
    let target = resolution
        .lookup_invoke_special_target(&resolver, context)
        .expect("private interface members are never overridden");
    assert_eq!(target.method.reference, void_method(&factory, iface, "helper"));
}
