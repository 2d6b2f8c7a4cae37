use pretty_assertions::assert_eq;
use smelt_graph::{
    ClassGraph, ClassOrigin, ClassStub, Definitions, ItemFactory, MethodRef, MethodStub, TypeRef,
    ACC_ABSTRACT, ACC_FINAL, ACC_INTERFACE, ACC_NATIVE, ACC_PRIVATE, ACC_PUBLIC, ACC_STATIC,
    ACC_VARARGS,
};
use smelt_resolve::{
    FailedResolution, MethodResolutionResult, MethodResolver, ResolutionCache,
};

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

fn with_method(mut stub: ClassStub, name: &str, descriptor: &str, access_flags: u16) -> ClassStub {
    stub.methods.push(MethodStub {
        name: name.to_string(),
        descriptor: descriptor.to_string(),
        access_flags,
    });
    stub
}

fn object_stub() -> ClassStub {
    let mut object = class("java.lang.Object");
    object.super_class = None;
    object = with_method(object, "toString", "()Ljava/lang/String;", ACC_PUBLIC);
    object = with_method(object, "hashCode", "()I", ACC_PUBLIC);
    object
}

fn setup(stubs: Vec<ClassStub>) -> (ItemFactory, ClassGraph) {
    let factory = ItemFactory::new();
    let mut graph = ClassGraph::new();
    graph.insert_stub(&factory, &object_stub()).unwrap();
    for stub in &stubs {
        graph.insert_stub(&factory, stub).unwrap();
    }
    (factory, graph)
}

fn void_method(factory: &ItemFactory, holder: TypeRef, name: &str) -> MethodRef {
    factory.method(holder, name, factory.proto(factory.void_type(), &[]))
}

#[test]
fn resolution_walks_the_superclass_chain() {
    let (factory, graph) = setup(vec![
        with_method(class("com.example.Base"), "m", "()V", ACC_PUBLIC),
        {
            let mut derived = class("com.example.Derived");
            derived.super_class = Some("com.example.Base".to_string());
            derived
        },
    ]);
    let base = factory.class_type("com.example.Base");
    let derived = factory.class_type("com.example.Derived");
    let resolver = MethodResolver::new(&graph, &factory);

    let result = resolver.resolve_method_on_class_type(derived, void_method(&factory, derived, "m"));
    let single = result.single().expect("resolution should succeed");
    assert_eq!(single.initial_holder().ty, derived);
    assert_eq!(single.resolved_holder().ty, base);
    assert_eq!(single.method().reference, void_method(&factory, base, "m"));
}

#[test]
fn missing_holder_is_class_not_found() {
    let (factory, graph) = setup(vec![]);
    let ghost = factory.class_type("com.example.Ghost");
    let resolver = MethodResolver::new(&graph, &factory);

    let result = resolver.resolve_method(void_method(&factory, ghost, "m"));
    assert!(matches!(
        result.failed(),
        Some(FailedResolution::ClassNotFound)
    ));
}

#[test]
fn unknown_method_is_no_such_method() {
    let (factory, graph) = setup(vec![class("com.example.Empty")]);
    let empty = factory.class_type("com.example.Empty");
    let resolver = MethodResolver::new(&graph, &factory);

    let result = resolver.resolve_method(void_method(&factory, empty, "missing"));
    assert!(matches!(
        result.failed(),
        Some(FailedResolution::NoSuchMethod {
            due_to_multiple_definitions: false,
            ..
        })
    ));
}

#[test]
fn class_kind_resolution_on_an_interface_is_incompatible() {
    let (factory, graph) = setup(vec![
        with_method(interface("com.example.I"), "m", "()V", ACC_PUBLIC | ACC_ABSTRACT),
        class("com.example.C"),
    ]);
    let resolver = MethodResolver::new(&graph, &factory);

    let iface = factory.class_type("com.example.I");
    let result = resolver.resolve_method_on_class_type(iface, void_method(&factory, iface, "m"));
    assert!(result
        .failed()
        .is_some_and(FailedResolution::is_incompatible_class_change_error));

    let class_ty = factory.class_type("com.example.C");
    let result =
        resolver.resolve_method_on_interface_type(class_ty, void_method(&factory, class_ty, "m"));
    assert!(result
        .failed()
        .is_some_and(FailedResolution::is_incompatible_class_change_error));
}

#[test]
fn array_clone_has_no_declaring_class() {
    let (factory, graph) = setup(vec![]);
    let resolver = MethodResolver::new(&graph, &factory);
    let int_array = factory.array_type(factory.int_type());

    let clone_proto = factory.proto(factory.object_type(), &[]);
    let clone = factory.method(int_array, "clone", clone_proto);
    assert!(resolver.resolve_method(clone).is_array_clone());

    // Every other array method resolves on java.lang.Object.
    let to_string = factory.method(
        int_array,
        "toString",
        factory.proto(factory.class_type("java.lang.String"), &[]),
    );
    let result = resolver.resolve_method(to_string);
    let single = result.single().expect("resolves on Object");
    assert_eq!(single.resolved_holder().ty, factory.object_type());
}

#[test]
fn interface_resolution_finds_public_object_methods() {
    let (factory, graph) = setup(vec![interface("com.example.I")]);
    let iface = factory.class_type("com.example.I");
    let resolver = MethodResolver::new(&graph, &factory);

    let hash_code = factory.method(iface, "hashCode", factory.proto(factory.int_type(), &[]));
    let result = resolver.resolve_method(hash_code);
    let single = result.single().expect("hashCode resolves on Object");
    assert_eq!(single.initial_holder().ty, iface);
    assert_eq!(single.resolved_holder().ty, factory.object_type());
}

#[test]
fn private_method_behind_a_subclass_reference_stays_ambiguous() {
    let (factory, graph) = setup(vec![
        with_method(class("p1.A"), "m", "()V", ACC_PRIVATE),
        {
            let mut b = class("p1.B");
            b.super_class = Some("p1.A".to_string());
            b
        },
        class("p2.C"),
    ]);
    let a = factory.class_type("p1.A");
    let b = factory.class_type("p1.B");
    let resolver = MethodResolver::new(&graph, &factory);

    let result = resolver.resolve_method_on_class_type(b, void_method(&factory, b, "m"));
    let failed = result.failed().expect("private seen through subclass");
    assert!(matches!(
        failed,
        FailedResolution::IllegalAccessOrNoSuchMethod { .. }
    ));

    // Disambiguation is deferred until a calling context is known.
    let stranger = graph.definition_for(factory.class_type("p2.C")).unwrap();
    assert!(failed.is_illegal_access_error(&graph, &factory, stranger));
    assert!(!failed.is_no_such_method_error(&graph, &factory, stranger));

    let declaring = graph.definition_for(a).unwrap();
    assert!(!failed.is_illegal_access_error(&graph, &factory, declaring));
    assert!(failed.is_no_such_method_error(&graph, &factory, declaring));
}

#[test]
fn ambiguous_default_methods_fail_resolution() {
    let (factory, graph) = setup(vec![
        with_method(interface("com.example.I1"), "m", "()V", ACC_PUBLIC),
        with_method(interface("com.example.I2"), "m", "()V", ACC_PUBLIC),
        {
            let mut x = class("com.example.X");
            x.interfaces = vec!["com.example.I1".to_string(), "com.example.I2".to_string()];
            x
        },
    ]);
    let x = factory.class_type("com.example.X");
    let resolver = MethodResolver::new(&graph, &factory);

    let result = resolver.resolve_method_on_class_type(x, void_method(&factory, x, "m"));
    let failed = result.failed().expect("equally specific defaults must fail");
    assert!(failed.is_incompatible_class_change_error());

    let mut types = Vec::new();
    let mut methods = 0usize;
    failed.for_each_failure_dependency(&mut |ty| types.push(ty), &mut |_| methods += 1);
    assert_eq!(methods, 2);
    assert!(types.contains(&factory.class_type("com.example.I1")));
    assert!(types.contains(&factory.class_type("com.example.I2")));
}

#[test]
fn subinterface_default_shadows_superinterface_default() {
    let (factory, graph) = setup(vec![
        with_method(interface("com.example.I1"), "m", "()V", ACC_PUBLIC),
        {
            let mut i2 = with_method(interface("com.example.I2"), "m", "()V", ACC_PUBLIC);
            i2.interfaces = vec!["com.example.I1".to_string()];
            i2
        },
        {
            let mut x = class("com.example.X");
            x.interfaces = vec!["com.example.I1".to_string(), "com.example.I2".to_string()];
            x
        },
    ]);
    let x = factory.class_type("com.example.X");
    let i2 = factory.class_type("com.example.I2");
    let resolver = MethodResolver::new(&graph, &factory);

    let result = resolver.resolve_method_on_class_type(x, void_method(&factory, x, "m"));
    let single = result.single().expect("the more specific default wins");
    assert_eq!(single.resolved_holder().ty, i2);
}

#[test]
fn abstract_only_candidates_resolve_deterministically() {
    let (factory, graph) = setup(vec![
        with_method(
            interface("com.example.I1"),
            "m",
            "()V",
            ACC_PUBLIC | ACC_ABSTRACT,
        ),
        with_method(
            interface("com.example.I2"),
            "m",
            "()V",
            ACC_PUBLIC | ACC_ABSTRACT,
        ),
        {
            let mut x = class("com.example.X");
            x.interfaces = vec!["com.example.I1".to_string(), "com.example.I2".to_string()];
            x
        },
    ]);
    let x = factory.class_type("com.example.X");
    let resolver = MethodResolver::new(&graph, &factory);

    // All candidates abstract: any target suffices, the first recorded is
    // picked for determinism.
    let result = resolver.resolve_method_on_class_type(x, void_method(&factory, x, "m"));
    let single = result.single().expect("abstract candidates do not clash");
    assert_eq!(single.resolved_holder().ty, factory.class_type("com.example.I1"));
}

#[test]
fn duplicate_definitions_retain_every_candidate() {
    let factory = ItemFactory::new();
    let mut graph = ClassGraph::new();
    graph.insert_stub(&factory, &object_stub()).unwrap();
    // One program definition declares m(), a duplicate library definition
    // does not.
    graph
        .insert_stub(
            &factory,
            &with_method(class("com.example.Dup"), "m", "()V", ACC_PUBLIC),
        )
        .unwrap();
    let mut library_dup = class("com.example.Dup");
    library_dup.origin = ClassOrigin::Library;
    graph.insert_stub(&factory, &library_dup).unwrap();

    let dup = factory.class_type("com.example.Dup");
    let resolver = MethodResolver::new(&graph, &factory);
    let result = resolver.resolve_method(void_method(&factory, dup, "m"));

    let MethodResolutionResult::Multiple(multiple) = result else {
        panic!("duplicate definitions should produce a multi-result");
    };
    assert_eq!(multiple.program_or_classpath_results().len(), 1);
    // The NoSuchMethod outcome is merged into one failure that keeps the
    // responsible type, so the error can be reproduced later.
    let [failure] = multiple.failed_results() else {
        panic!("expected a single merged failure");
    };
    assert!(matches!(
        failure,
        FailedResolution::NoSuchMethod {
            due_to_multiple_definitions: true,
            ..
        }
    ));
    let mut types = Vec::new();
    failure.for_each_failure_dependency(&mut |ty| types.push(ty), &mut |_| {});
    assert!(types.contains(&dup));
}

#[test]
fn signature_polymorphic_methods_match_any_descriptor() {
    let (factory, graph) = setup(vec![with_method(
        class("java.lang.invoke.MethodHandle"),
        "invoke",
        "([Ljava/lang/Object;)Ljava/lang/Object;",
        ACC_PUBLIC | ACC_FINAL | ACC_NATIVE | ACC_VARARGS,
    )]);
    let method_handle = factory.class_type("java.lang.invoke.MethodHandle");
    let resolver = MethodResolver::new(&graph, &factory);

    let call_site_proto = factory.proto(factory.int_type(), &[factory.int_type()]);
    let reference = factory.method(method_handle, "invoke", call_site_proto);
    let result = resolver.resolve_method(reference);
    let single = result.single().expect("polymorphic match");
    assert_eq!(single.resolved_holder().ty, method_handle);
    assert_eq!(
        factory.proto_descriptor(factory.method_proto(single.method().reference)),
        "([Ljava/lang/Object;)Ljava/lang/Object;"
    );
}

#[test]
fn resolution_cache_computes_once_per_key() {
    let (factory, graph) = setup(vec![with_method(
        class("com.example.A"),
        "m",
        "()V",
        ACC_PUBLIC,
    )]);
    let a = factory.class_type("com.example.A");
    let resolver = MethodResolver::new(&graph, &factory);
    let cache = ResolutionCache::new();

    let reference = void_method(&factory, a, "m");
    let first = cache.resolve_method(&resolver, reference);
    let second = cache.resolve_method(&resolver, reference);
    assert_eq!(cache.len(), 1);
    assert_eq!(
        first.single().unwrap().method().reference,
        second.single().unwrap().method().reference
    );

    cache.resolve_method(&resolver, void_method(&factory, a, "missing"));
    assert_eq!(cache.len(), 2);
}

#[test]
fn static_and_private_matches_do_not_become_default_candidates() {
    let (factory, graph) = setup(vec![
        with_method(interface("com.example.Base"), "m", "()V", ACC_PUBLIC),
        {
            // A static redeclaration does not shadow the inherited default.
            let mut middle =
                with_method(interface("com.example.Middle"), "m", "()V", ACC_PUBLIC | ACC_STATIC);
            middle.interfaces = vec!["com.example.Base".to_string()];
            middle
        },
        {
            let mut x = class("com.example.X");
            x.interfaces = vec!["com.example.Middle".to_string()];
            x
        },
    ]);
    let x = factory.class_type("com.example.X");
    let resolver = MethodResolver::new(&graph, &factory);

    let result = resolver.resolve_method_on_class_type(x, void_method(&factory, x, "m"));
    let single = result.single().expect("the inherited default is found");
    assert_eq!(single.resolved_holder().ty, factory.class_type("com.example.Base"));
}
