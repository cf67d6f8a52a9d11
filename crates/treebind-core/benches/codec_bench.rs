use std::collections::BTreeMap;
use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use treebind_core::model::{
    build_tree, Accessor, AccessorShape, GenericNode, GenericPath, ListKey, ModuleId, PathSegment,
    QName, SchemaContext, SchemaNode, SchemaType, StreamWriter, TypeDescriptor, TypeKind,
    TypeRegistry, TypeToken, TypedPath, TypedPathStep, TypedValue, Value, ValueShape,
};
use treebind_core::model::registry::KeyField;
use treebind_core::CodecTree;

fn module() -> ModuleId {
    ModuleId::new("urn:bench:inventory", None)
}

fn qname(local: &str) -> QName {
    QName::new(module(), local)
}

fn schema() -> Arc<SchemaContext> {
    let endpoint = SchemaNode::list(
        qname("endpoint"),
        vec![qname("id")],
        vec![
            SchemaNode::leaf(qname("id"), SchemaType::Int32),
            SchemaNode::leaf(qname("name"), SchemaType::String),
            SchemaNode::leaf(qname("mtu"), SchemaType::Uint16),
        ],
    );
    Arc::new(SchemaContext::new(
        vec![module()],
        vec![SchemaNode::container(qname("inventory"), vec![endpoint])],
        vec![],
    ))
}

fn registry() -> Arc<TypeRegistry> {
    let registry = Arc::new(TypeRegistry::new());
    registry.register(TypeDescriptor::new(
        TypeToken::new("Inventory"),
        module(),
        TypeKind::Container {
            qname: qname("inventory"),
            accessors: vec![Accessor::new(
                "endpoint",
                qname("endpoint"),
                AccessorShape::List {
                    entry: TypeToken::new("Endpoint"),
                },
            )],
        },
    ));
    registry.register(TypeDescriptor::new(
        TypeToken::new("Endpoint"),
        module(),
        TypeKind::ListEntry {
            qname: qname("endpoint"),
            key: Some(TypeToken::new("EndpointKey")),
            accessors: vec![
                Accessor::new(
                    "id",
                    qname("id"),
                    AccessorShape::Leaf {
                        value: ValueShape::Builtin,
                    },
                ),
                Accessor::new(
                    "name",
                    qname("name"),
                    AccessorShape::Leaf {
                        value: ValueShape::Builtin,
                    },
                ),
                Accessor::new(
                    "mtu",
                    qname("mtu"),
                    AccessorShape::Leaf {
                        value: ValueShape::Builtin,
                    },
                ),
            ],
        },
    ));
    registry.register(TypeDescriptor::new(
        TypeToken::new("EndpointKey"),
        module(),
        TypeKind::Key {
            list: TypeToken::new("Endpoint"),
            fields: vec![KeyField {
                name: Arc::from("id"),
                qname: qname("id"),
            }],
        },
    ));
    registry
}

fn sample_tree(entries: i32) -> GenericNode {
    build_tree(|w| {
        w.start_container(qname("inventory"))?;
        w.start_keyed_list(qname("endpoint"), false)?;
        for id in 0..entries {
            let mut predicates = BTreeMap::new();
            predicates.insert(qname("id"), Value::Int32(id));
            w.start_list_entry(qname("endpoint"), predicates)?;
            w.leaf(qname("id"), Value::Int32(id))?;
            w.leaf(qname("name"), Value::string(format!("eth{id}")))?;
            w.leaf(qname("mtu"), Value::Uint16(1500))?;
            w.end_node()?;
        }
        w.end_node()?;
        w.end_node()
    })
    .unwrap()
}

fn keyed_path(id: i32) -> TypedPath {
    TypedPath::of(vec![
        TypedPathStep::new(TypeToken::new("Inventory")),
        TypedPathStep::keyed(
            TypeToken::new("Endpoint"),
            ListKey::new(
                TypeToken::new("EndpointKey"),
                vec![("id", TypedValue::Int32(id))],
            ),
        ),
    ])
}

fn bench_paths(c: &mut Criterion) {
    let tree = CodecTree::new(registry(), schema());
    let typed = keyed_path(17);
    let generic = tree.to_generic_path(&typed).unwrap();

    c.bench_function("typed_path_to_generic", |b| {
        b.iter(|| tree.to_generic_path(black_box(&typed)).unwrap())
    });
    c.bench_function("generic_path_to_typed", |b| {
        b.iter(|| tree.to_typed_path(black_box(&generic)).unwrap())
    });
}

fn bench_deserialize(c: &mut Criterion) {
    let tree = CodecTree::new(registry(), schema());
    let node = sample_tree(64);
    let path = GenericPath::of(vec![PathSegment::Node(qname("inventory"))]);

    c.bench_function("view_list_field_access", |b| {
        b.iter(|| {
            let (_, value) = tree
                .from_generic(black_box(&path), black_box(&node))
                .unwrap();
            let TypedValue::Object(object) = value else {
                unreachable!()
            };
            let Some(TypedValue::List(entries)) = object.field("endpoint") else {
                unreachable!()
            };
            black_box(entries.len())
        })
    });
}

fn bench_serialize(c: &mut Criterion) {
    let tree = CodecTree::new(registry(), schema());
    let node = sample_tree(64);
    let path = GenericPath::of(vec![PathSegment::Node(qname("inventory"))]);
    let (typed_path, value) = tree.from_generic(&path, &node).unwrap();
    let TypedValue::Object(object) = value else {
        unreachable!()
    };
    // Force full materialization so the bench measures serialization alone.
    let _ = object.field("endpoint");

    c.bench_function("serialize_64_entries", |b| {
        b.iter(|| {
            tree.to_generic(black_box(&typed_path), black_box(&object))
                .unwrap()
        })
    });
}

criterion_group!(benches, bench_paths, bench_deserialize, bench_serialize);
criterion_main!(benches);
