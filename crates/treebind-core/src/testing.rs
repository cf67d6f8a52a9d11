//! Shared test fixture: a small inventory model exercising every codec
//! concern (keyed lists, choices, leaf-lists, defaults, identities,
//! augmentations and generated value types).

use std::sync::Arc;

use crate::codec::CodecTree;
use crate::model::qname::{ModuleId, QName};
use crate::model::registry::{
    Accessor, AccessorShape, BitField, EnumVariant, KeyField, TypeDescriptor, TypeKind,
    TypeRegistry, TypeToken, UnionMember, ValueShape,
};
use crate::model::schema::{Identity, SchemaContext, SchemaNode, SchemaType};
use crate::model::value::Value;

pub(crate) fn inv() -> ModuleId {
    ModuleId::new("urn:example:inventory", None)
}

pub(crate) fn vnd() -> ModuleId {
    ModuleId::new("urn:example:vendor", None)
}

pub(crate) fn inv_q(local: &str) -> QName {
    QName::new(inv(), local)
}

pub(crate) fn vnd_q(local: &str) -> QName {
    QName::new(vnd(), local)
}

pub(crate) fn token(name: &str) -> TypeToken {
    TypeToken::new(name)
}

pub(crate) fn schema() -> Arc<SchemaContext> {
    let endpoint = SchemaNode::list(
        inv_q("endpoint"),
        vec![inv_q("id"), inv_q("name")],
        vec![
            SchemaNode::leaf(inv_q("id"), SchemaType::Int32),
            SchemaNode::leaf(inv_q("name"), SchemaType::String),
            SchemaNode::leaf_with_default(inv_q("mtu"), SchemaType::Uint16, Value::Uint16(1500)),
            SchemaNode::choice(
                inv_q("transport"),
                vec![
                    SchemaNode::case(
                        inv_q("tcp"),
                        vec![
                            SchemaNode::leaf(inv_q("port"), SchemaType::Uint16),
                            SchemaNode::container(
                                inv_q("keepalive"),
                                vec![SchemaNode::leaf(inv_q("interval"), SchemaType::Uint16)],
                            ),
                        ],
                    ),
                    SchemaNode::case(
                        inv_q("udp"),
                        vec![SchemaNode::leaf(inv_q("dscp"), SchemaType::Uint8)],
                    ),
                ],
            ),
        ],
    );
    let inventory = SchemaNode::container(
        inv_q("inventory"),
        vec![
            SchemaNode::leaf(
                inv_q("mode"),
                SchemaType::Enumeration {
                    symbols: vec![Arc::from("normal"), Arc::from("turbo")],
                },
            ),
            SchemaNode::leaf(
                inv_q("flags"),
                SchemaType::Bits {
                    names: vec![Arc::from("a"), Arc::from("b"), Arc::from("c")],
                },
            ),
            SchemaNode::leaf(
                inv_q("limit"),
                SchemaType::Union {
                    members: vec![SchemaType::Int32, SchemaType::String],
                },
            ),
            SchemaNode::leaf(
                inv_q("role"),
                SchemaType::IdentityRef {
                    base: inv_q("role"),
                },
            ),
            SchemaNode::leaf(inv_q("target"), SchemaType::InstanceIdentifier),
            SchemaNode::leaf_list(inv_q("tags"), SchemaType::String),
            SchemaNode::presence_container(
                inv_q("snapshot"),
                vec![SchemaNode::leaf(inv_q("taken"), SchemaType::Bool)],
            ),
            endpoint,
        ],
    )
    .with_augment(vec![
        SchemaNode::leaf(vnd_q("vendor"), SchemaType::String),
        SchemaNode::leaf(vnd_q("firmware"), SchemaType::String),
    ]);

    Arc::new(SchemaContext::new(
        vec![inv(), vnd()],
        vec![inventory],
        vec![
            Identity {
                qname: inv_q("role"),
                bases: vec![],
            },
            Identity {
                qname: inv_q("admin"),
                bases: vec![inv_q("role")],
            },
        ],
    ))
}

fn leaf(name: &str, qname: QName, shape: ValueShape) -> Accessor {
    Accessor::new(name, qname, AccessorShape::Leaf { value: shape })
}

pub(crate) fn registry() -> Arc<TypeRegistry> {
    let registry = Arc::new(TypeRegistry::new());

    registry.register(TypeDescriptor::new(
        token("Inventory"),
        inv(),
        TypeKind::Container {
            qname: inv_q("inventory"),
            accessors: vec![
                leaf("mode", inv_q("mode"), ValueShape::Typed(token("Mode"))),
                leaf("flags", inv_q("flags"), ValueShape::Typed(token("Flags"))),
                leaf("limit", inv_q("limit"), ValueShape::Typed(token("Limit"))),
                leaf("role", inv_q("role"), ValueShape::Typed(token("RoleRef"))),
                leaf(
                    "target",
                    inv_q("target"),
                    ValueShape::Typed(token("TargetRef")),
                ),
                Accessor::new(
                    "tags",
                    inv_q("tags"),
                    AccessorShape::LeafList {
                        value: ValueShape::Builtin,
                    },
                ),
                Accessor::new(
                    "snapshot",
                    inv_q("snapshot"),
                    AccessorShape::Container {
                        type_token: token("Snapshot"),
                    },
                ),
                Accessor::new(
                    "endpoint",
                    inv_q("endpoint"),
                    AccessorShape::List {
                        entry: token("Endpoint"),
                    },
                ),
            ],
        },
    ));

    registry.register(TypeDescriptor::new(
        token("Snapshot"),
        inv(),
        TypeKind::Container {
            qname: inv_q("snapshot"),
            accessors: vec![leaf("taken", inv_q("taken"), ValueShape::Builtin)],
        },
    ));

    registry.register(TypeDescriptor::new(
        token("Endpoint"),
        inv(),
        TypeKind::ListEntry {
            qname: inv_q("endpoint"),
            key: Some(token("EndpointKey")),
            accessors: vec![
                leaf("id", inv_q("id"), ValueShape::Builtin),
                leaf("name", inv_q("name"), ValueShape::Builtin),
                leaf("mtu", inv_q("mtu"), ValueShape::Builtin),
                Accessor::new(
                    "transport",
                    inv_q("transport"),
                    AccessorShape::Choice {
                        type_token: token("Transport"),
                    },
                ),
            ],
        },
    ));

    registry.register(TypeDescriptor::new(
        token("EndpointKey"),
        inv(),
        TypeKind::Key {
            list: token("Endpoint"),
            fields: vec![
                KeyField {
                    name: Arc::from("id"),
                    qname: inv_q("id"),
                },
                KeyField {
                    name: Arc::from("name"),
                    qname: inv_q("name"),
                },
            ],
        },
    ));

    registry.register(TypeDescriptor::new(
        token("Transport"),
        inv(),
        TypeKind::Choice {
            qname: inv_q("transport"),
            cases: vec![token("TcpCase"), token("UdpCase")],
        },
    ));
    registry.register(TypeDescriptor::new(
        token("TcpCase"),
        inv(),
        TypeKind::Case {
            qname: inv_q("tcp"),
            choice: token("Transport"),
            accessors: vec![
                leaf("port", inv_q("port"), ValueShape::Builtin),
                Accessor::new(
                    "keepalive",
                    inv_q("keepalive"),
                    AccessorShape::Container {
                        type_token: token("Keepalive"),
                    },
                ),
            ],
        },
    ));
    registry.register(TypeDescriptor::new(
        token("Keepalive"),
        inv(),
        TypeKind::Container {
            qname: inv_q("keepalive"),
            accessors: vec![leaf("interval", inv_q("interval"), ValueShape::Builtin)],
        },
    ));
    registry.register(TypeDescriptor::new(
        token("UdpCase"),
        inv(),
        TypeKind::Case {
            qname: inv_q("udp"),
            choice: token("Transport"),
            accessors: vec![leaf("dscp", inv_q("dscp"), ValueShape::Builtin)],
        },
    ));

    registry.register(TypeDescriptor::new(
        token("Mode"),
        inv(),
        TypeKind::Enum {
            variants: vec![
                EnumVariant {
                    name: Arc::from("Normal"),
                    symbol: Arc::from("normal"),
                },
                EnumVariant {
                    name: Arc::from("Turbo"),
                    symbol: Arc::from("turbo"),
                },
            ],
        },
    ));
    registry.register(TypeDescriptor::new(
        token("Flags"),
        inv(),
        TypeKind::Bits {
            fields: ["a", "b", "c"]
                .into_iter()
                .map(|name| BitField {
                    name: Arc::from(name),
                    bit: Arc::from(name),
                })
                .collect(),
        },
    ));
    registry.register(TypeDescriptor::new(
        token("Limit"),
        inv(),
        TypeKind::Union {
            members: vec![
                UnionMember {
                    name: Arc::from("int32"),
                    value: ValueShape::Builtin,
                },
                UnionMember {
                    name: Arc::from("string"),
                    value: ValueShape::Builtin,
                },
            ],
        },
    ));

    registry.register(TypeDescriptor::new(
        token("RoleIdentity"),
        inv(),
        TypeKind::Identity {
            qname: inv_q("role"),
        },
    ));
    registry.register(TypeDescriptor::new(
        token("AdminIdentity"),
        inv(),
        TypeKind::Identity {
            qname: inv_q("admin"),
        },
    ));

    registry
}

/// The vendor augmentation, registered separately so tests can exercise
/// late registration.
pub(crate) fn register_vendor_augment(registry: &TypeRegistry) {
    registry.register(TypeDescriptor::new(
        token("VendorAug"),
        vnd(),
        TypeKind::Augmentation {
            target: token("Inventory"),
            accessors: vec![
                leaf("firmware", vnd_q("firmware"), ValueShape::Builtin),
                leaf("vendor", vnd_q("vendor"), ValueShape::Builtin),
            ],
        },
    ));
}

pub(crate) fn tree() -> CodecTree {
    let registry = registry();
    register_vendor_augment(&registry);
    CodecTree::new(registry, schema())
}

pub(crate) fn tree_without_augment() -> (Arc<TypeRegistry>, CodecTree) {
    let registry = registry();
    (registry.clone(), CodecTree::new(registry, schema()))
}
