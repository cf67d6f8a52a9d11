//! Shared data model: qualified names, scalar values, paths, the generic
//! data tree, the typed object model, the schema contract and the
//! generated-type registry.

pub mod node;
pub mod path;
pub mod qname;
pub mod registry;
pub mod schema;
pub mod stream;
pub mod typed;
pub mod value;

pub use node::GenericNode;
pub use path::{AugmentId, GenericPath, PathSegment, TypedPath, TypedPathStep};
pub use qname::{ModuleId, QName};
pub use registry::{
    Accessor, AccessorShape, Constraint, TypeDescriptor, TypeKind, TypeRegistry, TypeToken,
    ValueShape,
};
pub use schema::{Identity, SchemaContext, SchemaKind, SchemaNode, SchemaType};
pub use stream::{build_tree, StreamWriter, TreeWriter};
pub use typed::{BuiltObject, ListKey, TypedObject, TypedValue};
pub use value::{Decimal64, Value};
