//! Schema-driven codecs between generic data trees and generated typed
//! objects.
//!
//! The library bridges two representations of the same schema-modeled data:
//! a generic tree of qualified-name-labeled nodes, and strongly typed
//! objects mirroring generated source code. A [`codec::CodecTree`] built
//! over one schema context and one type registry translates paths, objects
//! and values in both directions, lazily and with aggressive caching:
//! contexts are created on first use, child indexes grow monotonically, and
//! deserialization defers all per-field work to first access.
//!
//! ```
//! use std::sync::Arc;
//! use treebind_core::model::{SchemaContext, TypeRegistry};
//! use treebind_core::codec::CodecTree;
//!
//! let registry = Arc::new(TypeRegistry::new());
//! let schema = Arc::new(SchemaContext::new(vec![], vec![], vec![]));
//! let tree = CodecTree::new(registry, schema);
//! # let _ = tree;
//! ```

pub mod codec;
pub mod errors;
pub mod model;
pub mod path;
pub mod schema_tree;
pub mod serializer;
pub mod value;
pub mod view;

#[cfg(test)]
pub(crate) mod testing;

pub use codec::CodecTree;
pub use errors::{CodecError, CodecResult};
pub use view::LazyView;
