//! Structural reference translation.
//!
//! Leaves whose values are references to other data nodes carry whole paths
//! as values. Translating those paths requires the codec tree itself, which
//! in turn owns the value codec library, so the tree hands its reference
//! codec a weak handle to break the cycle.

use std::sync::Weak;

use crate::codec::TreeCtx;
use crate::errors::{CodecError, CodecResult};
use crate::model::path::{GenericPath, TypedPath};

/// Translates whole paths carried as leaf values.
pub trait PathReferenceCodec: Send + Sync {
    fn to_generic_path(&self, path: &TypedPath) -> CodecResult<GenericPath>;
    fn to_typed_path(&self, path: &GenericPath) -> CodecResult<TypedPath>;
}

/// The codec tree's own path translation, held weakly.
pub(crate) struct TreeReference {
    tree: Weak<TreeCtx>,
}

impl TreeReference {
    pub(crate) fn new(tree: Weak<TreeCtx>) -> Self {
        Self { tree }
    }

    fn upgrade(&self) -> CodecResult<std::sync::Arc<TreeCtx>> {
        self.tree
            .upgrade()
            .ok_or_else(|| CodecError::UnresolvableReference {
                reference: "codec tree dropped".to_string(),
            })
    }
}

impl PathReferenceCodec for TreeReference {
    fn to_generic_path(&self, path: &TypedPath) -> CodecResult<GenericPath> {
        Ok(self.upgrade()?.resolve_typed(path)?.0)
    }

    fn to_typed_path(&self, path: &GenericPath) -> CodecResult<TypedPath> {
        Ok(self.upgrade()?.resolve_generic(path)?.0)
    }
}
