//! Augmentation contexts.
//!
//! Augmentations have no schema name of their own; their identity is the
//! set of child qnames they contribute to the target. Contexts are
//! discovered from the registry on every structural reload of the target,
//! so augmentation types registered after the tree was built merge in
//! without invalidating anything.

use std::sync::Arc;

use tracing::trace;

use crate::codec::node::DataObjectNode;
use crate::codec::TreeCtx;
use crate::model::path::AugmentId;
use crate::model::registry::{TypeDescriptor, TypeToken};
use crate::model::schema::SchemaNode;

/// The stable identity of one augmentation type: its contributed children.
pub(crate) fn identifier(descriptor: &TypeDescriptor) -> AugmentId {
    AugmentId::new(descriptor.child_signature())
}

/// Builds contexts for every augmentation currently registered against
/// `target_token`. Unresolvable candidates are skipped; they are retried on
/// the next reload.
pub(crate) fn discover(
    ctx: &Arc<TreeCtx>,
    target_token: &TypeToken,
    schema: &Arc<SchemaNode>,
) -> Vec<(AugmentId, Arc<DataObjectNode>)> {
    let mut found = Vec::new();
    for descriptor in ctx.registry.augmentations_of(target_token) {
        let id = identifier(&descriptor);
        match DataObjectNode::new(ctx.clone(), descriptor.clone(), schema.clone()) {
            Ok(node) => found.push((id, node)),
            Err(error) => {
                trace!(
                    target = %target_token,
                    augmentation = %descriptor.token(),
                    %error,
                    "augmentation context not resolvable yet"
                );
            }
        }
    }
    found
}
