//! Entity resolution: normalized reference -> base group descriptor.

use crate::{
    domain::{GroupDescriptor, GroupKind, NormalizedRef},
    ports::{Directory, Entity},
    Error, Result,
};

/// Classify an entity's kind from the directory's markers.
///
/// One-way broadcast -> channel; any other channel-like entity ->
/// supergroup; everything else -> plain group.
pub fn classify(entity: &Entity) -> GroupKind {
    if entity.channel_like {
        if entity.broadcast {
            GroupKind::Channel
        } else {
            GroupKind::Supergroup
        }
    } else {
        GroupKind::Group
    }
}

/// Resolve a reference through the directory and build the base descriptor.
///
/// Any lookup failure becomes `Unresolvable`, the single error the caller
/// must answer with a refund.
pub async fn resolve(
    directory: &dyn Directory,
    reference: &NormalizedRef,
) -> Result<(Entity, GroupDescriptor)> {
    let entity = directory
        .lookup(reference)
        .await
        .map_err(|e| Error::Unresolvable(e.to_string()))?;

    let descriptor = GroupDescriptor::base(
        entity.display_title(),
        Some(entity.id),
        classify(&entity),
    );
    Ok((entity, descriptor))
}
