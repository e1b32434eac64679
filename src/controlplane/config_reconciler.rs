//! Configuration Reconciler
//!
//! Converges the operator config map onto a [`DerivedConfig`]:
//!
//! 1. Fetch the config map (absent means create).
//! 2. Release a controller reference held by a different owner kind, e.g.
//!    a bootstrap initializer that created the map before the cluster existed.
//! 3. Write each managed key only when its stored value differs.
//! 4. Make the caller the controlling owner.
//! 5. Persist through [`create_or_update`].
//!
//! Keys outside [`MANAGED_KEYS`](super::derivation::MANAGED_KEYS) are never
//! touched. Store errors are returned as-is; retrying is the caller's job.

use super::derivation::DerivedConfig;
use crate::domain::ports::{
    ConfigMapStore, ConfigMapStoreRef, ConfigResource, OperationResult, OwnerIdentity, OwnerRef,
    ResourceKey,
};
use crate::error::{Error, Result};
use tracing::{debug, error, info};

// =============================================================================
// Create-or-Update
// =============================================================================

/// Create `key` if absent, otherwise apply `mutate` and write back only if
/// the resource actually changed.
pub async fn create_or_update<F>(
    store: &dyn ConfigMapStore,
    key: &ResourceKey,
    mutate: F,
) -> Result<OperationResult>
where
    F: FnOnce(&mut ConfigResource) -> Result<()>,
{
    match store.get(key).await? {
        None => {
            let mut resource = ConfigResource::new(key.clone());
            mutate(&mut resource)?;
            ensure_key_unchanged(&resource, key)?;
            store.create(&resource).await?;
            Ok(OperationResult::Created)
        }
        Some(existing) => {
            let mut resource = existing.clone();
            mutate(&mut resource)?;
            ensure_key_unchanged(&resource, key)?;
            if resource == existing {
                return Ok(OperationResult::Unchanged);
            }
            store.replace(&resource).await?;
            Ok(OperationResult::Updated)
        }
    }
}

fn ensure_key_unchanged(resource: &ConfigResource, key: &ResourceKey) -> Result<()> {
    if &resource.key != key {
        return Err(Error::Internal(format!(
            "mutation moved {} to {}",
            key, resource.key
        )));
    }
    Ok(())
}

// =============================================================================
// Ownership
// =============================================================================

/// Release any controller reference whose kind differs from `owner`.
///
/// The released reference stays on the object as a plain owner reference
/// with its controller and block-owner-deletion flags cleared.
pub fn hand_off(refs: Vec<OwnerRef>, owner: &OwnerIdentity) -> Vec<OwnerRef> {
    refs.into_iter()
        .map(|r| {
            if r.is_controller() && !r.owner.same_group_kind(owner) {
                r.released()
            } else {
                r
            }
        })
        .collect()
}

/// Make `owner` the controller of `resource`, upserting on group/kind/name.
///
/// Fails if a different object still holds the controller reference.
pub fn set_controller_reference(resource: &mut ConfigResource, owner: &OwnerIdentity) -> Result<()> {
    if let Some(existing) = resource.controller() {
        if !existing.owner.same_object(owner) {
            return Err(Error::AlreadyOwned {
                resource: format!("ConfigMap/{}", resource.key),
                owner_kind: existing.owner.kind.clone(),
                owner_name: existing.owner.name.clone(),
            });
        }
    }

    let desired = OwnerRef::controller_of(owner.clone());
    match resource
        .owner_references
        .iter_mut()
        .find(|r| r.owner.same_object(owner))
    {
        Some(slot) => *slot = desired,
        None => resource.owner_references.push(desired),
    }
    Ok(())
}

// =============================================================================
// Config Reconciler
// =============================================================================

/// Merges derived values into the persisted config map
#[derive(Clone)]
pub struct ConfigReconciler {
    store: ConfigMapStoreRef,
}

impl ConfigReconciler {
    pub fn new(store: ConfigMapStoreRef) -> Self {
        Self { store }
    }

    /// Converge `target` onto `desired`, owned by `owner`.
    ///
    /// Returns `true` if the config map was created or at least one value moved.
    pub async fn reconcile(
        &self,
        desired: &DerivedConfig,
        target: &ResourceKey,
        owner: &OwnerIdentity,
    ) -> Result<bool> {
        let entries = desired.entries();

        let result = create_or_update(self.store.as_ref(), target, |cm| {
            let refs = std::mem::take(&mut cm.owner_references);
            cm.owner_references = hand_off(refs, owner);

            for (key, value) in entries {
                if cm.data.get(key) != Some(&value) {
                    debug!(config_map = %target, key = %key, value = %value, "Updating key");
                    cm.data.insert(key.to_string(), value);
                }
            }

            set_controller_reference(cm, owner)
        })
        .await;

        match result {
            Ok(op) => {
                if op.is_change() {
                    info!(config_map = %target, operation = %op, "Operator config reconciled");
                } else {
                    debug!(config_map = %target, "Operator config already up to date");
                }
                Ok(op.is_change())
            }
            Err(e) => {
                error!(config_map = %target, error = %e, "Failed to update operator config map");
                Err(e)
            }
        }
    }
}
