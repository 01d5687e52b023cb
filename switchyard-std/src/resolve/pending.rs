//! The set of pending and in-flight callback instances.
//!
//! Every operation consumes the set and returns the updated one, so a
//! half-applied update is never observable.

use tracing::debug;

use super::{ChangeType, ResolveError, ResolvedCallback, link_blocking};
use crate::layout::Paths;
use switchyard_core::split_id_and_prop;

/// Pending and in-flight callback instances, unique by `resolved_id`.
#[derive(Debug, Clone, Default)]
pub struct PendingCallbacks {
    callbacks: Vec<ResolvedCallback>,
}

impl PendingCallbacks {
    /// An empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of instances.
    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    /// Iterate instances in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &ResolvedCallback> {
        self.callbacks.iter()
    }

    /// Look up an instance.
    pub fn get(&self, resolved_id: &str) -> Option<&ResolvedCallback> {
        self.callbacks.iter().find(|cb| cb.resolved_id == resolved_id)
    }

    /// Union with newly discovered instances.
    ///
    /// Changes merge by strength and initial calls are or-ed. An in-flight
    /// instance that receives a new trigger goes back to undispatched, which
    /// makes its outstanding response stale. Blocking edges are relinked.
    pub fn merge(
        self,
        incoming: Vec<ResolvedCallback>,
        paths: &Paths,
    ) -> Result<Self, ResolveError> {
        let mut callbacks = self.callbacks;
        for cb in incoming {
            match callbacks.iter_mut().find(|c| c.resolved_id == cb.resolved_id) {
                Some(existing) => {
                    let retriggered = cb.initial_call || !cb.changed_prop_ids.is_empty();
                    existing.merge_changes(&cb.changed_prop_ids);
                    existing.initial_call |= cb.initial_call;
                    if retriggered && existing.request_id != 0 {
                        debug!(
                            resolved_id = %existing.resolved_id,
                            request_id = existing.request_id,
                            "superseding in-flight callback"
                        );
                        existing.request_id = 0;
                    }
                }
                None => callbacks.push(cb),
            }
        }
        link_blocking(&mut callbacks, paths)?;
        Ok(Self { callbacks })
    }

    /// Remove an instance after it settled.
    ///
    /// `skipped` lists the props it was expected to write but did not.
    /// Indirect changes on those props are forgotten everywhere, and every
    /// instance left with nothing to do is removed in turn, skipping its own
    /// outputs, until no such instance remains.
    pub fn remove(
        self,
        paths: &Paths,
        resolved_id: &str,
        skipped: &[String],
    ) -> Result<Self, ResolveError> {
        let mut remaining = self.strip(resolved_id, skipped);
        if skipped.is_empty() {
            return Ok(remaining);
        }

        loop {
            let Some(orphan) = remaining
                .callbacks
                .iter()
                .find(|cb| !cb.initial_call && cb.changed_prop_ids.is_empty())
            else {
                break;
            };
            let orphan_id = orphan.resolved_id.clone();
            let outputs: Vec<String> = orphan
                .flat_outputs(paths)?
                .iter()
                .map(|o| o.combined())
                .collect();
            debug!(resolved_id = %orphan_id, "pruning callback with nothing left to do");
            remaining = remaining.strip(&orphan_id, &outputs);
        }
        Ok(remaining)
    }

    fn strip(self, resolved_id: &str, skipped: &[String]) -> Self {
        let callbacks = self
            .callbacks
            .into_iter()
            .filter(|cb| cb.resolved_id != resolved_id)
            .map(|mut cb| {
                cb.blocked_by.remove(resolved_id);
                cb.blocking.remove(resolved_id);
                cb.changed_prop_ids
                    .retain(|prop, change| *change == ChangeType::Direct || !skipped.contains(prop));
                cb
            })
            .collect();
        Self { callbacks }
    }

    /// Remove an instance without touching anything else.
    pub fn discard(self, resolved_id: &str) -> Self {
        self.strip(resolved_id, &[])
    }

    /// Drop instances whose outputs all left the tree, and forget changes
    /// on components that no longer exist.
    pub fn prune_removed(self, paths: &Paths) -> Result<Self, ResolveError> {
        let mut gone = Vec::new();
        let mut callbacks = self.callbacks;
        for cb in &mut callbacks {
            if cb.flat_outputs(paths)?.is_empty() {
                gone.push(cb.resolved_id.clone());
                continue;
            }
            cb.changed_prop_ids.retain(|prop_id, _| {
                split_id_and_prop(prop_id)
                    .map(|(id, _)| paths.contains(&id))
                    .unwrap_or(false)
            });
        }
        let mut pruned = Self { callbacks };
        for id in gone {
            debug!(resolved_id = %id, "outputs removed from layout");
            pruned = pruned.discard(&id);
        }
        Ok(pruned)
    }

    /// Instances ready to dispatch, most blocking first.
    pub fn ready(&self) -> Vec<&ResolvedCallback> {
        let mut ready: Vec<&ResolvedCallback> =
            self.callbacks.iter().filter(|cb| cb.is_ready()).collect();
        ready.sort_by(|a, b| b.blocking.len().cmp(&a.blocking.len()));
        ready
    }

    /// Whether `request_id` is still the live dispatch of an instance.
    pub fn is_request_active(&self, resolved_id: &str, request_id: u64) -> bool {
        self.get(resolved_id)
            .is_some_and(|cb| cb.request_id == request_id)
    }

    pub(crate) fn assign_request(&mut self, resolved_id: &str, request_id: u64) {
        if let Some(cb) = self.callbacks.iter_mut().find(|cb| cb.resolved_id == resolved_id) {
            cb.request_id = request_id;
        }
    }
}
