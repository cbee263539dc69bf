//! Drop coordination.
//!
//! Takes a finished drop from resolution to the cache: rejections are
//! surfaced, recurring events wait on the scope dialog, and everything else
//! goes straight to [`OptimisticMutations`].

use std::sync::Arc;

use serde_json::Value;

use super::payload::{parse_payload, resolve_target, DragPayload, DropTarget};
use super::resolve::{resolve_drop, DropContext, DropDecision, IgnoreReason, Rejection};
use crate::models::mutation::UpdateKind;
use crate::services::dialog::RecurringScopeDialog;
use crate::services::query_cache::{MutationOutcome, OptimisticMutations};

/// What became of one drop.
#[derive(Debug, Clone, PartialEq)]
pub enum DropOutcome {
    /// The drag data did not describe a known payload or target.
    Unrecognized,
    Ignored(IgnoreReason),
    /// Refused by policy; the user was told why.
    Rejected(Rejection),
    /// The scope dialog was dismissed.
    Aborted,
    Applied(MutationOutcome),
}

impl DropOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, DropOutcome::Applied(_))
    }
}

pub struct DropCoordinator {
    mutations: Arc<OptimisticMutations>,
    dialog: Arc<dyn RecurringScopeDialog>,
    context: DropContext,
}

impl DropCoordinator {
    pub fn new(
        mutations: Arc<OptimisticMutations>,
        dialog: Arc<dyn RecurringScopeDialog>,
        context: DropContext,
    ) -> Self {
        Self {
            mutations,
            dialog,
            context,
        }
    }

    pub fn context(&self) -> &DropContext {
        &self.context
    }

    /// Switch views or calendars without rebuilding the coordinator.
    pub fn set_context(&mut self, context: DropContext) {
        self.context = context;
    }

    pub fn mutations(&self) -> &Arc<OptimisticMutations> {
        &self.mutations
    }

    /// Finish a drop from raw drag data and the drop zones under the pointer.
    pub async fn complete_raw_drop(&self, payload: &Value, targets: &[Value]) -> DropOutcome {
        let (Some(payload), Some(target)) = (parse_payload(payload), resolve_target(targets)) else {
            return DropOutcome::Unrecognized;
        };
        self.complete_drop(&payload, &target).await
    }

    pub async fn complete_drop(&self, payload: &DragPayload, target: &DropTarget) -> DropOutcome {
        match resolve_drop(payload, target, &self.context) {
            DropDecision::Ignore(reason) => DropOutcome::Ignored(reason),
            DropDecision::Reject(rejection) => {
                self.mutations.notifier().notify_error(rejection.message());
                DropOutcome::Rejected(rejection)
            }
            DropDecision::Update { event, patch } => {
                let patch = if event.is_recurring() {
                    match self.dialog.request_scope(&event).await {
                        Some(scope) => {
                            log::debug!("Applying drop of {} to {}", event.id, scope.label());
                            patch.with_scope(Some(scope))
                        }
                        None => {
                            log::debug!("Scope dialog dismissed; drop of {} aborted", event.id);
                            return DropOutcome::Aborted;
                        }
                    }
                } else {
                    patch
                };

                let outcome = self
                    .mutations
                    .update_event(patch, Some(&event), UpdateKind::Drag)
                    .await;
                DropOutcome::Applied(outcome)
            }
            DropDecision::Create(new_event) => {
                DropOutcome::Applied(self.mutations.create_event(new_event).await)
            }
        }
    }
}
