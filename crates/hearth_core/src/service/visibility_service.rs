//! Visibility use-case service.
//!
//! # Invariants
//! - Single-record checks follow the evaluator's decision order exactly.
//! - `filter_visible` resolves membership at most once per call, so the whole
//!   batch is judged against one registry snapshot.
//! - Output preserves input order.

use crate::access::evaluator::{decide, decide_without_membership, log_warning};
use crate::access::{Decision, MembershipInfo, VisibilityEvaluator, VisibilityResult};
use crate::model::household::{HouseholdId, UserId};
use crate::model::visibility::{parse_visibility_override, Shareable};
use crate::registry::HouseholdRegistry;
use log::debug;
use std::time::Instant;

/// Entry point for visibility checks over caller-supplied records.
pub struct VisibilityService<R: HouseholdRegistry> {
    evaluator: VisibilityEvaluator<R>,
}

impl<R: HouseholdRegistry> VisibilityService<R> {
    pub fn new(registry: R) -> Self {
        Self {
            evaluator: VisibilityEvaluator::new(registry),
        }
    }

    pub fn registry(&self) -> &R {
        self.evaluator.resolver().registry()
    }

    /// Returns whether `requester` may view `record`.
    pub fn can_view<T: Shareable + ?Sized>(
        &self,
        record: &T,
        household_id: HouseholdId,
        requester: UserId,
    ) -> VisibilityResult<bool> {
        self.evaluator.can_view(record, household_id, requester)
    }

    /// Returns the reasoned decision for one record.
    pub fn evaluate<T: Shareable + ?Sized>(
        &self,
        record: &T,
        household_id: HouseholdId,
        requester: UserId,
    ) -> VisibilityResult<Decision> {
        self.evaluator.evaluate(record, household_id, requester)
    }

    /// Evaluates `record` as if its override were `override_value`.
    ///
    /// Lets callers preview a sharing change before saving it. The stored
    /// record is not touched.
    ///
    /// # Errors
    /// - `VisibilityError::InvalidOverride` when `override_value` is not one
    ///   of the supported values.
    pub fn preview_override<T: Shareable + ?Sized>(
        &self,
        record: &T,
        override_value: &str,
        household_id: HouseholdId,
        requester: UserId,
    ) -> VisibilityResult<Decision> {
        let mut context = record.visibility().clone();
        context.visibility_override = parse_visibility_override(override_value)?;
        self.evaluator.evaluate(&context, household_id, requester)
    }

    /// Resolves `user`'s relation to the household.
    pub fn resolve_membership(
        &self,
        household_id: HouseholdId,
        user: UserId,
    ) -> VisibilityResult<MembershipInfo> {
        self.evaluator.resolver().resolve(user, household_id)
    }

    /// Keeps the records `requester` may view.
    ///
    /// # Contract
    /// - Membership is resolved lazily, only when some record needs it.
    /// - Fails with `HouseholdNotFound` only when resolution was needed.
    pub fn filter_visible<'a, T: Shareable>(
        &self,
        records: &'a [T],
        household_id: HouseholdId,
        requester: UserId,
    ) -> VisibilityResult<Vec<&'a T>> {
        let started_at = Instant::now();
        let mut membership: Option<MembershipInfo> = None;
        let mut visible = Vec::with_capacity(records.len());

        for record in records {
            let context = record.visibility();
            let decision = match decide_without_membership(context, requester) {
                Some(decision) => decision,
                None => {
                    let resolved = match membership.take() {
                        Some(resolved) => resolved,
                        None => self.resolve_membership(household_id, requester)?,
                    };
                    let decision = decide(context, requester, &resolved);
                    membership = Some(resolved);
                    decision
                }
            };

            log_warning(&decision, household_id);
            if decision.is_allowed() {
                visible.push(record);
            }
        }

        debug!(
            "event=visibility_filter module=service status=ok household_id={} total={} visible={} resolved={} duration_ms={}",
            household_id,
            records.len(),
            visible.len(),
            membership.is_some(),
            started_at.elapsed().as_millis()
        );
        Ok(visible)
    }
}
