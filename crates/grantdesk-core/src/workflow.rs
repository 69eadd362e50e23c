//! Fund request lifecycle.
//!
//! ```text
//! draft ──submit──> submitted ──dept head──> dept_approved ──admin──> approved
//!   ^                   │                          │
//!   │                   ├──reject──> rejected <────┤
//!   └───── revise ──────┴──> revision_requested <──┘
//!
//! draft | submitted | revision_requested ──withdraw──> withdrawn
//! ```
//!
//! A department head's own request skips the department stage on submit.

use crate::error::AppError;
use crate::models::{RequestStatus, ReviewDecision, ReviewStage, Role};

/// Something a user does to a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestAction {
    Submit,
    Withdraw,
    Review {
        stage: ReviewStage,
        decision: ReviewDecision,
    },
}

impl RequestAction {
    /// Verb used in error messages.
    pub fn verb(&self) -> &'static str {
        match self {
            RequestAction::Submit => "submit",
            RequestAction::Withdraw => "withdraw",
            RequestAction::Review {
                decision: ReviewDecision::Approve,
                ..
            } => "approve",
            RequestAction::Review {
                decision: ReviewDecision::Reject,
                ..
            } => "reject",
            RequestAction::Review {
                decision: ReviewDecision::Revise,
                ..
            } => "request revision of",
        }
    }
}

/// The parts of a user that matter for authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: i64,
    pub role: Role,
    pub department_id: Option<i64>,
}

impl RequestStatus {
    /// The owner may still change the request.
    pub fn is_editable(&self) -> bool {
        matches!(self, RequestStatus::Draft | RequestStatus::RevisionRequested)
    }

    /// No further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RequestStatus::Approved | RequestStatus::Rejected | RequestStatus::Withdrawn
        )
    }

    /// Which reviewer the request is waiting on, if any.
    pub fn awaiting_stage(&self) -> Option<ReviewStage> {
        match self {
            RequestStatus::Submitted => Some(ReviewStage::DeptHead),
            RequestStatus::DeptApproved => Some(ReviewStage::Admin),
            _ => None,
        }
    }
}

/// Review stage a role reviews at, if it reviews at all.
pub fn review_stage_for(role: Role) -> Option<ReviewStage> {
    match role {
        Role::DeptHead => Some(ReviewStage::DeptHead),
        Role::Admin | Role::SuperAdmin => Some(ReviewStage::Admin),
        Role::Teacher | Role::Staff => None,
    }
}

/// Computes the status after `action`, or `InvalidTransition`.
///
/// `owner_role` is the role of the user who owns the request.
pub fn next_status(
    current: RequestStatus,
    action: RequestAction,
    owner_role: Role,
) -> Result<RequestStatus, AppError> {
    use RequestStatus::*;

    let next = match (current, action) {
        (Draft | RevisionRequested, RequestAction::Submit) => {
            if owner_role.is_dept_head() {
                Some(DeptApproved)
            } else {
                Some(Submitted)
            }
        }
        (Draft | Submitted | RevisionRequested, RequestAction::Withdraw) => Some(Withdrawn),
        (Submitted, RequestAction::Review { stage: ReviewStage::DeptHead, decision })
        | (DeptApproved, RequestAction::Review { stage: ReviewStage::Admin, decision }) => {
            Some(match (current, decision) {
                (Submitted, ReviewDecision::Approve) => DeptApproved,
                (_, ReviewDecision::Approve) => Approved,
                (_, ReviewDecision::Reject) => Rejected,
                (_, ReviewDecision::Revise) => RevisionRequested,
            })
        }
        _ => None,
    };

    next.ok_or(AppError::InvalidTransition {
        from: current.as_str(),
        action: action.verb(),
    })
}

/// Checks that `actor` may perform `action` on a request owned by `owner`.
pub fn authorize(action: RequestAction, actor: &Actor, owner: &Actor) -> Result<(), AppError> {
    match action {
        RequestAction::Submit | RequestAction::Withdraw => {
            if actor.user_id != owner.user_id {
                return Err(AppError::Forbidden(
                    "only the owner can submit or withdraw a request".to_string(),
                ));
            }
        }
        RequestAction::Review {
            stage: ReviewStage::DeptHead,
            ..
        } => {
            if !actor.role.is_dept_head() {
                return Err(AppError::Forbidden(
                    "department review requires a department head".to_string(),
                ));
            }
            if actor.user_id == owner.user_id {
                return Err(AppError::Forbidden(
                    "reviewers cannot review their own request".to_string(),
                ));
            }
            if actor.department_id.is_none() || actor.department_id != owner.department_id {
                return Err(AppError::Forbidden(
                    "request belongs to another department".to_string(),
                ));
            }
        }
        RequestAction::Review {
            stage: ReviewStage::Admin,
            ..
        } => {
            if !actor.role.can_access_admin() {
                return Err(AppError::Forbidden(
                    "final review requires an administrator".to_string(),
                ));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review(stage: ReviewStage, decision: ReviewDecision) -> RequestAction {
        RequestAction::Review { stage, decision }
    }

    fn actor(user_id: i64, role: Role, department_id: Option<i64>) -> Actor {
        Actor {
            user_id,
            role,
            department_id,
        }
    }

    #[test]
    fn test_submit_from_draft() {
        let next = next_status(RequestStatus::Draft, RequestAction::Submit, Role::Teacher).unwrap();
        assert_eq!(next, RequestStatus::Submitted);
    }

    #[test]
    fn test_resubmit_after_revision() {
        let next = next_status(
            RequestStatus::RevisionRequested,
            RequestAction::Submit,
            Role::Staff,
        )
        .unwrap();
        assert_eq!(next, RequestStatus::Submitted);
    }

    #[test]
    fn test_dept_head_submission_skips_department_stage() {
        let next = next_status(RequestStatus::Draft, RequestAction::Submit, Role::DeptHead).unwrap();
        assert_eq!(next, RequestStatus::DeptApproved);
    }

    #[test]
    fn test_full_happy_path() {
        let mut status = RequestStatus::Draft;
        status = next_status(status, RequestAction::Submit, Role::Teacher).unwrap();
        status = next_status(
            status,
            review(ReviewStage::DeptHead, ReviewDecision::Approve),
            Role::Teacher,
        )
        .unwrap();
        assert_eq!(status, RequestStatus::DeptApproved);
        status = next_status(
            status,
            review(ReviewStage::Admin, ReviewDecision::Approve),
            Role::Teacher,
        )
        .unwrap();
        assert_eq!(status, RequestStatus::Approved);
        assert!(status.is_terminal());
    }

    #[test]
    fn test_reject_and_revise_at_each_stage() {
        for (status, stage) in [
            (RequestStatus::Submitted, ReviewStage::DeptHead),
            (RequestStatus::DeptApproved, ReviewStage::Admin),
        ] {
            assert_eq!(
                next_status(status, review(stage, ReviewDecision::Reject), Role::Teacher).unwrap(),
                RequestStatus::Rejected
            );
            assert_eq!(
                next_status(status, review(stage, ReviewDecision::Revise), Role::Teacher).unwrap(),
                RequestStatus::RevisionRequested
            );
        }
    }

    #[test]
    fn test_wrong_stage_is_invalid() {
        let err = next_status(
            RequestStatus::Submitted,
            review(ReviewStage::Admin, ReviewDecision::Approve),
            Role::Teacher,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            AppError::InvalidTransition {
                from: "submitted",
                action: "approve"
            }
        ));
    }

    #[test]
    fn test_terminal_states_reject_everything() {
        for status in [
            RequestStatus::Approved,
            RequestStatus::Rejected,
            RequestStatus::Withdrawn,
        ] {
            assert!(next_status(status, RequestAction::Submit, Role::Teacher).is_err());
            assert!(next_status(status, RequestAction::Withdraw, Role::Teacher).is_err());
        }
    }

    #[test]
    fn test_withdraw_after_dept_approval_is_invalid() {
        assert!(
            next_status(RequestStatus::DeptApproved, RequestAction::Withdraw, Role::Teacher)
                .is_err()
        );
    }

    #[test]
    fn test_status_helpers() {
        assert!(RequestStatus::Draft.is_editable());
        assert!(RequestStatus::RevisionRequested.is_editable());
        assert!(!RequestStatus::Submitted.is_editable());
        assert_eq!(
            RequestStatus::Submitted.awaiting_stage(),
            Some(ReviewStage::DeptHead)
        );
        assert_eq!(
            RequestStatus::DeptApproved.awaiting_stage(),
            Some(ReviewStage::Admin)
        );
        assert_eq!(RequestStatus::Draft.awaiting_stage(), None);
    }

    #[test]
    fn test_review_stage_for_roles() {
        assert_eq!(review_stage_for(Role::DeptHead), Some(ReviewStage::DeptHead));
        assert_eq!(review_stage_for(Role::SuperAdmin), Some(ReviewStage::Admin));
        assert_eq!(review_stage_for(Role::Teacher), None);
    }

    #[test]
    fn test_authorize_owner_only_submit() {
        let owner = actor(1, Role::Teacher, Some(5));
        let other = actor(2, Role::Teacher, Some(5));
        assert!(authorize(RequestAction::Submit, &owner, &owner).is_ok());
        assert!(matches!(
            authorize(RequestAction::Withdraw, &other, &owner),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn test_authorize_dept_head_same_department() {
        let owner = actor(1, Role::Teacher, Some(5));
        let head = actor(9, Role::DeptHead, Some(5));
        let foreign_head = actor(10, Role::DeptHead, Some(6));
        let action = review(ReviewStage::DeptHead, ReviewDecision::Approve);

        assert!(authorize(action, &head, &owner).is_ok());
        assert!(authorize(action, &foreign_head, &owner).is_err());
    }

    #[test]
    fn test_authorize_dept_head_without_department() {
        let owner = actor(1, Role::Teacher, None);
        let head = actor(9, Role::DeptHead, None);
        let action = review(ReviewStage::DeptHead, ReviewDecision::Approve);
        assert!(authorize(action, &head, &owner).is_err());
    }

    #[test]
    fn test_authorize_no_self_review() {
        let head = actor(9, Role::DeptHead, Some(5));
        let action = review(ReviewStage::DeptHead, ReviewDecision::Approve);
        assert!(authorize(action, &head, &head).is_err());
    }

    #[test]
    fn test_authorize_admin_stage() {
        let owner = actor(1, Role::Teacher, Some(5));
        let admin = actor(3, Role::Admin, None);
        let head = actor(9, Role::DeptHead, Some(5));
        let action = review(ReviewStage::Admin, ReviewDecision::Reject);

        assert!(authorize(action, &admin, &owner).is_ok());
        assert!(authorize(action, &head, &owner).is_err());
    }
}
