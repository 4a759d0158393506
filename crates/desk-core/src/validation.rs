//! Validation rules for drafts and records entering the engine.

use crate::sla::SlaPolicy;
use crate::staff::StaffMember;
use crate::ticket::TicketDraft;

/// Maximum title length in characters.
pub const MAX_TITLE_LEN: usize = 255;

/// Longest SLA target a policy may carry, in days.
pub const MAX_TARGET_DAYS: i64 = 365;

/// Error type for validation failures.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("tenant is required")]
    TenantRequired,

    #[error("title is required")]
    TitleRequired,

    #[error("title must be 255 characters or less (got {0})")]
    TitleTooLong(usize),

    #[error("created_by is required")]
    CreatorRequired,

    #[error("invalid reporter email: {0}")]
    InvalidEmail(String),

    #[error("satisfaction rating must be between 1 and 5 (got {0})")]
    InvalidRating(u8),

    #[error("message body is required")]
    EmptyMessage,

    #[error("message sender is required")]
    SenderRequired,

    #[error("staff id is required")]
    StaffIdRequired,

    #[error("staff {0}: max_concurrent_tickets must be at least 1")]
    ZeroCapacity(String),

    #[error("SLA {0} target must be positive")]
    NonPositiveTarget(&'static str),

    #[error("SLA {0} target must be at most 365 days")]
    TargetTooLong(&'static str),

    #[error("escalation level must be at least 1")]
    ZeroEscalationLevel,
}

/// Validates a ticket draft before a ticket is created from it.
pub fn validate_draft(draft: &TicketDraft) -> Result<(), ValidationError> {
    if draft.tenant_id.trim().is_empty() {
        return Err(ValidationError::TenantRequired);
    }
    if draft.title.trim().is_empty() {
        return Err(ValidationError::TitleRequired);
    }
    let len = draft.title.chars().count();
    if len > MAX_TITLE_LEN {
        return Err(ValidationError::TitleTooLong(len));
    }
    if draft.created_by.trim().is_empty() {
        return Err(ValidationError::CreatorRequired);
    }
    if !draft.reporter_email.is_empty() && !looks_like_email(&draft.reporter_email) {
        return Err(ValidationError::InvalidEmail(draft.reporter_email.clone()));
    }
    Ok(())
}

/// Satisfaction ratings are 1 through 5.
pub fn validate_rating(rating: u8) -> Result<(), ValidationError> {
    if (1..=5).contains(&rating) {
        Ok(())
    } else {
        Err(ValidationError::InvalidRating(rating))
    }
}

pub fn validate_message(sender: &str, body: &str) -> Result<(), ValidationError> {
    if sender.trim().is_empty() {
        return Err(ValidationError::SenderRequired);
    }
    if body.trim().is_empty() {
        return Err(ValidationError::EmptyMessage);
    }
    Ok(())
}

/// Validates a staff record coming from the directory.
pub fn validate_staff(staff: &StaffMember) -> Result<(), ValidationError> {
    if staff.id.trim().is_empty() {
        return Err(ValidationError::StaffIdRequired);
    }
    if staff.tenant_id.trim().is_empty() {
        return Err(ValidationError::TenantRequired);
    }
    if staff.max_concurrent_tickets == 0 {
        return Err(ValidationError::ZeroCapacity(staff.id.clone()));
    }
    Ok(())
}

pub fn validate_policy(policy: &SlaPolicy) -> Result<(), ValidationError> {
    if policy.tenant_id.trim().is_empty() {
        return Err(ValidationError::TenantRequired);
    }
    for (name, target) in [
        ("first response", policy.first_response_target),
        ("resolution", policy.resolution_target),
        ("escalation", policy.escalation_time),
    ] {
        if target.num_seconds() <= 0 {
            return Err(ValidationError::NonPositiveTarget(name));
        }
        if target.num_days() > MAX_TARGET_DAYS {
            return Err(ValidationError::TargetTooLong(name));
        }
    }
    if policy.escalation_level == 0 {
        return Err(ValidationError::ZeroEscalationLevel);
    }
    Ok(())
}

// local@domain.tld, nothing fancier.
fn looks_like_email(s: &str) -> bool {
    match s.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !s.contains(char::is_whitespace)
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::{Category, Priority, StaffLevel};
    use chrono::Duration;

    #[test]
    fn valid_draft_passes() {
        let draft = TicketDraft::new("t1", "Printer jam", "alice")
            .reporter("Alice", "alice@lab.example", "");
        assert!(validate_draft(&draft).is_ok());
    }

    #[test]
    fn empty_title_fails() {
        let draft = TicketDraft::new("t1", "  ", "alice");
        match validate_draft(&draft) {
            Err(ValidationError::TitleRequired) => {}
            other => panic!("expected TitleRequired, got {:?}", other),
        }
    }

    #[test]
    fn missing_tenant_fails() {
        let draft = TicketDraft::new("", "Printer jam", "alice");
        match validate_draft(&draft) {
            Err(ValidationError::TenantRequired) => {}
            other => panic!("expected TenantRequired, got {:?}", other),
        }
    }

    #[test]
    fn long_title_fails() {
        let draft = TicketDraft::new("t1", "x".repeat(256), "alice");
        match validate_draft(&draft) {
            Err(ValidationError::TitleTooLong(n)) => assert_eq!(n, 256),
            other => panic!("expected TitleTooLong, got {:?}", other),
        }
    }

    #[test]
    fn bad_email_fails() {
        for email in ["alice", "alice@", "@lab.example", "a@b", "a b@lab.example"] {
            let draft = TicketDraft::new("t1", "Printer jam", "alice").reporter("", email, "");
            assert!(
                matches!(validate_draft(&draft), Err(ValidationError::InvalidEmail(_))),
                "{email} should be rejected"
            );
        }
    }

    #[test]
    fn rating_bounds() {
        assert!(validate_rating(1).is_ok());
        assert!(validate_rating(5).is_ok());
        assert_eq!(validate_rating(0), Err(ValidationError::InvalidRating(0)));
        assert_eq!(validate_rating(6), Err(ValidationError::InvalidRating(6)));
    }

    #[test]
    fn empty_message_fails() {
        assert_eq!(validate_message("s1", " "), Err(ValidationError::EmptyMessage));
        assert_eq!(validate_message("", "hi"), Err(ValidationError::SenderRequired));
    }

    #[test]
    fn zero_capacity_staff_fails() {
        let staff = StaffMember::new("s1", "t1", Category::Technical, StaffLevel::Mid, 0);
        assert!(matches!(
            validate_staff(&staff),
            Err(ValidationError::ZeroCapacity(_))
        ));
    }

    #[test]
    fn policy_rules() {
        let mut policy = SlaPolicy::new(
            "t1",
            Priority::High,
            None,
            Duration::hours(1),
            Duration::hours(8),
            1,
        );
        assert!(validate_policy(&policy).is_ok());

        policy.escalation_level = 0;
        assert_eq!(validate_policy(&policy), Err(ValidationError::ZeroEscalationLevel));

        policy.escalation_level = 1;
        policy.resolution_target = Duration::zero();
        assert_eq!(
            validate_policy(&policy),
            Err(ValidationError::NonPositiveTarget("resolution"))
        );

        policy.resolution_target = Duration::days(MAX_TARGET_DAYS);
        assert!(validate_policy(&policy).is_ok());
        policy.resolution_target = Duration::days(MAX_TARGET_DAYS + 1);
        assert_eq!(
            validate_policy(&policy),
            Err(ValidationError::TargetTooLong("resolution"))
        );

        policy.resolution_target = Duration::hours(8);
        policy.first_response_target = Duration::days(100_000_000_000);
        assert_eq!(
            validate_policy(&policy),
            Err(ValidationError::TargetTooLong("first response"))
        );
    }
}
