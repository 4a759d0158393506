//! Enum types for the support desk.
//!
//! Every enum is closed: strings are validated once at the boundary and an
//! unknown value is a [`ParseEnumError`], never a catch-all variant. Each enum
//! has:
//! - Custom Serialize (as snake_case string)
//! - Custom Deserialize (known variants only)
//! - `as_str()`, `is_default()`, `ALL`, `FromStr` and `Display` impls

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Error returned when a string does not name a known enum variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind}: {value:?}")]
pub struct ParseEnumError {
    /// Name of the enum that failed to parse.
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

// ---------------------------------------------------------------------------
// Macro: defines a closed enum with known string variants.
// ---------------------------------------------------------------------------
macro_rules! define_enum {
    (
        $(#[$meta:meta])*
        $name:ident, kind = $kind:expr, default = $default:ident,
        variants: [
            $( ($variant:ident, $str:expr) ),+ $(,)?
        ]
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $variant, )+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [Self] = &[ $( Self::$variant, )+ ];

            /// Returns the string representation.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $( Self::$variant => $str, )+
                }
            }

            /// Returns `true` if this is the default variant.
            pub fn is_default(&self) -> bool {
                *self == Self::$default
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::$default
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $str => Ok(Self::$variant), )+
                    other => Err(ParseEnumError {
                        kind: $kind,
                        value: other.to_owned(),
                    }),
                }
            }
        }

        impl TryFrom<&str> for $name {
            type Error = ParseEnumError;

            fn try_from(s: &str) -> Result<Self, Self::Error> {
                s.parse()
            }
        }

        impl TryFrom<String> for $name {
            type Error = ParseEnumError;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                s.parse()
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

// ===========================================================================
// TicketStatus
// ===========================================================================

define_enum! {
    /// Lifecycle state of a ticket.
    TicketStatus, kind = "ticket status", default = Open,
    variants: [
        (Open, "open"),
        (Pending, "pending"),
        (InProgress, "in_progress"),
        (Resolved, "resolved"),
        (Closed, "closed"),
        (Cancelled, "cancelled"),
    ]
}

impl TicketStatus {
    /// Statuses in which work on the ticket is still outstanding.
    pub const ACTIVE: &'static [Self] = &[Self::Open, Self::Pending, Self::InProgress];

    /// `closed` and `cancelled` admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed | Self::Cancelled)
    }

    /// Returns `true` for open, pending and in_progress.
    pub fn is_active(&self) -> bool {
        Self::ACTIVE.contains(self)
    }

    /// Returns `true` for resolved and closed (the states a rating may target).
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Resolved | Self::Closed)
    }
}

// ===========================================================================
// Priority
// ===========================================================================

define_enum! {
    /// Urgency of a ticket. Ordered from least to most urgent.
    #[derive(PartialOrd, Ord)]
    Priority, kind = "priority", default = Medium,
    variants: [
        (Low, "low"),
        (Medium, "medium"),
        (High, "high"),
        (Critical, "critical"),
    ]
}

// ===========================================================================
// Category
// ===========================================================================

define_enum! {
    /// Subject area of a ticket, matched against staff specialization.
    Category, kind = "category", default = General,
    variants: [
        (Technical, "technical"),
        (Reports, "reports"),
        (Equipment, "equipment"),
        (Billing, "billing"),
        (DataExport, "data_export"),
        (Appointments, "appointments"),
        (Notifications, "notifications"),
        (Account, "account"),
        (General, "general"),
    ]
}

// ===========================================================================
// MessageType
// ===========================================================================

define_enum! {
    /// Who or what authored a ticket message.
    MessageType, kind = "message type", default = User,
    variants: [
        (User, "user"),
        (Support, "support"),
        (System, "system"),
        (Escalation, "escalation"),
    ]
}

// ===========================================================================
// StaffLevel
// ===========================================================================

define_enum! {
    /// Seniority of a support staff member.
    #[derive(PartialOrd, Ord)]
    StaffLevel, kind = "staff level", default = Junior,
    variants: [
        (Junior, "junior"),
        (Mid, "mid"),
        (Senior, "senior"),
        (Lead, "lead"),
        (Manager, "manager"),
    ]
}

impl StaffLevel {
    /// Levels eligible for escalated tickets.
    pub const SENIOR_POOL: &'static [Self] = &[Self::Senior, Self::Lead, Self::Manager];
}

// ===========================================================================
// EventType
// ===========================================================================

define_enum! {
    /// Categorises audit trail events.
    EventType, kind = "event type", default = Created,
    variants: [
        (Created, "created"),
        (Assigned, "assigned"),
        (Unassigned, "unassigned"),
        (StatusChanged, "status_changed"),
        (Messaged, "messaged"),
        (FirstResponse, "first_response"),
        (Escalated, "escalated"),
        (Resolved, "resolved"),
        (Closed, "closed"),
        (Cancelled, "cancelled"),
        (Rated, "rated"),
    ]
}

// ===========================================================================
// BreachKind
// ===========================================================================

define_enum! {
    /// Why a ticket was escalated.
    BreachKind, kind = "breach kind", default = Manual,
    variants: [
        (FirstResponse, "first_response"),
        (Resolution, "resolution"),
        (Manual, "manual"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_default_is_open() {
        assert_eq!(TicketStatus::default(), TicketStatus::Open);
        assert!(TicketStatus::Open.is_default());
        assert!(!TicketStatus::Closed.is_default());
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&TicketStatus::InProgress).unwrap();
        assert_eq!(json, r#""in_progress""#);
        let back: TicketStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, TicketStatus::InProgress);
    }

    #[test]
    fn unknown_status_is_rejected() {
        let err = serde_json::from_str::<TicketStatus>(r#""on_hold""#).unwrap_err();
        assert!(err.to_string().contains("on_hold"));

        let err = "on_hold".parse::<TicketStatus>().unwrap_err();
        assert_eq!(err.kind, "ticket status");
        assert_eq!(err.value, "on_hold");
    }

    #[test]
    fn terminal_and_active_statuses() {
        assert!(TicketStatus::Closed.is_terminal());
        assert!(TicketStatus::Cancelled.is_terminal());
        assert!(!TicketStatus::Resolved.is_terminal());

        assert!(TicketStatus::Open.is_active());
        assert!(TicketStatus::InProgress.is_active());
        assert!(!TicketStatus::Resolved.is_active());
    }

    #[test]
    fn priority_is_ordered() {
        assert!(Priority::Low < Priority::Medium);
        assert!(Priority::High < Priority::Critical);
        assert_eq!(Priority::default(), Priority::Medium);
    }

    #[test]
    fn category_as_str() {
        assert_eq!(Category::DataExport.as_str(), "data_export");
        assert_eq!("technical".parse::<Category>().unwrap(), Category::Technical);
    }

    #[test]
    fn senior_pool_levels() {
        assert!(StaffLevel::SENIOR_POOL.contains(&StaffLevel::Lead));
        assert!(!StaffLevel::SENIOR_POOL.contains(&StaffLevel::Mid));
    }

    #[test]
    fn all_lists_every_variant() {
        assert_eq!(MessageType::ALL.len(), 4);
        for mt in MessageType::ALL {
            assert_eq!(mt.as_str().parse::<MessageType>().unwrap(), *mt);
        }
    }
}
