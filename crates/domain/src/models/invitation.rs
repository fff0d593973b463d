//! Invitation domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

use super::game_mode::GameMode;
use super::reservation::Reservation;
use super::table::TableId;

/// Lifecycle state of an invitation.
///
/// `Pending` is the only state that moves; every other state is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Expired,
    Declined,
}

impl InvitationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvitationStatus::Pending => "pending",
            InvitationStatus::Accepted => "accepted",
            InvitationStatus::Expired => "expired",
            InvitationStatus::Declined => "declined",
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, InvitationStatus::Pending)
    }
}

impl FromStr for InvitationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(InvitationStatus::Pending),
            "accepted" => Ok(InvitationStatus::Accepted),
            "expired" => Ok(InvitationStatus::Expired),
            "declined" => Ok(InvitationStatus::Declined),
            _ => Err(format!("Invalid invitation status: {}", s)),
        }
    }
}

impl fmt::Display for InvitationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A seated member asking another member to join their table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct Invitation {
    pub id: Uuid,
    pub inviter_id: Uuid,
    pub invitee_id: Uuid,
    pub table_id: TableId,
    /// Start of the game night the invitation is for.
    pub game_date: DateTime<Utc>,
    pub status: InvitationStatus,
    /// SHA-256 hex digest of the link token. Never sent to clients.
    #[serde(skip_serializing)]
    pub token_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Row to be inserted for a new invitation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInvitation {
    pub inviter_id: Uuid,
    pub invitee_id: Uuid,
    pub table_id: TableId,
    pub game_date: DateTime<Utc>,
    pub token_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Request to invite someone to the caller's table.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct CreateInvitationRequest {
    pub invitee_id: Uuid,

    #[validate(range(min = 1, max = 6, message = "table_id must be between 1 and 6"))]
    pub table_id: i16,
}

impl CreateInvitationRequest {
    pub fn table(&self) -> Result<TableId, String> {
        TableId::new(self.table_id)
    }
}

/// Returned once, to the inviter, right after creation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct CreatedInvitation {
    pub invitation: Invitation,
    pub token: String,
    pub link: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct AcceptedInvitation {
    pub invitation: Invitation,
    pub reservation: Reservation,
}

/// What the invite landing page shows before the invitee acts.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct InvitationPreview {
    pub inviter_name: Option<String>,
    pub table_id: TableId,
    pub game_date: DateTime<Utc>,
    pub status: InvitationStatus,
    /// Game mode the inviter's table is locked to, if they are still seated.
    pub game_mode: Option<GameMode>,
    pub expires_at: DateTime<Utc>,
    pub can_accept: bool,
}

/// Builds the shareable link carrying the plain token.
pub fn invitation_link(base_url: &str, token: &str) -> String {
    format!("{}/invite?token={}", base_url.trim_end_matches('/'), token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse_and_display() {
        for status in [
            InvitationStatus::Pending,
            InvitationStatus::Accepted,
            InvitationStatus::Expired,
            InvitationStatus::Declined,
        ] {
            assert_eq!(status.as_str().parse::<InvitationStatus>().unwrap(), status);
        }
        assert!("revoked".parse::<InvitationStatus>().is_err());
        assert!(InvitationStatus::Pending.is_pending());
        assert!(!InvitationStatus::Declined.is_pending());
    }

    #[test]
    fn test_invitation_link() {
        assert_eq!(
            invitation_link("https://club.example/", "abc"),
            "https://club.example/invite?token=abc"
        );
        assert_eq!(
            invitation_link("http://localhost:3000", "t-1_x"),
            "http://localhost:3000/invite?token=t-1_x"
        );
    }

    #[test]
    fn test_token_hash_not_serialized() {
        let invitation = Invitation {
            id: Uuid::new_v4(),
            inviter_id: Uuid::new_v4(),
            invitee_id: Uuid::new_v4(),
            table_id: TableId::new(2).unwrap(),
            game_date: Utc::now(),
            status: InvitationStatus::Pending,
            token_hash: "deadbeef".to_string(),
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(&invitation).unwrap();
        assert!(json.get("token_hash").is_none());
        assert_eq!(json["status"], "pending");
        assert_eq!(json["table_id"], 2);
    }

    #[test]
    fn test_create_request_validation() {
        let request: CreateInvitationRequest = serde_json::from_str(&format!(
            r#"{{"invitee_id": "{}", "table_id": 0}}"#,
            Uuid::new_v4()
        ))
        .unwrap();
        assert!(request.validate().is_err());
    }
}
