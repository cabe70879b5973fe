/// Board event names and delivery policy
///
/// Each event carries an explicit [`Audience`] decided by its name, not by the
/// call site. Only `board:deleted` reaches the actor's own connections; every
/// other event is something the actor already learned from the HTTP response.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

/// Event names understood by clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventName {
    #[serde(rename = "board:updated")]
    BoardUpdated,
    #[serde(rename = "board:deleted")]
    BoardDeleted,
    #[serde(rename = "member:added")]
    MemberAdded,
    #[serde(rename = "member:removed")]
    MemberRemoved,
    #[serde(rename = "list:created")]
    ListCreated,
    #[serde(rename = "list:updated")]
    ListUpdated,
    #[serde(rename = "list:deleted")]
    ListDeleted,
    #[serde(rename = "task:created")]
    TaskCreated,
    #[serde(rename = "task:updated")]
    TaskUpdated,
    #[serde(rename = "task:moved")]
    TaskMoved,
    #[serde(rename = "task:assigned")]
    TaskAssigned,
    #[serde(rename = "task:deleted")]
    TaskDeleted,
}

/// Who in the room receives an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    /// Every connection in the room, the actor's included
    Everyone,

    /// Every connection except those belonging to the actor
    ExcludeActor,
}

impl EventName {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventName::BoardUpdated => "board:updated",
            EventName::BoardDeleted => "board:deleted",
            EventName::MemberAdded => "member:added",
            EventName::MemberRemoved => "member:removed",
            EventName::ListCreated => "list:created",
            EventName::ListUpdated => "list:updated",
            EventName::ListDeleted => "list:deleted",
            EventName::TaskCreated => "task:created",
            EventName::TaskUpdated => "task:updated",
            EventName::TaskMoved => "task:moved",
            EventName::TaskAssigned => "task:assigned",
            EventName::TaskDeleted => "task:deleted",
        }
    }

    pub fn audience(&self) -> Audience {
        match self {
            EventName::BoardDeleted => Audience::Everyone,
            _ => Audience::ExcludeActor,
        }
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A committed change to announce to a board's room
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardEvent {
    pub board_id: Uuid,
    pub event: EventName,
    pub data: Value,

    /// Identity whose connections are skipped, if any
    pub exclude_user: Option<Uuid>,

    /// Identity that lost access to the board; its connections leave the
    /// room once the event has been delivered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revoke_user: Option<Uuid>,
}

impl BoardEvent {
    /// Builds the event for a change made by `actor`, applying the event's audience
    pub fn new(board_id: Uuid, event: EventName, data: Value, actor: Uuid) -> Self {
        let exclude_user = match event.audience() {
            Audience::Everyone => None,
            Audience::ExcludeActor => Some(actor),
        };

        Self {
            board_id,
            event,
            data,
            exclude_user,
            revoke_user: None,
        }
    }

    /// Marks `user_id` as no longer allowed in the room
    pub fn revoking(mut self, user_id: Uuid) -> Self {
        self.revoke_user = Some(user_id);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_only_board_deletion_reaches_actor() {
        let all = [
            EventName::BoardUpdated,
            EventName::BoardDeleted,
            EventName::MemberAdded,
            EventName::MemberRemoved,
            EventName::ListCreated,
            EventName::ListUpdated,
            EventName::ListDeleted,
            EventName::TaskCreated,
            EventName::TaskUpdated,
            EventName::TaskMoved,
            EventName::TaskAssigned,
            EventName::TaskDeleted,
        ];

        for name in all {
            let expected = if name == EventName::BoardDeleted {
                Audience::Everyone
            } else {
                Audience::ExcludeActor
            };
            assert_eq!(name.audience(), expected, "{}", name);
        }
    }

    #[test]
    fn test_event_applies_audience() {
        let board = Uuid::new_v4();
        let actor = Uuid::new_v4();

        let moved = BoardEvent::new(board, EventName::TaskMoved, json!({}), actor);
        assert_eq!(moved.exclude_user, Some(actor));

        let deleted = BoardEvent::new(board, EventName::BoardDeleted, json!({ "boardId": board }), actor);
        assert_eq!(deleted.exclude_user, None);
        assert_eq!(deleted.revoke_user, None);
    }

    #[test]
    fn test_revocation_survives_wire_format() {
        let removed = Uuid::new_v4();
        let event = BoardEvent::new(Uuid::new_v4(), EventName::MemberRemoved, json!({}), Uuid::new_v4())
            .revoking(removed);

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["revokeUser"], removed.to_string());
        assert_eq!(serde_json::from_value::<BoardEvent>(value).unwrap(), event);

        // payloads without the field still decode
        let plain = serde_json::json!({
            "boardId": Uuid::new_v4(),
            "event": "task:created",
            "data": {},
            "excludeUser": null,
        });
        assert_eq!(serde_json::from_value::<BoardEvent>(plain).unwrap().revoke_user, None);
    }

    #[test]
    fn test_wire_names() {
        assert_eq!(
            serde_json::to_value(EventName::TaskMoved).unwrap(),
            json!("task:moved")
        );
        assert_eq!(EventName::MemberRemoved.to_string(), "member:removed");
    }
}
