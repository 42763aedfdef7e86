use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One observed action during a match, as held by the reconciler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchEvent {
    pub id: String,
    pub match_id: String,
    #[serde(rename = "type")]
    pub event_type: EventType,
    /// Seconds elapsed since kick-off.
    pub timestamp: f64,
    pub team: Option<Team>,
    pub player_id: Option<i64>,
    pub coordinates: Coordinates,
    pub created_by: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Type-specific payload (`success` for passes, `on_target` for shots, ...).
    pub event_data: Map<String, Value>,
}

impl MatchEvent {
    /// Read a boolean flag out of `event_data`. Anything other than a JSON
    /// `true` counts as false.
    pub fn flag(&self, field: &str) -> bool {
        matches!(self.event_data.get(field), Some(Value::Bool(true)))
    }

    pub fn is_team(&self, team: Team) -> bool {
        self.team == Some(team)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Team {
    Home,
    Away,
}

impl Team {
    pub fn as_str(&self) -> &'static str {
        match self {
            Team::Home => "home",
            Team::Away => "away",
        }
    }

    /// Parse a team tag; unknown tags yield `None`.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "home" => Some(Team::Home),
            "away" => Some(Team::Away),
            _ => None,
        }
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event tag. Tags the tracker app may add later are kept as `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventType {
    Shot,
    Goal,
    Foul,
    Pass,
    Card,
    Offside,
    Corner,
    Penalty,
    FreeKick,
    GoalKick,
    ThrowIn,
    Tackle,
    Interception,
    Dribble,
    Cross,
    Header,
    Other(String),
}

impl EventType {
    pub fn as_str(&self) -> &str {
        match self {
            EventType::Shot => "shot",
            EventType::Goal => "goal",
            EventType::Foul => "foul",
            EventType::Pass => "pass",
            EventType::Card => "card",
            EventType::Offside => "offside",
            EventType::Corner => "corner",
            EventType::Penalty => "penalty",
            EventType::FreeKick => "free-kick",
            EventType::GoalKick => "goal-kick",
            EventType::ThrowIn => "throw-in",
            EventType::Tackle => "tackle",
            EventType::Interception => "interception",
            EventType::Dribble => "dribble",
            EventType::Cross => "cross",
            EventType::Header => "header",
            EventType::Other(tag) => tag,
        }
    }
}

impl From<&str> for EventType {
    fn from(tag: &str) -> Self {
        match tag {
            "shot" => EventType::Shot,
            "goal" => EventType::Goal,
            "foul" => EventType::Foul,
            "pass" => EventType::Pass,
            "card" => EventType::Card,
            "offside" => EventType::Offside,
            "corner" => EventType::Corner,
            "penalty" => EventType::Penalty,
            "free-kick" => EventType::FreeKick,
            "goal-kick" => EventType::GoalKick,
            "throw-in" => EventType::ThrowIn,
            "tackle" => EventType::Tackle,
            "interception" => EventType::Interception,
            "dribble" => EventType::Dribble,
            "cross" => EventType::Cross,
            "header" => EventType::Header,
            other => EventType::Other(other.to_string()),
        }
    }
}

impl From<String> for EventType {
    fn from(tag: String) -> Self {
        EventType::from(tag.as_str())
    }
}

impl From<EventType> for String {
    fn from(event_type: EventType) -> Self {
        match event_type {
            EventType::Other(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

impl FromStr for EventType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(EventType::from(s))
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
