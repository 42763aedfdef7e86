//! Per-team and per-player counters over a set of events, and the same
//! counters per time segment for interval charts.

use serde::Serialize;

use super::segmenter::Segment;
use crate::model::{EventType, MatchEvent, Team};

/// What one event contributes to the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Contribution {
    Shot { on_target: bool },
    Goal,
    Assist,
    Pass { completed: bool },
    Foul,
    YellowCard,
    RedCard,
    Corner,
    Offside,
    Tackle,
    Interception,
    Cross,
    Clearance,
    Block,
    Dribble,
}

impl Contribution {
    fn of(event: &MatchEvent) -> Option<Self> {
        let contribution = match &event.event_type {
            EventType::Shot => Contribution::Shot {
                on_target: event.flag("on_target"),
            },
            EventType::Goal => Contribution::Goal,
            EventType::Pass => Contribution::Pass {
                completed: event.flag("success"),
            },
            EventType::Foul => Contribution::Foul,
            EventType::Card => match event.event_data.get("card_type").and_then(|v| v.as_str()) {
                Some("yellow") => Contribution::YellowCard,
                Some("red") => Contribution::RedCard,
                _ => return None,
            },
            EventType::Corner => Contribution::Corner,
            EventType::Offside => Contribution::Offside,
            EventType::Tackle => Contribution::Tackle,
            EventType::Interception => Contribution::Interception,
            EventType::Cross => Contribution::Cross,
            EventType::Dribble => Contribution::Dribble,
            EventType::Other(tag) => match tag.as_str() {
                "assist" => Contribution::Assist,
                "yellowCard" | "yellow-card" => Contribution::YellowCard,
                "redCard" | "red-card" => Contribution::RedCard,
                "clearance" => Contribution::Clearance,
                "block" => Contribution::Block,
                _ => return None,
            },
            _ => return None,
        };
        Some(contribution)
    }
}

/// Counters for one side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamStats {
    pub shots: u32,
    pub shots_on_target: u32,
    pub goals: u32,
    pub assists: u32,
    pub passes_attempted: u32,
    pub passes_completed: u32,
    pub fouls_committed: u32,
    pub yellow_cards: u32,
    pub red_cards: u32,
    pub corners: u32,
    pub offsides: u32,
    pub tackles: u32,
    pub interceptions: u32,
    pub crosses: u32,
    pub clearances: u32,
    pub blocks: u32,
}

impl TeamStats {
    fn record(&mut self, contribution: Contribution) {
        match contribution {
            Contribution::Shot { on_target } => {
                self.shots += 1;
                self.shots_on_target += u32::from(on_target);
            }
            Contribution::Goal => self.goals += 1,
            Contribution::Assist => self.assists += 1,
            Contribution::Pass { completed } => {
                self.passes_attempted += 1;
                self.passes_completed += u32::from(completed);
            }
            Contribution::Foul => self.fouls_committed += 1,
            Contribution::YellowCard => self.yellow_cards += 1,
            Contribution::RedCard => self.red_cards += 1,
            Contribution::Corner => self.corners += 1,
            Contribution::Offside => self.offsides += 1,
            Contribution::Tackle => self.tackles += 1,
            Contribution::Interception => self.interceptions += 1,
            Contribution::Cross => self.crosses += 1,
            Contribution::Clearance => self.clearances += 1,
            Contribution::Block => self.blocks += 1,
            // Dribbles are only tracked per player.
            Contribution::Dribble => {}
        }
    }
}

/// Counters for one player, identified by the id trackers attach to events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStats {
    pub player_id: i64,
    pub team: Team,
    pub shots: u32,
    pub shots_on_target: u32,
    pub goals: u32,
    pub assists: u32,
    pub passes_attempted: u32,
    pub passes_completed: u32,
    pub fouls_committed: u32,
    pub yellow_cards: u32,
    pub red_cards: u32,
    pub tackles: u32,
    pub interceptions: u32,
    pub crosses: u32,
    pub clearances: u32,
    pub blocks: u32,
    pub dribbles: u32,
}

impl PlayerStats {
    fn new(player_id: i64, team: Team) -> Self {
        Self {
            player_id,
            team,
            shots: 0,
            shots_on_target: 0,
            goals: 0,
            assists: 0,
            passes_attempted: 0,
            passes_completed: 0,
            fouls_committed: 0,
            yellow_cards: 0,
            red_cards: 0,
            tackles: 0,
            interceptions: 0,
            crosses: 0,
            clearances: 0,
            blocks: 0,
            dribbles: 0,
        }
    }

    fn record(&mut self, contribution: Contribution) {
        match contribution {
            Contribution::Shot { on_target } => {
                self.shots += 1;
                self.shots_on_target += u32::from(on_target);
            }
            Contribution::Goal => self.goals += 1,
            Contribution::Assist => self.assists += 1,
            Contribution::Pass { completed } => {
                self.passes_attempted += 1;
                self.passes_completed += u32::from(completed);
            }
            Contribution::Foul => self.fouls_committed += 1,
            Contribution::YellowCard => self.yellow_cards += 1,
            Contribution::RedCard => self.red_cards += 1,
            Contribution::Tackle => self.tackles += 1,
            Contribution::Interception => self.interceptions += 1,
            Contribution::Cross => self.crosses += 1,
            Contribution::Clearance => self.clearances += 1,
            Contribution::Block => self.blocks += 1,
            Contribution::Dribble => self.dribbles += 1,
            Contribution::Corner | Contribution::Offside => {}
        }
    }
}

/// Team and player counters over a set of events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedStats {
    pub home: TeamStats,
    pub away: TeamStats,
    /// In order of first appearance.
    pub players: Vec<PlayerStats>,
}

impl AggregatedStats {
    fn team_mut(&mut self, team: Team) -> &mut TeamStats {
        match team {
            Team::Home => &mut self.home,
            Team::Away => &mut self.away,
        }
    }

    fn player_mut(&mut self, player_id: i64, team: Team) -> &mut PlayerStats {
        let index = match self.players.iter().position(|p| p.player_id == player_id) {
            Some(index) => index,
            None => {
                self.players.push(PlayerStats::new(player_id, team));
                self.players.len() - 1
            }
        };
        &mut self.players[index]
    }
}

/// Count events into team and player totals. Events without a team are
/// skipped, as are kinds that feed no counter.
pub fn aggregate_match_events<'a>(events: impl IntoIterator<Item = &'a MatchEvent>) -> AggregatedStats {
    let mut stats = AggregatedStats::default();

    for event in events {
        let Some(team) = event.team else {
            continue;
        };
        let Some(contribution) = Contribution::of(event) else {
            continue;
        };

        stats.team_mut(team).record(contribution);
        if let Some(player_id) = event.player_id {
            stats.player_mut(player_id, team).record(contribution);
        }
    }

    stats
}

/// Counters for one time segment.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentStats {
    pub index: usize,
    pub start_seconds: f64,
    pub end_seconds: f64,
    pub event_count: usize,
    #[serde(flatten)]
    pub stats: AggregatedStats,
}

/// [`aggregate_match_events`] applied to every segment, in segment order.
/// Empty segments get zeroed counters so charts keep a continuous axis.
pub fn aggregate_segments(segments: &[Segment<'_>]) -> Vec<SegmentStats> {
    segments
        .iter()
        .map(|segment| SegmentStats {
            index: segment.index,
            start_seconds: segment.start_seconds,
            end_seconds: segment.end_seconds,
            event_count: segment.len(),
            stats: aggregate_match_events(segment.events.iter().copied()),
        })
        .collect()
}
