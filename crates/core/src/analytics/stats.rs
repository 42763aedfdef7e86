use serde::Serialize;

use crate::model::{EventType, MatchEvent, Team};

/// Share of successful attempts for one `(team, type)` pair.
///
/// `rate` is NaN when there were no attempts, which serializes as `null`.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SuccessRate {
    pub total: usize,
    pub successful: usize,
    pub rate: f64,
}

impl SuccessRate {
    /// Count `event_type` events of `team` and how many have `flag` set in
    /// their payload.
    pub fn compute(events: &[MatchEvent], team: Team, event_type: &EventType, flag: &str) -> Self {
        let (total, successful) = events
            .iter()
            .filter(|e| e.is_team(team) && &e.event_type == event_type)
            .fold((0, 0), |(total, successful), e| {
                (total + 1, successful + usize::from(e.flag(flag)))
            });

        let rate = if total == 0 {
            f64::NAN
        } else {
            successful as f64 / total as f64 * 100.0
        };

        Self {
            total,
            successful,
            rate,
        }
    }

    /// False when there were no attempts to rate.
    pub fn is_defined(&self) -> bool {
        !self.rate.is_nan()
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct TeamRates {
    pub home: SuccessRate,
    pub away: SuccessRate,
}

impl TeamRates {
    fn compute(events: &[MatchEvent], event_type: EventType, flag: &str) -> Self {
        Self {
            home: SuccessRate::compute(events, Team::Home, &event_type, flag),
            away: SuccessRate::compute(events, Team::Away, &event_type, flag),
        }
    }
}

/// Summary numbers for a match, recomputed from the full event list.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchStatistics {
    pub total_events: usize,
    pub home_events: usize,
    pub away_events: usize,
    pub pass_completion: TeamRates,
    pub shots_on_target: TeamRates,
}

impl MatchStatistics {
    pub fn compute(events: &[MatchEvent]) -> Self {
        Self {
            total_events: events.len(),
            home_events: events.iter().filter(|e| e.is_team(Team::Home)).count(),
            away_events: events.iter().filter(|e| e.is_team(Team::Away)).count(),
            pass_completion: TeamRates::compute(events, EventType::Pass, "success"),
            shots_on_target: TeamRates::compute(events, EventType::Shot, "on_target"),
        }
    }
}

/// The last `count` events, newest first.
pub fn recent(events: &[MatchEvent], count: usize) -> Vec<&MatchEvent> {
    events.iter().rev().take(count).collect()
}
