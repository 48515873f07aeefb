//! Target coordination
//!
//! Pairs the top-scored cells with the nearest eligible agents by greedy
//! bipartite matching. Matches are staged first and committed
//! all-or-nothing so a cycle-level cancel leaves no partial state.

use aethernet_core::config::CoordinationConfig;
use aethernet_core::types::{DistanceMetric, TimestampMs};
use aethernet_domain::agent::{Agent, AgentStatus};
use aethernet_domain::assignment::Assignment;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{EngineError, Result};
use crate::kernel::CancelToken;
use crate::roster::Roster;
use crate::scorer::InstabilityScore;

/// A staged agent-to-cell match awaiting commit.
#[derive(Debug, Clone, PartialEq)]
pub struct StagedMatch {
    /// Agent to assign
    pub agent_id: String,
    /// Target cell grid key
    pub cell_id: String,
    /// Target score at match time
    pub score: f64,
    /// Distance between agent and target under the configured metric
    pub distance: f64,
}

/// The assignment coordinator.
#[derive(Debug, Clone)]
pub struct Coordinator {
    metric: DistanceMetric,
    assignment_ttl_ms: u64,
    release_threshold: f64,
}

impl Coordinator {
    /// Create a coordinator from configuration.
    pub fn new(config: &CoordinationConfig) -> Self {
        Self {
            metric: config.distance_metric,
            assignment_ttl_ms: config.assignment_ttl_ms,
            release_threshold: config.release_threshold,
        }
    }

    /// Stage matches: highest-scored unassigned cell pairs with the
    /// nearest eligible agent, repeated until cells or agents exhaust.
    ///
    /// An empty eligible set yields an empty match list, not an error.
    pub fn plan(&self, targets: &[InstabilityScore], eligible: &[&Agent]) -> Vec<StagedMatch> {
        let mut staged = Vec::new();
        let mut used_agents: HashSet<&str> = HashSet::new();

        for target in targets {
            let candidate = eligible
                .iter()
                .filter(|a| !used_agents.contains(a.agent_id.as_str()))
                .min_by(|a, b| {
                    let da = self.metric.measure(&a.position(), &target.cell.position());
                    let db = self.metric.measure(&b.position(), &target.cell.position());
                    da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
                });

            let Some(agent) = candidate else {
                break; // agents exhausted
            };

            used_agents.insert(agent.agent_id.as_str());
            staged.push(StagedMatch {
                agent_id: agent.agent_id.clone(),
                cell_id: target.cell.cell_id.clone(),
                score: target.score,
                distance: self.metric.measure(&agent.position(), &target.cell.position()),
            });
        }

        staged
    }

    /// Commit staged matches: create assignments and move agents EnRoute.
    ///
    /// The cancel token is checked once before any mutation; a cancelled
    /// pass commits nothing and returns `Cancelled`.
    pub fn commit(
        &self,
        roster: &mut Roster,
        staged: Vec<StagedMatch>,
        cancel: &CancelToken,
        now: TimestampMs,
    ) -> Result<Vec<Assignment>> {
        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        let mut assignments = Vec::with_capacity(staged.len());
        for m in staged {
            let agent = roster
                .get_mut(&m.agent_id)
                .ok_or_else(|| EngineError::UnknownAgent {
                    agent_id: m.agent_id.clone(),
                })?;
            agent.transition(AgentStatus::EnRoute)?;
            agent.assigned_target = Some(m.cell_id.clone());

            debug!(
                agent_id = %m.agent_id,
                cell_id = %m.cell_id,
                score = m.score,
                distance = m.distance,
                "assignment committed"
            );
            assignments.push(Assignment::new(
                m.agent_id,
                m.cell_id,
                m.score,
                now,
                self.assignment_ttl_ms,
            ));
        }

        if !assignments.is_empty() {
            info!(count = assignments.len(), "coordination pass committed");
        }
        Ok(assignments)
    }

    /// Plan and commit in one pass.
    pub fn coordinate(
        &self,
        roster: &mut Roster,
        targets: &[InstabilityScore],
        cancel: &CancelToken,
        now: TimestampMs,
    ) -> Result<Vec<Assignment>> {
        let eligible = roster.eligible_agents();
        let staged = self.plan(targets, &eligible);
        self.commit(roster, staged, cancel, now)
    }

    /// Release assignments invalidated since the last cycle.
    ///
    /// An active assignment is released when its agent has gone Offline
    /// or its target's fresh score fell below the release threshold. The
    /// agent's target is cleared so the agent (and the cell) re-enter the
    /// pool on the next cycle.
    pub fn release_invalidated(
        &self,
        roster: &mut Roster,
        assignments: &mut BTreeMap<Uuid, Assignment>,
        fresh_scores: &HashMap<String, f64>,
        now: TimestampMs,
    ) -> usize {
        let mut released = 0;

        for assignment in assignments.values_mut() {
            if !assignment.is_active() {
                continue;
            }

            let agent_offline = roster
                .get(&assignment.agent_id)
                .map(|a| a.status == AgentStatus::Offline)
                .unwrap_or(true);
            // A cell absent from this cycle's payload is "no new
            // information", not a score drop
            let score_collapsed = fresh_scores
                .get(&assignment.cell_id)
                .map(|s| *s < self.release_threshold)
                .unwrap_or(false);

            if agent_offline || score_collapsed {
                if assignment.release(now).is_ok() {
                    released += 1;
                    debug!(
                        assignment_id = %assignment.assignment_id,
                        agent_id = %assignment.agent_id,
                        agent_offline,
                        score_collapsed,
                        "assignment released"
                    );
                    if let Some(agent) = roster.get_mut(&assignment.agent_id) {
                        agent.assigned_target = None;
                        if matches!(agent.status, AgentStatus::EnRoute | AgentStatus::OnStation) {
                            let _ = agent.transition(AgentStatus::Idle);
                        }
                    }
                }
            }
        }

        released
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scorer::{rank_cells, ScoreWeights};
    use aethernet_domain::agent::AgentRole;
    use aethernet_domain::cell::{AtmosphericCell, CellReading};

    fn cell(lat: f64, lon: f64, cape: f64) -> AtmosphericCell {
        AtmosphericCell::from_reading(CellReading {
            lat,
            lon,
            cape,
            vorticity: 0.0005,
            humidity: 0.7,
            timestamp: 1_700_000_000_000,
            vertical_velocity: None,
            anomaly_score: None,
            wind_from_deg: None,
            wind_shear: None,
        })
    }

    fn agent_at(id: &str, lat: f64, lon: f64) -> Agent {
        Agent::new(id.to_string(), AgentRole::Operator, lat, lon, 1_000)
    }

    fn roster_of(agents: Vec<Agent>) -> Roster {
        let mut roster = Roster::new(Default::default());
        for a in agents {
            roster.register(a);
        }
        roster
    }

    fn coordinator() -> Coordinator {
        Coordinator::new(&Default::default())
    }

    #[test]
    fn test_highest_cells_assigned_first() {
        // 3 cells with CAPE [10, 50, 90], 2 idle agents: the 90 and 50
        // cells get agents, the 10 cell is left unassigned
        let cells = vec![
            cell(44.0, -121.0, 10.0),
            cell(45.0, -122.0, 50.0),
            cell(46.0, -123.0, 90.0),
        ];
        let ranked = rank_cells(&cells, &ScoreWeights::default());
        let mut roster = roster_of(vec![
            agent_at("unit-001", 45.5, -122.5),
            agent_at("unit-002", 44.5, -121.5),
        ]);

        let assignments = coordinator()
            .coordinate(&mut roster, &ranked.ranked, &CancelToken::new(), 2_000)
            .unwrap();

        assert_eq!(assignments.len(), 2);
        let assigned_cells: Vec<&str> =
            assignments.iter().map(|a| a.cell_id.as_str()).collect();
        assert!(assigned_cells.contains(&"cell_46.000_-123.000"));
        assert!(assigned_cells.contains(&"cell_45.000_-122.000"));
        assert!(!assigned_cells.contains(&"cell_44.000_-121.000"));
    }

    #[test]
    fn test_nearest_agent_wins() {
        let cells = vec![cell(46.0, -123.0, 90.0)];
        let ranked = rank_cells(&cells, &ScoreWeights::default());
        let mut roster = roster_of(vec![
            agent_at("unit-far", 40.0, -110.0),
            agent_at("unit-near", 46.1, -123.1),
        ]);

        let assignments = coordinator()
            .coordinate(&mut roster, &ranked.ranked, &CancelToken::new(), 2_000)
            .unwrap();

        assert_eq!(assignments.len(), 1);
        assert_eq!(assignments[0].agent_id, "unit-near");
    }

    #[test]
    fn test_no_agent_holds_two_assignments() {
        let cells = vec![
            cell(44.0, -121.0, 80.0),
            cell(45.0, -122.0, 85.0),
            cell(46.0, -123.0, 90.0),
        ];
        let ranked = rank_cells(&cells, &ScoreWeights::default());
        let mut roster = roster_of(vec![agent_at("unit-001", 45.0, -122.0)]);

        let assignments = coordinator()
            .coordinate(&mut roster, &ranked.ranked, &CancelToken::new(), 2_000)
            .unwrap();

        assert_eq!(assignments.len(), 1);
        let mut agent_ids: Vec<&str> = assignments.iter().map(|a| a.agent_id.as_str()).collect();
        agent_ids.dedup();
        assert_eq!(agent_ids.len(), assignments.len());
    }

    #[test]
    fn test_empty_eligible_set_is_not_an_error() {
        let cells = vec![cell(46.0, -123.0, 90.0)];
        let ranked = rank_cells(&cells, &ScoreWeights::default());
        let mut roster = roster_of(vec![]);

        let assignments = coordinator()
            .coordinate(&mut roster, &ranked.ranked, &CancelToken::new(), 2_000)
            .unwrap();
        assert!(assignments.is_empty());
    }

    #[test]
    fn test_cancel_before_commit_leaves_no_state() {
        let cells = vec![cell(46.0, -123.0, 90.0)];
        let ranked = rank_cells(&cells, &ScoreWeights::default());
        let mut roster = roster_of(vec![agent_at("unit-001", 46.0, -123.0)]);

        let cancel = CancelToken::new();
        cancel.cancel();
        let result = coordinator().coordinate(&mut roster, &ranked.ranked, &cancel, 2_000);

        assert!(matches!(result, Err(EngineError::Cancelled)));
        let agent = roster.get("unit-001").unwrap();
        assert_eq!(agent.status, AgentStatus::Idle);
        assert!(agent.assigned_target.is_none());
    }

    #[test]
    fn test_release_on_offline_agent() {
        let cells = vec![cell(46.0, -123.0, 90.0)];
        let ranked = rank_cells(&cells, &ScoreWeights::default());
        let mut roster = roster_of(vec![agent_at("unit-001", 46.0, -123.0)]);
        let coordinator = coordinator();

        let committed = coordinator
            .coordinate(&mut roster, &ranked.ranked, &CancelToken::new(), 2_000)
            .unwrap();
        let mut assignments: BTreeMap<Uuid, Assignment> = committed
            .into_iter()
            .map(|a| (a.assignment_id, a))
            .collect();

        // Agent misses its heartbeats and is swept Offline
        roster.sweep(120_000);
        let released =
            coordinator.release_invalidated(&mut roster, &mut assignments, &HashMap::new(), 121_000);

        assert_eq!(released, 1);
        assert!(assignments.values().all(|a| !a.is_active()));
        assert!(roster.get("unit-001").unwrap().assigned_target.is_none());
    }

    #[test]
    fn test_release_on_score_collapse() {
        let cells = vec![cell(46.0, -123.0, 3500.0)];
        let ranked = rank_cells(&cells, &ScoreWeights::default());
        let mut roster = roster_of(vec![agent_at("unit-001", 46.0, -123.0)]);
        let coordinator = coordinator();

        let committed = coordinator
            .coordinate(&mut roster, &ranked.ranked, &CancelToken::new(), 2_000)
            .unwrap();
        let mut assignments: BTreeMap<Uuid, Assignment> = committed
            .into_iter()
            .map(|a| (a.assignment_id, a))
            .collect();

        let mut fresh = HashMap::new();
        fresh.insert("cell_46.000_-123.000".to_string(), 0.05);
        let released = coordinator.release_invalidated(&mut roster, &mut assignments, &fresh, 3_000);

        assert_eq!(released, 1);
        assert_eq!(roster.get("unit-001").unwrap().status, AgentStatus::Idle);
    }

    #[test]
    fn test_absent_cell_is_no_new_information() {
        let cells = vec![cell(46.0, -123.0, 3500.0)];
        let ranked = rank_cells(&cells, &ScoreWeights::default());
        let mut roster = roster_of(vec![agent_at("unit-001", 46.0, -123.0)]);
        let coordinator = coordinator();

        let committed = coordinator
            .coordinate(&mut roster, &ranked.ranked, &CancelToken::new(), 2_000)
            .unwrap();
        let mut assignments: BTreeMap<Uuid, Assignment> = committed
            .into_iter()
            .map(|a| (a.assignment_id, a))
            .collect();

        // No fresh score for the assigned cell: assignment stays active
        let released =
            coordinator.release_invalidated(&mut roster, &mut assignments, &HashMap::new(), 3_000);
        assert_eq!(released, 0);
        assert!(assignments.values().all(|a| a.is_active()));
    }
}
