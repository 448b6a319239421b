//! Structured workouts: an ordered plan of single sets and repeatable circuits.
//!
//! The plan is flattened once into one [`PlanStep`] per authored set. Circuit
//! repetitions are not expanded; [`advance`] jumps back to the first step of a
//! circuit while its repetition counter is below the total. Both functions are
//! pure, the flattened steps are never mutated.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::record::{SessionKind, SessionLog, SessionRecord};
use super::{Orchestrator, SessionEvent, TimerHandle};
use crate::aggregator::RepCounter;
use crate::exercise::{ExerciseDefinition, ExerciseRegistry};

// ── Plan ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedSet {
    pub exercise_id: String,
    pub target_reps: u32,
    pub weight: Option<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CircuitPlan {
    pub id: String,
    pub name: String,
    pub repetitions: u32,
    pub elements: Vec<PlannedSet>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlanItem {
    Set(PlannedSet),
    Circuit(CircuitPlan),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct WorkoutPlan {
    pub items: Vec<PlanItem>,
}

// ── Flattened steps ──────────────────────────────────────────────────────────

/// Where a step sits inside its circuit.
#[derive(Debug, Clone, PartialEq)]
pub struct CircuitInfo {
    pub id: String,
    pub name: String,
    /// 1 in the flattened plan. [`step_at`] fills in the live repetition.
    pub repetition_index: u32,
    pub total_repetitions: u32,
    pub step_index_in_circuit: usize,
    pub steps_in_circuit: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlanStep {
    pub exercise_id: String,
    pub target_reps: u32,
    pub weight: Option<f32>,
    pub parent_circuit: Option<CircuitInfo>,
}

impl PlanStep {
    fn last_in_circuit(&self) -> Option<&CircuitInfo> {
        self.parent_circuit
            .as_ref()
            .filter(|c| c.step_index_in_circuit + 1 == c.steps_in_circuit)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepetitionCounter {
    pub current: u32,
    pub total: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CircuitSessionState {
    pub current_index: usize,
    pub circuit_repetition_counters: BTreeMap<String, RepetitionCounter>,
    pub is_active: bool,
    /// Set when the last step was advanced past.
    pub is_complete: bool,
}

impl CircuitSessionState {
    /// Fresh state for `steps`: index 0, every circuit at repetition 1.
    pub fn initial(steps: &[PlanStep]) -> Self {
        let circuit_repetition_counters = steps
            .iter()
            .filter_map(|s| s.parent_circuit.as_ref())
            .map(|c| {
                (
                    c.id.clone(),
                    RepetitionCounter {
                        current: 1,
                        total: c.total_repetitions.max(1),
                    },
                )
            })
            .collect();
        Self {
            current_index: 0,
            circuit_repetition_counters,
            is_active: false,
            is_complete: false,
        }
    }

    pub fn repetition_of(&self, circuit_id: &str) -> Option<RepetitionCounter> {
        self.circuit_repetition_counters.get(circuit_id).copied()
    }
}

/// Expand a plan into one step per authored set.
pub fn flatten(plan: &WorkoutPlan) -> Vec<PlanStep> {
    let mut steps = Vec::new();
    for item in &plan.items {
        match item {
            PlanItem::Set(set) => steps.push(PlanStep {
                exercise_id: set.exercise_id.clone(),
                target_reps: set.target_reps,
                weight: set.weight,
                parent_circuit: None,
            }),
            PlanItem::Circuit(circuit) => {
                let n = circuit.elements.len();
                steps.extend(circuit.elements.iter().enumerate().map(|(i, set)| PlanStep {
                    exercise_id: set.exercise_id.clone(),
                    target_reps: set.target_reps,
                    weight: set.weight,
                    parent_circuit: Some(CircuitInfo {
                        id: circuit.id.clone(),
                        name: circuit.name.clone(),
                        repetition_index: 1,
                        total_repetitions: circuit.repetitions,
                        step_index_in_circuit: i,
                        steps_in_circuit: n,
                    }),
                }));
            }
        }
    }
    steps
}

/// The state after moving past the current step.
pub fn advance(steps: &[PlanStep], state: &CircuitSessionState) -> CircuitSessionState {
    let mut next = state.clone();
    if state.is_complete {
        return next;
    }
    let idx = state.current_index;
    if let Some(info) = steps.get(idx).and_then(PlanStep::last_in_circuit)
        && let Some(counter) = next.circuit_repetition_counters.get_mut(&info.id)
        && counter.current < counter.total
    {
        counter.current += 1;
        next.current_index = idx - info.step_index_in_circuit;
        return next;
    }
    if idx + 1 < steps.len() {
        next.current_index = idx + 1;
    } else {
        next.is_complete = true;
        next.is_active = false;
    }
    next
}

/// The step at the current index, tagged with the circuit's live repetition.
pub fn step_at(steps: &[PlanStep], state: &CircuitSessionState) -> Option<PlanStep> {
    let mut step = steps.get(state.current_index)?.clone();
    if let Some(info) = step.parent_circuit.as_mut()
        && let Some(counter) = state.repetition_of(&info.id)
    {
        info.repetition_index = counter.current;
    }
    Some(step)
}

/// Progress within the current circuit.
#[derive(Debug, Clone, PartialEq)]
pub struct CircuitProgress {
    pub id: String,
    pub name: String,
    pub repetition: u32,
    pub total_repetitions: u32,
    pub step: usize,
    pub steps: usize,
}

/// Read-only view of the current step for display.
#[derive(Debug, Clone, PartialEq)]
pub struct ExerciseDetails {
    pub exercise: Option<Arc<ExerciseDefinition>>,
    pub exercise_id: String,
    pub exercise_name: String,
    pub target_reps: u32,
    pub weight: Option<f32>,
    pub step_index: usize,
    pub total_steps: usize,
    pub circuit: Option<CircuitProgress>,
    pub next_exercise_name: Option<String>,
}

// ── Session ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct CircuitSession {
    registry: Arc<ExerciseRegistry>,
    steps: Vec<PlanStep>,
    state: CircuitSessionState,
    auto_advance: bool,
    log: Option<SessionLog>,
}

impl CircuitSession {
    pub fn new(registry: Arc<ExerciseRegistry>) -> Self {
        Self {
            registry,
            steps: Vec::new(),
            state: CircuitSessionState::default(),
            auto_advance: false,
            log: None,
        }
    }

    /// Advance on its own once the counts reach the step's target.
    pub fn with_auto_advance(mut self, on: bool) -> Self {
        self.auto_advance = on;
        self
    }

    /// The plan as flattened, before any circuit repetition.
    pub fn steps(&self) -> &[PlanStep] {
        &self.steps
    }

    pub fn current_step(&self) -> Option<PlanStep> {
        step_at(&self.steps, &self.state)
    }

    pub fn state(&self) -> &CircuitSessionState {
        &self.state
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active
    }

    /// Load a plan. Any session in progress is discarded.
    pub fn initialize_workout(&mut self, plan: &WorkoutPlan) {
        self.steps = flatten(plan);
        self.state = CircuitSessionState::initial(&self.steps);
        self.log = None;
        tracing::debug!(steps = self.steps.len(), "workout plan loaded");
    }

    fn exercise_at(&self, idx: usize) -> Option<Arc<ExerciseDefinition>> {
        let step = self.steps.get(idx)?;
        let ex = self.registry.get(&step.exercise_id);
        if ex.is_none() {
            tracing::warn!(exercise = %step.exercise_id, "plan step names an unknown exercise");
        }
        ex
    }

    fn name_of(&self, id: &str) -> String {
        self.registry.name_of(id).unwrap_or(id).to_string()
    }

    /// Pause or resume. The position in the plan is kept.
    pub fn toggle_workout(&mut self, counter: &mut dyn RepCounter) -> Vec<SessionEvent> {
        if self.state.is_active {
            self.state.is_active = false;
            tracing::info!(index = self.state.current_index, "workout paused");
            return Vec::new();
        }
        if self.steps.is_empty() || self.state.is_complete {
            tracing::warn!("nothing to run; load a plan or reset the workout");
            return Vec::new();
        }
        self.state.is_active = true;
        if self.log.is_none() {
            self.log = Some(SessionLog::start(SessionKind::Circuit));
        }
        counter.reset_rep_counts();
        tracing::info!(index = self.state.current_index, "workout running");
        self.exercise_at(self.state.current_index)
            .map(SessionEvent::ExerciseChanged)
            .into_iter()
            .collect()
    }

    /// Log the current step and move on.
    pub fn advance_to_next_set(&mut self, counter: &mut dyn RepCounter) -> Vec<SessionEvent> {
        if self.steps.is_empty() || self.state.is_complete {
            return Vec::new();
        }
        let mut events = Vec::new();
        let idx = self.state.current_index;
        if let (Some(step), Some(log)) = (self.steps.get(idx), self.log.as_mut())
            && let Some(ex) = self.registry.get(&step.exercise_id)
        {
            let reps = log.record_set(&ex, counter.rep_count(), step.weight);
            events.push(SessionEvent::SetCompleted {
                exercise_id: step.exercise_id.clone(),
                set_number: u32::try_from(log.sets().len()).unwrap_or(u32::MAX),
                reps,
            });
        }
        self.state = advance(&self.steps, &self.state);
        counter.reset_rep_counts();
        if self.state.is_complete {
            // A plan stepped through without ever running has nothing to report.
            if let Some(log) = self.log.take() {
                let record = log.finish();
                tracing::info!(sets = record.set_count, "workout complete");
                events.push(SessionEvent::Finished(record));
            }
            return events;
        }
        if let Some(info) = self.steps[self.state.current_index].parent_circuit.as_ref() {
            tracing::debug!(
                index = self.state.current_index,
                circuit = %info.id,
                repetition = ?self.state.repetition_of(&info.id).map(|c| c.current),
                "next set"
            );
        } else {
            tracing::debug!(index = self.state.current_index, "next set");
        }
        events.extend(
            self.exercise_at(self.state.current_index)
                .map(SessionEvent::ExerciseChanged),
        );
        events
    }

    /// Current step joined with its exercise, plus a look-ahead name.
    pub fn get_current_exercise_details(&self) -> Option<ExerciseDetails> {
        let step = step_at(&self.steps, &self.state)?;
        let circuit = step.parent_circuit.as_ref().map(|c| CircuitProgress {
            id: c.id.clone(),
            name: c.name.clone(),
            repetition: c.repetition_index,
            total_repetitions: c.total_repetitions,
            step: c.step_index_in_circuit,
            steps: c.steps_in_circuit,
        });
        let next = advance(&self.steps, &self.state);
        let next_exercise_name = (!next.is_complete)
            .then(|| self.steps.get(next.current_index))
            .flatten()
            .map(|s| self.name_of(&s.exercise_id));
        Some(ExerciseDetails {
            exercise: self.registry.get(&step.exercise_id),
            exercise_id: step.exercise_id.clone(),
            exercise_name: self.name_of(&step.exercise_id),
            target_reps: step.target_reps,
            weight: step.weight,
            step_index: self.state.current_index,
            total_steps: self.steps.len(),
            circuit,
            next_exercise_name,
        })
    }

    /// Back to the first step, all circuits at repetition 1, paused.
    pub fn reset_workout(&mut self) {
        self.state = CircuitSessionState::initial(&self.steps);
        self.log = None;
    }

    pub fn observe(&mut self, counter: &mut dyn RepCounter) -> Vec<SessionEvent> {
        if !self.auto_advance || !self.state.is_active {
            return Vec::new();
        }
        let Some(step) = self.steps.get(self.state.current_index) else {
            return Vec::new();
        };
        let two_sided = self
            .registry
            .get(&step.exercise_id)
            .is_some_and(|e| e.is_two_sided);
        if counter.rep_count().reached(step.target_reps, two_sided) {
            return self.advance_to_next_set(counter);
        }
        Vec::new()
    }

    /// Abort the run and rewind. Safe to call repeatedly.
    pub fn stop(&mut self, counter: &mut dyn RepCounter) -> Option<SessionRecord> {
        let log = self.log.take();
        if self.state.is_active {
            tracing::info!(index = self.state.current_index, "workout stopped");
        }
        self.reset_workout();
        counter.reset_rep_counts();
        log.map(SessionLog::finish)
    }
}

impl Orchestrator for CircuitSession {
    fn kind(&self) -> SessionKind {
        SessionKind::Circuit
    }

    fn is_active(&self) -> bool {
        self.state.is_active
    }

    fn timer(&self) -> Option<TimerHandle> {
        None
    }

    fn tick(&mut self, _handle: TimerHandle, _counter: &mut dyn RepCounter) -> Vec<SessionEvent> {
        Vec::new()
    }

    fn observe(&mut self, counter: &mut dyn RepCounter) -> Vec<SessionEvent> {
        CircuitSession::observe(self, counter)
    }

    fn stop(&mut self, counter: &mut dyn RepCounter) -> Option<SessionRecord> {
        CircuitSession::stop(self, counter)
    }
}
