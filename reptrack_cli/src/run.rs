//! Command execution: config mapping, session assembly and reporting.

use crate::cli::InputArgs;
use crate::sink::HistorySink;
use crate::source;
use rand::SeedableRng;
use rand::rngs::StdRng;
use reptrack_config::{Config, load_plan_toml, load_toml};
use reptrack_core::error::{Result as CoreResult, TrackerError};
use reptrack_core::session::circuit::flatten;
use reptrack_core::session::{
    CircuitSession, LadderSession, Orchestrator, SessionRecord, TimedSession,
};
use reptrack_core::{
    ExerciseDefinition, ExerciseRegistry, LadderCfg, RunCfg, RunMode, RunSummary, Runner,
    TimedCfg, TrackerCfg, WorkoutPlan, registry_from_config,
};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Read and validate the config, or fall back to defaults when no path is given.
pub fn load_config(path: Option<&Path>) -> eyre::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read config {}: {e}", path.display()))?;
    let cfg = load_toml(&text).map_err(|e| eyre::eyre!("parse config {}: {e}", path.display()))?;
    cfg.validate()
        .map_err(|e| eyre::Report::new(TrackerError::Config(e.to_string())))?;
    Ok(cfg)
}

/// Everything a command needs besides its own arguments.
pub struct Ctx {
    pub cfg: Config,
    pub registry: Arc<ExerciseRegistry>,
    pub json: bool,
    pub history: Option<PathBuf>,
    pub shutdown: Arc<AtomicBool>,
}

impl Ctx {
    pub fn new(
        cfg: Config,
        json: bool,
        history: Option<PathBuf>,
        shutdown: Arc<AtomicBool>,
    ) -> CoreResult<Self> {
        let registry = Arc::new(registry_from_config(&cfg)?);
        let history = history.or_else(|| cfg.history.file.as_ref().map(PathBuf::from));
        Ok(Self {
            cfg,
            registry,
            json,
            history,
            shutdown,
        })
    }

    fn run_cfg(&self, feed: bool) -> RunCfg {
        let mut run: RunCfg = (&self.cfg.runner).into();
        if feed {
            run.mode = RunMode::Feed;
        }
        run
    }

    fn runner(&self, exercise: Arc<ExerciseDefinition>, feed: bool) -> CoreResult<Runner> {
        let tracker: TrackerCfg = (&self.cfg).into();
        let shutdown = Arc::clone(&self.shutdown);
        Ok(Runner::new(exercise, tracker, self.run_cfg(feed))?
            .with_cancel(move || shutdown.load(Ordering::Relaxed), 1))
    }

    fn sink(&self) -> CoreResult<HistorySink> {
        HistorySink::open(self.history.as_deref())
    }

    fn report(
        &self,
        command: &str,
        summary: &RunSummary,
        records: &[SessionRecord],
    ) -> eyre::Result<()> {
        if self.json {
            let obj = json!({
                "command": command,
                "frames": summary.frames,
                "dropped": summary.dropped,
                "reps_completed": summary.reps_completed,
                "reps": summary.reps,
                "finished": summary.finished,
                "cancelled": summary.cancelled,
                "duration_ms": summary.duration_ms,
                "sessions": records,
            });
            println!("{obj}");
            return Ok(());
        }
        println!(
            "{command}: {} frames ({} dropped), {} reps (left {}, right {}) over {:.1} s",
            summary.frames,
            summary.dropped,
            summary.reps_completed,
            summary.reps.left,
            summary.reps.right,
            summary.duration_ms as f64 / 1000.0,
        );
        for record in records {
            let state = if summary.finished { "complete" } else { "stopped" };
            println!("session {:?} {state}: {} sets", record.kind, record.set_count);
            for (i, set) in record.exercises.iter().enumerate() {
                match set.weight {
                    Some(w) => println!("  set {}: {} x{} @ {w}", i + 1, set.exercise_id, set.reps),
                    None => println!("  set {}: {} x{}", i + 1, set.exercise_id, set.reps),
                }
            }
        }
        if summary.cancelled {
            println!("interrupted");
        }
        Ok(())
    }

    fn drive(
        &self,
        command: &str,
        mut runner: Runner,
        input: &Path,
        session: Option<&mut (dyn Orchestrator + '_)>,
        mut sink: HistorySink,
    ) -> eyre::Result<()> {
        let src = source::open(input)?;
        let summary = runner.run(src, session, &mut sink)?;
        self.report(command, &summary, sink.records())
    }
}

pub fn replay(ctx: &Ctx, exercise: &str, input: &InputArgs) -> eyre::Result<()> {
    let exercise = ctx.registry.require(exercise)?;
    let runner = ctx.runner(exercise, input.feed)?;
    ctx.drive("replay", runner, &input.input, None, ctx.sink()?)
}

pub fn timed(
    ctx: &Ctx,
    input: &InputArgs,
    fixed: Option<String>,
    sets: Option<u32>,
    seed: Option<u64>,
) -> eyre::Result<()> {
    let mut cfg: TimedCfg = (&ctx.cfg.timed).into();
    if let Some(id) = fixed {
        ctx.registry.require(&id)?;
        cfg.fixed_exercise = Some(id);
    }
    if let Some(n) = sets {
        cfg.total_sets = n;
    }
    let pool: Vec<Arc<ExerciseDefinition>> = if ctx.cfg.timed.exercises.is_empty() {
        ctx.registry.iter().cloned().collect()
    } else {
        ctx.cfg
            .timed
            .exercises
            .iter()
            .map(|id| ctx.registry.require(id))
            .collect::<CoreResult<_>>()?
    };
    let Some(first) = pool.first().cloned() else {
        eyre::bail!("timed session needs at least one exercise");
    };
    let rng = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };
    let mut session = TimedSession::new(cfg, pool, rng);
    let mut runner = ctx.runner(first, input.feed)?;
    let mut sink = ctx.sink()?;
    let events = session.start(runner.tracker_mut());
    runner.apply(events, &mut sink)?;
    ctx.drive("timed", runner, &input.input, Some(&mut session), sink)
}

pub fn ladder_preview(ctx: &Ctx) -> eyre::Result<()> {
    let cfg: LadderCfg = (&ctx.cfg.ladder).into();
    let seq = cfg.rep_sequence();
    if ctx.json {
        println!("{}", json!({ "total_sets": cfg.total_sets(), "reps": seq }));
    } else {
        let list: Vec<String> = seq.iter().map(u32::to_string).collect();
        println!("{} sets: {}", cfg.total_sets(), list.join(" "));
    }
    Ok(())
}

pub fn ladder(
    ctx: &Ctx,
    exercise: &str,
    input: &Path,
    feed: bool,
    weight: Option<f32>,
) -> eyre::Result<()> {
    let exercise = ctx.registry.require(exercise)?;
    let mut session = LadderSession::new((&ctx.cfg.ladder).into());
    session.set_weight(weight);
    let mut runner = ctx.runner(Arc::clone(&exercise), feed)?;
    let mut sink = ctx.sink()?;
    let events = session.start(exercise, runner.tracker_mut());
    if runner.apply(events, &mut sink)? {
        // Nothing to climb; the record is already in the sink.
        return ctx.report("ladder", &RunSummary::default(), sink.records());
    }
    ctx.drive("ladder", runner, input, Some(&mut session), sink)
}

fn load_plan(ctx: &Ctx, path: &Path) -> eyre::Result<WorkoutPlan> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read plan {}: {e}", path.display()))?;
    let toml =
        load_plan_toml(&text).map_err(|e| eyre::eyre!("parse plan {}: {e}", path.display()))?;
    toml.validate()
        .map_err(|e| eyre::Report::new(TrackerError::Config(e.to_string())))?;
    let plan = WorkoutPlan::from(&toml);
    for step in flatten(&plan) {
        ctx.registry.require(&step.exercise_id)?;
    }
    Ok(plan)
}

pub fn plan_dry_run(ctx: &Ctx, path: &Path) -> eyre::Result<()> {
    let plan = load_plan(ctx, path)?;
    let steps = flatten(&plan);
    if ctx.json {
        let list: Vec<_> = steps
            .iter()
            .map(|s| {
                json!({
                    "exercise_id": s.exercise_id,
                    "target_reps": s.target_reps,
                    "weight": s.weight,
                    "circuit": s.parent_circuit.as_ref().map(|c| &c.id),
                    "repetitions": s.parent_circuit.as_ref().map(|c| c.total_repetitions),
                })
            })
            .collect();
        println!("{}", json!({ "steps": list }));
        return Ok(());
    }
    for (i, s) in steps.iter().enumerate() {
        let name = ctx.registry.name_of(&s.exercise_id).unwrap_or(&s.exercise_id);
        match &s.parent_circuit {
            Some(c) => println!(
                "{:>2}. {name} x{} [{} {}/{}, {} rounds]",
                i + 1,
                s.target_reps,
                c.id,
                c.step_index_in_circuit + 1,
                c.steps_in_circuit,
                c.total_repetitions
            ),
            None => println!("{:>2}. {name} x{}", i + 1, s.target_reps),
        }
    }
    Ok(())
}

pub fn plan(ctx: &Ctx, path: &Path, input: &Path, feed: bool) -> eyre::Result<()> {
    let plan = load_plan(ctx, path)?;
    let mut session = CircuitSession::new(Arc::clone(&ctx.registry)).with_auto_advance(true);
    session.initialize_workout(&plan);
    let Some(first) = session.get_current_exercise_details().and_then(|d| d.exercise) else {
        eyre::bail!("plan {} has no steps", path.display());
    };
    let mut runner = ctx.runner(first, feed)?;
    let mut sink = ctx.sink()?;
    let events = session.toggle_workout(runner.tracker_mut());
    runner.apply(events, &mut sink)?;
    ctx.drive("plan", runner, input, Some(&mut session), sink)
}

pub fn exercises(ctx: &Ctx) -> eyre::Result<()> {
    let issues = ctx.registry.validate();
    if ctx.json {
        let list: Vec<_> = ctx
            .registry
            .iter()
            .map(|e| {
                json!({
                    "id": e.id,
                    "name": e.name,
                    "two_sided": e.is_two_sided,
                    "has_weight": e.has_weight,
                    "signals": e.tracked_signals.iter().map(|s| &s.id).collect::<Vec<_>>(),
                })
            })
            .collect();
        let problems: Vec<String> = issues.iter().map(ToString::to_string).collect();
        println!("{}", json!({ "exercises": list, "issues": problems }));
        return Ok(());
    }
    for e in ctx.registry.iter() {
        let sides = if e.is_two_sided { "two-sided" } else { "single" };
        println!("{:<16} {:<16} {sides}", e.id, e.name);
    }
    for issue in &issues {
        println!("issue: {issue}");
    }
    Ok(())
}
