use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::warn;
use trackplan::engine::progress::{Progress, ProgressCallback};

const SPINNER_TICK_MS: u64 = 80;

/// The bar plus what the engine is currently working through.
struct SearchBar {
    bar: ProgressBar,
    phase: &'static str,
    rounds_done: usize,
}

impl SearchBar {
    /// Prefix shown while a task runs; beam tasks carry their round number.
    fn label(&self) -> String {
        match self.phase {
            "Beam Search" => format!("{}, round {}", self.phase, self.rounds_done + 1),
            phase => phase.to_string(),
        }
    }

    /// What one step of the current phase counts.
    fn unit(&self) -> &'static str {
        match self.phase {
            "Seeding" => "piece types",
            "Beam Search" => "branches",
            "Ranking" => "candidates",
            _ => "steps",
        }
    }
}

/// Renders engine progress as a spinner per phase and a bar per task.
#[derive(Clone)]
pub struct CliProgressHandler {
    state: Arc<Mutex<SearchBar>>,
}

impl CliProgressHandler {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0).with_style(Self::spinner_style());
        bar.set_draw_target(ProgressDrawTarget::stderr());
        bar.finish_and_clear();

        Self {
            state: Arc::new(Mutex::new(SearchBar {
                bar,
                phase: "",
                rounds_done: 0,
            })),
        }
    }

    pub fn get_callback(&self) -> ProgressCallback<'static> {
        let state = self.state.clone();

        Box::new(move |progress: Progress| {
            let Ok(mut state) = state.lock() else {
                warn!("Progress state mutex was poisoned. Cannot update progress.");
                return;
            };

            match progress {
                Progress::PhaseStart { name } => {
                    state.phase = name;
                    state.rounds_done = 0;
                    let bar = &state.bar;
                    bar.reset();
                    bar.set_length(0);
                    bar.set_style(Self::spinner_style());
                    bar.set_prefix(name);
                    bar.set_message("");
                    bar.enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
                }
                Progress::PhaseFinish => {
                    let bar = &state.bar;
                    bar.disable_steady_tick();
                    bar.set_style(Self::spinner_style());
                    bar.set_prefix(state.phase);
                    bar.finish_with_message("✓ done");
                }
                Progress::TaskStart { total_steps } => {
                    let (label, unit) = (state.label(), state.unit());
                    let bar = &state.bar;
                    bar.disable_steady_tick();
                    bar.reset();
                    bar.set_length(total_steps);
                    bar.set_position(0);
                    bar.set_style(Self::bar_style());
                    bar.set_prefix(label);
                    bar.set_message(unit);
                }
                Progress::TaskIncrement => {
                    state.bar.inc(1);
                }
                Progress::TaskFinish => {
                    let bar = &state.bar;
                    let length = bar.length().unwrap_or(0);
                    if bar.position() < length {
                        bar.set_position(length);
                    }
                    bar.finish();
                }
                Progress::RoundFinished {
                    round,
                    beam,
                    completed,
                    best_score,
                } => {
                    state.rounds_done = round;
                    let best = best_score.map_or_else(|| "-".to_string(), |s| format!("{s:.3}"));
                    state.bar.set_message(format!(
                        "{beam} in beam, {completed} completed, best {best}"
                    ));
                }
                Progress::Message(msg) => {
                    let bar = &state.bar;
                    if !bar.is_finished() {
                        bar.println(format!("  {}", msg));
                    } else {
                        bar.set_message(msg);
                    }
                }
            }
        })
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {prefix:.bold} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "{prefix:>24.bold} [{bar:32.cyan/blue}] {pos}/{len} {msg} ({eta})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ")
    }
}

impl Default for CliProgressHandler {
    fn default() -> Self {
        Self::new()
    }
}
