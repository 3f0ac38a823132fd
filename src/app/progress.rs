use std::io::{IsTerminal, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crossterm::{
    cursor, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{Clear, ClearType},
};
use tokio::sync::watch;
use tokio::time::Instant;

use salvo::engine::{ProgressSink, RunMode};

/// Redraw interval of the progress line.
const PROGRESS_TICK: Duration = Duration::from_millis(250);
/// Width of the bar between the brackets.
const PROGRESS_BAR_WIDTH: usize = 30;

/// What the bar fills towards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProgressGoal {
    Requests(u64),
    Elapsed(Duration),
}

impl From<RunMode> for ProgressGoal {
    fn from(mode: RunMode) -> Self {
        match mode {
            RunMode::Count(requests) => ProgressGoal::Requests(requests),
            RunMode::Duration(duration) => ProgressGoal::Elapsed(duration),
        }
    }
}

/// Live progress line on stderr, fed by the engine's workers.
pub(crate) struct ProgressIndicator {
    completed: Arc<AtomicU64>,
    finished_tx: watch::Sender<bool>,
}

impl ProgressIndicator {
    /// Spawns the redraw task. Nothing is drawn when stderr is not a
    /// terminal, but the returned sink still counts.
    pub(crate) fn spawn(
        goal: ProgressGoal,
        no_color: bool,
    ) -> (Arc<Self>, tokio::task::JoinHandle<()>) {
        let completed = Arc::new(AtomicU64::new(0));
        let (finished_tx, mut finished_rx) = watch::channel(false);
        let indicator = Arc::new(Self {
            completed: Arc::clone(&completed),
            finished_tx,
        });

        let handle = tokio::spawn(async move {
            if !std::io::stderr().is_terminal() {
                return;
            }

            let run_start = Instant::now();
            let mut ticker = tokio::time::interval(PROGRESS_TICK);
            loop {
                tokio::select! {
                    _ = finished_rx.wait_for(|finished| *finished) => {
                        let state = ProgressState::capture(goal, &completed, run_start);
                        if render_progress_line(&state.finished(), no_color).is_ok() {
                            drop(finish_progress_line());
                        }
                        break;
                    }
                    _ = ticker.tick() => {
                        let state = ProgressState::capture(goal, &completed, run_start);
                        if render_progress_line(&state, no_color).is_err() {
                            break;
                        }
                    }
                }
            }
        });

        (indicator, handle)
    }
}

impl ProgressSink for ProgressIndicator {
    fn increment(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    fn finish(&self) {
        self.finished_tx.send_replace(true);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ProgressState {
    goal: ProgressGoal,
    completed: u64,
    elapsed_ms: u128,
}

impl ProgressState {
    fn capture(goal: ProgressGoal, completed: &AtomicU64, run_start: Instant) -> Self {
        Self {
            goal,
            completed: completed.load(Ordering::Relaxed),
            elapsed_ms: run_start.elapsed().as_millis(),
        }
    }

    /// A duration-limited run counts as complete once it has finished.
    fn finished(self) -> Self {
        match self.goal {
            ProgressGoal::Elapsed(duration) => Self {
                elapsed_ms: self.elapsed_ms.max(duration.as_millis()),
                ..self
            },
            ProgressGoal::Requests(_) => self,
        }
    }

    /// `(current, goal)` in the unit the bar fills with.
    fn position(&self) -> (u128, u128) {
        match self.goal {
            ProgressGoal::Requests(goal) => (u128::from(self.completed), u128::from(goal)),
            ProgressGoal::Elapsed(duration) => (self.elapsed_ms, duration.as_millis()),
        }
    }
}

fn render_progress_line(state: &ProgressState, no_color: bool) -> Result<(), std::io::Error> {
    let line = build_progress_line(state, no_color);

    let mut out = std::io::stderr();
    queue!(out, cursor::MoveToColumn(0), Clear(ClearType::CurrentLine))?;
    for segment in line {
        if let Some(color) = segment.color {
            queue!(
                out,
                SetForegroundColor(color),
                Print(&segment.text),
                ResetColor
            )?;
        } else {
            queue!(out, Print(&segment.text))?;
        }
    }
    out.flush()?;
    Ok(())
}

fn finish_progress_line() -> Result<(), std::io::Error> {
    let mut out = std::io::stderr();
    out.write_all(b"\n")?;
    out.flush()?;
    Ok(())
}

fn build_progress_line(state: &ProgressState, no_color: bool) -> Vec<ProgressSegment> {
    let (current, goal) = state.position();
    let goal = goal.max(1);
    let current = current.min(goal);
    let width = u128::from(u64::try_from(PROGRESS_BAR_WIDTH).unwrap_or(u64::MAX));

    let scaled = current
        .saturating_mul(width)
        .checked_div(goal)
        .unwrap_or(0);
    let complete_size = usize::try_from(scaled)
        .unwrap_or(PROGRESS_BAR_WIDTH)
        .min(PROGRESS_BAR_WIDTH);
    let incomplete_size = PROGRESS_BAR_WIDTH.saturating_sub(complete_size);

    let percent_x100 = current
        .saturating_mul(10_000)
        .checked_div(goal)
        .unwrap_or(0);
    let percent_whole = percent_x100.checked_div(100).unwrap_or(0);
    let percent_frac = percent_x100.checked_rem(100).unwrap_or(0);
    let percent_text = format!(" {}.{:02}%", percent_whole, percent_frac);

    let elapsed_tenths = state.elapsed_ms.checked_div(100).unwrap_or(0);
    let secs = elapsed_tenths.checked_div(10).unwrap_or(0);
    let tenths = elapsed_tenths.checked_rem(10).unwrap_or(0);
    let detail_text = match state.goal {
        ProgressGoal::Requests(requests) => {
            format!(" | {}/{} requests in {}.{}s", state.completed, requests, secs, tenths)
        }
        ProgressGoal::Elapsed(duration) => {
            format!(" | {}.{}s / {}s", secs, tenths, duration.as_secs())
        }
    };

    let progress_bar = format!(
        "[{}{}]",
        "#".repeat(complete_size),
        "-".repeat(incomplete_size)
    );

    if no_color {
        vec![
            ProgressSegment::plain(progress_bar),
            ProgressSegment::plain(percent_text),
            ProgressSegment::plain(detail_text),
        ]
    } else {
        vec![
            ProgressSegment::plain(progress_bar),
            ProgressSegment::colored(percent_text, Color::Cyan),
            ProgressSegment::colored(detail_text, Color::Yellow),
        ]
    }
}

struct ProgressSegment {
    text: String,
    color: Option<Color>,
}

impl ProgressSegment {
    const fn plain(text: String) -> Self {
        Self { text, color: None }
    }

    const fn colored(text: String, color: Color) -> Self {
        Self {
            text,
            color: Some(color),
        }
    }
}
