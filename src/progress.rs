//! Progress reporting and display
//!
//! Trait-based so the pipeline stays decoupled from display concerns; the
//! fancy reporter only runs when stderr is a terminal.

use std::sync::Arc;

/// Phase of the import, in pipeline order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    InferringSchema,
    CheckingTarget,
    Transforming,
    Uploading,
    CreatingTable,
    Loading,
    Completed,
    Failed(String),
}

pub trait ProgressReporter: Send + Sync {
    fn set_phase(&self, phase: Phase);

    /// Finish and clean up the display.
    fn finish(&self);
}

/// A no-op reporter for when progress display is disabled.
pub struct NullReporter;

impl ProgressReporter for NullReporter {
    fn set_phase(&self, _phase: Phase) {}
    fn finish(&self) {}
}

fn phase_message(phase: &Phase) -> String {
    match phase {
        Phase::InferringSchema => "🔧 Inferring schema...".into(),
        Phase::CheckingTarget => "🔍 Checking target table...".into(),
        Phase::Transforming => "📄 Writing staging file...".into(),
        Phase::Uploading => "☁️  Uploading to object storage...".into(),
        Phase::CreatingTable => "🗄️  Creating table...".into(),
        Phase::Loading => "⏳ Loading into warehouse...".into(),
        Phase::Completed => "✅ Completed!".into(),
        Phase::Failed(error) => format!("❌ Failed: {error}"),
    }
}

/// A simple reporter that just prints to stderr (for non-TTY).
pub struct SimpleReporter;

impl ProgressReporter for SimpleReporter {
    fn set_phase(&self, phase: Phase) {
        eprintln!("{}", phase_message(&phase));
    }

    fn finish(&self) {}
}

/// Interactive reporter with a phase spinner (for TTY).
pub struct FancyReporter {
    phase_bar: indicatif::ProgressBar,
}

impl FancyReporter {
    pub fn new() -> Self {
        let phase_bar = indicatif::ProgressBar::new_spinner();
        phase_bar.set_style(
            indicatif::ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap(),
        );
        phase_bar.enable_steady_tick(std::time::Duration::from_millis(100));
        Self { phase_bar }
    }
}

impl Default for FancyReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for FancyReporter {
    fn set_phase(&self, phase: Phase) {
        let msg = phase_message(&phase);
        if matches!(phase, Phase::Completed | Phase::Failed(_)) {
            self.phase_bar.finish_with_message(msg);
        } else {
            self.phase_bar.set_message(msg);
        }
    }

    fn finish(&self) {
        if !self.phase_bar.is_finished() {
            self.phase_bar.finish_and_clear();
        }
    }
}

/// Create an appropriate reporter based on terminal capabilities.
pub fn create_reporter() -> Arc<dyn ProgressReporter> {
    if console::Term::stderr().is_term() {
        Arc::new(FancyReporter::new())
    } else {
        Arc::new(SimpleReporter)
    }
}
