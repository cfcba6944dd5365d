use indicatif::{ProgressBar, ProgressDrawTarget, ProgressState, ProgressStyle};
use ligprep::engine::progress::{Progress, ProgressCallback};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::warn;

/// Renders scheduler events as one bar per collection.
#[derive(Clone)]
pub struct CliProgressHandler {
    pb: Arc<Mutex<ProgressBar>>,
    failed: Arc<AtomicU64>,
}

impl CliProgressHandler {
    pub fn new() -> Self {
        Self::with_target(ProgressDrawTarget::stderr())
    }

    pub fn hidden() -> Self {
        Self::with_target(ProgressDrawTarget::hidden())
    }

    fn with_target(target: ProgressDrawTarget) -> Self {
        let pb = ProgressBar::new(0).with_style(Self::bar_style());
        pb.set_draw_target(target);
        pb.finish_and_clear();

        Self {
            pb: Arc::new(Mutex::new(pb)),
            failed: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn get_callback(&self) -> ProgressCallback<'static> {
        let pb_clone = self.pb.clone();
        let failed = self.failed.clone();

        Box::new(move |progress: Progress| {
            let Ok(pb_guard) = pb_clone.lock() else {
                warn!("Progress bar mutex was poisoned. Cannot update progress.");
                return;
            };

            match progress {
                Progress::CollectionStart {
                    name,
                    total_ligands,
                } => {
                    failed.store(0, Ordering::Relaxed);
                    pb_guard.reset();
                    pb_guard.set_length(total_ligands);
                    pb_guard.set_position(0);
                    pb_guard.set_prefix("");
                    pb_guard.set_message(name);
                }
                Progress::LigandFinish { success, .. } => {
                    if !success {
                        let n = failed.fetch_add(1, Ordering::Relaxed) + 1;
                        pb_guard.set_prefix(format!("{n} failed"));
                    }
                    pb_guard.inc(1);
                }
                Progress::CollectionFinish => {
                    let total = pb_guard.length().unwrap_or(0);
                    pb_guard.set_position(total);
                    pb_guard.finish();
                }
                Progress::Message(msg) => {
                    if pb_guard.is_finished() {
                        pb_guard.set_message(msg);
                    } else {
                        pb_guard.println(format!("  {msg}"));
                    }
                }
            }
        })
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "{msg:<24} [{bar:40.cyan/blue}] {pos}/{len} {prefix:.red} ({eta})",
        )
        .expect("Failed to create bar style template")
        .with_key(
            "eta",
            |state: &ProgressState, w: &mut dyn std::fmt::Write| {
                let _ = write!(w, "{:.1}s", state.eta().as_secs_f64());
            },
        )
        .progress_chars("##-")
    }
}

impl Default for CliProgressHandler {
    fn default() -> Self {
        Self::new()
    }
}
