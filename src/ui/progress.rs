use crate::output::is_quiet;
use crate::ui::progress_message::{ProgressMessage, ProgressPhase};
use crate::ui::theme;
use crate::ui::Icons;
use indicatif::{HumanDuration, MultiProgress, ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn visible() -> bool {
    console::Term::stdout().is_term() && !is_quiet()
}

/// Renders applier progress messages on a background thread.
pub struct ProgressManager {
    mp: MultiProgress,
    remapping: ProgressBar,
    committing: ProgressBar,
    failed: Arc<AtomicUsize>,
    tx: crossbeam::channel::Sender<ProgressMessage>,
    handle: Option<thread::JoinHandle<()>>,
}

impl ProgressManager {
    pub fn new() -> (Self, crossbeam::channel::Sender<ProgressMessage>) {
        let (tx, rx) = crossbeam::channel::unbounded::<ProgressMessage>();

        let mp = MultiProgress::new();
        let (remapping, committing) = if visible() {
            let bar = mp.add(ProgressBar::new(0).with_message("Remapping classes"));
            if let Ok(style) = ProgressStyle::with_template("{spinner} {msg} [{bar:30}] {pos}/{len}") {
                bar.set_style(style);
            }
            let spinner = mp.add(ProgressBar::new_spinner().with_message("Committing"));
            (bar, spinner)
        } else {
            (ProgressBar::hidden(), ProgressBar::hidden())
        };

        let failed = Arc::new(AtomicUsize::new(0));
        let failed_clone = failed.clone();
        let remapping_clone = remapping.clone();
        let committing_clone = committing.clone();
        let mp_clone = mp.clone();

        let handle = thread::spawn(move || {
            for msg in rx {
                match msg {
                    ProgressMessage::Started {
                        phase: ProgressPhase::Remapping,
                        total,
                    } => {
                        remapping_clone.set_length(total as u64);
                    }
                    ProgressMessage::Progress {
                        phase: ProgressPhase::Remapping,
                        current,
                        class,
                    } => {
                        remapping_clone.set_position(current as u64);
                        if let Some(ref c) = class {
                            remapping_clone.set_message(format!("Remapped: {}", c));
                        }
                    }
                    ProgressMessage::ClassFailed(class) => {
                        failed_clone.fetch_add(1, Ordering::Relaxed);
                        mp_clone
                            .println(format!("{} {}", Icons::CROSS, class))
                            .ok();
                    }
                    ProgressMessage::Finished {
                        phase: ProgressPhase::Remapping,
                    } => {
                        remapping_clone.finish_with_message("Remapped");
                    }
                    ProgressMessage::Started {
                        phase: ProgressPhase::Committing,
                        total: _,
                    } => {
                        committing_clone.enable_steady_tick(Duration::from_millis(100));
                    }
                    ProgressMessage::Finished {
                        phase: ProgressPhase::Committing,
                    } => {
                        committing_clone.finish_with_message("Committed");
                    }
                    ProgressMessage::Exit => break,
                    _ => {}
                }
            }
        });

        (
            Self {
                mp,
                remapping,
                committing,
                failed,
                tx: tx.clone(),
                handle: Some(handle),
            },
            tx,
        )
    }

    /// Failures reported so far
    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn clear(&self) {
        self.mp.clear().ok();
    }

    /// Stop the render thread and print a one-line summary
    pub fn finish_with_summary(mut self, duration: Duration, classes: usize, renamed: usize) {
        self.tx.send(ProgressMessage::Exit).ok();
        if let Some(handle) = self.handle.take() {
            handle.join().ok();
        }
        self.remapping.finish_and_clear();
        self.committing.finish_and_clear();
        self.clear();

        if is_quiet() {
            return;
        }
        println!();
        println!(
            "{} {}",
            Icons::CHECK.style(theme().success.clone()),
            format!("Complete in {}", HumanDuration(duration)).style(theme().success.clone())
        );
        println!(
            "  {} {}  {} {}  {} {}",
            Icons::PACKAGE.style(theme().info.clone()),
            classes,
            Icons::RIGHT.style(theme().info.clone()),
            renamed,
            Icons::CROSS.style(theme().info.clone()),
            self.failed()
        );
    }
}

pub struct Spinner {
    pb: ProgressBar,
}

impl Spinner {
    pub fn new(message: &str) -> Self {
        let pb = if visible() {
            let pb = ProgressBar::new_spinner();
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        } else {
            ProgressBar::hidden()
        };
        pb.set_message(message.to_string());
        Self { pb }
    }

    pub fn set_message(&self, msg: &str) {
        self.pb.set_message(msg.to_string());
    }

    pub fn finish_with_message(&self, msg: &str) {
        self.pb.finish_with_message(msg.to_string());
    }
}
