use std::sync::Mutex;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use moco_core::pipeline::{PipelineStage, ProgressReporter};

/// Progress bar per stage; spinner when the stage has no frame count.
pub struct BarReporter {
    current: Mutex<Option<ProgressBar>>,
}

impl BarReporter {
    pub fn new() -> Self {
        Self {
            current: Mutex::new(None),
        }
    }
}

impl ProgressReporter for BarReporter {
    fn begin_stage(&self, stage: PipelineStage, total_items: Option<usize>) {
        let pb = match total_items {
            Some(total) => {
                let pb = ProgressBar::new(total as u64);
                let template = "{msg:24} [{bar:40}] {pos}/{len}";
                if let Ok(style) = ProgressStyle::default_bar().template(template) {
                    pb.set_style(style.progress_chars("=> "));
                }
                pb
            }
            None => {
                let pb = ProgressBar::new_spinner();
                if let Ok(style) = ProgressStyle::default_spinner().template("{msg:24} {spinner}") {
                    pb.set_style(style);
                }
                pb.enable_steady_tick(Duration::from_millis(120));
                pb
            }
        };
        pb.set_message(stage.to_string());
        if let Ok(mut slot) = self.current.lock() {
            if let Some(previous) = slot.replace(pb) {
                previous.finish_and_clear();
            }
        }
    }

    fn advance(&self, items_done: usize) {
        if let Ok(slot) = self.current.lock() {
            if let Some(pb) = slot.as_ref() {
                // Frames finish out of order; never move the bar backwards.
                if items_done as u64 > pb.position() {
                    pb.set_position(items_done as u64);
                }
            }
        }
    }

    fn finish_stage(&self) {
        if let Ok(mut slot) = self.current.lock() {
            if let Some(pb) = slot.take() {
                pb.finish();
            }
        }
    }
}
