//! Byte progress over the input file.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const BYTES_TEMPLATE: &str = "{spinner:.green} {msg} {bytes:>10}/{total_bytes:<10} [{bar:.cyan/blue}] {percent:>3}%  \
     {bytes_per_sec}  elapsed: {elapsed_precise}  eta: {eta_precise}";

/// Thin wrapper around an `indicatif` bar counting bytes consumed.
pub struct ProgressScope {
    pb: ProgressBar,
}

impl ProgressScope {
    pub fn bytes<T: Into<String>>(label: T, total_bytes: u64) -> Self {
        let pb = ProgressBar::new(total_bytes);
        // A bad template only costs us the styling.
        if let Ok(style) = ProgressStyle::with_template(BYTES_TEMPLATE) {
            pb.set_style(style.progress_chars("█▉▊▋▌▍▎▏  "));
        }
        let label = label.into();
        if !label.is_empty() {
            pb.set_message(label);
        }
        pb.enable_steady_tick(Duration::from_millis(100));
        Self { pb }
    }

    /// Move the bar to an absolute byte position.
    #[inline]
    pub fn set_bytes(&self, pos: u64) {
        self.pb.set_position(pos);
    }

    pub fn finish<T: Into<String>>(&self, msg: T) {
        self.pb.finish_with_message(msg.into());
    }
}
