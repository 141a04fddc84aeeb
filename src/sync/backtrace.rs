/*!
 * Stack Snapshots
 *
 * Opaque capture of the call stack at lock creation, rendered only when a
 * contention report is actually emitted. Capture is unresolved; symbol
 * resolution is deferred to `render()`.
 */

use std::backtrace::{Backtrace, BacktraceStatus};

/// Frames from these paths belong to capture machinery or the lock layer
const INTERNAL_FRAME_MARKERS: &[&str] = &[
    "std::backtrace",
    "backtrace_rs::",
    "lockwork::sync::",
];

/// Renderable capture of the call stack
pub struct StackSnapshot {
    backtrace: Backtrace,
    skip: usize,
    depth: usize,
}

impl StackSnapshot {
    /// Capture the calling stack
    ///
    /// `skip` caller frames are dropped after the internal ones, and at most
    /// `depth` frames are rendered.
    pub fn capture(skip: usize, depth: usize) -> Self {
        Self {
            backtrace: Backtrace::force_capture(),
            skip,
            depth,
        }
    }

    /// Whether the platform produced a usable capture
    pub fn is_captured(&self) -> bool {
        self.backtrace.status() == BacktraceStatus::Captured
    }

    /// Render the retained frames, one frame per line group
    pub fn render(&self) -> String {
        if !self.is_captured() {
            return String::from("  <stack unavailable>");
        }

        let text = self.backtrace.to_string();
        let frames = split_frames(&text)
            .into_iter()
            .filter(|frame| !is_internal(frame))
            .skip(self.skip)
            .take(self.depth)
            .collect::<Vec<_>>();

        if frames.is_empty() {
            return String::from("  <no caller frames>");
        }
        frames.join("\n")
    }
}

impl std::fmt::Debug for StackSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StackSnapshot")
            .field("status", &self.backtrace.status())
            .field("skip", &self.skip)
            .field("depth", &self.depth)
            .finish()
    }
}

/// Group the std rendering (`  N: symbol` followed by `at file:line` lines)
/// into one string per frame
fn split_frames(text: &str) -> Vec<String> {
    let mut frames: Vec<String> = Vec::new();

    for line in text.lines() {
        if starts_frame(line) || frames.is_empty() {
            frames.push(line.to_string());
        } else if let Some(last) = frames.last_mut() {
            last.push('\n');
            last.push_str(line);
        }
    }

    frames
}

fn starts_frame(line: &str) -> bool {
    let trimmed = line.trim_start();
    let digits = trimmed.chars().take_while(|c| c.is_ascii_digit()).count();
    digits > 0 && trimmed[digits..].starts_with(": ")
}

fn is_internal(frame: &str) -> bool {
    let symbol = frame.lines().next().unwrap_or_default();
    INTERNAL_FRAME_MARKERS.iter().any(|m| symbol.contains(m))
}
