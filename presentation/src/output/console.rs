//! Console rendering of shell events

use agentsh_application::{NoticeLevel, ShellEvent, ShellEventSink};
use colored::Colorize;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Format a duration as seconds with two decimals ("0.42s")
pub fn format_duration(duration: Duration) -> String {
    format!("{:.2}s", duration.as_secs_f64())
}

/// Line printed when a tool call ends
pub fn tool_finished_line(tool_name: &str, success: bool, duration: Duration) -> String {
    if success {
        format!("{} completed in {}", tool_name, format_duration(duration))
    } else {
        format!("{} failed after {}", tool_name, format_duration(duration))
    }
}

/// Renders [`ShellEvent`]s to the terminal.
///
/// Replies go to stdout, streamed replies as they arrive. Tool progress,
/// reload notices and errors go to stderr, with one spinner per running
/// tool call.
pub struct ConsoleSink {
    multi: MultiProgress,
    spinners: Mutex<HashMap<String, ProgressBar>>,
    /// A streamed reply is mid-line on stdout
    streaming: AtomicBool,
    quiet: bool,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            spinners: Mutex::new(HashMap::new()),
            streaming: AtomicBool::new(false),
            quiet: false,
        }
    }

    /// Hide tool progress; replies, warnings and errors are still shown
    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("  {spinner:.green} {prefix:.bold.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    fn lock_spinners(&self) -> MutexGuard<'_, HashMap<String, ProgressBar>> {
        self.spinners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn tool_started(&self, call_id: String, tool_name: &str, preview: &str) {
        self.end_stream();
        if self.quiet {
            return;
        }
        let pb = self.multi.add(ProgressBar::new_spinner());
        pb.set_style(Self::spinner_style());
        pb.set_prefix(tool_name.to_string());
        pb.set_message(preview.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        self.lock_spinners().insert(call_id, pb);
    }

    fn tool_finished(
        &self,
        call_id: &str,
        tool_name: &str,
        success: bool,
        duration: Duration,
        error: Option<&str>,
    ) {
        if let Some(pb) = self.lock_spinners().remove(call_id) {
            pb.finish_and_clear();
        }
        if self.quiet && success {
            return;
        }

        let line = tool_finished_line(tool_name, success, duration);
        if success {
            eprintln!("  {} {}", "✓".green(), line.dimmed());
        } else {
            eprintln!("  {} {}", "✗".red(), line.red());
            if let Some(error) = error {
                eprintln!("    {}", error.dimmed());
            }
        }
    }

    fn stream_delta(&self, text: &str) {
        if !self.streaming.swap(true, Ordering::SeqCst) {
            self.clear_spinners();
            println!();
        }
        let mut stdout = std::io::stdout().lock();
        let _ = stdout.write_all(text.as_bytes());
        let _ = stdout.flush();
    }

    /// Close the line a streamed reply left open; true if one was open
    fn end_stream(&self) -> bool {
        let was_streaming = self.streaming.swap(false, Ordering::SeqCst);
        if was_streaming {
            println!();
        }
        was_streaming
    }

    fn clear_spinners(&self) {
        for (_, pb) in self.lock_spinners().drain() {
            pb.finish_and_clear();
        }
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ShellEventSink for ConsoleSink {
    fn emit(&self, event: ShellEvent) {
        match event {
            ShellEvent::TurnStarted {
                generation,
                tool_count,
                ..
            } => {
                tracing::debug!(generation, tool_count, "Turn started");
            }
            ShellEvent::ToolStarted {
                call_id,
                tool_name,
                preview,
            } => self.tool_started(call_id, &tool_name, &preview),
            ShellEvent::ToolFinished {
                call_id,
                tool_name,
                success,
                duration,
                error,
            } => self.tool_finished(&call_id, &tool_name, success, duration, error.as_deref()),
            ShellEvent::ResponseDelta { text } => self.stream_delta(&text),
            ShellEvent::Response { text, streamed } => {
                self.clear_spinners();
                if !(self.end_stream() && streamed) {
                    println!();
                    println!("{}", text.trim_end());
                }
            }
            ShellEvent::Notice { level, message } => match level {
                NoticeLevel::Info if self.quiet => {}
                NoticeLevel::Info => eprintln!("{} {}", "ℹ".cyan(), message),
                NoticeLevel::Warning => eprintln!("{} {}", "⚠".yellow(), message.yellow()),
                NoticeLevel::Error => eprintln!("{} {}", "✗".red(), message.red()),
            },
            ShellEvent::ToolsReloaded {
                generation,
                tool_count,
                change,
                error,
            } => match error {
                Some(error) => eprintln!(
                    "{} {} {}",
                    "↻".yellow(),
                    format!("Tool reload failed: {}", change).yellow(),
                    format!("({})", error).dimmed()
                ),
                None if self.quiet => {}
                None => eprintln!(
                    "{} {} {}",
                    "↻".cyan(),
                    format!("Tools updated: {}", change).cyan(),
                    format!("(generation {}, {} tools)", generation, tool_count).dimmed()
                ),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(420)), "0.42s");
        assert_eq!(format_duration(Duration::from_millis(1020)), "1.02s");
        assert_eq!(format_duration(Duration::ZERO), "0.00s");
    }

    #[test]
    fn test_tool_finished_line() {
        assert_eq!(
            tool_finished_line("echo_tool", true, Duration::from_millis(420)),
            "echo_tool completed in 0.42s"
        );
        assert_eq!(
            tool_finished_line("echo_tool", false, Duration::from_millis(1020)),
            "echo_tool failed after 1.02s"
        );
    }

    #[test]
    fn test_finished_without_start_is_harmless() {
        let sink = ConsoleSink::new().with_quiet(true);
        sink.emit(ShellEvent::ToolFinished {
            call_id: "missing".into(),
            tool_name: "echo_tool".into(),
            success: true,
            duration: Duration::from_millis(5),
            error: None,
        });
        assert!(sink.lock_spinners().is_empty());
    }

    #[test]
    fn test_streamed_reply_closes_its_line() {
        let sink = ConsoleSink::new().with_quiet(true);
        sink.emit(ShellEvent::ResponseDelta { text: "Hel".into() });
        sink.emit(ShellEvent::ResponseDelta { text: "lo".into() });
        assert!(sink.streaming.load(Ordering::SeqCst));

        sink.emit(ShellEvent::Response {
            text: "Hello".into(),
            streamed: true,
        });
        assert!(!sink.streaming.load(Ordering::SeqCst));
    }

    #[test]
    fn test_tool_start_ends_streamed_line() {
        let sink = ConsoleSink::new().with_quiet(true);
        sink.emit(ShellEvent::ResponseDelta { text: "Checking".into() });
        sink.emit(ShellEvent::ToolStarted {
            call_id: "c1".into(),
            tool_name: "echo_tool".into(),
            preview: "hi".into(),
        });
        assert!(!sink.streaming.load(Ordering::SeqCst));
    }

    #[test]
    fn test_spinner_tracked_per_call() {
        let sink = ConsoleSink::new();
        sink.emit(ShellEvent::ToolStarted {
            call_id: "c1".into(),
            tool_name: "echo_tool".into(),
            preview: "hi".into(),
        });
        assert_eq!(sink.lock_spinners().len(), 1);

        sink.emit(ShellEvent::ToolFinished {
            call_id: "c1".into(),
            tool_name: "echo_tool".into(),
            success: true,
            duration: Duration::from_millis(5),
            error: None,
        });
        assert!(sink.lock_spinners().is_empty());
    }
}
