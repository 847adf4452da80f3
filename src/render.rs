//! Output rendering for streamed chat replies.
//!
//! [`StreamObserver`] is how the accumulator reports progress; [`Renderer`] adds
//! the informational and error output a terminal front end needs.
//! [`PlainTextRenderer`] implements both for stdout.

use std::io::{self, Stdout, Write};

/// ANSI escape code for dim text (used for informational lines).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code for red text (used for errors).
const ANSI_RED: &str = "\x1b[31m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// Receives incremental updates while an assistant reply is streamed.
pub trait StreamObserver: Send {
    /// Called once per fragment, after the fragment has been applied to the
    /// session. `content` is the full reply accumulated so far.
    fn on_fragment(&mut self, fragment: &str, content: &str);

    /// Called once when the reply ends, whether completed or cancelled.
    fn on_finish(&mut self, content: &str, cancelled: bool) {
        _ = content;
        _ = cancelled;
    }
}

/// An observer that ignores every update.
impl StreamObserver for () {
    fn on_fragment(&mut self, _: &str, _: &str) {}
}

/// Terminal output for the chat front end.
pub trait Renderer: StreamObserver {
    /// Print an error message.
    fn print_error(&mut self, error: &str);

    /// Print an informational message.
    fn print_info(&mut self, info: &str);

    /// Print a complete reply that was not streamed.
    fn print_reply(&mut self, content: &str);
}

/// Plain-text renderer with optional ANSI styling.
pub struct PlainTextRenderer {
    stdout: Stdout,
    use_color: bool,
}

impl PlainTextRenderer {
    /// Creates a renderer with color enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a renderer with explicit color control.
    pub fn with_color(use_color: bool) -> Self {
        Self {
            stdout: io::stdout(),
            use_color,
        }
    }

    fn styled(&self, style: &str, text: &str) -> String {
        if self.use_color {
            format!("{style}{text}{ANSI_RESET}")
        } else {
            text.to_string()
        }
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamObserver for PlainTextRenderer {
    fn on_fragment(&mut self, fragment: &str, _: &str) {
        let _ = write!(self.stdout, "{fragment}");
        let _ = self.stdout.flush();
    }

    fn on_finish(&mut self, _: &str, cancelled: bool) {
        if cancelled {
            let marker = self.styled(ANSI_DIM, " [cancelled]");
            let _ = write!(self.stdout, "{marker}");
        }
        let _ = writeln!(self.stdout);
        let _ = self.stdout.flush();
    }
}

impl Renderer for PlainTextRenderer {
    fn print_error(&mut self, error: &str) {
        let line = self.styled(ANSI_RED, &format!("Error: {error}"));
        let _ = writeln!(self.stdout, "{line}");
    }

    fn print_info(&mut self, info: &str) {
        let line = self.styled(ANSI_DIM, info);
        let _ = writeln!(self.stdout, "{line}");
    }

    fn print_reply(&mut self, content: &str) {
        let _ = writeln!(self.stdout, "{content}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn styling_respects_color_flag() {
        let colored = PlainTextRenderer::with_color(true);
        assert_eq!(colored.styled(ANSI_RED, "x"), "\x1b[31mx\x1b[0m");
        let plain = PlainTextRenderer::with_color(false);
        assert_eq!(plain.styled(ANSI_RED, "x"), "x");
    }
}
