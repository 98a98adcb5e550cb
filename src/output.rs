//! # Terminal Output
//!
//! Decides whether CLI output is colored and renders the few styled
//! fragments the commands print (status markers, paths, dimmed details).
//!
//! In `auto` mode colors are disabled when `NO_COLOR` is set, when
//! `CLICOLOR=0`, for `TERM=dumb`, or when stdout is not a terminal.
//! `CLICOLOR_FORCE=1` turns them back on for non-terminals.

use std::env;
use std::fmt::Display;

use console::Style;

/// Value of the `--color` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorChoice {
    Always,
    Never,
    #[default]
    Auto,
}

impl ColorChoice {
    /// Parses `always`, `never` or `auto`; anything else means `auto`.
    pub fn parse(flag: &str) -> Self {
        match flag.to_lowercase().as_str() {
            "always" => ColorChoice::Always,
            "never" => ColorChoice::Never,
            _ => ColorChoice::Auto,
        }
    }
}

/// Styles output according to the color choice.
#[derive(Debug, Clone)]
pub struct Painter {
    use_color: bool,
}

impl Painter {
    pub fn new(choice: ColorChoice) -> Self {
        let use_color = match choice {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => detect_color_support(),
        };
        Self { use_color }
    }

    pub fn plain() -> Self {
        Self { use_color: false }
    }

    pub fn use_color(&self) -> bool {
        self.use_color
    }

    fn paint(&self, style: Style, text: impl Display) -> String {
        style.force_styling(self.use_color).apply_to(text).to_string()
    }

    /// Marker for a finished step.
    pub fn ok(&self) -> String {
        if self.use_color {
            self.paint(Style::new().green().bold(), "✔")
        } else {
            "[OK]".to_string()
        }
    }

    /// Marker for a step that was skipped or had nothing to do.
    pub fn skip(&self) -> String {
        if self.use_color {
            self.paint(Style::new().dim(), "–")
        } else {
            "[--]".to_string()
        }
    }

    /// Marker for a failed step.
    pub fn fail(&self) -> String {
        if self.use_color {
            self.paint(Style::new().red().bold(), "✘")
        } else {
            "[ERR]".to_string()
        }
    }

    pub fn strong(&self, text: impl Display) -> String {
        self.paint(Style::new().bold(), text)
    }

    pub fn dim(&self, text: impl Display) -> String {
        self.paint(Style::new().dim(), text)
    }

    pub fn error(&self, text: impl Display) -> String {
        self.paint(Style::new().red(), text)
    }
}

impl Default for Painter {
    fn default() -> Self {
        Self::new(ColorChoice::Auto)
    }
}

fn detect_color_support() -> bool {
    // presence alone disables, see https://no-color.org/
    if env::var_os("NO_COLOR").is_some() {
        return false;
    }
    if env::var("CLICOLOR").is_ok_and(|v| v == "0") {
        return false;
    }
    if env::var("CLICOLOR_FORCE").is_ok_and(|v| v != "0" && !v.is_empty()) {
        return true;
    }
    if env::var("TERM").is_ok_and(|v| v == "dumb") {
        return false;
    }
    console::Term::stdout().features().colors_supported()
}
