use std::io::IsTerminal;
use std::path::Path;

use anstyle::{AnsiColor, Effects, Style};
use lifeboat_core::Entry;
use lifeboat_retention::RetentionOutcome;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum OutputStyle {
    Plain,
    Rich,
}

#[derive(Copy, Clone, Debug)]
pub(crate) struct TerminalRenderer {
    style: OutputStyle,
}

impl TerminalRenderer {
    pub(crate) fn from_style(style: OutputStyle) -> Self {
        Self { style }
    }

    pub(crate) fn current() -> Self {
        Self::from_style(current_output_style())
    }

    pub(crate) fn print_status(self, status: &str, message: &str) {
        let line = match self.style {
            OutputStyle::Plain => render_status_line(self.style, status, message),
            OutputStyle::Rich => format!(
                "{} {message}",
                colorize(badge_style(status), status_badge(status))
            ),
        };
        println!("{line}");
    }
}

pub(crate) fn current_output_style() -> OutputStyle {
    if std::env::var_os("NO_COLOR").is_some() || !std::io::stdout().is_terminal() {
        OutputStyle::Plain
    } else {
        OutputStyle::Rich
    }
}

pub(crate) fn render_status_line(style: OutputStyle, status: &str, message: &str) -> String {
    match style {
        OutputStyle::Plain => message.to_string(),
        OutputStyle::Rich => format!("{} {message}", status_badge(status)),
    }
}

fn status_badge(status: &str) -> &'static str {
    match status {
        "ok" => "[OK]",
        "warn" => "[WARN]",
        "err" => "[ERR]",
        "skip" => "[SKIP]",
        _ => "[INFO]",
    }
}

fn badge_style(status: &str) -> Style {
    let color = match status {
        "ok" => AnsiColor::Green,
        "warn" | "skip" => AnsiColor::Yellow,
        "err" => AnsiColor::Red,
        _ => AnsiColor::Cyan,
    };
    Style::new()
        .fg_color(Some(color.into()))
        .effects(Effects::BOLD)
}

fn colorize(style: Style, text: &str) -> String {
    format!("{}{}{}", style.render(), text, style.render_reset())
}

/// Summary of one retention run as `(status, line)` pairs.
pub(crate) fn format_outcome_lines(
    outcome: &RetentionOutcome,
    dry_run: bool,
) -> Vec<(&'static str, String)> {
    let prefix = if dry_run { "would have " } else { "" };
    match outcome {
        RetentionOutcome::AlreadyBackedUp { entry, lifeboat } => vec![(
            "skip",
            format!(
                "{} is already backed up to {}",
                file_name(entry),
                file_name(lifeboat)
            ),
        )],
        RetentionOutcome::Created {
            entry,
            lifeboat,
            evicted,
        } => {
            let mut lines = evicted
                .iter()
                .map(|path| ("ok", format!("{prefix}deleted old lifeboat {}", file_name(path))))
                .collect::<Vec<_>>();
            lines.push(("ok", created_line(prefix, entry, lifeboat)));
            lines
        }
    }
}

fn created_line(prefix: &str, entry: &Path, lifeboat: &Entry) -> String {
    format!(
        "{prefix}created lifeboat {} from {}",
        lifeboat.basename(),
        file_name(entry)
    )
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
