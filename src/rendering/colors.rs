//! ANSI color utilities and badge rendering for sitescout reports.
//!
//! Badges flag what a reader must not miss:
//! - Risk: [HIGH] / [MEDIUM] / [LOW] cannibalization
//! - Pattern: [grid] [linear] [radial] [cluster], styled by severity
//! - Provenance: [live] / [modeled] data, [simulated] signals, [fallback] results
//!
//! Color scheme works on light and dark terminals:
//! - Red/yellow/green for risk, bold for HIGH
//! - Muted colors for provenance metadata

use owo_colors::{OwoColorize, Style};

use crate::types::{PatternKind, RiskLevel, Severity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Badge {
    Risk(RiskLevel),
    Pattern(PatternKind, Severity),
    Live,
    Modeled,
    /// Environmental signals are placeholders
    Simulated,
    /// Produced by a degradation path
    Fallback,
}

impl Badge {
    pub fn label(&self) -> &'static str {
        match self {
            Badge::Risk(risk) => risk.label(),
            Badge::Pattern(kind, _) => kind.label(),
            Badge::Live => "live",
            Badge::Modeled => "modeled",
            Badge::Simulated => "simulated",
            Badge::Fallback => "fallback",
        }
    }

    pub fn style(&self) -> Style {
        match self {
            Badge::Risk(RiskLevel::High) => Style::new().bright_red().bold(),
            Badge::Risk(RiskLevel::Medium) => Style::new().yellow(),
            Badge::Risk(RiskLevel::Low) => Style::new().green(),

            Badge::Pattern(_, Severity::High) => Style::new().bright_magenta().bold(),
            Badge::Pattern(_, Severity::Medium) => Style::new().magenta(),
            Badge::Pattern(_, Severity::Low) => Style::new().magenta().dimmed(),

            Badge::Live => Style::new().bright_cyan(),
            Badge::Modeled => Style::new().cyan().dimmed(),
            Badge::Simulated => Style::new().yellow().dimmed(),
            Badge::Fallback => Style::new().bright_yellow(),
        }
    }

    pub fn render(&self, use_color: bool) -> String {
        if use_color {
            format!("[{}]", self.label().style(self.style()))
        } else {
            format!("[{}]", self.label())
        }
    }
}

/// Semantic coloring for report elements, no-ops when color is off.
#[derive(Debug, Clone, Copy)]
pub struct Colorizer {
    pub use_color: bool,
}

impl Colorizer {
    pub fn new(use_color: bool) -> Self {
        Self { use_color }
    }

    /// Candidate ids (bold blue headers)
    pub fn heading(&self, s: &str) -> String {
        self.apply(s, Style::new().bright_blue().bold())
    }

    /// Score by band: green ≥ 0.6, yellow ≥ 0.3, red below
    pub fn score(&self, value: f64) -> String {
        let text = format!("{value:.3}");
        let style = if value >= 0.6 {
            Style::new().green()
        } else if value >= 0.3 {
            Style::new().yellow()
        } else {
            Style::new().red()
        };
        self.apply(&text, style)
    }

    /// Dim text for secondary information
    pub fn dim(&self, s: &str) -> String {
        self.apply(s, Style::new().dimmed())
    }

    pub fn badges(&self, badges: &[Badge]) -> String {
        badges
            .iter()
            .map(|b| b.render(self.use_color))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn apply(&self, s: &str, style: Style) -> String {
        if self.use_color {
            s.style(style).to_string()
        } else {
            s.to_string()
        }
    }
}
