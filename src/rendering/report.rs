//! Text report for a [`SelectionReport`].
//!
//! ```text
//! Site selection: country US (modeled data), 2 suggestions, 14 outlets
//!
//! #1 downtown  score 0.612  confidence 0.88  [modeled] [simulated]
//!    demand 0.713  supply -0.050  competition -0.050
//!    cannibalization [MEDIUM] impact 18.2%, 3 outlets affected
//!      o-12  640 m  -9.1%
//!    patterns 0.42: [linear] [radial]
//!      alt (40.71234, -74.00321) 212 m away, viability 0.58
//!    density 0.64, 31 retail / 6 transit / 1 anchor within 1 km
//! ```

use std::fmt::Write;

use super::colors::{Badge, Colorizer};
use crate::pipeline::{EnhancedSuggestion, SelectionReport};
use crate::types::{DataMode, ScopeKind};

/// Affected outlets listed per suggestion before truncating.
const MAX_OUTLETS_SHOWN: usize = 5;

pub struct ReportRenderer {
    colors: Colorizer,
}

impl ReportRenderer {
    pub fn new(use_color: bool) -> Self {
        Self {
            colors: Colorizer::new(use_color),
        }
    }

    pub fn render(&self, report: &SelectionReport) -> String {
        let mut out = String::new();

        let scope_kind = match report.scope.kind {
            ScopeKind::Country => "country",
            ScopeKind::Region => "region",
            ScopeKind::Custom => "area",
        };
        let mode = match report.mode {
            DataMode::Live => "live",
            DataMode::Modeled => "modeled",
        };
        let outlets = report
            .outlets_considered
            .map(|n| format!("{n} outlets"))
            .unwrap_or_else(|| "outlets unavailable".to_string());
        let _ = writeln!(
            out,
            "Site selection: {} {} ({} data), {} suggestions, {}",
            scope_kind,
            report.scope.value,
            mode,
            report.suggestions.len(),
            outlets
        );

        if report.suggestions.is_empty() {
            let _ = writeln!(out, "\n{}", self.colors.dim("No candidates passed the filters."));
            return out;
        }

        for (rank, suggestion) in report.suggestions.iter().enumerate() {
            out.push('\n');
            self.render_suggestion(&mut out, rank + 1, suggestion);
        }
        out
    }

    fn render_suggestion(&self, out: &mut String, rank: usize, s: &EnhancedSuggestion) {
        let c = &s.candidate;
        let mut badges = vec![if c.is_live { Badge::Live } else { Badge::Modeled }];
        if s.signals_simulated {
            badges.push(Badge::Simulated);
        }

        let _ = writeln!(
            out,
            "#{} {}  score {}  confidence {:.2}  {}",
            rank,
            self.colors.heading(&c.id),
            self.colors.score(c.final_score),
            c.confidence,
            self.colors.badges(&badges)
        );
        let _ = writeln!(
            out,
            "   {}",
            self.colors.dim(&format!(
                "demand {:.3}  supply -{:.3}  competition -{:.3}",
                c.demand_score, c.supply_penalty, c.competition_penalty
            ))
        );

        let cannibalization = &s.cannibalization;
        let mut risk = vec![Badge::Risk(cannibalization.risk_level)];
        if cannibalization.is_fallback {
            risk.push(Badge::Fallback);
        }
        let _ = writeln!(
            out,
            "   cannibalization {} impact {:.1}%, {} outlets affected",
            self.colors.badges(&risk),
            cannibalization.estimated_impact * 100.0,
            cannibalization.affected_outlets.len()
        );
        for affected in cannibalization.affected_outlets.iter().take(MAX_OUTLETS_SHOWN) {
            let _ = writeln!(
                out,
                "     {}  {:.0} m  -{:.1}%",
                affected.id, affected.distance_m, affected.revenue_impact_percent
            );
        }
        if cannibalization.affected_outlets.len() > MAX_OUTLETS_SHOWN {
            let _ = writeln!(
                out,
                "     {}",
                self.colors.dim(&format!(
                    "... and {} more",
                    cannibalization.affected_outlets.len() - MAX_OUTLETS_SHOWN
                ))
            );
        }
        if let Some(first) = cannibalization.mitigations.first() {
            let _ = writeln!(out, "     {}", self.colors.dim(first));
        }

        let patterns = &s.patterns;
        let mut pattern_badges: Vec<Badge> = Vec::new();
        for p in &patterns.detected_patterns {
            if !pattern_badges.iter().any(|b| b.label() == p.kind.label()) {
                pattern_badges.push(Badge::Pattern(p.kind, p.severity));
            }
        }
        let _ = writeln!(
            out,
            "   patterns {:.2}: {}",
            patterns.overall_pattern_score,
            if pattern_badges.is_empty() {
                "none".to_string()
            } else {
                self.colors.badges(&pattern_badges)
            }
        );
        if let Some(last) = patterns.recommendations.last() {
            let _ = writeln!(out, "     {}", self.colors.dim(last));
        }
        for alt in &patterns.alternative_spacing {
            let _ = writeln!(
                out,
                "     alt ({:.5}, {:.5}) {:.0} m away, viability {:.2}",
                alt.lat, alt.lng, alt.distance_from_original_m, alt.viability_score
            );
        }
        if s.barrier_adjustment.moved() {
            let adjusted = &s.barrier_adjustment.adjusted;
            let _ = writeln!(
                out,
                "     barrier-adjusted ({:.5}, {:.5})",
                adjusted.lat, adjusted.lng
            );
        }

        let f = &s.commercial_features;
        let _ = writeln!(
            out,
            "   density {:.2}, {} retail / {} transit / {} anchor within 1 km",
            s.urban_density, f.retail_count, f.transit_stops, f.anchor_stores
        );
        if let Some(rationale) = s.enrichment.as_ref().and_then(|e| e.rationale.as_deref()) {
            let _ = writeln!(out, "   {}", rationale);
        }
    }
}
