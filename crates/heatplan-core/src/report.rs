//! # Report
//!
//! Deterministic scenario comparison reports built from KPI records.
//!
//! A report is assembled once as a [`ReportDocument`] and then rendered
//! as Markdown or as plain text with underlined headings. Several reports
//! can be joined into one document with [`concatenate`].

use crate::kpi::{KpiRecord, rank};
use crate::scenario::{Scenario, ScenarioKind};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Separator line between concatenated reports.
pub const REPORT_SEPARATOR: &str = "---";

/// Lower voltage band limit (pu).
pub const MIN_VOLTAGE_PU: f64 = 0.9;

/// Feeder loading above this is flagged (%).
pub const MAX_FEEDER_LOAD_PERCENT: f64 = 100.0;

/// Network pressure drop above this is flagged (bar).
pub const MAX_PRESSURE_DROP_BAR: f64 = 3.0;

/// Header information of a report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub title: String,
    pub study_area: Option<String>,
    /// Date string supplied by the caller.
    pub generated: Option<String>,
    pub scenarios: Vec<Scenario>,
}

impl ReportMetadata {
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    fn scenario(&self, name: &str) -> Option<&Scenario> {
        self.scenarios.iter().find(|s| s.name == name)
    }
}

// =============================================================================
// DOCUMENT MODEL
// =============================================================================

/// Content block of a section.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Paragraph(String),
    Bullets(Vec<String>),
    Table {
        header: Vec<String>,
        rows: Vec<Vec<String>>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub heading: String,
    pub blocks: Vec<Block>,
}

/// Format-independent report.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportDocument {
    pub title: String,
    pub preamble: Vec<String>,
    pub sections: Vec<Section>,
}

fn num(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.2}"))
}

fn count(value: Option<usize>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| v.to_string())
}

fn kpi_table(kpis: &[KpiRecord]) -> Block {
    let header = [
        "Scenario",
        "Type",
        "LCoH (EUR/MWh)",
        "CO2 (t/a)",
        "Max pressure drop (bar)",
        "Pump energy (kWh)",
        "Max feeder load (%)",
        "Transformer overloads",
        "Comment",
    ]
    .map(String::from)
    .to_vec();
    let rows = kpis
        .iter()
        .map(|k| {
            vec![
                k.scenario.clone(),
                k.kind.to_string(),
                num(k.lcoh_eur_per_mwh),
                num(k.co2_t_per_a),
                num(k.max_pressure_drop_bar),
                num(k.pump_energy_kwh),
                num(k.max_feeder_load_percent),
                count(k.transformer_overloads),
                k.comment.clone(),
            ]
        })
        .collect();
    Block::Table { header, rows }
}

fn narrative(k: &KpiRecord, metadata: &ReportMetadata) -> String {
    let mut text = format!("**{}** ({})", k.scenario, k.kind.description());
    if let Some(s) = metadata.scenario(&k.scenario) {
        if !s.description.is_empty() {
            let _ = write!(text, ", {}", s.description);
        }
        let _ = write!(text, ", {} buildings", s.building_ids.len());
    }
    text.push_str(". ");

    if !k.success {
        let _ = write!(text, "The simulation did not complete: {}.", k.comment);
        return text;
    }
    match k.lcoh_eur_per_mwh {
        Some(lcoh) => {
            let _ = write!(text, "Levelised cost of heat is {lcoh:.2} EUR/MWh");
        }
        None => text.push_str("No heat is delivered, so no cost of heat is defined"),
    }
    if let Some(co2) = k.co2_t_per_a {
        let _ = write!(text, " with annual emissions of {co2:.2} t CO2");
    }
    text.push('.');
    match k.kind {
        ScenarioKind::DH => {
            if let (Some(len), Some(dp)) = (k.network_length_m, k.max_pressure_drop_bar) {
                let _ = write!(
                    text,
                    " The network spans {:.2} km of pipe with a maximum pressure drop of {dp:.2} bar.",
                    len / 1000.0
                );
            }
        }
        ScenarioKind::HP => {
            if let (Some(n), Some(feeder)) = (k.n_heat_pumps, k.max_feeder_load_percent) {
                let _ = write!(
                    text,
                    " {n} heat pumps load the most stressed feeder to {feeder:.2} %."
                );
            }
        }
    }
    if !k.comment.is_empty() {
        let _ = write!(text, " Note: {}.", k.comment);
    }
    text
}

fn trade_offs(kpis: &[KpiRecord]) -> Vec<Block> {
    let ranking = rank(kpis);
    let find = |name: &Option<String>| {
        name.as_ref()
            .and_then(|n| kpis.iter().find(|k| &k.scenario == n))
    };
    let (Some(cheap), Some(clean)) = (find(&ranking.cheapest), find(&ranking.lowest_emissions))
    else {
        return vec![Block::Paragraph(
            "No successful scenarios are available for comparison.".to_string(),
        )];
    };

    if cheap.scenario == clean.scenario {
        return vec![Block::Paragraph(format!(
            "{} is both the cheapest and the lowest-emission option; there is no cost/emission trade-off.",
            cheap.scenario
        ))];
    }

    let mut bullets = vec![
        format!(
            "Cheapest: {} at {} EUR/MWh ({} t CO2/a).",
            cheap.scenario,
            num(cheap.lcoh_eur_per_mwh),
            num(cheap.co2_t_per_a)
        ),
        format!(
            "Lowest emissions: {} at {} t CO2/a ({} EUR/MWh).",
            clean.scenario,
            num(clean.co2_t_per_a),
            num(clean.lcoh_eur_per_mwh)
        ),
    ];
    if let (Some(c), Some(e), Some(c_co2), Some(e_co2)) = (
        cheap.lcoh_eur_per_mwh,
        clean.lcoh_eur_per_mwh,
        cheap.co2_t_per_a,
        clean.co2_t_per_a,
    ) {
        let saved = c_co2 - e_co2;
        if saved > 0.0 {
            bullets.push(format!(
                "Avoiding {saved:.2} t CO2/a costs {:.2} EUR/MWh more.",
                e - c
            ));
        }
    }
    vec![Block::Bullets(bullets)]
}

fn constraints(kpis: &[KpiRecord]) -> Vec<Block> {
    let mut bullets = Vec::new();
    for k in kpis.iter().filter(|k| k.success) {
        if let Some(dp) = k.max_pressure_drop_bar.filter(|dp| *dp > MAX_PRESSURE_DROP_BAR) {
            bullets.push(format!(
                "{}: pressure drop of {dp:.2} bar exceeds {MAX_PRESSURE_DROP_BAR:.1} bar; larger pipes or booster pumps are needed.",
                k.scenario
            ));
        }
        if let Some(n) = k.transformer_overloads.filter(|n| *n > 0) {
            bullets.push(format!(
                "{}: {n} transformer(s) overloaded; reinforcement is required.",
                k.scenario
            ));
        }
        if let Some(load) = k
            .max_feeder_load_percent
            .filter(|l| *l > MAX_FEEDER_LOAD_PERCENT)
        {
            bullets.push(format!(
                "{}: feeder loading reaches {load:.2} %.",
                k.scenario
            ));
        }
        if let Some(u) = k.min_voltage_pu.filter(|u| *u < MIN_VOLTAGE_PU) {
            bullets.push(format!(
                "{}: minimum voltage {u:.3} pu is below {MIN_VOLTAGE_PU} pu.",
                k.scenario
            ));
        }
    }
    if bullets.is_empty() {
        vec![Block::Paragraph(
            "No scenario violates the pressure, loading or voltage limits.".to_string(),
        )]
    } else {
        vec![Block::Bullets(bullets)]
    }
}

fn recommendation(kpis: &[KpiRecord]) -> String {
    let ranking = rank(kpis);
    match (&ranking.cheapest, &ranking.lowest_emissions) {
        (Some(cheap), Some(clean)) if cheap == clean => format!(
            "Scenario {cheap} is recommended: it offers the lowest cost of heat and the lowest emissions."
        ),
        (Some(cheap), Some(clean)) => format!(
            "Scenario {cheap} is recommended on cost. Where emission targets dominate, scenario {clean} is preferable."
        ),
        (Some(cheap), None) => format!("Scenario {cheap} is recommended on cost."),
        (None, Some(clean)) => format!("Scenario {clean} is recommended on emissions."),
        (None, None) => {
            "No recommendation is possible because no scenario completed successfully.".to_string()
        }
    }
}

/// Assemble the report document.
#[must_use]
pub fn build_document(kpis: &[KpiRecord], metadata: &ReportMetadata) -> ReportDocument {
    let mut preamble = Vec::new();
    if let Some(area) = &metadata.study_area {
        preamble.push(format!("Study area: {area}"));
    }
    if let Some(date) = &metadata.generated {
        preamble.push(format!("Generated: {date}"));
    }
    let succeeded = kpis.iter().filter(|k| k.success).count();
    preamble.push(format!(
        "Scenarios: {} ({succeeded} successful)",
        kpis.len()
    ));

    ReportDocument {
        title: metadata.title.clone(),
        preamble,
        sections: vec![
            Section {
                heading: "KPI Summary".to_string(),
                blocks: vec![kpi_table(kpis)],
            },
            Section {
                heading: "Scenario Assessment".to_string(),
                blocks: kpis
                    .iter()
                    .map(|k| Block::Paragraph(narrative(k, metadata)))
                    .collect(),
            },
            Section {
                heading: "Trade-offs".to_string(),
                blocks: trade_offs(kpis),
            },
            Section {
                heading: "Technical Constraints".to_string(),
                blocks: constraints(kpis),
            },
            Section {
                heading: "Recommendation".to_string(),
                blocks: vec![Block::Paragraph(recommendation(kpis))],
            },
        ],
    }
}

// =============================================================================
// RENDERERS
// =============================================================================

fn escape_cell(cell: &str) -> String {
    cell.replace('|', "\\|")
}

impl ReportDocument {
    /// Markdown with `#`/`##` headings and pipe tables.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let mut out = format!("# {}\n\n", self.title);
        for line in &self.preamble {
            let _ = writeln!(out, "- {line}");
        }
        for section in &self.sections {
            let _ = write!(out, "\n## {}\n", section.heading);
            for block in &section.blocks {
                out.push('\n');
                match block {
                    Block::Paragraph(text) => {
                        let _ = writeln!(out, "{text}");
                    }
                    Block::Bullets(items) => {
                        for item in items {
                            let _ = writeln!(out, "- {item}");
                        }
                    }
                    Block::Table { header, rows } => {
                        let _ = writeln!(out, "| {} |", header.join(" | "));
                        let _ = writeln!(
                            out,
                            "|{}",
                            header.iter().map(|_| "---|").collect::<String>()
                        );
                        for row in rows {
                            let cells: Vec<String> = row.iter().map(|c| escape_cell(c)).collect();
                            let _ = writeln!(out, "| {} |", cells.join(" | "));
                        }
                    }
                }
            }
        }
        out
    }

    /// Plain text with underlined headings and aligned columns.
    #[must_use]
    pub fn to_text(&self) -> String {
        let underline = |text: &str, ch: char| ch.to_string().repeat(text.chars().count());
        let mut out = format!("{}\n{}\n\n", self.title, underline(&self.title, '='));
        for line in &self.preamble {
            let _ = writeln!(out, "{line}");
        }
        for section in &self.sections {
            let _ = write!(
                out,
                "\n{}\n{}\n",
                section.heading,
                underline(&section.heading, '-')
            );
            for block in &section.blocks {
                out.push('\n');
                match block {
                    Block::Paragraph(text) => {
                        let _ = writeln!(out, "{}", text.replace("**", ""));
                    }
                    Block::Bullets(items) => {
                        for item in items {
                            let _ = writeln!(out, "  * {item}");
                        }
                    }
                    Block::Table { header, rows } => {
                        let mut widths: Vec<usize> =
                            header.iter().map(|h| h.chars().count()).collect();
                        for row in rows {
                            for (w, cell) in widths.iter_mut().zip(row) {
                                *w = (*w).max(cell.chars().count());
                            }
                        }
                        let line = |cells: &[String]| {
                            cells
                                .iter()
                                .zip(&widths)
                                .map(|(c, w)| format!("{c:<width$}", width = *w))
                                .collect::<Vec<_>>()
                                .join("  ")
                                .trim_end()
                                .to_string()
                        };
                        let _ = writeln!(out, "{}", line(header));
                        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
                        let _ = writeln!(out, "{}", line(&rule));
                        for row in rows {
                            let _ = writeln!(out, "{}", line(row));
                        }
                    }
                }
            }
        }
        out
    }
}

/// Render a Markdown report.
#[must_use]
pub fn render_markdown(kpis: &[KpiRecord], metadata: &ReportMetadata) -> String {
    build_document(kpis, metadata).to_markdown()
}

/// Render a plain-text report.
#[must_use]
pub fn render_text(kpis: &[KpiRecord], metadata: &ReportMetadata) -> String {
    build_document(kpis, metadata).to_text()
}

/// Join reports with a separator line.
#[must_use]
pub fn concatenate(reports: &[String]) -> String {
    reports
        .iter()
        .map(|r| r.trim_end())
        .collect::<Vec<_>>()
        .join(&format!("\n\n{REPORT_SEPARATOR}\n\n"))
        + "\n"
}

// =============================================================================
// TESTS
// =============================================================================
