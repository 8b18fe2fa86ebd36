//! Report rendering for `check` results.
//!
//! Supports the human report (component histogram, per-run table, summary
//! bar) and a JSON document with one record per run. `ConsoleListener`
//! prints per-run progress while the matrix is running.

use crate::aggregate::{ComponentHistogram, SeverityCounts};
use crate::models::{Defect, RunOutcome, RunResult, Severity};
use crate::orchestrator::RunListener;
use crate::outcome::{command_failed, Tally};
use crate::utils::{humanize_duration, labeled_bar, terminal_width, use_colors};
use owo_colors::OwoColorize;
use serde_json::json;
use serde_json::Value as JsonVal;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Center,
}

#[derive(Debug, Clone, Copy)]
enum Style {
    Plain,
    Bold,
    Cyan,
    Green,
    Red,
}

fn paint(text: &str, style: Style, color: bool) -> String {
    if !color {
        return text.to_string();
    }
    match style {
        Style::Plain => text.to_string(),
        Style::Bold => text.bold().to_string(),
        Style::Cyan => text.cyan().to_string(),
        Style::Green => text.green().bold().to_string(),
        Style::Red => text.red().bold().to_string(),
    }
}

struct Cell {
    text: String,
    style: Style,
}

impl Cell {
    fn new(text: impl Into<String>, style: Style) -> Self {
        Cell {
            text: text.into(),
            style,
        }
    }
}

/// Plain-text table: bold header, dashed rule, rows separated by two spaces.
/// A `None` row renders as a blank line.
struct Table {
    headers: Vec<String>,
    aligns: Vec<Align>,
    rows: Vec<Option<Vec<Cell>>>,
}

impl Table {
    fn new(headers: Vec<String>, aligns: Vec<Align>) -> Self {
        Table {
            headers,
            aligns,
            rows: Vec::new(),
        }
    }

    fn row(&mut self, cells: Vec<Cell>) {
        self.rows.push(Some(cells));
    }

    fn separator(&mut self) {
        self.rows.push(None);
    }

    fn render(&self, color: bool) -> Vec<String> {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for cells in self.rows.iter().flatten() {
            for (i, cell) in cells.iter().enumerate() {
                widths[i] = widths[i].max(cell.text.chars().count());
            }
        }

        let mut lines = Vec::with_capacity(self.rows.len() + 2);
        let header: Vec<String> = self
            .headers
            .iter()
            .enumerate()
            .map(|(i, h)| paint(&pad(h, widths[i], self.aligns[i]), Style::Bold, color))
            .collect();
        lines.push(header.join("  ").trim_end().to_string());
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        lines.push(rule.join("  "));

        for row in &self.rows {
            let Some(cells) = row else {
                lines.push(String::new());
                continue;
            };
            let rendered: Vec<String> = cells
                .iter()
                .enumerate()
                .map(|(i, c)| paint(&pad(&c.text, widths[i], self.aligns[i]), c.style, color))
                .collect();
            lines.push(rendered.join("  ").trim_end().to_string());
        }
        lines
    }
}

fn pad(text: &str, width: usize, align: Align) -> String {
    match align {
        Align::Left => format!("{:<width$}", text, width = width),
        Align::Center => format!("{:^width$}", text, width = width),
    }
}

fn stats_row(label: &str, counts: &SeverityCounts, style: Style) -> Vec<Cell> {
    let mut cells = vec![Cell::new(label, style)];
    for sev in Severity::ALL.iter().rev() {
        cells.push(Cell::new(counts.get(*sev).to_string(), style));
    }
    cells
}

/// Component × severity table. Writes nothing for an empty histogram.
pub fn write_defect_stats(
    hist: &ComponentHistogram,
    color: bool,
    w: &mut dyn Write,
) -> anyhow::Result<()> {
    if hist.is_empty() {
        return Ok(());
    }
    let mut headers = vec!["Component".to_string()];
    headers.extend(Severity::ALL.iter().rev().map(|s| s.label().to_uppercase()));
    let mut table = Table::new(
        headers,
        vec![Align::Left, Align::Center, Align::Center, Align::Center],
    );
    for (component, counts) in hist.rows() {
        let mut cells = stats_row(component, counts, Style::Plain);
        cells[0].style = Style::Cyan;
        table.row(cells);
    }
    table.separator();
    table.row(stats_row("Total", hist.total(), Style::Bold));

    for line in table.render(color) {
        writeln!(w, "{}", line)?;
    }
    writeln!(w)?;
    Ok(())
}

fn status_cell(outcome: RunOutcome) -> Cell {
    let style = match outcome {
        RunOutcome::Succeeded => Style::Green,
        RunOutcome::Failed => Style::Red,
        RunOutcome::Skipped => Style::Plain,
    };
    Cell::new(outcome.label(), style)
}

/// One row per run: environment, tool, status, duration.
pub fn write_results_table(
    results: &[RunResult],
    color: bool,
    w: &mut dyn Write,
) -> anyhow::Result<()> {
    let mut table = Table::new(
        ["Environment", "Tool", "Status", "Duration"]
            .iter()
            .map(|h| h.to_string())
            .collect(),
        vec![Align::Left, Align::Left, Align::Left, Align::Left],
    );
    for r in results {
        table.row(vec![
            Cell::new(r.environment.as_str(), Style::Cyan),
            Cell::new(r.tool.as_str(), Style::Plain),
            status_cell(r.outcome),
            Cell::new(
                r.duration.map(humanize_duration).unwrap_or_default(),
                Style::Plain,
            ),
        ]);
    }
    for line in table.render(color) {
        writeln!(w, "{}", line)?;
    }
    Ok(())
}

/// `"{F} failed, {S} succeeded in {D}"`; the failed part only when non-zero.
pub fn summary_line(tally: &Tally) -> String {
    let mut parts = Vec::new();
    if tally.failed > 0 {
        parts.push(format!("{} failed", tally.failed));
    }
    parts.push(format!("{} succeeded", tally.succeeded));
    format!("{} in {}", parts.join(", "), humanize_duration(tally.duration))
}

pub fn write_summary(
    tally: &Tally,
    color: bool,
    width: usize,
    w: &mut dyn Write,
) -> anyhow::Result<()> {
    let label = summary_line(tally);
    let bar = labeled_bar(&label, label.chars().count(), width);
    let style = if tally.failed > 0 {
        Style::Red
    } else {
        Style::Green
    };
    writeln!(w, "{}", paint(&bar, style, color))?;
    Ok(())
}

/// Full human report. The results table and summary go to `err` when any
/// run failed, otherwise to `out`.
pub fn write_human(
    results: &[RunResult],
    hist: &ComponentHistogram,
    color: bool,
    width: usize,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> anyhow::Result<()> {
    writeln!(out)?;
    write_defect_stats(hist, color, out)?;
    let tally = Tally::from_results(results);
    let target: &mut dyn Write = if command_failed(results) { err } else { out };
    write_results_table(results, color, target)?;
    writeln!(target)?;
    write_summary(&tally, color, width, target)?;
    Ok(())
}

/// Print the human report to stdout/stderr.
pub fn print_human(results: &[RunResult], project_dir: &Path) -> anyhow::Result<()> {
    let hist = ComponentHistogram::build(results, project_dir);
    write_human(
        results,
        &hist,
        use_colors(false),
        terminal_width(),
        &mut io::stdout().lock(),
        &mut io::stderr().lock(),
    )
}

/// Compose the JSON document (pure) for testing/snapshot purposes.
pub fn compose_results_json(results: &[RunResult]) -> JsonVal {
    let items: Vec<_> = results
        .iter()
        .map(|r| {
            json!({
                "environment": r.environment,
                "tool": r.tool,
                "duration": r.duration.map(|d| d.as_secs_f64()),
                "ignored": r.outcome == RunOutcome::Skipped,
                "succeeded": r.outcome == RunOutcome::Succeeded,
                "defects": r.defects,
            })
        })
        .collect();
    JsonVal::Array(items)
}

pub fn write_json(results: &[RunResult], w: &mut dyn Write) -> anyhow::Result<()> {
    let doc = compose_results_json(results);
    writeln!(w, "{}", serde_json::to_string_pretty(&doc)?)?;
    Ok(())
}

#[derive(Debug, Clone, Copy, Default)]
/// Console flags relevant to progress output.
pub struct ConsoleMode {
    pub silent: bool,
    pub verbose: bool,
    pub json: bool,
}

impl ConsoleMode {
    fn shows_progress(&self) -> bool {
        !self.silent && !self.json
    }
}

/// Prints run headers, defects, and per-run footers while checks run.
pub struct ConsoleListener<O: Write, E: Write> {
    out: O,
    err: E,
    project_dir: PathBuf,
    mode: ConsoleMode,
    color: bool,
    width: usize,
}

impl ConsoleListener<io::Stdout, io::Stderr> {
    pub fn stdio(project_dir: &Path, mode: ConsoleMode) -> Self {
        ConsoleListener::new(
            io::stdout(),
            io::stderr(),
            project_dir,
            mode,
            use_colors(mode.json),
            terminal_width(),
        )
    }
}

impl<O: Write, E: Write> ConsoleListener<O, E> {
    pub fn new(
        out: O,
        err: E,
        project_dir: &Path,
        mode: ConsoleMode,
        color: bool,
        width: usize,
    ) -> Self {
        ConsoleListener {
            out,
            err,
            project_dir: project_dir.to_path_buf(),
            mode,
            color,
            width,
        }
    }

    pub fn into_inner(self) -> (O, E) {
        (self.out, self.err)
    }

    fn emit(&mut self, to_err: bool, line: &str) {
        let res = if to_err {
            writeln!(self.err, "{}", line)
        } else {
            writeln!(self.out, "{}", line)
        };
        if let Err(e) = res {
            warn!(error = %e, "failed to write progress output");
        }
    }

    fn echo(&mut self, defect: &Defect) {
        let line = defect.display_relative(&self.project_dir);
        self.emit(false, &line);
    }
}

impl<O: Write, E: Write> RunListener for ConsoleListener<O, E> {
    fn run_started(&mut self, env: &str, tool: &str, env_dump: &[String]) {
        if !self.mode.shows_progress() {
            return;
        }
        let env = paint(env, Style::Cyan, self.color);
        let header = format!("Checking {} > {} ({})", env, tool, env_dump.join("; "));
        let rule = paint(&"-".repeat(self.width), Style::Bold, self.color);
        self.emit(false, &header);
        self.emit(false, &rule);
    }

    fn wants_defects(&self) -> bool {
        self.mode.shows_progress() && !self.mode.verbose
    }

    fn defect_found(&mut self, defect: &Defect) {
        self.echo(defect);
    }

    fn run_finished(&mut self, result: &RunResult) {
        if result.is_skipped() || !self.mode.shows_progress() {
            return;
        }
        if self.mode.verbose {
            for defect in &result.defects {
                self.echo(defect);
            }
        }
        if result.defects.is_empty() {
            self.emit(false, "No defects found");
        }

        let failed = result.outcome == RunOutcome::Failed;
        let status = if failed { "FAILED" } else { "PASSED" };
        let seconds = result.duration.unwrap_or_default().as_secs_f64();
        let plain = format!("[{}] Took {:.2} seconds", status, seconds);
        let styled = format!(
            "[{}] Took {:.2} seconds",
            paint(status, if failed { Style::Red } else { Style::Green }, self.color),
            seconds
        );
        let bar = labeled_bar(&styled, plain.chars().count(), self.width);
        self.emit(failed, &bar);
    }
}
