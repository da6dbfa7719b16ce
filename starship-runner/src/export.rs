//! Reporting and export: JSON and CSV artifact generation.
//!
//! - **JSON**: the full `NavRun` with schema versioning
//! - **CSV**: the NAV table (one column per portfolio plus `total`) and one
//!   per-instrument NAV table per portfolio
//!
//! Persisted JSON carries a `schema_version`; newer versions are rejected on load.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use starship_core::nav::{NavReport, NavSeries, PortfolioNav};

use crate::runner::{NavRun, SCHEMA_VERSION};

// ─── JSON export ────────────────────────────────────────────────────

pub fn export_json(run: &NavRun) -> Result<String> {
    serde_json::to_string_pretty(run).context("failed to serialize NavRun to JSON")
}

/// Deserialize a `NavRun`, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<NavRun> {
    let run: NavRun = serde_json::from_str(json).context("failed to deserialize NavRun from JSON")?;
    if run.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            run.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(run)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Write a date-indexed table: one row per date in the union of all columns.
/// A column with no value on a date gets an empty cell.
fn series_table_csv(headers: &[&str], columns: &[&NavSeries]) -> Result<String> {
    let dates: BTreeSet<NaiveDate> = columns.iter().flat_map(|s| s.dates()).collect();

    let mut wtr = csv::Writer::from_writer(vec![]);
    let mut header = vec!["date"];
    header.extend_from_slice(headers);
    wtr.write_record(&header)?;

    for date in dates {
        let mut row = vec![date.to_string()];
        row.extend(
            columns
                .iter()
                .map(|s| s.get(date).map(|v| format!("{v:.6}")).unwrap_or_default()),
        );
        wtr.write_record(&row)?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// NAV table: date, one column per resolved portfolio, and `total`.
pub fn export_nav_csv(report: &NavReport) -> Result<String> {
    let mut headers: Vec<&str> = report.portfolios.iter().map(|p| p.name.as_str()).collect();
    headers.push("total");
    let mut columns: Vec<&NavSeries> = report.portfolios.iter().map(|p| &p.nav).collect();
    columns.push(&report.aggregate);
    series_table_csv(&headers, &columns)
}

/// Per-instrument NAV table for one portfolio: date and one column per instrument.
pub fn export_instruments_csv(portfolio: &PortfolioNav) -> Result<String> {
    let headers: Vec<&str> = portfolio.instruments.iter().map(|i| i.symbol.as_str()).collect();
    let columns: Vec<&NavSeries> = portfolio.instruments.iter().map(|i| &i.nav).collect();
    series_table_csv(&headers, &columns)
}

/// ASCII slug of a portfolio name: `"AI Full Stack"` → `"ai_full_stack"`.
fn slug(name: &str) -> String {
    let slug: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    slug.trim_matches('_').to_string()
}

/// File-name-safe stems for a list of portfolio names, unique within the list.
///
/// A stem is the name's ASCII slug. When the slug is empty or shared with
/// another name, the first 8 hex digits of the name's BLAKE3 hash are appended.
pub fn file_stems(names: &[&str]) -> Vec<String> {
    let slugs: Vec<String> = names.iter().map(|n| slug(n)).collect();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for s in &slugs {
        *counts.entry(s.as_str()).or_default() += 1;
    }

    let mut taken = HashSet::new();
    names
        .iter()
        .zip(&slugs)
        .enumerate()
        .map(|(i, (name, slug))| {
            let mut stem = if slug.is_empty() || counts[slug.as_str()] > 1 {
                let hash = blake3::hash(name.as_bytes()).to_hex();
                let prefix = if slug.is_empty() { "portfolio" } else { slug.as_str() };
                format!("{prefix}_{}", &hash[..8])
            } else {
                slug.clone()
            };
            if !taken.insert(stem.clone()) {
                stem = format!("{stem}_{i}");
                taken.insert(stem.clone());
            }
            stem
        })
        .collect()
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the artifact set for a run into `output_dir`:
/// - `report.json`: the full `NavRun`
/// - `nav.csv`: portfolio and total NAV by date
/// - `{portfolio}_instruments.csv`: per-instrument NAV, one file per portfolio
///
/// Returns the paths written.
pub fn save_artifacts(run: &NavRun, output_dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create export dir: {}", output_dir.display()))?;
    let mut written = Vec::new();

    let mut write = |name: String, content: String| -> Result<()> {
        let path = output_dir.join(name);
        std::fs::write(&path, content)
            .with_context(|| format!("failed to write {}", path.display()))?;
        written.push(path);
        Ok(())
    };

    write("report.json".into(), export_json(run)?)?;
    write("nav.csv".into(), export_nav_csv(&run.report)?)?;
    let names: Vec<&str> = run.report.portfolios.iter().map(|p| p.name.as_str()).collect();
    for (portfolio, stem) in run.report.portfolios.iter().zip(file_stems(&names)) {
        write(
            format!("{stem}_instruments.csv"),
            export_instruments_csv(portfolio)?,
        )?;
    }

    Ok(written)
}

/// Load a `NavRun` from an export directory's report.json.
pub fn load_artifacts(dir: &Path) -> Result<NavRun> {
    let path = dir.join("report.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_names_keep_plain_slugs() {
        assert_eq!(
            file_stems(&["AI Full Stack", "HI3 Cornerstone"]),
            vec!["ai_full_stack", "hi3_cornerstone"]
        );
    }

    #[test]
    fn non_ascii_names_get_distinct_stems() {
        let names = ["逐星", "基石", "全产业", "航天", "AI全产业", "AI基石", "AI"];
        let stems = file_stems(&names);

        let distinct: HashSet<&String> = stems.iter().collect();
        assert_eq!(distinct.len(), names.len());
        assert!(stems[0].starts_with("portfolio_"));
        assert!(stems[4].starts_with("ai_"));
        assert!(stems
            .iter()
            .all(|s| s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')));
        // stable across calls
        assert_eq!(stems, file_stems(&names));
    }

    #[test]
    fn series_table_leaves_gaps_empty() {
        let d = |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap();
        let a = NavSeries::from_points([(d("2024-01-02"), 1.0), (d("2024-01-03"), 1.5)]);
        let b = NavSeries::from_points([(d("2024-01-03"), 0.75)]);

        let csv = series_table_csv(&["A", "B"], &[&a, &b]).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "date,A,B");
        assert_eq!(lines[1], "2024-01-02,1.000000,");
        assert_eq!(lines[2], "2024-01-03,1.500000,0.750000");
    }
}
