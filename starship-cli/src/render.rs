//! Text dashboard for `starship show`.

use starship_core::domain::PortfolioBook;
use starship_core::nav::{NavReport, PortfolioNav, PREVIEW_LOOKBACK_DAYS};
use starship_runner::NavRun;
use std::fmt::Write;

fn pct(x: f64) -> String {
    format!("{:+.2}%", x * 100.0)
}

/// Render the full dashboard. Members are listed in book order.
pub fn render_dashboard(run: &NavRun, book: &PortfolioBook) -> String {
    let report = &run.report;
    let mut out = String::with_capacity(2048);

    if report.mode.is_preview() {
        let _ = writeln!(
            out,
            "*** PREVIEW: start date {} has not arrived; showing the last {PREVIEW_LOOKBACK_DAYS} days ***",
            report.start_date
        );
        out.push('\n');
    }

    render_overview(&mut out, report);
    render_portfolio_table(&mut out, report);
    for portfolio in book.portfolios() {
        render_detail(&mut out, report, &portfolio.name, &portfolio.symbols);
    }

    if run.has_synthetic {
        out.push_str("WARNING: Results based on SYNTHETIC data\n");
    }
    for diag in &run.diagnostics {
        let _ = writeln!(out, "WARNING: {diag}");
    }

    out
}

fn render_overview(out: &mut String, report: &NavReport) {
    out.push_str("=== Account Overview ===\n");
    match &report.snapshot {
        Some(snap) => {
            let _ = writeln!(out, "NAV:            {:.4}", snap.latest);
            let _ = writeln!(out, "Daily Change:   {}", pct(snap.daily_change));
            let _ = writeln!(out, "Total Return:   {}", pct(snap.total_return));
            let _ = writeln!(out, "Data Date:      {}", snap.as_of);
        }
        None => out.push_str("No data: no portfolio could be resolved.\n"),
    }
    let _ = writeln!(out, "Start Date:     {} ({})", report.start_date, report.mode);
    let _ = writeln!(out, "Window:         {}", report.window);
    out.push('\n');
}

fn render_portfolio_table(out: &mut String, report: &NavReport) {
    out.push_str("=== Portfolios ===\n");
    let _ = writeln!(out, "{:<20} {:<12} {:>8} {:>9}", "Portfolio", "Baseline", "NAV", "Return");
    let _ = writeln!(out, "{}", "-".repeat(52));
    for p in &report.portfolios {
        let latest = p.latest_nav().unwrap_or(0.0);
        let _ = writeln!(
            out,
            "{:<20} {:<12} {:>8.4} {:>9}",
            p.name,
            p.baseline.date.to_string(),
            latest,
            pct(latest - 1.0)
        );
    }
    for s in &report.skipped_portfolios {
        let _ = writeln!(out, "{:<20} skipped: {}", s.name, s.reason);
    }
    out.push('\n');
}

fn render_detail(out: &mut String, report: &NavReport, name: &str, members: &[String]) {
    let _ = writeln!(out, "--- {name} ---");
    let _ = writeln!(out, "Members: {}", members.join(", "));

    let resolved: Option<&PortfolioNav> = report.portfolio(name);
    match resolved.and_then(|p| p.latest_nav()) {
        Some(nav) => {
            let _ = writeln!(out, "NAV: {nav:.4} ({})", pct(nav - 1.0));
        }
        None => out.push_str("NAV: no data\n"),
    }

    let _ = writeln!(out, "{:<8} {:>12} {:>10}", "Symbol", "Contribution", "Price");
    for symbol in members {
        let contribution = resolved
            .and_then(|p| p.instrument(symbol))
            .and_then(|i| i.latest_nav())
            .unwrap_or(0.0);
        let price = report.latest_prices.get(symbol).copied().unwrap_or(0.0);
        let _ = writeln!(out, "{symbol:<8} {contribution:>12.2} {price:>10.2}");
    }
    out.push('\n');
}
