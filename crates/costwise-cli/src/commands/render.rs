//! Human-readable output for engine results

use chrono::Duration;
use costwise_core::result::{CommitmentStatus, Severity};
use costwise_core::{
    AnomalyReport, CommitmentRecommendation, CompoundReport, CostOverview, ErrorReport,
    ForecastResult, OptimizationReport, Provenance, Status, StructuredResult,
    TagComplianceReport,
};

use super::truncate;

/// Forecast rows shown before the table is cut short
const MAX_FORECAST_ROWS: usize = 14;

/// Anomaly rows shown per table
const MAX_ANOMALY_ROWS: usize = 10;

pub fn print_result(result: &StructuredResult) {
    match result {
        StructuredResult::Forecast(f) => print_forecast(f),
        StructuredResult::AnomalyList(a) => print_anomalies(a),
        StructuredResult::OptimizationReport(o) => print_optimization(o),
        StructuredResult::CommitmentRecommendation(c) => print_commitment(c),
        StructuredResult::TagCompliance(t) => print_tags(t),
        StructuredResult::CostOverview(o) => print_overview(o),
        StructuredResult::Compound(c) => print_compound(c),
        StructuredResult::Error(e) => print_error(e),
    }
}

fn print_status(status: &Status, provenance: Provenance) {
    if let Status::InsufficientData(reason) = status {
        println!("   ⚠️  Insufficient data: {}", reason);
    }
    if provenance == Provenance::HeuristicFallback {
        println!("   💡 Heuristic estimate from resource inventory, not a model forecast");
    }
}

fn print_forecast(f: &ForecastResult) {
    println!();
    println!("📈 Forecast: {} ({} days)", f.dimension, f.horizon);
    println!("   ─────────────────────────────────────────────────────────────");
    print_status(&f.status, f.provenance);
    println!(
        "   Total: ${:.2} (${:.2} - ${:.2} at {:.0}% confidence)",
        f.total(),
        f.total_lower(),
        f.total_upper(),
        f.confidence * 100.0
    );
    if let Some(err) = f.backtest_error {
        println!("   Backtest RMSE: ${:.2}/day", err);
    }
    if !f.weights.is_empty() {
        let weights: Vec<String> = f
            .weights
            .iter()
            .map(|w| format!("{} {:.0}%", w.name, w.weight * 100.0))
            .collect();
        println!("   Ensemble: {}", weights.join(", "));
    }

    println!();
    println!(
        "   {:12} │ {:>10} │ {:>10} │ {:>10}",
        "Day", "Lower", "Point", "Upper"
    );
    println!("   ─────────────┼────────────┼────────────┼────────────");
    for k in 0..f.point.len().min(MAX_FORECAST_ROWS) {
        let day = match f.first_period {
            Some(first) => (first + Duration::days(k as i64)).to_string(),
            None => format!("+{}", k + 1),
        };
        println!(
            "   {:12} │ {:>10.2} │ {:>10.2} │ {:>10.2}",
            day, f.lower[k], f.point[k], f.upper[k]
        );
    }
    if f.point.len() > MAX_FORECAST_ROWS {
        println!("   ... and {} more days", f.point.len() - MAX_FORECAST_ROWS);
    }
}

fn print_anomalies(a: &AnomalyReport) {
    println!();
    println!(
        "🚨 Anomalies (|z| > {}, {}-day window)",
        a.threshold, a.window
    );
    println!("   ─────────────────────────────────────────────────────────────");
    print_status(&a.status, a.provenance);
    println!(
        "   Evaluated {} days across {} series: {} flagged ({:.1}%)",
        a.summary.points_evaluated,
        a.summary.series_evaluated,
        a.summary.total,
        a.summary.anomaly_rate
    );

    if a.summary.total == 0 {
        if a.status.is_ok() {
            println!();
            println!("✅ Nothing unusual in the cost history.");
        }
        return;
    }

    let rows = a.aggregate.iter().chain(&a.by_dimension);
    println!();
    println!(
        "   {:10} │ {:20} │ {:>10} │ {:>10} │ {:>6}",
        "Day", "Dimension", "Observed", "Expected", "z"
    );
    println!("   ───────────┼──────────────────────┼────────────┼────────────┼───────");
    for r in rows.clone().take(MAX_ANOMALY_ROWS) {
        let marker = match r.severity {
            Severity::High => "🔴",
            Severity::Medium => "🟡",
        };
        println!(
            "   {:10} │ {:20} │ {:>10.2} │ {:>10.2} │ {:>6.2} {}",
            r.period,
            truncate(&r.dimension, 20),
            r.observed,
            r.expected,
            r.z_score,
            marker
        );
    }
    let shown = rows.count();
    if shown > MAX_ANOMALY_ROWS {
        println!("   ... and {} more", shown - MAX_ANOMALY_ROWS);
    }
}

fn print_optimization(o: &OptimizationReport) {
    println!();
    println!("🧹 Optimization Opportunities");
    println!("   ─────────────────────────────────────────────────────────────");
    println!("   Resources scanned: {}", o.resources_scanned);

    if o.opportunities.is_empty() {
        println!();
        println!("✅ No idle or orphaned resources found.");
        return;
    }

    println!();
    println!(
        "   {:20} │ {:22} │ {:>10} │ {:>10}",
        "Resource", "Finding", "Cost/mo", "Saves/mo"
    );
    println!("   ─────────────────────┼────────────────────────┼────────────┼────────────");
    for opp in &o.opportunities {
        println!(
            "   {:20} │ {:22} │ {:>10.2} │ {:>10.2}",
            truncate(&opp.resource_id, 20),
            opp.category.as_str(),
            opp.monthly_cost,
            opp.estimated_savings
        );
        println!("   {:20} │ {} ({})", "", opp.action, opp.detail);
    }

    println!();
    for c in &o.categories {
        println!(
            "   {:24} {:>3} × ${:.2}/mo",
            c.category.as_str(),
            c.count,
            c.monthly_savings
        );
    }
    println!();
    println!(
        "💰 Potential savings: ${:.2}/month (${:.2}/year)",
        o.total_monthly_savings, o.total_annual_savings
    );
}

fn print_commitment(c: &CommitmentRecommendation) {
    println!();
    println!("🤝 Savings Commitment ({}, {})", c.term, c.payment);
    println!("   ─────────────────────────────────────────────────────────────");
    println!(
        "   Sustained minimum: ${:.4}/hour over {} days (CV {:.2})",
        c.sustained_minimum, c.lookback_periods, c.coefficient_of_variation
    );
    if c.existing_commitment > 0.0 {
        println!("   Already committed: ${:.4}/hour", c.existing_commitment);
    }

    match c.status {
        CommitmentStatus::Recommended => {
            println!("   Discount: {:.0}%", c.discount * 100.0);
            println!();
            println!("✅ Commit ${:.4}/hour", c.hourly_rate);
            println!(
                "   Estimated savings: ${:.2}/year (ROI {:.1}%)",
                c.estimated_annual_savings,
                c.roi * 100.0
            );
        }
        CommitmentStatus::NoRecommendation(reason) => {
            println!();
            println!("⏸️  No recommendation: {}", reason);
        }
    }
}

fn print_tags(t: &TagComplianceReport) {
    println!();
    println!("🏷️  Tag Compliance");
    println!("   ─────────────────────────────────────────────────────────────");
    println!("   Required: {}", t.required_tags.join(", "));
    println!(
        "   Compliant: {} of {} ({:.1}%)",
        t.compliant, t.total_resources, t.compliance_rate
    );

    if t.non_compliant.is_empty() {
        println!();
        println!("✅ Every resource carries the required tags.");
        return;
    }

    println!();
    println!("   {:20} │ {:10} │ {:>10} │ {}", "Resource", "Kind", "Cost/mo", "Missing");
    println!("   ─────────────────────┼────────────┼────────────┼──────────────────");
    for r in &t.non_compliant {
        println!(
            "   {:20} │ {:10} │ {:>10.2} │ {}",
            truncate(&r.resource_id, 20),
            r.kind.as_str(),
            r.monthly_cost,
            r.missing.join(", ")
        );
    }
    println!();
    for (tag, count) in &t.missing_tag_counts {
        println!("   {:16} missing on {}", tag, count);
    }
    println!();
    println!(
        "⚠️  ${:.2}/month of spend is not fully tagged",
        t.untagged_monthly_cost
    );
}

fn print_overview(o: &CostOverview) {
    println!();
    println!("📊 Cost Overview");
    println!("   ─────────────────────────────────────────────────────────────");
    print_status(&o.status, o.provenance);
    if let (Some(start), Some(end)) = (o.window_start, o.window_end) {
        println!("   Period: {} to {} ({} days)", start, end, o.periods);
    }
    println!("   Total: ${:.2}", o.total);
    println!("   Daily average: ${:.2}", o.daily_average);
    println!("   Projected monthly: ${:.2}", o.projected_monthly);

    if o.top_dimensions.is_empty() {
        return;
    }
    println!();
    println!("   {:25} │ {:>10} │ {:>6}", "Dimension", "Amount", "%");
    println!("   ──────────────────────────┼────────────┼────────");
    for d in &o.top_dimensions {
        println!(
            "   {:25} │ {:>10.2} │ {:>5.1}%",
            truncate(&d.dimension, 25),
            d.amount,
            d.percent
        );
    }
}

fn print_compound(c: &CompoundReport) {
    for section in &c.sections {
        println!();
        println!("━━ {} ━━", section.intent);
        print_result(&section.result);
    }
    let failed = c.failures().count();
    if failed > 0 {
        println!();
        println!(
            "⚠️  {} of {} sections failed; the others are complete.",
            failed,
            c.sections.len()
        );
    }
}

fn print_error(e: &ErrorReport) {
    println!();
    let kind = e.cause.as_deref().unwrap_or(&e.kind);
    match e.component {
        Some(intent) => println!("❌ {} failed ({})", intent, kind),
        None => println!("❌ Request failed ({})", kind),
    }
    println!("   {}", e.message);
    if e.retryable {
        println!("   💡 This looks temporary; try again.");
    }
}
