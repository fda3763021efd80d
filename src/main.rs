//! Claims Analytics CLI
//!
//! Command-line interface for loss ratio, fraud and summary reports

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use claims_analytics::{
    filter::describe,
    fraud::FraudMetrics,
    records::{load_claims, load_premiums, loader::{CLAIMS_FILE, DEFAULT_DATA_PATH, PREMIUMS_FILE}},
    ClaimFilter, ClaimStatus, ClaimsSummary, CoverType, EngineConfig, LossRatioEngine, MonthRange,
    PremiumFilter, PremiumSummary, YearMonth,
};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(name = "claims_analytics", version, about = "Insurance claims analytics reports")]
struct Cli {
    /// Premium transactions CSV
    #[arg(long)]
    premiums: Option<PathBuf>,

    /// Claim transactions CSV
    #[arg(long)]
    claims: Option<PathBuf>,

    /// Reference date for earned premium (YYYY-MM-DD), defaults to today
    #[arg(long)]
    as_of: Option<NaiveDate>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    /// Write the report to a file instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    #[command(flatten)]
    filters: FilterArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Earned premium and loss ratio per client, product and year
    LossRatio,
    /// IQR outlier counts, high-frequency providers and amount discrepancies
    Fraud,
    /// Headline claims and premium figures with the portfolio loss ratio
    Summary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

#[derive(Debug, Args)]
struct FilterArgs {
    /// Restrict to a year (repeatable)
    #[arg(long = "year")]
    years: Vec<i32>,

    /// Restrict to a product (repeatable)
    #[arg(long = "product")]
    products: Vec<String>,

    /// Restrict to a client (repeatable)
    #[arg(long = "client")]
    clients: Vec<String>,

    /// Restrict premiums to a cover type: New, Renewal, Endorsement (repeatable)
    #[arg(long = "cover-type", value_parser = parse_cover_type)]
    cover_types: Vec<CoverType>,

    /// Restrict claims to a status, e.g. Approved (repeatable)
    #[arg(long = "status")]
    statuses: Vec<String>,

    /// Restrict claims to a provider (repeatable)
    #[arg(long = "provider")]
    providers: Vec<String>,

    /// Restrict claims to a provider type (repeatable)
    #[arg(long = "provider-type")]
    provider_types: Vec<String>,

    /// First month of the range, YYYY-MM
    #[arg(long, value_parser = parse_year_month, requires = "to")]
    from: Option<YearMonth>,

    /// Last month of the range, YYYY-MM
    #[arg(long, value_parser = parse_year_month, requires = "from")]
    to: Option<YearMonth>,
}

fn parse_cover_type(s: &str) -> Result<CoverType, String> {
    s.parse().map_err(|e: claims_analytics::AnalyticsError| e.to_string())
}

fn parse_year_month(s: &str) -> Result<YearMonth, String> {
    let (year, month) = s
        .split_once('-')
        .ok_or_else(|| format!("expected YYYY-MM, got {:?}", s))?;
    let year: i32 = year.parse().map_err(|_| format!("invalid year in {:?}", s))?;
    let month: u32 = month.parse().map_err(|_| format!("invalid month in {:?}", s))?;
    YearMonth::new(year, month).map_err(|e| e.to_string())
}

impl FilterArgs {
    fn month_range(&self) -> Result<Option<MonthRange>> {
        match (self.from, self.to) {
            (Some(from), Some(to)) => Ok(Some(MonthRange::new(from, to)?)),
            _ => Ok(None),
        }
    }

    fn premium_filter(&self) -> Result<PremiumFilter> {
        Ok(PremiumFilter {
            years: self.years.clone(),
            products: self.products.clone(),
            cover_types: self.cover_types.clone(),
            clients: self.clients.clone(),
            months: self.month_range()?,
        })
    }

    fn claim_filter(&self) -> Result<ClaimFilter> {
        Ok(ClaimFilter {
            years: self.years.clone(),
            months: self.month_range()?,
            products: self.products.clone(),
            clients: self.clients.clone(),
            statuses: self.statuses.iter().map(|s| ClaimStatus::parse(s)).collect(),
            providers: self.providers.clone(),
            provider_types: self.provider_types.clone(),
            ..Default::default()
        })
    }
}

fn default_path(file: &str) -> PathBuf {
    Path::new(DEFAULT_DATA_PATH).join(file)
}

/// Write rows as JSON or CSV; `Table` is handled by the callers
fn write_records<T: Serialize>(out: &mut dyn Write, format: OutputFormat, rows: &[T]) -> Result<()> {
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, rows)?;
            writeln!(out)?;
        }
        OutputFormat::Csv | OutputFormat::Table => {
            let mut writer = csv::Writer::from_writer(out);
            for row in rows {
                writer.serialize(row)?;
            }
            writer.flush()?;
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let as_of = cli.as_of.unwrap_or_else(|| chrono::Local::now().date_naive());
    let premium_filter = cli.filters.premium_filter()?;
    let claim_filter = cli.filters.claim_filter()?;

    let mut out: Box<dyn Write> = match &cli.output {
        Some(path) => Box::new(
            std::fs::File::create(path)
                .with_context(|| format!("Unable to create {}", path.display()))?,
        ),
        None => Box::new(std::io::stdout().lock()),
    };

    let claims_path = cli.claims.clone().unwrap_or_else(|| default_path(CLAIMS_FILE));
    let claims = load_claims(&claims_path)
        .with_context(|| format!("Failed to load claims from {}", claims_path.display()))?;

    match cli.command {
        Command::LossRatio | Command::Summary => {
            let premiums_path = cli.premiums.clone().unwrap_or_else(|| default_path(PREMIUMS_FILE));
            let premiums = load_premiums(&premiums_path).with_context(|| {
                format!("Failed to load premiums from {}", premiums_path.display())
            })?;

            let config = EngineConfig::as_of(as_of)
                .with_premium_filter(premium_filter.clone())
                .with_claim_filter(claim_filter.clone());
            let report = LossRatioEngine::new(config).run(&premiums, &claims);

            if matches!(cli.command, Command::LossRatio) {
                let rows = report.rows();
                if cli.format == OutputFormat::Table {
                    writeln!(out, "Loss ratio as of {} ({})", as_of, describe(&premium_filter, &claim_filter))?;
                    writeln!(
                        out,
                        "{:<30} {:<20} {:>5} {:>16} {:>16} {:>10} {}",
                        "Client", "Product", "Year", "Earned", "Claims", "LR", "Status"
                    )?;
                    writeln!(out, "{}", "-".repeat(110))?;
                    for row in &rows {
                        let earned = row
                            .earned_premium
                            .map(|e| format!("{:.2}", e))
                            .unwrap_or_else(|| "-".to_string());
                        writeln!(
                            out,
                            "{:<30} {:<20} {:>5} {:>16} {:>16.2} {:>10} {}",
                            row.client_id,
                            row.product,
                            row.year,
                            earned,
                            row.total_claims,
                            row.loss_ratio_pct.to_string(),
                            row.status,
                        )?;
                    }
                    let d = &report.diagnostics;
                    writeln!(
                        out,
                        "\n{} entities, {} degenerate intervals, {} undefined ratios, {} unmatched endorsements",
                        d.entities, d.degenerate_intervals, d.undefined_ratios, d.unmatched_endorsements
                    )?;
                } else {
                    write_records(&mut *out, cli.format, &rows)?;
                }
            } else {
                let kept_premiums: Vec<_> = premiums
                    .into_iter()
                    .filter(|p| premium_filter.matches(p))
                    .collect();
                let kept_claims = claim_filter.apply(claims).kept;

                #[derive(Serialize)]
                struct SummaryOutput {
                    as_of: NaiveDate,
                    filters: String,
                    claims: ClaimsSummary,
                    premiums: PremiumSummary,
                    portfolio: claims_analytics::PortfolioLossRatio,
                }
                let summary = SummaryOutput {
                    as_of,
                    filters: describe(&premium_filter, &claim_filter),
                    claims: ClaimsSummary::compute(&kept_claims),
                    premiums: PremiumSummary::compute(&kept_premiums),
                    portfolio: report.portfolio(),
                };

                match cli.format {
                    OutputFormat::Json => {
                        serde_json::to_writer_pretty(&mut out, &summary)?;
                        writeln!(out)?;
                    }
                    _ => {
                        let scale = 1_000_000.0;
                        writeln!(out, "Summary as of {} ({})", as_of, summary.filters)?;
                        writeln!(out, "  Total Claims:        {:.2}M", summary.claims.total_claim_amount / scale)?;
                        writeln!(out, "  Approved Amount:     {:.2}M", summary.claims.total_approved_amount / scale)?;
                        writeln!(out, "  Distinct Claims:     {}", summary.claims.distinct_claims)?;
                        writeln!(out, "  Distinct Clients:    {}", summary.claims.distinct_clients)?;
                        writeln!(out, "  Service Providers:   {}", summary.claims.distinct_providers)?;
                        writeln!(out, "  Approval Rate:       {:.1}%", summary.claims.approval_rate)?;
                        writeln!(out, "  Denial Rate:         {:.1}%", summary.claims.denial_rate)?;
                        writeln!(out, "  New Premium:         {:.2}M", summary.premiums.total_new / scale)?;
                        writeln!(out, "  Renewal Premium:     {:.2}M", summary.premiums.total_renewal / scale)?;
                        writeln!(out, "  Endorsements:        {:.2}M ({})", summary.premiums.total_endorsements / scale, summary.premiums.endorsement_count)?;
                        writeln!(out, "  Earned Premium:      {:.2}M", summary.portfolio.earned_premium / scale)?;
                        writeln!(out, "  Loss Ratio:          {}", summary.portfolio.loss_ratio)?;
                        writeln!(out, "  Approved Loss Ratio: {}", summary.portfolio.approved_loss_ratio)?;
                        if !summary.claims.claims_by_type.is_empty() {
                            writeln!(out, "\nClaim amount by claim type:")?;
                            for (claim_type, amount) in &summary.claims.claims_by_type {
                                writeln!(out, "  {:<20} {:.2}M", claim_type, amount / scale)?;
                            }
                        }
                    }
                }
            }
        }
        Command::Fraud => {
            let kept_claims = claim_filter.apply(claims).kept;
            let metrics = FraudMetrics::compute(&kept_claims);

            match cli.format {
                OutputFormat::Json => {
                    serde_json::to_writer_pretty(&mut out, &metrics)?;
                    writeln!(out)?;
                }
                OutputFormat::Csv => write_records(&mut *out, cli.format, &metrics.top_providers)?,
                OutputFormat::Table => {
                    writeln!(out, "Fraud detection metrics ({})", describe(&premium_filter, &claim_filter))?;
                    if let Some(t) = &metrics.thresholds {
                        writeln!(
                            out,
                            "  Q1={:.2} Q3={:.2} IQR={:.2} mild>{:.2} extreme>{:.2}",
                            t.q1, t.q3, t.iqr, t.mild_upper, t.extreme_upper
                        )?;
                    }
                    writeln!(out, "  Normal Claims:     {}", metrics.normal_count)?;
                    writeln!(out, "  Mild Outliers:     {}", metrics.mild_outlier_count)?;
                    writeln!(out, "  Extreme Outliers:  {}", metrics.extreme_outlier_count)?;
                    writeln!(out, "  Avg Discrepancy:   {:.2}", metrics.avg_discrepancy)?;
                    writeln!(out, "  High Discrepancy:  {}", metrics.high_discrepancy_claims)?;
                    writeln!(out, "\nTop providers:")?;
                    for entry in &metrics.top_providers {
                        writeln!(out, "  {:<40} {:>6}", entry.name, entry.claim_count)?;
                    }
                    writeln!(out, "\nTop members:")?;
                    for entry in &metrics.top_members {
                        writeln!(out, "  {:<40} {:>6}", entry.name, entry.claim_count)?;
                    }
                }
            }
        }
    }

    out.flush()?;
    Ok(())
}
