//! Example: Size and value sorts on a simulated market
//!
//! This example walks through the full portsort workflow:
//! 1. Simulating a monthly security panel and annual accounting reports
//! 2. Joining book equity point-in-time through a link table
//! 3. Holding June size and December book-to-market for each July-June year
//! 4. Forming 2x3 size/book-to-market portfolios with NYSE breakpoints
//! 5. Building SMB and HML and testing their means
//! 6. Running Fama-MacBeth regressions of next month's return on beta and size
//!
//! Run with: `cargo run --example synthetic_pipeline --features full`

use chrono::NaiveDate;
use portsort::{
    model::{Pipeline, PipelineConfig, SeriesSummary, SpreadAxis, SpreadSpec},
    panel::{AccountingTable, LinkTable, Panel, RebalanceCycle, SnapshotRule, TemporalJoin, lead_returns},
    primitives::{AccountingRecord, Bucket, EntityId, LinkRecord, Observation, Period},
    sorts::{BreakpointSpec, SortMode},
};
use rand::Rng;
use rand_distr::{Distribution, LogNormal, Normal};

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Number of simulated securities.
const STOCKS: i64 = 300;

/// First simulated month.
const START_YEAR: i32 = 2010;

/// Number of simulated months.
const MONTHS: i32 = 120;

// ============================================================================
// MAIN ENTRY POINT
// ============================================================================

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("\n{}", "=".repeat(80));
    println!("PORTSORT: SIZE AND VALUE ON A SIMULATED MARKET");
    println!("{}", "=".repeat(80));

    let market = simulate();
    println!(
        "\nSimulated {} security-months and {} annual reports",
        market.panel.len(),
        market.accounting.len()
    );

    let config = PipelineConfig {
        primary: "size".to_string(),
        secondary: Some("bm".to_string()),
        breakpoints: BreakpointSpec::Groups(2),
        secondary_breakpoints: Some(BreakpointSpec::terciles_30_70()),
        sort_mode: SortMode::Independent,
        characteristics: vec!["beta".to_string(), "log_mktcap".to_string()],
        ..PipelineConfig::default()
    };
    let pipeline = Pipeline::new(config)?;

    // Book-to-market needs the joined book equity, so join once up front
    let join = TemporalJoin::new(pipeline.config().join_config())?;
    let joined = join.join(&market.panel, &market.accounting, Some(&market.links));
    let with_bm = sorting_variables(&joined.panel)?;
    let run = pipeline.portfolios(&with_bm, &market.accounting, Some(&market.links));

    println!(
        "\n{} assignments into {} portfolios, {} exclusions",
        run.sort.assignments.len(),
        run.sort.keys().len(),
        run.sort.exclusions.len()
    );

    let smb = SpreadSpec::new("SMB", SpreadAxis::Primary, b(1), b(2));
    let hml = SpreadSpec::new("HML", SpreadAxis::Secondary, b(3), b(1));
    println!("\n{:<8} {:>10} {:>8} {:>8} {:>8}", "Factor", "Mean %", "t", "NW t", "Months");
    println!("{:-<8} {:->10} {:->8} {:->8} {:->8}", "", "", "", "", "");
    for spec in [smb, hml] {
        let values: Vec<f64> = spec.returns(&run.returns).iter().map(|s| s.ret).collect();
        let summary = SeriesSummary::compute(&values, &pipeline.config().newey_west())?;
        println!(
            "{:<8} {:>10.3} {:>8} {:>8} {:>8}",
            spec.name,
            summary.mean * 100.0,
            t_statistic(summary.naive_t_statistic),
            t_statistic(summary.robust_t_statistic),
            summary.periods
        );
    }

    let lead = lead_returns(&with_bm, "ret_lead");
    let premia = pipeline.risk_premia(&lead)?;
    println!("\nFAMA-MACBETH RISK PREMIA\n{}", premia.summary_frame()?);
    println!("{} month(s) omitted", premia.omitted().len());

    Ok(())
}

// ============================================================================
// SIMULATION
// ============================================================================

struct Market {
    panel: Panel,
    accounting: AccountingTable,
    links: LinkTable,
}

fn b(n: u16) -> Bucket {
    Bucket::from_index(n - 1)
}

fn simulate() -> Market {
    let mut rng = rand::thread_rng();
    let initial_cap = LogNormal::new(6.0, 1.5).expect("valid lognormal");
    let shock: Normal<f64> = Normal::new(0.0, 0.06).expect("valid normal");
    let book_noise: Normal<f64> = Normal::new(0.0, 0.3).expect("valid normal");

    let mut rows = Vec::new();
    let mut reports = Vec::new();
    let mut links = Vec::new();

    for stock in 1..=STOCKS {
        let firm = format!("{:06}", 1000 + stock);
        let exchange = if stock % 4 == 0 { "NASDAQ" } else { "NYSE" };
        let beta: f64 = rng.gen_range(0.4..1.8);
        let mut cap: f64 = initial_cap.sample(&mut rng);

        links.push(LinkRecord::new(EntityId::new(stock), firm.as_str(), date(START_YEAR - 1, 1, 1), None));

        for month in 0..MONTHS {
            let period = Period::new(START_YEAR + month / 12, (month % 12) as u32 + 1)
                .expect("simulated months are valid");
            let ret = 0.004 + 0.003 * beta - 0.0004 * cap.ln() + shock.sample(&mut rng);
            cap *= 1.0 + ret;

            rows.push(
                Observation::new(EntityId::new(stock), period)
                    .with_return(ret)
                    .with_market_cap(cap)
                    .with_exchange(exchange)
                    .with_characteristic("mktcap", cap)
                    .with_characteristic("log_mktcap", cap.ln())
                    .with_characteristic("beta", beta),
            );

            if period.month() == 12 {
                let be = cap * (0.7_f64 + book_noise.sample(&mut rng)).exp() * 0.5;
                reports.push(AccountingRecord::new(firm.as_str(), period.last_day()).with_value("be", be));
            }
        }
    }

    Market {
        panel: Panel::new(rows).expect("one row per stock-month"),
        accounting: AccountingTable::new(reports),
        links: LinkTable::new(links),
    }
}

/// June size, and book equity over the prior December's market cap, both
/// fixed from July through the next June.
///
/// December reports enter in July, so the joined book equity already changes
/// only at the start of each holding year.
fn sorting_variables(panel: &Panel) -> Result<Panel, Box<dyn std::error::Error>> {
    let cycle = RebalanceCycle::new(6)?;
    let panel = cycle.hold(panel, "mktcap", "size", SnapshotRule::at_formation(6))?;
    let panel = cycle.hold(&panel, "mktcap", "me_dec", SnapshotRule::prior_year(12))?;
    let rows = panel
        .into_observations()
        .into_iter()
        .map(|mut obs| {
            let bm = obs.characteristic("be").zip(obs.characteristic("me_dec")).map(|(be, me)| be / me);
            obs.set_characteristic("bm", bm);
            obs
        })
        .collect();
    Ok(Panel::new(rows)?)
}

fn t_statistic(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |t| format!("{t:.2}"))
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}
