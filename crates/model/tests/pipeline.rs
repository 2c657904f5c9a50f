//! End-to-end runs over a small synthetic market.

use approx::assert_relative_eq;
use portsort_model::{
    FamaMacBeth, FamaMacBethConfig, INTERCEPT, OmissionReason, PeriodOutcome, Pipeline,
    PipelineConfig, SpreadAxis, SpreadSpec, portfolio_returns_frame,
};
use portsort_panel::{
    AccountingTable, Panel, PanelColumns, RebalanceCycle, SnapshotRule, date_column, lead_returns,
};
use portsort_primitives::{
    AccountingRecord, Bucket, Date, EntityId, Observation, Period, PortfolioKey,
};
use portsort_sorts::{BreakpointSpec, SortMode};

const STOCKS: i64 = 6;

fn date(y: i32, m: u32, d: u32) -> Date {
    Date::from_ymd_opt(y, m, d).unwrap()
}

fn b(n: u16) -> Bucket {
    Bucket::new(n).unwrap()
}

/// Monthly return of stock `i` in the `m`-th month of the sample.
fn ret(i: i64, m: u32) -> f64 {
    0.01 * i as f64 + 0.001 * f64::from(m)
}

/// Returns whose cross-sectional ranking drifts over time.
fn shocked(i: i64, m: u32) -> f64 {
    let drift = if i % 2 == 0 { 0.003 } else { -0.002 };
    ret(i, m) + drift * f64::from(m)
}

/// Six NYSE stocks, June to September 2021, capitalization `10 * i`.
fn market() -> Panel {
    let mut rows = Vec::new();
    for m in 0..4 {
        let period = Period::new(2021, 6 + m).unwrap();
        for i in 1..=STOCKS {
            let cap = 10.0 * i as f64;
            rows.push(
                Observation::new(EntityId::new(i), period)
                    .with_firm(format!("F{i}"))
                    .with_return(ret(i, m))
                    .with_market_cap(cap)
                    .with_exchange("NYSE")
                    .with_characteristic("mktcap", cap),
            );
        }
    }
    Panel::new(rows).unwrap()
}

/// Like [`market`], but sizes reverse after June.
fn drifting_market() -> Panel {
    let rows = market()
        .into_observations()
        .into_iter()
        .map(|obs| {
            let i = obs.entity.0;
            let cap = if obs.period.month() == 6 { 10.0 * i as f64 } else { 10.0 * (7 - i) as f64 };
            obs.with_market_cap(cap).with_characteristic("mktcap", cap)
        })
        .collect();
    Panel::new(rows).unwrap()
}

/// June market cap held from July through the following June.
fn held(panel: &Panel) -> Panel {
    RebalanceCycle::default().hold(panel, "mktcap", "size", SnapshotRule::at_formation(6)).unwrap()
}

/// Fiscal 2020 book equity, falling with size.
fn accounting() -> AccountingTable {
    AccountingTable::new(
        (1..=STOCKS)
            .map(|i| {
                AccountingRecord::new(format!("F{i}"), date(2020, 12, 31))
                    .with_value("be", (7 - i) as f64)
            })
            .collect(),
    )
}

fn config() -> PipelineConfig {
    PipelineConfig {
        primary: "size".to_string(),
        secondary: Some("be".to_string()),
        breakpoints: BreakpointSpec::Groups(2),
        sort_mode: SortMode::Independent,
        characteristics: vec!["beta".to_string()],
        ..PipelineConfig::default()
    }
}

#[test]
fn accounting_is_sorted_on_only_after_the_lag() {
    let pipeline = Pipeline::new(config()).unwrap();
    let run = pipeline.portfolios(&held(&market()), &accounting(), None);

    assert_eq!(run.join.unmatched, 0);
    assert!(run.join.issues.is_empty());

    // December reports become usable in July, and June 2021 closes a cycle
    // whose size snapshot predates the sample
    let june = Period::new(2021, 6).unwrap();
    let june_exclusions: Vec<_> = run.sort.exclusions.iter().filter(|e| e.period == june).collect();
    assert_eq!(june_exclusions.len(), 2 * STOCKS as usize);
    assert!(june_exclusions.iter().all(|e| e.value.is_none()));
    assert_eq!(june_exclusions.iter().filter(|e| e.variable == "be").count(), STOCKS as usize);
    assert!(run.sort.assignments.iter().all(|a| a.period > june));

    let keys = run.sort.keys();
    assert_eq!(keys.len(), 2);
    assert!(keys.contains(&PortfolioKey::pair(b(1), b(2))));
    assert!(keys.contains(&PortfolioKey::pair(b(2), b(1))));
}

#[test]
fn value_weighted_returns_use_last_months_caps() {
    let pipeline = Pipeline::new(config()).unwrap();
    let run = pipeline.portfolios(&held(&market()), &accounting(), None);

    assert_eq!(run.returns.len(), 6);
    let july = Period::new(2021, 7).unwrap();
    let small = run
        .returns
        .iter()
        .find(|r| r.period == july && r.key == PortfolioKey::pair(b(1), b(2)))
        .unwrap();

    // June caps 10, 20, 30; July returns 0.011, 0.021, 0.031
    assert_relative_eq!(small.ret, 1.4 / 60.0 + 0.001, epsilon = 1e-12);
    assert_relative_eq!(small.total_weight, 60.0);
    assert_eq!(small.constituents, 3);

    let smb = SpreadSpec::new("SMB", SpreadAxis::Primary, b(1), b(2)).returns(&run.returns);
    assert_eq!(smb.len(), 3);
    // Big: (40 * 0.041 + 50 * 0.051 + 60 * 0.061) / 150
    assert_relative_eq!(smb[0].ret, 1.4 / 60.0 - 7.7 / 150.0, epsilon = 1e-12);

    let frame = portfolio_returns_frame(&run.returns).unwrap();
    assert_eq!(frame.height(), 6);
}

#[test]
fn sort_keys_are_fixed_within_a_rebalancing_year() {
    let panel = held(&drifting_market());
    let run = Pipeline::new(config()).unwrap().portfolios(&panel, &accounting(), None);

    for i in 1..=STOCKS {
        let keys: Vec<PortfolioKey> =
            run.sort.assignments.iter().filter(|a| a.entity.0 == i).map(|a| a.key).collect();
        assert_eq!(keys.len(), 3, "entity {i}");
        assert!(keys.windows(2).all(|w| w[0] == w[1]), "entity {i} changed portfolio: {keys:?}");
    }

    // Same-month capitalization would move the smallest June stock to the big half
    let september = Period::new(2021, 9).unwrap();
    let primary_in_september = |config: PipelineConfig| {
        let run = Pipeline::new(config).unwrap().portfolios(&panel, &accounting(), None);
        run.sort
            .assignments
            .iter()
            .find(|a| a.entity.0 == 1 && a.period == september)
            .map(|a| a.key.primary)
    };
    assert_eq!(primary_in_september(config()), Some(b(1)));
    let unheld = PipelineConfig { primary: "mktcap".to_string(), ..config() };
    assert_eq!(primary_in_september(unheld), Some(b(2)));
}

#[test]
fn default_pipeline_sorts_frames_on_market_cap() {
    let months = [Date::from_ymd_opt(2021, 6, 30).unwrap(), Date::from_ymd_opt(2021, 7, 31).unwrap()];
    let entities: Vec<i64> = months.iter().flat_map(|_| 1..=STOCKS).collect();
    let caps: Vec<f64> = entities.iter().map(|i| 10.0 * *i as f64).collect();
    let returns: Vec<f64> = entities.iter().map(|i| ret(*i, 1)).collect();
    let exchanges: Vec<&str> = entities.iter().map(|_| "NYSE").collect();
    let mut df = polars::df! {
        "permno" => &entities,
        "ret_excess" => &returns,
        "mktcap" => &caps,
        "exchange" => &exchanges,
    }
    .unwrap();
    let dates = months.iter().flat_map(|d| std::iter::repeat_n(*d, STOCKS as usize));
    df.with_column(date_column("month", dates).unwrap()).unwrap();

    let panel = Panel::from_frame(&df, &PanelColumns::default()).unwrap();
    let pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
    let run = pipeline.portfolios(&panel, &AccountingTable::new(Vec::new()), None);

    assert!(run.sort.exclusions.is_empty());
    assert!(run.sort.skipped.is_empty());
    assert_eq!(run.sort.assignments.len(), 2 * STOCKS as usize);
    assert!(run.sort.keys().len() > 1);
}

#[test]
fn fama_macbeth_recovers_unit_slope() {
    // The characteristic equals next month's return exactly
    let mut rows = Vec::new();
    for m in 0..4 {
        let period = Period::new(2021, 6 + m).unwrap();
        for i in 1..=STOCKS {
            let mut obs = Observation::new(EntityId::new(i), period).with_return(shocked(i, m));
            if m < 3 {
                obs.set_characteristic("beta", Some(shocked(i, m + 1)));
            }
            rows.push(obs);
        }
    }
    let panel = lead_returns(&Panel::new(rows).unwrap(), "ret_lead");

    let output = Pipeline::new(config()).unwrap().risk_premia(&panel).unwrap();

    assert_eq!(output.summary[0].term, INTERCEPT);
    assert_relative_eq!(output.summary[0].summary.mean, 0.0, epsilon = 1e-10);
    assert_relative_eq!(output.summary[1].summary.mean, 1.0, epsilon = 1e-10);
    assert_eq!(output.summary[1].summary.periods, 3);

    let september = Period::new(2021, 9).unwrap();
    assert_eq!(
        output.outcomes[&september],
        PeriodOutcome::Omitted(OmissionReason::TooFewObservations { required: 3, actual: 0 })
    );
}

#[test]
fn panel_estimator_reads_frames() {
    use portsort_model::prelude::PanelEstimator;
    use portsort_panel::PanelColumns;
    use polars::prelude::IntoLazy;

    let mut rows = Vec::new();
    for m in 1..=3 {
        let period = Period::new(2022, m).unwrap();
        for i in 1..=STOCKS {
            let beta = 0.2 * i as f64 + 0.01 * f64::from(m);
            rows.push(
                Observation::new(EntityId::new(i), period)
                    .with_characteristic("beta", beta)
                    .with_characteristic("ret_lead", 0.01 + 2.0 * beta),
            );
        }
    }
    let columns = PanelColumns::default().with_characteristics(["beta", "ret_lead"]);
    let frame = Panel::new(rows).unwrap().to_frame(&columns).unwrap();

    let runner = FamaMacBeth::new(FamaMacBethConfig::new("ret_lead", ["beta"])).unwrap();
    let (premia, summary) = runner.estimate(frame.lazy()).unwrap();

    assert_eq!(premia.height(), 6);
    assert_eq!(summary.height(), 2);
    let means = summary.column("mean").unwrap().f64().unwrap();
    assert_relative_eq!(means.get(0).unwrap(), 0.01, epsilon = 1e-10);
    assert_relative_eq!(means.get(1).unwrap(), 2.0, epsilon = 1e-10);
}
