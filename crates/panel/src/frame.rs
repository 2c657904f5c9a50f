//! Conversion between polars frames and typed panels.
//!
//! Floats are normalized on the way in: `NaN` and infinities become
//! undefined. Dates may be `Date` or `Datetime` columns and are truncated to
//! their month.

use std::collections::BTreeSet;

use chrono::Datelike;
use polars::prelude::*;
use portsort_primitives::{
    AccountingRecord, Date, EntityId, Exchange, FirmId, LinkRecord, Observation, Period, finite,
};
use serde::{Deserialize, Serialize};

use crate::{AccountingTable, JoinOutput, LinkTable, Panel, PanelError, TemporalJoin};

/// Days from 0001-01-01 to 1970-01-01, the polars `Date` epoch.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Column names of a monthly security panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelColumns {
    /// Security identifier (integer).
    pub entity: String,
    /// Month (date).
    pub period: String,
    /// Firm identifier, read when present.
    pub firm: String,
    /// Excess return, read when present.
    pub ret: String,
    /// Market capitalization, read when present.
    pub market_cap: String,
    /// Portfolio weight, read when present.
    pub weight: String,
    /// Listing exchange, read when present.
    pub exchange: String,
    /// Characteristic columns; each must exist.
    pub characteristics: Vec<String>,
}

impl Default for PanelColumns {
    fn default() -> Self {
        Self {
            entity: "permno".to_string(),
            period: "month".to_string(),
            firm: "gvkey".to_string(),
            ret: "ret_excess".to_string(),
            market_cap: "mktcap".to_string(),
            weight: "weight".to_string(),
            exchange: "exchange".to_string(),
            characteristics: Vec::new(),
        }
    }
}

impl PanelColumns {
    /// Add characteristic columns.
    #[must_use]
    pub fn with_characteristics<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.characteristics.extend(names.into_iter().map(Into::into));
        self
    }
}

/// Column names of an accounting table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountingColumns {
    /// Firm identifier.
    pub firm: String,
    /// Report (fiscal period end) date.
    pub report_date: String,
    /// Value columns; every other numeric column when empty.
    pub values: Vec<String>,
}

impl Default for AccountingColumns {
    fn default() -> Self {
        Self { firm: "gvkey".to_string(), report_date: "datadate".to_string(), values: Vec::new() }
    }
}

/// Column names of a link table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkColumns {
    /// Security identifier.
    pub entity: String,
    /// Firm identifier.
    pub firm: String,
    /// First valid date.
    pub valid_from: String,
    /// Last valid date; null means open-ended.
    pub valid_to: String,
}

impl Default for LinkColumns {
    fn default() -> Self {
        Self {
            entity: "permno".to_string(),
            firm: "gvkey".to_string(),
            valid_from: "linkdt".to_string(),
            valid_to: "linkenddt".to_string(),
        }
    }
}

/// Check that two firm identifier columns can be joined.
///
/// # Errors
/// Returns `PanelError::JoinKeyMismatch` if the dtypes differ, or
/// `PanelError::MissingColumn` if either column is absent.
pub fn check_key_types(
    left: &DataFrame,
    left_column: &str,
    right: &DataFrame,
    right_column: &str,
) -> Result<(), PanelError> {
    let left_type = require(left, left_column)?.dtype();
    let right_type = require(right, right_column)?.dtype();
    if left_type != right_type {
        return Err(PanelError::JoinKeyMismatch {
            column: left_column.to_string(),
            left: left_type.to_string(),
            right: right_type.to_string(),
        });
    }
    Ok(())
}

impl Panel {
    /// Build a panel from a frame.
    ///
    /// The market cap column, when present, is also exposed as a
    /// characteristic of the same name so it can be sorted on.
    ///
    /// # Errors
    /// Returns error if a required column is missing or mistyped, a key is
    /// null, or an entity appears twice in one month.
    pub fn from_frame(df: &DataFrame, columns: &PanelColumns) -> Result<Self, PanelError> {
        let entities = entity_values(df, &columns.entity)?;
        let periods = date_values(df, &columns.period)?;
        let firms = optional(df, &columns.firm, firm_values)?;
        let returns = optional(df, &columns.ret, float_values)?;
        let caps = optional(df, &columns.market_cap, float_values)?;
        let weights = optional(df, &columns.weight, float_values)?;
        let exchanges = optional(df, &columns.exchange, string_values)?;
        let characteristics = columns
            .characteristics
            .iter()
            .map(|name| Ok((name.as_str(), float_values(df, name)?)))
            .collect::<Result<Vec<_>, PanelError>>()?;

        let mut observations = Vec::with_capacity(df.height());
        for (row, (entity, date)) in entities.into_iter().zip(periods).enumerate() {
            let date = date.ok_or_else(|| null_key(&columns.period, row))?;
            let mut obs = Observation::new(entity, Period::containing(date));
            obs.firm = firms.as_ref().and_then(|v| v[row].clone());
            obs.ret = returns.as_ref().and_then(|v| v[row]);
            obs.market_cap = caps.as_ref().and_then(|v| v[row]);
            if caps.is_some() {
                obs.set_characteristic(columns.market_cap.as_str(), obs.market_cap);
            }
            obs.weight = weights.as_ref().and_then(|v| v[row]);
            obs.exchange = exchanges.as_ref().and_then(|v| v[row].clone()).map(Exchange::new);
            for (name, values) in &characteristics {
                obs.set_characteristic(*name, values[row]);
            }
            observations.push(obs);
        }

        Self::new(observations)
    }

    /// Convert to a frame with one column per characteristic.
    ///
    /// Every name in `columns.characteristics` gets a column, even when no
    /// row defines it. A characteristic named like the market cap column is
    /// folded into that column when it mirrors each row's market cap.
    ///
    /// # Errors
    /// Returns `PanelError::ColumnClash` if a characteristic shares its name
    /// with another panel column, or error if frame construction fails.
    pub fn to_frame(&self, columns: &PanelColumns) -> Result<DataFrame, PanelError> {
        let rows = self.observations();
        let names: BTreeSet<&str> = columns
            .characteristics
            .iter()
            .map(String::as_str)
            .chain(rows.iter().flat_map(|o| o.characteristics.keys().map(String::as_str)))
            .collect();
        let fixed = [
            &columns.entity,
            &columns.period,
            &columns.firm,
            &columns.ret,
            &columns.weight,
            &columns.exchange,
        ];

        let mut out = vec![
            Column::new(columns.entity.as_str().into(), rows.iter().map(|o| o.entity.0).collect::<Vec<_>>()),
            date_column(&columns.period, rows.iter().map(|o| o.period.first_day()))?,
            Column::new(
                columns.firm.as_str().into(),
                rows.iter().map(|o| o.firm.as_ref().map(FirmId::as_str)).collect::<Vec<_>>(),
            ),
            Column::new(columns.ret.as_str().into(), rows.iter().map(|o| o.ret).collect::<Vec<_>>()),
            Column::new(
                columns.market_cap.as_str().into(),
                rows.iter().map(|o| o.market_cap).collect::<Vec<_>>(),
            ),
            Column::new(columns.weight.as_str().into(), rows.iter().map(|o| o.weight).collect::<Vec<_>>()),
            Column::new(
                columns.exchange.as_str().into(),
                rows.iter().map(|o| o.exchange.as_ref().map(Exchange::as_str)).collect::<Vec<_>>(),
            ),
        ];
        for name in names {
            if name == columns.market_cap {
                if rows.iter().all(|o| o.characteristic(name).is_none_or(|v| o.market_cap == Some(v))) {
                    continue;
                }
                return Err(PanelError::ColumnClash(name.to_string()));
            }
            if fixed.iter().any(|column| column.as_str() == name) {
                return Err(PanelError::ColumnClash(name.to_string()));
            }
            out.push(Column::new(
                name.into(),
                rows.iter().map(|o| o.characteristic(name)).collect::<Vec<_>>(),
            ));
        }

        Ok(DataFrame::new(out)?)
    }
}

impl AccountingTable {
    /// Build an accounting table from a frame.
    ///
    /// # Errors
    /// Returns error if a column is missing or mistyped, or a key is null.
    pub fn from_frame(df: &DataFrame, columns: &AccountingColumns) -> Result<Self, PanelError> {
        let firms = firm_values(df, &columns.firm)?;
        let dates = date_values(df, &columns.report_date)?;

        let value_names: Vec<String> = if columns.values.is_empty() {
            df.get_columns()
                .iter()
                .filter(|c| is_numeric(c.dtype()))
                .map(|c| c.name().to_string())
                .filter(|name| *name != columns.firm && *name != columns.report_date)
                .collect()
        } else {
            columns.values.clone()
        };
        let values = value_names
            .iter()
            .map(|name| Ok((name.as_str(), float_values(df, name)?)))
            .collect::<Result<Vec<_>, PanelError>>()?;

        let mut records = Vec::with_capacity(df.height());
        for (row, (firm, date)) in firms.into_iter().zip(dates).enumerate() {
            let firm = firm.ok_or_else(|| null_key(&columns.firm, row))?;
            let date = date.ok_or_else(|| null_key(&columns.report_date, row))?;
            let mut record = AccountingRecord::new(firm, date);
            for (name, column) in &values {
                if let Some(value) = column[row] {
                    record.values.insert((*name).to_string(), value);
                }
            }
            records.push(record);
        }

        Ok(Self::new(records))
    }
}

impl LinkTable {
    /// Build a link table from a frame.
    ///
    /// # Errors
    /// Returns error if a column is missing or mistyped, or a key is null.
    pub fn from_frame(df: &DataFrame, columns: &LinkColumns) -> Result<Self, PanelError> {
        let entities = entity_values(df, &columns.entity)?;
        let firms = firm_values(df, &columns.firm)?;
        let from = date_values(df, &columns.valid_from)?;
        let to = optional(df, &columns.valid_to, date_values)?;

        let mut links = Vec::with_capacity(df.height());
        for (row, ((entity, firm), valid_from)) in entities.into_iter().zip(firms).zip(from).enumerate() {
            let firm = firm.ok_or_else(|| null_key(&columns.firm, row))?;
            let valid_from = valid_from.ok_or_else(|| null_key(&columns.valid_from, row))?;
            let valid_to = to.as_ref().and_then(|v| v[row]);
            links.push(LinkRecord::new(entity, firm, valid_from, valid_to));
        }

        Ok(Self::new(links))
    }
}

impl TemporalJoin {
    /// Join frames after checking that their firm keys are compatible.
    ///
    /// The panel's firm column is compared with the accounting firm column,
    /// or the link table's firm column when links are given.
    ///
    /// # Errors
    /// Returns `PanelError::JoinKeyMismatch` if the firm identifier types
    /// differ, or any ingestion error.
    pub fn join_frames(
        &self,
        panel: (&DataFrame, &PanelColumns),
        accounting: (&DataFrame, &AccountingColumns),
        links: Option<(&DataFrame, &LinkColumns)>,
    ) -> Result<JoinOutput, PanelError> {
        let (panel_df, panel_columns) = panel;
        let (accounting_df, accounting_columns) = accounting;

        let link_table = match links {
            Some((link_df, link_columns)) => {
                check_key_types(link_df, &link_columns.firm, accounting_df, &accounting_columns.firm)?;
                Some(LinkTable::from_frame(link_df, link_columns)?)
            }
            None => {
                check_key_types(panel_df, &panel_columns.firm, accounting_df, &accounting_columns.firm)?;
                None
            }
        };

        let panel = Panel::from_frame(panel_df, panel_columns)?;
        let accounting = AccountingTable::from_frame(accounting_df, accounting_columns)?;
        Ok(self.join(&panel, &accounting, link_table.as_ref()))
    }
}

fn require<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Column, PanelError> {
    df.column(name).map_err(|_| PanelError::MissingColumn(name.to_string()))
}

fn null_key(column: &str, row: usize) -> PanelError {
    PanelError::NullKey { column: column.to_string(), row }
}

fn column_type(column: &str, expected: &str, actual: &DataType) -> PanelError {
    PanelError::ColumnType {
        column: column.to_string(),
        expected: expected.to_string(),
        actual: actual.to_string(),
    }
}

/// Read a column only when the frame has it.
fn optional<T>(
    df: &DataFrame,
    name: &str,
    read: fn(&DataFrame, &str) -> Result<Vec<T>, PanelError>,
) -> Result<Option<Vec<T>>, PanelError> {
    if df.get_column_names().iter().any(|c| c.as_str() == name) {
        read(df, name).map(Some)
    } else {
        Ok(None)
    }
}

const fn is_integer(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
    )
}

const fn is_numeric(dtype: &DataType) -> bool {
    is_integer(dtype) || matches!(dtype, DataType::Float32 | DataType::Float64)
}

fn entity_values(df: &DataFrame, name: &str) -> Result<Vec<EntityId>, PanelError> {
    let column = require(df, name)?;
    if !is_integer(column.dtype()) {
        return Err(column_type(name, "integer", column.dtype()));
    }
    let ids = column.cast(&DataType::Int64)?;
    ids.i64()?
        .into_iter()
        .enumerate()
        .map(|(row, id)| id.map(EntityId::new).ok_or_else(|| null_key(name, row)))
        .collect()
}

fn firm_values(df: &DataFrame, name: &str) -> Result<Vec<Option<FirmId>>, PanelError> {
    let column = require(df, name)?;
    match column.dtype() {
        DataType::String => Ok(column.str()?.into_iter().map(|v| v.map(FirmId::from)).collect()),
        dtype if is_integer(dtype) => {
            let ids = column.cast(&DataType::Int64)?;
            Ok(ids.i64()?.into_iter().map(|v| v.map(|id| FirmId::new(id.to_string()))).collect())
        }
        other => Err(column_type(name, "string or integer", other)),
    }
}

fn float_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>, PanelError> {
    let column = require(df, name)?;
    if !is_numeric(column.dtype()) {
        return Err(column_type(name, "numeric", column.dtype()));
    }
    let values = column.cast(&DataType::Float64)?;
    Ok(values.f64()?.into_iter().map(|v| v.and_then(finite)).collect())
}

fn string_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>, PanelError> {
    let values = require(df, name)?.cast(&DataType::String)?;
    Ok(values.str()?.into_iter().map(|v| v.map(str::to_string)).collect())
}

fn date_values(df: &DataFrame, name: &str) -> Result<Vec<Option<Date>>, PanelError> {
    let column = require(df, name)?;
    let dates = match column.dtype() {
        DataType::Date => column.clone(),
        DataType::Datetime(_, _) => column.cast(&DataType::Date)?,
        other => return Err(column_type(name, "date", other)),
    };
    let days = dates.cast(&DataType::Int32)?;
    Ok(days
        .i32()?
        .into_iter()
        .map(|d| d.and_then(|d| Date::from_num_days_from_ce_opt(d + UNIX_EPOCH_DAYS_FROM_CE)))
        .collect())
}

/// Build a polars `Date` column from calendar dates.
///
/// # Errors
/// Returns error if the cast to `Date` fails.
pub fn date_column(
    name: &str,
    dates: impl Iterator<Item = Date>,
) -> Result<Column, PanelError> {
    let days: Vec<i32> = dates.map(|d| d.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE).collect();
    Ok(Column::new(name.into(), days).cast(&DataType::Date)?)
}
