use crate::columns::{
    NINETIES, PLAYER, PLAYER_ID, POSITION, PROG_ACT_HS_P90, PROG_HS_ACTIONS, PROG_LHS_ACTIONS,
    PROG_LHS_ACT_P90, PROG_LHS_CARRIES, PROG_LHS_PASSES, PROG_RHS_ACTIONS, PROG_RHS_ACT_P90,
    PROG_RHS_CARRIES, PROG_RHS_PASSES, TEAM,
};
use crate::{Error, Result};
use csv::Writer;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::path::Path;

/// One output row, keyed by (`playerId`, `player`, `team`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerAggregate {
    #[serde(rename = "playerId")]
    pub player_id: Option<i64>,
    pub player: String,
    pub team: String,
    pub prog_rhs_passes: i64,
    pub prog_lhs_passes: i64,
    pub prog_rhs_carries: i64,
    pub prog_lhs_carries: i64,
    pub prog_rhs_actions: i64,
    pub prog_lhs_actions: i64,
    #[serde(rename = "prog_HS_actions")]
    pub prog_hs_actions: i64,
    #[serde(rename = "90s")]
    pub nineties: Option<f64>,
    pub position: Option<String>,
    #[serde(rename = "prog_act_HS_p90")]
    pub prog_act_hs_p90: f64,
    pub prog_rhs_act_p90: f64,
    pub prog_lhs_act_p90: f64,
}

impl PlayerAggregate {
    pub fn from_frame(df: &DataFrame) -> Result<Vec<Self>> {
        let column = |name: &str, dtype: DataType| -> Result<Series> {
            Ok(df.column(name)?.cast(&dtype)?)
        };

        let player_id = column(PLAYER_ID, DataType::Int64)?;
        let player = column(PLAYER, DataType::String)?;
        let team = column(TEAM, DataType::String)?;
        let position = column(POSITION, DataType::String)?;
        let nineties = column(NINETIES, DataType::Float64)?;

        let counts = [
            PROG_RHS_PASSES,
            PROG_LHS_PASSES,
            PROG_RHS_CARRIES,
            PROG_LHS_CARRIES,
            PROG_RHS_ACTIONS,
            PROG_LHS_ACTIONS,
            PROG_HS_ACTIONS,
        ]
        .into_iter()
        .map(|name| column(name, DataType::Int64))
        .collect::<Result<Vec<_>>>()?;

        let rates = [PROG_ACT_HS_P90, PROG_RHS_ACT_P90, PROG_LHS_ACT_P90]
            .into_iter()
            .map(|name| column(name, DataType::Float64))
            .collect::<Result<Vec<_>>>()?;

        let player_id = player_id.i64()?;
        let player = player.str()?;
        let team = team.str()?;
        let position = position.str()?;
        let nineties = nineties.f64()?;
        let counts = counts
            .iter()
            .map(|s| s.i64())
            .collect::<PolarsResult<Vec<_>>>()?;
        let rates = rates
            .iter()
            .map(|s| s.f64())
            .collect::<PolarsResult<Vec<_>>>()?;

        let count = |i: usize, row: usize| counts[i].get(row).unwrap_or_default();
        let rate = |i: usize, row: usize| rates[i].get(row).unwrap_or_default();

        let rows = (0..df.height())
            .map(|row| PlayerAggregate {
                player_id: player_id.get(row),
                player: player.get(row).unwrap_or_default().to_string(),
                team: team.get(row).unwrap_or_default().to_string(),
                prog_rhs_passes: count(0, row),
                prog_lhs_passes: count(1, row),
                prog_rhs_carries: count(2, row),
                prog_lhs_carries: count(3, row),
                prog_rhs_actions: count(4, row),
                prog_lhs_actions: count(5, row),
                prog_hs_actions: count(6, row),
                nineties: nineties.get(row),
                position: position.get(row).map(str::to_string),
                prog_act_hs_p90: rate(0, row),
                prog_rhs_act_p90: rate(1, row),
                prog_lhs_act_p90: rate(2, row),
            })
            .collect();

        Ok(rows)
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

pub fn write_csv(rows: &[PlayerAggregate], path: &Path) -> Result<()> {
    ensure_parent(path)?;

    let mut writer = Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_parquet(table: &mut DataFrame, path: &Path) -> Result<()> {
    ensure_parent(path)?;

    let mut file = File::create(path)?;
    ParquetWriter::new(&mut file).finish(table)?;
    Ok(())
}

/// Writes the aggregate table as CSV or parquet, chosen by extension.
pub fn write_output(table: &mut DataFrame, path: &Path) -> Result<()> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("csv") => write_csv(&PlayerAggregate::from_frame(table)?, path),
        Some("parquet") => write_parquet(table, path),
        _ => Err(Error::Config(format!(
            "Unsupported output '{}'. Supported extensions: csv, parquet.",
            path.display()
        ))),
    }
}

/// Top `top` players by progressive half-space actions per 90.
pub fn leaderboard(table: &DataFrame, top: usize) -> Result<DataFrame> {
    let board = table
        .clone()
        .lazy()
        .sort(
            PROG_ACT_HS_P90,
            SortOptions {
                descending: true,
                nulls_last: true,
                maintain_order: true,
                ..Default::default()
            },
        )
        .limit(top.try_into().unwrap_or(u32::MAX))
        .select([
            col(PLAYER),
            col(TEAM),
            col(POSITION),
            col(NINETIES),
            col(PROG_RHS_ACTIONS),
            col(PROG_LHS_ACTIONS),
            col(PROG_HS_ACTIONS),
            col(PROG_ACT_HS_P90),
        ])
        .collect()?;
    Ok(board)
}
