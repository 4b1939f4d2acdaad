use crate::columns::{PLAYER, PLAYER_ID, PLAYER_KEY, TEAM};
use crate::{Error, Result, missing_columns};
use polars::prelude::*;

/// Per-player counts for one stream.
///
/// The frame always has the columns `playerId, player, team, <column>`,
/// including when no player made a progressive action in the stream.
#[derive(Debug, Clone)]
pub struct PlayerCounts {
    pub frame: DataFrame,
    pub column: &'static str,
}

impl PlayerCounts {
    /// Zero-row counts whose key dtypes follow `source` where it has them.
    pub fn empty(column: &'static str, source: &Schema) -> Result<Self> {
        let key_dtype = |name: &str, fallback: DataType| {
            source.get(name).cloned().unwrap_or(fallback)
        };

        let frame = DataFrame::new(vec![
            Series::new_empty(PLAYER_ID, &key_dtype(PLAYER_ID, DataType::Int64)),
            Series::new_empty(PLAYER, &key_dtype(PLAYER, DataType::String)),
            Series::new_empty(TEAM, &key_dtype(TEAM, DataType::String)),
            Series::new_empty(column, &DataType::Int64),
        ])?;

        Ok(Self { frame, column })
    }

    pub fn players(&self) -> usize {
        self.frame.height()
    }
}

pub fn key_exprs() -> Vec<Expr> {
    PLAYER_KEY.iter().map(|c| col(c)).collect()
}

/// Counts rows per (`playerId`, `player`, `team`), in first-seen order.
pub fn count_per_player(classified: &DataFrame, column: &'static str) -> Result<PlayerCounts> {
    if classified.height() == 0 {
        return PlayerCounts::empty(column, &classified.schema());
    }

    if let Some(missing) = missing_columns(classified, &PLAYER_KEY).first() {
        return Err(Error::MissingColumn(missing.to_string()));
    }

    let frame = classified
        .clone()
        .lazy()
        .group_by_stable(key_exprs())
        .agg([len().cast(DataType::Int64).alias(column)])
        .collect()?;

    Ok(PlayerCounts { frame, column })
}
