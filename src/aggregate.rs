use crate::columns::{MINUTES_KEY, NINETIES, OUTPUT_COLUMNS, PLAYER_ID, POSITION};
use crate::combine::combine;
use crate::config::ProgressionConfig;
use crate::grouping::count_per_player;
use crate::halfspace::{ActionKind, Stream, route};
use crate::minutes::{MinutesTable, enrich, prepare_minutes, with_rates, without_minutes};
use crate::progressive::classify_progressive;
use crate::Result;
use polars::prelude::*;
use std::fmt;
use tracing::{error, info, warn};

/// Result of one aggregation run.
#[derive(Debug, Clone)]
pub enum AggregateOutcome {
    /// One row per player with counts, minutes and per-90 rates.
    Complete(DataFrame),
    /// The minutes join failed; counts are present, `90s`/`position` are
    /// null and every rate is zero.
    Partial { table: DataFrame, cause: String },
    /// Nothing to report.
    Empty(EmptyReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmptyReason {
    NoEvents,
    NoMinutes,
    MinutesMissingPlaytime,
    MinutesMissingKeys(Vec<String>),
    NoPlayers,
    InputConversion(String),
}

impl fmt::Display for EmptyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmptyReason::NoEvents => write!(f, "passes and carries are both empty"),
            EmptyReason::NoMinutes => write!(f, "minutes table is empty"),
            EmptyReason::MinutesMissingPlaytime => {
                write!(f, "minutes table has neither '90s' nor 'Mins'")
            }
            EmptyReason::MinutesMissingKeys(keys) => {
                write!(f, "minutes table is missing {}", keys.join(", "))
            }
            EmptyReason::NoPlayers => write!(f, "no player made a progressive half-space action"),
            EmptyReason::InputConversion(cause) => write!(f, "inputs could not be read: {}", cause),
        }
    }
}

impl AggregateOutcome {
    pub fn table(&self) -> Option<&DataFrame> {
        match self {
            AggregateOutcome::Complete(table) => Some(table),
            AggregateOutcome::Partial { table, .. } => Some(table),
            AggregateOutcome::Empty(_) => None,
        }
    }

    /// The output table; a zero-row frame with the output schema when empty.
    pub fn into_frame(self) -> Result<DataFrame> {
        match self {
            AggregateOutcome::Complete(table) => Ok(table),
            AggregateOutcome::Partial { table, .. } => Ok(table),
            AggregateOutcome::Empty(_) => empty_output(),
        }
    }
}

/// Zero-row frame with the output columns.
pub fn empty_output() -> Result<DataFrame> {
    let columns: Vec<Series> = OUTPUT_COLUMNS
        .iter()
        .map(|name| Series::new_empty(name, &output_dtype(name)))
        .collect();
    Ok(DataFrame::new(columns)?)
}

fn output_dtype(name: &str) -> DataType {
    match name {
        PLAYER_ID => DataType::Int64,
        NINETIES => DataType::Float64,
        POSITION => DataType::String,
        n if n.ends_with("_p90") => DataType::Float64,
        n if n.starts_with("prog_") => DataType::Int64,
        _ => DataType::String,
    }
}

/// Computes per-player progressive half-space actions and per-90 rates.
///
/// Never fails: unusable inputs give [`AggregateOutcome::Empty`] and a
/// failed minutes join gives [`AggregateOutcome::Partial`].
pub fn aggregate(
    passes: &DataFrame,
    carries: &DataFrame,
    minutes: &DataFrame,
    config: &ProgressionConfig,
) -> AggregateOutcome {
    match try_aggregate(passes, carries, minutes, config) {
        Ok(outcome) => outcome,
        Err(err) => {
            error!(stage = "aggregate", error = %err, "Aggregation failed");
            AggregateOutcome::Empty(EmptyReason::InputConversion(err.to_string()))
        }
    }
}

fn try_aggregate(
    passes: &DataFrame,
    carries: &DataFrame,
    minutes: &DataFrame,
    config: &ProgressionConfig,
) -> Result<AggregateOutcome> {
    info!(
        stage = "start",
        passes = passes.height(),
        carries = carries.height(),
        minutes = minutes.height(),
        "Aggregating progressive half-space actions"
    );

    if passes.height() == 0 && carries.height() == 0 {
        warn!(stage = "start", "Passes and carries are both empty");
        return Ok(AggregateOutcome::Empty(EmptyReason::NoEvents));
    }

    let minutes = match prepare_minutes(minutes)? {
        MinutesTable::Ready(prepared) => prepared,
        MinutesTable::Empty => {
            warn!(stage = "minutes", "Minutes table is empty");
            return Ok(AggregateOutcome::Empty(EmptyReason::NoMinutes));
        }
        MinutesTable::MissingPlaytime => {
            error!(stage = "minutes", "Minutes table has neither '90s' nor 'Mins'");
            return Ok(AggregateOutcome::Empty(EmptyReason::MinutesMissingPlaytime));
        }
        MinutesTable::MissingKeys(keys) => {
            error!(stage = "minutes", missing = ?keys, "Minutes table lacks join keys");
            return Ok(AggregateOutcome::Empty(EmptyReason::MinutesMissingKeys(keys)));
        }
    };

    let mut counts = Vec::with_capacity(Stream::ALL.len());
    for stream in Stream::ALL {
        let events = match stream.kind {
            ActionKind::Pass => passes,
            ActionKind::Carry => carries,
        };
        let routed = route(events, stream.side)?;
        let progressive = classify_progressive(&routed, config)?;
        let grouped = count_per_player(&progressive, stream.count_column())?;
        info!(
            stage = "group",
            stream = %stream,
            routed = routed.height(),
            progressive = progressive.height(),
            players = grouped.players(),
            "Grouped progressive actions"
        );
        counts.push(grouped);
    }

    let Some(combined) = combine(&counts)? else {
        warn!(stage = "combine", "No players found after grouping");
        return Ok(AggregateOutcome::Empty(EmptyReason::NoPlayers));
    };

    let enriched = match enrich(combined.clone(), &minutes) {
        Ok(enriched) => enriched,
        Err(err) => {
            error!(stage = "minutes", error = %err, "Minutes join failed, returning counts only");
            let table = finish(without_minutes(combined)?)?;
            return Ok(AggregateOutcome::Partial {
                table,
                cause: err.to_string(),
            });
        }
    };

    let table = finish(enriched)?;
    info!(stage = "done", players = table.height(), "Aggregation complete");

    Ok(AggregateOutcome::Complete(table))
}

/// Rates, de-duplication and the fixed output column order.
fn finish(players: DataFrame) -> Result<DataFrame> {
    let columns: Vec<Expr> = OUTPUT_COLUMNS.iter().map(|c| col(c)).collect();
    let table = dedupe_players(with_rates(players.lazy()))
        .select(columns)
        .collect()?;
    Ok(table)
}

/// Keeps the first row per (`player`, `team`), preserving order.
pub fn dedupe_players(lf: LazyFrame) -> LazyFrame {
    lf.unique_stable(
        Some(MINUTES_KEY.iter().map(|c| c.to_string()).collect()),
        UniqueKeepStrategy::First,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedupe_keeps_first_occurrence_in_order() {
        let df = df!(
            "player" => ["B", "A", "B", "A", "C"],
            "team" => ["X", "X", "X", "Y", "X"],
            "90s" => [1.0, 2.0, 3.0, 4.0, 5.0]
        )
        .unwrap();

        let out = dedupe_players(df.lazy()).collect().unwrap();

        let nineties: Vec<f64> = out
            .column("90s")
            .unwrap()
            .f64()
            .unwrap()
            .into_iter()
            .flatten()
            .collect();
        assert_eq!(nineties, vec![1.0, 2.0, 4.0, 5.0]);
    }

    #[test]
    fn empty_outcome_has_output_schema() {
        let frame = AggregateOutcome::Empty(EmptyReason::NoEvents)
            .into_frame()
            .unwrap();

        assert_eq!(frame.height(), 0);
        assert_eq!(frame.get_column_names(), OUTPUT_COLUMNS.to_vec());
        assert_eq!(frame.column("prog_HS_actions").unwrap().dtype(), &DataType::Int64);
        assert_eq!(frame.column("prog_act_HS_p90").unwrap().dtype(), &DataType::Float64);
        assert_eq!(frame.column("position").unwrap().dtype(), &DataType::String);
    }

    #[test]
    fn empty_reason_reads_well() {
        let reason = EmptyReason::MinutesMissingKeys(vec!["team".into()]);
        assert_eq!(reason.to_string(), "minutes table is missing team");
    }
}
