use crate::columns::{MINS, MINUTES_KEY, NINETIES, PLAYER, POSITION, RATES, TEAM, UNKNOWN_POSITION};
use crate::{Result, has_column, missing_columns};
use polars::prelude::*;
use tracing::{info, warn};

/// Minutes table after normalization, or why it cannot be used.
#[derive(Debug, Clone)]
pub enum MinutesTable {
    /// Columns `player, team, 90s, position`.
    Ready(DataFrame),
    Empty,
    MissingPlaytime,
    MissingKeys(Vec<String>),
}

/// Normalizes a minutes table to `player, team, 90s, position`.
///
/// `90s` is derived from `Mins` when absent, NaN playing time becomes null
/// and `position` defaults to `"Unknown"`. Key dtypes are left as read;
/// [`enrich`] coerces them for the join.
pub fn prepare_minutes(minutes: &DataFrame) -> Result<MinutesTable> {
    if minutes.height() == 0 {
        return Ok(MinutesTable::Empty);
    }

    let missing = missing_columns(minutes, &MINUTES_KEY);
    if !missing.is_empty() {
        return Ok(MinutesTable::MissingKeys(
            missing.into_iter().map(str::to_string).collect(),
        ));
    }

    let playtime = if has_column(minutes, NINETIES) {
        col(NINETIES).cast(DataType::Float64)
    } else if has_column(minutes, MINS) {
        col(MINS).cast(DataType::Float64) / lit(90.0)
    } else {
        return Ok(MinutesTable::MissingPlaytime);
    };
    let playtime = playtime.fill_nan(lit(NULL)).cast(DataType::Float64).alias(NINETIES);

    let position = if has_column(minutes, POSITION) {
        col(POSITION)
    } else {
        lit(UNKNOWN_POSITION).alias(POSITION)
    };

    let prepared = minutes
        .clone()
        .lazy()
        .select([col(PLAYER), col(TEAM), playtime, position])
        .collect()?;

    Ok(MinutesTable::Ready(prepared))
}

/// Left-joins prepared minutes onto the per-player counts by
/// (`player`, `team`). Players without minutes keep a null `90s`.
///
/// Keys on both sides are cast to strings here, so a minutes table with
/// keys that cannot be coerced fails at the join.
pub fn enrich(players: DataFrame, minutes: &DataFrame) -> Result<DataFrame> {
    let keys = || MINUTES_KEY.iter().map(|c| col(c)).collect::<Vec<_>>();

    let enriched = players
        .lazy()
        .with_columns([
            col(PLAYER).cast(DataType::String),
            col(TEAM).cast(DataType::String),
        ])
        .join(
            minutes.clone().lazy().select([
                col(PLAYER).cast(DataType::String),
                col(TEAM).cast(DataType::String),
                col(NINETIES),
                col(POSITION).cast(DataType::String),
            ]),
            keys(),
            keys(),
            JoinArgs::new(JoinType::Left),
        )
        .collect()?;

    let without_minutes = enriched.column(NINETIES)?.null_count();
    if without_minutes > 0 {
        warn!(
            stage = "minutes",
            players = without_minutes,
            "Players without minutes data, their p90 rates are zero"
        );
    }
    info!(stage = "minutes", rows = enriched.height(), "Joined minutes data");

    Ok(enriched)
}

/// Adds the per-90 rates. Unknown or non-positive playing time gives `0.0`.
pub fn with_rates(lf: LazyFrame) -> LazyFrame {
    let has_playtime = col(NINETIES)
        .is_not_null()
        .and(col(NINETIES).is_not_nan())
        .and(col(NINETIES).gt(lit(0.0)));

    let rates: Vec<Expr> = RATES
        .iter()
        .map(|(metric, rate)| {
            when(has_playtime.clone())
                .then(col(metric).cast(DataType::Float64) / col(NINETIES))
                .otherwise(lit(0.0))
                .alias(rate)
        })
        .collect();

    lf.with_columns(rates)
}

/// Adds null `90s` and `position` columns where the minutes join never ran.
pub fn without_minutes(mut players: DataFrame) -> Result<DataFrame> {
    ensure_column(&mut players, NINETIES, DataType::Float64)?;
    ensure_column(&mut players, POSITION, DataType::String)?;
    Ok(players)
}

fn ensure_column(df: &mut DataFrame, name: &str, dtype: DataType) -> Result<()> {
    if !has_column(df, name) {
        let series = Series::full_null(name, df.height(), &dtype);
        df.with_column(series)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::columns::{PROG_ACT_HS_P90, PROG_HS_ACTIONS, PROG_LHS_ACTIONS, PROG_RHS_ACTIONS};

    fn ready(table: MinutesTable) -> DataFrame {
        match table {
            MinutesTable::Ready(df) => df,
            other => panic!("expected a usable minutes table, got {:?}", other),
        }
    }

    #[test]
    fn derives_nineties_from_minutes() {
        let mins = df!("player" => ["A", "B"], "team" => ["X", "X"], "Mins" => [180i64, 45]).unwrap();

        let prepared = ready(prepare_minutes(&mins).unwrap());

        assert_eq!(
            prepared.get_column_names(),
            vec!["player", "team", "90s", "position"]
        );
        let nineties: Vec<Option<f64>> =
            prepared.column("90s").unwrap().f64().unwrap().into_iter().collect();
        assert_eq!(nineties, vec![Some(2.0), Some(0.5)]);
        let positions: Vec<Option<&str>> =
            prepared.column("position").unwrap().str().unwrap().into_iter().collect();
        assert_eq!(positions, vec![Some("Unknown"), Some("Unknown")]);
    }

    #[test]
    fn existing_nineties_wins_over_minutes() {
        let mins = df!(
            "player" => ["A"],
            "team" => ["X"],
            "Mins" => [900i64],
            "90s" => [3i64],
            "position" => ["MF"]
        )
        .unwrap();

        let prepared = ready(prepare_minutes(&mins).unwrap());
        assert_eq!(prepared.column("90s").unwrap().f64().unwrap().get(0), Some(3.0));
        assert_eq!(prepared.column("position").unwrap().str().unwrap().get(0), Some("MF"));
    }

    #[test]
    fn unusable_minutes_tables_are_reported() {
        assert!(matches!(
            prepare_minutes(&DataFrame::empty()).unwrap(),
            MinutesTable::Empty
        ));

        let no_time = df!("player" => ["A"], "team" => ["X"]).unwrap();
        assert!(matches!(
            prepare_minutes(&no_time).unwrap(),
            MinutesTable::MissingPlaytime
        ));

        let no_team = df!("player" => ["A"], "Mins" => [90i64]).unwrap();
        match prepare_minutes(&no_team).unwrap() {
            MinutesTable::MissingKeys(keys) => assert_eq!(keys, vec!["team".to_string()]),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn rates_guard_against_missing_and_zero_playtime() {
        let df = df!(
            "90s" => [Some(2.0), Some(0.0), None],
            "prog_HS_actions" => [10i64, 4, 4],
            "prog_rhs_actions" => [6i64, 2, 2],
            "prog_lhs_actions" => [4i64, 2, 2]
        )
        .unwrap();

        let out = with_rates(df.lazy()).collect().unwrap();

        let hs: Vec<Option<f64>> = out.column(PROG_ACT_HS_P90).unwrap().f64().unwrap().into_iter().collect();
        assert_eq!(hs, vec![Some(5.0), Some(0.0), Some(0.0)]);
        assert_eq!(out.column("prog_rhs_act_p90").unwrap().f64().unwrap().get(0), Some(3.0));
        assert_eq!(out.column("prog_lhs_act_p90").unwrap().f64().unwrap().get(0), Some(2.0));
        assert!(out.column(PROG_ACT_HS_P90).unwrap().f64().unwrap().into_iter().all(|v| v.is_some_and(f64::is_finite)));
    }

    #[test]
    fn nan_playtime_is_treated_as_missing() {
        let mins = df!("player" => ["A", "B"], "team" => ["X", "X"], "90s" => [f64::NAN, 2.0]).unwrap();

        let prepared = ready(prepare_minutes(&mins).unwrap());
        let nineties: Vec<Option<f64>> =
            prepared.column("90s").unwrap().f64().unwrap().into_iter().collect();
        assert_eq!(nineties, vec![None, Some(2.0)]);

        let df = df!(
            "90s" => [f64::NAN],
            "prog_HS_actions" => [1i64],
            "prog_rhs_actions" => [1i64],
            "prog_lhs_actions" => [0i64]
        )
        .unwrap();
        let out = with_rates(df.lazy()).collect().unwrap();
        assert_eq!(out.column(PROG_ACT_HS_P90).unwrap().f64().unwrap().get(0), Some(0.0));
        assert_eq!(out.column("prog_rhs_act_p90").unwrap().f64().unwrap().get(0), Some(0.0));
    }

    #[test]
    fn keys_are_coerced_at_the_join() {
        let mins = df!("player" => [7i64], "team" => [3i64], "90s" => [1.0]).unwrap();
        let prepared = ready(prepare_minutes(&mins).unwrap());
        assert_eq!(prepared.column("player").unwrap().dtype(), &DataType::Int64);

        let players = df!(
            "playerId" => [1i64],
            "player" => ["7"],
            "team" => ["3"],
            PROG_HS_ACTIONS => [2i64]
        )
        .unwrap();
        let out = enrich(players, &prepared).unwrap();
        assert_eq!(out.column("90s").unwrap().f64().unwrap().get(0), Some(1.0));
    }

    #[test]
    fn enrich_keeps_players_without_minutes() {
        let players = df!(
            "playerId" => [1i64, 2],
            "player" => ["A", "B"],
            "team" => ["X", "Y"],
            PROG_HS_ACTIONS => [3i64, 1],
            PROG_RHS_ACTIONS => [2i64, 1],
            PROG_LHS_ACTIONS => [1i64, 0]
        )
        .unwrap();
        let mins = ready(
            prepare_minutes(&df!("player" => ["A"], "team" => ["X"], "90s" => [1.5]).unwrap())
                .unwrap(),
        );

        let out = enrich(players, &mins).unwrap();

        assert_eq!(out.height(), 2);
        let nineties: Vec<Option<f64>> = out.column("90s").unwrap().f64().unwrap().into_iter().collect();
        assert_eq!(nineties, vec![Some(1.5), None]);
    }

    #[test]
    fn without_minutes_adds_null_columns() {
        let players = df!("player" => ["A"], "team" => ["X"]).unwrap();
        let out = without_minutes(players).unwrap();

        assert_eq!(out.column("90s").unwrap().null_count(), 1);
        assert_eq!(out.column("position").unwrap().dtype(), &DataType::String);
    }
}
