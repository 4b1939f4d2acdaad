use crate::columns::{BEGINNING, COORDINATES, END, END_X, END_Y, PROGRESSIVE, X, Y};
use crate::config::ProgressionConfig;
use crate::{Error, Result, missing_columns};
use polars::prelude::*;
use tracing::{debug, warn};

/// Keeps the progressive rows of an event table.
///
/// An empty table, or one lacking any coordinate column, comes back
/// unchanged. The transient `beginning`/`end` distances are not kept.
pub fn classify_progressive(events: &DataFrame, config: &ProgressionConfig) -> Result<DataFrame> {
    if events.height() == 0 {
        return Ok(events.clone());
    }

    let missing = missing_columns(events, &COORDINATES);
    if !missing.is_empty() {
        warn!(
            stage = "classify",
            missing = ?missing,
            "Skipping progressive classification, coordinate columns missing"
        );
        return Ok(events.clone());
    }

    let input_columns: Vec<Expr> = events.get_column_names().into_iter().map(col).collect();

    let progressive = with_distances(events.clone().lazy(), config)
        .filter(is_progressive(config))
        .select(input_columns)
        .collect()?;

    debug!(
        stage = "classify",
        rows_in = events.height(),
        rows_out = progressive.height(),
        "Classified progressive actions"
    );

    Ok(progressive)
}

/// Returns every row with its `beginning`/`end` distances and a boolean
/// `progressive` flag.
pub fn label_progressive(events: &DataFrame, config: &ProgressionConfig) -> Result<DataFrame> {
    if let Some(missing) = missing_columns(events, &COORDINATES).first() {
        return Err(Error::MissingColumn(missing.to_string()));
    }

    let labelled = with_distances(events.clone().lazy(), config)
        .with_column(
            is_progressive(config)
                .fill_null(lit(false))
                .alias(PROGRESSIVE),
        )
        .collect()?;

    Ok(labelled)
}

fn with_distances(lf: LazyFrame, config: &ProgressionConfig) -> LazyFrame {
    lf.with_columns([
        distance_to_goal(X, Y, config).alias(BEGINNING),
        distance_to_goal(END_X, END_Y, config).alias(END),
    ])
}

fn distance_to_goal(x: &str, y: &str, config: &ProgressionConfig) -> Expr {
    let dx = lit(config.goal_x) - col(x).cast(DataType::Float64);
    let dy = lit(config.goal_y) - col(y).cast(DataType::Float64);
    (dx.clone() * dx + dy.clone() * dy).sqrt()
}

fn is_progressive(config: &ProgressionConfig) -> Expr {
    col(BEGINNING)
        .gt(lit(config.min_start_distance))
        .and(col(END).lt(col(BEGINNING)))
        .and((col(END) / col(BEGINNING)).lt(lit(config.min_progression_ratio)))
}
