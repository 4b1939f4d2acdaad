use crate::columns::{
    PLAYER_KEY, PROG_HS_ACTIONS, PROG_LHS_ACTIONS, PROG_LHS_CARRIES, PROG_LHS_PASSES,
    PROG_RHS_ACTIONS, PROG_RHS_CARRIES, PROG_RHS_PASSES,
};
use crate::Result;
use crate::grouping::{PlayerCounts, key_exprs};
use polars::lazy::dsl::concat;
use polars::prelude::*;
use tracing::info;

/// Every player appearing in any of the count tables, first occurrence kept.
pub fn player_base(counts: &[PlayerCounts]) -> Result<DataFrame> {
    let keys: Vec<LazyFrame> = counts
        .iter()
        .map(|c| c.frame.clone().lazy().select(key_exprs()))
        .collect();

    let base = concat(
        keys,
        UnionArgs {
            to_supertypes: true,
            ..Default::default()
        },
    )?
    .unique_stable(
        Some(PLAYER_KEY.iter().map(|c| c.to_string()).collect()),
        UniqueKeepStrategy::First,
    )
    .collect()?;

    Ok(base)
}

/// Left-joins `other` onto `base` by the player key and substitutes
/// `default` wherever `column` found no match.
///
/// The key columns of `other` are cast to the dtypes in `key_schema`
/// first, so tables built from differently typed inputs still line up.
pub fn join_with_default(
    base: LazyFrame,
    key_schema: &Schema,
    other: &DataFrame,
    column: &str,
    default: Expr,
) -> LazyFrame {
    let aligned: Vec<Expr> = PLAYER_KEY
        .iter()
        .filter_map(|key| key_schema.get(key).map(|dtype| col(key).cast(dtype.clone())))
        .collect();

    let mut args = JoinArgs::new(JoinType::Left);
    args.join_nulls = true;

    base.join(
        other.clone().lazy().with_columns(aligned),
        key_exprs(),
        key_exprs(),
        args,
    )
    .with_column(col(column).fill_null(default))
}

/// Attaches every stream's counts to the player base and derives the
/// action totals. `None` when no stream has a single player.
pub fn combine(counts: &[PlayerCounts]) -> Result<Option<DataFrame>> {
    let base = player_base(counts)?;
    info!(stage = "combine", players = base.height(), "Built player base");

    if base.height() == 0 {
        return Ok(None);
    }

    let key_schema = base.schema();
    let mut combined = base.lazy();
    for stream in counts {
        combined = join_with_default(
            combined,
            &key_schema,
            &stream.frame,
            stream.column,
            lit(0i64),
        );
    }

    let combined = with_action_totals(combined).collect()?;
    info!(
        stage = "combine",
        rows = combined.height(),
        "Joined progressive action counts"
    );

    Ok(Some(combined))
}

pub fn with_action_totals(lf: LazyFrame) -> LazyFrame {
    lf.with_columns([
        (col(PROG_RHS_PASSES) + col(PROG_RHS_CARRIES)).alias(PROG_RHS_ACTIONS),
        (col(PROG_LHS_PASSES) + col(PROG_LHS_CARRIES)).alias(PROG_LHS_ACTIONS),
    ])
    .with_column((col(PROG_RHS_ACTIONS) + col(PROG_LHS_ACTIONS)).alias(PROG_HS_ACTIONS))
}
