use crate::columns::{
    IN_LHS, IN_RHS, PROG_LHS_CARRIES, PROG_LHS_PASSES, PROG_RHS_CARRIES, PROG_RHS_PASSES,
};
use crate::{Result, has_column};
use polars::prelude::*;
use std::fmt;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HalfSpace {
    Right,
    Left,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Pass,
    Carry,
}

/// One of the four (action, half-space) combinations counted per player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Stream {
    pub kind: ActionKind,
    pub side: HalfSpace,
}

impl HalfSpace {
    pub fn flag_column(self) -> &'static str {
        match self {
            HalfSpace::Right => IN_RHS,
            HalfSpace::Left => IN_LHS,
        }
    }
}

impl Stream {
    pub const ALL: [Stream; 4] = [
        Stream {
            kind: ActionKind::Pass,
            side: HalfSpace::Right,
        },
        Stream {
            kind: ActionKind::Pass,
            side: HalfSpace::Left,
        },
        Stream {
            kind: ActionKind::Carry,
            side: HalfSpace::Right,
        },
        Stream {
            kind: ActionKind::Carry,
            side: HalfSpace::Left,
        },
    ];

    pub fn count_column(self) -> &'static str {
        match (self.kind, self.side) {
            (ActionKind::Pass, HalfSpace::Right) => PROG_RHS_PASSES,
            (ActionKind::Pass, HalfSpace::Left) => PROG_LHS_PASSES,
            (ActionKind::Carry, HalfSpace::Right) => PROG_RHS_CARRIES,
            (ActionKind::Carry, HalfSpace::Left) => PROG_LHS_CARRIES,
        }
    }
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let side = match self.side {
            HalfSpace::Right => "rhs",
            HalfSpace::Left => "lhs",
        };
        let kind = match self.kind {
            ActionKind::Pass => "passes",
            ActionKind::Carry => "carries",
        };
        write!(f, "{}-{}", side, kind)
    }
}

/// Rows of `events` tagged as lying in `side`.
///
/// Null flags count as false. Without a flag column the result has the
/// input schema and no rows.
pub fn route(events: &DataFrame, side: HalfSpace) -> Result<DataFrame> {
    let flag = side.flag_column();

    if !has_column(events, flag) {
        if events.height() > 0 {
            warn!(
                stage = "route",
                column = flag,
                rows = events.height(),
                "Half-space flag column missing, stream is empty"
            );
        }
        return Ok(events.head(Some(0)));
    }

    let routed = events
        .clone()
        .lazy()
        .filter(col(flag).cast(DataType::Boolean).fill_null(lit(false)))
        .collect()?;

    Ok(routed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_by_flag_and_treats_nulls_as_false() {
        let df = df!(
            "player" => ["A", "B", "C", "D"],
            "in_rhs" => [Some(true), Some(false), None, Some(true)],
            "in_lhs" => [Some(false), Some(true), Some(true), Some(true)]
        )
        .unwrap();

        let rhs = route(&df, HalfSpace::Right).unwrap();
        let lhs = route(&df, HalfSpace::Left).unwrap();

        let names = |df: &DataFrame| -> Vec<String> {
            df.column("player")
                .unwrap()
                .str()
                .unwrap()
                .into_iter()
                .flatten()
                .map(str::to_string)
                .collect()
        };
        assert_eq!(names(&rhs), vec!["A", "D"]);
        assert_eq!(names(&lhs), vec!["B", "C", "D"]);
    }

    #[test]
    fn missing_flag_yields_empty_stream_with_schema() {
        let df = df!("player" => ["A"], "x" => [1.0]).unwrap();
        let routed = route(&df, HalfSpace::Left).unwrap();

        assert_eq!(routed.height(), 0);
        assert_eq!(routed.get_column_names(), vec!["player", "x"]);
    }

    #[test]
    fn stream_names_match_count_columns() {
        let names: Vec<&str> = Stream::ALL.iter().map(|s| s.count_column()).collect();
        assert_eq!(
            names,
            vec![
                "prog_rhs_passes",
                "prog_lhs_passes",
                "prog_rhs_carries",
                "prog_lhs_carries"
            ]
        );
        assert_eq!(Stream::ALL[3].to_string(), "lhs-carries");
    }
}
