//! Column names shared by the input tables and the aggregate output.

pub const PLAYER_ID: &str = "playerId";
pub const PLAYER: &str = "player";
pub const TEAM: &str = "team";

pub const X: &str = "x";
pub const Y: &str = "y";
pub const END_X: &str = "endX";
pub const END_Y: &str = "endY";
pub const COORDINATES: [&str; 4] = [X, Y, END_X, END_Y];

pub const IN_RHS: &str = "in_rhs";
pub const IN_LHS: &str = "in_lhs";

pub const BEGINNING: &str = "beginning";
pub const END: &str = "end";
pub const PROGRESSIVE: &str = "progressive";

pub const MINS: &str = "Mins";
pub const NINETIES: &str = "90s";
pub const POSITION: &str = "position";
pub const UNKNOWN_POSITION: &str = "Unknown";

pub const PROG_RHS_PASSES: &str = "prog_rhs_passes";
pub const PROG_LHS_PASSES: &str = "prog_lhs_passes";
pub const PROG_RHS_CARRIES: &str = "prog_rhs_carries";
pub const PROG_LHS_CARRIES: &str = "prog_lhs_carries";

pub const PROG_RHS_ACTIONS: &str = "prog_rhs_actions";
pub const PROG_LHS_ACTIONS: &str = "prog_lhs_actions";
pub const PROG_HS_ACTIONS: &str = "prog_HS_actions";

pub const PROG_ACT_HS_P90: &str = "prog_act_HS_p90";
pub const PROG_RHS_ACT_P90: &str = "prog_rhs_act_p90";
pub const PROG_LHS_ACT_P90: &str = "prog_lhs_act_p90";

/// Key identifying a player within the event tables.
pub const PLAYER_KEY: [&str; 3] = [PLAYER_ID, PLAYER, TEAM];

/// Key used against the minutes table and for the final de-duplication.
pub const MINUTES_KEY: [&str; 2] = [PLAYER, TEAM];

pub const COUNT_COLUMNS: [&str; 4] = [
    PROG_RHS_PASSES,
    PROG_LHS_PASSES,
    PROG_RHS_CARRIES,
    PROG_LHS_CARRIES,
];

/// (metric, rate) pairs normalized per 90 minutes.
pub const RATES: [(&str, &str); 3] = [
    (PROG_HS_ACTIONS, PROG_ACT_HS_P90),
    (PROG_RHS_ACTIONS, PROG_RHS_ACT_P90),
    (PROG_LHS_ACTIONS, PROG_LHS_ACT_P90),
];

pub const OUTPUT_COLUMNS: [&str; 15] = [
    PLAYER_ID,
    PLAYER,
    TEAM,
    PROG_RHS_PASSES,
    PROG_LHS_PASSES,
    PROG_RHS_CARRIES,
    PROG_LHS_CARRIES,
    PROG_RHS_ACTIONS,
    PROG_LHS_ACTIONS,
    PROG_HS_ACTIONS,
    NINETIES,
    POSITION,
    PROG_ACT_HS_P90,
    PROG_RHS_ACT_P90,
    PROG_LHS_ACT_P90,
];
