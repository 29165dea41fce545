use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::Sport;

/// Canonical market keys, independent of how any listing labels them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketKey {
    #[serde(rename = "1x2")]
    OneXTwo,
    OverUnder,
    Btts,
    DoubleChance,
    CorrectScore,
    FirstHalfOverUnder,
    FirstGoalscorer,
    AnytimeGoalscorer,
    HalfTimeResult,
    HalfTimeFullTime,
    TotalGoals,
    NextGoal,
    YellowCards,
    RedCards,
    Penalty,
    PlayerAssists,
    Handicap,
    MoneyLine,
    PointSpread,
    PlayerPoints,
    FirstQuarterWinner,
    MatchWinner,
    SetWinner,
    TotalGames,
    PlayerGames,
    InningsRuns,
    TopBatsman,
    TopBowler,
    TotalMatchRuns,
    TotalMatchWickets,
    MethodOfDismissal,
    PlayerPerformance,
    TotalPoints,
    FirstTryScorer,
    AnytimeTryScorer,
    WinningMargin,
    PuckLine,
    PeriodBetting,
    TeamTotalGoals,
    FirstGoalScorer,
    SetScore,
    PointsHandicap,
    SetsHandicap,
    RunLine,
    TotalRuns,
    TeamTotalRuns,
    FirstFiveInnings,
    FirstTouchdown,
    AnytimeTouchdown,
    QuarterBetting,
    FightWinner,
    MethodOfVictory,
    RoundBetting,
    TotalRounds,
    FightToGoDistance,
    KnockdownBetting,
}

impl MarketKey {
    pub const ALL: [MarketKey; 56] = [
        MarketKey::OneXTwo,
        MarketKey::OverUnder,
        MarketKey::Btts,
        MarketKey::DoubleChance,
        MarketKey::CorrectScore,
        MarketKey::FirstHalfOverUnder,
        MarketKey::FirstGoalscorer,
        MarketKey::AnytimeGoalscorer,
        MarketKey::HalfTimeResult,
        MarketKey::HalfTimeFullTime,
        MarketKey::TotalGoals,
        MarketKey::NextGoal,
        MarketKey::YellowCards,
        MarketKey::RedCards,
        MarketKey::Penalty,
        MarketKey::PlayerAssists,
        MarketKey::Handicap,
        MarketKey::MoneyLine,
        MarketKey::PointSpread,
        MarketKey::PlayerPoints,
        MarketKey::FirstQuarterWinner,
        MarketKey::MatchWinner,
        MarketKey::SetWinner,
        MarketKey::TotalGames,
        MarketKey::PlayerGames,
        MarketKey::InningsRuns,
        MarketKey::TopBatsman,
        MarketKey::TopBowler,
        MarketKey::TotalMatchRuns,
        MarketKey::TotalMatchWickets,
        MarketKey::MethodOfDismissal,
        MarketKey::PlayerPerformance,
        MarketKey::TotalPoints,
        MarketKey::FirstTryScorer,
        MarketKey::AnytimeTryScorer,
        MarketKey::WinningMargin,
        MarketKey::PuckLine,
        MarketKey::PeriodBetting,
        MarketKey::TeamTotalGoals,
        MarketKey::FirstGoalScorer,
        MarketKey::SetScore,
        MarketKey::PointsHandicap,
        MarketKey::SetsHandicap,
        MarketKey::RunLine,
        MarketKey::TotalRuns,
        MarketKey::TeamTotalRuns,
        MarketKey::FirstFiveInnings,
        MarketKey::FirstTouchdown,
        MarketKey::AnytimeTouchdown,
        MarketKey::QuarterBetting,
        MarketKey::FightWinner,
        MarketKey::MethodOfVictory,
        MarketKey::RoundBetting,
        MarketKey::TotalRounds,
        MarketKey::FightToGoDistance,
        MarketKey::KnockdownBetting,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MarketKey::OneXTwo => "1x2",
            MarketKey::OverUnder => "over_under",
            MarketKey::Btts => "btts",
            MarketKey::DoubleChance => "double_chance",
            MarketKey::CorrectScore => "correct_score",
            MarketKey::FirstHalfOverUnder => "first_half_over_under",
            MarketKey::FirstGoalscorer => "first_goalscorer",
            MarketKey::AnytimeGoalscorer => "anytime_goalscorer",
            MarketKey::HalfTimeResult => "half_time_result",
            MarketKey::HalfTimeFullTime => "half_time_full_time",
            MarketKey::TotalGoals => "total_goals",
            MarketKey::NextGoal => "next_goal",
            MarketKey::YellowCards => "yellow_cards",
            MarketKey::RedCards => "red_cards",
            MarketKey::Penalty => "penalty",
            MarketKey::PlayerAssists => "player_assists",
            MarketKey::Handicap => "handicap",
            MarketKey::MoneyLine => "money_line",
            MarketKey::PointSpread => "point_spread",
            MarketKey::PlayerPoints => "player_points",
            MarketKey::FirstQuarterWinner => "first_quarter_winner",
            MarketKey::MatchWinner => "match_winner",
            MarketKey::SetWinner => "set_winner",
            MarketKey::TotalGames => "total_games",
            MarketKey::PlayerGames => "player_games",
            MarketKey::InningsRuns => "innings_runs",
            MarketKey::TopBatsman => "top_batsman",
            MarketKey::TopBowler => "top_bowler",
            MarketKey::TotalMatchRuns => "total_match_runs",
            MarketKey::TotalMatchWickets => "total_match_wickets",
            MarketKey::MethodOfDismissal => "method_of_dismissal",
            MarketKey::PlayerPerformance => "player_performance",
            MarketKey::TotalPoints => "total_points",
            MarketKey::FirstTryScorer => "first_try_scorer",
            MarketKey::AnytimeTryScorer => "anytime_try_scorer",
            MarketKey::WinningMargin => "winning_margin",
            MarketKey::PuckLine => "puck_line",
            MarketKey::PeriodBetting => "period_betting",
            MarketKey::TeamTotalGoals => "team_total_goals",
            MarketKey::FirstGoalScorer => "first_goal_scorer",
            MarketKey::SetScore => "set_score",
            MarketKey::PointsHandicap => "points_handicap",
            MarketKey::SetsHandicap => "sets_handicap",
            MarketKey::RunLine => "run_line",
            MarketKey::TotalRuns => "total_runs",
            MarketKey::TeamTotalRuns => "team_total_runs",
            MarketKey::FirstFiveInnings => "first_five_innings",
            MarketKey::FirstTouchdown => "first_touchdown",
            MarketKey::AnytimeTouchdown => "anytime_touchdown",
            MarketKey::QuarterBetting => "quarter_betting",
            MarketKey::FightWinner => "fight_winner",
            MarketKey::MethodOfVictory => "method_of_victory",
            MarketKey::RoundBetting => "round_betting",
            MarketKey::TotalRounds => "total_rounds",
            MarketKey::FightToGoDistance => "fight_to_go_distance",
            MarketKey::KnockdownBetting => "knockdown_betting",
        }
    }
}

impl fmt::Display for MarketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown market key: {0}")]
pub struct UnknownMarketKey(pub String);

impl FromStr for MarketKey {
    type Err = UnknownMarketKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MarketKey::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| UnknownMarketKey(s.to_string()))
    }
}

/// Markets offered per sport, with their display names
pub fn catalogue(sport: Sport) -> &'static [(MarketKey, &'static str)] {
    use MarketKey::*;

    match sport {
        Sport::Football => &[
            (OneXTwo, "Win/Draw/Win"),
            (OverUnder, "Over/Under"),
            (Btts, "Both Teams To Score"),
            (DoubleChance, "Double Chance"),
            (CorrectScore, "Correct Score"),
            (FirstHalfOverUnder, "First Half Over/Under"),
            (FirstGoalscorer, "First Goalscorer"),
            (AnytimeGoalscorer, "Anytime Goalscorer"),
            (HalfTimeResult, "Half Time Result"),
            (HalfTimeFullTime, "Half Time/Full Time"),
            (TotalGoals, "Total Goals Over/Under"),
            (NextGoal, "Next Goal"),
            (YellowCards, "Yellow Cards"),
            (RedCards, "Red Cards"),
            (Penalty, "Penalty"),
            (PlayerAssists, "Player Assists"),
            (Handicap, "Asian Handicap"),
        ],
        Sport::Basketball => &[
            (MoneyLine, "Money Line"),
            (PointSpread, "Point Spread"),
            (OverUnder, "Over/Under Points"),
            (PlayerPoints, "Player Points"),
            (FirstQuarterWinner, "First Quarter Winner"),
        ],
        Sport::Tennis => &[
            (MatchWinner, "Match Winner"),
            (SetWinner, "Set Winner"),
            (CorrectScore, "Correct Score"),
            (TotalGames, "Total Games Over/Under"),
            (PlayerGames, "Player Games Won"),
        ],
        Sport::Cricket => &[
            (MatchWinner, "Match Winner"),
            (InningsRuns, "Innings Runs"),
            (TopBatsman, "Top Batsman"),
            (TopBowler, "Top Bowler"),
            (TotalMatchRuns, "Total Match Runs"),
            (TotalMatchWickets, "Total Match Wickets"),
            (MethodOfDismissal, "Method of Dismissal"),
            (PlayerPerformance, "Player Performance"),
        ],
        Sport::Rugby => &[
            (MatchWinner, "Match Winner"),
            (Handicap, "Handicap"),
            (TotalPoints, "Total Points"),
            (FirstTryScorer, "First Try Scorer"),
            (AnytimeTryScorer, "Anytime Try Scorer"),
            (WinningMargin, "Winning Margin"),
            (HalfTimeResult, "Half Time Result"),
        ],
        Sport::Hockey => &[
            (MatchWinner, "Match Winner"),
            (PuckLine, "Puck Line"),
            (TotalGoals, "Total Goals"),
            (PeriodBetting, "Period Betting"),
            (TeamTotalGoals, "Team Total Goals"),
            (FirstGoalScorer, "First Goal Scorer"),
        ],
        Sport::Volleyball => &[
            (MatchWinner, "Match Winner"),
            (SetWinner, "Set Winner"),
            (TotalPoints, "Total Points"),
            (SetScore, "Set Score"),
            (PointsHandicap, "Points Handicap"),
            (SetsHandicap, "Sets Handicap"),
        ],
        Sport::Baseball => &[
            (MoneyLine, "Money Line"),
            (RunLine, "Run Line"),
            (TotalRuns, "Total Runs"),
            (TeamTotalRuns, "Team Total Runs"),
            (FirstFiveInnings, "First Five Innings"),
            (InningsRuns, "Innings Runs"),
        ],
        Sport::AmericanFootball => &[
            (MoneyLine, "Money Line"),
            (PointSpread, "Point Spread"),
            (TotalPoints, "Total Points"),
            (FirstTouchdown, "First Touchdown Scorer"),
            (AnytimeTouchdown, "Anytime Touchdown Scorer"),
            (QuarterBetting, "Quarter Betting"),
            (HalfTimeResult, "Half Time Result"),
        ],
        Sport::Boxing | Sport::MixedMartialArts => &[
            (FightWinner, "Fight Winner"),
            (MethodOfVictory, "Method of Victory"),
            (RoundBetting, "Round Betting"),
            (TotalRounds, "Total Rounds"),
            (FightToGoDistance, "Fight to Go Distance"),
            (KnockdownBetting, "Knockdown Betting"),
        ],
    }
}
