//! View models behind the stats, leaderboard and achievements screens.
//! Each refresh fetches fresh rows; a failed fetch raises an error toast
//! and leaves the previously loaded data in place.

pub mod achievements;
pub mod leaderboard;
pub mod personal;

pub use achievements::AchievementsView;
pub use leaderboard::{LeaderboardRow, LeaderboardView};
pub use personal::{PersonalStats, PersonalStatsView};
