use crate::api::{Endpoints, NhlApi};
use crate::database_ops::Store;

/// Everything a pull operation touches, passed explicitly instead of held in globals.
pub struct PullContext<'a> {
    pub store: &'a dyn Store,
    pub api: &'a dyn NhlApi,
    pub endpoints: &'a Endpoints,
    /// Configured current season label, e.g. `20222023`.
    pub season: &'a str,
    /// Leagues whose seasons count as NHL stints.
    pub leagues: &'a [String],
}

impl PullContext<'_> {
    pub fn is_eligible_league(&self, league: &str) -> bool {
        self.leagues.iter().any(|l| l == league)
    }
}
