use indexmap::IndexMap;

/// Ballots of a vote, keyed by voter name and pointing at the accused name.
///
/// Insertion order is kept so tie lists follow the order targets were first named.
pub type Ballots = IndexMap<String, String>;

/// Outcome of counting a set of ballots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tally {
    /// No ballot was cast.
    Empty,
    /// A single name received strictly more votes than any other.
    Accused(String),
    /// Several names share the top count.
    Tie(Vec<String>),
}

/// Count ballots per target and return the single leader or the tied set.
pub fn resolve(ballots: &Ballots) -> Tally {
    let mut counts: IndexMap<&str, usize> = IndexMap::new();
    for target in ballots.values() {
        *counts.entry(target.as_str()).or_insert(0) += 1;
    }

    let Some(top) = counts.values().copied().max() else {
        return Tally::Empty;
    };

    let mut leaders: Vec<String> = counts
        .into_iter()
        .filter(|(_, count)| *count == top)
        .map(|(name, _)| name.to_string())
        .collect();

    if leaders.len() == 1 {
        Tally::Accused(leaders.remove(0))
    } else {
        Tally::Tie(leaders)
    }
}
