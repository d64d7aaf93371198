//! Secret role dealing for a round.
//!
//! All randomness flows through a caller-supplied [`CryptoRng`].

use rand::{
    CryptoRng, Rng,
    seq::{IndexedRandom, SliceRandom, index},
};
use thiserror::Error;

use crate::state::catalog::LocationCatalog;

/// Reasons a round cannot be dealt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DealError {
    /// Nobody to deal to.
    #[error("cannot deal a round without participants")]
    NoParticipants,
    /// The catalog has no location to pick from.
    #[error("location catalog is empty")]
    EmptyCatalog,
}

/// Result of dealing one round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deal {
    /// Secret location shared by every non-spy participant.
    pub location: String,
    /// Position of the spy among the dealt participants.
    pub spy_index: usize,
    /// Roles for the non-spy participants, in participant order with the spy skipped.
    pub roles: Vec<String>,
}

impl Deal {
    /// Role assigned to the participant at `index`, `None` for the spy.
    pub fn role_for(&self, index: usize) -> Option<&str> {
        match index.cmp(&self.spy_index) {
            std::cmp::Ordering::Less => self.roles.get(index).map(String::as_str),
            std::cmp::Ordering::Equal => None,
            std::cmp::Ordering::Greater => self.roles.get(index - 1).map(String::as_str),
        }
    }
}

/// Pick a location and a spy uniformly at random, then hand out roles to everyone else.
pub fn deal<R: CryptoRng>(
    catalog: &LocationCatalog,
    participants: usize,
    rng: &mut R,
) -> Result<Deal, DealError> {
    if participants == 0 {
        return Err(DealError::NoParticipants);
    }
    if catalog.is_empty() {
        return Err(DealError::EmptyCatalog);
    }

    let location_index = rng.random_range(0..catalog.len());
    let (location, pool) = catalog
        .get_index(location_index)
        .ok_or(DealError::EmptyCatalog)?;
    let spy_index = rng.random_range(0..participants);
    let roles = assign_roles(pool, participants - 1, rng);

    Ok(Deal {
        location: location.to_string(),
        spy_index,
        roles,
    })
}

/// Draw `needed` roles from `pool`.
///
/// Roles are distinct whenever the pool is large enough. Otherwise every pool
/// role is used once, the remainder is drawn with replacement, and the whole
/// list is shuffled so pool order does not leak through positions.
pub fn assign_roles<R: CryptoRng>(pool: &[String], needed: usize, rng: &mut R) -> Vec<String> {
    if pool.is_empty() || needed == 0 {
        return Vec::new();
    }

    if needed <= pool.len() {
        return index::sample(rng, pool.len(), needed)
            .into_iter()
            .map(|i| pool[i].clone())
            .collect();
    }

    let mut roles = pool.to_vec();
    while roles.len() < needed {
        if let Some(extra) = pool.choose(rng) {
            roles.push(extra.clone());
        }
    }
    roles.shuffle(rng);
    roles
}
