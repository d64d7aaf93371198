//! Immutable location catalog mapping each location to its pool of roles.

use indexmap::{IndexMap, IndexSet};
use thiserror::Error;

/// Reasons a catalog definition is rejected at load time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// The catalog does not contain a single location.
    #[error("location catalog is empty")]
    Empty,
    /// A location entry has a blank name.
    #[error("location name must not be empty")]
    BlankLocation,
    /// Two entries share the same location name.
    #[error("duplicate location `{0}`")]
    DuplicateLocation(String),
    /// A location ended up without any usable role.
    #[error("location `{0}` has no roles")]
    NoRoles(String),
}

/// Ordered mapping from location name to a set of unique role names.
#[derive(Debug, Clone)]
pub struct LocationCatalog {
    locations: IndexMap<String, Vec<String>>,
    sorted_names: Vec<String>,
}

impl LocationCatalog {
    /// Build a catalog from raw `(location, roles)` entries.
    ///
    /// Names are trimmed, blank roles dropped and duplicate roles within a
    /// location collapsed while keeping the first occurrence.
    pub fn new<I, R>(entries: I) -> Result<Self, CatalogError>
    where
        I: IntoIterator<Item = (String, R)>,
        R: IntoIterator<Item = String>,
    {
        let mut locations = IndexMap::new();

        for (name, roles) in entries {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(CatalogError::BlankLocation);
            }

            let unique: IndexSet<String> = roles
                .into_iter()
                .map(|role| role.trim().to_string())
                .filter(|role| !role.is_empty())
                .collect();
            if unique.is_empty() {
                return Err(CatalogError::NoRoles(name));
            }

            if locations.contains_key(&name) {
                return Err(CatalogError::DuplicateLocation(name));
            }
            locations.insert(name, unique.into_iter().collect());
        }

        if locations.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut sorted_names: Vec<String> = locations.keys().cloned().collect();
        sorted_names.sort();

        Ok(Self {
            locations,
            sorted_names,
        })
    }

    /// Number of locations in the catalog.
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    /// Whether the catalog holds no location (never true for a constructed catalog).
    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// Role pool of a location.
    pub fn roles(&self, location: &str) -> Option<&[String]> {
        self.locations.get(location).map(Vec::as_slice)
    }

    /// Location entry at `index` in catalog order.
    pub fn get_index(&self, index: usize) -> Option<(&str, &[String])> {
        self.locations
            .get_index(index)
            .map(|(name, roles)| (name.as_str(), roles.as_slice()))
    }

    /// Alphabetically sorted location names, as shown to players.
    pub fn sorted_names(&self) -> &[String] {
        &self.sorted_names
    }

    /// Resolve a user-supplied location name to its canonical spelling.
    pub fn canonical_name(&self, candidate: &str) -> Option<&str> {
        let candidate = candidate.trim();
        self.locations
            .keys()
            .find(|name| name.eq_ignore_ascii_case(candidate))
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, roles: &[&str]) -> (String, Vec<String>) {
        (
            name.to_string(),
            roles.iter().map(|role| role.to_string()).collect(),
        )
    }

    #[test]
    fn roles_are_trimmed_and_deduplicated() {
        let catalog = LocationCatalog::new([entry(
            "Nightclub",
            &["Bartender", " DJ ", "Bartender", "", "Bouncer"],
        )])
        .unwrap();

        assert_eq!(
            catalog.roles("Nightclub").unwrap(),
            &["Bartender", "DJ", "Bouncer"]
        );
    }

    #[test]
    fn sorted_names_are_alphabetical() {
        let catalog = LocationCatalog::new([
            entry("Submarine", &["Captain"]),
            entry("Airplane", &["Pilot"]),
            entry("Hospital", &["Nurse"]),
        ])
        .unwrap();

        assert_eq!(
            catalog.sorted_names(),
            &["Airplane", "Hospital", "Submarine"]
        );
        assert_eq!(catalog.get_index(0).unwrap().0, "Submarine");
    }

    #[test]
    fn invalid_catalogs_are_rejected() {
        let empty: Vec<(String, Vec<String>)> = Vec::new();
        assert_eq!(LocationCatalog::new(empty).unwrap_err(), CatalogError::Empty);
        assert_eq!(
            LocationCatalog::new([entry("Bank", &[" "])]).unwrap_err(),
            CatalogError::NoRoles("Bank".into())
        );
        assert_eq!(
            LocationCatalog::new([entry("Bank", &["Teller"]), entry("Bank", &["Guard"])])
                .unwrap_err(),
            CatalogError::DuplicateLocation("Bank".into())
        );
        assert_eq!(
            LocationCatalog::new([entry("  ", &["Guard"])]).unwrap_err(),
            CatalogError::BlankLocation
        );
    }

    #[test]
    fn canonical_name_ignores_case() {
        let catalog = LocationCatalog::new([entry("Space Station", &["Engineer"])]).unwrap();
        assert_eq!(catalog.canonical_name(" space station"), Some("Space Station"));
        assert_eq!(catalog.canonical_name("Moon Base"), None);
    }
}
