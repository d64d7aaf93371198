//! Application-level configuration loading, including the location catalog.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

use crate::{
    dto::validation::ROUND_MINUTES_RANGE,
    error::ServiceError,
    state::catalog::LocationCatalog,
};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "SPYGLASS_BACK_CONFIG_PATH";
/// Round length used when neither the config nor the host picks one.
pub const DEFAULT_ROUND_MINUTES: u32 = 8;

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    catalog: LocationCatalog,
    default_round_minutes: u32,
}

impl AppConfig {
    /// Build a configuration from an explicit catalog.
    pub fn new(catalog: LocationCatalog, default_round_minutes: u32) -> Self {
        Self {
            catalog,
            default_round_minutes,
        }
    }

    /// Load the application configuration from disk, falling back to the built-in catalog.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match Self::from_json_str(&contents) {
                Ok(app_config) => {
                    info!(
                        path = %path.display(),
                        locations = app_config.catalog.len(),
                        "loaded location catalog from config"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to load config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Parse and validate a JSON configuration document.
    pub fn from_json_str(contents: &str) -> Result<Self, ServiceError> {
        let raw = serde_json::from_str::<RawConfig>(contents)
            .map_err(|err| ServiceError::Validation(err.to_string()))?;
        Self::try_from(raw)
    }

    /// Location catalog dealt from.
    pub fn catalog(&self) -> &LocationCatalog {
        &self.catalog
    }

    /// Round length of freshly created rooms.
    pub fn default_round_minutes(&self) -> u32 {
        self.default_round_minutes
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        let catalog = LocationCatalog::new(DEFAULT_LOCATIONS.iter().map(|(name, roles)| {
            (
                name.to_string(),
                roles.iter().map(|role| role.to_string()).collect::<Vec<_>>(),
            )
        }))
        .unwrap_or_else(|err| unreachable!("built-in catalog is invalid: {err}"));

        Self {
            catalog,
            default_round_minutes: DEFAULT_ROUND_MINUTES,
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde(default = "default_round_minutes")]
    default_round_minutes: u32,
    locations: Vec<RawLocation>,
}

#[derive(Debug, Deserialize)]
/// JSON representation of a single catalog entry inside the configuration file.
struct RawLocation {
    name: String,
    roles: Vec<String>,
}

impl TryFrom<RawConfig> for AppConfig {
    type Error = ServiceError;

    fn try_from(value: RawConfig) -> Result<Self, Self::Error> {
        if !ROUND_MINUTES_RANGE.contains(&value.default_round_minutes) {
            return Err(ServiceError::Validation(format!(
                "default_round_minutes must be within {}..={}",
                ROUND_MINUTES_RANGE.start(),
                ROUND_MINUTES_RANGE.end()
            )));
        }

        let catalog = LocationCatalog::new(
            value
                .locations
                .into_iter()
                .map(|location| (location.name, location.roles)),
        )?;

        Ok(Self::new(catalog, value.default_round_minutes))
    }
}

fn default_round_minutes() -> u32 {
    DEFAULT_ROUND_MINUTES
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Built-in catalog shipped with the binary.
const DEFAULT_LOCATIONS: &[(&str, &[&str])] = &[
    (
        "Airplane",
        &[
            "First Class Passenger",
            "Air Marshal",
            "Mechanic",
            "Flight Attendant",
            "Co-Pilot",
            "Captain",
            "Economy Passenger",
        ],
    ),
    (
        "Bank",
        &[
            "Armored Car Driver",
            "Manager",
            "Consultant",
            "Customer",
            "Robber",
            "Security Guard",
            "Teller",
        ],
    ),
    (
        "Beach",
        &[
            "Beach Waitress",
            "Kite Surfer",
            "Lifeguard",
            "Thief",
            "Beach Goer",
            "Beach Photographer",
            "Ice Cream Truck Driver",
        ],
    ),
    (
        "Casino",
        &[
            "Bartender",
            "Head Security Guard",
            "Bouncer",
            "Manager",
            "Hustler",
            "Dealer",
            "Gambler",
        ],
    ),
    (
        "Cathedral",
        &[
            "Priest",
            "Beggar",
            "Sinner",
            "Parishioner",
            "Tourist",
            "Sponsor",
            "Choir Singer",
        ],
    ),
    (
        "Circus Tent",
        &[
            "Acrobat",
            "Animal Trainer",
            "Magician",
            "Visitor",
            "Fire Eater",
            "Clown",
            "Juggler",
        ],
    ),
    (
        "Hospital",
        &[
            "Nurse",
            "Doctor",
            "Anesthesiologist",
            "Intern",
            "Patient",
            "Therapist",
            "Surgeon",
        ],
    ),
    (
        "Military Base",
        &[
            "Deserter",
            "Colonel",
            "Medic",
            "Soldier",
            "Sniper",
            "Officer",
            "Tank Engineer",
        ],
    ),
    (
        "Movie Studio",
        &[
            "Stuntman",
            "Sound Engineer",
            "Camera Man",
            "Director",
            "Costume Artist",
            "Actor",
            "Producer",
        ],
    ),
    (
        "Pirate Ship",
        &[
            "Cook",
            "Sailor",
            "Slave",
            "Cannoneer",
            "Bound Prisoner",
            "Cabin Boy",
            "Brave Captain",
        ],
    ),
    (
        "Restaurant",
        &[
            "Musician",
            "Customer",
            "Bouncer",
            "Hostess",
            "Head Chef",
            "Food Critic",
            "Waiter",
        ],
    ),
    (
        "Space Station",
        &[
            "Engineer",
            "Alien",
            "Space Tourist",
            "Pilot",
            "Commander",
            "Scientist",
            "Doctor",
        ],
    ),
    (
        "Submarine",
        &[
            "Cook",
            "Commander",
            "Sonar Technician",
            "Electronics Technician",
            "Sailor",
            "Radioman",
            "Navigator",
        ],
    ),
];
