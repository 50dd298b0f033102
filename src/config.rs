//! TOML-based scenario configuration and preset definitions.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset};
use serde::Deserialize;
use thiserror::Error;

use crate::sim::controller::BidCapacity;
use crate::sim::dispatch::DispatchOrder;
use crate::sim::strategy::Strategy;
use crate::sim::timeslot::{SLOT_SECS, Timeslot};

/// Top-level scenario configuration parsed from TOML.
///
/// All fields have defaults matching the baseline scenario. Load from
/// TOML with [`ScenarioConfig::from_toml_file`] or use
/// [`ScenarioConfig::baseline`] for the built-in default.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Simulation timing and global parameters.
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Vehicles, batteries and chargers.
    #[serde(default)]
    pub fleet: FleetConfig,
    /// Tariff, market prices and bidding parameters.
    #[serde(default)]
    pub market: MarketConfig,
    /// Rental demand.
    #[serde(default)]
    pub rentals: RentalConfig,
    /// Fleet-capacity forecast.
    #[serde(default)]
    pub capacity: CapacityConfig,
}

/// Simulation timing and global parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// First tick as an RFC 3339 timestamp.
    pub start: String,
    /// Number of days to simulate (must be > 0).
    pub days: usize,
    /// Tick length in minutes (multiple of 5 dividing a day).
    pub timestep_min: u32,
    /// Master random seed.
    pub seed: u64,
    /// Bidding strategy: `"regular"`, `"balancing"` or `"intraday"`.
    pub strategy: String,
    /// Penalty for undelivered commitments (EUR/MWh).
    pub imbalance_price_eur_mwh: f32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            start: "2017-01-02T00:00:00+01:00".to_string(),
            days: 2,
            timestep_min: 5,
            seed: 42,
            strategy: "regular".to_string(),
            imbalance_price_eur_mwh: 100.0,
        }
    }
}

/// Vehicles, batteries and chargers.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FleetConfig {
    /// Number of vehicles.
    pub vehicles: u32,
    /// Battery capacity per vehicle (kWh).
    pub battery_kwh: f32,
    /// Charging efficiency (0.0–1.0).
    pub eta_charge: f32,
    /// Charger power per vehicle (kW).
    pub charger_kw: f32,
    /// Lower bound of the initial state of charge (%).
    pub initial_soc_min: f32,
    /// Upper bound of the initial state of charge (%).
    pub initial_soc_max: f32,
    /// `"highest_level_first"` or `"lowest_level_first"`.
    pub dispatch_order: String,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            vehicles: 50,
            battery_kwh: 17.6,
            eta_charge: 0.95,
            charger_kw: 4.6,
            initial_soc_min: 30.0,
            initial_soc_max: 90.0,
            dispatch_order: "highest_level_first".to_string(),
        }
    }
}

/// A synthetic daily price curve (EUR/MWh).
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PriceCurveConfig {
    /// Daily mean price.
    pub base: f32,
    /// Sinusoidal amplitude.
    pub amp: f32,
    /// Phase offset (radians).
    pub phase_rad: f32,
    /// Gaussian noise standard deviation.
    pub noise_std: f32,
}

impl Default for PriceCurveConfig {
    fn default() -> Self {
        Self {
            base: 38.0,
            amp: 15.0,
            phase_rad: -1.6,
            noise_std: 6.0,
        }
    }
}

/// Tariff, market prices and bidding parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MarketConfig {
    /// Flat fallback price (EUR/MWh).
    pub industry_tariff_eur_mwh: f32,
    /// Market time zone as minutes east of UTC.
    pub utc_offset_minutes: i32,
    /// `"slot_start"` or `"block_minimum"`.
    pub bid_capacity: String,
    /// Balancing clearing prices CSV; synthetic when unset.
    pub balancing_prices: Option<PathBuf>,
    /// Intraday clearing prices CSV; synthetic when unset.
    pub intraday_prices: Option<PathBuf>,
    /// Synthetic balancing price curve.
    pub balancing_curve: PriceCurveConfig,
    /// Synthetic intraday price curve.
    pub intraday_curve: PriceCurveConfig,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            industry_tariff_eur_mwh: 40.0,
            utc_offset_minutes: 60,
            bid_capacity: "slot_start".to_string(),
            balancing_prices: None,
            intraday_prices: None,
            balancing_curve: PriceCurveConfig {
                base: 34.0,
                amp: 20.0,
                noise_std: 4.0,
                ..PriceCurveConfig::default()
            },
            intraday_curve: PriceCurveConfig::default(),
        }
    }
}

/// Rental demand.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RentalConfig {
    /// Sample rental requests at all.
    pub enabled: bool,
    /// Base per-vehicle, per-tick request probability.
    pub request_prob: f64,
    /// Shortest trip (minutes).
    pub trip_minutes_min: u32,
    /// Longest trip (minutes).
    pub trip_minutes_max: u32,
    /// Driving consumption (kW).
    pub consumption_kw: f32,
    /// Rental price (EUR per minute).
    pub revenue_eur_per_min: f32,
    /// Vehicles below this state of charge (%) are not rented out.
    pub min_soc_pct: f32,
    /// Refuse rentals that would break the committed capacity.
    pub refuse_rentals: bool,
}

impl Default for RentalConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            request_prob: 0.004,
            trip_minutes_min: 10,
            trip_minutes_max: 90,
            consumption_kw: 8.0,
            revenue_eur_per_min: 0.24,
            min_soc_pct: 20.0,
            refuse_rentals: false,
        }
    }
}

/// Fleet-capacity forecast.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CapacityConfig {
    /// Capacity series CSV; synthetic when unset.
    pub file: Option<PathBuf>,
    /// Daily mean capacity (kW).
    pub base_kw: f32,
    /// Sinusoidal amplitude (kW).
    pub amp_kw: f32,
    /// Phase offset (radians).
    pub phase_rad: f32,
    /// Gaussian noise standard deviation (kW).
    pub noise_std: f32,
}

impl Default for CapacityConfig {
    fn default() -> Self {
        Self {
            file: None,
            base_kw: 150.0,
            amp_kw: 50.0,
            phase_rad: 1.6,
            noise_std: 10.0,
        }
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("config error: {field}: {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"simulation.days"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl ScenarioConfig {
    /// Returns the baseline scenario: regular charging, no bidding.
    pub fn baseline() -> Self {
        Self::default()
    }

    /// Returns the balancing preset: daily day-ahead bids, rentals refused
    /// when they would break a commitment.
    pub fn balancing() -> Self {
        Self {
            simulation: SimulationConfig {
                strategy: "balancing".to_string(),
                days: 3,
                ..SimulationConfig::default()
            },
            market: MarketConfig {
                bid_capacity: "block_minimum".to_string(),
                ..MarketConfig::default()
            },
            rentals: RentalConfig {
                refuse_rentals: true,
                ..RentalConfig::default()
            },
            ..Self::default()
        }
    }

    /// Returns the intraday preset: half-hour-ahead bids.
    pub fn intraday() -> Self {
        Self {
            simulation: SimulationConfig {
                strategy: "intraday".to_string(),
                ..SimulationConfig::default()
            },
            ..Self::default()
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["baseline", "balancing", "intraday"];

    /// Loads a scenario from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "baseline" => Ok(Self::baseline()),
            "balancing" => Ok(Self::balancing()),
            "intraday" => Ok(Self::intraday()),
            _ => Err(ConfigError::new(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a scenario from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("scenario", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// First tick as a POSIX timestamp.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if `simulation.start` is not RFC 3339.
    pub fn start_timestamp(&self) -> Result<Timeslot, ConfigError> {
        DateTime::parse_from_rfc3339(&self.simulation.start)
            .map(|dt| dt.timestamp())
            .map_err(|e| ConfigError::new("simulation.start", format!("not RFC 3339: {e}")))
    }

    /// Market time zone.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the offset is out of range or not a whole
    /// number of quarter hours. Market blocks are counted in local time and
    /// must line up with the quarter-hour price grid.
    pub fn utc_offset(&self) -> Result<FixedOffset, ConfigError> {
        let minutes = self.market.utc_offset_minutes;
        if minutes % 15 != 0 {
            return Err(ConfigError::new(
                "market.utc_offset_minutes",
                format!("must be a multiple of 15, got {minutes}"),
            ));
        }
        minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| ConfigError::new("market.utc_offset_minutes", "must be within ±24h"))
    }

    /// Parsed `simulation.strategy`.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` for an unknown strategy name.
    pub fn strategy(&self) -> Result<Strategy, ConfigError> {
        self.simulation
            .strategy
            .parse()
            .map_err(|e| ConfigError::new("simulation.strategy", format!("{e}")))
    }

    /// Parsed `fleet.dispatch_order`.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` for an unknown order name.
    pub fn dispatch_order(&self) -> Result<DispatchOrder, ConfigError> {
        match self.fleet.dispatch_order.as_str() {
            "highest_level_first" => Ok(DispatchOrder::HighestLevelFirst),
            "lowest_level_first" => Ok(DispatchOrder::LowestLevelFirst),
            other => Err(ConfigError::new(
                "fleet.dispatch_order",
                format!(
                    "must be \"highest_level_first\" or \"lowest_level_first\", got \"{other}\""
                ),
            )),
        }
    }

    /// Parsed `market.bid_capacity`.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` for an unknown estimate name.
    pub fn bid_capacity(&self) -> Result<BidCapacity, ConfigError> {
        match self.market.bid_capacity.as_str() {
            "slot_start" => Ok(BidCapacity::SlotStart),
            "block_minimum" => Ok(BidCapacity::BlockMinimum),
            other => Err(ConfigError::new(
                "market.bid_capacity",
                format!("must be \"slot_start\" or \"block_minimum\", got \"{other}\""),
            )),
        }
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let s = &self.simulation;

        match self.start_timestamp() {
            Ok(t) if t.rem_euclid(SLOT_SECS) != 0 => errors.push(ConfigError::new(
                "simulation.start",
                "must lie on the 5-minute grid",
            )),
            Ok(_) => {}
            Err(e) => errors.push(e),
        }
        if s.days == 0 {
            errors.push(ConfigError::new("simulation.days", "must be > 0"));
        }
        if s.timestep_min == 0 || s.timestep_min % 5 != 0 || 1440 % s.timestep_min != 0 {
            errors.push(ConfigError::new(
                "simulation.timestep_min",
                "must be a multiple of 5 that divides a day",
            ));
        }
        if let Err(e) = self.strategy() {
            errors.push(e);
        }
        if s.imbalance_price_eur_mwh < 0.0 {
            errors.push(ConfigError::new("simulation.imbalance_price_eur_mwh", "must be >= 0"));
        }

        let f = &self.fleet;
        if f.vehicles == 0 {
            errors.push(ConfigError::new("fleet.vehicles", "must be > 0"));
        }
        if f.battery_kwh <= 0.0 {
            errors.push(ConfigError::new("fleet.battery_kwh", "must be > 0"));
        }
        if f.charger_kw <= 0.0 {
            errors.push(ConfigError::new("fleet.charger_kw", "must be > 0"));
        }
        if !(f.eta_charge > 0.0 && f.eta_charge <= 1.0) {
            errors.push(ConfigError::new("fleet.eta_charge", "must be in (0.0, 1.0]"));
        }
        if !(0.0..=100.0).contains(&f.initial_soc_min) || !(0.0..=100.0).contains(&f.initial_soc_max) {
            errors.push(ConfigError::new("fleet.initial_soc_min", "must be in [0, 100]"));
        } else if f.initial_soc_min > f.initial_soc_max {
            errors.push(ConfigError::new(
                "fleet.initial_soc_min",
                "must be <= fleet.initial_soc_max",
            ));
        }
        if let Err(e) = self.dispatch_order() {
            errors.push(e);
        }

        if let Err(e) = self.utc_offset() {
            errors.push(e);
        }
        if let Err(e) = self.bid_capacity() {
            errors.push(e);
        }
        for (field, curve) in [
            ("market.balancing_curve.noise_std", &self.market.balancing_curve),
            ("market.intraday_curve.noise_std", &self.market.intraday_curve),
        ] {
            if curve.noise_std < 0.0 {
                errors.push(ConfigError::new(field, "must be >= 0"));
            }
        }

        let r = &self.rentals;
        if !(0.0..=1.0).contains(&r.request_prob) {
            errors.push(ConfigError::new("rentals.request_prob", "must be in [0.0, 1.0]"));
        }
        if r.trip_minutes_min == 0 {
            errors.push(ConfigError::new("rentals.trip_minutes_min", "must be > 0"));
        }
        if r.trip_minutes_min > r.trip_minutes_max {
            errors.push(ConfigError::new(
                "rentals.trip_minutes_min",
                "must be <= rentals.trip_minutes_max",
            ));
        }
        if r.consumption_kw < 0.0 {
            errors.push(ConfigError::new("rentals.consumption_kw", "must be >= 0"));
        }

        if self.capacity.noise_std < 0.0 {
            errors.push(ConfigError::new("capacity.noise_std", "must be >= 0"));
        }

        errors
    }
}
