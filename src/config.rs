use crate::constants::*;
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Without a database URL routes are kept in process memory
    pub database_url: Option<String>,
    pub redis_url: Option<String>,
    pub route_cache_ttl: u64,
    pub pricing: PricingConfig,
    pub routing: RoutingConfig,
}

/// Rates used by the pricing calculator
#[derive(Debug, Clone, PartialEq)]
pub struct PricingConfig {
    pub base_rate_per_km: f64,
    pub fuel_price_per_liter: f64,
    pub consumption_per_100km: f64,
    pub emission_factor_per_km: f64,
    pub eco_multiplier: f64,
    pub express_multiplier: f64,
    pub lowest_cost_multiplier: f64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            base_rate_per_km: DEFAULT_BASE_RATE_PER_KM,
            fuel_price_per_liter: DEFAULT_FUEL_PRICE_PER_LITER,
            consumption_per_100km: DEFAULT_CONSUMPTION_PER_100KM,
            emission_factor_per_km: DEFAULT_EMISSION_FACTOR_PER_KM,
            eco_multiplier: DEFAULT_ECO_MULTIPLIER,
            express_multiplier: DEFAULT_EXPRESS_MULTIPLIER,
            lowest_cost_multiplier: DEFAULT_LOWEST_COST_MULTIPLIER,
        }
    }
}

impl PricingConfig {
    pub fn from_env() -> Result<Self, String> {
        let defaults = Self::default();

        let config = Self {
            base_rate_per_km: env_or("PRICING_BASE_RATE_PER_KM", defaults.base_rate_per_km)?,
            fuel_price_per_liter: env_or(
                "PRICING_FUEL_PRICE_PER_LITER",
                defaults.fuel_price_per_liter,
            )?,
            consumption_per_100km: env_or(
                "PRICING_CONSUMPTION_PER_100KM",
                defaults.consumption_per_100km,
            )?,
            emission_factor_per_km: env_or(
                "PRICING_EMISSION_FACTOR_PER_KM",
                defaults.emission_factor_per_km,
            )?,
            eco_multiplier: env_or("PRICING_ECO_MULTIPLIER", defaults.eco_multiplier)?,
            express_multiplier: env_or("PRICING_EXPRESS_MULTIPLIER", defaults.express_multiplier)?,
            lowest_cost_multiplier: env_or(
                "PRICING_LOWEST_COST_MULTIPLIER",
                defaults.lowest_cost_multiplier,
            )?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        let rates = [
            ("PRICING_BASE_RATE_PER_KM", self.base_rate_per_km),
            ("PRICING_FUEL_PRICE_PER_LITER", self.fuel_price_per_liter),
            ("PRICING_CONSUMPTION_PER_100KM", self.consumption_per_100km),
            ("PRICING_EMISSION_FACTOR_PER_KM", self.emission_factor_per_km),
            ("PRICING_LOWEST_COST_MULTIPLIER", self.lowest_cost_multiplier),
        ];
        for (name, value) in rates {
            if !value.is_finite() || value < 0.0 {
                return Err(format!("{} must be a non-negative number", name));
            }
        }

        if !(self.eco_multiplier > 0.0 && self.eco_multiplier < 1.0) {
            return Err("PRICING_ECO_MULTIPLIER must be between 0 and 1".to_string());
        }
        if !(self.express_multiplier > 1.0 && self.express_multiplier.is_finite()) {
            return Err("PRICING_EXPRESS_MULTIPLIER must be greater than 1".to_string());
        }

        Ok(())
    }
}

/// Knobs for route construction and the status lifecycle
#[derive(Debug, Clone, PartialEq)]
pub struct RoutingConfig {
    pub average_speed_kmh: f64,
    pub max_distance_km: f64,

    /// 2-opt refinement is skipped at or above this number of stops
    pub two_opt_max_stops: usize,

    /// Reject status changes outside CALCULATED -> IN_PROGRESS -> {COMPLETED, CANCELLED}
    pub strict_status_transitions: bool,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            average_speed_kmh: DEFAULT_AVERAGE_SPEED_KMH,
            max_distance_km: DEFAULT_MAX_DISTANCE_KM,
            two_opt_max_stops: DEFAULT_TWO_OPT_MAX_STOPS,
            strict_status_transitions: false,
        }
    }
}

impl RoutingConfig {
    pub fn from_env() -> Result<Self, String> {
        let defaults = Self::default();

        let config = Self {
            average_speed_kmh: env_or("ROUTE_AVERAGE_SPEED_KMH", defaults.average_speed_kmh)?,
            max_distance_km: env_or("ROUTE_MAX_DISTANCE_KM", defaults.max_distance_km)?,
            two_opt_max_stops: env_or("ROUTE_TWO_OPT_MAX_STOPS", defaults.two_opt_max_stops)?,
            strict_status_transitions: env_or(
                "ROUTE_STRICT_STATUS_TRANSITIONS",
                defaults.strict_status_transitions,
            )?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        if !(self.average_speed_kmh > 0.0 && self.average_speed_kmh.is_finite()) {
            return Err("ROUTE_AVERAGE_SPEED_KMH must be greater than 0".to_string());
        }
        if !(self.max_distance_km > 0.0) {
            return Err("ROUTE_MAX_DISTANCE_KM must be greater than 0".to_string());
        }
        Ok(())
    }
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        dotenv::dotenv().ok();

        Ok(Config {
            host: env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| DEFAULT_PORT.to_string())
                .parse()
                .map_err(|_| "Invalid PORT")?,
            database_url: env::var("DATABASE_URL").ok(),
            redis_url: env::var("REDIS_URL").ok(),
            route_cache_ttl: env_or("ROUTE_CACHE_TTL", DEFAULT_ROUTE_CACHE_TTL_SECONDS)?,
            pricing: PricingConfig::from_env()?,
            routing: RoutingConfig::from_env()?,
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Read `key` from the environment, falling back to `default` when unset
fn env_or<T: FromStr>(key: &str, default: T) -> Result<T, String> {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|_| format!("Invalid {}", key)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_default_pricing_is_valid() {
        assert!(PricingConfig::default().validate().is_ok());
    }

    #[test]
    fn test_pricing_multiplier_bounds() {
        let mut config = PricingConfig {
            eco_multiplier: 1.2,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config.eco_multiplier = 0.8;
        config.express_multiplier = 0.9;
        assert!(config.validate().is_err());

        config.express_multiplier = 1.3;
        config.base_rate_per_km = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_routing_validation() {
        assert!(RoutingConfig::default().validate().is_ok());

        let config = RoutingConfig {
            average_speed_kmh: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = RoutingConfig {
            max_distance_km: f64::NAN,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial]
    fn test_routing_from_env() {
        env::set_var("ROUTE_AVERAGE_SPEED_KMH", "65");
        env::set_var("ROUTE_STRICT_STATUS_TRANSITIONS", "true");
        let config = RoutingConfig::from_env().unwrap();
        env::remove_var("ROUTE_AVERAGE_SPEED_KMH");
        env::remove_var("ROUTE_STRICT_STATUS_TRANSITIONS");

        assert_eq!(config.average_speed_kmh, 65.0);
        assert!(config.strict_status_transitions);
        assert_eq!(config.max_distance_km, DEFAULT_MAX_DISTANCE_KM);
    }

    #[test]
    #[serial]
    fn test_invalid_env_value_is_reported() {
        env::set_var("ROUTE_MAX_DISTANCE_KM", "far");
        let result = RoutingConfig::from_env();
        env::remove_var("ROUTE_MAX_DISTANCE_KM");

        assert_eq!(result.unwrap_err(), "Invalid ROUTE_MAX_DISTANCE_KM");
    }
}
