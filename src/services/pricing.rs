use crate::config::PricingConfig;
use crate::models::CalculationPolicy;
use crate::services::distance::round2;

/// Cost, fuel and emission estimates derived from a distance.
/// All results are rounded to 2 decimals; distances are not validated.
#[derive(Debug, Clone)]
pub struct PricingCalculator {
    config: PricingConfig,
}

impl PricingCalculator {
    pub fn new(config: PricingConfig) -> Self {
        PricingCalculator { config }
    }

    pub fn config(&self) -> &PricingConfig {
        &self.config
    }

    fn policy_multiplier(&self, policy: CalculationPolicy) -> f64 {
        match policy {
            CalculationPolicy::ShortestDistance => 1.0,
            CalculationPolicy::FastestTime => self.config.express_multiplier,
            CalculationPolicy::LowestCost => self.config.lowest_cost_multiplier,
            CalculationPolicy::Eco => self.config.eco_multiplier,
        }
    }

    pub fn cost(&self, distance_km: f64, policy: CalculationPolicy) -> f64 {
        let base_cost = distance_km * self.config.base_rate_per_km;
        let cost = base_cost * self.policy_multiplier(policy);

        tracing::debug!(
            "Cost calculated: {:.2} for {} km with policy {}",
            cost,
            distance_km,
            policy
        );
        round2(cost)
    }

    pub fn fuel_cost(&self, distance_km: f64) -> f64 {
        let liters = (distance_km / 100.0) * self.config.consumption_per_100km;
        let cost = liters * self.config.fuel_price_per_liter;

        tracing::debug!(
            "Fuel cost: {:.2} for {} km ({:.2} liters)",
            cost,
            distance_km,
            liters
        );
        round2(cost)
    }

    /// CO2 emitted over the distance, in kg
    pub fn co2_emissions(&self, distance_km: f64) -> f64 {
        let emissions = distance_km * self.config.emission_factor_per_km;

        tracing::debug!("CO2 emissions: {:.2} kg for {} km", emissions, distance_km);
        round2(emissions)
    }

    pub fn cost_per_km(&self, total_cost: f64, total_distance_km: f64) -> f64 {
        if total_distance_km == 0.0 {
            return 0.0;
        }
        round2(total_cost / total_distance_km)
    }
}
