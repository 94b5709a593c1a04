use crate::models::Location;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use time::OffsetDateTime;

/// Policy used to price a route.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum CalculationPolicy {
    #[default]
    ShortestDistance,
    FastestTime,
    LowestCost,
    Eco,
}

impl CalculationPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            CalculationPolicy::ShortestDistance => "shortest_distance",
            CalculationPolicy::FastestTime => "fastest_time",
            CalculationPolicy::LowestCost => "lowest_cost",
            CalculationPolicy::Eco => "eco",
        }
    }
}

impl fmt::Display for CalculationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CalculationPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "shortest_distance" | "shortest" => Ok(CalculationPolicy::ShortestDistance),
            "fastest_time" | "fastest" | "express" => Ok(CalculationPolicy::FastestTime),
            "lowest_cost" | "cheapest" => Ok(CalculationPolicy::LowestCost),
            "eco" => Ok(CalculationPolicy::Eco),
            _ => Err(format!("Invalid calculation policy: '{}'", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum RouteStatus {
    #[default]
    Calculated,
    InProgress,
    Completed,
    Cancelled,
}

impl RouteStatus {
    pub const ALL: [RouteStatus; 4] = [
        RouteStatus::Calculated,
        RouteStatus::InProgress,
        RouteStatus::Completed,
        RouteStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RouteStatus::Calculated => "calculated",
            RouteStatus::InProgress => "in_progress",
            RouteStatus::Completed => "completed",
            RouteStatus::Cancelled => "cancelled",
        }
    }

    /// Transition table used when strict status transitions are enabled.
    /// Setting the current status again is always accepted.
    pub fn can_transition_to(&self, next: RouteStatus) -> bool {
        if *self == next {
            return true;
        }
        match (self, next) {
            (RouteStatus::Calculated, RouteStatus::InProgress) => true,
            (RouteStatus::Calculated, RouteStatus::Cancelled) => true,
            (RouteStatus::InProgress, RouteStatus::Completed) => true,
            (RouteStatus::InProgress, RouteStatus::Cancelled) => true,
            (RouteStatus::Calculated, _)
            | (RouteStatus::InProgress, _)
            | (RouteStatus::Completed, _)
            | (RouteStatus::Cancelled, _) => false,
        }
    }
}

impl fmt::Display for RouteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RouteStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "calculated" => Ok(RouteStatus::Calculated),
            "in_progress" | "in-progress" => Ok(RouteStatus::InProgress),
            "completed" => Ok(RouteStatus::Completed),
            "cancelled" | "canceled" => Ok(RouteStatus::Cancelled),
            _ => Err(format!("Invalid route status: '{}'", s)),
        }
    }
}

/// One leg of a computed route, ending at `location`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Step {
    pub order: u32,
    #[serde(flatten)]
    pub location: Location,
    /// Leg distance from the previous step (0 for the first step)
    pub distance_from_previous_km: f64,
    pub duration_from_previous_minutes: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

/// A computed, persisted itinerary for one delivery
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Route {
    pub id: i64,
    pub delivery_id: Option<i64>,
    pub policy: CalculationPolicy,
    pub status: RouteStatus,
    pub origin: Location,
    pub destination: Location,
    pub distance_km: f64,
    pub duration_minutes: u32,
    pub estimated_cost: f64,
    pub fuel_cost: f64,
    pub co2_emissions_kg: f64,
    pub average_speed_kmh: f64,
    pub steps: Vec<Step>,
    #[serde(with = "time::serde::rfc3339")]
    pub calculated_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// A route that has been computed but not yet stored. The repository
/// assigns the id when saving it.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRoute {
    pub delivery_id: Option<i64>,
    pub policy: CalculationPolicy,
    pub status: RouteStatus,
    pub origin: Location,
    pub destination: Location,
    pub distance_km: f64,
    pub duration_minutes: u32,
    pub estimated_cost: f64,
    pub fuel_cost: f64,
    pub co2_emissions_kg: f64,
    pub average_speed_kmh: f64,
    pub steps: Vec<Step>,
    pub calculated_at: OffsetDateTime,
    pub notes: Option<String>,
}

impl NewRoute {
    pub fn into_route(self, id: i64) -> Route {
        Route {
            id,
            delivery_id: self.delivery_id,
            policy: self.policy,
            status: self.status,
            origin: self.origin,
            destination: self.destination,
            distance_km: self.distance_km,
            duration_minutes: self.duration_minutes,
            estimated_cost: self.estimated_cost,
            fuel_cost: self.fuel_cost,
            co2_emissions_kg: self.co2_emissions_kg,
            average_speed_kmh: self.average_speed_kmh,
            steps: self.steps,
            calculated_at: self.calculated_at,
            updated_at: self.calculated_at,
            notes: self.notes,
        }
    }
}

/// Current UTC time truncated to microseconds, the precision PostgreSQL
/// `TIMESTAMPTZ` keeps, so stored and cached copies of a route compare equal
pub fn timestamp_now() -> OffsetDateTime {
    let now = OffsetDateTime::now_utc();
    now - time::Duration::nanoseconds(i64::from(now.nanosecond() % 1_000))
}

// Request/Response types for API endpoints

#[derive(Debug, Clone, Deserialize)]
pub struct RouteCalculationRequest {
    pub origin: Location,
    pub destination: Location,
    #[serde(default)]
    pub intermediate_stops: Vec<Location>,
    #[serde(default)]
    pub policy: Option<CalculationPolicy>,
    #[serde(default)]
    pub delivery_id: Option<i64>,
    /// Reorder the intermediate stops with the optimizer before building legs
    #[serde(default)]
    pub optimize_stops: bool,
    #[serde(default)]
    pub notes: Option<String>,
}

impl RouteCalculationRequest {
    pub fn new(origin: Location, destination: Location) -> Self {
        RouteCalculationRequest {
            origin,
            destination,
            intermediate_stops: Vec::new(),
            policy: None,
            delivery_id: None,
            optimize_stops: false,
            notes: None,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        self.origin
            .coordinates
            .validate()
            .map_err(|e| format!("origin: {}", e))?;
        self.destination
            .coordinates
            .validate()
            .map_err(|e| format!("destination: {}", e))?;
        for (i, stop) in self.intermediate_stops.iter().enumerate() {
            stop.coordinates
                .validate()
                .map_err(|e| format!("intermediate_stops[{}]: {}", i, e))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OptimizeRouteRequest {
    pub start: Location,
    #[serde(default)]
    pub destinations: Vec<Location>,
    #[serde(default)]
    pub end: Option<Location>,
}

impl OptimizeRouteRequest {
    pub fn validate(&self) -> Result<(), String> {
        self.start
            .coordinates
            .validate()
            .map_err(|e| format!("start: {}", e))?;
        for (i, stop) in self.destinations.iter().enumerate() {
            stop.coordinates
                .validate()
                .map_err(|e| format!("destinations[{}]: {}", i, e))?;
        }
        if let Some(ref end) = self.end {
            end.coordinates
                .validate()
                .map_err(|e| format!("end: {}", e))?;
        }
        Ok(())
    }
}

/// Result of a non-persisted stop ordering
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizedRoute {
    pub ordered_stops: Vec<Location>,
    pub total_distance_km: f64,
    pub total_duration_minutes: u32,
    pub total_cost: f64,
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: RouteStatus,
}

#[derive(Debug, Serialize)]
pub struct RouteListResponse {
    pub routes: Vec<Route>,
    pub count: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StatusCounts {
    pub calculated: i64,
    pub in_progress: i64,
    pub completed: i64,
    pub cancelled: i64,
}

impl StatusCounts {
    pub fn increment(&mut self, status: RouteStatus) {
        match status {
            RouteStatus::Calculated => self.calculated += 1,
            RouteStatus::InProgress => self.in_progress += 1,
            RouteStatus::Completed => self.completed += 1,
            RouteStatus::Cancelled => self.cancelled += 1,
        }
    }
}

/// Aggregates over all stored routes
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RouteStatistics {
    pub total_routes: i64,
    pub average_distance_km: f64,
    pub average_duration_minutes: f64,
    pub count_by_status: StatusCounts,
}
