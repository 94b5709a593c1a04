use crate::models::route::StatusCounts;
use crate::models::{
    timestamp_now, CalculationPolicy, Coordinates, Location, NewRoute, Route, RouteStatistics,
    RouteStatus, Step,
};
use crate::services::distance::round2;
use sqlx::{PgPool, Postgres, Transaction};
use std::collections::HashMap;
use time::OffsetDateTime;

const ROUTE_COLUMNS: &str = r#"
    id, delivery_id, policy, status,
    origin_lat, origin_lng, origin_address, origin_name,
    destination_lat, destination_lng, destination_address, destination_name,
    distance_km, duration_minutes, estimated_cost, fuel_cost, co2_emissions_kg,
    average_speed_kmh, calculated_at, updated_at, notes
"#;

/// Insert a route and its steps in one transaction, returning the stored route
pub async fn insert_route(pool: &PgPool, route: NewRoute) -> Result<Route, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let (id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO routes (
            delivery_id, policy, status,
            origin_lat, origin_lng, origin_address, origin_name,
            destination_lat, destination_lng, destination_address, destination_name,
            distance_km, duration_minutes, estimated_cost, fuel_cost, co2_emissions_kg,
            average_speed_kmh, calculated_at, updated_at, notes
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $18, $19)
        RETURNING id
        "#,
    )
    .bind(route.delivery_id)
    .bind(route.policy.as_str())
    .bind(route.status.as_str())
    .bind(route.origin.coordinates.lat)
    .bind(route.origin.coordinates.lng)
    .bind(&route.origin.address)
    .bind(&route.origin.name)
    .bind(route.destination.coordinates.lat)
    .bind(route.destination.coordinates.lng)
    .bind(&route.destination.address)
    .bind(&route.destination.name)
    .bind(route.distance_km)
    .bind(route.duration_minutes as i32)
    .bind(route.estimated_cost)
    .bind(route.fuel_cost)
    .bind(route.co2_emissions_kg)
    .bind(route.average_speed_kmh)
    .bind(route.calculated_at)
    .bind(&route.notes)
    .fetch_one(&mut *tx)
    .await?;

    insert_steps(&mut tx, id, &route.steps).await?;
    tx.commit().await?;

    Ok(route.into_route(id))
}

async fn insert_steps(
    tx: &mut Transaction<'_, Postgres>,
    route_id: i64,
    steps: &[Step],
) -> Result<(), sqlx::Error> {
    for step in steps {
        sqlx::query(
            r#"
            INSERT INTO route_steps (
                route_id, step_order, lat, lng, address, name,
                distance_from_previous_km, duration_from_previous_minutes, instructions
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(route_id)
        .bind(step.order as i32)
        .bind(step.location.coordinates.lat)
        .bind(step.location.coordinates.lng)
        .bind(&step.location.address)
        .bind(&step.location.name)
        .bind(step.distance_from_previous_km)
        .bind(step.duration_from_previous_minutes as i32)
        .bind(&step.instructions)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

pub async fn find_route_by_id(pool: &PgPool, id: i64) -> Result<Option<Route>, sqlx::Error> {
    let row = sqlx::query_as::<_, RouteRow>(&format!(
        "SELECT {} FROM routes WHERE id = $1",
        ROUTE_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let steps = find_steps(pool, &[row.id]).await?.remove(&row.id).unwrap_or_default();
    Ok(Some(row.into_route(steps)))
}

/// Most recently calculated route for a delivery
pub async fn find_route_by_delivery_id(
    pool: &PgPool,
    delivery_id: i64,
) -> Result<Option<Route>, sqlx::Error> {
    let row = sqlx::query_as::<_, RouteRow>(&format!(
        "SELECT {} FROM routes WHERE delivery_id = $1 ORDER BY calculated_at DESC, id DESC LIMIT 1",
        ROUTE_COLUMNS
    ))
    .bind(delivery_id)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let steps = find_steps(pool, &[row.id]).await?.remove(&row.id).unwrap_or_default();
    Ok(Some(row.into_route(steps)))
}

pub async fn list_routes(
    pool: &PgPool,
    status: Option<RouteStatus>,
) -> Result<Vec<Route>, sqlx::Error> {
    let rows = match status {
        Some(status) => {
            sqlx::query_as::<_, RouteRow>(&format!(
                "SELECT {} FROM routes WHERE status = $1 ORDER BY id",
                ROUTE_COLUMNS
            ))
            .bind(status.as_str())
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, RouteRow>(&format!(
                "SELECT {} FROM routes ORDER BY id",
                ROUTE_COLUMNS
            ))
            .fetch_all(pool)
            .await?
        }
    };

    let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
    let mut steps_by_route = find_steps(pool, &ids).await?;

    Ok(rows
        .into_iter()
        .map(|row| {
            let steps = steps_by_route.remove(&row.id).unwrap_or_default();
            row.into_route(steps)
        })
        .collect())
}

/// Overwrite the status of a route. Returns false when no route has this id.
pub async fn update_route_status(
    pool: &PgPool,
    id: i64,
    status: RouteStatus,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE routes SET status = $2, updated_at = $3 WHERE id = $1")
        .bind(id)
        .bind(status.as_str())
        .bind(timestamp_now())
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete a route; its steps go with it through ON DELETE CASCADE
pub async fn delete_route(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM routes WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn get_route_statistics(pool: &PgPool) -> Result<RouteStatistics, sqlx::Error> {
    let row: (i64, Option<f64>, Option<f64>, i64, i64, i64, i64) = sqlx::query_as(
        r#"
        SELECT
            COUNT(*) as total_routes,
            AVG(distance_km) as average_distance_km,
            AVG(duration_minutes)::float8 as average_duration_minutes,
            COUNT(*) FILTER (WHERE status = 'calculated') as calculated,
            COUNT(*) FILTER (WHERE status = 'in_progress') as in_progress,
            COUNT(*) FILTER (WHERE status = 'completed') as completed,
            COUNT(*) FILTER (WHERE status = 'cancelled') as cancelled
        FROM routes
        "#,
    )
    .fetch_one(pool)
    .await?;

    Ok(RouteStatistics {
        total_routes: row.0,
        average_distance_km: round2(row.1.unwrap_or(0.0)),
        average_duration_minutes: round2(row.2.unwrap_or(0.0)),
        count_by_status: StatusCounts {
            calculated: row.3,
            in_progress: row.4,
            completed: row.5,
            cancelled: row.6,
        },
    })
}

async fn find_steps(
    pool: &PgPool,
    route_ids: &[i64],
) -> Result<HashMap<i64, Vec<Step>>, sqlx::Error> {
    let mut steps_by_route: HashMap<i64, Vec<Step>> = HashMap::new();
    if route_ids.is_empty() {
        return Ok(steps_by_route);
    }

    let rows = sqlx::query_as::<_, StepRow>(
        r#"
        SELECT route_id, step_order, lat, lng, address, name,
               distance_from_previous_km, duration_from_previous_minutes, instructions
        FROM route_steps
        WHERE route_id = ANY($1)
        ORDER BY route_id, step_order
        "#,
    )
    .bind(route_ids)
    .fetch_all(pool)
    .await?;

    for row in rows {
        steps_by_route
            .entry(row.route_id)
            .or_default()
            .push(row.into_step());
    }

    Ok(steps_by_route)
}

// Helper structs for deserializing rows from database

#[derive(sqlx::FromRow)]
struct RouteRow {
    id: i64,
    delivery_id: Option<i64>,
    policy: String,
    status: String,
    origin_lat: f64,
    origin_lng: f64,
    origin_address: Option<String>,
    origin_name: Option<String>,
    destination_lat: f64,
    destination_lng: f64,
    destination_address: Option<String>,
    destination_name: Option<String>,
    distance_km: f64,
    duration_minutes: i32,
    estimated_cost: f64,
    fuel_cost: f64,
    co2_emissions_kg: f64,
    average_speed_kmh: f64,
    calculated_at: OffsetDateTime,
    updated_at: OffsetDateTime,
    notes: Option<String>,
}

impl RouteRow {
    fn into_route(self, steps: Vec<Step>) -> Route {
        let policy = self.policy.parse().unwrap_or_else(|_| {
            tracing::warn!(
                "Invalid calculation policy '{}' for route {}, defaulting to shortest_distance",
                self.policy,
                self.id
            );
            CalculationPolicy::ShortestDistance
        });

        let status = self.status.parse().unwrap_or_else(|_| {
            tracing::warn!(
                "Invalid status '{}' for route {}, defaulting to calculated",
                self.status,
                self.id
            );
            RouteStatus::Calculated
        });

        Route {
            id: self.id,
            delivery_id: self.delivery_id,
            policy,
            status,
            origin: stored_location(
                self.origin_lat,
                self.origin_lng,
                self.origin_address,
                self.origin_name,
            ),
            destination: stored_location(
                self.destination_lat,
                self.destination_lng,
                self.destination_address,
                self.destination_name,
            ),
            distance_km: self.distance_km,
            duration_minutes: self.duration_minutes.max(0) as u32,
            estimated_cost: self.estimated_cost,
            fuel_cost: self.fuel_cost,
            co2_emissions_kg: self.co2_emissions_kg,
            average_speed_kmh: self.average_speed_kmh,
            steps,
            calculated_at: self.calculated_at,
            updated_at: self.updated_at,
            notes: self.notes,
        }
    }
}

#[derive(sqlx::FromRow)]
struct StepRow {
    route_id: i64,
    step_order: i32,
    lat: f64,
    lng: f64,
    address: Option<String>,
    name: Option<String>,
    distance_from_previous_km: f64,
    duration_from_previous_minutes: i32,
    instructions: Option<String>,
}

impl StepRow {
    fn into_step(self) -> Step {
        Step {
            order: self.step_order.max(0) as u32,
            location: stored_location(self.lat, self.lng, self.address, self.name),
            distance_from_previous_km: self.distance_from_previous_km,
            duration_from_previous_minutes: self.duration_from_previous_minutes.max(0) as u32,
            instructions: self.instructions,
        }
    }
}

/// Stored coordinates were validated on the way in; they are trusted here
fn stored_location(
    lat: f64,
    lng: f64,
    address: Option<String>,
    name: Option<String>,
) -> Location {
    Location {
        coordinates: Coordinates { lat, lng },
        address,
        name,
    }
}
