//! Listing models and queries.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, SqlitePool};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Car {
    pub id: i64,
    pub make: String,
    pub model: String,
    pub year: i64,
    pub price: i64,
    pub location: String,
    pub mileage: i64,
    pub fuel_type: String,
    pub transmission: String,
    pub color: String,
    pub description: String,
    /// JSON array of image URLs
    pub images: String,
    pub condition: String,
    /// JSON array of feature strings
    pub features: String,
    pub engine_size: Option<String>,
    pub doors: i64,
    pub seats: i64,
    pub body_type: String,
    pub status: String,
    pub is_featured: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl Car {
    pub fn image_urls(&self) -> Vec<String> {
        serde_json::from_str(&self.images).unwrap_or_default()
    }

    pub fn feature_list(&self) -> Vec<String> {
        serde_json::from_str(&self.features).unwrap_or_default()
    }

    pub fn title(&self) -> String {
        format!("{} {} {}", self.make, self.model, self.year)
    }
}

/// Search filters for the listings page.
///
/// Zero or empty means "unset": a `price_max` of 0 must not exclude
/// every listing, it simply leaves the upper bound open.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CarFilters {
    /// Substring match against make OR model, case-insensitive.
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub price_min: i64,
    #[serde(default)]
    pub price_max: i64,
    #[serde(default)]
    pub year_min: i64,
    #[serde(default)]
    pub year_max: i64,
    /// Comma-separated set of accepted fuel types.
    #[serde(default)]
    pub fuel_types: String,
    /// Comma-separated set of accepted transmissions.
    #[serde(default)]
    pub transmissions: String,
}

impl CarFilters {
    fn fuel_type_set(&self) -> Vec<&str> {
        self.fuel_types
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    }

    fn transmission_set(&self) -> Vec<&str> {
        self.transmissions
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    }
}

impl Car {
    /// List available cars matching the filters, featured listings first,
    /// then newest first.
    pub async fn list(pool: &SqlitePool, filters: &CarFilters) -> Result<Vec<Car>, sqlx::Error> {
        let mut qb: QueryBuilder<sqlx::Sqlite> =
            QueryBuilder::new("SELECT * FROM cars WHERE status = 'available'");

        if !filters.q.is_empty() {
            let pattern = format!("%{}%", filters.q.to_lowercase());
            qb.push(" AND (LOWER(make) LIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" OR LOWER(model) LIKE ");
            qb.push_bind(pattern);
            qb.push(")");
        }
        if !filters.location.is_empty() {
            qb.push(" AND location = ");
            qb.push_bind(filters.location.clone());
        }
        if filters.price_min > 0 {
            qb.push(" AND price >= ");
            qb.push_bind(filters.price_min);
        }
        if filters.price_max > 0 {
            qb.push(" AND price <= ");
            qb.push_bind(filters.price_max);
        }
        if filters.year_min > 0 {
            qb.push(" AND year >= ");
            qb.push_bind(filters.year_min);
        }
        if filters.year_max > 0 {
            qb.push(" AND year <= ");
            qb.push_bind(filters.year_max);
        }

        let fuels = filters.fuel_type_set();
        if !fuels.is_empty() {
            qb.push(" AND fuel_type IN (");
            let mut separated = qb.separated(", ");
            for fuel in &fuels {
                separated.push_bind(fuel.to_string());
            }
            qb.push(")");
        }

        let transmissions = filters.transmission_set();
        if !transmissions.is_empty() {
            qb.push(" AND transmission IN (");
            let mut separated = qb.separated(", ");
            for t in &transmissions {
                separated.push_bind(t.to_string());
            }
            qb.push(")");
        }

        qb.push(" ORDER BY is_featured DESC, created_at DESC");

        qb.build_query_as::<Car>().fetch_all(pool).await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Car>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM cars WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// All available listings in sitemap order.
    pub async fn list_available_for_sitemap(
        pool: &SqlitePool,
    ) -> Result<Vec<(i64, String)>, sqlx::Error> {
        sqlx::query_as("SELECT id, updated_at FROM cars WHERE status = 'available' ORDER BY id")
            .fetch_all(pool)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    async fn insert_car(
        pool: &SqlitePool,
        make: &str,
        model: &str,
        price: i64,
        status: &str,
    ) -> i64 {
        sqlx::query(
            "INSERT INTO cars (make, model, year, price, location, mileage, fuel_type, transmission, status)
             VALUES (?, ?, 2022, ?, 'Medellín, Antioquia', 10000, 'Gasolina', 'Automática', ?)",
        )
        .bind(make)
        .bind(model)
        .bind(price)
        .bind(status)
        .execute(pool)
        .await
        .unwrap()
        .last_insert_rowid()
    }

    #[tokio::test]
    async fn list_only_returns_available_cars() {
        let pool = db::init_test_pool().await;
        insert_car(&pool, "Toyota", "Corolla", 75_000_000, "available").await;
        insert_car(&pool, "Mazda", "3", 85_000_000, "sold").await;

        let cars = Car::list(&pool, &CarFilters::default()).await.unwrap();
        assert_eq!(cars.len(), 1);
        assert_eq!(cars[0].make, "Toyota");
    }

    #[tokio::test]
    async fn query_matches_make_or_model_case_insensitively() {
        let pool = db::init_test_pool().await;
        insert_car(&pool, "Mazda", "3", 85_000_000, "available").await;
        insert_car(&pool, "Chevrolet", "Onix", 55_000_000, "available").await;

        let filters = CarFilters {
            q: "mazda".to_string(),
            ..Default::default()
        };
        let cars = Car::list(&pool, &filters).await.unwrap();
        assert_eq!(cars.len(), 1);
        assert_eq!(cars[0].make, "Mazda");

        // Model side of the OR
        let filters = CarFilters {
            q: "onix".to_string(),
            ..Default::default()
        };
        let cars = Car::list(&pool, &filters).await.unwrap();
        assert_eq!(cars.len(), 1);
        assert_eq!(cars[0].model, "Onix");
    }

    #[tokio::test]
    async fn zero_price_max_is_treated_as_unset() {
        let pool = db::init_test_pool().await;
        insert_car(&pool, "Mazda", "3", 85_000_000, "available").await;

        let filters = CarFilters {
            q: "Mazda".to_string(),
            price_max: 0,
            ..Default::default()
        };
        let cars = Car::list(&pool, &filters).await.unwrap();
        assert_eq!(cars.len(), 1, "price_max = 0 must not filter anything");
    }

    #[tokio::test]
    async fn price_bounds_apply_when_set() {
        let pool = db::init_test_pool().await;
        insert_car(&pool, "Toyota", "Corolla", 75_000_000, "available").await;
        insert_car(&pool, "Renault", "Duster", 45_000_000, "available").await;

        let filters = CarFilters {
            price_max: 50_000_000,
            ..Default::default()
        };
        let cars = Car::list(&pool, &filters).await.unwrap();
        assert_eq!(cars.len(), 1);
        assert_eq!(cars[0].make, "Renault");
    }

    #[tokio::test]
    async fn fuel_type_set_membership() {
        let pool = db::init_test_pool().await;
        insert_car(&pool, "Toyota", "Corolla", 75_000_000, "available").await;
        sqlx::query("UPDATE cars SET fuel_type = 'Híbrido' WHERE make = 'Toyota'")
            .execute(&pool)
            .await
            .unwrap();
        insert_car(&pool, "Chevrolet", "Onix", 55_000_000, "available").await;

        let filters = CarFilters {
            fuel_types: "Híbrido,Eléctrico".to_string(),
            ..Default::default()
        };
        let cars = Car::list(&pool, &filters).await.unwrap();
        assert_eq!(cars.len(), 1);
        assert_eq!(cars[0].make, "Toyota");
    }

    #[tokio::test]
    async fn featured_listings_sort_first() {
        let pool = db::init_test_pool().await;
        insert_car(&pool, "Toyota", "Corolla", 75_000_000, "available").await;
        let featured = insert_car(&pool, "Mazda", "CX-30", 95_000_000, "available").await;
        sqlx::query("UPDATE cars SET is_featured = 1 WHERE id = ?")
            .bind(featured)
            .execute(&pool)
            .await
            .unwrap();

        let cars = Car::list(&pool, &CarFilters::default()).await.unwrap();
        assert_eq!(cars[0].id, featured);
    }
}
