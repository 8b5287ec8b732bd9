//! Database seeders for demo data.
//!
//! A fresh install has an empty inventory, which makes the listings page
//! useless for evaluation. When enabled in config, a handful of demo
//! listings is inserted the first time the server starts.

use anyhow::Result;
use sqlx::SqlitePool;
use tracing::info;

/// Seed demo listings, but only into an empty cars table.
pub async fn seed_demo_cars(pool: &SqlitePool) -> Result<()> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cars")
        .fetch_one(pool)
        .await?;
    if count > 0 {
        return Ok(());
    }

    info!("Cars table is empty, seeding demo listings...");

    // (make, model, year, price, mileage, fuel_type, transmission, description, location)
    let cars: Vec<(&str, &str, i64, i64, i64, &str, &str, &str, &str)> = vec![
        (
            "Toyota",
            "Corolla",
            2021,
            75_000_000,
            25_000,
            "Gasolina",
            "Automática",
            "Excelente estado, único dueño, todos los mantenimientos al día.",
            "Medellín, Antioquia",
        ),
        (
            "Mazda",
            "3",
            2022,
            85_000_000,
            15_000,
            "Gasolina",
            "Automática",
            "Versión Grand Touring, como nuevo, poco uso.",
            "Bogotá, Cundinamarca",
        ),
        (
            "Chevrolet",
            "Onix",
            2020,
            55_000_000,
            45_000,
            "Gasolina",
            "Manual",
            "Económico y confiable, perfecto para la ciudad.",
            "Cali, Valle del Cauca",
        ),
        (
            "Renault",
            "Duster",
            2019,
            62_000_000,
            60_000,
            "Diesel",
            "Manual",
            "Camioneta espaciosa, ideal para viajes y familia.",
            "Medellín, Antioquia",
        ),
        (
            "Kia",
            "Picanto",
            2023,
            68_000_000,
            5_000,
            "Gasolina",
            "Automática",
            "Casi nuevo, garantía de fábrica vigente.",
            "Barranquilla, Atlántico",
        ),
        (
            "Ford",
            "Explorer",
            2018,
            110_000_000,
            75_000,
            "Gasolina",
            "Automática",
            "Full equipo, 7 puestos, en perfecto estado.",
            "Bogotá, Cundinamarca",
        ),
    ];

    let seeded = cars.len();
    for (make, model, year, price, mileage, fuel, transmission, description, location) in cars {
        sqlx::query(
            "INSERT INTO cars
                (make, model, year, price, location, mileage, fuel_type, transmission,
                 description, images, status)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'available')",
        )
        .bind(make)
        .bind(model)
        .bind(year)
        .bind(price)
        .bind(location)
        .bind(mileage)
        .bind(fuel)
        .bind(transmission)
        .bind(description)
        .bind(r#"["/placeholder-car-1.jpg","/placeholder-car-2.jpg"]"#)
        .execute(pool)
        .await?;
    }

    info!("Seeded {seeded} demo listings");
    Ok(())
}
