//! Sitemap generation.
//!
//! Emits one `<url>` entry per static route plus one per available
//! listing. Detail pages carry the listing's `updated_at` as lastmod; the
//! static pages use the generation date.

use std::path::Path;

use anyhow::Context;
use sqlx::SqlitePool;

use crate::db::Car;

/// Static routes with their crawl priority.
const STATIC_ROUTES: [(&str, &str); 4] = [
    ("/", "1.0"),
    ("/sell", "0.8"),
    ("/seguros", "0.7"),
    ("/creditos", "0.7"),
];

const CAR_PRIORITY: &str = "0.9";

fn xml_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Keep only the date part of a stored timestamp, whether it uses a space
/// or a T separator.
fn lastmod_date(timestamp: &str) -> &str {
    timestamp
        .split(|c| c == ' ' || c == 'T')
        .next()
        .unwrap_or(timestamp)
}

fn push_url(xml: &mut String, loc: &str, lastmod: &str, priority: &str) {
    xml.push_str("  <url>\n");
    xml.push_str(&format!("    <loc>{}</loc>\n", xml_escape(loc)));
    xml.push_str(&format!("    <lastmod>{}</lastmod>\n", lastmod));
    xml.push_str(&format!("    <priority>{}</priority>\n", priority));
    xml.push_str("  </url>\n");
}

/// Render the full sitemap XML for the given public base URL.
pub async fn generate(pool: &SqlitePool, public_url: &str) -> anyhow::Result<String> {
    let base = public_url.trim_end_matches('/');
    let today = chrono::Utc::now().format("%Y-%m-%d").to_string();

    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str("<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n");

    for (route, priority) in STATIC_ROUTES {
        push_url(&mut xml, &format!("{base}{route}"), &today, priority);
    }

    let cars = Car::list_available_for_sitemap(pool)
        .await
        .context("failed to list cars for the sitemap")?;
    for (id, updated_at) in &cars {
        push_url(
            &mut xml,
            &format!("{base}/car/{id}"),
            lastmod_date(updated_at),
            CAR_PRIORITY,
        );
    }

    xml.push_str("</urlset>\n");
    tracing::info!(cars = cars.len(), "sitemap generated");
    Ok(xml)
}

/// Generate the sitemap and write it to `output`.
pub async fn write_to_file(
    pool: &SqlitePool,
    public_url: &str,
    output: &Path,
) -> anyhow::Result<()> {
    let xml = generate(pool, public_url).await?;
    std::fs::write(output, xml)
        .with_context(|| format!("failed to write sitemap to {}", output.display()))?;
    tracing::info!(path = %output.display(), "sitemap written");
    Ok(())
}
