use crate::core::deadline::Deadline;
use crate::core::enrichment::EnrichmentJoin;
use crate::domain::model::{Coordinate, Shop};
use crate::domain::ports::RelationalStore;
use crate::utils::error::Result;
use crate::utils::validation::Validate;
use std::cmp::Ordering;
use std::sync::Arc;

/// Mean Earth radius (IUGG).
pub const EARTH_RADIUS_METERS: f64 = 6_371_008.8;

/// Haversine distance between two points, in meters.
pub fn great_circle_meters(from: Coordinate, to: Coordinate) -> f64 {
    let lat1 = from.latitude().to_radians();
    let lat2 = to.latitude().to_radians();
    let d_lat = (to.latitude() - from.latitude()).to_radians();
    let d_lon = (to.longitude() - from.longitude()).to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    // clamp guards against rounding pushing `a` just above 1 for antipodal points
    2.0 * EARTH_RADIUS_METERS * a.sqrt().min(1.0).asin()
}

/// Sets `distance_meters` on every shop and sorts nearest-first, ties by id.
pub fn order_by_distance(origin: Coordinate, mut shops: Vec<Shop>) -> Vec<Shop> {
    for shop in &mut shops {
        shop.distance_meters = Some(great_circle_meters(origin, shop.location));
    }
    shops.sort_by(compare_by_distance);
    shops
}

pub(crate) fn compare_by_distance(a: &Shop, b: &Shop) -> Ordering {
    let da = a.distance_meters.unwrap_or(f64::INFINITY);
    let db = b.distance_meters.unwrap_or(f64::INFINITY);
    da.total_cmp(&db).then_with(|| a.id.cmp(&b.id))
}

pub struct GeoRecommendationEngine {
    store: Arc<dyn RelationalStore>,
    enrichment: Arc<EnrichmentJoin>,
    limit: Option<usize>,
}

impl GeoRecommendationEngine {
    pub fn new(
        store: Arc<dyn RelationalStore>,
        enrichment: Arc<EnrichmentJoin>,
        limit: Option<usize>,
    ) -> Self {
        Self {
            store,
            enrichment,
            limit,
        }
    }

    pub async fn recommend(&self, origin: Coordinate, deadline: Deadline) -> Result<Vec<Shop>> {
        origin.validate()?;

        let native = deadline
            .run("store.shops_by_distance", self.store.shops_by_distance(origin))
            .await?;
        let candidates = match native {
            Some(shops) => {
                tracing::debug!("Store ordered {} shops natively", shops.len());
                shops
            }
            None => {
                let shops = deadline.run("store.shops", self.store.shops()).await?;
                tracing::debug!("Ordering {} shops in process", shops.len());
                shops
            }
        };

        // Re-sorting a natively ordered list is cheap and pins the tie-break,
        // so both strategies agree on the final order.
        let mut ordered = order_by_distance(origin, candidates);
        if let Some(limit) = self.limit {
            ordered.truncate(limit);
        }

        let shops = self.enrichment.enrich(ordered, deadline).await?;
        tracing::info!(
            "Recommended {} shops near {}",
            shops.len(),
            origin
        );
        Ok(shops)
    }
}
