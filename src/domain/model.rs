use crate::utils::error::{EntityKind, ShopError};
use crate::utils::validation::{validate_non_empty_string, validate_range, Validate};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! id_type {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }
    };
}

id_type!(ShopId);
id_type!(SellerId);
id_type!(CategoryId);

pub const MICRODEGREES_PER_DEGREE: f64 = 1_000_000.0;

/// WGS84 position held as fixed-precision micro-degrees (six decimal places).
///
/// Serialized as decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coordinate {
    #[serde(with = "degrees")]
    latitude: i64,
    #[serde(with = "degrees")]
    longitude: i64,
}

impl Coordinate {
    /// Rounds both values to the nearest micro-degree.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude: degrees::to_micro(latitude),
            longitude: degrees::to_micro(longitude),
        }
    }

    pub const fn from_micro_degrees(latitude: i64, longitude: i64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn latitude(&self) -> f64 {
        degrees::from_micro(self.latitude)
    }

    pub fn longitude(&self) -> f64 {
        degrees::from_micro(self.longitude)
    }

    pub fn latitude_micro(&self) -> i64 {
        self.latitude
    }

    pub fn longitude_micro(&self) -> i64 {
        self.longitude
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.latitude(), self.longitude())
    }
}

impl Validate for Coordinate {
    fn validate(&self) -> Result<(), ShopError> {
        validate_range("latitude", self.latitude(), -90.0, 90.0)?;
        validate_range("longitude", self.longitude(), -180.0, 180.0)
    }
}

mod degrees {
    use super::MICRODEGREES_PER_DEGREE;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn to_micro(degrees: f64) -> i64 {
        // NaN maps out of range so validation rejects it; infinities saturate.
        if degrees.is_nan() {
            return i64::MIN;
        }
        (degrees * MICRODEGREES_PER_DEGREE).round() as i64
    }

    pub fn from_micro(micro: i64) -> f64 {
        micro as f64 / MICRODEGREES_PER_DEGREE
    }

    pub fn serialize<S: Serializer>(micro: &i64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(from_micro(*micro))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        f64::deserialize(deserializer).map(to_micro)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Seller {
    pub id: SellerId,
    pub name: String,
    pub disabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

/// A shop as submitted for creation, before the store assigns identity and timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewShop {
    pub name: String,
    pub location: Coordinate,
    pub price_per_person: u32,
    pub seller_id: SellerId,
    pub category_id: CategoryId,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Validate for NewShop {
    fn validate(&self) -> Result<(), ShopError> {
        validate_non_empty_string("name", &self.name)?;
        self.location.validate()?;
        if self.tags.iter().any(|tag| tag.trim().is_empty() || tag.contains(',')) {
            return Err(ShopError::invalid_argument(
                "tags",
                "Tags must be non-empty and must not contain commas",
            ));
        }
        Ok(())
    }
}

/// A persisted shop.
///
/// `seller`, `category` and `distance_meters` are derived on read and never stored.
/// Every shop handed out by the service has its snapshots attached unless the
/// referenced entity no longer exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shop {
    pub id: ShopId,
    pub name: String,
    pub location: Coordinate,
    pub price_per_person: u32,
    pub seller_id: SellerId,
    pub category_id: CategoryId,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seller: Option<Seller>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_meters: Option<f64>,
}

impl Shop {
    pub fn from_new(id: ShopId, shop: &NewShop, at: DateTime<Utc>) -> Self {
        Self {
            id,
            name: shop.name.clone(),
            location: shop.location,
            price_per_person: shop.price_per_person,
            seller_id: shop.seller_id,
            category_id: shop.category_id,
            tags: shop.tags.clone(),
            created_at: at,
            updated_at: at,
            seller: None,
            category: None,
            distance_meters: None,
        }
    }

    pub fn is_enriched(&self) -> bool {
        self.seller.is_some() && self.category.is_some()
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// One entry of a ranked keyword match. Position in the returned list is the rank;
/// the score is kept for diagnostics only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub shop_id: ShopId,
    pub score: f32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagFacet {
    pub tag: String,
    pub count: u64,
}

/// Keyword and filter scope sent to the index for both the match and the tag aggregation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IndexQuery {
    pub keyword: String,
    pub category_id: Option<CategoryId>,
    pub tag: Option<String>,
}

impl IndexQuery {
    pub fn keyword(keyword: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            ..Self::default()
        }
    }
}

/// Secondary orderings for keyword search. `Relevance` keeps the index rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderBy {
    #[default]
    Relevance,
    Distance,
    Price,
}

impl FromStr for OrderBy {
    type Err = ShopError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "relevance" => Ok(OrderBy::Relevance),
            "distance" => Ok(OrderBy::Distance),
            "price" => Ok(OrderBy::Price),
            other => Err(ShopError::invalid_argument(
                "order_by",
                format!("Unsupported ordering '{}'. Valid: relevance, distance, price", other),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub origin: Coordinate,
    pub keyword: String,
    pub order_by: OrderBy,
    pub category_id: Option<CategoryId>,
    pub tag: Option<String>,
}

impl SearchQuery {
    pub fn new(origin: Coordinate, keyword: impl Into<String>) -> Self {
        Self {
            origin,
            keyword: keyword.into(),
            order_by: OrderBy::default(),
            category_id: None,
            tag: None,
        }
    }

    pub fn order_by(mut self, order_by: OrderBy) -> Self {
        self.order_by = order_by;
        self
    }

    pub fn category(mut self, category_id: CategoryId) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn index_query(&self) -> IndexQuery {
        IndexQuery {
            keyword: self.keyword.clone(),
            category_id: self.category_id,
            tag: self.tag.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SearchOutcome {
    pub shops: Vec<Shop>,
    pub facets: Vec<TagFacet>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<Warning>,
}

/// Non-fatal conditions observed while serving a request.
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    #[error("shop {shop_id} references missing {entity} {reference_id}")]
    OrphanedReference {
        shop_id: ShopId,
        entity: EntityKind,
        reference_id: i64,
    },

    #[error("shop {shop_id} is indexed but no longer stored")]
    IndexDrift { shop_id: ShopId },

    #[error("tag facets unavailable: {reason}")]
    FacetsUnavailable { reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_by_parsing() {
        assert_eq!("".parse::<OrderBy>().unwrap(), OrderBy::Relevance);
        assert_eq!("Distance".parse::<OrderBy>().unwrap(), OrderBy::Distance);
        assert_eq!("price".parse::<OrderBy>().unwrap(), OrderBy::Price);
        assert!("rating".parse::<OrderBy>().is_err());
    }

    #[test]
    fn test_search_query_builder() {
        let query = SearchQuery::new(Coordinate::new(31.2, 121.4), "hotpot")
            .order_by(OrderBy::Distance)
            .category(CategoryId(2))
            .tag("spicy");

        let scope = query.index_query();
        assert_eq!(scope.keyword, "hotpot");
        assert_eq!(scope.category_id, Some(CategoryId(2)));
        assert_eq!(scope.tag.as_deref(), Some("spicy"));
    }

    #[test]
    fn test_coordinate_fixed_precision() {
        let a = Coordinate::new(31.230_416_4, 121.473_701_2);
        assert_eq!(a.latitude_micro(), 31_230_416);
        assert_eq!(a.longitude_micro(), 121_473_701);
        assert_eq!(a, Coordinate::new(31.230_416, 121.473_701));
        assert_eq!(Coordinate::new(-0.000_000_6, 0.0).latitude_micro(), -1);

        let json = serde_json::to_value(a).unwrap();
        assert_eq!(json["latitude"], 31.230416);
        let back: Coordinate = serde_json::from_value(json).unwrap();
        assert_eq!(back, a);
    }

    #[test]
    fn test_coordinate_rejects_non_finite() {
        assert!(Coordinate::new(f64::NAN, 0.0).validate().is_err());
        assert!(Coordinate::new(0.0, f64::INFINITY).validate().is_err());
        assert!(Coordinate::new(-90.0, 180.0).validate().is_ok());
    }

    #[test]
    fn test_derived_fields_are_not_serialized_when_absent() {
        let new_shop = NewShop {
            name: "Noodle Bar".to_string(),
            location: Coordinate::new(1.0, 2.0),
            price_per_person: 40,
            seller_id: SellerId(1),
            category_id: CategoryId(1),
            tags: vec!["quiet".to_string()],
        };
        let shop = Shop::from_new(ShopId(9), &new_shop, Utc::now());
        let json = serde_json::to_value(&shop).unwrap();

        assert_eq!(json["id"], 9);
        assert!(json.get("seller").is_none());
        assert!(json.get("distance_meters").is_none());
        assert!(!shop.is_enriched());
        assert!(shop.has_tag("quiet"));
    }
}
