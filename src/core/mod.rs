pub mod deadline;
pub mod enrichment;
pub mod geo;
pub mod search;
pub mod service;
pub mod validation;

pub use crate::domain::model::{
    Category, CategoryId, Coordinate, NewShop, OrderBy, SearchOutcome, SearchQuery, Seller,
    SellerId, Shop, ShopId, TagFacet, Warning,
};
pub use crate::domain::ports::{RelationalStore, SearchIndexGateway, WarningSink};
pub use crate::utils::error::Result;
