use crate::core::deadline::Deadline;
use crate::domain::model::NewShop;
use crate::domain::ports::RelationalStore;
use crate::utils::error::{EntityKind, Result, ValidationError};
use std::sync::Arc;

/// Read-only reference checks run before a shop is inserted.
///
/// Seller existence, then seller enablement, then category existence. The order
/// decides which error a caller sees when several references are bad.
pub struct ValidationPipeline {
    store: Arc<dyn RelationalStore>,
}

impl ValidationPipeline {
    pub fn new(store: Arc<dyn RelationalStore>) -> Self {
        Self { store }
    }

    pub async fn validate_for_creation(&self, shop: &NewShop, deadline: Deadline) -> Result<()> {
        let seller = deadline
            .run("store.seller", self.store.seller(shop.seller_id))
            .await?
            .ok_or(ValidationError::ReferenceNotFound {
                entity: EntityKind::Seller,
                id: shop.seller_id.0,
            })?;

        if seller.disabled {
            return Err(ValidationError::EntityDisabled {
                entity: EntityKind::Seller,
                id: seller.id.0,
            }
            .into());
        }

        deadline
            .run("store.category", self.store.category(shop.category_id))
            .await?
            .ok_or(ValidationError::ReferenceNotFound {
                entity: EntityKind::Category,
                id: shop.category_id.0,
            })?;

        tracing::debug!(
            "Shop '{}' passed reference checks (seller {}, category {})",
            shop.name,
            shop.seller_id,
            shop.category_id
        );
        Ok(())
    }
}
