//! Rating submission and aggregate maintenance.
//!
//! Submissions bypass the resolver entirely: a rating targets an entity
//! that is already local, and the store keeps the derived avg/count
//! columns in step inside one transaction per mutation.

use crate::catalog_store::{CatalogStore, RatedEntity, Rating};
use crate::error::{CatalogError, CatalogResult};
use std::sync::Arc;
use tracing::debug;

pub const MIN_RATING: f64 = 0.5;
pub const MAX_RATING: f64 = 10.0;

/// Ratings move in half-point steps between [`MIN_RATING`] and
/// [`MAX_RATING`].
fn is_valid_rating(value: f64) -> bool {
    if !(MIN_RATING..=MAX_RATING).contains(&value) {
        return false;
    }
    let doubled = value * 2.0;
    (doubled - doubled.round()).abs() < f64::EPSILON
}

pub struct RatingAggregator {
    store: Arc<dyn CatalogStore>,
}

impl RatingAggregator {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    /// Insert or overwrite the user's rating and recompute the target
    /// entity's aggregates. The store performs both writes as one atomic
    /// unit with respect to concurrent submissions.
    pub fn submit_rating(
        &self,
        user_id: &str,
        entity_type: RatedEntity,
        entity_id: i64,
        value: f64,
    ) -> CatalogResult<Rating> {
        if !is_valid_rating(value) {
            return Err(CatalogError::InvalidInput(format!(
                "rating must be between {} and {} in 0.5 increments, got {}",
                MIN_RATING, MAX_RATING, value
            )));
        }

        // No rating row may exist for an entity that is not local.
        if !self.store.entity_exists(entity_type, entity_id)? {
            return Err(CatalogError::NotFound);
        }

        debug!(
            "rating {} {} #{} = {}",
            user_id,
            entity_type.as_str(),
            entity_id,
            value
        );
        Ok(self
            .store
            .upsert_rating(user_id, entity_type, entity_id, value)?)
    }

    /// The user's rating for an entity, if any. Pure read.
    pub fn get_rating(
        &self,
        user_id: &str,
        entity_type: RatedEntity,
        entity_id: i64,
    ) -> CatalogResult<Option<Rating>> {
        Ok(self.store.get_rating(user_id, entity_type, entity_id)?)
    }

    /// Remove the user's rating if present and recompute aggregates.
    /// Deleting an absent rating is not an error.
    pub fn delete_rating(
        &self,
        user_id: &str,
        entity_type: RatedEntity,
        entity_id: i64,
    ) -> CatalogResult<bool> {
        let deleted = self.store.delete_rating(user_id, entity_type, entity_id)?;
        if deleted {
            debug!(
                "removed rating {} {} #{}",
                user_id,
                entity_type.as_str(),
                entity_id
            );
        }
        Ok(deleted)
    }
}
