use std::sync::Arc;

use tracing::warn;
use uuid::Uuid;

use crate::models::{SavedItem, SavedKind};
use crate::store::SavedItemStore;

/// Bookmarks for the signed-in user. Every operation answers with a plain
/// value; a failed store call reads as "not saved" or "did not change".
#[derive(Clone)]
pub struct SavedItems {
    store: Arc<dyn SavedItemStore>,
}

impl SavedItems {
    pub fn new(store: Arc<dyn SavedItemStore>) -> Self {
        Self { store }
    }

    pub async fn is_saved(&self, user_id: Uuid, kind: SavedKind, item_id: &str) -> bool {
        match self.store.is_saved(user_id, kind, item_id).await {
            Ok(saved) => saved,
            Err(err) => {
                warn!(%user_id, %kind, item_id, error = %err, "saved-item lookup failed");
                false
            }
        }
    }

    /// True when the item ends up saved.
    pub async fn save(&self, user_id: Uuid, kind: SavedKind, item_id: &str) -> bool {
        match self.store.save(user_id, kind, item_id).await {
            Ok(_) => true,
            Err(err) => {
                warn!(%user_id, %kind, item_id, error = %err, "saving item failed");
                false
            }
        }
    }

    /// True when the item ends up not saved.
    pub async fn unsave(&self, user_id: Uuid, kind: SavedKind, item_id: &str) -> bool {
        match self.store.unsave(user_id, kind, item_id).await {
            Ok(_) => true,
            Err(err) => {
                warn!(%user_id, %kind, item_id, error = %err, "removing saved item failed");
                false
            }
        }
    }

    /// Flips the saved state and returns the state afterwards.
    pub async fn toggle(&self, user_id: Uuid, kind: SavedKind, item_id: &str) -> bool {
        let saved = self.is_saved(user_id, kind, item_id).await;
        if saved {
            !self.unsave(user_id, kind, item_id).await
        } else {
            self.save(user_id, kind, item_id).await
        }
    }

    pub async fn list(&self, user_id: Uuid, kind: SavedKind) -> Vec<SavedItem> {
        match self.store.list_saved(user_id, kind).await {
            Ok(items) => items,
            Err(err) => {
                warn!(%user_id, %kind, error = %err, "listing saved items failed");
                Vec::new()
            }
        }
    }
}
