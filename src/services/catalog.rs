//! Catalog management service

use validator::Validate;

use crate::{
    error::AppResult,
    models::item::{normalize_identifier, CatalogItem, CreateItem, UpdateItem},
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// List every item, or only those with a copy available
    pub async fn list_items(&self, available_only: bool) -> AppResult<Vec<CatalogItem>> {
        self.repository.items.list(available_only).await
    }

    pub async fn get_item(&self, id: i32) -> AppResult<CatalogItem> {
        self.repository.items.get_by_id(id).await
    }

    /// Create an item; all copies start on the shelf
    pub async fn create_item(&self, mut item: CreateItem, added_by: i32) -> AppResult<CatalogItem> {
        item.validate()?;
        item.identifier = normalize_identifier(item.identifier);
        let created = self.repository.items.create(&item, added_by).await?;
        tracing::info!(item_id = created.id, total_stock = created.total_stock, "Library item created");
        Ok(created)
    }

    /// Update descriptive fields and, under the item's row lock, its stock size
    pub async fn update_item(&self, id: i32, update: UpdateItem) -> AppResult<CatalogItem> {
        update.validate()?;

        let mut tx = self.repository.begin().await?;
        let mut item = self.repository.items.lock(&mut tx, id).await?;

        if let Some(total_stock) = update.total_stock {
            item.resize(total_stock)?;
        }
        if let Some(name) = update.name {
            item.name = name;
        }
        if let Some(writer) = update.writer {
            item.writer = writer;
        }
        if update.identifier.is_some() {
            item.identifier = normalize_identifier(update.identifier);
        }

        let saved = self.repository.items.save(&mut tx, &item).await?;
        tx.commit().await?;
        Ok(saved)
    }

    pub async fn delete_item(&self, id: i32) -> AppResult<()> {
        self.repository.items.delete(id).await?;
        tracing::info!(item_id = id, "Library item deleted");
        Ok(())
    }
}
