//! Write side of product lists: create, update, remove.
//!
//! ## Outcomes
//!
//! `create`/`update`/`remove` report business failures (blank title, unknown
//! id, type change, hook veto) as a [`ProductListResponse`] with
//! `is_successful == false`. Storage failures are returned as `Err`.
//!
//! ## Hooks
//!
//! ```text
//! create: validate -> pre_create -> pre_save -> re-validate -> store
//! update: validate -> load -> type check -> pre_update -> pre_save -> re-validate -> store
//! remove: load -> delete_pre_check -> store
//! ```
//!
//! Hooks may rewrite the list, so the hook output is checked again before it
//! reaches the store: the title must not be blank, the id must be the one the
//! write started with, and a persisted list keeps its type.
//!
//! The deprecated `delete` goes straight to the store and skips
//! `delete_pre_check`.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use productlist_core::{DomainError, Message, ProductListId};
use productlist_lists::{messages, ProductList, ProductListHooks, ProductListResponse};

use crate::store::{ProductListStore, ProductListWrite, StoreError};

/// Failure of a direct [`ProductListWriter::save`].
#[derive(Debug, Error)]
pub enum ProductListError {
    #[error("product list rejected by hook")]
    Rejected(Vec<Message>),

    #[error("product list {0} not found")]
    NotFound(ProductListId),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct ProductListWriter<S: ?Sized> {
    store: Arc<S>,
    hooks: ProductListHooks,
}

impl<S: ?Sized> Clone for ProductListWriter<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            hooks: self.hooks.clone(),
        }
    }
}

impl<S: ProductListStore + ?Sized> ProductListWriter<S> {
    pub fn new(store: Arc<S>, hooks: ProductListHooks) -> Self {
        Self { store, hooks }
    }

    /// Insert when `id` is absent, otherwise update the existing list and
    /// reconcile its relation sets.
    #[instrument(skip(self, list), fields(product_list_id = ?list.id), err)]
    pub async fn save(&self, list: ProductList) -> Result<ProductList, ProductListError> {
        list.validate_title()?;
        if let Some(id) = list.id {
            let existing = self
                .store
                .find_product_list(id)
                .await?
                .ok_or(ProductListError::NotFound(id))?;
            list.ensure_same_type(&existing)?;
            return self.commit(list, Some(&existing)).await;
        }
        self.commit(list, None).await
    }

    #[instrument(skip(self, list), fields(title = %list.title, list_type = %list.list_type), err)]
    pub async fn create(&self, list: ProductList) -> Result<ProductListResponse, StoreError> {
        let list = ProductList { id: None, ..list };
        if let Err(e) = list.validate_title() {
            return Ok(rejected(list, messages::TITLE_REQUIRED, e));
        }

        let prepared = match self.hooks.pre_create.run(list.clone()) {
            Ok(prepared) => prepared,
            Err(messages) => {
                debug!(count = messages.len(), "pre-create hook vetoed");
                return Ok(ProductListResponse::failure(list, messages));
            }
        };

        match self.commit(prepared, None).await {
            Ok(saved) => {
                info!(product_list_id = ?saved.id, "product list created");
                let message = outcome_message(messages::CREATED, &saved);
                Ok(ProductListResponse::success(saved, vec![message]))
            }
            Err(e) => outcome_failure(list, e),
        }
    }

    #[instrument(skip(self, list), fields(product_list_id = ?list.id), err)]
    pub async fn update(&self, list: ProductList) -> Result<ProductListResponse, StoreError> {
        let Some(id) = list.id else {
            return Ok(ProductListResponse::failure(list, vec![Message::new(messages::ID_REQUIRED)]));
        };
        if let Err(e) = list.validate_title() {
            return Ok(rejected(list, messages::TITLE_REQUIRED, e));
        }

        let Some(existing) = self.store.find_product_list(id).await? else {
            return Ok(not_found(list, id));
        };
        if let Err(e) = list.ensure_same_type(&existing) {
            warn!(persisted = %existing.list_type, requested = %list.list_type, "list type change refused");
            return Ok(rejected(list, messages::TYPE_IMMUTABLE, e));
        }

        let prepared = match self.hooks.pre_update.run(list.clone()) {
            Ok(prepared) => prepared,
            Err(messages) => {
                debug!(count = messages.len(), "pre-update hook vetoed");
                return Ok(ProductListResponse::failure(list, messages));
            }
        };

        match self.commit(prepared, Some(&existing)).await {
            Ok(saved) => {
                info!("product list updated");
                let message = outcome_message(messages::UPDATED, &saved);
                Ok(ProductListResponse::success(saved, vec![message]))
            }
            Err(e) => outcome_failure(list, e),
        }
    }

    #[instrument(skip(self, list), fields(product_list_id = ?list.id), err)]
    pub async fn remove(&self, list: ProductList) -> Result<ProductListResponse, StoreError> {
        let Some(id) = list.id else {
            return Ok(ProductListResponse::failure(list, vec![Message::new(messages::ID_REQUIRED)]));
        };
        let Some(existing) = self.store.find_product_list(id).await? else {
            return Ok(not_found(list, id));
        };

        if let Err(messages) = self.hooks.delete_pre_check.run(existing.clone()) {
            debug!(count = messages.len(), "delete pre-check vetoed");
            return Ok(ProductListResponse::failure(existing, messages));
        }

        if !self.delete_by_id(id).await? {
            return Ok(not_found(list, id));
        }
        let message = Message::new(messages::REMOVED).with_parameter("id", id);
        Ok(ProductListResponse::success(existing, vec![message]))
    }

    /// Remove a list, ignoring a missing id. Does not consult `delete_pre_check`.
    #[deprecated(note = "use `remove`, which reports the outcome")]
    pub async fn delete(&self, list: ProductList) -> Result<(), StoreError> {
        if let Some(id) = list.id {
            self.delete_by_id(id).await?;
        }
        Ok(())
    }

    async fn delete_by_id(&self, id: ProductListId) -> Result<bool, StoreError> {
        let removed = self.store.delete_product_list(id).await?;
        if removed {
            info!(product_list_id = %id, "product list removed");
        }
        Ok(removed)
    }

    /// Run pre-save hooks, re-check what they returned against `existing`, and persist.
    async fn commit(
        &self,
        list: ProductList,
        existing: Option<&ProductList>,
    ) -> Result<ProductList, ProductListError> {
        let list = self
            .hooks
            .pre_save
            .run(list)
            .map_err(ProductListError::Rejected)?;

        list.ensure_id(existing.and_then(|e| e.id))?;
        list.validate_title()?;
        if let Some(existing) = existing {
            list.ensure_same_type(existing)?;
        }

        match self.store.save_product_list(ProductListWrite::from(&list)).await {
            Ok(saved) => Ok(saved),
            Err(StoreError::MissingRecord(id)) => Err(ProductListError::NotFound(id)),
            Err(e) => Err(e.into()),
        }
    }
}

fn outcome_message(value: &str, saved: &ProductList) -> Message {
    let message = Message::new(value).with_parameter("title", &saved.title);
    match saved.id {
        Some(id) => message.with_parameter("id", id),
        None => message,
    }
}

fn rejected(list: ProductList, value: &str, error: DomainError) -> ProductListResponse {
    let message = Message::new(value).with_parameter("error", error);
    ProductListResponse::failure(list, vec![message])
}

fn not_found(list: ProductList, id: ProductListId) -> ProductListResponse {
    debug!(product_list_id = %id, "product list not found");
    let message = Message::new(messages::NOT_FOUND).with_parameter("id", id);
    ProductListResponse::failure(list, vec![message])
}

/// Map a failed commit to a response; storage errors stay errors.
fn outcome_failure(list: ProductList, error: ProductListError) -> Result<ProductListResponse, StoreError> {
    match error {
        ProductListError::Rejected(messages) => {
            debug!(count = messages.len(), "pre-save hook vetoed");
            Ok(ProductListResponse::failure(list, messages))
        }
        ProductListError::NotFound(id) => Ok(not_found(list, id)),
        ProductListError::Domain(e) => {
            warn!(error = %e, "hook output refused");
            let value = match e {
                DomainError::TypeChanged { .. } => messages::TYPE_IMMUTABLE,
                DomainError::IdChanged { .. } => messages::ID_IMMUTABLE,
                _ => messages::TITLE_REQUIRED,
            };
            Ok(rejected(list, value, e))
        }
        ProductListError::Store(e) => Err(e),
    }
}
