//! Postgres-backed product list store.
//!
//! ## Tables
//!
//! Owned by this store (created by [`PostgresProductListStore::ensure_schema`]):
//!
//! | table | columns |
//! |-------|---------|
//! | `product_list` | `id`, `title`, `type`, `created_at`, `updated_at` |
//! | `product_list_category` | `fk_product_list`, `fk_category` |
//! | `product_list_product_concrete` | `fk_product_list`, `fk_product` |
//!
//! Read from the catalog (must already exist):
//!
//! | table | columns |
//! |-------|---------|
//! | `product` | `id` (concrete), `fk_product_abstract` |
//! | `product_category` | `fk_product_abstract`, `fk_category` |
//!
//! ## Transactions
//!
//! Saves and deletes run in one transaction each. Relation reconciliation
//! reads the current rows inside that transaction, so the diff is computed
//! against what is actually committed.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Row, Transaction};
use tracing::{instrument, Span};

use productlist_core::{CategoryId, ProductAbstractId, ProductConcreteId, ProductListId};
use productlist_lists::{Pagination, ProductList, ProductListType, RelationDiff};

use super::r#trait::{ListRelation, ProductListStore, ProductListWrite, StoreError};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS product_list (
    id          BIGSERIAL PRIMARY KEY,
    title       TEXT NOT NULL,
    type        TEXT NOT NULL CHECK (type IN ('blacklist', 'whitelist')),
    created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS product_list_category (
    fk_product_list BIGINT NOT NULL REFERENCES product_list (id),
    fk_category     BIGINT NOT NULL,
    PRIMARY KEY (fk_product_list, fk_category)
);
CREATE INDEX IF NOT EXISTS product_list_category_fk_category
    ON product_list_category (fk_category);

CREATE TABLE IF NOT EXISTS product_list_product_concrete (
    fk_product_list BIGINT NOT NULL REFERENCES product_list (id),
    fk_product      BIGINT NOT NULL,
    PRIMARY KEY (fk_product_list, fk_product)
);
CREATE INDEX IF NOT EXISTS product_list_product_concrete_fk_product
    ON product_list_product_concrete (fk_product);
"#;

/// Postgres-backed product list store.
///
/// Uses a SQLx connection pool, which is `Send + Sync` and cheap to clone.
#[derive(Debug, Clone)]
pub struct PostgresProductListStore {
    pool: Arc<PgPool>,
}

impl PostgresProductListStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create the product list tables if they do not exist.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        Ok(())
    }

    async fn relation_targets(
        tx: &mut Transaction<'_, Postgres>,
        sql: &'static str,
        id: ProductListId,
    ) -> Result<BTreeSet<i64>, StoreError> {
        let rows = sqlx::query(sql)
            .bind(id.get())
            .fetch_all(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("load_relations", e))?;

        rows.iter()
            .map(|r| r.try_get::<i64, _>(0).map_err(corrupt))
            .collect()
    }

    async fn apply_diff(
        tx: &mut Transaction<'_, Postgres>,
        delete_sql: &'static str,
        insert_sql: &'static str,
        id: ProductListId,
        diff: RelationDiff<i64>,
    ) -> Result<(), StoreError> {
        if !diff.to_remove.is_empty() {
            sqlx::query(delete_sql)
                .bind(id.get())
                .bind(&diff.to_remove)
                .execute(&mut **tx)
                .await
                .map_err(|e| map_sqlx_error("delete_relations", e))?;
        }
        if !diff.to_add.is_empty() {
            sqlx::query(insert_sql)
                .bind(id.get())
                .bind(&diff.to_add)
                .execute(&mut **tx)
                .await
                .map_err(|e| map_sqlx_error("insert_relations", e))?;
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl ProductListStore for PostgresProductListStore {
    #[instrument(skip(self), fields(product_list_id = %id), err)]
    async fn find_product_list(&self, id: ProductListId) -> Result<Option<ProductList>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, title, type, created_at, updated_at
            FROM product_list
            WHERE id = $1
            "#,
        )
        .bind(id.get())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_product_list", e))?;

        row.as_ref().map(product_list_from_row).transpose()
    }

    #[instrument(skip(self), fields(row_count = tracing::field::Empty), err)]
    async fn find_product_lists(
        &self,
        pagination: Option<Pagination>,
    ) -> Result<(Vec<ProductList>, u64), StoreError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM product_list")
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_product_lists", e))?;

        // LIMIT NULL means no limit.
        let rows = sqlx::query(
            r#"
            SELECT id, title, type, created_at, updated_at
            FROM product_list
            ORDER BY id ASC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(pagination.map(|p| i64::from(p.limit)))
        .bind(pagination.map(|p| i64::from(p.offset)).unwrap_or(0))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_product_lists", e))?;

        let lists = rows
            .iter()
            .map(product_list_from_row)
            .collect::<Result<Vec<ProductList>, StoreError>>()?;

        Span::current().record("row_count", lists.len());
        Ok((lists, u64::try_from(total).unwrap_or(0)))
    }

    #[instrument(skip(self, list_ids), fields(batch = list_ids.len()), err)]
    async fn category_relations(
        &self,
        list_ids: &[ProductListId],
    ) -> Result<Vec<(ProductListId, CategoryId)>, StoreError> {
        if list_ids.is_empty() {
            return Ok(vec![]);
        }
        let rows = sqlx::query(
            r#"
            SELECT fk_product_list, fk_category
            FROM product_list_category
            WHERE fk_product_list = ANY($1)
            ORDER BY fk_product_list, fk_category
            "#,
        )
        .bind(raw_ids(list_ids))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("category_relations", e))?;

        rows.iter().map(pair::<ProductListId, CategoryId>).collect()
    }

    #[instrument(skip(self, list_ids), fields(batch = list_ids.len()), err)]
    async fn product_concrete_relations(
        &self,
        list_ids: &[ProductListId],
    ) -> Result<Vec<(ProductListId, ProductConcreteId)>, StoreError> {
        if list_ids.is_empty() {
            return Ok(vec![]);
        }
        let rows = sqlx::query(
            r#"
            SELECT fk_product_list, fk_product
            FROM product_list_product_concrete
            WHERE fk_product_list = ANY($1)
            ORDER BY fk_product_list, fk_product
            "#,
        )
        .bind(raw_ids(list_ids))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("product_concrete_relations", e))?;

        rows.iter().map(pair::<ProductListId, ProductConcreteId>).collect()
    }

    #[instrument(skip(self, category_ids), fields(batch = category_ids.len()), err)]
    async fn list_relations_by_category_ids(
        &self,
        category_ids: &[CategoryId],
    ) -> Result<Vec<ListRelation<CategoryId>>, StoreError> {
        if category_ids.is_empty() {
            return Ok(vec![]);
        }
        let rows = sqlx::query(
            r#"
            SELECT plc.fk_product_list, pl.type, plc.fk_category
            FROM product_list_category plc
            JOIN product_list pl ON pl.id = plc.fk_product_list
            WHERE plc.fk_category = ANY($1)
            "#,
        )
        .bind(raw_ids(category_ids))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_relations_by_category_ids", e))?;

        rows.iter().map(list_relation::<CategoryId>).collect()
    }

    #[instrument(skip(self, concrete_ids), fields(batch = concrete_ids.len()), err)]
    async fn list_relations_by_product_concrete_ids(
        &self,
        concrete_ids: &[ProductConcreteId],
    ) -> Result<Vec<ListRelation<ProductConcreteId>>, StoreError> {
        if concrete_ids.is_empty() {
            return Ok(vec![]);
        }
        let rows = sqlx::query(
            r#"
            SELECT plp.fk_product_list, pl.type, plp.fk_product
            FROM product_list_product_concrete plp
            JOIN product_list pl ON pl.id = plp.fk_product_list
            WHERE plp.fk_product = ANY($1)
            "#,
        )
        .bind(raw_ids(concrete_ids))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_relations_by_product_concrete_ids", e))?;

        rows.iter().map(list_relation::<ProductConcreteId>).collect()
    }

    #[instrument(skip(self, concrete_ids), fields(batch = concrete_ids.len()), err)]
    async fn product_abstract_ids_by_concrete_ids(
        &self,
        concrete_ids: &[ProductConcreteId],
    ) -> Result<Vec<(ProductConcreteId, ProductAbstractId)>, StoreError> {
        if concrete_ids.is_empty() {
            return Ok(vec![]);
        }
        let rows = sqlx::query("SELECT id, fk_product_abstract FROM product WHERE id = ANY($1)")
            .bind(raw_ids(concrete_ids))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("product_abstract_ids_by_concrete_ids", e))?;

        rows.iter().map(pair::<ProductConcreteId, ProductAbstractId>).collect()
    }

    #[instrument(skip(self, abstract_ids), fields(batch = abstract_ids.len()), err)]
    async fn product_concrete_ids_by_abstract_ids(
        &self,
        abstract_ids: &[ProductAbstractId],
    ) -> Result<Vec<(ProductAbstractId, ProductConcreteId)>, StoreError> {
        if abstract_ids.is_empty() {
            return Ok(vec![]);
        }
        let rows = sqlx::query(
            r#"
            SELECT fk_product_abstract, id
            FROM product
            WHERE fk_product_abstract = ANY($1)
            ORDER BY id
            "#,
        )
        .bind(raw_ids(abstract_ids))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("product_concrete_ids_by_abstract_ids", e))?;

        rows.iter().map(pair::<ProductAbstractId, ProductConcreteId>).collect()
    }

    #[instrument(skip(self, abstract_ids), fields(batch = abstract_ids.len()), err)]
    async fn category_ids_by_product_abstract_ids(
        &self,
        abstract_ids: &[ProductAbstractId],
    ) -> Result<Vec<(ProductAbstractId, CategoryId)>, StoreError> {
        if abstract_ids.is_empty() {
            return Ok(vec![]);
        }
        let rows = sqlx::query(
            r#"
            SELECT fk_product_abstract, fk_category
            FROM product_category
            WHERE fk_product_abstract = ANY($1)
            "#,
        )
        .bind(raw_ids(abstract_ids))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("category_ids_by_product_abstract_ids", e))?;

        rows.iter().map(pair::<ProductAbstractId, CategoryId>).collect()
    }

    #[instrument(
        skip(self, write),
        fields(
            product_list_id = ?write.id,
            categories = write.category_ids.len(),
            products = write.product_concrete_ids.len()
        ),
        err
    )]
    async fn save_product_list(&self, write: ProductListWrite) -> Result<ProductList, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let row = match write.id {
            Some(id) => {
                let updated = sqlx::query(
                    r#"
                    UPDATE product_list
                    SET title = $2, type = $3, updated_at = NOW()
                    WHERE id = $1
                    RETURNING id, title, type, created_at, updated_at
                    "#,
                )
                .bind(id.get())
                .bind(&write.title)
                .bind(write.list_type.as_str())
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("update_product_list", e))?;

                match updated {
                    Some(row) => row,
                    None => {
                        tx.rollback()
                            .await
                            .map_err(|e| map_sqlx_error("rollback", e))?;
                        return Err(StoreError::MissingRecord(id));
                    }
                }
            }
            None => sqlx::query(
                r#"
                INSERT INTO product_list (title, type)
                VALUES ($1, $2)
                RETURNING id, title, type, created_at, updated_at
                "#,
            )
            .bind(&write.title)
            .bind(write.list_type.as_str())
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("insert_product_list", e))?,
        };

        let base = product_list_from_row(&row)?;
        let Some(id) = base.id else {
            return Err(StoreError::CorruptRow("saved list row has no id".to_string()));
        };

        let current = Self::relation_targets(
            &mut tx,
            "SELECT fk_category FROM product_list_category WHERE fk_product_list = $1",
            id,
        )
        .await?;
        let desired: BTreeSet<i64> = write.category_ids.iter().map(|c| c.get()).collect();
        Self::apply_diff(
            &mut tx,
            "DELETE FROM product_list_category WHERE fk_product_list = $1 AND fk_category = ANY($2)",
            "INSERT INTO product_list_category (fk_product_list, fk_category) SELECT $1, UNNEST($2::BIGINT[])",
            id,
            RelationDiff::between(&current, &desired),
        )
        .await?;

        let current = Self::relation_targets(
            &mut tx,
            "SELECT fk_product FROM product_list_product_concrete WHERE fk_product_list = $1",
            id,
        )
        .await?;
        let desired: BTreeSet<i64> = write.product_concrete_ids.iter().map(|p| p.get()).collect();
        Self::apply_diff(
            &mut tx,
            "DELETE FROM product_list_product_concrete WHERE fk_product_list = $1 AND fk_product = ANY($2)",
            "INSERT INTO product_list_product_concrete (fk_product_list, fk_product) SELECT $1, UNNEST($2::BIGINT[])",
            id,
            RelationDiff::between(&current, &desired),
        )
        .await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))?;

        Ok(ProductList {
            category_ids: write.category_ids,
            product_concrete_ids: write.product_concrete_ids,
            ..base
        })
    }

    #[instrument(skip(self), fields(product_list_id = %id), err)]
    async fn delete_product_list(&self, id: ProductListId) -> Result<bool, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        // Children before parent (foreign keys).
        for sql in [
            "DELETE FROM product_list_category WHERE fk_product_list = $1",
            "DELETE FROM product_list_product_concrete WHERE fk_product_list = $1",
        ] {
            sqlx::query(sql)
                .bind(id.get())
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("delete_relations", e))?;
        }

        let deleted = sqlx::query("DELETE FROM product_list WHERE id = $1")
            .bind(id.get())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_product_list", e))?
            .rows_affected();

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))?;

        Ok(deleted > 0)
    }
}

fn map_sqlx_error(operation: &'static str, err: sqlx::Error) -> StoreError {
    let message = match err {
        sqlx::Error::Database(db_err) => match db_err.code() {
            Some(code) => format!("{} (code {})", db_err.message(), code),
            None => db_err.message().to_string(),
        },
        other => other.to_string(),
    };
    StoreError::Database { operation, message }
}

fn corrupt(err: sqlx::Error) -> StoreError {
    StoreError::CorruptRow(err.to_string())
}

fn raw_ids<T: Copy + Into<i64>>(ids: &[T]) -> Vec<i64> {
    ids.iter().map(|id| (*id).into()).collect()
}

fn pair<A: From<i64>, B: From<i64>>(row: &sqlx::postgres::PgRow) -> Result<(A, B), StoreError> {
    let a: i64 = row.try_get(0).map_err(corrupt)?;
    let b: i64 = row.try_get(1).map_err(corrupt)?;
    Ok((A::from(a), B::from(b)))
}

fn list_relation<T: From<i64>>(row: &sqlx::postgres::PgRow) -> Result<ListRelation<T>, StoreError> {
    let list_id: i64 = row.try_get(0).map_err(corrupt)?;
    let list_type: String = row.try_get(1).map_err(corrupt)?;
    let target: i64 = row.try_get(2).map_err(corrupt)?;
    Ok(ListRelation {
        product_list_id: ProductListId::new(list_id),
        list_type: parse_list_type(&list_type)?,
        target: T::from(target),
    })
}

fn product_list_from_row(row: &sqlx::postgres::PgRow) -> Result<ProductList, StoreError> {
    ProductListRow::from_row(row).map_err(corrupt)?.try_into()
}

fn parse_list_type(raw: &str) -> Result<ProductListType, StoreError> {
    raw.parse()
        .map_err(|e| StoreError::CorruptRow(format!("product_list.type: {e}")))
}

#[derive(Debug)]
struct ProductListRow {
    id: i64,
    title: String,
    list_type: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for ProductListRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(ProductListRow {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            list_type: row.try_get("type")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl TryFrom<ProductListRow> for ProductList {
    type Error = StoreError;

    fn try_from(row: ProductListRow) -> Result<Self, Self::Error> {
        let mut list = ProductList::new(row.title, parse_list_type(&row.list_type)?)
            .with_id(ProductListId::new(row.id));
        list.created_at = Some(row.created_at);
        list.updated_at = Some(row.updated_at);
        Ok(list)
    }
}
