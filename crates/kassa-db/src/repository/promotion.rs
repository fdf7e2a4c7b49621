//! # Promotion Repository
//!
//! The promotion directory. Authoring is minimal: promotions are upserted
//! whole and switched on or off.

use chrono::Utc;
use kassa_core::promotion::applicable_promotions;
use kassa_core::{CartItem, Promotion};
use sqlx::types::Json;
use sqlx::{SqliteExecutor, SqlitePool};
use tracing::info;

use crate::error::{DbError, DbResult};

#[derive(Debug, Clone)]
pub struct PromotionRepository {
    pool: SqlitePool,
}

impl PromotionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PromotionRepository { pool }
    }

    pub async fn get(&self, id: &str) -> DbResult<Promotion> {
        find_promotion(&self.pool, id)
            .await?
            .ok_or_else(|| DbError::not_found("Promotion", id))
    }

    /// All promotions, active first, then by name.
    pub async fn list(&self) -> DbResult<Vec<Promotion>> {
        let promotions =
            sqlx::query_as::<_, Promotion>("SELECT * FROM promotions ORDER BY is_active DESC, name")
                .fetch_all(&self.pool)
                .await?;
        Ok(promotions)
    }

    /// Active promotions whose conditions all hold for `items`.
    pub async fn applicable(&self, items: &[CartItem]) -> DbResult<Vec<Promotion>> {
        let active = sqlx::query_as::<_, Promotion>("SELECT * FROM promotions WHERE is_active = 1 ORDER BY name")
            .fetch_all(&self.pool)
            .await?;

        Ok(applicable_promotions(&active, items).into_iter().cloned().collect())
    }

    /// Inserts or replaces a promotion.
    pub async fn upsert(&self, promotion: &Promotion) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO promotions (id, name, is_active, conditions, result, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                is_active = excluded.is_active,
                conditions = excluded.conditions,
                result = excluded.result
            "#,
        )
        .bind(&promotion.id)
        .bind(&promotion.name)
        .bind(promotion.is_active)
        .bind(Json(&promotion.conditions))
        .bind(Json(&promotion.result))
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        info!(promotion_id = %promotion.id, active = promotion.is_active, "Promotion saved");
        Ok(())
    }

    pub async fn set_active(&self, id: &str, active: bool) -> DbResult<()> {
        let result = sqlx::query("UPDATE promotions SET is_active = ? WHERE id = ?")
            .bind(active)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Promotion", id));
        }
        Ok(())
    }
}

pub(crate) async fn find_promotion<'e>(executor: impl SqliteExecutor<'e>, id: &str) -> DbResult<Option<Promotion>> {
    let promotion = sqlx::query_as::<_, Promotion>("SELECT * FROM promotions WHERE id = ?")
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(promotion)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::testing::database;
    use kassa_core::{DiscountKind, Money, PromotionResult};

    fn fixed(id: &str, value: i64) -> Promotion {
        Promotion {
            id: id.into(),
            name: format!("Minus {value}"),
            is_active: true,
            conditions: vec![],
            result: PromotionResult {
                kind: DiscountKind::FixedDiscount,
                value,
            },
        }
    }

    #[tokio::test]
    async fn test_upsert_replaces_and_toggles() {
        let db = database().await;
        db.promotions().upsert(&fixed("p-1", 50)).await.unwrap();
        db.promotions().upsert(&fixed("p-1", 70)).await.unwrap();

        let stored = db.promotions().get("p-1").await.unwrap();
        assert_eq!(stored.result.value, 70);
        assert_eq!(db.promotions().list().await.unwrap().len(), 1);

        db.promotions().set_active("p-1", false).await.unwrap();
        assert!(db.promotions().applicable(&[]).await.unwrap().is_empty());

        let err = db.promotions().set_active("missing", true).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_applicable_filters_active() {
        let db = database().await;
        db.promotions().upsert(&fixed("p-1", 50)).await.unwrap();

        let items = vec![CartItem {
            service_id: "l-1".into(),
            product_id: "soup".into(),
            name: "Soup".into(),
            category: "kitchen".into(),
            category_id: None,
            price: Money::from_major(100),
            quantity: 1,
            modifiers: vec![],
            subtotal: Money::from_major(100),
            discount: Money::zero(),
        }];
        let applicable = db.promotions().applicable(&items).await.unwrap();
        assert_eq!(applicable.len(), 1);
        assert_eq!(applicable[0].id, "p-1");
    }
}
