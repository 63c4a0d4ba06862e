use crate::domain::model::{
    Category, CategoryId, Coordinate, NewShop, Seller, SellerId, Shop, ShopId,
};
use crate::domain::ports::RelationalStore;
use crate::utils::error::{Result, ShopError};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

// SQLite's default bound-parameter limit is 999.
const MAX_IDS_PER_QUERY: usize = 500;

const SHOP_COLUMNS: &str = "id, name, latitude_e6, longitude_e6, price_per_person, seller_id, \
                            category_id, tags, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct SellerRow {
    id: i64,
    name: String,
    disabled: bool,
}

#[derive(Debug, sqlx::FromRow)]
struct CategoryRow {
    id: i64,
    name: String,
}

#[derive(Debug, sqlx::FromRow)]
struct ShopRow {
    id: i64,
    name: String,
    latitude_e6: i64,
    longitude_e6: i64,
    price_per_person: i64,
    seller_id: i64,
    category_id: i64,
    tags: String,
    created_at: String,
    updated_at: String,
}

impl From<SellerRow> for Seller {
    fn from(row: SellerRow) -> Self {
        Seller {
            id: SellerId(row.id),
            name: row.name,
            disabled: row.disabled,
        }
    }
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Category {
            id: CategoryId(row.id),
            name: row.name,
        }
    }
}

impl TryFrom<ShopRow> for Shop {
    type Error = ShopError;

    fn try_from(row: ShopRow) -> Result<Self> {
        let price_per_person = u32::try_from(row.price_per_person).map_err(|_| ShopError::Storage {
            message: format!("shop {} has invalid price {}", row.id, row.price_per_person),
        })?;

        Ok(Shop {
            id: ShopId(row.id),
            name: row.name,
            location: Coordinate::from_micro_degrees(row.latitude_e6, row.longitude_e6),
            price_per_person,
            seller_id: SellerId(row.seller_id),
            category_id: CategoryId(row.category_id),
            tags: decode_tags(&row.tags),
            created_at: decode_timestamp(row.id, &row.created_at)?,
            updated_at: decode_timestamp(row.id, &row.updated_at)?,
            seller: None,
            category: None,
            distance_meters: None,
        })
    }
}

fn encode_tags(tags: &[String]) -> String {
    tags.join(",")
}

fn decode_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(String::from)
        .collect()
}

fn encode_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn decode_timestamp(shop_id: i64, raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| ShopError::Storage {
            message: format!("shop {} has invalid timestamp '{}': {}", shop_id, raw, e),
        })
}

/// [`RelationalStore`] backed by SQLite through a sqlx pool.
///
/// Seller and category references are not foreign keys: sellers and categories
/// are owned elsewhere and may disappear after a shop was created.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        tracing::info!("Connected to {} (max {} connections)", url, max_connections);
        Ok(Self { pool })
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sellers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                disabled INTEGER NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS categories (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS shops (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                latitude_e6 INTEGER NOT NULL,
                longitude_e6 INTEGER NOT NULL,
                price_per_person INTEGER NOT NULL DEFAULT 0,
                seller_id INTEGER NOT NULL,
                category_id INTEGER NOT NULL,
                tags TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_shops_category ON shops(category_id)")
            .execute(&self.pool)
            .await?;

        tracing::debug!("Schema migrations applied");
        Ok(())
    }

    pub async fn insert_seller(&self, name: &str, disabled: bool) -> Result<SellerId> {
        let result = sqlx::query("INSERT INTO sellers (name, disabled) VALUES (?, ?)")
            .bind(name)
            .bind(disabled)
            .execute(&self.pool)
            .await?;
        Ok(SellerId(result.last_insert_rowid()))
    }

    pub async fn set_seller_disabled(&self, id: SellerId, disabled: bool) -> Result<()> {
        sqlx::query("UPDATE sellers SET disabled = ? WHERE id = ?")
            .bind(disabled)
            .bind(id.0)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn delete_seller(&self, id: SellerId) -> Result<()> {
        sqlx::query("DELETE FROM sellers WHERE id = ?")
            .bind(id.0)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn insert_category(&self, name: &str) -> Result<CategoryId> {
        let result = sqlx::query("INSERT INTO categories (name) VALUES (?)")
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(CategoryId(result.last_insert_rowid()))
    }

    pub async fn delete_shop(&self, id: ShopId) -> Result<()> {
        sqlx::query("DELETE FROM shops WHERE id = ?")
            .bind(id.0)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl RelationalStore for SqliteStore {
    async fn seller(&self, id: SellerId) -> Result<Option<Seller>> {
        let row: Option<SellerRow> =
            sqlx::query_as("SELECT id, name, disabled FROM sellers WHERE id = ?")
                .bind(id.0)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(Seller::from))
    }

    async fn category(&self, id: CategoryId) -> Result<Option<Category>> {
        let row: Option<CategoryRow> =
            sqlx::query_as("SELECT id, name FROM categories WHERE id = ?")
                .bind(id.0)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(Category::from))
    }

    async fn categories(&self) -> Result<Vec<Category>> {
        let rows: Vec<CategoryRow> = sqlx::query_as("SELECT id, name FROM categories ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Category::from).collect())
    }

    async fn shop(&self, id: ShopId) -> Result<Option<Shop>> {
        let sql = format!("SELECT {} FROM shops WHERE id = ?", SHOP_COLUMNS);
        let row: Option<ShopRow> = sqlx::query_as(&sql)
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Shop::try_from).transpose()
    }

    async fn shops(&self) -> Result<Vec<Shop>> {
        let sql = format!("SELECT {} FROM shops ORDER BY id", SHOP_COLUMNS);
        let rows: Vec<ShopRow> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;
        rows.into_iter().map(Shop::try_from).collect()
    }

    async fn shops_by_ids(&self, ids: &[ShopId]) -> Result<Vec<Shop>> {
        let mut shops = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(MAX_IDS_PER_QUERY) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let sql = format!(
                "SELECT {} FROM shops WHERE id IN ({})",
                SHOP_COLUMNS, placeholders
            );
            let mut query = sqlx::query_as::<_, ShopRow>(&sql);
            for id in chunk {
                query = query.bind(id.0);
            }
            for row in query.fetch_all(&self.pool).await? {
                shops.push(Shop::try_from(row)?);
            }
        }
        Ok(shops)
    }

    async fn count_shops(&self) -> Result<u64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM shops")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }

    async fn insert_shop(&self, shop: &NewShop, at: DateTime<Utc>) -> Result<ShopId> {
        let timestamp = encode_timestamp(at);
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO shops (name, latitude_e6, longitude_e6, price_per_person, seller_id,
                               category_id, tags, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&shop.name)
        .bind(shop.location.latitude_micro())
        .bind(shop.location.longitude_micro())
        .bind(i64::from(shop.price_per_person))
        .bind(shop.seller_id.0)
        .bind(shop.category_id.0)
        .bind(encode_tags(&shop.tags))
        .bind(&timestamp)
        .bind(&timestamp)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(ShopId(result.last_insert_rowid()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_encoding() {
        let tags = vec!["spicy".to_string(), "late-night".to_string()];
        assert_eq!(encode_tags(&tags), "spicy,late-night");
        assert_eq!(decode_tags("spicy, late-night,,"), tags);
        assert!(decode_tags("").is_empty());
    }

    #[test]
    fn test_timestamp_round_trip_keeps_precision() {
        let at = Utc::now();
        assert_eq!(decode_timestamp(1, &encode_timestamp(at)).unwrap(), at);
        assert!(decode_timestamp(1, "yesterday").is_err());
    }
}
