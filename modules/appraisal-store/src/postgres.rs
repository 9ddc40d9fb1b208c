// Postgres persistence for canonical property records.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::debug;

use appraisal_common::{ConflictMode, District, Property, PropertyFilter, PropertyPatch};

use crate::error::{Result, StoreError};
use crate::store::PropertyStore;

const UPSERT_OVERWRITE: &str = r#"
    INSERT INTO properties
        (district, account_number, address, owner_name, appraised_value,
         market_value, land_value, building_area, year_built,
         neighborhood_code, state_class, last_updated)
    SELECT * FROM UNNEST(
        $1::text[], $2::text[], $3::text[], $4::text[], $5::float8[],
        $6::float8[], $7::float8[], $8::int8[], $9::text[],
        $10::text[], $11::text[], $12::timestamptz[])
    ON CONFLICT (district, account_number) DO UPDATE SET
        address = EXCLUDED.address,
        owner_name = EXCLUDED.owner_name,
        appraised_value = EXCLUDED.appraised_value,
        market_value = EXCLUDED.market_value,
        land_value = EXCLUDED.land_value,
        building_area = EXCLUDED.building_area,
        year_built = EXCLUDED.year_built,
        neighborhood_code = EXCLUDED.neighborhood_code,
        state_class = EXCLUDED.state_class,
        last_updated = EXCLUDED.last_updated
"#;

const UPSERT_SKIP_EXISTING: &str = r#"
    INSERT INTO properties
        (district, account_number, address, owner_name, appraised_value,
         market_value, land_value, building_area, year_built,
         neighborhood_code, state_class, last_updated)
    SELECT * FROM UNNEST(
        $1::text[], $2::text[], $3::text[], $4::text[], $5::float8[],
        $6::float8[], $7::float8[], $8::int8[], $9::text[],
        $10::text[], $11::text[], $12::timestamptz[])
    ON CONFLICT (district, account_number) DO NOTHING
"#;

const PATCH_EXISTING: &str = r#"
    UPDATE properties AS p SET
        address = COALESCE(u.address, p.address),
        owner_name = COALESCE(u.owner_name, p.owner_name),
        appraised_value = COALESCE(u.appraised_value, p.appraised_value),
        market_value = COALESCE(u.market_value, p.market_value),
        land_value = COALESCE(u.land_value, p.land_value),
        building_area = COALESCE(u.building_area, p.building_area),
        year_built = COALESCE(u.year_built, p.year_built),
        neighborhood_code = COALESCE(u.neighborhood_code, p.neighborhood_code),
        state_class = COALESCE(u.state_class, p.state_class),
        last_updated = now()
    FROM UNNEST(
        $1::text[], $2::text[], $3::text[], $4::text[], $5::float8[],
        $6::float8[], $7::float8[], $8::int8[], $9::text[],
        $10::text[], $11::text[])
        AS u(district, account_number, address, owner_name, appraised_value,
             market_value, land_value, building_area, year_built,
             neighborhood_code, state_class)
    WHERE p.district = u.district AND p.account_number = u.account_number
"#;

const PATCH_INSERT_NEW: &str = r#"
    INSERT INTO properties
        (district, account_number, address, owner_name, appraised_value,
         market_value, land_value, building_area, year_built,
         neighborhood_code, state_class, last_updated)
    SELECT district, account_number, COALESCE(address, ''), owner_name,
           COALESCE(appraised_value, 0), COALESCE(market_value, 0),
           COALESCE(land_value, 0), building_area, year_built,
           neighborhood_code, state_class, now()
    FROM UNNEST(
        $1::text[], $2::text[], $3::text[], $4::text[], $5::float8[],
        $6::float8[], $7::float8[], $8::int8[], $9::text[],
        $10::text[], $11::text[])
        AS u(district, account_number, address, owner_name, appraised_value,
             market_value, land_value, building_area, year_built,
             neighborhood_code, state_class)
    ON CONFLICT (district, account_number) DO NOTHING
"#;

/// A row from the properties table.
#[derive(Debug, Clone, sqlx::FromRow)]
struct PropertyRow {
    district: String,
    account_number: String,
    address: String,
    owner_name: Option<String>,
    appraised_value: f64,
    market_value: f64,
    land_value: f64,
    building_area: Option<i64>,
    year_built: Option<String>,
    neighborhood_code: Option<String>,
    state_class: Option<String>,
    last_updated: DateTime<Utc>,
}

impl TryFrom<PropertyRow> for Property {
    type Error = StoreError;

    fn try_from(row: PropertyRow) -> Result<Self> {
        let district = row
            .district
            .parse::<District>()
            .map_err(|e| StoreError::Other(e.to_string()))?;
        Ok(Property {
            account_number: row.account_number,
            district,
            address: row.address,
            owner_name: row.owner_name,
            appraised_value: row.appraised_value,
            market_value: row.market_value,
            land_value: row.land_value,
            building_area: row.building_area,
            year_built: row.year_built,
            neighborhood_code: row.neighborhood_code,
            state_class: row.state_class,
            last_updated: row.last_updated,
        })
    }
}

pub struct PgPropertyStore {
    pool: PgPool,
}

impl PgPropertyStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run the embedded SQL migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

/// Postgres rejects a statement that touches the same conflict key twice, so
/// a batch is reduced to its last occurrence per key (or first, when skipping).
fn dedupe_records(records: &[Property], mode: ConflictMode) -> Vec<&Property> {
    let mut position: HashMap<(District, &str), usize> = HashMap::new();
    let mut out: Vec<&Property> = Vec::with_capacity(records.len());
    for r in records {
        match position.get(&(r.district, r.account_number.as_str())) {
            Some(&i) if mode == ConflictMode::Overwrite => out[i] = r,
            Some(_) => {}
            None => {
                position.insert((r.district, r.account_number.as_str()), out.len());
                out.push(r);
            }
        }
    }
    out
}

/// Later patches for the same key are merged over earlier ones.
fn merge_patches(patches: &[PropertyPatch]) -> Vec<PropertyPatch> {
    let mut position: HashMap<(District, String), usize> = HashMap::new();
    let mut out: Vec<PropertyPatch> = Vec::with_capacity(patches.len());
    for p in patches {
        let key = (p.district, p.account_number.clone());
        match position.get(&key) {
            Some(&i) => {
                let merged = &mut out[i];
                merged.address = p.address.clone().or(merged.address.take());
                merged.owner_name = p.owner_name.clone().or(merged.owner_name.take());
                merged.appraised_value = p.appraised_value.or(merged.appraised_value);
                merged.market_value = p.market_value.or(merged.market_value);
                merged.land_value = p.land_value.or(merged.land_value);
                merged.building_area = p.building_area.or(merged.building_area);
                merged.year_built = p.year_built.clone().or(merged.year_built.take());
                merged.neighborhood_code =
                    p.neighborhood_code.clone().or(merged.neighborhood_code.take());
                merged.state_class = p.state_class.clone().or(merged.state_class.take());
            }
            None => {
                position.insert(key, out.len());
                out.push(p.clone());
            }
        }
    }
    out
}

/// Column arrays for UNNEST binding.
#[derive(Default)]
struct Columns {
    district: Vec<String>,
    account_number: Vec<String>,
    address: Vec<Option<String>>,
    owner_name: Vec<Option<String>>,
    appraised_value: Vec<Option<f64>>,
    market_value: Vec<Option<f64>>,
    land_value: Vec<Option<f64>>,
    building_area: Vec<Option<i64>>,
    year_built: Vec<Option<String>>,
    neighborhood_code: Vec<Option<String>>,
    state_class: Vec<Option<String>>,
}

impl Columns {
    fn push(&mut self, p: &PropertyPatch) {
        self.district.push(p.district.code().to_string());
        self.account_number.push(p.account_number.clone());
        self.address.push(p.address.clone());
        self.owner_name.push(p.owner_name.clone());
        self.appraised_value.push(p.appraised_value);
        self.market_value.push(p.market_value);
        self.land_value.push(p.land_value);
        self.building_area.push(p.building_area);
        self.year_built.push(p.year_built.clone());
        self.neighborhood_code.push(p.neighborhood_code.clone());
        self.state_class.push(p.state_class.clone());
    }

    fn bind<'q>(
        &'q self,
        query: sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>,
    ) -> sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments> {
        query
            .bind(&self.district)
            .bind(&self.account_number)
            .bind(&self.address)
            .bind(&self.owner_name)
            .bind(&self.appraised_value)
            .bind(&self.market_value)
            .bind(&self.land_value)
            .bind(&self.building_area)
            .bind(&self.year_built)
            .bind(&self.neighborhood_code)
            .bind(&self.state_class)
    }
}

/// Escape LIKE metacharacters in user-supplied text.
fn like_pattern(raw: &str) -> String {
    let escaped = raw
        .trim()
        .to_uppercase()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

#[async_trait]
impl PropertyStore for PgPropertyStore {
    async fn upsert(&self, records: &[Property], mode: ConflictMode) -> Result<u64> {
        if records.is_empty() {
            return Ok(0);
        }
        let records = dedupe_records(records, mode);

        let mut columns = Columns::default();
        let mut last_updated: Vec<DateTime<Utc>> = Vec::with_capacity(records.len());
        for r in &records {
            columns.push(&PropertyPatch::from(*r));
            last_updated.push(r.last_updated);
        }

        let sql = match mode {
            ConflictMode::Overwrite => UPSERT_OVERWRITE,
            ConflictMode::SkipExisting => UPSERT_SKIP_EXISTING,
        };
        let result = columns
            .bind(sqlx::query(sql))
            .bind(&last_updated)
            .execute(&self.pool)
            .await?;

        debug!(rows = records.len(), affected = result.rows_affected(), "Upserted batch");
        Ok(result.rows_affected())
    }

    fn supports_partial_upsert(&self) -> bool {
        true
    }

    async fn upsert_partial(&self, patches: &[PropertyPatch]) -> Result<u64> {
        if patches.is_empty() {
            return Ok(0);
        }
        let patches = merge_patches(patches);
        let mut columns = Columns::default();
        for p in &patches {
            columns.push(p);
        }

        let mut tx = self.pool.begin().await?;
        let updated = columns
            .bind(sqlx::query(PATCH_EXISTING))
            .execute(&mut *tx)
            .await?
            .rows_affected();
        let inserted = columns
            .bind(sqlx::query(PATCH_INSERT_NEW))
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tx.commit().await?;

        debug!(updated, inserted, "Merged partial batch");
        Ok(updated + inserted)
    }

    async fn query(&self, filter: &PropertyFilter) -> Result<Vec<Property>> {
        let limit = filter.limit.map(|n| i64::try_from(n).unwrap_or(i64::MAX));
        let rows = sqlx::query_as::<_, PropertyRow>(
            r#"
            SELECT * FROM properties
            WHERE ($1::text IS NULL OR district = $1)
              AND ($2::text IS NULL OR neighborhood_code = $2)
              AND ($3::text IS NULL OR account_number = $3)
              AND ($4::text IS NULL OR upper(address) LIKE $4)
            ORDER BY district, account_number
            LIMIT $5
            "#,
        )
        .bind(filter.district.map(|d| d.code()))
        .bind(filter.neighborhood_code.as_deref())
        .bind(filter.account_number.as_deref())
        .bind(filter.street_contains.as_deref().map(like_pattern))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Property::try_from).collect()
    }
}
