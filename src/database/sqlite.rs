//! SQLite implementation of the Database trait
//!
//! This module provides a SQLite-based implementation of the Database trait
//! using rusqlite and tokio-rusqlite for async operations. The merge-upsert
//! reconciles a table's scoped subset to an incoming batch inside one
//! transaction, using the native `ON CONFLICT ... DO UPDATE` statement with
//! bound parameters.

use async_trait::async_trait;
use rusqlite::ToSql;
use std::collections::HashMap;
use tokio_rusqlite::Connection;

use super::migrations::CREATE_SCHEMA;
use super::{Database, SearchBounds};
use crate::error::DbError;
use crate::models::{coord_to_int, LiveVehicle, RestrictedArea, VendorService};
use crate::sync::component::{MergeSpec, SyncRow};

/// SQLite database implementation
pub struct SqliteDatabase {
    conn: Connection,
}

impl SqliteDatabase {
    /// Create a new SQLite database connection
    ///
    /// Use `:memory:` for an in-memory database or a file path for persistent
    /// storage.
    pub async fn new(path: &str) -> Result<Self, DbError> {
        let conn = Connection::open(path).await?;

        // Run migrations
        conn.call(|conn| {
            conn.execute_batch(CREATE_SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    /// Create a new in-memory database (useful for testing)
    pub async fn in_memory() -> Result<Self, DbError> {
        Self::new(":memory:").await
    }
}

#[async_trait]
impl Database for SqliteDatabase {
    // =========================================================================
    // Vendor service operations
    // =========================================================================

    async fn insert_vendor_service(&self, service: &VendorService) -> Result<i64, DbError> {
        let vendor_slug = service.vendor_slug.clone();
        let name = service.name.clone();
        let category = service.category.clone();
        let constraints =
            serde_json::to_string(&service.constraints).unwrap_or_else(|_| "[]".to_string());

        let id = self
            .conn
            .call(move |conn| {
                conn.execute(
                    r#"
                    INSERT INTO vendor_services (vendor_slug, name, category, constraints)
                    VALUES (?1, ?2, ?3, ?4)
                    "#,
                    rusqlite::params![vendor_slug, name, category, constraints],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await?;

        Ok(id)
    }

    async fn list_vendor_services(&self, vendor_slug: &str) -> Result<Vec<VendorService>, DbError> {
        let vendor_slug = vendor_slug.to_string();

        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    r#"
                    SELECT id, vendor_slug, name, category, constraints
                    FROM vendor_services
                    WHERE vendor_slug = ?1 AND category = 'mobility'
                    ORDER BY id
                    "#,
                )?;

                let services = stmt
                    .query_map([&vendor_slug], |row| {
                        let constraints: String = row.get(4)?;
                        Ok(VendorService {
                            id: Some(row.get(0)?),
                            vendor_slug: row.get(1)?,
                            name: row.get(2)?,
                            category: row.get(3)?,
                            constraints: serde_json::from_str(&constraints).unwrap_or_default(),
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;

                Ok(services)
            })
            .await
            .map_err(Into::into)
    }

    // =========================================================================
    // Merge-upsert
    // =========================================================================

    async fn merge_rows(
        &self,
        spec: &MergeSpec,
        scope: &[i64],
        rows: Vec<SyncRow>,
    ) -> Result<u64, DbError> {
        let spec = *spec;
        let scope = scope.to_vec();

        let written = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;

                // Group incoming external ids per scoped service. Services
                // with nothing incoming lose all their rows.
                let mut keep: HashMap<i64, Vec<&str>> =
                    scope.iter().map(|id| (*id, Vec::new())).collect();
                for row in &rows {
                    keep.entry(row.vendor_service_id)
                        .or_default()
                        .push(row.external_id.as_str());
                }

                for (service_id, ids) in &keep {
                    if ids.is_empty() {
                        tx.execute(
                            &format!(
                                "DELETE FROM {} WHERE vendor_service_id = ?1",
                                spec.table
                            ),
                            rusqlite::params![service_id],
                        )?;
                    } else {
                        let placeholders = (0..ids.len())
                            .map(|i| format!("?{}", i + 2))
                            .collect::<Vec<_>>()
                            .join(", ");
                        let sql = format!(
                            "DELETE FROM {} WHERE vendor_service_id = ?1 AND {} NOT IN ({})",
                            spec.table, spec.external_id_column, placeholders
                        );
                        let mut params: Vec<&dyn ToSql> = Vec::with_capacity(ids.len() + 1);
                        params.push(service_id);
                        for id in ids {
                            params.push(id);
                        }
                        tx.execute(&sql, params.as_slice())?;
                    }
                }

                if !rows.is_empty() {
                    let columns = spec.insert_columns.join(", ");
                    let placeholders = (0..spec.insert_columns.len() + 2)
                        .map(|i| format!("?{}", i + 1))
                        .collect::<Vec<_>>()
                        .join(", ");
                    let conflict_action = if spec.update_columns.is_empty() {
                        "DO NOTHING".to_string()
                    } else {
                        let updates = spec
                            .update_columns
                            .iter()
                            .map(|col| format!("{col} = excluded.{col}"))
                            .collect::<Vec<_>>()
                            .join(", ");
                        format!("DO UPDATE SET {updates}")
                    };
                    let sql = format!(
                        "INSERT INTO {} (vendor_service_id, {}, {}) VALUES ({}) \
                         ON CONFLICT(vendor_service_id, {}) {}",
                        spec.table,
                        spec.external_id_column,
                        columns,
                        placeholders,
                        spec.external_id_column,
                        conflict_action
                    );

                    let mut stmt = tx.prepare(&sql)?;
                    for row in &rows {
                        let mut params: Vec<&dyn ToSql> =
                            Vec::with_capacity(row.values.len() + 2);
                        params.push(&row.vendor_service_id);
                        params.push(&row.external_id);
                        for value in &row.values {
                            params.push(value);
                        }
                        stmt.execute(params.as_slice())?;
                    }
                    drop(stmt);
                }

                tx.commit()?;
                Ok(rows.len() as u64)
            })
            .await?;

        Ok(written)
    }

    // =========================================================================
    // Read models
    // =========================================================================

    async fn list_vehicles(&self, vendor_service_id: i64) -> Result<Vec<LiveVehicle>, DbError> {
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    r#"
                    SELECT id, vendor_service_id, vehicle_id, lat, lng, lat_int, lng_int,
                           vehicle_type, battery_level, rental_uris
                    FROM mobility_vehicles
                    WHERE vendor_service_id = ?1
                    ORDER BY vehicle_id
                    "#,
                )?;

                let vehicles = stmt
                    .query_map([vendor_service_id], vehicle_from_row)?
                    .collect::<Result<Vec<_>, _>>()?;

                Ok(vehicles)
            })
            .await
            .map_err(Into::into)
    }

    async fn search_vehicles(&self, bounds: SearchBounds) -> Result<Vec<LiveVehicle>, DbError> {
        let min_lat = coord_to_int(bounds.min_lat);
        let max_lat = coord_to_int(bounds.max_lat);
        let min_lng = coord_to_int(bounds.min_lng);
        let max_lng = coord_to_int(bounds.max_lng);

        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    r#"
                    SELECT id, vendor_service_id, vehicle_id, lat, lng, lat_int, lng_int,
                           vehicle_type, battery_level, rental_uris
                    FROM mobility_vehicles
                    WHERE lat_int BETWEEN ?1 AND ?2 AND lng_int BETWEEN ?3 AND ?4
                    ORDER BY vehicle_id
                    "#,
                )?;

                let vehicles = stmt
                    .query_map(
                        rusqlite::params![min_lat, max_lat, min_lng, max_lng],
                        vehicle_from_row,
                    )?
                    .collect::<Result<Vec<_>, _>>()?;

                Ok(vehicles)
            })
            .await
            .map_err(Into::into)
    }

    async fn list_restricted_areas(
        &self,
        vendor_service_id: i64,
    ) -> Result<Vec<RestrictedArea>, DbError> {
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    r#"
                    SELECT id, vendor_service_id, unique_id, title, restriction, multipolygon
                    FROM restricted_areas
                    WHERE vendor_service_id = ?1
                    ORDER BY unique_id
                    "#,
                )?;

                let areas = stmt
                    .query_map([vendor_service_id], |row| {
                        let restriction: String = row.get(4)?;
                        let multipolygon: String = row.get(5)?;
                        Ok(RestrictedArea {
                            id: Some(row.get(0)?),
                            vendor_service_id: row.get(1)?,
                            unique_id: row.get(2)?,
                            title: row.get(3)?,
                            restriction: restriction.parse().map_err(|e: String| {
                                rusqlite::Error::FromSqlConversionFailure(
                                    4,
                                    rusqlite::types::Type::Text,
                                    e.into(),
                                )
                            })?,
                            multipolygon: serde_json::from_str(&multipolygon).unwrap_or_default(),
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;

                Ok(areas)
            })
            .await
            .map_err(Into::into)
    }
}

/// Map one `mobility_vehicles` row to the domain model
fn vehicle_from_row(row: &rusqlite::Row<'_>) -> Result<LiveVehicle, rusqlite::Error> {
    let vehicle_type: String = row.get(7)?;
    let rental_uris: String = row.get(9)?;
    Ok(LiveVehicle {
        id: Some(row.get(0)?),
        vendor_service_id: row.get(1)?,
        vehicle_id: row.get(2)?,
        lat: row.get(3)?,
        lng: row.get(4)?,
        lat_int: row.get(5)?,
        lng_int: row.get(6)?,
        vehicle_type: vehicle_type.parse().map_err(|e: String| {
            rusqlite::Error::FromSqlConversionFailure(7, rusqlite::types::Type::Text, e.into())
        })?,
        battery_level: row.get::<_, Option<i64>>(8)?.map(|b| b as u8),
        rental_uris: serde_json::from_str(&rental_uris)
            .unwrap_or_else(|_| serde_json::json!({})),
    })
}
