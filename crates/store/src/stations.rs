use model::{Line, LocalizedText, Station};
use sqlx::{FromRow, SqlitePool};

use crate::error::Result;

#[derive(Debug, FromRow)]
struct StationRow {
    id: String,
    name_ua: String,
    name_en: String,
    line: String,
    order_on_line: i64,
    transfer_to: Option<String>,
}

impl From<StationRow> for Station {
    fn from(row: StationRow) -> Self {
        Station {
            id: row.id,
            name: LocalizedText {
                ua: row.name_ua,
                en: row.name_en,
            },
            line: Line::from_key(&row.line).unwrap_or(Line::Red),
            order: row.order_on_line as u32,
            transfer_to: row.transfer_to,
        }
    }
}

/// Upserts the whole station list in one batch transaction (spec §4.B).
pub async fn save_stations(pool: &SqlitePool, stations: &[Station]) -> Result<()> {
    let mut tx = pool.begin().await?;
    for station in stations {
        sqlx::query(
            "INSERT INTO stations (id, name_ua, name_en, line, order_on_line, transfer_to)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                name_ua = excluded.name_ua,
                name_en = excluded.name_en,
                line = excluded.line,
                order_on_line = excluded.order_on_line,
                transfer_to = excluded.transfer_to",
        )
        .bind(&station.id)
        .bind(&station.name.ua)
        .bind(&station.name.en)
        .bind(station.line.key())
        .bind(station.order as i64)
        .bind(&station.transfer_to)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    Ok(())
}

pub async fn get_station(pool: &SqlitePool, id: &str) -> Result<Option<Station>> {
    let row: Option<StationRow> = sqlx::query_as(
        "SELECT id, name_ua, name_en, line, order_on_line, transfer_to
         FROM stations WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(Station::from))
}

pub async fn get_all_stations(pool: &SqlitePool) -> Result<Vec<Station>> {
    let rows: Vec<StationRow> = sqlx::query_as(
        "SELECT id, name_ua, name_en, line, order_on_line, transfer_to
         FROM stations ORDER BY line, order_on_line",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(Station::from).collect())
}
