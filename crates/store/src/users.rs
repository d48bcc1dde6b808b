use model::Lang;
use sqlx::SqlitePool;

use crate::error::Result;

pub async fn get_language(pool: &SqlitePool, user_id: i64) -> Result<Option<Lang>> {
    let row: Option<(Option<String>,)> =
        sqlx::query_as("SELECT language FROM users WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(pool)
            .await?;
    Ok(row.and_then(|(lang,)| lang).and_then(|code| Lang::from_code(&code)))
}

pub async fn set_language(pool: &SqlitePool, user_id: i64, lang: Lang) -> Result<()> {
    let lang_key = match lang {
        Lang::Ua => "ua",
        Lang::En => "en",
    };
    sqlx::query(
        "INSERT INTO users (user_id, language) VALUES (?, ?)
         ON CONFLICT(user_id) DO UPDATE SET language = excluded.language",
    )
    .bind(user_id)
    .bind(lang_key)
    .execute(pool)
    .await?;
    Ok(())
}
