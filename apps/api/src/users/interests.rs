use axum::{extract::State, Json};
use sqlx::PgConnection;

use crate::errors::AppError;
use crate::models::interest::Interest;
use crate::state::AppState;

/// Trims, drops blanks and removes repeats while keeping the given order.
pub fn normalize_interest_names(names: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    names
        .iter()
        .map(|n| n.trim())
        .filter(|n| !n.is_empty())
        .filter(|n| seen.insert(n.to_lowercase()))
        .map(str::to_string)
        .collect()
}

/// Resolves a name to an interest id, creating a custom interest when the
/// catalogue has no match.
async fn resolve_interest(conn: &mut PgConnection, name: &str) -> Result<i64, AppError> {
    let existing: Option<i64> =
        sqlx::query_scalar("SELECT id FROM interests WHERE name = $1 OR code = $1 ORDER BY id LIMIT 1")
            .bind(name)
            .fetch_optional(&mut *conn)
            .await?;
    if let Some(id) = existing {
        return Ok(id);
    }

    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO interests (code, name, is_custom) VALUES ($1, $2, TRUE)
        ON CONFLICT (code) DO UPDATE SET code = EXCLUDED.code
        RETURNING id
        "#,
    )
    .bind(name.to_lowercase())
    .bind(name)
    .fetch_one(&mut *conn)
    .await?;
    Ok(id)
}

/// Replaces every interest link of a user.
pub async fn replace_user_interests(
    conn: &mut PgConnection,
    user_id: i64,
    names: &[String],
) -> Result<(), AppError> {
    sqlx::query("DELETE FROM user_interests WHERE user_id = $1")
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

    for name in normalize_interest_names(names) {
        let interest_id = resolve_interest(conn, &name).await?;
        sqlx::query(
            "INSERT INTO user_interests (user_id, interest_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(interest_id)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

pub async fn interest_names_for_user(
    conn: &mut PgConnection,
    user_id: i64,
) -> Result<Vec<String>, AppError> {
    let names = sqlx::query_scalar::<_, String>(
        r#"
        SELECT i.name
        FROM user_interests ui
        JOIN interests i ON i.id = ui.interest_id
        WHERE ui.user_id = $1
        ORDER BY ui.id
        "#,
    )
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(names)
}

/// GET /interests
pub async fn handle_list_interests(
    State(state): State<AppState>,
) -> Result<Json<Vec<Interest>>, AppError> {
    let interests = sqlx::query_as::<_, Interest>(
        "SELECT * FROM interests ORDER BY is_custom, id",
    )
    .fetch_all(&state.db)
    .await?;
    Ok(Json(interests))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_drops_blanks_and_duplicates() {
        let names = vec![
            " 사무 ".to_string(),
            "".to_string(),
            "Cooking".to_string(),
            "cooking".to_string(),
            "사무".to_string(),
        ];
        assert_eq!(normalize_interest_names(&names), vec!["사무", "Cooking"]);
    }
}
