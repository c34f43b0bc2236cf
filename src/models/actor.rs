use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use validator::Validate;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Actor {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ActorInput {
    #[validate(length(min = 1, max = 255))]
    pub first_name: String,
    #[validate(length(min = 1, max = 255))]
    pub last_name: String,
}

const ACTOR_COLUMNS: &str = "id, first_name, last_name, (first_name || ' ' || last_name) AS full_name";

impl Actor {
    pub async fn list(pool: &PgPool) -> Result<Vec<Actor>, sqlx::Error> {
        sqlx::query_as::<_, Actor>(&format!("SELECT {ACTOR_COLUMNS} FROM actors ORDER BY id"))
            .fetch_all(pool)
            .await
    }

    pub async fn find(pool: &PgPool, id: i64) -> Result<Option<Actor>, sqlx::Error> {
        sqlx::query_as::<_, Actor>(&format!("SELECT {ACTOR_COLUMNS} FROM actors WHERE id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    // Актёры конкретного фильма
    pub async fn for_movie(pool: &PgPool, movie_id: i64) -> Result<Vec<Actor>, sqlx::Error> {
        sqlx::query_as::<_, Actor>(
            "SELECT a.id, a.first_name, a.last_name, (a.first_name || ' ' || a.last_name) AS full_name
             FROM actors a
             JOIN movie_actors ma ON ma.actor_id = a.id
             WHERE ma.movie_id = $1
             ORDER BY a.id",
        )
        .bind(movie_id)
        .fetch_all(pool)
        .await
    }

    pub async fn create(pool: &PgPool, input: &ActorInput) -> Result<Actor, sqlx::Error> {
        sqlx::query_as::<_, Actor>(&format!(
            "INSERT INTO actors (first_name, last_name) VALUES ($1, $2) RETURNING {ACTOR_COLUMNS}"
        ))
        .bind(&input.first_name)
        .bind(&input.last_name)
        .fetch_one(pool)
        .await
    }

    pub async fn update(pool: &PgPool, id: i64, input: &ActorInput) -> Result<Option<Actor>, sqlx::Error> {
        sqlx::query_as::<_, Actor>(&format!(
            "UPDATE actors SET first_name = $2, last_name = $3 WHERE id = $1 RETURNING {ACTOR_COLUMNS}"
        ))
        .bind(id)
        .bind(&input.first_name)
        .bind(&input.last_name)
        .fetch_optional(pool)
        .await
    }

    pub async fn delete(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
        sqlx::query("DELETE FROM actors WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await
            .map(|r| r.rows_affected() > 0)
    }
}
