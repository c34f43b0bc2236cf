use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use validator::Validate;

use crate::filters::MovieFilter;
use crate::models::{Actor, Genre};

/// Строка списка фильмов: жанры и актёры уже свёрнуты в имена.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct MovieListItem {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub duration: i32,
    pub genres: Vec<String>,
    pub actors: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MovieDetail {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub duration: i32,
    pub genres: Vec<Genre>,
    pub actors: Vec<Actor>,
}

/// Фильм в том виде, в котором он пишется: связи - списками id.
#[derive(Debug, Clone, Serialize)]
pub struct MovieRecord {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub duration: i32,
    pub genres: Vec<i64>,
    pub actors: Vec<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct MovieInput {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[validate(range(min = 1))]
    pub duration: i32,
    #[serde(default)]
    pub genres: Vec<i64>,
    #[serde(default)]
    pub actors: Vec<i64>,
}

#[derive(FromRow)]
struct MovieRow {
    id: i64,
    title: String,
    description: String,
    duration: i32,
}

pub(crate) const MOVIE_LIST_SELECT: &str = r#"
    SELECT
        m.id,
        m.title,
        m.description,
        m.duration,
        ARRAY(
            SELECT g.name FROM genres g
            JOIN movie_genres mg ON mg.genre_id = g.id
            WHERE mg.movie_id = m.id
            ORDER BY g.id
        )::text[] AS genres,
        ARRAY(
            SELECT a.first_name || ' ' || a.last_name FROM actors a
            JOIN movie_actors ma ON ma.actor_id = a.id
            WHERE ma.movie_id = m.id
            ORDER BY a.id
        )::text[] AS actors
    FROM movies m
    WHERE TRUE"#;

fn unique_ids(ids: &[i64]) -> Vec<i64> {
    let mut ids = ids.to_vec();
    ids.sort_unstable();
    ids.dedup();
    ids
}

impl MovieListItem {
    pub async fn list(pool: &PgPool, filter: &MovieFilter) -> Result<Vec<MovieListItem>, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new(MOVIE_LIST_SELECT);
        filter.push_conditions(&mut qb);
        qb.push(" ORDER BY m.id");

        qb.build_query_as::<MovieListItem>()
            .fetch_all(pool)
            .await
    }

    pub async fn find(pool: &PgPool, id: i64) -> Result<Option<MovieListItem>, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new(MOVIE_LIST_SELECT);
        qb.push(" AND m.id = ");
        qb.push_bind(id);

        qb.build_query_as::<MovieListItem>()
            .fetch_optional(pool)
            .await
    }
}

impl MovieDetail {
    pub async fn find(pool: &PgPool, id: i64) -> Result<Option<MovieDetail>, sqlx::Error> {
        let row = sqlx::query_as::<_, MovieRow>(
            "SELECT id, title, description, duration FROM movies WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let genres = Genre::for_movie(pool, id).await?;
        let actors = Actor::for_movie(pool, id).await?;

        Ok(Some(MovieDetail {
            id: row.id,
            title: row.title,
            description: row.description,
            duration: row.duration,
            genres,
            actors,
        }))
    }
}

impl MovieRecord {
    pub async fn create(pool: &PgPool, input: &MovieInput) -> Result<MovieRecord, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO movies (title, description, duration) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(&input.title)
        .bind(&input.description)
        .bind(input.duration)
        .fetch_one(&mut *tx)
        .await?;

        let genres = unique_ids(&input.genres);
        let actors = unique_ids(&input.actors);
        Self::link(&mut tx, id, &genres, &actors).await?;

        tx.commit().await?;

        Ok(MovieRecord {
            id,
            title: input.title.clone(),
            description: input.description.clone(),
            duration: input.duration,
            genres,
            actors,
        })
    }

    pub async fn update(pool: &PgPool, id: i64, input: &MovieInput) -> Result<Option<MovieRecord>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE movies SET title = $2, description = $3, duration = $4 WHERE id = $1",
        )
        .bind(id)
        .bind(&input.title)
        .bind(&input.description)
        .bind(input.duration)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if updated == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        // Связи переписываются целиком
        sqlx::query("DELETE FROM movie_genres WHERE movie_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM movie_actors WHERE movie_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let genres = unique_ids(&input.genres);
        let actors = unique_ids(&input.actors);
        Self::link(&mut tx, id, &genres, &actors).await?;

        tx.commit().await?;

        Ok(Some(MovieRecord {
            id,
            title: input.title.clone(),
            description: input.description.clone(),
            duration: input.duration,
            genres,
            actors,
        }))
    }

    async fn link(
        tx: &mut sqlx::Transaction<'_, Postgres>,
        movie_id: i64,
        genres: &[i64],
        actors: &[i64],
    ) -> Result<(), sqlx::Error> {
        if !genres.is_empty() {
            sqlx::query("INSERT INTO movie_genres (movie_id, genre_id) SELECT $1, UNNEST($2::bigint[])")
                .bind(movie_id)
                .bind(genres)
                .execute(&mut **tx)
                .await?;
        }
        if !actors.is_empty() {
            sqlx::query("INSERT INTO movie_actors (movie_id, actor_id) SELECT $1, UNNEST($2::bigint[])")
                .bind(movie_id)
                .bind(actors)
                .execute(&mut **tx)
                .await?;
        }
        Ok(())
    }

    pub async fn delete(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
        sqlx::query("DELETE FROM movies WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await
            .map(|r| r.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_ids_sorts_and_dedups() {
        assert_eq!(unique_ids(&[3, 1, 3, 2, 1]), vec![1, 2, 3]);
        assert!(unique_ids(&[]).is_empty());
    }

    #[test]
    fn list_query_orders_after_filters() {
        let filter = MovieFilter {
            genres: Some(vec![1]),
            actors: None,
            title: Some("dune".into()),
        };
        let mut qb = QueryBuilder::<Postgres>::new(MOVIE_LIST_SELECT);
        filter.push_conditions(&mut qb);
        qb.push(" ORDER BY m.id");

        let sql = qb.sql();
        let where_at = sql.find("WHERE TRUE").unwrap();
        let order_at = sql.find("ORDER BY m.id").unwrap();
        assert!(where_at < sql.find("m.title ILIKE").unwrap());
        assert!(sql.find("m.title ILIKE").unwrap() < order_at);
    }

    #[test]
    fn movie_input_requires_title_and_duration() {
        let input: MovieInput = serde_json::from_value(serde_json::json!({
            "title": "",
            "duration": 0
        }))
        .unwrap();
        let errors = input.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("title"));
        assert!(fields.contains_key("duration"));
        assert!(input.genres.is_empty());
    }
}
