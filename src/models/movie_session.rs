use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::filters::SessionFilter;
use crate::models::{CinemaHall, MovieListItem};

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct MovieSession {
    pub id: i64,
    pub show_time: NaiveDateTime,
    #[serde(rename = "movie")]
    pub movie_id: i64,
    #[serde(rename = "cinema_hall")]
    pub cinema_hall_id: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct MovieSessionInput {
    pub show_time: NaiveDateTime,
    #[validate(range(min = 1))]
    pub movie: i64,
    #[validate(range(min = 1))]
    pub cinema_hall: i64,
}

/// Строка списка сеансов с аннотациями по проданным/свободным местам.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct MovieSessionListItem {
    pub id: i64,
    pub show_time: NaiveDateTime,
    pub movie_title: String,
    pub cinema_hall_name: String,
    pub cinema_hall_capacity: i32,
    pub tickets_sold: i32,
    pub tickets_available: i32,
}

#[derive(Debug, Clone, Copy, FromRow, Serialize, Deserialize, PartialEq, Eq)]
pub struct TakenPlace {
    pub row: i32,
    pub seat: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct MovieSessionDetail {
    pub id: i64,
    pub show_time: NaiveDateTime,
    pub movie: MovieListItem,
    pub cinema_hall: CinemaHall,
    pub taken_places: Vec<TakenPlace>,
}

// capacity = rows * seats_in_row, tickets_available = capacity - tickets_sold
pub(crate) const SESSION_LIST_SELECT: &str = r#"
    SELECT
        ms.id,
        ms.show_time,
        m.title AS movie_title,
        ch.name AS cinema_hall_name,
        (ch.rows * ch.seats_in_row) AS cinema_hall_capacity,
        COUNT(t.id)::int AS tickets_sold,
        (ch.rows * ch.seats_in_row - COUNT(t.id))::int AS tickets_available
    FROM movie_sessions ms
    JOIN movies m ON m.id = ms.movie_id
    JOIN cinema_halls ch ON ch.id = ms.cinema_hall_id
    LEFT JOIN tickets t ON t.movie_session_id = ms.id
    WHERE TRUE"#;

const SESSION_LIST_TAIL: &str =
    " GROUP BY ms.id, m.title, ch.name, ch.rows, ch.seats_in_row ORDER BY ms.show_time, ms.id";

impl MovieSessionListItem {
    pub async fn list(pool: &PgPool, filter: &SessionFilter) -> Result<Vec<MovieSessionListItem>, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new(SESSION_LIST_SELECT);
        filter.push_conditions(&mut qb);
        qb.push(SESSION_LIST_TAIL);

        qb.build_query_as::<MovieSessionListItem>()
            .fetch_all(pool)
            .await
    }
}

impl MovieSession {
    pub async fn find(pool: &PgPool, id: i64) -> Result<Option<MovieSession>, sqlx::Error> {
        sqlx::query_as::<_, MovieSession>(
            "SELECT id, show_time, movie_id, cinema_hall_id FROM movie_sessions WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn create(pool: &PgPool, input: &MovieSessionInput) -> Result<MovieSession, sqlx::Error> {
        sqlx::query_as::<_, MovieSession>(
            "INSERT INTO movie_sessions (show_time, movie_id, cinema_hall_id)
             VALUES ($1, $2, $3)
             RETURNING id, show_time, movie_id, cinema_hall_id",
        )
        .bind(input.show_time)
        .bind(input.movie)
        .bind(input.cinema_hall)
        .fetch_one(pool)
        .await
    }

    /// Сеанс с проданными билетами можно перенести только в зал, где все они помещаются.
    pub async fn update(pool: &PgPool, id: i64, input: &MovieSessionInput) -> ApiResult<Option<MovieSession>> {
        let mut tx = pool.begin().await?;

        let session = sqlx::query_as::<_, MovieSession>(
            "UPDATE movie_sessions SET show_time = $2, movie_id = $3, cinema_hall_id = $4
             WHERE id = $1
             RETURNING id, show_time, movie_id, cinema_hall_id",
        )
        .bind(id)
        .bind(input.show_time)
        .bind(input.movie)
        .bind(input.cinema_hall)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(session) = session else {
            return Ok(None);
        };

        let outside: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM tickets t
             JOIN cinema_halls ch ON ch.id = $2
             WHERE t.movie_session_id = $1 AND (t.row > ch.rows OR t.seat > ch.seats_in_row)",
        )
        .bind(id)
        .bind(input.cinema_hall)
        .fetch_one(&mut *tx)
        .await?;

        if outside > 0 {
            return Err(ApiError::bad_request(format!(
                "{outside} sold tickets do not fit into cinema hall {}",
                input.cinema_hall
            )));
        }

        tx.commit().await?;
        Ok(Some(session))
    }

    pub async fn delete(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
        sqlx::query("DELETE FROM movie_sessions WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await
            .map(|r| r.rows_affected() > 0)
    }

    pub async fn taken_places(pool: &PgPool, id: i64) -> Result<Vec<TakenPlace>, sqlx::Error> {
        sqlx::query_as::<_, TakenPlace>(
            "SELECT row, seat FROM tickets WHERE movie_session_id = $1 ORDER BY row, seat",
        )
        .bind(id)
        .fetch_all(pool)
        .await
    }
}

impl MovieSessionDetail {
    pub async fn find(pool: &PgPool, id: i64) -> Result<Option<MovieSessionDetail>, sqlx::Error> {
        let Some(session) = MovieSession::find(pool, id).await? else {
            return Ok(None);
        };

        // Фильм и зал удаляются каскадно вместе с сеансом, поэтому оба должны быть на месте
        let movie = MovieListItem::find(pool, session.movie_id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?;
        let cinema_hall = CinemaHall::find(pool, session.cinema_hall_id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?;
        let taken_places = MovieSession::taken_places(pool, id).await?;

        Ok(Some(MovieSessionDetail {
            id: session.id,
            show_time: session.show_time,
            movie,
            cinema_hall,
            taken_places,
        }))
    }
}
