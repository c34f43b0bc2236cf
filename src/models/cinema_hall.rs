use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use validator::Validate;

use crate::error::{ApiError, ApiResult};

/// Зал. `capacity` всегда считается как rows * seats_in_row и нигде не хранится.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CinemaHall {
    pub id: i64,
    pub name: String,
    pub rows: i32,
    pub seats_in_row: i32,
    pub capacity: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CinemaHallInput {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(range(min = 1, max = 1000))]
    pub rows: i32,
    #[validate(range(min = 1, max = 1000))]
    pub seats_in_row: i32,
}

/// Размеры зала, по которым проверяются билеты.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HallSize {
    pub rows: i32,
    pub seats_in_row: i32,
}

impl HallSize {
    pub fn capacity(&self) -> i32 {
        self.rows * self.seats_in_row
    }

    pub fn contains(&self, row: i32, seat: i32) -> bool {
        (1..=self.rows).contains(&row) && (1..=self.seats_in_row).contains(&seat)
    }
}

const HALL_COLUMNS: &str = "id, name, rows, seats_in_row, (rows * seats_in_row) AS capacity";

impl CinemaHall {
    pub async fn list(pool: &PgPool) -> Result<Vec<CinemaHall>, sqlx::Error> {
        sqlx::query_as::<_, CinemaHall>(&format!("SELECT {HALL_COLUMNS} FROM cinema_halls ORDER BY id"))
            .fetch_all(pool)
            .await
    }

    pub async fn find(pool: &PgPool, id: i64) -> Result<Option<CinemaHall>, sqlx::Error> {
        sqlx::query_as::<_, CinemaHall>(&format!("SELECT {HALL_COLUMNS} FROM cinema_halls WHERE id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn create(pool: &PgPool, input: &CinemaHallInput) -> Result<CinemaHall, sqlx::Error> {
        sqlx::query_as::<_, CinemaHall>(&format!(
            "INSERT INTO cinema_halls (name, rows, seats_in_row) VALUES ($1, $2, $3) RETURNING {HALL_COLUMNS}"
        ))
        .bind(&input.name)
        .bind(input.rows)
        .bind(input.seats_in_row)
        .fetch_one(pool)
        .await
    }

    /// Зал нельзя уменьшить так, чтобы проданные билеты оказались за его пределами.
    pub async fn update(pool: &PgPool, id: i64, input: &CinemaHallInput) -> ApiResult<Option<CinemaHall>> {
        let mut tx = pool.begin().await?;

        let hall = sqlx::query_as::<_, CinemaHall>(&format!(
            "UPDATE cinema_halls SET name = $2, rows = $3, seats_in_row = $4 WHERE id = $1 RETURNING {HALL_COLUMNS}"
        ))
        .bind(id)
        .bind(&input.name)
        .bind(input.rows)
        .bind(input.seats_in_row)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(hall) = hall else {
            return Ok(None);
        };

        let outside: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM tickets t
             JOIN movie_sessions ms ON ms.id = t.movie_session_id
             WHERE ms.cinema_hall_id = $1 AND (t.row > $2 OR t.seat > $3)",
        )
        .bind(id)
        .bind(input.rows)
        .bind(input.seats_in_row)
        .fetch_one(&mut *tx)
        .await?;

        if outside > 0 {
            return Err(ApiError::bad_request(format!(
                "{outside} sold tickets would be outside a {}x{} hall",
                input.rows, input.seats_in_row
            )));
        }

        tx.commit().await?;
        Ok(Some(hall))
    }

    pub async fn delete(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
        sqlx::query("DELETE FROM cinema_halls WHERE id = $1")
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
    fn hall_size_bounds_are_one_based_and_inclusive() {
        let hall = HallSize { rows: 10, seats_in_row: 12 };
        assert_eq!(hall.capacity(), 120);
        assert!(hall.contains(1, 1));
        assert!(hall.contains(10, 12));
        assert!(!hall.contains(0, 5));
        assert!(!hall.contains(11, 5));
        assert!(!hall.contains(5, 13));
    }

    #[test]
    fn hall_input_rejects_empty_hall() {
        let input = CinemaHallInput { name: "Blue".into(), rows: 0, seats_in_row: 10 };
        let errors = input.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("rows"));
    }
}
