//! Оформление заказов.
//!
//! Заказ и его билеты пишутся одной транзакцией. Каждый билет проверяется по
//! размерам зала своего сеанса; уже проданное место отсекает уникальный индекс
//! `(movie_session_id, row, seat)`, так что свободных мест не бывает меньше нуля.

use sqlx::{PgPool, Postgres, Transaction};
use std::collections::{HashMap, HashSet};
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::models::cinema_hall::HallSize;
use crate::models::{OrderInput, OrderResponse, TicketInput};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum TicketError {
    #[error("movie session {0} does not exist")]
    UnknownSession(i64),

    #[error("row {row} is out of range 1..={max} for movie session {session}")]
    RowOutOfRange { session: i64, row: i32, max: i32 },

    #[error("seat {seat} is out of range 1..={max} for movie session {session}")]
    SeatOutOfRange { session: i64, seat: i32, max: i32 },

    #[error("place row {row} seat {seat} of movie session {session} is listed twice")]
    Duplicate { session: i64, row: i32, seat: i32 },
}

impl From<TicketError> for ApiError {
    fn from(err: TicketError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

/// Проверяет билеты заказа по размерам залов. `halls`: сеанс -> размер его зала.
pub fn validate_tickets(tickets: &[TicketInput], halls: &HashMap<i64, HallSize>) -> Result<(), TicketError> {
    let mut seen = HashSet::with_capacity(tickets.len());

    for ticket in tickets {
        let session = ticket.movie_session;
        let hall = halls
            .get(&session)
            .ok_or(TicketError::UnknownSession(session))?;

        if !(1..=hall.rows).contains(&ticket.row) {
            return Err(TicketError::RowOutOfRange { session, row: ticket.row, max: hall.rows });
        }
        if !(1..=hall.seats_in_row).contains(&ticket.seat) {
            return Err(TicketError::SeatOutOfRange { session, seat: ticket.seat, max: hall.seats_in_row });
        }
        if !seen.insert((session, ticket.row, ticket.seat)) {
            return Err(TicketError::Duplicate { session, row: ticket.row, seat: ticket.seat });
        }
    }

    Ok(())
}

// FOR SHARE: пока билеты не вставлены, зал нельзя уменьшить, а сеанс перенести
async fn hall_sizes(
    tx: &mut Transaction<'_, Postgres>,
    tickets: &[TicketInput],
) -> Result<HashMap<i64, HallSize>, sqlx::Error> {
    let mut session_ids: Vec<i64> = tickets.iter().map(|t| t.movie_session).collect();
    session_ids.sort_unstable();
    session_ids.dedup();

    let rows: Vec<(i64, i32, i32)> = sqlx::query_as(
        "SELECT ms.id, ch.rows, ch.seats_in_row
         FROM movie_sessions ms
         JOIN cinema_halls ch ON ch.id = ms.cinema_hall_id
         WHERE ms.id = ANY($1)
         FOR SHARE OF ms, ch",
    )
    .bind(&session_ids)
    .fetch_all(&mut **tx)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(id, rows, seats_in_row)| (id, HallSize { rows, seats_in_row }))
        .collect())
}

async fn insert_tickets(
    tx: &mut Transaction<'_, Postgres>,
    order_id: i64,
    tickets: &[TicketInput],
) -> Result<(), sqlx::Error> {
    let sessions: Vec<i64> = tickets.iter().map(|t| t.movie_session).collect();
    let rows: Vec<i32> = tickets.iter().map(|t| t.row).collect();
    let seats: Vec<i32> = tickets.iter().map(|t| t.seat).collect();

    sqlx::query(
        "INSERT INTO tickets (order_id, movie_session_id, row, seat)
         SELECT $1, s, r, p FROM UNNEST($2::bigint[], $3::int[], $4::int[]) AS x(s, r, p)",
    )
    .bind(order_id)
    .bind(&sessions)
    .bind(&rows)
    .bind(&seats)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

pub async fn create_order(pool: &PgPool, user_id: i64, input: &OrderInput) -> ApiResult<OrderResponse> {
    let mut tx = pool.begin().await?;

    let halls = hall_sizes(&mut tx, &input.tickets).await?;
    validate_tickets(&input.tickets, &halls)?;

    let order_id = sqlx::query_scalar::<_, i64>("INSERT INTO orders (user_id) VALUES ($1) RETURNING id")
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

    insert_tickets(&mut tx, order_id, &input.tickets).await?;
    tx.commit().await?;

    info!("Order {} created by user {} with {} tickets", order_id, user_id, input.tickets.len());

    OrderResponse::find_for_user(pool, user_id, order_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Order", order_id))
}

/// Заменяет набор билетов заказа целиком.
pub async fn replace_tickets(
    pool: &PgPool,
    user_id: i64,
    order_id: i64,
    input: &OrderInput,
) -> ApiResult<OrderResponse> {
    let mut tx = pool.begin().await?;

    // Блокируем заказ, чтобы параллельные замены не перемешались
    let owned = sqlx::query_scalar::<_, i64>(
        "SELECT id FROM orders WHERE id = $1 AND user_id = $2 FOR UPDATE",
    )
    .bind(order_id)
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?;

    if owned.is_none() {
        return Err(ApiError::not_found("Order", order_id));
    }

    let halls = hall_sizes(&mut tx, &input.tickets).await?;
    validate_tickets(&input.tickets, &halls)?;

    sqlx::query("DELETE FROM tickets WHERE order_id = $1")
        .bind(order_id)
        .execute(&mut *tx)
        .await?;
    insert_tickets(&mut tx, order_id, &input.tickets).await?;
    tx.commit().await?;

    info!("Order {} of user {} now has {} tickets", order_id, user_id, input.tickets.len());

    OrderResponse::find_for_user(pool, user_id, order_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Order", order_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ticket(movie_session: i64, row: i32, seat: i32) -> TicketInput {
        TicketInput { row, seat, movie_session }
    }

    fn halls() -> HashMap<i64, HallSize> {
        HashMap::from([(1, HallSize { rows: 5, seats_in_row: 8 })])
    }

    #[test]
    fn accepts_places_inside_the_hall() {
        let tickets = [ticket(1, 1, 1), ticket(1, 5, 8), ticket(1, 3, 4)];
        assert_eq!(validate_tickets(&tickets, &halls()), Ok(()));
    }

    #[test]
    fn rejects_unknown_session() {
        let err = validate_tickets(&[ticket(2, 1, 1)], &halls()).unwrap_err();
        assert_eq!(err, TicketError::UnknownSession(2));
    }

    #[test]
    fn rejects_out_of_range_places() {
        assert!(matches!(
            validate_tickets(&[ticket(1, 6, 1)], &halls()),
            Err(TicketError::RowOutOfRange { row: 6, max: 5, .. })
        ));
        assert!(matches!(
            validate_tickets(&[ticket(1, 1, 0)], &halls()),
            Err(TicketError::SeatOutOfRange { seat: 0, max: 8, .. })
        ));
    }

    #[test]
    fn rejects_same_place_twice() {
        let err = validate_tickets(&[ticket(1, 2, 2), ticket(1, 2, 2)], &halls()).unwrap_err();
        assert_eq!(err, TicketError::Duplicate { session: 1, row: 2, seat: 2 });
    }

    #[test]
    fn ticket_errors_become_bad_requests() {
        let err: ApiError = TicketError::UnknownSession(9).into();
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
    }

    proptest! {
        #[test]
        fn single_ticket_valid_iff_inside_hall(
            rows in 1i32..30,
            seats in 1i32..30,
            row in -5i32..40,
            seat in -5i32..40,
        ) {
            let halls = HashMap::from([(7, HallSize { rows, seats_in_row: seats })]);
            let inside = HallSize { rows, seats_in_row: seats }.contains(row, seat);
            prop_assert_eq!(validate_tickets(&[ticket(7, row, seat)], &halls).is_ok(), inside);
        }

        // Сколько бы различных мест ни было продано, свободных не меньше нуля
        #[test]
        fn accepted_orders_never_exceed_capacity(
            rows in 1i32..6,
            seats in 1i32..6,
            places in prop::collection::vec((1i32..6, 1i32..6), 0..40),
        ) {
            let hall = HallSize { rows, seats_in_row: seats };
            let halls = HashMap::from([(1, hall)]);
            let tickets: Vec<_> = places.iter().map(|&(r, s)| ticket(1, r, s)).collect();

            if validate_tickets(&tickets, &halls).is_ok() {
                let sold = tickets.len() as i32;
                prop_assert!(hall.capacity() - sold >= 0);
            }
        }
    }
}
