use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use std::collections::HashMap;
use validator::Validate;

use crate::pagination::Pagination;

// Serialize нужен валидатору длины `Vec<TicketInput>`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketInput {
    pub row: i32,
    pub seat: i32,
    pub movie_session: i64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct OrderInput {
    #[validate(length(min = 1, message = "an order needs at least one ticket"))]
    pub tickets: Vec<TicketInput>,
}

/// Краткая информация о сеансе внутри билета.
#[derive(Debug, Clone, Serialize)]
pub struct TicketSession {
    pub id: i64,
    pub show_time: NaiveDateTime,
    pub movie_title: String,
    pub cinema_hall_name: String,
    pub cinema_hall_capacity: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct TicketResponse {
    pub id: i64,
    pub row: i32,
    pub seat: i32,
    pub movie_session: TicketSession,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderResponse {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub tickets: Vec<TicketResponse>,
}

#[derive(FromRow)]
struct OrderRow {
    id: i64,
    created_at: DateTime<Utc>,
}

// Билет сразу со всем, что нужно для ответа: сеанс, фильм, зал
#[derive(FromRow)]
struct TicketRow {
    id: i64,
    order_id: i64,
    row: i32,
    seat: i32,
    movie_session_id: i64,
    show_time: NaiveDateTime,
    movie_title: String,
    cinema_hall_name: String,
    cinema_hall_capacity: i32,
}

impl From<TicketRow> for TicketResponse {
    fn from(t: TicketRow) -> Self {
        TicketResponse {
            id: t.id,
            row: t.row,
            seat: t.seat,
            movie_session: TicketSession {
                id: t.movie_session_id,
                show_time: t.show_time,
                movie_title: t.movie_title,
                cinema_hall_name: t.cinema_hall_name,
                cinema_hall_capacity: t.cinema_hall_capacity,
            },
        }
    }
}

impl OrderResponse {
    /// Страница заказов пользователя (новые первыми) и общее их количество.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: i64,
        page: &Pagination,
    ) -> Result<(i64, Vec<OrderResponse>), sqlx::Error> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM orders WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(pool)
            .await?;

        let orders = sqlx::query_as::<_, OrderRow>(
            "SELECT id, created_at FROM orders
             WHERE user_id = $1
             ORDER BY created_at DESC, id DESC
             LIMIT $2 OFFSET $3",
        )
        .bind(user_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(pool)
        .await?;

        let orders = Self::with_tickets(pool, orders).await?;
        Ok((count, orders))
    }

    pub async fn find_for_user(pool: &PgPool, user_id: i64, id: i64) -> Result<Option<OrderResponse>, sqlx::Error> {
        let order = sqlx::query_as::<_, OrderRow>(
            "SELECT id, created_at FROM orders WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        match order {
            Some(order) => Ok(Self::with_tickets(pool, vec![order]).await?.pop()),
            None => Ok(None),
        }
    }

    pub async fn delete_for_user(pool: &PgPool, user_id: i64, id: i64) -> Result<bool, sqlx::Error> {
        sqlx::query("DELETE FROM orders WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await
            .map(|r| r.rows_affected() > 0)
    }

    // Один запрос на все билеты страницы, затем раскладываем по заказам
    async fn with_tickets(pool: &PgPool, orders: Vec<OrderRow>) -> Result<Vec<OrderResponse>, sqlx::Error> {
        if orders.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = orders.iter().map(|o| o.id).collect();
        let rows = sqlx::query_as::<_, TicketRow>(
            r#"
            SELECT t.id, t.order_id, t.row, t.seat,
                   ms.id AS movie_session_id,
                   ms.show_time,
                   m.title AS movie_title,
                   ch.name AS cinema_hall_name,
                   (ch.rows * ch.seats_in_row) AS cinema_hall_capacity
            FROM tickets t
            JOIN movie_sessions ms ON ms.id = t.movie_session_id
            JOIN movies m ON m.id = ms.movie_id
            JOIN cinema_halls ch ON ch.id = ms.cinema_hall_id
            WHERE t.order_id = ANY($1)
            ORDER BY t.id
            "#,
        )
        .bind(&ids)
        .fetch_all(pool)
        .await?;

        let mut by_order: HashMap<i64, Vec<TicketResponse>> = HashMap::new();
        for row in rows {
            by_order.entry(row.order_id).or_default().push(row.into());
        }

        Ok(orders
            .into_iter()
            .map(|o| OrderResponse {
                id: o.id,
                created_at: o.created_at,
                tickets: by_order.remove(&o.id).unwrap_or_default(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_order_fails_validation() {
        let input: OrderInput = serde_json::from_str(r#"{"tickets": []}"#).unwrap();
        let errors = input.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("tickets"));
    }

    #[test]
    fn order_with_tickets_passes_validation() {
        let input: OrderInput =
            serde_json::from_str(r#"{"tickets": [{"row": 1, "seat": 2, "movie_session": 3}]}"#).unwrap();
        assert!(input.validate().is_ok());
        assert_eq!(serde_json::to_value(&input.tickets[0]).unwrap()["movie_session"], 3);
    }

    #[test]
    fn ticket_row_maps_into_nested_session() {
        let row = TicketRow {
            id: 10,
            order_id: 1,
            row: 3,
            seat: 7,
            movie_session_id: 5,
            show_time: chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(20, 0, 0)
                .unwrap(),
            movie_title: "Heat".into(),
            cinema_hall_name: "Red".into(),
            cinema_hall_capacity: 100,
        };
        let ticket: TicketResponse = row.into();
        let json = serde_json::to_value(&ticket).unwrap();
        assert_eq!(json["movie_session"]["id"], 5);
        assert_eq!(json["movie_session"]["movie_title"], "Heat");
        assert_eq!(json["row"], 3);
    }
}
