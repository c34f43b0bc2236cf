pub mod genres;
pub mod actors;
pub mod cinema_halls;
pub mod movies;
pub mod movie_sessions;
pub mod orders;
pub mod users;

use axum::Router;
use std::sync::Arc;

pub fn routes() -> Router<Arc<crate::AppState>> {
    Router::new()
        .merge(genres::routes())
        .merge(actors::routes())
        .merge(cinema_halls::routes())
        .merge(movies::routes())
        .merge(movie_sessions::routes())
        .merge(orders::routes())
        .merge(users::routes())
}
