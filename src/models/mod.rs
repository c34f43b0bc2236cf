pub mod user;
pub mod genre;
pub mod actor;
pub mod cinema_hall;
pub mod movie;
pub mod movie_session;
pub mod order;

pub use user::User;
pub use genre::{Genre, GenreInput};
pub use actor::{Actor, ActorInput};
pub use cinema_hall::{CinemaHall, CinemaHallInput};
pub use movie::{MovieDetail, MovieInput, MovieListItem, MovieRecord};
pub use movie_session::{MovieSession, MovieSessionDetail, MovieSessionInput, MovieSessionListItem, TakenPlace};
pub use order::{OrderInput, OrderResponse, TicketInput};
