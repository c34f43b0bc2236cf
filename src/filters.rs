//! Фильтры списков по query-параметрам.
//!
//! Параметры сначала разбираются и проверяются (ошибка -> 400 до похода в БД),
//! затем фильтр дописывает свои условия в `QueryBuilder`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::{Postgres, QueryBuilder};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum FilterError {
    #[error("`{param}` must be a comma-separated list of integer ids, got `{value}`")]
    InvalidIdList { param: &'static str, value: String },

    #[error("`{param}` must be an integer id, got `{value}`")]
    InvalidId { param: &'static str, value: String },

    #[error("`date` must be in YYYY-MM-DD format, got `{0}`")]
    InvalidDate(String),
}

impl From<FilterError> for crate::error::ApiError {
    fn from(err: FilterError) -> Self {
        crate::error::ApiError::BadRequest(err.to_string())
    }
}

/// "1, 2,3" -> [1, 2, 3]. Пустая строка считается отсутствующим параметром.
pub fn parse_id_list(param: &'static str, raw: &str) -> Result<Option<Vec<i64>>, FilterError> {
    if raw.trim().is_empty() {
        return Ok(None);
    }

    raw.split(',')
        .map(|part| part.trim().parse::<i64>())
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
        .map_err(|_| FilterError::InvalidIdList {
            param,
            value: raw.to_string(),
        })
}

/// Экранирует спецсимволы LIKE, чтобы подстрока искалась буквально.
pub fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn non_empty(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

/* ---------- MOVIES ---------- */

#[derive(Debug, Default, Deserialize)]
pub struct MovieQuery {
    pub genres: Option<String>,
    pub actors: Option<String>,
    pub title: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct MovieFilter {
    pub genres: Option<Vec<i64>>,
    pub actors: Option<Vec<i64>>,
    pub title: Option<String>,
}

impl TryFrom<MovieQuery> for MovieFilter {
    type Error = FilterError;

    fn try_from(query: MovieQuery) -> Result<Self, Self::Error> {
        let genres = match query.genres.as_deref() {
            Some(raw) => parse_id_list("genres", raw)?,
            None => None,
        };
        let actors = match query.actors.as_deref() {
            Some(raw) => parse_id_list("actors", raw)?,
            None => None,
        };
        let title = non_empty(query.title.as_deref()).map(str::to_string);

        Ok(MovieFilter { genres, actors, title })
    }
}

impl MovieFilter {
    /// Дописывает условия к запросу, в котором таблица `movies` имеет алиас `m`.
    /// EXISTS вместо JOIN: фильм попадает в выборку ровно один раз.
    pub fn push_conditions(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        if let Some(genres) = &self.genres {
            qb.push(
                " AND EXISTS (SELECT 1 FROM movie_genres fg \
                 WHERE fg.movie_id = m.id AND fg.genre_id = ANY(",
            );
            qb.push_bind(genres.clone());
            qb.push("))");
        }
        if let Some(actors) = &self.actors {
            qb.push(
                " AND EXISTS (SELECT 1 FROM movie_actors fa \
                 WHERE fa.movie_id = m.id AND fa.actor_id = ANY(",
            );
            qb.push_bind(actors.clone());
            qb.push("))");
        }
        if let Some(title) = &self.title {
            qb.push(" AND m.title ILIKE ");
            qb.push_bind(format!("%{}%", escape_like(title)));
        }
    }
}

/* ---------- MOVIE SESSIONS ---------- */

#[derive(Debug, Default, Deserialize)]
pub struct SessionQuery {
    pub date: Option<String>,
    pub movie: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct SessionFilter {
    pub date: Option<NaiveDate>,
    pub movie: Option<i64>,
}

impl TryFrom<SessionQuery> for SessionFilter {
    type Error = FilterError;

    fn try_from(query: SessionQuery) -> Result<Self, Self::Error> {
        let date = non_empty(query.date.as_deref())
            .map(|raw| {
                NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                    .map_err(|_| FilterError::InvalidDate(raw.to_string()))
            })
            .transpose()?;

        let movie = non_empty(query.movie.as_deref())
            .map(|raw| {
                raw.parse::<i64>().map_err(|_| FilterError::InvalidId {
                    param: "movie",
                    value: raw.to_string(),
                })
            })
            .transpose()?;

        Ok(SessionFilter { date, movie })
    }
}

impl SessionFilter {
    /// Условия для запроса, где `movie_sessions` имеет алиас `ms`.
    pub fn push_conditions(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        if let Some(date) = self.date {
            qb.push(" AND ms.show_time::date = ");
            qb.push_bind(date);
        }
        if let Some(movie) = self.movie {
            qb.push(" AND ms.movie_id = ");
            qb.push_bind(movie);
        }
    }

    /// Канонический вид фильтра, ключ кеша списка сеансов.
    pub fn cache_fingerprint(&self) -> String {
        serde_urlencoded::to_string(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn id_list_accepts_spaces_and_ignores_empty() {
        assert_eq!(parse_id_list("genres", "1, 2 ,3"), Ok(Some(vec![1, 2, 3])));
        assert_eq!(parse_id_list("genres", ""), Ok(None));
        assert_eq!(parse_id_list("genres", "   "), Ok(None));
    }

    #[test]
    fn id_list_rejects_garbage() {
        let err = parse_id_list("actors", "1,two").unwrap_err();
        assert_eq!(
            err,
            FilterError::InvalidIdList {
                param: "actors",
                value: "1,two".into()
            }
        );
        assert!(parse_id_list("actors", "1,,2").is_err());
    }

    #[test]
    fn escape_like_escapes_wildcards() {
        assert_eq!(escape_like("100%_sure\\"), "100\\%\\_sure\\\\");
        assert_eq!(escape_like("Matrix"), "Matrix");
    }

    #[test]
    fn movie_filter_builds_and_of_predicates() {
        let filter = MovieFilter::try_from(MovieQuery {
            genres: Some("1,2".into()),
            actors: Some("3".into()),
            title: Some("ring".into()),
        })
        .unwrap();

        let mut qb = QueryBuilder::<Postgres>::new("SELECT m.id FROM movies m WHERE TRUE");
        filter.push_conditions(&mut qb);
        let sql = qb.sql();

        assert!(sql.contains("fg.genre_id = ANY($1)"));
        assert!(sql.contains("fa.actor_id = ANY($2)"));
        assert!(sql.contains("m.title ILIKE $3"));
        assert!(!sql.contains("JOIN"));
    }

    #[test]
    fn empty_movie_filter_adds_nothing() {
        let filter = MovieFilter::try_from(MovieQuery {
            genres: Some(String::new()),
            actors: None,
            title: Some("  ".into()),
        })
        .unwrap();
        assert_eq!(filter, MovieFilter::default());

        let mut qb = QueryBuilder::<Postgres>::new("SELECT m.id FROM movies m WHERE TRUE");
        filter.push_conditions(&mut qb);
        assert_eq!(qb.sql(), "SELECT m.id FROM movies m WHERE TRUE");
    }

    #[test]
    fn session_filter_parses_date_and_movie() {
        let filter = SessionFilter::try_from(SessionQuery {
            date: Some("2024-10-05".into()),
            movie: Some("4".into()),
        })
        .unwrap();
        assert_eq!(filter.date, NaiveDate::from_ymd_opt(2024, 10, 5));
        assert_eq!(filter.movie, Some(4));

        let mut qb = QueryBuilder::<Postgres>::new("SELECT ms.id FROM movie_sessions ms WHERE TRUE");
        filter.push_conditions(&mut qb);
        assert!(qb.sql().ends_with("ms.show_time::date = $1 AND ms.movie_id = $2"));
    }

    #[test]
    fn session_filter_rejects_bad_values() {
        let bad_date = SessionFilter::try_from(SessionQuery {
            date: Some("05.10.2024".into()),
            movie: None,
        });
        assert_eq!(bad_date, Err(FilterError::InvalidDate("05.10.2024".into())));

        let bad_movie = SessionFilter::try_from(SessionQuery {
            date: None,
            movie: Some("abc".into()),
        });
        assert!(matches!(bad_movie, Err(FilterError::InvalidId { param: "movie", .. })));
    }

    #[test]
    fn fingerprint_is_canonical() {
        let a = SessionFilter { date: NaiveDate::from_ymd_opt(2024, 1, 2), movie: Some(9) };
        assert_eq!(a.cache_fingerprint(), "date=2024-01-02&movie=9");
        assert_eq!(SessionFilter::default().cache_fingerprint(), "");
    }

    proptest! {
        #[test]
        fn id_list_parses_what_it_formats(ids in prop::collection::vec(any::<i64>(), 1..20)) {
            let raw = ids.iter().map(i64::to_string).collect::<Vec<_>>().join(",");
            prop_assert_eq!(parse_id_list("genres", &raw), Ok(Some(ids)));
        }

        #[test]
        fn escaped_like_has_no_bare_wildcards(raw in ".*") {
            let escaped = escape_like(&raw);
            let mut chars = escaped.chars();
            while let Some(c) = chars.next() {
                if c == '\\' {
                    let next = chars.next();
                    prop_assert!(matches!(next, Some('\\' | '%' | '_')));
                } else {
                    prop_assert!(c != '%' && c != '_');
                }
            }
        }
    }
}
