//! Loaders that reduce a user's rows to the fact structs the aggregations in
//! `folio_core` consume (stats, calendar, goals, badges).

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use folio_core::badges::BadgeInputs;
use folio_core::calendar::{self, LogFacts};
use folio_core::goals::GoalProgress;
use folio_core::stats::BookFacts;
use folio_core::{BookStatus, Error, Result, UserId};
use rusqlite::Connection;

use crate::models::{parse_date, parse_opt_date};
use crate::queries::{books, goals, quotes, series, words};

/// Map of book id to names, preserving link order.
fn names_by_book(conn: &Connection, sql: &str, user_id: UserId) -> Result<HashMap<String, Vec<String>>> {
    let mut stmt = conn
        .prepare(sql)
        .map_err(|e| Error::database(e.to_string()))?;
    let pairs = stmt
        .query_map([user_id.to_string()], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;

    let mut map: HashMap<String, Vec<String>> = HashMap::new();
    for (book_id, name) in pairs {
        map.entry(book_id).or_default().push(name);
    }
    Ok(map)
}

/// Every book of a user with its genre and author names.
pub fn book_facts(conn: &Connection, user_id: UserId) -> Result<Vec<BookFacts>> {
    let mut genres = names_by_book(
        conn,
        "SELECT bg.book_id, g.name FROM book_genres bg JOIN genres g ON g.id = bg.genre_id
         WHERE g.user_id = ?1 ORDER BY g.name",
        user_id,
    )?;
    let mut authors = names_by_book(
        conn,
        "SELECT ba.book_id, a.name FROM book_authors ba JOIN authors a ON a.id = ba.author_id
         WHERE a.user_id = ?1 ORDER BY ba.position",
        user_id,
    )?;

    Ok(books::all_books(conn, user_id)?
        .into_iter()
        .map(|b| {
            let key = b.id.to_string();
            BookFacts {
                genres: genres.remove(&key).unwrap_or_default(),
                authors: authors.remove(&key).unwrap_or_default(),
                title: b.title,
                status: b.status,
                rating: b.rating,
                page_count: b.page_count,
                started_at: b.started_at,
                finished_at: b.finished_at,
            }
        })
        .collect())
}

/// Every reading session of a user, reduced for the calendar.
pub fn log_facts(conn: &Connection, user_id: UserId) -> Result<Vec<LogFacts>> {
    let mut stmt = conn
        .prepare("SELECT date, pages_read, minutes FROM reading_logs WHERE user_id = ?1")
        .map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map([user_id.to_string()], |row| {
            Ok(LogFacts {
                date: parse_date(row, 0)?,
                pages_read: row.get(1)?,
                minutes: row.get(2)?,
            })
        })
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

/// Finish dates of every read book.
pub fn finished_dates(conn: &Connection, user_id: UserId) -> Result<Vec<NaiveDate>> {
    let mut stmt = conn
        .prepare(
            "SELECT finished_at FROM books
             WHERE user_id = ?1 AND status = 'read' AND finished_at IS NOT NULL",
        )
        .map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map([user_id.to_string()], |row| parse_opt_date(row, 0))
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows.into_iter().flatten().collect())
}

/// Books and pages read within `year`.
fn read_in_year(facts: &[BookFacts], year: i32) -> (u32, i64) {
    facts
        .iter()
        .filter(|b| b.read_in(Some(year)))
        .fold((0, 0), |(n, pages), b| {
            (n + 1, pages + b.page_count.unwrap_or(0).max(0))
        })
}

/// Progress for the goal of `year`, if one is set.
pub fn goal_progress(
    conn: &Connection,
    user_id: UserId,
    year: i32,
    today: NaiveDate,
) -> Result<Option<GoalProgress>> {
    let Some(goal) = goals::get_goal(conn, user_id, year)? else {
        return Ok(None);
    };
    let (books_read, pages_read) = read_in_year(&book_facts(conn, user_id)?, year);
    Ok(Some(GoalProgress::compute(
        year,
        goal.target_books,
        goal.target_pages,
        books_read,
        pages_read,
        today,
    )))
}

/// Gather every counter the badge catalogue is evaluated against.
pub fn badge_inputs(conn: &Connection, user_id: UserId, today: NaiveDate) -> Result<BadgeInputs> {
    let facts = book_facts(conn, user_id)?;
    let read: Vec<&BookFacts> = facts.iter().filter(|b| b.status == BookStatus::Read).collect();

    let genres_read: HashSet<String> = read
        .iter()
        .flat_map(|b| b.genres.iter().map(|g| g.to_lowercase()))
        .collect();

    let dates: Vec<NaiveDate> = log_facts(conn, user_id)?.iter().map(|l| l.date).collect();
    let streaks = calendar::compute_streaks(&dates, today);

    let goals_achieved = goals::list_goals(conn, user_id)?
        .into_iter()
        .filter(|g| {
            let (books_read, pages_read) = read_in_year(&facts, g.year);
            GoalProgress::compute(g.year, g.target_books, g.target_pages, books_read, pages_read, today)
                .achieved
        })
        .count() as u32;

    Ok(BadgeInputs {
        books_read: read.len() as u32,
        longest_book_read: read.iter().filter_map(|b| b.page_count).max().unwrap_or(0),
        longest_streak: streaks.longest,
        ratings_given: facts.iter().filter(|b| b.rating.is_some()).count() as u32,
        quotes_saved: quotes::count_quotes(conn, user_id)? as u32,
        words_saved: words::count_words(conn, user_id)? as u32,
        genres_read: genres_read.len() as u32,
        goals_achieved,
        series_completed: series::count_completed(conn, user_id)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::init_memory_pool;
    use crate::queries::books::{create_book, tests::user, NewBook};
    use crate::queries::{authors, genres, reading_logs};

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn read_book(conn: &Connection, u: UserId, title: &str, pages: i64, finished: &str) -> folio_core::BookId {
        create_book(
            conn,
            u,
            &NewBook {
                title: title.into(),
                status: BookStatus::Read,
                page_count: Some(pages),
                finished_at: Some(d(finished)),
                rating: Some(4.0),
                ..Default::default()
            },
        )
        .unwrap()
        .id
    }

    #[test]
    fn facts_carry_links() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let u = user(&conn, "facts");
        let id = read_book(&conn, u, "Beloved", 324, "2024-02-01");
        authors::link_by_name(&conn, u, id, &["Toni Morrison".into()]).unwrap();
        genres::link_by_name(&conn, u, id, &["Literary".into(), "Historical".into()]).unwrap();

        let facts = book_facts(&conn, u).unwrap();
        assert_eq!(facts[0].authors, ["Toni Morrison"]);
        assert_eq!(facts[0].genres, ["Historical", "Literary"]);
        assert_eq!(finished_dates(&conn, u).unwrap(), vec![d("2024-02-01")]);
    }

    #[test]
    fn goal_progress_counts_year_only() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let u = user(&conn, "goals");
        assert!(goal_progress(&conn, u, 2024, d("2024-06-01")).unwrap().is_none());

        read_book(&conn, u, "In Year", 200, "2024-03-01");
        read_book(&conn, u, "Last Year", 300, "2023-12-31");
        goals::upsert_goal(&conn, u, 2024, 2, None).unwrap();

        let p = goal_progress(&conn, u, 2024, d("2024-06-01")).unwrap().unwrap();
        assert_eq!(p.books_read, 1);
        assert_eq!(p.pages_read, 200);
        assert_eq!(p.books_remaining, 1);
    }

    #[test]
    fn badge_inputs_gathered() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let u = user(&conn, "badger");
        let id = read_book(&conn, u, "Infinite Jest", 1079, "2024-01-10");
        genres::link_by_name(&conn, u, id, &["Fiction".into()]).unwrap();
        goals::upsert_goal(&conn, u, 2024, 1, None).unwrap();
        for day in ["2024-01-01", "2024-01-02", "2024-01-03"] {
            reading_logs::create_log(
                &conn,
                u,
                &reading_logs::NewLog {
                    book_id: id,
                    date: d(day),
                    pages_read: 50,
                    minutes: None,
                    note: None,
                },
            )
            .unwrap();
        }
        quotes::create_quote(&conn, u, id, "Everybody is identical in their secret unspoken belief", None).unwrap();

        let inputs = badge_inputs(&conn, u, d("2024-02-01")).unwrap();
        assert_eq!(inputs.books_read, 1);
        assert_eq!(inputs.longest_book_read, 1079);
        assert_eq!(inputs.longest_streak, 3);
        assert_eq!(inputs.ratings_given, 1);
        assert_eq!(inputs.quotes_saved, 1);
        assert_eq!(inputs.genres_read, 1);
        assert_eq!(inputs.goals_achieved, 1);
        assert_eq!(inputs.series_completed, 0);
    }
}
