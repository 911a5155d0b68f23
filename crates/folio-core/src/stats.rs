//! Reading statistics: single-pass reductions over a user's books.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::collections::HashMap;

use crate::domain::BookStatus;

/// Number of half-star rating buckets (0.5, 1.0, ..., 5.0).
pub const RATING_BUCKETS: usize = 10;

/// How many authors the "top authors" list keeps.
const TOP_AUTHORS: usize = 5;

/// A book reduced to the fields the aggregations read.
#[derive(Debug, Clone)]
pub struct BookFacts {
    pub title: String,
    pub status: BookStatus,
    pub rating: Option<f64>,
    pub page_count: Option<i64>,
    pub started_at: Option<NaiveDate>,
    pub finished_at: Option<NaiveDate>,
    pub genres: Vec<String>,
    pub authors: Vec<String>,
}

impl BookFacts {
    /// Whether this book counts as read within `year` (`None` = all time).
    pub fn read_in(&self, year: Option<i32>) -> bool {
        self.status == BookStatus::Read
            && match year {
                Some(y) => self.finished_at.is_some_and(|d| d.year() == y),
                None => true,
            }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct StatusCounts {
    pub to_read: u32,
    pub reading: u32,
    pub read: u32,
    pub abandoned: u32,
}

impl StatusCounts {
    pub fn from_statuses(statuses: impl IntoIterator<Item = BookStatus>) -> Self {
        let mut counts = Self::default();
        for status in statuses {
            match status {
                BookStatus::ToRead => counts.to_read += 1,
                BookStatus::Reading => counts.reading += 1,
                BookStatus::Read => counts.read += 1,
                BookStatus::Abandoned => counts.abandoned += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> u32 {
        self.to_read + self.reading + self.read + self.abandoned
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct NamedCount {
    pub name: String,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct BookLength {
    pub title: String,
    pub pages: i64,
}

/// The statistics page for one year (or all time).
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct ReadingStats {
    pub year: Option<i32>,
    pub status_counts: StatusCounts,
    pub books_read: u32,
    pub pages_read: i64,
    /// Books finished per month, January first.
    pub books_per_month: Vec<u32>,
    pub pages_per_month: Vec<i64>,
    pub genres: Vec<NamedCount>,
    /// Counts per half-star bucket; index 0 is 0.5 stars, index 9 is 5.0.
    pub rating_distribution: Vec<u32>,
    pub average_rating: Option<f64>,
    pub average_days_to_finish: Option<f64>,
    pub longest_book: Option<BookLength>,
    pub shortest_book: Option<BookLength>,
    pub top_authors: Vec<NamedCount>,
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Sort by count descending, then name, and keep at most `limit` entries.
fn ranked(counts: HashMap<String, u32>, limit: Option<usize>) -> Vec<NamedCount> {
    let mut out: Vec<NamedCount> = counts
        .into_iter()
        .map(|(name, count)| NamedCount { name, count })
        .collect();
    out.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    if let Some(limit) = limit {
        out.truncate(limit);
    }
    out
}

/// Compute the statistics page over `books` for `year` (`None` = all time).
///
/// Status counts always describe the whole shelf; everything else only
/// looks at books read within the requested period.
pub fn compute(books: &[BookFacts], year: Option<i32>) -> ReadingStats {
    let status_counts = StatusCounts::from_statuses(books.iter().map(|b| b.status));

    let mut books_per_month = vec![0u32; 12];
    let mut pages_per_month = vec![0i64; 12];
    let mut rating_distribution = vec![0u32; RATING_BUCKETS];
    let mut genres: HashMap<String, u32> = HashMap::new();
    let mut authors: HashMap<String, u32> = HashMap::new();
    let mut books_read = 0u32;
    let mut pages_read = 0i64;
    let mut rating_sum = 0.0;
    let mut rating_n = 0u32;
    let mut days_sum = 0i64;
    let mut days_n = 0u32;
    let mut longest: Option<BookLength> = None;
    let mut shortest: Option<BookLength> = None;

    for book in books.iter().filter(|b| b.read_in(year)) {
        books_read += 1;
        let pages = book.page_count.unwrap_or(0).max(0);
        pages_read += pages;

        if let Some(finished) = book.finished_at {
            let m = finished.month0() as usize;
            books_per_month[m] += 1;
            pages_per_month[m] += pages;

            if let Some(started) = book.started_at {
                let days = finished.signed_duration_since(started).num_days();
                if days >= 0 {
                    days_sum += days;
                    days_n += 1;
                }
            }
        }

        if let Some(rating) = book.rating {
            let bucket = ((rating * 2.0).round() as usize).clamp(1, RATING_BUCKETS) - 1;
            rating_distribution[bucket] += 1;
            rating_sum += rating;
            rating_n += 1;
        }

        for genre in &book.genres {
            *genres.entry(genre.clone()).or_default() += 1;
        }
        for author in &book.authors {
            *authors.entry(author.clone()).or_default() += 1;
        }

        if pages > 0 {
            let entry = || BookLength {
                title: book.title.clone(),
                pages,
            };
            if longest.as_ref().map_or(true, |l| pages > l.pages) {
                longest = Some(entry());
            }
            if shortest.as_ref().map_or(true, |s| pages < s.pages) {
                shortest = Some(entry());
            }
        }
    }

    ReadingStats {
        year,
        status_counts,
        books_read,
        pages_read,
        books_per_month,
        pages_per_month,
        genres: ranked(genres, None),
        rating_distribution,
        average_rating: (rating_n > 0).then(|| round2(rating_sum / rating_n as f64)),
        average_days_to_finish: (days_n > 0).then(|| round2(days_sum as f64 / days_n as f64)),
        longest_book: longest,
        shortest_book: shortest,
        top_authors: ranked(authors, Some(TOP_AUTHORS)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn read(title: &str, finished: &str, pages: i64, rating: Option<f64>, genre: &str) -> BookFacts {
        BookFacts {
            title: title.into(),
            status: BookStatus::Read,
            rating,
            page_count: Some(pages),
            started_at: None,
            finished_at: Some(d(finished)),
            genres: vec![genre.into()],
            authors: vec!["Le Guin".into()],
        }
    }

    fn shelf(status: BookStatus) -> BookFacts {
        BookFacts {
            title: "pending".into(),
            status,
            rating: None,
            page_count: Some(100),
            started_at: None,
            finished_at: None,
            genres: vec![],
            authors: vec![],
        }
    }

    #[test]
    fn empty_library() {
        let stats = compute(&[], Some(2024));
        assert_eq!(stats.books_read, 0);
        assert_eq!(stats.average_rating, None);
        assert_eq!(stats.books_per_month, vec![0; 12]);
        assert!(stats.longest_book.is_none());
    }

    #[test]
    fn groups_by_month_and_year() {
        let books = vec![
            read("A", "2024-01-15", 300, Some(4.0), "Fantasy"),
            read("B", "2024-01-20", 200, Some(5.0), "Fantasy"),
            read("C", "2024-07-01", 150, None, "Essay"),
            read("D", "2023-07-01", 999, Some(1.0), "Essay"),
            shelf(BookStatus::ToRead),
            shelf(BookStatus::Reading),
        ];
        let stats = compute(&books, Some(2024));

        assert_eq!(stats.books_read, 3);
        assert_eq!(stats.pages_read, 650);
        assert_eq!(stats.books_per_month[0], 2);
        assert_eq!(stats.books_per_month[6], 1);
        assert_eq!(stats.pages_per_month[0], 500);
        assert_eq!(stats.status_counts.read, 4);
        assert_eq!(stats.status_counts.to_read, 1);
        assert_eq!(stats.status_counts.total(), 6);
        assert_eq!(stats.average_rating, Some(4.5));
        assert_eq!(stats.genres[0], NamedCount { name: "Fantasy".into(), count: 2 });
        assert_eq!(stats.longest_book.unwrap().title, "A");
        assert_eq!(stats.shortest_book.unwrap().title, "C");
    }

    #[test]
    fn all_time_includes_every_read_book() {
        let books = vec![
            read("A", "2024-01-15", 300, Some(4.0), "Fantasy"),
            read("D", "2023-07-01", 999, Some(1.0), "Essay"),
        ];
        let stats = compute(&books, None);
        assert_eq!(stats.books_read, 2);
        assert_eq!(stats.longest_book.unwrap().pages, 999);
        assert_eq!(stats.top_authors[0].count, 2);
    }

    #[test]
    fn rating_buckets() {
        let books = vec![
            read("A", "2024-01-01", 10, Some(0.5), "x"),
            read("B", "2024-01-01", 10, Some(5.0), "x"),
            read("C", "2024-01-01", 10, Some(2.5), "x"),
        ];
        let stats = compute(&books, Some(2024));
        assert_eq!(stats.rating_distribution[0], 1);
        assert_eq!(stats.rating_distribution[4], 1);
        assert_eq!(stats.rating_distribution[9], 1);
    }

    #[test]
    fn average_days_to_finish() {
        let mut a = read("A", "2024-03-11", 100, None, "x");
        a.started_at = Some(d("2024-03-01"));
        let mut b = read("B", "2024-03-21", 100, None, "x");
        b.started_at = Some(d("2024-03-01"));
        let stats = compute(&[a, b], Some(2024));
        assert_eq!(stats.average_days_to_finish, Some(15.0));
    }

    #[test]
    fn ranking_breaks_ties_by_name() {
        let mut counts = HashMap::new();
        counts.insert("b".to_string(), 2);
        counts.insert("a".to_string(), 2);
        counts.insert("c".to_string(), 5);
        let out = ranked(counts, Some(2));
        assert_eq!(out[0].name, "c");
        assert_eq!(out[1].name, "a");
    }
}
