/// Book Feature Table
///
/// One row per distinct `book_idx`, taken from the first dataset row that
/// mentions the book. Rows are stored at position `book_idx`, so iteration
/// order is ascending book index regardless of dataset row order.
use crate::dataset::RatingRecord;
use crate::error::{FeatureError, Result};
use crate::schema::BOOK_FEATURE_WIDTH;
use ndarray::Array2;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BookFeatures {
    pub book_idx: i64,
    pub topic_idx: i64,
    pub author_idx: i64,
    pub category: i64,
    pub average_rating: f32,
    pub user_rating_count: f32,
}

impl From<&RatingRecord> for BookFeatures {
    fn from(record: &RatingRecord) -> Self {
        Self {
            book_idx: record.book_idx,
            topic_idx: record.topic_idx,
            author_idx: record.author_idx,
            category: record.category,
            average_rating: record.average_rating,
            user_rating_count: record.user_rating_count,
        }
    }
}

impl BookFeatures {
    /// `[topic_idx, author_idx, category, average_rating, user_rating_count]`
    pub fn vector(&self) -> [f32; BOOK_FEATURE_WIDTH] {
        [
            self.topic_idx as f32,
            self.author_idx as f32,
            self.category as f32,
            self.average_rating,
            self.user_rating_count,
        ]
    }
}

#[derive(Debug, Clone, Default)]
pub struct BookFeatureTable {
    books: Vec<BookFeatures>,
}

impl BookFeatureTable {
    /// Group rows by book, keeping first-seen values.
    ///
    /// Book indices must cover `0..N` without gaps; score positions are
    /// reported as book indices downstream.
    pub fn from_records<'a, I>(records: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a RatingRecord>,
    {
        let mut first_seen: BTreeMap<i64, BookFeatures> = BTreeMap::new();
        let mut conflicting = 0usize;

        for record in records {
            match first_seen.get(&record.book_idx) {
                Some(existing) => {
                    if *existing != BookFeatures::from(record) {
                        conflicting += 1;
                    }
                }
                None => {
                    first_seen.insert(record.book_idx, BookFeatures::from(record));
                }
            }
        }

        if conflicting > 0 {
            warn!(
                conflicting_rows = conflicting,
                "Books appear with differing attributes; keeping first-seen values"
            );
        }

        for (position, book_idx) in first_seen.keys().enumerate() {
            if *book_idx != position as i64 {
                return Err(FeatureError::SchemaMismatch(format!(
                    "book indices must be contiguous from 0, found {} at position {}",
                    book_idx, position
                )));
            }
        }

        let books: Vec<BookFeatures> = first_seen.into_values().collect();
        debug!(books = books.len(), "Book feature table built");

        Ok(Self { books })
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    pub fn get(&self, book_idx: usize) -> Result<&BookFeatures> {
        self.books
            .get(book_idx)
            .ok_or(FeatureError::UnknownBook(book_idx as i64))
    }

    /// Books in ascending `book_idx` order.
    pub fn iter(&self) -> impl Iterator<Item = &BookFeatures> {
        self.books.iter()
    }

    /// `N x 5` matrix of book feature vectors, row i = book i.
    pub fn feature_matrix(&self) -> Array2<f32> {
        let mut matrix = Array2::zeros((self.books.len(), BOOK_FEATURE_WIDTH));
        for (mut row, book) in matrix.rows_mut().into_iter().zip(&self.books) {
            for (cell, value) in row.iter_mut().zip(book.vector()) {
                *cell = value;
            }
        }
        matrix
    }
}
