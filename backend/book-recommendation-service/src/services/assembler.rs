/// Response assembly: titles for the top books and their related books
use super::neighbors::NeighborIndex;
use book_features::{EncoderStore, FeatureError};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// Related titles keyed by title, in first-insertion order.
///
/// Inserting a title that is already present replaces its list but keeps
/// its position, so two top books sharing a title produce one entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RelatedBooks(Vec<(String, Vec<String>)>);

impl RelatedBooks {
    pub fn insert(&mut self, title: String, related: Vec<String>) {
        match self.0.iter_mut().find(|(existing, _)| *existing == title) {
            Some(entry) => entry.1 = related,
            None => self.0.push((title, related)),
        }
    }

    pub fn get(&self, title: &str) -> Option<&[String]> {
        self.0
            .iter()
            .find(|(existing, _)| existing == title)
            .map(|(_, related)| related.as_slice())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn titles(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(title, _)| title.as_str())
    }
}

impl Serialize for RelatedBooks {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (title, related) in &self.0 {
            map.serialize_entry(title, related)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub top_books: Vec<String>,
    pub related_books: RelatedBooks,
}

pub fn assemble(
    top: &[usize],
    encoders: &EncoderStore,
    index: &NeighborIndex,
) -> Result<Recommendation, FeatureError> {
    let mut top_books = Vec::with_capacity(top.len());
    let mut related_books = RelatedBooks::default();

    for &book_idx in top {
        let title = encoders.decode_title(book_idx as i64)?.to_string();
        let related = index
            .neighbors(book_idx)?
            .into_iter()
            .map(|other| encoders.decode_title(other as i64).map(str::to_string))
            .collect::<Result<Vec<_>, _>>()?;

        related_books.insert(title.clone(), related);
        top_books.push(title);
    }

    Ok(Recommendation {
        top_books,
        related_books,
    })
}
