//! Shared test fixtures: a small record type and an in-memory store of truth.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::Result;
use crate::record::{LookupValue, Record, RecordFilter, RecordStore};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Article {
    pub id: u64,
    pub slug: String,
    pub title: String,
    pub author: String,
    pub tags: Vec<String>,
}

impl Article {
    pub fn new(id: u64, slug: &str) -> Self {
        Self {
            id,
            slug: slug.to_string(),
            title: format!("Article {}", id),
            author: "anonymous".to_string(),
            tags: Vec::new(),
        }
    }

    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn with_author(mut self, author: &str) -> Self {
        self.author = author.to_string();
        self
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }
}

impl Record for Article {
    fn attribute(&self, field: &str) -> Option<LookupValue> {
        match field {
            "pk" | "id" => Some(self.id.into()),
            "slug" => Some(self.slug.as_str().into()),
            "title" => Some(self.title.as_str().into()),
            "author" => Some(self.author.as_str().into()),
            _ => None,
        }
    }
}

/// Store of truth backed by a map. `find_many` answers in reverse id order so
/// callers cannot rely on result order matching request order.
#[derive(Debug, Default)]
pub struct ArticleStore {
    articles: Mutex<BTreeMap<u64, Article>>,
    loads: AtomicUsize,
}

impl ArticleStore {
    pub fn new(articles: Vec<Article>) -> Self {
        let store = Self::default();
        for article in articles {
            store.upsert(article);
        }
        store
    }

    pub fn upsert(&self, article: Article) {
        self.articles.lock().unwrap().insert(article.id, article);
    }

    pub fn remove(&self, id: u64) -> Option<Article> {
        self.articles.lock().unwrap().remove(&id)
    }

    /// Number of queries served, whatever the method.
    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    fn matching(&self, field: &str, values: &[LookupValue]) -> Vec<Article> {
        self.articles
            .lock()
            .unwrap()
            .values()
            .rev()
            .filter(|a| a.attribute(field).is_some_and(|v| values.contains(&v)))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl RecordStore<Article> for ArticleStore {
    async fn find(&self, field: &str, value: &LookupValue) -> Result<Option<Article>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .matching(field, std::slice::from_ref(value))
            .into_iter()
            .next())
    }

    async fn find_many(&self, field: &str, values: &[LookupValue]) -> Result<Vec<Article>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(self.matching(field, values))
    }

    async fn filter(&self, filter: &RecordFilter) -> Result<Vec<Article>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .articles
            .lock()
            .unwrap()
            .values()
            .filter(|a| filter.matches(*a))
            .cloned()
            .collect())
    }
}
