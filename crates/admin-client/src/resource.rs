//! Collection wrapper with loading/error state
//!
//! One `Resource` per backend collection (`/categories`, `/orders`, ...).
//! Every operation goes through the authenticated client, tracks `loading`
//! and `error`, and reports its outcome through a `NotificationSink`:
//! failures as one error notification carrying the normalized message,
//! mutations as a success notification. Mutations reload the list with the
//! current filters.
//!
//! The backend wraps every answer in `{success, data, ...}`; `success: false`
//! on a 2xx is treated as a failure.

use std::sync::Arc;

use notifications::NotificationSink;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::client::ApiClient;
use crate::error::{Error, Result};
use crate::request::{RequestOptions, query_pairs};

fn default_success() -> bool {
    true
}

/// `GET <collection>` envelope.
#[derive(Debug, Deserialize)]
pub struct ListResponse<T> {
    #[serde(default = "default_success")]
    pub success: bool,
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    /// Passed through untouched; its shape varies per collection.
    #[serde(default)]
    pub pagination: Option<Value>,
    #[serde(default)]
    pub count: Option<u64>,
}

/// Single-item envelope (get, create, update, delete).
#[derive(Debug, Deserialize)]
pub struct ItemResponse<T> {
    #[serde(default = "default_success")]
    pub success: bool,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
}

pub struct Resource<T> {
    client: ApiClient,
    path: String,
    name: String,
    notifier: Arc<dyn NotificationSink>,
    filters: Vec<(String, String)>,
    items: Vec<T>,
    selected: Option<T>,
    pagination: Option<Value>,
    count: Option<u64>,
    loading: bool,
    error: Option<String>,
}

impl<T: DeserializeOwned> Resource<T> {
    /// `path` is the collection path; `name` is the singular noun used in
    /// messages ("category" → "Category created successfully").
    pub fn new(
        client: ApiClient,
        path: impl Into<String>,
        name: impl Into<String>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            client,
            path: path.into(),
            name: name.into(),
            notifier,
            filters: Vec::new(),
            items: Vec::new(),
            selected: None,
            pagination: None,
            count: None,
            loading: false,
            error: None,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn selected(&self) -> Option<&T> {
        self.selected.as_ref()
    }

    pub fn pagination(&self) -> Option<&Value> {
        self.pagination.as_ref()
    }

    pub fn count(&self) -> Option<u64> {
        self.count
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Message of the last failed operation, cleared when the next starts.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn filters(&self) -> &[(String, String)] {
        &self.filters
    }

    /// Replace the list filters. Empty values and `"all"` are dropped.
    pub fn set_filters<I, K>(&mut self, filters: I)
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        self.filters = filters
            .into_iter()
            .flat_map(|(key, value)| query_pairs(key.as_ref(), &value))
            .collect();
    }

    /// Load the collection with the current filters.
    pub async fn fetch_all(&mut self) -> Result<()> {
        self.begin();
        let options = RequestOptions {
            query: self.filters.clone(),
            ..RequestOptions::get()
        };
        let result = self
            .client
            .request::<ListResponse<T>>(&self.path, options)
            .await
            .and_then(|response| {
                if response.success {
                    Ok(response)
                } else {
                    Err(Error::Rejected(format!("Failed to fetch {} list", self.name)))
                }
            });

        match result {
            Ok(response) => {
                debug!(path = %self.path, items = response.data.len(), "collection loaded");
                self.items = response.data;
                self.pagination = response.pagination;
                self.count = response.count;
                self.loading = false;
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Load one item into `selected`. A missing item is `Ok(None)` with
    /// `error` set, not a failure notification.
    pub async fn fetch_one(&mut self, id: &str) -> Result<Option<&T>> {
        self.begin();
        let path = self.item_path(id);
        let result = self
            .client
            .request::<ItemResponse<T>>(&path, RequestOptions::get())
            .await;
        match result {
            Ok(response) => {
                self.selected = response.data;
                if self.selected.is_none() {
                    self.error = Some(format!("{} not found", capitalize(&self.name)));
                }
                self.loading = false;
                Ok(self.selected.as_ref())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    pub async fn create<B: Serialize + ?Sized>(&mut self, body: &B) -> Result<Option<T>> {
        let options = RequestOptions::post().json(body)?;
        let path = self.path.clone();
        self.mutate(&path, options, "create", "created").await
    }

    pub async fn update<B: Serialize + ?Sized>(&mut self, id: &str, body: &B) -> Result<Option<T>> {
        let options = RequestOptions::patch().json(body)?;
        let path = self.item_path(id);
        self.mutate(&path, options, "update", "updated").await
    }

    pub async fn remove(&mut self, id: &str) -> Result<()> {
        let path = self.item_path(id);
        self.mutate(&path, RequestOptions::delete(), "delete", "deleted")
            .await
            .map(|_| ())
    }

    async fn mutate(
        &mut self,
        path: &str,
        options: RequestOptions,
        action: &str,
        past: &str,
    ) -> Result<Option<T>> {
        self.begin();
        let result = self
            .client
            .request::<ItemResponse<T>>(path, options)
            .await
            .and_then(|response| {
                if response.success {
                    Ok(response.data)
                } else {
                    Err(Error::Rejected(response.message.unwrap_or_else(|| {
                        format!("Failed to {action} {}", self.name)
                    })))
                }
            });

        match result {
            Ok(data) => {
                self.loading = false;
                self.notifier
                    .notify_success(&format!("{} {past} successfully", capitalize(&self.name)));
                self.fetch_all().await?;
                Ok(data)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    fn item_path(&self, id: &str) -> String {
        format!("{}/{}", self.path.trim_end_matches('/'), id)
    }

    fn begin(&mut self) {
        self.loading = true;
        self.error = None;
    }

    /// Record and surface a failure as exactly one error notification.
    fn fail(&mut self, error: Error) -> Error {
        let message = error.message();
        debug!(path = %self.path, error = ?error, "resource operation failed");
        self.notifier.notify_error(&message);
        self.error = Some(message);
        self.loading = false;
        error
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
