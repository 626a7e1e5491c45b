//! Lazy pagination over collection endpoints.
//!
//! A [`Pages`] cursor fetches one page per call, following the envelope's
//! `_links.next` href until exhaustion. A page fetch failure aborts the
//! whole listing with an error: callers never see a silently truncated
//! result.

use crate::client::ApiClient;
use crate::error::ApiResult;
use crate::query::ListQuery;
use serde::de::DeserializeOwned;

enum Cursor {
    /// First page: resource path plus the original query.
    Start { resource: &'static str, query: ListQuery },
    /// Follow-up page by href.
    Next(String),
    /// Listing exhausted.
    Done,
}

/// Cursor over the pages of a collection listing.
pub struct Pages<'a, T> {
    client: &'a ApiClient,
    token: Option<&'a str>,
    cursor: Cursor,
    _marker: std::marker::PhantomData<T>,
}

impl<'a, T: DeserializeOwned> Pages<'a, T> {
    pub(crate) fn new(
        client: &'a ApiClient,
        resource: &'static str,
        query: ListQuery,
        token: Option<&'a str>,
    ) -> Self {
        Self {
            client,
            token,
            cursor: Cursor::Start { resource, query },
            _marker: std::marker::PhantomData,
        }
    }

    /// Fetch the next page. `Ok(None)` once the listing is exhausted.
    pub async fn next(&mut self) -> ApiResult<Option<Vec<T>>> {
        let response = match &self.cursor {
            Cursor::Done => return Ok(None),
            Cursor::Start { resource, query } => {
                self.client.get_list::<T>(resource, query, self.token).await?
            }
            Cursor::Next(href) => self.client.get_href::<T>(href, self.token).await?,
        };

        self.cursor = match response.next_href() {
            Some(href) => Cursor::Next(href.to_string()),
            None => Cursor::Done,
        };

        Ok(Some(response.items))
    }

    /// Follow `next` links to exhaustion and concatenate all items in
    /// order. Aborts with the first page error.
    pub async fn collect_all(mut self) -> ApiResult<Vec<T>> {
        let mut items = Vec::new();
        while let Some(page) = self.next().await? {
            items.extend(page);
        }
        Ok(items)
    }
}
