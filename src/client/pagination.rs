//! Lazy pagination over the platform's `{count, next, results}` page
//! envelope.
//!
//! A stream fetches the next page only once the caller has drained the
//! buffered items, and ends as soon as the platform reports no `next`
//! link. Calling the listing operation again yields a fresh, restartable
//! stream.

use crate::client::transport::{with_retry, RetryPolicy, Transport};
use crate::domain::AwxError;
use futures::stream::{self, Stream, StreamExt};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Arc;

pub type PageStream<T> = Pin<Box<dyn Stream<Item = Result<T, AwxError>> + Send>>;

#[derive(Debug, Deserialize)]
struct PageEnvelope {
    #[allow(dead_code)]
    count: i64,
    next: Option<String>,
    #[serde(default)]
    results: Vec<Value>,
}

struct PageState<T> {
    transport: Arc<dyn Transport>,
    retry: RetryPolicy,
    /// Path of the next page to fetch; `None` once exhausted.
    next: Option<(String, Vec<(String, String)>)>,
    buffered: VecDeque<T>,
}

/// Build a lazy stream of `T` over all pages of `path`. The query only
/// applies to the first request; `next` links carry their own.
pub fn paginate<T>(
    transport: Arc<dyn Transport>,
    retry: RetryPolicy,
    path: String,
    query: Vec<(String, String)>,
) -> PageStream<T>
where
    T: DeserializeOwned + Send + 'static,
{
    let state = PageState {
        transport,
        retry,
        next: Some((path, query)),
        buffered: VecDeque::new(),
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.buffered.pop_front() {
                return Some((Ok(item), state));
            }
            let (path, query) = state.next.take()?;

            let transport = Arc::clone(&state.transport);
            let page = with_retry(state.retry, "list", || {
                let transport = Arc::clone(&transport);
                let path = path.clone();
                let query = query.clone();
                async move {
                    transport
                        .request_json(Method::GET, &path, &query, None)
                        .await
                }
            })
            .await;

            let page = match page {
                Ok(value) => value,
                Err(e) => return Some((Err(e), state)),
            };

            let envelope: PageEnvelope = match serde_json::from_value(page) {
                Ok(envelope) => envelope,
                Err(e) => {
                    return Some((
                        Err(AwxError::protocol(format!("malformed page envelope: {e}"))),
                        state,
                    ));
                }
            };

            state.next = envelope.next.map(|next| (next, Vec::new()));
            for result in envelope.results {
                match serde_json::from_value::<T>(result) {
                    Ok(item) => state.buffered.push_back(item),
                    Err(e) => {
                        return Some((
                            Err(AwxError::protocol(format!("malformed list item: {e}"))),
                            state,
                        ));
                    }
                }
            }
            // Empty page with no next link ends the stream on the next
            // loop iteration.
            if state.buffered.is_empty() && state.next.is_none() {
                return None;
            }
        }
    })
    .boxed()
}
