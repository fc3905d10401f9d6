//! Retriever collaborator boundary.
//!
//! The retrieval/embedding pipeline is external to the orchestration core.
//! Engines consume it through this trait: a query string in, a ranked list
//! of context snippets out, optionally filtered by the role a snippet must
//! mention. `SharedRetriever` is the Arc-based type-erased handle -- one
//! retriever index is shared by every engine of a mode.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use colloquy_types::error::EngineError;

/// Trait for context retrieval backends.
pub trait Retriever: Send + Sync {
    /// Retrieve up to `top_k` snippets relevant to `query`.
    ///
    /// When `role_filter` is set, only snippets tagged with that role are
    /// eligible.
    fn retrieve(
        &self,
        query: &str,
        role_filter: Option<&str>,
        top_k: usize,
    ) -> impl Future<Output = Result<Vec<String>, EngineError>> + Send;
}

/// Object-safe version of [`Retriever`] with boxed futures.
pub trait RetrieverDyn: Send + Sync {
    fn retrieve_boxed<'a>(
        &'a self,
        query: &'a str,
        role_filter: Option<&'a str>,
        top_k: usize,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<String>, EngineError>> + Send + 'a>>;
}

impl<T: Retriever> RetrieverDyn for T {
    fn retrieve_boxed<'a>(
        &'a self,
        query: &'a str,
        role_filter: Option<&'a str>,
        top_k: usize,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<String>, EngineError>> + Send + 'a>> {
        Box::pin(self.retrieve(query, role_filter, top_k))
    }
}

/// Shared, type-erased retriever handle.
#[derive(Clone)]
pub struct SharedRetriever {
    inner: Arc<dyn RetrieverDyn>,
}

impl SharedRetriever {
    pub fn new<T: Retriever + 'static>(retriever: T) -> Self {
        Self {
            inner: Arc::new(retriever),
        }
    }

    pub async fn retrieve(
        &self,
        query: &str,
        role_filter: Option<&str>,
        top_k: usize,
    ) -> Result<Vec<String>, EngineError> {
        self.inner.retrieve_boxed(query, role_filter, top_k).await
    }
}
