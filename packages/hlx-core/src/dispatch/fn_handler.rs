//! Adapts an async closure to [`Handler`] so sub-controllers can register
//! a bound method without a hand-written adapter struct per verb.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::connection::Connection;

use super::dispatcher::Handler;

pub struct FnHandler<F> {
    f: F,
}

impl<F, Fut> FnHandler<F>
where
    F: Fn(Arc<dyn Connection>, Vec<String>) -> Fut + Send + Sync,
    Fut: Future<Output = ()> + Send + 'static,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> Handler for FnHandler<F>
where
    F: Fn(Arc<dyn Connection>, Vec<String>) -> Fut + Send + Sync,
    Fut: Future<Output = ()> + Send + 'static,
{
    async fn handle(&self, connection: Arc<dyn Connection>, captures: Vec<String>) {
        (self.f)(connection, captures).await
    }
}
