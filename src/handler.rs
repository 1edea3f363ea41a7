//! Request handlers.
use super::{reply::Reply, Response};
use futures::future::{BoxFuture, FutureExt};
use hyper::Request;
use std::{future::Future, marker::PhantomData, net::SocketAddr};

/// Something that turns requests into responses.
///
/// Handlers are shared between every in-flight request, so they must be [Sync], and the futures
/// they return can't borrow from them.
pub trait Handler<B>: Sync + Send {
    fn handle(&self, req: Request<B>, addr: SocketAddr) -> BoxFuture<'static, Response>;
}

/// A [Handler] implemented by a closure.
///
/// ```
/// use std::net::SocketAddr;
/// use veil::handler::HandlerFn;
///
/// let _h = HandlerFn::new(|req: hyper::Request<()>, _: SocketAddr| async move {
///     format!("you asked for {}", req.uri())
/// });
/// ```
pub struct HandlerFn<P, Fut> {
    fun: P,
    tag: PhantomData<fn(Fut)>,
}

impl<P, Fut> HandlerFn<P, Fut> {
    pub fn new<B>(fun: P) -> Self
    where
        P: Fn(Request<B>, SocketAddr) -> Fut,
    {
        Self {
            fun,
            tag: PhantomData,
        }
    }
}

impl<B, P, Fut, Resp> Handler<B> for HandlerFn<P, Fut>
where
    P: Fn(Request<B>, SocketAddr) -> Fut + Sync + Send,
    Fut: Future<Output = Resp> + Send + 'static,
    Resp: Reply + 'static,
{
    fn handle(&self, req: Request<B>, addr: SocketAddr) -> BoxFuture<'static, Response> {
        (self.fun)(req, addr).map(Reply::into_response).boxed()
    }
}
