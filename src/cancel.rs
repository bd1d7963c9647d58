use tokio_util::sync::CancellationToken;

/// A cooperative cancellation handle the combinators can fire.
///
/// The library does not ship its own stop token; it consumes one. The
/// fail-fast combinators call [`request`](Cancel::request) exactly once, on
/// their decisive event (the first failure for the `all` family, the first
/// success for the `any` family). Callback registration stays on the token's
/// own surface; awaitables that want to observe cancellation unwind through
/// ordinary failure propagation.
pub trait Cancel {
    /// Whether cancellation has been requested.
    fn is_requested(&self) -> bool;

    /// Requests cancellation. Idempotent.
    fn request(&self);
}

impl<C: Cancel + ?Sized> Cancel for &C {
    fn is_requested(&self) -> bool {
        (**self).is_requested()
    }

    fn request(&self) {
        (**self).request()
    }
}

impl Cancel for CancellationToken {
    fn is_requested(&self) -> bool {
        self.is_cancelled()
    }

    fn request(&self) {
        self.cancel()
    }
}
