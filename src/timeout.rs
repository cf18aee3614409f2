// Same shape as async-std's future::timeout, with futures_timer providing the
// delay so no runtime is assumed.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use futures_timer::Delay;
use pin_project_lite::pin_project;

/// Waits on `fut` for at most `dur`.
pub(crate) async fn timeout<F, T>(dur: Duration, fut: F) -> Result<T, Elapsed>
where
    F: Future<Output = T>,
{
    Deadline {
        fut,
        delay: Delay::new(dur),
    }
    .await
}

pin_project! {
    struct Deadline<F> {
        #[pin]
        fut: F,
        #[pin]
        delay: Delay,
    }
}

impl<F: Future> Future for Deadline<F> {
    type Output = Result<F::Output, Elapsed>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        match this.fut.poll(cx) {
            Poll::Ready(v) => Poll::Ready(Ok(v)),
            Poll::Pending => match this.delay.poll(cx) {
                Poll::Ready(_) => Poll::Ready(Err(Elapsed)),
                Poll::Pending => Poll::Pending,
            },
        }
    }
}

/// The deadline passed before the future finished.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct Elapsed;
