use crate::event::Event;
use futures::Stream;
use std::{
    pin::Pin,
    task::{Context, Poll},
};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

/// A stream of membership events published by a running node.
///
/// Events missed because the subscriber fell behind are skipped.
#[derive(Debug)]
pub struct Handle {
    event_rx: BroadcastStream<Event>,
}

impl Handle {
    pub fn new(event_rx: broadcast::Receiver<Event>) -> Self {
        Handle {
            event_rx: BroadcastStream::new(event_rx),
        }
    }
}

impl Stream for Handle {
    type Item = Event;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            match Pin::new(&mut self.event_rx).poll_next(cx) {
                Poll::Ready(Some(Ok(event))) => return Poll::Ready(Some(event)),
                Poll::Ready(Some(Err(lagged))) => {
                    tracing::debug!(error = %lagged, "event subscriber lagged");
                }
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use std::net::Ipv4Addr;

    #[test]
    fn unpin() {
        fn assert_unpin<T: Unpin>(_: T) {}

        let (_tx, rx) = broadcast::channel::<Event>(10);

        assert_unpin(Handle::new(rx));
    }

    #[tokio::test]
    async fn skips_lagged() {
        let (tx, rx) = broadcast::channel(2);
        let handle = Handle::new(rx);

        for last in 1..=4 {
            tx.send(Event::Joined(Ipv4Addr::new(10, 0, 0, last).into()))
                .unwrap();
        }
        drop(tx);

        let events = handle.collect::<Vec<_>>().await;
        assert_eq!(
            events,
            vec![
                Event::Joined(Ipv4Addr::new(10, 0, 0, 3).into()),
                Event::Joined(Ipv4Addr::new(10, 0, 0, 4).into()),
            ]
        );
    }
}
