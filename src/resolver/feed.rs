//! Seams between the resolver and the surface hosting it

use async_trait::async_trait;

use crate::link::LinkLocation;

/// A change observed on the surface while a resolution attempt runs
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LinkEvent {
    /// The location changed after the initial load, e.g. a late fragment
    LocationChanged(LinkLocation),
    /// The surface is going away, typically because the OS handed
    /// control to the native app
    Unloaded,
}

/// Source of location events for one resolution attempt
///
/// An HTTP request is a closed feed: everything it will ever know is in
/// the initial location, and `next` returns `None` immediately. An
/// interactive surface keeps the feed open and delivers events as they
/// happen.
#[async_trait]
pub trait LinkEvents: Send {
    /// Wait for the next event; `None` means the feed is closed
    async fn next(&mut self) -> Option<LinkEvent>;

    /// Latest observable location, for poll-driven re-reads
    ///
    /// Surfaces that cannot be re-read return `None` and the resolver
    /// relies on events alone.
    fn current(&self) -> Option<LinkLocation>;
}

/// Feed for one-shot surfaces, closed from the start
pub struct SnapshotFeed;

#[async_trait]
impl LinkEvents for SnapshotFeed {
    async fn next(&mut self) -> Option<LinkEvent> {
        None
    }

    fn current(&self) -> Option<LinkLocation> {
        None
    }
}

/// Sink for navigations ordered by the resolver
///
/// Outcomes carry their target URLs as well, so surfaces that answer
/// with a redirect instead of following one use [`NoopNavigator`].
#[async_trait]
pub trait Navigator: Send + Sync {
    async fn navigate(&self, url: &str);
}

/// Navigator for surfaces that render the outcome themselves
pub struct NoopNavigator;

#[async_trait]
impl Navigator for NoopNavigator {
    async fn navigate(&self, _url: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_snapshot_feed_is_closed() {
        let mut feed = SnapshotFeed;
        assert_eq!(feed.next().await, None);
        assert!(feed.current().is_none());
    }
}
