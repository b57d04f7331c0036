use serde::Serialize;
use serde::de::DeserializeOwned;

use super::keyed::{Applied, Keyed, KeyedList, Patch};

/// Event-to-patch table for one live feed.
///
/// Implementors are marker types ([`OrderFeed`](super::orders::OrderFeed),
/// [`BillFeed`](super::bills::BillFeed)); all state lives in the
/// [`KeyedList`] the synchronizer owns.
pub trait FeedReducer: Send + Sync + 'static {
    type Entity: Keyed + Clone + Serialize + Send + Sync + std::fmt::Debug + 'static;
    type Event: DeserializeOwned + Send + std::fmt::Debug + 'static;

    /// Feed label used in logs, errors and URLs.
    const NAME: &'static str;

    /// Translate one event into its effect on the list.
    fn patch(event: Self::Event) -> Patch<Self::Entity>;

    /// Wire name of an event, for logging.
    fn event_kind(event: &Self::Event) -> &'static str;

    /// Id of the entity an event targets; `None` for snapshots.
    fn event_id(event: &Self::Event) -> Option<&str>;
}

/// Apply one decoded event to a list, returning the next list.
pub fn reduce<R: FeedReducer>(
    list: &KeyedList<R::Entity>,
    event: R::Event,
) -> (KeyedList<R::Entity>, Applied) {
    list.apply(R::patch(event))
}

/// Fold a sequence of events over an empty list.
pub fn replay<R, I>(events: I) -> KeyedList<R::Entity>
where
    R: FeedReducer,
    I: IntoIterator<Item = R::Event>,
{
    events
        .into_iter()
        .fold(KeyedList::default(), |list, event| reduce::<R>(&list, event).0)
}
