//! Search pipeline: combine-latest of results and filter text
//!
//! The pipeline watches two observables and keeps a third one, the view
//! state, equal to `filter(latest collection, latest filter text)`. Either
//! input changing is enough to recompute; the other side contributes its
//! most recent value.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::error::{Result, SearchError};
use crate::observable::{Observable, Publisher};
use crate::types::{FilterText, Movie, ResultCollection, ViewState};

/// Case-insensitive substring filter over titles
///
/// `None` and the empty string both mean "no filter" and return every item.
/// Whitespace is significant. Matching items keep their relative order.
pub fn filter(items: &[Movie], text: Option<&str>) -> Vec<Movie> {
    match text {
        Some(text) if !text.is_empty() => {
            let needle = text.to_lowercase();
            items
                .iter()
                .filter(|movie| movie.title.to_lowercase().contains(&needle))
                .cloned()
                .collect()
        }
        _ => items.to_vec(),
    }
}

fn project(items: &ResultCollection, text: &FilterText) -> ViewState {
    match text.as_deref() {
        Some(text) if !text.is_empty() => Arc::new(filter(items, Some(text))),
        // No filter: share the collection instead of copying it
        _ => Arc::clone(items),
    }
}

/// Reactive combinator producing the view state
pub struct SearchPipeline {
    view_state: Observable<ViewState>,
    task: JoinHandle<()>,
}

impl SearchPipeline {
    /// Wire the pipeline to its inputs and start the combiner task
    ///
    /// The view state is available immediately, computed from the inputs'
    /// current values; it does not wait for either input to change.
    ///
    /// # Errors
    ///
    /// Returns `SearchError::NoRuntime` when called outside a tokio runtime.
    pub fn spawn(
        collection: Observable<ResultCollection>,
        filter_text: Observable<FilterText>,
    ) -> Result<Self> {
        let handle = tokio::runtime::Handle::try_current().map_err(|_| SearchError::NoRuntime)?;

        let (mut items, mut collections) = collection.snapshot();
        let (mut text, mut filters) = filter_text.snapshot();

        let publisher = Publisher::new(project(&items, &text));
        let view_state = publisher.observable();

        let task = handle.spawn(async move {
            let mut collections_open = true;
            let mut filters_open = true;

            while collections_open || filters_open {
                tokio::select! {
                    next = collections.next(), if collections_open => match next {
                        Some(latest) => {
                            trace!(items = latest.len(), "Collection changed");
                            items = latest;
                        }
                        None => {
                            collections_open = false;
                            continue;
                        }
                    },
                    next = filters.next(), if filters_open => match next {
                        Some(latest) => {
                            trace!(filter = ?latest, "Filter text changed");
                            text = latest;
                        }
                        None => {
                            filters_open = false;
                            continue;
                        }
                    },
                }

                publisher.publish(project(&items, &text));
            }

            debug!("Search pipeline inputs closed");
        });

        Ok(Self { view_state, task })
    }

    /// The filtered list to render
    pub fn view_state(&self) -> Observable<ViewState> {
        self.view_state.clone()
    }

    /// Stop recomputing; watchers of the view state complete
    pub fn shutdown(&self) {
        self.task.abort();
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for SearchPipeline {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    fn movies(titles: &[&str]) -> Vec<Movie> {
        titles
            .iter()
            .map(|t| Movie::new(*t, format!("https://img/{}.jpg", t)))
            .collect()
    }

    fn titles(items: &[Movie]) -> Vec<&str> {
        items.iter().map(|m| m.title.as_str()).collect()
    }

    async fn next_view(watcher: &mut crate::observable::Watcher<ViewState>) -> ViewState {
        timeout(Duration::from_secs(1), watcher.next())
            .await
            .expect("view state did not update")
            .expect("view state closed")
    }

    #[test]
    fn test_filter_scenario() {
        let items = movies(&["Iron Man", "Thor", "Iron Fist"]);
        assert_eq!(
            titles(&filter(&items, Some("iron"))),
            vec!["Iron Man", "Iron Fist"]
        );
    }

    #[test]
    fn test_filter_is_case_insensitive() {
        let items = movies(&["Iron Man", "Thor", "Iron Fist"]);
        assert_eq!(filter(&items, Some("IRON")), filter(&items, Some("iron")));
        assert_eq!(titles(&filter(&items, Some("tHoR"))), vec!["Thor"]);
    }

    #[test]
    fn test_absent_and_empty_filter_return_everything() {
        let items = movies(&["Iron Man", "Thor", "Iron Fist"]);
        assert_eq!(filter(&items, None), items);
        assert_eq!(filter(&items, Some("")), items);
    }

    #[test]
    fn test_whitespace_is_not_trimmed() {
        let items = movies(&["Iron Man", "Thor"]);
        assert!(filter(&items, Some(" ")).len() == 1);
        assert!(filter(&items, Some("  ")).is_empty());
    }

    #[test]
    fn test_filter_is_stable_subsequence() {
        let items = movies(&["b man", "a", "c man", "d", "a man"]);
        let result = filter(&items, Some("man"));

        let mut cursor = items.iter();
        for found in &result {
            assert!(cursor.any(|m| m == found), "order not preserved");
        }
        assert_eq!(titles(&result), vec!["b man", "c man", "a man"]);
    }

    #[test]
    fn test_filter_only_matching_and_idempotent() {
        let items = movies(&["Avengers", "Ant-Man", "Black Panther", "Captain Marvel"]);
        for text in ["an", "AN", "x", "", "marvel", "-"] {
            let once = filter(&items, Some(text));
            for movie in &once {
                assert!(movie.title.to_lowercase().contains(&text.to_lowercase()));
            }
            assert_eq!(filter(&once, Some(text)), once);
        }
    }

    #[test]
    fn test_filter_unicode_lowercasing() {
        let items = movies(&["AMÉLIE", "Léon"]);
        assert_eq!(titles(&filter(&items, Some("amé"))), vec!["AMÉLIE"]);
    }

    #[test]
    fn test_spawn_outside_runtime() {
        let collection = Publisher::new(ResultCollection::default());
        let text = Publisher::new(FilterText::None);
        let result = SearchPipeline::spawn(collection.observable(), text.observable());
        assert!(matches!(result, Err(SearchError::NoRuntime)));
    }

    #[tokio::test]
    async fn test_initial_view_without_any_emission() {
        let collection = Publisher::new(Arc::new(movies(&["Thor"])));
        let text = Publisher::new(None);

        let pipeline = SearchPipeline::spawn(collection.observable(), text.observable()).unwrap();

        assert_eq!(titles(&pipeline.view_state().get()), vec!["Thor"]);
    }

    #[tokio::test]
    async fn test_collection_before_filter_text_emits() {
        let collection = Publisher::new(ResultCollection::default());
        let text = Publisher::new(None);
        let pipeline = SearchPipeline::spawn(collection.observable(), text.observable()).unwrap();
        let mut view = pipeline.view_state().watch();

        assert!(next_view(&mut view).await.is_empty());

        collection.publish(Arc::new(movies(&["Iron Man", "Thor"])));
        assert_eq!(titles(&next_view(&mut view).await), vec!["Iron Man", "Thor"]);
    }

    #[tokio::test]
    async fn test_recomputes_on_either_input() {
        let collection = Publisher::new(ResultCollection::default());
        let text = Publisher::new(None);
        let pipeline = SearchPipeline::spawn(collection.observable(), text.observable()).unwrap();
        let (_, mut view) = pipeline.view_state().snapshot();

        text.publish(Some("iron".to_string()));
        assert!(next_view(&mut view).await.is_empty());

        collection.publish(Arc::new(movies(&["Iron Man", "Thor", "Iron Fist"])));
        assert_eq!(
            titles(&next_view(&mut view).await),
            vec!["Iron Man", "Iron Fist"]
        );

        text.publish(Some(String::new()));
        assert_eq!(
            titles(&next_view(&mut view).await),
            vec!["Iron Man", "Thor", "Iron Fist"]
        );

        text.publish(None);
        assert_eq!(next_view(&mut view).await.len(), 3);
    }

    #[tokio::test]
    async fn test_identical_results_still_emit() {
        let collection = Publisher::new(Arc::new(movies(&["Thor"])));
        let text = Publisher::new(None);
        let pipeline = SearchPipeline::spawn(collection.observable(), text.observable()).unwrap();
        let (_, mut view) = pipeline.view_state().snapshot();

        text.publish(Some("thor".to_string()));
        text.publish(Some("THOR".to_string()));

        assert_eq!(next_view(&mut view).await.len(), 1);
        assert_eq!(next_view(&mut view).await.len(), 1);
    }

    #[tokio::test]
    async fn test_survives_one_input_closing() {
        let collection = Publisher::new(Arc::new(movies(&["Iron Man", "Thor"])));
        let text = Publisher::new(None);
        let pipeline = SearchPipeline::spawn(collection.observable(), text.observable()).unwrap();
        let (_, mut view) = pipeline.view_state().snapshot();

        drop(collection);
        text.publish(Some("thor".to_string()));

        assert_eq!(titles(&next_view(&mut view).await), vec!["Thor"]);
        assert!(pipeline.is_running());

        drop(text);
        assert_eq!(
            timeout(Duration::from_secs(1), view.next()).await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_shutdown_completes_view() {
        let collection = Publisher::new(ResultCollection::default());
        let text = Publisher::new(None);
        let pipeline = SearchPipeline::spawn(collection.observable(), text.observable()).unwrap();
        let (_, mut view) = pipeline.view_state().snapshot();

        pipeline.shutdown();

        assert_eq!(
            timeout(Duration::from_secs(1), view.next()).await.unwrap(),
            None
        );
        text.publish(Some("late".to_string()));
        assert!(pipeline.view_state().is_closed());
    }
}
