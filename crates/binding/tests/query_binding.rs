//! Integration tests for `QueryBinding` against the in-memory engine.

mod common;

use common::{names, Fixture};
use livebind::{ConnectionContext, ConnectionProvider, QueryBinding, QuerySpec, RenderFlag};
use livebind_core::{Connection, Results, SortDescriptor, Value};
use livebind_memory::{Database, Error, MemoryResults};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

fn people() -> QuerySpec<MemoryResults> {
    QuerySpec::objects("Person")
}

fn adults() -> QuerySpec<MemoryResults> {
    people().with_filter("age > 30")
}

#[test]
fn test_returns_none_without_connection() {
    let flag = RenderFlag::new();
    let mut binding: QueryBinding<Database> = QueryBinding::new(ConnectionContext::default(), flag.clone());
    assert!(binding.evaluate(&people()).unwrap().is_none());
    assert!(!binding.is_subscribed());

    let provider: ConnectionProvider<Database> = ConnectionProvider::new(None);
    let mut binding = QueryBinding::new(provider.context(), flag);
    assert!(binding.evaluate(&people()).unwrap().is_none());
}

mod type_source {
    use super::*;

    #[test]
    fn test_returns_all_records() {
        let fx = Fixture::new();
        let (mut binding, _) = fx.binding();
        assert_eq!(binding.evaluate(&people()).unwrap().unwrap().len(), 2);
        assert!(binding.is_subscribed());
    }

    #[test]
    fn test_rerenders_when_record_is_added() {
        let fx = Fixture::new();
        let (mut binding, flag) = fx.binding();
        binding.evaluate(&people()).unwrap();

        fx.upsert(&[("id", "p3".into()), ("name", "Person 3".into()), ("age", 40.into())]);
        assert!(flag.take());
        assert_eq!(binding.evaluate(&people()).unwrap().unwrap().len(), 3);
    }

    #[test]
    fn test_rerenders_when_record_is_updated() {
        let fx = Fixture::new();
        let (mut binding, flag) = fx.binding();
        binding.evaluate(&people()).unwrap();

        fx.upsert(&[("id", "p1".into()), ("name", "Person 1 Updated".into())]);
        assert_eq!(flag.requests(), 1);
        assert_eq!(binding.evaluate(&people()).unwrap().unwrap().len(), 2);
    }

    #[test]
    fn test_rerenders_when_record_is_deleted() {
        let fx = Fixture::new();
        let (mut binding, flag) = fx.binding();
        binding.evaluate(&people()).unwrap();

        fx.delete_person("p1");
        assert_eq!(flag.requests(), 1);
        assert_eq!(binding.evaluate(&people()).unwrap().unwrap().len(), 1);
    }

    #[test]
    fn test_does_not_rerender_when_nothing_changed() {
        let fx = Fixture::new();
        let (mut binding, flag) = fx.binding();
        binding.evaluate(&people()).unwrap();

        fx.db.write(|_| Ok(())).unwrap();
        assert_eq!(flag.requests(), 0);
        assert_eq!(binding.evaluate(&people()).unwrap().unwrap().len(), 2);
    }

    #[test]
    fn test_same_spec_reuses_handle() {
        let fx = Fixture::new();
        let (mut binding, _) = fx.binding();
        let first = binding.evaluate(&adults()).unwrap().unwrap();
        let second = binding.evaluate(&adults()).unwrap().unwrap();
        assert_eq!(first.id(), second.id());
        assert_eq!(fx.db.listener_count(), 1);
    }

    #[test]
    fn test_filter_without_variables() {
        let fx = Fixture::new();
        let (mut binding, _) = fx.binding();
        assert_eq!(binding.evaluate(&adults()).unwrap().unwrap().len(), 1);
    }

    #[test]
    fn test_filter_with_variables() {
        let fx = Fixture::new();
        let (mut binding, _) = fx.binding();
        let spec = people().with_filter("age > $0").with_variables([30]);
        assert_eq!(binding.evaluate(&spec).unwrap().unwrap().len(), 1);
    }

    #[test]
    fn test_filter_string_change_rederives() {
        let fx = Fixture::new();
        let (mut binding, _) = fx.binding();

        let older = people().with_filter("age > $0").with_variables([30]);
        let first = binding.evaluate(&older).unwrap().unwrap();
        assert_eq!(names(&first), ["Person 2"]);

        let younger = people().with_filter("age < $0").with_variables([30]);
        let second = binding.evaluate(&younger).unwrap().unwrap();
        assert_ne!(first.id(), second.id());
        assert_eq!(names(&second), ["Person 1"]);
        // The old handle's listener is gone
        assert_eq!(fx.db.listener_count(), 1);
        assert_eq!(first.listener_count(), 0);
    }

    #[test]
    fn test_filter_variables_change_rederives() {
        let fx = Fixture::new();
        let (mut binding, _) = fx.binding();

        let spec = people().with_filter("age > $0").with_variables([30]);
        assert_eq!(binding.evaluate(&spec).unwrap().unwrap().len(), 1);

        let spec = people().with_filter("age > $0").with_variables([40]);
        assert_eq!(binding.evaluate(&spec).unwrap().unwrap().len(), 0);
    }

    #[test]
    fn test_rerenders_when_matching_record_is_added() {
        let fx = Fixture::new();
        let (mut binding, flag) = fx.binding();
        assert_eq!(binding.evaluate(&adults()).unwrap().unwrap().len(), 1);

        fx.upsert(&[("id", "p3".into()), ("name", "Person 3".into()), ("age", 40.into())]);
        assert_eq!(flag.requests(), 1);
        assert_eq!(binding.evaluate(&adults()).unwrap().unwrap().len(), 2);
    }

    #[test]
    fn test_no_rerender_when_non_matching_record_is_added() {
        let fx = Fixture::new();
        let (mut binding, flag) = fx.binding();
        binding.evaluate(&adults()).unwrap();

        fx.upsert(&[("id", "p3".into()), ("name", "Person 3".into()), ("age", 20.into())]);
        assert_eq!(flag.requests(), 0);
        assert_eq!(binding.evaluate(&adults()).unwrap().unwrap().len(), 1);
    }

    #[test]
    fn test_rerenders_when_matching_record_is_updated() {
        let fx = Fixture::new();
        let (mut binding, flag) = fx.binding();
        binding.evaluate(&adults()).unwrap();

        fx.upsert(&[("id", "p2".into()), ("name", "Person 2 Updated".into())]);
        assert_eq!(flag.requests(), 1);
        let adults_now = binding.evaluate(&adults()).unwrap().unwrap();
        assert_eq!(names(&adults_now), ["Person 2 Updated"]);
    }

    #[test]
    fn test_no_rerender_when_non_matching_record_is_updated() {
        let fx = Fixture::new();
        let (mut binding, flag) = fx.binding();
        binding.evaluate(&adults()).unwrap();

        fx.upsert(&[("id", "p1".into()), ("name", "Person 1 Updated".into())]);
        assert_eq!(flag.requests(), 0);
    }

    #[test]
    fn test_rerenders_when_matching_record_is_deleted() {
        let fx = Fixture::new();
        let (mut binding, flag) = fx.binding();
        binding.evaluate(&adults()).unwrap();

        fx.delete_person("p2");
        assert_eq!(flag.requests(), 1);
        assert_eq!(binding.evaluate(&adults()).unwrap().unwrap().len(), 0);
    }

    #[test]
    fn test_no_rerender_when_non_matching_record_is_deleted() {
        let fx = Fixture::new();
        let (mut binding, flag) = fx.binding();
        binding.evaluate(&adults()).unwrap();

        fx.delete_person("p1");
        assert_eq!(flag.requests(), 0);
        assert_eq!(binding.evaluate(&adults()).unwrap().unwrap().len(), 1);
    }

    #[test]
    fn test_sort_single_field() {
        let fx = Fixture::new();
        let (mut binding, _) = fx.binding();
        let spec = people().with_sort([("name", true)]);
        assert_eq!(names(&binding.evaluate(&spec).unwrap().unwrap()), ["Person 2", "Person 1"]);
    }

    #[test]
    fn test_sort_multiple_fields() {
        let fx = Fixture::new();
        fx.upsert(&[("id", "p3".into()), ("name", "Person 3".into()), ("age", 35.into())]);
        let (mut binding, _) = fx.binding();
        let spec = people().with_sort([SortDescriptor::desc("age"), SortDescriptor::desc("name")]);
        assert_eq!(
            names(&binding.evaluate(&spec).unwrap().unwrap()),
            ["Person 3", "Person 2", "Person 1"]
        );
    }

    #[test]
    fn test_sort_change_rederives() {
        let fx = Fixture::new();
        let (mut binding, _) = fx.binding();
        let asc = binding.evaluate(&people().with_sort(["name"])).unwrap().unwrap();
        let desc = binding
            .evaluate(&people().with_sort([("name", true)]))
            .unwrap()
            .unwrap();
        assert_ne!(asc.id(), desc.id());
        assert_eq!(names(&desc), ["Person 2", "Person 1"]);
    }
}

mod results_source {
    use super::*;

    fn tasks(fx: &Fixture) -> MemoryResults {
        fx.db.linking_objects("Person", "p1", "tasks").unwrap()
    }

    #[test]
    fn test_returns_all_records() {
        let fx = Fixture::new();
        let (mut binding, _) = fx.binding();
        let spec = QuerySpec::results(tasks(&fx)).with_source_key("p1_tasks");
        assert_eq!(binding.evaluate(&spec).unwrap().unwrap().len(), 4);
    }

    #[test]
    fn test_source_key_keeps_results_across_fresh_handles() {
        let fx = Fixture::new();
        let (mut binding, _) = fx.binding();

        let first = binding
            .evaluate(&QuerySpec::results(tasks(&fx)).with_source_key("p1_tasks"))
            .unwrap()
            .unwrap();
        let second = binding
            .evaluate(&QuerySpec::results(tasks(&fx)).with_source_key("p1_tasks"))
            .unwrap()
            .unwrap();
        assert_eq!(first.id(), second.id());
    }

    #[test]
    fn test_refines_handle_source() {
        let fx = Fixture::new();
        let (mut binding, flag) = fx.binding();
        let spec = QuerySpec::results(tasks(&fx))
            .with_source_key("p1_open_tasks")
            .with_filter("done == $0")
            .with_variables([false]);
        assert_eq!(binding.evaluate(&spec).unwrap().unwrap().len(), 2);

        fx.db
            .write(|tx| tx.update("Task", "p1t3", [("done", true)]))
            .unwrap();
        assert_eq!(flag.requests(), 1);
        assert_eq!(binding.evaluate(&spec).unwrap().unwrap().len(), 1);
    }

    #[test]
    fn test_missing_source_key_warns_once() {
        let fx = Fixture::new();
        let warnings = Arc::new(AtomicUsize::new(0));
        let subscriber = tracing_subscriber::registry().with(WarnCounter(warnings.clone()));

        tracing::subscriber::with_default(subscriber, || {
            let (mut binding, _) = fx.binding();
            let first = binding.evaluate(&QuerySpec::results(tasks(&fx))).unwrap().unwrap();
            assert_eq!(first.len(), 4);

            // Each fresh handle changes the identity, but the warning is not repeated
            let second = binding.evaluate(&QuerySpec::results(tasks(&fx))).unwrap().unwrap();
            assert_ne!(first.id(), second.id());
            assert_eq!(second.len(), 4);
        });
        assert_eq!(warnings.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_same_handle_without_key_is_memoized() {
        let fx = Fixture::new();
        let (mut binding, _) = fx.binding();
        let handle = tasks(&fx);
        let first = binding.evaluate(&QuerySpec::results(handle.clone())).unwrap().unwrap();
        let second = binding.evaluate(&QuerySpec::results(handle)).unwrap().unwrap();
        assert_eq!(first.id(), second.id());
    }
}

mod lifecycle {
    use super::*;

    #[test]
    fn test_unmount_stops_renders() {
        let fx = Fixture::new();
        let (mut binding, flag) = fx.binding();
        binding.evaluate(&people()).unwrap();
        binding.unmount();
        assert!(binding.current().is_none());

        fx.upsert(&[("id", "p3".into()), ("age", 50.into())]);
        assert_eq!(flag.requests(), 0);
        assert_eq!(fx.db.listener_count(), 0);
    }

    #[test]
    fn test_drop_unsubscribes() {
        let fx = Fixture::new();
        let (mut binding, flag) = fx.binding();
        binding.evaluate(&people()).unwrap();
        assert_eq!(fx.db.listener_count(), 1);
        drop(binding);

        assert_eq!(fx.db.listener_count(), 0);
        fx.delete_person("p1");
        assert_eq!(flag.requests(), 0);
    }

    #[test]
    fn test_connection_swap_requests_render_and_rederives() {
        let fx = Fixture::new();
        let other = Fixture::new();
        let provider = fx.provider();
        let flag = RenderFlag::new();
        let mut binding = QueryBinding::new(provider.context(), flag.clone());

        let first = binding.evaluate(&people()).unwrap().unwrap();
        assert!(provider.set_connection(Some(other.db.clone())));
        assert!(flag.take());

        let second = binding.evaluate(&people()).unwrap().unwrap();
        assert_ne!(first.id(), second.id());
        assert_eq!(second.database().id(), other.db.id());
        assert_eq!(fx.db.listener_count(), 0);
        assert_eq!(other.db.listener_count(), 1);
    }

    #[test]
    fn test_unset_connection_tears_down() {
        let fx = Fixture::new();
        let provider = fx.provider();
        let flag = RenderFlag::new();
        let mut binding = QueryBinding::new(provider.context(), flag.clone());
        binding.evaluate(&people()).unwrap();

        provider.set_connection(None);
        assert_eq!(flag.requests(), 1);
        assert!(binding.evaluate(&people()).unwrap().is_none());
        assert!(!binding.is_subscribed());
        assert_eq!(fx.db.listener_count(), 0);
    }

    #[test]
    fn test_engine_error_keeps_previous_results() {
        let fx = Fixture::new();
        let (mut binding, flag) = fx.binding();
        let good = binding.evaluate(&adults()).unwrap().unwrap();

        let err = binding
            .evaluate(&people().with_filter("age >"))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidFilter { .. }));
        let err = binding
            .evaluate(&people().with_filter("age > $0"))
            .unwrap_err();
        assert!(matches!(err, Error::MissingArgument { .. }));
        assert!(matches!(
            binding.evaluate(&QuerySpec::objects("Dog")),
            Err(Error::UnknownType { .. })
        ));

        assert_eq!(binding.current().map(|r| r.id()), Some(good.id()));
        assert!(binding.is_subscribed());
        fx.delete_person("p2");
        assert_eq!(flag.requests(), 1);
        assert_eq!(binding.evaluate(&adults()).unwrap().unwrap().id(), good.id());
    }

    #[test]
    fn test_closed_database_surfaces_error() {
        let fx = Fixture::new();
        let (mut binding, _) = fx.binding();
        fx.db.close();
        assert!(matches!(
            binding.evaluate(&people()),
            Err(Error::Closed { .. })
        ));
    }

    #[test]
    fn test_value_variables() {
        let fx = Fixture::new();
        let (mut binding, _) = fx.binding();
        let spec = people()
            .with_filter("name == $0 OR age == $1")
            .with_variables([Value::from("Person 1"), Value::Int(35)]);
        assert_eq!(binding.evaluate(&spec).unwrap().unwrap().len(), 2);
    }
}

struct WarnCounter(Arc<AtomicUsize>);

impl<S: Subscriber> Layer<S> for WarnCounter {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == Level::WARN {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
}
