//! Fans an event out to a subset of routes chosen by predicate, either stopping at the
//! first match or dispatching to every match.

use super::Sink;
use crate::error::SinkError;
use crate::event::Event;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteMode {
    /// Dispatch to the first route whose predicate admits the event, then stop.
    FirstMatch,
    /// Dispatch to every route whose predicate admits the event.
    AllMatch,
}

struct Route {
    predicate: Box<dyn Fn(&Event) -> bool + Send + Sync>,
    sink: Arc<dyn Sink>,
}

pub struct RouterSink {
    mode: RouteMode,
    routes: Vec<Route>,
}

impl RouterSink {
    pub fn new(mode: RouteMode) -> Self {
        Self {
            mode,
            routes: Vec::new(),
        }
    }

    pub fn route(mut self, predicate: impl Fn(&Event) -> bool + Send + Sync + 'static, sink: Arc<dyn Sink>) -> Self {
        self.routes.push(Route {
            predicate: Box::new(predicate),
            sink,
        });
        self
    }
}

impl Sink for RouterSink {
    fn emit(&self, event: Arc<Event>) -> Result<(), SinkError> {
        let mut last_err = None;
        for route in &self.routes {
            if (route.predicate)(&event) {
                if let Err(e) = route.sink.emit(Arc::clone(&event)) {
                    last_err = Some(e);
                }
                if self.mode == RouteMode::FirstMatch {
                    return last_err.map_or(Ok(()), Err);
                }
            }
        }
        last_err.map_or(Ok(()), Err)
    }

    fn close(&self) -> Result<(), SinkError> {
        let mut last_err = None;
        for route in &self.routes {
            if let Err(e) = route.sink.close() {
                last_err = Some(e);
            }
        }
        last_err.map_or(Ok(()), Err)
    }

    fn flush(&self) -> Result<(), SinkError> {
        let mut last_err = None;
        for route in &self.routes {
            if let Err(e) = route.sink.flush() {
                last_err = Some(e);
            }
        }
        last_err.map_or(Ok(()), Err)
    }

    fn health_check(&self) -> bool {
        self.routes.iter().all(|r| r.sink.health_check())
    }

    fn get_metrics(&self) -> Vec<(String, u64)> {
        self.routes.iter().flat_map(|r| r.sink.get_metrics()).collect()
    }
}

#[cfg(test)]
mod __test__ {
    use super::*;
    use crate::event::{Level, PropertyBag};
    use crate::sink::CollectingSink;
    use chrono::Utc;

    fn event(level: Level) -> Arc<Event> {
        Arc::new(Event::new(Utc::now(), level, "m", PropertyBag::new()))
    }

    #[test]
    fn first_match_stops_after_one_route() {
        let a = Arc::new(CollectingSink::new());
        let b = Arc::new(CollectingSink::new());
        let router = RouterSink::new(RouteMode::FirstMatch)
            .route(|_| true, a.clone())
            .route(|_| true, b.clone());

        router.emit(event(Level::Information)).unwrap();

        assert_eq!(a.len(), 1);
        assert_eq!(b.len(), 0);
    }

    #[test]
    fn all_match_dispatches_to_every_matching_route() {
        let a = Arc::new(CollectingSink::new());
        let b = Arc::new(CollectingSink::new());
        let router = RouterSink::new(RouteMode::AllMatch)
            .route(|_| true, a.clone())
            .route(|e| e.level >= Level::Error, b.clone());

        router.emit(event(Level::Error)).unwrap();

        assert_eq!(a.len(), 1);
        assert_eq!(b.len(), 1);
    }
}
