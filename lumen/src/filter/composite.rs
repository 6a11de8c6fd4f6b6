//! Boolean composition of filters.

use super::Filter;
use crate::event::Event;

pub enum Composite {
    And(Vec<Box<dyn Filter>>),
    Or(Vec<Box<dyn Filter>>),
    Not(Box<dyn Filter>),
}

impl Filter for Composite {
    fn allow(&self, event: &Event) -> bool {
        match self {
            Composite::And(filters) => filters.iter().all(|f| f.allow(event)),
            Composite::Or(filters) => filters.iter().any(|f| f.allow(event)),
            Composite::Not(filter) => !filter.allow(event),
        }
    }
}

pub fn all_of(filters: Vec<Box<dyn Filter>>) -> Composite {
    Composite::And(filters)
}

pub fn any_of(filters: Vec<Box<dyn Filter>>) -> Composite {
    Composite::Or(filters)
}

pub fn not(filter: Box<dyn Filter>) -> Composite {
    Composite::Not(filter)
}
