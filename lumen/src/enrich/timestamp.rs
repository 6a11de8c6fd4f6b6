//! Stamps the event's `Timestamp` property. Most events already carry a timestamp
//! from [`crate::event::Event::new`]; this enricher exists for pipelines that want the
//! value visible as an ordinary property (e.g. for sinks that render from properties
//! rather than the dedicated `timestamp` field).

use super::Enricher;
use crate::capture::CapturedValue;
use crate::event::PropertyBag;
use chrono::Utc;

pub struct TimestampEnricher;

impl Enricher for TimestampEnricher {
    fn enrich(&self, properties: &mut PropertyBag) {
        properties.set("Timestamp", CapturedValue::Time(Utc::now()));
    }
}
