use chrono::Utc;
use serde::Serialize;

/// A named measurement taken at one instant, categorised by [`Tag`]s.
///
/// The engine records durations and counts - request round trips, book ticker processing
/// times, operation tallies - so measurements are plain `u64`s. The embedding application
/// decides where they go; nothing in the core persists them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Metric {
    pub name: &'static str,

    /// Milliseconds since the Unix epoch at which the measurement was taken.
    pub time: u64,

    /// Key-value pairs categorising the measurement (venue, path, status, ..).
    pub tags: Vec<Tag>,

    /// The measurements themselves (duration_ms, count, ..).
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tag {
    pub key: &'static str,
    pub value: String,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    pub key: &'static str,
    pub value: u64,
}

impl Metric {
    /// Start a measurement stamped with the current time.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            time: Utc::now().timestamp_millis() as u64,
            tags: Vec::new(),
            fields: Vec::new(),
        }
    }

    /// Attach a categorising tag.
    pub fn tag<V>(mut self, key: &'static str, value: V) -> Self
    where
        V: Into<String>,
    {
        self.tags.push(Tag {
            key,
            value: value.into(),
        });
        self
    }

    /// Attach a measurement.
    pub fn field(mut self, key: &'static str, value: u64) -> Self {
        self.fields.push(Field { key, value });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_builder() {
        let metric = Metric::new("http_request_duration")
            .tag("http_method", "POST")
            .tag("path", "/api/v3/order")
            .tag("status_code", "200")
            .field("duration_ms", 42);

        assert_eq!(metric.name, "http_request_duration");
        assert_eq!(metric.tags.len(), 3);
        assert_eq!(
            metric.fields,
            vec![Field {
                key: "duration_ms",
                value: 42
            }]
        );
        assert!(metric.time > 0);
    }
}
