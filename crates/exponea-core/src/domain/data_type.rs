//! Tagged values attached to outgoing tracking payloads
//!
//! A payload is described as a list of [`DataType`] values; the helpers on
//! [`DataTypeSliceExt`] pull the pieces an uploader needs back out of it.

use serde_json::{Map, Value};

/// Data types that can be associated with a tracked event
#[derive(Debug, Clone, PartialEq)]
pub enum DataType {
    /// The token of the project that the event should be uploaded to
    ProjectToken(String),

    /// Identifiers of the customer, e.g. an email or a registered id
    CustomerIds(Map<String, Value>),

    /// Custom properties of the event
    Properties(Map<String, Value>),

    /// Timestamp of the event in UNIX epoch seconds; `None` means "now"
    Timestamp(Option<f64>),

    /// Type of the tracked event
    EventType(String),

    /// Push notification token; `None` deletes the stored token
    PushNotificationToken(Option<String>),
}

/// Accessors over a list of [`DataType`] values
pub trait DataTypeSliceExt {
    /// All event types, in order
    fn event_types(&self) -> Vec<&str>;

    /// The latest explicit timestamp, if any
    fn latest_timestamp(&self) -> Option<f64>;

    /// All properties merged; later values overwrite earlier keys
    fn properties(&self) -> Map<String, Value>;

    /// All customer ids merged; later values overwrite earlier keys
    fn customer_ids(&self) -> Map<String, Value>;

    /// The last project token, if any
    fn project_token(&self) -> Option<&str>;
}

impl DataTypeSliceExt for [DataType] {
    fn event_types(&self) -> Vec<&str> {
        self.iter()
            .filter_map(|d| match d {
                DataType::EventType(event_type) => Some(event_type.as_str()),
                _ => None,
            })
            .collect()
    }

    fn latest_timestamp(&self) -> Option<f64> {
        self.iter()
            .filter_map(|d| match d {
                DataType::Timestamp(timestamp) => *timestamp,
                _ => None,
            })
            .fold(None, |latest: Option<f64>, ts| match latest {
                Some(current) if current >= ts => Some(current),
                _ => Some(ts),
            })
    }

    fn properties(&self) -> Map<String, Value> {
        let mut merged = Map::new();
        for data in self {
            if let DataType::Properties(props) = data {
                for (key, value) in props {
                    merged.insert(key.clone(), value.clone());
                }
            }
        }
        merged
    }

    fn customer_ids(&self) -> Map<String, Value> {
        let mut merged = Map::new();
        for data in self {
            if let DataType::CustomerIds(ids) = data {
                for (key, value) in ids {
                    merged.insert(key.clone(), value.clone());
                }
            }
        }
        merged
    }

    fn project_token(&self) -> Option<&str> {
        self.iter().rev().find_map(|d| match d {
            DataType::ProjectToken(token) => Some(token.as_str()),
            _ => None,
        })
    }
}
