//! Server-pushed event payloads, discriminated by their `type` field.
//!
//! Every variant keeps fields it does not model in `extra`, so views can read
//! topic-specific attributes the backend adds later.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum_macros::Display;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
    #[serde(other)]
    Unknown,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PriceUpdate {
    pub item_id: String,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_pct: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RiskAlert {
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supplier_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AnomalyDetected {
    pub z_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SupplierSignal {
    pub supplier_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TrendChange {
    pub item_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub magnitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct HealthCheck {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    PriceUpdate(PriceUpdate),
    RiskAlert(RiskAlert),
    AnomalyDetected(AnomalyDetected),
    SupplierSignal(SupplierSignal),
    TrendChange(TrendChange),
    HealthCheck(HealthCheck),
}

impl StreamEvent {
    /// The wire value of the `type` discriminator.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PriceUpdate(_) => "price_update",
            Self::RiskAlert(_) => "risk_alert",
            Self::AnomalyDetected(_) => "anomaly_detected",
            Self::SupplierSignal(_) => "supplier_signal",
            Self::TrendChange(_) => "trend_change",
            Self::HealthCheck(_) => "health_check",
        }
    }

    pub fn timestamp(&self) -> Option<&str> {
        match self {
            Self::PriceUpdate(e) => e.timestamp.as_deref(),
            Self::RiskAlert(e) => e.timestamp.as_deref(),
            Self::AnomalyDetected(e) => e.timestamp.as_deref(),
            Self::SupplierSignal(e) => e.timestamp.as_deref(),
            Self::TrendChange(e) => e.timestamp.as_deref(),
            Self::HealthCheck(e) => e.timestamp.as_deref(),
        }
    }

    /// `timestamp` parsed as RFC 3339, if present and well-formed.
    pub fn timestamp_utc(&self) -> Option<DateTime<Utc>> {
        let raw = self.timestamp()?;
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Item or supplier the event is about, for views that keep only the latest per entity.
    pub fn entity_id(&self) -> Option<&str> {
        match self {
            Self::PriceUpdate(e) => Some(&e.item_id),
            Self::RiskAlert(e) => e.supplier_id.as_deref(),
            Self::AnomalyDetected(e) => e.item_id.as_deref(),
            Self::SupplierSignal(e) => Some(&e.supplier_id),
            Self::TrendChange(e) => Some(&e.item_id),
            Self::HealthCheck(_) => None,
        }
    }

    pub fn is_heartbeat(&self) -> bool {
        matches!(self, Self::HealthCheck(_))
    }
}

impl std::fmt::Display for StreamEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::PriceUpdate(e) => write!(
                f,
                "[price_update] {} -> {:.2}{}",
                e.item_id,
                e.price,
                e.currency
                    .as_deref()
                    .map(|c| format!(" {}", c))
                    .unwrap_or_default()
            ),
            Self::RiskAlert(e) => write!(
                f,
                "[risk_alert] {} {}",
                e.severity,
                e.message.as_deref().unwrap_or("")
            ),
            Self::AnomalyDetected(e) => write!(
                f,
                "[anomaly_detected] {} z={:.2}",
                e.item_id.as_deref().unwrap_or("?"),
                e.z_score
            ),
            Self::SupplierSignal(e) => write!(
                f,
                "[supplier_signal] {} {}",
                e.supplier_id,
                e.signal.as_deref().unwrap_or("")
            ),
            Self::TrendChange(e) => write!(
                f,
                "[trend_change] {} {}",
                e.item_id,
                e.direction.as_deref().unwrap_or("")
            ),
            Self::HealthCheck(e) => write!(
                f,
                "[health_check] {}",
                e.status.as_deref().unwrap_or("ok")
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_update_is_tagged_and_keeps_extras() {
        let json = r#"{"type":"price_update","item_id":"WHEAT","price":245.10,
                       "currency":"USD","region":"EU","timestamp":"2026-10-15T08:30:00Z"}"#;
        let event: StreamEvent = serde_json::from_str(json).unwrap();

        assert_eq!(event.kind(), "price_update");
        assert_eq!(event.entity_id(), Some("WHEAT"));
        let StreamEvent::PriceUpdate(update) = &event else {
            panic!("expected a price update, got {:?}", event);
        };
        assert_eq!(update.price, 245.10);
        assert_eq!(update.extra.get("region"), Some(&Value::from("EU")));
        assert!(!update.extra.contains_key("type"));
        assert_eq!(
            event.timestamp_utc().map(|t| t.timestamp()),
            Some(1_792_053_000)
        );
    }

    #[test]
    fn unknown_severity_and_missing_optionals_are_tolerated() {
        let json = r#"{"type":"risk_alert","severity":"apocalyptic"}"#;
        let event: StreamEvent = serde_json::from_str(json).unwrap();
        let StreamEvent::RiskAlert(alert) = event else {
            panic!("expected a risk alert");
        };
        assert_eq!(alert.severity, Severity::Unknown);
        assert_eq!(alert.message, None);
    }

    #[test]
    fn unknown_type_is_rejected() {
        let json = r#"{"type":"weather","temp":12}"#;
        assert!(serde_json::from_str::<StreamEvent>(json).is_err());
    }

    #[test]
    fn serialised_event_carries_its_discriminator() {
        let event = StreamEvent::HealthCheck(HealthCheck {
            status: Some("ok".into()),
            timestamp: None,
            extra: Map::new(),
        });
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "health_check");
        assert!(event.is_heartbeat());
    }
}
