// attr/mod.rs — Typed attribute values.
//
// An `AttributeValue` pairs a datatype URI with a native value. Equality
// is per-type: two values of different datatypes are never equal, even
// when their lexical forms coincide. Values are immutable once built.

mod bag;
mod factory;

pub use bag::Bag;
pub use factory::{AttributeFactory, ValueParser};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{
    DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, TimeZone,
    Utc,
};
use serde::{Deserialize, Serialize};

/// Datatype URIs for the built-in attribute types.
pub mod types {
    pub const STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
    pub const BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";
    pub const INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";
    pub const DOUBLE: &str = "http://www.w3.org/2001/XMLSchema#double";
    pub const DATE: &str = "http://www.w3.org/2001/XMLSchema#date";
    pub const TIME: &str = "http://www.w3.org/2001/XMLSchema#time";
    pub const DATE_TIME: &str = "http://www.w3.org/2001/XMLSchema#dateTime";
    pub const ANY_URI: &str = "http://www.w3.org/2001/XMLSchema#anyURI";
    pub const HEX_BINARY: &str = "http://www.w3.org/2001/XMLSchema#hexBinary";
    pub const BASE64_BINARY: &str = "http://www.w3.org/2001/XMLSchema#base64Binary";
}

/// Short names used in standard function identifiers, paired with their URIs.
pub(crate) const STANDARD_TYPES: &[(&str, &str)] = &[
    ("string", types::STRING),
    ("boolean", types::BOOLEAN),
    ("integer", types::INTEGER),
    ("double", types::DOUBLE),
    ("date", types::DATE),
    ("time", types::TIME),
    ("dateTime", types::DATE_TIME),
    ("anyURI", types::ANY_URI),
    ("hexBinary", types::HEX_BINARY),
    ("base64Binary", types::BASE64_BINARY),
];

/// A single typed value.
///
/// Times and dateTimes are normalised to UTC on parse; a lexical form
/// without a timezone is read as UTC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "RawValue", try_from = "RawValue")]
pub enum AttributeValue {
    String(String),
    Boolean(bool),
    Integer(i64),
    Double(f64),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(DateTime<Utc>),
    AnyUri(String),
    HexBinary(Vec<u8>),
    Base64Binary(Vec<u8>),
    /// A value of a datatype registered by the embedder; kept lexically.
    Other { data_type: String, text: String },
}

impl AttributeValue {
    pub fn string(value: impl Into<String>) -> Self {
        AttributeValue::String(value.into())
    }

    pub fn any_uri(value: impl Into<String>) -> Self {
        AttributeValue::AnyUri(value.into())
    }

    /// The datatype URI of this value.
    pub fn data_type(&self) -> &str {
        match self {
            AttributeValue::String(_) => types::STRING,
            AttributeValue::Boolean(_) => types::BOOLEAN,
            AttributeValue::Integer(_) => types::INTEGER,
            AttributeValue::Double(_) => types::DOUBLE,
            AttributeValue::Date(_) => types::DATE,
            AttributeValue::Time(_) => types::TIME,
            AttributeValue::DateTime(_) => types::DATE_TIME,
            AttributeValue::AnyUri(_) => types::ANY_URI,
            AttributeValue::HexBinary(_) => types::HEX_BINARY,
            AttributeValue::Base64Binary(_) => types::BASE64_BINARY,
            AttributeValue::Other { data_type, .. } => data_type,
        }
    }

    /// Canonical lexical form.
    pub fn encode(&self) -> String {
        match self {
            AttributeValue::String(s) | AttributeValue::AnyUri(s) => s.clone(),
            AttributeValue::Boolean(b) => b.to_string(),
            AttributeValue::Integer(i) => i.to_string(),
            AttributeValue::Double(d) => encode_double(*d),
            AttributeValue::Date(d) => d.format("%Y-%m-%d").to_string(),
            AttributeValue::Time(t) => format!("{}Z", t.format("%H:%M:%S%.f")),
            AttributeValue::DateTime(dt) => dt.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            AttributeValue::HexBinary(bytes) => hex::encode_upper(bytes),
            AttributeValue::Base64Binary(bytes) => BASE64.encode(bytes),
            AttributeValue::Other { text, .. } => text.clone(),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttributeValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            AttributeValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            AttributeValue::Double(d) => Some(*d),
            _ => None,
        }
    }

    /// Text of string-like values (string and anyURI).
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) | AttributeValue::AnyUri(s) => Some(s),
            _ => None,
        }
    }
}

/// Parse `text` as one of the built-in datatypes. `None` when the datatype
/// is not built in.
pub fn parse_standard(data_type: &str, text: &str) -> Option<Result<AttributeValue, String>> {
    let parsed = match data_type {
        types::STRING => Ok(AttributeValue::String(text.to_string())),
        types::BOOLEAN => match text.trim() {
            "true" | "1" => Ok(AttributeValue::Boolean(true)),
            "false" | "0" => Ok(AttributeValue::Boolean(false)),
            other => Err(format!("'{}' is not a boolean", other)),
        },
        types::INTEGER => {
            let trimmed = text.trim();
            trimmed
                .strip_prefix('+')
                .unwrap_or(trimmed)
                .parse::<i64>()
                .map(AttributeValue::Integer)
                .map_err(|e| e.to_string())
        }
        types::DOUBLE => parse_double(text.trim()).map(AttributeValue::Double),
        types::DATE => parse_date(text.trim()).map(AttributeValue::Date),
        types::TIME => parse_time(text.trim()).map(AttributeValue::Time),
        types::DATE_TIME => parse_date_time(text.trim()).map(AttributeValue::DateTime),
        types::ANY_URI => Ok(AttributeValue::AnyUri(text.trim().to_string())),
        types::HEX_BINARY => hex::decode(text.trim())
            .map(AttributeValue::HexBinary)
            .map_err(|e| e.to_string()),
        types::BASE64_BINARY => BASE64
            .decode(text.trim())
            .map(AttributeValue::Base64Binary)
            .map_err(|e| e.to_string()),
        _ => return None,
    };
    Some(parsed)
}

fn encode_double(d: f64) -> String {
    if d.is_nan() {
        "NaN".to_string()
    } else if d.is_infinite() {
        if d > 0.0 { "INF" } else { "-INF" }.to_string()
    } else {
        d.to_string()
    }
}

fn parse_double(text: &str) -> Result<f64, String> {
    match text {
        "INF" => Ok(f64::INFINITY),
        "-INF" => Ok(f64::NEG_INFINITY),
        "NaN" => Ok(f64::NAN),
        other => other.parse::<f64>().map_err(|e| e.to_string()),
    }
}

/// Split a trailing `Z` or `(+|-)hh:mm` timezone off a lexical value.
fn split_timezone(text: &str) -> Result<(&str, Option<FixedOffset>), String> {
    if let Some(body) = text.strip_suffix('Z') {
        return Ok((body, FixedOffset::east_opt(0)));
    }
    let bytes = text.as_bytes();
    if bytes.len() > 6 {
        let sign_at = bytes.len() - 6;
        let sign = bytes[sign_at];
        if (sign == b'+' || sign == b'-') && bytes[bytes.len() - 3] == b':' {
            let hours: i32 = text[sign_at + 1..sign_at + 3]
                .parse()
                .map_err(|_| format!("bad timezone in '{}'", text))?;
            let minutes: i32 = text[sign_at + 4..]
                .parse()
                .map_err(|_| format!("bad timezone in '{}'", text))?;
            let seconds = (hours * 3600 + minutes * 60) * if sign == b'-' { -1 } else { 1 };
            let offset = FixedOffset::east_opt(seconds)
                .ok_or_else(|| format!("timezone out of range in '{}'", text))?;
            return Ok((&text[..sign_at], Some(offset)));
        }
    }
    Ok((text, None))
}

fn parse_date(text: &str) -> Result<NaiveDate, String> {
    // The date's own timezone does not affect ordering between dates here.
    let (body, _) = split_timezone(text)?;
    NaiveDate::parse_from_str(body, "%Y-%m-%d").map_err(|e| format!("'{}': {}", text, e))
}

fn parse_time(text: &str) -> Result<NaiveTime, String> {
    let (body, offset) = split_timezone(text)?;
    let time = NaiveTime::parse_from_str(body, "%H:%M:%S%.f")
        .map_err(|e| format!("'{}': {}", text, e))?;
    let shift = offset.map(|o| o.local_minus_utc()).unwrap_or(0);
    let (utc, _) = time.overflowing_sub_signed(Duration::seconds(i64::from(shift)));
    Ok(utc)
}

fn parse_date_time(text: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .map_err(|e| format!("'{}': {}", text, e))?;
    Ok(Utc.from_utc_datetime(&naive))
}

/// Wire form of a value in the JSON codec: `{ "type": uri, "value": text }`.
#[derive(Serialize, Deserialize)]
struct RawValue {
    #[serde(rename = "type", default = "default_raw_type")]
    data_type: String,
    value: String,
}

fn default_raw_type() -> String {
    types::STRING.to_string()
}

impl From<AttributeValue> for RawValue {
    fn from(value: AttributeValue) -> Self {
        RawValue {
            data_type: value.data_type().to_string(),
            value: value.encode(),
        }
    }
}

impl TryFrom<RawValue> for AttributeValue {
    type Error = String;

    fn try_from(raw: RawValue) -> Result<Self, Self::Error> {
        match parse_standard(&raw.data_type, &raw.value) {
            Some(parsed) => parsed,
            None => Ok(AttributeValue::Other {
                data_type: raw.data_type,
                text: raw.value,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(data_type: &str, text: &str) -> AttributeValue {
        parse_standard(data_type, text).unwrap().unwrap()
    }

    #[test]
    fn time_is_normalised_to_utc() {
        assert_eq!(parse(types::TIME, "10:30:00+02:00"), parse(types::TIME, "08:30:00Z"));
        assert_eq!(parse(types::TIME, "08:30:00"), parse(types::TIME, "08:30:00Z"));
    }

    #[test]
    fn date_time_accepts_missing_timezone() {
        let with_zone = parse(types::DATE_TIME, "2024-03-01T12:00:00Z");
        let without = parse(types::DATE_TIME, "2024-03-01T12:00:00");
        assert_eq!(with_zone, without);
        assert_eq!(with_zone.encode(), "2024-03-01T12:00:00Z");
    }

    #[test]
    fn values_of_different_types_differ() {
        assert_ne!(
            AttributeValue::string("http://a"),
            AttributeValue::any_uri("http://a")
        );
    }

    #[test]
    fn malformed_literals_are_rejected() {
        assert!(parse_standard(types::INTEGER, "twelve").unwrap().is_err());
        assert!(parse_standard(types::BOOLEAN, "yes").unwrap().is_err());
        assert!(parse_standard(types::DATE, "2024-13-01").unwrap().is_err());
        assert!(parse_standard("urn:custom", "x").is_none());
    }

    #[test]
    fn double_special_values() {
        assert_eq!(parse(types::DOUBLE, "INF").encode(), "INF");
        assert!(parse(types::DOUBLE, "NaN").as_double().unwrap().is_nan());
    }

    #[test]
    fn json_form_uses_type_and_value() {
        let json = serde_json::to_string(&AttributeValue::Integer(42)).unwrap();
        assert_eq!(json, format!(r#"{{"type":"{}","value":"42"}}"#, types::INTEGER));

        let plain: AttributeValue = serde_json::from_str(r#"{"value":"alice"}"#).unwrap();
        assert_eq!(plain, AttributeValue::string("alice"));

        let custom: AttributeValue =
            serde_json::from_str(r#"{"type":"urn:geo","value":"POINT(1 2)"}"#).unwrap();
        assert_eq!(custom.data_type(), "urn:geo");
    }
}
