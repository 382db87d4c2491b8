//! Helpers de deserialización tolerantes con los clientes existentes
//!
//! Las apps móviles y los snapshots antiguos envían marcas de tiempo como
//! milisegundos desde epoch (`1700000000000`), mientras que el formato que
//! escribimos nosotros es RFC 3339. Ambos se aceptan a la entrada.

use chrono::{DateTime, TimeZone, Utc};
use serde::de::Error;
use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Millis(i64),
    FractionalMillis(f64),
    Text(String),
}

impl RawTimestamp {
    fn into_datetime<E: Error>(self) -> Result<DateTime<Utc>, E> {
        match self {
            RawTimestamp::Millis(ms) => from_millis(ms),
            RawTimestamp::FractionalMillis(ms) if ms.is_finite() => from_millis(ms as i64),
            RawTimestamp::FractionalMillis(ms) => {
                Err(E::custom(format!("invalid timestamp {}", ms)))
            }
            RawTimestamp::Text(text) => DateTime::parse_from_rfc3339(text.trim())
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| E::custom(format!("invalid timestamp '{}': {}", text, e))),
        }
    }
}

fn from_millis<E: Error>(ms: i64) -> Result<DateTime<Utc>, E> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .ok_or_else(|| E::custom(format!("timestamp out of range: {}", ms)))
}

/// Marca de tiempo en milisegundos epoch o RFC 3339
pub fn deser_timestamp<'de, D>(deser: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    RawTimestamp::deserialize(deser)?.into_datetime::<D::Error>()
}

pub fn deser_timestamp_opt<'de, D>(deser: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<RawTimestamp>::deserialize(deser)?
        .map(|raw| raw.into_datetime::<D::Error>())
        .transpose()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawIdentifier {
    Text(String),
    Integer(i64),
    Number(f64),
}

/// Identificador textual que también admite números (`7` -> `"7"`).
/// `null` se trata como vacío y lo rechaza la validación.
pub fn deser_identifier<'de, D>(deser: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawIdentifier>::deserialize(deser)?;
    Ok(match raw {
        None => String::new(),
        Some(RawIdentifier::Text(text)) => text,
        Some(RawIdentifier::Integer(n)) => n.to_string(),
        Some(RawIdentifier::Number(n)) => n.to_string(),
    })
}
