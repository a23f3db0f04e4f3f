//! `deviceDetails` request field.

use crate::error::{Error, Result, ResultExt};
use crate::json::{ObjectEncoder, encode_string};
use crate::provisionee::ports::{ConfigStore, ConfigValue, keys};
use crate::stream::Stream;

/// `(json key, configuration key)`, sorted by json key.
const DEVICE_DETAILS: [(&str, &str); 8] = [
    ("deviceModel", keys::MODEL_NUMBER),
    ("deviceName", keys::BLE_DEVICE_NAME),
    ("deviceSerial", keys::SERIAL_NUMBER),
    ("firmwareVersion", keys::FIRMWARE_VERSION),
    ("hardwareVersion", keys::HARDWARE_VERSION),
    ("manufacturer", keys::MANUFACTURER_NAME),
    ("productIndex", keys::PRODUCT_INDEX),
    ("softwareVersionIndex", keys::SOFTWARE_VERSION_INDEX),
];

/// Append `"deviceDetails":{...}` to `obj`.  Absent configuration keys are
/// skipped; with none present the field is left out entirely.
pub fn encode_device_details(
    store: &impl ConfigStore,
    obj: &mut ObjectEncoder,
    out: &mut Stream<'_>,
) -> Result<()> {
    let mut details: Option<ObjectEncoder> = None;

    for (name, key) in DEVICE_DETAILS {
        let Some(value) = store.get_value(key).or_not_implemented()? else {
            continue;
        };
        let inner = match details.as_mut() {
            Some(inner) => inner,
            None => {
                obj.key("deviceDetails", out)?;
                details.insert(ObjectEncoder::begin(out)?)
            }
        };
        inner.key(name, out)?;
        match value {
            ConfigValue::String(s) => encode_string(s.as_bytes(), out)?,
            ConfigValue::Bytes(b) => encode_string(&b, out)?,
            ConfigValue::Integer(n) => encode_string(n.to_string().as_bytes(), out)?,
            ConfigValue::Boolean(_) => return Err(Error::Failed("device details type")),
        }
    }

    if let Some(inner) = details {
        inner.end(out)?;
    }
    Ok(())
}
