use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Pretty-prints a serializable object as JSON. Serializing the plain record types in this
/// workspace can't fail; if something does, the error is rendered in place.
pub fn to_json<T: Serialize>(obj: &T) -> String {
    match serde_json::to_string_pretty(obj) {
        Ok(json) => json,
        Err(err) => format!("{{\"error\": \"{}\"}}", err),
    }
}

pub fn from_json<T: DeserializeOwned>(raw: &str) -> Result<T> {
    let obj = serde_json::from_str(raw)?;
    Ok(obj)
}

pub fn write_json<T: Serialize>(path: &str, obj: &T) -> Result<()> {
    if let Some(parent) = std::path::Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            fs_err::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(obj)?;
    fs_err::write(path, json)?;
    Ok(())
}

pub fn read_json<T: DeserializeOwned>(path: &str) -> Result<T> {
    let contents = fs_err::read_to_string(path)?;
    from_json(&contents).with_context(|| format!("parsing {}", path))
}
