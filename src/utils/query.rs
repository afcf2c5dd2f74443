use std::{fmt, str::FromStr};

use serde::{de, Deserialize, Deserializer};

/// Query-string helper: treats `?field=` the same as an absent field.
///
/// HTML forms submit every select box, so optional filters commonly arrive
/// as empty strings instead of being omitted.
pub fn empty_string_as_none<'de, D, T>(de: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: fmt::Display,
{
    let opt = Option::<String>::deserialize(de)?;
    match opt.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => FromStr::from_str(s).map_err(de::Error::custom).map(Some),
    }
}

/// Checkbox flag from a form: `on`, `1`, `true` and `yes` are set, `off`,
/// `0`, `false` and `no` are cleared, an empty value is absent.
pub fn form_checkbox<'de, D>(de: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(de)?;
    let value = opt.as_deref().map(|s| s.trim().to_ascii_lowercase());
    match value.as_deref() {
        None | Some("") => Ok(None),
        Some("on" | "1" | "true" | "yes") => Ok(Some(true)),
        Some("off" | "0" | "false" | "no") => Ok(Some(false)),
        Some(other) => Err(de::Error::custom(format!("invalid checkbox value {:?}", other))),
    }
}
