//! Direct writes to control elements, for the few codec switches that are
//! not simple mixer volumes (route selection, amplifier enables and such).

use std::ffi::CString;

use alsa::ctl::{ElemId, ElemIface, ElemType, ElemValue};
use alsa::hctl::HCtl;

use crate::error::{HalError, Result};

/// Parsed control identifier, `iface=MIXER,name='Speaker Switch',index=0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CtlId {
    pub iface: CtlIface,
    pub name: Option<String>,
    pub index: u32,
    pub numid: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CtlIface {
    Card,
    Mixer,
    Pcm,
}

impl From<CtlIface> for ElemIface {
    fn from(iface: CtlIface) -> Self {
        match iface {
            CtlIface::Card => ElemIface::Card,
            CtlIface::Mixer => ElemIface::Mixer,
            CtlIface::Pcm => ElemIface::PCM,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CtlValue {
    Bool(bool),
    Int(i64),
}

fn unquote(text: &str) -> &str {
    let text = text.trim();
    for quote in ['\'', '"'] {
        if let Some(inner) = text.strip_prefix(quote).and_then(|t| t.strip_suffix(quote)) {
            return inner;
        }
    }
    text
}

/// Parse an identifier in amixer `cset` syntax. A string without `=` is
/// taken as a bare mixer element name.
pub fn parse_ctl_id(text: &str) -> Result<CtlId> {
    let text = text.trim();
    if text.is_empty() {
        return Err(HalError::InvalidCtlId(text.to_string()));
    }

    let mut id = CtlId {
        iface: CtlIface::Mixer,
        name: None,
        index: 0,
        numid: None,
    };

    if !text.contains('=') {
        id.name = Some(unquote(text).to_string());
        return Ok(id);
    }

    // Names may contain commas inside quotes, so split by hand.
    let mut fields = Vec::new();
    let mut start = 0;
    let mut quote = None;
    for (i, c) in text.char_indices() {
        match (c, quote) {
            ('\'' | '"', None) => quote = Some(c),
            (c, Some(q)) if c == q => quote = None,
            (',', None) => {
                fields.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if quote.is_some() {
        return Err(HalError::InvalidCtlId(text.to_string()));
    }
    fields.push(&text[start..]);

    let bad = || HalError::InvalidCtlId(text.to_string());
    for field in fields {
        let (key, value) = field.split_once('=').ok_or_else(bad)?;
        let value = unquote(value);
        match key.trim().to_ascii_lowercase().as_str() {
            "iface" => {
                id.iface = match value.to_ascii_uppercase().as_str() {
                    "CARD" => CtlIface::Card,
                    "MIXER" => CtlIface::Mixer,
                    "PCM" => CtlIface::Pcm,
                    _ => return Err(bad()),
                }
            }
            "name" => id.name = Some(value.to_string()),
            "index" => id.index = value.parse().map_err(|_| bad())?,
            "numid" => id.numid = Some(value.parse().map_err(|_| bad())?),
            _ => return Err(bad()),
        }
    }

    if id.name.is_none() && id.numid.is_none() {
        return Err(bad());
    }
    Ok(id)
}

pub fn parse_ctl_value(text: &str) -> Result<CtlValue> {
    let text = text.trim();
    match text.to_ascii_lowercase().as_str() {
        "on" | "yes" | "true" => Ok(CtlValue::Bool(true)),
        "off" | "no" | "false" => Ok(CtlValue::Bool(false)),
        other => other
            .parse()
            .map(CtlValue::Int)
            .map_err(|_| HalError::InvalidCtlId(format!("bad control value {}", text))),
    }
}

fn elem_id(id: &CtlId) -> Result<ElemId> {
    let mut elem_id = ElemId::new(id.iface.into());
    if let Some(numid) = id.numid {
        elem_id.set_numid(numid);
    }
    if let Some(name) = &id.name {
        let name =
            CString::new(name.as_str()).map_err(|_| HalError::InvalidCtlId(name.clone()))?;
        elem_id.set_name(&name);
    }
    elem_id.set_index(id.index);
    Ok(elem_id)
}

/// Store `value` into the first `count` channels of `elem_value`.
///
/// Integers go to integer and enumerated elements (as the item index),
/// booleans to boolean and integer elements.
fn fill_value(elem_value: &mut ElemValue, elem_type: ElemType, count: u32, value: CtlValue) -> Result<()> {
    let unsupported = || {
        HalError::NotSupported(format!("{:?} value for {:?} element", value, elem_type))
    };
    for channel in 0..count {
        let written = match (elem_type, value) {
            (ElemType::Boolean, CtlValue::Bool(on)) => elem_value.set_boolean(channel, on),
            (ElemType::Boolean, CtlValue::Int(v)) => elem_value.set_boolean(channel, v != 0),
            (ElemType::Integer, CtlValue::Int(v)) => {
                let v = i32::try_from(v).map_err(|_| unsupported())?;
                elem_value.set_integer(channel, v)
            }
            (ElemType::Integer, CtlValue::Bool(on)) => elem_value.set_integer(channel, on as i32),
            (ElemType::Enumerated, CtlValue::Int(v)) => {
                let v = u32::try_from(v).map_err(|_| unsupported())?;
                elem_value.set_enumerated(channel, v)
            }
            _ => return Err(unsupported()),
        };
        if written.is_none() {
            return Err(unsupported());
        }
    }
    Ok(())
}

/// Set every channel of the element `id` on control device `ctrl_name` to `value`.
pub fn write_ctl_element(ctrl_name: &str, id: &CtlId, value: CtlValue) -> Result<()> {
    let hctl = HCtl::new(ctrl_name, false)?;
    hctl.load()?;
    let elem_id = elem_id(id)?;
    let elem = hctl.find_elem(&elem_id).ok_or_else(|| {
        log::error!("Cannot find the given element from control {}", ctrl_name);
        HalError::ElementNotFound(format!("{:?}", id))
    })?;

    let info = elem.info()?;
    let mut elem_value = elem.read()?;
    fill_value(&mut elem_value, info.get_type(), info.get_count(), value)?;

    elem.write(&elem_value)?;
    log::info!("{}: wrote {:?} to {:?}", ctrl_name, value, id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_identifier() {
        let id = parse_ctl_id("iface=MIXER,name='Speaker Switch',index=1").unwrap();
        assert_eq!(id.iface, CtlIface::Mixer);
        assert_eq!(id.name.as_deref(), Some("Speaker Switch"));
        assert_eq!(id.index, 1);
        assert_eq!(id.numid, None);
    }

    #[test]
    fn quoted_name_may_contain_commas() {
        let id = parse_ctl_id(r#"name="Left, Right Mux",iface=card"#).unwrap();
        assert_eq!(id.name.as_deref(), Some("Left, Right Mux"));
        assert_eq!(id.iface, CtlIface::Card);
    }

    #[test]
    fn bare_name_and_numid() {
        let id = parse_ctl_id("Headphone Switch").unwrap();
        assert_eq!(id.name.as_deref(), Some("Headphone Switch"));
        assert_eq!(id.iface, CtlIface::Mixer);

        let id = parse_ctl_id("numid=12").unwrap();
        assert_eq!(id.numid, Some(12));
        assert_eq!(id.name, None);
    }

    #[test]
    fn rejects_malformed_identifiers() {
        assert!(parse_ctl_id("").is_err());
        assert!(parse_ctl_id("name='unterminated").is_err());
        assert!(parse_ctl_id("iface=HWDEP,name=x").is_err());
        assert!(parse_ctl_id("index=2").is_err());
        assert!(parse_ctl_id("colour=red").is_err());
    }

    #[test]
    fn parses_values() {
        assert_eq!(parse_ctl_value("on").unwrap(), CtlValue::Bool(true));
        assert_eq!(parse_ctl_value("OFF").unwrap(), CtlValue::Bool(false));
        assert_eq!(parse_ctl_value(" 7 ").unwrap(), CtlValue::Int(7));
        assert_eq!(parse_ctl_value("-3").unwrap(), CtlValue::Int(-3));
        assert!(parse_ctl_value("loud").is_err());
    }

    #[test]
    fn identifier_becomes_elem_id() {
        let id = parse_ctl_id("iface=PCM,name='Playback Route',index=2").unwrap();
        let converted = elem_id(&id).unwrap();
        assert_eq!(converted.get_name().unwrap(), "Playback Route");
        assert_eq!(converted.get_index(), 2);
        assert_eq!(converted.get_interface(), ElemIface::PCM);

        let converted = elem_id_for_numid(7);
        assert_eq!(converted.get_numid(), 7);
        assert_eq!(converted.get_interface(), ElemIface::Mixer);
    }

    fn elem_id_for_numid(numid: u32) -> ElemId {
        elem_id(&parse_ctl_id(&format!("numid={}", numid)).unwrap()).unwrap()
    }

    #[test]
    fn values_fill_every_channel() {
        let mut value = ElemValue::new(ElemType::Boolean).unwrap();
        fill_value(&mut value, ElemType::Boolean, 2, CtlValue::Bool(true)).unwrap();
        assert_eq!(value.get_boolean(0), Some(true));
        assert_eq!(value.get_boolean(1), Some(true));

        let mut value = ElemValue::new(ElemType::Integer).unwrap();
        fill_value(&mut value, ElemType::Integer, 2, CtlValue::Int(-12)).unwrap();
        assert_eq!(value.get_integer(1), Some(-12));
        fill_value(&mut value, ElemType::Integer, 1, CtlValue::Bool(true)).unwrap();
        assert_eq!(value.get_integer(0), Some(1));

        let mut value = ElemValue::new(ElemType::Enumerated).unwrap();
        fill_value(&mut value, ElemType::Enumerated, 1, CtlValue::Int(3)).unwrap();
        assert_eq!(value.get_enumerated(0), Some(3));
    }

    #[test]
    fn mismatched_values_are_refused() {
        let mut value = ElemValue::new(ElemType::Enumerated).unwrap();
        assert!(matches!(
            fill_value(&mut value, ElemType::Enumerated, 1, CtlValue::Bool(true)),
            Err(HalError::NotSupported(_))
        ));
        assert!(fill_value(&mut value, ElemType::Enumerated, 1, CtlValue::Int(-1)).is_err());

        let mut value = ElemValue::new(ElemType::Integer).unwrap();
        assert!(fill_value(&mut value, ElemType::Integer, 1, CtlValue::Int(i64::MAX)).is_err());

        let mut value = ElemValue::new(ElemType::Bytes).unwrap();
        assert!(fill_value(&mut value, ElemType::Bytes, 1, CtlValue::Int(1)).is_err());
    }
}
