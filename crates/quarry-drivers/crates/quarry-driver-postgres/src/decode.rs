//! Binary result cell decoding
//!
//! Rows arrive in PostgreSQL's binary wire format. Types with a natural
//! [`Value`] variant decode into it, the rest are rendered the way
//! PostgreSQL's own output function would print them. A non-NULL cell never
//! becomes [`Value::Null`]: payloads without a decoder fall back to bytea
//! style hex text.

use std::net::{Ipv4Addr, Ipv6Addr};

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use quarry_core::Value;
use tokio_postgres::types::{FromSql, Kind, Type};

type DecodeError = Box<dyn std::error::Error + Sync + Send>;
type DecodeResult<T> = std::result::Result<T, DecodeError>;

/// Undecoded cell payload, `None` for SQL NULL
pub(crate) struct RawCell<'a>(pub(crate) Option<&'a [u8]>);

impl<'a> FromSql<'a> for RawCell<'a> {
    fn from_sql(_: &Type, raw: &'a [u8]) -> DecodeResult<Self> {
        Ok(Self(Some(raw)))
    }

    fn from_sql_null(_: &Type) -> DecodeResult<Self> {
        Ok(Self(None))
    }

    fn accepts(_: &Type) -> bool {
        true
    }
}

/// Decode one cell of type `ty`.
pub(crate) fn decode_cell(ty: &Type, raw: Option<&[u8]>) -> Value {
    let Some(raw) = raw else {
        return Value::Null;
    };

    decode_raw(ty, raw).unwrap_or_else(|error| {
        tracing::debug!(type_name = ty.name(), %error, "rendering undecodable cell as hex");
        Value::String(format!("\\x{}", hex::encode(raw)))
    })
}

fn decode_raw(ty: &Type, raw: &[u8]) -> DecodeResult<Value> {
    match ty.kind() {
        Kind::Array(member) => return decode_array(member, raw),
        // A domain is sent in its base type's format
        Kind::Domain(base) => return decode_raw(base, raw),
        Kind::Enum(_) => return Ok(Value::String(utf8(raw)?)),
        _ => {}
    }

    let value = match ty.name() {
        "bool" => Value::Bool(bool::from_sql(ty, raw)?),
        "int2" => Value::Int16(i16::from_be_bytes(be(raw, 0)?)),
        "int4" => Value::Int32(i32::from_be_bytes(be(raw, 0)?)),
        "int8" => Value::Int64(i64::from_be_bytes(be(raw, 0)?)),
        "oid" | "xid" | "cid" | "regclass" | "regtype" | "regproc" => {
            Value::Int64(u32::from_be_bytes(be(raw, 0)?) as i64)
        }
        "float4" => Value::Float32(f32::from_be_bytes(be(raw, 0)?)),
        "float8" => Value::Float64(f64::from_be_bytes(be(raw, 0)?)),
        "numeric" => Value::Decimal(decode_numeric(raw)?),
        "money" => Value::Decimal(format_money(raw)?),
        "text" | "varchar" | "bpchar" | "name" | "char" | "unknown" | "xml" | "citext" => {
            Value::String(utf8(raw)?)
        }
        "bytea" => Value::Bytes(raw.to_vec()),
        "uuid" => Value::Uuid(uuid::Uuid::from_slice(raw)?),
        "json" | "jsonb" => Value::Json(serde_json::Value::from_sql(ty, raw)?),
        "date" => match i32::from_be_bytes(be(raw, 0)?) {
            i32::MAX => Value::String("infinity".into()),
            i32::MIN => Value::String("-infinity".into()),
            _ => Value::Date(NaiveDate::from_sql(ty, raw)?),
        },
        "time" => Value::Time(NaiveTime::from_sql(ty, raw)?),
        "timestamp" | "timestamptz" => match i64::from_be_bytes(be(raw, 0)?) {
            i64::MAX => Value::String("infinity".into()),
            i64::MIN => Value::String("-infinity".into()),
            _ if ty.name() == "timestamp" => Value::DateTime(NaiveDateTime::from_sql(ty, raw)?),
            _ => Value::DateTimeUtc(DateTime::<Utc>::from_sql(ty, raw)?),
        },
        "timetz" => Value::String(format_timetz(raw)?),
        "interval" => Value::String(format_interval(raw)?),
        "inet" | "cidr" => Value::String(format_inet(raw)?),
        "macaddr" | "macaddr8" => Value::String(format_macaddr(raw)),
        "bit" | "varbit" => Value::String(format_bits(raw)?),
        other => return Err(format!("no binary decoder for type {other}").into()),
    };

    Ok(value)
}

/// Array layout: ndim, has-null flag, element oid, then a (length, lower
/// bound) pair per dimension and the length-prefixed elements in row-major
/// order. Multi-dimensional arrays nest.
fn decode_array(member: &Type, raw: &[u8]) -> DecodeResult<Value> {
    let ndim = i32::from_be_bytes(be(raw, 0)?);
    if ndim < 0 {
        return Err("invalid array payload: negative dimension count".into());
    }

    let mut offset = 12;
    let mut dims = Vec::with_capacity(ndim as usize);
    for _ in 0..ndim {
        let len = i32::from_be_bytes(be(raw, offset)?);
        if len < 0 {
            return Err("invalid array payload: negative dimension".into());
        }
        dims.push(len as usize);
        offset += 8;
    }

    let total = if dims.is_empty() {
        0
    } else {
        dims.iter().product()
    };
    let mut elements = Vec::with_capacity(total);
    for _ in 0..total {
        let len = i32::from_be_bytes(be(raw, offset)?);
        offset += 4;
        if len < 0 {
            elements.push(Value::Null);
            continue;
        }
        let end = offset + len as usize;
        let bytes = raw
            .get(offset..end)
            .ok_or("invalid array payload: truncated element")?;
        elements.push(decode_cell(member, Some(bytes)));
        offset = end;
    }

    Ok(nest(&mut elements.into_iter(), &dims))
}

fn nest(elements: &mut std::vec::IntoIter<Value>, dims: &[usize]) -> Value {
    match dims {
        [] => Value::Array(Vec::new()),
        [len] => Value::Array(elements.by_ref().take(*len).collect()),
        [len, inner @ ..] => {
            Value::Array((0..*len).map(|_| nest(&mut *elements, inner)).collect())
        }
    }
}

/// Decode the binary NUMERIC wire format.
///
/// Layout: ndigits, weight, sign, dscale (all 16-bit) followed by `ndigits`
/// base-10000 digit groups. Group `i` is worth `10000^(weight - i)`. The
/// output carries exactly `dscale` fractional digits, as `numeric_out` does.
pub(crate) fn decode_numeric(raw: &[u8]) -> DecodeResult<String> {
    if raw.len() < 8 {
        return Err("invalid NUMERIC payload: too short".into());
    }

    let ndigits = i16::from_be_bytes([raw[0], raw[1]]).max(0) as usize;
    let weight = i16::from_be_bytes([raw[2], raw[3]]) as i32;
    let sign = u16::from_be_bytes([raw[4], raw[5]]);
    let dscale = i16::from_be_bytes([raw[6], raw[7]]).max(0) as usize;

    match sign {
        0x0000 | 0x4000 => {}
        0xC000 => return Ok("NaN".to_string()),
        0xD000 => return Ok("Infinity".to_string()),
        0xF000 => return Ok("-Infinity".to_string()),
        _ => return Err("invalid NUMERIC payload: unknown sign".into()),
    }

    if raw.len() < 8 + ndigits * 2 {
        return Err("invalid NUMERIC payload: truncated digits".into());
    }

    let mut digits = Vec::with_capacity(ndigits);
    for index in 0..ndigits {
        let offset = 8 + index * 2;
        let group = u16::from_be_bytes([raw[offset], raw[offset + 1]]);
        if group > 9999 {
            return Err("invalid NUMERIC payload: group out of range".into());
        }
        digits.push(group);
    }

    // Groups before the first stored one (weight < -1) and after the last are zero
    let digit_at = |index: i32| -> u16 {
        if index < 0 {
            0
        } else {
            digits.get(index as usize).copied().unwrap_or(0)
        }
    };

    let mut integer_text = String::new();
    if weight < 0 {
        integer_text.push('0');
    } else {
        for index in 0..=weight {
            if index == 0 {
                integer_text.push_str(&digit_at(index).to_string());
            } else {
                integer_text.push_str(&format!("{:04}", digit_at(index)));
            }
        }
    }

    let mut fraction_text = String::new();
    if dscale > 0 {
        for step in 1..=dscale.div_ceil(4) as i32 {
            fraction_text.push_str(&format!("{:04}", digit_at(weight + step)));
        }
        fraction_text.truncate(dscale);
    }

    let is_zero = digits.iter().all(|group| *group == 0);
    let mut output = String::new();
    if sign == 0x4000 && !is_zero {
        output.push('-');
    }
    output.push_str(&integer_text);
    if !fraction_text.is_empty() {
        output.push('.');
        output.push_str(&fraction_text);
    }

    Ok(output)
}

/// MONEY is an int8 count of cents. Rendered without the locale's currency
/// symbol, assuming the usual two fractional digits.
pub(crate) fn format_money(raw: &[u8]) -> DecodeResult<String> {
    let cents = i64::from_be_bytes(be(raw, 0)?);
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.unsigned_abs();
    Ok(format!("{sign}{}.{:02}", cents / 100, cents % 100))
}

/// INTERVAL is microseconds (int8), days (int4) and months (int4), printed
/// in the default `postgres` interval style.
pub(crate) fn format_interval(raw: &[u8]) -> DecodeResult<String> {
    let micros = i64::from_be_bytes(be(raw, 0)?);
    let days = i32::from_be_bytes(be(raw, 8)?);
    let months = i32::from_be_bytes(be(raw, 12)?);

    let mut parts = Vec::new();
    for (count, unit) in [(months / 12, "year"), (months % 12, "mon"), (days, "day")] {
        match count {
            0 => {}
            1 => parts.push(format!("1 {unit}")),
            n => parts.push(format!("{n} {unit}s")),
        }
    }

    if micros != 0 || parts.is_empty() {
        let sign = if micros < 0 { "-" } else { "" };
        parts.push(format!("{sign}{}", clock(micros.unsigned_abs())));
    }

    Ok(parts.join(" "))
}

/// TIMETZ is microseconds since midnight followed by the zone offset in
/// seconds west of UTC.
pub(crate) fn format_timetz(raw: &[u8]) -> DecodeResult<String> {
    let micros = i64::from_be_bytes(be(raw, 0)?);
    let west = i32::from_be_bytes(be(raw, 8)?);
    if micros < 0 {
        return Err("invalid TIMETZ payload: negative time".into());
    }

    let east = -(west as i64);
    let sign = if east < 0 { '-' } else { '+' };
    let offset = east.unsigned_abs();
    let (hours, minutes, seconds) = (offset / 3600, offset / 60 % 60, offset % 60);

    let mut text = format!("{}{sign}{hours:02}", clock(micros as u64));
    if minutes != 0 || seconds != 0 {
        text.push_str(&format!(":{minutes:02}"));
    }
    if seconds != 0 {
        text.push_str(&format!(":{seconds:02}"));
    }
    Ok(text)
}

/// INET and CIDR: family, mask bits, cidr flag, address length, address.
/// An INET host address with a full-length mask prints without the mask.
pub(crate) fn format_inet(raw: &[u8]) -> DecodeResult<String> {
    let [family, bits, is_cidr, len] = be::<4>(raw, 0)?;
    let address = raw
        .get(4..4 + len as usize)
        .ok_or("invalid inet payload: truncated address")?;

    // PGSQL_AF_INET is AF_INET + 0, PGSQL_AF_INET6 is AF_INET + 1
    let (text, max_bits) = match family {
        2 => (Ipv4Addr::from(<[u8; 4]>::try_from(address)?).to_string(), 32),
        3 => (Ipv6Addr::from(<[u8; 16]>::try_from(address)?).to_string(), 128),
        _ => return Err(format!("invalid inet payload: address family {family}").into()),
    };

    if is_cidr == 0 && bits == max_bits {
        Ok(text)
    } else {
        Ok(format!("{text}/{bits}"))
    }
}

pub(crate) fn format_macaddr(raw: &[u8]) -> String {
    raw.iter()
        .map(|byte| format!("{byte:02x}"))
        .collect::<Vec<_>>()
        .join(":")
}

/// BIT and VARBIT: bit length, then the bits packed most significant first.
pub(crate) fn format_bits(raw: &[u8]) -> DecodeResult<String> {
    let len = i32::from_be_bytes(be(raw, 0)?);
    if len < 0 {
        return Err("invalid bit string payload: negative length".into());
    }
    let len = len as usize;
    let packed = raw
        .get(4..4 + len.div_ceil(8))
        .ok_or("invalid bit string payload: truncated bits")?;

    Ok((0..len)
        .map(|bit| {
            if packed[bit / 8] & (0x80 >> (bit % 8)) != 0 {
                '1'
            } else {
                '0'
            }
        })
        .collect())
}

/// `HH:MM:SS` with trailing-zero-trimmed microseconds when present
fn clock(micros: u64) -> String {
    let seconds = micros / 1_000_000;
    let fraction = micros % 1_000_000;
    let mut text = format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        seconds / 60 % 60,
        seconds % 60
    );
    if fraction > 0 {
        text.push('.');
        text.push_str(format!("{fraction:06}").trim_end_matches('0'));
    }
    text
}

fn be<const N: usize>(raw: &[u8], at: usize) -> DecodeResult<[u8; N]> {
    raw.get(at..at + N)
        .and_then(|bytes| <[u8; N]>::try_from(bytes).ok())
        .ok_or_else(|| format!("payload too short: need {} bytes", at + N).into())
}

fn utf8(raw: &[u8]) -> DecodeResult<String> {
    Ok(std::str::from_utf8(raw)?.to_owned())
}
