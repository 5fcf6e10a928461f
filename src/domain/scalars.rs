//! Twisp GraphQL 自訂 scalar 的編碼與解碼
//!
//! - `Date`：`YYYY-MM-DD`
//! - `Decimal`：以字串保存的十進位數，解碼時也接受 JSON number
//! - `Timestamp`：RFC 3339（必須帶 offset 或 `Z`，小數秒位數不限）

use crate::utils::error::{HarnessError, Result};
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, TimeDelta, Timelike, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::value::RawValue;
use std::fmt;
use std::str::FromStr;

pub type Uuid = uuid::Uuid;

// 純字串 scalar
pub type CurrencyCode = String;
pub type EntryType = String;
pub type Expression = String;
pub type InterpolatedExpression = String;
pub type Uint8Array = String;

// Map 類 scalar
pub type ExpressionMap = std::collections::HashMap<String, String>;
pub type ExpressionNestedMap = serde_json::Map<String, serde_json::Value>;
pub type Json = serde_json::Map<String, serde_json::Value>;
pub type Value = serde_json::Value;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// 先把 JSON 文字解成字串，失敗時回報原始文字
fn json_string(scalar: &'static str, json: &str) -> Result<String> {
    serde_json::from_str::<String>(json).map_err(|e| HarnessError::format(scalar, json, e))
}

/// 沒有時間與時區的日期
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Date(NaiveDate);

impl Date {
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Result<Self> {
        let text = format!("{:04}-{:02}-{:02}", year, month, day);
        if !(0..=9999).contains(&year) {
            return Err(HarnessError::format("Date", text, "year must have four digits"));
        }
        NaiveDate::from_ymd_opt(year, month, day)
            .map(Date)
            .ok_or_else(|| HarnessError::format("Date", text, "not a calendar date"))
    }

    pub fn naive(&self) -> NaiveDate {
        self.0
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn month(&self) -> u32 {
        self.0.month()
    }

    pub fn day(&self) -> u32 {
        self.0.day()
    }

    /// 編碼成 JSON 文字（含引號）
    pub fn encode(&self) -> String {
        format!("\"{}\"", self)
    }

    pub fn decode(json: &str) -> Result<Self> {
        json_string("Date", json)?.parse()
    }
}

impl TryFrom<NaiveDate> for Date {
    type Error = HarnessError;

    fn try_from(value: NaiveDate) -> Result<Self> {
        Date::from_ymd(value.year(), value.month(), value.day())
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DATE_FORMAT))
    }
}

impl FromStr for Date {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self> {
        // chrono 的 %m/%d 可接受單一位數，這裡要求固定 10 個字元
        let bytes = s.as_bytes();
        let shape_ok = bytes.len() == 10
            && bytes.iter().enumerate().all(|(i, b)| match i {
                4 | 7 => *b == b'-',
                _ => b.is_ascii_digit(),
            });
        if !shape_ok {
            return Err(HarnessError::format("Date", s, "expected YYYY-MM-DD"));
        }
        NaiveDate::parse_from_str(s, DATE_FORMAT)
            .map(Date)
            .map_err(|e| HarnessError::format("Date", s, e))
    }
}

impl Serialize for Date {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Date {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}

/// 任意精度十進位數，內部保存原始字串
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Decimal(String);

impl Decimal {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// 永遠以 JSON 字串輸出
    pub fn encode(&self) -> String {
        serde_json::Value::String(self.0.clone()).to_string()
    }

    /// 接受 JSON 字串或 JSON number，原文保存（不四捨五入、不去尾零）
    pub fn decode(json: &str) -> Result<Self> {
        let raw: Box<RawValue> =
            serde_json::from_str(json).map_err(|e| HarnessError::format("Decimal", json, e))?;
        Decimal::from_raw(&raw).map_err(|reason| HarnessError::format("Decimal", json, reason))
    }

    /// JSON 字串取其內容；JSON number 保留原始字面值（例如 `1E+5`）
    fn from_raw(raw: &RawValue) -> std::result::Result<Self, String> {
        let text = raw.get().trim();
        if text.starts_with('"') {
            return serde_json::from_str::<String>(text)
                .map(Decimal)
                .map_err(|e| e.to_string());
        }
        match serde_json::from_str::<serde_json::Value>(text) {
            Ok(serde_json::Value::Number(_)) => Ok(Decimal(text.to_string())),
            _ => Err("expected string or number".to_string()),
        }
    }
}

fn is_decimal_literal(s: &str) -> bool {
    let unsigned = s.strip_prefix('-').unwrap_or(s);
    let (mantissa, exponent) = match unsigned.find(['e', 'E']) {
        Some(idx) => (&unsigned[..idx], Some(&unsigned[idx + 1..])),
        None => (unsigned, None),
    };
    let (int_part, frac_part) = match mantissa.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (mantissa, None),
    };
    let digits = |p: &str| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit());

    digits(int_part)
        && frac_part.map_or(true, digits)
        && exponent.map_or(true, |e| {
            digits(e.strip_prefix(['+', '-']).unwrap_or(e))
        })
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Decimal {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self> {
        if !is_decimal_literal(s) {
            return Err(HarnessError::format("Decimal", s, "not a decimal literal"));
        }
        Ok(Decimal(s.to_string()))
    }
}

impl PartialEq<str> for Decimal {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Decimal {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl Serialize for Decimal {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Decimal {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = Box::<RawValue>::deserialize(deserializer)?;
        Decimal::from_raw(&raw)
            .map_err(|reason| D::Error::custom(format!("invalid Decimal {}: {}", raw.get(), reason)))
    }
}

/// 帶 offset 的時間點，保留奈秒精度
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(DateTime<FixedOffset>);

impl Timestamp {
    pub fn now_utc() -> Self {
        Timestamp(Utc::now().fixed_offset())
    }

    pub fn as_datetime(&self) -> DateTime<FixedOffset> {
        self.0
    }

    pub fn shifted(&self, delta: TimeDelta) -> Self {
        Timestamp(self.0 + delta)
    }

    pub fn encode(&self) -> String {
        format!("\"{}\"", self)
    }

    pub fn decode(json: &str) -> Result<Self> {
        json_string("Timestamp", json)?.parse()
    }
}

impl<Tz: chrono::TimeZone> From<DateTime<Tz>> for Timestamp {
    fn from(value: DateTime<Tz>) -> Self {
        Timestamp(value.fixed_offset())
    }
}

impl fmt::Display for Timestamp {
    /// 秒以下去掉尾零，UTC 輸出 `Z`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%dT%H:%M:%S"))?;

        let nanos = self.0.nanosecond() % 1_000_000_000;
        if nanos != 0 {
            let fraction = format!("{:09}", nanos);
            write!(f, ".{}", fraction.trim_end_matches('0'))?;
        }

        if self.0.offset().local_minus_utc() == 0 {
            f.write_str("Z")
        } else {
            write!(f, "{}", self.0.format("%:z"))
        }
    }
}

impl FromStr for Timestamp {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self> {
        // chrono 也接受空白或小寫 `t`/`z`，這裡只收 `T` 與 `Z`
        if s.as_bytes().get(10) != Some(&b'T') {
            return Err(HarnessError::format("Timestamp", s, "date and time must be separated by 'T'"));
        }
        if s.ends_with('z') {
            return Err(HarnessError::format("Timestamp", s, "UTC designator must be 'Z'"));
        }
        DateTime::parse_from_rfc3339(s)
            .map(Timestamp)
            .map_err(|e| HarnessError::format("Timestamp", s, e))
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}
