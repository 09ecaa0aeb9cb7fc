//! 単純型の字句検査とファセット
//!
//! 組み込み型の字句空間と制約ファセットを検査し、
//! libxml2と同じ文面のメッセージを返します。

use chrono::NaiveDate;
use std::borrow::Cow;

use super::model::{Builtin, Facets, ResolvedType, Schema, SimpleType, TypeRef, WhiteSpace};

impl Builtin {
    /// `xs:`接頭辞なしの型名から組み込み型を取得
    pub(crate) fn from_name(local: &str) -> Option<Self> {
        let builtin = match local {
            "anySimpleType" => Builtin::AnySimpleType,
            "string" => Builtin::String,
            "normalizedString" => Builtin::NormalizedString,
            "token" | "language" | "Name" | "NCName" | "NMTOKEN" | "ID" | "IDREF" | "ENTITY"
            | "QName" => Builtin::Token,
            "anyURI" => Builtin::AnyUri,
            "decimal" => Builtin::Decimal,
            "integer" => Builtin::Integer,
            "nonNegativeInteger" => Builtin::NonNegativeInteger,
            "positiveInteger" => Builtin::PositiveInteger,
            "nonPositiveInteger" => Builtin::NonPositiveInteger,
            "negativeInteger" => Builtin::NegativeInteger,
            "long" => Builtin::Long,
            "int" => Builtin::Int,
            "short" => Builtin::Short,
            "byte" => Builtin::Byte,
            "unsignedLong" => Builtin::UnsignedLong,
            "unsignedInt" => Builtin::UnsignedInt,
            "unsignedShort" => Builtin::UnsignedShort,
            "unsignedByte" => Builtin::UnsignedByte,
            "boolean" => Builtin::Boolean,
            "float" => Builtin::Float,
            "double" => Builtin::Double,
            "date" => Builtin::Date,
            "dateTime" => Builtin::DateTime,
            "time" => Builtin::Time,
            "gYear" => Builtin::GYear,
            "gYearMonth" => Builtin::GYearMonth,
            _ => return None,
        };
        Some(builtin)
    }

    /// メッセージ用の型名
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Builtin::AnySimpleType => "xs:anySimpleType",
            Builtin::String => "xs:string",
            Builtin::NormalizedString => "xs:normalizedString",
            Builtin::Token => "xs:token",
            Builtin::AnyUri => "xs:anyURI",
            Builtin::Decimal => "xs:decimal",
            Builtin::Integer => "xs:integer",
            Builtin::NonNegativeInteger => "xs:nonNegativeInteger",
            Builtin::PositiveInteger => "xs:positiveInteger",
            Builtin::NonPositiveInteger => "xs:nonPositiveInteger",
            Builtin::NegativeInteger => "xs:negativeInteger",
            Builtin::Long => "xs:long",
            Builtin::Int => "xs:int",
            Builtin::Short => "xs:short",
            Builtin::Byte => "xs:byte",
            Builtin::UnsignedLong => "xs:unsignedLong",
            Builtin::UnsignedInt => "xs:unsignedInt",
            Builtin::UnsignedShort => "xs:unsignedShort",
            Builtin::UnsignedByte => "xs:unsignedByte",
            Builtin::Boolean => "xs:boolean",
            Builtin::Float => "xs:float",
            Builtin::Double => "xs:double",
            Builtin::Date => "xs:date",
            Builtin::DateTime => "xs:dateTime",
            Builtin::Time => "xs:time",
            Builtin::GYear => "xs:gYear",
            Builtin::GYearMonth => "xs:gYearMonth",
        }
    }

    pub(crate) fn white_space(&self) -> WhiteSpace {
        match self {
            Builtin::AnySimpleType | Builtin::String => WhiteSpace::Preserve,
            Builtin::NormalizedString => WhiteSpace::Replace,
            _ => WhiteSpace::Collapse,
        }
    }

    /// 範囲ファセットを数値として比較する型か
    pub(crate) fn is_numeric(&self) -> bool {
        matches!(
            self,
            Builtin::Decimal
                | Builtin::Integer
                | Builtin::NonNegativeInteger
                | Builtin::PositiveInteger
                | Builtin::NonPositiveInteger
                | Builtin::NegativeInteger
                | Builtin::Long
                | Builtin::Int
                | Builtin::Short
                | Builtin::Byte
                | Builtin::UnsignedLong
                | Builtin::UnsignedInt
                | Builtin::UnsignedShort
                | Builtin::UnsignedByte
                | Builtin::Float
                | Builtin::Double
        )
    }

    /// 整数型の値域
    fn integer_bounds(&self) -> Option<(Option<i128>, Option<i128>)> {
        let bounds = match self {
            Builtin::Integer => (None, None),
            Builtin::NonNegativeInteger => (Some(0), None),
            Builtin::PositiveInteger => (Some(1), None),
            Builtin::NonPositiveInteger => (None, Some(0)),
            Builtin::NegativeInteger => (None, Some(-1)),
            Builtin::Long => (Some(i64::MIN as i128), Some(i64::MAX as i128)),
            Builtin::Int => (Some(i32::MIN as i128), Some(i32::MAX as i128)),
            Builtin::Short => (Some(i16::MIN as i128), Some(i16::MAX as i128)),
            Builtin::Byte => (Some(i8::MIN as i128), Some(i8::MAX as i128)),
            Builtin::UnsignedLong => (Some(0), Some(u64::MAX as i128)),
            Builtin::UnsignedInt => (Some(0), Some(u32::MAX as i128)),
            Builtin::UnsignedShort => (Some(0), Some(u16::MAX as i128)),
            Builtin::UnsignedByte => (Some(0), Some(u8::MAX as i128)),
            _ => return None,
        };
        Some(bounds)
    }

    /// 字句空間の検査（空白処理済みの値に対して）
    pub(crate) fn accepts(&self, value: &str) -> bool {
        if let Some((min, max)) = self.integer_bounds() {
            return integer_in_range(value, min, max);
        }
        match self {
            Builtin::AnySimpleType
            | Builtin::String
            | Builtin::NormalizedString
            | Builtin::Token
            | Builtin::AnyUri => true,
            Builtin::Decimal => is_decimal(value),
            Builtin::Boolean => matches!(value, "true" | "false" | "1" | "0"),
            Builtin::Float | Builtin::Double => is_float(value),
            Builtin::Date => is_date(value),
            Builtin::DateTime => is_date_time(value),
            Builtin::Time => is_time(value),
            Builtin::GYear => is_g_year(value),
            Builtin::GYearMonth => is_g_year_month(value),
            _ => false,
        }
    }
}

/// 空白処理を適用
pub(crate) fn normalize_white_space(value: &str, mode: WhiteSpace) -> Cow<'_, str> {
    match mode {
        WhiteSpace::Preserve => Cow::Borrowed(value),
        WhiteSpace::Replace => Cow::Owned(value.replace(|c: char| matches!(c, '\t' | '\n' | '\r'), " ")),
        WhiteSpace::Collapse => Cow::Owned(value.split_whitespace().collect::<Vec<_>>().join(" ")),
    }
}

/// 単純型の基底となる組み込み型
fn primitive_of(schema: &Schema, resolved: ResolvedType<'_>, depth: usize) -> Option<Builtin> {
    // 循環する型定義に備えて深さを制限
    if depth > 32 {
        return None;
    }
    match resolved {
        ResolvedType::Builtin(b) => Some(b),
        ResolvedType::Simple(SimpleType::Restriction { base, .. }) => {
            primitive_of(schema, schema.resolve(base), depth + 1)
        }
        _ => None,
    }
}

/// 単純型の値を検査
///
/// 失敗時はlibxml2形式のメッセージ（要素名の接頭辞なし）を返します。
pub(crate) fn check_simple_value(
    schema: &Schema,
    type_ref: &TypeRef,
    raw: &str,
) -> Result<(), String> {
    check_resolved(schema, schema.resolve(type_ref), type_label(type_ref), raw, 0)
}

fn type_label(type_ref: &TypeRef) -> Option<String> {
    match type_ref {
        TypeRef::Named(name) => Some(name.local.clone()),
        TypeRef::Builtin(b) => Some(b.name().to_string()),
        _ => None,
    }
}

fn check_resolved(
    schema: &Schema,
    resolved: ResolvedType<'_>,
    label: Option<String>,
    raw: &str,
    depth: usize,
) -> Result<(), String> {
    if depth > 32 {
        return Ok(());
    }
    match resolved {
        ResolvedType::Any | ResolvedType::Complex(_) => Ok(()),
        ResolvedType::Builtin(b) => {
            let value = normalize_white_space(raw, b.white_space());
            if b.accepts(&value) {
                Ok(())
            } else {
                Err(format!(
                    "'{}' is not a valid value of the atomic type '{}'.",
                    value,
                    b.name()
                ))
            }
        }
        ResolvedType::Simple(SimpleType::Restriction { base, facets }) => {
            let primitive = primitive_of(schema, schema.resolve(base), depth + 1);
            let mode = primitive.map(|b| b.white_space()).unwrap_or(WhiteSpace::Preserve);
            let value = normalize_white_space(raw, mode);

            check_resolved(schema, schema.resolve(base), type_label(base), &value, depth + 1)
                .map_err(|message| match &label {
                    // 基底型の字句エラーは派生型の名前で報告する
                    Some(name) if message.contains("is not a valid value of the atomic type") => {
                        format!("'{}' is not a valid value of the atomic type '{}'.", value, name)
                    }
                    _ => message,
                })?;
            check_facets(facets, &value, primitive.map_or(false, |b| b.is_numeric()))
        }
        ResolvedType::Simple(SimpleType::Union(members)) => {
            let accepted = members.iter().any(|member| {
                check_resolved(schema, schema.resolve(member), None, raw, depth + 1).is_ok()
            });
            if accepted {
                Ok(())
            } else {
                Err(format!("'{}' is not a valid value of the union type.", raw.trim()))
            }
        }
        ResolvedType::Simple(SimpleType::List(item)) => {
            for token in raw.split_whitespace() {
                if check_resolved(schema, schema.resolve(item), None, token, depth + 1).is_err() {
                    return Err(format!(
                        "'{}' is not a valid value of the list type.",
                        raw.trim()
                    ));
                }
            }
            Ok(())
        }
    }
}

/// 制約ファセットを検査
pub(crate) fn check_facets(facets: &Facets, value: &str, numeric: bool) -> Result<(), String> {
    if !facets.enumeration.is_empty() && !facets.enumeration.iter().any(|e| e == value) {
        let set = facets
            .enumeration
            .iter()
            .map(|e| format!("'{}'", e))
            .collect::<Vec<_>>()
            .join(", ");
        return Err(format!(
            "[facet 'enumeration'] The value '{}' is not an element of the set {{{}}}.",
            value, set
        ));
    }

    for (source, regex) in &facets.patterns {
        if !regex.is_match(value) {
            return Err(format!(
                "[facet 'pattern'] The value '{}' is not accepted by the pattern '{}'.",
                value, source
            ));
        }
    }

    let length = value.chars().count();
    if let Some(expected) = facets.length {
        if length != expected {
            return Err(format!(
                "[facet 'length'] The value '{}' has a length of '{}'; this differs from the allowed length of '{}'.",
                value, length, expected
            ));
        }
    }
    if let Some(min) = facets.min_length {
        if length < min {
            return Err(format!(
                "[facet 'minLength'] The value '{}' has a length of '{}'; this underruns the allowed minimum length of '{}'.",
                value, length, min
            ));
        }
    }
    if let Some(max) = facets.max_length {
        if length > max {
            return Err(format!(
                "[facet 'maxLength'] The value '{}' has a length of '{}'; this exceeds the allowed maximum length of '{}'.",
                value, length, max
            ));
        }
    }

    check_range(facets, value, numeric)?;

    if let Some((total, fraction)) = digit_counts(value) {
        if let Some(max) = facets.total_digits {
            if total > max {
                return Err(format!(
                    "[facet 'totalDigits'] The value '{}' has more digits than are allowed ('{}').",
                    value, max
                ));
            }
        }
        if let Some(max) = facets.fraction_digits {
            if fraction > max {
                return Err(format!(
                    "[facet 'fractionDigits'] The value '{}' has more fractional digits than are allowed ('{}').",
                    value, max
                ));
            }
        }
    }

    Ok(())
}

/// 範囲ファセット（数値型は数値として、それ以外は字句として比較）
fn check_range(facets: &Facets, value: &str, numeric: bool) -> Result<(), String> {
    use std::cmp::Ordering;

    let compare = |bound: &(String, f64)| -> Option<Ordering> {
        if numeric {
            value.trim().parse::<f64>().ok()?.partial_cmp(&bound.1)
        } else {
            Some(value.cmp(bound.0.as_str()))
        }
    };

    if let Some(bound) = &facets.min_inclusive {
        if compare(bound) == Some(Ordering::Less) {
            return Err(format!(
                "[facet 'minInclusive'] The value '{}' is less than the minimum value allowed ('{}').",
                value, bound.0
            ));
        }
    }
    if let Some(bound) = &facets.max_inclusive {
        if compare(bound) == Some(Ordering::Greater) {
            return Err(format!(
                "[facet 'maxInclusive'] The value '{}' is greater than the maximum value allowed ('{}').",
                value, bound.0
            ));
        }
    }
    if let Some(bound) = &facets.min_exclusive {
        if matches!(compare(bound), Some(Ordering::Less | Ordering::Equal)) {
            return Err(format!(
                "[facet 'minExclusive'] The value '{}' must be greater than '{}'.",
                value, bound.0
            ));
        }
    }
    if let Some(bound) = &facets.max_exclusive {
        if matches!(compare(bound), Some(Ordering::Greater | Ordering::Equal)) {
            return Err(format!(
                "[facet 'maxExclusive'] The value '{}' must be less than '{}'.",
                value, bound.0
            ));
        }
    }
    Ok(())
}

/// 10進数字句の有効桁数と小数桁数
///
/// 整数部の先頭のゼロと小数部の末尾のゼロは数えません。
fn digit_counts(value: &str) -> Option<(usize, usize)> {
    if !is_decimal(value) {
        return None;
    }
    let unsigned = strip_sign(value);
    let (int_part, frac_part) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    let int_digits = int_part.trim_start_matches('0').len();
    let frac_digits = frac_part.trim_end_matches('0').len();
    Some((int_digits + frac_digits, frac_digits))
}

fn all_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn strip_sign(s: &str) -> &str {
    s.strip_prefix(|c: char| c == '+' || c == '-').unwrap_or(s)
}

fn is_decimal(value: &str) -> bool {
    let unsigned = strip_sign(value);
    match unsigned.split_once('.') {
        Some((int_part, frac_part)) => {
            (int_part.is_empty() || all_digits(int_part))
                && (frac_part.is_empty() || all_digits(frac_part))
                && !(int_part.is_empty() && frac_part.is_empty())
        }
        None => all_digits(unsigned),
    }
}

fn integer_in_range(value: &str, min: Option<i128>, max: Option<i128>) -> bool {
    if !all_digits(strip_sign(value)) {
        return false;
    }
    match value.parse::<i128>() {
        Ok(n) => min.map_or(true, |m| n >= m) && max.map_or(true, |m| n <= m),
        // i128を超える桁数は上下限のない方向にのみ許容
        Err(_) => {
            let negative = value.starts_with('-');
            if negative {
                min.is_none()
            } else {
                max.is_none()
            }
        }
    }
}

fn is_float(value: &str) -> bool {
    if matches!(value, "INF" | "+INF" | "-INF" | "NaN") {
        return true;
    }
    match value.split_once(|c: char| c == 'e' || c == 'E') {
        Some((mantissa, exponent)) => is_decimal(mantissa) && all_digits(strip_sign(exponent)),
        None => is_decimal(value),
    }
}

/// 末尾のタイムゾーン（`Z`または`±hh:mm`）を取り除く
fn strip_timezone(value: &str) -> Option<&str> {
    if let Some(rest) = value.strip_suffix('Z') {
        return Some(rest);
    }
    if value.len() > 6 && value.is_char_boundary(value.len() - 6) {
        let (rest, tz) = value.split_at(value.len() - 6);
        let bytes = tz.as_bytes();
        if tz.is_ascii() && (bytes[0] == b'+' || bytes[0] == b'-') && bytes[3] == b':' {
            let hours = &tz[1..3];
            let minutes = &tz[4..6];
            if all_digits(hours) && all_digits(minutes) {
                let valid = hours.parse::<u32>().map_or(false, |h| h <= 14)
                    && minutes.parse::<u32>().map_or(false, |m| m < 60);
                return valid.then_some(rest);
            }
        }
    }
    Some(value)
}

/// `YYYY`（4桁以上、負号可）
fn parse_year(value: &str) -> Option<i32> {
    let digits = value.strip_prefix('-').unwrap_or(value);
    if digits.len() < 4 || !all_digits(digits) {
        return None;
    }
    value.parse().ok()
}

fn two_digits(value: &str) -> Option<u32> {
    (value.len() == 2 && all_digits(value)).then(|| value.parse().ok()).flatten()
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    let (rest, day) = value.rsplit_once('-')?;
    let (year, month) = rest.rsplit_once('-')?;
    NaiveDate::from_ymd_opt(parse_year(year)?, two_digits(month)?, two_digits(day)?)
}

fn valid_time(value: &str) -> bool {
    let (hms, fraction) = value.split_once('.').unwrap_or((value, ""));
    if value.contains('.') && !all_digits(fraction) {
        return false;
    }
    let parts: Vec<&str> = hms.split(':').collect();
    let [h, m, s] = parts.as_slice() else {
        return false;
    };
    match (two_digits(h), two_digits(m), two_digits(s)) {
        (Some(24), Some(0), Some(0)) => fraction.trim_end_matches('0').is_empty(),
        (Some(h), Some(m), Some(s)) => h < 24 && m < 60 && s < 60,
        _ => false,
    }
}

fn is_date(value: &str) -> bool {
    strip_timezone(value).and_then(parse_date).is_some()
}

fn is_date_time(value: &str) -> bool {
    strip_timezone(value)
        .and_then(|v| v.split_once('T'))
        .map_or(false, |(date, time)| parse_date(date).is_some() && valid_time(time))
}

fn is_time(value: &str) -> bool {
    strip_timezone(value).map_or(false, valid_time)
}

fn is_g_year(value: &str) -> bool {
    strip_timezone(value).and_then(parse_year).is_some()
}

fn is_g_year_month(value: &str) -> bool {
    strip_timezone(value)
        .and_then(|v| v.rsplit_once('-'))
        .map_or(false, |(year, month)| {
            parse_year(year).is_some() && two_digits(month).map_or(false, |m| (1..=12).contains(&m))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    #[test]
    fn test_decimal_and_integer_lexicals() {
        assert!(Builtin::Decimal.accepts("123.45"));
        assert!(Builtin::Decimal.accepts("-.5"));
        assert!(Builtin::Decimal.accepts("+10."));
        assert!(!Builtin::Decimal.accepts("."));
        assert!(!Builtin::Decimal.accepts("1,000"));
        assert!(!Builtin::Decimal.accepts(""));

        assert!(Builtin::Integer.accepts("-42"));
        assert!(!Builtin::Integer.accepts("4.0"));
        assert!(Builtin::NonNegativeInteger.accepts("0"));
        assert!(!Builtin::NonNegativeInteger.accepts("-1"));
        assert!(!Builtin::PositiveInteger.accepts("0"));
        assert!(!Builtin::UnsignedByte.accepts("256"));
        assert!(Builtin::Long.accepts("9223372036854775807"));
        assert!(!Builtin::Long.accepts("9223372036854775808"));
        assert!(Builtin::Integer.accepts("1234567890123456789012345678901234567890"));
    }

    #[test]
    fn test_date_lexicals() {
        assert!(Builtin::Date.accepts("2024-02-29"));
        assert!(!Builtin::Date.accepts("2023-02-29"));
        assert!(Builtin::Date.accepts("2024-06-30Z"));
        assert!(Builtin::DateTime.accepts("2024-07-15T09:30:00"));
        assert!(Builtin::DateTime.accepts("2024-07-15T09:30:00.123+09:00"));
        assert!(!Builtin::DateTime.accepts("2024-07-15 09:30:00"));
        assert!(!Builtin::DateTime.accepts("2024-07-15T25:00:00"));
        assert!(Builtin::Time.accepts("24:00:00"));
        assert!(Builtin::GYear.accepts("2024"));
        assert!(!Builtin::GYear.accepts("24"));
        assert!(Builtin::GYearMonth.accepts("2024-12"));
        assert!(!Builtin::GYearMonth.accepts("2024-13"));
    }

    #[test]
    fn test_float_and_boolean() {
        assert!(Builtin::Double.accepts("1.5E-3"));
        assert!(Builtin::Float.accepts("-INF"));
        assert!(!Builtin::Float.accepts("1e"));
        assert!(Builtin::Boolean.accepts("1"));
        assert!(!Builtin::Boolean.accepts("yes"));
    }

    #[test]
    fn test_white_space_modes() {
        assert_eq!(normalize_white_space(" a\tb ", WhiteSpace::Preserve), " a\tb ");
        assert_eq!(normalize_white_space(" a\tb ", WhiteSpace::Replace), " a b ");
        assert_eq!(normalize_white_space("  a \n b  ", WhiteSpace::Collapse), "a b");
    }

    #[test]
    fn test_facet_messages() {
        let facets = Facets {
            enumeration: vec!["SH".to_string(), "PRN".to_string()],
            ..Facets::default()
        };
        assert_eq!(
            check_facets(&facets, "XX", false).unwrap_err(),
            "[facet 'enumeration'] The value 'XX' is not an element of the set {'SH', 'PRN'}."
        );

        let facets = Facets {
            patterns: vec![(
                "[0-9A-Z]{9}".to_string(),
                Regex::new("^(?:[0-9A-Z]{9})$").unwrap(),
            )],
            ..Facets::default()
        };
        assert!(check_facets(&facets, "037833100", false).is_ok());
        assert_eq!(
            check_facets(&facets, "0378", false).unwrap_err(),
            "[facet 'pattern'] The value '0378' is not accepted by the pattern '[0-9A-Z]{9}'."
        );

        let facets = Facets {
            max_length: Some(3),
            ..Facets::default()
        };
        assert!(check_facets(&facets, "abcd", false)
            .unwrap_err()
            .starts_with("[facet 'maxLength']"));
    }

    #[test]
    fn test_numeric_range_and_digits() {
        let facets = Facets {
            min_inclusive: Some(("0".to_string(), 0.0)),
            max_inclusive: Some(("100".to_string(), 100.0)),
            fraction_digits: Some(2),
            total_digits: Some(5),
            ..Facets::default()
        };
        assert!(check_facets(&facets, "100.00", true).is_ok());
        assert!(check_facets(&facets, "0", true).is_ok());
        assert!(check_facets(&facets, "-0.01", true)
            .unwrap_err()
            .starts_with("[facet 'minInclusive']"));
        assert!(check_facets(&facets, "100.01", true)
            .unwrap_err()
            .starts_with("[facet 'maxInclusive']"));
        assert!(check_facets(&facets, "1.234", true)
            .unwrap_err()
            .starts_with("[facet 'fractionDigits']"));
        assert!(check_facets(&facets, "0.50", true).is_ok());
    }

    #[test]
    fn test_digit_counts_ignore_insignificant_zeros() {
        assert_eq!(digit_counts("00123.4500"), Some((5, 2)));
        assert_eq!(digit_counts("0.00"), Some((0, 0)));
        assert_eq!(digit_counts("abc"), None);
    }
}
