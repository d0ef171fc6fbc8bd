//! Value verifiers: convert a raw token into a [`Value`] of a given kind.
//!
//! The plain converters ([`parse_integer`], [`parse_bool`], [`parse_size`],
//! [`parse_duration`], ...) are pure. [`verify`] wires them to a parse: it
//! reports rejections through the schema's sink and handles the kinds that
//! need schema state (choices, custom verifiers, string duplication).

use std::fmt;
use std::num::{IntErrorKind, ParseIntError};
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use thiserror::Error;

use crate::log::{LogLevel, LogSink, emit};
use crate::schema::{Ledger, SchemaOptions};
use crate::spec::Payload;
use crate::tree::{FsKind, FsProbe};
use crate::value::{Value, ValueKind};

/// Why a token was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    #[error("empty value")]
    Empty,
    #[error("not a number")]
    NotANumber,
    #[error("out of range")]
    OutOfRange,
    #[error("negative values are not allowed")]
    Negative,
    #[error("not a finite number")]
    NotFinite,
    #[error("expected one of true/yes/1/on or false/no/0/off")]
    NotABool,
    #[error("unknown unit '{0}'")]
    UnknownUnit(String),
    #[error("path does not exist")]
    Missing,
    #[error("not a regular file")]
    NotAFile,
    #[error("not a directory")]
    NotADirectory,
    #[error("not one of the allowed choices")]
    NoSuchChoice,
    #[error("rejected by custom verifier")]
    Rejected,
    #[error("{0} values cannot be converted from a literal")]
    Unsupported(ValueKind),
}

/// Unit family of a duration kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    /// Whole seconds; suffixes `s`, `m`, `h`, `d`; bare numbers are seconds.
    Seconds,
    /// Whole nanoseconds; suffixes `ns`, `us`, `ms`, `s`, `m`, `h`, `d`;
    /// bare numbers are nanoseconds.
    Nanoseconds,
}

/// Magnitude with optional exponent, then an optional alphabetic unit.
static QUANTITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*((?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+)(?:[eE][+-]?[0-9]+)?)\s*([A-Za-z]*)\s*$")
        .expect("static regex must compile")
});

/// Digits of a decimal fraction considered by exact scaling.
const MAX_FRACTION_DIGITS: usize = 24;

/// Parses a base-10 integer.
///
/// Leading ASCII whitespace is skipped. With `unsigned` set, a sign is
/// rejected; `-` even when the magnitude is zero.
///
/// # Examples
///
/// ```
/// use argwright_core::{VerifyError, parse_integer};
///
/// assert_eq!(parse_integer::<i8>("  -12", false), Ok(-12));
/// assert_eq!(parse_integer::<u64>(" -1", true), Err(VerifyError::Negative));
/// assert_eq!(parse_integer::<u8>("300", true), Err(VerifyError::OutOfRange));
/// assert_eq!(parse_integer::<i32>("", false), Err(VerifyError::Empty));
/// ```
pub fn parse_integer<T>(token: &str, unsigned: bool) -> Result<T, VerifyError>
where
    T: FromStr<Err = ParseIntError>,
{
    if token.is_empty() {
        return Err(VerifyError::Empty);
    }
    let digits = token.trim_start_matches(|c: char| c.is_ascii_whitespace());
    if unsigned && digits.starts_with('-') {
        return Err(VerifyError::Negative);
    }
    if unsigned && digits.starts_with('+') {
        return Err(VerifyError::NotANumber);
    }
    digits.parse::<T>().map_err(|err| match err.kind() {
        IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => VerifyError::OutOfRange,
        _ => VerifyError::NotANumber,
    })
}

/// Parses a floating point number; `nan` and `inf` are accepted.
pub fn parse_double(token: &str) -> Result<f64, VerifyError> {
    if token.is_empty() {
        return Err(VerifyError::Empty);
    }
    token
        .trim_start_matches(|c: char| c.is_ascii_whitespace())
        .parse::<f64>()
        .map_err(|_| VerifyError::NotANumber)
}

/// Parses a boolean literal, ignoring ASCII case.
pub fn parse_bool(token: &str) -> Result<bool, VerifyError> {
    if token.is_empty() {
        return Err(VerifyError::Empty);
    }
    match token.to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Ok(true),
        "false" | "no" | "0" | "off" => Ok(false),
        _ => Err(VerifyError::NotABool),
    }
}

/// Parses a byte count such as `10`, `10B`, `1.4MB` or `2KiB`.
///
/// `K`, `Ki` and `KiB` are binary (1024); `KB` is decimal (1000); likewise
/// for `M`, `G` and `T`. Units ignore case. Fractional results truncate.
///
/// # Examples
///
/// ```
/// use argwright_core::parse_size;
///
/// assert_eq!(parse_size("10"), Ok(10));
/// assert_eq!(parse_size("10B"), Ok(10));
/// assert_eq!(parse_size("1.4MB"), Ok(1_400_000));
/// assert_eq!(parse_size("2KiB"), Ok(2048));
/// assert!(parse_size("-1K").is_err());
/// ```
pub fn parse_size(token: &str) -> Result<u64, VerifyError> {
    let (magnitude, unit) = split_quantity(token)?;
    let multiplier = size_multiplier(unit)?;
    scale(magnitude, multiplier)
}

/// Parses a duration into whole seconds or nanoseconds.
///
/// # Examples
///
/// ```
/// use argwright_core::{TimeUnit, VerifyError, parse_duration};
///
/// assert_eq!(parse_duration("90", TimeUnit::Seconds), Ok(90));
/// assert_eq!(parse_duration("1.5m", TimeUnit::Seconds), Ok(90));
/// assert_eq!(parse_duration("2ms", TimeUnit::Nanoseconds), Ok(2_000_000));
/// assert_eq!(parse_duration("nan", TimeUnit::Nanoseconds), Err(VerifyError::NotFinite));
/// ```
pub fn parse_duration(token: &str, unit: TimeUnit) -> Result<u64, VerifyError> {
    let (magnitude, suffix) = split_quantity(token)?;
    let multiplier = time_multiplier(suffix, unit)?;
    scale(magnitude, multiplier)
}

fn split_quantity(token: &str) -> Result<(&str, &str), VerifyError> {
    if token.is_empty() {
        return Err(VerifyError::Empty);
    }
    let trimmed = token.trim();
    if let Ok(number) = trimmed.parse::<f64>() {
        if !number.is_finite() {
            return Err(VerifyError::NotFinite);
        }
    }
    if trimmed.starts_with('-') {
        return Err(VerifyError::Negative);
    }
    let captures = QUANTITY_RE.captures(token).ok_or(VerifyError::NotANumber)?;
    match (captures.get(1), captures.get(2)) {
        (Some(magnitude), Some(unit)) => Ok((magnitude.as_str(), unit.as_str())),
        _ => Err(VerifyError::NotANumber),
    }
}

fn size_multiplier(unit: &str) -> Result<u64, VerifyError> {
    const KI: u64 = 1024;
    let multiplier = match unit.to_ascii_lowercase().as_str() {
        "" | "b" | "byte" | "bytes" => 1,
        "k" | "ki" | "kib" => KI,
        "kb" => 1_000,
        "m" | "mi" | "mib" => KI.pow(2),
        "mb" => 1_000_000,
        "g" | "gi" | "gib" => KI.pow(3),
        "gb" => 1_000_000_000,
        "t" | "ti" | "tib" => KI.pow(4),
        "tb" => 1_000_000_000_000,
        _ => return Err(VerifyError::UnknownUnit(unit.to_string())),
    };
    Ok(multiplier)
}

fn time_multiplier(suffix: &str, unit: TimeUnit) -> Result<u64, VerifyError> {
    const SECOND_NS: u64 = 1_000_000_000;
    let seconds = match suffix {
        "s" => Some(1),
        "m" => Some(60),
        "h" => Some(3_600),
        "d" => Some(86_400),
        _ => None,
    };
    match (unit, suffix, seconds) {
        (TimeUnit::Seconds, "", _) => Ok(1),
        (TimeUnit::Seconds, _, Some(s)) => Ok(s),
        (TimeUnit::Nanoseconds, "" | "ns", _) => Ok(1),
        (TimeUnit::Nanoseconds, "us", _) => Ok(1_000),
        (TimeUnit::Nanoseconds, "ms", _) => Ok(1_000_000),
        (TimeUnit::Nanoseconds, _, Some(s)) => Ok(s * SECOND_NS),
        _ => Err(VerifyError::UnknownUnit(suffix.to_string())),
    }
}

/// `magnitude * multiplier`, truncated. Plain decimals are scaled exactly;
/// exponent forms go through `f64`.
fn scale(magnitude: &str, multiplier: u64) -> Result<u64, VerifyError> {
    if magnitude.contains(['e', 'E']) {
        let base: f64 = magnitude.parse().map_err(|_| VerifyError::NotANumber)?;
        let scaled = base * multiplier as f64;
        if !scaled.is_finite() {
            return Err(VerifyError::NotFinite);
        }
        if scaled >= u64::MAX as f64 {
            return Err(VerifyError::OutOfRange);
        }
        return Ok(scaled as u64);
    }

    let (whole, fraction) = magnitude.split_once('.').unwrap_or((magnitude, ""));
    let whole: u128 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| VerifyError::OutOfRange)?
    };
    let mut total = whole
        .checked_mul(u128::from(multiplier))
        .ok_or(VerifyError::OutOfRange)?;

    let fraction = fraction.trim_end_matches('0');
    let fraction = &fraction[..fraction.len().min(MAX_FRACTION_DIGITS)];
    if !fraction.is_empty() {
        let numerator: u128 = fraction.parse().map_err(|_| VerifyError::NotANumber)?;
        let denominator = 10u128.pow(fraction.len() as u32);
        total = total
            .checked_add(numerator * u128::from(multiplier) / denominator)
            .ok_or(VerifyError::OutOfRange)?;
    }
    u64::try_from(total).map_err(|_| VerifyError::OutOfRange)
}

/// Checks that `path` exists with the kind `kind` requires.
pub fn check_path(kind: ValueKind, path: &str, fs: &dyn FsProbe) -> Result<(), VerifyError> {
    if path.is_empty() {
        return Err(VerifyError::Empty);
    }
    let found = fs.kind(Path::new(path)).ok_or(VerifyError::Missing)?;
    match (kind, found) {
        (ValueKind::File, FsKind::File) | (ValueKind::Dir, FsKind::Dir) => Ok(()),
        (ValueKind::File, _) => Err(VerifyError::NotAFile),
        (ValueKind::Dir, _) => Err(VerifyError::NotADirectory),
        _ => Ok(()),
    }
}

/// Converts a literal for kinds that need no schema state and no filesystem.
///
/// Path kinds are taken verbatim. Choice, subcommand and custom kinds return
/// [`VerifyError::Unsupported`].
///
/// # Examples
///
/// ```
/// use argwright_core::{Value, ValueKind, convert_literal};
///
/// assert_eq!(convert_literal(ValueKind::Bool, "on"), Ok(Value::Bool(true)));
/// assert_eq!(convert_literal(ValueKind::Size, "1K"), Ok(Value::UInt64(1024)));
/// assert!(convert_literal(ValueKind::Choice, "a").is_err());
/// ```
pub fn convert_literal(kind: ValueKind, token: &str) -> Result<Value, VerifyError> {
    let value = match kind {
        ValueKind::Bool => Value::Bool(parse_bool(token)?),
        ValueKind::Int8 => Value::Int8(parse_integer(token, false)?),
        ValueKind::UInt8 => Value::UInt8(parse_integer(token, true)?),
        ValueKind::Int32 => Value::Int32(parse_integer(token, false)?),
        ValueKind::UInt32 => Value::UInt32(parse_integer(token, true)?),
        ValueKind::Int64 => Value::Int64(parse_integer(token, false)?),
        ValueKind::UInt64 => Value::UInt64(parse_integer(token, true)?),
        ValueKind::Double => Value::Double(parse_double(token)?),
        ValueKind::Size => Value::UInt64(parse_size(token)?),
        ValueKind::TimeSeconds => Value::UInt64(parse_duration(token, TimeUnit::Seconds)?),
        ValueKind::TimeNanoseconds => {
            Value::UInt64(parse_duration(token, TimeUnit::Nanoseconds)?)
        }
        ValueKind::String | ValueKind::Path | ValueKind::File | ValueKind::Dir => {
            if token.is_empty() {
                return Err(VerifyError::Empty);
            }
            Value::from(token)
        }
        ValueKind::Choice | ValueKind::Subcommand | ValueKind::Custom => {
            return Err(VerifyError::Unsupported(kind));
        }
    };
    Ok(value)
}

/// Context handed to a verifier for one token.
///
/// Custom verifiers use it to read the token, report diagnostics, duplicate
/// strings into the schema's ledger and set the converted value.
pub struct Verification<'a> {
    schema_name: &'a str,
    arg_name: &'a str,
    token: Arc<str>,
    options: &'a SchemaOptions,
    sink: &'a dyn LogSink,
    ledger: &'a mut Ledger,
    fs: &'a dyn FsProbe,
    output: Option<Value>,
}

impl<'a> Verification<'a> {
    pub(crate) fn new(
        schema_name: &'a str,
        arg_name: &'a str,
        token: Arc<str>,
        options: &'a SchemaOptions,
        sink: &'a dyn LogSink,
        ledger: &'a mut Ledger,
        fs: &'a dyn FsProbe,
    ) -> Self {
        Self {
            schema_name,
            arg_name,
            token,
            options,
            sink,
            ledger,
            fs,
            output: None,
        }
    }

    /// Name of the schema being parsed.
    pub fn schema_name(&self) -> &str {
        self.schema_name
    }

    /// Display name of the argument being verified.
    pub fn arg_name(&self) -> &str {
        self.arg_name
    }

    /// The raw token.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Options of the schema being parsed.
    pub fn options(&self) -> &SchemaOptions {
        self.options
    }

    /// Same contract as [`Schema::duplicate_string`](crate::Schema::duplicate_string).
    pub fn duplicate_string(&mut self, s: &Arc<str>) -> Arc<str> {
        if self.options.duplicate_strings {
            self.ledger.duplicate(s)
        } else {
            Arc::clone(s)
        }
    }

    /// The token, duplicated when the schema asks for it.
    pub fn duplicate_token(&mut self) -> Arc<str> {
        let token = Arc::clone(&self.token);
        self.duplicate_string(&token)
    }

    /// Reports a diagnostic through the schema's sink.
    pub fn log(&self, level: LogLevel, args: fmt::Arguments<'_>) {
        emit(self.sink, self.options.min_log_level, self.schema_name, level, args);
    }

    /// Sets the converted value.
    pub fn set(&mut self, value: impl Into<Value>) {
        self.output = Some(value.into());
    }

    /// The value set so far.
    pub fn value(&self) -> Option<&Value> {
        self.output.as_ref()
    }

    fn reject(&self, err: &VerifyError) {
        self.log(
            LogLevel::Error,
            format_args!("invalid value '{}' for '{}': {err}", self.token, self.arg_name),
        );
    }
}

/// Verifies the context's token as `kind` and returns the converted value.
///
/// Rejections are logged at [`LogLevel::Error`]. Subcommand tokens are
/// resolved by the matcher and never reach this function.
pub(crate) fn verify(kind: ValueKind, payload: &Payload, ctx: &mut Verification<'_>) -> Option<Value> {
    match convert(kind, payload, ctx) {
        Ok(value) => Some(value),
        Err(err) => {
            ctx.reject(&err);
            None
        }
    }
}

fn convert(kind: ValueKind, payload: &Payload, ctx: &mut Verification<'_>) -> Result<Value, VerifyError> {
    let token = Arc::clone(&ctx.token);
    match kind {
        ValueKind::String => {
            if token.is_empty() {
                return Err(VerifyError::Empty);
            }
            Ok(Value::Text(ctx.duplicate_token()))
        }
        ValueKind::Path | ValueKind::File | ValueKind::Dir => {
            check_path(kind, &token, ctx.fs)?;
            Ok(Value::Text(ctx.duplicate_token()))
        }
        ValueKind::Choice => {
            if token.is_empty() {
                return Err(VerifyError::Empty);
            }
            payload
                .choices()
                .and_then(|set| set.find(&token))
                .map(Value::Choice)
                .ok_or(VerifyError::NoSuchChoice)
        }
        ValueKind::Custom => {
            if token.is_empty() {
                return Err(VerifyError::Empty);
            }
            let Payload::Verifier(verify_fn) = payload else {
                return Err(VerifyError::Unsupported(kind));
            };
            if !verify_fn(ctx, &token) {
                return Err(VerifyError::Rejected);
            }
            match ctx.output.take() {
                Some(value) => Ok(value),
                None => Ok(Value::Text(ctx.duplicate_token())),
            }
        }
        _ => convert_literal(kind, &token),
    }
}
