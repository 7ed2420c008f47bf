//! Pure display helpers: identity truncation, fixed-point amounts,
//! percentages and day counts.
//!
//! Nothing in here allocates more than the returned string or can fail on
//! display input. [`major_to_minor`] parses user-typed amounts and
//! [`Decimals::new`] checks a precision, and both can fail.

use alloy_primitives::U256;

use crate::errors::{DreamError, Result};

/// Number of fractional digits in a fixed-point amount.
///
/// Bounded by [`Decimals::MAX`], the largest exponent for which `10^d` still
/// fits in a `U256`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decimals(u8);

impl Decimals {
    pub const MAX: u8 = 77;

    pub fn new(decimals: u8) -> Result<Self> {
        if decimals > Self::MAX {
            return Err(DreamError::UnsupportedDecimals(decimals));
        }
        Ok(Decimals(decimals))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    fn width(self) -> usize {
        self.0 as usize
    }

    fn scale(self) -> U256 {
        U256::from(10u64).pow(U256::from(self.0))
    }
}

/// Decimals of the funding asset (wei → ether).
pub const DECIMALS: Decimals = Decimals(18);

/// Width used for creator / wallet identities on the card.
pub const ADDRESS_DISPLAY_LEN: usize = 15;

const ELLIPSIS: &str = "...";

/// Shorten `s` to at most `max_len` characters by cutting out its middle.
///
/// The characters left after the ellipsis are split with the extra one going
/// to the front. A `max_len` below the ellipsis width degenerates to the bare
/// ellipsis.
pub fn truncate_middle(s: &str, max_len: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= max_len {
        return s.to_string();
    }

    let shown = max_len.saturating_sub(ELLIPSIS.len());
    let front = shown.div_ceil(2);
    let back = shown / 2;

    let mut out: String = chars[..front].iter().collect();
    out.push_str(ELLIPSIS);
    out.extend(&chars[chars.len() - back..]);
    out
}

/// Exact base-10 rendering of a minor-unit amount, trailing zeros trimmed.
pub fn minor_to_major(amount: U256, decimals: Decimals) -> String {
    let scale = decimals.scale();
    let whole = amount / scale;
    let frac = amount % scale;
    if frac.is_zero() {
        return whole.to_string();
    }
    let frac = format!("{:0>width$}", frac.to_string(), width = decimals.width());
    format!("{whole}.{}", frac.trim_end_matches('0'))
}

/// Parse a positive decimal string in major units into minor units.
pub fn major_to_minor(text: &str, decimals: Decimals) -> Result<U256> {
    let text = text.trim();
    let (whole, frac) = text.split_once('.').unwrap_or((text, ""));

    if whole.is_empty() && frac.is_empty() {
        return Err(DreamError::InvalidAmount(format!("{text:?} is not a number")));
    }
    let is_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if !is_digits(whole) || !is_digits(frac) {
        return Err(DreamError::InvalidAmount(format!("{text:?} is not a number")));
    }
    if frac.len() > decimals.width() {
        return Err(DreamError::InvalidAmount(format!(
            "{text:?} has more than {} decimal places",
            decimals.get()
        )));
    }

    let digits = format!("{whole}{frac:0<width$}", width = decimals.width());
    let value = U256::from_str_radix(&digits, 10)
        .map_err(|e| DreamError::InvalidAmount(format!("{text:?}: {e}")))?;
    if value.is_zero() {
        return Err(DreamError::InvalidAmount("amount must be positive".to_string()));
    }
    Ok(value)
}

/// `numerator / denominator * 100`.
///
/// A zero denominator yields `f64::NAN` ("undefined magnitude") instead of an
/// infinity or a panic. Use [`display_percent`] before showing the value.
pub fn percent(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        return f64::NAN;
    }
    numerator / denominator * 100.0
}

/// Map the `percent` sentinel (and any other non-finite value) to 0.
pub fn display_percent(p: f64) -> f64 {
    if p.is_finite() {
        p
    } else {
        0.0
    }
}

/// Rounded, unclamped percentage label, e.g. `"150%"`.
pub fn percent_label(p: f64) -> String {
    format!("{}%", display_percent(p).round())
}

pub fn format_days(days: u64) -> String {
    format!("{days} days left")
}
