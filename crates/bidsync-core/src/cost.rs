//! Parser for free-text estimated-cost strings.
//!
//! Legacy projects describe their estimated cost as text such as
//! `"$500,000 - $750,000 (design-build)"`, `"<$100,000"` or `"N/A"`. The
//! destination stores each populated cost as a structured range.

use std::fmt;

use serde::Serialize;

use crate::error::AppError;

/// How `from` and `to` relate to the estimated cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum RangeSign {
    LessThan,
    GreaterThan,
    Between,
    #[default]
    Exact,
}

impl RangeSign {
    /// Symbol stored in the destination `est_cost_details.range_sign` column.
    pub fn as_str(self) -> &'static str {
        match self {
            RangeSign::LessThan => "<",
            RangeSign::GreaterThan => ">",
            RangeSign::Between => "-",
            RangeSign::Exact => "=",
        }
    }
}

impl fmt::Display for RangeSign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for RangeSign {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "<" => Ok(RangeSign::LessThan),
            ">" => Ok(RangeSign::GreaterThan),
            "-" => Ok(RangeSign::Between),
            "=" => Ok(RangeSign::Exact),
            other => Err(AppError::InvalidData(format!(
                "unknown range sign '{}'",
                other
            ))),
        }
    }
}

/// A parsed estimated-cost range.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct CostRange {
    pub from: String,
    pub to: String,
    pub description: Option<String>,
    pub range_sign: RangeSign,
}

/// Parses one estimated-cost string.
///
/// Returns `None` for blank input and for `"N/A"` in any case. Only the ASCII
/// hyphen separates a range; an en-dash is treated as part of an exact value.
///
/// # Examples
///
/// ```
/// use bidsync_core::cost::{parse_cost, RangeSign};
///
/// let range = parse_cost("<$50,000 (alt bid)").unwrap();
/// assert_eq!(range.from, "50,000");
/// assert_eq!(range.range_sign, RangeSign::LessThan);
/// assert_eq!(range.description.as_deref(), Some("alt bid"));
///
/// assert!(parse_cost("n/a").is_none());
/// ```
pub fn parse_cost(input: &str) -> Option<CostRange> {
    let trimmed = input.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("n/a") {
        return None;
    }

    let (working, description) = split_description(trimmed);

    let range = if working.contains('<') {
        CostRange {
            from: strip_amount(&working, '<'),
            to: String::new(),
            description,
            range_sign: RangeSign::LessThan,
        }
    } else if working.contains('>') {
        CostRange {
            from: strip_amount(&working, '>'),
            to: String::new(),
            description,
            range_sign: RangeSign::GreaterThan,
        }
    } else if let Some((left, right)) = working.split_once('-') {
        CostRange {
            from: strip_amount(left, '-'),
            to: strip_amount(right, '-'),
            description,
            range_sign: RangeSign::Between,
        }
    } else {
        CostRange {
            from: strip_amount(&working, '$'),
            to: String::new(),
            description,
            range_sign: RangeSign::Exact,
        }
    };

    Some(range)
}

/// Parses up to four cost strings, keeping the non-empty results in order.
pub fn parse_costs<'a, I>(inputs: I) -> Vec<CostRange>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    inputs.into_iter().flatten().filter_map(parse_cost).collect()
}

/// Removes the first parenthesized group and returns it as the description.
fn split_description(input: &str) -> (String, Option<String>) {
    let Some(open) = input.find('(') else {
        return (input.to_string(), None);
    };
    let after = &input[open + 1..];
    let (inner, rest) = match after.find(')') {
        Some(close) => (&after[..close], &after[close + 1..]),
        None => (after, ""),
    };

    let working = format!("{}{}", &input[..open], rest);
    let description = inner.trim();
    let description = (!description.is_empty()).then(|| description.to_string());
    (working.trim().to_string(), description)
}

fn strip_amount(part: &str, marker: char) -> String {
    part.chars()
        .filter(|c| *c != marker && *c != '$')
        .collect::<String>()
        .trim()
        .to_string()
}
