//! Tolerant comparison of numeric maps, such as measurement counts.
//!
//! Two maps are almost equal when, for every key present in either, the
//! values differ by less than `delta` or round to zero at `places` decimal
//! places. A key missing from one map takes a default value, zero unless
//! configured. Maps that compare equal are always almost equal.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;

use crate::error::HarnessError;

/// Tolerance used when neither `delta` nor `places` is given.
pub const DEFAULT_DELTA: f64 = 1e-8;

/// Options for [`dicts_almost_equal`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AlmostEqual {
    delta: Option<f64>,
    places: Option<u32>,
    default_value: f64,
}

impl AlmostEqual {
    /// Compares within [`DEFAULT_DELTA`], with missing keys counting as zero.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            delta: None,
            places: None,
            default_value: 0.0,
        }
    }

    /// Compares within an absolute difference.
    #[must_use]
    pub const fn delta(mut self, delta: f64) -> Self {
        self.delta = Some(delta);
        self
    }

    /// Compares after rounding the difference to decimal places.
    #[must_use]
    pub const fn places(mut self, places: u32) -> Self {
        self.places = Some(places);
        self
    }

    /// Value used for keys missing from one of the maps.
    #[must_use]
    pub const fn default_value(mut self, value: f64) -> Self {
        self.default_value = value;
        self
    }

    /// Describes how `left` and `right` differ, or `None` if they are almost
    /// equal.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::ConflictingTolerance`] when both `delta` and
    /// `places` are set and the maps are not equal.
    #[expect(
        clippy::float_arithmetic,
        reason = "tolerance checks compare floating point differences"
    )]
    pub fn compare<K>(
        &self,
        left: &BTreeMap<K, f64>,
        right: &BTreeMap<K, f64>,
    ) -> Result<Option<String>, HarnessError>
    where
        K: Ord + Display,
    {
        if left == right {
            return Ok(None);
        }
        let tolerance = self.tolerance()?;
        let keys: BTreeSet<&K> = left.keys().chain(right.keys()).collect();
        let differences: Vec<String> = keys
            .into_iter()
            .filter_map(|key| {
                let first = left.get(key).copied().unwrap_or(self.default_value);
                let second = right.get(key).copied().unwrap_or(self.default_value);
                (!tolerance.accepts((first - second).abs()))
                    .then(|| format!("({key}: {first} != {second})"))
            })
            .collect();
        if differences.is_empty() {
            return Ok(None);
        }
        Ok(Some(format!("{}{}", differences.join(", "), tolerance.suffix())))
    }

    fn tolerance(&self) -> Result<Tolerance, HarnessError> {
        match (self.delta, self.places) {
            (Some(_), Some(_)) => Err(HarnessError::ConflictingTolerance),
            (_, Some(places)) => Ok(Tolerance::Places(places)),
            (delta, None) => Ok(Tolerance::Delta(delta.unwrap_or(DEFAULT_DELTA))),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Tolerance {
    Delta(f64),
    Places(u32),
}

impl Tolerance {
    #[expect(
        clippy::float_arithmetic,
        reason = "rounding to decimal places scales the difference"
    )]
    fn accepts(self, difference: f64) -> bool {
        match self {
            Self::Delta(delta) => difference < delta,
            Self::Places(places) => {
                let exponent = i32::try_from(places).unwrap_or(i32::MAX);
                // Halfway values round to even, so exactly 0.5 rounds to zero.
                (difference * 10_f64.powi(exponent)).abs() <= 0.5
            }
        }
    }

    fn suffix(self) -> String {
        match self {
            Self::Delta(delta) => format!(" within {delta:e} delta"),
            Self::Places(places) => format!(" within {places} places"),
        }
    }
}

/// Describes how two numeric maps differ, or `None` when they are almost
/// equal.
///
/// # Errors
///
/// Returns [`HarnessError::ConflictingTolerance`] when both `delta` and
/// `places` are given.
///
/// # Example
///
/// ```
/// use std::collections::BTreeMap;
///
/// use lumen_harness::dicts_almost_equal;
///
/// let expected = BTreeMap::from([("00", 0.5), ("11", 0.5)]);
/// let measured = BTreeMap::from([("00", 0.49), ("11", 0.51)]);
/// let verdict = dicts_almost_equal(&expected, &measured, Some(0.05), None, 0.0)
///     .expect("one tolerance given");
/// assert_eq!(verdict, None);
/// ```
pub fn dicts_almost_equal<K>(
    left: &BTreeMap<K, f64>,
    right: &BTreeMap<K, f64>,
    delta: Option<f64>,
    places: Option<u32>,
    default_value: f64,
) -> Result<Option<String>, HarnessError>
where
    K: Ord + Display,
{
    options(delta, places, default_value).compare(left, right)
}

/// Fails unless two numeric maps are almost equal.
///
/// # Errors
///
/// Returns [`HarnessError::NotAlmostEqual`] describing the differing keys,
/// or [`HarnessError::ConflictingTolerance`] when both `delta` and `places`
/// are given.
pub fn assert_dicts_almost_equal<K>(
    left: &BTreeMap<K, f64>,
    right: &BTreeMap<K, f64>,
    delta: Option<f64>,
    places: Option<u32>,
    default_value: f64,
) -> Result<(), HarnessError>
where
    K: Ord + Display,
{
    match dicts_almost_equal(left, right, delta, places, default_value)? {
        None => Ok(()),
        Some(message) => Err(HarnessError::NotAlmostEqual { message }),
    }
}

const fn options(delta: Option<f64>, places: Option<u32>, default_value: f64) -> AlmostEqual {
    AlmostEqual {
        delta,
        places,
        default_value,
    }
}
