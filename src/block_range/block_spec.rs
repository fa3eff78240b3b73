use std::{fmt, str::FromStr};

use alloy::primitives::BlockNumber;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::InvalidRange;

/// A block range endpoint as supplied by the caller.
///
/// Resolved to a concrete number once per scan by [`BlockSpec::resolve`]; nothing past the
/// resolver sees a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "lowercase"))]
pub enum BlockSpec {
    Number(BlockNumber),
    Latest,
    Earliest,
    Pending,
}

impl BlockSpec {
    /// Resolves against the tip fetched at scan start.
    ///
    /// `label` names the endpoint (`"from_block"` / `"to_block"`) in errors.
    ///
    /// # Errors
    ///
    /// * [`InvalidRange::Pending`] for [`BlockSpec::Pending`].
    /// * [`InvalidRange::ExceedsTip`] for a number above `tip`.
    pub fn resolve(
        self,
        label: &'static str,
        tip: BlockNumber,
    ) -> Result<BlockNumber, InvalidRange> {
        match self {
            BlockSpec::Latest => Ok(tip),
            BlockSpec::Earliest => Ok(0),
            BlockSpec::Pending => Err(InvalidRange::Pending(label)),
            BlockSpec::Number(n) if n > tip => Err(InvalidRange::ExceedsTip(label, n, tip)),
            BlockSpec::Number(n) => Ok(n),
        }
    }

    /// The number this spec denotes without consulting the chain, if any.
    #[must_use]
    pub fn as_number(self) -> Option<BlockNumber> {
        match self {
            BlockSpec::Number(n) => Some(n),
            BlockSpec::Earliest => Some(0),
            BlockSpec::Latest | BlockSpec::Pending => None,
        }
    }
}

/// Resolves a `(from, to)` pair against `tip`.
///
/// # Errors
///
/// Any [`InvalidRange`] from resolving either endpoint, or [`InvalidRange::Inverted`] when
/// `from` lands above `to`.
pub fn resolve_range(
    from: BlockSpec,
    to: BlockSpec,
    tip: BlockNumber,
) -> Result<(BlockNumber, BlockNumber), InvalidRange> {
    let from = from.resolve("from_block", tip)?;
    let to = to.resolve("to_block", tip)?;
    if from > to {
        return Err(InvalidRange::Inverted { from, to });
    }
    Ok((from, to))
}

/// Rejects ranges that are invalid regardless of the tip, so no ledger call is wasted on them.
pub(crate) fn precheck_range(from: BlockSpec, to: BlockSpec) -> Result<(), InvalidRange> {
    if from == BlockSpec::Pending {
        return Err(InvalidRange::Pending("from_block"));
    }
    if to == BlockSpec::Pending {
        return Err(InvalidRange::Pending("to_block"));
    }
    if let (Some(from), Some(to)) = (from.as_number(), to.as_number())
        && from > to
    {
        return Err(InvalidRange::Inverted { from, to });
    }
    Ok(())
}

impl From<BlockNumber> for BlockSpec {
    fn from(n: BlockNumber) -> Self {
        BlockSpec::Number(n)
    }
}

impl FromStr for BlockSpec {
    type Err = InvalidRange;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "latest" => return Ok(BlockSpec::Latest),
            "earliest" => return Ok(BlockSpec::Earliest),
            "pending" => return Ok(BlockSpec::Pending),
            _ => {}
        }

        let parsed = match trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
            Some(hex) => BlockNumber::from_str_radix(hex, 16),
            None => trimmed.parse::<BlockNumber>(),
        };

        parsed.map(BlockSpec::Number).map_err(|_| InvalidRange::Unparseable(s.to_owned()))
    }
}

impl fmt::Display for BlockSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockSpec::Number(n) => write!(f, "{n}"),
            BlockSpec::Latest => f.write_str("latest"),
            BlockSpec::Earliest => f.write_str("earliest"),
            BlockSpec::Pending => f.write_str("pending"),
        }
    }
}
