//! Field mapper.
//!
//! Converts one [`RawStone`] into a [`NormalizedStone`] by walking
//! [`FIELD_MAP`], a static table with one entry per persisted column. Each
//! entry names the upstream field spellings to try, in order, and the
//! coercion to apply.
//!
//! Mapping never fails on bad data. A value that cannot be coerced becomes
//! null and is reported as a [`MappingWarning`].

pub mod branch;
pub mod coerce;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use gemstock_core::{
    ColumnKind, ColumnValue, NormalizedStone, STONE_COLUMN_COUNT, SchemaError, StoneColumn,
};

use crate::xml::RawStone;
use branch::{BranchRejection, canonicalize_branch};

// =============================================================================
// Field map
// =============================================================================

/// How a column's value is derived from its source field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coercion {
    /// Trimmed text, blank as null.
    Text,
    /// Decimal number.
    Number,
    /// Decimal number that must not be negative.
    NonNegative,
    /// Decimal number multiplied by two (upstream prices are stored with margin).
    DoubledPrice,
    /// Branch code canonicalized to a city name.
    Branch,
    /// Always null.
    Reserved,
    /// The run's sync timestamp.
    SyncTimestamp,
}

impl Coercion {
    /// Storage kind this coercion produces. `Reserved` adopts the column's kind.
    #[must_use]
    pub const fn kind(self) -> Option<ColumnKind> {
        match self {
            Self::Text | Self::Branch => Some(ColumnKind::Text),
            Self::Number | Self::NonNegative | Self::DoubledPrice => Some(ColumnKind::Numeric),
            Self::SyncTimestamp => Some(ColumnKind::Timestamp),
            Self::Reserved => None,
        }
    }
}

/// One `(source fields, column, coercion)` entry.
#[derive(Debug, Clone, Copy)]
pub struct FieldMapping {
    pub column: StoneColumn,
    /// Upstream field names, tried in order. Matched after key normalization.
    pub sources: &'static [&'static str],
    pub coercion: Coercion,
}

const fn field(
    column: StoneColumn,
    sources: &'static [&'static str],
    coercion: Coercion,
) -> FieldMapping {
    FieldMapping {
        column,
        sources,
        coercion,
    }
}

/// The complete mapping, in column order.
pub static FIELD_MAP: [FieldMapping; STONE_COLUMN_COUNT] = [
    field(StoneColumn::Category, &["Category"], Coercion::Text),
    field(StoneColumn::Sku, &["SKU"], Coercion::Text),
    field(StoneColumn::Shape, &["Shape"], Coercion::Text),
    field(StoneColumn::Weight, &["Weight", "Carat"], Coercion::NonNegative),
    field(StoneColumn::Color, &["Color"], Coercion::Text),
    field(StoneColumn::Clarity, &["Clarity"], Coercion::Text),
    field(StoneColumn::Cut, &["Cut"], Coercion::Text),
    field(StoneColumn::Polish, &["Polish"], Coercion::Text),
    field(StoneColumn::Symmetry, &["Symmetry"], Coercion::Text),
    field(StoneColumn::TablePercent, &["Table", "Table %"], Coercion::Number),
    field(StoneColumn::DepthPercent, &["Depth", "Depth %"], Coercion::Number),
    field(StoneColumn::Ratio, &["ratio"], Coercion::Number),
    field(
        StoneColumn::Measurements,
        &["Measurements-delimiter", "Measurements"],
        Coercion::Text,
    ),
    field(StoneColumn::Lab, &["Lab"], Coercion::Text),
    field(StoneColumn::Fluorescence, &["Fluorescence"], Coercion::Text),
    field(
        StoneColumn::CertificateNumber,
        &["Certificate Number"],
        Coercion::Text,
    ),
    field(
        StoneColumn::CertificateImage,
        &["Certificateimage", "Certificate"],
        Coercion::Text,
    ),
    field(
        StoneColumn::CertificateImageJpg,
        &["certificateImageJPG"],
        Coercion::Text,
    ),
    field(StoneColumn::CertComments, &["Cert. Comments"], Coercion::Text),
    field(StoneColumn::Origin, &["Origin"], Coercion::Text),
    field(
        StoneColumn::PricePerCarat,
        &["PricePerCarat"],
        Coercion::DoubledPrice,
    ),
    field(StoneColumn::RapPrice, &["Rap. Price"], Coercion::Number),
    field(StoneColumn::RapPricePercent, &["Rap Price %"], Coercion::Text),
    field(StoneColumn::TotalPrice, &["TotalPrice"], Coercion::DoubledPrice),
    field(StoneColumn::Location, &["Location"], Coercion::Text),
    field(StoneColumn::Branch, &["Branch"], Coercion::Branch),
    field(StoneColumn::Image, &["Image", "Picture"], Coercion::Text),
    field(
        StoneColumn::AdditionalPictures,
        &["additional_pictures"],
        Coercion::Text,
    ),
    field(StoneColumn::Video, &["Video"], Coercion::Text),
    field(
        StoneColumn::AdditionalVideos,
        &["additional_videos"],
        Coercion::Text,
    ),
    field(StoneColumn::FancyIntensity, &["fancy_intensity"], Coercion::Text),
    field(StoneColumn::FancyColor, &["fancy_color"], Coercion::Text),
    field(StoneColumn::FancyOvertone, &["fancy_overtone"], Coercion::Text),
    field(StoneColumn::FancyColor2, &["fancy_color_2"], Coercion::Text),
    field(StoneColumn::FancyOvertone2, &["fancy_overtone_2"], Coercion::Text),
    field(StoneColumn::Comment, &["Comment"], Coercion::Text),
    field(StoneColumn::StoneType, &["Type"], Coercion::Text),
    field(StoneColumn::RawXml, &[], Coercion::Reserved),
    field(StoneColumn::CreatedAt, &[], Coercion::SyncTimestamp),
    field(StoneColumn::UpdatedAt, &[], Coercion::SyncTimestamp),
];

// =============================================================================
// Warnings
// =============================================================================

/// A field value that was replaced with null.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingProblem {
    #[error("not a number: {0:?}")]
    NotANumber(String),

    #[error("negative value {0}")]
    Negative(Decimal),

    #[error("doubled price out of range: {0}")]
    Overflow(Decimal),

    #[error("rejected branch {value:?}: {reason}")]
    RejectedBranch {
        value: String,
        reason: BranchRejection,
    },
}

/// A non-fatal, per-field mapping condition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{column} of stone {}: {problem}", .sku.as_deref().unwrap_or("<no sku>"))]
pub struct MappingWarning {
    pub sku: Option<String>,
    pub column: StoneColumn,
    pub problem: MappingProblem,
}

/// A mapped stone and the warnings raised while mapping it.
#[derive(Debug, Clone)]
pub struct MappedStone {
    pub stone: NormalizedStone,
    pub warnings: Vec<MappingWarning>,
}

// =============================================================================
// Mapping
// =============================================================================

/// Map one raw stone.
///
/// Pure: the result depends only on `raw`, `synced_at` and [`FIELD_MAP`].
///
/// # Errors
///
/// Returns `SchemaError` only if [`FIELD_MAP`] itself disagrees with the column
/// schema.
pub fn map_stone(raw: &RawStone, synced_at: DateTime<Utc>) -> Result<MappedStone, SchemaError> {
    let sku = coerce::text(raw.get("SKU"));
    let mut warnings = Vec::new();

    let values = FIELD_MAP.each_ref().map(|mapping| {
        let (value, problem) = apply(mapping, raw, synced_at);
        if let Some(problem) = problem {
            warnings.push(MappingWarning {
                sku: sku.clone(),
                column: mapping.column,
                problem,
            });
        }
        value
    });

    Ok(MappedStone {
        stone: NormalizedStone::new(values)?,
        warnings,
    })
}

fn apply(
    mapping: &FieldMapping,
    raw: &RawStone,
    synced_at: DateTime<Utc>,
) -> (ColumnValue, Option<MappingProblem>) {
    let source = raw.first_of(mapping.sources);
    match mapping.coercion {
        Coercion::Text => (ColumnValue::Text(coerce::text(source)), None),
        Coercion::Number | Coercion::NonNegative | Coercion::DoubledPrice => {
            let (value, problem) = numeric(mapping.coercion, source);
            (ColumnValue::Numeric(value), problem)
        }
        Coercion::Branch => match canonicalize_branch(source.unwrap_or_default()) {
            Ok(branch) => (ColumnValue::Text(branch), None),
            Err(reason) => (
                ColumnValue::Text(None),
                Some(MappingProblem::RejectedBranch {
                    value: source.unwrap_or_default().trim().to_string(),
                    reason,
                }),
            ),
        },
        Coercion::Reserved => (ColumnValue::null(mapping.column.kind()), None),
        Coercion::SyncTimestamp => (ColumnValue::Timestamp(Some(synced_at)), None),
    }
}

fn numeric(coercion: Coercion, source: Option<&str>) -> (Option<Decimal>, Option<MappingProblem>) {
    let parsed = match coerce::number(source) {
        Ok(Some(n)) => n,
        Ok(None) => return (None, None),
        Err(coerce::NotANumber) => {
            let raw = source.unwrap_or_default().trim().to_string();
            return (None, Some(MappingProblem::NotANumber(raw)));
        }
    };

    match coercion {
        Coercion::NonNegative if parsed.is_sign_negative() && !parsed.is_zero() => {
            (None, Some(MappingProblem::Negative(parsed)))
        }
        Coercion::DoubledPrice => match coerce::doubled(parsed) {
            Some(doubled) => (Some(doubled), None),
            None => (None, Some(MappingProblem::Overflow(parsed))),
        },
        _ => (Some(parsed), None),
    }
}
