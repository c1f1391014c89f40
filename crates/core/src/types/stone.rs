//! The persisted stone schema.
//!
//! Every sync run produces a batch of [`NormalizedStone`] values, each a
//! fixed-arity row whose slots line up with [`StoneColumn::ALL`]. The column
//! order here is the column order of the `soap_stones` table and of every
//! multi-row insert the loader issues.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of persisted columns per stone.
pub const STONE_COLUMN_COUNT: usize = 40;

/// Storage kind of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Text,
    Numeric,
    Timestamp,
}

/// A persisted `soap_stones` column, in table order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoneColumn {
    Category,
    Sku,
    Shape,
    Weight,
    Color,
    Clarity,
    Cut,
    Polish,
    Symmetry,
    TablePercent,
    DepthPercent,
    Ratio,
    Measurements,
    Lab,
    Fluorescence,
    CertificateNumber,
    CertificateImage,
    CertificateImageJpg,
    CertComments,
    Origin,
    PricePerCarat,
    RapPrice,
    RapPricePercent,
    TotalPrice,
    Location,
    Branch,
    Image,
    AdditionalPictures,
    Video,
    AdditionalVideos,
    FancyIntensity,
    FancyColor,
    FancyOvertone,
    FancyColor2,
    FancyOvertone2,
    Comment,
    StoneType,
    RawXml,
    CreatedAt,
    UpdatedAt,
}

impl StoneColumn {
    /// All columns in table order.
    pub const ALL: [Self; STONE_COLUMN_COUNT] = [
        Self::Category,
        Self::Sku,
        Self::Shape,
        Self::Weight,
        Self::Color,
        Self::Clarity,
        Self::Cut,
        Self::Polish,
        Self::Symmetry,
        Self::TablePercent,
        Self::DepthPercent,
        Self::Ratio,
        Self::Measurements,
        Self::Lab,
        Self::Fluorescence,
        Self::CertificateNumber,
        Self::CertificateImage,
        Self::CertificateImageJpg,
        Self::CertComments,
        Self::Origin,
        Self::PricePerCarat,
        Self::RapPrice,
        Self::RapPricePercent,
        Self::TotalPrice,
        Self::Location,
        Self::Branch,
        Self::Image,
        Self::AdditionalPictures,
        Self::Video,
        Self::AdditionalVideos,
        Self::FancyIntensity,
        Self::FancyColor,
        Self::FancyOvertone,
        Self::FancyColor2,
        Self::FancyOvertone2,
        Self::Comment,
        Self::StoneType,
        Self::RawXml,
        Self::CreatedAt,
        Self::UpdatedAt,
    ];

    /// Position of this column in [`Self::ALL`] and in every row.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// SQL column name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Category => "category",
            Self::Sku => "sku",
            Self::Shape => "shape",
            Self::Weight => "weight",
            Self::Color => "color",
            Self::Clarity => "clarity",
            Self::Cut => "cut",
            Self::Polish => "polish",
            Self::Symmetry => "symmetry",
            Self::TablePercent => "table_percent",
            Self::DepthPercent => "depth_percent",
            Self::Ratio => "ratio",
            Self::Measurements => "measurements",
            Self::Lab => "lab",
            Self::Fluorescence => "fluorescence",
            Self::CertificateNumber => "certificate_number",
            Self::CertificateImage => "certificate_image",
            Self::CertificateImageJpg => "certificate_image_jpg",
            Self::CertComments => "cert_comments",
            Self::Origin => "origin",
            Self::PricePerCarat => "price_per_carat",
            Self::RapPrice => "rap_price",
            Self::RapPricePercent => "rap_price_percent",
            Self::TotalPrice => "total_price",
            Self::Location => "location",
            Self::Branch => "branch",
            Self::Image => "image",
            Self::AdditionalPictures => "additional_pictures",
            Self::Video => "video",
            Self::AdditionalVideos => "additional_videos",
            Self::FancyIntensity => "fancy_intensity",
            Self::FancyColor => "fancy_color",
            Self::FancyOvertone => "fancy_overtone",
            Self::FancyColor2 => "fancy_color_2",
            Self::FancyOvertone2 => "fancy_overtone_2",
            Self::Comment => "comment",
            Self::StoneType => "stone_type",
            Self::RawXml => "raw_xml",
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
        }
    }

    /// Storage kind of this column.
    #[must_use]
    pub const fn kind(self) -> ColumnKind {
        match self {
            Self::Weight
            | Self::TablePercent
            | Self::DepthPercent
            | Self::Ratio
            | Self::PricePerCarat
            | Self::RapPrice
            | Self::TotalPrice => ColumnKind::Numeric,
            Self::CreatedAt | Self::UpdatedAt => ColumnKind::Timestamp,
            _ => ColumnKind::Text,
        }
    }

    /// Comma-separated column list for SQL statements.
    #[must_use]
    pub fn sql_column_list() -> String {
        Self::ALL
            .iter()
            .map(|c| c.name())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl std::fmt::Display for StoneColumn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A single typed cell.
///
/// Numeric cells use [`Decimal`], which has no NaN or infinity, so a numeric
/// cell is always either a finite number or null.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ColumnValue {
    Text(Option<String>),
    Numeric(Option<Decimal>),
    Timestamp(Option<DateTime<Utc>>),
}

impl ColumnValue {
    /// The null value for a column kind.
    #[must_use]
    pub const fn null(kind: ColumnKind) -> Self {
        match kind {
            ColumnKind::Text => Self::Text(None),
            ColumnKind::Numeric => Self::Numeric(None),
            ColumnKind::Timestamp => Self::Timestamp(None),
        }
    }

    /// Storage kind of this value.
    #[must_use]
    pub const fn kind(&self) -> ColumnKind {
        match self {
            Self::Text(_) => ColumnKind::Text,
            Self::Numeric(_) => ColumnKind::Numeric,
            Self::Timestamp(_) => ColumnKind::Timestamp,
        }
    }

    /// Whether the value is SQL `NULL`.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        match self {
            Self::Text(v) => v.is_none(),
            Self::Numeric(v) => v.is_none(),
            Self::Timestamp(v) => v.is_none(),
        }
    }
}

/// A row whose values do not line up with the column schema.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("column {column} expects a {expected:?} value, got {actual:?}")]
    KindMismatch {
        column: StoneColumn,
        expected: ColumnKind,
        actual: ColumnKind,
    },
}

/// One stone, mapped to the persisted column schema.
///
/// The row always holds exactly [`STONE_COLUMN_COUNT`] values in
/// [`StoneColumn::ALL`] order, regardless of which upstream fields were present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedStone {
    values: [ColumnValue; STONE_COLUMN_COUNT],
}

impl NormalizedStone {
    /// Build a row, checking that every value matches its column's kind.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::KindMismatch` for the first slot whose value kind
    /// differs from the column kind.
    pub fn new(values: [ColumnValue; STONE_COLUMN_COUNT]) -> Result<Self, SchemaError> {
        for (column, value) in StoneColumn::ALL.iter().zip(values.iter()) {
            if column.kind() != value.kind() {
                return Err(SchemaError::KindMismatch {
                    column: *column,
                    expected: column.kind(),
                    actual: value.kind(),
                });
            }
        }
        Ok(Self { values })
    }

    /// A row with every column null.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            values: StoneColumn::ALL.map(|c| ColumnValue::null(c.kind())),
        }
    }

    /// All values in column order.
    #[must_use]
    pub const fn values(&self) -> &[ColumnValue; STONE_COLUMN_COUNT] {
        &self.values
    }

    /// Value of a column.
    #[must_use]
    #[allow(clippy::indexing_slicing)] // index() is always < STONE_COLUMN_COUNT
    pub const fn get(&self, column: StoneColumn) -> &ColumnValue {
        &self.values[column.index()]
    }

    /// Text value of a column, if it is a non-null text column.
    #[must_use]
    pub fn text(&self, column: StoneColumn) -> Option<&str> {
        match self.get(column) {
            ColumnValue::Text(v) => v.as_deref(),
            _ => None,
        }
    }

    /// Numeric value of a column, if it is a non-null numeric column.
    #[must_use]
    pub fn number(&self, column: StoneColumn) -> Option<Decimal> {
        match self.get(column) {
            ColumnValue::Numeric(v) => *v,
            _ => None,
        }
    }

    /// Timestamp value of a column, if it is a non-null timestamp column.
    #[must_use]
    pub fn timestamp(&self, column: StoneColumn) -> Option<DateTime<Utc>> {
        match self.get(column) {
            ColumnValue::Timestamp(v) => *v,
            _ => None,
        }
    }

    /// The business key.
    #[must_use]
    pub fn sku(&self) -> Option<&str> {
        self.text(StoneColumn::Sku)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_column_count_and_order() {
        assert_eq!(StoneColumn::ALL.len(), STONE_COLUMN_COUNT);
        for (i, column) in StoneColumn::ALL.iter().enumerate() {
            assert_eq!(column.index(), i, "{column} out of order");
        }
        assert_eq!(StoneColumn::ALL.first(), Some(&StoneColumn::Category));
        assert_eq!(StoneColumn::ALL.last(), Some(&StoneColumn::UpdatedAt));
    }

    #[test]
    fn test_column_names_unique() {
        let names: HashSet<_> = StoneColumn::ALL.iter().map(|c| c.name()).collect();
        assert_eq!(names.len(), STONE_COLUMN_COUNT);
    }

    #[test]
    fn test_numeric_columns() {
        let numeric: Vec<_> = StoneColumn::ALL
            .iter()
            .filter(|c| c.kind() == ColumnKind::Numeric)
            .map(|c| c.name())
            .collect();
        assert_eq!(
            numeric,
            vec![
                "weight",
                "table_percent",
                "depth_percent",
                "ratio",
                "price_per_carat",
                "rap_price",
                "total_price"
            ]
        );
    }

    #[test]
    fn test_sql_column_list() {
        let list = StoneColumn::sql_column_list();
        assert!(list.starts_with("category, sku, shape"));
        assert!(list.ends_with("raw_xml, created_at, updated_at"));
        assert_eq!(list.split(", ").count(), STONE_COLUMN_COUNT);
    }

    #[test]
    fn test_empty_row_is_all_null() {
        let row = NormalizedStone::empty();
        assert!(row.values().iter().all(ColumnValue::is_null));
        assert!(row.sku().is_none());
    }

    #[test]
    fn test_new_rejects_kind_mismatch() {
        let mut values = NormalizedStone::empty().values().clone();
        values[StoneColumn::Weight.index()] = ColumnValue::Text(Some("1.5".to_string()));

        let err = NormalizedStone::new(values).unwrap_err();
        assert_eq!(
            err,
            SchemaError::KindMismatch {
                column: StoneColumn::Weight,
                expected: ColumnKind::Numeric,
                actual: ColumnKind::Text,
            }
        );
    }

    #[test]
    fn test_accessors() {
        let mut values = NormalizedStone::empty().values().clone();
        values[StoneColumn::Sku.index()] = ColumnValue::Text(Some("BR-1001".to_string()));
        values[StoneColumn::Weight.index()] =
            ColumnValue::Numeric(Some(Decimal::new(152, 2)));
        let row = NormalizedStone::new(values).unwrap();

        assert_eq!(row.sku(), Some("BR-1001"));
        assert_eq!(row.number(StoneColumn::Weight), Some(Decimal::new(152, 2)));
        assert_eq!(row.text(StoneColumn::Weight), None);
        assert_eq!(row.timestamp(StoneColumn::CreatedAt), None);
    }
}
