//! Stock document normalization.
//!
//! Turns `<Stock><Stone>..</Stone>..</Stock>` into an ordered `Vec<RawStone>`,
//! regardless of whether the document holds one stone or many.

use indexmap::IndexMap;
use thiserror::Error;

use super::{XmlError, XmlValue, parse_document};

/// Collection element directly under the document root.
pub const STOCK_ELEMENT: &str = "Stock";

/// Repeated item element inside [`STOCK_ELEMENT`].
pub const STONE_ELEMENT: &str = "Stone";

/// Errors that can occur while extracting stones from a stock document.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The document is not well-formed XML.
    #[error("Failed to parse stock XML: {0}")]
    Parse(#[from] XmlError),

    /// The document has no `Stock/Stone` items.
    #[error("No stones found in stock export")]
    EmptyResult,
}

/// One upstream stone record: leaf field values keyed by normalized name.
///
/// Upstream field names are inconsistent in case and punctuation, so keys
/// are reduced with [`normalize_key`] both when stored and when looked up.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawStone {
    fields: IndexMap<String, String>,
}

impl RawStone {
    /// Build a record from `(name, value)` pairs. Later duplicates of a
    /// normalized name are ignored.
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut fields = IndexMap::new();
        for (key, value) in pairs {
            fields
                .entry(normalize_key(key.as_ref()))
                .or_insert_with(|| value.into());
        }
        Self { fields }
    }

    /// Raw value for a field name, in any of its upstream spellings.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(&normalize_key(name)).map(String::as_str)
    }

    /// First present value among several candidate field names.
    #[must_use]
    pub fn first_of(&self, names: &[&str]) -> Option<&str> {
        names.iter().find_map(|name| self.get(name))
    }

    /// Number of fields present.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the record has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn from_value(value: &XmlValue) -> Self {
        let XmlValue::Node(node) = value else {
            return Self::default();
        };
        Self::from_pairs(
            node.children
                .iter()
                .filter_map(|(name, child)| leaf_text(child).map(|text| (name, text))),
        )
    }
}

/// Text of a field element. A repeated field contributes its first value.
fn leaf_text(value: &XmlValue) -> Option<String> {
    match value {
        XmlValue::List(items) => items.iter().find_map(leaf_text),
        other => other.as_text().map(str::to_string),
    }
}

/// Reduce a field name to lowercase ASCII alphanumerics, spelling `%` as
/// `percent`.
///
/// `"Rap. Price"`, `"Rap.Price"` and `"rap_price"` all become `"rapprice"`;
/// `"Rap Price %"` becomes `"rappricepercent"`. Escaped element names such as
/// `Rap._x0020_Price` are decoded first.
#[must_use]
pub fn normalize_key(name: &str) -> String {
    let mut key = String::with_capacity(name.len());
    for c in decode_element_name(name).chars() {
        if c.is_ascii_alphanumeric() {
            key.push(c.to_ascii_lowercase());
        } else if c == '%' {
            key.push_str("percent");
        }
    }
    key
}

/// Decode `_xHHHH_` escapes that dataset exporters use for characters that
/// are not allowed in element names.
fn decode_element_name(name: &str) -> String {
    let mut decoded = String::with_capacity(name.len());
    let mut rest = name;
    while let Some(start) = rest.find("_x") {
        let (head, tail) = rest.split_at(start);
        decoded.push_str(head);
        let escaped = tail
            .get(2..6)
            .filter(|_| tail.get(6..7) == Some("_"))
            .and_then(|hex| u32::from_str_radix(hex, 16).ok())
            .and_then(char::from_u32);
        match (escaped, tail.get(7..)) {
            (Some(c), Some(after)) => {
                decoded.push(c);
                rest = after;
            }
            _ => {
                decoded.push_str("_x");
                rest = tail.get(2..).unwrap_or_default();
            }
        }
    }
    decoded.push_str(rest);
    decoded
}

/// Parse a stock document and return its stones in document order.
///
/// # Errors
///
/// Returns `ExtractError::Parse` for malformed XML and
/// `ExtractError::EmptyResult` when `Stock/Stone` is missing or empty.
pub fn extract_stones(xml: &str) -> Result<Vec<RawStone>, ExtractError> {
    let document = parse_document(xml)?;
    let stones = document
        .path(&[STOCK_ELEMENT, STONE_ELEMENT])
        .ok_or(ExtractError::EmptyResult)?;

    let raw: Vec<RawStone> = stones
        .as_sequence()
        .into_iter()
        .map(RawStone::from_value)
        .collect();

    if raw.is_empty() {
        return Err(ExtractError::EmptyResult);
    }
    Ok(raw)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_key() {
        assert_eq!(normalize_key("PricePerCarat"), "pricepercarat");
        assert_eq!(normalize_key("Rap. Price"), "rapprice");
        assert_eq!(normalize_key("Rap.Price"), "rapprice");
        assert_eq!(normalize_key("Rap Price %"), "rappricepercent");
        assert_eq!(normalize_key("Measurements-delimiter"), "measurementsdelimiter");
        assert_eq!(normalize_key("fancy_color_2"), "fancycolor2");
    }

    #[test]
    fn test_escaped_element_names() {
        assert_eq!(normalize_key("Rap._x0020_Price"), "rapprice");
        assert_eq!(normalize_key("Rap_x0020_Price_x0020__x0025_"), "rappricepercent");
        assert_eq!(normalize_key("Cert._x0020_Comments"), "certcomments");
        assert_eq!(normalize_key("box_xyz_"), "boxxyz");
    }

    #[test]
    fn test_single_stone_is_a_sequence() {
        let stones =
            extract_stones("<Stock><Stone><SKU>A1</SKU><Weight>1.01</Weight></Stone></Stock>")
                .unwrap();
        assert_eq!(stones.len(), 1);
        assert_eq!(stones[0].get("SKU"), Some("A1"));
        assert_eq!(stones[0].get("weight"), Some("1.01"));
    }

    #[test]
    fn test_many_stones_keep_order() {
        let xml = format!(
            "<Stock>{}</Stock>",
            (1..=5)
                .map(|i| format!("<Stone><SKU>S{i}</SKU></Stone>"))
                .collect::<String>()
        );
        let stones = extract_stones(&xml).unwrap();
        let skus: Vec<_> = stones.iter().map(|s| s.get("SKU").unwrap()).collect();
        assert_eq!(skus, ["S1", "S2", "S3", "S4", "S5"]);
    }

    #[test]
    fn test_punctuated_field_names() {
        let stones = extract_stones(
            "<Stock><Stone><Rap._x0020_Price>10</Rap._x0020_Price><RapPricePercent>-35</RapPricePercent></Stone></Stock>",
        )
        .unwrap();
        assert_eq!(stones[0].get("Rap. Price"), Some("10"));
        assert_eq!(stones[0].get("Rap Price %"), Some("-35"));
        assert_eq!(stones[0].first_of(&["Missing", "RapPricePercent"]), Some("-35"));
    }

    #[test]
    fn test_empty_stone_element() {
        let stones = extract_stones("<Stock><Stone/><Stone><SKU>B</SKU></Stone></Stock>").unwrap();
        assert_eq!(stones.len(), 2);
        assert!(stones[0].is_empty());
        assert_eq!(stones[1].len(), 1);
    }

    #[test]
    fn test_missing_stock_is_empty_result() {
        let err = extract_stones("<Inventory><Stone><SKU>A1</SKU></Stone></Inventory>").unwrap_err();
        assert!(matches!(err, ExtractError::EmptyResult));
    }

    #[test]
    fn test_no_stones_is_empty_result() {
        assert!(matches!(
            extract_stones("<Stock></Stock>").unwrap_err(),
            ExtractError::EmptyResult
        ));
        assert!(matches!(
            extract_stones("<Stock><Note>none</Note></Stock>").unwrap_err(),
            ExtractError::EmptyResult
        ));
    }

    #[test]
    fn test_malformed_is_parse_error() {
        let err = extract_stones("<Stock><Stone><SKU>A1</Stone></Stock>").unwrap_err();
        assert!(matches!(err, ExtractError::Parse(_)));
    }

    #[test]
    fn test_from_pairs_keeps_first_duplicate() {
        let stone = RawStone::from_pairs([("Rap.Price", "1"), ("Rap. Price", "2")]);
        assert_eq!(stone.get("rap price"), Some("1"));
        assert_eq!(stone.len(), 1);
    }

    #[test]
    fn test_field_values_are_verbatim() {
        let stones = extract_stones(
            "<Stock>\n  <Stone>\n    <Comment>  two  spaces  </Comment>\n    <Color></Color>\n  </Stone>\n</Stock>",
        )
        .unwrap();
        assert_eq!(stones.len(), 1);
        assert_eq!(stones[0].get("Comment"), Some("  two  spaces  "));
        assert_eq!(stones[0].get("Color"), Some(""));

        let padded = RawStone::from_pairs([("Comment", "  padded ")]);
        assert_eq!(padded.get("comment"), Some("  padded "));
    }
}
