//! Address formatting for reverse-geocoded places.

use serde::{Deserialize, Serialize};

/// A structured place description as returned by a reverse geocoder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Place {
    /// Point of interest or street-level name.
    pub name: Option<String>,
    /// City or locality.
    pub city: Option<String>,
    /// Region, state, or province.
    pub region: Option<String>,
    /// Postal code.
    pub postal_code: Option<String>,
}

impl Place {
    /// Render this place as a single display line.
    #[must_use]
    pub fn to_address(&self) -> String {
        format_address(
            self.name.as_deref(),
            self.city.as_deref(),
            self.region.as_deref(),
            self.postal_code.as_deref(),
        )
    }
}

/// Join place components as `"<name>, <city>, <region> <postal_code>"`.
///
/// Missing components become empty strings; the separators are always
/// emitted so the segment positions stay fixed.
#[must_use]
pub fn format_address(
    name: Option<&str>,
    city: Option<&str>,
    region: Option<&str>,
    postal_code: Option<&str>,
) -> String {
    format!(
        "{}, {}, {} {}",
        name.unwrap_or_default(),
        city.unwrap_or_default(),
        region.unwrap_or_default(),
        postal_code.unwrap_or_default(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_full_address() {
        let address = format_address(
            Some("Louvre Museum"),
            Some("Paris"),
            Some("IDF"),
            Some("75001"),
        );
        assert_eq!(address, "Louvre Museum, Paris, IDF 75001");
    }

    #[test]
    fn test_format_empty_name() {
        let address = format_address(Some(""), Some("Paris"), Some("IDF"), Some("75001"));
        assert_eq!(address, ", Paris, IDF 75001");
    }

    #[test]
    fn test_format_missing_components() {
        assert_eq!(
            format_address(None, Some("Paris"), Some("IDF"), Some("75001")),
            ", Paris, IDF 75001"
        );
        assert_eq!(
            format_address(Some("Pier 39"), Some("San Francisco"), Some("CA"), None),
            "Pier 39, San Francisco, CA "
        );
        assert_eq!(format_address(None, None, None, None), ", ,  ");
    }

    #[test]
    fn test_segment_order_is_fixed() {
        let address = format_address(Some("a"), Some("b"), Some("c"), Some("d"));
        let segments: Vec<&str> = address.split(", ").collect();
        assert_eq!(segments, vec!["a", "b", "c d"]);
    }

    #[test]
    fn test_place_to_address() {
        let place = Place {
            name: Some("Colosseum".to_string()),
            city: Some("Rome".to_string()),
            region: Some("Lazio".to_string()),
            postal_code: Some("00184".to_string()),
        };
        assert_eq!(place.to_address(), "Colosseum, Rome, Lazio 00184");
        assert_eq!(Place::default().to_address(), ", ,  ");
    }

    #[test]
    fn test_place_deserialize_partial() {
        let place: Place = serde_json::from_str(r#"{"city": "Kyoto"}"#).unwrap();
        assert_eq!(place.city.as_deref(), Some("Kyoto"));
        assert!(place.name.is_none());
        assert_eq!(place.to_address(), ", Kyoto,  ");
    }
}
