//! # Printer Models
//!
//! Printer families the settings screen offers, identified by a substring of
//! the Bluetooth device name.
//!
//! | Model  | Name pattern | Example device name |
//! |--------|--------------|---------------------|
//! | Woosim | `woosim`     | Woosim WSP-i450     |
//! | Star   | `star`       | Star SM-T300i       |
//!
//! ```
//! use factura_print::printer::PrinterModel;
//!
//! assert!(PrinterModel::WOOSIM.matches("Woosim WSP-i450 (New)"));
//! assert!(!PrinterModel::WOOSIM.matches("Star SM-T300i"));
//! ```

/// A printer family and the name fragment that identifies it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrinterModel {
    /// Display name
    pub name: &'static str,

    /// Lowercase substring matched against device names
    pub pattern: &'static str,
}

impl PrinterModel {
    /// Woosim WSP series (the default printer of the app)
    pub const WOOSIM: Self = Self {
        name: "Woosim",
        pattern: "woosim",
    };

    /// Star Micronics SM series
    pub const STAR: Self = Self {
        name: "Star",
        pattern: "star",
    };

    pub const ALL: [Self; 2] = [Self::WOOSIM, Self::STAR];

    /// Case-insensitive substring match on a device name.
    pub fn matches(&self, device_name: &str) -> bool {
        name_contains(device_name, self.pattern)
    }

    /// Look up a model by display name (case-insensitive).
    pub fn by_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|m| m.name.eq_ignore_ascii_case(name))
    }
}

/// Case-insensitive `contains` used by every name matcher.
pub fn name_contains(device_name: &str, fragment: &str) -> bool {
    device_name
        .to_lowercase()
        .contains(&fragment.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_woosim_matches_any_case() {
        assert!(PrinterModel::WOOSIM.matches("WOOSIM WSP-R240"));
        assert!(PrinterModel::WOOSIM.matches("my woosim"));
    }

    #[test]
    fn test_star_does_not_match_woosim() {
        assert!(!PrinterModel::STAR.matches("Woosim WSP-i450"));
        assert!(PrinterModel::STAR.matches("Star SM-T300i"));
    }

    #[test]
    fn test_by_name() {
        assert_eq!(PrinterModel::by_name("star"), Some(PrinterModel::STAR));
        assert_eq!(PrinterModel::by_name("Woosim"), Some(PrinterModel::WOOSIM));
        assert_eq!(PrinterModel::by_name("zebra"), None);
    }
}
