//! Handling of DICOM values with the PN (Person Name) value representation.

use std::fmt;

/// One of a person name's three component groups: five `^`-separated
/// fields (family, given, middle, prefix, suffix).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonNameComponents {
    /// Family name complex, including optional prefix/suffix qualifiers.
    pub family: Option<String>,
    /// Given name complex.
    pub given: Option<String>,
    /// Middle name.
    pub middle: Option<String>,
    /// Name prefix (e.g. "Dr.").
    pub prefix: Option<String>,
    /// Name suffix (e.g. "Jr.").
    pub suffix: Option<String>,
}

impl PersonNameComponents {
    fn parse(group: &str) -> Self {
        let mut parts = group.split('^');

        macro_rules! field {
            () => {
                parts.next().and_then(|s| if s.is_empty() { None } else { Some(s.to_string()) })
            };
        }

        PersonNameComponents {
            family: field!(),
            given: field!(),
            middle: field!(),
            prefix: field!(),
            suffix: field!(),
        }
    }

    /// Encode this component group back into its `^`-separated text form,
    /// dropping trailing empty fields.
    fn to_dicom_string(&self) -> String {
        let fields: [&Option<String>; 5] =
            [&self.family, &self.given, &self.middle, &self.prefix, &self.suffix];

        let last_present =
            fields.iter().rposition(|f| f.is_some()).map(|i| i + 1).unwrap_or(0);

        fields[..last_present]
            .iter()
            .map(|f| f.as_deref().unwrap_or(""))
            .collect::<Vec<_>>()
            .join("^")
    }

    fn is_empty(&self) -> bool {
        self.family.is_none()
            && self.given.is_none()
            && self.middle.is_none()
            && self.prefix.is_none()
            && self.suffix.is_none()
    }
}

impl fmt::Display for PersonNameComponents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<&str> = [&self.prefix, &self.given, &self.middle, &self.family, &self.suffix]
            .into_iter()
            .filter_map(|f| f.as_deref())
            .collect();
        write!(f, "{}", parts.join(" "))
    }
}

/// A DICOM Person Name (PN), made of up to three component groups
/// (alphabetic, ideographic, phonetic) separated by `=`.
///
/// Only the alphabetic group is required; the others are present when the
/// original text carried more than one representation of the same name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonName {
    /// The alphabetic representation, always present (possibly empty).
    pub alphabetic: PersonNameComponents,
    /// The ideographic representation, if the source text had one.
    pub ideographic: Option<PersonNameComponents>,
    /// The phonetic representation, if the source text had one.
    pub phonetic: Option<PersonNameComponents>,
}

impl PersonName {
    /// Parse a DICOM-encoded PN string (`alphabetic=ideographic=phonetic`).
    pub fn parse(raw: &str) -> Self {
        let mut groups = raw.split('=');
        let alphabetic = groups.next().map(PersonNameComponents::parse).unwrap_or_default();
        let ideographic =
            groups.next().map(PersonNameComponents::parse).filter(|c| !c.is_empty());
        let phonetic = groups.next().map(PersonNameComponents::parse).filter(|c| !c.is_empty());

        PersonName { alphabetic, ideographic, phonetic }
    }

    /// The family name component, from the alphabetic group.
    pub fn family(&self) -> Option<&str> {
        self.alphabetic.family.as_deref()
    }

    /// The given name component, from the alphabetic group.
    pub fn given(&self) -> Option<&str> {
        self.alphabetic.given.as_deref()
    }

    /// The middle name component, from the alphabetic group.
    pub fn middle(&self) -> Option<&str> {
        self.alphabetic.middle.as_deref()
    }

    /// The name prefix, from the alphabetic group.
    pub fn prefix(&self) -> Option<&str> {
        self.alphabetic.prefix.as_deref()
    }

    /// The name suffix, from the alphabetic group.
    pub fn suffix(&self) -> Option<&str> {
        self.alphabetic.suffix.as_deref()
    }

    /// Encode back into DICOM PN text, including only the groups present.
    pub fn to_dicom_string(&self) -> String {
        let mut groups = vec![self.alphabetic.to_dicom_string()];
        if let Some(ideographic) = &self.ideographic {
            groups.push(ideographic.to_dicom_string());
        }
        if let Some(phonetic) = &self.phonetic {
            if self.ideographic.is_none() {
                groups.push(String::new());
            }
            groups.push(phonetic.to_dicom_string());
        }
        while groups.last().is_some_and(|g| g.is_empty()) && groups.len() > 1 {
            groups.pop();
        }
        groups.join("=")
    }
}

impl fmt::Display for PersonName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.alphabetic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_alphabetic_only() {
        let p = PersonName::parse("DOE^JANE");
        assert_eq!(p.family(), Some("DOE"));
        assert_eq!(p.given(), Some("JANE"));
        assert_eq!(p.middle(), None);
        assert!(p.ideographic.is_none());
    }

    #[test]
    fn parses_prefix_and_suffix() {
        let p = PersonName::parse("Adams^John^Robert^Rev.^B.A. M.Div.");
        assert_eq!(p.family(), Some("Adams"));
        assert_eq!(p.given(), Some("John"));
        assert_eq!(p.middle(), Some("Robert"));
        assert_eq!(p.prefix(), Some("Rev."));
        assert_eq!(p.suffix(), Some("B.A. M.Div."));
    }

    #[test]
    fn round_trips_to_dicom_string() {
        let raw = "Adams^John^Robert^Rev.";
        assert_eq!(PersonName::parse(raw).to_dicom_string(), raw);
    }

    #[test]
    fn three_groups_round_trip() {
        let raw = "Yamada^Tarou=山田^太郎=やまだ^たろう";
        let p = PersonName::parse(raw);
        assert_eq!(p.family(), Some("Yamada"));
        assert!(p.ideographic.is_some());
        assert!(p.phonetic.is_some());
        assert_eq!(p.to_dicom_string(), raw);
    }
}
