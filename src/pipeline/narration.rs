//! Narration post-processing: markup stripping and advisory detection.
//!
//! [`sanitize_narration`] runs once on the analysis response; the result is
//! both displayed and spoken. [`detect_advisories`] scans that same text for
//! keywords that warrant a follow-up question to the user.

// ---------------------------------------------------------------------------
// Sanitizing
// ---------------------------------------------------------------------------

/// Heading markers are replaced with this so section breaks stay visible.
pub const HEADING_MARK: &str = "🔧🚗";

/// Shown (and spoken) when the model returned no text at all.
pub const NO_DESCRIPTION: &str = "No description received.";

/// Strip `**` emphasis and replace every `#` with [`HEADING_MARK`].
///
/// ```
/// use car_doctor::pipeline::sanitize_narration;
///
/// assert_eq!(
///     sanitize_narration("Check engine oil level. # Findings"),
///     "Check engine oil level. 🔧🚗 Findings",
/// );
/// ```
pub fn sanitize_narration(raw: &str) -> String {
    raw.replace("**", "").replace('#', HEADING_MARK)
}

// ---------------------------------------------------------------------------
// Advisories
// ---------------------------------------------------------------------------

/// Follow-up prompts suggested by the diagnosis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Advisory {
    /// A lubricant or fluid change is involved.
    MileageSinceService,
    /// The problem is intermittent or of unknown cause.
    DocumentSymptom,
}

impl Advisory {
    pub fn message(&self) -> &'static str {
        match self {
            Advisory::MileageSinceService => {
                "How many miles since your last oil or fluid change?"
            }
            Advisory::DocumentSymptom => {
                "Document the symptom: note when it happens (speed, temperature, weather) \
                 and record a video if you can."
            }
        }
    }
}

struct AdvisoryRule {
    advisory: Advisory,
    keywords: &'static [&'static str],
}

static RULES: &[AdvisoryRule] = &[
    AdvisoryRule {
        advisory: Advisory::MileageSinceService,
        keywords: &["oil", "lubricant", "lubrication", "fluid", "fluids"],
    },
    AdvisoryRule {
        advisory: Advisory::DocumentSymptom,
        keywords: &[
            "intermittent",
            "intermittently",
            "sporadic",
            "sporadically",
            "unknown",
        ],
    },
];

/// Advisories whose keywords appear in `text`, in rule order.
///
/// Matching is case-insensitive on whole words, so "boil" does not count as
/// "oil".
pub fn detect_advisories(text: &str) -> Vec<Advisory> {
    let lowered = text.to_lowercase();
    let words: Vec<&str> = lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    RULES
        .iter()
        .filter(|rule| rule.keywords.iter().any(|kw| words.contains(kw)))
        .map(|rule| rule.advisory)
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_emphasis_and_headings() {
        let raw = "## Summary\n**Warning:** coolant light is on.";
        assert_eq!(
            sanitize_narration(raw),
            "🔧🚗🔧🚗 Summary\nWarning: coolant light is on."
        );
    }

    #[test]
    fn plain_text_is_untouched() {
        let raw = "Tire tread looks even; pressure seems fine.";
        assert_eq!(sanitize_narration(raw), raw);
    }

    #[test]
    fn oil_triggers_mileage_prompt() {
        assert_eq!(
            detect_advisories("Check engine oil level."),
            vec![Advisory::MileageSinceService]
        );
        assert_eq!(
            detect_advisories("Transmission FLUID looks dark"),
            vec![Advisory::MileageSinceService]
        );
    }

    #[test]
    fn intermittent_triggers_document_prompt() {
        assert_eq!(
            detect_advisories("The cause is unknown; the light may be intermittent."),
            vec![Advisory::DocumentSymptom]
        );
    }

    #[test]
    fn both_rules_can_fire() {
        let found = detect_advisories("Intermittent oil pressure warning.");
        assert_eq!(
            found,
            vec![Advisory::MileageSinceService, Advisory::DocumentSymptom]
        );
    }

    #[test]
    fn partial_words_do_not_match() {
        assert!(detect_advisories("Coolant may boil over; check the foil heat shield.").is_empty());
    }

    #[test]
    fn unrelated_text_has_no_advisories() {
        assert!(detect_advisories("Brake pads are worn to 3 mm.").is_empty());
    }

    #[test]
    fn messages_are_non_empty() {
        assert!(Advisory::MileageSinceService.message().contains("miles"));
        assert!(Advisory::DocumentSymptom.message().starts_with("Document"));
    }
}
