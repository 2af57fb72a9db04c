//! Prompts sent to the extraction model.
//!
//! The business rules for naming (brand preference, legal-suffix stripping,
//! fuel and hotel markers) live entirely in the instruction text. Nothing on
//! our side re-checks them; we only validate the reply's shape in
//! [`crate::pipeline::extract`].

/// Fixed system role for every extraction request.
pub const SYSTEM_ROLE: &str = "You are an accounting assistant that reads invoices \
and extracts exactly the fields requested. You answer with a single JSON object and nothing else.";

/// Marker appended to the issuer for unleaded petrol purchases.
pub const UNLEADED_MARKER: &str = "pb";

/// Marker appended to the issuer for diesel purchases.
pub const DIESEL_MARKER: &str = "on";

/// Marker appended to the issuer for accommodation invoices.
pub const HOTEL_MARKER: &str = "hotel";

/// Base instruction. `{unleaded}`, `{diesel}` and `{hotel}` are substituted
/// by [`build_instruction`].
const INSTRUCTION_TEMPLATE: &str = r#"The attached PDF is an invoice (most often Polish: "faktura", "faktura VAT", "rachunek").

Extract two fields:

1. issueDate
   - The invoice issue date ("data wystawienia"), NOT the sale or due date
   - Format: YYMMDD, exactly 6 digits (15 June 2025 → 250615)

2. issuerName
   - The seller / issuer of the invoice, never the buyer
   - For fuel stations prefer the station brand over the operating company:
     "PKN Orlen S.A." → "Orlen", "Shell Polska Sp. z o.o." → "Shell",
     "BP Europa SE" → "BP", "Circle K Polska Sp. z o.o." → "Circle K"
   - Drop legal-entity suffixes (Sp. z o.o., S.A., Sp.k., Sp.j., GmbH, Ltd, SE,
     s.r.o., …) unless they are the only identifying text
   - If the invoice is for fuel, append the grade marker after the name:
     unleaded petrol (Pb95, Pb98, benzyna bezołowiowa) → " {unleaded}",
     diesel (ON, olej napędowy) → " {diesel}"
   - If the invoice is for accommodation (hotel, motel, hostel, guest house,
     "nocleg", "usługa hotelowa", in any language) append " {hotel}"
   - Never leave it empty; if no name is readable use the most identifying
     text on the document

Answer with JSON only, no markdown fences, no commentary:
{"issueDate": "YYMMDD", "issuerName": "..."}"#;

/// Build the user instruction, appending caller-supplied few-shot examples.
///
/// `examples` is passed through verbatim: one `source => target` pair per
/// line. Blank or whitespace-only hints are ignored.
///
/// ```rust
/// use edgequake_invoice_rename::prompts::build_instruction;
///
/// let text = build_instruction(Some("ORLEN S.A. Stacja 4411 => Orlen pb"));
/// assert!(text.ends_with("ORLEN S.A. Stacja 4411 => Orlen pb"));
/// ```
pub fn build_instruction(examples: Option<&str>) -> String {
    let mut text = INSTRUCTION_TEMPLATE
        .replace("{unleaded}", UNLEADED_MARKER)
        .replace("{diesel}", DIESEL_MARKER)
        .replace("{hotel}", HOTEL_MARKER);

    if let Some(examples) = examples.filter(|e| !e.trim().is_empty()) {
        text.push_str("\n\nExamples of how issuer names should be written (source => target):\n");
        text.push_str(examples);
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instruction_has_markers_substituted() {
        let text = build_instruction(None);
        assert!(!text.contains("{unleaded}"));
        assert!(!text.contains("{diesel}"));
        assert!(!text.contains("{hotel}"));
        assert!(text.contains("\" pb\""));
        assert!(text.contains("\" on\""));
        assert!(text.contains("\" hotel\""));
    }

    #[test]
    fn instruction_asks_for_both_fields() {
        let text = build_instruction(None);
        assert!(text.contains("issueDate"));
        assert!(text.contains("issuerName"));
        assert!(text.contains("YYMMDD"));
    }

    #[test]
    fn examples_appended_verbatim() {
        let examples = "Stacja Paliw MOYA => Moya on\nHotel Bukovina Sp. z o.o. => Bukovina hotel";
        let text = build_instruction(Some(examples));
        assert!(text.ends_with(examples));
    }

    #[test]
    fn blank_examples_ignored() {
        assert_eq!(build_instruction(Some("  \n ")), build_instruction(None));
    }
}
