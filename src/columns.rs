//! Column resolution by fuzzy header matching.
//!
//! Real-world roster exports never agree on header text ("Docto Ident",
//! "Documento", "DNI", "documento_identidad"). Instead of an exact synonym
//! dictionary, a column matches a candidate when either normalized string
//! contains the other, or the two are equal once internal whitespace is
//! removed. Resolution walks table columns left to right and returns the
//! first column any candidate accepts, so column position outranks candidate
//! order.

/// Header synonyms for the identity (document number) column.
///
/// `id` sits last: it is a substring of many unrelated headers, so the more
/// specific synonyms get first chance within each column.
pub const IDENTITY_CANDIDATES: &[&str] = &[
    "docto ident",
    "documento identidad",
    "docto_ident",
    "documento",
    "document id",
    "identity document",
    "id number",
    "cedula",
    "dni",
    "identificacion",
    "identification",
    "id",
];

/// Header synonyms for the entry-date column.
pub const DATE_CANDIDATES: &[&str] = &[
    "f ingreso",
    "fecha ingreso",
    "f_ingreso",
    "fecha_ingreso",
    "entry date",
    "ingress date",
    "fecha",
    "date",
    "ingreso",
];

/// Matching form of a raw header label: surrounding whitespace trimmed,
/// lowercased. Used only for matching, never for output.
pub fn normalize_label(label: &str) -> String {
    label.trim().to_lowercase()
}

fn strip_spaces(value: &str) -> String {
    value.chars().filter(|c| !c.is_whitespace()).collect()
}

fn candidate_matches(normalized_label: &str, candidate: &str) -> bool {
    if normalized_label.is_empty() {
        return false;
    }
    normalized_label.contains(candidate)
        || candidate.contains(normalized_label)
        || strip_spaces(normalized_label) == strip_spaces(candidate)
}

/// Position of the first header matching any candidate, or `None`.
///
/// Pure function of its inputs; absence is an expected outcome, not an error.
pub fn resolve(headers: &[String], candidates: &[&str]) -> Option<usize> {
    headers.iter().position(|header| {
        let normalized = normalize_label(header);
        candidates
            .iter()
            .any(|candidate| candidate_matches(&normalized, candidate))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn normalize_label_trims_and_lowercases() {
        assert_eq!(normalize_label("  Docto Ident "), "docto ident");
        assert_eq!(normalize_label("FECHA"), "fecha");
    }

    #[test]
    fn resolves_exact_and_substring_headers() {
        let cols = headers(&["EMPLEADO", "Docto Ident", "CARGO"]);
        assert_eq!(resolve(&cols, IDENTITY_CANDIDATES), Some(1));

        let cols = headers(&["EMPLEADO", "documento", "CARGO"]);
        assert_eq!(resolve(&cols, IDENTITY_CANDIDATES), Some(1));

        // Label contained inside a candidate.
        let cols = headers(&["EMPLEADO", "DNI"]);
        assert_eq!(resolve(&cols, IDENTITY_CANDIDATES), Some(1));
    }

    #[test]
    fn resolves_whitespace_insensitive_equality() {
        let cols = headers(&["fecha  ingreso"]);
        assert_eq!(resolve(&cols, DATE_CANDIDATES), Some(0));
    }

    #[test]
    fn column_position_outranks_candidate_order() {
        // "cedula" appears later in the candidate list than "documento", but
        // the CEDULA column comes first in the table, so it wins.
        let cols = headers(&["CEDULA", "DOCUMENTO"]);
        assert_eq!(resolve(&cols, IDENTITY_CANDIDATES), Some(0));
    }

    #[test]
    fn no_match_returns_none() {
        let cols = headers(&["NOMBRE", "CARGO", "SALARIO"]);
        assert_eq!(resolve(&cols, IDENTITY_CANDIDATES), None);
        assert_eq!(resolve(&cols, DATE_CANDIDATES), None);
    }

    #[test]
    fn empty_labels_never_match() {
        let cols = headers(&["", "   ", "documento"]);
        assert_eq!(resolve(&cols, IDENTITY_CANDIDATES), Some(2));
    }

    #[test]
    fn short_candidate_substring_matching_is_loose() {
        // Documented trade-off: "id" matches any header containing it.
        let cols = headers(&["Validez"]);
        assert_eq!(resolve(&cols, IDENTITY_CANDIDATES), Some(0));
    }
}
