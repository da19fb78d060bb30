//! Deterministic clean-up of common mistakes in generated DEF text.
//!
//! Rules run in a fixed order. Each rule is re-applied until it no longer
//! matches (capped at [`MAX_PASSES`]) before the next one starts.

use std::sync::LazyLock;

use regex::Regex;

/// Section keywords that open a `... END <KEYWORD>` block.
const SECTIONS: [&str; 12] = [
    "COMPONENTS",
    "FILLS",
    "GROUPS",
    "NETS",
    "NONDEFAULTRULES",
    "PINS",
    "PINPROPERTIES",
    "PROPERTYDEFINITIONS",
    "REGIONS",
    "SCANCHAINS",
    "SPECIALNETS",
    "VIAS",
];

/// Upper bound on re-applications of a single rule.
pub const MAX_PASSES: usize = 512;

struct Rule {
    name: &'static str,
    pattern: Regex,
    replacement: &'static str,
}

impl Rule {
    fn new(name: &'static str, pattern: &str, replacement: &'static str) -> Self {
        Self {
            name,
            pattern: Regex::new(pattern).expect("valid repair rule"),
            replacement,
        }
    }

    fn apply(&self, text: String) -> String {
        let mut text = text;
        for _ in 0..MAX_PASSES {
            if !self.pattern.is_match(&text) {
                return text;
            }
            let next = self.pattern.replace_all(&text, self.replacement).into_owned();
            if next == text {
                return text;
            }
            text = next;
        }
        tracing::warn!(rule = self.name, "Repair rule did not settle");
        text
    }
}

static RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    let sections = SECTIONS.join("|");
    vec![
        Rule::new("comments", r"(?m)#.*?$", ""),
        Rule::new(
            "units",
            r"(?m)^\s*UNITS\s*?(?:DATABASE)?\s*?(?:MICRONS)?\s*?(\d+)\s*?;?",
            "UNITS DISTANCE MICRONS ${1} ;",
        ),
        Rule::new("end-units", r"END UNITS", ""),
        Rule::new(
            "section-count-semicolon",
            &format!(r"(?m)^\s*({sections})[ \t]*(\d+)[ \t]*$"),
            "${1} ${2} ;",
        ),
        Rule::new(
            "via-layer-rect",
            r"(?ms)^\s*(VIAS.*)LAYER (\w+) RECT(.*END VIAS)",
            "${1}RECT ${2}${3}",
        ),
        Rule::new(
            "antenna",
            r"(?m)^\s*\+\s*?ANTENNA\w+\s+[\d.]+\s+\w+\s+\w+",
            "",
        ),
        Rule::new(
            "pin-port-plus",
            r"(?ms)^\s*(PINS.*^\s*)(LAYER|PORT)(.*END PINS)",
            "${1}+ ${2}${3}",
        ),
        Rule::new("mustjoin", r"(?m)^.*MUSTJOIN.*$", ""),
        Rule::new(
            "pin-layer-rect",
            r"(?ms)^\s*(PINS.*)LAYER\s+(\w+)\s+RECT(.*END PINS)",
            "${1}LAYER ${2}${3}",
        ),
        Rule::new(
            "specialnet-width",
            r"(?ms)^\s*(SPECIALNETS.*)WIDTH(.*END SPECIALNETS)",
            "${1}${2}",
        ),
        Rule::new(
            "net-width",
            r"(?ms)^\s*(NETS.*)WIDTH(?:\s+\d+)?(.*END NETS)",
            "${1}${2}",
        ),
        Rule::new(
            "component-placement-point",
            r"(?ms)^\s*(COMPONENTS.*)(PLACED|FIXED|COVER)\s+(\d+)\s+(\d+)(\s+\w+.*END COMPONENTS)",
            "${1}${2} ( ${3} ${4} )${5}",
        ),
        Rule::new(
            "pin-placement-point",
            r"(?ms)^\s*(PINS.*)(PLACED|FIXED|COVER)\s+(\d+)\s+(\d+)(\s+\w+.*END PINS)",
            "${1}${2} ( ${3} ${4} )${5}",
        ),
        Rule::new(
            "row-origin-parens",
            r"(?m)^\s*ROW\s+(\w+)\s+(\w+)\s+\((\d+)\s+(\d+)\s*\)?",
            "ROW ${1} ${2} ${3} ${4}",
        ),
        Rule::new(
            "row-step-y",
            r"(?m)^\s*(ROW\s+\w+\s+\w+\s+\d+\s+\d+\s+\w+\s+DO\s+\d+\s+BY\s+\d+\s+STEP\s+\d+\s+);",
            "${1} 0 ;",
        ),
        Rule::new(
            "net-route-width",
            r"(?ms)^\s*(NETS.*)(COVER|FIXED|ROUTED|NOSHIELD|NEW)\s+(\w+)\s+\d+(.*END NETS)",
            "${1}${2} ${3} ${4}",
        ),
        Rule::new(
            "property-name-quotes",
            r#"(?ms)^\s*(PROPERTYDEFINITIONS.*)^(\s*\w+)\s+"(\w+)"?(.*END PROPERTYDEFINITIONS)"#,
            "${1}${2} ${3}${4}",
        ),
        Rule::new("orient-r0", r"\bR0\b", "N"),
        Rule::new("orient-r180", r"\bR180\b", "S"),
        Rule::new("orient-r90", r"\bR90\b", "W"),
        Rule::new("orient-r270", r"\bR270\b", "E"),
        Rule::new("orient-my", r"\bMY\b", "FN"),
        Rule::new("orient-mx", r"\bMX\b", "FS"),
        Rule::new("orient-mx90", r"\bMX90\b", "FW"),
        Rule::new("orient-my90", r"\bMY90\b", "FE"),
        Rule::new(
            "net-pin-plus",
            r"(?ms)^(\s*NETS.*)\+\s*PIN\s+\w+(.*END NETS)",
            "${1} ${2}",
        ),
        Rule::new(
            "via-semicolon",
            r"(?ms)(^\s*VIAS.*^\s*-[\w\s()]*)$(\s*(?:-.*)?END VIAS)",
            "${1} ; ${2}",
        ),
        Rule::new("space-before-paren", r"\b([()])", " ${1}"),
        Rule::new("space-after-paren", r"([()])\b", "${1} "),
    ]
});

/// Apply every repair rule to `text`, then close sections that were left
/// open.
pub fn repair_def(text: &str) -> String {
    let repaired = RULES
        .iter()
        .fold(text.to_string(), |acc, rule| rule.apply(acc));
    close_unclosed_sections(&repaired)
}

/// Keyword of the section a line opens, if any.
fn section_header(line: &str) -> Option<&'static str> {
    let trimmed = line.trim_start();
    SECTIONS.iter().copied().find(|keyword| {
        trimmed.strip_prefix(keyword).is_some_and(|rest| {
            rest.chars()
                .next()
                .is_none_or(|c| !c.is_alphanumeric() && c != '_')
        })
    })
}

fn closes(line: &str, keyword: &str) -> bool {
    line.trim_start()
        .strip_prefix("END")
        .map(str::trim_start)
        .and_then(|rest| rest.strip_prefix(keyword))
        .is_some_and(|rest| rest.trim().is_empty())
}

/// Insert `END <SECTION>` in front of the next section header (or
/// `END DESIGN`) for every section that is never closed.
fn close_unclosed_sections(text: &str) -> String {
    let mut lines: Vec<String> = text.lines().map(str::to_string).collect();
    let trailing_newline = text.ends_with('\n');

    for _ in 0..MAX_PASSES {
        let Some((insert_at, keyword)) = first_unclosed(&lines) else {
            break;
        };
        lines.insert(insert_at, format!("END {keyword}"));
    }

    let mut out = lines.join("\n");
    if trailing_newline {
        out.push('\n');
    }
    out
}

fn first_unclosed(lines: &[String]) -> Option<(usize, &'static str)> {
    lines.iter().enumerate().find_map(|(i, line)| {
        let keyword = section_header(line)?;
        let rest = &lines[i + 1..];
        if rest.iter().any(|l| closes(l, keyword)) {
            return None;
        }
        let offset = rest.iter().position(|l| {
            section_header(l).is_some() || closes(l, "DESIGN")
        })?;
        Some((i + 1 + offset, keyword))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_comments() {
        assert_eq!(repair_def("DESIGN top ; # the top\n"), "DESIGN top ; \n");
    }

    #[test]
    fn test_units_normalized() {
        assert_eq!(
            repair_def("UNITS DATABASE MICRONS 1000;\nEND UNITS\n"),
            "UNITS DISTANCE MICRONS 1000 ;\n\n"
        );
    }

    #[test]
    fn test_section_count_gets_semicolon() {
        assert_eq!(repair_def("NETS 12\nEND NETS"), "NETS 12 ;\nEND NETS");
    }

    #[test]
    fn test_orientations() {
        assert_eq!(
            repair_def("R0 R90 R180 R270 MX MY MX90 MY90"),
            "N W S E FS FN FW FE"
        );
    }

    #[test]
    fn test_component_placement_gets_point() {
        let input = "COMPONENTS 1 ;\n- u1 INV + PLACED 10 20 N ;\nEND COMPONENTS";
        assert_eq!(
            repair_def(input),
            "COMPONENTS 1 ;\n- u1 INV + PLACED ( 10 20 ) N ;\nEND COMPONENTS"
        );
    }

    #[test]
    fn test_row_parens_removed() {
        assert_eq!(
            repair_def("ROW r0 core (0 0) N ;"),
            "ROW r0 core 0 0 N ;"
        );
    }

    #[test]
    fn test_mustjoin_dropped() {
        let input = "NETS 1 ;\n- MUSTJOIN ( u1 A ) ;\nEND NETS";
        assert_eq!(repair_def(input), "NETS 1 ;\n\nEND NETS");
    }

    #[test]
    fn test_paren_spacing() {
        assert_eq!(repair_def("( u1 A)"), "( u1 A )");
        assert_eq!(repair_def("(u1 A )"), "( u1 A )");
    }

    #[test]
    fn test_unclosed_section_closed_before_next_header() {
        let input = "COMPONENTS 1 ;\n- u1 INV ;\nPINS 0 ;\nEND PINS\nNETS 0 ;\nEND NETS\nEND DESIGN\n";
        assert_eq!(
            repair_def(input),
            "COMPONENTS 1 ;\n- u1 INV ;\nEND COMPONENTS\nPINS 0 ;\nEND PINS\nNETS 0 ;\nEND NETS\nEND DESIGN\n"
        );
    }

    #[test]
    fn test_last_section_closed_before_end_design() {
        let input = "NETS 0 ;\nEND DESIGN";
        assert_eq!(repair_def(input), "NETS 0 ;\nEND NETS\nEND DESIGN");
    }

    #[test]
    fn test_section_header_matching() {
        assert_eq!(section_header("  PINS 3 ;"), Some("PINS"));
        assert_eq!(section_header("PINPROPERTIES 1 ;"), Some("PINPROPERTIES"));
        assert_eq!(section_header("SPECIALNETS 2 ;"), Some("SPECIALNETS"));
        assert_eq!(section_header("COMPONENTMASKSHIFT M1 ;"), None);
        assert_eq!(section_header("END NETS"), None);
    }

    #[test]
    fn test_valid_design_is_untouched() {
        let design = "VERSION 5.8 ;\nDESIGN top ;\nUNITS DISTANCE MICRONS 1000 ;\nDIEAREA ( 0 0 ) ( 100 100 ) ;\nCOMPONENTS 1 ;\n- u1 INV + PLACED ( 10 20 ) N ;\nEND COMPONENTS\nEND DESIGN\n";
        assert_eq!(repair_def(design), design);
    }
}
