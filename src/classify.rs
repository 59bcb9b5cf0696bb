use crate::rules::{LineRules, StructuralToken, PAGE_MARKER_PREFIX};

pub const NON_LAW_SCAN_LIMIT: usize = 80;

#[derive(Debug, Clone, Copy, Default)]
pub struct StructureScan {
    pub has_part: bool,
    pub has_chapter: bool,
    pub has_section: bool,
    pub has_article: bool,
    pub first_marker_line: Option<usize>,
}

impl StructureScan {
    pub fn legal_structure_detected(&self) -> bool {
        self.has_article || (self.has_chapter && self.has_section) || (self.has_part && self.has_chapter)
    }
}

pub fn detect_non_law(rules: &LineRules, text: &str) -> bool {
    scan_for_standard_evidence(rules, text, true)
}

pub fn non_law_evidence_present(rules: &LineRules, text: &str) -> bool {
    scan_for_standard_evidence(rules, text, false)
}

fn scan_for_standard_evidence(rules: &LineRules, text: &str, strip_heading_prefix: bool) -> bool {
    let mut checked = 0;

    for raw in text.lines() {
        let line = if strip_heading_prefix {
            rules.strip_heading_prefix(raw)
        } else {
            raw
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with(PAGE_MARKER_PREFIX) {
            continue;
        }

        checked += 1;
        if rules.matches_standard_code(line) || rules.has_standard_keyword(line) {
            return true;
        }
        if checked >= NON_LAW_SCAN_LIMIT {
            break;
        }
    }

    false
}

pub fn scan_structure(rules: &LineRules, lines: &[&str]) -> StructureScan {
    let mut scan = StructureScan::default();

    for (index, raw) in lines.iter().enumerate() {
        let content = rules.strip_heading_prefix(raw);
        match rules.classify(content) {
            StructuralToken::Part => scan.has_part = true,
            StructuralToken::Chapter => scan.has_chapter = true,
            StructuralToken::Section => scan.has_section = true,
            StructuralToken::Article => scan.has_article = true,
            _ => continue,
        }
        if scan.first_marker_line.is_none() {
            scan.first_marker_line = Some(index);
        }
    }

    scan
}
