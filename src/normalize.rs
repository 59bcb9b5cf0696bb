use crate::classify::{detect_non_law, scan_structure};
use crate::cli::LawDecision;
use crate::model::NormalizeCounts;
use crate::preserve;
use crate::rules::{LineRules, StructuralToken};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageProfile {
    pub name: &'static str,
    pub rewrite_structure: bool,
    pub split_enumerations: bool,
    pub cleanup_spaces: bool,
}

pub const PROFILE_LADDER: [StageProfile; 3] = [
    StageProfile {
        name: "default",
        rewrite_structure: true,
        split_enumerations: true,
        cleanup_spaces: true,
    },
    StageProfile {
        name: "structure",
        rewrite_structure: true,
        split_enumerations: false,
        cleanup_spaces: true,
    },
    StageProfile {
        name: "minimal",
        rewrite_structure: false,
        split_enumerations: false,
        cleanup_spaces: false,
    },
];

impl StageProfile {
    pub fn for_attempt(attempt: usize) -> StageProfile {
        PROFILE_LADDER[attempt.min(PROFILE_LADDER.len() - 1)]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalizeReason {
    Applied,
    NoOp,
    NonLawDocument,
    LegalStructureNotDetected,
    PreserveCheckFailed,
}

impl NormalizeReason {
    pub fn as_str(self) -> &'static str {
        match self {
            NormalizeReason::Applied => "applied",
            NormalizeReason::NoOp => "no-op",
            NormalizeReason::NonLawDocument => "non-law-document",
            NormalizeReason::LegalStructureNotDetected => "legal-structure-not-detected",
            NormalizeReason::PreserveCheckFailed => "preserve-check-failed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct NormalizeOutcome {
    pub text: String,
    pub applied: bool,
    pub reason: NormalizeReason,
    pub legal_structure_detected: bool,
    pub preserve_check_passed: bool,
    pub counts: NormalizeCounts,
}

impl NormalizeOutcome {
    fn unchanged(text: &str, reason: NormalizeReason, legal_structure_detected: bool) -> Self {
        Self {
            text: text.to_string(),
            applied: false,
            reason,
            legal_structure_detected,
            preserve_check_passed: reason != NormalizeReason::PreserveCheckFailed,
            counts: NormalizeCounts::default(),
        }
    }
}

pub fn normalize(
    rules: &LineRules,
    text: &str,
    profile: StageProfile,
    law_decision: LawDecision,
) -> NormalizeOutcome {
    let non_law = match law_decision {
        LawDecision::NonLaw => true,
        LawDecision::Law => false,
        LawDecision::Auto => detect_non_law(rules, text),
    };
    if non_law {
        return NormalizeOutcome::unchanged(text, NormalizeReason::NonLawDocument, false);
    }

    let lines: Vec<&str> = text.lines().collect();
    let scan = scan_structure(rules, &lines);
    if !scan.legal_structure_detected() {
        return NormalizeOutcome::unchanged(text, NormalizeReason::LegalStructureNotDetected, false);
    }

    if !profile.rewrite_structure {
        return NormalizeOutcome::unchanged(text, NormalizeReason::NoOp, true);
    }

    let title_index = scan.first_marker_line.and_then(|first| {
        lines[..first].iter().position(|line| !line.trim().is_empty())
    });

    let mut counts = NormalizeCounts::default();
    let mut out_lines: Vec<String> = Vec::with_capacity(lines.len());

    for (index, raw) in lines.iter().enumerate() {
        if raw.is_empty() {
            out_lines.push(String::new());
            continue;
        }

        let content = rules.strip_heading_prefix(raw);

        if title_index == Some(index) {
            out_lines.push(format!("# {content}"));
            counts.title_count += 1;
            continue;
        }

        match rules.classify(content) {
            StructuralToken::Part => {
                out_lines.push(format!("## {content}"));
                counts.part_count += 1;
            }
            StructuralToken::Chapter => {
                out_lines.push(format!("### {content}"));
                counts.chapter_count += 1;
            }
            StructuralToken::Section => {
                out_lines.push(format!("#### {content}"));
                counts.section_count += 1;
            }
            StructuralToken::Article => {
                let Some(article) = rules.article_parts(content) else {
                    out_lines.push(content.to_string());
                    continue;
                };
                counts.article_count += 1;
                if rules.is_footnote_lead(article.rest) {
                    out_lines.push(format!("##### {content}"));
                } else {
                    out_lines.push(format!("##### {}{}", article.leading, article.marker));
                    if !article.rest.is_empty() {
                        push_body_line(rules, profile, article.rest, &mut out_lines, &mut counts);
                    }
                }
            }
            _ => push_body_line(rules, profile, raw, &mut out_lines, &mut counts),
        }
    }

    let rewritten = if profile.cleanup_spaces {
        cleanup_spacing(rules, &out_lines, &mut counts)
    } else {
        out_lines
    };

    let mut new_text = rewritten.join("\n");
    if text.ends_with('\n') {
        new_text.push('\n');
    }

    if !preserve::content_equal(rules, text, &new_text) {
        return NormalizeOutcome::unchanged(text, NormalizeReason::PreserveCheckFailed, true);
    }

    let applied = new_text != text;
    let reason = if applied {
        NormalizeReason::Applied
    } else {
        NormalizeReason::NoOp
    };

    NormalizeOutcome {
        text: new_text,
        applied,
        reason,
        legal_structure_detected: true,
        preserve_check_passed: true,
        counts,
    }
}

fn push_body_line(
    rules: &LineRules,
    profile: StageProfile,
    line: &str,
    out_lines: &mut Vec<String>,
    counts: &mut NormalizeCounts,
) {
    if !profile.split_enumerations {
        out_lines.push(line.to_string());
        return;
    }

    let starts = rules.enumeration_starts(line);
    if starts.len() <= 1 {
        out_lines.push(line.to_string());
        return;
    }

    let mut last = 0;
    for &start in &starts[1..] {
        out_lines.push(line[last..start].to_string());
        last = start;
    }
    out_lines.push(line[last..].to_string());
    counts.item_split_count += starts.len() - 1;
}

fn cleanup_spacing(
    rules: &LineRules,
    lines: &[String],
    counts: &mut NormalizeCounts,
) -> Vec<String> {
    let mut out = Vec::with_capacity(lines.len());

    for line in lines {
        if line.is_empty() {
            out.push(String::new());
            continue;
        }

        let next = if let Some((marks, content)) = rules.heading_parts(line) {
            let trimmed = content.trim_matches([' ', '\t', '　']);
            if trimmed.is_empty() {
                marks.to_string()
            } else {
                format!("{marks} {trimmed}")
            }
        } else {
            rules
                .strip_trailing_space(line)
                .trim_start_matches([' ', '\t'])
                .trim_start_matches('　')
                .to_string()
        };

        if &next != line {
            counts.space_cleanup_count += 1;
        }
        out.push(next);
    }

    out
}
