use std::fs;
use std::path::Path;

use crate::classify::non_law_evidence_present;
use crate::cli::LawDecision;
use crate::model::{AttemptReport, CheckItem, CheckStatus, ReviewStatus};
use crate::preserve;
use crate::rules::{LineRules, StructuralToken};
use crate::util::now_utc_string;

pub const CHECK_STAGE1_READABLE: &str = "CHK-000A";
pub const CHECK_STAGE2_READABLE: &str = "CHK-000B";
pub const CHECK_CONTENT_ACCURACY: &str = "CHK-001";
pub const CHECK_NON_LAW_CONSISTENCY: &str = "CHK-102";
pub const CHECK_HEADING_HIERARCHY: &str = "CHK-103";
pub const CHECK_ARTICLE_HEADING: &str = "CHK-104";
pub const CHECK_WHITESPACE: &str = "CHK-105";
pub const CHECK_ENUMERATION_LINES: &str = "CHK-106";
pub const CHECK_STRUCTURE_COMPLETE: &str = "CHK-107";

pub const AUTO_FIXABLE_CHECK_IDS: [&str; 2] = [CHECK_WHITESPACE, CHECK_ENUMERATION_LINES];

pub const NON_LAW_REASON: &str = "non-law-document";
pub const CHECK_FAILED_REASON: &str = "stage3-check-failed";
pub const PRECHECK_FAILED_REASON: &str = "file-precheck-failed";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadFailure {
    NotFound,
    Empty,
    Encoding,
}

impl ReadFailure {
    pub fn reason_code(self) -> &'static str {
        match self {
            ReadFailure::NotFound => "file-not-found",
            ReadFailure::Empty => "file-empty",
            ReadFailure::Encoding => "encoding-failure",
        }
    }
}

pub fn read_stage_text(path: &Path) -> Result<String, ReadFailure> {
    let bytes = fs::read(path).map_err(|_| ReadFailure::NotFound)?;
    if bytes.is_empty() {
        return Err(ReadFailure::Empty);
    }
    String::from_utf8(bytes).map_err(|_| ReadFailure::Encoding)
}

#[derive(Debug, Clone)]
pub struct AttemptContext<'a> {
    pub attempt: usize,
    pub profile: &'a str,
    pub law_decision: LawDecision,
    pub stage2_reason: &'a str,
    pub auto_fix_recheck: bool,
}

#[derive(Debug, Clone)]
pub struct RuleCheckOutcome {
    pub pass: bool,
    pub business_decision: ReviewStatus,
    pub reject_reason: Option<String>,
    pub checks: Vec<CheckItem>,
}

pub fn run_attempt_checks(
    rules: &LineRules,
    stage1_path: &Path,
    stage2_path: &Path,
    context: &AttemptContext,
) -> AttemptReport {
    let mut checks: Vec<CheckItem> = Vec::new();

    let stage1_text = read_stage_text(stage1_path);
    checks.push(precheck_item(
        CHECK_STAGE1_READABLE,
        "Stage1 file readable",
        stage1_path,
        &stage1_text,
    ));

    let stage2_text = read_stage_text(stage2_path);
    checks.push(precheck_item(
        CHECK_STAGE2_READABLE,
        "Stage2 file readable",
        stage2_path,
        &stage2_text,
    ));

    let (Ok(stage1_text), Ok(stage2_text)) = (stage1_text, stage2_text) else {
        let fail_ids = failed_ids(&checks);
        return AttemptReport {
            attempt: context.attempt,
            profile: context.profile.to_string(),
            timestamp: now_utc_string(),
            auto_fix_recheck: context.auto_fix_recheck,
            stage_a_pass: false,
            stage_b_pass: false,
            overall_pass: false,
            auto_fixable_fail: false,
            fail_ids,
            business_decision: ReviewStatus::RejectedCheckFailed,
            reject_reason: Some(PRECHECK_FAILED_REASON.to_string()),
            checks,
        };
    };

    let accuracy = check_content_accuracy(rules, &stage1_text, &stage2_text);
    let stage_a_pass = accuracy.status.is_pass();
    checks.push(accuracy);

    let outcome = check_structure_rules(
        rules,
        &stage2_text,
        context.law_decision,
        context.stage2_reason,
    );
    let stage_b_pass = outcome.pass;
    checks.extend(outcome.checks);

    let fail_ids = failed_ids(&checks);
    let stage_b_fail_ids: Vec<&String> = fail_ids
        .iter()
        .filter(|id| id.as_str() != CHECK_CONTENT_ACCURACY)
        .collect();
    let auto_fixable_fail = !stage_b_fail_ids.is_empty()
        && stage_b_fail_ids
            .iter()
            .all(|id| AUTO_FIXABLE_CHECK_IDS.contains(&id.as_str()));

    let overall_pass =
        stage_a_pass && stage_b_pass && outcome.business_decision == ReviewStatus::Approved;
    let reject_reason = if overall_pass {
        None
    } else {
        outcome
            .reject_reason
            .clone()
            .or_else(|| Some(CHECK_FAILED_REASON.to_string()))
    };

    AttemptReport {
        attempt: context.attempt,
        profile: context.profile.to_string(),
        timestamp: now_utc_string(),
        auto_fix_recheck: context.auto_fix_recheck,
        stage_a_pass,
        stage_b_pass,
        overall_pass,
        auto_fixable_fail,
        fail_ids,
        business_decision: outcome.business_decision,
        reject_reason,
        checks,
    }
}

pub fn check_content_accuracy(
    rules: &LineRules,
    stage1_text: &str,
    stage2_text: &str,
) -> CheckItem {
    let name = "Content accuracy (stage1 -> stage2)";
    match preserve::first_divergence(rules, stage1_text, stage2_text) {
        None => pass_item(
            CHECK_CONTENT_ACCURACY,
            name,
            "stage1 and stage2 carry identical content after canonicalization",
        ),
        Some(divergence) => {
            let detail = format!(
                "content diverges at character {} (stage1 length {}, stage2 length {})",
                divergence.index, divergence.old_len, divergence.new_len
            );
            CheckItem {
                id: CHECK_CONTENT_ACCURACY.to_string(),
                name: name.to_string(),
                status: CheckStatus::Fail,
                detail,
                path: None,
                divergence: Some(divergence),
            }
        }
    }
}

pub fn check_structure_rules(
    rules: &LineRules,
    stage2_text: &str,
    law_decision: LawDecision,
    stage2_reason: &str,
) -> RuleCheckOutcome {
    let mut checks: Vec<CheckItem> = Vec::new();

    let non_law_context =
        law_decision == LawDecision::NonLaw || stage2_reason == NON_LAW_REASON;
    if non_law_context {
        let evidence = non_law_evidence_present(rules, stage2_text);
        let item = if evidence {
            pass_item(
                CHECK_NON_LAW_CONSISTENCY,
                "Non-law decision consistency",
                "standards evidence found; document stays rejected as non-law",
            )
        } else {
            fail_item(
                CHECK_NON_LAW_CONSISTENCY,
                "Non-law decision consistency",
                "declared non-law but no standards evidence found in stage2 text",
            )
        };
        checks.push(item);
        return RuleCheckOutcome {
            pass: evidence,
            business_decision: ReviewStatus::RejectedNonLaw,
            reject_reason: Some(NON_LAW_REASON.to_string()),
            checks,
        };
    }

    let lines: Vec<&str> = stage2_text.lines().collect();
    let mut heading_rows: Vec<(usize, usize, &str)> = Vec::new();
    for (index, line) in lines.iter().enumerate() {
        if let Some((level, content)) = rules.extract_heading(line) {
            heading_rows.push((index + 1, level, content));
        }
    }

    checks.push(rule_item(
        CHECK_HEADING_HIERARCHY,
        "Heading hierarchy legality",
        check_heading_hierarchy(rules, &heading_rows),
        "heading levels consistent with structural markers",
    ));
    checks.push(rule_item(
        CHECK_ARTICLE_HEADING,
        "Article heading placement",
        check_article_headings(rules, &lines, &heading_rows),
        "article markers sit on their own level-5 headings",
    ));
    checks.push(rule_item(
        CHECK_WHITESPACE,
        "Whitespace hygiene",
        check_whitespace(rules, &lines),
        "no stray whitespace or malformed heading prefixes",
    ));
    checks.push(rule_item(
        CHECK_ENUMERATION_LINES,
        "Enumeration one per line",
        check_enumeration_lines(rules, &lines),
        "each enumeration marker starts its own line",
    ));

    let mut chapter_count = 0;
    let mut article_count = 0;
    for (_, _, content) in &heading_rows {
        match rules.classify(content) {
            StructuralToken::Chapter => chapter_count += 1,
            StructuralToken::Article => article_count += 1,
            _ => {}
        }
    }
    let completeness_failure = if chapter_count == 0 && article_count == 0 {
        Some("no chapter or article headings found".to_string())
    } else {
        None
    };
    checks.push(rule_item(
        CHECK_STRUCTURE_COMPLETE,
        "Structural completeness",
        completeness_failure,
        &format!("chapters={chapter_count}, articles={article_count}"),
    ));

    let pass = checks.iter().all(|check| check.status.is_pass());
    let (business_decision, reject_reason) = if pass {
        (ReviewStatus::Approved, None)
    } else {
        (
            ReviewStatus::RejectedCheckFailed,
            Some(CHECK_FAILED_REASON.to_string()),
        )
    };

    RuleCheckOutcome {
        pass,
        business_decision,
        reject_reason,
        checks,
    }
}

fn check_heading_hierarchy(
    rules: &LineRules,
    heading_rows: &[(usize, usize, &str)],
) -> Option<String> {
    let mut title_count = 0;

    for (row, level, content) in heading_rows {
        if *level > 5 {
            return Some(format!(
                "line {row}: heading level {level} exceeds the legal maximum of 5"
            ));
        }
        match required_structural_level(rules.classify(content)) {
            Some((required, label)) => {
                if *level != required {
                    return Some(format!(
                        "line {row}: {label} heading must be level {required}, found {level}"
                    ));
                }
            }
            None => {
                if *level == 1 {
                    title_count += 1;
                } else {
                    return Some(format!(
                        "line {row}: non-structural heading at level {level}"
                    ));
                }
            }
        }
    }

    if title_count == 0 {
        return Some("missing level-1 title heading".to_string());
    }
    if title_count > 1 {
        return Some(format!(
            "found {title_count} level-1 title headings, expected exactly one"
        ));
    }

    None
}

fn required_structural_level(token: StructuralToken) -> Option<(usize, &'static str)> {
    match token {
        StructuralToken::Part => Some((2, "part")),
        StructuralToken::Chapter => Some((3, "chapter")),
        StructuralToken::Section => Some((4, "section")),
        StructuralToken::Article => Some((5, "article")),
        _ => None,
    }
}

fn check_article_headings(
    rules: &LineRules,
    lines: &[&str],
    heading_rows: &[(usize, usize, &str)],
) -> Option<String> {
    for (row, level, content) in heading_rows {
        let Some(article) = rules.article_parts(content) else {
            continue;
        };
        if *level != 5 {
            return Some(format!(
                "line {row}: article heading must be level 5, found {level}"
            ));
        }
        if !article.rest.is_empty() && !rules.is_footnote_lead(article.rest) {
            return Some(format!(
                "line {row}: article heading carries trailing text on the same line"
            ));
        }
    }

    for (index, line) in lines.iter().enumerate() {
        if rules.extract_heading(line).is_some() {
            continue;
        }
        if let Some(article) = rules.article_parts(line) {
            if !article.rest.trim().is_empty() {
                return Some(format!(
                    "line {}: article marker with trailing text outside a heading",
                    index + 1
                ));
            }
        }
    }

    None
}

fn check_whitespace(rules: &LineRules, lines: &[&str]) -> Option<String> {
    for (index, line) in lines.iter().enumerate() {
        let row = index + 1;
        if rules.has_trailing_space(line) {
            return Some(format!("line {row}: trailing whitespace"));
        }
        if line.starts_with(' ') || line.starts_with('\t') {
            return Some(format!("line {row}: leading ASCII whitespace"));
        }
        if line.starts_with('　') {
            return Some(format!("line {row}: leading fullwidth space"));
        }
        if line.starts_with('#') && !rules.heading_wellformed(line) {
            return Some(format!("line {row}: malformed heading prefix"));
        }
    }

    None
}

fn check_enumeration_lines(rules: &LineRules, lines: &[&str]) -> Option<String> {
    for (index, line) in lines.iter().enumerate() {
        if rules.extract_heading(line).is_some() {
            continue;
        }
        let count = rules.enumeration_count(line);
        if count > 1 {
            return Some(format!(
                "line {}: {count} enumeration markers on one line",
                index + 1
            ));
        }
    }

    None
}

fn precheck_item(
    id: &str,
    name: &str,
    path: &Path,
    outcome: &Result<String, ReadFailure>,
) -> CheckItem {
    let (status, detail) = match outcome {
        Ok(_) => (CheckStatus::Pass, "readable utf-8 text".to_string()),
        Err(failure) => (CheckStatus::Fail, failure.reason_code().to_string()),
    };

    CheckItem {
        id: id.to_string(),
        name: name.to_string(),
        status,
        detail,
        path: Some(path.display().to_string()),
        divergence: None,
    }
}

fn rule_item(id: &str, name: &str, failure: Option<String>, pass_detail: &str) -> CheckItem {
    match failure {
        Some(detail) => fail_item(id, name, detail),
        None => pass_item(id, name, pass_detail),
    }
}

fn pass_item(id: &str, name: &str, detail: impl Into<String>) -> CheckItem {
    CheckItem {
        id: id.to_string(),
        name: name.to_string(),
        status: CheckStatus::Pass,
        detail: detail.into(),
        path: None,
        divergence: None,
    }
}

fn fail_item(id: &str, name: &str, detail: impl Into<String>) -> CheckItem {
    CheckItem {
        id: id.to_string(),
        name: name.to_string(),
        status: CheckStatus::Fail,
        detail: detail.into(),
        path: None,
        divergence: None,
    }
}

fn failed_ids(checks: &[CheckItem]) -> Vec<String> {
    checks
        .iter()
        .filter(|check| !check.status.is_pass())
        .map(|check| check.id.clone())
        .collect()
}
