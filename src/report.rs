use std::path::Path;

use anyhow::Result;

use crate::model::{AttemptReport, CheckReportManifest, ReviewStatus};
use crate::util::write_text_file;

pub fn stage2_reason_description(reason: &str) -> &'static str {
    match reason {
        "applied" => "formatting normalized to the target structure",
        "already-normalized" => "already in the target structure, nothing to change",
        "no-op" => "no change required",
        "autofix" => "auto-fix normalization applied after a failed check",
        "non-law-document" => "identified as a non-law document, normalization rejected",
        "legal-structure-not-detected" => "no legal structure detected, normalization skipped",
        "preserve-check-failed" => "content preservation check failed, changes were discarded",
        _ => "unknown",
    }
}

pub fn review_status_description(status: ReviewStatus) -> &'static str {
    match status {
        ReviewStatus::Approved => "approved for delivery",
        ReviewStatus::RejectedNonLaw => "rejected: not a law document",
        ReviewStatus::RejectedCheckFailed => "rejected: structural checks failed",
    }
}

pub fn write_review_report(
    path: &Path,
    manifest: &CheckReportManifest,
    deliverable: Option<&Path>,
) -> Result<()> {
    write_text_file(path, &render_review_report(manifest, deliverable))
}

pub fn render_review_report(
    manifest: &CheckReportManifest,
    deliverable: Option<&Path>,
) -> String {
    let mut out = String::new();

    out.push_str("# Conversion Review Report\n\n");
    out.push_str("## Document\n\n");
    out.push_str(&format!("- Run: {}\n", manifest.run_id));
    out.push_str(&format!("- Generated: {}\n", manifest.generated_at));
    out.push_str(&format!("- Input: {}\n", manifest.input.path));
    out.push_str(&format!("- Input sha256: {}\n", manifest.input.sha256));
    out.push_str(&format!("- Extraction engine: {}\n", manifest.input.engine));
    out.push_str(&format!("- Law decision: {}\n", manifest.law_decision));
    out.push_str(&format!(
        "- Review status: {} ({})\n",
        manifest.review_status.as_str(),
        review_status_description(manifest.review_status)
    ));
    out.push('\n');

    out.push_str("## Stage summary\n\n");
    out.push_str(&format!(
        "- Stage 2: {} ({})\n",
        manifest.stage2_last_reason,
        stage2_reason_description(&manifest.stage2_last_reason)
    ));
    if manifest.checks_skipped {
        out.push_str("- Stage 3: checks skipped by request\n");
    } else {
        out.push_str(&format!(
            "- Stage 3: {} attempt(s), final pass: {}\n",
            manifest.attempts.len(),
            match manifest.overall_pass {
                Some(true) => "yes",
                Some(false) => "no",
                None => "not evaluated",
            }
        ));
    }
    out.push('\n');

    if !manifest.attempts.is_empty() {
        out.push_str("## Check attempts\n\n");
        for attempt in &manifest.attempts {
            render_attempt(&mut out, attempt);
        }
    }

    out.push_str("## Conclusion\n\n");
    match manifest.review_status {
        ReviewStatus::Approved => match deliverable {
            Some(path) => {
                out.push_str(&format!("Deliverable written to `{}`.\n", path.display()));
            }
            None => out.push_str("Document approved.\n"),
        },
        status => {
            let reason = manifest
                .attempts
                .iter()
                .rev()
                .find_map(|attempt| attempt.reject_reason.clone())
                .unwrap_or_else(|| status.as_str().to_string());
            out.push_str(&format!(
                "No deliverable was produced ({}, reason: {reason}).\n",
                review_status_description(status)
            ));
        }
    }

    out
}

fn render_attempt(out: &mut String, attempt: &AttemptReport) {
    let label = if attempt.auto_fix_recheck {
        "auto-fix recheck"
    } else {
        "attempt"
    };
    out.push_str(&format!(
        "### Attempt {} ({label}, profile `{}`)\n\n",
        attempt.attempt, attempt.profile
    ));
    out.push_str(&format!(
        "- Result: {} (stage A: {}, stage B: {})\n",
        if attempt.overall_pass { "PASS" } else { "FAIL" },
        if attempt.stage_a_pass { "pass" } else { "fail" },
        if attempt.stage_b_pass { "pass" } else { "fail" },
    ));
    out.push_str(&format!(
        "- Business decision: {}\n",
        attempt.business_decision.as_str()
    ));
    if let Some(reason) = &attempt.reject_reason {
        out.push_str(&format!("- Reject reason: {reason}\n"));
    }

    for check in &attempt.checks {
        out.push_str(&format!(
            "- [{}] {} {}: {}\n",
            check.status.as_str(),
            check.id,
            check.name,
            check.detail
        ));
        if let Some(divergence) = &check.divergence {
            out.push_str(&format!(
                "  - divergence at character {}: {:?} became {:?}\n",
                divergence.index, divergence.old_char, divergence.new_char
            ));
            out.push_str(&format!(
                "  - stage1 context: {}\n",
                divergence.old_context
            ));
            out.push_str(&format!(
                "  - stage2 context: {}\n",
                divergence.new_context
            ));
        }
    }
    out.push('\n');
}
