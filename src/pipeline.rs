use std::path::Path;

use anyhow::Result;
use tracing::{debug, info};

use crate::checker::{self, AttemptContext};
use crate::cli::LawDecision;
use crate::model::{AttemptReport, NormalizeCounts, ReviewStatus};
use crate::normalize::{self, NormalizeOutcome, NormalizeReason, StageProfile, PROFILE_LADDER};
use crate::rules::LineRules;
use crate::util::{copy_file, read_text_file, write_text_file};

pub const ALREADY_NORMALIZED_REASON: &str = "already-normalized";
pub const AUTOFIX_REASON: &str = "autofix";

#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig {
    pub law_decision: LawDecision,
    pub skip_checks: bool,
    pub max_retries: usize,
}

#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub review_status: ReviewStatus,
    pub checks_skipped: bool,
    pub final_pass: Option<bool>,
    pub stage2_last_reason: String,
    pub counts: NormalizeCounts,
    pub attempts: Vec<AttemptReport>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlStep {
    Accept,
    StopNonLaw,
    AutoFix,
    Retry,
    Exhausted,
}

pub fn next_control_step(report: &AttemptReport, attempt: usize, max_retries: usize) -> ControlStep {
    if report.business_decision == ReviewStatus::RejectedNonLaw {
        return ControlStep::StopNonLaw;
    }
    if report.overall_pass {
        return ControlStep::Accept;
    }
    if report.auto_fixable_fail && !report.auto_fix_recheck {
        return ControlStep::AutoFix;
    }
    if attempt < max_retries {
        return ControlStep::Retry;
    }
    ControlStep::Exhausted
}

pub fn prepare_stage2(stage1_path: &Path, stage2_path: &Path) -> Result<()> {
    copy_file(stage1_path, stage2_path)
}

pub fn run_pipeline(
    rules: &LineRules,
    stage1_path: &Path,
    stage2_path: &Path,
    config: &PipelineConfig,
) -> Result<PipelineOutcome> {
    if config.skip_checks {
        return run_without_checks(rules, stage2_path, config);
    }

    let mut attempts: Vec<AttemptReport> = Vec::new();
    let mut review_status = ReviewStatus::RejectedCheckFailed;
    let mut final_pass = false;
    let mut last_reason = String::new();
    let mut counts = NormalizeCounts::default();

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            prepare_stage2(stage1_path, stage2_path)?;
        }

        let profile = StageProfile::for_attempt(attempt);
        let outcome = normalize_stage2(rules, stage2_path, profile, config.law_decision)?;
        last_reason = stage2_reason_label(&outcome);
        counts = outcome.counts;
        info!(
            attempt,
            profile = profile.name,
            reason = %last_reason,
            applied = outcome.applied,
            "stage2 normalization"
        );

        let context = AttemptContext {
            attempt,
            profile: profile.name,
            law_decision: config.law_decision,
            stage2_reason: &last_reason,
            auto_fix_recheck: false,
        };
        let report = checker::run_attempt_checks(rules, stage1_path, stage2_path, &context);
        let step = next_control_step(&report, attempt, config.max_retries);
        debug!(attempt, step = ?step, overall = report.overall_pass, "stage3 attempt evaluated");
        attempts.push(report);

        match step {
            ControlStep::StopNonLaw => {
                review_status = ReviewStatus::RejectedNonLaw;
                break;
            }
            ControlStep::Accept => {
                review_status = ReviewStatus::Approved;
                final_pass = true;
                break;
            }
            ControlStep::AutoFix => {
                if !apply_autofix(rules, stage2_path, config.law_decision)? {
                    continue;
                }
                last_reason = AUTOFIX_REASON.to_string();

                let recheck_profile = format!("{}+autofix", profile.name);
                let recheck_context = AttemptContext {
                    attempt,
                    profile: &recheck_profile,
                    law_decision: config.law_decision,
                    stage2_reason: AUTOFIX_REASON,
                    auto_fix_recheck: true,
                };
                let recheck =
                    checker::run_attempt_checks(rules, stage1_path, stage2_path, &recheck_context);
                let recheck_step = next_control_step(&recheck, attempt, config.max_retries);
                attempts.push(recheck);

                match recheck_step {
                    ControlStep::Accept => {
                        review_status = ReviewStatus::Approved;
                        final_pass = true;
                        break;
                    }
                    ControlStep::StopNonLaw => {
                        review_status = ReviewStatus::RejectedNonLaw;
                        break;
                    }
                    _ => {}
                }
            }
            ControlStep::Retry => {}
            ControlStep::Exhausted => break,
        }
    }

    info!(
        status = review_status.as_str(),
        attempts = attempts.len(),
        "stage3 check loop finished"
    );

    Ok(PipelineOutcome {
        review_status,
        checks_skipped: false,
        final_pass: Some(final_pass),
        stage2_last_reason: last_reason,
        counts,
        attempts,
    })
}

fn run_without_checks(
    rules: &LineRules,
    stage2_path: &Path,
    config: &PipelineConfig,
) -> Result<PipelineOutcome> {
    let outcome = normalize_stage2(rules, stage2_path, PROFILE_LADDER[0], config.law_decision)?;
    let last_reason = stage2_reason_label(&outcome);
    let review_status = if outcome.reason == NormalizeReason::NonLawDocument {
        ReviewStatus::RejectedNonLaw
    } else {
        ReviewStatus::Approved
    };

    info!(
        reason = %last_reason,
        status = review_status.as_str(),
        "stage3 checks skipped"
    );

    Ok(PipelineOutcome {
        review_status,
        checks_skipped: true,
        final_pass: None,
        stage2_last_reason: last_reason,
        counts: outcome.counts,
        attempts: Vec::new(),
    })
}

fn normalize_stage2(
    rules: &LineRules,
    stage2_path: &Path,
    profile: StageProfile,
    law_decision: LawDecision,
) -> Result<NormalizeOutcome> {
    let text = read_text_file(stage2_path)?;
    let outcome = normalize::normalize(rules, &text, profile, law_decision);
    if outcome.applied {
        write_text_file(stage2_path, &outcome.text)?;
    }
    Ok(outcome)
}

fn apply_autofix(rules: &LineRules, stage2_path: &Path, law_decision: LawDecision) -> Result<bool> {
    let current = read_text_file(stage2_path)?;
    let outcome = normalize::normalize(rules, &current, PROFILE_LADDER[0], law_decision);
    if !outcome.applied {
        debug!("auto-fix left stage2 unchanged, skipping recheck");
        return Ok(false);
    }
    write_text_file(stage2_path, &outcome.text)?;
    info!("auto-fix normalization applied");
    Ok(true)
}

fn stage2_reason_label(outcome: &NormalizeOutcome) -> String {
    match outcome.reason {
        NormalizeReason::NoOp => ALREADY_NORMALIZED_REASON.to_string(),
        other => other.as_str().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::ensure_directory;
    use std::path::PathBuf;

    fn rules() -> LineRules {
        LineRules::new().unwrap()
    }

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("lawmd-pipeline-tests").join(name);
        ensure_directory(&dir).unwrap();
        dir
    }

    fn seed(dir: &Path, text: &str) -> (PathBuf, PathBuf) {
        let stage1 = dir.join("doc.stage1.md");
        let stage2 = dir.join("doc.stage2.md");
        write_text_file(&stage1, text).unwrap();
        prepare_stage2(&stage1, &stage2).unwrap();
        (stage1, stage2)
    }

    fn config(law_decision: LawDecision) -> PipelineConfig {
        PipelineConfig {
            law_decision,
            skip_checks: false,
            max_retries: 2,
        }
    }

    fn sample_report(
        overall_pass: bool,
        auto_fixable_fail: bool,
        auto_fix_recheck: bool,
        business_decision: ReviewStatus,
    ) -> AttemptReport {
        AttemptReport {
            attempt: 0,
            profile: "default".to_string(),
            timestamp: "2026-01-01T00:00:00Z".to_string(),
            auto_fix_recheck,
            stage_a_pass: overall_pass,
            stage_b_pass: overall_pass,
            overall_pass,
            auto_fixable_fail,
            fail_ids: Vec::new(),
            business_decision,
            reject_reason: None,
            checks: Vec::new(),
        }
    }

    #[test]
    fn control_step_accepts_passing_attempt() {
        let report = sample_report(true, false, false, ReviewStatus::Approved);
        assert_eq!(next_control_step(&report, 0, 2), ControlStep::Accept);
    }

    #[test]
    fn control_step_stops_on_non_law_even_when_checks_fail() {
        let report = sample_report(false, false, false, ReviewStatus::RejectedNonLaw);
        assert_eq!(next_control_step(&report, 0, 2), ControlStep::StopNonLaw);
    }

    #[test]
    fn control_step_prefers_autofix_over_retry() {
        let report = sample_report(false, true, false, ReviewStatus::RejectedCheckFailed);
        assert_eq!(next_control_step(&report, 0, 2), ControlStep::AutoFix);
    }

    #[test]
    fn control_step_never_autofixes_a_recheck() {
        let report = sample_report(false, true, true, ReviewStatus::RejectedCheckFailed);
        assert_eq!(next_control_step(&report, 0, 2), ControlStep::Retry);
        assert_eq!(next_control_step(&report, 2, 2), ControlStep::Exhausted);
    }

    #[test]
    fn control_step_retries_until_attempts_exhausted() {
        let report = sample_report(false, false, false, ReviewStatus::RejectedCheckFailed);
        assert_eq!(next_control_step(&report, 0, 2), ControlStep::Retry);
        assert_eq!(next_control_step(&report, 1, 2), ControlStep::Retry);
        assert_eq!(next_control_step(&report, 2, 2), ControlStep::Exhausted);
    }

    #[test]
    fn clean_law_document_is_approved_on_first_attempt() {
        let rules = rules();
        let dir = scratch_dir("approves-first-attempt");
        let text = "中华人民共和国某某法\n第一章 总则\n第一条 为了规范行为：（一）鼓励创新（二）保护竞争\n第二条 本法适用于境内活动\n";
        let (stage1, stage2) = seed(&dir, text);

        let outcome =
            run_pipeline(&rules, &stage1, &stage2, &config(LawDecision::Auto)).unwrap();

        assert_eq!(outcome.review_status, ReviewStatus::Approved);
        assert_eq!(outcome.final_pass, Some(true));
        assert_eq!(outcome.stage2_last_reason, "applied");
        assert_eq!(outcome.attempts.len(), 1);
        assert!(outcome.attempts[0].overall_pass);
        assert_eq!(outcome.attempts[0].profile, "default");

        let stage2_text = read_text_file(&stage2).unwrap();
        assert!(stage2_text.starts_with("# 中华人民共和国某某法\n### 第一章 总则\n"));
        assert!(stage2_text.contains("\n（二）保护竞争\n"));
    }

    #[test]
    fn non_law_document_stops_after_single_attempt() {
        let rules = rules();
        let dir = scratch_dir("non-law-stops");
        let text = "GB/T 19001 质量管理体系要求\n第一章 范围\n第一条 适用于各类组织\n";
        let (stage1, stage2) = seed(&dir, text);

        let outcome =
            run_pipeline(&rules, &stage1, &stage2, &config(LawDecision::Auto)).unwrap();

        assert_eq!(outcome.review_status, ReviewStatus::RejectedNonLaw);
        assert_eq!(outcome.final_pass, Some(false));
        assert_eq!(outcome.stage2_last_reason, "non-law-document");
        assert_eq!(outcome.attempts.len(), 1);
        assert_eq!(
            outcome.attempts[0].business_decision,
            ReviewStatus::RejectedNonLaw
        );
        assert_eq!(read_text_file(&stage2).unwrap(), text);
    }

    #[test]
    fn structureless_document_exhausts_all_attempts() {
        let rules = rules();
        let dir = scratch_dir("exhausts-retries");
        let text = "项目情况说明\n\n本季度进展顺利。\n";
        let (stage1, stage2) = seed(&dir, text);

        let outcome =
            run_pipeline(&rules, &stage1, &stage2, &config(LawDecision::Auto)).unwrap();

        assert_eq!(outcome.review_status, ReviewStatus::RejectedCheckFailed);
        assert_eq!(outcome.final_pass, Some(false));
        assert_eq!(outcome.stage2_last_reason, "legal-structure-not-detected");
        assert_eq!(outcome.attempts.len(), 3);
        let profiles: Vec<&str> = outcome
            .attempts
            .iter()
            .map(|attempt| attempt.profile.as_str())
            .collect();
        assert_eq!(profiles, vec!["default", "structure", "minimal"]);
        assert!(outcome.attempts.iter().all(|a| !a.auto_fix_recheck));
        assert_eq!(read_text_file(&stage2).unwrap(), text);
    }

    #[test]
    fn preserve_conflict_blocks_autofix_and_rejects() {
        let rules = rules();
        let dir = scratch_dir("preserve-blocks-autofix");
        let text = "# 标题\n### 第一章 总则\n##### 第一条\n正文内容。\n##　附则\n";
        let (stage1, stage2) = seed(&dir, text);

        let outcome =
            run_pipeline(&rules, &stage1, &stage2, &config(LawDecision::Auto)).unwrap();

        assert_eq!(outcome.review_status, ReviewStatus::RejectedCheckFailed);
        assert_eq!(outcome.attempts.len(), 3);
        assert!(outcome.attempts.iter().all(|a| !a.auto_fix_recheck));
        assert!(outcome.attempts.iter().all(|a| a.auto_fixable_fail));
        assert!(outcome.attempts[0].fail_ids.iter().all(|id| id == "CHK-105"));
        assert_eq!(read_text_file(&stage2).unwrap(), text);
    }

    #[test]
    fn autofix_recheck_approves_within_same_attempt() {
        let rules = rules();
        let dir = scratch_dir("autofix-approves");
        let text = "某某法\n第一章 总则\n第一节 规定\n 　 正文内容\n";
        let (stage1, stage2) = seed(&dir, text);

        let outcome =
            run_pipeline(&rules, &stage1, &stage2, &config(LawDecision::Auto)).unwrap();

        assert_eq!(outcome.review_status, ReviewStatus::Approved);
        assert_eq!(outcome.final_pass, Some(true));
        assert_eq!(outcome.stage2_last_reason, "autofix");
        assert_eq!(outcome.attempts.len(), 2);
        assert_eq!(outcome.attempts[0].fail_ids, vec!["CHK-105"]);
        assert!(outcome.attempts[0].auto_fixable_fail);
        assert!(!outcome.attempts[0].auto_fix_recheck);
        assert!(outcome.attempts[1].auto_fix_recheck);
        assert_eq!(outcome.attempts[1].attempt, 0);
        assert_eq!(outcome.attempts[1].profile, "default+autofix");
        assert!(outcome.attempts[1].overall_pass);
        assert_eq!(
            read_text_file(&stage2).unwrap(),
            "# 某某法\n### 第一章 总则\n#### 第一节 规定\n正文内容\n"
        );
    }

    #[test]
    fn skip_checks_normalizes_without_attempts() {
        let rules = rules();
        let dir = scratch_dir("skip-checks");
        let text = "某某法\n第一章 总则\n第一条 目的\n";
        let (stage1, stage2) = seed(&dir, text);

        let config = PipelineConfig {
            law_decision: LawDecision::Auto,
            skip_checks: true,
            max_retries: 2,
        };
        let outcome = run_pipeline(&rules, &stage1, &stage2, &config).unwrap();

        assert_eq!(outcome.review_status, ReviewStatus::Approved);
        assert!(outcome.checks_skipped);
        assert_eq!(outcome.final_pass, None);
        assert!(outcome.attempts.is_empty());
        assert!(read_text_file(&stage2).unwrap().starts_with("# 某某法\n"));
    }

    #[test]
    fn skip_checks_still_rejects_non_law() {
        let rules = rules();
        let dir = scratch_dir("skip-checks-non-law");
        let text = "GB 2760 食品安全国家标准\n第一条 范围\n";
        let (stage1, stage2) = seed(&dir, text);

        let config = PipelineConfig {
            law_decision: LawDecision::Auto,
            skip_checks: true,
            max_retries: 2,
        };
        let outcome = run_pipeline(&rules, &stage1, &stage2, &config).unwrap();

        assert_eq!(outcome.review_status, ReviewStatus::RejectedNonLaw);
        assert!(outcome.checks_skipped);
        assert_eq!(outcome.stage2_last_reason, "non-law-document");
    }

    #[test]
    fn already_normalized_input_reports_no_op_label() {
        let rules = rules();
        let dir = scratch_dir("already-normalized");
        let text = "# 某某法\n### 第一章 总则\n##### 第一条\n为了规范行为。\n";
        let (stage1, stage2) = seed(&dir, text);

        let outcome =
            run_pipeline(&rules, &stage1, &stage2, &config(LawDecision::Auto)).unwrap();

        assert_eq!(outcome.review_status, ReviewStatus::Approved);
        assert_eq!(outcome.stage2_last_reason, "already-normalized");
        assert_eq!(read_text_file(&stage2).unwrap(), text);
    }

    #[test]
    fn retry_recopies_pristine_stage1() {
        let rules = rules();
        let dir = scratch_dir("recopies-stage1");
        let text = "# 仅有标题\n正文说明。\n";
        let (stage1, stage2) = seed(&dir, text);
        write_text_file(&stage2, "# 被污染的中间状态\n").unwrap();

        let outcome =
            run_pipeline(&rules, &stage1, &stage2, &config(LawDecision::Auto)).unwrap();

        assert_eq!(outcome.review_status, ReviewStatus::RejectedCheckFailed);
        assert!(outcome.attempts.len() > 1);
        assert_eq!(read_text_file(&stage2).unwrap(), text);
    }
}
