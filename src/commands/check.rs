use anyhow::{bail, Result};
use chrono::Utc;
use tracing::info;

use crate::checker::{self, AttemptContext};
use crate::cli::CheckArgs;
use crate::model::{CheckReportManifest, InputDescriptor, NormalizeCounts, ReviewStatus};
use crate::rules::LineRules;
use crate::util::{now_utc_string, sha256_file, utc_compact_string, write_json_pretty};

pub fn run(args: CheckArgs) -> Result<()> {
    let run_id = format!("run-{}", utc_compact_string(Utc::now()));
    let rules = LineRules::new()?;

    let context = AttemptContext {
        attempt: 0,
        profile: "existing",
        law_decision: args.law_decision,
        stage2_reason: &args.stage2_reason,
        auto_fix_recheck: false,
    };
    let report = checker::run_attempt_checks(&rules, &args.stage1, &args.stage2, &context);

    let overall_pass = report.overall_pass;
    let review_status = if overall_pass {
        ReviewStatus::Approved
    } else if report.business_decision == ReviewStatus::RejectedNonLaw {
        ReviewStatus::RejectedNonLaw
    } else {
        ReviewStatus::RejectedCheckFailed
    };

    for check in &report.checks {
        info!(
            id = %check.id,
            status = check.status.as_str(),
            detail = %check.detail,
            "check evaluated"
        );
    }

    let sha256 = if args.stage1.exists() {
        sha256_file(&args.stage1)?
    } else {
        String::new()
    };
    let manifest = CheckReportManifest {
        manifest_version: 1,
        run_id,
        generated_at: now_utc_string(),
        input: InputDescriptor {
            path: args.stage1.display().to_string(),
            sha256,
            engine: "existing".to_string(),
        },
        law_decision: args.law_decision.as_str().to_string(),
        stage3_max_retries: 0,
        checks_skipped: false,
        overall_pass: Some(overall_pass),
        review_status,
        stage2_last_reason: args.stage2_reason.clone(),
        counts: NormalizeCounts::default(),
        attempts: vec![report],
    };

    if let Some(report_path) = &args.report_path {
        write_json_pretty(report_path, &manifest)?;
        info!(report = %report_path.display(), "check report written");
    }

    info!(
        status = review_status.as_str(),
        overall = overall_pass,
        "check completed"
    );

    if args.strict && review_status == ReviewStatus::RejectedCheckFailed {
        bail!(
            "checks failed for {} against {}",
            args.stage2.display(),
            args.stage1.display()
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::LawDecision;
    use crate::util::{ensure_directory, read_text_file, write_text_file};
    use std::path::PathBuf;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("lawmd-check-tests").join(name);
        ensure_directory(&dir).unwrap();
        dir
    }

    fn check_args(stage1: PathBuf, stage2: PathBuf) -> CheckArgs {
        CheckArgs {
            stage1,
            stage2,
            law_decision: LawDecision::Auto,
            stage2_reason: "applied".to_string(),
            report_path: None,
            strict: false,
        }
    }

    #[test]
    fn check_command_writes_manifest() {
        let dir = scratch_dir("writes-manifest");
        let stage1 = dir.join("doc.stage1.md");
        let stage2 = dir.join("doc.stage2.md");
        let text = "# 标题\n### 第一章 总则\n##### 第一条\n正文。\n";
        write_text_file(&stage1, text).unwrap();
        write_text_file(&stage2, text).unwrap();

        let mut args = check_args(stage1, stage2);
        let report_path = dir.join("check.json");
        args.report_path = Some(report_path.clone());
        run(args).unwrap();

        let content = read_text_file(&report_path).unwrap();
        assert!(content.contains("\"review_status\": \"approved\""));
        assert!(content.contains("CHK-107"));
    }

    #[test]
    fn check_command_strict_fails_on_bad_stage2() {
        let dir = scratch_dir("strict-fails");
        let stage1 = dir.join("doc.stage1.md");
        let stage2 = dir.join("doc.stage2.md");
        write_text_file(&stage1, "# 标题\n### 第一章 总则\n##### 第一条\n正文。\n").unwrap();
        write_text_file(&stage2, "# 标题\n## 第一章 总则\n##### 第一条\n正文。\n").unwrap();

        let mut args = check_args(stage1.clone(), stage2.clone());
        args.strict = true;
        let error = run(args).unwrap_err();
        assert!(error.to_string().contains("checks failed"));

        let relaxed = check_args(stage1, stage2);
        run(relaxed).unwrap();
    }
}
