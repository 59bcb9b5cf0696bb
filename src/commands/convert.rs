use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use chrono::Utc;
use tracing::info;

use crate::cli::{ArtifactLevel, ConvertArgs};
use crate::extract;
use crate::model::{CheckReportManifest, InputDescriptor, ReviewStatus};
use crate::pipeline::{self, PipelineConfig};
use crate::report;
use crate::rules::LineRules;
use crate::util::{
    copy_file, now_utc_string, remove_file_if_exists, sha256_file, utc_compact_string,
    write_json_pretty,
};

pub fn run(args: ConvertArgs) -> Result<()> {
    let run_id = format!("run-{}", utc_compact_string(Utc::now()));

    if !args.input.exists() {
        bail!("input file does not exist: {}", args.input.display());
    }
    if args.out.is_some() && args.out_dir.is_some() {
        bail!("--out and --out-dir are mutually exclusive");
    }

    let paths = derive_paths(&args.input, args.out.as_deref(), args.out_dir.as_deref())?;

    info!(
        run_id = %run_id,
        input = %args.input.display(),
        law_decision = args.law_decision.as_str(),
        "starting conversion"
    );

    let engine = extract::extract_stage1(&args.input, &paths.stage1)?;
    pipeline::prepare_stage2(&paths.stage1, &paths.stage2)?;

    let rules = LineRules::new()?;
    let config = PipelineConfig {
        law_decision: args.law_decision,
        skip_checks: args.skip_stage3_check,
        max_retries: args.stage3_max_retries,
    };
    let outcome = pipeline::run_pipeline(&rules, &paths.stage1, &paths.stage2, &config)?;

    let review_status = outcome.review_status;
    let manifest = CheckReportManifest {
        manifest_version: 1,
        run_id,
        generated_at: now_utc_string(),
        input: InputDescriptor {
            path: args.input.display().to_string(),
            sha256: sha256_file(&args.input)?,
            engine: engine.to_string(),
        },
        law_decision: args.law_decision.as_str().to_string(),
        stage3_max_retries: args.stage3_max_retries,
        checks_skipped: outcome.checks_skipped,
        overall_pass: outcome.final_pass,
        review_status,
        stage2_last_reason: outcome.stage2_last_reason,
        counts: outcome.counts,
        attempts: outcome.attempts,
    };
    write_json_pretty(&paths.check_report, &manifest)?;

    let approved = review_status == ReviewStatus::Approved;
    if approved {
        copy_file(&paths.stage2, &paths.deliverable)?;
    } else {
        remove_file_if_exists(&paths.deliverable)?;
    }

    report::write_review_report(
        &paths.review_report,
        &manifest,
        approved.then_some(paths.deliverable.as_path()),
    )?;

    apply_artifact_policy(&paths, args.artifact_level, approved)?;

    info!(
        status = review_status.as_str(),
        review = %paths.review_report.display(),
        "conversion finished"
    );

    if !args.no_stage3_strict && review_status == ReviewStatus::RejectedCheckFailed {
        bail!(
            "stage3 checks failed for {}, see {}",
            args.input.display(),
            paths.review_report.display()
        );
    }

    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ConvertPaths {
    stage1: PathBuf,
    stage2: PathBuf,
    check_report: PathBuf,
    review_report: PathBuf,
    deliverable: PathBuf,
}

fn derive_paths(
    input: &Path,
    out: Option<&Path>,
    out_dir: Option<&Path>,
) -> Result<ConvertPaths> {
    let Some(input_stem) = input.file_stem().and_then(|stem| stem.to_str()) else {
        bail!("input filename is not valid utf-8: {}", input.display());
    };

    let base = match (out, out_dir) {
        (Some(out), _) => out.to_path_buf(),
        (None, Some(dir)) => dir.join(input_stem).join(format!("{input_stem}.md")),
        (None, None) => input
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join("markdown")
            .join(input_stem)
            .join(format!("{input_stem}.md")),
    };
    let Some(stem) = base.file_stem().and_then(|stem| stem.to_str()) else {
        bail!("output filename is not valid utf-8: {}", base.display());
    };

    Ok(ConvertPaths {
        stage1: base.with_file_name(format!("{stem}.stage1.md")),
        stage2: base.with_file_name(format!("{stem}.stage2.md")),
        check_report: base.with_file_name(format!("{stem}.stage3-check.json")),
        review_report: base.with_file_name(format!("{stem}.review.md")),
        deliverable: base.with_file_name(format!("{stem}.final.md")),
    })
}

fn apply_artifact_policy(
    paths: &ConvertPaths,
    level: ArtifactLevel,
    approved: bool,
) -> Result<()> {
    if level != ArtifactLevel::Minimal || !approved {
        return Ok(());
    }

    remove_file_if_exists(&paths.stage1)?;
    remove_file_if_exists(&paths.stage2)?;
    remove_file_if_exists(&paths.check_report)?;
    info!("intermediate artifacts removed");

    Ok(())
}
