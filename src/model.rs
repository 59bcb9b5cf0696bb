use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Approved,
    RejectedNonLaw,
    RejectedCheckFailed,
}

impl ReviewStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ReviewStatus::Approved => "approved",
            ReviewStatus::RejectedNonLaw => "rejected_non_law",
            ReviewStatus::RejectedCheckFailed => "rejected_check_failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CheckStatus {
    Pass,
    Fail,
}

impl CheckStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CheckStatus::Pass => "PASS",
            CheckStatus::Fail => "FAIL",
        }
    }

    pub fn is_pass(self) -> bool {
        self == CheckStatus::Pass
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DivergenceEvidence {
    pub index: usize,
    pub old_char: String,
    pub new_char: String,
    pub old_context: String,
    pub new_context: String,
    pub old_len: usize,
    pub new_len: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckItem {
    pub id: String,
    pub name: String,
    pub status: CheckStatus,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub divergence: Option<DivergenceEvidence>,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct NormalizeCounts {
    pub title_count: usize,
    pub part_count: usize,
    pub chapter_count: usize,
    pub section_count: usize,
    pub article_count: usize,
    pub item_split_count: usize,
    pub space_cleanup_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct AttemptReport {
    pub attempt: usize,
    pub profile: String,
    pub timestamp: String,
    pub auto_fix_recheck: bool,
    pub stage_a_pass: bool,
    pub stage_b_pass: bool,
    pub overall_pass: bool,
    pub auto_fixable_fail: bool,
    pub fail_ids: Vec<String>,
    pub business_decision: ReviewStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reject_reason: Option<String>,
    pub checks: Vec<CheckItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InputDescriptor {
    pub path: String,
    pub sha256: String,
    pub engine: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckReportManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub generated_at: String,
    pub input: InputDescriptor,
    pub law_decision: String,
    pub stage3_max_retries: usize,
    pub checks_skipped: bool,
    pub overall_pass: Option<bool>,
    pub review_status: ReviewStatus,
    pub stage2_last_reason: String,
    pub counts: NormalizeCounts,
    pub attempts: Vec<AttemptReport>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn review_status_serializes_snake_case() {
        let value = serde_json::to_value(ReviewStatus::RejectedNonLaw).unwrap();
        assert_eq!(value, serde_json::json!("rejected_non_law"));
        assert_eq!(ReviewStatus::RejectedCheckFailed.as_str(), "rejected_check_failed");
    }

    #[test]
    fn check_status_serializes_uppercase() {
        let value = serde_json::to_value(CheckStatus::Fail).unwrap();
        assert_eq!(value, serde_json::json!("FAIL"));
        assert!(CheckStatus::Pass.is_pass());
        assert!(!CheckStatus::Fail.is_pass());
    }

    #[test]
    fn check_item_omits_empty_evidence() {
        let item = CheckItem {
            id: "CHK-105".to_string(),
            name: "Whitespace hygiene".to_string(),
            status: CheckStatus::Pass,
            detail: "no stray whitespace".to_string(),
            path: None,
            divergence: None,
        };
        let value = serde_json::to_value(&item).unwrap();
        assert!(value.get("path").is_none());
        assert!(value.get("divergence").is_none());
    }
}
