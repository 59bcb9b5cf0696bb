use crate::model::DivergenceEvidence;
use crate::rules::LineRules;

pub fn canonical(rules: &LineRules, text: &str) -> String {
    let mut out = String::with_capacity(text.len());

    for line in text.lines() {
        let stripped = rules.strip_canonical_prefix(line);
        out.extend(stripped.chars().filter(|c| !c.is_whitespace()));
    }

    out
}

pub fn content_equal(rules: &LineRules, old_text: &str, new_text: &str) -> bool {
    canonical(rules, old_text) == canonical(rules, new_text)
}

pub fn first_divergence(
    rules: &LineRules,
    old_text: &str,
    new_text: &str,
) -> Option<DivergenceEvidence> {
    let old_chars: Vec<char> = canonical(rules, old_text).chars().collect();
    let new_chars: Vec<char> = canonical(rules, new_text).chars().collect();
    if old_chars == new_chars {
        return None;
    }

    let shared = old_chars.len().min(new_chars.len());
    let mut index = shared;
    for i in 0..shared {
        if old_chars[i] != new_chars[i] {
            index = i;
            break;
        }
    }

    Some(DivergenceEvidence {
        index,
        old_char: char_at(&old_chars, index),
        new_char: char_at(&new_chars, index),
        old_context: context_window(&old_chars, index),
        new_context: context_window(&new_chars, index),
        old_len: old_chars.len(),
        new_len: new_chars.len(),
    })
}

fn char_at(chars: &[char], index: usize) -> String {
    chars.get(index).map(|c| c.to_string()).unwrap_or_default()
}

fn context_window(chars: &[char], index: usize) -> String {
    let start = index.saturating_sub(40);
    let end = (index + 80).min(chars.len());
    if start >= end {
        return String::new();
    }
    chars[start..end].iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> LineRules {
        LineRules::new().unwrap()
    }

    #[test]
    fn canonical_strips_heading_prefixes_and_whitespace() {
        let rules = rules();
        let text = "# 民法典\n### 第一章　总则\n第一条 为了保护民事主体\n";
        assert_eq!(canonical(&rules, text), "民法典第一章总则第一条为了保护民事主体");
    }

    #[test]
    fn canonical_keeps_hashes_without_separator() {
        let rules = rules();
        assert_eq!(canonical(&rules, "##第一章\n"), "##第一章");
        assert_eq!(canonical(&rules, "## 第一章\n"), "第一章");
    }

    #[test]
    fn content_equal_ignores_layout_changes() {
        let rules = rules();
        let old_text = "第一条 甲方应当：（一）交付（二）付款\n";
        let new_text = "##### 第一条\n甲方应当：（一）交付\n（二）付款\n";
        assert!(content_equal(&rules, old_text, new_text));
    }

    #[test]
    fn divergence_reports_char_index_and_context() {
        let rules = rules();
        let old_text = "第一条 甲方应当交付货物\n";
        let new_text = "第一条 甲方应当交付货品\n";
        let evidence = first_divergence(&rules, old_text, new_text).unwrap();
        assert_eq!(evidence.index, 10);
        assert_eq!(evidence.old_char, "物");
        assert_eq!(evidence.new_char, "品");
        assert_eq!(evidence.old_len, 11);
        assert_eq!(evidence.new_len, 11);
        assert!(evidence.old_context.contains("货物"));
        assert!(evidence.new_context.contains("货品"));
    }

    #[test]
    fn divergence_handles_truncated_text() {
        let rules = rules();
        let old_text = "第一条 完整条文内容\n";
        let new_text = "第一条 完整条文\n";
        let evidence = first_divergence(&rules, old_text, new_text).unwrap();
        assert_eq!(evidence.index, 7);
        assert_eq!(evidence.old_char, "内");
        assert_eq!(evidence.new_char, "");
        assert_eq!(evidence.old_len, 9);
        assert_eq!(evidence.new_len, 7);
    }

    #[test]
    fn equal_texts_yield_no_divergence() {
        let rules = rules();
        assert!(first_divergence(&rules, "第一条 内容\n", "##### 第一条\n内容\n").is_none());
    }
}
