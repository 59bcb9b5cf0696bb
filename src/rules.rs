use anyhow::{Context, Result};
use regex::Regex;

pub const PAGE_MARKER_PREFIX: &str = "<!-- Page ";

const STRUCTURE_NUMERALS: &str = "零〇一二三四五六七八九十百千万两0-9";
const ITEM_NUMERALS: &str = "一二三四五六七八九十百千万零〇两";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructuralToken {
    Title,
    Part,
    Chapter,
    Section,
    Article,
    Item,
    Subitem,
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArticleParts<'a> {
    pub leading: &'a str,
    pub marker: &'a str,
    pub rest: &'a str,
}

#[derive(Debug)]
pub struct LineRules {
    part_marker: Regex,
    chapter_marker: Regex,
    section_marker: Regex,
    article_marker: Regex,
    item_marker: Regex,
    subitem_marker: Regex,
    footnote_lead: Regex,
    heading_prefix: Regex,
    canonical_heading: Regex,
    heading_body: Regex,
    heading_extract: Regex,
    heading_wellformed: Regex,
    trailing_space: Regex,
    standard_code: Regex,
    standard_keyword: Regex,
}

impl LineRules {
    pub fn new() -> Result<Self> {
        let part_marker = Regex::new(&format!(r"^\s*第[{STRUCTURE_NUMERALS}]+(?:编|分编)"))
            .context("failed to compile part marker regex")?;
        let chapter_marker = Regex::new(&format!(r"^\s*第[{STRUCTURE_NUMERALS}]+章"))
            .context("failed to compile chapter marker regex")?;
        let section_marker = Regex::new(&format!(r"^\s*第[{STRUCTURE_NUMERALS}]+节"))
            .context("failed to compile section marker regex")?;
        let article_marker = Regex::new(&format!(r"^(\s*)(第[{STRUCTURE_NUMERALS}]+条)(.*)$"))
            .context("failed to compile article marker regex")?;
        let item_marker = Regex::new(&format!(r"（[{ITEM_NUMERALS}]+）"))
            .context("failed to compile item marker regex")?;
        let subitem_marker = Regex::new(r"(?:\([0-9]{1,3}\)|[0-9]{1,3}[、\.．])")
            .context("failed to compile subitem marker regex")?;
        let footnote_lead = Regex::new(r"^\s*【[^】]+】")
            .context("failed to compile footnote lead regex")?;
        let heading_prefix = Regex::new(r"^#{1,6}[ \t]+")
            .context("failed to compile heading prefix regex")?;
        let canonical_heading = Regex::new(r"^#{1,6} ")
            .context("failed to compile canonical heading regex")?;
        let heading_body = Regex::new(r"^(#{1,6})[ \t　]*(.*)$")
            .context("failed to compile heading body regex")?;
        let heading_extract = Regex::new(r"^(#{1,6}) (.*)$")
            .context("failed to compile heading extract regex")?;
        let heading_wellformed = Regex::new(r"^#{1,5}( .*)?$")
            .context("failed to compile heading wellformed regex")?;
        let trailing_space = Regex::new(r"[ \t　]+$")
            .context("failed to compile trailing space regex")?;
        let standard_code = Regex::new(r"(?i)^\s*(?:GB(?:/T)?|DB|ISO|IEC|ASTM|JJF|T/)\b")
            .context("failed to compile standard code regex")?;
        let standard_keyword = Regex::new(r"(国家标准|行业标准|地方标准|团体标准)")
            .context("failed to compile standard keyword regex")?;

        Ok(Self {
            part_marker,
            chapter_marker,
            section_marker,
            article_marker,
            item_marker,
            subitem_marker,
            footnote_lead,
            heading_prefix,
            canonical_heading,
            heading_body,
            heading_extract,
            heading_wellformed,
            trailing_space,
            standard_code,
            standard_keyword,
        })
    }

    pub fn classify(&self, content: &str) -> StructuralToken {
        if self.part_marker.is_match(content) {
            return StructuralToken::Part;
        }
        if self.chapter_marker.is_match(content) {
            return StructuralToken::Chapter;
        }
        if self.section_marker.is_match(content) {
            return StructuralToken::Section;
        }
        if self.article_marker.is_match(content) {
            return StructuralToken::Article;
        }

        let trimmed = content.trim_start();
        if self.item_marker.find(trimmed).is_some_and(|m| m.start() == 0) {
            return StructuralToken::Item;
        }
        if self
            .subitem_marker
            .find(trimmed)
            .is_some_and(|m| m.start() == 0)
        {
            return StructuralToken::Subitem;
        }

        StructuralToken::Plain
    }

    pub fn article_parts<'a>(&self, content: &'a str) -> Option<ArticleParts<'a>> {
        let captures = self.article_marker.captures(content)?;
        let leading = captures.get(1)?.as_str();
        let marker = captures.get(2)?.as_str();
        let rest = captures.get(3)?.as_str();
        Some(ArticleParts {
            leading,
            marker,
            rest,
        })
    }

    pub fn is_footnote_lead(&self, text: &str) -> bool {
        self.footnote_lead.is_match(text)
    }

    pub fn strip_heading_prefix<'a>(&self, line: &'a str) -> &'a str {
        match self.heading_prefix.find(line) {
            Some(found) => &line[found.end()..],
            None => line,
        }
    }

    pub fn strip_canonical_prefix<'a>(&self, line: &'a str) -> &'a str {
        match self.canonical_heading.find(line) {
            Some(found) => &line[found.end()..],
            None => line,
        }
    }

    pub fn heading_parts<'a>(&self, line: &'a str) -> Option<(&'a str, &'a str)> {
        let captures = self.heading_body.captures(line)?;
        Some((captures.get(1)?.as_str(), captures.get(2)?.as_str()))
    }

    pub fn extract_heading<'a>(&self, line: &'a str) -> Option<(usize, &'a str)> {
        let captures = self.heading_extract.captures(line)?;
        let level = captures.get(1)?.as_str().len();
        Some((level, captures.get(2)?.as_str()))
    }

    pub fn heading_wellformed(&self, line: &str) -> bool {
        self.heading_wellformed.is_match(line)
    }

    pub fn enumeration_starts(&self, line: &str) -> Vec<usize> {
        let mut starts: Vec<usize> = self
            .item_marker
            .find_iter(line)
            .map(|m| m.start())
            .chain(self.subitem_marker.find_iter(line).map(|m| m.start()))
            .collect();
        starts.sort_unstable();
        starts.dedup();
        starts
    }

    pub fn enumeration_count(&self, line: &str) -> usize {
        self.item_marker.find_iter(line).count() + self.subitem_marker.find_iter(line).count()
    }

    pub fn has_trailing_space(&self, line: &str) -> bool {
        self.trailing_space.is_match(line)
    }

    pub fn strip_trailing_space<'a>(&self, line: &'a str) -> &'a str {
        match self.trailing_space.find(line) {
            Some(found) => &line[..found.start()],
            None => line,
        }
    }

    pub fn matches_standard_code(&self, line: &str) -> bool {
        self.standard_code.is_match(line)
    }

    pub fn has_standard_keyword(&self, line: &str) -> bool {
        self.standard_keyword.is_match(line)
    }
}
