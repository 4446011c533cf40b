//! Attribute dictionary: tag -> (name, default VR).
//!
//! The table is a tab separated text file, one attribute per line:
//!
//! ```text
//! 0010,0010	Patient's Name	PN
//! 60xx,3000	Overlay Data	OB or OW
//! FFFE,E000	Item	-
//! ```
//!
//! An `x` in the tag stands for any hex digit and is used by repeating
//! groups; those entries are only consulted when no exact entry matches.

use std::{
    collections::HashMap,
    io::{self, BufRead},
    path::Path,
};

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::DicomError;
use crate::model::{Tag, Vr};
use crate::util;
use crate::CommonResult;

const STANDARD_TAG_MAPPING: &str = include_str!("../data/tag_mapping.txt");

lazy_static! {
    static ref STANDARD_DICTIONARY: AttributeDictionary =
        AttributeDictionary::parse(STANDARD_TAG_MAPPING)
            .expect("embedded tag mapping is well-formed");
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DictionaryEntry {
    pub name: String,
    /// `None` for item and delimitation tags
    pub vr: Option<Vr>,
}

#[derive(Debug, Clone, Default)]
pub struct AttributeDictionary {
    full_match_mapping: HashMap<Tag, DictionaryEntry>,
    partial_match_mapping: Vec<(Regex, DictionaryEntry)>,
}

impl AttributeDictionary {
    /// Built-in table shipped with the crate.
    pub fn standard() -> &'static AttributeDictionary {
        &STANDARD_DICTIONARY
    }

    pub fn parse(text: &str) -> CommonResult<Self> {
        let mut dictionary = AttributeDictionary::default();
        dictionary.extend_from_lines(text.lines().map(|line| Ok(line.to_string())))?;

        Ok(dictionary)
    }

    /// Built-in table extended with the entries of `path`.
    ///
    /// Entries in the file replace built-in ones for the same tag.
    pub fn load(path: &Path) -> CommonResult<Self> {
        let file = util::get_file(path)?;
        let reader = io::BufReader::new(file);

        let mut dictionary = Self::standard().clone();
        dictionary.extend_from_lines(reader.lines())?;

        Ok(dictionary)
    }

    fn extend_from_lines(
        &mut self,
        lines: impl Iterator<Item = io::Result<String>>,
    ) -> CommonResult<()> {
        let mut partial = Vec::new();

        for (index, line) in lines.enumerate() {
            let line = line?;
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }

            let content_vec = line.split('\t').collect::<Vec<&str>>();
            if content_vec.len() < 2 {
                return Err(DicomError::Lookup(format!(
                    "line {}: expected tag and name separated by a tab",
                    index + 1
                )));
            }

            let standard_tag = content_vec[0].trim();
            let entry = DictionaryEntry {
                name: content_vec[1].trim().to_string(),
                vr: parse_vr(content_vec.get(2).copied())
                    .map_err(|e| DicomError::Lookup(format!("line {}: {}", index + 1, e)))?,
            };

            if standard_tag.contains('x') {
                partial.push((wildcard_regex(standard_tag, index + 1)?, entry));
            } else {
                let tag = parse_tag(standard_tag).ok_or_else(|| {
                    DicomError::Lookup(format!(
                        "line {}: invalid tag {:?}",
                        index + 1,
                        standard_tag
                    ))
                })?;
                self.full_match_mapping.insert(tag, entry);
            }
        }

        // 后加载的通配条目优先
        partial.append(&mut self.partial_match_mapping);
        self.partial_match_mapping = partial;

        Ok(())
    }

    pub fn lookup(&self, tag: Tag) -> Option<&DictionaryEntry> {
        if let Some(entry) = self.full_match_mapping.get(&tag) {
            return Some(entry);
        }

        if self.partial_match_mapping.is_empty() {
            return None;
        }

        let key = util::format_tag(tag.group, tag.element);
        self.partial_match_mapping
            .iter()
            .find(|(regex, _)| regex.is_match(&key))
            .map(|(_, entry)| entry)
    }

    pub fn len(&self) -> usize {
        self.full_match_mapping.len() + self.partial_match_mapping.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn parse_vr(field: Option<&str>) -> Result<Option<Vr>, String> {
    match field.map(str::trim) {
        None | Some("") | Some("-") => Ok(None),
        Some(vr) => vr.parse::<Vr>().map(Some),
    }
}

fn parse_tag(text: &str) -> Option<Tag> {
    let (group, element) = text.split_once(',')?;
    if group.len() != 4 || element.len() != 4 {
        return None;
    }

    Some(Tag::new(
        u16::from_str_radix(group, 16).ok()?,
        u16::from_str_radix(element, 16).ok()?,
    ))
}

fn wildcard_regex(text: &str, line: usize) -> CommonResult<Regex> {
    let valid = text.len() == 9
        && text.chars().enumerate().all(|(i, c)| {
            if i == 4 {
                c == ','
            } else {
                c == 'x' || c.is_ascii_hexdigit()
            }
        });
    if !valid {
        return Err(DicomError::Lookup(format!(
            "line {}: invalid tag pattern {:?}",
            line, text
        )));
    }

    let pattern = text
        .chars()
        .map(|c| match c {
            'x' => "[0-9A-F]".to_string(),
            c => c.to_ascii_uppercase().to_string(),
        })
        .collect::<String>();

    Regex::new(&format!("^{}$", pattern))
        .map_err(|e| DicomError::Lookup(format!("line {}: {}", line, e)))
}
