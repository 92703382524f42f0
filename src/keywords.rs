//! # NWChem 关键字
//!
//! 请求中的关键字是扁平的 `key` / `group__key` / `group__sub__key`
//! 映射。这里在边界上校验键名（未知的全局键或模块组直接拒绝），
//! 并负责把关键字写成 NWChem 的输入块：
//!
//! ```text
//! charge 0
//! memory 2147483648 byte
//!
//! basis spherical
//!   H library aug-cc-pvdz
//! end
//!
//! scf
//!   nopen 1
//!   uhf
//! end
//! ```
//!
//! ## 依赖关系
//! - 被 `models/request.rs`, `harness/input.rs` 使用
//! - 无外部模块依赖

use crate::error::{HarnessError, Result};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// 允许的全局关键字
pub const GLOBAL_KEYS: &[&str] = &["charge", "memory", "qc_module", "print", "title"];

/// 允许的模块组
pub const GROUPS: &[&str] = &[
    "basis", "ccsd", "dft", "driver", "freq", "geometry", "mp2", "property", "scf", "set", "tce",
];

/// 写在组标题行上的布尔开关
const HEADER_FLAGS: &[(&str, &str)] = &[
    ("basis", "spherical"),
    ("basis", "cartesian"),
    ("basis", "print"),
    ("basis", "noprint"),
    ("basis", "rel"),
];

/// 关键字取值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeywordValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<KeywordValue>),
}

impl fmt::Display for KeywordValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeywordValue::Bool(b) => write!(f, "{}", b),
            KeywordValue::Int(i) => write!(f, "{}", i),
            KeywordValue::Float(x) => write!(f, "{}", x),
            KeywordValue::Str(s) => write!(f, "{}", s),
            KeywordValue::List(items) => {
                let joined = items
                    .iter()
                    .map(|v| v.to_string())
                    .collect::<Vec<_>>()
                    .join(" ");
                write!(f, "{}", joined)
            }
        }
    }
}

impl From<bool> for KeywordValue {
    fn from(b: bool) -> Self {
        KeywordValue::Bool(b)
    }
}

impl From<i64> for KeywordValue {
    fn from(i: i64) -> Self {
        KeywordValue::Int(i)
    }
}

impl From<f64> for KeywordValue {
    fn from(x: f64) -> Self {
        KeywordValue::Float(x)
    }
}

impl From<&str> for KeywordValue {
    fn from(s: &str) -> Self {
        KeywordValue::Str(s.to_string())
    }
}

impl From<String> for KeywordValue {
    fn from(s: String) -> Self {
        KeywordValue::Str(s)
    }
}

/// 计算引擎选择（`qc_module` 关键字）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Engine {
    /// 常规模块 (scf, dft, mp2, ccsd)
    #[default]
    Default,
    /// Tensor Contraction Engine
    Tce,
}

impl FromStr for Engine {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "tce" => Ok(Engine::Tce),
            "" | "default" | "nwchem" => Ok(Engine::Default),
            other => Err(HarnessError::InvalidKeyword {
                key: "qc_module".to_string(),
                reason: format!("unknown module '{}' (expected 'tce' or 'default')", other),
            }),
        }
    }
}

impl TryFrom<&KeywordValue> for Engine {
    type Error = HarnessError;

    fn try_from(value: &KeywordValue) -> Result<Self> {
        match value {
            KeywordValue::Bool(true) => Ok(Engine::Tce),
            KeywordValue::Bool(false) => Ok(Engine::Default),
            KeywordValue::Str(s) => s.parse(),
            other => Err(HarnessError::InvalidKeyword {
                key: "qc_module".to_string(),
                reason: format!("expected a boolean or module name, got '{}'", other),
            }),
        }
    }
}

/// 已校验的关键字表（键名有序，保证输出确定）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, KeywordValue>",
    into = "BTreeMap<String, KeywordValue>"
)]
pub struct Keywords {
    entries: BTreeMap<String, KeywordValue>,
}

impl From<Keywords> for BTreeMap<String, KeywordValue> {
    fn from(keywords: Keywords) -> Self {
        keywords.entries
    }
}

impl TryFrom<BTreeMap<String, KeywordValue>> for Keywords {
    type Error = HarnessError;

    fn try_from(map: BTreeMap<String, KeywordValue>) -> Result<Self> {
        let mut keywords = Keywords::default();
        for (key, value) in map {
            keywords.insert(&key, value)?;
        }
        Ok(keywords)
    }
}

impl Keywords {
    pub fn new() -> Self {
        Self::default()
    }

    /// 插入用户关键字，键名转为小写
    pub fn insert(&mut self, key: &str, value: impl Into<KeywordValue>) -> Result<()> {
        self.set_verbatim(&key.to_lowercase(), value.into())
    }

    /// 链式插入
    pub fn with(mut self, key: &str, value: impl Into<KeywordValue>) -> Result<Self> {
        self.insert(key, value)?;
        Ok(self)
    }

    /// 插入关键字并保留键名大小写（基组的元素标签需要）
    pub(crate) fn set_verbatim(&mut self, key: &str, value: KeywordValue) -> Result<()> {
        validate_key(key)?;
        if key == "qc_module" {
            Engine::try_from(&value)?;
        }
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&KeywordValue> {
        self.entries.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<KeywordValue> {
        self.entries.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &KeywordValue)> {
        self.entries.iter()
    }

    /// 合并另一组关键字，后者覆盖同名键
    pub fn extend(&mut self, other: Keywords) {
        self.entries.extend(other.entries);
    }

    /// 取出并解析 `qc_module`
    pub fn take_engine(&mut self) -> Result<Engine> {
        match self.entries.remove("qc_module") {
            Some(value) => Engine::try_from(&value),
            None => Ok(Engine::Default),
        }
    }
}

/// 校验键名语法与已知模块
fn validate_key(key: &str) -> Result<()> {
    let invalid = |reason: String| HarnessError::InvalidKeyword {
        key: key.to_string(),
        reason,
    };

    let nesting: Vec<&str> = key.split("__").collect();
    if nesting.iter().any(|part| part.trim().is_empty()) {
        return Err(invalid("empty key segment".to_string()));
    }

    match nesting.len() {
        1 => {
            if !GLOBAL_KEYS.contains(&key) {
                return Err(invalid(format!(
                    "unknown global keyword (expected one of: {})",
                    GLOBAL_KEYS.join(", ")
                )));
            }
        }
        2 | 3 => {
            let group = nesting[0];
            if !GROUPS.contains(&group) {
                return Err(invalid(format!(
                    "unknown module '{}' (expected one of: {})",
                    group,
                    GROUPS.join(", ")
                )));
            }
        }
        n => {
            return Err(invalid(format!(
                "nesting depth {} exceeds group__sub__key",
                n
            )))
        }
    }

    Ok(())
}

/// 单个关键字行；`false` 返回 `None`（不输出）
fn format_keyword(key: &str, value: &KeywordValue) -> Option<String> {
    match value {
        KeywordValue::Bool(true) => Some(key.to_string()),
        KeywordValue::Bool(false) => None,
        _ if key == "memory" => Some(format!("memory {} byte", value)),
        _ => Some(format!("{} {}", key, value)),
    }
}

#[derive(Default)]
struct GroupBlock {
    header: Vec<String>,
    lines: Vec<String>,
}

/// 将关键字写成 NWChem 输入块
pub fn format_keywords(keywords: &Keywords) -> String {
    let mut globals: Vec<String> = Vec::new();
    let mut groups: BTreeMap<&str, GroupBlock> = BTreeMap::new();

    for (key, value) in keywords.iter() {
        let nesting: Vec<&str> = key.split("__").collect();
        match nesting.as_slice() {
            [single] => globals.extend(format_keyword(single, value)),
            [group, name] => {
                let block = groups.entry(*group).or_default();
                let is_flag = HEADER_FLAGS
                    .iter()
                    .any(|(g, f)| g == group && f.eq_ignore_ascii_case(name));
                if is_flag {
                    if let KeywordValue::Bool(true) = value {
                        block.header.push(name.to_lowercase());
                    }
                } else {
                    block.lines.extend(format_keyword(name, value));
                }
            }
            [group, sub, name] => {
                let block = groups.entry(*group).or_default();
                if let Some(line) = format_keyword(name, value) {
                    block.lines.push(format!("{} {}", sub, line));
                }
            }
            _ => {}
        }
    }

    let mut sections: Vec<String> = Vec::new();
    if !globals.is_empty() {
        sections.push(globals.join("\n") + "\n");
    }

    for (group, block) in groups {
        if block.header.is_empty() && block.lines.is_empty() {
            continue;
        }

        let mut text = String::from(group);
        for flag in &block.header {
            text.push(' ');
            text.push_str(flag);
        }
        text.push('\n');
        for line in &block.lines {
            text.push_str("  ");
            text.push_str(line);
            text.push('\n');
        }
        text.push_str("end\n");
        sections.push(text);
    }

    sections.join("\n") + "\n"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_lowercased() {
        let kw = Keywords::new().with("SCF__UHF", true).unwrap();
        assert!(kw.contains_key("scf__uhf"));
    }

    #[test]
    fn test_unknown_global_rejected() {
        let mut kw = Keywords::new();
        let err = kw.insert("scf_type", "df").unwrap_err();
        assert!(matches!(err, HarnessError::InvalidKeyword { .. }));
    }

    #[test]
    fn test_unknown_group_rejected() {
        let mut kw = Keywords::new();
        assert!(kw.insert("contrl__scftyp", "uhf").is_err());
    }

    #[test]
    fn test_deep_nesting_rejected() {
        let mut kw = Keywords::new();
        assert!(kw.insert("tce__a__b__c", 1i64).is_err());
        assert!(kw.insert("scf____uhf", true).is_err());
    }

    #[test]
    fn test_engine() {
        let mut kw = Keywords::new().with("qc_module", "TCE").unwrap();
        assert_eq!(kw.take_engine().unwrap(), Engine::Tce);
        assert!(!kw.contains_key("qc_module"));

        let mut kw = Keywords::new().with("qc_module", true).unwrap();
        assert_eq!(kw.take_engine().unwrap(), Engine::Tce);

        assert!(Keywords::new().with("qc_module", "psi4").is_err());
        assert_eq!(Keywords::new().take_engine().unwrap(), Engine::Default);
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: std::result::Result<Keywords, _> =
            serde_json::from_str(r#"{"basis__spherical": true, "scf__maxiter": 50}"#);
        assert_eq!(ok.unwrap().len(), 2);

        let bad: std::result::Result<Keywords, _> = serde_json::from_str(r#"{"mp2_type": "conv"}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn test_format_groups() {
        let mut kw = Keywords::new();
        kw.insert("basis__spherical", true).unwrap();
        kw.set_verbatim("basis__H", "library aug-cc-pvdz".into()).unwrap();
        kw.insert("scf__uhf", true).unwrap();
        kw.insert("scf__nopen", 1i64).unwrap();
        kw.insert("scf__rohf", false).unwrap();
        kw.insert("charge", 0i64).unwrap();
        kw.insert("memory", 1024i64).unwrap();

        let text = format_keywords(&kw);
        let expected = "charge 0\nmemory 1024 byte\n\n\
                        basis spherical\n  H library aug-cc-pvdz\nend\n\n\
                        scf\n  nopen 1\n  uhf\nend\n\n";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_basis_header_flags() {
        let mut kw = Keywords::new();
        kw.insert("basis__spherical", true).unwrap();
        kw.insert("basis__rel", true).unwrap();
        kw.insert("basis__noprint", false).unwrap();
        kw.set_verbatim("basis__Au", "library stuttgart_rlc_ecp".into()).unwrap();

        let text = format_keywords(&kw);
        assert_eq!(
            text,
            "basis rel spherical\n  Au library stuttgart_rlc_ecp\nend\n\n"
        );
    }

    #[test]
    fn test_format_three_level_and_list() {
        let mut kw = Keywords::new();
        kw.insert(
            "dft__grid__lebedev",
            KeywordValue::List(vec![KeywordValue::Int(99), KeywordValue::Int(14)]),
        )
        .unwrap();
        let text = format_keywords(&kw);
        assert_eq!(text, "dft\n  grid lebedev 99 14\nend\n\n");
    }

    #[test]
    fn test_format_empty() {
        assert_eq!(format_keywords(&Keywords::new()), "\n");
    }
}
