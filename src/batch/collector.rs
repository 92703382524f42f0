//! # 请求文件收集器
//!
//! 根据输入路径和模式收集待计算的请求文件。
//!
//! ## 功能
//! - 支持单文件和目录输入
//! - glob 模式匹配（逗号分隔的多模式）
//! - 排除模式（默认排除已生成的结果文件）
//! - 递归目录搜索
//!
//! ## 依赖关系
//! - 被 `commands/batch.rs` 调用
//! - 使用 `walkdir` 遍历目录, `glob` 匹配文件名

use glob::Pattern;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{HarnessError, Result};

/// 结果文件后缀
pub const RESULT_SUFFIX: &str = ".result.json";

/// 文件收集器
pub struct FileCollector {
    input: PathBuf,
    patterns: Vec<Pattern>,
    excludes: Vec<Pattern>,
    recursive: bool,
}

impl FileCollector {
    /// 默认收集 `*.json`，排除 `*.result.json`
    pub fn new(input: PathBuf) -> Self {
        Self {
            input,
            patterns: vec![Pattern::new("*.json").expect("valid default pattern")],
            excludes: vec![
                Pattern::new(&format!("*{}", RESULT_SUFFIX)).expect("valid default pattern"),
            ],
            recursive: false,
        }
    }

    /// 设置匹配模式（逗号分隔）
    pub fn with_pattern(mut self, pattern: &str) -> Result<Self> {
        let patterns = parse_patterns(pattern)?;
        if !patterns.is_empty() {
            self.patterns = patterns;
        }
        Ok(self)
    }

    /// 追加排除模式（逗号分隔）
    pub fn with_exclude(mut self, pattern: &str) -> Result<Self> {
        self.excludes.extend(parse_patterns(pattern)?);
        Ok(self)
    }

    /// 设置是否递归搜索
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// 收集所有匹配的文件（按路径排序）；单文件输入不做模式过滤
    pub fn collect(&self) -> Vec<PathBuf> {
        if self.input.is_file() {
            return vec![self.input.clone()];
        }

        if !self.input.is_dir() {
            return vec![];
        }

        let max_depth = if self.recursive { usize::MAX } else { 1 };

        let mut files: Vec<PathBuf> = WalkDir::new(&self.input)
            .max_depth(max_depth)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|entry| self.matches(entry.path()))
            .map(|e| e.path().to_path_buf())
            .collect();

        files.sort();
        files
    }

    fn matches(&self, path: &Path) -> bool {
        let filename = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name,
            None => return false,
        };

        self.patterns.iter().any(|p| p.matches(filename))
            && !self.excludes.iter().any(|p| p.matches(filename))
    }
}

fn parse_patterns(pattern: &str) -> Result<Vec<Pattern>> {
    pattern
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| {
            Pattern::new(s)
                .map_err(|e| HarnessError::Other(format!("Invalid pattern '{}': {}", s, e)))
        })
        .collect()
}

/// 请求文件对应的结果文件路径：`water.json` -> `water.result.json`
pub fn result_path(request: &Path) -> PathBuf {
    let stem = request
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("request");
    request.with_file_name(format!("{}{}", stem, RESULT_SUFFIX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), "{}").unwrap();
    }

    #[test]
    fn test_collect_skips_results() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "water.json");
        touch(dir.path(), "water.result.json");
        touch(dir.path(), "nh2.json");
        touch(dir.path(), "notes.txt");

        let files = FileCollector::new(dir.path().to_path_buf()).collect();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["nh2.json", "water.json"]);
    }

    #[test]
    fn test_recursive_and_patterns() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("sub");
        fs::create_dir(&sub).unwrap();
        touch(dir.path(), "a.json");
        touch(&sub, "b.json");
        touch(&sub, "c.req");

        let flat = FileCollector::new(dir.path().to_path_buf()).collect();
        assert_eq!(flat.len(), 1);

        let deep = FileCollector::new(dir.path().to_path_buf())
            .with_pattern("*.json, *.req")
            .unwrap()
            .with_exclude("a.*")
            .unwrap()
            .recursive(true)
            .collect();
        assert_eq!(deep.len(), 2);
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(FileCollector::new(PathBuf::from(".")).with_pattern("[").is_err());
    }

    #[test]
    fn test_result_path() {
        assert_eq!(
            result_path(Path::new("/jobs/water.json")),
            PathBuf::from("/jobs/water.result.json")
        );
    }
}
