//! # NWChem 计算适配器
//!
//! 对外的统一入口 `NwchemHarness`：
//! 查找可执行文件 -> 生成输入 -> 执行 -> 收集输出 -> 组装结果。
//!
//! 版本号按可执行文件路径缓存在实例内，实例存活期间不会失效。
//! 每个路径一个槽位：首个调用者运行探测，并发的其他调用者在槽位锁上等待，
//! 同一路径最多启动一次子进程。
//! `NwchemHarness` 是 `Sync` 的，批处理可在多个线程间共享同一个实例。
//!
//! ## 依赖关系
//! - 被 `commands/`, `batch/` 使用
//! - 使用本目录下全部子模块

pub mod assemble;
pub mod executor;
pub mod harvester;
pub mod input;
pub mod methods;

pub use executor::ExecutionOutcome;
pub use harvester::Harvest;
pub use input::JobDescriptor;

use crate::error::{HarnessError, Result};
use crate::models::{CalcRequest, CalcResult, JobConfig};

use std::collections::{BTreeMap, HashMap};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// 默认程序名
pub const PROGRAM: &str = "nwchem";

/// 指定可执行文件的环境变量
pub const EXECUTABLE_ENV: &str = "NWCHEM_EXECUTABLE";

const INSTALL_HINT: &str = "Please install via http://www.nwchem-sw.org/index.php/Download";

/// NWChem 报告输入错误时的标志文本
const INPUT_ERROR_MARKER: &str = "There is an error in the input file";

/// 版本探测使用的空输入文件
const VERSION_INPUT_FILE: &str = "v.nw";

/// 单个路径的版本槽位
type VersionSlot = Arc<Mutex<Option<String>>>;

/// NWChem 适配器
#[derive(Debug, Default)]
pub struct NwchemHarness {
    executable: Option<PathBuf>,
    version_cache: Mutex<HashMap<PathBuf, VersionSlot>>,
}

impl NwchemHarness {
    pub fn new() -> Self {
        Self::default()
    }

    /// 显式指定可执行文件，优先于环境变量与 PATH
    pub fn with_executable(executable: impl Into<PathBuf>) -> Self {
        NwchemHarness {
            executable: Some(executable.into()),
            ..Default::default()
        }
    }

    /// 查找可执行文件
    pub fn locate(&self) -> Result<PathBuf> {
        let explicit = self
            .executable
            .clone()
            .or_else(|| env::var_os(EXECUTABLE_ENV).map(PathBuf::from));

        let found = match explicit {
            Some(path) => resolve_program(&path),
            None => find_in_path(PROGRAM),
        };

        found.ok_or_else(|| HarnessError::NotFound {
            program: self
                .executable
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| PROGRAM.to_string()),
            hint: INSTALL_HINT.to_string(),
        })
    }

    /// NWChem 是否可用
    pub fn found(&self) -> bool {
        self.locate().is_ok()
    }

    /// 程序版本 `branch+revision`，按路径缓存
    pub fn get_version(&self) -> Result<String> {
        let exe = self.locate()?;
        let slot = self.version_slot(&exe)?;

        // 持有槽位锁直到探测结束，同路径的并发调用在此等待
        let mut cached = slot.lock().map_err(|_| poisoned())?;
        if let Some(version) = cached.as_ref() {
            return Ok(version.clone());
        }

        let version = query_version(&exe)?;
        info!(executable = %exe.display(), %version, "detected NWChem version");
        *cached = Some(version.clone());
        Ok(version)
    }

    fn version_slot(&self, exe: &Path) -> Result<VersionSlot> {
        let mut cache = self.version_cache.lock().map_err(|_| poisoned())?;
        Ok(cache.entry(exe.to_path_buf()).or_default().clone())
    }

    /// 生成作业描述（不运行）
    pub fn build_input(&self, request: &CalcRequest, config: &JobConfig) -> Result<JobDescriptor> {
        let exe = self
            .locate()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| PROGRAM.to_string());
        input::build_input(request, config, &exe)
    }

    /// 执行一次完整计算
    pub fn compute(&self, request: &CalcRequest, config: &JobConfig) -> Result<CalcResult> {
        let exe = self.locate()?;
        info!(
            executable = %exe.display(),
            driver = %request.driver,
            deriv = request.driver.derivative_int(),
            method = %request.model.method,
            "starting NWChem computation"
        );

        let version = self.get_version()?;
        let job = input::build_input(request, config, &exe.display().to_string())?;
        let outcome = executor::execute(&job)?;

        if outcome.stdout.contains(INPUT_ERROR_MARKER) {
            return Err(HarnessError::InputError(outcome.stdout));
        }

        let command = job.command.join(" ");
        if outcome.timed_out {
            return Err(HarnessError::TimedOut {
                command,
                seconds: config.timeout.unwrap_or_default(),
            });
        }
        if !outcome.success {
            return Err(HarnessError::ExecutionFailed {
                command,
                stdout: outcome.stdout,
                stderr: outcome.stderr,
            });
        }

        let outfiles = outcome.text_outfiles();
        let harvest = harvester::harvest(&request.molecule, &outcome.stdout, &outfiles)?;
        assemble::assemble(request, harvest, &version, outcome.stdout, outfiles)
    }
}

fn poisoned() -> HarnessError {
    HarnessError::Other("version cache poisoned".to_string())
}

/// 运行空输入，解析版本横幅
fn query_version(exe: &Path) -> Result<String> {
    let mut infiles = BTreeMap::new();
    infiles.insert(VERSION_INPUT_FILE.to_string(), String::new());

    let job = JobDescriptor {
        infiles,
        outfiles: Vec::new(),
        command: vec![exe.display().to_string(), VERSION_INPUT_FILE.to_string()],
        scratch_directory: None,
        timeout: None,
        keep_scratch: false,
    };

    let outcome = executor::execute(&job)?;
    if !outcome.success {
        return Err(HarnessError::VersionQuery(format!(
            "'{}' exited with failure\n{}",
            job.command.join(" "),
            outcome.stderr
        )));
    }

    harvester::parse_version(&outcome.stdout).ok_or_else(|| {
        HarnessError::VersionQuery(
            "'nwchem branch' or 'nwchem revision' missing from output".to_string(),
        )
    })
}

/// 含路径分隔符时直接检查文件，否则在 PATH 中查找
fn resolve_program(path: &Path) -> Option<PathBuf> {
    if path.components().count() > 1 {
        return is_executable(path).then(|| path.to_path_buf());
    }
    find_in_path(&path.to_string_lossy())
}

fn find_in_path(program: &str) -> Option<PathBuf> {
    let paths = env::var_os("PATH")?;
    let found = env::split_paths(&paths)
        .map(|dir| dir.join(program))
        .find(|candidate| is_executable(candidate));
    debug!(program, found = ?found, "searched PATH");
    found
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_executable() {
        let harness = NwchemHarness::with_executable("/nonexistent/dir/nwchem");
        assert!(!harness.found());
        match harness.locate().unwrap_err() {
            HarnessError::NotFound { program, hint } => {
                assert_eq!(program, "/nonexistent/dir/nwchem");
                assert!(hint.contains("nwchem-sw.org"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_build_input_without_nwchem() {
        use crate::models::molecule::fixtures::H2O;
        use crate::models::{Driver, Molecule};

        let harness = NwchemHarness::with_executable("/nonexistent/dir/nwchem");
        let mol = Molecule::from_text(H2O).unwrap();
        let req = CalcRequest::new(mol, Driver::Energy, "hf", "sto-3g");
        let job = harness.build_input(&req, &JobConfig::default()).unwrap();
        assert_eq!(job.command, vec!["nwchem", "nwchem.nw"]);
    }

    #[test]
    fn test_harness_is_sync() {
        fn assert_sync<T: Sync + Send>() {}
        assert_sync::<NwchemHarness>();
    }
}
