//! # 子进程执行器
//!
//! 在私有临时目录中运行外部程序：写入输入文件、捕获 stdout/stderr、
//! 取回声明的输出文件。这里不解释程序输出，成功与否只看退出码。
//!
//! Unix 上子进程独占一个进程组，超时时整组一起终止，
//! `mpirun` 启动的各个进程不会残留。
//!
//! ## 依赖关系
//! - 被 `harness/mod.rs` 使用
//! - 使用 `harness/input.rs` 的 `JobDescriptor`
//! - 使用 `tempfile` 创建临时目录

use super::input::JobDescriptor;
use crate::error::{HarnessError, Result};

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const STDOUT_FILE: &str = "stdout.log";
const STDERR_FILE: &str = "stderr.log";
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// 执行结果
#[derive(Debug, Clone, Default)]
pub struct ExecutionOutcome {
    /// 退出码为零
    pub success: bool,
    /// 因超时被终止
    pub timed_out: bool,
    pub stdout: String,
    pub stderr: String,
    /// 取回的输出文件（原始字节）
    pub outfiles: BTreeMap<String, Vec<u8>>,
    pub elapsed: Duration,
    /// 保留下来的临时目录
    pub scratch_path: Option<PathBuf>,
}

impl ExecutionOutcome {
    /// 可按 UTF-8 解码的输出文件
    pub fn text_outfiles(&self) -> BTreeMap<String, String> {
        self.outfiles
            .iter()
            .filter_map(|(name, bytes)| {
                String::from_utf8(bytes.clone())
                    .ok()
                    .map(|text| (name.clone(), text))
            })
            .collect()
    }
}

/// 执行作业
pub fn execute(job: &JobDescriptor) -> Result<ExecutionOutcome> {
    let (program, args) = job
        .command
        .split_first()
        .ok_or_else(|| HarnessError::Other("empty command line".to_string()))?;

    let scratch = create_scratch(job.scratch_directory.as_deref())?;
    debug!(scratch = %scratch.path().display(), "created scratch directory");

    for (name, content) in &job.infiles {
        let path = scratch.path().join(name);
        fs::write(&path, content).map_err(|e| HarnessError::FileWriteError {
            path: path.display().to_string(),
            source: e,
        })?;
    }

    let stdout_path = scratch.path().join(STDOUT_FILE);
    let stderr_path = scratch.path().join(STDERR_FILE);
    let stdout_file = create_file(&stdout_path)?;
    let stderr_file = create_file(&stderr_path)?;

    let command_line = job.command.join(" ");
    info!(command = %command_line, "launching");

    let start = Instant::now();
    let mut cmd = Command::new(program);
    cmd.args(args)
        .current_dir(scratch.path())
        .stdin(Stdio::null())
        .stdout(stdout_file)
        .stderr(stderr_file);
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }
    let spawned = cmd.spawn();

    let mut outcome = ExecutionOutcome::default();

    match spawned {
        Ok(mut child) => match wait_with_timeout(&mut child, job.timeout)? {
            Some(status) => {
                outcome.success = status.success();
                if !status.success() {
                    warn!(%status, command = %command_line, "program exited with failure");
                }
            }
            None => {
                outcome.timed_out = true;
                warn!(command = %command_line, "program killed after timeout");
            }
        },
        Err(e) => {
            warn!(error = %e, "failed to spawn {}", program);
            outcome.stderr = format!("Failed to run {}: {}\n", program, e);
        }
    }
    outcome.elapsed = start.elapsed();

    outcome.stdout.push_str(&read_lossy(&stdout_path));
    outcome.stderr.push_str(&read_lossy(&stderr_path));

    for name in &job.outfiles {
        let path = scratch.path().join(name);
        if let Ok(bytes) = fs::read(&path) {
            outcome.outfiles.insert(name.clone(), bytes);
        }
    }

    info!(
        success = outcome.success,
        elapsed_s = outcome.elapsed.as_secs_f64(),
        retained = outcome.outfiles.len(),
        "execution finished"
    );

    if job.keep_scratch {
        let kept = scratch.keep();
        info!(scratch = %kept.display(), "scratch directory kept");
        outcome.scratch_path = Some(kept);
    }

    Ok(outcome)
}

/// 创建私有临时目录
fn create_scratch(parent: Option<&Path>) -> Result<tempfile::TempDir> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("nwchem_");

    match parent {
        Some(dir) => {
            fs::create_dir_all(dir).map_err(|e| HarnessError::FileWriteError {
                path: dir.display().to_string(),
                source: e,
            })?;
            builder
                .tempdir_in(dir)
                .map_err(|e| HarnessError::FileWriteError {
                    path: dir.display().to_string(),
                    source: e,
                })
        }
        None => builder.tempdir().map_err(|e| HarnessError::FileWriteError {
            path: std::env::temp_dir().display().to_string(),
            source: e,
        }),
    }
}

fn create_file(path: &Path) -> Result<File> {
    File::create(path).map_err(|e| HarnessError::FileWriteError {
        path: path.display().to_string(),
        source: e,
    })
}

fn read_lossy(path: &Path) -> String {
    fs::read(path)
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default()
}

/// 等待子进程结束；超时则终止并返回 `None`
fn wait_with_timeout(child: &mut Child, timeout: Option<u64>) -> Result<Option<ExitStatus>> {
    let wait_err = |e: std::io::Error| HarnessError::Other(format!("waiting for child: {}", e));

    let Some(seconds) = timeout else {
        return child.wait().map(Some).map_err(wait_err);
    };

    let limit = Duration::from_secs(seconds);
    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait().map_err(wait_err)? {
            return Ok(Some(status));
        }
        if start.elapsed() >= limit {
            kill_tree(child);
            child.wait().ok();
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// 终止子进程及其进程组
#[cfg(unix)]
fn kill_tree(child: &mut Child) {
    // 子进程以自身 pid 作为进程组号
    let pgid = child.id() as libc::pid_t;
    // SAFETY: killpg 只发送信号，不涉及内存
    let rc = unsafe { libc::killpg(pgid, libc::SIGKILL) };
    if rc != 0 {
        debug!(pgid, "killpg failed, killing child only");
    }
    child.kill().ok();
}

#[cfg(not(unix))]
fn kill_tree(child: &mut Child) {
    child.kill().ok();
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn job(script: &str, timeout: Option<u64>) -> JobDescriptor {
        let mut infiles = BTreeMap::new();
        infiles.insert("run.sh".to_string(), script.to_string());
        JobDescriptor {
            infiles,
            outfiles: vec!["out.txt".to_string(), "missing.txt".to_string()],
            command: vec!["sh".to_string(), "run.sh".to_string()],
            scratch_directory: None,
            timeout,
            keep_scratch: false,
        }
    }

    #[test]
    fn test_captures_output_and_files() {
        let outcome = execute(&job(
            "echo hello; echo oops 1>&2; printf data > out.txt",
            None,
        ))
        .unwrap();

        assert!(outcome.success);
        assert_eq!(outcome.stdout, "hello\n");
        assert_eq!(outcome.stderr, "oops\n");
        assert_eq!(outcome.outfiles.get("out.txt").map(|b| b.as_slice()), Some(&b"data"[..]));
        assert!(!outcome.outfiles.contains_key("missing.txt"));
        assert_eq!(outcome.text_outfiles()["out.txt"], "data");
    }

    #[test]
    fn test_nonzero_exit_is_failure() {
        let outcome = execute(&job("echo partial; exit 3", None)).unwrap();
        assert!(!outcome.success);
        assert!(!outcome.timed_out);
        assert_eq!(outcome.stdout, "partial\n");
    }

    #[test]
    fn test_timeout_kills_child() {
        let outcome = execute(&job("sleep 5", Some(1))).unwrap();
        assert!(!outcome.success);
        assert!(outcome.timed_out);
        assert!(outcome.elapsed < Duration::from_secs(5));
    }

    /// 进程存在且不是僵尸
    fn is_running(pid: &str) -> bool {
        if let Ok(stat) = fs::read_to_string(format!("/proc/{}/stat", pid)) {
            return stat
                .rsplit_once(") ")
                .map(|(_, rest)| !rest.starts_with('Z'))
                .unwrap_or(false);
        }
        Command::new("kill")
            .args(["-0", pid])
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    #[test]
    fn test_timeout_kills_process_group() {
        let outcome = execute(&job("sleep 30 &\necho $!\nwait", Some(1))).unwrap();
        assert!(outcome.timed_out);

        let pid = outcome.stdout.trim().to_string();
        assert!(!pid.is_empty());

        let deadline = Instant::now() + Duration::from_secs(3);
        while is_running(&pid) && Instant::now() < deadline {
            thread::sleep(POLL_INTERVAL);
        }
        assert!(!is_running(&pid), "background process {} survived timeout", pid);
    }

    #[test]
    fn test_missing_program() {
        let mut j = job("", None);
        j.command = vec!["/nonexistent/nwchem".to_string(), "nwchem.nw".to_string()];
        let outcome = execute(&j).unwrap();
        assert!(!outcome.success);
        assert!(outcome.stderr.contains("/nonexistent/nwchem"));
    }

    #[test]
    fn test_keep_scratch() {
        let parent = tempfile::tempdir().unwrap();
        let mut j = job("true", None);
        j.scratch_directory = Some(parent.path().to_path_buf());
        j.keep_scratch = true;
        let outcome = execute(&j).unwrap();
        let kept = outcome.scratch_path.unwrap();
        assert!(kept.starts_with(parent.path()));
        assert!(kept.join("run.sh").exists());
    }
}
