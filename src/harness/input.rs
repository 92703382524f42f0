//! # 输入文件生成
//!
//! 将计算请求翻译为 NWChem 输入文件：
//!
//! ```text
//! echo
//!
//! geometry units bohr noautoz nocenter noautosym
//!   H        0.000000000000     1.431430901356     0.984293362719
//!   ...
//! end
//!
//! <关键字与基组块>
//!
//! task scf energy
//! ```
//!
//! 相同的请求与配置总是生成逐字节相同的文本。
//!
//! ## 依赖关系
//! - 被 `harness/mod.rs` 使用
//! - 使用 `keywords.rs`, `harness/methods.rs`, `models/`

use super::methods::{muster_modelchem, Module};
use crate::error::Result;
use crate::keywords::{format_keywords, KeywordValue};
use crate::models::{CalcRequest, JobConfig, Molecule};

use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::debug;

/// 输入文件名
pub const INPUT_FILE: &str = "nwchem.nw";

/// 需要保留的输出文件（NWChem 以输入文件名作为前缀）
pub const RETAINED_FILES: &[&str] = &["nwchem.movecs", "nwchem.hess", "nwchem.db", "nwchem.zmat"];

/// 作业描述：一次计算所需的全部输入
#[derive(Debug, Clone, PartialEq)]
pub struct JobDescriptor {
    /// 文件名 -> 内容
    pub infiles: BTreeMap<String, String>,
    /// 需要取回的输出文件
    pub outfiles: Vec<String>,
    /// 命令行
    pub command: Vec<String>,
    /// 临时目录的父目录
    pub scratch_directory: Option<PathBuf>,
    pub timeout: Option<u64>,
    pub keep_scratch: bool,
}

impl JobDescriptor {
    /// 主输入文件内容
    pub fn input_text(&self) -> &str {
        self.infiles
            .get(INPUT_FILE)
            .map(|s| s.as_str())
            .unwrap_or("")
    }
}

/// 生成作业描述
pub fn build_input(
    request: &CalcRequest,
    config: &JobConfig,
    executable: &str,
) -> Result<JobDescriptor> {
    let mut opts = request.keywords.clone();

    // GiB -> byte，总是覆盖用户设置
    opts.set_verbatim(
        "memory",
        KeywordValue::Int(config.memory_bytes() as i64),
    )?;

    let molcmd = geometry_block(&request.molecule);
    opts.set_verbatim(
        "charge",
        KeywordValue::Int(request.molecule.molecular_charge as i64),
    )?;
    opts.set_verbatim(
        "scf__nopen",
        KeywordValue::Int(request.molecule.molecular_multiplicity as i64 - 1),
    )?;

    let engine = opts.take_engine()?;
    let mdc = muster_modelchem(&request.model.method, request.driver, engine)?;
    if mdc.module == Module::Dft {
        opts.set_verbatim(
            "dft__mult",
            KeywordValue::Int(request.molecule.molecular_multiplicity as i64),
        )?;
    }
    opts.extend(mdc.keywords);

    for el in request.molecule.unique_elements() {
        opts.set_verbatim(
            &format!("basis__{}", el),
            KeywordValue::Str(format!("library {}", request.model.basis)),
        )?;
    }

    debug!(?opts, "NWChem job options");

    let optcmd = format_keywords(&opts);
    let deck = format!("echo\n\n{}{}{}", molcmd, optcmd, mdc.task);

    let mut infiles = BTreeMap::new();
    infiles.insert(INPUT_FILE.to_string(), deck);

    Ok(JobDescriptor {
        infiles,
        outfiles: RETAINED_FILES.iter().map(|s| s.to_string()).collect(),
        command: command_line(executable, config.nprocs),
        scratch_directory: config.scratch_directory.clone(),
        timeout: config.timeout,
        keep_scratch: config.keep_scratch,
    })
}

/// 多进程时经 `mpirun` 启动
fn command_line(executable: &str, nprocs: u32) -> Vec<String> {
    let mut command = Vec::new();
    if nprocs > 1 {
        command.push("mpirun".to_string());
        command.push("-np".to_string());
        command.push(nprocs.to_string());
    }
    command.push(executable.to_string());
    command.push(INPUT_FILE.to_string());
    command
}

/// 几何块，坐标单位 Bohr
pub fn geometry_block(molecule: &Molecule) -> String {
    let mut text = String::from("geometry units bohr noautoz nocenter noautosym\n");
    for (sym, xyz) in molecule.symbols.iter().zip(&molecule.geometry) {
        text.push_str(&format!(
            "  {:<4} {:>18.12} {:>18.12} {:>18.12}\n",
            sym, xyz[0], xyz[1], xyz[2]
        ));
    }
    text.push_str("end\n\n");
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keywords::Keywords;
    use crate::models::molecule::fixtures::{H2O, NH2};
    use crate::models::Driver;

    fn water_request() -> CalcRequest {
        let mol = Molecule::from_text(H2O).unwrap();
        CalcRequest::new(mol, Driver::Energy, "hf", "aug-cc-pvdz")
            .with_keywords(Keywords::new().with("basis__spherical", true).unwrap())
    }

    #[test]
    fn test_deck_layout() {
        let job = build_input(&water_request(), &JobConfig::default(), "/opt/nwchem").unwrap();
        let deck = job.input_text();

        assert!(deck.starts_with("echo\n\ngeometry units bohr"));
        assert!(deck.contains("  H        0.000000000000     1.431430901356     0.984293362719\n"));
        assert!(deck.contains("memory 2147483648 byte\n"));
        assert!(deck.contains("charge 0\n"));
        assert!(deck.contains(
            "basis spherical\n  H library aug-cc-pvdz\n  O library aug-cc-pvdz\nend\n"
        ));
        assert!(deck.contains("scf\n  nopen 0\nend\n"));
        assert!(deck.ends_with("task scf energy\n\n"));
        assert_eq!(job.command, vec!["/opt/nwchem", "nwchem.nw"]);
        assert!(job.outfiles.contains(&"nwchem.hess".to_string()));
    }

    #[test]
    fn test_deck_is_deterministic() {
        let req = water_request();
        let config = JobConfig::default();
        let a = build_input(&req, &config, "nwchem").unwrap();
        let b = build_input(&req, &config, "nwchem").unwrap();
        assert_eq!(a.input_text(), b.input_text());
        assert_eq!(a, b);
    }

    #[test]
    fn test_user_memory_is_overridden() {
        let mut req = water_request();
        req.keywords.insert("memory", 10i64).unwrap();
        let config = JobConfig {
            memory: 1.0,
            ..Default::default()
        };
        let job = build_input(&req, &config, "nwchem").unwrap();
        assert!(job.input_text().contains("memory 1073741824 byte\n"));
        assert!(!job.input_text().contains("memory 10 byte"));
    }

    #[test]
    fn test_open_shell_tce() {
        let mol = Molecule::from_text(NH2).unwrap();
        let kw = Keywords::new()
            .with("qc_module", "tce")
            .unwrap()
            .with("scf__uhf", true)
            .unwrap();
        let req = CalcRequest::new(mol, Driver::Energy, "mp2", "aug-cc-pvdz").with_keywords(kw);
        let deck = build_input(&req, &JobConfig::default(), "nwchem")
            .unwrap()
            .input_text()
            .to_string();

        assert!(deck.contains("scf\n  nopen 1\n  uhf\nend\n"));
        assert!(deck.contains("tce\n  mp2\nend\n"));
        assert!(deck.ends_with("task tce energy\n\n"));
        assert!(!deck.contains("qc_module"));
    }

    #[test]
    fn test_dft_multiplicity() {
        let mol = Molecule::from_text(NH2).unwrap();
        let req = CalcRequest::new(mol, Driver::Gradient, "b3lyp", "6-31g*");
        let deck = build_input(&req, &JobConfig::default(), "nwchem")
            .unwrap()
            .input_text()
            .to_string();
        assert!(deck.contains("dft\n  mult 2\n  xc b3lyp\nend\n"));
        assert!(deck.ends_with("task dft gradient\n\n"));
    }

    #[test]
    fn test_parallel_command() {
        let config = JobConfig {
            nprocs: 4,
            ..Default::default()
        };
        let job = build_input(&water_request(), &config, "nwchem").unwrap();
        assert_eq!(job.command, vec!["mpirun", "-np", "4", "nwchem", "nwchem.nw"]);
    }

    #[test]
    fn test_unknown_method_fails() {
        let mol = Molecule::from_text(H2O).unwrap();
        let req = CalcRequest::new(mol, Driver::Energy, "gfn2-xtb", "sto-3g");
        assert!(build_input(&req, &JobConfig::default(), "nwchem").is_err());
    }
}
