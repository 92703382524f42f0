//! # NWChem 输出收集器
//!
//! 逐行扫描 NWChem 的 stdout，提取能量项、梯度表、最终几何与版本号；
//! Hessian 从保留下来的 `nwchem.hess` 文件读取。
//!
//! 匹配完全依赖 NWChem 的打印格式，不同版本的输出可能无法识别：
//! 识别不到的量直接缺省，不做推测。
//!
//! ## 识别的输出片段
//! ```text
//!          Total SCF energy =    -76.041381533165
//!           Total MP2 energy          -76.263279258189
//!  CCSD total energy / hartree       =      -76.274650452...
//!                          SCF ENERGY GRADIENTS
//!  Output coordinates in a.u. (scale by  1.000000000 to convert to a.u.)
//! ```
//!
//! ## 依赖关系
//! - 被 `harness/mod.rs` 使用
//! - 使用 `models/`, `regex`, `ndarray`

use crate::error::{HarnessError, Result};
use crate::models::molecule::normalize_symbol;
use crate::models::{Molecule, PrintedDecimal, QcValue};

use ndarray::Array2;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use tracing::{debug, warn};

/// Hessian 文件名
pub const HESSIAN_FILE: &str = "nwchem.hess";

/// 浮点数（含可选指数）
const NUM: &str = r"(-?\d+\.\d+(?:[EeDd][+-]?\d+)?)";

/// 收集结果
#[derive(Debug, Clone, Default)]
pub struct Harvest {
    /// 标量物理量
    pub qcvars: BTreeMap<String, QcValue>,
    /// natom x 3 (Hartree/Bohr)
    pub gradient: Option<Array2<f64>>,
    /// 3N x 3N
    pub hessian: Option<Array2<f64>>,
    /// 程序输出的最终几何
    pub molecule: Option<Molecule>,
    pub version: Option<String>,
}

impl Harvest {
    pub fn decimal(&self, name: &str) -> Option<&PrintedDecimal> {
        self.qcvars.get(name).and_then(|v| v.as_decimal())
    }

    fn set(&mut self, name: &str, value: PrintedDecimal) {
        self.qcvars.insert(name.to_string(), QcValue::Decimal(value));
    }
}

/// 一条能量行的含义
#[derive(Debug, Clone, Copy)]
enum Role {
    /// SCF/DFT 总能量
    Reference,
    /// 相关方法总能量，参数为方法名
    Total(&'static str),
    /// 相关能，参数为方法名
    Correlation(&'static str),
    Plain,
}

struct EnergyPattern {
    re: Regex,
    labels: &'static [&'static str],
    role: Role,
}

struct Patterns {
    energies: Vec<EnergyPattern>,
    gradient_header: Regex,
    gradient_row: Regex,
    geometry_header: Regex,
    geometry_row: Regex,
    branch: Regex,
    revision: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let energy = |prefix: &str, labels: &'static [&'static str], role: Role| EnergyPattern {
            re: compile(&format!(r"^\s*{}\s*{}\s*$", prefix, NUM)),
            labels,
            role,
        };

        Patterns {
            energies: vec![
                energy(
                    r"Total SCF energy\s*=",
                    &["HF TOTAL ENERGY", "SCF TOTAL ENERGY"],
                    Role::Reference,
                ),
                energy(
                    r"Total DFT energy\s*=",
                    &["DFT TOTAL ENERGY", "SCF TOTAL ENERGY"],
                    Role::Reference,
                ),
                energy(r"One[- ]electron energy\s*=", &["ONE-ELECTRON ENERGY"], Role::Plain),
                energy(r"Two[- ]electron energy\s*=", &["TWO-ELECTRON ENERGY"], Role::Plain),
                energy(
                    r"Nuclear repulsion energy\s*=",
                    &["NUCLEAR REPULSION ENERGY"],
                    Role::Plain,
                ),
                energy(
                    r"Correlation energy",
                    &["MP2 CORRELATION ENERGY"],
                    Role::Correlation("MP2"),
                ),
                energy(r"Total MP2 energy", &["MP2 TOTAL ENERGY"], Role::Total("MP2")),
                energy(
                    r"MBPT\(2\) correlation energy / hartree\s*=",
                    &["MP2 CORRELATION ENERGY"],
                    Role::Correlation("MP2"),
                ),
                energy(
                    r"MBPT\(2\) total energy / hartree\s*=",
                    &["MP2 TOTAL ENERGY"],
                    Role::Total("MP2"),
                ),
                energy(
                    r"CCSD correlation energy / hartree\s*=",
                    &["CCSD CORRELATION ENERGY"],
                    Role::Correlation("CCSD"),
                ),
                energy(
                    r"CCSD total energy / hartree\s*=",
                    &["CCSD TOTAL ENERGY"],
                    Role::Total("CCSD"),
                ),
                energy(
                    r"CCSD\(T\) correlation energy / hartree\s*=",
                    &["CCSD(T) CORRELATION ENERGY"],
                    Role::Correlation("CCSD(T)"),
                ),
                energy(
                    r"CCSD\(T\) total energy / hartree\s*=",
                    &["CCSD(T) TOTAL ENERGY"],
                    Role::Total("CCSD(T)"),
                ),
                energy(
                    r"CCSDT correlation energy / hartree\s*=",
                    &["CCSDT CORRELATION ENERGY"],
                    Role::Correlation("CCSDT"),
                ),
                energy(
                    r"CCSDT total energy / hartree\s*=",
                    &["CCSDT TOTAL ENERGY"],
                    Role::Total("CCSDT"),
                ),
                energy(r"Total CCSD energy:", &["CCSD TOTAL ENERGY"], Role::Total("CCSD")),
                energy(
                    r"Total CCSD\(T\) energy:",
                    &["CCSD(T) TOTAL ENERGY"],
                    Role::Total("CCSD(T)"),
                ),
            ],
            gradient_header: compile(r"^\s*[A-Z0-9()-]+ ENERGY GRADIENTS\s*$"),
            gradient_row: compile(&format!(
                r"^\s*\d+\s+[A-Za-z][\w.-]*\s+{n}\s+{n}\s+{n}\s+{n}\s+{n}\s+{n}\s*$",
                n = NUM
            )),
            geometry_header: compile(r"^\s*Output coordinates in a\.u\."),
            geometry_row: compile(&format!(
                r"^\s*\d+\s+([A-Za-z]+)\S*\s+{n}\s+{n}\s+{n}\s+{n}\s*$",
                n = NUM
            )),
            branch: compile(r"^\s*nwchem branch\s*=\s*(\S+)\s*$"),
            revision: compile(r"^\s*nwchem revision\s*=\s*(\S+)\s*$"),
        }
    })
}

fn compile(pattern: &str) -> Regex {
    // 模式均为常量，编译失败属于程序错误
    Regex::new(pattern).expect("invalid built-in pattern")
}

/// 从版本探测输出中提取 `branch+revision`
pub fn parse_version(stdout: &str) -> Option<String> {
    let p = patterns();
    let mut branch = None;
    let mut revision = None;

    for line in stdout.lines() {
        if let Some(c) = p.branch.captures(line) {
            branch = Some(c[1].to_string());
        }
        if let Some(c) = p.revision.captures(line) {
            revision = Some(c[1].to_string());
        }
    }

    match (branch, revision) {
        (Some(b), Some(r)) => Some(format!("{}+{}", b, r)),
        _ => None,
    }
}

/// 收集 stdout 与输出文件中的全部物理量
pub fn harvest(
    in_mol: &Molecule,
    stdout: &str,
    outfiles: &BTreeMap<String, String>,
) -> Result<Harvest> {
    let mut harvest = harvest_stdout(in_mol, stdout);

    if let Some(text) = outfiles.get(HESSIAN_FILE) {
        harvest.hessian = Some(parse_hessian(text, in_mol.natom())?);
    }

    debug!(
        quantities = harvest.qcvars.len(),
        gradient = harvest.gradient.is_some(),
        hessian = harvest.hessian.is_some(),
        "harvested NWChem output"
    );

    Ok(harvest)
}

fn harvest_stdout(in_mol: &Molecule, stdout: &str) -> Harvest {
    let p = patterns();
    let mut harvest = Harvest {
        version: parse_version(stdout),
        ..Default::default()
    };

    let lines: Vec<&str> = stdout.lines().collect();
    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];

        if p.gradient_header.is_match(line) {
            let (rows, next) = collect_rows(&lines, i + 1, &p.gradient_row);
            if !rows.is_empty() {
                harvest.gradient = Some(gradient_from_rows(&rows, &p.gradient_row));
            }
            i = next;
            continue;
        }

        if p.geometry_header.is_match(line) {
            let (rows, next) = collect_rows(&lines, i + 1, &p.geometry_row);
            if let Some(mol) = molecule_from_rows(&rows, &p.geometry_row, in_mol) {
                harvest.molecule = Some(mol);
            }
            i = next;
            continue;
        }

        for pat in &p.energies {
            if let Some(c) = pat.re.captures(line) {
                if let Some(value) = PrintedDecimal::parse(&c[1]) {
                    record_energy(&mut harvest, pat, value);
                }
                break;
            }
        }

        i += 1;
    }

    harvest
}

fn record_energy(harvest: &mut Harvest, pat: &EnergyPattern, value: PrintedDecimal) {
    for label in pat.labels {
        harvest.set(label, value.clone());
    }

    match pat.role {
        Role::Reference => {
            harvest.set("CURRENT REFERENCE ENERGY", value.clone());
            harvest.set("CURRENT ENERGY", value);
        }
        Role::Total(method) => {
            let corr_label = format!("{} CORRELATION ENERGY", method);
            if harvest.decimal(&corr_label).is_none() {
                if let Some(reference) = harvest.decimal("CURRENT REFERENCE ENERGY").cloned() {
                    harvest.set(&corr_label, value.sub(&reference));
                }
            }
            if let Some(corr) = harvest.decimal(&corr_label).cloned() {
                harvest.set("CURRENT CORRELATION ENERGY", corr);
            }
            harvest.set("CURRENT ENERGY", value);
        }
        Role::Correlation(method) => {
            // 总能量行缺失时由参考能 + 相关能补出，后续打印的总能量会覆盖
            let total_label = format!("{} TOTAL ENERGY", method);
            if harvest.decimal(&total_label).is_none() {
                if let Some(reference) = harvest.decimal("CURRENT REFERENCE ENERGY").cloned() {
                    let total = reference.add(&value);
                    harvest.set(&total_label, total.clone());
                    harvest.set("CURRENT ENERGY", total);
                }
            }
            harvest.set("CURRENT CORRELATION ENERGY", value);
        }
        Role::Plain => {}
    }
}

/// 从 `start` 起收集连续匹配的表格行（跳过表头与空行）
fn collect_rows<'a>(lines: &[&'a str], start: usize, row: &Regex) -> (Vec<&'a str>, usize) {
    let mut rows = Vec::new();
    let mut i = start;

    while i < lines.len() {
        let line = lines[i];
        if row.is_match(line) {
            rows.push(line);
        } else if !rows.is_empty() {
            break;
        } else if i - start > 8 {
            // 表头之后迟迟没有数据行
            break;
        }
        i += 1;
    }

    (rows, i)
}

fn gradient_from_rows(rows: &[&str], row: &Regex) -> Array2<f64> {
    let mut grad = Array2::zeros((rows.len(), 3));
    for (iat, line) in rows.iter().enumerate() {
        if let Some(c) = row.captures(line) {
            for k in 0..3 {
                grad[[iat, k]] = parse_f64(&c[4 + k]);
            }
        }
    }
    grad
}

fn molecule_from_rows(rows: &[&str], row: &Regex, in_mol: &Molecule) -> Option<Molecule> {
    if rows.is_empty() {
        return None;
    }

    let mut symbols = Vec::with_capacity(rows.len());
    let mut geometry = Vec::with_capacity(rows.len());
    for line in rows {
        let c = row.captures(line)?;
        symbols.push(normalize_symbol(&c[1])?);
        geometry.push([parse_f64(&c[3]), parse_f64(&c[4]), parse_f64(&c[5])]);
    }

    let result = Molecule::new(symbols, geometry).and_then(|m| {
        m.with_charge_and_multiplicity(
            in_mol.molecular_charge,
            Some(in_mol.molecular_multiplicity),
        )
    });

    match result {
        Ok(mut mol) => {
            mol.name = in_mol.name.clone();
            Some(mol)
        }
        Err(e) => {
            warn!(error = %e, "ignoring unusable output geometry");
            None
        }
    }
}

fn parse_f64(s: &str) -> f64 {
    PrintedDecimal::parse(s).map(|d| d.to_f64()).unwrap_or(0.0)
}

/// 读取下三角存储的 Hessian 文件
pub fn parse_hessian(text: &str, natom: usize) -> Result<Array2<f64>> {
    let values = text
        .split_whitespace()
        .map(|tok| {
            PrintedDecimal::parse(tok)
                .map(|d| d.to_f64())
                .ok_or_else(|| HarnessError::ParseError {
                    what: HESSIAN_FILE.to_string(),
                    reason: format!("bad value '{}'", tok),
                })
        })
        .collect::<Result<Vec<f64>>>()?;

    let nc = 3 * natom;
    let expected = nc * (nc + 1) / 2;
    if values.len() != expected {
        return Err(HarnessError::ShapeMismatch {
            name: HESSIAN_FILE.to_string(),
            expected: format!("{} lower-triangle values", expected),
            found: format!("{} values", values.len()),
        });
    }

    let mut hess = Array2::zeros((nc, nc));
    let mut vals = values.into_iter();
    for i in 0..nc {
        for j in 0..=i {
            let v = vals.next().unwrap_or(0.0);
            hess[[i, j]] = v;
            hess[[j, i]] = v;
        }
    }

    Ok(hess)
}
