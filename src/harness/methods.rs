//! # 方法解析
//!
//! 将抽象方法名 + 驱动 + 引擎映射为 NWChem 的 `task` 指令
//! 以及需要附加的模块关键字。
//!
//! ## 依赖关系
//! - 被 `harness/input.rs` 使用
//! - 使用 `keywords.rs`

use crate::error::{HarnessError, Result};
use crate::keywords::{Engine, KeywordValue, Keywords};
use crate::models::Driver;

/// 走 DFT 模块的泛函
const DFT_FUNCTIONALS: &[&str] = &[
    "b3lyp", "b3lyp5", "blyp", "bp86", "m06-2x", "pbe", "pbe0", "tpss",
];

/// 只有 TCE 实现的方法
const TCE_ONLY: &[&str] = &["ccsdt", "ccsdtq"];

/// NWChem 模块
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Module {
    Scf,
    Dft,
    Mp2,
    Ccsd,
    CcsdT,
    Tce,
}

impl Module {
    fn task_name(self) -> &'static str {
        match self {
            Module::Scf => "scf",
            Module::Dft => "dft",
            Module::Mp2 => "mp2",
            Module::Ccsd => "ccsd",
            Module::CcsdT => "ccsd(t)",
            Module::Tce => "tce",
        }
    }
}

/// 方法解析结果
#[derive(Debug, Clone, PartialEq)]
pub struct ModelChem {
    pub module: Module,
    /// `task <module> <runtyp>` 指令块
    pub task: String,
    /// 附加关键字
    pub keywords: Keywords,
}

fn runtyp(driver: Driver) -> &'static str {
    match driver {
        Driver::Energy => "energy",
        Driver::Gradient => "gradient",
        Driver::Hessian => "hessian",
    }
}

/// 解析方法名
pub fn muster_modelchem(method: &str, driver: Driver, engine: Engine) -> Result<ModelChem> {
    let method = method.trim().to_lowercase();
    let mut keywords = Keywords::new();

    let module = match method.as_str() {
        "hf" | "scf" => Module::Scf,
        m if DFT_FUNCTIONALS.contains(&m) => {
            keywords.set_verbatim("dft__xc", KeywordValue::Str(m.to_string()))?;
            Module::Dft
        }
        "mp2" | "ccsd" | "ccsd(t)" if engine == Engine::Tce => {
            keywords.set_verbatim(&format!("tce__{}", method), KeywordValue::Bool(true))?;
            Module::Tce
        }
        "mp2" => Module::Mp2,
        "ccsd" => Module::Ccsd,
        "ccsd(t)" => Module::CcsdT,
        m if TCE_ONLY.contains(&m) => {
            keywords.set_verbatim(&format!("tce__{}", m), KeywordValue::Bool(true))?;
            Module::Tce
        }
        other => {
            return Err(HarnessError::InputError(format!(
                "Method not recognized: {}",
                other
            )))
        }
    };

    let task = format!("task {} {}\n\n", module.task_name(), runtyp(driver));

    Ok(ModelChem {
        module,
        task,
        keywords,
    })
}
